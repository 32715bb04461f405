use std::{
    fmt,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Weak,
    },
};
use crossbeam_skiplist::SkipSet;

/// Represents an event that can be dispatched to listeners.
pub trait Event: fmt::Debug + Send + Sync {}

type Callback<E> = dyn Fn(&E) + Send + Sync;

struct ListenerEntry<E: Event> {
    // Weak so that dropping the `Listener` handle deregisters the callback.
    callback: Weak<Callback<E>>,
    order: usize,
}

// Entries compare by insertion order only.
impl<E: Event> Eq for ListenerEntry<E> {}

impl<E: Event> PartialEq for ListenerEntry<E> {
    fn eq(&self, other: &Self) -> bool {
        self.order == other.order
    }
}

impl<E: Event> Ord for ListenerEntry<E> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.order.cmp(&other.order)
    }
}

impl<E: Event> PartialOrd for ListenerEntry<E> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

static LISTENER_ID_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// A list of listeners for a specific event type `E`.
///
/// Listeners are stored in a `SkipSet` ordered by their insertion sequence,
/// so they are called in the order they were added.
pub struct ListenerList<E: Event> {
    inner: SkipSet<ListenerEntry<E>>,
}

impl<E: Event + 'static> ListenerList<E> {
    pub fn new() -> Self {
        ListenerList {
            inner: SkipSet::new(),
        }
    }

    /// Dispatches an event to all live listeners in order.
    ///
    /// Entries whose `Listener` handle has been dropped are removed along the way.
    /// Only the crate emits events.
    pub(crate) fn dispatch(&self, event: &E) {
        for entry in self.inner.iter() {
            match entry.callback.upgrade() {
                Some(callback) => callback(event),
                None => {
                    entry.remove();
                }
            }
        }
    }

    /// Number of registered listeners whose handles are still alive.
    pub fn live_count(&self) -> usize {
        self.inner
            .iter()
            .filter(|entry| entry.callback.strong_count() > 0)
            .count()
    }
}

impl<E: Event + 'static> Default for ListenerList<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Event> fmt::Debug for ListenerList<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerList")
            .field("listener_count", &self.inner.len())
            .finish()
    }
}

/// An active listener registration.
///
/// Dropping the handle deregisters the listener; its entry is cleaned up from the
/// `ListenerList` on the next dispatch.
pub struct Listener<E: Event> {
    // The list only holds a Weak reference, so this keeps the callback alive.
    #[allow(dead_code)]
    arc: Arc<Callback<E>>,
    order: usize,
}

impl<E: Event + 'static> Listener<E> {
    /// Registers `callback` with `listeners`. Keep the returned handle alive for as long
    /// as the listener should stay active.
    pub fn new<F>(listeners: &ListenerList<E>, callback: F) -> Self
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let order = LISTENER_ID_COUNTER.fetch_add(1, Ordering::SeqCst);
        let arc: Arc<Callback<E>> = Arc::new(callback);
        listeners.inner.insert(ListenerEntry {
            callback: Arc::downgrade(&arc),
            order,
        });

        Listener { arc, order }
    }
}

impl<E: Event> fmt::Debug for Listener<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("order", &self.order)
            .finish()
    }
}

/// Defines a struct holding one public `ListenerList` field per event type.
///
/// The struct may take a single type parameter with one bound, for event types that are
/// generic over it.
macro_rules! define_event_listeners {
    (
        $(#[$meta:meta])*
        $struct_name:ident $(<$param:ident: $bound:path>)? {
            $($field_name:ident: $event_type:ty),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug)]
        pub struct $struct_name $(<$param: $bound>)? {
            $(
                pub $field_name: $crate::event::ListenerList<$event_type>,
            )*
        }

        impl $(<$param: $bound>)? $struct_name $(<$param>)? {
            /// Creates a new instance with empty listener lists.
            pub fn new() -> Self {
                Self {
                    $(
                        $field_name: $crate::event::ListenerList::new(),
                    )*
                }
            }
        }

        impl $(<$param: $bound>)? Default for $struct_name $(<$param>)? {
            fn default() -> Self {
                Self::new()
            }
        }
    };
}

pub(crate) use define_event_listeners;
