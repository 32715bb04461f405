use std::sync::Arc;

use crate::document::{Document, MetadataValue};
use crate::event::{Event, Listener, define_event_listeners};

/// A document appeared after the initial scan.
#[derive(Debug, Clone)]
pub struct DocumentAdded<M> {
    pub document: Arc<Document<M>>,
}

/// A document's content hash changed, or a change was reported for a path the catalog
/// did not hold yet (then `previous` is `None`).
#[derive(Debug, Clone)]
pub struct DocumentChanged<M> {
    pub document: Arc<Document<M>>,
    pub previous: Option<Arc<Document<M>>>,
}

/// A document was removed. Carries the last known value.
#[derive(Debug, Clone)]
pub struct DocumentRemoved<M> {
    pub document: Arc<Document<M>>,
}

impl<M: MetadataValue> Event for DocumentAdded<M> {}
impl<M: MetadataValue> Event for DocumentChanged<M> {}
impl<M: MetadataValue> Event for DocumentRemoved<M> {}

define_event_listeners!(
    /// Listener lists for catalog changes, exposed as `catalog.on`.
    CatalogEvents<M: MetadataValue> {
        added: DocumentAdded<M>,
        changed: DocumentChanged<M>,
        removed: DocumentRemoved<M>,
    }
);

/// A catalog change as a single value, for consumers that route all three kinds through
/// one channel.
#[derive(Debug, Clone)]
pub enum CatalogChange<M> {
    Added(DocumentAdded<M>),
    Changed(DocumentChanged<M>),
    Removed(DocumentRemoved<M>),
}

impl<M> CatalogChange<M> {
    /// The document the change leaves behind (or, for a removal, the one removed).
    pub fn document(&self) -> &Arc<Document<M>> {
        match self {
            CatalogChange::Added(event) => &event.document,
            CatalogChange::Changed(event) => &event.document,
            CatalogChange::Removed(event) => &event.document,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            CatalogChange::Added(_) => "added",
            CatalogChange::Changed(_) => "changed",
            CatalogChange::Removed(_) => "removed",
        }
    }
}

impl<M: MetadataValue> CatalogEvents<M> {
    /// Subscribes `callback` to all three lists at once.
    ///
    /// The returned handle keeps the three registrations alive.
    pub fn subscribe<F>(&self, callback: F) -> Subscription<M>
    where
        F: Fn(CatalogChange<M>) + Send + Sync + 'static,
    {
        let callback = Arc::new(callback);
        let (on_added, on_changed, on_removed) = (callback.clone(), callback.clone(), callback);
        Subscription {
            _added: Listener::new(&self.added, move |event: &DocumentAdded<M>| {
                on_added(CatalogChange::Added(event.clone()))
            }),
            _changed: Listener::new(&self.changed, move |event: &DocumentChanged<M>| {
                on_changed(CatalogChange::Changed(event.clone()))
            }),
            _removed: Listener::new(&self.removed, move |event: &DocumentRemoved<M>| {
                on_removed(CatalogChange::Removed(event.clone()))
            }),
        }
    }
}

/// Registration handle returned by [`CatalogEvents::subscribe`]. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription<M: MetadataValue> {
    _added: Listener<DocumentAdded<M>>,
    _changed: Listener<DocumentChanged<M>>,
    _removed: Listener<DocumentRemoved<M>>,
}
