//! Where the catalog's paths come from: a one-off directory listing for the initial scan
//! and a stream of filesystem events afterwards.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use notify::event::{EventKind, ModifyKind, RenameMode};
use notify::{RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchEventKind {
    Add,
    Change,
    Unlink,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub kind: WatchEventKind,
    pub path: PathBuf,
}

impl WatchEvent {
    pub fn add(path: impl Into<PathBuf>) -> Self {
        WatchEvent { kind: WatchEventKind::Add, path: path.into() }
    }

    pub fn change(path: impl Into<PathBuf>) -> Self {
        WatchEvent { kind: WatchEventKind::Change, path: path.into() }
    }

    pub fn unlink(path: impl Into<PathBuf>) -> Self {
        WatchEvent { kind: WatchEventKind::Unlink, path: path.into() }
    }
}

/// A live feed of watch events.
///
/// The guard holds whatever keeps the feed alive; dropping it releases the watch.
pub struct WatchStream {
    events: mpsc::UnboundedReceiver<WatchEvent>,
    guard: Box<dyn Send>,
}

impl WatchStream {
    pub fn new(events: mpsc::UnboundedReceiver<WatchEvent>, guard: impl Send + 'static) -> Self {
        WatchStream { events, guard: Box::new(guard) }
    }

    pub fn into_parts(self) -> (mpsc::UnboundedReceiver<WatchEvent>, Box<dyn Send>) {
        (self.events, self.guard)
    }
}

impl std::fmt::Debug for WatchStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchStream").finish_non_exhaustive()
    }
}

/// Produces watch events for everything below a root directory.
///
/// Implementations must not report files that already exist when watching starts.
pub trait WatchSource: Send + Sync {
    fn watch(&self, root: &Path) -> Result<WatchStream>;
}

/// Enumerates the files matching a glob pattern.
#[async_trait]
pub trait DirectoryLister: Send + Sync {
    async fn list(&self, pattern: &str) -> Result<Vec<PathBuf>>;
}

/// Lists files with the `glob` crate on the blocking thread pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobLister;

#[async_trait]
impl DirectoryLister for GlobLister {
    async fn list(&self, pattern: &str) -> Result<Vec<PathBuf>> {
        let pattern = pattern.to_string();
        tokio::task::spawn_blocking(move || {
            let mut files = Vec::new();
            for entry in glob::glob(&pattern)? {
                match entry {
                    Ok(path) if path.is_file() => files.push(path),
                    Ok(_) => {}
                    Err(e) => warn!("Skipping unreadable entry while listing: {e}"),
                }
            }
            Ok::<_, Error>(files)
        })
        .await
        .map_err(|e| Error::Listing(e.to_string()))?
    }
}

/// Watches a directory tree with the platform's recommended `notify` backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotifyWatchSource;

impl WatchSource for NotifyWatchSource {
    fn watch(&self, root: &Path) -> Result<WatchStream> {
        let (tx, rx) = mpsc::unbounded_channel();

        let mut watcher = notify::recommended_watcher(
            move |res: std::result::Result<notify::Event, notify::Error>| match res {
                Ok(event) => {
                    for event in translate(event) {
                        if tx.send(event).is_err() {
                            // Receiver gone, the catalog stopped watching
                            return;
                        }
                    }
                }
                Err(e) => warn!("Watch error: {e}"),
            },
        )?;
        watcher.watch(root, RecursiveMode::Recursive)?;
        debug!("Watching {}", root.display());

        Ok(WatchStream::new(rx, watcher))
    }
}

/// Maps a raw `notify` event onto add / change / unlink events.
fn translate(event: notify::Event) -> Vec<WatchEvent> {
    let mut paths = event.paths.into_iter();
    let events: Vec<WatchEvent> = match event.kind {
        EventKind::Create(_) => paths.map(WatchEvent::add).collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => paths.map(WatchEvent::unlink).collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => paths.map(WatchEvent::add).collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            let from = paths.next().map(WatchEvent::unlink);
            let to = paths.next().map(WatchEvent::add);
            from.into_iter().chain(to).collect()
        }
        // Renames the backend could not pair up
        EventKind::Modify(ModifyKind::Name(_)) => paths
            .map(|path| {
                if path.exists() {
                    WatchEvent::add(path)
                } else {
                    WatchEvent::unlink(path)
                }
            })
            .collect(),
        EventKind::Modify(ModifyKind::Metadata(_)) => Vec::new(),
        EventKind::Modify(_) => paths.map(WatchEvent::change).collect(),
        EventKind::Remove(_) => paths.map(WatchEvent::unlink).collect(),
        _ => Vec::new(),
    };

    // Directory adds and unlinks stay: the catalog expands them into the documents inside
    events
        .into_iter()
        .filter(|event| event.kind != WatchEventKind::Change || !event.path.is_dir())
        .collect()
}
