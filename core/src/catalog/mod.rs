//! The live document catalog.
//!
//! A [`DocumentCatalog`] owns the mapping from source path to [`Document`]. It fills the
//! mapping with a single initial scan of the content root, then (once
//! [`DocumentCatalog::start_watching`] is called) keeps it current from filesystem events,
//! publishing `added` / `changed` / `removed` notifications on [`DocumentCatalog::on`].
//!
//! Consistency rules:
//! - Every read waits for the initial scan. Concurrent callers share one scan.
//! - Documents are built completely before they are stored, so readers never see a
//!   partial value. A failed build leaves the previous entry untouched.
//! - Each watch event gets a ticket when it is received. A result is only committed if its
//!   ticket is newer than the last one committed for the same path, so the most recently
//!   received event wins no matter which build finishes first.
//! - A directory that disappears takes every document below it along. A directory that
//!   appears in one piece is listed and its documents are added.

mod events;
mod source;

use std::collections::{BTreeMap, HashMap};
use std::error::Error as StdError;
use std::path::{MAIN_SEPARATOR, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, Weak};

use futures::future::{BoxFuture, FutureExt, Shared};
use futures::stream::{self, StreamExt};
use glob::{MatchOptions, Pattern};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::document::{Article, Document, DocumentFactory, MetadataValue};
use crate::error::{Error, Result};
use crate::paths::Paths;
use crate::plugin::Metadata;

pub use events::{CatalogChange, CatalogEvents, DocumentAdded, DocumentChanged, DocumentRemoved, Subscription};
pub use source::{
    DirectoryLister, GlobLister, NotifyWatchSource, WatchEvent, WatchEventKind, WatchSource, WatchStream,
};

pub const DEFAULT_PATTERN: &str = "**/*.md";

/// Maximum number of documents built at once during the initial scan.
const SCAN_CONCURRENCY: usize = 32;

/// What the initial scan does when a document cannot be built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanFailurePolicy {
    /// Log the failure, record it in [`DocumentCatalog::failures`] and carry on.
    #[default]
    Skip,
    /// Fail the scan. Every reader then gets [`Error::InitialScan`].
    Abort,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CatalogOptions {
    /// Glob pattern, relative to the content root, selecting the source files.
    pub pattern: String,
    pub scan_failure: ScanFailurePolicy,
}

impl Default for CatalogOptions {
    fn default() -> Self {
        CatalogOptions {
            pattern: DEFAULT_PATTERN.to_string(),
            scan_failure: ScanFailurePolicy::default(),
        }
    }
}

/// A source file whose most recent build failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentFailure {
    pub path: PathBuf,
    pub message: String,
}

type ScanFuture = Shared<BoxFuture<'static, std::result::Result<(), Arc<Error>>>>;

struct Entries<M> {
    documents: HashMap<PathBuf, Arc<Document<M>>>,
    identifiers: HashMap<String, PathBuf>,
    committed: HashMap<PathBuf, u64>,
    failures: BTreeMap<PathBuf, String>,
}

impl<M> Entries<M> {
    fn new() -> Self {
        Entries {
            documents: HashMap::new(),
            identifiers: HashMap::new(),
            committed: HashMap::new(),
            failures: BTreeMap::new(),
        }
    }

    /// Records `ticket` as the latest commit for `path`, unless a newer one already exists.
    fn claim(&mut self, path: &Path, ticket: u64) -> bool {
        match self.committed.get(path) {
            Some(&last) if last >= ticket => false,
            _ => {
                self.committed.insert(path.to_path_buf(), ticket);
                true
            }
        }
    }

    fn insert(&mut self, document: Arc<Document<M>>) -> Option<Arc<Document<M>>> {
        self.failures.remove(&document.source_path);
        self.identifiers
            .insert(document.identifier.clone(), document.source_path.clone());
        self.documents.insert(document.source_path.clone(), document)
    }

    fn remove(&mut self, path: &Path) -> Option<Arc<Document<M>>> {
        self.failures.remove(path);
        let document = self.documents.remove(path)?;
        self.identifiers.remove(&document.identifier);
        Some(document)
    }

    /// Removes the document at `path` and every document below it, claiming `ticket` for
    /// each. Returns the removed documents ordered by path.
    fn remove_tree(&mut self, path: &Path, ticket: u64) -> Vec<Arc<Document<M>>> {
        let mut paths: Vec<PathBuf> = self
            .documents
            .keys()
            .filter(|source| source.starts_with(path))
            .cloned()
            .collect();
        paths.sort();
        self.failures.retain(|source, _| !source.starts_with(path));

        let mut removed = Vec::new();
        for source in paths {
            if !self.claim(&source, ticket) {
                continue;
            }
            removed.extend(self.remove(&source));
        }
        removed
    }
}

struct ActiveWatch {
    task: JoinHandle<()>,
    // Dropping this releases the underlying watch.
    _guard: Box<dyn Send>,
}

struct Inner<M: MetadataValue> {
    factory: DocumentFactory<M>,
    lister: Arc<dyn DirectoryLister>,
    watch_source: Arc<dyn WatchSource>,
    options: CatalogOptions,
    glob_pattern: String,
    matcher: Pattern,
    entries: RwLock<Entries<M>>,
    scan: OnceLock<ScanFuture>,
    events: Arc<CatalogEvents<M>>,
    watch: Mutex<Option<ActiveWatch>>,
    tickets: AtomicU64,
}

/// Configures a [`DocumentCatalog`].
pub struct CatalogBuilder<M: MetadataValue = Metadata> {
    factory: DocumentFactory<M>,
    lister: Arc<dyn DirectoryLister>,
    watch_source: Arc<dyn WatchSource>,
    options: CatalogOptions,
}

impl<M: MetadataValue> CatalogBuilder<M> {
    pub fn lister(mut self, lister: impl DirectoryLister + 'static) -> Self {
        self.lister = Arc::new(lister);
        self
    }

    pub fn watch_source(mut self, watch_source: impl WatchSource + 'static) -> Self {
        self.watch_source = Arc::new(watch_source);
        self
    }

    pub fn options(mut self, options: CatalogOptions) -> Self {
        self.options = options;
        self
    }

    /// Builds the catalog. Fails if the configured pattern is not a valid glob.
    pub fn build(self) -> Result<DocumentCatalog<M>> {
        let matcher = Pattern::new(&self.options.pattern)?;
        let content = self.factory.paths().content().to_string_lossy().into_owned();
        let glob_pattern = format!("{}{}", Pattern::escape(&content), self.options.pattern);
        let events = Arc::new(CatalogEvents::new());

        let inner = Inner {
            factory: self.factory,
            lister: self.lister,
            watch_source: self.watch_source,
            options: self.options,
            glob_pattern,
            matcher,
            entries: RwLock::new(Entries::new()),
            scan: OnceLock::new(),
            events: events.clone(),
            watch: Mutex::new(None),
            tickets: AtomicU64::new(0),
        };

        Ok(DocumentCatalog {
            inner: Arc::new(inner),
            on: events,
        })
    }
}

/// A live, queryable collection of documents backed by the content directory.
///
/// Dropping the catalog stops watching.
pub struct DocumentCatalog<M: MetadataValue = Metadata> {
    inner: Arc<Inner<M>>,
    /// Change notifications. Subscribe with [`crate::event::Listener::new`] or
    /// [`CatalogEvents::subscribe`].
    pub on: Arc<CatalogEvents<M>>,
}

impl<M: MetadataValue> DocumentCatalog<M> {
    /// A catalog with the default pattern, glob listing and `notify` watching.
    pub fn new(factory: DocumentFactory<M>) -> Result<Self> {
        Self::builder(factory).build()
    }

    pub fn builder(factory: DocumentFactory<M>) -> CatalogBuilder<M> {
        CatalogBuilder {
            factory,
            lister: Arc::new(GlobLister),
            watch_source: Arc::new(NotifyWatchSource),
            options: CatalogOptions::default(),
        }
    }

    /// Looks up a document by identifier once the initial scan has completed.
    pub async fn get_document(&self, identifier: &str) -> Result<Option<Arc<Document<M>>>> {
        self.inner.wait_for_initial_scan().await?;
        let entries = self.inner.entries.read().await;
        Ok(entries
            .identifiers
            .get(identifier)
            .and_then(|path| entries.documents.get(path))
            .cloned())
    }

    pub async fn get_document_by_path(&self, source_path: &Path) -> Result<Option<Arc<Document<M>>>> {
        self.inner.wait_for_initial_scan().await?;
        Ok(self.inner.entries.read().await.documents.get(source_path).cloned())
    }

    /// A snapshot of every document, in no particular order.
    pub async fn get_all_documents(&self) -> Result<Vec<Arc<Document<M>>>> {
        self.inner.wait_for_initial_scan().await?;
        Ok(self.inner.entries.read().await.documents.values().cloned().collect())
    }

    /// The article table keyed by logical path.
    ///
    /// When two files share a logical path (`a.md` and `a/index.md`) the one whose source
    /// path sorts last wins.
    pub async fn articles(&self) -> Result<BTreeMap<String, Article<M>>> {
        let mut documents = self.get_all_documents().await?;
        documents.sort_by(|a, b| a.source_path.cmp(&b.source_path));

        let mut articles = BTreeMap::new();
        for document in documents {
            if let Some(shadowed) = articles.insert(document.logical_path.clone(), document.article()) {
                warn!(
                    "{} shadows {} at {}",
                    document.identifier, shadowed.identifier, document.logical_path
                );
            }
        }
        Ok(articles)
    }

    /// Source paths whose latest build failed, sorted by path.
    pub async fn failures(&self) -> Vec<DocumentFailure> {
        self.inner
            .entries
            .read()
            .await
            .failures
            .iter()
            .map(|(path, message)| DocumentFailure {
                path: path.clone(),
                message: message.clone(),
            })
            .collect()
    }

    /// Waits for the initial scan, then applies filesystem events as they arrive.
    ///
    /// Calling this while already watching does nothing.
    #[instrument(skip_all, fields(root = %self.paths().content().display()))]
    pub async fn start_watching(&self) -> Result<()> {
        self.inner.wait_for_initial_scan().await?;

        let mut watch = lock(&self.inner.watch);
        if watch.is_some() {
            debug!("Already watching");
            return Ok(());
        }

        let content = self.paths().content();
        let stream = self.inner.watch_source.watch(content)?;
        let (mut events, guard) = stream.into_parts();
        // Backends may report paths through the resolved root (symlinks, /private on macOS)
        let canonical_root = std::fs::canonicalize(content)
            .ok()
            .filter(|root| root.as_path() != content);
        if let Some(root) = &canonical_root {
            debug!("Content root resolves to {}", root.display());
        }

        let inner = Arc::downgrade(&self.inner);
        let task = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let Some(inner) = Weak::upgrade(&inner) else {
                    break;
                };
                inner.receive(event, canonical_root.as_deref());
            }
            debug!("Watch loop ended");
        });

        *watch = Some(ActiveWatch { task, _guard: guard });
        info!("Watching for changes");
        Ok(())
    }

    /// Stops applying filesystem events and releases the watch.
    ///
    /// Safe to call repeatedly and when watching never started. Builds already in flight
    /// may still complete and notify.
    pub fn stop_watching(&self) {
        if let Some(active) = lock(&self.inner.watch).take() {
            active.task.abort();
            info!("Stopped watching");
        }
    }

    pub fn is_watching(&self) -> bool {
        lock(&self.inner.watch).is_some()
    }

    /// The absolute glob pattern used for the initial scan.
    pub fn glob_pattern(&self) -> &str {
        &self.inner.glob_pattern
    }

    pub fn paths(&self) -> &Paths {
        self.inner.factory.paths()
    }

    pub fn options(&self) -> &CatalogOptions {
        &self.inner.options
    }
}

impl<M: MetadataValue> Drop for DocumentCatalog<M> {
    fn drop(&mut self) {
        self.stop_watching();
    }
}

impl<M: MetadataValue> std::fmt::Debug for DocumentCatalog<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentCatalog")
            .field("glob_pattern", &self.inner.glob_pattern)
            .field("options", &self.inner.options)
            .field("watching", &self.is_watching())
            .finish()
    }
}

impl<M: MetadataValue> Inner<M> {
    fn next_ticket(&self) -> u64 {
        self.tickets.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Resolves when the one initial scan has finished, starting it if needed.
    async fn wait_for_initial_scan(self: &Arc<Self>) -> Result<()> {
        let scan = self
            .scan
            .get_or_init(|| {
                let inner = Arc::downgrade(self);
                async move {
                    match inner.upgrade() {
                        Some(inner) => inner.initial_scan().await.map_err(Arc::new),
                        None => Ok(()),
                    }
                }
                .boxed()
                .shared()
            })
            .clone();

        scan.await.map_err(Error::InitialScan)
    }

    #[instrument(skip_all, fields(pattern = %self.glob_pattern))]
    async fn initial_scan(&self) -> Result<()> {
        let files = self.lister.list(&self.glob_pattern).await?;
        info!("Initial scan found {} files", files.len());

        let mut builds = stream::iter(files)
            .map(|path| async move {
                let ticket = self.next_ticket();
                let result = self.factory.create(&path).await;
                (path, ticket, result)
            })
            .buffer_unordered(SCAN_CONCURRENCY);

        while let Some((path, ticket, result)) = builds.next().await {
            let mut entries = self.entries.write().await;
            match result {
                Ok(document) => {
                    if entries.claim(&path, ticket) {
                        entries.insert(Arc::new(document));
                    }
                }
                Err(e) => {
                    let message = report(&e);
                    match self.options.scan_failure {
                        ScanFailurePolicy::Abort => {
                            error!("Aborting initial scan: {message}");
                            return Err(e);
                        }
                        ScanFailurePolicy::Skip => {
                            warn!("Skipping {}: {message}", path.display());
                            entries.failures.insert(path, message);
                        }
                    }
                }
            }
        }

        info!("Initial scan complete");
        Ok(())
    }

    fn matches(&self, path: &Path) -> bool {
        let options = MatchOptions {
            require_literal_separator: true,
            ..MatchOptions::new()
        };
        path.strip_prefix(self.factory.paths().content())
            .is_ok_and(|relative| self.matcher.matches_path_with(relative, options))
    }

    /// Maps an event path onto the configured content root, accepting paths reported
    /// through `canonical_root` as well.
    fn localize(&self, path: &Path, canonical_root: Option<&Path>) -> Option<PathBuf> {
        let content = self.factory.paths().content();
        if path.starts_with(content) {
            return Some(path.to_path_buf());
        }
        let relative = path.strip_prefix(canonical_root?).ok()?;
        Some(content.join(relative))
    }

    /// Routes an incoming event. Unlinks always go through, since the path may have been a
    /// directory holding documents.
    fn receive(self: &Arc<Self>, event: WatchEvent, canonical_root: Option<&Path>) {
        let Some(path) = self.localize(&event.path, canonical_root) else {
            debug!("Ignoring event outside the content root: {}", event.path.display());
            return;
        };

        match event.kind {
            WatchEventKind::Unlink => self.apply(WatchEventKind::Unlink, path),
            WatchEventKind::Add if path.is_dir() => self.add_tree(path),
            kind if self.matches(&path) => self.apply(kind, path),
            kind => debug!("Ignoring {kind:?} for {}", path.display()),
        }
    }

    /// Stamps an event and hands it to its own task.
    fn apply(self: &Arc<Self>, kind: WatchEventKind, path: PathBuf) {
        let ticket = self.next_ticket();
        debug!(ticket, "Received {kind:?} for {}", path.display());

        let inner = Arc::clone(self);
        tokio::spawn(async move {
            match kind {
                WatchEventKind::Unlink => inner.remove(&path, ticket).await,
                kind => inner.upsert(kind, &path, ticket).await,
            }
        });
    }

    /// Lists a directory that appeared with its contents and adds each matching document.
    fn add_tree(self: &Arc<Self>, dir: PathBuf) {
        let pattern = {
            let dir_name = dir.to_string_lossy();
            format!("{}/**/*", Pattern::escape(dir_name.trim_end_matches(MAIN_SEPARATOR)))
        };

        let inner = Arc::clone(self);
        tokio::spawn(async move {
            let files = match inner.lister.list(&pattern).await {
                Ok(files) => files,
                Err(e) => {
                    warn!("Failed to list new directory {}: {}", dir.display(), report(&e));
                    return;
                }
            };

            let files: Vec<PathBuf> = files.into_iter().filter(|file| inner.matches(file)).collect();
            debug!("Found {} documents in new directory {}", files.len(), dir.display());
            for file in files {
                inner.apply(WatchEventKind::Add, file);
            }
        });
    }

    #[instrument(skip(self, path), fields(path = %path.display()))]
    async fn upsert(&self, kind: WatchEventKind, path: &Path, ticket: u64) {
        let result = self.factory.create(path).await;

        let mut entries = self.entries.write().await;
        if !entries.claim(path, ticket) {
            debug!("Discarding stale result");
            return;
        }

        let document = match result {
            Ok(document) => Arc::new(document),
            Err(e) => {
                let message = report(&e);
                warn!("Failed to update document: {message}");
                entries.failures.insert(path.to_path_buf(), message);
                return;
            }
        };

        // Listeners run while the entry is locked so notifications for one path are
        // delivered in commit order.
        match entries.insert(document.clone()) {
            None if kind == WatchEventKind::Add => {
                self.events.added.dispatch(&DocumentAdded { document });
            }
            None => {
                self.events.changed.dispatch(&DocumentChanged {
                    document,
                    previous: None,
                });
            }
            Some(previous) if previous.content_hash != document.content_hash => {
                self.events.changed.dispatch(&DocumentChanged {
                    document,
                    previous: Some(previous),
                });
            }
            Some(_) => debug!("Content hash unchanged"),
        }
    }

    #[instrument(skip(self, path), fields(path = %path.display()))]
    async fn remove(&self, path: &Path, ticket: u64) {
        let mut entries = self.entries.write().await;
        let removed = entries.remove_tree(path, ticket);
        if removed.is_empty() {
            // Keeps a build still in flight for this path from landing afterwards
            entries.claim(path, ticket);
            debug!("Nothing to remove");
            return;
        }

        for document in removed {
            self.events.removed.dispatch(&DocumentRemoved { document });
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Formats an error with its chain of sources.
fn report(error: &Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
