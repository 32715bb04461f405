#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use quire_core::catalog::{DirectoryLister, GlobLister, WatchEvent, WatchSource, WatchStream};
use quire_core::{Metadata, MetadataPlugin, PathOverrides, Paths, PluginContext, PluginError};
use tempfile::TempDir;
use tokio::sync::mpsc;

/// A project directory with an empty `content/` root.
pub struct Site {
    // Keeps the directory alive
    _dir: TempDir,
    pub paths: Arc<Paths>,
}

impl Site {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        // Watch backends report canonical paths
        let base = dir.path().canonicalize().unwrap();
        let paths = Paths::resolve_from(&base, &PathOverrides::default());
        std::fs::create_dir_all(paths.content()).unwrap();
        Site { _dir: dir, paths: Arc::new(paths) }
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.paths.content().join(relative)
    }

    pub async fn write(&self, relative: &str, text: &str) -> PathBuf {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.unwrap();
        }
        tokio::fs::write(&path, text).await.unwrap();
        path
    }
}

/// Copies the frontmatter into metadata.
pub struct FrontmatterToMetadata;

#[async_trait]
impl MetadataPlugin for FrontmatterToMetadata {
    fn name(&self) -> &str {
        "frontmatter-to-metadata"
    }

    async fn derive(&self, cx: &PluginContext<'_>) -> Result<Option<Metadata>, PluginError> {
        Ok(Some(cx.frontmatter.clone()))
    }
}

/// Returns a fixed mapping.
pub struct StaticPlugin(pub &'static str, pub serde_json::Value);

#[async_trait]
impl MetadataPlugin for StaticPlugin {
    fn name(&self) -> &str {
        self.0
    }

    async fn derive(&self, _cx: &PluginContext<'_>) -> Result<Option<Metadata>, PluginError> {
        match &self.1 {
            serde_json::Value::Object(map) => Ok(Some(map.clone())),
            _ => Ok(None),
        }
    }
}

/// Counts how often the initial scan lists the content directory.
#[derive(Clone, Default)]
pub struct CountingLister {
    pub calls: Arc<AtomicUsize>,
    pub delay: Duration,
}

impl CountingLister {
    pub fn with_delay(delay: Duration) -> Self {
        CountingLister { calls: Arc::default(), delay }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DirectoryLister for CountingLister {
    async fn list(&self, pattern: &str) -> quire_core::Result<Vec<PathBuf>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        GlobLister.list(pattern).await
    }
}

/// A watch source fed by the test through a channel.
pub struct ChannelWatchSource {
    receiver: Mutex<Option<mpsc::UnboundedReceiver<WatchEvent>>>,
}

impl ChannelWatchSource {
    pub fn new() -> (Self, mpsc::UnboundedSender<WatchEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ChannelWatchSource { receiver: Mutex::new(Some(rx)) }, tx)
    }
}

impl WatchSource for ChannelWatchSource {
    fn watch(&self, _root: &Path) -> quire_core::Result<WatchStream> {
        let rx = self.receiver.lock().unwrap().take().expect("watch started twice");
        Ok(WatchStream::new(rx, ()))
    }
}

/// Awaits the next value or fails the test after a few seconds.
pub async fn next<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> T {
    tokio::time::timeout(Duration::from_secs(10), rx.recv())
        .await
        .expect("timed out waiting for an event")
        .expect("channel closed")
}
