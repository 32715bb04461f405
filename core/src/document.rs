//! Documents and the factory that builds them from source files.

use std::fmt;
use std::marker::PhantomData;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::{debug, instrument};

use crate::error::{Error, Result};
use crate::frontmatter::{Frontmatter, decode_frontmatter};
use crate::parser::{MarkdownParser, Parser};
use crate::paths::Paths;
use crate::plugin::{Metadata, MetadataPlugin, PluginContext};
use crate::tree::Tree;

/// Number of hex digits kept from the SHA-256 digest.
pub const CONTENT_HASH_LEN: usize = 8;

/// Types usable as a document's metadata.
///
/// The plugin chain always produces an untyped [`Metadata`] map; it is converted into the
/// metadata type with `serde_json`.
pub trait MetadataValue:
    Serialize + DeserializeOwned + Clone + fmt::Debug + Send + Sync + 'static
{
}

impl<T> MetadataValue for T where
    T: Serialize + DeserializeOwned + Clone + fmt::Debug + Send + Sync + 'static
{
}

/// One parsed source file.
///
/// Documents are immutable values. A change to the source file produces a new document
/// that replaces the old one in the catalog.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Document<M = Metadata> {
    /// Path relative to the project base, joined with `/`.
    pub identifier: String,
    pub source_path: PathBuf,
    pub logical_path: String,
    pub tree: Tree,
    pub frontmatter: Frontmatter,
    pub metadata: M,
    pub content_hash: String,
}

impl<M: MetadataValue> Document<M> {
    pub fn article(&self) -> Article<M> {
        Article {
            identifier: self.identifier.clone(),
            metadata: self.metadata.clone(),
            logical_path: self.logical_path.clone(),
        }
    }
}

/// The public summary of a document, as handed to build integrations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article<M = Metadata> {
    pub identifier: String,
    pub metadata: M,
    pub logical_path: String,
}

/// Builds [`Document`]s from source files.
pub struct DocumentFactory<M = Metadata> {
    paths: Arc<Paths>,
    parser: Arc<dyn Parser>,
    plugins: Vec<Arc<dyn MetadataPlugin>>,
    _metadata: PhantomData<fn() -> M>,
}

impl<M: MetadataValue> DocumentFactory<M> {
    /// Creates a factory using the markdown parser and no plugins.
    pub fn new(paths: impl Into<Arc<Paths>>) -> Self {
        DocumentFactory {
            paths: paths.into(),
            parser: Arc::new(MarkdownParser::new()),
            plugins: Vec::new(),
            _metadata: PhantomData,
        }
    }

    pub fn with_parser(mut self, parser: impl Parser + 'static) -> Self {
        self.parser = Arc::new(parser);
        self
    }

    /// Appends a plugin to the end of the chain.
    pub fn with_plugin(mut self, plugin: impl MetadataPlugin + 'static) -> Self {
        self.plugins.push(Arc::new(plugin));
        self
    }

    pub fn with_plugins<I>(mut self, plugins: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn MetadataPlugin>>,
    {
        self.plugins.extend(plugins);
        self
    }

    pub fn paths(&self) -> &Paths {
        &self.paths
    }

    pub fn identifier_for(&self, source_path: &Path) -> String {
        identifier(self.paths.base(), source_path)
    }

    pub fn logical_path_for(&self, source_path: &Path) -> String {
        logical_path(self.paths.content(), source_path)
    }

    /// Reads, parses and derives a complete document for `source_path`.
    ///
    /// Fails with [`Error::FileRead`] when the file cannot be read as text and with
    /// [`Error::Parse`] when the parser rejects it. Plugin failures propagate as
    /// [`Error::Plugin`]. Malformed frontmatter is not an error.
    #[instrument(skip_all, fields(path = %source_path.display()))]
    pub async fn create(&self, source_path: &Path) -> Result<Document<M>> {
        let text = fs::read_to_string(source_path)
            .await
            .map_err(|source| Error::FileRead {
                path: source_path.to_path_buf(),
                source,
            })?;

        let tree = self.parser.parse(&text).map_err(|source| Error::Parse {
            path: source_path.to_path_buf(),
            source,
        })?;

        let frontmatter = tree
            .frontmatter
            .as_deref()
            .map(decode_frontmatter)
            .unwrap_or_default();

        let mut metadata = Metadata::new();
        for plugin in &self.plugins {
            let cx = PluginContext {
                tree: &tree,
                frontmatter: &frontmatter,
                metadata: &metadata,
                paths: &self.paths,
                source_path,
            };
            let derived = plugin.derive(&cx).await.map_err(|source| Error::Plugin {
                plugin: plugin.name().to_string(),
                path: source_path.to_path_buf(),
                source,
            })?;
            if let Some(values) = derived {
                metadata.extend(values);
            }
        }

        let content_hash = content_hash(&tree, &metadata).map_err(|source| Error::Metadata {
            path: source_path.to_path_buf(),
            source,
        })?;
        let typed: M = serde_json::from_value(metadata.into()).map_err(|source| Error::Metadata {
            path: source_path.to_path_buf(),
            source,
        })?;

        debug!(hash = %content_hash, "Document created");
        Ok(Document {
            identifier: self.identifier_for(source_path),
            source_path: source_path.to_path_buf(),
            logical_path: self.logical_path_for(source_path),
            tree,
            frontmatter,
            metadata: typed,
            content_hash,
        })
    }
}

impl<M> fmt::Debug for DocumentFactory<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plugins: Vec<&str> = self.plugins.iter().map(|plugin| plugin.name()).collect();
        f.debug_struct("DocumentFactory")
            .field("paths", &self.paths)
            .field("plugins", &plugins)
            .finish()
    }
}

/// The path of `source_path` relative to `base`, joined with `/`.
///
/// Paths outside `base` are returned whole.
pub fn identifier(base: &Path, source_path: &Path) -> String {
    match source_path.strip_prefix(base) {
        Ok(relative) => join_segments(relative).join("/"),
        Err(_) => source_path.to_string_lossy().into_owned(),
    }
}

/// The public path of a source file: relative to the content root, extension removed,
/// a trailing `index` segment dropped, always rooted at `/`.
pub fn logical_path(content: &Path, source_path: &Path) -> String {
    let relative = source_path.strip_prefix(content).unwrap_or(source_path);
    let mut segments = join_segments(&relative.with_extension(""));
    if segments.last().is_some_and(|segment| segment == "index") {
        segments.pop();
    }
    format!("/{}", segments.join("/"))
}

fn join_segments(path: &Path) -> Vec<String> {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(segment) => Some(segment.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect()
}

/// A short digest over the serialized tree and metadata.
pub fn content_hash(tree: &Tree, metadata: &Metadata) -> serde_json::Result<String> {
    #[derive(Serialize)]
    struct Hashed<'a> {
        tree: &'a Tree,
        metadata: &'a Metadata,
    }

    let bytes = serde_json::to_vec(&Hashed { tree, metadata })?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let mut digest = format!("{:x}", hasher.finalize());
    digest.truncate(CONTENT_HASH_LEN);
    Ok(digest)
}
