//! Metadata plugins.
//!
//! A document's metadata is built by running an ordered list of [`MetadataPlugin`]s one
//! after another. Each plugin sees the content tree, the decoded frontmatter and the
//! metadata contributed by the plugins before it, and may return a partial mapping that
//! is merged on top (later keys win). Returning `None` or an empty map changes nothing.
//!
//! Plugins never run concurrently for the same document, so a plugin can rely on fields
//! set by earlier plugins.

use std::error::Error as StdError;
use std::path::Path;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::frontmatter::Frontmatter;
use crate::paths::Paths;
use crate::tree::Tree;

/// Untyped metadata, as accumulated from the plugin chain.
pub type Metadata = serde_json::Map<String, Value>;

/// Everything a plugin may inspect while deriving metadata.
#[derive(Debug, Clone, Copy)]
pub struct PluginContext<'a> {
    pub tree: &'a Tree,
    pub frontmatter: &'a Frontmatter,
    /// Metadata merged from the plugins that ran before this one.
    pub metadata: &'a Metadata,
    pub paths: &'a Paths,
    pub source_path: &'a Path,
}

#[derive(Error, Debug)]
pub enum PluginError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Plugin failed: {0}")]
    Failed(#[source] Box<dyn StdError + Send + Sync>),
}

#[async_trait]
pub trait MetadataPlugin: Send + Sync {
    /// A short name used in logs and errors.
    fn name(&self) -> &str;

    /// Derives a partial metadata mapping for one document.
    async fn derive(&self, cx: &PluginContext<'_>) -> Result<Option<Metadata>, PluginError>;
}
