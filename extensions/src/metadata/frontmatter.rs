use async_trait::async_trait;
use quire_core::{Metadata, MetadataPlugin, PluginContext, PluginError};

/// Copies every frontmatter key into the metadata.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrontmatterPlugin;

#[async_trait]
impl MetadataPlugin for FrontmatterPlugin {
    fn name(&self) -> &str {
        "frontmatter"
    }

    async fn derive(&self, cx: &PluginContext<'_>) -> Result<Option<Metadata>, PluginError> {
        if cx.frontmatter.is_empty() {
            return Ok(None);
        }
        Ok(Some(cx.frontmatter.clone()))
    }
}
