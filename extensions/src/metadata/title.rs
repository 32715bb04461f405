use async_trait::async_trait;
use quire_core::{Metadata, MetadataPlugin, NodeKind, PluginContext, PluginError};
use serde_json::Value;
use tracing::trace;

/// Sets `title` from the first level-one heading unless an earlier plugin already did.
#[derive(Debug, Clone, Copy, Default)]
pub struct TitlePlugin;

#[async_trait]
impl MetadataPlugin for TitlePlugin {
    fn name(&self) -> &str {
        "title"
    }

    async fn derive(&self, cx: &PluginContext<'_>) -> Result<Option<Metadata>, PluginError> {
        if cx.metadata.get("title").is_some_and(|title| !title.is_null()) {
            trace!("Title already set");
            return Ok(None);
        }

        let heading = cx.tree.walk().find(|node| {
            node.kind == NodeKind::Heading && node.attribute("level") == Some(&Value::from(1))
        });
        let Some(heading) = heading else {
            return Ok(None);
        };

        let title = heading.text_content().trim().to_string();
        if title.is_empty() {
            return Ok(None);
        }

        let mut metadata = Metadata::new();
        metadata.insert("title".to_string(), Value::String(title));
        Ok(Some(metadata))
    }
}
