use std::collections::HashMap;

use async_trait::async_trait;
use quire_core::{Metadata, MetadataPlugin, NodeKind, PluginContext, PluginError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::slug::slugify;

/// One entry of a document's table of contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heading {
    pub level: u8,
    pub text: String,
    pub id: String,
}

/// Adds `headings`, the document's table of contents.
///
/// Heading ids are taken from an explicit `{#id}` attribute or slugified from the text.
/// Repeated slugs get a numeric suffix (`setup`, `setup-1`, ...).
#[derive(Debug, Clone, Copy)]
pub struct HeadingsPlugin {
    /// Deepest heading level included.
    pub max_level: u8,
}

impl Default for HeadingsPlugin {
    fn default() -> Self {
        HeadingsPlugin { max_level: 6 }
    }
}

impl HeadingsPlugin {
    pub fn with_max_level(max_level: u8) -> Self {
        HeadingsPlugin { max_level }
    }

    fn collect(&self, cx: &PluginContext<'_>) -> Vec<Heading> {
        let mut seen: HashMap<String, usize> = HashMap::new();
        let mut headings = Vec::new();

        for node in cx.tree.walk().filter(|node| node.kind == NodeKind::Heading) {
            let level = node
                .attribute("level")
                .and_then(Value::as_u64)
                .and_then(|level| u8::try_from(level).ok())
                .unwrap_or(1);
            if level > self.max_level {
                continue;
            }

            let text = node.text_content().trim().to_string();
            let base = match node.attribute("id").and_then(Value::as_str) {
                Some(id) => id.to_string(),
                None => slugify(&text),
            };
            let id = match seen.get_mut(&base) {
                Some(count) => {
                    *count += 1;
                    format!("{base}-{count}")
                }
                None => {
                    seen.insert(base.clone(), 0);
                    base
                }
            };

            headings.push(Heading { level, text, id });
        }
        headings
    }
}

#[async_trait]
impl MetadataPlugin for HeadingsPlugin {
    fn name(&self) -> &str {
        "headings"
    }

    async fn derive(&self, cx: &PluginContext<'_>) -> Result<Option<Metadata>, PluginError> {
        let headings = serde_json::to_value(self.collect(cx)).map_err(|e| PluginError::Failed(Box::new(e)))?;
        let mut metadata = Metadata::new();
        metadata.insert("headings".to_string(), headings);
        Ok(Some(metadata))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::test_support::derive;
    use serde_json::json;

    #[tokio::test]
    async fn test_table_of_contents() {
        let text = "# Guide\n\n## Setup\n\n### Details {#custom}\n\n## Setup\n";
        let metadata = derive(&HeadingsPlugin::default(), text, Metadata::new()).await.unwrap().unwrap();

        assert_eq!(
            metadata.get("headings"),
            Some(&json!([
                { "level": 1, "text": "Guide", "id": "guide" },
                { "level": 2, "text": "Setup", "id": "setup" },
                { "level": 3, "text": "Details", "id": "custom" },
                { "level": 2, "text": "Setup", "id": "setup-1" },
            ]))
        );
    }

    #[tokio::test]
    async fn test_max_level() {
        let text = "# One\n\n## Two\n\n### Three\n";
        let metadata = derive(&HeadingsPlugin::with_max_level(2), text, Metadata::new())
            .await
            .unwrap()
            .unwrap();

        let headings: Vec<Heading> = serde_json::from_value(metadata["headings"].clone()).unwrap();
        assert_eq!(headings.iter().map(|h| h.level).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_no_headings_is_empty_list() {
        let metadata = derive(&HeadingsPlugin::default(), "Text only.\n", Metadata::new())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(metadata.get("headings"), Some(&json!([])));
    }
}
