use async_trait::async_trait;
use quire_core::{Metadata, MetadataPlugin, NodeKind, PluginContext, PluginError};
use serde_json::Value;

pub const DEFAULT_WORDS_PER_MINUTE: u32 = 200;

/// Adds `wordCount` and `readingTime` (whole minutes, rounded up).
#[derive(Debug, Clone, Copy)]
pub struct ReadingTimePlugin {
    pub words_per_minute: u32,
}

impl Default for ReadingTimePlugin {
    fn default() -> Self {
        ReadingTimePlugin {
            words_per_minute: DEFAULT_WORDS_PER_MINUTE,
        }
    }
}

impl ReadingTimePlugin {
    pub fn new(words_per_minute: u32) -> Self {
        ReadingTimePlugin { words_per_minute }
    }
}

#[async_trait]
impl MetadataPlugin for ReadingTimePlugin {
    fn name(&self) -> &str {
        "reading-time"
    }

    async fn derive(&self, cx: &PluginContext<'_>) -> Result<Option<Metadata>, PluginError> {
        if self.words_per_minute == 0 {
            return Err(PluginError::InvalidInput("words_per_minute must be positive".into()));
        }

        let words: u64 = cx
            .tree
            .walk()
            .filter(|node| matches!(node.kind, NodeKind::Text | NodeKind::Code))
            .filter_map(|node| node.text.as_deref())
            .map(|text| text.split_whitespace().count() as u64)
            .sum();
        let minutes = words.div_ceil(u64::from(self.words_per_minute));

        let mut metadata = Metadata::new();
        metadata.insert("wordCount".to_string(), Value::from(words));
        metadata.insert("readingTime".to_string(), Value::from(minutes));
        Ok(Some(metadata))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::test_support::derive;
    use serde_json::json;

    #[tokio::test]
    async fn test_counts_words_and_rounds_up() {
        let text = "# Two words\n\nOne two three `code`\n";
        let metadata = derive(&ReadingTimePlugin::new(5), text, Metadata::new()).await.unwrap().unwrap();

        assert_eq!(metadata.get("wordCount"), Some(&json!(6)));
        assert_eq!(metadata.get("readingTime"), Some(&json!(2)));
    }

    #[tokio::test]
    async fn test_frontmatter_is_not_counted() {
        let text = "---\ntitle: Many words in this title\n---\nHello\n";
        let metadata = derive(&ReadingTimePlugin::default(), text, Metadata::new()).await.unwrap().unwrap();

        assert_eq!(metadata.get("wordCount"), Some(&json!(1)));
        assert_eq!(metadata.get("readingTime"), Some(&json!(1)));
    }

    #[tokio::test]
    async fn test_zero_rate_is_rejected() {
        let result = derive(&ReadingTimePlugin::new(0), "Text\n", Metadata::new()).await;
        assert!(matches!(result, Err(PluginError::InvalidInput(_))));
    }
}
