use std::sync::Arc;

use quire_core::MetadataPlugin;

mod frontmatter;
mod headings;
mod reading_time;
mod slug;
mod title;

pub use frontmatter::FrontmatterPlugin;
pub use headings::{Heading, HeadingsPlugin};
pub use reading_time::{DEFAULT_WORDS_PER_MINUTE, ReadingTimePlugin};
pub use slug::slugify;
pub use title::TitlePlugin;

/// The standard plugin chain: frontmatter first so that explicit values take precedence
/// over derived ones, then title, headings and reading time.
pub fn default_plugins() -> Vec<Arc<dyn MetadataPlugin>> {
    vec![
        Arc::new(FrontmatterPlugin),
        Arc::new(TitlePlugin),
        Arc::new(HeadingsPlugin::default()),
        Arc::new(ReadingTimePlugin::default()),
    ]
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::Path;

    use quire_core::frontmatter::decode_frontmatter;
    use quire_core::{MarkdownParser, Metadata, MetadataPlugin, Parser, PathOverrides, PluginContext, PluginError, Paths};

    /// Runs one plugin against `text` with `metadata` as the accumulated state.
    pub async fn derive(
        plugin: &dyn MetadataPlugin,
        text: &str,
        metadata: Metadata,
    ) -> Result<Option<Metadata>, PluginError> {
        let tree = MarkdownParser::new().parse(text).unwrap();
        let frontmatter = tree.frontmatter.as_deref().map(decode_frontmatter).unwrap_or_default();
        let paths = Paths::resolve_from(Path::new("/site"), &PathOverrides::default());
        let cx = PluginContext {
            tree: &tree,
            frontmatter: &frontmatter,
            metadata: &metadata,
            paths: &paths,
            source_path: Path::new("/site/content/page.md"),
        };
        plugin.derive(&cx).await
    }
}
