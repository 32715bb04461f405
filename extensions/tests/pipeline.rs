use std::sync::Arc;

use quire_core::{DocumentCatalog, DocumentFactory, PathOverrides, Paths};
use quire_extensions::metadata::{Heading, default_plugins};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Clone, serde::Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageMeta {
    title: String,
    #[serde(default)]
    draft: bool,
    headings: Vec<Heading>,
    word_count: u64,
    reading_time: u64,
}

fn site() -> (tempfile::TempDir, Arc<Paths>) {
    let dir = tempfile::tempdir().unwrap();
    let paths = Paths::resolve_from(dir.path(), &PathOverrides::default());
    std::fs::create_dir_all(paths.content().join("guides")).unwrap();
    (dir, Arc::new(paths))
}

#[tokio::test]
async fn default_plugins_build_typed_metadata() {
    let _ = tracing_subscriber::fmt::try_init();
    let (_dir, paths) = site();
    std::fs::write(
        paths.content().join("guides/index.md"),
        "---\ndraft: true\n---\n# Guides\n\n## Setup\n\nRead this first.\n",
    )
    .unwrap();
    std::fs::write(
        paths.content().join("about.md"),
        "---\ntitle: About us\n---\n# Ignored heading\n",
    )
    .unwrap();

    let factory: DocumentFactory<PageMeta> = DocumentFactory::new(paths).with_plugins(default_plugins());
    let catalog = DocumentCatalog::new(factory).unwrap();

    let guides = catalog.get_document("content/guides/index.md").await.unwrap().unwrap();
    assert_eq!(guides.logical_path, "/guides");
    assert_eq!(guides.metadata.title, "Guides");
    assert!(guides.metadata.draft);
    assert_eq!(guides.metadata.headings.len(), 2);
    assert_eq!(guides.metadata.headings[1].id, "setup");
    assert_eq!(guides.metadata.word_count, 5);
    assert_eq!(guides.metadata.reading_time, 1);

    // Frontmatter runs first, so its title beats the heading
    let about = catalog.get_document("content/about.md").await.unwrap().unwrap();
    assert_eq!(about.metadata.title, "About us");
    assert!(!about.metadata.draft);

    let articles = catalog.articles().await.unwrap();
    assert_eq!(articles.keys().collect::<Vec<_>>(), vec!["/about", "/guides"]);
    assert_eq!(
        serde_json::to_value(&articles["/about"]).unwrap()["metadata"]["title"],
        json!("About us")
    );
}
