use std::fs;

use quire::AppContext;
use quire::config::{CONFIG_FILE_NAME, Config};
use quire_core::ScanFailurePolicy;
use serde_json::json;

#[tokio::test]
async fn catalog_follows_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path();
    fs::write(
        base.join(CONFIG_FILE_NAME),
        r#"{ "paths": { "content": "docs" }, "scanFailure": "skip" }"#,
    )
    .unwrap();
    fs::create_dir_all(base.join("docs/guides")).unwrap();
    fs::write(base.join("docs/index.md"), "# Home\n").unwrap();
    fs::write(base.join("docs/guides/setup.md"), "---\ntitle: Setup guide\n---\nSteps.\n").unwrap();
    fs::write(base.join("docs/broken.md"), [0xff, 0xfe, 0x00]).unwrap();

    let config = Config::load(None, base).unwrap();
    let cx = AppContext::new(base, &config);
    assert_eq!(cx.paths.content(), base.join("docs"));
    assert_eq!(cx.options.scan_failure, ScanFailurePolicy::Skip);

    let catalog = cx.catalog().unwrap();
    let articles = catalog.articles().await.unwrap();
    assert_eq!(articles.keys().collect::<Vec<_>>(), vec!["/", "/guides/setup"]);
    assert_eq!(articles["/"].identifier, "docs/index.md");
    assert_eq!(articles["/"].metadata["title"], json!("Home"));
    assert_eq!(articles["/guides/setup"].metadata["title"], json!("Setup guide"));

    let failures = catalog.failures().await;
    assert_eq!(failures.len(), 1);
    assert!(failures[0].path.ends_with("broken.md"));
}

#[tokio::test]
async fn content_flag_wins_over_config() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path();
    fs::create_dir_all(base.join("pages")).unwrap();
    fs::write(base.join("pages/about.md"), "# About\n").unwrap();

    let config = Config::default().with_content(Some("pages".into()));
    let cx = AppContext::new(base, &config);

    let catalog = cx.catalog().unwrap();
    let about = catalog.get_document("pages/about.md").await.unwrap().unwrap();
    assert_eq!(about.logical_path, "/about");
    assert!(catalog.get_document("content/about.md").await.unwrap().is_none());
}
