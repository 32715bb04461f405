use std::io::Write;

use anyhow::{Context, Result};
use console::style;
use quire_core::{CatalogChange, Metadata};
use serde_json::Value;
use tracing::{info, warn};

use crate::AppContext;
use crate::cli::{ListArgs, ShowArgs};

pub fn handle_paths(cx: &AppContext) -> Result<()> {
    let json = serde_json::to_string_pretty(&*cx.paths)?;
    println!("{json}");
    Ok(())
}

pub async fn handle_list(cx: &AppContext, args: ListArgs) -> Result<()> {
    let catalog = cx.catalog()?;
    let articles = catalog.articles().await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&articles)?);
    } else {
        let mut out = std::io::stdout().lock();
        for (logical_path, article) in &articles {
            let title = article.metadata.get("title").and_then(Value::as_str).unwrap_or("");
            writeln!(out, "{:<32} {:<40} {}", logical_path, article.identifier, title)?;
        }
    }

    for failure in catalog.failures().await {
        warn!("Skipped {}: {}", failure.path.display(), failure.message);
    }
    Ok(())
}

pub async fn handle_show(cx: &AppContext, args: ShowArgs) -> Result<()> {
    let catalog = cx.catalog()?;
    let Some(document) = catalog.get_document(&args.identifier).await? else {
        anyhow::bail!("No document with identifier '{}'", args.identifier);
    };

    let mut value = serde_json::to_value(&*document).context("Failed to serialize document")?;
    if !args.tree {
        if let Value::Object(fields) = &mut value {
            fields.remove("tree");
        }
    }
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

pub async fn handle_watch(cx: &AppContext) -> Result<()> {
    let catalog = cx.catalog()?;
    let _subscription = catalog.on.subscribe(|change| println!("{}", describe(&change)));

    catalog.start_watching().await?;
    let count = catalog.get_all_documents().await?.len();
    println!(
        "Watching {} ({count} documents). Press Ctrl-C to stop.",
        style(catalog.glob_pattern()).bold()
    );

    tokio::signal::ctrl_c().await.context("Failed to listen for Ctrl-C")?;
    catalog.stop_watching();
    info!("Stopped watching");
    Ok(())
}

fn describe(change: &CatalogChange<Metadata>) -> String {
    let kind = match change {
        CatalogChange::Added(_) => style(change.kind()).green(),
        CatalogChange::Changed(_) => style(change.kind()).yellow(),
        CatalogChange::Removed(_) => style(change.kind()).red(),
    };
    let document = change.document();
    format!("{kind} {} ({})", document.identifier, document.logical_path)
}
