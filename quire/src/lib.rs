use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use quire_core::{CatalogOptions, DocumentCatalog, DocumentFactory, Paths};
use quire_extensions::metadata::default_plugins;

pub mod cli;
pub mod commands;
pub mod config;

use config::Config;

pub struct AppContext {
    pub paths: Arc<Paths>,
    pub options: CatalogOptions,
}

impl AppContext {
    /// Resolves directories against `base` and reads catalog options from `config`.
    pub fn new(base: &Path, config: &Config) -> Self {
        AppContext {
            paths: Arc::new(Paths::resolve_from(base, &config.paths)),
            options: config.catalog_options(),
        }
    }

    /// A catalog over the content directory with the built-in plugins.
    pub fn catalog(&self) -> Result<DocumentCatalog> {
        let factory = DocumentFactory::new(self.paths.clone()).with_plugins(default_plugins());
        let catalog = DocumentCatalog::builder(factory).options(self.options.clone()).build()?;
        Ok(catalog)
    }
}
