//! Core of quire: a live catalog of markdown documents.
//!
//! [`Paths`] resolves the configured directories, [`DocumentFactory`] turns one source
//! file into a [`Document`], and [`DocumentCatalog`] keeps every document under the
//! content root indexed while files are added, edited and removed.

pub mod catalog;
pub mod document;
pub mod event;
pub mod frontmatter;
pub mod parser;
pub mod paths;
pub mod plugin;
pub mod tree;

mod error;

pub use catalog::{
    CatalogChange, CatalogEvents, CatalogOptions, DocumentCatalog, DocumentFailure, ScanFailurePolicy,
};
pub use document::{Article, Document, DocumentFactory, MetadataValue};
pub use error::{Error, Result};
pub use event::Listener;
pub use frontmatter::Frontmatter;
pub use parser::{MarkdownParser, ParseError, Parser};
pub use paths::{PathOverrides, Paths};
pub use plugin::{Metadata, MetadataPlugin, PluginContext, PluginError};
pub use tree::{Node, NodeKind, Tree};
