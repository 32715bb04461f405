//! Built-in [`MetadataPlugin`](quire_core::MetadataPlugin)s for quire.

pub mod metadata;
