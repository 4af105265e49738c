//! Scan metadata synthesis: the YAML document handed to the catalog.

pub mod builder;
pub mod schema;

pub use builder::MetadataBuilder;
pub use schema::MetadataDocument;
