//! The data-product catalog client and its production implementation.

pub mod client;

pub use client::{CatalogClient, HttpCatalogClient};
