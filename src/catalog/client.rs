//! `CatalogClient`: the two-call interface to the external data-product
//! catalog, and its `reqwest`-backed production implementation.

use serde::Deserialize;

use crate::core::errors::{Result, SendError};

/// Two operations the orchestrator needs from the catalog service.
///
/// Modeled as a trait (rather than a concrete HTTP-only type) so tests can
/// supply a fake without standing up a real server.
pub trait CatalogClient: Send + Sync {
    /// Ask the catalog to reindex. Any non-2xx response is a failure.
    fn reindex(&self) -> Result<()>;

    /// Ask whether a data product with the given `metadata_file` value has
    /// been indexed.
    fn exists(&self, search_value: &str) -> Result<bool>;
}

const REINDEX_PATH: &str = "reindexdataproducts";
const LIST_PATH: &str = "dataproductlist";

/// Production `CatalogClient` backed by `reqwest::blocking`, matching the
/// orchestrator's synchronous thread-based concurrency model (no async
/// runtime is otherwise needed in this crate).
pub struct HttpCatalogClient {
    base_url: String,
    http: reqwest::blocking::Client,
}

impl HttpCatalogClient {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: reqwest::blocking::Client::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct DataProductEntry {
    #[serde(rename = "metadata_file")]
    metadata_file: Option<String>,
}

impl CatalogClient for HttpCatalogClient {
    fn reindex(&self) -> Result<()> {
        let url = format!("{}/{REINDEX_PATH}", self.base_url);
        let response = self
            .http
            .get(&url)
            .header("Accept", "application/json")
            .send()?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(SendError::CatalogHttp {
                endpoint: "reindexdataproducts",
                details: format!("status {}", response.status()),
            })
        }
    }

    fn exists(&self, search_value: &str) -> Result<bool> {
        let url = format!("{}/{LIST_PATH}", self.base_url);
        let response = self
            .http
            .get(&url)
            .header("Accept", "application/json")
            .send()?;

        if !response.status().is_success() {
            return Err(SendError::CatalogHttp {
                endpoint: "dataproductlist",
                details: format!("status {}", response.status()),
            });
        }

        let entries: Vec<DataProductEntry> = response.json()?;
        Ok(entries
            .iter()
            .any(|e| e.metadata_file.as_deref() == Some(search_value)))
    }
}
