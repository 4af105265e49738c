//! PST-prefixed error types with structured error codes.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, SendError>;

/// Top-level error type for the egress pipeline.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("[PST-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[PST-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[PST-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[PST-2001] header parse failure for {path}: {details}")]
    HeaderParse { path: PathBuf, details: String },

    #[error("[PST-2002] invariant violation: {details}")]
    InvariantViolation { details: String },

    #[error("[PST-2003] metadata precondition not met for {scan}: {details}")]
    MetadataPrecondition { scan: PathBuf, details: String },

    #[error("[PST-3001] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[PST-3002] external tool {command} failed for {path}: {details}")]
    ToolExecution {
        command: &'static str,
        path: PathBuf,
        details: String,
    },

    #[error("[PST-3003] catalog HTTP failure calling {endpoint}: {details}")]
    CatalogHttp {
        endpoint: &'static str,
        details: String,
    },

    #[error("[PST-3004] catalog gave up confirming {search_value} after {elapsed_secs}s")]
    CatalogNotFound {
        search_value: String,
        elapsed_secs: u64,
    },

    #[error("[PST-3900] interrupted")]
    Interrupted,
}

impl SendError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "PST-1001",
            Self::MissingConfig { .. } => "PST-1002",
            Self::ConfigParse { .. } => "PST-1003",
            Self::HeaderParse { .. } => "PST-2001",
            Self::InvariantViolation { .. } => "PST-2002",
            Self::MetadataPrecondition { .. } => "PST-2003",
            Self::Io { .. } => "PST-3001",
            Self::ToolExecution { .. } => "PST-3002",
            Self::CatalogHttp { .. } => "PST-3003",
            Self::CatalogNotFound { .. } => "PST-3004",
            Self::Interrupted => "PST-3900",
        }
    }

    /// Whether the orchestrator should simply retry on the next scan iteration.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Io { .. } | Self::ToolExecution { .. } | Self::CatalogHttp { .. }
        )
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<serde_json::Error> for SendError {
    fn from(value: serde_json::Error) -> Self {
        Self::ConfigParse {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for SendError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}

impl From<serde_yml::Error> for SendError {
    fn from(value: serde_yml::Error) -> Self {
        Self::ConfigParse {
            context: "serde_yml",
            details: value.to_string(),
        }
    }
}

impl From<reqwest::Error> for SendError {
    fn from(value: reqwest::Error) -> Self {
        Self::CatalogHttp {
            endpoint: "unknown",
            details: value.to_string(),
        }
    }
}
