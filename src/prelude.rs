//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use pst_send::prelude::*;
//! ```

// Core
pub use crate::core::config::{CatalogConfig, Config, Timeouts};
pub use crate::core::errors::{Result, SendError};

// Model
pub use crate::model::{Header, HeaderReader, ScanFile};

// Scan
pub use crate::scan::{Scan, ScanManager, ScanView};

// Metadata
pub use crate::metadata::{MetadataBuilder, MetadataDocument};

// Worker
pub use crate::worker::{CancellationToken, ExternalStatsTool, Processor, SiblingFlags, StatsTool, Transporter};

// Catalog
pub use crate::catalog::{CatalogClient, HttpCatalogClient};

// Orchestrator
pub use crate::orchestrator::Orchestrator;

// Daemon
pub use crate::daemon::signals::SignalHandler;
