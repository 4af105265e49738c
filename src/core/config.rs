//! Configuration system: optional TOML file + environment override + CLI-flag precedence.
//!
//! Resolution order, highest to lowest precedence: explicit CLI flags, the
//! `PST_SEND_CONFIG`-or-`--config` TOML file, built-in defaults.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, SendError};

/// PST subsystem identifiers accepted on the command line.
pub const PST_SUBSYSTEM_IDS: [&str; 2] = ["pst-low", "pst-mid"];

/// Timeouts and tunables governing the orchestrator and its workers.
///
/// All fields have defaults matching spec §5; any may be overridden by a
/// TOML config file, which is in turn overridden by CLI flags.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Timeouts {
    /// Processor/Transporter wait-on-cancellation timeout (seconds).
    pub loop_wait_secs: u64,
    /// Minimum file age before it is eligible for processing or transfer (seconds).
    pub minimum_age_secs: u64,
    /// Orchestrator's wait-on-cancellation timeout when no scan is available (seconds).
    pub cond_timeout_secs: u64,
    /// A scan is active while its `modified_time` is within this many seconds of now.
    pub scan_timeout_secs: u64,
    /// Initial catalog `exists` poll interval (seconds).
    pub catalog_poll_initial_secs: u64,
    /// Multiplicative backoff factor applied to the catalog poll interval.
    pub catalog_poll_factor: f64,
    /// Total time budget for catalog confirmation polling (seconds).
    pub catalog_poll_cap_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            loop_wait_secs: 2,
            minimum_age_secs: 10,
            cond_timeout_secs: 10,
            scan_timeout_secs: 300,
            catalog_poll_initial_secs: 1,
            catalog_poll_factor: 2.0,
            catalog_poll_cap_secs: 120,
        }
    }
}

impl Timeouts {
    #[must_use]
    pub const fn loop_wait(&self) -> Duration {
        Duration::from_secs(self.loop_wait_secs)
    }

    #[must_use]
    pub const fn minimum_age(&self) -> Duration {
        Duration::from_secs(self.minimum_age_secs)
    }

    #[must_use]
    pub const fn cond_timeout(&self) -> Duration {
        Duration::from_secs(self.cond_timeout_secs)
    }

    #[must_use]
    pub const fn scan_timeout(&self) -> Duration {
        Duration::from_secs(self.scan_timeout_secs)
    }

    #[must_use]
    pub const fn catalog_poll_cap(&self) -> Duration {
        Duration::from_secs(self.catalog_poll_cap_secs)
    }
}

/// Catalog (data-product dashboard) configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct CatalogConfig {
    /// `None` means the catalog handoff is disabled entirely (spec §4.8 step 5).
    pub base_url: Option<String>,
}

impl CatalogConfig {
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.base_url.is_some()
    }
}

/// Full pipeline configuration, assembled from file + env + CLI.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub local_path: PathBuf,
    pub remote_path: PathBuf,
    pub ska_subsystem: String,
    pub catalog: CatalogConfig,
    pub timeouts: Timeouts,
    pub verbose: bool,
}

impl Config {
    /// Load the optional TOML file (explicit path, `PST_SEND_CONFIG` env var,
    /// or none), returning built-in defaults layered with whatever the file
    /// provides. The CLI is responsible for layering its own flags on top.
    pub fn load_file(explicit: Option<&Path>) -> Result<FileConfig> {
        let env_path = if explicit.is_none() {
            env::var_os("PST_SEND_CONFIG").map(PathBuf::from)
        } else {
            None
        };

        let Some(path) = explicit.map(Path::to_path_buf).or(env_path) else {
            return Ok(FileConfig::default());
        };

        if !path.exists() {
            return Err(SendError::MissingConfig { path });
        }

        let raw = fs::read_to_string(&path).map_err(|source| SendError::io(&path, source))?;
        let parsed: FileConfig = toml::from_str(&raw)?;
        Ok(parsed)
    }

    /// Validate cross-field invariants not expressible in the type system.
    pub fn validate(&self) -> Result<()> {
        if !PST_SUBSYSTEM_IDS.contains(&self.ska_subsystem.as_str()) {
            return Err(SendError::InvalidConfig {
                details: format!(
                    "ska_subsystem must be one of {PST_SUBSYSTEM_IDS:?}, got {:?}",
                    self.ska_subsystem
                ),
            });
        }
        if !self.local_path.is_dir() {
            return Err(SendError::InvalidConfig {
                details: format!("local_path {} is not a directory", self.local_path.display()),
            });
        }
        Ok(())
    }
}

/// The subset of `Config` that may be set from a TOML file: timeouts and
/// the catalog URL. Paths and subsystem always come from the CLI.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct FileConfig {
    pub catalog: CatalogConfig,
    pub timeouts: Timeouts,
}
