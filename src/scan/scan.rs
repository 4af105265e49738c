//! `Scan`: identity, filesystem location and lifecycle sentinels for one scan.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::core::errors::{Result, SendError};

pub const SCAN_COMPLETED_FILE: &str = "scan_completed";
pub const SCAN_CONFIG_FILE: &str = "scan_configuration.json";
pub const DATA_PRODUCT_FILE: &str = "ska-data-product.yaml";

/// One scan's identity and root-level sentinel files.
///
/// Identified by the triple `(eb_id, subsystem_id, scan_id)`, read off the
/// three path components of its relative path under the data-product root.
#[derive(Debug, Clone)]
pub struct Scan {
    pub root: PathBuf,
    pub relative_path: PathBuf,
    pub eb_id: String,
    pub subsystem_id: String,
    pub scan_id: String,
    pub created_time: i64,
    modified_time: Arc<AtomicI64>,
}

impl Scan {
    /// Build a `Scan` from its relative path under `root`. Fails if the
    /// relative path does not have exactly three components.
    pub fn new(root: PathBuf, relative_path: PathBuf) -> Result<Self> {
        let mut components = relative_path.components();
        let (eb, sub, scan) = (components.next(), components.next(), components.next());
        if components.next().is_some() || scan.is_none() {
            return Err(SendError::InvariantViolation {
                details: format!(
                    "scan path {} does not have exactly 3 components (eb/subsystem/scan)",
                    relative_path.display()
                ),
            });
        }

        let full_path = root.join(&relative_path);
        let created_time = std::fs::metadata(&full_path)
            .and_then(|m| m.created().or_else(|_| m.modified()))
            .map(unix_nanos)
            .unwrap_or(0);

        Ok(Self {
            eb_id: eb.unwrap().as_os_str().to_string_lossy().into_owned(),
            subsystem_id: sub.unwrap().as_os_str().to_string_lossy().into_owned(),
            scan_id: scan.unwrap().as_os_str().to_string_lossy().into_owned(),
            root,
            relative_path,
            created_time,
            modified_time: Arc::new(AtomicI64::new(created_time)),
        })
    }

    #[must_use]
    pub fn full_path(&self) -> PathBuf {
        self.root.join(&self.relative_path)
    }

    #[must_use]
    pub fn path_exists(&self) -> bool {
        self.full_path().is_dir()
    }

    #[must_use]
    pub fn is_recording(&self) -> bool {
        !self.full_path().join(SCAN_COMPLETED_FILE).exists()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.full_path().join(SCAN_COMPLETED_FILE).exists()
    }

    #[must_use]
    pub fn data_product_file_exists(&self) -> bool {
        self.full_path().join(DATA_PRODUCT_FILE).exists()
    }

    #[must_use]
    pub fn scan_config_file_exists(&self) -> bool {
        self.full_path().join(SCAN_CONFIG_FILE).exists()
    }

    /// Handle to the shared `modified_time` atomic, shared with any
    /// `ScanView` built over this scan.
    #[must_use]
    pub fn modified_time_handle(&self) -> Arc<AtomicI64> {
        Arc::clone(&self.modified_time)
    }

    #[must_use]
    pub fn modified_time(&self) -> i64 {
        self.modified_time.load(Ordering::Relaxed)
    }

    /// Raise `modified_time` to `now` if it is not already at least that
    /// recent. Never moves it backwards.
    pub fn touch(&self) {
        let now = unix_nanos(SystemTime::now());
        self.modified_time.fetch_max(now, Ordering::Relaxed);
    }

    /// Whether the scan is active: its `modified_time` is within
    /// `scan_timeout` seconds of now.
    #[must_use]
    pub fn is_active(&self, scan_timeout_secs: u64) -> bool {
        let now = unix_nanos(SystemTime::now());
        let cutoff = now - (scan_timeout_secs as i64) * 1_000_000_000;
        self.modified_time() >= cutoff
    }

    /// Delete the scan directory recursively, then prune empty parent
    /// directories upward until `root` is reached or a non-empty directory
    /// is found.
    pub fn delete(&self) -> Result<()> {
        let full_path = self.full_path();
        std::fs::remove_dir_all(&full_path).map_err(|e| SendError::io(&full_path, e))?;

        let mut to_prune = full_path.parent().map(Path::to_path_buf);
        while let Some(dir) = to_prune {
            if dir == self.root || !dir.starts_with(&self.root) {
                break;
            }
            match std::fs::remove_dir(&dir) {
                Ok(()) => to_prune = dir.parent().map(Path::to_path_buf),
                Err(_) => break,
            }
        }
        Ok(())
    }
}

fn unix_nanos(time: SystemTime) -> i64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or(0)
}
