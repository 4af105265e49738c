//! `ScanView`: a refreshable snapshot of one scan directory's four file
//! classes, plus the gated next-unprocessed-pair query Processor relies on.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use glob::glob;

use crate::core::errors::Result;
use crate::model::ScanFile;
use crate::scan::scan::{DATA_PRODUCT_FILE, SCAN_COMPLETED_FILE, SCAN_CONFIG_FILE};

/// A triple of (data, weights, stats) files for one not-yet-processed
/// sequence number.
pub type UnprocessedTriple = (ScanFile, ScanFile, ScanFile);

/// Snapshot of one scan's data/weights/stats/config files.
pub struct ScanView {
    root: PathBuf,
    relative_path: PathBuf,
    modified_time: Arc<AtomicI64>,
    data_files: Vec<ScanFile>,
    weights_files: Vec<ScanFile>,
    stats_files: Vec<ScanFile>,
    config_files: Vec<ScanFile>,
}

impl ScanView {
    /// Build an empty view over `root.join(relative_path)`. Call
    /// `update_files()` to populate it before querying.
    #[must_use]
    pub fn new(root: PathBuf, relative_path: PathBuf, modified_time: Arc<AtomicI64>) -> Self {
        Self {
            root,
            relative_path,
            modified_time,
            data_files: Vec::new(),
            weights_files: Vec::new(),
            stats_files: Vec::new(),
            config_files: Vec::new(),
        }
    }

    /// Build a standalone view with its own private `modified_time`, for
    /// callers (e.g. the Transporter's remote side) that don't need it
    /// shared with a tracked `Scan`.
    #[must_use]
    pub fn standalone(root: PathBuf, relative_path: PathBuf) -> Self {
        Self::new(root, relative_path, Arc::new(AtomicI64::new(0)))
    }

    #[must_use]
    pub fn full_path(&self) -> PathBuf {
        self.root.join(&self.relative_path)
    }

    #[must_use]
    pub fn relative_path(&self) -> &Path {
        &self.relative_path
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
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

    #[must_use]
    pub fn data_files(&self) -> &[ScanFile] {
        &self.data_files
    }

    #[must_use]
    pub fn weights_files(&self) -> &[ScanFile] {
        &self.weights_files
    }

    /// Ensure the scan directory (and `data/`, `weights/` subdirectories)
    /// exist, creating them with permissive mode if absent. Used by the
    /// Transporter to prepare a fresh remote scan.
    pub fn ensure_exists(&self) -> Result<()> {
        for sub in ["data", "weights"] {
            crate::core::paths::create_dir_all_permissive(&self.full_path().join(sub))?;
        }
        Ok(())
    }

    /// Re-glob the scan directory and refresh the four file-class caches.
    /// Also raises the shared `modified_time` to the max of the scan
    /// directory's own mtime and every observed file mtime.
    pub fn update_files(&mut self) {
        let root = &self.root;
        let base = self.full_path();

        self.data_files = glob_sorted(&base.join("data/*.dada"), root);
        self.weights_files = glob_sorted(&base.join("weights/*.dada"), root);
        self.stats_files = glob_sorted(&base.join("stat/*.h5"), root);

        self.config_files = Vec::new();
        if self.data_product_file_exists() {
            self.config_files.push(ScanFile::new(base.join(DATA_PRODUCT_FILE), root));
        }
        if self.scan_config_file_exists() {
            self.config_files.push(ScanFile::new(base.join(SCAN_CONFIG_FILE), root));
        }

        let mut latest = dir_mtime_nanos(&base);
        for f in self
            .data_files
            .iter()
            .chain(&self.weights_files)
            .chain(&self.stats_files)
            .chain(&self.config_files)
        {
            if let Some(mtime) = f.mtime() {
                latest = latest.max(unix_nanos(mtime));
            }
        }
        self.modified_time.fetch_max(latest, Ordering::Relaxed);
    }

    /// Return the lowest-sequence (data, weights, stats-to-be) triple that
    /// has not yet been processed, is not in `unprocessable`, and whose
    /// inputs are both at least `minimum_age` seconds old. `None` if no such
    /// pair exists.
    #[must_use]
    pub fn next_unprocessed_file(
        &self,
        minimum_age: f64,
        unprocessable: &HashSet<PathBuf>,
    ) -> Option<UnprocessedTriple> {
        for data_file in &self.data_files {
            let Some(weights_file) = self
                .weights_files
                .iter()
                .find(|w| w.sequence == data_file.sequence)
            else {
                continue;
            };

            let stat_path = self.full_path().join("stat").join(format!("{}.h5", data_file.stem()));
            if unprocessable.contains(&stat_path) {
                continue;
            }
            if stat_path.exists() {
                continue;
            }
            if data_file.age_secs().min(weights_file.age_secs()) >= minimum_age {
                let stat_file = ScanFile::new(stat_path, &self.root);
                return Some((data_file.clone(), weights_file.clone(), stat_file));
            }
        }
        None
    }

    /// Sorted union of all four file classes.
    #[must_use]
    pub fn get_all_files(&self) -> Vec<ScanFile> {
        let mut all: Vec<ScanFile> = self
            .data_files
            .iter()
            .chain(&self.weights_files)
            .chain(&self.stats_files)
            .chain(&self.config_files)
            .cloned()
            .collect();
        all.sort();
        all
    }
}

fn glob_sorted(pattern: &Path, root: &Path) -> Vec<ScanFile> {
    let mut files: Vec<ScanFile> = glob(&pattern.to_string_lossy())
        .into_iter()
        .flatten()
        .filter_map(std::result::Result::ok)
        .map(|p| ScanFile::new(p, root))
        .collect();
    files.sort();
    files
}

fn dir_mtime_nanos(path: &Path) -> i64 {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map(unix_nanos)
        .unwrap_or(0)
}

fn unix_nanos(time: SystemTime) -> i64 {
    time.duration_since(UNIX_EPOCH).map(|d| d.as_nanos() as i64).unwrap_or(0)
}
