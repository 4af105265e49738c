//! `ScanFile`: a value object for one file belonging to a scan.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// One data, weights, stats, or config file within a scan.
///
/// Equality and ordering follow spec: equality is `(sequence, size,
/// relative_path)`; ordering is by sequence number alone.
#[derive(Debug, Clone)]
pub struct ScanFile {
    pub absolute_path: PathBuf,
    pub relative_path: PathBuf,
    pub sequence: u64,
    pub size: u64,
    mtime: Option<SystemTime>,
}

impl ScanFile {
    /// Build a `ScanFile` from an absolute path, relative to `root`.
    ///
    /// Reads filesystem metadata eagerly; a missing file yields `size = 0`
    /// and `age = -1`.
    #[must_use]
    pub fn new(absolute_path: PathBuf, root: &Path) -> Self {
        let relative_path = absolute_path
            .strip_prefix(root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| absolute_path.clone());
        let sequence = parse_sequence(&absolute_path);

        let (size, mtime) = match std::fs::metadata(&absolute_path) {
            Ok(meta) => (meta.len(), meta.modified().ok()),
            Err(_) => (0, None),
        };

        Self {
            absolute_path,
            relative_path,
            sequence,
            size,
            mtime,
        }
    }

    #[must_use]
    pub fn exists(&self) -> bool {
        self.absolute_path.exists()
    }

    /// Age in seconds since last modification, or -1 if the file is missing.
    #[must_use]
    pub fn age_secs(&self) -> f64 {
        match self.mtime {
            Some(mtime) => mtime
                .elapsed()
                .map(|d| d.as_secs_f64())
                .unwrap_or(0.0),
            None => -1.0,
        }
    }

    #[must_use]
    pub fn mtime(&self) -> Option<SystemTime> {
        self.mtime
    }

    /// The stem of the file name (no extension), used to derive the
    /// corresponding stats file path.
    #[must_use]
    pub fn stem(&self) -> std::borrow::Cow<'_, str> {
        self.absolute_path
            .file_stem()
            .map(|s| s.to_string_lossy())
            .unwrap_or_default()
    }
}

impl PartialEq for ScanFile {
    fn eq(&self, other: &Self) -> bool {
        self.sequence == other.sequence
            && self.size == other.size
            && self.relative_path == other.relative_path
    }
}
impl Eq for ScanFile {}

impl PartialOrd for ScanFile {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for ScanFile {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.sequence.cmp(&other.sequence)
    }
}

/// Parse the trailing `NNNNNN` sequence number from a `<UTC>_<offset>_<NNNNNN>`
/// file stem. Returns 0 if the stem does not have exactly three
/// underscore-separated parts or the last does not parse as an integer.
fn parse_sequence(path: &Path) -> u64 {
    let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
        return 0;
    };
    let parts: Vec<&str> = stem.split('_').collect();
    if parts.len() != 3 {
        return 0;
    }
    parts[2].parse().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_sequence() {
        let path = Path::new("/root/data/2024-01-01-00:00:00_0_000042.dada");
        assert_eq!(parse_sequence(path), 42);
    }

    #[test]
    fn non_matching_shape_yields_zero() {
        assert_eq!(parse_sequence(Path::new("/root/data/scan_completed")), 0);
        assert_eq!(parse_sequence(Path::new("/root/data/too_many_parts_here_x.dada")), 0);
        assert_eq!(parse_sequence(Path::new("/root/data/a_b_notanumber.dada")), 0);
    }

    #[test]
    fn equality_ignores_absolute_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x_0_000001.dada");
        std::fs::write(&path, b"hello").unwrap();

        let a = ScanFile::new(path.clone(), dir.path());
        let b = ScanFile::new(path, dir.path());
        assert_eq!(a, b);
    }

    #[test]
    fn missing_file_has_zero_size_and_negative_age() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("x_0_000001.dada");
        let f = ScanFile::new(missing, dir.path());
        assert_eq!(f.size, 0);
        assert!(f.age_secs() < 0.0);
    }

    #[test]
    fn ordering_is_by_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let p1 = dir.path().join("x_0_000001.dada");
        let p2 = dir.path().join("x_0_000002.dada");
        std::fs::write(&p1, b"a").unwrap();
        std::fs::write(&p2, b"b").unwrap();

        let mut files = vec![ScanFile::new(p2, dir.path()), ScanFile::new(p1, dir.path())];
        files.sort();
        assert_eq!(files[0].sequence, 1);
        assert_eq!(files[1].sequence, 2);
    }
}
