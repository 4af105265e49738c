//! `ScanManager`: tracks the scans discovered under a data-product root and
//! chooses which one the orchestrator should work on next.

use std::cmp::Ordering;
use std::path::PathBuf;

use glob::glob;

use crate::core::errors::Result;
use crate::scan::scan::Scan;

/// Tracks known scans for one subsystem under a data-product root.
pub struct ScanManager {
    root: PathBuf,
    subsystem_id: String,
    scans: Vec<Scan>,
}

impl ScanManager {
    /// Create a manager and perform an initial `refresh()`.
    pub fn new(root: PathBuf, subsystem_id: String) -> Result<Self> {
        let mut manager = Self {
            root,
            subsystem_id,
            scans: Vec::new(),
        };
        manager.refresh()?;
        Ok(manager)
    }

    /// Re-glob `eb-*/<subsystem_id>/*`, add newly-discovered scans, drop
    /// scans whose directory has disappeared, and sort by the scan
    /// comparator (§4.7).
    pub fn refresh(&mut self) -> Result<()> {
        let pattern = self.root.join("eb-*").join(&self.subsystem_id).join("*");
        let current: Vec<PathBuf> = glob(&pattern.to_string_lossy())
            .into_iter()
            .flatten()
            .filter_map(std::result::Result::ok)
            .filter(|p| p.is_dir())
            .collect();

        let known: std::collections::HashSet<PathBuf> =
            self.scans.iter().map(Scan::full_path).collect();

        for path in &current {
            if !known.contains(path) {
                let relative = path.strip_prefix(&self.root).unwrap_or(path).to_path_buf();
                let scan = Scan::new(self.root.clone(), relative)?;
                self.scans.push(scan);
            }
        }

        let current_set: std::collections::HashSet<&PathBuf> = current.iter().collect();
        self.scans
            .retain(|s| s.path_exists() && current_set.contains(&s.full_path()));

        self.scans.sort_by(compare_scans);
        Ok(())
    }

    #[must_use]
    pub fn scans(&self) -> &[Scan] {
        &self.scans
    }

    /// Preference order: oldest active scan; else oldest inactive scan;
    /// else none. "Active" means `modified_time >= now - scan_timeout`.
    #[must_use]
    pub fn next_unprocessed_scan(&self, scan_timeout_secs: u64) -> Option<&Scan> {
        self.scans
            .iter()
            .find(|s| s.is_active(scan_timeout_secs))
            .or_else(|| self.scans.first())
    }
}

/// Tie-break order: `modified_time` asc, `created_time` asc, `scan_id` asc,
/// `eb_id` asc.
fn compare_scans(a: &Scan, b: &Scan) -> Ordering {
    a.modified_time()
        .cmp(&b.modified_time())
        .then_with(|| a.created_time.cmp(&b.created_time))
        .then_with(|| a.scan_id.cmp(&b.scan_id))
        .then_with(|| a.eb_id.cmp(&b.eb_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    fn mk(root: &std::path::Path, eb: &str, sub: &str, scan: &str) {
        std::fs::create_dir_all(root.join(eb).join(sub).join(scan)).unwrap();
    }

    #[test]
    fn refresh_discovers_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        mk(dir.path(), "eb-001", "pst-low", "scan-b");
        mk(dir.path(), "eb-001", "pst-low", "scan-a");

        let manager = ScanManager::new(dir.path().to_path_buf(), "pst-low".to_string()).unwrap();
        assert_eq!(manager.scans().len(), 2);
    }

    #[test]
    fn refresh_ignores_other_subsystems() {
        let dir = tempfile::tempdir().unwrap();
        mk(dir.path(), "eb-001", "pst-low", "scan-a");
        mk(dir.path(), "eb-001", "pst-mid", "scan-b");

        let manager = ScanManager::new(dir.path().to_path_buf(), "pst-low".to_string()).unwrap();
        assert_eq!(manager.scans().len(), 1);
        assert_eq!(manager.scans()[0].scan_id, "scan-a");
    }

    #[test]
    fn refresh_drops_deleted_scans() {
        let dir = tempfile::tempdir().unwrap();
        mk(dir.path(), "eb-001", "pst-low", "scan-a");
        let mut manager = ScanManager::new(dir.path().to_path_buf(), "pst-low".to_string()).unwrap();
        assert_eq!(manager.scans().len(), 1);

        std::fs::remove_dir_all(dir.path().join("eb-001").join("pst-low").join("scan-a")).unwrap();
        manager.refresh().unwrap();
        assert_eq!(manager.scans().len(), 0);
    }

    #[test]
    fn next_unprocessed_scan_prefers_active_over_inactive() {
        let dir = tempfile::tempdir().unwrap();
        mk(dir.path(), "eb-001", "pst-low", "scan-old");
        sleep(Duration::from_millis(5));
        mk(dir.path(), "eb-001", "pst-low", "scan-new");

        let manager = ScanManager::new(dir.path().to_path_buf(), "pst-low".to_string()).unwrap();
        // Both scans are freshly touched (just created), both active; tie-break
        // by created_time then picks the earlier one.
        let chosen = manager.next_unprocessed_scan(300).unwrap();
        assert_eq!(chosen.scan_id, "scan-old");
    }

    #[test]
    fn next_unprocessed_scan_none_when_empty() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ScanManager::new(dir.path().to_path_buf(), "pst-low".to_string()).unwrap();
        assert!(manager.next_unprocessed_scan(300).is_none());
    }
}
