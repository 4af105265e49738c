//! `Transporter`: per-scan loop that mirrors local files to the remote
//! filesystem, preserving relative layout.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::core::errors::{Result, SendError};
use crate::core::paths::create_dir_all_permissive;
use crate::scan::ScanView;
use crate::worker::cancel::CancellationToken;
use crate::worker::processor::SiblingFlags;

/// Cancellation is checked per-file at this granularity, tighter than
/// `loop_wait`, so a large batch of files doesn't delay shutdown.
const PER_FILE_POLL: Duration = Duration::from_millis(100);

pub struct Transporter {
    local: ScanView,
    remote: ScanView,
    minimum_age_secs: f64,
    loop_wait: Duration,
    token: CancellationToken,
    flags: SiblingFlags,
    completed: Arc<AtomicBool>,
}

impl Transporter {
    #[must_use]
    pub fn new(
        local: ScanView,
        remote: ScanView,
        minimum_age_secs: f64,
        loop_wait: Duration,
        token: CancellationToken,
        flags: SiblingFlags,
        completed: Arc<AtomicBool>,
    ) -> Self {
        Self {
            local,
            remote,
            minimum_age_secs,
            loop_wait,
            token,
            flags,
            completed,
        }
    }

    pub fn run(mut self) -> Result<()> {
        loop {
            if self.token.is_cancelled() {
                debug!(scan = %self.local.relative_path().display(), "transporter exiting on cancellation");
                return Ok(());
            }
            if self.flags.processing_failed.load(Ordering::Relaxed) {
                warn!(scan = %self.local.relative_path().display(), "transporter exiting: processor failed");
                return Ok(());
            }

            self.local.update_files();
            self.remote.update_files();

            match self.transfer_pending() {
                Ok(()) => {}
                Err(e) => {
                    warn!(scan = %self.local.relative_path().display(), error = %e, "transporter failed unexpectedly");
                    self.flags.transfer_failed.store(true, Ordering::Relaxed);
                    return Ok(());
                }
            }

            if self.token.is_cancelled() {
                return Ok(());
            }

            self.local.update_files();
            self.remote.update_files();
            let nothing_pending = self.untransferred(0.0).is_empty();
            if self.local.is_complete() && self.local.data_product_file_exists() && nothing_pending {
                self.completed.store(true, Ordering::Relaxed);
                info!(scan = %self.local.relative_path().display(), "transfer completed");
                return Ok(());
            }

            if self.token.wait_timeout(self.loop_wait) {
                return Ok(());
            }
        }
    }

    /// Files present locally but not on the remote, by `ScanFile` equality,
    /// old enough to be eligible, in ascending sequence order.
    fn untransferred(&self, minimum_age_secs: f64) -> Vec<crate::model::ScanFile> {
        let mut pending: Vec<_> = self
            .local
            .get_all_files()
            .into_iter()
            .filter(|f| f.age_secs() >= minimum_age_secs)
            .filter(|f| !self.remote.get_all_files().iter().any(|r| r == f))
            .collect();
        pending.sort();
        pending
    }

    fn transfer_pending(&mut self) -> Result<()> {
        for file in self.untransferred(self.minimum_age_secs) {
            if self.token.wait_timeout(PER_FILE_POLL) {
                return Ok(());
            }

            // `file.relative_path` is already relative to the data-product
            // root (it includes the eb/subsystem/scan prefix), so joining it
            // onto the remote root lands at the matching remote location.
            let remote_path = self.remote.root().join(&file.relative_path);
            if let Some(parent) = remote_path.parent() {
                create_dir_all_permissive(parent)?;
            }
            std::fs::copy(&file.absolute_path, &remote_path).map_err(|e| SendError::io(&remote_path, e))?;
            debug!(path = %file.relative_path.display(), "copied file to remote");
            self.local.update_files();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::scan::{DATA_PRODUCT_FILE, SCAN_COMPLETED_FILE};
    use std::sync::atomic::AtomicBool;

    fn rel() -> std::path::PathBuf {
        std::path::PathBuf::from("eb-001/pst-low/scan-01")
    }

    fn scan_tree(root: &std::path::Path) {
        std::fs::create_dir_all(root.join(rel()).join("data")).unwrap();
        std::fs::create_dir_all(root.join(rel()).join("weights")).unwrap();
        std::fs::create_dir_all(root.join(rel()).join("stat")).unwrap();
    }

    fn write(root: &std::path::Path, rel_path: &str, content: &[u8]) {
        let path = root.join(rel_path);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn transfers_all_files_and_completes() {
        let local_root = tempfile::tempdir().unwrap();
        let remote_root = tempfile::tempdir().unwrap();
        scan_tree(local_root.path());

        let stem = "2024-01-01-00:00:00_0_000000";
        write(local_root.path(), &format!("eb-001/pst-low/scan-01/data/{stem}.dada"), b"data");
        write(local_root.path(), &format!("eb-001/pst-low/scan-01/weights/{stem}.dada"), b"w");
        write(local_root.path(), &format!("eb-001/pst-low/scan-01/stat/{stem}.h5"), b"stats");
        write(
            local_root.path(),
            &format!("eb-001/pst-low/scan-01/{DATA_PRODUCT_FILE}"),
            b"interface: x",
        );
        write(local_root.path(), &format!("eb-001/pst-low/scan-01/{SCAN_COMPLETED_FILE}"), b"");

        let local = ScanView::standalone(local_root.path().to_path_buf(), rel());
        let remote = ScanView::standalone(remote_root.path().to_path_buf(), rel());
        remote.ensure_exists().unwrap();

        let completed = Arc::new(AtomicBool::new(false));
        let transporter = Transporter::new(
            local,
            remote,
            0.0,
            Duration::from_millis(10),
            CancellationToken::new(),
            SiblingFlags::default(),
            Arc::clone(&completed),
        );
        transporter.run().unwrap();

        assert!(completed.load(Ordering::Relaxed));
        for suffix in [
            format!("data/{stem}.dada"),
            format!("weights/{stem}.dada"),
            format!("stat/{stem}.h5"),
            DATA_PRODUCT_FILE.to_string(),
        ] {
            assert!(
                remote_root.path().join("eb-001/pst-low/scan-01").join(&suffix).exists(),
                "expected {suffix} to have been mirrored to remote"
            );
        }
    }

    #[test]
    fn cancellation_stops_transfer_before_remaining_files_copy() {
        let local_root = tempfile::tempdir().unwrap();
        let remote_root = tempfile::tempdir().unwrap();
        scan_tree(local_root.path());

        for seq in ["000000", "000001", "000002"] {
            let stem = format!("2024-01-01-00:00:00_0_{seq}");
            write(local_root.path(), &format!("eb-001/pst-low/scan-01/data/{stem}.dada"), b"data");
            write(local_root.path(), &format!("eb-001/pst-low/scan-01/weights/{stem}.dada"), b"w");
        }

        let local = ScanView::standalone(local_root.path().to_path_buf(), rel());
        let remote = ScanView::standalone(remote_root.path().to_path_buf(), rel());
        remote.ensure_exists().unwrap();

        let token = CancellationToken::new();
        token.cancel();

        let completed = Arc::new(AtomicBool::new(false));
        let transporter = Transporter::new(
            local,
            remote,
            0.0,
            Duration::from_millis(10),
            token,
            SiblingFlags::default(),
            Arc::clone(&completed),
        );
        transporter.run().unwrap();

        assert!(!completed.load(Ordering::Relaxed));
        assert!(
            !remote_root
                .path()
                .join("eb-001/pst-low/scan-01/data/2024-01-01-00:00:00_0_000000.dada")
                .exists(),
            "an already-cancelled token must stop the transfer before any file copies"
        );
    }
}
