//! `Orchestrator`: the top-level loop tying `ScanManager`, `Processor`,
//! `Transporter` and `CatalogClient` together for one subsystem root.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::catalog::CatalogClient;
use crate::core::config::Timeouts;
use crate::core::errors::Result;
use crate::daemon::signals::SignalHandler;
use crate::scan::{Scan, ScanManager, ScanView};
use crate::worker::{CancellationToken, ExternalStatsTool, Processor, SiblingFlags, StatsTool, Transporter};

/// Top-level loop: repeatedly picks the next scan to work, runs its
/// Processor and Transporter to completion, and hands the finished scan off
/// to the catalog before reclaiming its local copy.
pub struct Orchestrator {
    local_root: PathBuf,
    remote_root: PathBuf,
    subsystem_id: String,
    timeouts: Timeouts,
    catalog: Option<Arc<dyn CatalogClient>>,
    signals: SignalHandler,
    tool: Arc<dyn StatsTool>,
}

impl Orchestrator {
    #[must_use]
    pub fn new(
        local_root: PathBuf,
        remote_root: PathBuf,
        subsystem_id: String,
        timeouts: Timeouts,
        catalog: Option<Arc<dyn CatalogClient>>,
        signals: SignalHandler,
    ) -> Self {
        Self::with_tool(
            local_root,
            remote_root,
            subsystem_id,
            timeouts,
            catalog,
            signals,
            Arc::new(ExternalStatsTool),
        )
    }

    /// As [`Orchestrator::new`], but with an injectable [`StatsTool`] — used
    /// by integration tests to drive the full scan/process/transfer/catalog
    /// loop without a real `ska_pst_stat_file_proc` on `PATH`.
    #[must_use]
    pub fn with_tool(
        local_root: PathBuf,
        remote_root: PathBuf,
        subsystem_id: String,
        timeouts: Timeouts,
        catalog: Option<Arc<dyn CatalogClient>>,
        signals: SignalHandler,
        tool: Arc<dyn StatsTool>,
    ) -> Self {
        Self {
            local_root,
            remote_root,
            subsystem_id,
            timeouts,
            catalog,
            signals,
            tool,
        }
    }

    /// Run until `SignalHandler` reports a shutdown request.
    pub fn run(&self) -> Result<()> {
        let mut manager = ScanManager::new(self.local_root.clone(), self.subsystem_id.clone())?;
        let top_level_token = CancellationToken::default();

        loop {
            if self.signals.should_shutdown() {
                info!("shutdown requested, exiting orchestrator loop");
                return Ok(());
            }

            manager.refresh()?;
            let Some(scan) = manager.next_unprocessed_scan(self.timeouts.scan_timeout_secs) else {
                if self.signals.should_shutdown() {
                    return Ok(());
                }
                if top_level_token.wait_timeout(self.timeouts.cond_timeout()) {
                    return Ok(());
                }
                continue;
            };

            info!(scan = %scan.relative_path.display(), "scan selected for processing");
            // A single scan's failure (a bad header, a catalog hiccup, a
            // violated invariant) must not bring down the daemon: log it and
            // leave the scan in place for the next iteration to retry, per
            // spec's per-scan error handling design.
            if let Err(e) = self.run_one(scan) {
                warn!(scan = %scan.relative_path.display(), error = %e, "scan iteration failed, will retry next loop");
            }
        }
    }

    fn run_one(&self, scan: &Scan) -> Result<()> {
        let local_view = ScanView::new(
            self.local_root.clone(),
            scan.relative_path.clone(),
            scan.modified_time_handle(),
        );
        let remote_view = ScanView::standalone(self.remote_root.clone(), scan.relative_path.clone());
        remote_view.ensure_exists()?;

        let flags = SiblingFlags::default();
        let token = CancellationToken::default();
        let processor_completed = Arc::new(AtomicBool::new(false));
        let transporter_completed = Arc::new(AtomicBool::new(false));

        let processor = Processor::with_tool(
            local_view,
            scan.eb_id.clone(),
            self.timeouts.minimum_age_secs as f64,
            self.timeouts.loop_wait(),
            token.clone(),
            flags.clone(),
            Arc::clone(&processor_completed),
            Arc::clone(&self.tool),
        );
        let transporter_local = ScanView::new(
            self.local_root.clone(),
            scan.relative_path.clone(),
            scan.modified_time_handle(),
        );
        let transporter = Transporter::new(
            transporter_local,
            remote_view,
            self.timeouts.minimum_age_secs as f64,
            self.timeouts.loop_wait(),
            token.clone(),
            flags,
            Arc::clone(&transporter_completed),
        );

        let signals = self.signals.clone();
        let watchdog_token = token.clone();
        let watchdog = std::thread::spawn(move || {
            while !signals.should_shutdown() {
                if watchdog_token.wait_timeout(Duration::from_millis(200)) {
                    return;
                }
            }
            watchdog_token.cancel();
        });

        let processor_handle = std::thread::spawn(move || processor.run());
        let transporter_handle = std::thread::spawn(move || transporter.run());

        let processor_result = processor_handle.join().expect("processor thread panicked");
        let transporter_result = transporter_handle.join().expect("transporter thread panicked");
        token.cancel();
        let _ = watchdog.join();

        processor_result?;
        transporter_result?;

        if processor_completed.load(Ordering::Relaxed) && transporter_completed.load(Ordering::Relaxed) {
            self.finalize(scan)?;
        } else {
            debug!(scan = %scan.relative_path.display(), "scan not yet complete, will retry next iteration");
        }

        scan.touch();
        Ok(())
    }

    fn finalize(&self, scan: &Scan) -> Result<()> {
        let remote_view = ScanView::standalone(self.remote_root.clone(), scan.relative_path.clone());

        let Some(catalog) = &self.catalog else {
            scan.delete()?;
            info!(scan = %scan.relative_path.display(), "catalog disabled, local scan deleted");
            return Ok(());
        };

        if !scan.data_product_file_exists() || !remote_view.data_product_file_exists() {
            return Err(crate::core::errors::SendError::InvariantViolation {
                details: format!(
                    "scan {} reported both workers completed but a metadata document is missing locally or remotely",
                    scan.relative_path.display()
                ),
            });
        }

        let search_value = remote_view
            .relative_path()
            .join(crate::scan::scan::DATA_PRODUCT_FILE)
            .to_string_lossy()
            .into_owned();

        catalog.reindex()?;
        info!(scan = %scan.relative_path.display(), "catalog reindex requested");

        if self.poll_catalog_confirmed(catalog.as_ref(), &search_value) {
            scan.delete()?;
            info!(scan = %scan.relative_path.display(), "catalog confirmed, local scan deleted");
        } else {
            warn!(
                scan = %scan.relative_path.display(),
                "catalog did not confirm within budget, leaving scan in place for operator intervention"
            );
        }
        Ok(())
    }

    /// Poll `catalog.exists` with exponential backoff until it returns true
    /// or the configured time budget is exhausted.
    fn poll_catalog_confirmed(&self, catalog: &dyn CatalogClient, search_value: &str) -> bool {
        let start = Instant::now();
        let mut interval = Duration::from_secs(self.timeouts.catalog_poll_initial_secs);
        let budget = self.timeouts.catalog_poll_cap();

        loop {
            match catalog.exists(search_value) {
                Ok(true) => return true,
                Ok(false) => {}
                Err(e) => warn!(error = %e, "catalog exists() call failed, will retry"),
            }

            if start.elapsed() >= budget {
                return false;
            }

            std::thread::sleep(interval.min(budget.saturating_sub(start.elapsed())));
            interval = Duration::from_secs_f64(interval.as_secs_f64() * self.timeouts.catalog_poll_factor);
        }
    }
}
