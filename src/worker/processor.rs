//! `Processor`: per-scan loop that turns (data, weights) pairs into stats
//! files and, once the scan is complete, synthesizes its metadata document.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::core::errors::Result;
use crate::metadata::MetadataBuilder;
use crate::scan::ScanView;
use crate::worker::cancel::CancellationToken;

const EXTERNAL_TOOL: &str = "ska_pst_stat_file_proc";

/// Flags shared between a scan's Processor and Transporter so each can
/// observe the other's outcome and wind down together.
#[derive(Clone, Default)]
pub struct SiblingFlags {
    pub processing_failed: Arc<AtomicBool>,
    pub transfer_failed: Arc<AtomicBool>,
}

/// The external stats tool's contract: given a (data, weights) pair and the
/// scan root as working directory, `Ok(true)` means exit 0 (a stat file now
/// exists at the expected path), `Ok(false)` a clean non-zero exit, `Err`
/// only if the tool could not even be spawned.
///
/// Modeled as a trait — like `CatalogClient` — so Processor can be driven in
/// tests without a real `ska_pst_stat_file_proc` on `PATH`.
pub trait StatsTool: Send + Sync {
    fn run(&self, data: &Path, weights: &Path, cwd: &Path) -> Result<bool>;
}

/// Production `StatsTool`, invoking the real external binary.
#[derive(Default)]
pub struct ExternalStatsTool;

impl StatsTool for ExternalStatsTool {
    fn run(&self, data: &Path, weights: &Path, cwd: &Path) -> Result<bool> {
        let output = Command::new(EXTERNAL_TOOL)
            .arg("-d")
            .arg(data)
            .arg("-w")
            .arg(weights)
            .current_dir(cwd)
            .stdin(std::process::Stdio::null())
            .output()
            .map_err(|e| crate::core::errors::SendError::ToolExecution {
                command: EXTERNAL_TOOL,
                path: data.to_path_buf(),
                details: e.to_string(),
            })?;
        Ok(output.status.success())
    }
}

pub struct Processor {
    view: ScanView,
    eb_id: String,
    minimum_age_secs: f64,
    loop_wait: Duration,
    token: CancellationToken,
    flags: SiblingFlags,
    unprocessable: HashSet<PathBuf>,
    completed: Arc<AtomicBool>,
    tool: Arc<dyn StatsTool>,
}

impl Processor {
    #[must_use]
    pub fn new(
        view: ScanView,
        eb_id: String,
        minimum_age_secs: f64,
        loop_wait: Duration,
        token: CancellationToken,
        flags: SiblingFlags,
        completed: Arc<AtomicBool>,
    ) -> Self {
        Self::with_tool(
            view,
            eb_id,
            minimum_age_secs,
            loop_wait,
            token,
            flags,
            completed,
            Arc::new(ExternalStatsTool),
        )
    }

    /// As [`Processor::new`], but with an injectable [`StatsTool`] — used by
    /// tests to script the external tool's outcome per sequence.
    #[must_use]
    pub fn with_tool(
        view: ScanView,
        eb_id: String,
        minimum_age_secs: f64,
        loop_wait: Duration,
        token: CancellationToken,
        flags: SiblingFlags,
        completed: Arc<AtomicBool>,
        tool: Arc<dyn StatsTool>,
    ) -> Self {
        Self {
            view,
            eb_id,
            minimum_age_secs,
            loop_wait,
            token,
            flags,
            unprocessable: HashSet::new(),
            completed,
            tool,
        }
    }

    /// Run until completed, cancelled, the scan directory disappears, or
    /// the sibling Transporter reports failure.
    pub fn run(mut self) -> Result<()> {
        loop {
            if self.token.is_cancelled() {
                debug!(scan = %self.view.relative_path().display(), "processor exiting on cancellation");
                return Ok(());
            }
            if !self.view.path_exists() {
                debug!(scan = %self.view.relative_path().display(), "processor exiting: scan directory gone");
                return Ok(());
            }
            if self.flags.transfer_failed.load(Ordering::Relaxed) {
                warn!(scan = %self.view.relative_path().display(), "processor exiting: transporter failed");
                return Ok(());
            }

            self.view.update_files();

            if let Some((data, weights, stat)) = self
                .view
                .next_unprocessed_file(self.minimum_age_secs, &self.unprocessable)
            {
                match self.process_one(&data.absolute_path, &weights.absolute_path) {
                    Ok(true) => {
                        info!(
                            scan = %self.view.relative_path().display(),
                            sequence = data.sequence,
                            "stats file produced"
                        );
                    }
                    Ok(false) => {
                        warn!(
                            scan = %self.view.relative_path().display(),
                            sequence = data.sequence,
                            "stats tool reported failure; sequence marked unprocessable"
                        );
                        self.unprocessable.insert(stat.absolute_path.clone());
                    }
                    Err(e) => {
                        warn!(scan = %self.view.relative_path().display(), error = %e, "processor failed unexpectedly");
                        self.flags.processing_failed.store(true, Ordering::Relaxed);
                        return Ok(());
                    }
                }
                self.view.update_files();
            }

            // Unprocessable sequences block metadata synthesis: `next_unprocessed_file`
            // treats them as skipped-not-done, so an empty `unprocessable` set is
            // required in addition to no remaining pairs.
            if self.view.is_complete()
                && self.unprocessable.is_empty()
                && self
                    .view
                    .next_unprocessed_file(0.0, &self.unprocessable)
                    .is_none()
            {
                match self.synthesize_metadata() {
                    Ok(()) => {
                        info!(scan = %self.view.relative_path().display(), "metadata synthesized");
                        self.completed.store(true, Ordering::Relaxed);
                        return Ok(());
                    }
                    Err(e) => {
                        // A malformed header is fatal for this file but not for the
                        // daemon: log it, leave the scan in place, and wind down like
                        // any other processing failure so the sibling Transporter
                        // also stops rather than racing a half-finished scan.
                        warn!(scan = %self.view.relative_path().display(), error = %e, "metadata synthesis failed");
                        self.flags.processing_failed.store(true, Ordering::Relaxed);
                        return Ok(());
                    }
                }
            }

            if self.token.wait_timeout(self.loop_wait) {
                return Ok(());
            }
        }
    }

    fn synthesize_metadata(&self) -> Result<()> {
        let doc = MetadataBuilder::build(&self.eb_id, &self.view)?;
        MetadataBuilder::write(&self.view.full_path(), &doc)
    }

    /// Invoke the external stats tool. `Ok(true)` on success (exit 0),
    /// `Ok(false)` on a clean non-zero exit (recoverable, per-sequence
    /// failure), `Err` only if the tool could not be spawned at all.
    fn process_one(&self, data: &std::path::Path, weights: &std::path::Path) -> Result<bool> {
        debug!(?data, ?weights, "invoking stats tool");
        self.tool.run(data, weights, &self.view.full_path())
    }
}
