//! Shared scaffolding for integration tests: a synthetic eb/subsystem/scan
//! tree builder plus scripted `StatsTool`/`CatalogClient` fakes, so the full
//! Orchestrator loop can be driven without a real stats binary or catalog
//! server.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use pst_send::prelude::*;

/// Create `<root>/<eb>/<subsystem>/<scan>/{data,weights,stat}` and return the
/// scan's relative path.
pub fn scan_tree(root: &Path, eb: &str, subsystem: &str, scan: &str) -> PathBuf {
    let rel = PathBuf::from(eb).join(subsystem).join(scan);
    std::fs::create_dir_all(root.join(&rel).join("data")).unwrap();
    std::fs::create_dir_all(root.join(&rel).join("weights")).unwrap();
    std::fs::create_dir_all(root.join(&rel).join("stat")).unwrap();
    rel
}

/// Write a (data, weights) pair for `seq` (a zero-padded 6-digit string) and
/// return the shared file stem.
pub fn write_pair(root: &Path, rel: &Path, seq: &str) -> String {
    let stem = format!("2024-01-01-00:00:00_0_{seq}");
    std::fs::write(root.join(rel).join("data").join(format!("{stem}.dada")), b"data").unwrap();
    std::fs::write(root.join(rel).join("weights").join(format!("{stem}.dada")), b"w").unwrap();
    stem
}

/// Overwrite a data file with a minimal but complete ASCII header, carrying
/// every key `MetadataBuilder` requires.
pub fn write_required_header_keys(path: &Path) {
    let lines = [
        "HDR_SIZE 4096",
        "OBSERVER test-observer",
        "SOURCE J1234-5678",
        "SCAN_ID scan-01",
        "UTC_START 2024-01-01-00:00:00",
        "TSAMP 1.0",
        "TELESCOPE SKALOW",
        "NCHAN 1",
        "FREQ 100.0",
        "BW 10.0",
        "NPOL 2",
        "STT_CRD1 12:00:00",
        "STT_CRD2 -45:00:00",
    ];
    let mut buf = vec![0u8; 4096];
    let text = lines.join("\n");
    buf[..text.len()].copy_from_slice(text.as_bytes());
    std::fs::write(path, buf).unwrap();
}

/// Mark a scan's recording phase finished.
pub fn mark_complete(root: &Path, rel: &Path) {
    std::fs::write(root.join(rel).join("scan_completed"), b"").unwrap();
}

/// Timeouts tuned for fast, deterministic tests: zero-second waits turn
/// every wait into an immediate poll, so tests are bounded by actual file
/// I/O rather than sleeping.
pub fn fast_timeouts() -> Timeouts {
    Timeouts {
        loop_wait_secs: 0,
        minimum_age_secs: 0,
        cond_timeout_secs: 0,
        scan_timeout_secs: 300,
        catalog_poll_initial_secs: 0,
        catalog_poll_factor: 2.0,
        catalog_poll_cap_secs: 2,
    }
}

/// A fake `StatsTool` scripted per data-file stem: `Ok(true)` writes the
/// expected stat file (mirroring the real tool's side effect), `Ok(false)`
/// leaves the sequence permanently unprocessable.
pub struct ScriptedStatsTool {
    outcomes: HashMap<String, bool>,
}

impl ScriptedStatsTool {
    pub fn new(outcomes: HashMap<String, bool>) -> Self {
        Self { outcomes }
    }

    pub fn always_succeeds() -> Self {
        Self::new(HashMap::new())
    }
}

impl StatsTool for ScriptedStatsTool {
    fn run(&self, data: &Path, weights: &Path, cwd: &Path) -> pst_send::prelude::Result<bool> {
        let _ = weights;
        let stem = data.file_stem().unwrap().to_string_lossy().into_owned();
        let ok = *self.outcomes.get(&stem).unwrap_or(&true);
        if ok {
            let stat_path = cwd.join("stat").join(format!("{stem}.h5"));
            std::fs::write(stat_path, b"fake-stats").unwrap();
        }
        Ok(ok)
    }
}

/// A fake `CatalogClient` whose `exists` answers are consumed in order,
/// falling back to `true` once exhausted, so tests can script a bounded
/// number of not-yet-indexed responses before confirmation. `reindex` fails
/// for a configurable number of leading calls before succeeding, so tests
/// can exercise the orchestrator's per-scan error recovery.
pub struct ScriptedCatalogClient {
    reindex_calls: Mutex<u32>,
    reindex_failures_remaining: Mutex<u32>,
    exists_answers: Mutex<Vec<bool>>,
}

impl ScriptedCatalogClient {
    pub fn new(exists_answers: Vec<bool>) -> Self {
        Self {
            reindex_calls: Mutex::new(0),
            reindex_failures_remaining: Mutex::new(0),
            exists_answers: Mutex::new(exists_answers),
        }
    }

    pub fn with_reindex_failures(exists_answers: Vec<bool>, failures: u32) -> Self {
        Self {
            reindex_calls: Mutex::new(0),
            reindex_failures_remaining: Mutex::new(failures),
            exists_answers: Mutex::new(exists_answers),
        }
    }

    pub fn reindex_call_count(&self) -> u32 {
        *self.reindex_calls.lock().unwrap()
    }
}

impl CatalogClient for ScriptedCatalogClient {
    fn reindex(&self) -> pst_send::prelude::Result<()> {
        *self.reindex_calls.lock().unwrap() += 1;
        let mut remaining = self.reindex_failures_remaining.lock().unwrap();
        if *remaining > 0 {
            *remaining -= 1;
            return Err(pst_send::prelude::SendError::CatalogHttp {
                endpoint: "reindexdataproducts",
                details: "scripted transient failure".to_string(),
            });
        }
        Ok(())
    }

    fn exists(&self, _search_value: &str) -> pst_send::prelude::Result<bool> {
        let mut answers = self.exists_answers.lock().unwrap();
        if answers.is_empty() {
            Ok(true)
        } else {
            Ok(answers.remove(0))
        }
    }
}
