//! S4: once a scan finishes locally, the orchestrator asks the catalog to
//! reindex and polls `exists` with backoff until confirmed, only then
//! reclaiming the local copy.

mod common;

use std::sync::Arc;
use std::time::Duration;

use pst_send::prelude::*;

use common::{ScriptedCatalogClient, ScriptedStatsTool};

#[test]
fn waits_for_catalog_confirmation_before_reclaiming() {
    let local = tempfile::tempdir().unwrap();
    let remote = tempfile::tempdir().unwrap();
    let rel = common::scan_tree(local.path(), "eb-001", "pst-low", "scan-01");

    common::write_pair(local.path(), &rel, "000000");
    for entry in std::fs::read_dir(local.path().join(&rel).join("data")).unwrap() {
        common::write_required_header_keys(&entry.unwrap().path());
    }
    common::mark_complete(local.path(), &rel);

    let catalog = Arc::new(ScriptedCatalogClient::new(vec![false, false, true]));
    let signals = SignalHandler::default();
    let orchestrator = Orchestrator::with_tool(
        local.path().to_path_buf(),
        remote.path().to_path_buf(),
        "pst-low".to_string(),
        common::fast_timeouts(),
        Some(Arc::clone(&catalog) as Arc<dyn CatalogClient>),
        signals.clone(),
        Arc::new(ScriptedStatsTool::always_succeeds()),
    );

    let handle = std::thread::spawn(move || orchestrator.run());

    let scan_dir = local.path().join(&rel);
    let deadline = std::time::Instant::now() + Duration::from_secs(10);
    while scan_dir.exists() && std::time::Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(20));
    }

    signals.request_shutdown();
    handle.join().expect("orchestrator thread panicked").unwrap();

    assert!(!scan_dir.exists(), "scan should be reclaimed once the catalog confirms it");
    assert!(catalog.reindex_call_count() >= 1);
}
