//! S6: a scan left behind by a previous (e.g. crashed) run of the daemon —
//! complete on disk but with a `modified_time` far older than the active
//! window — is still picked up and driven to completion rather than being
//! starved in favor of scans that never appear.

mod common;

use std::sync::Arc;
use std::time::Duration;

use filetime::FileTime;
use pst_send::prelude::*;

use common::ScriptedStatsTool;

fn backdate(path: &std::path::Path, when: FileTime) {
    filetime::set_file_mtime(path, when).unwrap();
}

fn backdate_tree(root: &std::path::Path) {
    let long_ago = FileTime::from_unix_time(1_000_000_000, 0);
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in std::fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                stack.push(path.clone());
            }
            backdate(&path, long_ago);
        }
        backdate(&dir, long_ago);
    }
}

#[test]
fn stale_but_complete_scan_is_still_selected_and_finalized() {
    let local = tempfile::tempdir().unwrap();
    let remote = tempfile::tempdir().unwrap();
    let rel = common::scan_tree(local.path(), "eb-001", "pst-low", "scan-01");

    common::write_pair(local.path(), &rel, "000000");
    for entry in std::fs::read_dir(local.path().join(&rel).join("data")).unwrap() {
        common::write_required_header_keys(&entry.unwrap().path());
    }
    common::mark_complete(local.path(), &rel);
    backdate_tree(&local.path().join(&rel));

    let mut manager = ScanManager::new(local.path().to_path_buf(), "pst-low".to_string()).unwrap();
    manager.refresh().unwrap();
    let scan = manager.next_unprocessed_scan(1).expect("a lone stale scan must still be returned");
    assert!(!scan.is_active(1), "the scan should genuinely read as stale, not freshly active");

    let mut timeouts = common::fast_timeouts();
    timeouts.scan_timeout_secs = 1;

    let signals = SignalHandler::default();
    let orchestrator = Orchestrator::with_tool(
        local.path().to_path_buf(),
        remote.path().to_path_buf(),
        "pst-low".to_string(),
        timeouts,
        None,
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

    assert!(!scan_dir.exists(), "a stale-but-complete scan must still be driven to completion and reclaimed");
    assert!(remote.path().join(&rel).join("ska-data-product.yaml").exists());
}
