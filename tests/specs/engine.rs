// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Manual triggering and shutdown of the sync engine.

use mirror_config::MirrorsFile;
use mirror_core::SystemClock;
use mirror_sync::{SyncEngine, SyncSettings, TaskStatus};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

fn mirrors(command: &str) -> MirrorsFile {
    let raw = format!(
        r#"{{"mirrors": {{"demo": {{
            "name": "Demo",
            "script": {{"command": "sh", "arguments": ["-c", {}], "syncs_per_day": 1}}
        }}}}}}"#,
        serde_json::to_string(command).unwrap(),
    );
    MirrorsFile::from_str(&raw).unwrap()
}

#[tokio::test]
async fn manual_trigger_runs_exactly_once_and_shutdown_is_prompt() {
    let dir = tempfile::tempdir().unwrap();
    let settings = SyncSettings {
        log_dir: Some(dir.path().to_path_buf()),
        ..SyncSettings::default()
    };
    let (engine, handles) = SyncEngine::build(&mirrors("sleep 30"), settings, SystemClock);

    let cancel = CancellationToken::new();
    let (manual_tx, manual_rx) = mpsc::channel(8);
    let runner = tokio::spawn(engine.run(cancel.clone(), manual_rx));

    // Trigger while idle: exactly one run starts. A second trigger while
    // running is coalesced.
    manual_tx.send("demo".to_string()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    manual_tx.send("demo".to_string()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    // Cancel with the run still sleeping: the child is terminated and the
    // coordinator returns well within the grace period.
    let shutdown = Instant::now();
    cancel.cancel();
    runner.await.unwrap();
    assert!(shutdown.elapsed() < Duration::from_secs(5));

    let results = handles.results["demo"].snapshot();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].status, TaskStatus::Stopped);
}
