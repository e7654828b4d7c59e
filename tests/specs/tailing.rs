// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resume offset plus tailing: no record is delivered twice.

use chrono::TimeZone;
use mirror_core::offset::find_offset;
use mirror_telemetry::{rsyncd, tail_file};
use std::io::Write;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

fn transfer_line(hour: u32, sent: i64) -> String {
    format!(
        "2022/04/20 {hour:02}:00:00 [99] sent {sent} bytes  received 10 bytes  total size 0"
    )
}

#[tokio::test]
async fn tail_resumes_past_already_persisted_records() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rsyncd.log");
    {
        let mut file = std::fs::File::create(&path).unwrap();
        for hour in 1..=6 {
            writeln!(file, "{}", transfer_line(hour, hour as i64 * 100)).unwrap();
        }
    }

    // The sink last saw a point at 03:30; resume past hours 1-3.
    let resume = chrono::Utc.with_ymd_and_hms(2022, 4, 20, 3, 30, 0).unwrap();
    let offset = find_offset(&path, resume, rsyncd::parse_date).unwrap();
    assert!(offset > 0);

    let (tx, mut rx) = mpsc::channel(16);
    let cancel = CancellationToken::new();
    let tail_cancel = cancel.clone();
    let tail_path = path.clone();
    let handle = tokio::spawn(async move {
        tail_file(
            &tail_path,
            offset,
            |line| rsyncd::parse_line(line).ok(),
            vec![tx],
            tail_cancel,
        )
        .await
    });

    let mut seen = Vec::new();
    for _ in 0..3 {
        let entry = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        seen.push(entry.bytes_sent);
    }
    assert_eq!(seen, vec![400, 500, 600]);

    // New records appended after resume still flow through.
    {
        let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "{}", transfer_line(7, 700)).unwrap();
    }
    let entry = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(entry.bytes_sent, 700);

    cancel.cancel();
    handle.await.unwrap().unwrap();
}
