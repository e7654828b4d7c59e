// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Literal log lines from production formats.

use chrono::TimeZone;
use mirror_telemetry::{nginx, rsyncd};

#[test]
fn nginx_access_line() {
    let line = r#""21/Jan/2024:14:23:55 -0500" "203.0.113.7" "GET /debian/pool/main/h/hello.deb HTTP/1.1" "200" "123456" "789" "curl/8.0""#;
    let entry = nginx::parse_line(line, None).unwrap();

    assert_eq!(entry.project, "debian");
    assert_eq!(entry.method, "GET");
    assert_eq!(entry.status, 200);
    assert_eq!(entry.bytes_sent, 123_456);
    assert_eq!(entry.bytes_recv, 789);
    assert_eq!(entry.agent, "curl/8.0");

    let expected = chrono::FixedOffset::west_opt(5 * 3600)
        .unwrap()
        .with_ymd_and_hms(2024, 1, 21, 14, 23, 55)
        .unwrap();
    assert_eq!(entry.time, expected);
}

#[test]
fn rsyncd_transfer_line() {
    let line =
        "2022/04/20 20:00:10 [1234] sent 4096 bytes  received 128 bytes  total size 1048576";
    let entry = rsyncd::parse_line(line).unwrap();

    assert_eq!(entry.bytes_sent, 4096);
    assert_eq!(entry.bytes_recv, 128);
    assert_eq!(
        entry.time,
        chrono::Utc.with_ymd_and_hms(2022, 4, 20, 20, 0, 10).unwrap()
    );
}

#[test]
fn malformed_lines_never_panic() {
    for line in ["", "\"one\"", "no quotes at all", "\u{0}\u{0}\u{0}"] {
        assert!(nginx::parse_line(line, None).is_err());
        assert!(rsyncd::parse_line(line).is_err());
    }
}
