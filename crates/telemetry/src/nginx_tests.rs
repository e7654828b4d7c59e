// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::entry::Location;
use chrono::TimeZone;

const SAMPLE: &str = r#""21/Jan/2024:14:23:55 -0500" "203.0.113.7" "GET /debian/pool/main/h/hello.deb HTTP/1.1" "200" "123456" "789" "curl/8.0""#;

#[test]
fn parses_complete_line() {
    let entry = parse_line(SAMPLE, None).unwrap();
    assert_eq!(entry.project, "debian");
    assert_eq!(entry.method, "GET");
    assert_eq!(entry.url, "/debian/pool/main/h/hello.deb");
    assert_eq!(entry.version, "HTTP/1.1");
    assert_eq!(entry.status, 200);
    assert_eq!(entry.bytes_sent, 123_456);
    assert_eq!(entry.bytes_recv, 789);
    assert_eq!(entry.agent, "curl/8.0");
    assert_eq!(entry.ip, "203.0.113.7".parse::<std::net::IpAddr>().unwrap());
    assert!(entry.location.is_none());

    let expected = chrono::FixedOffset::west_opt(5 * 3600)
        .unwrap()
        .with_ymd_and_hms(2024, 1, 21, 14, 23, 55)
        .unwrap();
    assert_eq!(entry.time, expected);
}

#[test]
fn parse_date_probe_matches_full_parse() {
    let entry = parse_line(SAMPLE, None).unwrap();
    assert_eq!(parse_date(SAMPLE), Some(entry.time));
    assert_eq!(parse_date("not a log line"), None);
}

#[test]
fn ipv6_addresses_parse() {
    let line = r#""21/Jan/2024:14:23:55 +0000" "2001:db8::7" "GET /fedora/x HTTP/2.0" "200" "1" "2" "ua""#;
    let entry = parse_line(line, None).unwrap();
    assert!(entry.ip.is_ipv6());
    assert_eq!(entry.project, "fedora");
}

#[test]
fn resolver_attaches_location() {
    struct Fixed;
    impl GeoResolver for Fixed {
        fn locate(&self, _ip: std::net::IpAddr) -> Option<Location> {
            Some(Location { latitude: 44.66, longitude: -74.98 })
        }
    }
    let entry = parse_line(SAMPLE, Some(&Fixed)).unwrap();
    assert_eq!(
        entry.location,
        Some(Location { latitude: 44.66, longitude: -74.98 })
    );
}

#[yare::parameterized(
    six_fields = { r#""21/Jan/2024:14:23:55 -0500" "1.2.3.4" "GET /x HTTP/1.1" "200" "1" "2""#, ParseError::FieldCount },
    bad_time = { r#""not-a-date" "1.2.3.4" "GET /x/y HTTP/1.1" "200" "1" "2" "ua""#, ParseError::Time },
    bad_ip = { r#""21/Jan/2024:14:23:55 -0500" "nope" "GET /x/y HTTP/1.1" "200" "1" "2" "ua""#, ParseError::Ip },
    bad_request = { r#""21/Jan/2024:14:23:55 -0500" "1.2.3.4" "GET /x" "200" "1" "2" "ua""#, ParseError::Request },
    root_url = { r#""21/Jan/2024:14:23:55 -0500" "1.2.3.4" "GET / HTTP/1.1" "200" "1" "2" "ua""#, ParseError::Project },
    bad_status = { r#""21/Jan/2024:14:23:55 -0500" "1.2.3.4" "GET /x/y HTTP/1.1" "abc" "1" "2" "ua""#, ParseError::Number },
    bad_bytes = { r#""21/Jan/2024:14:23:55 -0500" "1.2.3.4" "GET /x/y HTTP/1.1" "200" "abc" "2" "ua""#, ParseError::Number },
)]
fn rejects_malformed_lines(line: &str, expected: ParseError) {
    assert_eq!(parse_line(line, None).unwrap_err(), expected);
}

#[yare::parameterized(
    plain = { "/debian/pool/x.deb", Some("debian") },
    query = { "/ubuntu/dists?arch=amd64", Some("ubuntu") },
    dot_segments = { "/./debian/x", Some("debian") },
    parent_escape = { "/../debian/x", Some("debian") },
    parent_collapse = { "/a/../debian", Some("debian") },
    root = { "/", None },
    dots_only = { "/..", None },
)]
fn first_segment_extraction(url: &str, expected: Option<&str>) {
    assert_eq!(first_path_segment(url).as_deref(), expected);
}
