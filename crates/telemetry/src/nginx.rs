// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parser for the access-log format the web server is configured with:
//!
//! ```text
//! log_format stats '"$time_local" "$remote_addr" "$request" "$status" "$body_bytes_sent" "$request_length" "$http_user_agent"';
//! ```
//!
//! Seven double-quoted fields, in that exact order.

use crate::entry::{AccessEntry, GeoResolver, ParseError};
use chrono::{DateTime, Utc};
use regex::Regex;
use std::net::IpAddr;
use std::sync::OnceLock;

/// Locale-independent local-time layout used by the web server.
const TIME_LAYOUT: &str = "%d/%b/%Y:%H:%M:%S %z";

fn quoted() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Literal pattern, cannot fail to compile.
    #[allow(clippy::unwrap_used)]
    RE.get_or_init(|| Regex::new(r#""(.*?)""#).unwrap())
}

/// Parse one access-log line into a typed entry.
///
/// When a resolver is supplied the remote address is looked up and the
/// coordinates attached; lookup failures leave the location empty rather
/// than failing the parse.
pub fn parse_line(
    line: &str,
    geo: Option<&dyn GeoResolver>,
) -> Result<AccessEntry, ParseError> {
    let fields: Vec<&str> = quoted()
        .captures_iter(line)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect();
    if fields.len() != 7 {
        return Err(ParseError::FieldCount);
    }

    let time = DateTime::parse_from_str(fields[0], TIME_LAYOUT)
        .map_err(|_| ParseError::Time)?
        .with_timezone(&Utc);

    let ip: IpAddr = fields[1].parse().map_err(|_| ParseError::Ip)?;

    let request: Vec<&str> = fields[2].split(' ').collect();
    let [method, url, version] = request[..] else {
        return Err(ParseError::Request);
    };

    let project = first_path_segment(url).ok_or(ParseError::Project)?;

    let status: i64 = fields[3].parse().map_err(|_| ParseError::Number)?;
    let bytes_sent: i64 = fields[4].parse().map_err(|_| ParseError::Number)?;
    let bytes_recv: i64 = fields[5].parse().map_err(|_| ParseError::Number)?;

    Ok(AccessEntry {
        time,
        ip,
        location: geo.and_then(|g| g.locate(ip)),
        method: method.to_string(),
        url: url.to_string(),
        version: version.to_string(),
        project,
        status,
        bytes_sent,
        bytes_recv,
        agent: fields[6].to_string(),
    })
}

/// Cheap timestamp probe for the offset locator: only the first quoted
/// field is examined.
pub fn parse_date(line: &str) -> Option<DateTime<Utc>> {
    let first = quoted().captures(line)?.get(1)?.as_str();
    DateTime::parse_from_str(first, TIME_LAYOUT)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// First segment of the URL path after resolving `.` and `..`.
///
/// The query string and fragment are ignored. A URL with no first segment
/// (e.g. `/`) yields `None`, which the caller treats as a parse error.
fn first_path_segment(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let mut stack: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                stack.pop();
            }
            other => stack.push(other),
        }
    }
    stack.first().map(|s| (*s).to_string())
}

#[cfg(test)]
#[path = "nginx_tests.rs"]
mod tests;
