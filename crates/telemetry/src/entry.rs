// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed log entries and the geo-lookup seam.

use chrono::{DateTime, Utc};
use std::net::IpAddr;
use thiserror::Error;

/// Resolved coordinates for a remote address.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

/// Looks up coordinates for an address.
///
/// The geo database itself (acquisition, hot-swap) lives outside this crate;
/// parsers only need something that answers lookups.
pub trait GeoResolver: Send + Sync {
    fn locate(&self, ip: IpAddr) -> Option<Location>;
}

/// One parsed access-log record.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessEntry {
    pub time: DateTime<Utc>,
    pub ip: IpAddr,
    pub location: Option<Location>,
    pub method: String,
    pub url: String,
    pub version: String,
    /// First path segment of the URL; the project table key.
    pub project: String,
    pub status: i64,
    pub bytes_sent: i64,
    pub bytes_recv: i64,
    pub agent: String,
}

/// One completed rsync-daemon transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RsyncdEntry {
    pub time: DateTime<Utc>,
    pub bytes_sent: i64,
    pub bytes_recv: i64,
}

/// Why a log line was rejected. Per-record errors are dropped silently by
/// the tailer; the variants exist for tests and debug logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("wrong number of fields")]
    FieldCount,
    #[error("invalid timestamp")]
    Time,
    #[error("invalid remote address")]
    Ip,
    #[error("malformed request field")]
    Request,
    #[error("no project path segment")]
    Project,
    #[error("invalid numeric field")]
    Number,
}
