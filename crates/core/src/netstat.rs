// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Network transfer counters.

use serde::{Deserialize, Serialize};

/// Key under which traffic for unrecognised projects is accumulated.
pub const OTHER: &str = "other";

/// Key under which the grand total across all projects is accumulated.
pub const TOTAL: &str = "total";

/// Monotonic accumulator triple for one (measurement, project) dimension.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetStat {
    pub bytes_sent: i64,
    pub bytes_recv: i64,
    pub requests: i64,
}

impl NetStat {
    pub const fn new(bytes_sent: i64, bytes_recv: i64, requests: i64) -> Self {
        NetStat { bytes_sent, bytes_recv, requests }
    }

    /// Count one request transferring the given byte amounts.
    pub fn record(&mut self, sent: i64, recv: i64) {
        self.bytes_sent += sent;
        self.bytes_recv += recv;
        self.requests += 1;
    }
}

#[cfg(test)]
#[path = "netstat_tests.rs"]
mod tests;
