// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon.
//!
//! Every variable here is optional; a missing one degrades the matching
//! feature rather than failing startup.

use std::path::PathBuf;
use tracing::warn;

/// Token for the time-series sink. Without it, counters stay in memory.
pub fn influx_token() -> Option<String> {
    non_empty("INFLUX_TOKEN")
}

/// When set, never write points to the sink.
pub fn influx_read_only() -> bool {
    non_empty("INFLUX_READ_ONLY").is_some()
}

/// Path of the web-server access log to tail.
pub fn nginx_tail() -> Option<PathBuf> {
    non_empty("NGINX_TAIL").map(PathBuf::from)
}

/// Path of the rsync daemon log to tail.
pub fn rsyncd_tail() -> Option<PathBuf> {
    non_empty("RSYNCD_TAIL").map(PathBuf::from)
}

/// When set, the calendar ticks but never dispatches.
pub fn scheduler_paused() -> bool {
    non_empty("SCHEDULER_PAUSED").is_some()
}

/// When set, rsync runs with `--dry-run` and scripts are skipped.
pub fn rsync_dry_run() -> bool {
    non_empty("RSYNC_DRY_RUN").is_some()
}

/// Directory for per-project sync output logs.
pub fn rsync_logs() -> Option<PathBuf> {
    non_empty("RSYNC_LOGS").map(PathBuf::from)
}

/// Group id given ownership of created sync log files.
pub fn adm_group() -> Option<u32> {
    let raw = non_empty("ADM_GROUP")?;
    match raw.parse() {
        Ok(gid) => Some(gid),
        Err(_) => {
            warn!(value = %raw, "ADM_GROUP is not a numeric gid, ignoring");
            None
        }
    }
}

/// Extra all-projects token accepted by the manual-sync endpoint.
pub fn pull_token() -> Option<String> {
    non_empty("PULL_TOKEN")
}

/// Where the process-wide lock file lives.
pub fn lock_path() -> PathBuf {
    std::env::temp_dir().join("mirror.lock")
}

fn non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
