// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Month-indexed per-project output logs.
//!
//! Each project owns a `{short}-{MM}.log` / `{short}-{MM}.err` pair under
//! the sync log directory. The coordinator rotates every pair at the first
//! instant of a new month; workers only append.

use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Log files older than this are deleted by the pruner (~3 months).
const MAX_LOG_AGE: Duration = Duration::from_secs(2160 * 60 * 60);

/// How often the pruner re-checks the log directory (weekly).
const PRUNE_INTERVAL: Duration = Duration::from_secs(168 * 60 * 60);

/// Buffered stdout/stderr writers for one project.
///
/// When the daemon runs without a sync log directory every write is a no-op;
/// sync output is then only visible through the status channel.
pub struct ProjectLogs {
    short: String,
    dir: Option<PathBuf>,
    adm_group: Option<u32>,
    inner: Mutex<Writers>,
}

#[derive(Default)]
struct Writers {
    month: u32,
    out: Option<BufWriter<File>>,
    err: Option<BufWriter<File>>,
}

impl ProjectLogs {
    /// Open the writers for the given month.
    ///
    /// Failures to open are downgraded to warnings: a sync must not be
    /// blocked by an unwritable log file.
    pub fn open(short: &str, dir: Option<&Path>, adm_group: Option<u32>, month: u32) -> Arc<Self> {
        let logs = ProjectLogs {
            short: short.to_string(),
            dir: dir.map(Path::to_path_buf),
            adm_group,
            inner: Mutex::new(Writers::default()),
        };
        logs.rotate(month);
        Arc::new(logs)
    }

    /// Flush and reopen both writers against the new month's files.
    pub fn rotate(&self, month: u32) {
        let Some(dir) = &self.dir else { return };

        let mut inner = self.inner.lock();
        if inner.month == month && inner.out.is_some() {
            return;
        }
        flush_writer(&mut inner.out, &self.short);
        flush_writer(&mut inner.err, &self.short);
        inner.month = month;
        inner.out = self.open_file(dir, month, "log");
        inner.err = self.open_file(dir, month, "err");
    }

    fn open_file(&self, dir: &Path, month: u32, ext: &str) -> Option<BufWriter<File>> {
        let path = dir.join(format!("{}-{:02}.{}", self.short, month, ext));
        let file = match OpenOptions::new()
            .append(true)
            .create(true)
            .mode(0o640)
            .open(&path)
        {
            Ok(file) => file,
            Err(e) => {
                warn!(project = %self.short, path = %path.display(), error = %e,
                    "failed to open sync log file");
                return None;
            }
        };
        if let Some(gid) = self.adm_group {
            if let Err(e) = std::os::unix::fs::chown(&path, None, Some(gid)) {
                warn!(path = %path.display(), gid, error = %e, "failed to set log file group");
            }
        }
        Some(BufWriter::new(file))
    }

    /// Append a dated header to both files, separating one run from the next.
    pub fn stamp(&self, text: &str) {
        let header = format!("\n\n{text}\n");
        self.write_stdout(header.as_bytes());
        self.write_stderr(header.as_bytes());
    }

    pub fn write_stdout(&self, data: &[u8]) {
        let mut inner = self.inner.lock();
        if let Some(out) = &mut inner.out {
            if let Err(e) = out.write_all(data) {
                warn!(project = %self.short, error = %e, "failed to write sync stdout log");
            }
        }
    }

    pub fn write_stderr(&self, data: &[u8]) {
        let mut inner = self.inner.lock();
        if let Some(err) = &mut inner.err {
            if let Err(e) = err.write_all(data) {
                warn!(project = %self.short, error = %e, "failed to write sync stderr log");
            }
        }
    }

    pub fn flush(&self) {
        let mut inner = self.inner.lock();
        flush_writer(&mut inner.out, &self.short);
        flush_writer(&mut inner.err, &self.short);
    }
}

fn flush_writer(writer: &mut Option<BufWriter<File>>, short: &str) {
    if let Some(w) = writer {
        if let Err(e) = w.flush() {
            warn!(project = %short, error = %e, "failed to flush sync log");
        }
    }
}

/// Spawn the weekly task that deletes sync logs older than three months.
pub fn spawn_log_pruner(dir: PathBuf, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PRUNE_INTERVAL);
        loop {
            tokio::select! {
                _ = interval.tick() => prune_old_logs(&dir, MAX_LOG_AGE),
                _ = cancel.cancelled() => break,
            }
        }
    })
}

/// Delete files in `dir` whose modification time is older than `max_age`.
pub(crate) fn prune_old_logs(dir: &Path, max_age: Duration) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "cannot read sync log directory");
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let age = entry
            .metadata()
            .and_then(|m| m.modified())
            .ok()
            .and_then(|mtime| mtime.elapsed().ok());
        match age {
            Some(age) if age > max_age => match std::fs::remove_file(&path) {
                Ok(()) => info!(path = %path.display(), "removed old sync log"),
                Err(e) => warn!(path = %path.display(), error = %e, "failed to remove old sync log"),
            },
            Some(_) => {}
            None => debug!(path = %path.display(), "could not determine log file age"),
        }
    }
}

#[cfg(test)]
#[path = "logs_tests.rs"]
mod tests;
