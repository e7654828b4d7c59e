// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Status and result types produced by sync runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Exit classification of one task or stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    /// The process exited zero.
    Success,
    /// The process exited non-zero (or failed to start, code -1).
    Failure { code: i32 },
    /// The run was cut short by shutdown; the child was terminated.
    Stopped,
}

impl TaskStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, TaskStatus::Success)
    }
}

/// What a full task run produced, including which stage ended it.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub status: TaskStatus,
    /// Index of the stage that produced `status`.
    pub stage: usize,
    /// Most recent stderr output, kept for failure escalation.
    pub stderr_tail: String,
}

/// One completed sync, as kept in the per-project history ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResult {
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub status: TaskStatus,
    pub stage: usize,
}

/// Severity of a status-channel entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusLevel {
    Info,
    Success,
    Error,
}

/// A timestamped lifecycle message from a sync run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEntry {
    pub at: DateTime<Utc>,
    pub level: StatusLevel,
    pub message: String,
}

impl StatusEntry {
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(StatusLevel::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(StatusLevel::Success, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(StatusLevel::Error, message)
    }

    fn new(level: StatusLevel, message: impl Into<String>) -> Self {
        StatusEntry { at: Utc::now(), level, message: message.into() }
    }
}

/// Deliver a status entry without blocking; saturated channels drop it.
pub(crate) fn emit(tx: &mpsc::Sender<StatusEntry>, entry: StatusEntry) {
    let _ = tx.try_send(entry);
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
