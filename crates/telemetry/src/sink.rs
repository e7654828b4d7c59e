// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Narrow interface onto the time-series sink.
//!
//! The real client (connection handling, batching, auth) is an external
//! collaborator; aggregators only need "read the last values" and
//! "fire-and-forget a point".

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mirror_core::NetStat;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("stats sink unavailable: {0}")]
    Unavailable(String),
}

/// One flushed data point.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub measurement: String,
    /// Project tag; `None` for project-less measurements (rsyncd).
    pub project: Option<String>,
    pub stat: NetStat,
    pub time: DateTime<Utc>,
}

/// Last persisted values for one measurement, keyed by project tag
/// (empty-string key for project-less measurements).
#[derive(Debug, Default, Clone)]
pub struct LastValues {
    pub last_updated: Option<DateTime<Utc>>,
    pub stats: HashMap<String, NetStat>,
}

/// Warm-start reads.
#[async_trait]
pub trait StatsReader: Send + Sync {
    async fn last_values(&self, measurement: &str) -> Result<LastValues, SinkError>;
}

/// Steady-state writes. Implementations batch internally; failures are
/// theirs to log, the caller never retries.
pub trait StatsWriter: Send + Sync {
    fn write_point(&self, point: Point);
}

/// Writer used when the daemon runs without a sink (read-only mode).
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopWriter;

impl StatsWriter for NoopWriter {
    fn write_point(&self, _point: Point) {}
}

/// In-memory sink for tests and sink-less operation.
#[derive(Default, Clone)]
pub struct MemorySink {
    inner: Arc<Mutex<MemorySinkState>>,
}

#[derive(Default)]
struct MemorySinkState {
    points: Vec<Point>,
    seeded: HashMap<String, LastValues>,
    failures_remaining: u32,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-load the values a warm-start read should see.
    pub fn seed(&self, measurement: &str, values: LastValues) {
        self.inner.lock().seeded.insert(measurement.to_string(), values);
    }

    /// Make the next `n` reads fail, for exercising retry paths.
    pub fn fail_next_reads(&self, n: u32) {
        self.inner.lock().failures_remaining = n;
    }

    /// Every point written so far.
    pub fn points(&self) -> Vec<Point> {
        self.inner.lock().points.clone()
    }
}

#[async_trait]
impl StatsReader for MemorySink {
    async fn last_values(&self, measurement: &str) -> Result<LastValues, SinkError> {
        let mut inner = self.inner.lock();
        if inner.failures_remaining > 0 {
            inner.failures_remaining -= 1;
            return Err(SinkError::Unavailable("injected failure".to_string()));
        }
        Ok(inner.seeded.get(measurement).cloned().unwrap_or_default())
    }
}

impl StatsWriter for MemorySink {
    fn write_point(&self, point: Point) {
        self.inner.lock().points.push(point);
    }
}
