// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Counter aggregation over parsed log entries.

use crate::entry::{AccessEntry, RsyncdEntry};
use crate::sink::{LastValues, SinkError, StatsReader, StatsWriter};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ipnetwork::IpNetwork;
use mirror_core::{NetStat, OTHER, TOTAL};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Cadence of counter flushes to the sink.
const FLUSH_INTERVAL: Duration = Duration::from_secs(60);

/// Warm-start read attempts before giving up.
const INIT_ATTEMPTS: u32 = 5;

/// Measurement name for the rsync daemon counters.
const RSYNCD_MEASUREMENT: &str = "rsyncd";

/// A set of counters fed by entries of type `E`.
#[async_trait]
pub trait Aggregator<E>: Send {
    /// Warm-start the counters from the sink so they stay monotonic across
    /// restarts. Returns the newest timestamp among the warmed points.
    async fn init(&mut self, reader: &dyn StatsReader) -> Result<DateTime<Utc>, SinkError>;

    /// Fold one entry into the counters.
    fn aggregate(&mut self, entry: E);

    /// Emit the current counters as points stamped `now`.
    fn send(&self, writer: &dyn StatsWriter, now: DateTime<Utc>);
}

/// Background loop handle returned by [`start_aggregator`].
pub type AggregatorHandle = tokio::task::JoinHandle<()>;

/// Warm-start `aggregator`, then spawn its ingest/flush loop.
///
/// The loop owns the aggregator outright (sole-writer discipline): entries
/// and the minute tick are serialised through one `select!`. Flush failures
/// are the writer's problem; cancellation ends the loop, leaving the last
/// minute of counters unflushed by design.
pub async fn start_aggregator<E, A>(
    reader: Arc<dyn StatsReader>,
    writer: Arc<dyn StatsWriter>,
    mut aggregator: A,
    mut entries: mpsc::Receiver<E>,
    cancel: CancellationToken,
) -> Result<(DateTime<Utc>, AggregatorHandle), SinkError>
where
    E: Send + 'static,
    A: Aggregator<E> + 'static,
{
    let last_updated = aggregator.init(reader.as_ref()).await?;

    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(FLUSH_INTERVAL);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // interval fires immediately; the first flush should wait a full
        // period.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => aggregator.send(writer.as_ref(), Utc::now()),
                entry = entries.recv() => match entry {
                    Some(entry) => aggregator.aggregate(entry),
                    None => break,
                },
                _ = cancel.cancelled() => break,
            }
        }
    });

    Ok((last_updated, handle))
}

/// Read the last values for one measurement, retrying with linear backoff.
async fn query_with_retry(
    reader: &dyn StatsReader,
    measurement: &str,
) -> Result<LastValues, SinkError> {
    let mut last_error = SinkError::Unavailable("no attempts made".to_string());
    for attempt in 0..INIT_ATTEMPTS {
        match reader.last_values(measurement).await {
            Ok(values) => return Ok(values),
            Err(e) => {
                warn!(measurement, attempt, error = %e, "stats warm-start query failed");
                last_error = e;
                tokio::time::sleep(Duration::from_secs(attempt as u64)).await;
            }
        }
    }
    Err(last_error)
}

/// Per-project counters for the access log, split into named measurements.
///
/// Every measurement carries a predicate; an entry that passes it bumps the
/// entry's project (or `other` for projects not in the table) and `total`.
pub struct ProjectAggregator {
    measurements: Vec<Measurement>,
    projects: Vec<String>,
}

struct Measurement {
    name: String,
    filter: Box<dyn Fn(&AccessEntry) -> bool + Send + Sync>,
    stats: HashMap<String, NetStat>,
}

impl ProjectAggregator {
    /// Create an aggregator tracking the given project short names.
    pub fn new(projects: impl IntoIterator<Item = String>) -> Self {
        ProjectAggregator {
            measurements: Vec::new(),
            projects: projects.into_iter().collect(),
        }
    }

    /// Add a measurement with an arbitrary predicate.
    pub fn add_measurement(
        &mut self,
        name: &str,
        filter: impl Fn(&AccessEntry) -> bool + Send + Sync + 'static,
    ) {
        let mut stats: HashMap<String, NetStat> =
            self.projects.iter().map(|p| (p.clone(), NetStat::default())).collect();
        stats.insert(OTHER.to_string(), NetStat::default());
        stats.insert(TOTAL.to_string(), NetStat::default());
        self.measurements.push(Measurement {
            name: name.to_string(),
            filter: Box::new(filter),
            stats,
        });
    }

    /// Add a measurement counting only traffic from the given subnets.
    pub fn add_subnet_measurement(&mut self, name: &str, subnets: Vec<IpNetwork>) {
        self.add_measurement(name, move |entry| {
            subnets.iter().any(|subnet| subnet.contains(entry.ip))
        });
    }
}

#[async_trait]
impl Aggregator<AccessEntry> for ProjectAggregator {
    async fn init(&mut self, reader: &dyn StatsReader) -> Result<DateTime<Utc>, SinkError> {
        let mut last_updated = DateTime::UNIX_EPOCH;
        for measurement in &mut self.measurements {
            let values = query_with_retry(reader, &measurement.name).await?;
            for (project, stat) in values.stats {
                // Adopt only dimensions we track; stale projects in the sink
                // are left behind.
                if measurement.stats.contains_key(&project) {
                    measurement.stats.insert(project, stat);
                }
            }
            if let Some(t) = values.last_updated {
                last_updated = last_updated.max(t);
            }
        }
        Ok(last_updated)
    }

    fn aggregate(&mut self, entry: AccessEntry) {
        for measurement in &mut self.measurements {
            if !(measurement.filter)(&entry) {
                continue;
            }
            let key = if measurement.stats.contains_key(&entry.project) {
                entry.project.as_str()
            } else {
                OTHER
            };
            if let Some(stat) = measurement.stats.get_mut(key) {
                stat.record(entry.bytes_sent, entry.bytes_recv);
            }
            if let Some(total) = measurement.stats.get_mut(TOTAL) {
                total.record(entry.bytes_sent, entry.bytes_recv);
            }
        }
    }

    fn send(&self, writer: &dyn StatsWriter, now: DateTime<Utc>) {
        for measurement in &self.measurements {
            for (project, stat) in &measurement.stats {
                writer.write_point(crate::sink::Point {
                    measurement: measurement.name.clone(),
                    project: Some(project.clone()),
                    stat: *stat,
                    time: now,
                });
            }
        }
    }
}

/// Single counter over all rsync-daemon transfers.
#[derive(Default)]
pub struct RsyncdAggregator {
    stat: NetStat,
}

impl RsyncdAggregator {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Aggregator<RsyncdEntry> for RsyncdAggregator {
    async fn init(&mut self, reader: &dyn StatsReader) -> Result<DateTime<Utc>, SinkError> {
        let values = query_with_retry(reader, RSYNCD_MEASUREMENT).await?;
        self.stat = values.stats.get("").copied().unwrap_or_default();
        Ok(values.last_updated.unwrap_or(DateTime::UNIX_EPOCH))
    }

    fn aggregate(&mut self, entry: RsyncdEntry) {
        self.stat.record(entry.bytes_sent, entry.bytes_recv);
    }

    fn send(&self, writer: &dyn StatsWriter, now: DateTime<Utc>) {
        writer.write_point(crate::sink::Point {
            measurement: RSYNCD_MEASUREMENT.to_string(),
            project: None,
            stat: self.stat,
            time: now,
        });
    }
}

#[cfg(test)]
#[path = "aggregator_tests.rs"]
mod tests;
