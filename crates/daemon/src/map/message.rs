// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Access-log entries to compact location records.

use super::MapHub;
use mirror_telemetry::AccessEntry;
use std::collections::HashMap;
use std::net::IpAddr;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Records are grouped for at most this long before a frame goes out.
const BATCH_INTERVAL: Duration = Duration::from_secs(1);

/// A batch reaching this many records is flushed early.
const MAX_BATCH_RECORDS: usize = 256;

/// Size of one wire record: project id byte plus two big-endian u16
/// coordinates.
pub const RECORD_LEN: usize = 5;

/// Convert one entry into its 5-byte wire record.
///
/// Entries are discarded when the IP repeats the immediately previous
/// entry's, when no location is resolved (or it is the (0,0) null island),
/// or when the project is not in the table. `prev_ip` is updated on every
/// call.
pub fn location_record(
    entry: &AccessEntry,
    prev_ip: &mut Option<IpAddr>,
    projects: &HashMap<String, u8>,
) -> Option<[u8; RECORD_LEN]> {
    let duplicate = *prev_ip == Some(entry.ip);
    *prev_ip = Some(entry.ip);
    if duplicate {
        return None;
    }

    let location = entry.location?;
    if location.latitude == 0.0 && location.longitude == 0.0 {
        return None;
    }

    let id = *projects.get(&entry.project)?;

    // [-90, 90] and [-180, 180] onto a 4096-step grid.
    let lat = quantize(location.latitude, 90.0, 180.0);
    let lon = quantize(location.longitude, 180.0, 360.0);
    let [lat_hi, lat_lo] = lat.to_be_bytes();
    let [lon_hi, lon_lo] = lon.to_be_bytes();

    Some([id, lat_hi, lat_lo, lon_hi, lon_lo])
}

fn quantize(value: f64, offset: f64, range: f64) -> u16 {
    ((value + offset) * 4096.0 / range).round() as u16
}

/// Consume access entries, batch their records, and broadcast frames.
///
/// Runs until cancelled or the entry stream closes.
pub async fn run_pipeline(
    mut entries: mpsc::Receiver<AccessEntry>,
    hub: MapHub,
    projects: HashMap<String, u8>,
    cancel: CancellationToken,
) {
    let mut prev_ip: Option<IpAddr> = None;
    let mut batch: Vec<u8> = Vec::new();
    let mut ticker = tokio::time::interval(BATCH_INTERVAL);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            entry = entries.recv() => match entry {
                Some(entry) => {
                    if let Some(record) = location_record(&entry, &mut prev_ip, &projects) {
                        batch.extend_from_slice(&record);
                        if batch.len() >= MAX_BATCH_RECORDS * RECORD_LEN {
                            hub.broadcast(std::mem::take(&mut batch)).await;
                        }
                    }
                }
                None => break,
            },
            _ = ticker.tick() => {
                if !batch.is_empty() {
                    hub.broadcast(std::mem::take(&mut batch)).await;
                }
            }
            _ = cancel.cancelled() => break,
        }
    }

    if !batch.is_empty() {
        hub.broadcast(batch).await;
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
