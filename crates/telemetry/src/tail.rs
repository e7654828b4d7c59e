// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Line-oriented log following with reopen-on-rotation semantics.

use std::io::SeekFrom;
use std::os::unix::fs::MetadataExt;
use std::path::Path;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// How long to wait at end-of-file before checking for new data or
/// rotation.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Follow `path` from `offset`, delivering parsed entries to every
/// subscriber.
///
/// Rotation (inode change) and truncation (file shrinks below our
/// position) reopen the same path at offset 0, like `tail -F`. Lines the
/// parser rejects are dropped at debug level. Delivery is non-blocking:
/// a subscriber that is not ready loses that entry rather than stalling
/// the tail.
///
/// Runs until cancelled or an unrecoverable I/O error occurs.
pub async fn tail_file<E, P>(
    path: &Path,
    offset: u64,
    parse: P,
    subscribers: Vec<mpsc::Sender<E>>,
    cancel: CancellationToken,
) -> std::io::Result<()>
where
    E: Clone,
    P: Fn(&str) -> Option<E>,
{
    let file = File::open(path).await?;
    let metadata = file.metadata().await?;
    let mut inode = metadata.ino();
    // An offset beyond the current length means the file was replaced
    // between the offset computation and now; start over.
    let mut position = if offset > metadata.len() { 0 } else { offset };

    let mut reader = BufReader::new(file);
    reader.seek(SeekFrom::Start(position)).await?;
    info!(path = %path.display(), position, "tailing log file");

    let mut line: Vec<u8> = Vec::new();
    loop {
        let read = tokio::select! {
            result = reader.read_until(b'\n', &mut line) => result?,
            _ = cancel.cancelled() => return Ok(()),
        };

        if read == 0 {
            // End of file: wait, then look for growth, rotation, or
            // truncation.
            tokio::select! {
                _ = tokio::time::sleep(POLL_INTERVAL) => {}
                _ = cancel.cancelled() => return Ok(()),
            }

            let current = match tokio::fs::metadata(path).await {
                Ok(metadata) => metadata,
                // Mid-rotation the path can briefly not exist.
                Err(_) => continue,
            };
            if current.ino() != inode || current.len() < position {
                debug!(path = %path.display(), "log file rotated, reopening");
                let file = File::open(path).await?;
                inode = file.metadata().await?.ino();
                position = 0;
                line.clear();
                reader = BufReader::new(file);
            }
            continue;
        }

        position += read as u64;
        if !line.ends_with(b"\n") {
            // Partial line at end of file; keep accumulating.
            continue;
        }

        let text = String::from_utf8_lossy(&line);
        let text = text.trim_end_matches(['\r', '\n']);
        match parse(text) {
            Some(entry) => fan_out(&subscribers, entry),
            None => debug!(line = text, "dropping unparsable log line"),
        }
        line.clear();
    }
}

/// Deliver to every subscriber without blocking; a full channel drops its
/// copy.
fn fan_out<E: Clone>(subscribers: &[mpsc::Sender<E>], entry: E) {
    for subscriber in subscribers {
        if subscriber.try_send(entry.clone()).is_err() {
            debug!("subscriber not ready, dropping log entry");
        }
    }
}

#[cfg(test)]
#[path = "tail_tests.rs"]
mod tests;
