// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Locate the byte offset at which to resume tailing a log file.
//!
//! The file is assumed to be line-oriented with timestamps that are
//! monotonic in file order. One linear scan records every line-start
//! offset, then a binary search probes lines for the first one strictly
//! newer than the resume point.

use chrono::{DateTime, Utc};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Seek, SeekFrom};
use std::path::Path;

/// Byte offset of the first line whose parsed time is strictly after
/// `resume`.
///
/// Returns 0 when `resume` precedes every line (the whole file must be
/// replayed) and the file length when no line is newer (resume at the end).
/// Lines the parser rejects are skipped past during the search.
pub fn find_offset<P>(path: &Path, resume: DateTime<Utc>, parse: P) -> io::Result<u64>
where
    P: Fn(&str) -> Option<DateTime<Utc>>,
{
    let mut file = File::open(path)?;

    // Pass 1: record the starting offset of every line.
    let mut offsets: Vec<u64> = Vec::new();
    let mut position = 0u64;
    {
        let mut reader = BufReader::new(&mut file);
        let mut line = Vec::new();
        loop {
            line.clear();
            let n = reader.read_until(b'\n', &mut line)?;
            if n == 0 {
                break;
            }
            offsets.push(position);
            position += n as u64;
        }
    }
    let file_len = position;

    if offsets.is_empty() {
        return Ok(0);
    }

    // Pass 2: binary search for the smallest index whose line is newer than
    // `resume`. An unparsable probe advances the lower bound past it.
    let mut lo = 0usize;
    let mut hi = offsets.len() - 1;
    while lo < hi {
        let mid = (lo + hi) / 2;
        match parse(&line_at(&mut file, offsets[mid])?) {
            Some(time) if time > resume => hi = mid,
            _ => lo = mid + 1,
        }
    }

    match parse(&line_at(&mut file, offsets[lo])?) {
        Some(time) if time > resume => Ok(offsets[lo]),
        _ => Ok(file_len),
    }
}

fn line_at(file: &mut File, offset: u64) -> io::Result<String> {
    file.seek(SeekFrom::Start(offset))?;
    let mut reader = BufReader::new(file);
    let mut line = Vec::new();
    reader.read_until(b'\n', &mut line)?;
    Ok(String::from_utf8_lossy(&line).into_owned())
}

#[cfg(test)]
#[path = "offset_tests.rs"]
mod tests;
