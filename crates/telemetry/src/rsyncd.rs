// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parser for completed-transfer records in the rsync daemon log.
//!
//! The daemon log is free-form; a completed transfer is the line
//!
//! ```text
//! 2022/04/20 20:00:10 [1234] sent 4096 bytes  received 128 bytes  total size 1048576
//! ```
//!
//! recognised by splitting on single spaces into exactly 14 tokens (the
//! double spaces contribute empty tokens) with the 4th equal to `sent`.

use crate::entry::{ParseError, RsyncdEntry};
use chrono::{DateTime, NaiveDateTime, Utc};

const TIME_LAYOUT: &str = "%Y/%m/%d %H:%M:%S";

/// Parse one daemon-log line; anything but a completed transfer is
/// rejected.
pub fn parse_line(line: &str) -> Result<RsyncdEntry, ParseError> {
    let parts: Vec<&str> = line.split(' ').collect();
    if parts.len() != 14 {
        return Err(ParseError::FieldCount);
    }
    if parts[3] != "sent" {
        return Err(ParseError::FieldCount);
    }

    let time = parse_stamp(parts[0], parts[1]).ok_or(ParseError::Time)?;
    let bytes_sent: i64 = parts[4].parse().map_err(|_| ParseError::Number)?;
    let bytes_recv: i64 = parts[8].parse().map_err(|_| ParseError::Number)?;

    Ok(RsyncdEntry { time, bytes_sent, bytes_recv })
}

/// Timestamp probe for the offset locator: every daemon-log line starts
/// with date and time tokens, transfer record or not.
pub fn parse_date(line: &str) -> Option<DateTime<Utc>> {
    let mut parts = line.split(' ');
    let date = parts.next()?;
    let time = parts.next()?;
    parse_stamp(date, time)
}

fn parse_stamp(date: &str, time: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(&format!("{date} {time}"), TIME_LAYOUT)
        .ok()
        .map(|t| t.and_utc())
}

#[cfg(test)]
#[path = "rsyncd_tests.rs"]
mod tests;
