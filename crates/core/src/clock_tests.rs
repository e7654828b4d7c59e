// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn fake_clock_starts_at_midnight() {
    let clock = FakeClock::new();
    assert_eq!(clock.epoch_ms(), 0);
    assert_eq!(clock.day_fraction(), 0.0);
}

#[test]
fn advance_moves_both_time_sources() {
    let clock = FakeClock::new();
    let before = clock.now();
    clock.advance(Duration::from_secs(90));
    assert_eq!(clock.epoch_ms(), 90_000);
    assert_eq!(clock.now() - before, Duration::from_secs(90));
}

#[test]
fn day_fraction_wraps_at_midnight() {
    let clock = FakeClock::new();
    clock.set_epoch_ms(MS_PER_DAY + MS_PER_DAY / 4);
    assert!((clock.day_fraction() - 0.25).abs() < 1e-9);
}

#[test]
fn until_midnight_complements_day_fraction() {
    let clock = FakeClock::new();
    clock.set_epoch_ms(MS_PER_DAY - 1_000);
    assert_eq!(clock.until_midnight(), Duration::from_secs(1));
}

#[test]
fn system_clock_epoch_is_sane() {
    let clock = SystemClock;
    // Sometime after 2020-01-01.
    assert!(clock.epoch_ms() > 1_577_836_800_000);
}
