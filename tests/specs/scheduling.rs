// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Uniform scheduling over a literal frequency mix.

use mirror_core::{Calendar, CalendarBuilder, FakeClock};
use std::collections::HashMap;

fn build_abcd() -> Calendar<char> {
    let mut builder = CalendarBuilder::new();
    builder.add_task('a', 1);
    builder.add_task('b', 2);
    builder.add_task('c', 4);
    builder.add_task('d', 8);
    builder.build()
}

#[test]
fn one_two_four_eight_gives_fifteen_uniform_slots() {
    let calendar = build_abcd();
    assert_eq!(calendar.len(), 15);

    let mut counts: HashMap<char, usize> = HashMap::new();
    let mut previous: Option<(char, f64)> = None;
    for (&task, time) in calendar.entries() {
        *counts.entry(task).or_default() += 1;
        assert!(time < 1.0, "all times strictly less than 1.0");
        if let Some((prev_task, prev_time)) = previous {
            assert!(time >= prev_time);
            // Two consecutive equal times only ever belong to different
            // tasks.
            if time == prev_time {
                assert_ne!(task, prev_task);
            }
        }
        previous = Some((task, time));
    }

    assert_eq!(counts[&'a'], 1);
    assert_eq!(counts[&'b'], 2);
    assert_eq!(counts[&'c'], 4);
    assert_eq!(counts[&'d'], 8);
}

#[test]
fn walking_a_full_day_visits_every_slot_in_order() {
    let mut calendar = build_abcd();
    let clock = FakeClock::new();
    // The engine adds slack to every sleep so a tick always lands past its
    // slot; do the same here.
    let slack = std::time::Duration::from_millis(5);

    // Prime: at midnight the t=0 slot has passed.
    let (_, mut sleep) = calendar.next_job(&clock).unwrap();

    let mut first_day = Vec::new();
    for _ in 0..15 {
        clock.advance(sleep + slack);
        let (task, dt) = calendar.next_job(&clock).unwrap();
        first_day.push(task);
        sleep = dt;
    }

    let mut second_day = Vec::new();
    for _ in 0..15 {
        clock.advance(sleep + slack);
        let (task, dt) = calendar.next_job(&clock).unwrap();
        second_day.push(task);
        sleep = dt;
    }

    // The cyclic order repeats indefinitely.
    assert_eq!(first_day, second_day);
    // And a full traversal contains each task at its frequency.
    assert_eq!(first_day.iter().filter(|&&t| t == 'd').count(), 8);
    assert_eq!(first_day.iter().filter(|&&t| t == 'a').count(), 1);
}

#[test]
fn sleeps_are_always_non_negative() {
    let mut calendar = build_abcd();
    let clock = FakeClock::new();
    clock.set_epoch_ms(13 * 60 * 60 * 1000 + 1234);
    for _ in 0..40 {
        let (_, dt) = calendar.next_job(&clock).unwrap();
        clock.advance(dt + std::time::Duration::from_millis(1));
    }
}
