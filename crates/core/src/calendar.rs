// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Equidistributed day calendar.
//!
//! The calendar is a list of jobs with associated times-of-day in `[0, 1)`,
//! non-decreasing. Tasks that sync N times a day appear N times, spaced
//! uniformly. Because the schedule stores absolute times-of-day rather than
//! relative sleeps, it self-heals across overruns, drift, and manual
//! triggers: the caller always sleeps to the next planned point.

use crate::clock::Clock;
use std::time::Duration;

/// Ordered schedule of (job, time-of-day fraction) pairs for one UTC day.
pub struct Calendar<T> {
    jobs: Vec<T>,
    times: Vec<f64>,
    cursor: usize,
}

/// Collects (task, syncs-per-day) pairs and builds the [`Calendar`].
pub struct CalendarBuilder<T> {
    tasks: Vec<T>,
    syncs: Vec<u32>,
}

impl<T> CalendarBuilder<T> {
    pub fn new() -> Self {
        CalendarBuilder { tasks: Vec::new(), syncs: Vec::new() }
    }

    /// Add a task that should run `syncs_per_day` times.
    ///
    /// Tasks with zero syncs per day are never scheduled and are skipped.
    pub fn add_task(&mut self, task: T, syncs_per_day: u32) {
        if syncs_per_day == 0 {
            return;
        }
        self.tasks.push(task);
        self.syncs.push(syncs_per_day);
    }

    /// Build the calendar.
    ///
    /// With `L = lcm(syncs)` and `N = sum(syncs)`, iteration `i` of `0..L`
    /// emits one job for every task whose `i % (L / syncs) == 0`; job `c`
    /// (in emission order) is assigned time `c / N`. This interleaves the
    /// tasks uniformly at their respective frequencies.
    pub fn build(self) -> Calendar<T>
    where
        T: Clone,
    {
        let total: u64 = self.syncs.iter().map(|&n| n as u64).sum();
        let l = self.syncs.iter().fold(1u64, |acc, &n| lcm(acc, n as u64));

        let mut jobs = Vec::with_capacity(total as usize);
        let mut times = Vec::with_capacity(total as usize);
        let interval = if total == 0 { 0.0 } else { 1.0 / total as f64 };

        let mut c = 0u64;
        for i in 0..l {
            for (task, &n) in self.tasks.iter().zip(&self.syncs) {
                if i % (l / n as u64) == 0 {
                    jobs.push(task.clone());
                    times.push(interval * c as f64);
                    c += 1;
                }
            }
        }

        Calendar { jobs, times, cursor: 0 }
    }
}

impl<T> Default for CalendarBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Calendar<T> {
    /// Number of job slots in one day.
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Iterate over (job, time) pairs in schedule order.
    pub fn entries(&self) -> impl Iterator<Item = (&T, f64)> {
        self.jobs.iter().zip(self.times.iter().copied())
    }

    /// Apply a function to each scheduled job.
    pub fn for_each(&mut self, mut f: impl FnMut(&mut T)) {
        for job in &mut self.jobs {
            f(job);
        }
    }

    /// Find the first scheduled job satisfying the predicate.
    pub fn find(&self, mut f: impl FnMut(&T) -> bool) -> Option<&T> {
        self.jobs.iter().find(|job| f(job))
    }

    /// The job whose slot most recently passed and the sleep until the next
    /// slot.
    ///
    /// Reads the current UTC time-of-day from `clock`, advances the internal
    /// cursor past every slot at or before it, and returns the job the
    /// cursor just passed together with the time until the next slot. At the
    /// end of the day the cursor wraps and the sleep runs to midnight.
    /// Returns `None` for an empty calendar.
    pub fn next_job(&mut self, clock: &impl Clock) -> Option<(T, Duration)>
    where
        T: Clone,
    {
        if self.jobs.is_empty() {
            return None;
        }

        let t = clock.day_fraction();
        while self.cursor < self.jobs.len() && self.times[self.cursor] <= t {
            self.cursor += 1;
        }

        if self.cursor == self.jobs.len() {
            // Past the final slot: the next job is tomorrow's first.
            self.cursor = 0;
            let last = self.jobs.len() - 1;
            return Some((self.jobs[last].clone(), clock.until_midnight()));
        }

        let dt = Duration::from_secs_f64((self.times[self.cursor] - t) * 86_400.0);
        // Before the first slot of the day the "previous" job wraps to the
        // final slot of yesterday.
        let prev = self.cursor.checked_sub(1).unwrap_or(self.jobs.len() - 1);
        Some((self.jobs[prev].clone(), dt))
    }
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

fn lcm(a: u64, b: u64) -> u64 {
    if a == 0 || b == 0 {
        return a.max(b).max(1);
    }
    a / gcd(a, b) * b
}

#[cfg(test)]
#[path = "calendar_tests.rs"]
mod tests;
