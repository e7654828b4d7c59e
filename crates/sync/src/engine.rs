// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The sync coordinator: calendar ticks, month rotation, manual triggers.

use crate::logs::ProjectLogs;
use crate::status::{RunOutcome, StatusEntry, SyncResult, TaskStatus};
use crate::task::{rsync_error_string, SyncTask};
use chrono::{DateTime, Datelike, TimeZone, Utc};
use mirror_config::MirrorsFile;
use mirror_core::{Calendar, CalendarBuilder, Clock, Ring, SystemClock};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Added to every schedule sleep so a tick always lands past its slot.
const TICK_SLACK: Duration = Duration::from_secs(1);

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Per-run status entries kept per project.
const STATUS_RING_CAPACITY: usize = 64;

/// Runtime knobs for the engine, resolved from the environment by the
/// daemon.
#[derive(Debug, Clone, Default)]
pub struct SyncSettings {
    /// Directory for month-indexed sync output logs; `None` disables them.
    pub log_dir: Option<PathBuf>,
    /// Append `--dry-run` to rsync and skip script tasks.
    pub dry_run: bool,
    /// Suppress calendar dispatches (manual triggers still work).
    pub paused: bool,
    /// Group owner for created log files.
    pub adm_group: Option<u32>,
}

/// Everything the engine keeps per project.
struct ProjectSync {
    short: String,
    task: SyncTask,
    logs: Arc<ProjectLogs>,
    status_tx: mpsc::Sender<StatusEntry>,
    results: Arc<Ring<SyncResult>>,
}

/// Read-side handles onto the engine's per-project history rings.
pub struct SyncHandles {
    pub results: HashMap<String, Arc<Ring<SyncResult>>>,
    pub status: HashMap<String, Arc<Ring<StatusEntry>>>,
}

/// Coordinates all sync tasks for one loaded project table.
pub struct SyncEngine<C: Clock = SystemClock> {
    /// Lowercased short name -> project, for manual-trigger lookup.
    projects: HashMap<String, Arc<ProjectSync>>,
    calendar: Calendar<Arc<ProjectSync>>,
    running: Arc<Mutex<HashMap<String, bool>>>,
    settings: SyncSettings,
    clock: C,
}

impl<C: Clock + 'static> SyncEngine<C> {
    /// Construct tasks, history rings, log writers, and the day calendar
    /// for every non-static project.
    ///
    /// Must be called within a tokio runtime: each project gets a background
    /// consumer moving status entries into its status ring.
    pub fn build(mirrors: &MirrorsFile, settings: SyncSettings, clock: C) -> (Self, SyncHandles) {
        let month = utc_now(&clock).month();
        let mut projects = HashMap::new();
        let mut builder = CalendarBuilder::new();
        let mut handles = SyncHandles { results: HashMap::new(), status: HashMap::new() };

        for project in mirrors.projects() {
            let Some(task) = SyncTask::from_project(project, settings.dry_run) else {
                continue;
            };

            let logs = ProjectLogs::open(
                &project.short,
                settings.log_dir.as_deref(),
                settings.adm_group,
                month,
            );

            let (status_tx, mut status_rx) = mpsc::channel(STATUS_RING_CAPACITY);
            let status_ring = Arc::new(Ring::new(STATUS_RING_CAPACITY));
            {
                let ring = Arc::clone(&status_ring);
                tokio::spawn(async move {
                    while let Some(entry) = status_rx.recv().await {
                        ring.push(entry);
                    }
                });
            }

            // A week of history at the project's own cadence.
            let results = Arc::new(Ring::new((7 * project.syncs_per_day()).max(1) as usize));

            let ps = Arc::new(ProjectSync {
                short: project.short.clone(),
                task,
                logs,
                status_tx,
                results: Arc::clone(&results),
            });

            builder.add_task(Arc::clone(&ps), project.syncs_per_day());
            handles.results.insert(project.short.clone(), results);
            handles.status.insert(project.short.clone(), status_ring);
            projects.insert(project.short.to_lowercase(), ps);
        }

        let calendar = builder.build();
        let engine = SyncEngine {
            projects,
            calendar,
            running: Arc::new(Mutex::new(HashMap::new())),
            settings,
            clock,
        };
        (engine, handles)
    }

    /// Run the coordinator until `cancel` fires.
    ///
    /// On cancellation, in-flight workers are allowed to observe the token
    /// (killing their children) and are awaited before this returns.
    pub async fn run(mut self, cancel: CancellationToken, mut manual: mpsc::Receiver<String>) {
        let mut workers: JoinSet<()> = JoinSet::new();

        // Prime the schedule: the job whose slot most recently passed is
        // skipped, we sleep to the next planned point.
        let first_sleep = self
            .calendar
            .next_job(&self.clock)
            .map(|(_, dt)| dt)
            .unwrap_or(DAY);
        info!(
            scheduled_jobs = self.calendar.len(),
            next_sync_in = ?first_sleep,
            "sync scheduler started"
        );

        let timer = tokio::time::sleep(first_sleep + TICK_SLACK);
        tokio::pin!(timer);
        let month_timer = tokio::time::sleep(until_next_month(&self.clock));
        tokio::pin!(month_timer);

        let mut manual_open = true;
        loop {
            tokio::select! {
                _ = &mut timer => {
                    match self.calendar.next_job(&self.clock) {
                        Some((ps, dt)) => {
                            timer.as_mut().reset(tokio::time::Instant::now() + dt + TICK_SLACK);
                            if self.settings.paused {
                                debug!(project = %ps.short, "scheduler paused, skipping scheduled sync");
                            } else {
                                self.dispatch(ps, &cancel, &mut workers);
                            }
                        }
                        None => timer.as_mut().reset(tokio::time::Instant::now() + DAY),
                    }
                }

                _ = &mut month_timer => {
                    let month = utc_now(&self.clock).month();
                    info!(month, "rotating sync log files");
                    for ps in self.projects.values() {
                        ps.logs.rotate(month);
                    }
                    month_timer.as_mut().reset(
                        tokio::time::Instant::now() + until_next_month(&self.clock),
                    );
                }

                message = manual.recv(), if manual_open => {
                    match message {
                        Some(short) => match self.projects.get(&short.to_lowercase()) {
                            Some(ps) => {
                                let ps = Arc::clone(ps);
                                self.dispatch(ps, &cancel, &mut workers);
                            }
                            None => warn!(project = %short, "manual sync for unknown project"),
                        },
                        None => manual_open = false,
                    }
                }

                // Reap finished workers as they complete.
                Some(_) = workers.join_next(), if !workers.is_empty() => {}

                _ = cancel.cancelled() => break,
            }
        }

        info!(in_flight = workers.len(), "sync scheduler stopping, waiting for in-flight syncs");
        while workers.join_next().await.is_some() {}
        for ps in self.projects.values() {
            ps.logs.flush();
        }
        info!("sync scheduler stopped");
    }

    /// Start a worker for the project unless one is already running.
    fn dispatch(
        &self,
        ps: Arc<ProjectSync>,
        cancel: &CancellationToken,
        workers: &mut JoinSet<()>,
    ) {
        {
            let mut running = self.running.lock();
            if running.get(ps.short.as_str()).copied().unwrap_or(false) {
                warn!(project = %ps.short, "sync already running, coalescing trigger");
                return;
            }
            running.insert(ps.short.clone(), true);
        }

        let running = Arc::clone(&self.running);
        let cancel = cancel.clone();
        let clock = self.clock.clone();
        workers.spawn(async move {
            let started_at = utc_now(&clock);
            info!(project = %ps.short, "sync started");

            let outcome = ps.task.run(&cancel, &ps.logs, &ps.status_tx).await;
            ps.logs.flush();

            let ended_at = utc_now(&clock);
            report(&ps, &outcome);
            ps.results.push(SyncResult {
                started_at,
                ended_at,
                status: outcome.status,
                stage: outcome.stage,
            });

            running.lock().insert(ps.short.clone(), false);
        });
    }
}

/// Log the outcome of a finished run.
///
/// Rsync partial-transfer codes (23/24) are logged without the stderr
/// attachment and are not escalated further.
fn report(ps: &ProjectSync, outcome: &RunOutcome) {
    match outcome.status {
        TaskStatus::Success => info!(project = %ps.short, "sync finished successfully"),
        TaskStatus::Stopped => {
            info!(project = %ps.short, stage = outcome.stage, "sync stopped by shutdown")
        }
        TaskStatus::Failure { code } if ps.task.is_rsync() => {
            if code == 23 || code == 24 {
                error!(
                    project = %ps.short,
                    stage = outcome.stage,
                    code,
                    meaning = rsync_error_string(code),
                    "sync failed"
                );
            } else {
                error!(
                    project = %ps.short,
                    stage = outcome.stage,
                    code,
                    meaning = rsync_error_string(code),
                    stderr = %outcome.stderr_tail,
                    "sync failed"
                );
            }
        }
        TaskStatus::Failure { code } => {
            error!(
                project = %ps.short,
                code,
                stderr = %outcome.stderr_tail,
                "sync failed"
            );
        }
    }
}

fn utc_now<C: Clock>(clock: &C) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(clock.epoch_ms() as i64).unwrap_or_else(Utc::now)
}

/// Duration until the first instant of the next month.
fn until_next_month<C: Clock>(clock: &C) -> Duration {
    let now = utc_now(clock);
    let (year, month) = if now.month() == 12 {
        (now.year() + 1, 1)
    } else {
        (now.year(), now.month() + 1)
    };
    let rollover = Utc
        .with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .unwrap_or(now + chrono::Duration::days(31));
    (rollover - now).to_std().unwrap_or(DAY)
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
