// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Restart boundary around the sync coordinator.
//!
//! A crashed coordinator is restarted as long as crashes stay rare; a
//! burst of them means something is structurally wrong and the process
//! should die so the service supervisor can restart it cleanly.

use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

/// Crashes inside this window count against the limit.
const CRASH_WINDOW: Duration = Duration::from_secs(60 * 60);

/// Restarts allowed within the window; the next crash is fatal.
const MAX_RESTARTS: usize = 3;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("sync coordinator crashed {0} times within an hour, giving up")]
    CrashLoop(usize),
}

/// Run the coordinator produced by `spawn_engine` until shutdown,
/// restarting it after a crash.
///
/// The factory is called once per (re)start; it rebuilds the engine and
/// re-publishes the manual-trigger channel. Returns `Ok` on cancellation
/// and [`SupervisorError::CrashLoop`] after the fourth crash in an hour.
pub async fn run_supervised<F>(
    mut spawn_engine: F,
    cancel: CancellationToken,
) -> Result<(), SupervisorError>
where
    F: FnMut() -> JoinHandle<()>,
{
    let mut crashes: Vec<Instant> = Vec::new();

    loop {
        let handle = spawn_engine();
        let result = handle.await;

        if cancel.is_cancelled() {
            return Ok(());
        }

        match result {
            Ok(()) => {
                // The coordinator only returns on cancellation; a return
                // without it means its inputs are gone.
                warn!("sync coordinator exited unexpectedly, restarting");
            }
            Err(e) if e.is_panic() => {
                error!("sync coordinator panicked, restarting");
            }
            Err(e) => {
                warn!(error = %e, "sync coordinator task failed, restarting");
            }
        }

        let now = Instant::now();
        crashes.retain(|at| now.duration_since(*at) < CRASH_WINDOW);
        crashes.push(now);
        if crashes.len() > MAX_RESTARTS {
            return Err(SupervisorError::CrashLoop(crashes.len()));
        }
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
