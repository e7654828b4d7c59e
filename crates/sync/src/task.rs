// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One project's sync task: the external process(es) run per sync.

use crate::logs::ProjectLogs;
use crate::status::{emit, RunOutcome, StatusEntry, TaskStatus};
use mirror_config::{Project, SyncStyle};
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// How much trailing stderr to keep for failure escalation.
const STDERR_TAIL_LIMIT: usize = 4096;

/// A runnable sync for one project, precomputed from its config.
pub enum SyncTask {
    Rsync(RsyncTask),
    Script(ScriptTask),
}

/// Multi-stage rsync invocation sharing source and destination.
pub struct RsyncTask {
    short: String,
    /// `host::module` or `user@host::module`.
    source: String,
    dest: String,
    /// Per-stage argument lists, run sequentially.
    stages: Vec<Vec<String>>,
    /// Secret injected as `RSYNC_PASSWORD`; never logged.
    password: Option<String>,
    dry_run: bool,
}

/// Single configured command with environment overrides.
pub struct ScriptTask {
    short: String,
    command: String,
    arguments: Vec<String>,
    env: HashMap<String, String>,
    dry_run: bool,
}

impl SyncTask {
    /// Build the task for a project, or `None` for static projects.
    pub fn from_project(project: &Project, dry_run: bool) -> Option<SyncTask> {
        match project.sync_style() {
            SyncStyle::Static => None,
            SyncStyle::Rsync => {
                let rsync = project.rsync.as_ref()?;
                let source = if rsync.user.is_empty() {
                    format!("{}::{}", rsync.host, rsync.src)
                } else {
                    format!("{}@{}::{}", rsync.user, rsync.host, rsync.src)
                };
                let stages = rsync
                    .stages
                    .iter()
                    .map(|s| s.split_whitespace().map(String::from).collect())
                    .collect();
                let password = if rsync.password_file.is_empty() {
                    None
                } else {
                    match std::fs::read_to_string(&rsync.password_file) {
                        Ok(contents) => Some(contents.trim_end().to_string()),
                        Err(e) => {
                            warn!(project = %project.short, error = %e,
                                "failed to read rsync password file");
                            None
                        }
                    }
                };
                Some(SyncTask::Rsync(RsyncTask {
                    short: project.short.clone(),
                    source,
                    dest: rsync.dest.clone(),
                    stages,
                    password,
                    dry_run,
                }))
            }
            SyncStyle::Script => {
                let script = project.script.as_ref()?;
                Some(SyncTask::Script(ScriptTask {
                    short: project.short.clone(),
                    command: script.command.clone(),
                    arguments: script.arguments.clone(),
                    env: script.env.clone(),
                    dry_run,
                }))
            }
        }
    }

    pub fn short(&self) -> &str {
        match self {
            SyncTask::Rsync(t) => &t.short,
            SyncTask::Script(t) => &t.short,
        }
    }

    pub fn is_rsync(&self) -> bool {
        matches!(self, SyncTask::Rsync(_))
    }

    /// Run the task to completion or cancellation.
    ///
    /// Stages run sequentially; the first non-success ends the run and is
    /// returned with the index of the stage that produced it. Lifecycle
    /// entries go to `status` (dropped when the channel is saturated) and
    /// process output streams into `logs`.
    pub async fn run(
        &self,
        cancel: &CancellationToken,
        logs: &Arc<ProjectLogs>,
        status: &mpsc::Sender<StatusEntry>,
    ) -> RunOutcome {
        match self {
            SyncTask::Rsync(t) => t.run(cancel, logs, status).await,
            SyncTask::Script(t) => t.run(cancel, logs, status).await,
        }
    }
}

impl RsyncTask {
    async fn run(
        &self,
        cancel: &CancellationToken,
        logs: &Arc<ProjectLogs>,
        status: &mpsc::Sender<StatusEntry>,
    ) -> RunOutcome {
        emit(status, StatusEntry::info(format!("{}: starting rsync", self.short)));

        let mut outcome = RunOutcome {
            status: TaskStatus::Success,
            stage: self.stages.len().saturating_sub(1),
            stderr_tail: String::new(),
        };

        for (stage, args) in self.stages.iter().enumerate() {
            let mut command = Command::new("rsync");
            command.args(args);
            if self.dry_run {
                command.arg("--dry-run");
            }
            command.arg(&self.source).arg(&self.dest);
            if let Some(password) = &self.password {
                command.env("RSYNC_PASSWORD", password);
            }

            emit(
                status,
                StatusEntry::info(format!(
                    "{}: stage {} starting: rsync {} {} {}",
                    self.short,
                    stage,
                    args.join(" "),
                    self.source,
                    self.dest
                )),
            );
            logs.stamp(&chrono::Utc::now().to_rfc2822());

            let (stage_status, stderr_tail) =
                run_command(&self.short, command, cancel, logs).await;
            match stage_status {
                TaskStatus::Success => {
                    emit(
                        status,
                        StatusEntry::success(format!(
                            "{}: stage {} completed successfully",
                            self.short, stage
                        )),
                    );
                    outcome.stderr_tail = stderr_tail;
                }
                TaskStatus::Stopped => {
                    emit(status, StatusEntry::info(format!("{}: stage {} stopped", self.short, stage)));
                    return RunOutcome { status: stage_status, stage, stderr_tail };
                }
                TaskStatus::Failure { code } => {
                    emit(
                        status,
                        StatusEntry::error(format!(
                            "{}: stage {} failed with exit code {} ({})",
                            self.short,
                            stage,
                            code,
                            rsync_error_string(code)
                        )),
                    );
                    return RunOutcome { status: stage_status, stage, stderr_tail };
                }
            }
        }

        outcome
    }
}

impl ScriptTask {
    async fn run(
        &self,
        cancel: &CancellationToken,
        logs: &Arc<ProjectLogs>,
        status: &mpsc::Sender<StatusEntry>,
    ) -> RunOutcome {
        if self.dry_run {
            emit(status, StatusEntry::info(format!("{}: skipping script (dry run)", self.short)));
            return RunOutcome {
                status: TaskStatus::Success,
                stage: 0,
                stderr_tail: String::new(),
            };
        }

        let mut command = Command::new(&self.command);
        command.args(&self.arguments);
        command.envs(&self.env);

        emit(
            status,
            StatusEntry::info(format!(
                "{}: starting script: {} {}",
                self.short,
                self.command,
                self.arguments.join(" ")
            )),
        );
        logs.stamp(&chrono::Utc::now().to_rfc2822());

        let (task_status, stderr_tail) = run_command(&self.short, command, cancel, logs).await;
        match task_status {
            TaskStatus::Success => emit(
                status,
                StatusEntry::success(format!("{}: script finished successfully", self.short)),
            ),
            TaskStatus::Stopped => {
                emit(status, StatusEntry::info(format!("{}: script stopped", self.short)))
            }
            TaskStatus::Failure { code } => emit(
                status,
                StatusEntry::error(format!(
                    "{}: script failed with exit code {}",
                    self.short, code
                )),
            ),
        }

        RunOutcome { status: task_status, stage: 0, stderr_tail }
    }
}

/// Spawn one child, streaming its output to `logs`, and classify the exit.
///
/// Returns the classification together with the retained stderr tail. On
/// cancellation the child is killed and `Stopped` returned.
async fn run_command(
    short: &str,
    mut command: Command,
    cancel: &CancellationToken,
    logs: &Arc<ProjectLogs>,
) -> (TaskStatus, String) {
    command.stdout(Stdio::piped()).stderr(Stdio::piped()).kill_on_drop(true);

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(e) => {
            warn!(project = %short, error = %e, "failed to start sync process");
            return (TaskStatus::Failure { code: -1 }, format!("failed to start: {e}"));
        }
    };

    // Relay tasks drain the pipes so the child never blocks on a full pipe,
    // even while we are parked in select! below.
    let stdout_task = child.stdout.take().map(|mut stdout| {
        let logs = Arc::clone(logs);
        tokio::spawn(async move {
            let mut buf = [0u8; 8192];
            while let Ok(n) = stdout.read(&mut buf).await {
                if n == 0 {
                    break;
                }
                logs.write_stdout(&buf[..n]);
            }
        })
    });
    let stderr_task = child.stderr.take().map(|mut stderr| {
        let logs = Arc::clone(logs);
        tokio::spawn(async move {
            let mut tail: Vec<u8> = Vec::new();
            let mut buf = [0u8; 8192];
            while let Ok(n) = stderr.read(&mut buf).await {
                if n == 0 {
                    break;
                }
                logs.write_stderr(&buf[..n]);
                tail.extend_from_slice(&buf[..n]);
                if tail.len() > STDERR_TAIL_LIMIT {
                    tail.drain(..tail.len() - STDERR_TAIL_LIMIT);
                }
            }
            String::from_utf8_lossy(&tail).into_owned()
        })
    });

    let mut cancelled = false;
    let status = tokio::select! {
        result = child.wait() => match result {
            Ok(exit) => match exit.code() {
                Some(0) => TaskStatus::Success,
                Some(code) => TaskStatus::Failure { code },
                // Killed by signal.
                None => TaskStatus::Failure { code: -1 },
            },
            Err(e) => {
                warn!(project = %short, error = %e, "failed to wait for sync process");
                TaskStatus::Failure { code: -1 }
            }
        },
        _ = cancel.cancelled() => {
            cancelled = true;
            TaskStatus::Stopped
        }
    };
    if cancelled {
        if let Err(e) = child.start_kill() {
            warn!(project = %short, error = %e, "failed to kill sync process");
        }
        let _ = child.wait().await;
    }

    if let Some(task) = stdout_task {
        let _ = task.await;
    }
    let stderr_tail = match stderr_task {
        Some(task) => task.await.unwrap_or_default(),
        None => String::new(),
    };

    (status, stderr_tail)
}

/// Human-readable meaning of an rsync exit code, from rsync(1).
pub fn rsync_error_string(code: i32) -> &'static str {
    match code {
        0 => "Success",
        1 => "Syntax or usage error",
        2 => "Protocol incompatibility",
        3 => "Errors selecting input/output files, dirs",
        4 => "Requested action not supported: an attempt was made to manipulate 64-bit files on a platform that cannot support them; or an option was specified that is supported by the client and not by the server.",
        5 => "Error starting client-server protocol",
        6 => "Daemon unable to append to log-file",
        10 => "Error in socket I/O",
        11 => "Error in file I/O",
        12 => "Error in rsync protocol data stream",
        13 => "Errors with program diagnostics",
        14 => "Error in IPC code",
        20 => "Received SIGUSR1 or SIGINT",
        21 => "Some error returned by waitpid()",
        22 => "Error allocating core memory buffers",
        23 => "Partial transfer due to error",
        24 => "Partial transfer due to vanished source files",
        25 => "The --max-delete limit stopped deletions",
        30 => "Timeout in data send/receive",
        35 => "Timeout waiting for daemon connection",
        _ => "Unknown",
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
