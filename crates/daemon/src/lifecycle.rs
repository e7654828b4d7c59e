// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon startup: lock file, logging, config loading.

use fs2::FileExt;
use mirror_config::{ConfigError, MirrorsFile, Tokens};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Daemon configuration resolved from arguments and the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to mirrors.json.
    pub mirrors_path: PathBuf,
    /// Path to tokens.toml.
    pub tokens_path: PathBuf,
    /// Process-wide lock file.
    pub lock_path: PathBuf,
    /// Directory for per-project sync logs and the daemon log file.
    pub log_dir: Option<PathBuf>,
}

impl Config {
    pub fn new(mirrors_path: PathBuf, tokens_path: PathBuf) -> Self {
        Config {
            mirrors_path,
            tokens_path,
            lock_path: crate::env::lock_path(),
            log_dir: crate::env::rsync_logs(),
        }
    }
}

/// Startup and shutdown errors. All are fatal.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("another instance is already running (lock: {0})")]
    LockHeld(PathBuf),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Supervisor(#[from] crate::supervisor::SupervisorError),
}

/// Take the process-wide advisory lock, refusing to start a second
/// instance.
///
/// Opened without truncation so a losing contender cannot wipe the running
/// daemon's pid; the pid is written only after the lock is held. The
/// returned handle must stay alive for the daemon's lifetime.
pub fn acquire_lock(path: &Path) -> Result<File, LifecycleError> {
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?;
    file.try_lock_exclusive()
        .map_err(|_| LifecycleError::LockHeld(path.to_path_buf()))?;

    file.set_len(0)?;
    writeln!(file, "{}", std::process::id())?;
    Ok(file)
}

/// Load and validate both config tables.
pub fn load_tables(config: &Config) -> Result<(MirrorsFile, Tokens), LifecycleError> {
    let mirrors = MirrorsFile::load(&config.mirrors_path)?;
    let tokens = if config.tokens_path.exists() {
        Tokens::load(&config.tokens_path)?
    } else {
        info!(path = %config.tokens_path.display(), "no tokens file, manual sync disabled");
        Tokens::default()
    };
    Ok((mirrors, tokens))
}

/// Install the tracing subscriber: stdout always, plus a non-blocking file
/// appender in the log directory when one is configured.
///
/// Returns the appender guard; dropping it flushes the file writer.
pub fn init_logging(
    log_dir: Option<&Path>,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter).with(fmt::layer());

    match log_dir {
        Some(dir) if std::fs::create_dir_all(dir).is_ok() => {
            let appender = tracing_appender::rolling::never(dir, "mirrord.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            registry
                .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
                .init();
            Some(guard)
        }
        _ => {
            registry.init();
            None
        }
    }
}

/// Write the generated rsyncd.conf next to the config files.
///
/// Best-effort: failure is logged by the caller, the daemon still starts.
pub fn write_rsyncd_conf(config: &Config, mirrors: &MirrorsFile) -> std::io::Result<PathBuf> {
    let path = config
        .mirrors_path
        .parent()
        .unwrap_or(Path::new("."))
        .join("rsyncd.conf");
    let mut file = File::create(&path)?;
    mirror_config::write_rsyncd_conf(&mut file, mirrors)?;
    Ok(path)
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
