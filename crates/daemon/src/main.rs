// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mirror daemon (mirrord)
//!
//! Long-running process that schedules mirror synchronisation, tails the
//! access and rsync-daemon logs into traffic counters, and serves the
//! manual-sync and live-map HTTP endpoints.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod env;
mod http;
mod lifecycle;
mod map;
mod supervisor;

use chrono::{DateTime, Utc};
use lifecycle::{Config, LifecycleError};
use mirror_config::Token;
use mirror_core::SystemClock;
use mirror_sync::{spawn_log_pruner, SyncEngine, SyncSettings};
use mirror_telemetry::{
    nginx, rsyncd, start_aggregator, tail_file, MemorySink, NoopWriter, ProjectAggregator,
    RsyncdAggregator, StatsReader, StatsWriter,
};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use supervisor::SupervisorError;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const LISTEN_ADDR: &str = "0.0.0.0:8001";

/// Manual-trigger channel depth shared by the gateway and engine.
const MANUAL_CHANNEL_CAPACITY: usize = 64;

/// Fan-out channel depth between the tailers and their subscribers.
const ENTRY_CHANNEL_CAPACITY: usize = 1024;

#[tokio::main]
async fn main() -> ExitCode {
    let mut args = std::env::args().skip(1);
    let mut positional: Vec<String> = Vec::new();
    for arg in &mut args {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("mirrord {}", env!("CARGO_PKG_VERSION"));
                return ExitCode::SUCCESS;
            }
            "--help" | "-h" => {
                println!("mirrord {}", env!("CARGO_PKG_VERSION"));
                println!("Mirror daemon - schedules syncs and aggregates traffic statistics");
                println!();
                println!("USAGE:");
                println!("    mirrord [mirrors.json] [tokens.toml]");
                println!();
                println!("Defaults to configs/mirrors.json and configs/tokens.toml.");
                println!("Behavior is configured through environment variables; see the");
                println!("README for the recognised set.");
                return ExitCode::SUCCESS;
            }
            other => positional.push(other.to_string()),
        }
    }

    let mirrors_path = positional
        .first()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("configs/mirrors.json"));
    let tokens_path = positional
        .get(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("configs/tokens.toml"));

    let config = Config::new(mirrors_path, tokens_path);
    let _log_guard = lifecycle::init_logging(config.log_dir.as_deref());

    match run(config).await {
        Ok(()) => {
            info!("daemon stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> Result<(), LifecycleError> {
    // Refuse to run twice; the handle holds the advisory lock until exit.
    let _lock = lifecycle::acquire_lock(&config.lock_path)?;

    let (mirrors, mut tokens) = lifecycle::load_tables(&config)?;
    info!(
        projects = mirrors.projects().count(),
        tokens = tokens.tokens.len(),
        "configuration loaded"
    );

    if let Some(secret) = env::pull_token() {
        tokens.tokens.push(Token {
            name: "pull".to_string(),
            token: secret,
            projects: Vec::new(),
        });
    }

    match lifecycle::write_rsyncd_conf(&config, &mirrors) {
        Ok(path) => info!(path = %path.display(), "wrote rsyncd.conf"),
        Err(e) => warn!(error = %e, "failed to write rsyncd.conf"),
    }

    let cancel = CancellationToken::new();

    // Values derived from the table before it goes behind the lock.
    let shorts: Vec<String> = mirrors.projects().map(|p| p.short.clone()).collect();
    let project_ids: HashMap<String, u8> =
        mirrors.projects().map(|p| (p.short.clone(), p.id)).collect();
    let subnets = mirrors.parsed_subnets();

    let mirrors = Arc::new(RwLock::new(mirrors));
    let tokens = Arc::new(RwLock::new(tokens));

    // --- Sync engine, restarted by the supervisor on crash ---
    let sync_settings = SyncSettings {
        log_dir: config.log_dir.clone(),
        dry_run: env::rsync_dry_run(),
        paused: env::scheduler_paused(),
        adm_group: env::adm_group(),
    };
    if sync_settings.dry_run {
        info!("RSYNC_DRY_RUN is set; rsync runs with --dry-run, scripts are skipped");
    }
    if sync_settings.paused {
        info!("SCHEDULER_PAUSED is set; scheduled syncs are suspended");
    }
    if let Some(dir) = &sync_settings.log_dir {
        if let Err(e) = std::fs::create_dir_all(dir) {
            warn!(dir = %dir.display(), error = %e, "cannot create sync log directory");
        }
        spawn_log_pruner(dir.clone(), cancel.clone());
    }

    let manual_slot: http::ManualSlot = Arc::new(RwLock::new(None));
    let mut supervisor_task = {
        let mirrors = Arc::clone(&mirrors);
        let manual_slot = Arc::clone(&manual_slot);
        let settings = sync_settings.clone();
        let cancel = cancel.clone();
        let engine_cancel = cancel.clone();
        tokio::spawn(supervisor::run_supervised(
            move || {
                let (manual_tx, manual_rx) = mpsc::channel(MANUAL_CHANNEL_CAPACITY);
                *manual_slot.write() = Some(manual_tx);
                let (engine, _handles) =
                    SyncEngine::build(&mirrors.read(), settings.clone(), SystemClock);
                tokio::spawn(engine.run(engine_cancel.clone(), manual_rx))
            },
            cancel,
        ))
    };

    // --- Map hub and record pipeline ---
    let hub = map::spawn_hub(cancel.clone());
    let (map_tx, map_rx) = mpsc::channel(ENTRY_CHANNEL_CAPACITY);
    tokio::spawn(map::run_pipeline(map_rx, hub.clone(), project_ids, cancel.clone()));

    // --- Telemetry sinks and tailers ---
    // The real time-series client is injected at the edge of the process;
    // without one the in-memory sink keeps warm-start and flush semantics
    // intact for the lifetime of the process.
    let sink = MemorySink::new();
    let reader: Arc<dyn StatsReader> = Arc::new(sink.clone());
    let writer: Arc<dyn StatsWriter> = if env::influx_token().is_none() {
        info!("INFLUX_TOKEN is not set; traffic counters will not be persisted");
        Arc::new(NoopWriter)
    } else if env::influx_read_only() {
        info!("INFLUX_READ_ONLY is set; not writing counter points");
        Arc::new(NoopWriter)
    } else {
        Arc::new(sink.clone())
    };

    match env::nginx_tail() {
        Some(path) => {
            let mut aggregator = ProjectAggregator::new(shorts.clone());
            aggregator.add_measurement("nginx", |_| true);
            for (name, networks) in subnets {
                info!(measurement = %name, subnets = networks.len(), "added subnet measurement");
                aggregator.add_subnet_measurement(&name, networks);
            }

            let (agg_tx, agg_rx) = mpsc::channel(ENTRY_CHANNEL_CAPACITY);
            match start_aggregator(
                Arc::clone(&reader),
                Arc::clone(&writer),
                aggregator,
                agg_rx,
                cancel.clone(),
            )
            .await
            {
                Ok((last_updated, _handle)) => {
                    let offset = resume_offset(&path, last_updated, nginx::parse_date);
                    let subscribers = vec![agg_tx, map_tx.clone()];
                    let tail_cancel = cancel.clone();
                    tokio::spawn(async move {
                        let parse = |line: &str| nginx::parse_line(line, None).ok();
                        if let Err(e) =
                            tail_file(&path, offset, parse, subscribers, tail_cancel).await
                        {
                            error!(error = %e, "access log tailer stopped");
                        }
                    });
                }
                Err(e) => {
                    error!(error = %e, "access aggregator warm-start failed; not tailing")
                }
            }
        }
        None => info!("NGINX_TAIL is not set; access log statistics disabled"),
    }

    match env::rsyncd_tail() {
        Some(path) => {
            let (agg_tx, agg_rx) = mpsc::channel(ENTRY_CHANNEL_CAPACITY);
            match start_aggregator(
                Arc::clone(&reader),
                Arc::clone(&writer),
                RsyncdAggregator::new(),
                agg_rx,
                cancel.clone(),
            )
            .await
            {
                Ok((last_updated, _handle)) => {
                    let offset = resume_offset(&path, last_updated, rsyncd::parse_date);
                    let tail_cancel = cancel.clone();
                    tokio::spawn(async move {
                        let parse = |line: &str| rsyncd::parse_line(line).ok();
                        if let Err(e) =
                            tail_file(&path, offset, parse, vec![agg_tx], tail_cancel).await
                        {
                            error!(error = %e, "rsyncd log tailer stopped");
                        }
                    });
                }
                Err(e) => {
                    error!(error = %e, "rsyncd aggregator warm-start failed; not tailing")
                }
            }
        }
        None => info!("RSYNCD_TAIL is not set; rsyncd statistics disabled"),
    }

    // --- HTTP surface ---
    let state = Arc::new(http::AppState {
        mirrors,
        tokens,
        manual: manual_slot,
        map: hub,
    });
    let app = http::router(state);
    let listener = tokio::net::TcpListener::bind(LISTEN_ADDR)
        .await
        .map_err(|source| LifecycleError::Bind { addr: LISTEN_ADDR.to_string(), source })?;
    info!(addr = LISTEN_ADDR, "http server listening");

    let server_cancel = cancel.clone();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { server_cancel.cancelled().await })
            .await
    });

    // --- Wait for shutdown or a fatal supervisor exit ---
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    let mut supervisor_result: Option<Result<(), SupervisorError>> = None;
    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
        _ = sigint.recv() => info!("received SIGINT, shutting down"),
        joined = &mut supervisor_task => supervisor_result = Some(join_outcome(joined)),
    }

    cancel.cancel();

    if supervisor_result.is_none() {
        supervisor_result = Some(join_outcome(supervisor_task.await));
    }
    if let Err(e) = server.await.unwrap_or(Ok(())) {
        warn!(error = %e, "http server exited with error");
    }

    match supervisor_result {
        Some(Err(e)) => Err(e.into()),
        _ => Ok(()),
    }
}

fn join_outcome(
    joined: Result<Result<(), SupervisorError>, tokio::task::JoinError>,
) -> Result<(), SupervisorError> {
    match joined {
        Ok(result) => result,
        Err(e) => {
            error!(error = %e, "supervisor task failed");
            Ok(())
        }
    }
}

/// Where to resume tailing `path` given the sink's last flush time.
fn resume_offset(
    path: &Path,
    last_updated: DateTime<Utc>,
    parse_date: fn(&str) -> Option<DateTime<Utc>>,
) -> u64 {
    match mirror_core::offset::find_offset(path, last_updated, parse_date) {
        Ok(offset) => offset,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "cannot locate resume offset, starting at 0");
            0
        }
    }
}
