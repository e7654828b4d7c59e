// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP surface of the daemon: manual-sync gateway, health, map websocket.

use crate::map::{MapHub, CLIENT_BUFFER};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use mirror_config::{MirrorsFile, SyncStyle, Tokens};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Slot holding the current manual-trigger sender.
///
/// The supervisor republishes a fresh sender on every engine (re)start;
/// an empty slot or a saturated channel answers 503.
pub type ManualSlot = Arc<RwLock<Option<mpsc::Sender<String>>>>;

/// Shared state behind every handler.
///
/// The tables sit behind read-write locks: a reload builds new tables and
/// swaps them wholesale, request paths only ever take read locks.
pub struct AppState {
    pub mirrors: Arc<RwLock<MirrorsFile>>,
    pub tokens: Arc<RwLock<Tokens>>,
    pub manual: ManualSlot,
    pub map: MapHub,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/sync/:project", get(sync_project).post(sync_project))
        .route("/map/ws", get(map_ws))
        .route("/map/health", get(map_health))
        .with_state(state)
}

async fn health() -> StatusCode {
    StatusCode::OK
}

/// Count of connected map clients.
async fn map_health(State(state): State<Arc<AppState>>) -> String {
    state.map.client_count().to_string()
}

/// `GET|POST /sync/{project}?token=…` — authenticated manual trigger.
async fn sync_project(
    State(state): State<Arc<AppState>>,
    Path(project): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let Some(secret) = params.get("token") else {
        return (StatusCode::BAD_REQUEST, "missing token\n").into_response();
    };

    let token = {
        let tokens = state.tokens.read();
        tokens.get(secret).cloned()
    };
    let Some(token) = token else {
        warn!(project = %project, "manual sync with unknown token");
        return (StatusCode::FORBIDDEN, "invalid token\n").into_response();
    };

    if project == "all" {
        if !token.allows_all() {
            warn!(token = %token.name, "token not allowed to sync all projects");
            return (StatusCode::FORBIDDEN, "token not allowed for all projects\n")
                .into_response();
        }
        let shorts: Vec<String> = {
            let mirrors = state.mirrors.read();
            mirrors
                .projects()
                .filter(|p| p.sync_style() != SyncStyle::Static)
                .map(|p| p.short.clone())
                .collect()
        };
        for short in &shorts {
            if let Err(response) = dispatch(&state, short) {
                return response;
            }
        }
        info!(token = %token.name, count = shorts.len(), "manual sync of all projects");
        return (
            StatusCode::OK,
            format!("triggered sync for {} projects\n", shorts.len()),
        )
            .into_response();
    }

    if !token.allows(&project) {
        warn!(token = %token.name, project = %project, "token not allowed for project");
        return (StatusCode::FORBIDDEN, "token not allowed for this project\n").into_response();
    }

    match dispatch(&state, &project) {
        Ok(()) => {
            info!(token = %token.name, project = %project, "manual sync triggered");
            (StatusCode::OK, format!("triggered sync for {project}\n")).into_response()
        }
        Err(response) => response,
    }
}

/// Hand a short name to the sync engine without blocking.
fn dispatch(state: &AppState, short: &str) -> Result<(), Response> {
    let manual = state.manual.read();
    let Some(tx) = manual.as_ref() else {
        return Err(
            (StatusCode::SERVICE_UNAVAILABLE, "sync engine not available\n").into_response()
        );
    };
    tx.try_send(short.to_string()).map_err(|_| {
        (StatusCode::SERVICE_UNAVAILABLE, "sync engine not accepting triggers\n").into_response()
    })
}

/// Upgrade to a websocket and attach the client to the map hub.
async fn map_ws(State(state): State<Arc<AppState>>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| map_client(socket, state))
}

async fn map_client(socket: WebSocket, state: Arc<AppState>) {
    let (tx, mut rx) = mpsc::channel::<Vec<u8>>(CLIENT_BUFFER);
    let id = state.map.register(tx).await;

    let (mut sink, mut stream) = socket.split();
    loop {
        tokio::select! {
            outbound = rx.recv() => match outbound {
                Some(message) => {
                    if sink.send(Message::Binary(message)).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
            inbound = stream.next() => match inbound {
                // The map protocol is one-way; inbound frames are ignored,
                // but reading them keeps ping/pong alive.
                Some(Ok(_)) => {}
                Some(Err(_)) | None => break,
            },
        }
    }

    state.map.unregister(id).await;
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
