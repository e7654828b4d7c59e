// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Live map fan-out: one hub task owns the websocket client set.
//!
//! Register/unregister/broadcast all arrive as messages; nothing touches
//! the client set from outside the hub task, so no lock is ever held
//! across a send.

mod message;

pub use message::{location_record, run_pipeline};

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Outbound buffer per websocket client; a full buffer drops messages for
/// that client rather than slowing the broadcast.
pub const CLIENT_BUFFER: usize = 16;

enum HubMessage {
    Register { id: u64, sender: mpsc::Sender<Vec<u8>> },
    Unregister { id: u64 },
    Broadcast(Vec<u8>),
}

/// Cloneable handle onto the hub task.
#[derive(Clone)]
pub struct MapHub {
    tx: mpsc::Sender<HubMessage>,
    count: Arc<AtomicUsize>,
    next_id: Arc<AtomicU64>,
}

/// Start the hub task and return its handle.
pub fn spawn_hub(cancel: CancellationToken) -> MapHub {
    let (tx, rx) = mpsc::channel(64);
    let count = Arc::new(AtomicUsize::new(0));
    tokio::spawn(run_hub(rx, Arc::clone(&count), cancel));
    MapHub { tx, count, next_id: Arc::new(AtomicU64::new(1)) }
}

impl MapHub {
    /// Add a client; the returned id is used to unregister it.
    pub async fn register(&self, sender: mpsc::Sender<Vec<u8>>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let _ = self.tx.send(HubMessage::Register { id, sender }).await;
        id
    }

    pub async fn unregister(&self, id: u64) {
        let _ = self.tx.send(HubMessage::Unregister { id }).await;
    }

    /// Send one binary frame to every connected client.
    pub async fn broadcast(&self, message: Vec<u8>) {
        let _ = self.tx.send(HubMessage::Broadcast(message)).await;
    }

    /// Number of connected clients (served by `/map/health`).
    pub fn client_count(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }
}

async fn run_hub(
    mut rx: mpsc::Receiver<HubMessage>,
    count: Arc<AtomicUsize>,
    cancel: CancellationToken,
) {
    let mut clients: HashMap<u64, mpsc::Sender<Vec<u8>>> = HashMap::new();

    loop {
        let message = tokio::select! {
            message = rx.recv() => message,
            _ = cancel.cancelled() => break,
        };

        match message {
            Some(HubMessage::Register { id, sender }) => {
                clients.insert(id, sender);
                count.store(clients.len(), Ordering::Relaxed);
                info!(client = id, clients = clients.len(), "registered map client");
            }
            Some(HubMessage::Unregister { id }) => {
                clients.remove(&id);
                count.store(clients.len(), Ordering::Relaxed);
                info!(client = id, clients = clients.len(), "unregistered map client");
            }
            Some(HubMessage::Broadcast(message)) => {
                for (id, client) in &clients {
                    // A client that cannot keep up is skipped, not
                    // disconnected.
                    if client.try_send(message.clone()).is_err() {
                        debug!(client = id, "skipping slow map client");
                    }
                }
            }
            None => break,
        }
    }
}

#[cfg(test)]
#[path = "hub_tests.rs"]
mod tests;
