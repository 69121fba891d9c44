//! Subscription stream manager — the live board-update channel.
//!
//! DESIGN
//! ======
//! One spawned task per stream owns the whole connection lifecycle:
//! connect → `connection_init` handshake → await `connection_ack` →
//! `subscribe` scoped to the board id → emit decoded snapshots. Any
//! transport error, protocol error for the active operation, or
//! server-initiated `complete` tears the connection down and schedules a
//! reconnect with capped exponential backoff and jitter. While the network
//! is reported offline, no connection is attempted; the task suspends until
//! the online transition.
//!
//! Exactly one connection attempt is live at a time. Snapshots older than
//! the last emitted version are dropped so out-of-order delivery never
//! regresses consumer state.
//!
//! ERROR HANDLING
//! ==============
//! Reconnect attempts are logged and otherwise invisible to the consumer;
//! the stream only ends when the consumer cancels it by dropping the
//! `BoardUpdates` handle, which triggers a polite `complete` and a socket
//! close on the way out.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::board::Board;
use crate::net::ws_types::{ClientMessage, ServerMessage, payload_to_board};
use crate::repo::BoardUpdates;

/// GraphQL document sent with each `subscribe` operation.
pub const BOARD_UPDATED_SUBSCRIPTION: &str = "subscription BoardUpdated($boardId: ID!) { \
     boardUpdated(boardId: $boardId) { id version widgets { id type x y width height configJson } } }";

const DEFAULT_BASE_RECONNECT_DELAY: Duration = Duration::from_millis(250);
const DEFAULT_MAX_RECONNECT_DELAY: Duration = Duration::from_millis(5000);
const DEFAULT_CHANNEL_CAPACITY: usize = 32;

// =============================================================================
// TRANSPORT ABSTRACTION
// =============================================================================

/// Transport failure while connecting or talking to the server.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("connect failed: {0}")]
    Connect(String),
    #[error("transport error: {0}")]
    Transport(String),
}

/// Opens subscription connections. The production implementation lives in
/// `net::ws`; tests substitute scripted fakes.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn Connection>, StreamError>;
}

/// One live, message-framed connection.
#[async_trait]
pub trait Connection: Send {
    async fn send(&mut self, message: ClientMessage) -> Result<(), StreamError>;

    /// Next inbound protocol message. `None` means the server closed the
    /// connection.
    async fn recv(&mut self) -> Option<Result<ServerMessage, StreamError>>;

    /// Best-effort close.
    async fn close(&mut self);
}

// =============================================================================
// CONFIG
// =============================================================================

/// Stream tuning knobs. Defaults match the production reconnect policy.
#[derive(Debug, Clone)]
pub struct SubscriptionConfig {
    pub base_reconnect_delay: Duration,
    pub max_reconnect_delay: Duration,
    pub channel_capacity: usize,
    pub query: String,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            base_reconnect_delay: DEFAULT_BASE_RECONNECT_DELAY,
            max_reconnect_delay: DEFAULT_MAX_RECONNECT_DELAY,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            query: BOARD_UPDATED_SUBSCRIPTION.to_owned(),
        }
    }
}

/// Watch channel that always reports the network as online. Useful where no
/// connectivity signal exists (tests, servers with stable links).
#[must_use]
pub fn always_online() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(true);
    drop(tx);
    rx
}

/// Backoff delay before reconnect attempt `attempt` (0-based):
/// `min(max, base * 2^attempt) * random(0.5, 1.5)`, clamped to `max`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss, clippy::cast_sign_loss)]
pub fn reconnect_delay(config: &SubscriptionConfig, attempt: u32) -> Duration {
    let base_ms = config.base_reconnect_delay.as_millis() as u64;
    let max_ms = config.max_reconnect_delay.as_millis() as u64;
    let exponential_ms = base_ms
        .saturating_mul(2u64.saturating_pow(attempt.min(32)))
        .min(max_ms);
    let jitter = rand::rng().random_range(0.5..1.5);
    let jittered_ms = (exponential_ms as f64 * jitter).floor() as u64;
    Duration::from_millis(jittered_ms.min(max_ms))
}

// =============================================================================
// STREAM LIFECYCLE
// =============================================================================

/// Spawn a resilient board-update stream. The returned handle yields decoded
/// snapshots in version order; dropping it cancels the stream.
#[must_use]
pub fn spawn_board_updates(
    connector: Arc<dyn Connector>,
    board_id: impl Into<String>,
    online: watch::Receiver<bool>,
    config: SubscriptionConfig,
) -> BoardUpdates {
    let (tx, rx) = mpsc::channel(config.channel_capacity.max(1));
    tokio::spawn(run_stream(connector, board_id.into(), online, config, tx));
    BoardUpdates::new(rx)
}

#[allow(clippy::cast_possible_truncation)]
async fn run_stream(
    connector: Arc<dyn Connector>,
    board_id: String,
    mut online: watch::Receiver<bool>,
    config: SubscriptionConfig,
    tx: mpsc::Sender<Board>,
) {
    let mut attempt: u32 = 0;
    let mut last_emitted_version: u64 = 0;

    loop {
        if wait_until_online(&mut online, &tx).await.is_err() {
            return;
        }

        match connector.connect().await {
            Ok(connection) => {
                attempt = 0;
                debug!(%board_id, "subscription connected");
                match drive_connection(connection, &board_id, &config, &tx, &mut last_emitted_version).await {
                    ConnectionEnd::Cancelled => return,
                    ConnectionEnd::Reconnect => {}
                }
            }
            Err(e) => {
                warn!(%board_id, error = %e, "subscription connect failed");
            }
        }

        let delay = reconnect_delay(&config, attempt);
        attempt = attempt.saturating_add(1);
        debug!(%board_id, attempt, delay_ms = delay.as_millis() as u64, "scheduling subscription reconnect");
        tokio::select! {
            () = tx.closed() => return,
            () = tokio::time::sleep(delay) => {}
        }
    }
}

enum ConnectionEnd {
    /// Consumer dropped the stream handle; exit for good.
    Cancelled,
    /// Transport or operation failure; schedule a reconnect.
    Reconnect,
}

async fn drive_connection(
    mut connection: Box<dyn Connection>,
    board_id: &str,
    config: &SubscriptionConfig,
    tx: &mpsc::Sender<Board>,
    last_emitted_version: &mut u64,
) -> ConnectionEnd {
    if connection.send(ClientMessage::connection_init()).await.is_err() {
        return ConnectionEnd::Reconnect;
    }

    let operation_id = format!("board-updated-{board_id}-{}", Uuid::new_v4());
    let mut acked = false;

    loop {
        tokio::select! {
            () = tx.closed() => {
                // Polite teardown: complete the active operation, then close.
                if acked {
                    let _ = connection.send(ClientMessage::Complete { id: operation_id.clone() }).await;
                }
                connection.close().await;
                return ConnectionEnd::Cancelled;
            }
            inbound = connection.recv() => {
                let message = match inbound {
                    None => {
                        debug!(%board_id, "subscription connection closed by server");
                        return ConnectionEnd::Reconnect;
                    }
                    Some(Err(e)) => {
                        warn!(%board_id, error = %e, "subscription transport error");
                        return ConnectionEnd::Reconnect;
                    }
                    Some(Ok(message)) => message,
                };

                match message {
                    ServerMessage::ConnectionAck => {
                        if acked {
                            continue;
                        }
                        acked = true;
                        let subscribe = ClientMessage::subscribe_board(&operation_id, &config.query, board_id);
                        if connection.send(subscribe).await.is_err() {
                            return ConnectionEnd::Reconnect;
                        }
                    }
                    ServerMessage::Ping => {
                        if connection.send(ClientMessage::Pong).await.is_err() {
                            return ConnectionEnd::Reconnect;
                        }
                    }
                    ServerMessage::Next { id, payload } if id.as_deref() == Some(operation_id.as_str()) => {
                        let Some(board_payload) =
                            payload.and_then(|p| p.data).and_then(|d| d.board_updated)
                        else {
                            continue;
                        };
                        let board = payload_to_board(&board_payload, board_id);
                        if board.version < *last_emitted_version {
                            debug!(%board_id, version = board.version, "dropping stale subscription snapshot");
                            continue;
                        }
                        *last_emitted_version = board.version;
                        if tx.send(board).await.is_err() {
                            connection.close().await;
                            return ConnectionEnd::Cancelled;
                        }
                    }
                    ServerMessage::Error { id } if id.as_deref() == Some(operation_id.as_str()) => {
                        warn!(%board_id, "subscription operation error");
                        return ConnectionEnd::Reconnect;
                    }
                    ServerMessage::Complete { id } if id.as_deref() == Some(operation_id.as_str()) => {
                        debug!(%board_id, "subscription operation completed by server");
                        return ConnectionEnd::Reconnect;
                    }
                    _ => {}
                }
            }
        }
    }
}

/// Block until the network reports online. Errors if the consumer is gone.
async fn wait_until_online(online: &mut watch::Receiver<bool>, tx: &mpsc::Sender<Board>) -> Result<(), ()> {
    loop {
        if *online.borrow_and_update() {
            return Ok(());
        }
        info!("network offline; suspending subscription reconnect");
        tokio::select! {
            () = tx.closed() => return Err(()),
            changed = online.changed() => {
                // A dropped online sender means nobody reports connectivity;
                // treat the network as online.
                if changed.is_err() {
                    return Ok(());
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "subscription_test.rs"]
mod tests;
