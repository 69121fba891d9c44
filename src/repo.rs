//! Board repository port — the abstract load/save/subscribe contract.
//!
//! SYSTEM CONTEXT
//! ==============
//! The engine consumes this trait; the concrete transport (HTTP, GraphQL,
//! a test fake) lives outside the core. `save` must distinguish a version
//! conflict from any other failure because the sync service's retry protocol
//! branches on it. `subscribe` hands back a push stream whose reconnect
//! handling is owned by the producer (see `net::subscription`) — raw
//! transport failures never reach the consumer through it.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::board::Board;

// =============================================================================
// ERRORS
// =============================================================================

/// A board load failed (network or server).
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct LoadError {
    pub message: String,
}

impl LoadError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// A board save failed.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SaveError {
    /// The submitted version no longer matches the server's current version
    /// (HTTP 409 semantics). Recoverable via the single-retry protocol.
    #[error("version conflict: {0}")]
    Conflict(String),
    /// Any other save failure. Not retried.
    #[error("{0}")]
    Failed(String),
}

impl SaveError {
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

// =============================================================================
// UPDATE STREAM
// =============================================================================

/// Live server-push stream of board snapshots for one board id.
///
/// Dropping the handle cancels the subscription: the producer observes the
/// closed channel and tears down its connection.
#[derive(Debug)]
pub struct BoardUpdates {
    rx: mpsc::Receiver<Board>,
}

impl BoardUpdates {
    #[must_use]
    pub fn new(rx: mpsc::Receiver<Board>) -> Self {
        Self { rx }
    }

    /// Next server-originated snapshot, or `None` once the stream has ended.
    pub async fn next(&mut self) -> Option<Board> {
        self.rx.recv().await
    }
}

// =============================================================================
// PORT
// =============================================================================

/// Abstract board store reachable over a query/mutation/subscription protocol.
#[async_trait]
pub trait BoardRepository: Send + Sync {
    /// Fetch the full current snapshot of a board.
    async fn load(&self, board_id: &str) -> Result<Board, LoadError>;

    /// Persist a full board snapshot tagged with its last-seen version.
    /// Returns the server's new version on success.
    async fn save(&self, board: &Board) -> Result<u64, SaveError>;

    /// Open a live update stream for a board. Cancel by dropping the handle.
    fn subscribe(&self, board_id: &str) -> BoardUpdates;
}
