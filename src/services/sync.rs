//! Board sync service — last-write-wins save with single conflict retry.
//!
//! DESIGN
//! ======
//! This is a read-then-write protocol, not a CRDT merge: on a version
//! conflict the latest *live* local widget set is resubmitted against the
//! freshly loaded server version, using only the server's version number as
//! the optimistic-lock token. Exactly one automatic retry; a second failure
//! of any kind is terminal and surfaces a save error.
//!
//! The service is stateless. It observes and influences the engine only
//! through the `SyncHost` callbacks, which lets the engine keep its
//! single-writer discipline over the published board (the host applies the
//! version bump under its own id guard) and keeps this module independently
//! testable.

use tracing::{debug, warn};

use crate::board::Board;
use crate::repo::{BoardRepository, SaveError};

// =============================================================================
// HOST CALLBACKS
// =============================================================================

/// The engine-side surface the sync service talks back to.
pub trait SyncHost: Send + Sync {
    /// Latest published board, read at call time (never a stale capture).
    fn current_board(&self) -> Board;

    /// A save was acknowledged: raise the published version to
    /// `max(current, version)`. Only called while the saved board id is still
    /// current.
    fn on_version_synced(&self, version: u64);

    /// Set or clear the save error slot.
    fn set_save_error(&self, message: Option<String>);
}

// =============================================================================
// PROTOCOL
// =============================================================================

/// Persist `local` with last-write-wins conflict resolution.
///
/// On success the host's version is merged forward and any prior save error
/// is cleared. On a version conflict the latest server board is reloaded and
/// the *current* local widgets are resaved once against the fresh version.
/// A board switch observed at any point abandons the save silently — a newer
/// session has superseded it.
pub async fn persist_with_last_write_wins(repo: &dyn BoardRepository, host: &dyn SyncHost, local: Board) {
    match repo.save(&local).await {
        Ok(server_version) => {
            let current = host.current_board();
            if current.id == local.id {
                host.on_version_synced(current.version.max(server_version));
            }
            host.set_save_error(None);
            debug!(board_id = %local.id, version = server_version, "board saved");
        }
        Err(e) if e.is_conflict() => {
            debug!(board_id = %local.id, error = %e, "save conflict; retrying against latest server version");
            retry_save_with_latest_server_version(repo, host, &local.id).await;
        }
        Err(e) => {
            warn!(board_id = %local.id, error = %e, "save failed");
            host.set_save_error(Some(e.to_string()));
        }
    }
}

/// Conflict path: reload the server board, then resave the latest live local
/// widgets tagged with the server's version. No further automatic retries.
async fn retry_save_with_latest_server_version(repo: &dyn BoardRepository, host: &dyn SyncHost, board_id: &str) {
    let server_board = match repo.load(board_id).await {
        Ok(board) => board,
        Err(e) => {
            warn!(%board_id, error = %e, "conflict reload failed");
            host.set_save_error(Some(format!("Save failed after conflict retry: {}", e.message)));
            return;
        }
    };

    let latest_local = host.current_board();
    if latest_local.id != board_id {
        // Board switched while the save was in flight; nothing to do.
        debug!(%board_id, "abandoning conflicted save; board changed");
        return;
    }

    let retry = Board { version: server_board.version, ..latest_local };
    match repo.save(&retry).await {
        Ok(saved_version) => {
            let current = host.current_board();
            if current.id == board_id {
                host.on_version_synced(current.version.max(saved_version));
                host.set_save_error(None);
            }
            debug!(%board_id, version = saved_version, "board saved after conflict retry");
        }
        Err(e) => {
            warn!(%board_id, error = %e, "save failed after conflict retry");
            host.set_save_error(Some(format!("Save failed after conflict retry: {e}")));
        }
    }
}

#[cfg(test)]
#[path = "sync_test.rs"]
mod tests;
