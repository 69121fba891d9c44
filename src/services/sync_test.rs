use super::*;
use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::board::{Widget, WidgetConfig, WidgetType};
use crate::repo::{BoardUpdates, LoadError};

// =============================================================================
// FAKES
// =============================================================================

#[derive(Default)]
struct ScriptedRepo {
    save_results: Mutex<VecDeque<Result<u64, SaveError>>>,
    load_results: Mutex<VecDeque<Result<Board, LoadError>>>,
    saves: Mutex<Vec<Board>>,
    loads: Mutex<Vec<String>>,
}

impl ScriptedRepo {
    fn queue_save(&self, result: Result<u64, SaveError>) {
        self.save_results.lock().expect("lock").push_back(result);
    }

    fn queue_load(&self, result: Result<Board, LoadError>) {
        self.load_results.lock().expect("lock").push_back(result);
    }

    fn saves(&self) -> Vec<Board> {
        self.saves.lock().expect("lock").clone()
    }

    fn load_count(&self) -> usize {
        self.loads.lock().expect("lock").len()
    }
}

#[async_trait]
impl BoardRepository for ScriptedRepo {
    async fn load(&self, board_id: &str) -> Result<Board, LoadError> {
        self.loads.lock().expect("lock").push(board_id.to_owned());
        self.load_results
            .lock()
            .expect("lock")
            .pop_front()
            .unwrap_or_else(|| Err(LoadError::new("unscripted load")))
    }

    async fn save(&self, board: &Board) -> Result<u64, SaveError> {
        self.saves.lock().expect("lock").push(board.clone());
        self.save_results
            .lock()
            .expect("lock")
            .pop_front()
            .unwrap_or_else(|| Err(SaveError::Failed("unscripted save".to_owned())))
    }

    fn subscribe(&self, _board_id: &str) -> BoardUpdates {
        let (_tx, rx) = mpsc::channel(1);
        BoardUpdates::new(rx)
    }
}

struct FakeHost {
    board: Mutex<Board>,
    synced_versions: Mutex<Vec<u64>>,
    error_sets: Mutex<Vec<Option<String>>>,
}

impl FakeHost {
    fn new(board: Board) -> Self {
        Self {
            board: Mutex::new(board),
            synced_versions: Mutex::new(Vec::new()),
            error_sets: Mutex::new(Vec::new()),
        }
    }

    fn set_board(&self, board: Board) {
        *self.board.lock().expect("lock") = board;
    }

    fn version(&self) -> u64 {
        self.board.lock().expect("lock").version
    }

    fn synced_versions(&self) -> Vec<u64> {
        self.synced_versions.lock().expect("lock").clone()
    }

    fn last_error(&self) -> Option<Option<String>> {
        self.error_sets.lock().expect("lock").last().cloned()
    }
}

impl SyncHost for FakeHost {
    fn current_board(&self) -> Board {
        self.board.lock().expect("lock").clone()
    }

    fn on_version_synced(&self, version: u64) {
        self.synced_versions.lock().expect("lock").push(version);
        let mut board = self.board.lock().expect("lock");
        board.version = board.version.max(version);
    }

    fn set_save_error(&self, message: Option<String>) {
        self.error_sets.lock().expect("lock").push(message);
    }
}

fn widget() -> Widget {
    Widget {
        id: Uuid::new_v4(),
        x: 0.0,
        y: 0.0,
        width: 100.0,
        height: 100.0,
        config: WidgetConfig::default_for(WidgetType::Text),
    }
}

fn board(id: &str, version: u64, widgets: Vec<Widget>) -> Board {
    Board { id: id.to_owned(), version, widgets }
}

// =============================================================================
// SUCCESS PATH
// =============================================================================

#[tokio::test]
async fn save_success_merges_version_forward_and_clears_error() {
    let repo = ScriptedRepo::default();
    repo.queue_save(Ok(7));
    let local = board("b1", 3, vec![widget()]);
    let host = FakeHost::new(local.clone());

    persist_with_last_write_wins(&repo, &host, local).await;

    assert_eq!(host.synced_versions(), vec![7]);
    assert_eq!(host.version(), 7);
    assert_eq!(host.last_error(), Some(None));
}

#[tokio::test]
async fn save_success_keeps_higher_local_version() {
    // A remote push raised the local version above the ack while the save
    // was in flight; the merge must not regress it.
    let repo = ScriptedRepo::default();
    repo.queue_save(Ok(4));
    let local = board("b1", 3, vec![widget()]);
    let host = FakeHost::new(board("b1", 9, vec![widget()]));

    persist_with_last_write_wins(&repo, &host, local).await;

    assert_eq!(host.synced_versions(), vec![9]);
    assert_eq!(host.version(), 9);
}

#[tokio::test]
async fn save_success_after_board_switch_skips_version_sync() {
    let repo = ScriptedRepo::default();
    repo.queue_save(Ok(4));
    let local = board("b1", 3, vec![widget()]);
    let host = FakeHost::new(board("b2", 1, vec![]));

    persist_with_last_write_wins(&repo, &host, local).await;

    assert!(host.synced_versions().is_empty());
    assert_eq!(host.last_error(), Some(None));
}

// =============================================================================
// CONFLICT RETRY
// =============================================================================

#[tokio::test]
async fn conflict_retries_latest_local_widgets_against_server_version() {
    let repo = ScriptedRepo::default();
    repo.queue_save(Err(SaveError::Conflict("stale version".to_owned())));
    repo.queue_load(Ok(board("b1", 3, vec![])));
    repo.queue_save(Ok(4));

    let stale_local = board("b1", 1, vec![widget()]);
    // The user kept editing while the first save was in flight; the retry
    // must carry these widgets, not the stale captured set.
    let live = board("b1", 1, vec![widget(), widget()]);
    let host = FakeHost::new(live.clone());

    persist_with_last_write_wins(&repo, &host, stale_local).await;

    let saves = repo.saves();
    assert_eq!(saves.len(), 2);
    assert_eq!(saves[1].version, 3, "retry must carry the reloaded server version");
    assert_eq!(saves[1].widgets, live.widgets, "retry must carry the live local widgets");
    assert!(host.version() >= 3);
    assert_eq!(host.last_error(), Some(None));
}

#[tokio::test]
async fn conflict_with_board_switch_abandons_silently() {
    let repo = ScriptedRepo::default();
    repo.queue_save(Err(SaveError::Conflict("stale version".to_owned())));
    repo.queue_load(Ok(board("b1", 3, vec![])));

    let local = board("b1", 1, vec![widget()]);
    let host = FakeHost::new(board("b2", 1, vec![]));

    persist_with_last_write_wins(&repo, &host, local).await;

    assert_eq!(repo.saves().len(), 1, "no retry save for an abandoned board");
    assert!(host.synced_versions().is_empty());
    assert_eq!(host.last_error(), None, "abandonment is silent");
}

#[tokio::test]
async fn conflict_reload_failure_surfaces_terminal_error() {
    let repo = ScriptedRepo::default();
    repo.queue_save(Err(SaveError::Conflict("stale version".to_owned())));
    repo.queue_load(Err(LoadError::new("server unreachable")));

    let local = board("b1", 1, vec![widget()]);
    let host = FakeHost::new(local.clone());

    persist_with_last_write_wins(&repo, &host, local).await;

    let error = host.last_error().flatten().expect("save error set");
    assert!(error.contains("conflict retry"), "unexpected message: {error}");
}

#[tokio::test]
async fn second_conflict_is_terminal() {
    let repo = ScriptedRepo::default();
    repo.queue_save(Err(SaveError::Conflict("stale version".to_owned())));
    repo.queue_load(Ok(board("b1", 3, vec![])));
    repo.queue_save(Err(SaveError::Conflict("raced again".to_owned())));

    let local = board("b1", 1, vec![widget()]);
    let host = FakeHost::new(local.clone());

    persist_with_last_write_wins(&repo, &host, local).await;

    assert_eq!(repo.saves().len(), 2, "exactly one automatic retry");
    let error = host.last_error().flatten().expect("save error set");
    assert!(error.contains("conflict retry"));
}

// =============================================================================
// NON-CONFLICT FAILURE
// =============================================================================

#[tokio::test]
async fn non_conflict_failure_surfaces_immediately_without_retry() {
    let repo = ScriptedRepo::default();
    repo.queue_save(Err(SaveError::Failed("boom".to_owned())));

    let local = board("b1", 1, vec![widget()]);
    let host = FakeHost::new(local.clone());

    persist_with_last_write_wins(&repo, &host, local).await;

    assert_eq!(repo.saves().len(), 1);
    assert_eq!(repo.load_count(), 0, "no reload for non-conflict failures");
    assert_eq!(host.last_error().flatten().as_deref(), Some("boom"));
}
