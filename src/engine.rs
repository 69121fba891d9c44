//! Board engine — the facade orchestrating load, edits, autosave, and merge.
//!
//! DESIGN
//! ======
//! The engine owns the canonical in-memory board and is its only publisher.
//! Reactive slots are `tokio::sync::watch` channels: last value wins, new
//! subscribers immediately observe the current value. Local commands publish
//! optimistically and enqueue an autosave; remote snapshots and save
//! acknowledgments are merged by id and version guard under the session
//! lock, so concurrent save-completion and subscription-delivery callbacks
//! can never race the published state.
//!
//! Board switches are fenced two ways: load responses carry a request
//! sequence number and are dropped when superseded, and every merge
//! re-checks that its board id still matches the current target. Stale
//! responses are discarded silently; they are a correctness mechanism, not
//! a failure mode.
//!
//! ERROR HANDLING
//! ==============
//! `load_error` and `save_error` are last-value-wins slots. Save failures
//! never roll back local optimistic state; only the sync status degrades.
//! The engine stays usable and re-initializable after any error.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde_json::{Map, Value};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::board::{Board, WidgetType};
use crate::catalog::{WidgetCatalog, WidgetDefinition};
use crate::commands::{self, ReorderDirection};
use crate::repo::BoardRepository;
use crate::services::sync::{self, SyncHost};

const DEFAULT_AUTOSAVE_DEBOUNCE: Duration = Duration::from_millis(300);

/// Engine tuning knobs.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Quiet interval collapsing an edit burst into one save request.
    pub autosave_debounce: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { autosave_debounce: DEFAULT_AUTOSAVE_DEBOUNCE }
    }
}

// =============================================================================
// ENGINE
// =============================================================================

/// One engine instance owns one board session's lifecycle. Cheap to clone;
/// clones share the same session.
#[derive(Clone)]
pub struct BoardEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    repo: Arc<dyn BoardRepository>,
    catalog: WidgetCatalog,
    config: EngineConfig,
    board_tx: watch::Sender<Board>,
    load_error_tx: watch::Sender<Option<String>>,
    save_error_tx: watch::Sender<Option<String>>,
    ready_tx: watch::Sender<bool>,
    selection_tx: watch::Sender<Option<Uuid>>,
    save_tx: mpsc::UnboundedSender<()>,
    state: Mutex<SessionState>,
}

struct SessionState {
    current_board_id: String,
    load_seq: u64,
    load_task: Option<JoinHandle<()>>,
    subscribe_task: Option<JoinHandle<()>>,
    autosave_task: Option<JoinHandle<()>>,
    /// Held until the autosave pipeline starts on the first `init`.
    save_rx: Option<mpsc::UnboundedReceiver<()>>,
    destroyed: bool,
}

impl BoardEngine {
    #[must_use]
    pub fn new(repo: Arc<dyn BoardRepository>) -> Self {
        Self::with_config(repo, WidgetCatalog::default(), EngineConfig::default())
    }

    #[must_use]
    pub fn with_config(repo: Arc<dyn BoardRepository>, catalog: WidgetCatalog, config: EngineConfig) -> Self {
        let (board_tx, _) = watch::channel(Board { id: String::new(), version: 1, widgets: Vec::new() });
        let (load_error_tx, _) = watch::channel(None);
        let (save_error_tx, _) = watch::channel(None);
        let (ready_tx, _) = watch::channel(false);
        let (selection_tx, _) = watch::channel(None);
        let (save_tx, save_rx) = mpsc::unbounded_channel();

        Self {
            inner: Arc::new(EngineInner {
                repo,
                catalog,
                config,
                board_tx,
                load_error_tx,
                save_error_tx,
                ready_tx,
                selection_tx,
                save_tx,
                state: Mutex::new(SessionState {
                    current_board_id: String::new(),
                    load_seq: 0,
                    load_task: None,
                    subscribe_task: None,
                    autosave_task: None,
                    save_rx: Some(save_rx),
                    destroyed: false,
                }),
            }),
        }
    }

    // =========================================================================
    // REACTIVE SURFACE
    // =========================================================================

    /// Current board snapshot plus every subsequent published value.
    #[must_use]
    pub fn board(&self) -> watch::Receiver<Board> {
        self.inner.board_tx.subscribe()
    }

    /// Latest published board, read at call time.
    #[must_use]
    pub fn current_board(&self) -> Board {
        self.inner.board_tx.borrow().clone()
    }

    /// Last load (or realtime) failure; cleared on the next successful
    /// load or remote update.
    #[must_use]
    pub fn load_error(&self) -> watch::Receiver<Option<String>> {
        self.inner.load_error_tx.subscribe()
    }

    /// Last terminal save failure; cleared on the next successful save.
    #[must_use]
    pub fn save_error(&self) -> watch::Receiver<Option<String>> {
        self.inner.save_error_tx.subscribe()
    }

    /// True once the first load for the current board has succeeded and the
    /// board is safe to mutate and persist.
    #[must_use]
    pub fn board_ready(&self) -> watch::Receiver<bool> {
        self.inner.ready_tx.subscribe()
    }

    /// Currently selected widget, if any.
    #[must_use]
    pub fn selected_widget(&self) -> watch::Receiver<Option<Uuid>> {
        self.inner.selection_tx.subscribe()
    }

    /// The widget palette available for `add_widget`.
    #[must_use]
    pub fn available_widgets(&self) -> &[WidgetDefinition] {
        self.inner.catalog.list()
    }

    // =========================================================================
    // SESSION LIFECYCLE
    // =========================================================================

    /// Start (or switch to) a board session. Cancels in-flight work for any
    /// prior board, resets selection and error state, publishes an empty
    /// placeholder, and begins loading.
    pub fn init(&self, board_id: &str) {
        let seq = {
            let mut state = self.inner.lock_state();
            state.current_board_id = board_id.to_owned();
            state.load_seq += 1;
            if let Some(task) = state.subscribe_task.take() {
                task.abort();
            }
            if let Some(task) = state.load_task.take() {
                task.abort();
            }
            // Autosave starts once per engine lifetime.
            if let Some(save_rx) = state.save_rx.take() {
                let engine = self.clone();
                state.autosave_task = Some(tokio::spawn(run_autosave(engine, save_rx)));
            }
            self.inner.selection_tx.send_replace(None);
            self.inner.ready_tx.send_replace(false);
            self.inner.board_tx.send_replace(Board::placeholder(board_id));
            self.inner.load_error_tx.send_replace(None);
            self.inner.save_error_tx.send_replace(None);
            state.load_seq
        };

        info!(%board_id, "board session initialized");
        let engine = self.clone();
        let target = board_id.to_owned();
        let handle = tokio::spawn(async move { engine.load_board(seq, target).await });
        self.inner.lock_state().load_task = Some(handle);
    }

    /// Tear the session down: cancels the subscription, any in-flight load,
    /// and the autosave pipeline. Idempotent.
    pub fn destroy(&self) {
        let mut state = self.inner.lock_state();
        if state.destroyed {
            return;
        }
        state.destroyed = true;
        if let Some(task) = state.subscribe_task.take() {
            task.abort();
        }
        if let Some(task) = state.load_task.take() {
            task.abort();
        }
        if let Some(task) = state.autosave_task.take() {
            task.abort();
        }
        debug!("board engine destroyed");
    }

    /// Select a widget (or clear the selection).
    pub fn select_widget(&self, id: Option<Uuid>) {
        self.inner.selection_tx.send_replace(id);
    }

    // =========================================================================
    // COMMANDS
    // =========================================================================

    /// Add a widget of the given type from the catalog, staggered by widget
    /// count. No-op for types missing from the catalog.
    pub fn add_widget(&self, widget_type: WidgetType) {
        let Some(definition) = self.inner.catalog.get(widget_type) else {
            return;
        };
        let next = commands::add_widget(&self.current_board(), definition);
        self.patch(next);
    }

    /// Add a widget centered on `(x, y)`, clamped to the canvas.
    pub fn add_widget_at(&self, widget_type: WidgetType, x: f64, y: f64) {
        let Some(definition) = self.inner.catalog.get(widget_type) else {
            return;
        };
        let next = commands::add_widget_at(&self.current_board(), definition, x, y);
        self.patch(next);
    }

    /// Replace a widget's position and size.
    pub fn set_widget_frame(&self, id: Uuid, x: f64, y: f64, width: f64, height: f64) {
        let next = commands::set_widget_frame(&self.current_board(), id, x, y, width, height);
        self.patch(next);
    }

    /// Shallow-merge a partial record into a widget's config.
    pub fn update_config(&self, id: Uuid, partial: &Map<String, Value>) {
        let next = commands::update_config(&self.current_board(), id, partial);
        self.patch(next);
    }

    pub fn update_widget_text(&self, id: Uuid, text: &str) {
        self.update_config(id, &single_field("text", Value::from(text)));
    }

    pub fn update_chart_type(&self, id: Uuid, chart_type: &str) {
        self.update_config(id, &single_field("chartType", Value::from(chart_type)));
    }

    pub fn update_counter_label(&self, id: Uuid, label: &str) {
        self.update_config(id, &single_field("label", Value::from(label)));
    }

    /// Set a counter's value; non-finite input degrades to zero.
    pub fn update_counter_value(&self, id: Uuid, value: f64) {
        let value = if value.is_finite() { value } else { 0.0 };
        self.update_config(id, &single_field("value", Value::from(value)));
    }

    /// Set an image widget's source and alt text.
    pub fn update_image(&self, id: Uuid, src: &str, alt: &str) {
        let mut partial = Map::new();
        partial.insert("src".to_owned(), Value::from(src));
        partial.insert("alt".to_owned(), Value::from(alt));
        self.update_config(id, &partial);
    }

    /// Remove a widget; clears the selection if it pointed at it.
    pub fn remove(&self, id: Uuid) {
        let next = commands::remove(&self.current_board(), id);
        self.patch(next);
        if *self.inner.selection_tx.borrow() == Some(id) {
            self.inner.selection_tx.send_replace(None);
        }
    }

    pub fn bring_forward(&self, id: Uuid) {
        let next = commands::reorder(&self.current_board(), id, ReorderDirection::Forward);
        self.patch(next);
    }

    pub fn send_backward(&self, id: Uuid) {
        let next = commands::reorder(&self.current_board(), id, ReorderDirection::Backward);
        self.patch(next);
    }

    pub fn bring_to_front(&self, id: Uuid) {
        let next = commands::bring_to_front(&self.current_board(), id);
        self.patch(next);
    }

    pub fn send_to_back(&self, id: Uuid) {
        let next = commands::send_to_back(&self.current_board(), id);
        self.patch(next);
    }

    pub fn move_widget_above(&self, source_id: Uuid, target_id: Uuid) {
        let next = commands::move_widget_above(&self.current_board(), source_id, target_id);
        self.patch(next);
    }

    // =========================================================================
    // INTERNAL: PUBLISH + LOAD + MERGE
    // =========================================================================

    /// Publish an optimistic snapshot and, when the board is editable and
    /// still the current target, enqueue it for autosave.
    fn patch(&self, next: Board) {
        let state = self.inner.lock_state();
        let editable = *self.inner.ready_tx.borrow()
            && !next.id.is_empty()
            && next.id == state.current_board_id;
        self.inner.board_tx.send_replace(next);
        drop(state);
        if editable {
            let _ = self.inner.save_tx.send(());
        }
    }

    async fn load_board(self, seq: u64, board_id: String) {
        match self.inner.repo.load(&board_id).await {
            Ok(board) => self.apply_loaded(seq, &board_id, board),
            Err(e) => {
                if self.is_current_request(seq, &board_id) {
                    warn!(%board_id, error = %e, "board load failed");
                    self.inner.load_error_tx.send_replace(Some(e.message));
                } else {
                    debug!(%board_id, "discarding stale load failure");
                }
            }
        }
    }

    fn apply_loaded(&self, seq: u64, board_id: &str, board: Board) {
        let mut state = self.inner.lock_state();
        if state.destroyed || seq != state.load_seq || board_id != state.current_board_id {
            debug!(%board_id, "discarding stale load response");
            return;
        }
        self.inner.load_error_tx.send_replace(None);
        self.inner.board_tx.send_replace(board);
        self.inner.ready_tx.send_replace(true);
        // Registered under the same guard that accepted the load, so a
        // concurrent `init` cannot slip in between and leave this
        // subscription running for a superseded board.
        let handle = self.spawn_update_consumer(board_id);
        if let Some(previous) = state.subscribe_task.replace(handle) {
            previous.abort();
        }
        drop(state);
        info!(%board_id, "board loaded");
    }

    fn spawn_update_consumer(&self, board_id: &str) -> JoinHandle<()> {
        let engine = self.clone();
        let target = board_id.to_owned();
        tokio::spawn(async move {
            let mut updates = engine.inner.repo.subscribe(&target);
            while let Some(remote) = updates.next().await {
                engine.apply_remote_update(&target, remote);
            }
            engine.on_stream_ended(&target);
        })
    }

    /// Monotonic merge of a server-pushed snapshot: adopted wholesale unless
    /// the board switched or the snapshot would regress the version.
    fn apply_remote_update(&self, board_id: &str, remote: Board) {
        let state = self.inner.lock_state();
        if state.current_board_id != board_id {
            debug!(%board_id, "discarding remote update for stale board");
            return;
        }
        let published_version = self.inner.board_tx.borrow().version;
        if remote.version < published_version {
            debug!(%board_id, version = remote.version, published_version, "discarding stale remote update");
            return;
        }
        debug!(%board_id, version = remote.version, "adopting remote update");
        self.inner.board_tx.send_replace(remote);
        self.inner.ready_tx.send_replace(true);
        self.inner.load_error_tx.send_replace(None);
        drop(state);
    }

    /// The update stream only ends on cancellation or producer failure; if it
    /// happens while the board is still current, flag the realtime channel.
    fn on_stream_ended(&self, board_id: &str) {
        let state = self.inner.lock_state();
        if state.destroyed || state.current_board_id != board_id {
            return;
        }
        warn!(%board_id, "realtime update stream ended");
        self.inner
            .load_error_tx
            .send_replace(Some("Realtime connection lost".to_owned()));
    }

    fn is_current_request(&self, seq: u64, board_id: &str) -> bool {
        let state = self.inner.lock_state();
        seq == state.load_seq && board_id == state.current_board_id
    }
}

impl EngineInner {
    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// =============================================================================
// AUTOSAVE PIPELINE
// =============================================================================

/// Single always-running save loop: trailing-edge debounce over edit bursts,
/// then one serialized save (conflict retry included) reading the live board
/// at dispatch time.
async fn run_autosave(engine: BoardEngine, mut save_rx: mpsc::UnboundedReceiver<()>) {
    while save_rx.recv().await.is_some() {
        // Restart the quiet timer while the burst continues.
        loop {
            tokio::select! {
                () = tokio::time::sleep(engine.inner.config.autosave_debounce) => break,
                more = save_rx.recv() => {
                    if more.is_none() {
                        return;
                    }
                }
            }
        }

        // Signals can outlive the session that queued them: a board switch
        // inside the debounce window leaves the live board pointing at the
        // next board's un-loaded placeholder, which must never be persisted.
        let board = engine.current_board();
        if board.id.is_empty() || !*engine.inner.ready_tx.borrow() {
            continue;
        }
        let host: &dyn SyncHost = engine.inner.as_ref();
        sync::persist_with_last_write_wins(engine.inner.repo.as_ref(), host, board).await;
    }
}

impl SyncHost for EngineInner {
    fn current_board(&self) -> Board {
        self.board_tx.borrow().clone()
    }

    fn on_version_synced(&self, version: u64) {
        // Direct publish: a version bump is an acknowledgment, not an edit,
        // so it must not re-enter the autosave queue.
        let state = self.lock_state();
        self.board_tx.send_modify(|board| board.version = board.version.max(version));
        drop(state);
    }

    fn set_save_error(&self, message: Option<String>) {
        self.save_error_tx.send_replace(message);
    }
}

fn single_field(key: &str, value: Value) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert(key.to_owned(), value);
    map
}

#[cfg(test)]
#[path = "engine_test.rs"]
mod tests;
