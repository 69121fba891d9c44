//! `boardsync` — collaborative whiteboard board synchronization engine.
//!
//! ARCHITECTURE
//! ============
//! The crate is layered leaf to root:
//!
//! - [`board`] / [`catalog`] / [`commands`]: pure domain — immutable board
//!   snapshots, the widget catalog, and side-effect-free command transforms.
//! - [`repo`]: the abstract load/save/subscribe port the engine consumes.
//! - [`services::sync`]: last-write-wins persistence with a single conflict
//!   retry, isolated behind callback traits for testability.
//! - [`net`]: the realtime subscription channel — wire protocol types, the
//!   reconnecting stream manager, and a tokio-tungstenite transport.
//! - [`engine`]: the facade owning the canonical published board state,
//!   sequencing load → subscribe, debounced autosave, and stale-response
//!   suppression.
//!
//! Consumers construct a [`engine::BoardEngine`] over a repository
//! implementation, call `init(board_id)`, issue commands, and observe the
//! reactive `watch` surfaces.

pub mod board;
pub mod catalog;
pub mod commands;
pub mod engine;
pub mod net;
pub mod repo;
pub mod services;

pub use board::{Board, Widget, WidgetConfig, WidgetType};
pub use catalog::{WidgetCatalog, WidgetDefinition};
pub use engine::{BoardEngine, EngineConfig};
pub use repo::{BoardRepository, BoardUpdates, LoadError, SaveError};
