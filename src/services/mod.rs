//! Application services consumed by the board engine.
//!
//! ARCHITECTURE
//! ============
//! Service modules hold protocol logic that is independent of the engine's
//! reactive state so it can be tested against small fakes. The engine wires
//! them to its published board through the `SyncHost` callbacks.

pub mod sync;
