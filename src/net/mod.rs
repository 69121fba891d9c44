//! Realtime networking — the subscription wire protocol and its transport.
//!
//! ARCHITECTURE
//! ============
//! `ws_types` models the `graphql-transport-ws` message vocabulary;
//! `subscription` runs the connection state machine (handshake, keep-alive,
//! reconnect with backoff and online gating) over an abstract `Connector`;
//! `ws` supplies the production tokio-tungstenite connector. Repository
//! implementations compose these to fulfill `BoardRepository::subscribe`.

pub mod subscription;
pub mod ws;
pub mod ws_types;
