//! WebSocket transport for the subscription channel (tokio-tungstenite).
//!
//! Speaks the `graphql-transport-ws` sub-protocol over a plain socket. Frames
//! that are not valid protocol messages are skipped rather than treated as
//! errors, matching the tolerant inbound parsing in `ws_types`.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{ClientRequestBuilder, Message, http::Uri};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crate::net::subscription::{Connection, Connector, StreamError};
use crate::net::ws_types::{ClientMessage, ServerMessage, parse_server_message};

/// Sub-protocol required by the server's subscription endpoint.
pub const WS_SUB_PROTOCOL: &str = "graphql-transport-ws";

/// Map an HTTP endpoint URL to its WebSocket equivalent.
#[must_use]
pub fn to_websocket_url(http_url: &str) -> String {
    if let Some(rest) = http_url.strip_prefix("https://") {
        return format!("wss://{rest}");
    }
    if let Some(rest) = http_url.strip_prefix("http://") {
        return format!("ws://{rest}");
    }
    http_url.to_owned()
}

// =============================================================================
// CONNECTOR
// =============================================================================

/// Production connector: opens one socket per call to the configured URL.
#[derive(Debug, Clone)]
pub struct WsConnector {
    url: String,
}

impl WsConnector {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self) -> Result<Box<dyn Connection>, StreamError> {
        let uri: Uri = self
            .url
            .parse()
            .map_err(|e| StreamError::Connect(format!("invalid url {}: {e}", self.url)))?;
        let request = ClientRequestBuilder::new(uri).with_sub_protocol(WS_SUB_PROTOCOL);
        let (socket, _response) = connect_async(request)
            .await
            .map_err(|e| StreamError::Connect(e.to_string()))?;
        Ok(Box::new(WsConnection { socket }))
    }
}

// =============================================================================
// CONNECTION
// =============================================================================

struct WsConnection {
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Connection for WsConnection {
    async fn send(&mut self, message: ClientMessage) -> Result<(), StreamError> {
        let json = serde_json::to_string(&message).map_err(|e| StreamError::Transport(e.to_string()))?;
        self.socket
            .send(Message::text(json))
            .await
            .map_err(|e| StreamError::Transport(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<ServerMessage, StreamError>> {
        loop {
            match self.socket.next().await? {
                Ok(Message::Text(text)) => {
                    if let Some(message) = parse_server_message(text.as_str()) {
                        return Some(Ok(message));
                    }
                    // Unknown frame; keep reading.
                }
                Ok(Message::Close(_)) => return None,
                // Socket-level pings are answered by tungstenite itself.
                Ok(_) => {}
                Err(e) => return Some(Err(StreamError::Transport(e.to_string()))),
            }
        }
    }

    async fn close(&mut self) {
        let _ = self.socket.close(None).await;
    }
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
