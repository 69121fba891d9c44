//! Wire messages for the `graphql-transport-ws` subscription channel.
//!
//! DESIGN
//! ======
//! The message vocabulary must stay bit-compatible with the server:
//! `connection_init` → `connection_ack`, `subscribe` with the operation id
//! and `{query, variables: {boardId}}`, `next` updates under
//! `payload.data.boardUpdated`, `ping`/`pong` keep-alives, and
//! `error`/`complete` to end an operation.
//!
//! Inbound payload decoding is tolerant: unknown message types parse to
//! `Unknown` and are skipped; widget payloads degrade field-by-field to
//! defaults instead of rejecting the whole snapshot.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::board::{Board, Widget, WidgetConfig, WidgetType};

// =============================================================================
// CLIENT -> SERVER
// =============================================================================

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    ConnectionInit { payload: Map<String, Value> },
    Subscribe { id: String, payload: SubscribePayload },
    Pong,
    Complete { id: String },
}

impl ClientMessage {
    /// Empty-payload handshake opener.
    #[must_use]
    pub fn connection_init() -> Self {
        Self::ConnectionInit { payload: Map::new() }
    }

    /// Subscribe to board updates for one board id.
    #[must_use]
    pub fn subscribe_board(operation_id: &str, query: &str, board_id: &str) -> Self {
        Self::Subscribe {
            id: operation_id.to_owned(),
            payload: SubscribePayload {
                query: query.to_owned(),
                variables: SubscribeVariables { board_id: board_id.to_owned() },
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SubscribePayload {
    pub query: String,
    pub variables: SubscribeVariables,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SubscribeVariables {
    #[serde(rename = "boardId")]
    pub board_id: String,
}

// =============================================================================
// SERVER -> CLIENT
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    ConnectionAck,
    Ping,
    Next {
        id: Option<String>,
        payload: Option<NextPayload>,
    },
    Error {
        id: Option<String>,
    },
    Complete {
        id: Option<String>,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NextPayload {
    pub data: Option<NextData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NextData {
    #[serde(rename = "boardUpdated")]
    pub board_updated: Option<BoardPayload>,
}

/// Board snapshot as delivered on the wire. All fields optional; conversion
/// fills defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct BoardPayload {
    pub id: Option<String>,
    pub version: Option<u64>,
    pub widgets: Option<Vec<WidgetPayload>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WidgetPayload {
    pub id: Option<Uuid>,
    #[serde(rename = "type")]
    pub widget_type: Option<String>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    #[serde(rename = "configJson")]
    pub config_json: Option<String>,
}

// =============================================================================
// PARSING / MAPPING
// =============================================================================

/// Parse a raw inbound text frame. Returns `None` for frames that are not
/// valid protocol messages (including unknown `type` values).
#[must_use]
pub fn parse_server_message(raw: &str) -> Option<ServerMessage> {
    match serde_json::from_str::<ServerMessage>(raw) {
        Ok(ServerMessage::Unknown) | Err(_) => None,
        Ok(message) => Some(message),
    }
}

/// Convert a wire board payload to a domain `Board`, falling back to the
/// subscribed board id and version 1 where the payload is incomplete.
#[must_use]
pub fn payload_to_board(payload: &BoardPayload, subscribed_board_id: &str) -> Board {
    Board {
        id: payload.id.clone().unwrap_or_else(|| subscribed_board_id.to_owned()),
        version: payload.version.unwrap_or(1),
        widgets: payload
            .widgets
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(payload_to_widget)
            .collect(),
    }
}

/// Convert a wire widget payload to a domain `Widget`. Unknown types fall
/// back to textarea, malformed config JSON to an empty record, missing frame
/// fields to the canvas defaults.
#[must_use]
pub fn payload_to_widget(payload: &WidgetPayload) -> Widget {
    let widget_type = WidgetType::from_wire(payload.widget_type.as_deref().unwrap_or("textarea"));
    let config = WidgetConfig::normalize(widget_type, &parse_config_record(payload.config_json.as_deref()));
    Widget {
        id: payload.id.unwrap_or_else(Uuid::new_v4),
        x: payload.x.unwrap_or(0.0),
        y: payload.y.unwrap_or(0.0),
        width: payload.width.unwrap_or(200.0),
        height: payload.height.unwrap_or(150.0),
        config,
    }
}

/// Wire form of a widget for save mutations: config serialized as a JSON
/// string under `configJson`. The engine never encodes saves itself;
/// repository implementations call this when building their mutation
/// variables.
#[must_use]
pub fn widget_to_input(widget: &Widget) -> Value {
    serde_json::json!({
        "id": widget.id,
        "type": widget.widget_type().as_str(),
        "x": widget.x,
        "y": widget.y,
        "width": widget.width,
        "height": widget.height,
        "configJson": Value::Object(widget.config.record()).to_string(),
    })
}

fn parse_config_record(raw: Option<&str>) -> Map<String, Value> {
    let Some(raw) = raw else {
        return Map::new();
    };
    if raw.trim().is_empty() {
        return Map::new();
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

#[cfg(test)]
#[path = "ws_types_test.rs"]
mod tests;
