//! Board domain model — versioned widget documents.
//!
//! DESIGN
//! ======
//! A `Board` is an immutable snapshot: commands and merges always produce a
//! new value, never mutate in place. Widget order is the z-order (later =
//! higher layer). `version` is the server's logical clock; the client only
//! raises it through an explicit save acknowledgment.
//!
//! `WidgetConfig` is a closed tagged enum keyed by widget type, so a widget's
//! type and config shape cannot disagree by construction. External input
//! (server payloads, partial edits) is run through `WidgetConfig::normalize`,
//! which drops fields invalid for the type and fills missing fields with
//! defaults rather than propagating malformed data.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

// =============================================================================
// WIDGET TYPE
// =============================================================================

/// The closed set of widget kinds a board can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WidgetType {
    Chart,
    Table,
    Counter,
    Text,
    Image,
    Textarea,
}

impl WidgetType {
    /// Parse a wire type string. Unknown kinds degrade to `Textarea` so a
    /// malformed server payload never drops a widget on the floor.
    #[must_use]
    pub fn from_wire(raw: &str) -> Self {
        match raw {
            "chart" => Self::Chart,
            "table" => Self::Table,
            "counter" => Self::Counter,
            "text" => Self::Text,
            "image" => Self::Image,
            _ => Self::Textarea,
        }
    }

    /// Wire name of this type.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Chart => "chart",
            Self::Table => "table",
            Self::Counter => "counter",
            Self::Text => "text",
            Self::Image => "image",
            Self::Textarea => "textarea",
        }
    }
}

// =============================================================================
// WIDGET CONFIG
// =============================================================================

/// Per-type widget configuration. One variant per widget type, closed shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "config", rename_all = "lowercase")]
pub enum WidgetConfig {
    Chart {
        #[serde(rename = "chartType")]
        chart_type: String,
    },
    Table {
        rows: Vec<Value>,
    },
    Counter {
        value: f64,
        label: String,
    },
    Text {
        text: String,
    },
    Image {
        src: String,
        alt: String,
    },
    Textarea {
        text: String,
    },
}

impl WidgetConfig {
    /// Default config for a widget type.
    #[must_use]
    pub fn default_for(widget_type: WidgetType) -> Self {
        match widget_type {
            WidgetType::Chart => Self::Chart { chart_type: "pie".to_owned() },
            WidgetType::Table => Self::Table { rows: Vec::new() },
            WidgetType::Counter => Self::Counter { value: 0.0, label: "Metric".to_owned() },
            WidgetType::Text => Self::Text { text: "Yellow box".to_owned() },
            WidgetType::Image => Self::Image { src: String::new(), alt: "Imported image".to_owned() },
            WidgetType::Textarea => Self::Textarea { text: String::new() },
        }
    }

    /// The widget type this config belongs to.
    #[must_use]
    pub fn widget_type(&self) -> WidgetType {
        match self {
            Self::Chart { .. } => WidgetType::Chart,
            Self::Table { .. } => WidgetType::Table,
            Self::Counter { .. } => WidgetType::Counter,
            Self::Text { .. } => WidgetType::Text,
            Self::Image { .. } => WidgetType::Image,
            Self::Textarea { .. } => WidgetType::Textarea,
        }
    }

    /// Build a config of the given type from an untrusted key-value record.
    ///
    /// Fields with the wrong JSON type and fields that do not belong to the
    /// widget type are dropped; missing fields fall back to defaults.
    /// Normalizing twice is stable: `normalize(t, record(normalize(t, x)))`
    /// equals `normalize(t, x)`.
    #[must_use]
    pub fn normalize(widget_type: WidgetType, raw: &Map<String, Value>) -> Self {
        match widget_type {
            WidgetType::Chart => Self::Chart {
                chart_type: string_field(raw, "chartType").unwrap_or_else(|| "pie".to_owned()),
            },
            WidgetType::Table => Self::Table {
                rows: raw
                    .get("rows")
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default(),
            },
            WidgetType::Counter => Self::Counter {
                value: raw.get("value").and_then(Value::as_f64).unwrap_or(0.0),
                label: string_field(raw, "label").unwrap_or_else(|| "Metric".to_owned()),
            },
            WidgetType::Text => Self::Text {
                text: string_field(raw, "text").unwrap_or_else(|| "Yellow box".to_owned()),
            },
            WidgetType::Image => Self::Image {
                src: string_field(raw, "src").unwrap_or_default(),
                alt: string_field(raw, "alt").unwrap_or_else(|| "Imported image".to_owned()),
            },
            WidgetType::Textarea => Self::Textarea {
                text: string_field(raw, "text").unwrap_or_default(),
            },
        }
    }

    /// Untyped key-value view of the config, used for shallow merges and for
    /// the wire `configJson` field.
    #[must_use]
    pub fn record(&self) -> Map<String, Value> {
        let mut out = Map::new();
        match self {
            Self::Chart { chart_type } => {
                out.insert("chartType".to_owned(), Value::from(chart_type.clone()));
            }
            Self::Table { rows } => {
                out.insert("rows".to_owned(), Value::Array(rows.clone()));
            }
            Self::Counter { value, label } => {
                out.insert("value".to_owned(), Value::from(*value));
                out.insert("label".to_owned(), Value::from(label.clone()));
            }
            Self::Text { text } | Self::Textarea { text } => {
                out.insert("text".to_owned(), Value::from(text.clone()));
            }
            Self::Image { src, alt } => {
                out.insert("src".to_owned(), Value::from(src.clone()));
                out.insert("alt".to_owned(), Value::from(alt.clone()));
            }
        }
        out
    }

    /// Shallow-merge a partial record into this config, then re-normalize to
    /// the config's own type. Fields invalid for the type are dropped.
    #[must_use]
    pub fn merged(&self, partial: &Map<String, Value>) -> Self {
        let mut record = self.record();
        for (key, value) in partial {
            record.insert(key.clone(), value.clone());
        }
        Self::normalize(self.widget_type(), &record)
    }
}

fn string_field(raw: &Map<String, Value>, key: &str) -> Option<String> {
    raw.get(key).and_then(Value::as_str).map(ToOwned::to_owned)
}

// =============================================================================
// WIDGET
// =============================================================================

/// A positioned, typed, configurable element on a board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Widget {
    pub id: Uuid,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(flatten)]
    pub config: WidgetConfig,
}

impl Widget {
    /// The widget's type, derived from its config variant.
    #[must_use]
    pub fn widget_type(&self) -> WidgetType {
        self.config.widget_type()
    }
}

// =============================================================================
// BOARD
// =============================================================================

/// The top-level versioned document: an ordered widget list plus the
/// server-owned version counter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Board {
    pub id: String,
    pub version: u64,
    pub widgets: Vec<Widget>,
}

impl Board {
    /// Empty placeholder board published while a load is in flight.
    #[must_use]
    pub fn placeholder(board_id: &str) -> Self {
        Self { id: board_id.to_owned(), version: 1, widgets: Vec::new() }
    }

    /// Find a widget position by id.
    #[must_use]
    pub fn position_of(&self, id: Uuid) -> Option<usize> {
        self.widgets.iter().position(|w| w.id == id)
    }
}

#[cfg(test)]
#[path = "board_test.rs"]
mod tests;
