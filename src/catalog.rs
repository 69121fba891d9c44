//! Widget catalog — the static list of widget kinds and their defaults.
//!
//! The catalog is the only authority on default sizes and configs; commands
//! consult it when instantiating widgets so new widget kinds only need a new
//! catalog entry.

use crate::board::{WidgetConfig, WidgetType};

// =============================================================================
// TYPES
// =============================================================================

/// Blueprint for instantiating a widget of a given type.
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetDefinition {
    pub widget_type: WidgetType,
    pub name: String,
    pub default_config: WidgetConfig,
    pub default_width: f64,
    pub default_height: f64,
}

/// Static widget catalog. `Default` yields the built-in six-widget set.
#[derive(Debug, Clone)]
pub struct WidgetCatalog {
    definitions: Vec<WidgetDefinition>,
}

// =============================================================================
// CATALOG
// =============================================================================

impl WidgetCatalog {
    #[must_use]
    pub fn new(definitions: Vec<WidgetDefinition>) -> Self {
        Self { definitions }
    }

    /// All definitions, in palette order.
    #[must_use]
    pub fn list(&self) -> &[WidgetDefinition] {
        &self.definitions
    }

    /// Look up a definition by widget type.
    #[must_use]
    pub fn get(&self, widget_type: WidgetType) -> Option<&WidgetDefinition> {
        self.definitions.iter().find(|d| d.widget_type == widget_type)
    }
}

impl Default for WidgetCatalog {
    fn default() -> Self {
        let entry = |widget_type: WidgetType, name: &str, width: f64, height: f64| WidgetDefinition {
            widget_type,
            name: name.to_owned(),
            default_config: WidgetConfig::default_for(widget_type),
            default_width: width,
            default_height: height,
        };

        Self::new(vec![
            entry(WidgetType::Chart, "Chart", 320.0, 240.0),
            entry(WidgetType::Table, "Table", 360.0, 220.0),
            entry(WidgetType::Counter, "Counter", 220.0, 140.0),
            entry(WidgetType::Text, "Yellow Box", 240.0, 160.0),
            entry(WidgetType::Image, "Image", 300.0, 220.0),
            entry(WidgetType::Textarea, "Textarea", 320.0, 200.0),
        ])
    }
}

#[cfg(test)]
#[path = "catalog_test.rs"]
mod tests;
