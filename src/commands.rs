//! Board commands — pure, side-effect-free transforms over board snapshots.
//!
//! DESIGN
//! ======
//! Every operation takes a `&Board` and returns a new `Board`; inputs are
//! never mutated and no I/O happens here. No-op conditions (missing id,
//! boundary reorder, self-move) return an unchanged clone. The engine is
//! responsible for publishing and persisting the results; these functions
//! never touch `version`.

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::board::{Board, Widget, WidgetConfig};
use crate::catalog::WidgetDefinition;

/// Direction for single-step z-order moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReorderDirection {
    /// One position toward the front (higher layer).
    Forward,
    /// One position toward the back (lower layer).
    Backward,
}

// =============================================================================
// ADD / REMOVE
// =============================================================================

/// Append a new widget from a catalog definition, staggered diagonally by the
/// current widget count so consecutive adds never land on top of each other.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn add_widget(board: &Board, definition: &WidgetDefinition) -> Board {
    let offset = 120.0 + board.widgets.len() as f64 * 20.0;
    let widget = create_widget(definition, offset, offset);
    with_appended(board, widget)
}

/// Append a new widget centered on `(x, y)`, clamping the top-left corner to
/// stay on the canvas.
#[must_use]
pub fn add_widget_at(board: &Board, definition: &WidgetDefinition, x: f64, y: f64) -> Board {
    let widget = create_widget(
        definition,
        (x - definition.default_width / 2.0).max(0.0),
        (y - definition.default_height / 2.0).max(0.0),
    );
    with_appended(board, widget)
}

/// Remove a widget by id. No-op if absent.
#[must_use]
pub fn remove(board: &Board, id: Uuid) -> Board {
    Board {
        widgets: board.widgets.iter().filter(|w| w.id != id).cloned().collect(),
        ..board.clone()
    }
}

// =============================================================================
// FRAME / CONFIG
// =============================================================================

/// Replace the frame (position and size) of the widget with the given id,
/// leaving its config and every other widget untouched. No-op if absent.
#[must_use]
pub fn set_widget_frame(board: &Board, id: Uuid, x: f64, y: f64, width: f64, height: f64) -> Board {
    map_widget(board, id, |w| Widget { x, y, width, height, ..w.clone() })
}

/// Shallow-merge a partial record into the widget's config, then re-normalize
/// to the widget's type. Fields invalid for the type are dropped and missing
/// fields are refilled with defaults. No-op if absent.
#[must_use]
pub fn update_config(board: &Board, id: Uuid, partial: &Map<String, Value>) -> Board {
    map_widget(board, id, |w| Widget { config: w.config.merged(partial), ..w.clone() })
}

// =============================================================================
// Z-ORDER
// =============================================================================

/// Move a widget to the end of the list (topmost layer). No-op if absent or
/// already frontmost.
#[must_use]
pub fn bring_to_front(board: &Board, id: Uuid) -> Board {
    let Some(index) = board.position_of(id) else {
        return board.clone();
    };
    if index == board.widgets.len() - 1 {
        return board.clone();
    }
    let mut widgets = board.widgets.clone();
    let widget = widgets.remove(index);
    widgets.push(widget);
    Board { widgets, ..board.clone() }
}

/// Move a widget to the start of the list (bottom layer). No-op if absent or
/// already backmost.
#[must_use]
pub fn send_to_back(board: &Board, id: Uuid) -> Board {
    let Some(index) = board.position_of(id) else {
        return board.clone();
    };
    if index == 0 {
        return board.clone();
    }
    let mut widgets = board.widgets.clone();
    let widget = widgets.remove(index);
    widgets.insert(0, widget);
    Board { widgets, ..board.clone() }
}

/// Swap a widget one position toward the front or back. No-op at the boundary
/// or if absent.
#[must_use]
pub fn reorder(board: &Board, id: Uuid, direction: ReorderDirection) -> Board {
    let Some(index) = board.position_of(id) else {
        return board.clone();
    };
    let target = match direction {
        ReorderDirection::Forward => index + 1,
        ReorderDirection::Backward => {
            let Some(target) = index.checked_sub(1) else {
                return board.clone();
            };
            target
        }
    };
    if target >= board.widgets.len() {
        return board.clone();
    }
    let mut widgets = board.widgets.clone();
    widgets.swap(index, target);
    Board { widgets, ..board.clone() }
}

/// Reinsert `source_id` immediately above (after) `target_id` in z-order.
/// No-op on self-move or if either id is missing.
#[must_use]
pub fn move_widget_above(board: &Board, source_id: Uuid, target_id: Uuid) -> Board {
    if source_id == target_id {
        return board.clone();
    }
    let (Some(source_index), Some(target_index)) =
        (board.position_of(source_id), board.position_of(target_id))
    else {
        return board.clone();
    };

    let mut widgets = board.widgets.clone();
    let source = widgets.remove(source_index);
    // Removing the source shifts the target left when it sat after the source.
    let adjusted_target = if source_index < target_index { target_index - 1 } else { target_index };
    let insert_index = (adjusted_target + 1).min(widgets.len());
    widgets.insert(insert_index, source);
    Board { widgets, ..board.clone() }
}

// =============================================================================
// HELPERS
// =============================================================================

fn create_widget(definition: &WidgetDefinition, x: f64, y: f64) -> Widget {
    let config = WidgetConfig::normalize(definition.widget_type, &definition.default_config.record());
    Widget {
        id: Uuid::new_v4(),
        x,
        y,
        width: definition.default_width,
        height: definition.default_height,
        config,
    }
}

fn with_appended(board: &Board, widget: Widget) -> Board {
    let mut widgets = board.widgets.clone();
    widgets.push(widget);
    Board { widgets, ..board.clone() }
}

fn map_widget(board: &Board, id: Uuid, f: impl Fn(&Widget) -> Widget) -> Board {
    Board {
        widgets: board
            .widgets
            .iter()
            .map(|w| if w.id == id { f(w) } else { w.clone() })
            .collect(),
        ..board.clone()
    }
}

#[cfg(test)]
#[path = "commands_test.rs"]
mod tests;
