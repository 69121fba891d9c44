use super::*;
use serde_json::json;

fn record(pairs: &[(&str, Value)]) -> Map<String, Value> {
    pairs.iter().map(|(k, v)| ((*k).to_owned(), v.clone())).collect()
}

// =============================================================================
// WidgetType
// =============================================================================

#[test]
fn widget_type_from_wire_known_kinds() {
    assert_eq!(WidgetType::from_wire("chart"), WidgetType::Chart);
    assert_eq!(WidgetType::from_wire("table"), WidgetType::Table);
    assert_eq!(WidgetType::from_wire("counter"), WidgetType::Counter);
    assert_eq!(WidgetType::from_wire("text"), WidgetType::Text);
    assert_eq!(WidgetType::from_wire("image"), WidgetType::Image);
    assert_eq!(WidgetType::from_wire("textarea"), WidgetType::Textarea);
}

#[test]
fn widget_type_from_wire_unknown_falls_back_to_textarea() {
    assert_eq!(WidgetType::from_wire("hologram"), WidgetType::Textarea);
    assert_eq!(WidgetType::from_wire(""), WidgetType::Textarea);
}

// =============================================================================
// normalize — defaults
// =============================================================================

#[test]
fn normalize_empty_input_yields_defaults() {
    let empty = Map::new();
    assert_eq!(
        WidgetConfig::normalize(WidgetType::Chart, &empty),
        WidgetConfig::Chart { chart_type: "pie".to_owned() }
    );
    assert_eq!(WidgetConfig::normalize(WidgetType::Table, &empty), WidgetConfig::Table { rows: vec![] });
    assert_eq!(
        WidgetConfig::normalize(WidgetType::Counter, &empty),
        WidgetConfig::Counter { value: 0.0, label: "Metric".to_owned() }
    );
    assert_eq!(
        WidgetConfig::normalize(WidgetType::Text, &empty),
        WidgetConfig::Text { text: "Yellow box".to_owned() }
    );
    assert_eq!(
        WidgetConfig::normalize(WidgetType::Image, &empty),
        WidgetConfig::Image { src: String::new(), alt: "Imported image".to_owned() }
    );
    assert_eq!(
        WidgetConfig::normalize(WidgetType::Textarea, &empty),
        WidgetConfig::Textarea { text: String::new() }
    );
}

#[test]
fn normalize_wrong_typed_fields_fall_back_to_defaults() {
    let raw = record(&[("value", json!("not a number")), ("label", json!(42))]);
    assert_eq!(
        WidgetConfig::normalize(WidgetType::Counter, &raw),
        WidgetConfig::Counter { value: 0.0, label: "Metric".to_owned() }
    );

    let raw = record(&[("rows", json!({"not": "an array"}))]);
    assert_eq!(WidgetConfig::normalize(WidgetType::Table, &raw), WidgetConfig::Table { rows: vec![] });
}

#[test]
fn normalize_drops_fields_from_other_types() {
    // A counter payload polluted with chart and image fields keeps only the
    // counter shape.
    let raw = record(&[
        ("value", json!(7.5)),
        ("chartType", json!("bar")),
        ("src", json!("http://example/x.png")),
    ]);
    let normalized = WidgetConfig::normalize(WidgetType::Counter, &raw);
    assert_eq!(normalized, WidgetConfig::Counter { value: 7.5, label: "Metric".to_owned() });
    assert!(!normalized.record().contains_key("chartType"));
    assert!(!normalized.record().contains_key("src"));
}

#[test]
fn normalize_twice_is_stable() {
    let messy_inputs = vec![
        record(&[("chartType", json!("bar")), ("bogus", json!(true))]),
        record(&[("rows", json!([1, 2, 3])), ("value", json!("nope"))]),
        record(&[("value", json!(3.25)), ("label", json!("Revenue"))]),
        record(&[("text", json!(99))]),
        record(&[("src", json!("a.png")), ("alt", json!(null))]),
        Map::new(),
    ];
    for widget_type in [
        WidgetType::Chart,
        WidgetType::Table,
        WidgetType::Counter,
        WidgetType::Text,
        WidgetType::Image,
        WidgetType::Textarea,
    ] {
        for raw in &messy_inputs {
            let once = WidgetConfig::normalize(widget_type, raw);
            let twice = WidgetConfig::normalize(widget_type, &once.record());
            assert_eq!(twice, once, "normalize not stable for {widget_type:?} with {raw:?}");
        }
    }
}

// =============================================================================
// merged
// =============================================================================

#[test]
fn merged_applies_partial_and_keeps_rest() {
    let config = WidgetConfig::Counter { value: 5.0, label: "Users".to_owned() };
    let merged = config.merged(&record(&[("value", json!(6.0))]));
    assert_eq!(merged, WidgetConfig::Counter { value: 6.0, label: "Users".to_owned() });
}

#[test]
fn merged_drops_fields_invalid_for_type() {
    let config = WidgetConfig::Text { text: "hello".to_owned() };
    let merged = config.merged(&record(&[("chartType", json!("bar")), ("text", json!("world"))]));
    assert_eq!(merged, WidgetConfig::Text { text: "world".to_owned() });
}

#[test]
fn merged_wrong_typed_override_resets_to_default() {
    let config = WidgetConfig::Chart { chart_type: "bar".to_owned() };
    let merged = config.merged(&record(&[("chartType", json!(17))]));
    assert_eq!(merged, WidgetConfig::Chart { chart_type: "pie".to_owned() });
}

// =============================================================================
// serde shape
// =============================================================================

#[test]
fn widget_serializes_with_type_and_config_tags() {
    let widget = Widget {
        id: Uuid::nil(),
        x: 1.0,
        y: 2.0,
        width: 3.0,
        height: 4.0,
        config: WidgetConfig::Counter { value: 1.5, label: "M".to_owned() },
    };
    let value = serde_json::to_value(&widget).expect("serialize");
    assert_eq!(value["type"], json!("counter"));
    assert_eq!(value["config"]["value"], json!(1.5));
    assert_eq!(value["config"]["label"], json!("M"));

    let back: Widget = serde_json::from_value(value).expect("deserialize");
    assert_eq!(back, widget);
}

// =============================================================================
// Board helpers
// =============================================================================

#[test]
fn placeholder_is_empty_at_version_one() {
    let board = Board::placeholder("b1");
    assert_eq!(board.id, "b1");
    assert_eq!(board.version, 1);
    assert!(board.widgets.is_empty());
}

#[test]
fn position_of_finds_widget_or_none() {
    let w = Widget {
        id: Uuid::new_v4(),
        x: 0.0,
        y: 0.0,
        width: 10.0,
        height: 10.0,
        config: WidgetConfig::default_for(WidgetType::Text),
    };
    let board = Board { id: "b".to_owned(), version: 1, widgets: vec![w.clone()] };
    assert_eq!(board.position_of(w.id), Some(0));
    assert_eq!(board.position_of(Uuid::new_v4()), None);
}
