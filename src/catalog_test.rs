use super::*;

#[test]
fn default_catalog_lists_six_widget_kinds_in_palette_order() {
    let catalog = WidgetCatalog::default();
    let types: Vec<WidgetType> = catalog.list().iter().map(|d| d.widget_type).collect();
    assert_eq!(
        types,
        vec![
            WidgetType::Chart,
            WidgetType::Table,
            WidgetType::Counter,
            WidgetType::Text,
            WidgetType::Image,
            WidgetType::Textarea,
        ]
    );
}

#[test]
fn default_catalog_sizes_and_names() {
    let catalog = WidgetCatalog::default();

    let chart = catalog.get(WidgetType::Chart).expect("chart definition");
    assert_eq!(chart.name, "Chart");
    assert_eq!((chart.default_width, chart.default_height), (320.0, 240.0));

    let text = catalog.get(WidgetType::Text).expect("text definition");
    assert_eq!(text.name, "Yellow Box");
    assert_eq!((text.default_width, text.default_height), (240.0, 160.0));

    let counter = catalog.get(WidgetType::Counter).expect("counter definition");
    assert_eq!((counter.default_width, counter.default_height), (220.0, 140.0));
}

#[test]
fn default_configs_match_type_defaults() {
    let catalog = WidgetCatalog::default();
    for definition in catalog.list() {
        assert_eq!(
            definition.default_config,
            WidgetConfig::default_for(definition.widget_type),
            "default config mismatch for {:?}",
            definition.widget_type
        );
    }
}

#[test]
fn empty_catalog_get_returns_none() {
    let catalog = WidgetCatalog::new(Vec::new());
    assert!(catalog.get(WidgetType::Chart).is_none());
    assert!(catalog.list().is_empty());
}
