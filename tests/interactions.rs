mod common;

use common::{harness, layer, options};
use futures_executor::block_on;
use mapedit::config::{EditOperation, LayerConfig};
use mapedit::events::{EditorEvent, Tool};
use mapedit::mode::EditMode;
use mapedit::model::{Coord, Feature, FeatureId, Geometry, GeometryType};

#[test]
fn removing_interactions_twice_is_harmless() {
    let mut h = harness(options(vec![layer("roads", GeometryType::LineString)]));
    assert_eq!(h.session.drain_events(), vec![EditorEvent::EnableInteraction]);
    assert!(h.session.remove_interactions());
    assert!(!h.session.remove_interactions());
    assert_eq!(h.session.drain_events(), vec![EditorEvent::Select { features: Vec::new() }]);
    assert!(!h.session.is_active());
    assert!(h.session.interactions().is_none());
}

#[test]
fn table_layers_cannot_become_edit_layer() {
    let mut h = harness(options(vec![
        layer("roads", GeometryType::LineString),
        LayerConfig { is_table: true, ..LayerConfig::new("owners", None) },
    ]));
    assert_eq!(h.session.set_active_layer("owners").unwrap_err().code(), "not_editable");
    assert_eq!(h.session.set_active_layer("nope").unwrap_err().code(), "unknown_layer");
    assert_eq!(h.session.current_layer(), Some("roads"));
}

#[test]
fn preselected_feature_is_selected_on_rebuild() {
    let mut h = harness(options(vec![layer("poi", GeometryType::Point), layer("roads", GeometryType::LineString)]));
    let f = Feature::new(Some(Geometry::Point(Coord::new(1., 2.)))).with_id("p");
    h.session.load_features("poi", vec![f.clone()]).unwrap();
    h.session.set_active_layer("roads").unwrap();
    h.session.drain_events();

    h.session.preselect_feature(FeatureId::from("p"));
    h.session.set_active_layer("poi").unwrap();
    assert_eq!(h.session.selection(), &[FeatureId::from("p")]);
    assert_eq!(h.session.drain_events().last(), Some(&EditorEvent::Select { features: vec![f] }));

    h.session.build_interactions(None);
    assert!(h.session.selection().is_empty());
}

#[test]
fn other_tool_cancels_drawing() {
    let mut h = harness(options(vec![layer("roads", GeometryType::LineString)]));
    h.session.start_draw().unwrap();
    assert!(h.session.is_drawing());
    h.session.change_edit(Tool::Attribute, true);
    assert!(!h.session.is_drawing());
    assert_eq!(h.session.mode(), EditMode::Default);
    assert_eq!(h.session.drain_events().last(), Some(&EditorEvent::ChangeEdit { tool: Tool::Draw, active: false }));
}

#[test]
fn disallowed_tools_are_ignored() {
    let mut roads = layer("roads", GeometryType::LineString);
    roads.allowed_edit_operations = Some(vec![EditOperation::UpdateAttributes]);
    let mut h = harness(options(vec![roads]));
    block_on(h.session.toggle_edit(Tool::Draw, None)).unwrap();
    assert!(!h.session.is_drawing());
    assert_eq!(h.session.interactions().unwrap().modify_active, None);
}

#[test]
fn custom_shape_hands_over_pointer() {
    let mut h = harness(options(vec![layer("roads", GeometryType::LineString)]));
    h.session.change_shape("custom").unwrap();
    assert_eq!(h.session.mode(), EditMode::Custom);
    let i = h.session.interactions().unwrap();
    assert!(!i.draw_active && !i.select_active);

    let point = Feature::new(Some(Geometry::Point(Coord::new(0., 0.))));
    let err = h.session.custom_draw_end(Some(point)).unwrap_err();
    assert_eq!(err.code(), "geometry_type_mismatch");
    assert_eq!(h.ui.alerts.borrow().len(), 1);
    assert_eq!(h.session.mode(), EditMode::Default);
}

#[test]
fn lazily_typed_layer_gets_draw_interaction() {
    let mut h = harness(options(vec![LayerConfig::new("misc", None)]));
    assert!(h.session.draw_session().is_none());
    let line = Feature::new(Some(Geometry::LineString(vec![Coord::new(0., 0.), Coord::new(1., 0.)])));
    h.session.load_features("misc", vec![line]).unwrap();
    assert_eq!(h.session.current_geometry_type(), Some(GeometryType::LineString));
    assert_eq!(h.session.draw_session().map(|d| d.kind()), Some(GeometryType::LineString));
}
