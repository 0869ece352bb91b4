mod common;

use common::{harness, layer, options};
use futures_executor::block_on;
use mapedit::draw::{DrawStep, PointerEvent};
use mapedit::events::{EditorEvent, Tool};
use mapedit::ledger::EditKind;
use mapedit::mode::EditMode;
use mapedit::model::{Coord, Geometry, GeometryType};

fn press(h: &mut common::Harness, x: f64, y: f64) -> DrawStep {
    h.session.click(&PointerEvent::at(x, y)).expect("click")
}

#[test]
fn polygon_on_multipolygon_layer_is_wrapped_and_recorded() {
    let mut h = harness(options(vec![layer("parcels", GeometryType::MultiPolygon)]));
    block_on(h.session.toggle_edit(Tool::Draw, None)).unwrap();
    assert_eq!(h.session.mode(), EditMode::Draw);

    assert_eq!(press(&mut h, 0., 0.), DrawStep::Started);
    for (x, y) in [(10., 0.), (10., 10.), (0., 10.)] {
        assert_eq!(press(&mut h, x, y), DrawStep::VertexAdded);
    }
    let step = press(&mut h, 0., 0.);
    assert!(matches!(step, DrawStep::Finished(Geometry::Polygon(_))), "got {step:?}");

    let inserts = h.session.ledger().ids("parcels", EditKind::Insert);
    assert_eq!(inserts.len(), 1);
    let f = h.session.feature("parcels", &inserts[0]).expect("feature in source");
    let Some(Geometry::MultiPolygon(polys)) = &f.geometry else { panic!("not wrapped: {:?}", f.geometry) };
    assert_eq!(polys.len(), 1);
    assert_eq!(polys[0][0].len(), 5);
    assert_eq!(h.session.mode(), EditMode::Default);

    let events = h.session.drain_events();
    assert!(events.contains(&EditorEvent::EditsChange { pending: true }));
    assert_eq!(events.last(), Some(&EditorEvent::ChangeEdit { tool: Tool::Draw, active: false }));
    assert_eq!(h.backend.commit_count(), 0);
}

#[test]
fn crossing_closing_ring_drops_last_vertex_on_next_turn() {
    let mut h = harness(options(vec![layer("parcels", GeometryType::Polygon)]));
    h.session.start_draw().unwrap();
    for (x, y) in [(0., 0.), (10., 0.), (10., 10.), (20., 5.)] {
        press(&mut h, x, y);
    }
    assert_eq!(press(&mut h, 20., 5.), DrawStep::FinishBlocked);
    let d = h.session.draw_session().unwrap();
    assert!(d.is_correcting());
    assert_eq!(d.sketch().unwrap().vertices().len(), 4);

    h.session.tick();
    let d = h.session.draw_session().unwrap();
    assert!(!d.is_correcting());
    assert_eq!(d.sketch().unwrap().vertices(), &[Coord::new(0., 0.), Coord::new(10., 0.), Coord::new(10., 10.)]);
    assert!(h.session.ledger().is_empty());
}

#[test]
fn autosave_commits_drawn_feature_and_applies_assigned_id() {
    let mut opts = options(vec![layer("poi", GeometryType::Point)]);
    opts.auto_save = true;
    let mut h = common::harness_with(opts, common::Backend::assigning(), std::rc::Rc::new(mapedit::collab::NoRelations));
    h.session.start_draw().unwrap();
    assert!(matches!(press(&mut h, 3., 4.), DrawStep::Finished(_)));
    // prepared but not sent until someone awaits it
    assert!(h.session.has_queued_autosaves());
    assert_eq!(h.backend.commit_count(), 0);

    let report = block_on(h.session.settle_autosaves());
    assert!(report.is_ok());
    assert!(!h.session.has_queued_autosaves());
    assert_eq!(h.backend.commit_count(), 1);
    assert!(h.session.ledger().is_empty());
    let f = h.session.layers().get("poi").unwrap().source.first().unwrap();
    assert_eq!(f.id.as_str(), "perm-1");
    assert_eq!(f.geometry, Some(Geometry::Point(Coord::new(3., 4.))));
}

#[test]
fn drawing_without_geometry_type_alerts() {
    let mut h = harness(options(vec![mapedit::config::LayerConfig::new("untyped", None)]));
    let err = h.session.start_draw().unwrap_err();
    assert_eq!(err.code(), "missing_geometry_type");
    assert_eq!(h.ui.alerts.borrow().len(), 1);
}

#[test]
fn split_line_by_point_keeps_id_and_inserts_remainder() {
    let mut h = harness(options(vec![layer("roads", GeometryType::LineString)]));
    let mut road = mapedit::model::Feature::new(Some(Geometry::LineString(vec![
        Coord::new(0., 0.),
        Coord::new(10., 0.),
        Coord::new(20., 0.),
    ])))
    .with_id("r1");
    road.set("name", serde_json::json!("Main"));
    h.session.load_features("roads", vec![road]).unwrap();
    h.session.select(vec![mapedit::model::FeatureId::from("r1")]);
    assert!(h.session.set_modify_tool("split-line-by-point").unwrap());
    assert_eq!(h.session.mode(), EditMode::Custom);

    press(&mut h, 5., 0.);
    assert_eq!(h.session.mode(), EditMode::Default);
    let ledger = h.session.ledger();
    assert_eq!(ledger.ids("roads", EditKind::Update), vec![mapedit::model::FeatureId::from("r1")]);
    let inserted = ledger.ids("roads", EditKind::Insert);
    assert_eq!(inserted.len(), 1);
    drop(ledger);
    let head = h.session.feature("roads", &"r1".into()).unwrap();
    assert_eq!(head.geometry, Some(Geometry::LineString(vec![Coord::new(0., 0.), Coord::new(5., 0.)])));
    let tail = h.session.feature("roads", &inserted[0]).unwrap();
    assert_eq!(tail.get("name"), Some(&serde_json::json!("Main")));
    assert_eq!(tail.geometry.as_ref().map(|g| g.vertex_count()), Some(3));
}

fn ring(pts: &[(f64, f64)]) -> Geometry {
    Geometry::Polygon(vec![pts.iter().map(|&(x, y)| Coord::new(x, y)).collect()])
}

#[test]
fn invalid_modification_without_snapshot_keeps_stored_geometry() {
    let mut h = harness(options(vec![layer("parcels", GeometryType::Polygon)]));
    let square = ring(&[(0., 0.), (10., 0.), (10., 10.), (0., 10.), (0., 0.)]);
    let bowtie = ring(&[(0., 0.), (10., 10.), (10., 0.), (0., 10.), (0., 0.)]);
    let p1 = mapedit::model::Feature::new(Some(square.clone())).with_id("p1");
    h.session.load_features("parcels", vec![p1]).unwrap();

    // no modify_start, so there is no snapshot to roll back to
    assert!(!h.session.modify_end(&"p1".into(), bowtie.clone()).unwrap());
    assert_eq!(h.session.feature("parcels", &"p1".into()).unwrap().geometry, Some(square.clone()));
    assert!(!h.session.has_pending_edits());

    // same without any interactions installed
    h.session.remove_interactions();
    assert!(!h.session.modify_end(&"p1".into(), bowtie).unwrap());
    assert_eq!(h.session.feature("parcels", &"p1".into()).unwrap().geometry, Some(square));
    assert!(!h.session.has_pending_edits());

    let moved = ring(&[(0., 0.), (12., 0.), (12., 10.), (0., 10.), (0., 0.)]);
    assert!(h.session.modify_end(&"p1".into(), moved.clone()).unwrap());
    assert_eq!(h.session.feature("parcels", &"p1".into()).unwrap().geometry, Some(moved));
    assert_eq!(h.session.ledger().ids("parcels", EditKind::Update), vec![mapedit::model::FeatureId::from("p1")]);
}
