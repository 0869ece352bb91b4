mod common;

use std::rc::Rc;

use common::{harness_with, layer, options, Backend, Relations};
use futures_executor::block_on;
use mapedit::config::{DeleteMode, LayerConfig, RelatedTableConfig};
use mapedit::ledger::EditKind;
use mapedit::model::{Coord, Feature, FeatureId, Geometry, GeometryType};

fn parcel(id: &str) -> Feature {
    Feature::new(Some(Geometry::Polygon(vec![vec![
        Coord::new(0., 0.),
        Coord::new(10., 0.),
        Coord::new(10., 10.),
        Coord::new(0., 10.),
        Coord::new(0., 0.),
    ]])))
    .with_id(id)
}

fn row(id: &str) -> Feature { Feature::new(None).with_id(id) }

fn setup(auto_save: bool) -> common::Harness {
    let mut opts = options(vec![
        layer("parcels", GeometryType::Polygon),
        LayerConfig { is_table: true, ..LayerConfig::new("owners", None) },
        LayerConfig { is_table: true, ..LayerConfig::new("notes", None) },
    ]);
    opts.auto_save = auto_save;
    let relations = Relations::default()
        .with("parcels", RelatedTableConfig::new("owners", DeleteMode::Cascade))
        .with("parcels", RelatedTableConfig::new("notes", DeleteMode::Db))
        .child("owners", "p1", row("o1"))
        .child("owners", "p1", row("o2"))
        .child("notes", "p1", row("n1"));
    let mut h = harness_with(opts, Backend::default(), Rc::new(relations));
    h.session.load_features("parcels", vec![parcel("p1"), parcel("p2")]).unwrap();
    h.session.load_features("owners", vec![row("o1"), row("o2")]).unwrap();
    h.session.load_features("notes", vec![row("n1")]).unwrap();
    h
}

fn id(s: &str) -> FeatureId { FeatureId::from(s) }

#[test]
fn children_are_recorded_before_parent() {
    let mut h = setup(false);
    block_on(h.session.delete_feature("parcels", &id("p1"))).unwrap();

    let ledger = h.session.ledger();
    assert_eq!(ledger.ids("owners", EditKind::Delete), vec![id("o1"), id("o2")]);
    assert_eq!(ledger.ids("parcels", EditKind::Delete), vec![id("p1")]);
    // the backend removes these itself
    assert!(ledger.ids("notes", EditKind::Delete).is_empty());
    let parent_rev = ledger.get("parcels", &id("p1")).unwrap().rev;
    for child in ["o1", "o2"] {
        assert!(ledger.get("owners", &id(child)).unwrap().rev < parent_rev);
    }
    drop(ledger);

    assert!(h.session.feature("parcels", &id("p1")).is_none());
    assert!(h.session.feature("parcels", &id("p2")).is_some());
    assert!(h.session.feature("owners", &id("o1")).is_none());
    assert!(h.session.feature("notes", &id("n1")).is_none());
}

#[test]
fn autosave_commits_children_first() {
    let mut h = setup(true);
    block_on(h.session.delete_feature("parcels", &id("p1"))).unwrap();
    let order: Vec<String> = h.backend.commits.borrow().iter().map(|(l, _)| l.clone()).collect();
    assert_eq!(order, vec!["owners", "owners", "parcels"]);
    let (_, tx) = &h.backend.commits.borrow()[2];
    assert_eq!(tx.delete.as_ref().map(|d| d[0].id.clone()), Some(id("p1")));
    assert!(tx.insert.is_none() && tx.update.is_none());
    assert!(h.session.ledger().is_empty());
}

#[test]
fn refused_child_delete_keeps_parent() {
    let mut h = setup(true);
    h.backend.failing.borrow_mut().insert("owners".into());
    let err = block_on(h.session.delete_feature("parcels", &id("p1"))).unwrap_err();
    assert_eq!(err.code(), "persistence");

    // stops at the first refused child, the parent is never sent
    let order: Vec<String> = h.backend.commits.borrow().iter().map(|(l, _)| l.clone()).collect();
    assert_eq!(order, vec!["owners"]);
    assert!(h.session.feature("parcels", &id("p1")).is_some());
    assert!(h.session.feature("owners", &id("o2")).is_some());

    let ledger = h.session.ledger();
    assert_eq!(ledger.ids("owners", EditKind::Delete), vec![id("o1")]);
    assert!(ledger.ids("parcels", EditKind::Delete).is_empty());
}

#[test]
fn retry_after_refused_child_completes_cascade() {
    let mut h = setup(true);
    h.backend.failing.borrow_mut().insert("owners".into());
    assert!(block_on(h.session.delete_feature("parcels", &id("p1"))).is_err());

    h.backend.failing.borrow_mut().clear();
    block_on(h.session.delete_feature("parcels", &id("p1"))).unwrap();
    assert!(h.session.feature("parcels", &id("p1")).is_none());
    assert!(h.session.ledger().is_empty());
    let order: Vec<String> = h.backend.commits.borrow().iter().map(|(l, _)| l.clone()).collect();
    assert_eq!(order.last().map(String::as_str), Some("parcels"));
}

#[test]
fn unknown_feature_is_an_error() {
    let mut h = setup(false);
    let err = block_on(h.session.delete_feature("parcels", &id("nope"))).unwrap_err();
    assert_eq!(err.code(), "feature_not_found");
    assert!(h.session.ledger().is_empty());
}

#[test]
fn deleting_unsaved_feature_leaves_nothing_pending() {
    let mut h = setup(false);
    let f = h.session.create_feature("parcels", None).unwrap();
    assert!(h.session.has_pending_edits());
    block_on(h.session.delete_feature("parcels", &f.id)).unwrap();
    assert!(!h.session.has_pending_edits());
}
