use mapedit::collab::CommitReceipt;
use mapedit::ledger::{EditKind, Ledger};
use mapedit::model::FeatureId;
use proptest::prelude::*;

#[derive(Clone, Debug)]
enum Op {
    Record { feature: u8, kind: u8 },
    Commit { ok: bool },
    Settle,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0u8..6, 0u8..3).prop_map(|(feature, kind)| Op::Record { feature, kind }),
        1 => any::<bool>().prop_map(|ok| Op::Commit { ok }),
        1 => Just(Op::Settle),
    ]
}

fn kind(k: u8) -> EditKind {
    match k {
        0 => EditKind::Insert,
        1 => EditKind::Update,
        _ => EditKind::Delete,
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]
    #[test]
    fn one_pending_kind_per_feature(ops in proptest::collection::vec(op_strategy(), 1..60)) {
        let mut l = Ledger::new();
        let mut outstanding = Vec::new();
        for op in ops {
            match op {
                Op::Record { feature, kind: k } => {
                    let id = FeatureId::from(format!("f{feature}"));
                    let left = l.record("a", &id, kind(k));
                    prop_assert_eq!(l.get("a", &id).map(|e| e.kind), left);
                    if kind(k) == EditKind::Insert {
                        prop_assert_eq!(left, Some(EditKind::Insert));
                    }
                }
                Op::Commit { ok } => {
                    for snap in l.snapshot(None) {
                        outstanding.push((snap, ok));
                    }
                }
                Op::Settle => {
                    for (snap, ok) in outstanding.drain(..) {
                        if ok {
                            l.acknowledge(&snap, &CommitReceipt::default());
                        } else {
                            l.fail(&snap);
                        }
                    }
                }
            }
            let mut seen = std::collections::HashSet::new();
            for k in [EditKind::Insert, EditKind::Update, EditKind::Delete] {
                for id in l.ids("a", k) {
                    prop_assert!(seen.insert(id), "feature pending under two kinds");
                }
            }
            prop_assert_eq!(l.is_empty(), l.len() == 0);
        }
        for (snap, _) in outstanding.drain(..) {
            l.acknowledge(&snap, &CommitReceipt::default());
        }
        prop_assert_eq!(l.in_flight_len(), 0);
    }

    #[test]
    fn acknowledged_commit_clears_untouched_entries(n in 1usize..20) {
        let mut l = Ledger::new();
        for i in 0..n {
            l.record("a", &FeatureId::from(format!("f{i}")), EditKind::Update);
        }
        let snaps = l.snapshot(Some("a"));
        prop_assert_eq!(snaps.len(), 1);
        prop_assert_eq!(snaps[0].entries.len(), n);
        l.acknowledge(&snaps[0], &CommitReceipt::default());
        prop_assert!(l.is_empty());
    }
}

#[test]
fn insert_acknowledged_while_updated_becomes_update() {
    let mut l = Ledger::new();
    let id = FeatureId::from("tmp");
    l.record("a", &id, EditKind::Insert);
    let snaps = l.snapshot(None);
    l.record("a", &id, EditKind::Update);
    let mut receipt = CommitReceipt::default();
    receipt.assigned_ids.insert(id.clone(), FeatureId::from("42"));
    let remapped = l.acknowledge(&snaps[0], &receipt);
    assert_eq!(remapped, vec![(id, FeatureId::from("42"))]);
    assert_eq!(l.ids("a", EditKind::Update), vec![FeatureId::from("42")]);
}

#[test]
fn delete_of_in_flight_insert_is_kept() {
    let mut l = Ledger::new();
    let id = FeatureId::from("tmp");
    l.record("a", &id, EditKind::Insert);
    let snaps = l.snapshot(None);
    assert_eq!(l.record("a", &id, EditKind::Delete), Some(EditKind::Delete));
    l.acknowledge(&snaps[0], &CommitReceipt::default());
    assert_eq!(l.ids("a", EditKind::Delete), vec![id.clone()]);

    // had the insert failed, there would be nothing to delete
    let mut l = Ledger::new();
    l.record("a", &id, EditKind::Insert);
    let snaps = l.snapshot(None);
    l.record("a", &id, EditKind::Delete);
    l.fail(&snaps[0]);
    assert!(l.is_empty());
}
