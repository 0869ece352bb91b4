//! Pending edits per layer and feature.
//!
//! Each feature id holds at most one pending kind per layer. Entries carry a
//! revision that changes on every record, so a commit acknowledges only what
//! it actually sent. While a commit for an entry is outstanding, later
//! snapshots skip that entry.
//!
//! Reconciliation when a feature is recorded again before its entry is
//! committed:
//!
//! | pending | recorded | result                                        |
//! |---------|----------|-----------------------------------------------|
//! | insert  | update   | insert                                        |
//! | insert  | delete   | dropped, or delete when the insert is in flight |
//! | update  | delete   | delete                                        |
//! | delete  | update   | delete                                        |
//! | any     | insert   | insert                                        |

use std::collections::HashMap;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::collab::CommitReceipt;
use crate::model::FeatureId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditKind {
    Insert,
    Update,
    Delete,
}

impl fmt::Display for EditKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EditKind::Insert => "insert",
            EditKind::Update => "update",
            EditKind::Delete => "delete",
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingEdit {
    pub kind: EditKind,
    pub rev: u64,
}

/// Entries of one layer taken for a commit.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LayerSnapshot {
    pub layer: String,
    pub entries: Vec<(FeatureId, PendingEdit)>,
}

impl LayerSnapshot {
    pub fn ids(&self, kind: EditKind) -> impl Iterator<Item = &FeatureId> {
        self.entries.iter().filter(move |(_, e)| e.kind == kind).map(|(id, _)| id)
    }
}

#[derive(Clone, Debug, Default)]
pub struct Ledger {
    layers: IndexMap<String, IndexMap<FeatureId, PendingEdit>>,
    in_flight: HashMap<(String, FeatureId), PendingEdit>,
    next_rev: u64,
}

impl Ledger {
    pub fn new() -> Self { Self::default() }

    fn bump(&mut self) -> u64 {
        self.next_rev += 1;
        self.next_rev
    }

    fn in_flight_kind(&self, layer: &str, id: &FeatureId) -> Option<EditKind> {
        self.in_flight.get(&(layer.to_string(), id.clone())).map(|e| e.kind)
    }

    /// Records a change and returns the kind left pending, if any.
    pub fn record(&mut self, layer: &str, id: &FeatureId, kind: EditKind) -> Option<EditKind> {
        let rev = self.bump();
        let inserting_in_flight = self.in_flight_kind(layer, id) == Some(EditKind::Insert);
        let edits = self.layers.entry(layer.to_string()).or_default();
        let current = edits.get(id).map(|e| e.kind);
        let next = match (current, kind) {
            (_, EditKind::Insert) => Some(EditKind::Insert),
            (Some(EditKind::Insert), EditKind::Update) => Some(EditKind::Insert),
            (Some(EditKind::Delete), EditKind::Update) => Some(EditKind::Delete),
            (Some(EditKind::Insert), EditKind::Delete) if !inserting_in_flight => None,
            (_, k) => Some(k),
        };
        match next {
            Some(k) => {
                edits.insert(id.clone(), PendingEdit { kind: k, rev });
            }
            None => {
                edits.shift_remove(id);
                log::debug!("{layer}/{id}: unsaved insert deleted, both dropped");
            }
        }
        if edits.is_empty() {
            self.layers.shift_remove(layer);
        }
        next
    }

    pub fn get(&self, layer: &str, id: &FeatureId) -> Option<PendingEdit> {
        self.layers.get(layer).and_then(|m| m.get(id)).copied()
    }

    pub fn has_feature(&self, kind: EditKind, layer: &str, id: &FeatureId) -> bool {
        self.get(layer, id).map_or(false, |e| e.kind == kind)
    }

    pub fn ids(&self, layer: &str, kind: EditKind) -> Vec<FeatureId> {
        self.layers
            .get(layer)
            .map(|m| m.iter().filter(|(_, e)| e.kind == kind).map(|(id, _)| id.clone()).collect())
            .unwrap_or_default()
    }

    pub fn has_pending(&self) -> bool { !self.layers.is_empty() }

    pub fn layers(&self) -> impl Iterator<Item = &str> { self.layers.keys().map(String::as_str) }

    pub fn len(&self) -> usize { self.layers.values().map(IndexMap::len).sum() }

    pub fn is_empty(&self) -> bool { self.layers.is_empty() }

    pub fn in_flight_len(&self) -> usize { self.in_flight.len() }

    /// Takes everything not already being committed, for one layer or all of
    /// them, and marks it in flight.
    pub fn snapshot(&mut self, layer: Option<&str>) -> Vec<LayerSnapshot> {
        let mut out = Vec::new();
        for (name, edits) in &self.layers {
            if layer.map_or(false, |l| l != name) {
                continue;
            }
            let entries: Vec<(FeatureId, PendingEdit)> = edits
                .iter()
                .filter(|(id, _)| !self.in_flight.contains_key(&(name.clone(), (*id).clone())))
                .map(|(id, e)| (id.clone(), *e))
                .collect();
            if !entries.is_empty() {
                out.push(LayerSnapshot { layer: name.clone(), entries });
            }
        }
        for snap in &out {
            for (id, e) in &snap.entries {
                self.in_flight.insert((snap.layer.clone(), id.clone()), *e);
            }
        }
        out
    }

    /// Settles a successful commit. Entries recorded again since the snapshot
    /// stay pending; an insert that changed in flight becomes an update.
    /// Returns the temporary to permanent id pairs that were applied.
    pub fn acknowledge(&mut self, snap: &LayerSnapshot, receipt: &CommitReceipt) -> Vec<(FeatureId, FeatureId)> {
        for (id, sent) in &snap.entries {
            self.in_flight.remove(&(snap.layer.clone(), id.clone()));
            let Some(edits) = self.layers.get_mut(&snap.layer) else { continue };
            match edits.get_mut(id) {
                Some(cur) if cur.rev == sent.rev => {
                    edits.shift_remove(id);
                }
                Some(cur) => {
                    if sent.kind == EditKind::Insert && cur.kind == EditKind::Insert {
                        cur.kind = EditKind::Update;
                    }
                }
                None => {}
            }
        }
        let mut remapped = Vec::new();
        for (tmp, perm) in &receipt.assigned_ids {
            if tmp == perm || !snap.ids(EditKind::Insert).any(|id| id == tmp) {
                continue;
            }
            if let Some(edits) = self.layers.get_mut(&snap.layer) {
                if let Some(idx) = edits.get_index_of(tmp) {
                    if let Some((_, e)) = edits.shift_remove_index(idx) {
                        let (new_idx, _) = edits.insert_full(perm.clone(), e);
                        edits.move_index(new_idx, idx.min(edits.len() - 1));
                    }
                }
            }
            remapped.push((tmp.clone(), perm.clone()));
        }
        if self.layers.get(&snap.layer).map_or(false, IndexMap::is_empty) {
            self.layers.shift_remove(&snap.layer);
        }
        remapped
    }

    /// Settles a failed commit. Entries stay pending for the next save,
    /// except deletes of inserts the backend never stored.
    pub fn fail(&mut self, snap: &LayerSnapshot) {
        for (id, sent) in &snap.entries {
            self.in_flight.remove(&(snap.layer.clone(), id.clone()));
            if sent.kind != EditKind::Insert {
                continue;
            }
            if let Some(edits) = self.layers.get_mut(&snap.layer) {
                if edits.get(id).map_or(false, |e| e.kind == EditKind::Delete) {
                    edits.shift_remove(id);
                }
            }
        }
        if self.layers.get(&snap.layer).map_or(false, IndexMap::is_empty) {
            self.layers.shift_remove(&snap.layer);
        }
    }
}
