//! Commits pending edits through the persistence collaborator.
//!
//! A commit is split in two. `prepare` runs synchronously: it snapshots the
//! ledger and resolves ids to features. `dispatch` returns a future that
//! owns everything it needs, so new edits can be recorded while it runs.

use std::cell::RefCell;
use std::rc::Rc;

use futures_util::future::{join_all, FutureExt, LocalBoxFuture};

use crate::collab::{CommitReceipt, Persistence, Transaction};
use crate::error::{EditorError, PersistError};
use crate::events::{EditorEvent, EventQueue};
use crate::layers::LayerRegistry;
use crate::ledger::{EditKind, LayerSnapshot, Ledger};
use crate::model::{Feature, FeatureId};

/// Permanent ids assigned by a commit, applied to the sources later.
#[derive(Clone, Debug, PartialEq)]
pub struct IdRemap {
    pub layer: String,
    pub from: FeatureId,
    pub to: FeatureId,
}

#[derive(Clone, Debug, Default)]
pub struct PreparedCommit {
    bundles: Vec<(LayerSnapshot, Transaction)>,
}

impl PreparedCommit {
    pub fn is_empty(&self) -> bool { self.bundles.is_empty() }
    pub fn layers(&self) -> impl Iterator<Item = &str> { self.bundles.iter().map(|(s, _)| s.layer.as_str()) }
    pub fn transaction(&self, layer: &str) -> Option<&Transaction> {
        self.bundles.iter().find(|(s, _)| s.layer == layer).map(|(_, t)| t)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LayerOutcome {
    pub layer: String,
    pub result: Result<usize, PersistError>,
}

/// Per-layer results of one commit. Layers succeed or fail independently.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CommitReport {
    pub outcomes: Vec<LayerOutcome>,
}

impl CommitReport {
    pub fn is_ok(&self) -> bool { self.outcomes.iter().all(|o| o.result.is_ok()) }

    pub fn failed_layers(&self) -> Vec<&str> {
        self.outcomes.iter().filter(|o| o.result.is_err()).map(|o| o.layer.as_str()).collect()
    }

    /// The first failure, if any.
    pub fn into_result(self) -> Result<(), EditorError> {
        match self.outcomes.into_iter().find_map(|o| o.result.err().map(|e| (o.layer, e))) {
            Some((layer, source)) => Err(EditorError::Persistence { layer, source }),
            None => Ok(()),
        }
    }
}

/// Awaits commits one after another so bundles reach the backend in the
/// order their edits were made. Outcomes are merged into one report.
pub async fn settle(pending: Vec<LocalBoxFuture<'static, CommitReport>>) -> CommitReport {
    let mut report = CommitReport::default();
    for commit in pending {
        let r = commit.await;
        for l in r.failed_layers() {
            log::warn!("commit of '{l}' failed, edits stay pending");
        }
        report.outcomes.extend(r.outcomes);
    }
    report
}

fn resolve(registry: &LayerRegistry, snap: &LayerSnapshot) -> Transaction {
    let live = |kind: EditKind| -> Option<Vec<Feature>> {
        let v: Vec<Feature> = snap.ids(kind).filter_map(|id| registry.feature(&snap.layer, id).cloned()).collect();
        (!v.is_empty()).then_some(v)
    };
    // deleted features may already be gone from the source
    let deletes: Vec<Feature> = snap.ids(EditKind::Delete).cloned().map(Feature::placeholder).collect();
    Transaction {
        insert: live(EditKind::Insert),
        update: live(EditKind::Update),
        delete: (!deletes.is_empty()).then_some(deletes),
    }
}

pub struct TransactionTracker {
    ledger: Rc<RefCell<Ledger>>,
    persistence: Rc<dyn Persistence>,
    events: EventQueue,
    remaps: Rc<RefCell<Vec<IdRemap>>>,
    autosave: bool,
}

impl TransactionTracker {
    pub fn new(persistence: Rc<dyn Persistence>, events: EventQueue, autosave: bool) -> Self {
        TransactionTracker {
            ledger: Rc::new(RefCell::new(Ledger::new())),
            persistence,
            events,
            remaps: Rc::new(RefCell::new(Vec::new())),
            autosave,
        }
    }

    pub fn autosave(&self) -> bool { self.autosave }

    pub fn ledger(&self) -> std::cell::Ref<'_, Ledger> { self.ledger.borrow() }

    pub fn has_pending(&self) -> bool { self.ledger.borrow().has_pending() }

    /// Records a change. Returns whether the caller should commit the layer
    /// now, which is the case under autosave unless suppressed.
    pub fn record_change(&self, layer: &str, id: &FeatureId, kind: EditKind, suppress_autosave: bool) -> bool {
        let left = self.ledger.borrow_mut().record(layer, id, kind);
        log::debug!("recorded {kind} of {layer}/{id}, pending {:?}", left);
        self.events.emit(EditorEvent::EditsChange { pending: self.has_pending() });
        self.autosave && !suppress_autosave
    }

    pub fn prepare(&self, registry: &LayerRegistry, layer: Option<&str>) -> PreparedCommit {
        let snaps = self.ledger.borrow_mut().snapshot(layer);
        let bundles = snaps
            .into_iter()
            .map(|s| {
                let tx = resolve(registry, &s);
                (s, tx)
            })
            .collect();
        PreparedCommit { bundles }
    }

    /// Sends every bundle concurrently and settles the ledger per layer.
    pub fn dispatch(&self, prepared: PreparedCommit) -> LocalBoxFuture<'static, CommitReport> {
        let ledger = Rc::clone(&self.ledger);
        let persistence = Rc::clone(&self.persistence);
        let remaps = Rc::clone(&self.remaps);
        let events = self.events.clone();
        async move {
            let sends = prepared.bundles.into_iter().map(|(snap, tx)| {
                let ledger = Rc::clone(&ledger);
                let persistence = Rc::clone(&persistence);
                let remaps = Rc::clone(&remaps);
                async move {
                    let count: usize = [&tx.insert, &tx.update, &tx.delete].iter().filter_map(|l| l.as_ref()).map(Vec::len).sum();
                    let result = if tx.is_empty() {
                        Ok(CommitReceipt::default())
                    } else {
                        log::debug!("committing {} features to '{}'", count, snap.layer);
                        persistence.commit(&snap.layer, tx).await
                    };
                    match result {
                        Ok(receipt) => {
                            let pairs = ledger.borrow_mut().acknowledge(&snap, &receipt);
                            remaps.borrow_mut().extend(pairs.into_iter().map(|(from, to)| IdRemap { layer: snap.layer.clone(), from, to }));
                            LayerOutcome { layer: snap.layer, result: Ok(count) }
                        }
                        Err(e) => {
                            log::warn!("commit of '{}' failed: {}", snap.layer, e);
                            ledger.borrow_mut().fail(&snap);
                            LayerOutcome { layer: snap.layer, result: Err(e) }
                        }
                    }
                }
            });
            let outcomes = join_all(sends).await;
            events.emit(EditorEvent::EditsChange { pending: ledger.borrow().has_pending() });
            CommitReport { outcomes }
        }
        .boxed_local()
    }

    /// Id changes from settled commits not yet applied to the sources.
    pub fn take_remaps(&self) -> Vec<IdRemap> { std::mem::take(&mut *self.remaps.borrow_mut()) }
}
