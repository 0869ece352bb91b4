#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use async_trait::async_trait;
use mapedit::collab::{CommitReceipt, EditorUi, NoRelations, Persistence, RelatedTables, Transaction, Viewport};
use mapedit::config::{EditorOptions, LayerConfig, RelatedTableConfig};
use mapedit::error::{PersistError, RelatedError};
use mapedit::model::{Feature, FeatureId, GeometryType};
use mapedit::{Collaborators, EditorSession};

/// Records every bundle it receives. Layers in `failing` are rejected and
/// inserts get `perm-N` ids when `assign_ids` is set.
#[derive(Default)]
pub struct Backend {
    pub commits: RefCell<Vec<(String, Transaction)>>,
    pub failing: RefCell<HashSet<String>>,
    pub assign_ids: bool,
    next: Cell<u32>,
}

impl Backend {
    pub fn assigning() -> Self { Backend { assign_ids: true, ..Default::default() } }

    pub fn commit_count(&self) -> usize { self.commits.borrow().len() }
}

#[async_trait(?Send)]
impl Persistence for Backend {
    async fn commit(&self, layer: &str, tx: Transaction) -> Result<CommitReceipt, PersistError> {
        self.commits.borrow_mut().push((layer.to_string(), tx.clone()));
        if self.failing.borrow().contains(layer) {
            return Err(PersistError::new(format!("{layer} is read-only")));
        }
        let mut receipt = CommitReceipt::default();
        if self.assign_ids {
            for f in tx.insert.iter().flatten() {
                let n = self.next.get() + 1;
                self.next.set(n);
                receipt.assigned_ids.insert(f.id.clone(), FeatureId::from(format!("perm-{n}")));
            }
        }
        Ok(receipt)
    }
}

/// Child rows keyed by (child layer, parent id).
#[derive(Default)]
pub struct Relations {
    pub configs: HashMap<String, Vec<RelatedTableConfig>>,
    pub children: RefCell<HashMap<(String, FeatureId), Vec<Feature>>>,
    pub lookups: RefCell<Vec<String>>,
}

impl Relations {
    pub fn with(mut self, parent: &str, rel: RelatedTableConfig) -> Self {
        self.configs.entry(parent.to_string()).or_default().push(rel);
        self
    }

    pub fn child(self, child_layer: &str, parent: &str, f: Feature) -> Self {
        self.children.borrow_mut().entry((child_layer.to_string(), FeatureId::from(parent))).or_default().push(f);
        self
    }
}

#[async_trait(?Send)]
impl RelatedTables for Relations {
    fn config(&self, layer: &str) -> Option<Vec<RelatedTableConfig>> { self.configs.get(layer).cloned() }

    async fn child_features(&self, _parent_layer: &str, parent: &Feature, child_layer: &str) -> Result<Vec<Feature>, RelatedError> {
        self.lookups.borrow_mut().push(format!("{child_layer}:{}", parent.id));
        Ok(self.children.borrow().get(&(child_layer.to_string(), parent.id.clone())).cloned().unwrap_or_default())
    }

    fn attach_child(&self, _parent_layer: &str, parent: &Feature, _child_layer: &str, child: &mut Feature) {
        child.set("parent_id", serde_json::Value::String(parent.id.to_string()));
    }
}

/// Answers confirmations and serves storage values; keeps every alert.
#[derive(Default)]
pub struct Ui {
    pub alerts: RefCell<Vec<String>>,
    pub refuse: bool,
    pub storage: HashMap<String, String>,
}

impl EditorUi for Ui {
    fn alert(&self, message: &str) { self.alerts.borrow_mut().push(message.to_string()); }
    fn confirm(&self, _message: &str) -> bool { !self.refuse }
    fn storage_item(&self, _session: bool, key: &str) -> Option<String> { self.storage.get(key).cloned() }
}

pub struct Harness {
    pub session: EditorSession,
    pub backend: Rc<Backend>,
    pub ui: Rc<Ui>,
}

pub fn options(layers: Vec<LayerConfig>) -> EditorOptions {
    EditorOptions {
        current_layer: layers.first().map(|l| l.name.clone()),
        editable_layers: layers.iter().map(|l| l.name.clone()).collect(),
        layers,
        validate_on_draw: true,
        is_active: true,
        ..Default::default()
    }
}

pub fn layer(name: &str, kind: GeometryType) -> LayerConfig { LayerConfig::new(name, Some(kind)) }

pub fn harness_with(opts: EditorOptions, backend: Backend, related: Rc<dyn RelatedTables>) -> Harness {
    let backend = Rc::new(backend);
    let ui = Rc::new(Ui::default());
    let collab = Collaborators {
        persistence: backend.clone(),
        related,
        view: Rc::new(Viewport::identity()),
        ui: ui.clone(),
    };
    let session = EditorSession::new(opts, collab).expect("valid options");
    Harness { session, backend, ui }
}

pub fn harness(opts: EditorOptions) -> Harness { harness_with(opts, Backend::default(), Rc::new(NoRelations)) }
