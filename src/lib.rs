pub mod model;
pub mod config;
pub mod error;
pub mod events;
pub mod collab;
pub mod source;
pub mod layers;
pub mod ledger;
pub mod transaction;
pub mod scheduler;
pub mod draw;
pub mod mode;
pub mod attributes;
pub mod geometry {
    pub mod intersect;
    pub mod limits;
    pub mod math;
    pub mod simplify;
    pub mod tolerance;
    pub mod winding;
}
pub mod algorithms {
    pub mod cascade;
    pub mod defaults;
    pub mod split;
    pub mod topology;
    pub mod trace;
    pub mod validate;
}
pub mod json;

use std::rc::Rc;

use futures_util::future::LocalBoxFuture;

use algorithms::defaults::{default_value, default_values};
use algorithms::split::split_line_at;
use algorithms::topology::is_geometry_valid;
use algorithms::trace::{on_trace, TraceState};
use attributes::{AttributeDialog, AttributeSession, DialogSave, FormValue};
use collab::{EditorUi, MapView, Persistence, RelatedTables};
use config::{EditOperation, EditorOptions};
use draw::{complete_sketch, DrawSession, DrawShape, DrawStep, PointerEvent};
use error::{EditorError, EditorResult};
use events::{EditorEvent, EventQueue, Tool};
use layers::LayerRegistry;
use ledger::{EditKind, Ledger};
use mode::{EditMode, Interactions, ModeController, SubTool};
use model::{conform_geometry, Feature, FeatureId, Geometry, GeometryType};
use scheduler::TaskQueue;
use transaction::{CommitReport, TransactionTracker};

/// The host services an editor session talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub persistence: Rc<dyn Persistence>,
    pub related: Rc<dyn RelatedTables>,
    pub view: Rc<dyn MapView>,
    pub ui: Rc<dyn EditorUi>,
}

/// One editor instance: layers, interactions, the pending-edit ledger and
/// the attribute dialogs. Every operation goes through this value.
pub struct EditorSession {
    pub(crate) options: EditorOptions,
    pub(crate) layers: LayerRegistry,
    pub(crate) current_layer: Option<String>,
    pub(crate) mode: ModeController,
    pub(crate) tracker: TransactionTracker,
    pub(crate) tasks: TaskQueue,
    pub(crate) trace: TraceState,
    pub(crate) events: EventQueue,
    pub(crate) related: Rc<dyn RelatedTables>,
    pub(crate) view: Rc<dyn MapView>,
    pub(crate) ui: Rc<dyn EditorUi>,
    pub(crate) attrs: AttributeSession,
    pub(crate) preselected: Option<FeatureId>,
    pub(crate) auto_created: bool,
    pub(crate) autosaves: Vec<LocalBoxFuture<'static, CommitReport>>,
}

impl EditorSession {
    pub fn new(options: EditorOptions, collab: Collaborators) -> EditorResult<Self> {
        json::validate_options(&options)?;
        let events = EventQueue::new();
        let mut s = EditorSession {
            layers: LayerRegistry::from_options(&options),
            current_layer: options.current_layer.clone(),
            mode: ModeController::new(events.clone()),
            tracker: TransactionTracker::new(collab.persistence, events.clone(), options.auto_save),
            tasks: TaskQueue::new(),
            trace: TraceState::new(),
            events,
            related: collab.related,
            view: collab.view,
            ui: collab.ui,
            attrs: AttributeSession::new(),
            preselected: None,
            auto_created: false,
            autosaves: Vec::new(),
            options,
        };
        if s.options.is_active {
            if let Some(layer) = s.current_layer.clone() {
                s.events.emit(EditorEvent::EnableInteraction);
                s.set_edit_layer(&layer);
            }
        }
        Ok(s)
    }

    // ---- accessors ----

    pub fn options(&self) -> &EditorOptions { &self.options }
    pub fn layers(&self) -> &LayerRegistry { &self.layers }
    pub fn current_layer(&self) -> Option<&str> { self.current_layer.as_deref() }
    pub fn mode(&self) -> EditMode { self.mode.mode() }
    pub fn is_active(&self) -> bool { self.mode.is_active() }
    pub fn is_drawing(&self) -> bool { self.mode.is_draw() }
    pub fn interactions(&self) -> Option<&Interactions> { self.mode.interactions() }
    pub fn selection(&self) -> &[FeatureId] { self.mode.selection() }
    pub fn trace_state(&self) -> &TraceState { &self.trace }
    pub fn dialog(&self) -> Option<&AttributeDialog> { self.attrs.dialog.as_ref() }
    pub fn attribute_session(&self) -> &AttributeSession { &self.attrs }
    pub fn ledger(&self) -> std::cell::Ref<'_, Ledger> { self.tracker.ledger() }
    pub fn has_pending_edits(&self) -> bool { self.tracker.has_pending() }
    pub fn drain_events(&self) -> Vec<EditorEvent> { self.events.drain() }

    pub fn feature(&self, layer: &str, id: &FeatureId) -> Option<&Feature> { self.layers.feature(layer, id) }

    pub fn draw_session(&self) -> Option<&DrawSession> {
        self.mode.interactions().and_then(|i| i.draw.as_ref())
    }

    fn draw_mut(&mut self) -> Option<&mut DrawSession> {
        self.mode.interactions_mut().and_then(|i| i.draw.as_mut())
    }

    fn allows(&self, op: EditOperation) -> bool {
        self.current_layer
            .as_deref()
            .and_then(|l| self.layers.get(l))
            .map_or(false, |l| l.config.allows(op))
    }

    fn current(&self) -> EditorResult<String> {
        self.current_layer.clone().ok_or_else(|| EditorError::UnknownLayer(String::new()))
    }

    // ---- scheduling ----

    /// Next turn of the event loop: runs deferred work and applies ids
    /// assigned by commits that settled in the background.
    pub fn tick(&mut self) {
        for task in self.tasks.take() {
            if let Some(d) = self.draw_mut() {
                d.run_deferred(task);
            }
        }
        self.apply_remaps();
    }

    fn apply_remaps(&mut self) {
        let remaps = self.tracker.take_remaps();
        if remaps.is_empty() {
            return;
        }
        for r in &remaps {
            log::debug!("{}: {} is now {}", r.layer, r.from, r.to);
            if let Some(l) = self.layers.get_mut(&r.layer) {
                l.source.rename(&r.from, r.to.clone());
            }
            if let Some(i) = self.mode.interactions_mut() {
                for id in i.selection.iter_mut().filter(|id| **id == r.from) {
                    *id = r.to.clone();
                }
            }
            if let Some(d) = self.attrs.dialog.as_mut() {
                d.rename_feature(&r.from, &r.to);
            }
            if self.preselected.as_ref() == Some(&r.from) {
                self.preselected = Some(r.to.clone());
            }
        }
    }

    // ---- layers and interactions ----

    /// Hands loaded features to a layer. A layer without a geometry type takes
    /// the type of its first feature; the current layer is rebuilt then.
    pub fn load_features(&mut self, layer: &str, features: Vec<Feature>) -> EditorResult<()> {
        let mut inferred = false;
        for f in features {
            inferred |= self.layers.add_feature(layer, f)?;
        }
        if inferred && self.current_layer.as_deref() == Some(layer) && self.mode.is_active() {
            self.set_edit_layer(layer);
        }
        Ok(())
    }

    /// Makes `layer` the edit layer. Fails for unknown, read-only or
    /// table-only layers.
    pub fn set_active_layer(&mut self, layer: &str) -> EditorResult<()> {
        if !self.layers.editable(layer)?.accepts_geometry_edits() {
            return Err(EditorError::NotEditable(layer.to_string()));
        }
        self.set_edit_layer(layer);
        Ok(())
    }

    fn set_edit_layer(&mut self, layer: &str) {
        self.close_all_dialogs();
        self.current_layer = Some(layer.to_string());
        self.build_interactions(None);
    }

    /// Tears down and recreates every handler for the current layer.
    pub fn build_interactions(&mut self, shape: Option<DrawShape>) {
        let Some(name) = self.current_layer.clone() else { return };
        let Some(layer) = self.layers.get(&name) else { return };
        let draw = layer
            .geometry_type()
            .map(|t| DrawSession::new(t, shape.unwrap_or_default(), self.options.validate_on_draw));
        let mut i = Interactions::new(&name, draw, layer.config.allows(EditOperation::UpdateGeometry));
        i.snap_layers = if layer.snap { layer.snap_layers.clone() } else { Vec::new() };
        i.trace = self.options.trace && layer.snap;
        if let Some(id) = self.preselected.take() {
            if layer.source.contains(&id) {
                i.selection.push(id);
            }
        }
        self.trace.clear();
        self.mode.install(i);
        if !self.mode.selection().is_empty() {
            self.announce_selection();
        }
    }

    /// Removes every handler. Repeating it is harmless.
    pub fn remove_interactions(&mut self) -> bool {
        self.trace.clear();
        self.mode.teardown()
    }

    pub fn set_mode(&mut self, mode: EditMode) { self.mode.set_active(mode); }

    fn announce_selection(&self) {
        let Some(layer) = self.current_layer.as_deref() else { return };
        let features = self.mode.selection().iter().filter_map(|id| self.layers.feature(layer, id).cloned()).collect();
        self.events.emit(EditorEvent::Select { features });
    }

    /// Replaces the selection with features of the current layer.
    pub fn select(&mut self, ids: Vec<FeatureId>) {
        let Some(layer) = self.current_layer.clone() else { return };
        let known: Vec<FeatureId> = ids.into_iter().filter(|id| self.layers.feature(&layer, id).is_some()).collect();
        let Some(i) = self.mode.interactions_mut() else { return };
        if !i.select_active {
            return;
        }
        i.selection = known;
        self.announce_selection();
    }

    pub fn clear_selection(&mut self) {
        let Some(i) = self.mode.interactions_mut() else { return };
        if i.selection.is_empty() {
            return;
        }
        i.selection.clear();
        self.events.emit(EditorEvent::Select { features: Vec::new() });
    }

    pub(crate) fn forget_selected(&mut self, id: &FeatureId) {
        if let Some(i) = self.mode.interactions_mut() {
            i.selection.retain(|s| s != id);
        }
    }

    /// Selected once the interactions are next built.
    pub fn preselect_feature(&mut self, id: FeatureId) { self.preselected = Some(id); }

    // ---- drawing ----

    pub fn start_draw(&mut self) -> EditorResult<()> {
        let layer = self.current()?;
        if self.layers.layer(&layer)?.geometry_type().is_none() {
            let e = EditorError::MissingGeometryType(layer);
            self.ui.alert(&e.to_string());
            return Err(e);
        }
        if !self.mode.is_draw() && self.mode.is_active() {
            self.mode.set_active(EditMode::Draw);
            self.mode.set_draw_latch(true);
            self.events.emit(EditorEvent::ChangeEdit { tool: Tool::Draw, active: true });
        }
        Ok(())
    }

    pub fn cancel_draw(&mut self) {
        self.mode.set_active(EditMode::Default);
        if let Some(d) = self.draw_mut() {
            d.abort();
            d.settle();
        }
        self.trace.clear();
        self.mode.set_draw_latch(false);
        self.events.emit(EditorEvent::ChangeEdit { tool: Tool::Draw, active: false });
    }

    /// `custom` hands the pointer to an external tool; any other shape
    /// rebuilds the interactions with it and starts drawing.
    pub fn change_shape(&mut self, shape: &str) -> EditorResult<()> {
        if shape == "custom" {
            self.mode.set_active(EditMode::Custom);
            return Ok(());
        }
        let parsed: DrawShape = shape
            .parse()
            .map_err(|e: String| EditorError::Config(error::ConfigError::Invalid { key: "shape", reason: e }))?;
        self.build_interactions(Some(parsed));
        self.start_draw()
    }

    pub fn pointer_move(&mut self, evt: &PointerEvent) {
        self.tick();
        if let Some(d) = self.draw_mut() {
            d.pointer_move(evt);
        }
    }

    /// A press on the map. Routed to the sub-tool when one is installed,
    /// otherwise to the draw interaction while drawing. A press taken by the
    /// sub-tool adds nothing to the sketch and reports `Rejected`.
    pub fn click(&mut self, evt: &PointerEvent) -> EditorResult<DrawStep> {
        self.tick();
        if let Some(SubTool::SplitLineByPoint { target }) = self.mode.sub_tool().cloned() {
            self.split_line_by_point(&target, evt)?;
            return Ok(DrawStep::Rejected);
        }
        let active = self.mode.interactions().map_or(false, |i| i.draw_active);
        if !active {
            return Ok(DrawStep::Rejected);
        }
        let tasks = &mut self.tasks;
        let step = match self.mode.interactions_mut().and_then(|i| i.draw.as_mut()) {
            Some(d) => d.click(evt, tasks),
            None => DrawStep::Rejected,
        };
        if let DrawStep::Finished(g) = &step {
            self.on_draw_end(g.clone())?;
        }
        Ok(step)
    }

    /// Freehand drag. Vertices bypass the guards, so the finished geometry is
    /// validated once more.
    pub fn drag(&mut self, evt: &PointerEvent) -> DrawStep {
        self.tick();
        if !self.mode.interactions().map_or(false, |i| i.draw_active) {
            return DrawStep::Rejected;
        }
        self.draw_mut().map_or(DrawStep::Rejected, |d| d.drag(evt))
    }

    pub fn release(&mut self) -> EditorResult<DrawStep> {
        self.tick();
        let step = self.draw_mut().map_or(DrawStep::Rejected, |d| d.release());
        if let DrawStep::Finished(g) = &step {
            self.on_draw_end(g.clone())?;
        }
        Ok(step)
    }

    /// The draw interaction gave up on its sketch.
    pub fn abort_draw(&mut self) {
        if let Some(d) = self.draw_mut() {
            d.abort();
            d.settle();
        }
        self.trace.clear();
    }

    /// Trace start or end at `evt`. Never vetoes the trace.
    pub fn trace(&mut self, evt: &PointerEvent) -> bool {
        let Some(layer) = self.current_layer.clone() else { return true };
        if !self.mode.interactions().map_or(false, |i| i.trace) {
            return true;
        }
        let sources = self.layers.snap_sources(&layer);
        on_trace(&mut self.trace, self.view.as_ref(), &sources, evt.pixel, evt.coordinate, self.options.snap_tolerance())
    }

    fn on_draw_end(&mut self, geom: Geometry) -> EditorResult<()> {
        self.trace.clear();
        if let Some(d) = self.draw_mut() {
            d.settle();
        }
        let layer = self.current()?;
        let (target, geometry_name) = {
            let l = self.layers.layer(&layer)?;
            (l.geometry_type(), l.config.geometry_name.clone())
        };
        let g = match complete_sketch(geom, &layer, target, self.options.validate_on_draw) {
            Ok(g) => g,
            Err(e) => {
                if e == EditorError::InvalidGeometry {
                    log::warn!("drawn geometry rejected: {e}");
                } else {
                    log::error!("drawn geometry rejected: {e}");
                }
                self.ui.alert(&e.to_string());
                return Err(e);
            }
        };
        let mut f = Feature::new(Some(g));
        f.geometry_name = geometry_name;
        self.add_feature(f)?;
        Ok(())
    }

    /// A custom drawing tool finished. `None` means it was cancelled.
    pub fn custom_draw_end(&mut self, feature: Option<Feature>) -> EditorResult<()> {
        let Some(mut f) = feature else {
            self.mode.set_active(EditMode::Default);
            return Ok(());
        };
        let layer = self.current()?;
        let (target, geometry_name) = {
            let l = self.layers.layer(&layer)?;
            (l.geometry_type(), l.config.geometry_name.clone())
        };
        let conformed = match (f.geometry.take(), target) {
            (Some(g), Some(t)) => {
                let got = g.kind();
                conform_geometry(g, t).ok_or(EditorError::GeometryTypeMismatch { layer: layer.clone(), expected: t, got })
            }
            (_, None) => Err(EditorError::MissingGeometryType(layer.clone())),
            (None, Some(_)) => Err(EditorError::InvalidGeometry),
        };
        let result = match conformed {
            Ok(g) => {
                f.geometry = Some(g);
                f.geometry_name = geometry_name;
                self.add_feature(f).map(|_| ())
            }
            Err(e) => {
                self.ui.alert(&e.to_string());
                Err(e)
            }
        };
        self.mode.set_active(EditMode::Default);
        result
    }

    /// Adds a new feature to `layer` with default values and a temporary id
    /// and records the insert. The id changes once a commit assigns one.
    pub(crate) fn add_feature_to_layer(&mut self, mut feature: Feature, layer: &str) -> EditorResult<FeatureId> {
        let defaults = default_values(self.layers.layer(layer)?.attributes(), self.ui.as_ref());
        feature.properties.extend(defaults);
        feature.id = FeatureId::temporary();
        let id = feature.id.clone();
        let inferred = self.layers.add_feature(layer, feature)?;
        if inferred && self.current_layer.as_deref() == Some(layer) {
            self.set_edit_layer(layer);
        }
        self.record_change(layer, &id, EditKind::Insert, false);
        Ok(id)
    }

    fn add_feature(&mut self, feature: Feature) -> EditorResult<FeatureId> {
        let layer = self.current()?;
        let id = self.add_feature_to_layer(feature, &layer)?;
        self.mode.set_active(EditMode::Default);
        self.events.emit(EditorEvent::ChangeEdit { tool: Tool::Draw, active: false });
        if self.options.auto_form {
            self.auto_created = true;
            self.open_dialog(&layer, vec![id.clone()]);
        }
        Ok(id)
    }

    // ---- modify ----

    pub fn modify_start(&mut self, id: &FeatureId) {
        let Some(layer) = self.current_layer.clone() else { return };
        let Some(g) = self.layers.feature(&layer, id).and_then(|f| f.geometry.clone()) else { return };
        if let Some(d) = self.draw_mut() {
            d.modify_start(&g);
        }
    }

    /// Stores the modified geometry unless it is invalid, in which case the
    /// feature keeps the geometry it had. Returns whether the modification
    /// was kept.
    pub fn modify_end(&mut self, id: &FeatureId, geometry: Geometry) -> EditorResult<bool> {
        let layer = self.current()?;
        if self.layers.feature(&layer, id).is_none() {
            return Err(EditorError::FeatureNotFound { layer, id: id.clone() });
        }
        let validate = self.options.validate_on_draw;
        let mut g = geometry;
        let kept = match self.draw_mut() {
            Some(d) => d.modify_end(&mut g),
            None => !validate || is_geometry_valid(&g),
        };
        if !kept {
            log::warn!("{layer}/{id}: modified geometry is invalid, rolled back");
            return Ok(false);
        }
        if let Some(f) = self.layers.feature_mut(&layer, id) {
            f.geometry = Some(g);
        }
        self.record_change(&layer, id, EditKind::Update, false);
        Ok(true)
    }

    /// Installs a modify tool. Only `split-line-by-point` exists; it needs
    /// exactly the feature to split selected.
    pub fn set_modify_tool(&mut self, name: &str) -> EditorResult<bool> {
        if name != "split-line-by-point" {
            log::debug!("unknown modify tool '{name}'");
            return Ok(false);
        }
        let target = self.mode.selection().first().cloned().ok_or(EditorError::NoSelection)?;
        self.mode.install_sub_tool(SubTool::SplitLineByPoint { target });
        Ok(true)
    }

    fn split_line_by_point(&mut self, target: &FeatureId, evt: &PointerEvent) -> EditorResult<()> {
        let layer = self.current()?;
        self.clear_selection();
        let original = self
            .layers
            .feature(&layer, target)
            .cloned()
            .ok_or_else(|| EditorError::FeatureNotFound { layer: layer.clone(), id: target.clone() })?;
        let parts = match &original.geometry {
            Some(Geometry::LineString(cs)) => split_line_at(cs, evt.coordinate),
            _ => None,
        };
        if let Some((head, tail)) = parts {
            if let Some(f) = self.layers.feature_mut(&layer, target) {
                f.geometry = Some(Geometry::LineString(head));
            }
            self.record_change(&layer, target, EditKind::Update, false);
            let mut rest = original;
            rest.id = FeatureId::temporary();
            rest.geometry = Some(Geometry::LineString(tail));
            let rest_id = rest.id.clone();
            self.layers.add_feature(&layer, rest)?;
            self.record_change(&layer, &rest_id, EditKind::Insert, false);
        }
        self.mode.set_active(EditMode::Default);
        Ok(())
    }

    // ---- public feature API ----

    /// Creates a feature in an editable layer. A given geometry must already
    /// have the layer's type.
    pub fn create_feature(&mut self, layer: &str, geometry: Option<Geometry>) -> EditorResult<Feature> {
        let l = self.layers.editable(layer)?;
        let mut f = Feature::new(None);
        f.geometry_name = l.config.geometry_name.clone();
        if let Some(g) = geometry {
            if let Some(expected) = l.geometry_type() {
                if g.kind() != expected {
                    return Err(EditorError::GeometryTypeMismatch { layer: layer.to_string(), expected, got: g.kind() });
                }
            }
            f.geometry = Some(g);
        }
        let id = self.add_feature_to_layer(f, layer)?;
        if self.options.auto_form {
            self.auto_created = true;
            self.edit_attributes_dialog(&id, Some(layer))?;
        }
        self.layers
            .feature(layer, &id)
            .cloned()
            .ok_or_else(|| EditorError::FeatureNotFound { layer: layer.to_string(), id })
    }

    /// Deletes a feature and, per the relation config, its children. Fails
    /// with a persistence error when an autosaved delete is refused; the
    /// refused delete stays pending and its parents stay in place.
    pub async fn delete_feature(&mut self, layer: &str, id: &FeatureId) -> EditorResult<()> {
        let f = self
            .layers
            .feature(layer, id)
            .cloned()
            .ok_or_else(|| EditorError::FeatureNotFound { layer: layer.to_string(), id: id.clone() })?;
        algorithms::cascade::delete_feature(self, layer, f, false, 0).await
    }

    /// Deletes the single selected feature after confirmation.
    pub async fn delete_selected(&mut self) -> EditorResult<bool> {
        let [id] = self.mode.selection() else { return Ok(false) };
        let id = id.clone();
        if !self.ui.confirm("Are you sure you want to delete this feature?") {
            return Ok(false);
        }
        let layer = self.current()?;
        self.delete_feature(&layer, &id).await?;
        self.clear_selection();
        Ok(true)
    }

    // ---- toolbar ----

    pub async fn toggle_edit(&mut self, tool: Tool, layer: Option<&str>) -> EditorResult<()> {
        match tool {
            Tool::Draw if self.allows(EditOperation::Create) => {
                if self.mode.is_draw() {
                    self.cancel_draw();
                    Ok(())
                } else {
                    self.build_interactions(None);
                    self.start_draw()
                }
            }
            Tool::Attribute if self.allows(EditOperation::UpdateAttributes) => {
                self.edit_attributes();
                Ok(())
            }
            Tool::Delete if self.allows(EditOperation::Delete) => self.delete_selected().await.map(|_| ()),
            Tool::Edit => {
                let name = match layer {
                    Some(l) => l.to_string(),
                    None => self.current()?,
                };
                self.layers.layer(&name)?;
                self.set_edit_layer(&name);
                Ok(())
            }
            Tool::Cancel => {
                self.remove_interactions();
                Ok(())
            }
            Tool::Save => self.save().await.into_result(),
            other => {
                log::debug!("tool {:?} not allowed on this layer", other);
                Ok(())
            }
        }
    }

    /// Another tool became active: drawing stops.
    pub fn change_edit(&mut self, tool: Tool, active: bool) {
        if tool != Tool::Draw && active {
            self.cancel_draw();
        }
    }

    // ---- persistence ----

    /// Records a change. Under autosave the layer's commit is prepared right
    /// away and queued; it goes out when the queue is settled.
    pub(crate) fn record_change(&mut self, layer: &str, id: &FeatureId, kind: EditKind, suppress_autosave: bool) {
        if self.tracker.record_change(layer, id, kind, suppress_autosave) {
            let commit = self.begin_commit(Some(layer));
            self.autosaves.push(commit);
        }
    }

    /// Autosave commits queued since the last call. They hold no borrow of
    /// the session, so a host can await them after letting go of it and
    /// apply the assigned ids with `tick`.
    pub fn take_autosaves(&mut self) -> Vec<LocalBoxFuture<'static, CommitReport>> { std::mem::take(&mut self.autosaves) }

    pub fn has_queued_autosaves(&self) -> bool { !self.autosaves.is_empty() }

    /// Sends the queued autosave commits in order and applies assigned ids.
    pub async fn settle_autosaves(&mut self) -> CommitReport {
        let report = transaction::settle(self.take_autosaves()).await;
        self.apply_remaps();
        report
    }

    /// Commits pending edits of one layer, or of all layers, after any
    /// queued autosaves.
    pub async fn commit(&mut self, layer: Option<&str>) -> CommitReport {
        let mut pending = self.take_autosaves();
        pending.push(self.begin_commit(layer));
        let report = transaction::settle(pending).await;
        self.apply_remaps();
        report
    }

    /// Starts a commit without holding on to the session. Assigned ids are
    /// applied at the next `tick`.
    pub fn begin_commit(&mut self, layer: Option<&str>) -> LocalBoxFuture<'static, CommitReport> {
        let prepared = self.tracker.prepare(&self.layers, layer);
        self.tracker.dispatch(prepared)
    }

    pub async fn save(&mut self) -> CommitReport { self.commit(None).await }

    // ---- attribute dialogs ----

    fn open_dialog(&mut self, layer: &str, ids: Vec<FeatureId>) -> bool {
        let auto_created = std::mem::take(&mut self.auto_created);
        let Some(l) = self.layers.get(layer) else { return false };
        let features: Vec<&Feature> = ids.iter().filter_map(|id| l.source.get(id)).collect();
        if features.is_empty() || (features.len() > 1 && !attributes::is_batch(features.len(), l.attributes())) {
            return false;
        }
        let related = self.related.config(layer);
        let ui = self.ui.as_ref();
        let Some(mut d) = AttributeDialog::build(&l.config, related.as_deref(), &features, ui, |a| default_value(a, ui)) else {
            return false;
        };
        d.auto_created = auto_created;
        d.requires_save = self.tracker.ledger().has_feature(EditKind::Insert, layer, &d.features[0]);
        self.events.emit(EditorEvent::ChangeEdit { tool: Tool::Attribute, active: true });
        self.attrs.dialog = Some(d);
        true
    }

    /// Opens the attribute dialog for the selection.
    pub fn edit_attributes(&mut self) -> bool {
        let Some(layer) = self.current_layer.clone() else { return false };
        let ids = self.mode.selection().to_vec();
        self.open_dialog(&layer, ids)
    }

    /// Opens the attribute dialog for one feature, closing any open dialogs.
    pub fn edit_attributes_dialog(&mut self, id: &FeatureId, layer: Option<&str>) -> EditorResult<bool> {
        let layer = match layer {
            Some(l) => l.to_string(),
            None => self.current()?,
        };
        if self.layers.layer(&layer)?.source.get(id).is_none() {
            return Err(EditorError::FeatureNotFound { layer, id: id.clone() });
        }
        let auto_created = self.auto_created;
        self.close_all_dialogs();
        self.auto_created = auto_created;
        Ok(self.open_dialog(&layer, vec![id.clone()]))
    }

    pub fn set_form_value(&mut self, name: &str, value: FormValue) -> EditorResult<()> {
        self.attrs.dialog.as_mut().ok_or(EditorError::NoDialog)?.set_value(name, value)
    }

    pub fn set_batch_apply(&mut self, name: &str, checked: bool) -> EditorResult<()> {
        self.attrs.dialog.as_mut().ok_or(EditorError::NoDialog)?.set_apply(name, checked)
    }

    /// Validates the open dialog and writes its values to every feature it
    /// edits: one update each, then a single queued commit under autosave.
    pub fn save_dialog(&mut self) -> EditorResult<DialogSave> {
        let d = self.attrs.dialog.clone().ok_or(EditorError::NoDialog)?;
        let values = match d.collect() {
            Ok(v) => v,
            Err(invalid) => return Ok(DialogSave::Invalid(invalid)),
        };
        let mut saved = 0;
        for id in &d.features {
            let Some(f) = self.layers.feature_mut(&d.layer, id) else { continue };
            for (k, v) in &values {
                f.set(k, v.clone());
            }
            self.record_change(&d.layer, id, EditKind::Update, true);
            saved += 1;
        }
        if self.tracker.autosave() && saved > 0 {
            let commit = self.begin_commit(Some(&d.layer));
            self.autosaves.push(commit);
        }
        self.close_dialog();
        Ok(DialogSave::Saved(saved))
    }

    /// Closes the open dialog; a parent dialog comes back if there was one.
    pub fn close_dialog(&mut self) {
        if let Some(crumb) = self.attrs.close() {
            log::debug!("back to dialog of '{}'", crumb.layer);
        }
    }

    /// Abort button: an auto-created feature is deleted again.
    pub async fn abort_dialog(&mut self) -> EditorResult<()> {
        let d = self.attrs.dialog.clone().ok_or(EditorError::NoDialog)?;
        self.close_dialog();
        if d.auto_created {
            for id in &d.features {
                if self.layers.feature(&d.layer, id).is_some() {
                    self.delete_feature(&d.layer, id).await?;
                }
            }
            self.clear_selection();
        }
        Ok(())
    }

    pub fn close_all_dialogs(&mut self) {
        self.auto_created = false;
        self.attrs.close_all();
    }

    /// Opens a child's dialog on top of the current one.
    pub fn edit_child(&mut self, child_layer: &str, parent: &FeatureId, child: &FeatureId) -> EditorResult<bool> {
        if self.layers.layer(child_layer)?.source.get(child).is_none() {
            return Err(EditorError::FeatureNotFound { layer: child_layer.to_string(), id: child.clone() });
        }
        self.attrs.push_child(parent.clone());
        if self.open_dialog(child_layer, vec![child.clone()]) {
            return Ok(true);
        }
        // nothing replaced the parent dialog, bring it back
        self.attrs.close();
        Ok(false)
    }

    /// Creates a child row linked to `parent`.
    pub fn add_child(&mut self, parent_layer: &str, parent: &FeatureId, child_layer: &str) -> EditorResult<FeatureId> {
        let p = self
            .layers
            .feature(parent_layer, parent)
            .cloned()
            .ok_or_else(|| EditorError::FeatureNotFound { layer: parent_layer.to_string(), id: parent.clone() })?;
        let mut child = Feature::new(None);
        child.geometry_name = self.layers.layer(child_layer)?.config.geometry_name.clone();
        self.related.attach_child(parent_layer, &p, child_layer, &mut child);
        let id = self.add_feature_to_layer(child, child_layer)?;
        if self.options.auto_form {
            self.edit_child(child_layer, parent, &id)?;
        }
        Ok(id)
    }

    pub async fn delete_child(&mut self, child_layer: &str, child: &FeatureId) -> EditorResult<()> {
        self.delete_feature(child_layer, child).await
    }

    /// Geometry type a drawn feature would get on the current layer.
    pub fn current_geometry_type(&self) -> Option<GeometryType> {
        self.current_layer.as_deref().and_then(|l| self.layers.get(l)).and_then(|l| l.geometry_type())
    }
}
