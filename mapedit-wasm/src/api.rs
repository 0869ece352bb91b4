use js_sys::Promise;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

use mapedit::attributes::DialogSave;
use mapedit::draw::{DrawStep, Modifiers, PointerEvent, PointerKind};
use mapedit::events::Tool;
use mapedit::json::{feature_from_value_strict, options_from_value_strict};
use mapedit::model::{Coord, FeatureId, Geometry, Pixel};
use mapedit::EditorSession;

use crate::interop::{dialog_to_js, form_value_from_js, from_js, to_js};
use crate::{bridge, error, Editor, Shared};

type JsValue = wasm_bindgen::JsValue;

#[wasm_bindgen]
pub fn set_panic_hook() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

fn step_name(step: &DrawStep) -> &'static str {
    match step {
        DrawStep::Rejected => "rejected",
        DrawStep::Started => "started",
        DrawStep::VertexAdded => "vertex_added",
        DrawStep::FinishBlocked => "finish_blocked",
        DrawStep::Finished(_) => "finished",
    }
}

fn pointer(x: f64, y: f64, px: f64, py: f64, modifiers: u8, touch: bool) -> Result<PointerEvent, JsValue> {
    for (name, v) in [("x", x), ("y", y), ("px", px), ("py", py)] {
        if !v.is_finite() {
            return Err(error::non_finite(name));
        }
    }
    let mut evt = PointerEvent::new(Coord::new(x, y), Pixel::new(px, py));
    evt.modifiers = Modifiers {
        shift: modifiers & 1 != 0,
        ctrl: modifiers & 2 != 0,
        alt: modifiers & 4 != 0,
        meta: modifiers & 8 != 0,
    };
    if touch {
        evt.pointer = PointerKind::Touch;
    }
    Ok(evt)
}

fn ids_from_js(v: JsValue) -> Result<Vec<FeatureId>, JsValue> {
    let raw: Vec<serde_json::Value> = from_js(v).map_err(|e| error::invalid_param("ids", e))?;
    raw.iter()
        .map(|v| mapedit::json::feature_id_from_value(v).ok_or_else(|| error::invalid_param("ids", "ids are strings or numbers")))
        .collect()
}

impl Editor {
    /// Runs `f` on the session unless an async call holds it.
    fn with<R>(&self, f: impl FnOnce(&mut EditorSession) -> R) -> Result<R, JsValue> {
        let mut guard = self.shared.try_lock().ok_or_else(error::busy)?;
        let r = f(&mut guard);
        self.shared.release(guard);
        Ok(r)
    }

    /// Runs a sync step in turn with other async calls. Autosaves it queued
    /// are sent after the session is released.
    fn staged(&self, f: impl FnOnce(&mut EditorSession) -> JsValue + 'static) -> Promise {
        let shared = self.shared.clone();
        future_to_promise(async move {
            let mut s = shared.lock().await;
            let reply = f(&mut s);
            let pending = s.take_autosaves();
            shared.release(s);
            shared.flush(pending).await;
            Ok(reply)
        })
    }

    /// Cascading deletes keep the session while they look up and commit
    /// children; calls made meanwhile are deferred or answered `busy`.
    fn cascade<F>(&self, f: impl FnOnce(Shared) -> F) -> Promise
    where
        F: std::future::Future<Output = JsValue> + 'static,
    {
        let fut = f(self.shared.clone());
        future_to_promise(async move { Ok(fut.await) })
    }

    /// Commits every pending edit with the session released.
    fn commit_all(&self) -> impl std::future::Future<Output = mapedit::transaction::CommitReport> + 'static {
        let shared = self.shared.clone();
        async move {
            let mut s = shared.lock().await;
            let mut pending = s.take_autosaves();
            pending.push(s.begin_commit(None));
            shared.release(s);
            shared.flush(pending).await
        }
    }
}

#[wasm_bindgen]
impl Editor {
    /// `options` follows the editor option names (`currentLayer`,
    /// `editableLayers`, `layers`, ...). `host` carries the callbacks.
    #[wasm_bindgen(constructor)]
    pub fn new(options: JsValue, host: JsValue) -> Result<Editor, JsValue> {
        let v: serde_json::Value = from_js(options).map_err(|e| error::invalid_param("options", e))?;
        let opts = options_from_value_strict(v).map_err(|e| error::editor(&e.into()))?;
        let collab = bridge::collaborators(&host).ok_or_else(|| error::invalid_param("host", "a commit function is required"))?;
        let session = EditorSession::new(opts, collab).map_err(|e| error::editor(&e))?;
        Ok(Editor::rs_new(session))
    }

    pub fn load_features_res(&self, layer: &str, features: JsValue) -> JsValue {
        let values: Vec<serde_json::Value> = match from_js(features) {
            Ok(v) => v,
            Err(e) => return error::invalid_param("features", e),
        };
        let parsed: Result<Vec<_>, _> = values.into_iter().map(feature_from_value_strict).collect();
        let parsed = match parsed {
            Ok(p) => p,
            Err(e) => return error::editor(&e.into()),
        };
        let n = parsed.len();
        match self.with(|s| s.load_features(layer, parsed)) {
            Ok(r) => error::result(r.map(|_| JsValue::from_f64(n as f64))),
            Err(busy) => busy,
        }
    }

    pub fn tick(&self) { self.shared.defer(|s| s.tick()); }

    /// False when the move was not applied: bad coordinates or a busy session.
    pub fn pointer_move(&self, x: f64, y: f64, px: f64, py: f64) -> bool {
        match pointer(x, y, px, py, 0, false) {
            Ok(evt) => self.with(|s| s.pointer_move(&evt)).is_ok(),
            Err(_) => false,
        }
    }

    /// Resolves to `{ok, value: step}`; `modifiers` is a bit set
    /// (1 shift, 2 ctrl, 4 alt, 8 meta).
    pub fn click(&self, x: f64, y: f64, px: f64, py: f64, modifiers: u8, touch: bool) -> Promise {
        let evt = match pointer(x, y, px, py, modifiers, touch) {
            Ok(e) => e,
            Err(e) => return Promise::resolve(&e),
        };
        self.staged(move |s| error::result(s.click(&evt).map(|step| JsValue::from_str(step_name(&step)))))
    }

    pub fn drag(&self, x: f64, y: f64, px: f64, py: f64) -> JsValue {
        let evt = match pointer(x, y, px, py, 0, false) {
            Ok(e) => e,
            Err(e) => return e,
        };
        match self.with(|s| s.drag(&evt)) {
            Ok(step) => error::ok(JsValue::from_str(step_name(&step))),
            Err(busy) => busy,
        }
    }

    pub fn release(&self) -> Promise {
        self.staged(|s| error::result(s.release().map(|step| JsValue::from_str(step_name(&step)))))
    }

    /// Trace start or end at the given position; never vetoes.
    pub fn trace(&self, x: f64, y: f64, px: f64, py: f64) -> bool {
        match pointer(x, y, px, py, 0, false) {
            Ok(evt) => self.with(|s| s.trace(&evt)).unwrap_or(true),
            Err(_) => true,
        }
    }

    pub fn trace_highlight(&self) -> JsValue {
        self.with(|s| to_js(&s.trace_state().highlight).unwrap_or(JsValue::NULL)).unwrap_or(JsValue::NULL)
    }

    /// Always lands: applied now, or once the running call lets go.
    pub fn abort_draw(&self) { self.shared.defer(|s| s.abort_draw()); }

    pub fn start_draw_res(&self) -> JsValue {
        match self.with(|s| s.start_draw()) {
            Ok(r) => error::result(r.map(|_| JsValue::TRUE)),
            Err(busy) => busy,
        }
    }

    pub fn cancel_draw(&self) { self.shared.defer(|s| s.cancel_draw()); }

    pub fn change_shape_res(&self, shape: &str) -> JsValue {
        match self.with(|s| s.change_shape(shape)) {
            Ok(r) => error::result(r.map(|_| JsValue::TRUE)),
            Err(busy) => busy,
        }
    }

    pub fn set_active_layer_res(&self, layer: &str) -> JsValue {
        match self.with(|s| s.set_active_layer(layer)) {
            Ok(r) => error::result(r.map(|_| JsValue::TRUE)),
            Err(busy) => busy,
        }
    }

    pub fn remove_interactions(&self) -> bool { self.with(|s| s.remove_interactions()).unwrap_or(false) }

    pub fn select_res(&self, ids: JsValue) -> JsValue {
        let ids = match ids_from_js(ids) {
            Ok(ids) => ids,
            Err(e) => return e,
        };
        match self.with(|s| {
            s.select(ids);
            s.selection().len()
        }) {
            Ok(n) => error::ok(JsValue::from_f64(n as f64)),
            Err(busy) => busy,
        }
    }

    pub fn preselect_feature(&self, id: &str) {
        let id = FeatureId::from(id);
        self.shared.defer(move |s| s.preselect_feature(id));
    }

    pub fn set_modify_tool_res(&self, name: &str) -> JsValue {
        match self.with(|s| s.set_modify_tool(name)) {
            Ok(r) => error::result(r.map(JsValue::from_bool)),
            Err(busy) => busy,
        }
    }

    pub fn modify_start(&self, id: &str) {
        let id = FeatureId::from(id);
        self.shared.defer(move |s| s.modify_start(&id));
    }

    pub fn modify_end(&self, id: String, geometry: JsValue) -> Promise {
        let g = match from_js::<Geometry>(geometry) {
            Ok(g) => g,
            Err(e) => return Promise::resolve(&error::invalid_param("geometry", e)),
        };
        self.staged(move |s| error::result(s.modify_end(&FeatureId::from(id), g).map(JsValue::from_bool)))
    }

    pub fn toggle_edit(&self, tool: &str, layer: Option<String>) -> Promise {
        let tool = match tool.parse::<Tool>() {
            Ok(t) => t,
            Err(e) => return Promise::resolve(&error::invalid_param("tool", e)),
        };
        if tool == Tool::Save {
            let commit = self.commit_all();
            return future_to_promise(async move { Ok(error::result(commit.await.into_result().map(|_| JsValue::TRUE))) });
        }
        self.cascade(|shared| async move {
            let mut s = shared.lock().await;
            let r = s.toggle_edit(tool, layer.as_deref()).await;
            let pending = s.take_autosaves();
            shared.release(s);
            shared.flush(pending).await;
            error::result(r.map(|_| JsValue::TRUE))
        })
    }

    pub fn change_edit_res(&self, tool: &str, active: bool) -> JsValue {
        let tool = match tool.parse::<Tool>() {
            Ok(t) => t,
            Err(e) => return error::invalid_param("tool", e),
        };
        match self.with(|s| s.change_edit(tool, active)) {
            Ok(()) => error::ok(JsValue::TRUE),
            Err(busy) => busy,
        }
    }

    /// `feature` is null when the custom tool was cancelled.
    pub fn custom_draw_end(&self, feature: JsValue) -> Promise {
        let f = if feature.is_null() || feature.is_undefined() {
            Ok(None)
        } else {
            from_js::<serde_json::Value>(feature)
                .map_err(|e| e.to_string())
                .and_then(|v| feature_from_value_strict(v).map_err(|e| e.to_string()))
                .map(Some)
        };
        let f = match f {
            Ok(f) => f,
            Err(e) => return Promise::resolve(&error::invalid_param("feature", e)),
        };
        self.staged(move |s| error::result(s.custom_draw_end(f).map(|_| JsValue::TRUE)))
    }

    pub fn create_feature(&self, layer: String, geometry: JsValue) -> Promise {
        let g = if geometry.is_null() || geometry.is_undefined() { Ok(None) } else { from_js::<Geometry>(geometry).map(Some) };
        let g = match g {
            Ok(g) => g,
            Err(e) => return Promise::resolve(&error::invalid_param("geometry", e)),
        };
        self.staged(move |s| error::result(s.create_feature(&layer, g).map(|f| to_js(&f).unwrap_or(JsValue::NULL))))
    }

    pub fn delete_feature(&self, layer: String, id: String) -> Promise {
        self.cascade(|shared| async move {
            let mut s = shared.lock().await;
            let r = s.delete_feature(&layer, &FeatureId::from(id)).await;
            shared.release(s);
            error::result(r.map(|_| JsValue::TRUE))
        })
    }

    pub fn delete_selected(&self) -> Promise {
        self.cascade(|shared| async move {
            let mut s = shared.lock().await;
            let r = s.delete_selected().await;
            shared.release(s);
            error::result(r.map(JsValue::from_bool))
        })
    }

    /// Commits every pending edit. Resolves to the number of features sent,
    /// or a `persistence` error naming the failed layers.
    pub fn save(&self) -> Promise {
        let commit = self.commit_all();
        future_to_promise(async move { Ok(error::commit(&commit.await)) })
    }

    pub fn has_pending_edits(&self) -> bool { self.with(|s| s.has_pending_edits()).unwrap_or(true) }

    pub fn features(&self, layer: &str) -> JsValue {
        let r = self.with(|s| {
            s.layers()
                .layer(layer)
                .map(|l| to_js(&l.source.features().collect::<Vec<_>>()).unwrap_or(JsValue::NULL))
        });
        match r {
            Ok(r) => error::result(r),
            Err(busy) => busy,
        }
    }

    pub fn drain_events(&self) -> JsValue {
        self.with(|s| to_js(&s.drain_events()).unwrap_or(JsValue::NULL)).unwrap_or(JsValue::NULL)
    }

    // attribute dialogs

    pub fn edit_attributes(&self) -> bool { self.with(|s| s.edit_attributes()).unwrap_or(false) }

    pub fn edit_attributes_dialog_res(&self, id: &str, layer: Option<String>) -> JsValue {
        match self.with(|s| s.edit_attributes_dialog(&FeatureId::from(id), layer.as_deref())) {
            Ok(r) => error::result(r.map(JsValue::from_bool)),
            Err(busy) => busy,
        }
    }

    pub fn dialog(&self) -> JsValue {
        self.with(|s| s.dialog().map_or(JsValue::NULL, dialog_to_js)).unwrap_or(JsValue::NULL)
    }

    pub fn set_form_value_res(&self, name: &str, value: JsValue) -> JsValue {
        let Some(v) = form_value_from_js(value) else { return error::invalid_param("value", "unsupported widget value") };
        match self.with(|s| s.set_form_value(name, v)) {
            Ok(r) => error::result(r.map(|_| JsValue::TRUE)),
            Err(busy) => busy,
        }
    }

    pub fn set_batch_apply_res(&self, name: &str, checked: bool) -> JsValue {
        match self.with(|s| s.set_batch_apply(name, checked)) {
            Ok(r) => error::result(r.map(|_| JsValue::TRUE)),
            Err(busy) => busy,
        }
    }

    /// Resolves to `{ok, value: count}` or an `invalid_form` error listing
    /// the attributes that failed validation.
    pub fn save_dialog(&self) -> Promise {
        self.staged(|s| match s.save_dialog() {
            Ok(DialogSave::Saved(n)) => error::ok(JsValue::from_f64(n as f64)),
            Ok(DialogSave::Invalid(names)) => {
                let data = to_js(&names).unwrap_or(JsValue::NULL);
                error::err("invalid_form", format!("invalid values for {}", names.join(", ")), Some(data))
            }
            Err(e) => error::editor(&e),
        })
    }

    pub fn close_dialog(&self) { self.shared.defer(|s| s.close_dialog()); }

    pub fn abort_dialog(&self) -> Promise {
        self.cascade(|shared| async move {
            let mut s = shared.lock().await;
            let r = s.abort_dialog().await;
            shared.release(s);
            error::result(r.map(|_| JsValue::TRUE))
        })
    }

    pub fn edit_child_res(&self, child_layer: &str, parent: &str, child: &str) -> JsValue {
        match self.with(|s| s.edit_child(child_layer, &FeatureId::from(parent), &FeatureId::from(child))) {
            Ok(r) => error::result(r.map(JsValue::from_bool)),
            Err(busy) => busy,
        }
    }

    pub fn add_child(&self, parent_layer: String, parent: String, child_layer: String) -> Promise {
        self.staged(move |s| {
            let r = s.add_child(&parent_layer, &FeatureId::from(parent), &child_layer);
            error::result(r.map(|id| JsValue::from_str(id.as_str())))
        })
    }

    pub fn delete_child(&self, child_layer: String, child: String) -> Promise {
        self.cascade(|shared| async move {
            let mut s = shared.lock().await;
            let r = s.delete_child(&child_layer, &FeatureId::from(child)).await;
            shared.release(s);
            error::result(r.map(|_| JsValue::TRUE))
        })
    }
}
