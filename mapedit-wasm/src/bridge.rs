// Host callbacks adapted to the editor's collaborator traits.
//
// The host passes one object; every member is optional except `commit`:
//   commit(layer, tx)                        -> {assignedIds?: {tmp: id}} | Promise of it
//   relatedConfig(layer)                     -> RelatedTableConfig[] | undefined
//   childFeatures(parentLayer, parent, childLayer) -> Feature[] | Promise of it
//   attachChild(parentLayer, parent, childLayer, child) -> Feature
//   coordinateFromPixel([x, y])              -> [x, y]
//   alert(message), confirm(message) -> bool, storageItem(session, key) -> string | null

use std::rc::Rc;

use async_trait::async_trait;
use js_sys::{Array, Function, Promise};
use serde::Deserialize;
use serde_json::{Map, Value};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

use mapedit::collab::{CommitReceipt, EditorUi, MapView, NoRelations, Persistence, RelatedTables, Transaction, Viewport};
use mapedit::config::RelatedTableConfig;
use mapedit::error::{PersistError, RelatedError};
use mapedit::json::{feature_from_value_strict, feature_id_from_value};
use mapedit::model::{Coord, Feature, FeatureId, Pixel};
use mapedit::Collaborators;

use crate::interop::{from_js, get_fn, to_js};

fn js_message(e: &JsValue) -> String {
    e.as_string()
        .or_else(|| js_sys::Reflect::get(e, &JsValue::from_str("message")).ok().and_then(|m| m.as_string()))
        .unwrap_or_else(|| format!("{:?}", e))
}

fn call(f: &Function, args: &[JsValue]) -> Result<JsValue, JsValue> {
    let arr: Array = args.iter().collect();
    f.apply(&JsValue::NULL, &arr)
}

/// Awaits the value whether or not the callback returned a promise.
async fn settle(v: JsValue) -> Result<JsValue, JsValue> { JsFuture::from(Promise::resolve(&v)).await }

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ReceiptJs {
    #[serde(default)]
    assigned_ids: Map<String, Value>,
}

struct JsPersistence {
    commit: Function,
}

#[async_trait(?Send)]
impl Persistence for JsPersistence {
    async fn commit(&self, layer: &str, tx: Transaction) -> Result<CommitReceipt, PersistError> {
        let tx = to_js(&tx).map_err(|e| PersistError::new(e.to_string()))?;
        let ret = call(&self.commit, &[JsValue::from_str(layer), tx]).map_err(|e| PersistError::new(js_message(&e)))?;
        let v = settle(ret).await.map_err(|e| PersistError::new(js_message(&e)))?;
        if v.is_undefined() || v.is_null() {
            return Ok(CommitReceipt::default());
        }
        let r: ReceiptJs = from_js(v).map_err(|e| PersistError::new(e.to_string()))?;
        let mut receipt = CommitReceipt::default();
        for (tmp, perm) in r.assigned_ids {
            if let Some(id) = feature_id_from_value(&perm) {
                receipt.assigned_ids.insert(FeatureId::from(tmp), id);
            }
        }
        Ok(receipt)
    }
}

struct JsRelated {
    config: Option<Function>,
    children: Option<Function>,
    attach: Option<Function>,
}

fn feature_to_js(f: &Feature) -> JsValue { to_js(f).unwrap_or(JsValue::NULL) }

#[async_trait(?Send)]
impl RelatedTables for JsRelated {
    fn config(&self, layer: &str) -> Option<Vec<RelatedTableConfig>> {
        let v = call(self.config.as_ref()?, &[JsValue::from_str(layer)]).ok()?;
        if v.is_undefined() || v.is_null() {
            return None;
        }
        match from_js(v) {
            Ok(cfg) => Some(cfg),
            Err(e) => {
                log::error!("relatedConfig for '{layer}': {e}");
                None
            }
        }
    }

    async fn child_features(&self, parent_layer: &str, parent: &Feature, child_layer: &str) -> Result<Vec<Feature>, RelatedError> {
        let Some(f) = &self.children else { return Ok(Vec::new()) };
        let args = [JsValue::from_str(parent_layer), feature_to_js(parent), JsValue::from_str(child_layer)];
        let ret = call(f, &args).map_err(|e| RelatedError::new(js_message(&e)))?;
        let v = settle(ret).await.map_err(|e| RelatedError::new(js_message(&e)))?;
        let values: Vec<Value> = from_js(v).map_err(|e| RelatedError::new(e.to_string()))?;
        values
            .into_iter()
            .map(|v| feature_from_value_strict(v).map_err(|e| RelatedError::new(e.to_string())))
            .collect()
    }

    fn attach_child(&self, parent_layer: &str, parent: &Feature, child_layer: &str, child: &mut Feature) {
        let Some(f) = &self.attach else { return };
        let args = [JsValue::from_str(parent_layer), feature_to_js(parent), JsValue::from_str(child_layer), feature_to_js(child)];
        let linked = call(f, &args)
            .map_err(|e| js_message(&e))
            .and_then(|v| from_js::<Value>(v).map_err(|e| e.to_string()))
            .and_then(|v| feature_from_value_strict(v).map_err(|e| e.to_string()));
        match linked {
            // the link fields are what matters, the id stays ours
            Ok(linked) => child.properties = linked.properties,
            Err(e) => log::warn!("attachChild failed: {e}"),
        }
    }
}

struct JsView {
    to_coordinate: Function,
}

impl MapView for JsView {
    fn coordinate_from_pixel(&self, px: Pixel) -> Coord {
        let arr: Array = [px.x, px.y].iter().map(|v| JsValue::from_f64(*v)).collect();
        call(&self.to_coordinate, &[arr.into()])
            .ok()
            .and_then(|v| from_js::<[f64; 2]>(v).ok())
            .map(Coord::from)
            .unwrap_or_else(|| Coord::new(px.x, -px.y))
    }
}

struct JsUi {
    alert: Option<Function>,
    confirm: Option<Function>,
    storage: Option<Function>,
}

impl EditorUi for JsUi {
    fn alert(&self, message: &str) {
        match &self.alert {
            Some(f) => {
                let _ = call(f, &[JsValue::from_str(message)]);
            }
            None => log::warn!("{message}"),
        }
    }

    fn confirm(&self, message: &str) -> bool {
        let Some(f) = &self.confirm else { return true };
        call(f, &[JsValue::from_str(message)]).map_or(false, |v| v.is_truthy())
    }

    fn storage_item(&self, session: bool, key: &str) -> Option<String> {
        call(self.storage.as_ref()?, &[JsValue::from_bool(session), JsValue::from_str(key)]).ok()?.as_string()
    }
}

/// Builds the collaborators from the host object. Only `commit` is required.
pub fn collaborators(host: &JsValue) -> Option<Collaborators> {
    let commit = get_fn(host, "commit")?;
    let related: Rc<dyn RelatedTables> = match get_fn(host, "relatedConfig") {
        Some(config) => Rc::new(JsRelated {
            config: Some(config),
            children: get_fn(host, "childFeatures"),
            attach: get_fn(host, "attachChild"),
        }),
        None => Rc::new(NoRelations),
    };
    let view: Rc<dyn MapView> = match get_fn(host, "coordinateFromPixel") {
        Some(to_coordinate) => Rc::new(JsView { to_coordinate }),
        None => Rc::new(Viewport::identity()),
    };
    Some(Collaborators {
        persistence: Rc::new(JsPersistence { commit }),
        related,
        view,
        ui: Rc::new(JsUi { alert: get_fn(host, "alert"), confirm: get_fn(host, "confirm"), storage: get_fn(host, "storageItem") }),
    })
}
