use js_sys::{Array, Object, Reflect};
use mapedit::error::EditorError;
use mapedit::transaction::CommitReport;
use wasm_bindgen::prelude::*;

fn set_kv(obj: &Object, k: &str, v: &JsValue) { let _ = Reflect::set(obj, &JsValue::from_str(k), v); }

fn new_obj() -> Object { Object::new() }

pub fn ok(v: JsValue) -> JsValue {
    let o = new_obj();
    set_kv(&o, "ok", &JsValue::from_bool(true));
    set_kv(&o, "value", &v);
    o.into()
}

pub fn err(code: &'static str, message: impl Into<String>, data: Option<JsValue>) -> JsValue {
    let root = new_obj();
    set_kv(&root, "ok", &JsValue::from_bool(false));
    let e = new_obj();
    set_kv(&e, "code", &JsValue::from_str(code));
    set_kv(&e, "message", &JsValue::from_str(&message.into()));
    if let Some(d) = data { set_kv(&e, "data", &d); }
    set_kv(&root, "error", &e.into());
    root.into()
}

pub fn editor(e: &EditorError) -> JsValue {
    let d = new_obj();
    match e {
        EditorError::UnknownLayer(l) | EditorError::NotEditable(l) | EditorError::MissingGeometryType(l) => {
            set_kv(&d, "layer", &JsValue::from_str(l));
        }
        EditorError::FeatureNotFound { layer, id } => {
            set_kv(&d, "layer", &JsValue::from_str(layer));
            set_kv(&d, "id", &JsValue::from_str(id.as_str()));
        }
        EditorError::GeometryTypeMismatch { layer, expected, got } => {
            set_kv(&d, "layer", &JsValue::from_str(layer));
            set_kv(&d, "expected", &JsValue::from_str(expected.as_str()));
            set_kv(&d, "got", &JsValue::from_str(got.as_str()));
        }
        EditorError::Persistence { layer, .. } => set_kv(&d, "layer", &JsValue::from_str(layer)),
        EditorError::UnknownAttribute(name) => set_kv(&d, "attribute", &JsValue::from_str(name)),
        _ => return err(e.code(), e.to_string(), None),
    }
    err(e.code(), e.to_string(), Some(d.into()))
}

pub fn result(r: Result<JsValue, EditorError>) -> JsValue {
    match r {
        Ok(v) => ok(v),
        Err(e) => editor(&e),
    }
}

/// Failed layers of a commit, or the number of features sent.
pub fn commit(report: &CommitReport) -> JsValue {
    if report.is_ok() {
        let sent: usize = report.outcomes.iter().filter_map(|o| o.result.as_ref().ok()).sum();
        return ok(JsValue::from_f64(sent as f64));
    }
    let layers: Array = report.failed_layers().into_iter().map(JsValue::from_str).collect();
    let d = new_obj();
    set_kv(&d, "layers", &layers.into());
    let message = report
        .outcomes
        .iter()
        .filter_map(|o| o.result.as_ref().err().map(|e| format!("{}: {}", o.layer, e)))
        .collect::<Vec<_>>()
        .join("; ");
    err("persistence", message, Some(d.into()))
}

#[inline]
pub fn busy() -> JsValue { err("busy", "another editor call is still running", None) }

#[inline]
pub fn invalid_param(param: &str, reason: impl std::fmt::Display) -> JsValue {
    let d = new_obj();
    set_kv(&d, "param", &JsValue::from_str(param));
    err("invalid_param", format!("parameter '{}' is invalid: {}", param, reason), Some(d.into()))
}

#[inline]
pub fn non_finite(param: &str) -> JsValue {
    let d = new_obj(); set_kv(&d, "param", &JsValue::from_str(param));
    err("non_finite", format!("parameter '{}' must be finite", param), Some(d.into()))
}
