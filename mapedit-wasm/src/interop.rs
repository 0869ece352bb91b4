use js_sys::{Array, Function, Object, Reflect};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use wasm_bindgen::prelude::*;

use mapedit::attributes::{AttributeDialog, FormValue};

pub fn new_obj() -> Object { Object::new() }

pub fn set_kv(obj: &Object, key: &str, val: &JsValue) {
    let _ = Reflect::set(obj, &JsValue::from_str(key), val);
}

pub fn get_fn(obj: &JsValue, key: &str) -> Option<Function> {
    Reflect::get(obj, &JsValue::from_str(key)).ok().and_then(|v| v.dyn_into::<Function>().ok())
}

/// Plain objects rather than `Map`s, so JSON properties read naturally.
pub fn to_js<T: Serialize + ?Sized>(v: &T) -> Result<JsValue, serde_wasm_bindgen::Error> {
    v.serialize(&serde_wasm_bindgen::Serializer::json_compatible())
}

pub fn from_js<T: DeserializeOwned>(v: JsValue) -> Result<T, serde_wasm_bindgen::Error> { serde_wasm_bindgen::from_value(v) }

pub fn form_value_to_js(v: &FormValue) -> JsValue {
    match v {
        FormValue::Text(s) => JsValue::from_str(s),
        FormValue::Checked(b) => JsValue::from_bool(*b),
        FormValue::Choices(c) => c.iter().map(|s| JsValue::from_str(s)).collect::<Array>().into(),
        FormValue::Media(m) => to_js(m).unwrap_or(JsValue::NULL),
    }
}

pub fn form_value_from_js(v: JsValue) -> Option<FormValue> {
    if let Some(s) = v.as_string() {
        return Some(FormValue::Text(s));
    }
    if let Some(b) = v.as_bool() {
        return Some(FormValue::Checked(b));
    }
    if Array::is_array(&v) {
        let items = Array::from(&v);
        if items.iter().all(|i| i.is_string()) {
            return Some(FormValue::Choices(items.iter().filter_map(|i| i.as_string()).collect()));
        }
    }
    from_js::<Value>(v).ok().map(FormValue::Media)
}

pub fn dialog_to_js(d: &AttributeDialog) -> JsValue {
    let o = new_obj();
    set_kv(&o, "layer", &JsValue::from_str(&d.layer));
    set_kv(&o, "title", &JsValue::from_str(&d.title));
    set_kv(&o, "batch", &JsValue::from_bool(d.batch));
    set_kv(&o, "autoCreated", &JsValue::from_bool(d.auto_created));
    set_kv(&o, "requiresSave", &JsValue::from_bool(d.requires_save));
    set_kv(&o, "relatedForm", &JsValue::from_bool(d.related_form));
    set_kv(&o, "attachmentsForm", &JsValue::from_bool(d.attachments_form));
    let ids: Array = d.features.iter().map(|id| JsValue::from_str(id.as_str())).collect();
    set_kv(&o, "features", &ids.into());
    let fields: Array = d
        .fields
        .iter()
        .map(|f| {
            let fo = new_obj();
            set_kv(&fo, "name", &JsValue::from_str(&f.name));
            set_kv(&fo, "title", &JsValue::from_str(f.def.title()));
            set_kv(&fo, "type", &to_js(&f.def.kind).unwrap_or(JsValue::NULL));
            set_kv(&fo, "visible", &JsValue::from_bool(f.visible));
            set_kv(&fo, "required", &JsValue::from_bool(f.def.required));
            if let Some(apply) = f.apply {
                set_kv(&fo, "apply", &JsValue::from_bool(apply));
            }
            set_kv(&fo, "value", &form_value_to_js(&f.value));
            JsValue::from(fo)
        })
        .collect();
    set_kv(&o, "fields", &fields.into());
    o.into()
}
