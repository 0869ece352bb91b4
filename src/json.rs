use std::collections::HashSet;

use serde_json::Value;

use crate::config::EditorOptions;
use crate::error::ConfigError;
use crate::geometry::limits::{coord_in_bounds, MAX_FEATURE_VERTICES};
use crate::model::{Feature, FeatureId};

/// Parses editor options and checks that every layer they reference exists.
pub fn options_from_json_strict(text: &str) -> Result<EditorOptions, ConfigError> {
    let v: Value = serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
    options_from_value_strict(v)
}

pub fn options_from_value_strict(v: Value) -> Result<EditorOptions, ConfigError> {
    let opts: EditorOptions = serde_json::from_value(v).map_err(|e| ConfigError::Parse(e.to_string()))?;
    validate_options(&opts)?;
    Ok(opts)
}

pub fn validate_options(opts: &EditorOptions) -> Result<(), ConfigError> {
    let mut names = HashSet::new();
    for l in &opts.layers {
        if l.name.is_empty() {
            return Err(ConfigError::Invalid { key: "layers", reason: "layer without a name".into() });
        }
        if !names.insert(l.name.as_str()) {
            return Err(ConfigError::DuplicateLayer(l.name.clone()));
        }
        if l.geometry_name.is_empty() {
            return Err(ConfigError::Invalid { key: "geometryName", reason: format!("empty for layer '{}'", l.name) });
        }
    }
    for name in &opts.editable_layers {
        if !names.contains(name.as_str()) {
            return Err(ConfigError::UnknownLayer { key: "editableLayers", layer: name.clone() });
        }
    }
    if let Some(current) = &opts.current_layer {
        if !opts.editable_layers.contains(current) {
            return Err(ConfigError::UnknownLayer { key: "currentLayer", layer: current.clone() });
        }
    }
    for name in opts.snap_layers() {
        if !names.contains(name.as_str()) {
            return Err(ConfigError::UnknownLayer { key: "snapLayers", layer: name });
        }
    }
    for l in &opts.layers {
        for rel in &l.related_layers {
            if !names.contains(rel.layer_name.as_str()) {
                return Err(ConfigError::UnknownLayer { key: "relatedLayers", layer: rel.layer_name.clone() });
            }
        }
    }
    if let Some(t) = opts.snap_tolerance {
        if !t.is_finite() || t < 0.0 {
            return Err(ConfigError::Invalid { key: "snapTolerance", reason: format!("{t} is not a positive number") });
        }
    }
    Ok(())
}

/// Accepts numeric and string ids.
pub fn feature_id_from_value(v: &Value) -> Option<FeatureId> {
    match v {
        Value::String(s) => Some(FeatureId(s.clone())),
        Value::Number(n) => Some(FeatureId(n.to_string())),
        _ => None,
    }
}

/// Decodes a feature handed in by the host, rejecting oversized or out-of-range geometry.
/// Numeric ids are taken as their decimal string.
pub fn feature_from_value_strict(mut v: Value) -> Result<Feature, ConfigError> {
    if let Some(obj) = v.as_object_mut() {
        match obj.get("id").map(feature_id_from_value) {
            Some(Some(id)) => {
                obj.insert("id".into(), Value::String(id.0));
            }
            Some(None) | None => {
                obj.insert("id".into(), Value::String(FeatureId::temporary().0));
            }
        }
    }
    let f: Feature = serde_json::from_value(v).map_err(|e| ConfigError::Parse(e.to_string()))?;
    if let Some(g) = &f.geometry {
        if g.vertex_count() > MAX_FEATURE_VERTICES {
            return Err(ConfigError::Invalid { key: "geometry", reason: "too many vertices".into() });
        }
        if !g.coords().iter().all(coord_in_bounds) {
            return Err(ConfigError::Invalid { key: "geometry", reason: "coordinate out of range".into() });
        }
    }
    Ok(f)
}
