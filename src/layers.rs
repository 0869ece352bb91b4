use indexmap::IndexMap;

use crate::config::{AttributeDef, EditorOptions, LayerConfig};
use crate::error::EditorError;
use crate::model::{Feature, FeatureId, GeometryType};
use crate::source::VectorSource;

/// A configured layer together with its working feature set.
#[derive(Clone, Debug)]
pub struct EditLayer {
    pub config: LayerConfig,
    pub source: VectorSource,
    pub editable: bool,
    pub snap: bool,
    pub snap_layers: Vec<String>,
}

impl EditLayer {
    pub fn name(&self) -> &str { &self.config.name }

    pub fn geometry_type(&self) -> Option<GeometryType> { self.config.geometry_type }

    pub fn attributes(&self) -> &[AttributeDef] { &self.config.attributes }

    /// Editable and not a table-only layer.
    pub fn accepts_geometry_edits(&self) -> bool { self.editable && !self.config.is_table }
}

/// All layers the editor knows, keyed by name in configuration order.
#[derive(Clone, Debug, Default)]
pub struct LayerRegistry {
    layers: IndexMap<String, EditLayer>,
}

impl LayerRegistry {
    pub fn from_options(opts: &EditorOptions) -> Self {
        let snap_layers = opts.snap_layers();
        let layers = opts
            .layers
            .iter()
            .map(|cfg| {
                let editable = opts.editable_layers.contains(&cfg.name);
                let layer = EditLayer {
                    config: cfg.clone(),
                    source: VectorSource::new(),
                    editable,
                    snap: opts.snap,
                    snap_layers: snap_layers.clone(),
                };
                if editable && cfg.geometry_type.is_none() {
                    log::debug!("layer '{}' has no geometryType, waiting for the first feature", cfg.name);
                }
                (cfg.name.clone(), layer)
            })
            .collect();
        LayerRegistry { layers }
    }

    pub fn get(&self, name: &str) -> Option<&EditLayer> { self.layers.get(name) }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut EditLayer> { self.layers.get_mut(name) }

    pub fn names(&self) -> impl Iterator<Item = &str> { self.layers.keys().map(String::as_str) }

    pub fn layer(&self, name: &str) -> Result<&EditLayer, EditorError> {
        self.layers.get(name).ok_or_else(|| EditorError::UnknownLayer(name.to_string()))
    }

    pub fn layer_mut(&mut self, name: &str) -> Result<&mut EditLayer, EditorError> {
        self.layers.get_mut(name).ok_or_else(|| EditorError::UnknownLayer(name.to_string()))
    }

    /// A layer the user may edit.
    pub fn editable(&self, name: &str) -> Result<&EditLayer, EditorError> {
        let l = self.layer(name)?;
        if !l.editable {
            return Err(EditorError::NotEditable(name.to_string()));
        }
        Ok(l)
    }

    /// Adds a feature to a layer's source. The first feature fixes the
    /// geometry type of a layer configured without one; returns true then.
    pub fn add_feature(&mut self, layer: &str, feature: Feature) -> Result<bool, EditorError> {
        let l = self.layer_mut(layer)?;
        let inferred = match (l.config.geometry_type, feature.geometry_type()) {
            (None, Some(t)) if l.source.is_empty() => {
                log::debug!("layer '{}' geometry type inferred as {}", layer, t);
                l.config.geometry_type = Some(t);
                true
            }
            _ => false,
        };
        l.source.add(feature);
        Ok(inferred)
    }

    pub fn remove_feature(&mut self, layer: &str, id: &FeatureId) -> Option<Feature> {
        self.layers.get_mut(layer).and_then(|l| l.source.remove(id))
    }

    pub fn feature(&self, layer: &str, id: &FeatureId) -> Option<&Feature> {
        self.layers.get(layer).and_then(|l| l.source.get(id))
    }

    pub fn feature_mut(&mut self, layer: &str, id: &FeatureId) -> Option<&mut Feature> {
        self.layers.get_mut(layer).and_then(|l| l.source.get_mut(id))
    }

    /// Sources a layer snaps and traces against.
    pub fn snap_sources(&self, layer: &str) -> Vec<&VectorSource> {
        let Some(l) = self.layers.get(layer) else { return Vec::new() };
        if !l.snap {
            return Vec::new();
        }
        l.snap_layers.iter().filter_map(|n| self.layers.get(n)).map(|s| &s.source).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Coord, Geometry};

    fn opts() -> EditorOptions {
        EditorOptions {
            editable_layers: vec!["a".into()],
            layers: vec![LayerConfig::new("a", None), LayerConfig::new("b", Some(GeometryType::Point))],
            snap: true,
            ..Default::default()
        }
    }

    #[test]
    fn geometry_type_inferred_once() {
        let mut reg = LayerRegistry::from_options(&opts());
        let line = Feature::new(Some(Geometry::LineString(vec![Coord::new(0., 0.), Coord::new(1., 1.)])));
        assert!(reg.add_feature("a", line).unwrap());
        assert_eq!(reg.get("a").unwrap().geometry_type(), Some(GeometryType::LineString));
        let pt = Feature::new(Some(Geometry::Point(Coord::new(0., 0.))));
        assert!(!reg.add_feature("a", pt).unwrap());
        assert_eq!(reg.get("a").unwrap().geometry_type(), Some(GeometryType::LineString));
    }

    #[test]
    fn non_editable_rejected() {
        let reg = LayerRegistry::from_options(&opts());
        assert_eq!(reg.editable("b").unwrap_err(), EditorError::NotEditable("b".into()));
        assert_eq!(reg.editable("zz").unwrap_err(), EditorError::UnknownLayer("zz".into()));
    }
}
