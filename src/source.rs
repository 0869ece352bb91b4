use indexmap::IndexMap;

use crate::model::{Extent, Feature, FeatureId};

/// Working feature set of one layer, in insertion order.
#[derive(Clone, Debug, Default)]
pub struct VectorSource {
    features: IndexMap<FeatureId, Feature>,
}

impl VectorSource {
    pub fn new() -> Self { Self::default() }

    /// Adds or replaces by id. Returns whether the source was empty before.
    pub fn add(&mut self, f: Feature) -> bool {
        let was_empty = self.features.is_empty();
        self.features.insert(f.id.clone(), f);
        was_empty
    }

    pub fn remove(&mut self, id: &FeatureId) -> Option<Feature> { self.features.shift_remove(id) }

    pub fn get(&self, id: &FeatureId) -> Option<&Feature> { self.features.get(id) }

    pub fn get_mut(&mut self, id: &FeatureId) -> Option<&mut Feature> { self.features.get_mut(id) }

    pub fn contains(&self, id: &FeatureId) -> bool { self.features.contains_key(id) }

    pub fn features(&self) -> impl Iterator<Item = &Feature> { self.features.values() }

    pub fn first(&self) -> Option<&Feature> { self.features.values().next() }

    pub fn len(&self) -> usize { self.features.len() }

    pub fn is_empty(&self) -> bool { self.features.is_empty() }

    pub fn clear(&mut self) { self.features.clear(); }

    pub fn features_in_extent(&self, extent: &Extent) -> Vec<Feature> {
        self.features
            .values()
            .filter(|f| f.geometry.as_ref().and_then(|g| g.extent()).map_or(false, |e| e.intersects(extent)))
            .cloned()
            .collect()
    }

    /// Moves a feature to a new id in place, keeping its position.
    pub fn rename(&mut self, from: &FeatureId, to: FeatureId) -> bool {
        let Some(idx) = self.features.get_index_of(from) else { return false };
        let Some((_, mut f)) = self.features.shift_remove_index(idx) else { return false };
        f.id = to.clone();
        let (new_idx, _) = self.features.insert_full(to, f);
        self.features.move_index(new_idx, idx.min(self.features.len() - 1));
        true
    }
}
