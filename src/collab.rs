//! Contracts with the host: persistence, related tables, the map view and UI prompts.

use async_trait::async_trait;
use indexmap::IndexMap;

use crate::config::RelatedTableConfig;
use crate::error::{PersistError, RelatedError};
use crate::model::{Coord, Feature, FeatureId, Pixel};

/// One layer's bundle. Empty lists are sent as `None`.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
pub struct Transaction {
    pub insert: Option<Vec<Feature>>,
    pub update: Option<Vec<Feature>>,
    pub delete: Option<Vec<Feature>>,
}

impl Transaction {
    pub fn is_empty(&self) -> bool { self.insert.is_none() && self.update.is_none() && self.delete.is_none() }
}

/// Result of a successful commit. Inserted features may receive permanent ids.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitReceipt {
    /// Temporary id -> id assigned by the backend.
    #[serde(default)]
    pub assigned_ids: IndexMap<FeatureId, FeatureId>,
}

#[async_trait(?Send)]
pub trait Persistence {
    async fn commit(&self, layer: &str, tx: Transaction) -> Result<CommitReceipt, PersistError>;
}

#[async_trait(?Send)]
pub trait RelatedTables {
    fn config(&self, layer: &str) -> Option<Vec<RelatedTableConfig>>;

    async fn child_features(&self, parent_layer: &str, parent: &Feature, child_layer: &str) -> Result<Vec<Feature>, RelatedError>;

    /// Sets the link fields on `child` so it belongs to `parent`.
    fn attach_child(&self, parent_layer: &str, parent: &Feature, child_layer: &str, child: &mut Feature);
}

/// Relations with no children anywhere.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoRelations;

#[async_trait(?Send)]
impl RelatedTables for NoRelations {
    fn config(&self, _layer: &str) -> Option<Vec<RelatedTableConfig>> { None }

    async fn child_features(&self, _: &str, _: &Feature, _: &str) -> Result<Vec<Feature>, RelatedError> { Ok(Vec::new()) }

    fn attach_child(&self, _: &str, _: &Feature, _: &str, _: &mut Feature) {}
}

/// Projection between screen pixels and map coordinates.
pub trait MapView {
    fn coordinate_from_pixel(&self, px: Pixel) -> Coord;
}

/// Axis-aligned view: map = origin + pixel * resolution, with y flipped.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub origin: Coord,
    pub resolution: f64,
}

impl Viewport {
    pub fn identity() -> Self { Viewport { origin: Coord::new(0.0, 0.0), resolution: 1.0 } }

    pub fn pixel_from_coordinate(&self, c: Coord) -> Pixel {
        Pixel::new((c.x - self.origin.x) / self.resolution, (self.origin.y - c.y) / self.resolution)
    }
}

impl MapView for Viewport {
    fn coordinate_from_pixel(&self, px: Pixel) -> Coord {
        Coord::new(self.origin.x + px.x * self.resolution, self.origin.y - px.y * self.resolution)
    }
}

/// Blocking prompts and browser storage.
pub trait EditorUi {
    fn alert(&self, message: &str);
    fn confirm(&self, message: &str) -> bool;
    fn storage_item(&self, _session: bool, _key: &str) -> Option<String> { None }
}

/// Logs alerts and answers every confirmation with `answer`.
#[derive(Clone, Copy, Debug)]
pub struct LogUi {
    pub answer: bool,
}

impl Default for LogUi {
    fn default() -> Self { LogUi { answer: true } }
}

impl EditorUi for LogUi {
    fn alert(&self, message: &str) { log::warn!("alert: {message}"); }
    fn confirm(&self, message: &str) -> bool {
        log::info!("confirm: {message} -> {}", self.answer);
        self.answer
    }
}
