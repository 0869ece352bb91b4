use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::geometry::simplify::douglas_peucker;

/// A map coordinate, serialized as `[x, y]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Coord {
    pub x: f64,
    pub y: f64,
}

impl Coord {
    pub const fn new(x: f64, y: f64) -> Self { Coord { x, y } }
}

impl From<[f64; 2]> for Coord {
    fn from(v: [f64; 2]) -> Self { Coord { x: v[0], y: v[1] } }
}

impl From<Coord> for [f64; 2] {
    fn from(c: Coord) -> Self { [c.x, c.y] }
}

/// Screen position in CSS pixels, y pointing down.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Pixel {
    pub x: f64,
    pub y: f64,
}

impl Pixel {
    pub const fn new(x: f64, y: f64) -> Self { Pixel { x, y } }
    pub fn distance(&self, o: &Pixel) -> f64 { ((self.x - o.x).powi(2) + (self.y - o.y).powi(2)).sqrt() }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Extent {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Extent {
    pub fn from_corners(a: Coord, b: Coord) -> Extent {
        Extent { min_x: a.x.min(b.x), min_y: a.y.min(b.y), max_x: a.x.max(b.x), max_y: a.y.max(b.y) }
    }

    pub fn of_coords<'a>(coords: impl IntoIterator<Item = &'a Coord>) -> Option<Extent> {
        let mut it = coords.into_iter();
        let first = it.next()?;
        let mut e = Extent { min_x: first.x, min_y: first.y, max_x: first.x, max_y: first.y };
        for c in it { e.extend(c); }
        Some(e)
    }

    pub fn extend(&mut self, c: &Coord) {
        self.min_x = self.min_x.min(c.x);
        self.min_y = self.min_y.min(c.y);
        self.max_x = self.max_x.max(c.x);
        self.max_y = self.max_y.max(c.y);
    }

    pub fn intersects(&self, o: &Extent) -> bool {
        self.min_x <= o.max_x && self.max_x >= o.min_x && self.min_y <= o.max_y && self.max_y >= o.min_y
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeometryType {
    Point,
    LineString,
    Polygon,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
}

impl GeometryType {
    /// The collection type a single geometry of this type can be wrapped into.
    pub fn multi(self) -> Option<GeometryType> {
        match self {
            GeometryType::Point => Some(GeometryType::MultiPoint),
            GeometryType::LineString => Some(GeometryType::MultiLineString),
            GeometryType::Polygon => Some(GeometryType::MultiPolygon),
            _ => None,
        }
    }

    /// The type a draw interaction sketches for a layer of this type.
    pub fn single(self) -> GeometryType {
        match self {
            GeometryType::MultiPoint => GeometryType::Point,
            GeometryType::MultiLineString => GeometryType::LineString,
            GeometryType::MultiPolygon => GeometryType::Polygon,
            other => other,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GeometryType::Point => "Point",
            GeometryType::LineString => "LineString",
            GeometryType::Polygon => "Polygon",
            GeometryType::MultiPoint => "MultiPoint",
            GeometryType::MultiLineString => "MultiLineString",
            GeometryType::MultiPolygon => "MultiPolygon",
        }
    }
}

impl fmt::Display for GeometryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for GeometryType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "Point" => GeometryType::Point,
            "LineString" => GeometryType::LineString,
            "Polygon" => GeometryType::Polygon,
            "MultiPoint" => GeometryType::MultiPoint,
            "MultiLineString" => GeometryType::MultiLineString,
            "MultiPolygon" => GeometryType::MultiPolygon,
            other => return Err(format!("unknown geometry type {other}")),
        })
    }
}

/// GeoJSON-shaped geometry: `{"type": "...", "coordinates": ...}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point(Coord),
    LineString(Vec<Coord>),
    Polygon(Vec<Vec<Coord>>),
    MultiPoint(Vec<Coord>),
    MultiLineString(Vec<Vec<Coord>>),
    MultiPolygon(Vec<Vec<Vec<Coord>>>),
}

impl Geometry {
    pub fn kind(&self) -> GeometryType {
        match self {
            Geometry::Point(_) => GeometryType::Point,
            Geometry::LineString(_) => GeometryType::LineString,
            Geometry::Polygon(_) => GeometryType::Polygon,
            Geometry::MultiPoint(_) => GeometryType::MultiPoint,
            Geometry::MultiLineString(_) => GeometryType::MultiLineString,
            Geometry::MultiPolygon(_) => GeometryType::MultiPolygon,
        }
    }

    /// Every coordinate of the geometry, in storage order.
    pub fn coords(&self) -> Vec<Coord> {
        match self {
            Geometry::Point(c) => vec![*c],
            Geometry::LineString(cs) | Geometry::MultiPoint(cs) => cs.clone(),
            Geometry::Polygon(rings) | Geometry::MultiLineString(rings) => rings.iter().flatten().copied().collect(),
            Geometry::MultiPolygon(polys) => polys.iter().flatten().flatten().copied().collect(),
        }
    }

    pub fn vertex_count(&self) -> usize {
        match self {
            Geometry::Point(_) => 1,
            Geometry::LineString(cs) | Geometry::MultiPoint(cs) => cs.len(),
            Geometry::Polygon(rings) | Geometry::MultiLineString(rings) => rings.iter().map(Vec::len).sum(),
            Geometry::MultiPolygon(polys) => polys.iter().flatten().map(Vec::len).sum(),
        }
    }

    pub fn extent(&self) -> Option<Extent> {
        Extent::of_coords(self.coords().iter())
    }

    /// Lines and rings a trace can follow. Points have none.
    pub fn linear_parts(&self) -> Vec<&[Coord]> {
        match self {
            Geometry::Point(_) | Geometry::MultiPoint(_) => Vec::new(),
            Geometry::LineString(cs) => vec![cs.as_slice()],
            Geometry::Polygon(rings) | Geometry::MultiLineString(rings) => rings.iter().map(Vec::as_slice).collect(),
            Geometry::MultiPolygon(polys) => polys.iter().flatten().map(Vec::as_slice).collect(),
        }
    }

    /// Wrap a single geometry into its one-element collection.
    pub fn into_multi(self) -> Result<Geometry, Geometry> {
        match self {
            Geometry::Point(c) => Ok(Geometry::MultiPoint(vec![c])),
            Geometry::LineString(cs) => Ok(Geometry::MultiLineString(vec![cs])),
            Geometry::Polygon(rings) => Ok(Geometry::MultiPolygon(vec![rings])),
            other => Err(other),
        }
    }

    pub fn simplify(&self, tolerance: f64) -> Geometry {
        let dp = |cs: &Vec<Coord>| douglas_peucker(cs, tolerance);
        match self {
            Geometry::Point(c) => Geometry::Point(*c),
            Geometry::MultiPoint(cs) => Geometry::MultiPoint(cs.clone()),
            Geometry::LineString(cs) => Geometry::LineString(dp(cs)),
            Geometry::Polygon(rings) => Geometry::Polygon(rings.iter().map(dp).collect()),
            Geometry::MultiLineString(lines) => Geometry::MultiLineString(lines.iter().map(dp).collect()),
            Geometry::MultiPolygon(polys) => Geometry::MultiPolygon(polys.iter().map(|p| p.iter().map(dp).collect()).collect()),
        }
    }
}

/// Converts a geometry so it fits a layer of type `target`, wrapping single
/// geometries into collections when needed. `None` when no conversion applies.
pub fn conform_geometry(g: Geometry, target: GeometryType) -> Option<Geometry> {
    let kind = g.kind();
    if kind == target {
        return Some(g);
    }
    if kind.multi() == Some(target) {
        return g.into_multi().ok();
    }
    None
}

/// Feature identity: a backend id or a generated temporary UUID.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureId(pub String);

impl FeatureId {
    pub fn temporary() -> FeatureId { FeatureId(uuid::Uuid::new_v4().to_string()) }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl From<&str> for FeatureId {
    fn from(s: &str) -> Self { FeatureId(s.to_string()) }
}

impl From<String> for FeatureId {
    fn from(s: String) -> Self { FeatureId(s) }
}

impl From<i64> for FeatureId {
    fn from(n: i64) -> Self { FeatureId(n.to_string()) }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub id: FeatureId,
    #[serde(rename = "geometryName", default = "default_geometry_name")]
    pub geometry_name: String,
    #[serde(default)]
    pub geometry: Option<Geometry>,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

pub(crate) fn default_geometry_name() -> String { "geom".to_string() }

impl Feature {
    pub fn new(geometry: Option<Geometry>) -> Feature {
        Feature { id: FeatureId::temporary(), geometry_name: default_geometry_name(), geometry, properties: Map::new() }
    }

    /// Stand-in carrying only an id, used for deletes of features already gone from a source.
    pub fn placeholder(id: FeatureId) -> Feature {
        Feature { id, geometry_name: default_geometry_name(), geometry: None, properties: Map::new() }
    }

    pub fn with_id(mut self, id: impl Into<FeatureId>) -> Feature { self.id = id.into(); self }

    pub fn get(&self, name: &str) -> Option<&Value> { self.properties.get(name) }
    pub fn set(&mut self, name: &str, value: Value) { self.properties.insert(name.to_string(), value); }
    pub fn unset(&mut self, name: &str) -> Option<Value> { self.properties.remove(name) }

    pub fn geometry_type(&self) -> Option<GeometryType> { self.geometry.as_ref().map(Geometry::kind) }
}
