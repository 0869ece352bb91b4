// Ingestion limits guarding the editor against hostile configuration and geometry

// Sketch and feature size caps
pub const MAX_SKETCH_VERTICES: usize = 100_000;
pub const MAX_FEATURE_VERTICES: usize = 2_000_000;

// Related tables may be configured in a cycle; recursion stops here.
pub const MAX_CASCADE_DEPTH: usize = 32;

// Numeric bounds
pub const COORD_MIN: f64 = -1.0e12;
pub const COORD_MAX: f64 = 1.0e12;

#[inline]
pub fn in_coord_bounds(x: f64) -> bool { x.is_finite() && x >= COORD_MIN && x <= COORD_MAX }

#[inline]
pub fn coord_in_bounds(c: &crate::model::Coord) -> bool { in_coord_bounds(c.x) && in_coord_bounds(c.y) }
