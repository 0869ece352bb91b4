// Centralized tolerances for map-coordinate geometry

pub const EPS_POS: f64 = 1e-9;            // orientation / parameter slack (map units)
pub const EPS_DENOM: f64 = 1e-12;         // denominator guard for parallel segments

// Freehand and touch input leave duplicate vertices behind; a sketch is
// simplified with this tolerance when it ends.
pub const SIMPLIFY_TOLERANCE: f64 = 0.00001;

// Decimal places kept when deciding whether a coordinate lies on a line.
pub const ON_LINE_PRECISION: i32 = 10;

// Snap/trace pixel tolerance when the options leave it unset (or 0).
pub const DEFAULT_SNAP_TOLERANCE: f64 = 10.0;

// Pixel distance within which a click finishes a sketch.
pub const CLICK_TOLERANCE: f64 = 6.0;

#[inline] pub fn near_zero(x: f64, eps: f64) -> bool { x.abs() <= eps }
#[inline] pub fn clamp01(x: f64) -> f64 { x.max(0.0).min(1.0) }

/// Round to `decimals` places the way the map library's `toFixed` does.
#[inline]
pub fn to_fixed(x: f64, decimals: i32) -> f64 {
    let f = 10f64.powi(decimals);
    (x * f).round() / f
}
