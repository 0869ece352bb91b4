// Segment-segment intersection in map coordinates with tolerances.
// Classifies proper crossings, endpoint touches, and collinear overlaps.

use super::tolerance::near_zero;
use crate::model::Coord;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SegIntersection {
    None,
    // Interior crossing (not at endpoints within tolerance)
    Proper { t: f64, u: f64, at: Coord },
    // Touch at an endpoint of either segment
    Touch { t: f64, u: f64, at: Coord },
    // Collinear overlapping span: parameter ranges on each segment (inclusive, ordered)
    CollinearOverlap { t0: f64, t1: f64, u0: f64, u1: f64 },
}

impl SegIntersection {
    #[inline]
    pub fn is_none(&self) -> bool { matches!(self, SegIntersection::None) }
}

#[inline]
fn orient(a: Coord, b: Coord, c: Coord) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

#[inline]
fn clamp01(x: f64) -> f64 { if x < 0.0 { 0.0 } else if x > 1.0 { 1.0 } else { x } }

// Project AB and CD onto the dominant axis of AB and compute the overlapping parameter ranges.
fn collinear_overlap(a: Coord, b: Coord, c: Coord, d: Coord, eps: f64) -> SegIntersection {
    let dxab = (b.x - a.x).abs();
    let dyab = (b.y - a.y).abs();
    let (pa1, pa2, pc1, pc2) = if dxab >= dyab { (a.x, b.x, c.x, d.x) } else { (a.y, b.y, c.y, d.y) };
    let len_ab = pa2 - pa1;
    if near_zero(len_ab, eps) {
        // AB is a point: touch if it lies within CD's span
        let len_cd = pc2 - pc1;
        let u = if near_zero(len_cd, eps) { 0.0 } else { (pa1 - pc1) / len_cd };
        if u < -eps || u > 1.0 + eps { return SegIntersection::None; }
        return SegIntersection::Touch { t: 0.0, u: clamp01(u), at: a };
    }
    let t_c1 = (pc1 - pa1) / len_ab;
    let t_c2 = (pc2 - pa1) / len_ab;
    let mut lo = t_c1.min(t_c2);
    let mut hi = t_c1.max(t_c2);
    if hi < -eps || lo > 1.0 + eps { return SegIntersection::None; }
    lo = lo.max(0.0);
    hi = hi.min(1.0);
    if hi < lo { return SegIntersection::None; }
    let len_cd = pc2 - pc1;
    let u0 = if near_zero(len_cd, eps) { 0.0 } else { (pa1 + lo * len_ab - pc1) / len_cd };
    let u1 = if near_zero(len_cd, eps) { 0.0 } else { (pa1 + hi * len_ab - pc1) / len_cd };
    let (u0, u1) = if u0 <= u1 { (u0, u1) } else { (u1, u0) };
    SegIntersection::CollinearOverlap { t0: lo, t1: hi, u0, u1 }
}

pub fn intersect_segments(a: Coord, b: Coord, c: Coord, d: Coord, eps_pos: f64, eps_denom: f64) -> SegIntersection {
    let o1 = orient(a, b, c);
    let o2 = orient(a, b, d);
    let o3 = orient(c, d, a);
    let o4 = orient(c, d, b);

    if near_zero(o1, eps_pos) && near_zero(o2, eps_pos) && near_zero(o3, eps_pos) && near_zero(o4, eps_pos) {
        return collinear_overlap(a, b, c, d, eps_pos);
    }

    // Opposite signs (or zero) on both pairs
    let inter1 = (o1 > 0.0 && o2 < 0.0) || (o1 < 0.0 && o2 > 0.0) || near_zero(o1, eps_pos) || near_zero(o2, eps_pos);
    let inter2 = (o3 > 0.0 && o4 < 0.0) || (o3 < 0.0 && o4 > 0.0) || near_zero(o3, eps_pos) || near_zero(o4, eps_pos);
    if !(inter1 && inter2) {
        return SegIntersection::None;
    }

    let r_x = b.x - a.x; let r_y = b.y - a.y;
    let s_x = d.x - c.x; let s_y = d.y - c.y;
    let rxs = r_x * s_y - r_y * s_x;
    let q_p_x = c.x - a.x; let q_p_y = c.y - a.y;

    if near_zero(rxs, eps_denom) {
        // Parallel but not collinear
        return SegIntersection::None;
    }

    let t = (q_p_x * s_y - q_p_y * s_x) / rxs;
    let u = (q_p_x * r_y - q_p_y * r_x) / rxs;
    if t < -eps_pos || t > 1.0 + eps_pos || u < -eps_pos || u > 1.0 + eps_pos {
        return SegIntersection::None;
    }
    let at = Coord::new(a.x + t * r_x, a.y + t * r_y);

    let is_touch = near_zero(t, eps_pos) || near_zero(1.0 - t, eps_pos) || near_zero(u, eps_pos) || near_zero(1.0 - u, eps_pos);
    if is_touch {
        SegIntersection::Touch { t: clamp01(t), u: clamp01(u), at }
    } else {
        SegIntersection::Proper { t, u, at }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EP: f64 = 1e-9;
    const ED: f64 = 1e-12;

    fn c(x: f64, y: f64) -> Coord { Coord::new(x, y) }

    #[test]
    fn proper_cross() {
        let r = intersect_segments(c(0.0, 0.0), c(2.0, 2.0), c(0.0, 2.0), c(2.0, 0.0), EP, ED);
        match r { SegIntersection::Proper { t, u, .. } => { assert!(t > 0.4 && t < 0.6); assert!(u > 0.4 && u < 0.6); }, _ => panic!("expected proper") }
    }

    #[test]
    fn endpoint_touch() {
        let r = intersect_segments(c(0.0, 0.0), c(1.0, 0.0), c(1.0, 0.0), c(1.0, 1.0), EP, ED);
        match r { SegIntersection::Touch { t, u, at } => { assert_eq!(at, c(1.0, 0.0)); assert!((t - 1.0).abs() < 1e-9); assert!(u.abs() < 1e-9); }, _ => panic!("expected touch") }
    }

    #[test]
    fn collinear_overlap_span() {
        let r = intersect_segments(c(0.0, 0.0), c(3.0, 0.0), c(1.0, 0.0), c(2.0, 0.0), EP, ED);
        match r { SegIntersection::CollinearOverlap { t0, t1, .. } => { assert!(t0 >= 0.33 && t1 <= 0.67); }, _ => panic!("expected overlap") }
    }

    #[test]
    fn disjoint_parallel() {
        let r = intersect_segments(c(0.0, 0.0), c(3.0, 0.0), c(0.0, 1.0), c(3.0, 1.0), EP, ED);
        assert!(r.is_none());
    }
}
