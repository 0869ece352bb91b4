// Self-intersection and validity checks for sketches and stored geometry.
//
// Holes are checked for containment in their outer ring by winding number at
// every hole vertex. Overlap between the polygons of a MultiPolygon is not
// checked.

use crate::geometry::intersect::{intersect_segments, SegIntersection};
use crate::geometry::tolerance::{EPS_DENOM, EPS_POS};
use crate::geometry::winding::point_in_ring;
use crate::model::{Coord, Geometry};

#[inline]
pub fn coordinates_equal(a: &Coord, b: &Coord) -> bool { a.x == b.x && a.y == b.y }

fn dedup_consecutive(points: &[Coord]) -> Vec<Coord> {
    let mut out: Vec<Coord> = Vec::with_capacity(points.len());
    for p in points {
        if out.last().map_or(true, |q| !coordinates_equal(q, p)) {
            out.push(*p);
        }
    }
    out
}

// Segments sharing a vertex may only meet at that vertex.
fn adjacent_conflict(hit: SegIntersection) -> bool {
    match hit {
        SegIntersection::CollinearOverlap { t0, t1, .. } => t1 - t0 > EPS_POS,
        _ => false,
    }
}

/// Whether any two non-adjacent segments of `points` meet, or two adjacent
/// ones overlap. A line whose first point equals its last is treated as a
/// closed ring, so its first and last segments count as adjacent.
/// Repeated consecutive points are ignored.
///
/// With `check_last_only` only the final segment is tested against the rest.
pub fn is_self_intersecting(points: &[Coord], check_last_only: bool) -> bool {
    let pts = dedup_consecutive(points);
    if pts.len() < 3 {
        return false;
    }
    let m = pts.len() - 1; // segment count
    let closed = pts.len() > 3 && coordinates_equal(&pts[0], &pts[m]);
    let adjacent = |i: usize, j: usize| j == i + 1 || (closed && i == 0 && j == m - 1);
    let first_j = if check_last_only { m - 1 } else { 1 };
    for j in first_j..m {
        for i in 0..j {
            let hit = intersect_segments(pts[i], pts[i + 1], pts[j], pts[j + 1], EPS_POS, EPS_DENOM);
            if hit.is_none() {
                continue;
            }
            if adjacent(i, j) {
                if adjacent_conflict(hit) {
                    return true;
                }
            } else {
                return true;
            }
        }
    }
    false
}

fn ring_valid(ring: &[Coord]) -> bool {
    !is_self_intersecting(ring, false)
}

fn polygon_valid(rings: &[Vec<Coord>]) -> bool {
    let Some((outer, holes)) = rings.split_first() else { return true };
    if !ring_valid(outer) {
        return false;
    }
    holes.iter().all(|h| ring_valid(h) && h.iter().all(|p| point_in_ring(*p, outer)))
}

/// Validity of a stored or freshly drawn geometry. Points are always valid.
pub fn is_geometry_valid(geometry: &Geometry) -> bool {
    match geometry {
        Geometry::Point(_) | Geometry::MultiPoint(_) => true,
        Geometry::LineString(cs) => !is_self_intersecting(cs, false),
        Geometry::MultiLineString(lines) => lines.iter().all(|l| !is_self_intersecting(l, false)),
        Geometry::Polygon(rings) => polygon_valid(rings),
        Geometry::MultiPolygon(polys) => polys.iter().all(|p| polygon_valid(p)),
    }
}
