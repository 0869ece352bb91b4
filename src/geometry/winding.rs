//! Winding number for point-in-ring tests on map coordinates.

use crate::model::Coord;

#[inline]
fn cross_product(ax: f64, ay: f64, bx: f64, by: f64) -> f64 {
    ax * by - ay * bx
}

/// Winding number of `p` relative to `ring`. A trailing closing vertex is
/// harmless: the zero-length edge never crosses the ray.
pub fn winding_number(p: Coord, ring: &[Coord]) -> i32 {
    if ring.len() < 3 {
        return 0;
    }
    let mut winding = 0i32;
    let n = ring.len();
    for i in 0..n {
        let p1 = ring[i];
        let p2 = ring[(i + 1) % n];
        if p1.y <= p.y {
            if p2.y > p.y && cross_product(p1.x - p.x, p1.y - p.y, p2.x - p.x, p2.y - p.y) > 0.0 {
                winding += 1;
            }
        } else if p2.y <= p.y && cross_product(p1.x - p.x, p1.y - p.y, p2.x - p.x, p2.y - p.y) < 0.0 {
            winding -= 1;
        }
    }
    winding
}

#[inline]
pub fn point_in_ring(p: Coord, ring: &[Coord]) -> bool {
    winding_number(p, ring) != 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inside_and_outside_square() {
        let sq = [Coord::new(0.0, 0.0), Coord::new(10.0, 0.0), Coord::new(10.0, 10.0), Coord::new(0.0, 10.0), Coord::new(0.0, 0.0)];
        assert!(point_in_ring(Coord::new(5.0, 5.0), &sq));
        assert!(!point_in_ring(Coord::new(15.0, 5.0), &sq));
    }
}
