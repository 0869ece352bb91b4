use super::tolerance::clamp01;
use crate::model::Coord;

/// Squared distance from `p` to segment `a`-`b`, plus the segment parameter of the projection.
pub fn seg_distance_sq(p: Coord, a: Coord, b: Coord) -> (f64, f64) {
    let vx = b.x - a.x; let vy = b.y - a.y;
    let wx = p.x - a.x; let wy = p.y - a.y;
    let vv = vx*vx + vy*vy;
    let t = if vv > 0.0 { clamp01((wx*vx + wy*vy) / vv) } else { 0.0 };
    let projx = a.x + t * vx; let projy = a.y + t * vy;
    let dx = p.x - projx; let dy = p.y - projy;
    (dx*dx + dy*dy, t)
}

#[inline]
pub fn squared_distance(a: Coord, b: Coord) -> f64 {
    let dx = a.x - b.x; let dy = a.y - b.y;
    dx*dx + dy*dy
}

/// Closest point on a polyline. A single vertex is its own closest point.
pub fn closest_point_on_line(p: Coord, line: &[Coord]) -> Option<Coord> {
    match line {
        [] => None,
        [only] => Some(*only),
        _ => {
            let mut best: Option<(f64, Coord)> = None;
            for w in line.windows(2) {
                let (d2, t) = seg_distance_sq(p, w[0], w[1]);
                if best.map_or(true, |(bd, _)| d2 < bd) {
                    let c = Coord::new(w[0].x + t * (w[1].x - w[0].x), w[0].y + t * (w[1].y - w[0].y));
                    best = Some((d2, c));
                }
            }
            best.map(|(_, c)| c)
        }
    }
}

/// Whether `p` lies on `line` once the squared distance is rounded to `decimals` places.
pub fn lies_on_line(p: Coord, line: &[Coord], decimals: i32) -> bool {
    match closest_point_on_line(p, line) {
        Some(c) => super::tolerance::to_fixed(squared_distance(p, c), decimals) == 0.0,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closest_point_projects_onto_segment() {
        let line = [Coord::new(0.0, 0.0), Coord::new(10.0, 0.0), Coord::new(10.0, 10.0)];
        let c = closest_point_on_line(Coord::new(4.0, 3.0), &line).unwrap();
        assert_eq!(c, Coord::new(4.0, 0.0));
        let c2 = closest_point_on_line(Coord::new(12.0, 5.0), &line).unwrap();
        assert_eq!(c2, Coord::new(10.0, 5.0));
    }

    #[test]
    fn on_line_uses_rounded_distance() {
        let line = [Coord::new(0.0, 0.0), Coord::new(10.0, 0.0)];
        assert!(lies_on_line(Coord::new(5.0, 0.0), &line, 10));
        assert!(lies_on_line(Coord::new(5.0, 1e-7), &line, 10)); // d2 = 1e-14 rounds to 0
        assert!(!lies_on_line(Coord::new(5.0, 0.001), &line, 10));
        assert!(!lies_on_line(Coord::new(5.0, 0.0), &[], 10));
    }
}
