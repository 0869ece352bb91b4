use super::math::seg_distance_sq;
use crate::model::Coord;

/// Douglas-Peucker simplification. Endpoints are always kept, so closed
/// rings stay closed. Consecutive duplicates collapse for any tolerance > 0.
pub fn douglas_peucker(coords: &[Coord], tolerance: f64) -> Vec<Coord> {
    let n = coords.len();
    if n <= 2 {
        let mut out = coords.to_vec();
        if n == 2 && out[0] == out[1] && tolerance > 0.0 { out.truncate(1); }
        return out;
    }
    let tol2 = tolerance * tolerance;
    let mut keep = vec![false; n];
    keep[0] = true;
    keep[n - 1] = true;
    let mut stack = vec![(0usize, n - 1)];
    while let Some((first, last)) = stack.pop() {
        let mut max_d2 = 0.0;
        let mut index = first;
        for i in first + 1..last {
            let (d2, _) = seg_distance_sq(coords[i], coords[first], coords[last]);
            if d2 > max_d2 { max_d2 = d2; index = i; }
        }
        if max_d2 > tol2 {
            keep[index] = true;
            if index - first > 1 { stack.push((first, index)); }
            if last - index > 1 { stack.push((index, last)); }
        }
    }
    let mut out: Vec<Coord> = Vec::with_capacity(n);
    for (i, c) in coords.iter().enumerate() {
        if keep[i] && out.last().map_or(true, |p| p != c || i == n - 1) {
            out.push(*c);
        }
    }
    out
}
