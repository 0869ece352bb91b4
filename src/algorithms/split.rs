// Splitting a line at a pressed point.

use crate::algorithms::topology::coordinates_equal;
use crate::geometry::math::lies_on_line;
use crate::geometry::tolerance::ON_LINE_PRECISION;
use crate::model::Coord;

/// Splits `line` at `cut`, on an existing vertex or by inserting `cut` into
/// the segment it lies on. `None` for the end points or a point off the line.
pub fn split_line_at(line: &[Coord], cut: Coord) -> Option<(Vec<Coord>, Vec<Coord>)> {
    let (first, last) = (line.first()?, line.last()?);
    if coordinates_equal(first, &cut) || coordinates_equal(last, &cut) {
        log::debug!("split point is an end point, nothing to split");
        return None;
    }
    for (i, seg) in line.windows(2).enumerate() {
        if !lies_on_line(cut, seg, ON_LINE_PRECISION) {
            continue;
        }
        let (head, tail) = if coordinates_equal(&cut, &seg[1]) {
            (line[..i + 2].to_vec(), line[i + 1..].to_vec())
        } else {
            let mut head = line[..i + 1].to_vec();
            head.push(cut);
            let mut tail = vec![cut];
            tail.extend_from_slice(&line[i + 1..]);
            (head, tail)
        };
        return (tail.len() > 1).then_some((head, tail));
    }
    None
}
