// Trace candidates: features near a press that the draw interaction may
// follow, and the lines among them that the press actually lies on.
//
// Whether a press starts or ends a trace is not reported by the map. It is
// guessed from the highlight layer: non-empty means a trace is running. A
// wrong guess only affects the highlight, never the trace itself.

use crate::collab::MapView;
use crate::geometry::tolerance::ON_LINE_PRECISION;
use crate::geometry::math::lies_on_line;
use crate::model::{Coord, Extent, Feature, Geometry, Pixel};
use crate::source::VectorSource;

#[derive(Clone, Debug, Default)]
pub struct TraceState {
    /// Candidates handed to the draw interaction.
    pub trace_source: Vec<Feature>,
    /// Lines drawn as trace feedback.
    pub highlight: Vec<Vec<Coord>>,
}

impl TraceState {
    pub fn new() -> Self { Self::default() }

    pub fn is_active(&self) -> bool { !self.highlight.is_empty() }

    pub fn clear(&mut self) {
        self.trace_source.clear();
        self.highlight.clear();
    }
}

/// Map-space box `tolerance` pixels around `px` in every direction.
pub fn candidate_extent(view: &dyn MapView, px: Pixel, tolerance: f64) -> Extent {
    let lower_left = view.coordinate_from_pixel(Pixel::new(px.x - tolerance, px.y + tolerance));
    let upper_right = view.coordinate_from_pixel(Pixel::new(px.x + tolerance, px.y - tolerance));
    Extent::from_corners(lower_left, upper_right)
}

/// Lines of `geometry` that `at` lies on. Points cannot be traced.
pub fn trace_targets(at: Coord, geometry: &Geometry) -> Vec<Vec<Coord>> {
    geometry
        .linear_parts()
        .into_iter()
        .filter(|line| lies_on_line(at, line, ON_LINE_PRECISION))
        .map(<[Coord]>::to_vec)
        .collect()
}

/// Refreshes the trace buffers for a press at `px`/`at`. Candidates come from
/// every snap source whether visible or not. Returns true; the trace itself
/// is never vetoed.
pub fn on_trace(state: &mut TraceState, view: &dyn MapView, sources: &[&VectorSource], px: Pixel, at: Coord, tolerance: f64) -> bool {
    let was_active = state.is_active();
    let extent = candidate_extent(view, px, tolerance);
    let candidates: Vec<Feature> = sources.iter().flat_map(|s| s.features_in_extent(&extent)).collect();
    state.clear();
    if !was_active {
        for f in &candidates {
            if let Some(g) = &f.geometry {
                state.highlight.extend(trace_targets(at, g));
            }
        }
    }
    log::debug!("trace: {} candidates, {} highlighted, was active {}", candidates.len(), state.highlight.len(), was_active);
    state.trace_source = candidates;
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::Viewport;

    fn square(x0: f64, y0: f64, s: f64) -> Geometry {
        Geometry::Polygon(vec![vec![
            Coord::new(x0, y0), Coord::new(x0, y0 + s), Coord::new(x0 + s, y0 + s), Coord::new(x0 + s, y0), Coord::new(x0, y0),
        ]])
    }

    #[test]
    fn start_then_end_toggles_highlight() {
        let mut src = VectorSource::new();
        src.add(Feature::new(Some(square(0., 0., 10.))).with_id("near"));
        src.add(Feature::new(Some(square(100., 100., 10.))).with_id("far"));
        let view = Viewport::identity();
        let at = Coord::new(0., 5.);
        let px = view.pixel_from_coordinate(at);
        let mut st = TraceState::new();
        assert!(on_trace(&mut st, &view, &[&src], px, at, 10.));
        assert_eq!(st.trace_source.len(), 1);
        assert_eq!(st.highlight.len(), 1);
        // second press is taken as the end of the trace
        on_trace(&mut st, &view, &[&src], px, at, 10.);
        assert_eq!(st.trace_source.len(), 1);
        assert!(st.highlight.is_empty());
    }

    #[test]
    fn off_line_press_highlights_nothing() {
        let g = square(0., 0., 10.);
        assert!(trace_targets(Coord::new(5., 5.), &g).is_empty());
        assert!(trace_targets(Coord::new(5., 5.), &Geometry::Point(Coord::new(5., 5.))).is_empty());
    }
}
