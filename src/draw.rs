//! In-progress sketches and the guards deciding which clicks become vertices.

use std::f64::consts::PI;
use std::str::FromStr;

use crate::algorithms::topology::{coordinates_equal, is_geometry_valid, is_self_intersecting};
use crate::error::EditorError;
use crate::geometry::limits::{coord_in_bounds, MAX_SKETCH_VERTICES};
use crate::geometry::tolerance::{CLICK_TOLERANCE, SIMPLIFY_TOLERANCE};
use crate::model::{conform_geometry, Coord, Geometry, GeometryType, Pixel};
use crate::scheduler::{Deferred, TaskQueue};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub fn none(&self) -> bool { !(self.shift || self.ctrl || self.alt || self.meta) }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PointerKind {
    #[default]
    Mouse,
    Pen,
    Touch,
}

/// A pointer press as delivered by the map, in both map and screen space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerEvent {
    pub coordinate: Coord,
    pub pixel: Pixel,
    pub modifiers: Modifiers,
    pub pointer: PointerKind,
}

impl PointerEvent {
    pub fn new(coordinate: Coord, pixel: Pixel) -> Self {
        PointerEvent { coordinate, pixel, modifiers: Modifiers::default(), pointer: PointerKind::Mouse }
    }

    /// Mouse press where one pixel is one map unit (screen y points down).
    pub fn at(x: f64, y: f64) -> Self { Self::new(Coord::new(x, y), Pixel::new(x, -y)) }

    pub fn touch(x: f64, y: f64) -> Self { PointerEvent { pointer: PointerKind::Touch, ..Self::at(x, y) } }

    pub fn with_modifiers(mut self, m: Modifiers) -> Self { self.modifiers = m; self }
}

/// How the draw interaction turns presses into geometry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DrawShape {
    #[default]
    Vertices,
    /// Axis-aligned rectangle from two corners.
    Box,
    /// Square around a center, rotated toward the second press.
    Square,
    /// Vertices follow the drag, no guards apply.
    Freehand,
}

impl FromStr for DrawShape {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "box" => DrawShape::Box,
            "square" => DrawShape::Square,
            "freehand" => DrawShape::Freehand,
            "polygon" | "line" | "point" | "vertices" => DrawShape::Vertices,
            other => return Err(format!("unknown shape {other}")),
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawState {
    Idle,
    Sketching,
    Finished,
    Aborted,
}

/// Outcome of one press.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawStep {
    Rejected,
    Started,
    VertexAdded,
    FinishBlocked,
    Finished(Geometry),
}

/// The draw buffer: fixed vertices plus the vertex following the pointer.
#[derive(Clone, Debug, PartialEq)]
pub struct Sketch {
    kind: GeometryType,
    fixed: Vec<Coord>,
    fixed_px: Vec<Pixel>,
    pointer: Coord,
}

impl Sketch {
    fn start(kind: GeometryType, c: Coord, px: Pixel) -> Self {
        Sketch { kind, fixed: vec![c], fixed_px: vec![px], pointer: c }
    }

    pub fn kind(&self) -> GeometryType { self.kind }

    pub fn vertices(&self) -> &[Coord] { &self.fixed }

    pub fn pointer(&self) -> Coord { self.pointer }

    fn push(&mut self, c: Coord, px: Pixel) {
        self.fixed.push(c);
        self.fixed_px.push(px);
        self.pointer = c;
    }

    /// What the map shows: a polygon ring is closed back to its first vertex.
    pub fn geometry(&self) -> Geometry {
        let mut cs = self.fixed.clone();
        cs.push(self.pointer);
        match self.kind {
            GeometryType::Polygon => {
                cs.push(self.fixed[0]);
                Geometry::Polygon(vec![cs])
            }
            GeometryType::Point => Geometry::Point(self.pointer),
            _ => Geometry::LineString(cs),
        }
    }

    /// The sketch without the pointer vertex.
    fn completed(&self) -> Geometry {
        match self.kind {
            GeometryType::Polygon => Geometry::Polygon(vec![self.closing_ring()]),
            GeometryType::Point => Geometry::Point(self.fixed[0]),
            _ => Geometry::LineString(self.fixed.clone()),
        }
    }

    fn closing_ring(&self) -> Vec<Coord> {
        let mut ring = self.fixed.clone();
        ring.push(self.fixed[0]);
        ring
    }

    fn min_points_to_close(&self) -> usize {
        if self.kind == GeometryType::Polygon { 3 } else { 2 }
    }

    fn enough_to_finish(&self) -> bool { self.fixed.len() >= self.min_points_to_close() }

    fn at_finish(&self, px: Pixel) -> bool {
        if !self.enough_to_finish() {
            return false;
        }
        let near = |p: &Pixel| p.distance(&px) <= CLICK_TOLERANCE;
        let last = self.fixed_px.last().map_or(false, near);
        match self.kind {
            GeometryType::Polygon => last || near(&self.fixed_px[0]),
            _ => last,
        }
    }
}

fn box_ring(a: Coord, b: Coord) -> Vec<Coord> {
    let (x0, x1) = (a.x.min(b.x), a.x.max(b.x));
    let (y0, y1) = (a.y.min(b.y), a.y.max(b.y));
    vec![Coord::new(x0, y0), Coord::new(x0, y1), Coord::new(x1, y1), Coord::new(x1, y0), Coord::new(x0, y0)]
}

fn square_ring(center: Coord, edge: Coord) -> Vec<Coord> {
    let r = ((edge.x - center.x).powi(2) + (edge.y - center.y).powi(2)).sqrt();
    let start = (edge.y - center.y).atan2(edge.x - center.x);
    let mut ring: Vec<Coord> = (0..4)
        .map(|i| {
            let a = start + i as f64 * PI / 2.0;
            Coord::new(center.x + r * a.cos(), center.y + r * a.sin())
        })
        .collect();
    ring.push(ring[0]);
    ring
}

/// One draw interaction's lifecycle, from the first press to finish or abort.
#[derive(Clone, Debug)]
pub struct DrawSession {
    kind: GeometryType,
    shape: DrawShape,
    validate: bool,
    state: DrawState,
    sketch: Option<Sketch>,
    correcting: bool,
    modify_rollback: Option<Geometry>,
}

impl DrawSession {
    /// `kind` is the layer type; collections are sketched as their single form.
    pub fn new(kind: GeometryType, shape: DrawShape, validate: bool) -> Self {
        let kind = match shape {
            DrawShape::Box | DrawShape::Square => GeometryType::Polygon,
            _ => kind.single(),
        };
        DrawSession { kind, shape, validate, state: DrawState::Idle, sketch: None, correcting: false, modify_rollback: None }
    }

    pub fn kind(&self) -> GeometryType { self.kind }
    pub fn shape(&self) -> DrawShape { self.shape }
    pub fn state(&self) -> DrawState { self.state }
    pub fn sketch(&self) -> Option<&Sketch> { self.sketch.as_ref() }
    pub fn validates(&self) -> bool { self.validate }

    /// A vertex removal is scheduled but has not run yet.
    pub fn is_correcting(&self) -> bool { self.correcting }

    pub fn is_sketching(&self) -> bool { self.sketch.is_some() }

    /// Runs work posted by an earlier callback.
    pub fn run_deferred(&mut self, task: Deferred) {
        match task {
            Deferred::RemoveLastPoint => {
                self.correcting = false;
                let Some(sk) = self.sketch.as_mut() else { return };
                sk.fixed.pop();
                sk.fixed_px.pop();
                if sk.fixed.is_empty() {
                    self.reset(DrawState::Aborted);
                } else {
                    log::debug!("removed last sketch vertex, {} left", sk.fixed.len());
                }
            }
        }
    }

    /// Mouse motion moves the pointer vertex. Touch input never does.
    pub fn pointer_move(&mut self, evt: &PointerEvent) {
        if evt.pointer == PointerKind::Touch {
            return;
        }
        if let Some(sk) = self.sketch.as_mut() {
            sk.pointer = evt.coordinate;
        }
    }

    /// Decides whether `evt` may add a vertex to the current sketch.
    pub fn accept_vertex(&self, evt: &PointerEvent) -> bool {
        if !evt.modifiers.none() {
            return false;
        }
        if !coord_in_bounds(&evt.coordinate) {
            return false;
        }
        let Some(sk) = self.sketch.as_ref() else { return true };
        if sk.fixed.len() >= MAX_SKETCH_VERTICES {
            return false;
        }
        if !self.validate || sk.kind == GeometryType::Point {
            return true;
        }
        let mut coords = sk.fixed.clone();
        if evt.pointer == PointerKind::Touch {
            // the pointer still sits on the previous vertex
            coords.push(evt.coordinate);
        } else {
            coords.push(sk.pointer);
        }
        let n = coords.len();
        if coordinates_equal(&coords[n - 1], &coords[n - 2]) {
            // pressing on the last vertex; only finishing can follow
            return n > sk.min_points_to_close();
        }
        !is_self_intersecting(&coords, true)
    }

    /// Decides whether the sketch may be completed now. An invalid closing
    /// ring schedules removal of the latest vertex for the next turn.
    pub fn can_finish(&mut self, queue: &mut TaskQueue) -> bool {
        if !self.validate {
            return true;
        }
        let Some(sk) = self.sketch.as_ref() else { return true };
        if sk.kind != GeometryType::Polygon {
            return true;
        }
        if !is_self_intersecting(&sk.closing_ring(), false) {
            return true;
        }
        log::warn!("closing the ring would cross itself, dropping the last vertex");
        queue.post(Deferred::RemoveLastPoint);
        self.correcting = true;
        false
    }

    pub fn click(&mut self, evt: &PointerEvent, queue: &mut TaskQueue) -> DrawStep {
        if self.sketch.is_none() {
            if !self.accept_vertex(evt) {
                return DrawStep::Rejected;
            }
            if self.kind == GeometryType::Point {
                self.state = DrawState::Finished;
                return DrawStep::Finished(Geometry::Point(evt.coordinate));
            }
            self.sketch = Some(Sketch::start(self.kind, evt.coordinate, evt.pixel));
            self.state = DrawState::Sketching;
            return DrawStep::Started;
        }
        if evt.pointer != PointerKind::Touch {
            self.pointer_move(evt);
        }
        if matches!(self.shape, DrawShape::Box | DrawShape::Square) {
            return self.finish_shape(evt);
        }
        if !self.accept_vertex(evt) {
            return DrawStep::Rejected;
        }
        let at_finish = self.sketch.as_ref().map_or(false, |sk| sk.at_finish(evt.pixel));
        if at_finish {
            if self.can_finish(queue) {
                return self.finish();
            }
            return DrawStep::FinishBlocked;
        }
        if let Some(sk) = self.sketch.as_mut() {
            sk.push(evt.coordinate, evt.pixel);
        }
        DrawStep::VertexAdded
    }

    fn finish_shape(&mut self, evt: &PointerEvent) -> DrawStep {
        let Some(sk) = self.sketch.as_ref() else { return DrawStep::Rejected };
        let first = sk.fixed[0];
        if coordinates_equal(&first, &evt.coordinate) {
            return DrawStep::Rejected;
        }
        let ring = match self.shape {
            DrawShape::Square => square_ring(first, evt.coordinate),
            _ => box_ring(first, evt.coordinate),
        };
        self.reset(DrawState::Finished);
        DrawStep::Finished(Geometry::Polygon(vec![ring]))
    }

    /// Freehand drag: the vertex is appended without any guard.
    pub fn drag(&mut self, evt: &PointerEvent) -> DrawStep {
        if self.shape != DrawShape::Freehand || !coord_in_bounds(&evt.coordinate) {
            return DrawStep::Rejected;
        }
        match self.sketch.as_mut() {
            None if self.kind == GeometryType::Point => {
                self.state = DrawState::Finished;
                DrawStep::Finished(Geometry::Point(evt.coordinate))
            }
            None => {
                self.sketch = Some(Sketch::start(self.kind, evt.coordinate, evt.pixel));
                self.state = DrawState::Sketching;
                DrawStep::Started
            }
            Some(sk) if sk.fixed.len() >= MAX_SKETCH_VERTICES => DrawStep::Rejected,
            Some(sk) => {
                sk.push(evt.coordinate, evt.pixel);
                DrawStep::VertexAdded
            }
        }
    }

    /// End of a freehand drag. Too short a sketch is aborted.
    pub fn release(&mut self) -> DrawStep {
        if self.shape != DrawShape::Freehand {
            return DrawStep::Rejected;
        }
        match self.sketch.as_ref() {
            Some(sk) if sk.enough_to_finish() => self.finish(),
            Some(_) => {
                self.abort();
                DrawStep::Rejected
            }
            None => DrawStep::Rejected,
        }
    }

    fn finish(&mut self) -> DrawStep {
        let geom = self.sketch.as_ref().map(Sketch::completed);
        self.reset(DrawState::Finished);
        match geom {
            Some(g) => DrawStep::Finished(g),
            None => DrawStep::Rejected,
        }
    }

    fn reset(&mut self, state: DrawState) {
        self.sketch = None;
        self.correcting = false;
        self.state = state;
    }

    /// Discards the sketch. Returns whether one existed.
    pub fn abort(&mut self) -> bool {
        let had = self.sketch.is_some();
        self.reset(DrawState::Aborted);
        had
    }

    /// Back to idle after a finished or aborted sketch has been handled.
    pub fn settle(&mut self) {
        if matches!(self.state, DrawState::Finished | DrawState::Aborted) {
            self.state = DrawState::Idle;
        }
    }

    /// Keeps a copy of the geometry about to be modified.
    pub fn modify_start(&mut self, g: &Geometry) {
        if self.validate {
            self.modify_rollback = Some(g.clone());
        }
    }

    /// Restores the copy when the modified geometry is invalid. Returns
    /// whether the modification stands.
    pub fn modify_end(&mut self, g: &mut Geometry) -> bool {
        let rollback = self.modify_rollback.take();
        if !self.validate || is_geometry_valid(g) {
            return true;
        }
        if let Some(prev) = rollback {
            *g = prev;
        }
        false
    }
}

/// Post-processing of a finished sketch for a layer of type `target`:
/// collapse duplicate vertices, wrap singles into collections, re-validate.
pub fn complete_sketch(
    geom: Geometry,
    layer: &str,
    target: Option<GeometryType>,
    validate: bool,
) -> Result<Geometry, EditorError> {
    let target = target.ok_or_else(|| EditorError::MissingGeometryType(layer.to_string()))?;
    let simplified = geom.simplify(SIMPLIFY_TOLERANCE);
    let got = simplified.kind();
    let g = conform_geometry(simplified, target)
        .ok_or_else(|| EditorError::GeometryTypeMismatch { layer: layer.to_string(), expected: target, got })?;
    if validate && !is_geometry_valid(&g) {
        return Err(EditorError::InvalidGeometry);
    }
    Ok(g)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(kind: GeometryType) -> (DrawSession, TaskQueue) {
        (DrawSession::new(kind, DrawShape::Vertices, true), TaskQueue::new())
    }

    fn click_all(s: &mut DrawSession, q: &mut TaskQueue, pts: &[[f64; 2]]) -> Vec<DrawStep> {
        pts.iter().map(|p| s.click(&PointerEvent::at(p[0], p[1]), q)).collect()
    }

    #[test]
    fn modifier_press_rejected() {
        let (mut s, mut q) = session(GeometryType::Polygon);
        let shift = Modifiers { shift: true, ..Default::default() };
        assert_eq!(s.click(&PointerEvent::at(0., 0.).with_modifiers(shift), &mut q), DrawStep::Rejected);
        assert_eq!(s.state(), DrawState::Idle);
    }

    #[test]
    fn crossing_vertex_rejected() {
        let (mut s, mut q) = session(GeometryType::LineString);
        click_all(&mut s, &mut q, &[[0., 0.], [10., 10.], [10., 0.]]);
        assert_eq!(s.click(&PointerEvent::at(0., 10.), &mut q), DrawStep::Rejected);
        assert_eq!(s.sketch().unwrap().vertices().len(), 3);
    }

    #[test]
    fn early_press_on_last_vertex_rejected() {
        let (mut s, mut q) = session(GeometryType::Polygon);
        s.click(&PointerEvent::at(0., 0.), &mut q);
        assert_eq!(s.click(&PointerEvent::at(0., 0.), &mut q), DrawStep::Rejected);
    }

    #[test]
    fn touch_uses_event_coordinate() {
        let (mut s, mut q) = session(GeometryType::LineString);
        click_all(&mut s, &mut q, &[[0., 0.], [10., 10.], [10., 0.]]);
        // placeholder pointer sits on (10, 0); the real press crosses the line
        assert_eq!(s.click(&PointerEvent::touch(0., 10.), &mut q), DrawStep::Rejected);
        assert_eq!(s.click(&PointerEvent::touch(20., 0.), &mut q), DrawStep::VertexAdded);
    }

    #[test]
    fn line_finishes_on_last_vertex() {
        let (mut s, mut q) = session(GeometryType::LineString);
        click_all(&mut s, &mut q, &[[0., 0.], [10., 0.], [10., 10.]]);
        let step = s.click(&PointerEvent::at(10., 10.), &mut q);
        assert_eq!(
            step,
            DrawStep::Finished(Geometry::LineString(vec![Coord::new(0., 0.), Coord::new(10., 0.), Coord::new(10., 10.)]))
        );
    }

    #[test]
    fn box_from_two_corners() {
        let mut s = DrawSession::new(GeometryType::MultiPolygon, DrawShape::Box, true);
        let mut q = TaskQueue::new();
        s.click(&PointerEvent::at(5., 5.), &mut q);
        let DrawStep::Finished(Geometry::Polygon(rings)) = s.click(&PointerEvent::at(0., 0.), &mut q) else {
            panic!("box not finished")
        };
        assert_eq!(rings[0].len(), 5);
        assert_eq!(rings[0][0], Coord::new(0., 0.));
        assert_eq!(rings[0][2], Coord::new(5., 5.));
    }

    #[test]
    fn modify_rollback_on_invalid() {
        let (mut s, _) = session(GeometryType::Polygon);
        let good = Geometry::Polygon(vec![vec![
            Coord::new(0., 0.), Coord::new(0., 10.), Coord::new(10., 10.), Coord::new(10., 0.), Coord::new(0., 0.),
        ]]);
        s.modify_start(&good);
        let mut bad = Geometry::Polygon(vec![vec![
            Coord::new(0., 0.), Coord::new(10., 10.), Coord::new(10., 0.), Coord::new(0., 10.), Coord::new(0., 0.),
        ]]);
        assert!(!s.modify_end(&mut bad));
        assert_eq!(bad, good);
    }

    #[test]
    fn complete_sketch_wraps_and_rejects() {
        let line = Geometry::LineString(vec![Coord::new(0., 0.), Coord::new(1., 1.)]);
        let g = complete_sketch(line.clone(), "l", Some(GeometryType::MultiLineString), true).unwrap();
        assert_eq!(g.kind(), GeometryType::MultiLineString);
        let err = complete_sketch(line, "l", Some(GeometryType::Polygon), true).unwrap_err();
        assert!(matches!(err, EditorError::GeometryTypeMismatch { .. }));
    }
}
