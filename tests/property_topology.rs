use mapedit::algorithms::topology::{is_geometry_valid, is_self_intersecting};
use mapedit::model::{Coord, Geometry};
use proptest::prelude::*;
use std::f64::consts::PI;

// One vertex per equal sector of a circle, jittered inside its sector.
fn convex_ring(jitter: &[f64], r: f64, cx: f64, cy: f64) -> Vec<Coord> {
    let step = 2.0 * PI / jitter.len() as f64;
    let mut ring: Vec<Coord> = jitter
        .iter()
        .enumerate()
        .map(|(i, j)| {
            let t = (i as f64 + j) * step;
            Coord::new(cx + r * t.cos(), cy + r * t.sin())
        })
        .collect();
    ring.push(ring[0]);
    ring
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]
    #[test]
    fn convex_rings_never_self_intersect(
        jitter in proptest::collection::vec(0.0f64..0.5, 3..16),
        r in 1.0f64..1000.0,
        cx in -1000.0f64..1000.0,
        cy in -1000.0f64..1000.0,
    ) {
        let ring = convex_ring(&jitter, r, cx, cy);
        prop_assert!(!is_self_intersecting(&ring, false));
        prop_assert!(is_geometry_valid(&Geometry::Polygon(vec![ring])));
    }

    #[test]
    fn reversed_closing_edge_crosses(w in 1.0f64..100.0, h in 1.0f64..100.0) {
        // bowtie: the ring visits opposite corners in turn
        let ring = vec![
            Coord::new(0.0, 0.0),
            Coord::new(w, h),
            Coord::new(w, 0.0),
            Coord::new(0.0, h),
            Coord::new(0.0, 0.0),
        ];
        prop_assert!(is_self_intersecting(&ring, false));
        prop_assert!(!is_geometry_valid(&Geometry::Polygon(vec![ring])));
    }
}

#[test]
fn last_segment_check_sees_crossing_of_new_vertex() {
    let line = vec![Coord::new(0., 0.), Coord::new(10., 0.), Coord::new(10., 10.), Coord::new(5., -5.)];
    assert!(is_self_intersecting(&line, true));
}
