use biopool::spatial::{find_open_space, scatter_near, Bounds, Circle};
use biopool::SimRng;
use proptest::prelude::*;

const BOUNDS: Bounds = Bounds {
    xdim: 20.0,
    ydim: 20.0,
};

fn arb_circle() -> impl Strategy<Value = Circle> {
    (0.5f64..19.5, 0.5f64..19.5, 0.05f64..0.5).prop_map(|(x, y, r)| Circle::new(x, y, r))
}

proptest! {
    #[test]
    fn searched_spot_never_overlaps(
        parent in arb_circle(),
        others in proptest::collection::vec(arb_circle(), 0..8),
        odm in 0.5f64..4.0,
        new_radius in 0.05f64..0.5,
        seed in any::<u64>(),
    ) {
        let mut neighbors = vec![parent];
        neighbors.extend(others);
        let mut rng = SimRng::new(seed);

        if let Some((x, y)) = find_open_space(parent, odm, new_radius, &neighbors, BOUNDS, &mut rng) {
            prop_assert!(parent.distance_to(x, y) <= odm);
            prop_assert!(x >= new_radius && x <= BOUNDS.xdim - new_radius);
            prop_assert!(y >= new_radius && y <= BOUNDS.ydim - new_radius);
            for n in &neighbors {
                prop_assert!(n.distance_to(x, y) > new_radius + n.r);
            }
        }
    }

    #[test]
    fn scattered_spot_stays_near_parent_and_inside(
        parent in arb_circle(),
        odm in 0.1f64..4.0,
        new_radius in 0.05f64..0.5,
        seed in any::<u64>(),
    ) {
        let mut rng = SimRng::new(seed);
        let (x, y) = scatter_near(parent, odm, new_radius, BOUNDS, &mut rng);
        prop_assert!(x >= new_radius && x <= BOUNDS.xdim - new_radius);
        prop_assert!(y >= new_radius && y <= BOUNDS.ydim - new_radius);
        // clipping only ever pulls the spot toward the domain
        prop_assert!((x - parent.x).abs() <= odm + new_radius + 1e-9);
        prop_assert!((y - parent.y).abs() <= odm + new_radius + 1e-9);
    }
}
