use float_cmp::approx_eq;
use heatsim::grid::Grid;
use proptest::prelude::*;

fn grid_strategy() -> impl Strategy<Value = Grid> {
    (1usize..12, 1usize..12, 0usize..2).prop_flat_map(|(w, h, p)| {
        let len = (w + 2 * p) * (h + 2 * p);
        prop::collection::vec(-1000.0f64..1000.0, len)
            .prop_map(move |data| Grid::from_vec(w, h, p, data).unwrap())
    })
}

proptest! {
    #[test]
    fn set_min_is_idempotent_and_a_floor(g in grid_strategy(), seed in -500.0f64..500.0) {
        let mut heat = g.clone();
        heat.as_mut_slice().iter_mut().enumerate().for_each(|(i, v)| *v = seed + i as f64);
        let mut once = g.clone();
        once.set_min(&heat).unwrap();
        let mut twice = once.clone();
        twice.set_min(&heat).unwrap();
        prop_assert_eq!(&once, &twice);
        for ((o, h), c) in once.as_slice().iter().zip(heat.as_slice()).zip(g.as_slice()) {
            prop_assert!(o >= h);
            prop_assert!(o >= c);
        }
    }

    #[test]
    fn multiply_is_linear(g in grid_strategy(), a in -10.0f64..10.0, b in -10.0f64..10.0) {
        let mut left = g.clone();
        left.multiply(a);
        left.multiply(b);
        let mut right = g.clone();
        right.multiply(a * b);
        for (l, r) in left.as_slice().iter().zip(right.as_slice()) {
            prop_assert!(approx_eq!(f64, *l, *r, epsilon = 1e-6, ulps = 4));
        }
    }

    #[test]
    fn pad_preserves_interior(g in grid_strategy(), p in 0usize..2) {
        let padded = g.pad(p).unwrap();
        prop_assert_eq!(padded.padding(), p);
        prop_assert!(padded.interior().eq(g.interior()));
    }
}
