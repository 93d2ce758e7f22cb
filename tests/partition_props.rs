use heatsim::grid::Grid;
use heatsim::heat_error::PartitionError;
use heatsim::partition::{Cart2d, bands};
use proptest::prelude::*;

proptest! {
    #[test]
    fn bands_cover_extent_once(extent in 1usize..200, n in 1usize..20) {
        prop_assume!(n <= extent);
        let bs = bands(extent, n, 'x').unwrap();
        prop_assert_eq!(bs.len(), n);
        prop_assert_eq!(bs[0].start, 0);
        for pair in bs.windows(2) {
            prop_assert_eq!(pair[0].start + pair[0].len, pair[1].start);
            // leading bands are never smaller
            prop_assert!(pair[0].len >= pair[1].len);
            prop_assert!(pair[0].len - pair[1].len <= 1);
        }
        let last = bs[n - 1];
        prop_assert_eq!(last.start + last.len, extent);
    }

    #[test]
    fn split_then_merge_restores_field(
        w in 1usize..40,
        h in 1usize..40,
        dimx in 1usize..6,
        dimy in 1usize..6,
    ) {
        prop_assume!(dimx <= w && dimy <= h);
        let field = Grid::from_fn(w, h, |x, y| (y * w + x) as f64).unwrap();
        let mut cart = Cart2d::new(w, h, dimx, dimy).unwrap();
        cart.split(&field).unwrap();

        let area: usize = cart.iter().map(|(_, _, t)| t.width() * t.height()).sum();
        prop_assert_eq!(area, w * h);

        let mut back = Grid::new(w, h, 0).unwrap();
        cart.merge(&mut back).unwrap();
        prop_assert_eq!(back, field);
    }
}

#[test]
fn tiles_hold_their_rectangle() {
    let field = Grid::from_fn(7, 5, |x, y| (10 * y + x) as f64).unwrap();
    let mut cart = Cart2d::new(7, 5, 3, 2).unwrap();
    cart.split(&field).unwrap();
    for (bx, by, tile) in cart.iter() {
        let (x0, y0, w, h) = cart.rect(bx, by).unwrap();
        assert_eq!((tile.width(), tile.height()), (w, h));
        for y in 0..h {
            for x in 0..w {
                assert_eq!(tile.get(x, y), field.get(x0 + x, y0 + y));
            }
        }
    }
    assert_eq!(cart.rect(0, 0).unwrap(), (0, 0, 3, 3));
    assert_eq!(cart.rect(2, 1).unwrap(), (5, 3, 2, 2));
}

#[test]
fn more_blocks_than_cells_is_rejected() {
    assert!(matches!(
        Cart2d::new(2, 8, 3, 1),
        Err(PartitionError::TooManyBands { axis: 'x', .. })
    ));
}
