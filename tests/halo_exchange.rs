use heatsim::comm::{Communicator, LocalUniverse};
use heatsim::grid::Grid;
use heatsim::halo::HaloExchange;
use heatsim::topology::{CartTopology, Direction};

const W: usize = 4;
const H: usize = 3;

fn value(rank: usize, x: usize, y: usize) -> f64 {
    (rank * 1000 + y * 10 + x) as f64
}

/// Run one exchange round on every rank of a `dimx x dimy` torus and return
/// each rank's topology with its refreshed tile.
fn exchange_round(dimx: usize, dimy: usize) -> Vec<(CartTopology, Grid)> {
    let universe = LocalUniverse::new(dimx * dimy);
    let comms = universe.comms();
    std::thread::scope(|s| {
        let handles: Vec<_> = comms
            .iter()
            .map(|comm| {
                s.spawn(move || {
                    let rank = comm.rank();
                    let topo = CartTopology::build(rank, comm.size(), dimx, dimy).unwrap();
                    let mut tile = Grid::from_fn(W, H, |x, y| value(rank, x, y))
                        .unwrap()
                        .pad(1)
                        .unwrap();
                    let halo = HaloExchange::new(&topo, &tile).unwrap();
                    halo.exchange(comm, &mut tile).unwrap();
                    (topo, tile)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
}

fn check_ring(topo: &CartTopology, tile: &Grid) {
    let north = topo.neighbor(Direction::North);
    let south = topo.neighbor(Direction::South);
    let west = topo.neighbor(Direction::West);
    let east = topo.neighbor(Direction::East);
    for x in 0..W {
        assert_eq!(tile.padded_get(x + 1, 0), value(north, x, H - 1), "top halo of {topo}");
        assert_eq!(tile.padded_get(x + 1, H + 1), value(south, x, 0), "bottom halo of {topo}");
    }
    for y in 0..H {
        assert_eq!(tile.padded_get(0, y + 1), value(west, W - 1, y), "left halo of {topo}");
        assert_eq!(tile.padded_get(W + 1, y + 1), value(east, 0, y), "right halo of {topo}");
    }
    // interior untouched
    for y in 0..H {
        for x in 0..W {
            assert_eq!(tile.get(x, y), value(topo.rank(), x, y));
        }
    }
}

#[test]
fn three_by_two_torus() {
    for (topo, tile) in exchange_round(3, 2) {
        check_ring(&topo, &tile);
    }
}

#[test]
fn two_by_two_torus_shares_neighbours() {
    for (topo, tile) in exchange_round(2, 2) {
        assert_eq!(topo.neighbor(Direction::West), topo.neighbor(Direction::East));
        check_ring(&topo, &tile);
    }
}

#[test]
fn degenerate_axes_wrap_onto_self() {
    for (dimx, dimy) in [(1, 1), (1, 4), (4, 1)] {
        for (topo, tile) in exchange_round(dimx, dimy) {
            check_ring(&topo, &tile);
        }
    }
}

#[test]
fn repeated_rounds_do_not_cross_talk() {
    let universe = LocalUniverse::new(4);
    let comms = universe.comms();
    std::thread::scope(|s| {
        for comm in &comms {
            s.spawn(move || {
                let topo = CartTopology::build(comm.rank(), 4, 2, 2).unwrap();
                let mut tile = Grid::new(W, H, 1).unwrap();
                let halo = HaloExchange::new(&topo, &tile).unwrap();
                for round in 0..10 {
                    tile.as_mut_slice().fill(0.0);
                    for y in 0..H {
                        for x in 0..W {
                            tile.set(x, y, (round * 10 + comm.rank()) as f64);
                        }
                    }
                    halo.exchange(comm, &mut tile).unwrap();
                    let north = topo.neighbor(Direction::North);
                    assert_eq!(tile.padded_get(1, 0), (round * 10 + north) as f64);
                }
            });
        }
    });
}
