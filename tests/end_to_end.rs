use float_cmp::assert_approx_eq;
use heatsim::comm::{CommError, Communicator, LocalUniverse};
use heatsim::config::SimConfig;
use heatsim::driver::run_rank;
use heatsim::grid::Grid;
use heatsim::heat_error::{GridError, HeatSimError};
use heatsim::kernel::{DiffusionKernel, FivePointKernel};
use heatsim::launch::run_local;

fn center_source(w: usize, h: usize) -> Grid {
    Grid::from_fn(w, h, |x, y| if (x, y) == (w / 2, h / 2) { 1000.0 } else { 0.0 }).unwrap()
}

fn config(dimx: usize, dimy: usize, iterations: usize) -> SimConfig {
    SimConfig {
        iterations,
        ..SimConfig::with_dims(dimx, dimy)
    }
}

#[test]
fn four_by_four_on_two_by_two_one_step() {
    let out = run_local(&config(2, 2, 1), &FivePointKernel::default(), Some(center_source(4, 4)))
        .unwrap();
    // source sits at (2, 2), the corner of tile (1, 1)
    assert_approx_eq!(f64, out.get(2, 2), 200.0);
    for (x, y) in [(1, 2), (3, 2), (2, 1), (2, 3)] {
        assert_approx_eq!(f64, out.get(x, y), 200.0);
    }
    let total: f64 = out.interior().sum();
    assert_approx_eq!(f64, total, 1000.0, epsilon = 1e-9);
    // tile (0, 0) only touches the source diagonally
    for (x, y) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
        assert_eq!(out.get(x, y), 0.0);
    }
}

#[test]
fn decomposition_does_not_change_the_answer() {
    let field = Grid::from_fn(12, 9, |x, y| ((x * 7 + y * 3) % 11) as f64 * 50.0).unwrap();
    let kernel = FivePointKernel::default();
    let reference = run_local(&config(1, 1, 5), &kernel, Some(field.clone())).unwrap();
    for (dimx, dimy) in [(2, 1), (1, 3), (3, 3), (4, 2), (2, 3)] {
        let out = run_local(&config(dimx, dimy, 5), &kernel, Some(field.clone())).unwrap();
        for (a, b) in out.interior().zip(reference.interior()) {
            assert_approx_eq!(f64, a, b, epsilon = 1e-9);
        }
    }
}

#[test]
fn values_stay_within_initial_range() {
    let field = center_source(6, 6);
    let out = run_local(&config(3, 2, 20), &FivePointKernel::default(), Some(field)).unwrap();
    assert!(out.interior().all(|v| (0.0..=1000.0).contains(&v)));
    assert!(out.get(3, 3) > out.get(0, 0));
}

#[test]
fn single_column_of_ranks_completes() {
    for ranks in 2..=5 {
        let field = center_source(5, 10);
        let out = run_local(&config(1, ranks, 3), &FivePointKernel::default(), Some(field))
            .unwrap();
        assert_eq!((out.width(), out.height()), (5, 10));
    }
}

#[test]
fn mismatched_process_count_aborts_everyone() {
    let universe = LocalUniverse::new(3);
    let comms = universe.comms();
    let cfg = config(2, 2, 1);
    let results: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = comms
            .iter()
            .map(|comm| {
                let field = (comm.rank() == 0).then(|| center_source(4, 4));
                let cfg = &cfg;
                s.spawn(move || run_rank(comm, cfg, &FivePointKernel::default(), field))
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert!(results.iter().all(|r| matches!(r, Err(HeatSimError::Topology(_)))));
    assert!(universe.is_aborted());
}

#[test]
fn failing_kernel_on_one_rank_releases_its_peers() {
    let kernel = |curr: &Grid, next: &mut Grid| -> Result<(), GridError> {
        // only the narrowest tile fails
        if curr.width() == 1 {
            return Err(GridError::NoHalo);
        }
        FivePointKernel::default().diffuse(curr, next)
    };
    // 5 columns over 3 ranks: tiles are 2, 2 and 1 wide
    let err = run_local(&config(3, 1, 4), &kernel, Some(center_source(5, 4))).unwrap_err();
    assert!(matches!(err, HeatSimError::Grid(GridError::NoHalo)));
}

#[test]
fn aborted_peers_report_the_abort() {
    let universe = LocalUniverse::new(2);
    let comms = universe.comms();
    comms[1].abort();
    let err = run_rank(&comms[0], &config(2, 1, 1), &FivePointKernel::default(), Some(center_source(4, 4)))
        .unwrap_err();
    assert!(matches!(
        err,
        HeatSimError::Comm {
            source: CommError::Aborted,
            ..
        }
    ));
}
