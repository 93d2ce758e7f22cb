//! In-process launcher: every rank runs on its own scoped thread over a
//! shared [`LocalUniverse`].

use std::panic::{AssertUnwindSafe, catch_unwind};

use crate::comm::{CommError, Communicator, LocalUniverse};
use crate::config::SimConfig;
use crate::driver::run_rank;
use crate::grid::Grid;
use crate::heat_error::HeatSimError;
use crate::kernel::DiffusionKernel;
use crate::scatter::COORDINATOR;

/// Run a whole `dimx x dimy` simulation inside this process and return the
/// merged global field.
///
/// `field` is the initial field in simulation units; with `None` the
/// coordinator loads `config.input`. When several ranks fail, the error
/// reported is the lowest-ranked one that is not merely the echo of another
/// rank's abort.
pub fn run_local<K: DiffusionKernel>(
    config: &SimConfig,
    kernel: &K,
    field: Option<Grid>,
) -> Result<Grid, HeatSimError> {
    config.validate()?;
    let universe = LocalUniverse::new(config.processes());
    let comms = universe.comms();
    let mut field = field;
    log::info!("launching {} local ranks", comms.len());

    let results: Vec<Result<Option<Grid>, HeatSimError>> = std::thread::scope(|s| {
        let handles: Vec<_> = comms
            .iter()
            .map(|comm| {
                let rank = comm.rank();
                let field = if rank == COORDINATOR { field.take() } else { None };
                s.spawn(move || {
                    catch_unwind(AssertUnwindSafe(|| run_rank(comm, config, kernel, field)))
                        .unwrap_or_else(|_| {
                            log::error!("rank {rank} panicked");
                            comm.abort();
                            Err(HeatSimError::RankPanicked(rank))
                        })
                })
            })
            .collect();
        handles
            .into_iter()
            .enumerate()
            .map(|(rank, h)| h.join().unwrap_or(Err(HeatSimError::RankPanicked(rank))))
            .collect()
    });

    let mut merged = None;
    let mut echo = None;
    for result in results {
        match result {
            Ok(Some(grid)) => merged = Some(grid),
            Ok(None) => {}
            Err(e) if is_abort_echo(&e) => {
                echo.get_or_insert(e);
            }
            Err(e) => return Err(e),
        }
    }
    if let Some(e) = echo {
        return Err(e);
    }
    merged.ok_or_else(|| HeatSimError::Config("coordinator returned no field".into()))
}

fn is_abort_echo(err: &HeatSimError) -> bool {
    matches!(
        err,
        HeatSimError::Comm {
            source: CommError::Aborted,
            ..
        }
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::FivePointKernel;

    #[test]
    fn single_rank_matches_driver() {
        let field = Grid::from_fn(4, 3, |x, y| (x + y) as f64).unwrap();
        let config = SimConfig {
            iterations: 2,
            ..SimConfig::default()
        };
        let kernel = FivePointKernel::default();
        let local = run_local(&config, &kernel, Some(field.clone())).unwrap();
        let direct = run_rank(&crate::comm::LocalComm::solo(), &config, &kernel, Some(field))
            .unwrap()
            .unwrap();
        assert_eq!(local, direct);
    }

    #[test]
    fn panicking_kernel_is_reported_not_hung() {
        let config = SimConfig {
            iterations: 1,
            ..SimConfig::with_dims(2, 2)
        };
        let field = Grid::new(4, 4, 0).unwrap();
        let kernel = |_: &Grid, _: &mut Grid| -> Result<(), crate::heat_error::GridError> {
            panic!("kernel blew up")
        };
        let err = run_local(&config, &kernel, Some(field)).unwrap_err();
        assert!(matches!(err, HeatSimError::RankPanicked(_)));
    }

    #[test]
    fn first_real_error_beats_abort_echoes() {
        let config = SimConfig::with_dims(2, 1);
        // coordinator has no field and no input path
        let err = run_local(&config, &FivePointKernel::default(), None).unwrap_err();
        assert!(matches!(err, HeatSimError::Config(_)));
    }
}
