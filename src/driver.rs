//! Per-rank simulation driver.
//!
//! ```text
//! INIT -> SCATTER -> ITERATE* -> (barrier) -> GATHER -> DONE
//! ```
//!
//! `INIT` validates the configuration, places the rank on the torus and, on
//! the coordinator, loads and partitions the global field. `SCATTER` hands
//! every rank its tile, from which the three working grids are derived.
//! Each `ITERATE` step raises `curr` to the heat floor, refreshes the halo,
//! runs the kernel into `next`, and swaps. After the fixed step count one
//! barrier separates computing from `GATHER`, which rebuilds the global
//! field on the coordinator. `SAVE` writes it out; [`run_rank`] stops
//! before it so callers keep the merged grid even when writing fails.
//!
//! Components report failures as `Result`s; [`run_rank`] is the single place
//! that turns a failure into an abort of the whole process group.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::comm::Communicator;
use crate::config::SimConfig;
use crate::grid::Grid;
use crate::halo::HaloExchange;
use crate::heat_error::{HeatSimError, Phase};
use crate::image_io::{load_field, save_field};
use crate::kernel::DiffusionKernel;
use crate::partition::Cart2d;
use crate::scatter::{self, COORDINATOR};
use crate::topology::CartTopology;

/// Where a driver is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Iterate,
    Gather,
    Done,
}

/// Per-rank diagnostic log (`out-<rank>`), written only in verbose mode.
struct RankLog {
    out: BufWriter<File>,
}

impl RankLog {
    fn open(dir: &Path, rank: usize) -> std::io::Result<Self> {
        let file = File::create(dir.join(format!("out-{rank}")))?;
        Ok(Self {
            out: BufWriter::new(file),
        })
    }

    fn context(&mut self, topo: &CartTopology) -> std::io::Result<()> {
        writeln!(self.out, "*** CONTEXT ***")?;
        writeln!(self.out, "{topo}")?;
        writeln!(self.out, "***************")
    }

    fn grid(&mut self, label: &str, grid: &Grid) -> std::io::Result<()> {
        writeln!(self.out, "{label}")?;
        grid.dump(&mut self.out)
    }

    fn line(&mut self, text: &str) -> std::io::Result<()> {
        writeln!(self.out, "{text}")
    }
}

/// State of one rank of a running simulation.
pub struct HeatSim<'a, C: Communicator, K: DiffusionKernel> {
    comm: &'a C,
    config: &'a SimConfig,
    kernel: &'a K,
    topo: CartTopology,
    // coordinator only
    cart: Option<Cart2d>,
    global: Option<Grid>,
    curr: Grid,
    next: Grid,
    heat: Grid,
    halo: HaloExchange,
    log: Option<RankLog>,
    state: State,
    steps: usize,
}

impl<'a, C: Communicator, K: DiffusionKernel> HeatSim<'a, C, K> {
    /// INIT and SCATTER.
    ///
    /// On the coordinator `field` is the initial global field in simulation
    /// units; when it is `None` the field is loaded from `config.input` and
    /// scaled by `config.max_temp`. Other ranks ignore `field`.
    pub fn init(
        comm: &'a C,
        config: &'a SimConfig,
        kernel: &'a K,
        field: Option<Grid>,
    ) -> Result<Self, HeatSimError> {
        config.validate()?;
        let rank = comm.rank();
        let topo = CartTopology::build(rank, comm.size(), config.dimx, config.dimy)?;

        let mut log = if config.verbose {
            let mut log = RankLog::open(&config.log_dir, rank)?;
            log.context(&topo)?;
            Some(log)
        } else {
            None
        };

        let (cart, global) = if rank == COORDINATOR {
            let global = match field {
                Some(g) => g,
                None => {
                    let path = config.input.as_ref().ok_or_else(|| {
                        HeatSimError::Config("missing input file".into())
                    })?;
                    let mut g = load_field(path, config.channel)?;
                    g.multiply(config.max_temp);
                    g
                }
            };
            let global = global.pad(0)?;
            let mut cart = Cart2d::new(global.width(), global.height(), config.dimx, config.dimy)?;
            cart.split(&global)?;
            log::info!(
                "field {}x{} split into {}x{} tiles",
                global.width(),
                global.height(),
                config.dimx,
                config.dimy
            );
            (Some(cart), Some(global))
        } else {
            if field.is_some() {
                log::debug!("rank {rank}: ignoring initial field, tiles come from the coordinator");
            }
            (None, None)
        };

        let tile = scatter::scatter(comm, &topo, cart.as_ref())?;
        let curr = tile.pad(1)?;
        let next = tile.pad(1)?;
        let heat = tile.pad(1)?;
        let halo = HaloExchange::new(&topo, &curr)?;

        if let Some(log) = log.as_mut() {
            log.grid("heat grid", &heat)?;
        }
        log::debug!("rank {rank}: {topo}, tile {}x{}", tile.width(), tile.height());

        Ok(Self {
            comm,
            config,
            kernel,
            topo,
            cart,
            global,
            curr,
            next,
            heat,
            halo,
            log,
            state: State::Iterate,
            steps: 0,
        })
    }

    pub fn topology(&self) -> &CartTopology {
        &self.topo
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Steps completed so far.
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Latest state of this rank's tile, halo included.
    pub fn current(&self) -> &Grid {
        &self.curr
    }

    /// Fixed heat floor applied before every step.
    pub fn heat(&self) -> &Grid {
        &self.heat
    }

    /// One ITERATE step: floor, halo exchange, diffuse, swap.
    pub fn step(&mut self) -> Result<(), HeatSimError> {
        self.expect_state(State::Iterate)?;
        let k = self.steps;
        if let Some(log) = self.log.as_mut() {
            log.line(&format!("iter {k}"))?;
        }
        self.trace_grid("start", false)?;

        self.curr.set_min(&self.heat)?;
        self.trace_grid("grid_set_min", false)?;

        self.halo.exchange(self.comm, &mut self.curr)?;
        self.trace_grid("exchng2d", false)?;

        self.kernel.diffuse(&self.curr, &mut self.next)?;
        self.trace_grid("heat_diffuse", true)?;

        std::mem::swap(&mut self.curr, &mut self.next);
        self.steps += 1;
        log::debug!("rank {}: step {k} done", self.comm.rank());
        Ok(())
    }

    /// Run every configured step, then the collective barrier.
    pub fn iterate(&mut self) -> Result<(), HeatSimError> {
        while self.steps < self.config.iterations {
            self.step()?;
        }
        self.comm
            .barrier()
            .map_err(HeatSimError::comm(Phase::Barrier, self.comm.rank()))?;
        self.state = State::Gather;
        log::info!("rank {}: {} iterations done", self.comm.rank(), self.steps);
        Ok(())
    }

    /// GATHER: collect every tile on the coordinator and merge.
    pub fn gather(&mut self) -> Result<(), HeatSimError> {
        self.expect_state(State::Gather)?;
        scatter::gather(self.comm, &self.topo, &self.curr, self.cart.as_mut())?;
        if let (Some(cart), Some(global)) = (self.cart.as_ref(), self.global.as_mut()) {
            cart.merge(global)?;
        }
        if let Some(log) = self.log.as_mut() {
            log.out.flush()?;
        }
        self.state = State::Done;
        Ok(())
    }

    /// Merged global field; `Some` on the coordinator once gathered.
    pub fn global(&self) -> Option<&Grid> {
        match self.state {
            State::Done => self.global.as_ref(),
            _ => None,
        }
    }

    /// SAVE: write the merged field as a heat map. No-op off the coordinator.
    pub fn save(&self) -> Result<(), HeatSimError> {
        self.expect_state(State::Done)?;
        if let Some(global) = self.global.as_ref() {
            save_field(global, &self.config.output, self.config.max_temp)?;
        }
        Ok(())
    }

    pub fn into_global(self) -> Option<Grid> {
        match self.state {
            State::Done => self.global,
            _ => None,
        }
    }

    fn trace_grid(&mut self, label: &str, next: bool) -> Result<(), HeatSimError> {
        if let Some(log) = self.log.as_mut() {
            log.grid(label, if next { &self.next } else { &self.curr })?;
        }
        Ok(())
    }

    fn expect_state(&self, want: State) -> Result<(), HeatSimError> {
        if self.state != want {
            return Err(HeatSimError::Config(format!(
                "driver is in state {:?}, expected {:?}",
                self.state, want
            )));
        }
        Ok(())
    }
}

/// Run one rank from INIT to GATHER and return the merged field on the
/// coordinator (`None` elsewhere).
///
/// Any failure aborts the whole process group before it is returned, so
/// peers blocked on this rank fail instead of waiting forever.
pub fn run_rank<C, K>(
    comm: &C,
    config: &SimConfig,
    kernel: &K,
    field: Option<Grid>,
) -> Result<Option<Grid>, HeatSimError>
where
    C: Communicator,
    K: DiffusionKernel,
{
    let run = || -> Result<Option<Grid>, HeatSimError> {
        let mut sim = HeatSim::init(comm, config, kernel, field)?;
        sim.iterate()?;
        sim.gather()?;
        Ok(sim.into_global())
    };
    run().inspect_err(|e| {
        log::error!("rank {}: {e}", comm.rank());
        comm.abort();
    })
}
