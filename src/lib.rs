#![cfg_attr(docsrs, feature(doc_cfg))]
//! # heatsim
//!
//! heatsim solves 2D heat diffusion with an explicit five-point stencil on a
//! field distributed over a periodic `dimx x dimy` grid of processes.
//!
//! ## Pipeline
//! - The coordinator (rank 0) loads the initial field, scales it to
//!   temperatures and cuts it into tiles with a [`partition::Cart2d`] table.
//! - Tiles are scattered, each rank pads its tile with a one-cell halo ring
//!   and iterates: raise to the heat floor, [`halo::HaloExchange`] with the
//!   four torus neighbours, diffuse, swap.
//! - After a barrier the tiles are gathered, merged and saved as a heat map.
//!
//! ## Backends
//! Every communication goes through the [`comm::Communicator`] trait.
//! [`comm::LocalComm`] runs ranks as threads of one process and is what
//! [`launch::run_local`] uses; `MpiComm` is available with the
//! `mpi-support` feature.
//!
//! ```no_run
//! use heatsim::prelude::*;
//!
//! let field = Grid::from_fn(64, 64, |x, y| if (x, y) == (32, 32) { 1000.0 } else { 0.0 })?;
//! let config = SimConfig { iterations: 10, ..SimConfig::with_dims(2, 2) };
//! let out = run_local(&config, &FivePointKernel::default(), Some(field))?;
//! assert_eq!(out.width(), 64);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod comm;
pub mod config;
pub mod driver;
pub mod grid;
pub mod halo;
pub mod heat_error;
pub mod image_io;
pub mod kernel;
pub mod launch;
pub mod partition;
pub mod scatter;
pub mod topology;

/// Most-used types and entry points.
pub mod prelude {
    #[cfg(feature = "mpi-support")]
    pub use crate::comm::MpiComm;
    pub use crate::comm::{Communicator, LocalComm, LocalUniverse};
    pub use crate::config::SimConfig;
    pub use crate::driver::{HeatSim, run_rank};
    pub use crate::grid::{Grid, Side};
    pub use crate::halo::HaloExchange;
    pub use crate::heat_error::HeatSimError;
    pub use crate::kernel::{DiffusionKernel, FivePointKernel};
    pub use crate::launch::run_local;
    pub use crate::partition::Cart2d;
    pub use crate::topology::{CartTopology, Direction};
}
