//! `heatsim` command-line interface.
//!
//! ```sh
//! heatsim --input field.png --dimx 2 --dimy 2 --iter 110 --output heatsim.png
//! ```
//!
//! Ranks run as threads of this process unless the binary is built with
//! `mpi-support` and started with `--mpi` under `mpirun`.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use heatsim::config::{DEFAULT_DIMX, DEFAULT_DIMY, DEFAULT_ITER, DEFAULT_OUTPUT, SimConfig};
use heatsim::image_io::save_field;
use heatsim::kernel::FivePointKernel;

#[derive(Parser)]
#[command(name = "heatsim")]
#[command(about = "Distributed 2D heat diffusion on a periodic process grid")]
#[command(version)]
struct Cli {
    /// Number of diffusion steps.
    #[arg(short = 'r', long = "iter", default_value_t = DEFAULT_ITER)]
    iterations: usize,
    /// Process columns.
    #[arg(short = 'x', long, default_value_t = DEFAULT_DIMX)]
    dimx: usize,
    /// Process rows.
    #[arg(short = 'y', long, default_value_t = DEFAULT_DIMY)]
    dimy: usize,
    /// Initial field image; its red channel is the temperature.
    #[arg(short, long)]
    input: PathBuf,
    /// Output heat map.
    #[arg(short, long, default_value = DEFAULT_OUTPUT)]
    output: PathBuf,
    /// Write per-iteration grid dumps to out-<rank>.
    #[arg(short, long)]
    verbose: bool,
    /// Directory for the out-<rank> dumps.
    #[arg(long, default_value = ".")]
    log_dir: PathBuf,
    /// Run under MPI instead of in-process threads.
    #[cfg(feature = "mpi-support")]
    #[arg(long)]
    mpi: bool,
}

impl Cli {
    fn config(&self) -> SimConfig {
        SimConfig {
            iterations: self.iterations,
            dimx: self.dimx,
            dimy: self.dimy,
            input: Some(self.input.clone()),
            output: self.output.clone(),
            verbose: self.verbose,
            log_dir: self.log_dir.clone(),
            ..SimConfig::default()
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = cli.config();
    config.validate()?;

    #[cfg(feature = "mpi-support")]
    if cli.mpi {
        return run_mpi(&config);
    }

    if config.verbose {
        print!("{}", config.dump());
    }
    let field = heatsim::launch::run_local(&config, &FivePointKernel::default(), None)
        .context("simulation failed")?;
    save_field(&field, &config.output, config.max_temp)?;
    Ok(())
}

#[cfg(feature = "mpi-support")]
fn run_mpi(config: &SimConfig) -> anyhow::Result<()> {
    use heatsim::comm::{Communicator, MpiComm};

    let comm = MpiComm::init()?;
    if comm.size() != config.processes() {
        if comm.rank() == 0 {
            eprintln!(
                "invalid process grid {}x{} for {} processes",
                config.dimx,
                config.dimy,
                comm.size()
            );
        }
        comm.abort();
        anyhow::bail!("process count mismatch");
    }
    if comm.rank() == 0 && config.verbose {
        print!("{}", config.dump());
    }
    let field = heatsim::driver::run_rank(&comm, config, &FivePointKernel::default(), None)
        .with_context(|| format!("rank {} failed", comm.rank()))?;
    if let Some(field) = field {
        if let Err(e) = save_field(&field, &config.output, config.max_temp) {
            comm.abort();
            anyhow::bail!(e);
        }
    }
    Ok(())
}
