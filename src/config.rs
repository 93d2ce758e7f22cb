//! Run configuration, built once and passed explicitly to the driver.

use std::path::PathBuf;

use crate::heat_error::HeatSimError;
use crate::image_io::CHAN_RED;

pub const DEFAULT_OUTPUT: &str = "heatsim.png";
pub const DEFAULT_DIMX: usize = 1;
pub const DEFAULT_DIMY: usize = 1;
pub const DEFAULT_ITER: usize = 110;
/// Temperature of a fully saturated input pixel.
pub const MAX_TEMP: f64 = 1000.0;

/// Everything one run needs to know.
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    pub iterations: usize,
    pub dimx: usize,
    pub dimy: usize,
    pub input: Option<PathBuf>,
    pub output: PathBuf,
    /// Write per-iteration grid dumps to `out-<rank>` under `log_dir`.
    pub verbose: bool,
    pub log_dir: PathBuf,
    pub max_temp: f64,
    pub channel: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITER,
            dimx: DEFAULT_DIMX,
            dimy: DEFAULT_DIMY,
            input: None,
            output: PathBuf::from(DEFAULT_OUTPUT),
            verbose: false,
            log_dir: PathBuf::from("."),
            max_temp: MAX_TEMP,
            channel: CHAN_RED,
        }
    }
}

impl SimConfig {
    /// Default configuration with a `dimx x dimy` decomposition.
    pub fn with_dims(dimx: usize, dimy: usize) -> Self {
        Self {
            dimx,
            dimy,
            ..Self::default()
        }
    }

    /// Number of processes this decomposition needs.
    pub fn processes(&self) -> usize {
        self.dimx * self.dimy
    }

    /// Reject configurations that cannot describe a run.
    pub fn validate(&self) -> Result<(), HeatSimError> {
        if self.dimx == 0 || self.dimy == 0 {
            return Err(HeatSimError::Config(
                "dimx and dimy must be greater than 0".into(),
            ));
        }
        if self.iterations == 0 {
            return Err(HeatSimError::Config("iteration count must be positive".into()));
        }
        if !(self.max_temp.is_finite() && self.max_temp > 0.0) {
            return Err(HeatSimError::Config(format!(
                "max temperature must be positive, got {}",
                self.max_temp
            )));
        }
        Ok(())
    }

    /// Print the resolved options, one per line.
    pub fn dump(&self) -> String {
        let input = self
            .input
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "-".into());
        format!(
            "{:>10} value\n{:>10} {}\n{:>10} {}\n{:>10} {}\n{:>10} {}\n{:>10} {}\n{:>10} {}\n",
            "option",
            "dimx",
            self.dimx,
            "dimy",
            self.dimy,
            "iter",
            self.iterations,
            "input",
            input,
            "output",
            self.output.display(),
            "verbose",
            u8::from(self.verbose),
        )
    }
}
