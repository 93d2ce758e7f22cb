//! Error types for heatsim.
//!
//! Every component returns its own error enum; the simulation driver folds
//! them into [`HeatSimError`], which is the only error the launchers see.
//! Components never abort the process themselves.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::comm::CommError;

/// Errors from grid allocation and grid-to-grid operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GridError {
    /// Width or height of zero.
    #[error("grid dimensions must be positive (got {width}x{height})")]
    EmptyDimensions { width: usize, height: usize },
    /// Only a single ring of halo cells is supported.
    #[error("unsupported padding {0} (expected 0 or 1)")]
    UnsupportedPadding(usize),
    /// A raw buffer did not match `pw * ph`.
    #[error("buffer holds {actual} values, grid needs {expected}")]
    BufferLength { expected: usize, actual: usize },
    /// Two grids that must agree on shape do not.
    #[error("shape mismatch: {left} vs {right}")]
    ShapeMismatch { left: Shape, right: Shape },
    /// A sub-rectangle does not fit inside the grid.
    #[error("rectangle {w}x{h} at ({x},{y}) exceeds {width}x{height} grid")]
    OutOfBounds {
        x: usize,
        y: usize,
        w: usize,
        h: usize,
        width: usize,
        height: usize,
    },
    /// A halo accessor was used on a grid without halo cells.
    #[error("grid has no halo ring")]
    NoHalo,
}

/// `(width, height, padding)` triple, used in error reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shape {
    pub width: usize,
    pub height: usize,
    pub padding: usize,
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}+{}", self.width, self.height, self.padding)
    }
}

/// Errors from building or using the partition table.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PartitionError {
    /// Zero blocks along one axis.
    #[error("decomposition must have at least one block per axis (got {dimx}x{dimy})")]
    NoBlocks { dimx: usize, dimy: usize },
    /// More bands than cells along one axis would leave an empty tile.
    #[error("cannot split {extent} cells into {bands} bands along {axis}")]
    TooManyBands {
        axis: char,
        extent: usize,
        bands: usize,
    },
    /// Block coordinate outside the table.
    #[error("block ({bx},{by}) outside {dimx}x{dimy} table")]
    BlockOutOfRange {
        bx: usize,
        by: usize,
        dimx: usize,
        dimy: usize,
    },
    /// Split/merge target does not have the table's global extent.
    #[error("global grid is {actual_w}x{actual_h}, table covers {expected_w}x{expected_h}")]
    GlobalShape {
        expected_w: usize,
        expected_h: usize,
        actual_w: usize,
        actual_h: usize,
    },
    #[error(transparent)]
    Grid(#[from] GridError),
}

/// Errors from building the Cartesian process topology.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TopologyError {
    /// `dimx * dimy` does not equal the number of processes.
    #[error("2D decomposition {dimx}x{dimy} needs {} processes, got {processes}", .dimx * .dimy)]
    SizeMismatch {
        dimx: usize,
        dimy: usize,
        processes: usize,
    },
    /// Rank outside `0..processes`.
    #[error("rank {rank} outside process group of size {processes}")]
    RankOutOfRange { rank: usize, processes: usize },
}

/// Errors from decoding or encoding images.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("cannot read image `{path}`: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("cannot write image `{path}`: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("image `{path}` has no channel {channel}")]
    MissingChannel { path: PathBuf, channel: usize },
    #[error(transparent)]
    Grid(#[from] GridError),
}

/// Phase of the run in which a transfer failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Scatter,
    Halo,
    Barrier,
    Gather,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Scatter => "scatter",
            Phase::Halo => "halo exchange",
            Phase::Barrier => "barrier",
            Phase::Gather => "gather",
        };
        f.write_str(name)
    }
}

/// Unified error type returned by the simulation driver.
#[derive(Debug, Error)]
pub enum HeatSimError {
    /// Invalid run configuration (caught before any communication).
    #[error("configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error(transparent)]
    Partition(#[from] PartitionError),
    #[error(transparent)]
    Topology(#[from] TopologyError),
    /// A send, receive, wait or barrier failed.
    #[error("{phase} failed on rank {rank}: {source}")]
    Comm {
        phase: Phase,
        rank: usize,
        #[source]
        source: CommError,
    },
    /// Scatter/gather metadata that cannot describe a tile.
    #[error("malformed {what} from rank {peer}: {detail}")]
    Wire {
        what: &'static str,
        peer: usize,
        detail: String,
    },
    #[error(transparent)]
    Image(#[from] ImageError),
    /// The per-rank verbose log could not be written.
    #[error("verbose log: {0}")]
    Log(#[from] std::io::Error),
    /// A rank thread panicked.
    #[error("rank {0} panicked")]
    RankPanicked(usize),
}

impl HeatSimError {
    pub(crate) fn comm(phase: Phase, rank: usize) -> impl Fn(CommError) -> Self + Copy {
        move |source| HeatSimError::Comm {
            phase,
            rank,
            source,
        }
    }
}
