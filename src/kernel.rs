//! Per-tile diffusion kernels.
//!
//! A kernel reads a padded tile, halo included, and writes the interior of an
//! output tile of the same shape. It never touches the output halo.

use rayon::prelude::*;

use crate::grid::Grid;
use crate::heat_error::GridError;

/// One explicit diffusion step over a one-ring padded tile.
pub trait DiffusionKernel: Sync {
    fn diffuse(&self, curr: &Grid, next: &mut Grid) -> Result<(), GridError>;
}

impl<F> DiffusionKernel for F
where
    F: Fn(&Grid, &mut Grid) -> Result<(), GridError> + Sync,
{
    fn diffuse(&self, curr: &Grid, next: &mut Grid) -> Result<(), GridError> {
        self(curr, next)
    }
}

/// Average of a cell and its four face neighbours.
///
/// Interior rows are distributed over the rayon pool; each task owns a
/// disjoint set of output rows.
#[derive(Debug, Clone, Copy)]
pub struct FivePointKernel {
    /// Minimum rows per rayon task.
    pub min_rows: usize,
}

impl Default for FivePointKernel {
    fn default() -> Self {
        Self { min_rows: 16 }
    }
}

impl DiffusionKernel for FivePointKernel {
    fn diffuse(&self, curr: &Grid, next: &mut Grid) -> Result<(), GridError> {
        check_tiles(curr, next)?;
        let (w, h, pw) = (curr.width(), curr.height(), curr.padded_width());
        let src = curr.as_slice();
        next.as_mut_slice()
            .par_chunks_mut(pw)
            .enumerate()
            .skip(1)
            .take(h)
            .with_min_len(self.min_rows.max(1))
            .for_each(|(py, row)| {
                for px in 1..=w {
                    let c = py * pw + px;
                    row[px] = (src[c] + src[c - pw] + src[c + pw] + src[c - 1] + src[c + 1]) / 5.0;
                }
            });
        Ok(())
    }
}

/// Both tiles must have one halo ring and the same shape.
pub fn check_tiles(curr: &Grid, next: &Grid) -> Result<(), GridError> {
    if curr.padding() != 1 {
        return Err(GridError::NoHalo);
    }
    curr.check_same_shape(next)
}
