//! Padded 2D temperature grids.
//!
//! A [`Grid`] stores `width x height` owned samples surrounded by `padding`
//! rings of halo cells, in one row-major buffer of `pw * ph` values where
//! `pw = width + 2 * padding` and `ph = height + 2 * padding`.
//!
//! Logical coordinates `(x, y)` address the interior only; the halo ring is
//! reached through the named accessors ([`Grid::halo_row`],
//! [`Grid::halo_col_mut`], ...) so no caller has to compute raw offsets.

mod dump;
pub mod strided;

pub use strided::{Strided, StridedMut, VectorLayout};

use crate::heat_error::{GridError, Shape};

/// Largest supported halo width.
pub const MAX_PADDING: usize = 1;

/// Which edge of a grid a halo row or column sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Top,
    Bottom,
    Left,
    Right,
}

/// Row-major scalar field with an optional halo ring.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    width: usize,
    height: usize,
    padding: usize,
    pw: usize,
    ph: usize,
    data: Vec<f64>,
}

impl Grid {
    /// Allocate a zero-filled grid.
    pub fn new(width: usize, height: usize, padding: usize) -> Result<Self, GridError> {
        if width == 0 || height == 0 {
            return Err(GridError::EmptyDimensions { width, height });
        }
        if padding > MAX_PADDING {
            return Err(GridError::UnsupportedPadding(padding));
        }
        let pw = width + 2 * padding;
        let ph = height + 2 * padding;
        Ok(Self {
            width,
            height,
            padding,
            pw,
            ph,
            data: vec![0.0; pw * ph],
        })
    }

    /// Wrap an existing padded buffer of exactly `pw * ph` values.
    pub fn from_vec(
        width: usize,
        height: usize,
        padding: usize,
        data: Vec<f64>,
    ) -> Result<Self, GridError> {
        let mut grid = Self::new(width, height, padding)?;
        if data.len() != grid.data.len() {
            return Err(GridError::BufferLength {
                expected: grid.data.len(),
                actual: data.len(),
            });
        }
        grid.data = data;
        Ok(grid)
    }

    /// Unpadded grid with every interior cell computed from `(x, y)`.
    pub fn from_fn<F>(width: usize, height: usize, mut f: F) -> Result<Self, GridError>
    where
        F: FnMut(usize, usize) -> f64,
    {
        let mut grid = Self::new(width, height, 0)?;
        for y in 0..height {
            for x in 0..width {
                grid.data[y * width + x] = f(x, y);
            }
        }
        Ok(grid)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn padding(&self) -> usize {
        self.padding
    }

    /// Padded width (`pw`).
    pub fn padded_width(&self) -> usize {
        self.pw
    }

    /// Padded height (`ph`).
    pub fn padded_height(&self) -> usize {
        self.ph
    }

    pub fn shape(&self) -> Shape {
        Shape {
            width: self.width,
            height: self.height,
            padding: self.padding,
        }
    }

    /// Number of owned (interior) cells.
    pub fn area(&self) -> usize {
        self.width * self.height
    }

    /// Whole padded buffer, row-major.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    #[inline]
    fn offset(&self, x: usize, y: usize) -> usize {
        (y + self.padding) * self.pw + x + self.padding
    }

    /// Interior value at logical `(x, y)`.
    pub fn get(&self, x: usize, y: usize) -> f64 {
        assert!(x < self.width && y < self.height, "({x},{y}) outside interior");
        self.data[self.offset(x, y)]
    }

    pub fn set(&mut self, x: usize, y: usize, value: f64) {
        assert!(x < self.width && y < self.height, "({x},{y}) outside interior");
        let at = self.offset(x, y);
        self.data[at] = value;
    }

    /// Value at padded coordinate `(px, py)`, halo included.
    pub fn padded_get(&self, px: usize, py: usize) -> f64 {
        self.data[py * self.pw + px]
    }

    /// Interior values in row-major order, halo stripped.
    pub fn interior(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.height).flat_map(move |y| {
            let start = self.offset(0, y);
            self.data[start..start + self.width].iter().copied()
        })
    }

    /// Copy of this grid's interior resized to `padding` halo rings.
    ///
    /// Halo cells of a grown grid start at zero; shrinking drops the halo.
    pub fn pad(&self, padding: usize) -> Result<Grid, GridError> {
        let mut out = Grid::new(self.width, self.height, padding)?;
        out.copy_from(self)?;
        Ok(out)
    }

    /// Copy the interior of `src` into the interior of `self`.
    ///
    /// Both grids must share the logical size; padding may differ.
    pub fn copy_from(&mut self, src: &Grid) -> Result<(), GridError> {
        if self.width != src.width || self.height != src.height {
            return Err(GridError::ShapeMismatch {
                left: self.shape(),
                right: src.shape(),
            });
        }
        for y in 0..self.height {
            let d = self.offset(0, y);
            let s = src.offset(0, y);
            self.data[d..d + self.width].copy_from_slice(&src.data[s..s + self.width]);
        }
        Ok(())
    }

    /// Raise every cell, halo included, to at least the matching `heat` cell.
    ///
    /// `heat` is the floor field: fixed sources keep their temperature from
    /// one step to the next while everything else is free to diffuse.
    pub fn set_min(&mut self, heat: &Grid) -> Result<(), GridError> {
        self.check_same_shape(heat)?;
        for (c, h) in self.data.iter_mut().zip(&heat.data) {
            if *c < *h {
                *c = *h;
            }
        }
        Ok(())
    }

    /// Scale every cell, halo included.
    pub fn multiply(&mut self, factor: f64) {
        self.data.iter_mut().for_each(|v| *v *= factor);
    }

    /// Unpadded copy of the `w x h` interior rectangle at `(x0, y0)`.
    pub fn extract(&self, x0: usize, y0: usize, w: usize, h: usize) -> Result<Grid, GridError> {
        self.check_rect(x0, y0, w, h)?;
        let mut out = Grid::new(w, h, 0)?;
        for y in 0..h {
            let s = self.offset(x0, y0 + y);
            out.data[y * w..(y + 1) * w].copy_from_slice(&self.data[s..s + w]);
        }
        Ok(out)
    }

    /// Write the interior of `src` at interior offset `(x0, y0)`.
    pub fn blit(&mut self, src: &Grid, x0: usize, y0: usize) -> Result<(), GridError> {
        self.check_rect(x0, y0, src.width, src.height)?;
        for y in 0..src.height {
            let d = self.offset(x0, y0 + y);
            let s = src.offset(0, y);
            self.data[d..d + src.width].copy_from_slice(&src.data[s..s + src.width]);
        }
        Ok(())
    }

    /// Full padded row holding interior row `i` (`pw` values, halo columns included).
    pub fn interior_row(&self, i: usize) -> &[f64] {
        assert!(i < self.height, "interior row {i} out of range");
        let start = (i + self.padding) * self.pw;
        &self.data[start..start + self.pw]
    }

    /// Halo row on the top or bottom edge, `pw` values.
    pub fn halo_row(&self, side: Side) -> Result<&[f64], GridError> {
        let start = self.halo_row_start(side)?;
        Ok(&self.data[start..start + self.pw])
    }

    pub fn halo_row_mut(&mut self, side: Side) -> Result<&mut [f64], GridError> {
        let start = self.halo_row_start(side)?;
        let pw = self.pw;
        Ok(&mut self.data[start..start + pw])
    }

    /// Interior column `j` across the interior rows (`height` values at stride `pw`).
    pub fn interior_col(&self, j: usize) -> Strided<'_> {
        assert!(j < self.width, "interior column {j} out of range");
        let layout = self.column_layout(j + self.padding);
        Strided::from_parts(&self.data, layout)
    }

    /// Halo column on the left or right edge across the interior rows.
    pub fn halo_col(&self, side: Side) -> Result<Strided<'_>, GridError> {
        let layout = self.column_layout(self.halo_col_index(side)?);
        Strided::new(&self.data, layout)
    }

    pub fn halo_col_mut(&mut self, side: Side) -> Result<StridedMut<'_>, GridError> {
        let layout = self.column_layout(self.halo_col_index(side)?);
        StridedMut::new(&mut self.data, layout)
    }

    /// Read view of an arbitrary layout over the padded buffer.
    pub fn strided(&self, layout: VectorLayout) -> Result<Strided<'_>, GridError> {
        Strided::new(&self.data, layout)
    }

    pub fn strided_mut(&mut self, layout: VectorLayout) -> Result<StridedMut<'_>, GridError> {
        StridedMut::new(&mut self.data, layout)
    }

    /// Vector layout of padded column `px` over the interior rows.
    pub fn column_layout(&self, px: usize) -> VectorLayout {
        VectorLayout::new(self.padding * self.pw + px, self.height, self.pw)
    }

    fn halo_row_start(&self, side: Side) -> Result<usize, GridError> {
        if self.padding == 0 {
            return Err(GridError::NoHalo);
        }
        match side {
            Side::Top => Ok(0),
            Side::Bottom => Ok((self.ph - 1) * self.pw),
            Side::Left | Side::Right => panic!("{side:?} is not a row edge"),
        }
    }

    fn halo_col_index(&self, side: Side) -> Result<usize, GridError> {
        if self.padding == 0 {
            return Err(GridError::NoHalo);
        }
        match side {
            Side::Left => Ok(0),
            Side::Right => Ok(self.pw - 1),
            Side::Top | Side::Bottom => panic!("{side:?} is not a column edge"),
        }
    }

    pub(crate) fn check_same_shape(&self, other: &Grid) -> Result<(), GridError> {
        if self.shape() != other.shape() {
            return Err(GridError::ShapeMismatch {
                left: self.shape(),
                right: other.shape(),
            });
        }
        Ok(())
    }

    fn check_rect(&self, x: usize, y: usize, w: usize, h: usize) -> Result<(), GridError> {
        if x + w > self.width || y + h > self.height {
            return Err(GridError::OutOfBounds {
                x,
                y,
                w,
                h,
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }
}
