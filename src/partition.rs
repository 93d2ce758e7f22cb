//! Block decomposition of the global field into a `dimx x dimy` tile table.
//!
//! The global extent is cut into `dimx` column bands and `dimy` row bands.
//! Bands are as even as possible; the first `extent % bands` bands get one
//! extra cell. Tile `(bx, by)` is the intersection of column band `bx` and
//! row band `by`, so the table covers the field exactly once.

use crate::grid::Grid;
use crate::heat_error::PartitionError;

/// One band along an axis: `len` cells starting at `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Band {
    pub start: usize,
    pub len: usize,
}

/// Split `extent` cells into `bands` contiguous bands, leading bands larger.
pub fn bands(extent: usize, bands: usize, axis: char) -> Result<Vec<Band>, PartitionError> {
    if bands == 0 || bands > extent {
        return Err(PartitionError::TooManyBands {
            axis,
            extent,
            bands,
        });
    }
    let base = extent / bands;
    let rem = extent % bands;
    let mut start = 0;
    Ok((0..bands)
        .map(|i| {
            let len = base + usize::from(i < rem);
            let band = Band { start, len };
            start += len;
            band
        })
        .collect())
}

/// Owning table of unpadded tiles, indexed by block coordinate.
#[derive(Debug, Clone)]
pub struct Cart2d {
    global_width: usize,
    global_height: usize,
    cols: Vec<Band>,
    rows: Vec<Band>,
    // row-major: tiles[by * dimx + bx]
    tiles: Vec<Grid>,
}

impl Cart2d {
    /// Build an empty (zero-filled) table for a `global_width x global_height` field.
    pub fn new(
        global_width: usize,
        global_height: usize,
        dimx: usize,
        dimy: usize,
    ) -> Result<Self, PartitionError> {
        if dimx == 0 || dimy == 0 {
            return Err(PartitionError::NoBlocks { dimx, dimy });
        }
        let cols = bands(global_width, dimx, 'x')?;
        let rows = bands(global_height, dimy, 'y')?;
        let mut tiles = Vec::with_capacity(dimx * dimy);
        for row in &rows {
            for col in &cols {
                tiles.push(Grid::new(col.len, row.len, 0)?);
            }
        }
        log::debug!(
            "partition {global_width}x{global_height} into {dimx}x{dimy} tiles"
        );
        Ok(Self {
            global_width,
            global_height,
            cols,
            rows,
            tiles,
        })
    }

    pub fn dimx(&self) -> usize {
        self.cols.len()
    }

    pub fn dimy(&self) -> usize {
        self.rows.len()
    }

    pub fn global_width(&self) -> usize {
        self.global_width
    }

    pub fn global_height(&self) -> usize {
        self.global_height
    }

    /// Interior rectangle `(x, y, w, h)` of tile `(bx, by)` in global coordinates.
    pub fn rect(&self, bx: usize, by: usize) -> Result<(usize, usize, usize, usize), PartitionError> {
        self.check_block(bx, by)?;
        let c = self.cols[bx];
        let r = self.rows[by];
        Ok((c.start, r.start, c.len, r.len))
    }

    /// Borrow tile `(bx, by)`.
    pub fn get(&self, bx: usize, by: usize) -> Result<&Grid, PartitionError> {
        self.check_block(bx, by)?;
        Ok(&self.tiles[by * self.dimx() + bx])
    }

    pub fn get_mut(&mut self, bx: usize, by: usize) -> Result<&mut Grid, PartitionError> {
        self.check_block(bx, by)?;
        let dimx = self.dimx();
        Ok(&mut self.tiles[by * dimx + bx])
    }

    /// Iterate `(bx, by, tile)` in row-major block order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, &Grid)> + '_ {
        let dimx = self.dimx();
        self.tiles
            .iter()
            .enumerate()
            .map(move |(i, g)| (i % dimx, i / dimx, g))
    }

    /// Copy every tile's sub-rectangle out of `source`.
    pub fn split(&mut self, source: &Grid) -> Result<(), PartitionError> {
        self.check_global(source)?;
        let dimx = self.dimx();
        for (i, tile) in self.tiles.iter_mut().enumerate() {
            let (c, r) = (self.cols[i % dimx], self.rows[i / dimx]);
            let sub = source.extract(c.start, r.start, c.len, r.len)?;
            tile.copy_from(&sub)?;
        }
        Ok(())
    }

    /// Copy every tile back into `dest` at its band offsets.
    pub fn merge(&self, dest: &mut Grid) -> Result<(), PartitionError> {
        self.check_global(dest)?;
        for (bx, by, tile) in self.iter() {
            dest.blit(tile, self.cols[bx].start, self.rows[by].start)?;
        }
        Ok(())
    }

    fn check_block(&self, bx: usize, by: usize) -> Result<(), PartitionError> {
        if bx >= self.dimx() || by >= self.dimy() {
            return Err(PartitionError::BlockOutOfRange {
                bx,
                by,
                dimx: self.dimx(),
                dimy: self.dimy(),
            });
        }
        Ok(())
    }

    fn check_global(&self, grid: &Grid) -> Result<(), PartitionError> {
        if grid.width() != self.global_width || grid.height() != self.global_height {
            return Err(PartitionError::GlobalShape {
                expected_w: self.global_width,
                expected_h: self.global_height,
                actual_w: grid.width(),
                actual_h: grid.height(),
            });
        }
        Ok(())
    }
}
