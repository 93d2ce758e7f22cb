//! Image decode/encode for the initial and final temperature fields.

use std::path::Path;

use crate::grid::Grid;
use crate::heat_error::ImageError;

/// Red channel, the one the simulation reads by default.
pub const CHAN_RED: usize = 0;

/// Decode `path` and return one channel as an unpadded grid normalized to `[0, 1]`.
pub fn load_field<P: AsRef<Path>>(path: P, channel: usize) -> Result<Grid, ImageError> {
    let path = path.as_ref();
    let img = image::open(path).map_err(|source| ImageError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let channels = usize::from(img.color().channel_count());
    if channel >= channels {
        return Err(ImageError::MissingChannel {
            path: path.to_path_buf(),
            channel,
        });
    }
    let rgba = img.into_rgba16();
    let (w, h) = rgba.dimensions();
    log::info!("loaded {}x{} image {}", w, h, path.display());
    let grid = Grid::from_fn(w as usize, h as usize, |x, y| {
        let p = rgba.get_pixel(x as u32, y as u32).0[channel];
        f64::from(p) / f64::from(u16::MAX)
    })?;
    Ok(grid)
}

/// Encode the interior of `grid` as a TURBO heat map of `value / max`.
pub fn save_field<P: AsRef<Path>>(grid: &Grid, path: P, max: f64) -> Result<(), ImageError> {
    let path = path.as_ref();
    let gradient = colorous::TURBO;
    let mut img = image::RgbImage::new(grid.width() as u32, grid.height() as u32);
    for y in 0..grid.height() {
        for x in 0..grid.width() {
            let t = if max > 0.0 {
                (grid.get(x, y) / max).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let c = gradient.eval_continuous(t);
            img.put_pixel(x as u32, y as u32, image::Rgb(c.as_array()));
        }
    }
    img.save(path).map_err(|source| ImageError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!("saved {}x{} field to {}", grid.width(), grid.height(), path.display());
    Ok(())
}
