use std::path::Path;

use gdal::Dataset;
use geo::Coord;

use crate::error::Result;
use crate::model::ModelFamily;
use crate::tiles::{TileId, TileResolver};

/// Samples elevation values for voxel points from the tile stores.
#[derive(Debug, Clone)]
pub struct RasterSampler {
    resolver: TileResolver,
}

impl RasterSampler {
    pub fn new(resolver: TileResolver) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &TileResolver {
        &self.resolver
    }

    /// One value per point, `None` where no tile supplied a valid sample.
    ///
    /// Tiles are visited in the given order; a later tile overwrites an earlier
    /// one only with valid samples. Unreadable tiles are logged and skipped.
    pub fn sample_heights(
        &self,
        points: &[Coord<f64>],
        tiles: &[TileId],
        family: ModelFamily,
    ) -> Vec<Option<f64>> {
        let mut heights = vec![None; points.len()];

        for (tile, path) in self.resolver.resolve_all(tiles, family) {
            match sample_tile(&path, points) {
                Ok(samples) => {
                    let mut hits = 0usize;
                    for (slot, sample) in heights.iter_mut().zip(samples) {
                        if sample.is_some() {
                            *slot = sample;
                            hits += 1;
                        }
                    }
                    tracing::debug!("{} tile {}: {} valid samples", family, tile, hits);
                }
                Err(e) => {
                    tracing::error!("Error reading {}: {}", path.display(), e);
                }
            }
        }

        heights
    }
}

/// Sample band 1 of the raster at `path` at every point.
///
/// Points outside the raster, and pixels equal to the nodata value or NaN, give `None`.
/// The dataset is closed before returning.
pub fn sample_tile(path: &Path, points: &[Coord<f64>]) -> Result<Vec<Option<f64>>> {
    let dataset = Dataset::open(path)?;
    let geo_transform = dataset.geo_transform()?;
    let (width, height) = dataset.raster_size();
    let band = dataset.rasterband(1)?;
    let nodata = band.no_data_value();

    let pixels: Vec<Option<(usize, usize)>> = points
        .iter()
        .map(|p| pixel_at(&geo_transform, (width, height), p))
        .collect();

    let Some((col0, row0, col1, row1)) = pixel_window(&pixels) else {
        return Ok(vec![None; points.len()]);
    };
    let window_size = (col1 - col0 + 1, row1 - row0 + 1);

    // One windowed read covering every point that falls on this raster.
    let buffer = band.read_as::<f64>(
        (col0 as isize, row0 as isize),
        window_size,
        window_size,
        None,
    )?;
    let data = buffer.data();

    Ok(pixels
        .iter()
        .map(|pixel| {
            let (col, row) = (*pixel)?;
            let value = data[(row - row0) * window_size.0 + (col - col0)];
            is_valid(value, nodata).then_some(value)
        })
        .collect())
}

/// Pixel (col, row) containing `coord`, if it lies on the raster.
pub fn pixel_at(gt: &[f64; 6], size: (usize, usize), coord: &Coord<f64>) -> Option<(usize, usize)> {
    let det = gt[1] * gt[5] - gt[2] * gt[4];
    if det == 0.0 {
        return None;
    }

    let dx = coord.x - gt[0];
    let dy = coord.y - gt[3];
    let col = ((gt[5] * dx - gt[2] * dy) / det).floor();
    let row = ((gt[1] * dy - gt[4] * dx) / det).floor();

    if col < 0.0 || row < 0.0 || col >= size.0 as f64 || row >= size.1 as f64 {
        return None;
    }
    Some((col as usize, row as usize))
}

/// Inclusive (min col, min row, max col, max row) over the located pixels.
fn pixel_window(pixels: &[Option<(usize, usize)>]) -> Option<(usize, usize, usize, usize)> {
    pixels.iter().flatten().fold(None, |acc, &(col, row)| match acc {
        None => Some((col, row, col, row)),
        Some((c0, r0, c1, r1)) => Some((c0.min(col), r0.min(row), c1.max(col), r1.max(row))),
    })
}

fn is_valid(value: f64, nodata: Option<f64>) -> bool {
    !value.is_nan() && nodata.map_or(true, |nd| value != nd)
}
