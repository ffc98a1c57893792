use crate::error::{Result, VolumeError};

pub const DEFAULT_TILE_SIZE: f64 = 1000.0;
pub const DEFAULT_VOXEL_SIZE: f64 = 1.0;

/// Discretization constants shared by the whole pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeConfig {
    /// Edge length of one raster tile in planar units.
    pub tile_size: f64,
    /// Edge length of one voxel cell in planar units.
    pub voxel_size: f64,
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            tile_size: DEFAULT_TILE_SIZE,
            voxel_size: DEFAULT_VOXEL_SIZE,
        }
    }
}

impl VolumeConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("tile_size", self.tile_size), ("voxel_size", self.voxel_size)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(VolumeError::InvalidConfig(format!(
                    "{name} must be a positive number, got {value}"
                )));
            }
        }
        Ok(())
    }

    /// Planar area represented by one voxel.
    pub fn cell_area(&self) -> f64 {
        self.voxel_size * self.voxel_size
    }
}
