use std::fmt;

use geo::{Area, MultiPolygon};
use serde::{Deserialize, Serialize};

/// The two raster families sampled for every building.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelFamily {
    /// Bare-earth terrain model (swissALTI3D).
    Terrain,
    /// First-surface model including roofs (swissSURFACE3D).
    Surface,
}

impl ModelFamily {
    /// Historical file name templates, most recent first. `{tile}` is replaced by the tile id.
    pub fn filename_templates(&self) -> &'static [&'static str] {
        match self {
            ModelFamily::Terrain => &[
                "swissalti3d_2019_{tile}_0.5_2056_5728.tif",
                "swissALTI3D_{tile}.tif",
            ],
            ModelFamily::Surface => &[
                "swisssurface3d_raster_2019_{tile}_0.5_2056_5728.tif",
                "swissSURFACE3D_{tile}.tif",
            ],
        }
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelFamily::Terrain => write!(f, "terrain (ALTI3D)"),
            ModelFamily::Surface => write!(f, "surface (SURFACE3D)"),
        }
    }
}

/// A building footprint in the working planar CRS (EPSG:2056).
#[derive(Debug, Clone, PartialEq)]
pub struct Building {
    pub egid: String,
    pub footprint: MultiPolygon<f64>,
}

impl Building {
    pub fn new(egid: impl Into<String>, footprint: impl Into<MultiPolygon<f64>>) -> Self {
        Self {
            egid: egid.into(),
            footprint: footprint.into(),
        }
    }

    pub fn footprint_area(&self) -> f64 {
        self.footprint.unsigned_area()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeStatus {
    Success,
    NoVoxels,
    NoHeightData,
}

impl VolumeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VolumeStatus::Success => "success",
            VolumeStatus::NoVoxels => "no_voxels",
            VolumeStatus::NoHeightData => "no_height_data",
        }
    }
}

impl fmt::Display for VolumeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of the volume estimation for one building.
///
/// `base_height_m` and `max_height_m` are only defined for [`VolumeStatus::Success`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeRecord {
    #[serde(rename = "EGID")]
    pub egid: String,
    pub volume_m3: f64,
    pub footprint_area_m2: f64,
    pub mean_height_m: f64,
    pub max_height_m: Option<f64>,
    pub base_height_m: Option<f64>,
    pub status: VolumeStatus,
}

impl VolumeRecord {
    /// Record for a building that could not be measured.
    pub fn degenerate(egid: impl Into<String>, footprint_area: f64, status: VolumeStatus) -> Self {
        Self {
            egid: egid.into(),
            volume_m3: 0.0,
            footprint_area_m2: round2(footprint_area),
            mean_height_m: 0.0,
            max_height_m: None,
            base_height_m: None,
            status,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == VolumeStatus::Success
    }
}

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
