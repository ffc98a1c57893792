use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::model::ModelFamily;

#[derive(Error, Debug)]
pub enum VolumeError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),

    #[error("Vector dataset not found: {}", .0.display())]
    DatasetNotFound(PathBuf),

    #[error("{family} tile directory not found: {}", .path.display())]
    TileDirectoryNotFound { family: ModelFamily, path: PathBuf },

    #[error("Layer '{0}' not found in vector dataset")]
    LayerNotFound(String),

    #[error("Layer '{layer}' has no '{field}' attribute")]
    MissingAttribute { layer: String, field: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Processing cancelled after {0} buildings")]
    Cancelled(usize),
}

pub type Result<T> = std::result::Result<T, VolumeError>;
