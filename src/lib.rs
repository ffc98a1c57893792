pub mod calculator;
pub mod config;
pub mod error;
pub mod loader;
pub mod model;
pub mod sampler;
pub mod summary;
pub mod tiles;
pub mod volume;
pub mod voxel;
pub mod writer;

pub use calculator::{CancellationToken, VolumeCalculator};
pub use config::VolumeConfig;
pub use error::{Result, VolumeError};
pub use model::{Building, ModelFamily, VolumeRecord, VolumeStatus};
pub use summary::BatchSummary;
pub use tiles::{TileId, TileResolver};
pub use writer::ResultWriter;
