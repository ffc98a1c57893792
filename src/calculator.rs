use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use geo::BoundingRect;
use rayon::prelude::*;

use crate::config::VolumeConfig;
use crate::error::{Result, VolumeError};
use crate::model::{Building, ModelFamily, VolumeRecord, VolumeStatus};
use crate::sampler::RasterSampler;
use crate::tiles::{tiles_for_bounds, TileResolver};
use crate::voxel::create_voxel_points;
use crate::volume::integrate_volume;

/// Cooperative stop flag, checked between buildings.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-building volume estimation over a pair of tile stores.
#[derive(Debug, Clone)]
pub struct VolumeCalculator {
    config: VolumeConfig,
    sampler: RasterSampler,
}

impl VolumeCalculator {
    pub fn new(config: VolumeConfig, resolver: TileResolver) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            sampler: RasterSampler::new(resolver),
        })
    }

    pub fn config(&self) -> &VolumeConfig {
        &self.config
    }

    /// Voxelize, sample both models and integrate one building.
    pub fn calculate_building_volume(&self, building: &Building) -> VolumeRecord {
        let footprint_area = building.footprint_area();
        let points = create_voxel_points(&building.footprint, self.config.voxel_size);

        let bounds = match building.footprint.bounding_rect() {
            Some(bounds) if !points.is_empty() => bounds,
            _ => {
                tracing::debug!("Building {} has no voxels", building.egid);
                return VolumeRecord::degenerate(
                    &building.egid,
                    footprint_area,
                    VolumeStatus::NoVoxels,
                );
            }
        };

        let tiles = tiles_for_bounds(&bounds, self.config.tile_size);
        let terrain = self.sampler.sample_heights(&points, &tiles, ModelFamily::Terrain);
        let surface = self.sampler.sample_heights(&points, &tiles, ModelFamily::Surface);

        let record = integrate_volume(
            &building.egid,
            &terrain,
            &surface,
            self.config.voxel_size,
            footprint_area,
        );
        tracing::debug!(
            "Building {}: {} voxels over {} tiles, status {}",
            building.egid,
            points.len(),
            tiles.len(),
            record.status
        );
        record
    }

    /// Process buildings one after another, in input order.
    ///
    /// `limit` keeps only the first `n` buildings.
    pub fn process_buildings(
        &self,
        buildings: &[Building],
        limit: Option<usize>,
        cancel: &CancellationToken,
    ) -> Result<Vec<VolumeRecord>> {
        let buildings = apply_limit(buildings, limit);
        let total = buildings.len();
        let mut records = Vec::with_capacity(total);

        for (i, building) in buildings.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(VolumeError::Cancelled(i));
            }
            tracing::debug!("Processing building {}/{}", i + 1, total);
            records.push(self.calculate_building_volume(building));
        }

        tracing::info!("Processed {} buildings", total);
        Ok(records)
    }

    /// Same as [`VolumeCalculator::process_buildings`] on rayon's pool.
    ///
    /// Records keep the input order.
    pub fn process_buildings_parallel(
        &self,
        buildings: &[Building],
        limit: Option<usize>,
        cancel: &CancellationToken,
    ) -> Result<Vec<VolumeRecord>> {
        let buildings = apply_limit(buildings, limit);
        let total = buildings.len();
        let done = AtomicUsize::new(0);

        let records: Vec<Option<VolumeRecord>> = buildings
            .par_iter()
            .map(|building| {
                if cancel.is_cancelled() {
                    return None;
                }
                let record = self.calculate_building_volume(building);
                let n = done.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::debug!("Processed building {}/{}", n, total);
                Some(record)
            })
            .collect();

        if cancel.is_cancelled() || records.iter().any(Option::is_none) {
            return Err(VolumeError::Cancelled(done.into_inner()));
        }

        tracing::info!("Processed {} buildings", total);
        Ok(records.into_iter().flatten().collect())
    }
}

/// First `limit` buildings; a limit of 0 means no limit.
fn apply_limit(buildings: &[Building], limit: Option<usize>) -> &[Building] {
    match limit {
        Some(n) if n > 0 => &buildings[..n.min(buildings.len())],
        _ => buildings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;
    use tempfile::TempDir;

    fn calculator(dir: &TempDir) -> VolumeCalculator {
        VolumeCalculator::new(
            VolumeConfig::default(),
            TileResolver::new(dir.path(), dir.path()),
        )
        .unwrap()
    }

    fn unit_square(egid: &str, x0: f64) -> Building {
        Building::new(
            egid,
            polygon![
                (x: x0, y: 0.0),
                (x: x0 + 2.0, y: 0.0),
                (x: x0 + 2.0, y: 2.0),
                (x: x0, y: 2.0),
            ],
        )
    }

    #[test]
    fn test_rejects_invalid_config() {
        let dir = TempDir::new().unwrap();
        let config = VolumeConfig {
            tile_size: -1.0,
            voxel_size: 1.0,
        };
        assert!(VolumeCalculator::new(config, TileResolver::new(dir.path(), dir.path())).is_err());
    }

    #[test]
    fn test_building_without_tiles_has_no_height_data() {
        let dir = TempDir::new().unwrap();
        let record = calculator(&dir).calculate_building_volume(&unit_square("42", 10.0));
        assert_eq!(record.egid, "42");
        assert_eq!(record.status, VolumeStatus::NoHeightData);
        assert_eq!(record.volume_m3, 0.0);
        assert_eq!(record.footprint_area_m2, 4.0);
    }

    #[test]
    fn test_sliver_has_no_voxels() {
        let dir = TempDir::new().unwrap();
        let sliver = Building::new(
            "s",
            polygon![
                (x: 0.1, y: 0.1),
                (x: 0.3, y: 0.1),
                (x: 0.3, y: 0.2),
            ],
        );
        let record = calculator(&dir).calculate_building_volume(&sliver);
        assert_eq!(record.status, VolumeStatus::NoVoxels);
    }

    #[test]
    fn test_batch_keeps_order_and_cardinality() {
        let dir = TempDir::new().unwrap();
        let calc = calculator(&dir);
        let buildings: Vec<Building> = (0..5)
            .map(|i| unit_square(&format!("b{i}"), i as f64 * 10.0))
            .collect();
        let cancel = CancellationToken::new();

        let records = calc.process_buildings(&buildings, None, &cancel).unwrap();
        let ids: Vec<&str> = records.iter().map(|r| r.egid.as_str()).collect();
        assert_eq!(ids, vec!["b0", "b1", "b2", "b3", "b4"]);

        let parallel = calc.process_buildings_parallel(&buildings, None, &cancel).unwrap();
        assert_eq!(parallel, records);
    }

    #[test]
    fn test_limit() {
        let dir = TempDir::new().unwrap();
        let calc = calculator(&dir);
        let buildings: Vec<Building> = (0..4).map(|i| unit_square(&i.to_string(), 0.0)).collect();
        let cancel = CancellationToken::new();

        assert_eq!(calc.process_buildings(&buildings, Some(2), &cancel).unwrap().len(), 2);
        assert_eq!(calc.process_buildings(&buildings, Some(10), &cancel).unwrap().len(), 4);
        assert_eq!(calc.process_buildings(&buildings, Some(0), &cancel).unwrap().len(), 4);
        assert_eq!(
            calc.process_buildings_parallel(&buildings, Some(3), &cancel)
                .unwrap()
                .len(),
            3
        );
    }

    #[test]
    fn test_cancelled_batch_stops() {
        let dir = TempDir::new().unwrap();
        let calc = calculator(&dir);
        let buildings = vec![unit_square("a", 0.0), unit_square("b", 5.0)];
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert!(matches!(
            calc.process_buildings(&buildings, None, &cancel),
            Err(VolumeError::Cancelled(0))
        ));
        assert!(matches!(
            calc.process_buildings_parallel(&buildings, None, &cancel),
            Err(VolumeError::Cancelled(_))
        ));
    }
}
