use crate::model::{round2, VolumeRecord, VolumeStatus};

/// Combine terrain and surface samples of one building into a [`VolumeRecord`].
///
/// Both slices are indexed like the building's voxel points. A point counts only
/// when both samples are present. The base elevation is the lowest valid terrain
/// sample and each point contributes `max(surface - base, 0)` times the cell area.
pub fn integrate_volume(
    egid: &str,
    terrain: &[Option<f64>],
    surface: &[Option<f64>],
    voxel_size: f64,
    footprint_area: f64,
) -> VolumeRecord {
    debug_assert_eq!(terrain.len(), surface.len());

    if terrain.is_empty() {
        return VolumeRecord::degenerate(egid, footprint_area, VolumeStatus::NoVoxels);
    }

    let valid: Vec<(f64, f64)> = terrain
        .iter()
        .zip(surface)
        .filter_map(|(t, s)| Some(((*t)?, (*s)?)))
        .collect();

    if valid.is_empty() {
        return VolumeRecord::degenerate(egid, footprint_area, VolumeStatus::NoHeightData);
    }

    let base_height = valid
        .iter()
        .map(|&(t, _)| t)
        .fold(f64::INFINITY, f64::min);

    let mut sum = 0.0;
    let mut max_height = 0.0f64;
    for &(_, s) in &valid {
        let h = (s - base_height).max(0.0);
        sum += h;
        max_height = max_height.max(h);
    }

    let volume = sum * voxel_size * voxel_size;
    let mean_height = sum / valid.len() as f64;

    VolumeRecord {
        egid: egid.to_string(),
        volume_m3: round2(volume),
        footprint_area_m2: round2(footprint_area),
        mean_height_m: round2(mean_height),
        max_height_m: Some(round2(max_height)),
        base_height_m: Some(round2(base_height)),
        status: VolumeStatus::Success,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_voxels() {
        let record = integrate_volume("1", &[], &[], 1.0, 0.2);
        assert_eq!(record.status, VolumeStatus::NoVoxels);
        assert_eq!(record.volume_m3, 0.0);
        assert_eq!(record.mean_height_m, 0.0);
        assert_eq!(record.base_height_m, None);
        assert_eq!(record.footprint_area_m2, 0.2);
    }

    #[test]
    fn test_no_height_data_when_samples_never_pair_up() {
        let terrain = [Some(400.0), None, None];
        let surface = [None, Some(410.0), None];
        let record = integrate_volume("2", &terrain, &surface, 1.0, 3.0);
        assert_eq!(record.status, VolumeStatus::NoHeightData);
        assert_eq!(record.volume_m3, 0.0);
        assert_eq!(record.base_height_m, None);
    }

    #[test]
    fn test_constant_heights() {
        let terrain = vec![Some(500.0); 25];
        let surface = vec![Some(512.5); 25];
        let record = integrate_volume("3", &terrain, &surface, 1.0, 25.0);
        assert_eq!(record.status, VolumeStatus::Success);
        assert_eq!(record.volume_m3, 25.0 * 12.5);
        assert_eq!(record.mean_height_m, 12.5);
        assert_eq!(record.max_height_m, Some(12.5));
        assert_eq!(record.base_height_m, Some(500.0));
    }

    #[test]
    fn test_base_is_lowest_terrain_and_noise_is_clamped() {
        let terrain = [Some(101.0), Some(100.0), Some(102.0), None];
        let surface = [Some(111.0), Some(99.0), Some(104.0), Some(150.0)];
        let record = integrate_volume("4", &terrain, &surface, 1.0, 4.0);

        // heights relative to base 100: 11, 0 (clamped from -1), 4; the last point is unpaired
        assert_eq!(record.base_height_m, Some(100.0));
        assert_eq!(record.volume_m3, 15.0);
        assert_eq!(record.mean_height_m, 5.0);
        assert_eq!(record.max_height_m, Some(11.0));
    }

    #[test]
    fn test_surface_below_terrain_everywhere_gives_zero_volume() {
        let terrain = [Some(300.0), Some(300.0)];
        let surface = [Some(299.0), Some(298.5)];
        let record = integrate_volume("5", &terrain, &surface, 1.0, 2.0);
        assert_eq!(record.status, VolumeStatus::Success);
        assert_eq!(record.volume_m3, 0.0);
        assert_eq!(record.max_height_m, Some(0.0));
    }

    #[test]
    fn test_cell_area_scales_volume() {
        let terrain = vec![Some(0.0); 16];
        let surface = vec![Some(3.0); 16];
        let record = integrate_volume("6", &terrain, &surface, 0.5, 4.0);
        assert_eq!(record.volume_m3, 12.0);
        assert_eq!(record.mean_height_m, 3.0);
    }

    #[test]
    fn test_values_are_rounded() {
        let terrain = [Some(10.004)];
        let surface = [Some(13.3333)];
        let record = integrate_volume("7", &terrain, &surface, 1.0, 1.23456);
        assert_eq!(record.base_height_m, Some(10.0));
        assert_eq!(record.footprint_area_m2, 1.23);
        assert_eq!(record.volume_m3, 3.33);
    }
}
