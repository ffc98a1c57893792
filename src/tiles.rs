use std::fmt;
use std::path::{Path, PathBuf};

use geo::Rect;

use crate::error::{Result, VolumeError};
use crate::model::ModelFamily;

/// Integer tile-grid coordinates, rendered as `XXXX_YYYY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileId {
    pub x: i64,
    pub y: i64,
}

impl TileId {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// Tile containing the planar coordinate. Boundaries belong to the upper tile.
    pub fn containing(x: f64, y: f64, tile_size: f64) -> Self {
        Self {
            x: (x / tile_size).floor() as i64,
            y: (y / tile_size).floor() as i64,
        }
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}_{:04}", self.x, self.y)
    }
}

/// All tiles whose cells intersect `bounds`, boundary tiles included.
///
/// Ordered by x, then y.
pub fn tiles_for_bounds(bounds: &Rect<f64>, tile_size: f64) -> Vec<TileId> {
    let min = TileId::containing(bounds.min().x, bounds.min().y, tile_size);
    let max = TileId::containing(bounds.max().x, bounds.max().y, tile_size);

    (min.x..=max.x)
        .flat_map(|x| (min.y..=max.y).map(move |y| TileId::new(x, y)))
        .collect()
}

/// Resolves tile ids to raster files for both model families.
#[derive(Debug, Clone)]
pub struct TileResolver {
    terrain_dir: PathBuf,
    surface_dir: PathBuf,
}

impl TileResolver {
    pub fn new(terrain_dir: impl Into<PathBuf>, surface_dir: impl Into<PathBuf>) -> Self {
        Self {
            terrain_dir: terrain_dir.into(),
            surface_dir: surface_dir.into(),
        }
    }

    /// Like [`TileResolver::new`], but fails when either directory is missing.
    pub fn open(terrain_dir: impl Into<PathBuf>, surface_dir: impl Into<PathBuf>) -> Result<Self> {
        let resolver = Self::new(terrain_dir, surface_dir);
        for family in [ModelFamily::Terrain, ModelFamily::Surface] {
            let dir = resolver.base_dir(family);
            if !dir.is_dir() {
                return Err(VolumeError::TileDirectoryNotFound {
                    family,
                    path: dir.to_path_buf(),
                });
            }
        }
        Ok(resolver)
    }

    pub fn base_dir(&self, family: ModelFamily) -> &Path {
        match family {
            ModelFamily::Terrain => &self.terrain_dir,
            ModelFamily::Surface => &self.surface_dir,
        }
    }

    /// First existing file among the family's historical names, if any.
    pub fn resolve(&self, tile: TileId, family: ModelFamily) -> Option<PathBuf> {
        let tile_name = tile.to_string();
        let base_dir = self.base_dir(family);

        family
            .filename_templates()
            .iter()
            .map(|template| base_dir.join(template.replace("{tile}", &tile_name)))
            .find(|path| path.is_file())
    }

    /// Resolved files for `tiles`, silently skipping tiles without coverage.
    pub fn resolve_all(&self, tiles: &[TileId], family: ModelFamily) -> Vec<(TileId, PathBuf)> {
        tiles
            .iter()
            .filter_map(|&tile| match self.resolve(tile, family) {
                Some(path) => Some((tile, path)),
                None => {
                    tracing::debug!("No {} tile found for {}", family, tile);
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::coord;
    use std::fs::File;
    use tempfile::TempDir;

    #[test]
    fn test_tile_id_format() {
        assert_eq!(TileId::new(2600, 1199).to_string(), "2600_1199");
        assert_eq!(TileId::new(7, 42).to_string(), "0007_0042");
    }

    #[test]
    fn test_tile_boundary_uses_floor() {
        assert_eq!(TileId::containing(2000.0, 500.0, 1000.0), TileId::new(2, 0));
        assert_eq!(TileId::containing(1999.999, 500.0, 1000.0), TileId::new(1, 0));
        assert_eq!(TileId::containing(-0.5, 0.0, 1000.0), TileId::new(-1, 0));
    }

    #[test]
    fn test_bounds_spanning_three_tiles() {
        let bounds = Rect::new(coord! { x: 999.0, y: 10.0 }, coord! { x: 2001.0, y: 20.0 });
        let tiles = tiles_for_bounds(&bounds, 1000.0);
        let xs: Vec<i64> = tiles.iter().map(|t| t.x).collect();
        assert_eq!(xs, vec![0, 1, 2]);
        assert!(tiles.iter().all(|t| t.y == 0));
    }

    #[test]
    fn test_bounds_rectangular_cover() {
        let bounds = Rect::new(
            coord! { x: 2_600_950.0, y: 1_199_990.0 },
            coord! { x: 2_601_010.0, y: 1_200_010.0 },
        );
        let tiles = tiles_for_bounds(&bounds, 1000.0);
        assert_eq!(
            tiles,
            vec![
                TileId::new(2600, 1199),
                TileId::new(2600, 1200),
                TileId::new(2601, 1199),
                TileId::new(2601, 1200),
            ]
        );
    }

    #[test]
    fn test_resolve_prefers_first_template() {
        let terrain = TempDir::new().unwrap();
        let surface = TempDir::new().unwrap();
        let tile = TileId::new(2600, 1200);

        File::create(terrain.path().join("swissALTI3D_2600_1200.tif")).unwrap();
        let resolver = TileResolver::new(terrain.path(), surface.path());
        assert_eq!(
            resolver.resolve(tile, ModelFamily::Terrain),
            Some(terrain.path().join("swissALTI3D_2600_1200.tif"))
        );

        File::create(terrain.path().join("swissalti3d_2019_2600_1200_0.5_2056_5728.tif")).unwrap();
        assert_eq!(
            resolver.resolve(tile, ModelFamily::Terrain),
            Some(terrain.path().join("swissalti3d_2019_2600_1200_0.5_2056_5728.tif"))
        );

        assert_eq!(resolver.resolve(tile, ModelFamily::Surface), None);
    }

    #[test]
    fn test_resolve_all_skips_missing_tiles() {
        let terrain = TempDir::new().unwrap();
        let surface = TempDir::new().unwrap();
        File::create(surface.path().join("swissSURFACE3D_0001_0002.tif")).unwrap();

        let resolver = TileResolver::new(terrain.path(), surface.path());
        let tiles = [TileId::new(1, 2), TileId::new(1, 3)];
        let resolved = resolver.resolve_all(&tiles, ModelFamily::Surface);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].0, TileId::new(1, 2));
    }

    #[test]
    fn test_open_requires_directories() {
        let terrain = TempDir::new().unwrap();
        let missing = terrain.path().join("missing");
        let err = TileResolver::open(terrain.path(), &missing).unwrap_err();
        assert!(matches!(
            err,
            VolumeError::TileDirectoryNotFound {
                family: ModelFamily::Surface,
                ..
            }
        ));
    }
}
