use std::path::Path;

use gdal::spatial_ref::SpatialRef;
use gdal::vector::{Geometry as GdalGeometry, LayerAccess};
use gdal::Dataset;
use geo::{Geometry, Intersects, MultiPolygon, Rect};

use crate::error::{Result, VolumeError};
use crate::model::Building;

/// Working planar CRS (CH1903+ / LV95).
pub const WORKING_EPSG: u32 = 2056;
pub const DEFAULT_LAYER: &str = "lcsf";

const TYPE_FIELD: &str = "Art";
const BUILDING_TYPE: &str = "Gebaeude";
const ID_FIELD: &str = "EGID";

/// Load the building footprints from the land cover layer of an AV GeoPackage.
///
/// Only features whose `Art` is `Gebaeude` are kept. Geometries are reprojected
/// to EPSG:2056 when the layer uses another CRS. Buildings without an `EGID`
/// get `building_{i}`, `i` being their position among the kept features.
pub fn load_buildings(path: &Path, layer_name: &str) -> Result<Vec<Building>> {
    if !path.is_file() {
        return Err(VolumeError::DatasetNotFound(path.to_path_buf()));
    }

    tracing::info!("Loading buildings from {:?}", path);
    let dataset = Dataset::open(path)?;
    let mut layer = dataset
        .layer_by_name(layer_name)
        .map_err(|_| VolumeError::LayerNotFound(layer_name.to_string()))?;

    let field_names: Vec<String> = layer.defn().fields().map(|field| field.name()).collect();
    let type_idx = field_names
        .iter()
        .position(|name| name == TYPE_FIELD)
        .ok_or_else(|| VolumeError::MissingAttribute {
            layer: layer_name.to_string(),
            field: TYPE_FIELD.to_string(),
        })?;
    let id_idx = field_names.iter().position(|name| name == ID_FIELD);
    if id_idx.is_none() {
        tracing::warn!("Layer '{}' has no {} attribute, using ordinals", layer_name, ID_FIELD);
    }

    let target = target_srs(layer.spatial_ref())?;

    let mut buildings = Vec::new();
    let mut skipped = 0usize;
    for feature in layer.features() {
        if feature.field_as_string(type_idx)?.as_deref() != Some(BUILDING_TYPE) {
            continue;
        }

        let ordinal = buildings.len();
        let egid = match id_idx {
            Some(idx) => feature.field_as_string(idx)?.filter(|id| !id.is_empty()),
            None => None,
        }
        .unwrap_or_else(|| format!("building_{ordinal}"));

        let footprint = match feature.geometry() {
            Some(geometry) => to_footprint(geometry, target.as_ref())?,
            None => None,
        };
        match footprint {
            Some(footprint) => buildings.push(Building { egid, footprint }),
            None => {
                tracing::warn!("Skipping building {}: no polygon geometry", egid);
                skipped += 1;
            }
        }
    }

    tracing::info!("Found {} buildings ({} skipped)", buildings.len(), skipped);
    Ok(buildings)
}

/// Target CRS when the layer is not already in the working CRS.
fn target_srs(source: Option<SpatialRef>) -> Result<Option<SpatialRef>> {
    match source {
        Some(srs) if srs.auth_code().ok() != Some(WORKING_EPSG as i32) => {
            tracing::info!("Reprojecting buildings to EPSG:{}", WORKING_EPSG);
            Ok(Some(SpatialRef::from_epsg(WORKING_EPSG)?))
        }
        _ => Ok(None),
    }
}

fn to_footprint(
    geometry: &GdalGeometry,
    target: Option<&SpatialRef>,
) -> Result<Option<MultiPolygon<f64>>> {
    let geometry = match target {
        Some(srs) => geometry.transform_to(srs)?.to_geo()?,
        None => geometry.to_geo()?,
    };
    Ok(match geometry {
        Geometry::Polygon(polygon) => Some(MultiPolygon::new(vec![polygon])),
        Geometry::MultiPolygon(multi) => Some(multi),
        _ => None,
    })
}

/// Buildings whose footprint intersects `bbox`.
pub fn filter_by_bbox(buildings: Vec<Building>, bbox: Rect<f64>) -> Vec<Building> {
    let window = bbox.to_polygon();
    buildings
        .into_iter()
        .filter(|building| building.footprint.intersects(&window))
        .collect()
}
