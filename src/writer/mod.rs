use anyhow::{Context, Result};
use gdal::spatial_ref::SpatialRef;
use gdal::vector::{Feature, FieldValue, LayerAccess, LayerOptions, OGRFieldType, OGRwkbGeometryType, ToGdal};
use gdal::DriverManager;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::loader::WORKING_EPSG;
use crate::model::{Building, VolumeRecord};

const OUTPUT_LAYER: &str = "buildings";

#[derive(Default)]
pub struct ResultWriter {}

impl ResultWriter {
    pub fn new() -> Self {
        Self {}
    }

    /// Write the records as a CSV table, one row per record.
    pub fn write_csv(&self, records: &[VolumeRecord], output_path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(output_path)
            .with_context(|| format!("Failed to create {:?}", output_path))?;

        for record in records {
            writer
                .serialize(record)
                .with_context(|| format!("Failed to write record for {}", record.egid))?;
        }
        writer.flush().context("Failed to flush CSV output")?;

        tracing::info!("Results saved to: {:?}", output_path);
        Ok(())
    }

    /// Write every building footprint with its record joined by EGID.
    ///
    /// Buildings without a record keep only their EGID. An existing file is replaced.
    pub fn write_geopackage(
        &self,
        buildings: &[Building],
        records: &[VolumeRecord],
        output_path: &Path,
    ) -> Result<()> {
        let mut by_egid: HashMap<&str, &VolumeRecord> = HashMap::new();
        for record in records {
            by_egid.entry(record.egid.as_str()).or_insert(record);
        }

        if output_path.exists() {
            fs::remove_file(output_path)
                .with_context(|| format!("Failed to replace {:?}", output_path))?;
        }

        // Get the GPKG driver
        let driver =
            DriverManager::get_driver_by_name("GPKG").context("Failed to get GPKG driver")?;
        let mut dataset = driver
            .create_vector_only(output_path)
            .context("Failed to create dataset")?;

        let srs = SpatialRef::from_epsg(WORKING_EPSG)
            .context(format!("Failed to create SpatialRef from EPSG:{}", WORKING_EPSG))?;
        let layer = dataset
            .create_layer(LayerOptions {
                name: OUTPUT_LAYER,
                srs: Some(&srs),
                ty: OGRwkbGeometryType::wkbMultiPolygon,
                ..Default::default()
            })
            .context("Failed to create layer")?;

        layer
            .create_defn_fields(&[
                ("EGID", OGRFieldType::OFTString),
                ("volume_m3", OGRFieldType::OFTReal),
                ("footprint_area_m2", OGRFieldType::OFTReal),
                ("mean_height_m", OGRFieldType::OFTReal),
                ("max_height_m", OGRFieldType::OFTReal),
                ("base_height_m", OGRFieldType::OFTReal),
                ("status", OGRFieldType::OFTString),
            ])
            .context("Failed to create fields")?;

        for building in buildings {
            let geometry = building
                .footprint
                .to_gdal()
                .with_context(|| format!("Failed to convert geometry of {}", building.egid))?;

            let (names, values) = feature_fields(building, by_egid.get(building.egid.as_str()).copied());
            (|| -> gdal::errors::Result<()> {
                let mut feature = Feature::new(layer.defn())?;
                feature.set_geometry(geometry)?;
                for (name, value) in names.iter().zip(values.iter()) {
                    let idx = feature.field_index(name)?;
                    feature.set_field(idx, value)?;
                }
                feature.create(&layer)
            })()
            .with_context(|| format!("Failed to write feature {}", building.egid))?;
        }

        tracing::info!("GeoPackage saved to: {:?}", output_path);
        Ok(())
    }
}

/// Field names and values for one output feature; undefined values stay null.
fn feature_fields(
    building: &Building,
    record: Option<&VolumeRecord>,
) -> (Vec<&'static str>, Vec<FieldValue>) {
    let mut names = vec!["EGID"];
    let mut values = vec![FieldValue::StringValue(building.egid.clone())];

    if let Some(record) = record {
        let reals = [
            ("volume_m3", Some(record.volume_m3)),
            ("footprint_area_m2", Some(record.footprint_area_m2)),
            ("mean_height_m", Some(record.mean_height_m)),
            ("max_height_m", record.max_height_m),
            ("base_height_m", record.base_height_m),
        ];
        for (name, value) in reals {
            if let Some(value) = value {
                names.push(name);
                values.push(FieldValue::RealValue(value));
            }
        }
        names.push("status");
        values.push(FieldValue::StringValue(record.status.to_string()));
    }

    (names, values)
}
