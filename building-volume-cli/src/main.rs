use anyhow::Result;
use building_volume::config::{DEFAULT_TILE_SIZE, DEFAULT_VOXEL_SIZE};
use building_volume::loader::{filter_by_bbox, load_buildings, DEFAULT_LAYER};
use building_volume::{
    BatchSummary, CancellationToken, ResultWriter, TileResolver, VolumeCalculator, VolumeConfig,
};
use clap::Parser;
use rayon::ThreadPoolBuilder;
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Calculate building volumes from Swiss geodata",
    long_about = None
)]
struct Args {
    /// Path to the AV GeoPackage (av_2056.gpkg)
    #[arg(value_name = "AV_GPKG")]
    av_gpkg: PathBuf,

    /// Directory containing swissALTI3D tiles
    #[arg(value_name = "ALTI3D_DIR")]
    alti3d_dir: PathBuf,

    /// Directory containing swissSURFACE3D tiles
    #[arg(value_name = "SURFACE3D_DIR")]
    surface3d_dir: PathBuf,

    /// Output CSV file
    #[arg(short, long, default_value = "building_volumes.csv")]
    output: PathBuf,

    /// Output GeoPackage file with geometries
    #[arg(short, long)]
    gpkg: Option<PathBuf>,

    /// Limit number of buildings to process (0 means no limit)
    #[arg(short, long)]
    limit: Option<usize>,

    /// Process only buildings within bounding box
    #[arg(
        short,
        long,
        num_args = 4,
        value_names = ["MINX", "MINY", "MAXX", "MAXY"],
        allow_negative_numbers = true
    )]
    bbox: Option<Vec<f64>>,

    /// Number of worker threads (default: number of CPU cores)
    #[arg(short, long)]
    threads: Option<usize>,

    /// Land cover layer holding the building footprints
    #[arg(long, default_value = DEFAULT_LAYER)]
    layer: String,

    /// Voxel edge length in meters
    #[arg(long, default_value_t = DEFAULT_VOXEL_SIZE)]
    voxel_size: f64,

    /// Raster tile edge length in meters
    #[arg(long, default_value_t = DEFAULT_TILE_SIZE)]
    tile_size: f64,
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let start_time = std::time::Instant::now();

    if let Some(threads) = args.threads {
        ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .expect("Failed to build thread pool");
    }

    // Validate inputs
    if !args.av_gpkg.is_file() {
        error!("AV file not found: {:?}", args.av_gpkg);
        anyhow::bail!("AV file not found: {}", args.av_gpkg.display());
    }
    let resolver = TileResolver::open(&args.alti3d_dir, &args.surface3d_dir)?;

    let config = VolumeConfig {
        tile_size: args.tile_size,
        voxel_size: args.voxel_size,
    };
    let calculator = VolumeCalculator::new(config, resolver)?;

    let mut buildings = load_buildings(&args.av_gpkg, &args.layer)?;

    if let Some(bbox) = bbox_from_args(args.bbox.as_deref())? {
        buildings = filter_by_bbox(buildings, bbox);
        info!("Filtered to {} buildings within bounding box", buildings.len());
    }

    let cancel = CancellationToken::new();
    let records = calculator.process_buildings_parallel(&buildings, args.limit, &cancel)?;

    ResultWriter::new().write_csv(&records, &args.output)?;
    if let Some(gpkg) = &args.gpkg {
        ResultWriter::new().write_geopackage(&buildings, &records, gpkg)?;
    }

    BatchSummary::from_records(&records).log();

    info!("Total processing time: {:?}", start_time.elapsed());
    Ok(())
}

fn bbox_from_args(values: Option<&[f64]>) -> Result<Option<geo::Rect<f64>>> {
    let Some(values) = values else {
        return Ok(None);
    };
    let [minx, miny, maxx, maxy] = values else {
        anyhow::bail!("--bbox expects 4 values, got {}", values.len());
    };
    if minx > maxx || miny > maxy {
        anyhow::bail!("Invalid bounding box: min corner must not exceed max corner");
    }
    Ok(Some(geo::Rect::new(
        geo::coord! { x: *minx, y: *miny },
        geo::coord! { x: *maxx, y: *maxy },
    )))
}
