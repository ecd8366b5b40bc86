//! Radiation map tile generator.
//!
//! Turns measurement CSV exports into slippy-map tile pyramids, either by
//! drawing per-point dots through the disk-spilling tile cache or by
//! interpolating a dense grid and rasterizing it zoom by zoom.

mod descriptor;
mod ingest;

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use grid_builder::{read_grid, write_grid, GridBuilder, GridBuilderConfig};
use renderer::{rasterize_zoom, PointRenderer, PointRendererConfig, RasterizeOptions};
use storage::{TileBufferCache, TileLayout};
use tile_common::{BoundingBox, ColorLegend, DEFAULT_CPM_PER_USVH};

use descriptor::TilesetDescriptor;
use ingest::{load_measurements, stream_measurements, IngestOptions};

#[derive(Parser, Debug)]
#[command(name = "tilegen")]
#[command(about = "Map tile generator for radiation measurement data")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Color legend JSON file (default: built-in Safecast table)
    #[arg(long, global = true)]
    legend: Option<PathBuf>,

    /// Divisor converting raw counts to dose rates before classification
    #[arg(long, global = true, default_value_t = DEFAULT_CPM_PER_USVH)]
    calibration_factor: f64,

    /// Log level
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Draw per-measurement dots into a tile pyramid at one zoom level
    Points {
        /// Input CSV measurements file
        input_csv: PathBuf,
        /// Directory to write tiles into
        output_dir: PathBuf,

        /// Zoom level to generate tiles for
        #[arg(long)]
        zoom: u32,

        /// Tile edge length in pixels
        #[arg(long, default_value = "256")]
        tile_size: u32,

        /// Dot radius in pixels
        #[arg(long, default_value = "1")]
        dot_radius: u32,

        /// Memory budget for resident tile buffers, in MiB
        #[arg(long, default_value = "1024")]
        memory_budget_mb: u64,

        /// Unit a CSV row must carry to be accepted
        #[arg(long, default_value = "cpm")]
        unit: String,

        #[command(flatten)]
        extent: ExtentArgs,
    },

    /// Interpolate measurements into a dense grid artifact
    Interpolate {
        /// Input CSV measurements file
        input_csv: PathBuf,
        /// Output grid artifact path (sidecar written alongside)
        output_grid: PathBuf,

        /// Grid rows
        #[arg(long, default_value = "512")]
        rows: usize,

        /// Grid columns
        #[arg(long, default_value = "512")]
        cols: usize,

        /// Inverse-distance weighting power
        #[arg(long, default_value = "2.0")]
        power: f64,

        /// Neighbor search radius in degrees
        #[arg(long, default_value = "0.05")]
        radius: f64,

        /// Unit a CSV row must carry to be accepted
        #[arg(long, default_value = "cpm")]
        unit: String,

        #[command(flatten)]
        extent: ExtentArgs,
    },

    /// Rasterize a grid artifact into tiles at one or more zoom levels
    Rasterize {
        /// Grid artifact path
        input_grid: PathBuf,
        /// Directory to write tiles into
        output_dir: PathBuf,

        /// Zoom level(s) to rasterize, repeatable
        #[arg(long, required = true)]
        zoom: Vec<u32>,

        /// Tile edge length in pixels
        #[arg(long, default_value = "256")]
        tile_size: u32,
    },
}

/// Optional geographic extent; all four bounds or none.
#[derive(clap::Args, Debug)]
struct ExtentArgs {
    #[arg(long)]
    min_lon: Option<f64>,
    #[arg(long)]
    max_lon: Option<f64>,
    #[arg(long)]
    min_lat: Option<f64>,
    #[arg(long)]
    max_lat: Option<f64>,
}

impl ExtentArgs {
    fn bbox(&self) -> Result<Option<BoundingBox>> {
        match (self.min_lon, self.min_lat, self.max_lon, self.max_lat) {
            (Some(min_lon), Some(min_lat), Some(max_lon), Some(max_lat)) => {
                if min_lon >= max_lon || min_lat >= max_lat {
                    bail!("extent minimums must be strictly below maximums");
                }
                Ok(Some(BoundingBox::new(min_lon, min_lat, max_lon, max_lat)))
            }
            (None, None, None, None) => Ok(None),
            _ => bail!("extent requires all of --min-lon --max-lon --min-lat --max-lat"),
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let legend = load_legend(&args)?;
    let calibration = args.calibration_factor;
    if calibration <= 0.0 {
        bail!("--calibration-factor must be positive");
    }

    match args.command {
        Command::Points {
            input_csv,
            output_dir,
            zoom,
            tile_size,
            dot_radius,
            memory_budget_mb,
            unit,
            extent,
        } => run_points(
            input_csv,
            output_dir,
            legend,
            PointRendererConfig {
                zoom,
                tile_size,
                dot_radius,
                calibration,
            },
            memory_budget_mb,
            IngestOptions {
                unit,
                extent: extent.bbox()?,
            },
        ),
        Command::Interpolate {
            input_csv,
            output_grid,
            rows,
            cols,
            power,
            radius,
            unit,
            extent,
        } => run_interpolate(
            input_csv,
            output_grid,
            GridBuilderConfig {
                rows,
                cols,
                bbox: extent.bbox()?,
                power,
                radius,
                ..GridBuilderConfig::default()
            },
            unit,
        ),
        Command::Rasterize {
            input_grid,
            output_dir,
            zoom,
            tile_size,
        } => run_rasterize(
            input_grid,
            output_dir,
            legend,
            zoom,
            RasterizeOptions {
                tile_size,
                calibration,
            },
        ),
    }
}

fn load_legend(args: &Args) -> Result<ColorLegend> {
    match &args.legend {
        Some(path) => {
            let legend = ColorLegend::from_file(path)?;
            info!(path = %path.display(), "loaded legend file");
            Ok(legend)
        }
        None => Ok(ColorLegend::safecast()),
    }
}

fn run_points(
    input_csv: PathBuf,
    output_dir: PathBuf,
    legend: ColorLegend,
    config: PointRendererConfig,
    memory_budget_mb: u64,
    ingest: IngestOptions,
) -> Result<()> {
    info!(
        input = %input_csv.display(),
        output = %output_dir.display(),
        zoom = config.zoom,
        "starting point tile generation"
    );

    let cache = TileBufferCache::new(
        TileLayout::new(&output_dir),
        config.tile_size,
        memory_budget_mb * 1024 * 1024,
    )?;
    let template = TileLayout::url_template().to_string();
    let zoom = config.zoom;
    let tile_size = config.tile_size;

    // Rows stream straight into the renderer; the cache bounds memory, not
    // the input size. A missing input fails here before any tile is written.
    let mut renderer = PointRenderer::new(cache, legend, config);
    stream_measurements(&input_csv, &ingest, |m| {
        renderer.render(&m)?;
        Ok(())
    })?;
    let report = renderer.finish();

    TilesetDescriptor::new(zoom, tile_size, template, report.bounds).write(&output_dir)?;

    if report.points_skipped > 0 {
        warn!(skipped = report.points_skipped, "points outside projectable latitude band");
    }
    if !report.failed.is_empty() {
        for tile in &report.failed {
            warn!(tile = %tile.coord, error = %tile.error, "tile not persisted");
        }
        bail!("{} tiles failed to persist", report.failed.len());
    }
    info!(drawn = report.points_drawn, "point tile generation complete");
    Ok(())
}

fn run_interpolate(
    input_csv: PathBuf,
    output_grid: PathBuf,
    config: GridBuilderConfig,
    unit: String,
) -> Result<()> {
    info!(
        input = %input_csv.display(),
        output = %output_grid.display(),
        rows = config.rows,
        cols = config.cols,
        "starting grid interpolation"
    );

    // An explicit grid extent also clips ingestion, widened by the search
    // radius so points just outside still contribute to edge cells.
    let ingest = IngestOptions {
        unit,
        extent: config.bbox.map(|b| b.expand(config.radius)),
    };
    let (points, _) = load_measurements(&input_csv, &ingest)?;
    let builder = GridBuilder::new(config)?;
    let grid = builder.build(points);
    info!(coverage_pct = grid.coverage() * 100.0, "grid built");

    write_grid(&grid, &output_grid)?;
    info!(path = %output_grid.display(), "grid artifact written");
    Ok(())
}

fn run_rasterize(
    input_grid: PathBuf,
    output_dir: PathBuf,
    legend: ColorLegend,
    zooms: Vec<u32>,
    opts: RasterizeOptions,
) -> Result<()> {
    let grid = read_grid(&input_grid)?;
    let layout = TileLayout::new(&output_dir);
    let template = TileLayout::url_template().to_string();
    let bounds = grid.bounding_box();

    let mut failures = 0usize;
    for &zoom in &zooms {
        let summary = rasterize_zoom(&grid, &legend, &layout, zoom, &opts)?;
        failures += summary.failed.len();
        for tile in &summary.failed {
            warn!(tile = %tile.coord, error = %tile.error, "tile not written");
        }
    }

    let min_zoom = zooms.iter().copied().min().unwrap_or(0);
    let max_zoom = zooms.iter().copied().max().unwrap_or(0);
    let mut desc = TilesetDescriptor::new(min_zoom, opts.tile_size, template, Some(bounds));
    desc.max_zoom = max_zoom;
    desc.write(&output_dir)?;

    if failures > 0 {
        bail!("{failures} tiles failed to write");
    }
    info!(zooms = ?zooms, "rasterization complete");
    Ok(())
}
