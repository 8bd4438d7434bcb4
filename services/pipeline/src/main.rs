//! surfmap: LiDAR + orthophoto surface classification pipeline.
//!
//! Subcommands wrap the core crates one stage at a time; `run` drives
//! whole batches of tiles in parallel from a YAML config.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use classification::RandomForestModel;
use kernel_features::{EdgeMode, FeatureKind};
use pipeline::{config::RunConfig, ops, runner};
use surf_common::BoundingBox;

#[derive(Parser, Debug)]
#[command(name = "surfmap")]
#[command(about = "Surface classification from LiDAR-derived rasters")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Produce input rasters from LiDAR
    Prepare {
        #[command(subcommand)]
        command: PrepareCommand,
    },
    /// Apply a trained classifier to feature rasters
    Classify {
        #[command(subcommand)]
        command: ClassifyCommand,
    },
    /// Post-process classified rasters
    Extract {
        #[command(subcommand)]
        command: ExtractCommand,
    },
    /// Run a whole batch of tiles from a YAML config
    Run {
        /// Path to the run configuration
        config: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
enum PrepareCommand {
    /// Rasterize point dimensions from LAS/LAZ files
    Lidargrid {
        /// Output extent as xmin,ymin,xmax,ymax
        #[arg(long)]
        bbox: String,

        /// Cell size in world units
        #[arg(long)]
        resolution: f64,

        /// Dimension to rasterize (repeatable)
        #[arg(short = 'd', long = "dimension", required = true)]
        dimensions: Vec<String>,

        /// Output filename prefix
        #[arg(long, default_value = "")]
        prefix: String,

        /// Output filename postfix
        #[arg(long, default_value = "")]
        postfix: String,

        /// Output directory
        outdir: PathBuf,

        /// Input LAS/LAZ files
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Compute neighborhood statistics over a raster
    Extractfeatures {
        /// Window extent as xmin,ymin,xmax,ymax
        #[arg(long)]
        bbox: String,

        /// Neighborhood size (odd, at most 13)
        #[arg(short = 'n', long, default_value_t = 5)]
        neighborhood: usize,

        /// Edge handling: crop or reflect
        #[arg(long, default_value = "crop")]
        edge_mode: String,

        /// Feature to compute: mean, var or diffmean (repeatable)
        #[arg(short = 'f', long = "feature", required = true)]
        features: Vec<String>,

        /// Output filename prefix
        #[arg(long, default_value = "")]
        prefix: String,

        /// Output filename postfix
        #[arg(long, default_value = "")]
        postfix: String,

        /// Input raster
        raster: PathBuf,

        /// Output directory
        outdir: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
enum ClassifyCommand {
    /// Classify stacked feature rasters with a random forest
    Randomforest {
        /// Window extent as xmin,ymin,xmax,ymax
        #[arg(long)]
        bbox: String,

        /// Feature raster, in model band order (repeatable)
        #[arg(short = 'f', long = "feature-raster", required = true)]
        rasters: Vec<PathBuf>,

        /// Also write a confidence raster
        #[arg(long)]
        prob: bool,

        /// Random forest model JSON
        model: PathBuf,

        /// Output directory
        outdir: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
enum ExtractCommand {
    /// Smooth a classified raster and fill its nodata holes
    Denoise {
        /// Window extent as xmin,ymin,xmax,ymax
        #[arg(long)]
        bbox: String,

        /// Classified raster (8-bit class labels)
        raster: PathBuf,

        /// Output directory
        outdir: PathBuf,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

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

    match args.command {
        Command::Prepare { command } => prepare(command),
        Command::Classify { command } => classify(command),
        Command::Extract { command } => extract(command),
        Command::Run { config } => run(config),
    }
}

fn parse_bbox(s: &str) -> Result<BoundingBox> {
    BoundingBox::from_arg_string(s).with_context(|| format!("invalid --bbox '{s}'"))
}

fn prepare(command: PrepareCommand) -> Result<()> {
    match command {
        PrepareCommand::Lidargrid {
            bbox,
            resolution,
            dimensions,
            prefix,
            postfix,
            outdir,
            files,
        } => {
            let bbox = parse_bbox(&bbox)?;
            if resolution <= 0.0 {
                bail!("--resolution must be > 0, got {resolution}");
            }
            let written = ops::rasterize_dimensions(
                files,
                &outdir,
                bbox,
                resolution,
                dimensions,
                some_if_nonempty(prefix),
                some_if_nonempty(postfix),
            )?;
            info!(rasters = written.len(), "lidargrid finished");
            Ok(())
        }
        PrepareCommand::Extractfeatures {
            bbox,
            neighborhood,
            edge_mode,
            features,
            prefix,
            postfix,
            raster,
            outdir,
        } => {
            let bbox = parse_bbox(&bbox)?;
            let edge_mode: EdgeMode = edge_mode.parse().map_err(anyhow::Error::msg)?;
            let kinds: Vec<FeatureKind> = features
                .iter()
                .map(|f| f.parse().map_err(anyhow::Error::msg))
                .collect::<Result<_>>()?;
            let written = ops::extract_features(
                &raster,
                &bbox,
                &kinds,
                neighborhood,
                edge_mode,
                &outdir,
                &prefix,
                &postfix,
            )?;
            info!(rasters = written.len(), "extractfeatures finished");
            Ok(())
        }
    }
}

fn classify(command: ClassifyCommand) -> Result<()> {
    match command {
        ClassifyCommand::Randomforest {
            bbox,
            rasters,
            prob,
            model,
            outdir,
        } => {
            let bbox = parse_bbox(&bbox)?;
            let model = RandomForestModel::from_path(&model)?;
            let written = ops::classify_rasters(&model, &rasters, &bbox, &outdir, prob)?;
            info!(rasters = written.len(), "classification finished");
            Ok(())
        }
    }
}

fn extract(command: ExtractCommand) -> Result<()> {
    match command {
        ExtractCommand::Denoise {
            bbox,
            raster,
            outdir,
        } => {
            let bbox = parse_bbox(&bbox)?;
            let path = ops::denoise_raster(&raster, &bbox, &outdir)?;
            info!(path = %path.display(), "denoise finished");
            Ok(())
        }
    }
}

fn run(config_path: PathBuf) -> Result<()> {
    let config = RunConfig::from_path(&config_path)
        .with_context(|| format!("cannot load '{}'", config_path.display()))?;
    let report = runner::run(&config)?;
    if !report.failures.is_empty() {
        for (tile, error) in &report.failures {
            eprintln!("tile {tile} failed: {error}");
        }
        bail!(
            "{} of {} tiles failed",
            report.failures.len(),
            config.tiles.len()
        );
    }
    Ok(())
}

fn some_if_nonempty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}
