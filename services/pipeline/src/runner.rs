//! The batch driver behind `surfmap run`.
//!
//! Tiles are independent, so they are processed with a rayon parallel
//! map. A failing tile never stops the others; failures are collected
//! and reported at the end, and the tile index only lists tiles that
//! finished.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Serialize;
use tracing::{error, info};
use walkdir::WalkDir;

use classification::{Classifier, RandomForestModel, StackedFeatures};
use lidar_sampler::{
    apply_pulse_width_cutoff, default_nodata, GridSampler, LasSource, LasSourceOptions,
};
use raster_io::write_grid;
use surf_common::BoundingBox;

use crate::config::{RunConfig, TileConfig};
use crate::error::PipelineError;
use crate::ops::{classify_stack, feature_bands};

/// Outputs of one finished tile.
#[derive(Debug)]
pub struct TileOutput {
    pub name: String,
    pub classification: PathBuf,
    pub confidence: Option<PathBuf>,
    pub bbox: BoundingBox,
}

/// What a whole run produced.
#[derive(Debug)]
pub struct RunReport {
    pub outputs: Vec<TileOutput>,
    /// (tile name, error message) per failed tile.
    pub failures: Vec<(String, String)>,
    pub index_path: PathBuf,
}

#[derive(Serialize)]
struct TileIndex<'a> {
    resolution: f64,
    tiles: Vec<TileIndexEntry<'a>>,
}

/// One rectangle of the tiling, enough for the external virtual-mosaic
/// tool to place the file.
#[derive(Serialize)]
struct TileIndexEntry<'a> {
    name: &'a str,
    path: String,
    bbox: [f64; 4],
}

/// Execute a batch run from a validated config.
pub fn run(config: &RunConfig) -> Result<RunReport, PipelineError> {
    let model = RandomForestModel::from_path(&config.model)?;
    if model.expected_feature_count() != config.band_count() {
        return Err(PipelineError::Config(format!(
            "model expects {} features but the configured bands produce {} \
             ({} dimensions x (1 raw + {} features))",
            model.expected_feature_count(),
            config.band_count(),
            config.dimensions.len(),
            config.features.len()
        )));
    }

    let las_files = discover_las_files(&config.lasdir)?;
    if las_files.is_empty() {
        return Err(PipelineError::Config(format!(
            "no .las/.laz files under '{}'",
            config.lasdir.display()
        )));
    }
    fs::create_dir_all(&config.outdir)?;

    info!(
        tiles = config.tiles.len(),
        las_files = las_files.len(),
        "starting batch run"
    );

    let results: Vec<Result<TileOutput, (String, String)>> = config
        .tiles
        .par_iter()
        .map(|tile| {
            process_tile(config, &model, tile, &las_files)
                .map_err(|e| (tile.name.clone(), e.to_string()))
        })
        .collect();

    let mut outputs = Vec::new();
    let mut failures = Vec::new();
    for result in results {
        match result {
            Ok(output) => outputs.push(output),
            Err(failure) => {
                error!(tile = %failure.0, error = %failure.1, "tile failed");
                failures.push(failure);
            }
        }
    }

    let index_path = write_tile_index(config, &outputs)?;
    info!(
        finished = outputs.len(),
        failed = failures.len(),
        index = %index_path.display(),
        "batch run complete"
    );

    Ok(RunReport {
        outputs,
        failures,
        index_path,
    })
}

/// Rasterize, extract, stack, classify and denoise one tile.
pub fn process_tile(
    config: &RunConfig,
    model: &RandomForestModel,
    tile: &TileConfig,
    las_files: &[PathBuf],
) -> Result<TileOutput, PipelineError> {
    let bbox = tile.bounding_box()?;
    let kinds = config.feature_kinds()?;
    let edge_mode = config.edge_mode()?;
    let files = tile.las_files(&config.lasdir, las_files);

    let source = LasSource::new(
        files.iter(),
        LasSourceOptions {
            ground_only: true,
            bbox: Some(bbox),
        },
    );
    let mut cloud = source.read()?;
    apply_pulse_width_cutoff(&mut cloud)?;

    let mut sampler = GridSampler::new(cloud, bbox, config.resolution)?;
    sampler.crop_to_bbox();

    let mut bands = Vec::with_capacity(config.band_count());
    for dimension in &config.dimensions {
        let nodata = default_nodata(dimension).ok_or_else(|| {
            PipelineError::Config(format!("no default nodata for dimension '{dimension}'"))
        })?;
        let raw = sampler.make_grid::<f32>(dimension, nodata)?;
        bands.extend(feature_bands(&raw, &kinds, config.neighborhood, edge_mode)?);
    }

    let stacked = StackedFeatures::stack(&bands)?;
    let result = classify_stack(model, &stacked, config.prob)?;
    let dense = denoise::denoise(&result.classes)?;

    let classification = config.outdir.join(format!("{}_classification.tif", tile.name));
    write_grid(&classification, &dense)?;
    let confidence = match &result.confidence {
        Some(grid) => {
            let path = config.outdir.join(format!("{}_confidence.tif", tile.name));
            write_grid(&path, grid)?;
            Some(path)
        }
        None => None,
    };

    info!(
        tile = %tile.name,
        valid_cells = stacked.valid_cell_count(),
        path = %classification.display(),
        "tile finished"
    );
    Ok(TileOutput {
        name: tile.name.clone(),
        classification,
        confidence,
        bbox: dense.bbox(),
    })
}

/// All .las/.laz files under a directory, sorted for reproducibility.
pub fn discover_las_files(lasdir: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(lasdir) {
        let entry = entry.map_err(|e| {
            PipelineError::Config(format!("cannot scan '{}': {e}", lasdir.display()))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let is_las = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("las") || e.eq_ignore_ascii_case("laz"))
            .unwrap_or(false);
        if is_las {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

fn write_tile_index(
    config: &RunConfig,
    outputs: &[TileOutput],
) -> Result<PathBuf, PipelineError> {
    let index = TileIndex {
        resolution: config.resolution,
        tiles: outputs
            .iter()
            .map(|o| TileIndexEntry {
                name: &o.name,
                path: o
                    .classification
                    .file_name()
                    .map(|f| f.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                bbox: [o.bbox.min_x, o.bbox.min_y, o.bbox.max_x, o.bbox.max_y],
            })
            .collect(),
    };
    let path = config.outdir.join("tileindex.json");
    let file = File::create(&path)?;
    serde_json::to_writer_pretty(file, &index).map_err(|e| {
        PipelineError::Config(format!("cannot write tile index: {e}"))
    })?;
    Ok(path)
}
