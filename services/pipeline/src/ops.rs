//! The pipeline stages behind the CLI subcommands.
//!
//! Each function here is a thin composition of the core crates plus
//! file naming; the `run` driver reuses the same building blocks
//! without the intermediate files where it can.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use classification::{Classifier, RandomForestModel, StackedFeatures};
use kernel_features::{EdgeMode, FeatureKind, KernelFeatureExtraction};
use raster_io::{write_grid, RasterSource};
use surf_common::{BoundingBox, Grid};

use crate::error::PipelineError;

/// Rasterize point dimensions from LAS files into per-dimension
/// GeoTIFFs under `outdir`.
#[allow(clippy::too_many_arguments)]
pub fn rasterize_dimensions(
    files: Vec<PathBuf>,
    outdir: &Path,
    bbox: BoundingBox,
    resolution: f64,
    dimensions: Vec<String>,
    prefix: Option<String>,
    postfix: Option<String>,
) -> Result<Vec<PathBuf>, PipelineError> {
    fs::create_dir_all(outdir)?;
    let rasterizer = lidar_sampler::LidarRasterizer::new(
        files, outdir, resolution, bbox, dimensions, prefix, postfix,
    );
    Ok(rasterizer.run()?)
}

/// Compute feature rasters for a bbox window of `raster` and write one
/// GeoTIFF per feature, named `{prefix}{feature}{postfix}.tif`.
pub fn extract_features(
    raster: &Path,
    bbox: &BoundingBox,
    kinds: &[FeatureKind],
    neighborhood: usize,
    edge_mode: EdgeMode,
    outdir: &Path,
    prefix: &str,
    postfix: &str,
) -> Result<Vec<PathBuf>, PipelineError> {
    let source = RasterSource::open(raster)?;
    let grid = source.read_bbox::<f32>(bbox)?;
    let extraction =
        KernelFeatureExtraction::new(grid, kinds.to_vec(), neighborhood, edge_mode)?;
    let outputs = extraction.compute()?;

    fs::create_dir_all(outdir)?;
    let mut written = Vec::with_capacity(outputs.len());
    for (kind, feature) in &outputs {
        let path = outdir.join(format!("{prefix}{}{postfix}.tif", kind.as_str()));
        write_grid(&path, feature)?;
        info!(feature = kind.as_str(), path = %path.display(), "wrote feature raster");
        written.push(path);
    }
    Ok(written)
}

/// Derive the full band set for one raw dimension grid: the raw band
/// re-registered to the feature extent, followed by the features in
/// request order.
pub fn feature_bands(
    raw: &Grid<f32>,
    kinds: &[FeatureKind],
    neighborhood: usize,
    edge_mode: EdgeMode,
) -> Result<Vec<Grid<f32>>, PipelineError> {
    let extraction =
        KernelFeatureExtraction::new(raw.clone(), kinds.to_vec(), neighborhood, edge_mode)?;
    let (out_rows, out_cols) = extraction.output_shape();
    let outputs = extraction.compute()?;

    let aligned = match edge_mode {
        EdgeMode::Reflect => raw.clone(),
        EdgeMode::Crop => {
            let pad = (neighborhood - 1) / 2;
            raw.window(pad, pad, out_rows, out_cols)?
        }
    };

    let mut bands = Vec::with_capacity(1 + outputs.len());
    bands.push(aligned);
    bands.extend(outputs.into_iter().map(|(_, grid)| grid));
    Ok(bands)
}

/// Classification rasters produced for one tile or one CLI invocation.
pub struct ClassifiedGrids {
    pub classes: Grid<u8>,
    pub confidence: Option<Grid<f32>>,
}

/// Apply a model to a stack and scatter the results back onto the
/// grid. Class 0 marks cells with no valid observation.
pub fn classify_stack(
    model: &RandomForestModel,
    stacked: &StackedFeatures,
    with_confidence: bool,
) -> Result<ClassifiedGrids, PipelineError> {
    if with_confidence {
        let (labels, scores) = model.predict_with_confidence(stacked.matrix())?;
        Ok(ClassifiedGrids {
            classes: stacked.scatter_back(&labels, 0)?,
            confidence: Some(stacked.scatter_confidence(&scores)?),
        })
    } else {
        let labels = model.predict(stacked.matrix())?;
        Ok(ClassifiedGrids {
            classes: stacked.scatter_back(&labels, 0)?,
            confidence: None,
        })
    }
}

/// Read a bbox window from each feature raster, stack, classify and
/// write `classification.tif` (and `confidence.tif` when requested).
pub fn classify_rasters(
    model: &RandomForestModel,
    rasters: &[PathBuf],
    bbox: &BoundingBox,
    outdir: &Path,
    with_confidence: bool,
) -> Result<Vec<PathBuf>, PipelineError> {
    let mut bands = Vec::with_capacity(rasters.len());
    for raster in rasters {
        let source = RasterSource::open(raster)?;
        bands.push(source.read_bbox::<f32>(bbox)?);
    }
    let stacked = StackedFeatures::stack(&bands)?;
    info!(
        bands = bands.len(),
        valid_cells = stacked.valid_cell_count(),
        "classifying stacked rasters"
    );
    let result = classify_stack(model, &stacked, with_confidence)?;

    fs::create_dir_all(outdir)?;
    let class_path = outdir.join("classification.tif");
    write_grid(&class_path, &result.classes)?;
    let mut written = vec![class_path];
    if let Some(confidence) = &result.confidence {
        let path = outdir.join("confidence.tif");
        write_grid(&path, confidence)?;
        written.push(path);
    }
    Ok(written)
}

/// Denoise a bbox window of a classified raster into
/// `{outdir}/denoised.tif`.
pub fn denoise_raster(
    raster: &Path,
    bbox: &BoundingBox,
    outdir: &Path,
) -> Result<PathBuf, PipelineError> {
    let source = RasterSource::open(raster)?;
    let grid = source.read_bbox::<u8>(bbox)?;
    let dense = denoise::denoise(&grid)?;

    fs::create_dir_all(outdir)?;
    let path = outdir.join("denoised.tif");
    write_grid(&path, &dense)?;
    info!(path = %path.display(), "wrote denoised raster");
    Ok(path)
}
