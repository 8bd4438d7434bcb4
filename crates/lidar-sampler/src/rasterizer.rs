//! Rasterizes one or more dimensions from one or more LiDAR files.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use raster_io::{write_grid, RasterIoError};
use surf_common::BoundingBox;

use crate::error::SamplerError;
use crate::las_source::{apply_pulse_width_cutoff, LasSource, LasSourceOptions};
use crate::points::default_nodata;
use crate::sampler::GridSampler;

/// Errors from the point-to-raster step.
#[derive(Debug, Error)]
pub enum RasterizeError {
    #[error(transparent)]
    Sampler(#[from] SamplerError),

    #[error(transparent)]
    RasterIo(#[from] RasterIoError),

    #[error("no default nodata value known for dimension '{0}'")]
    NoDefaultNodata(String),
}

/// Drives LAS reading, sampling and GeoTIFF output for a list of
/// dimensions over one tile bbox.
///
/// Output files are named `{prefix}{dimension}{postfix}.tif` with
/// spaces stripped from the dimension name.
pub struct LidarRasterizer {
    files: Vec<PathBuf>,
    outdir: PathBuf,
    resolution: f64,
    bbox: BoundingBox,
    dimensions: Vec<String>,
    prefix: String,
    postfix: String,
}

impl LidarRasterizer {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        files: Vec<PathBuf>,
        outdir: impl AsRef<Path>,
        resolution: f64,
        bbox: BoundingBox,
        dimensions: Vec<String>,
        prefix: Option<String>,
        postfix: Option<String>,
    ) -> Self {
        Self {
            files,
            outdir: outdir.as_ref().to_path_buf(),
            resolution,
            bbox,
            dimensions,
            prefix: prefix.unwrap_or_default(),
            postfix: postfix.unwrap_or_default(),
        }
    }

    fn output_filename(&self, dimension: &str) -> PathBuf {
        let dimname: String = dimension.chars().filter(|c| !c.is_whitespace()).collect();
        self.outdir
            .join(format!("{}{}{}.tif", self.prefix, dimname, self.postfix))
    }

    /// Read, sample and write every requested dimension.
    ///
    /// Returns the paths written, in dimension order.
    pub fn run(&self) -> Result<Vec<PathBuf>, RasterizeError> {
        let source = LasSource::new(
            self.files.iter(),
            LasSourceOptions {
                ground_only: true,
                bbox: Some(self.bbox),
            },
        );
        let mut cloud = source.read()?;
        apply_pulse_width_cutoff(&mut cloud)?;

        let mut sampler = GridSampler::new(cloud, self.bbox, self.resolution)?;
        sampler.crop_to_bbox();

        let mut written = Vec::with_capacity(self.dimensions.len());
        for dimension in &self.dimensions {
            let nodata = default_nodata(dimension)
                .ok_or_else(|| RasterizeError::NoDefaultNodata(dimension.clone()))?;
            let outfile = self.output_filename(dimension);
            info!(dimension, path = %outfile.display(), "rasterizing dimension");

            // Narrow integer dimensions keep their native width; any
            // other dimension is written as float32.
            match dimension.as_str() {
                "ReturnNumber" | "NumberOfReturns" | "Classification" => {
                    let grid = sampler.make_grid::<u8>(dimension, nodata)?;
                    write_grid(&outfile, &grid)?;
                }
                "Intensity" | "PointSourceId" => {
                    let grid = sampler.make_grid::<u16>(dimension, nodata)?;
                    write_grid(&outfile, &grid)?;
                }
                _ => {
                    let grid = sampler.make_grid::<f32>(dimension, nodata)?;
                    write_grid(&outfile, &grid)?;
                }
            }
            written.push(outfile);
        }
        Ok(written)
    }
}
