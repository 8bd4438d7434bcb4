//! Pipeline-level error type: one enum wrapping every stage's errors
//! plus configuration problems found at the CLI boundary.

use thiserror::Error;

use classification::ClassifyError;
use denoise::DenoiseError;
use kernel_features::FeatureError;
use lidar_sampler::{RasterizeError, SamplerError};
use raster_io::RasterIoError;
use surf_common::{BboxParseError, GridError};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Sampler(#[from] SamplerError),

    #[error(transparent)]
    Rasterize(#[from] RasterizeError),

    #[error(transparent)]
    RasterIo(#[from] RasterIoError),

    #[error(transparent)]
    Feature(#[from] FeatureError),

    #[error(transparent)]
    Denoise(#[from] DenoiseError),

    #[error(transparent)]
    Classify(#[from] ClassifyError),

    #[error(transparent)]
    Grid(#[from] GridError),

    #[error(transparent)]
    Bbox(#[from] BboxParseError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to parse config '{path}': {source}")]
    ConfigParse {
        path: String,
        source: serde_yaml::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}
