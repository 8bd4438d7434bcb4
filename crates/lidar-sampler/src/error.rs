//! Error types for point-cloud handling and grid sampling.

use surf_common::GridError;
use thiserror::Error;

/// Errors from reading point clouds or sampling them onto grids.
#[derive(Debug, Error)]
pub enum SamplerError {
    /// The requested point dimension does not exist in the cloud.
    #[error("dimension '{name}' not found in point data (available: {available:?})")]
    UnknownDimension {
        name: String,
        available: Vec<String>,
    },

    /// The nodata value cannot be represented in the output value type.
    #[error("nodata value {nodata} cannot be represented as {dtype}")]
    NodataNotRepresentable { nodata: f64, dtype: &'static str },

    /// A point attribute value cannot be represented in the output type.
    #[error("point value {value} of dimension '{dimension}' cannot be represented as {dtype}")]
    ValueNotRepresentable {
        dimension: String,
        value: f64,
        dtype: &'static str,
    },

    /// A point lies outside the sampling grid.
    #[error(
        "point at ({x}, {y}) falls outside the sampling grid; call crop_to_bbox() before make_grid()"
    )]
    PointOutsideGrid { x: f64, y: f64 },

    /// An extra dimension's value count does not match the cloud size.
    #[error("dimension '{name}' has {actual} values for a cloud of {expected} points")]
    DimensionLength {
        name: String,
        expected: usize,
        actual: usize,
    },

    /// Grid construction failure.
    #[error(transparent)]
    Grid(#[from] GridError),

    /// LAS/LAZ file failure.
    #[error("LAS read error: {0}")]
    Las(#[from] las::Error),
}
