//! Error types for stacking and classification.

use surf_common::GridError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClassifyError {
    /// A band does not align with band 0 of the stack.
    #[error("feature band {band} is not aligned with band 0: {source}")]
    BandMisaligned { band: usize, source: GridError },

    #[error("cannot stack zero feature bands")]
    NoBands,

    #[error("matrix of {samples} samples x {features} features needs {expected} values, got {actual}")]
    MatrixShape {
        samples: usize,
        features: usize,
        expected: usize,
        actual: usize,
    },

    /// The model wants a different number of features than the matrix
    /// carries.
    #[error("classifier expects {expected} features per sample, matrix has {actual}")]
    FeatureCountMismatch { expected: usize, actual: usize },

    /// Scatter received a result vector that does not match the number
    /// of valid cells the matrix was extracted from.
    #[error("expected one result per valid cell ({expected}), got {actual}")]
    ResultLengthMismatch { expected: usize, actual: usize },

    #[error("failed to read model file '{path}': {source}")]
    ModelIo {
        path: String,
        source: std::io::Error,
    },

    #[error("model file '{path}' is not valid JSON: {source}")]
    ModelFormat {
        path: String,
        source: serde_json::Error,
    },

    /// The decoded model fails structural validation.
    #[error("invalid model: {0}")]
    ModelInvalid(String),

    #[error(transparent)]
    Grid(#[from] GridError),
}
