//! Error types for kernel feature extraction.

use surf_common::GridError;
use thiserror::Error;

use crate::extraction::MAX_NEIGHBORHOOD;

/// Errors rejected at extractor construction time.
#[derive(Debug, Error)]
pub enum FeatureError {
    /// Neighborhood size must be odd so the window has a center cell.
    #[error("neighborhood size must be odd, got {0}")]
    EvenNeighborhood(usize),

    /// Neighborhood size must be at least 1.
    #[error("neighborhood size must be >= 1, got {0}")]
    ZeroNeighborhood(usize),

    /// Oversized neighborhoods cost too much and smear away the signal.
    #[error("neighborhood size {0} larger than the maximum of {MAX_NEIGHBORHOOD}")]
    NeighborhoodTooLarge(usize),

    /// At least one output feature must be requested.
    #[error("no output features requested")]
    NoFeatures,

    #[error(transparent)]
    Grid(#[from] GridError),
}
