//! Error types for classified-raster denoising.

use surf_common::GridError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DenoiseError {
    /// Voting remaps masked cells to `max(class) + 1`; a raster already
    /// using class value 255 leaves no room for the remap.
    #[error("cannot remap nodata for voting: class value {max} is already at the uint8 limit")]
    ClassOverflow { max: u8 },

    #[error(transparent)]
    Grid(#[from] GridError),
}
