//! Common types shared across all surfmap crates.

pub mod bbox;
pub mod error;
pub mod grid;

pub use bbox::{BboxParseError, BoundingBox};
pub use error::GridError;
pub use grid::{Grid, GridValue};
