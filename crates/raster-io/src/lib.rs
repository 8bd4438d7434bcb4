//! Single-band GeoTIFF I/O for [`surf_common::Grid`].
//!
//! This crate exists to move grids in and out of the pipeline; it is
//! not a general raster format layer. Georeferencing is carried by the
//! ModelPixelScale (33550) and ModelTiepoint (33922) tags, nodata by
//! the GDAL_NODATA (42113) ASCII tag, which is what the surrounding
//! GIS tooling expects.

pub mod error;
pub mod reader;
pub mod writer;

pub use error::RasterIoError;
pub use reader::{PixelWindow, RasterSource};
pub use writer::{write_grid, GeoTiffPixel};
