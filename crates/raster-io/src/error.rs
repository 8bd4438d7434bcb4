//! Error types for raster I/O.

use surf_common::GridError;
use thiserror::Error;

/// Errors that can occur reading or writing GeoTIFF rasters.
#[derive(Debug, Error)]
pub enum RasterIoError {
    /// Underlying file I/O failure.
    #[error("raster I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TIFF container failure.
    #[error("TIFF format error: {0}")]
    Tiff(#[from] tiff::TiffError),

    /// Grid construction failure.
    #[error(transparent)]
    Grid(#[from] GridError),

    /// The file lacks the georeferencing tags the pipeline requires.
    #[error("'{path}' is missing GeoTIFF georeferencing tags (ModelPixelScale/ModelTiepoint)")]
    MissingGeoTags { path: String },

    /// Non-square pixels are not supported by the grid model.
    #[error("'{path}' has non-square pixels: {x_res} x {y_res}")]
    NonSquarePixels {
        path: String,
        x_res: f64,
        y_res: f64,
    },

    /// A requested window does not lie fully inside the raster.
    #[error(
        "window (col={col}, row={row}, cols={cols}, rows={rows}) outside raster of {raster_rows}x{raster_cols}"
    )]
    WindowOutsideRaster {
        col: i64,
        row: i64,
        cols: i64,
        rows: i64,
        raster_rows: usize,
        raster_cols: usize,
    },

    /// A bbox mapped to a window with negative size.
    #[error("bbox maps to a negative pixel window: cols={cols}, rows={rows}")]
    NegativeWindow { cols: i64, rows: i64 },

    /// The TIFF sample format has no counterpart in the grid model.
    #[error("'{path}' has an unsupported pixel format")]
    UnsupportedPixelFormat { path: String },

    /// A stored sample cannot be represented in the requested value type.
    #[error("sample value {value} in '{path}' is not representable as {dtype}")]
    ValueNotRepresentable {
        path: String,
        value: f64,
        dtype: &'static str,
    },
}
