//! Error types for grid construction and co-registration.

use thiserror::Error;

/// Errors that can occur constructing or combining grids.
#[derive(Debug, Error)]
pub enum GridError {
    /// Resolution must be strictly positive.
    #[error("resolution must be > 0, got {resolution}")]
    InvalidResolution { resolution: f64 },

    /// Bounding box has zero or negative extent.
    #[error("bbox has empty extent: width={width}, height={height}")]
    EmptyBbox { width: f64, height: f64 },

    /// Supplied data length does not match the grid shape.
    #[error("data length {actual} does not match grid shape {rows}x{cols} ({expected} cells)")]
    DataLength {
        rows: usize,
        cols: usize,
        expected: usize,
        actual: usize,
    },

    /// Supplied mask length does not match the grid shape.
    #[error("mask length {actual} does not match grid shape {rows}x{cols} ({expected} cells)")]
    MaskLength {
        rows: usize,
        cols: usize,
        expected: usize,
        actual: usize,
    },

    /// Two grids differ in shape and cannot be stacked.
    #[error("grids do not stack: shape {a_rows}x{a_cols} != {b_rows}x{b_cols}")]
    ShapeMismatch {
        a_rows: usize,
        a_cols: usize,
        b_rows: usize,
        b_cols: usize,
    },

    /// Two grids differ in origin and cannot be stacked.
    #[error("grids do not stack: origin ({:.6}, {:.6}) != ({:.6}, {:.6})", a.0, a.1, b.0, b.1)]
    OriginMismatch { a: (f64, f64), b: (f64, f64) },

    /// Two grids differ in resolution and cannot be stacked.
    #[error("grids do not stack: resolution {a} != {b}")]
    ResolutionMismatch { a: f64, b: f64 },

    /// A masked grid without a nodata value cannot be flattened to a
    /// sentinel-filled buffer.
    #[error("grid has {masked} masked cells but no nodata value to fill them with")]
    NodataRequired { masked: usize },

    /// Requested sub-grid reaches past the grid edge.
    #[error(
        "window {rows}x{cols} at ({row}, {col}) exceeds grid shape {grid_rows}x{grid_cols}"
    )]
    WindowOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
        grid_rows: usize,
        grid_cols: usize,
    },
}
