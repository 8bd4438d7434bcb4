//! Georeferenced 2D grids with nodata masking.
//!
//! A [`Grid`] is the unit of data exchanged between every pipeline
//! stage: rasterization produces grids, feature extraction consumes and
//! produces grids, classification scatters its result back into a grid.
//!
//! Cells are square. The origin is the world coordinate of the upper
//! left corner of the upper left cell, rows run along negative y
//! (northing decreases with increasing row index) and storage is
//! row-major.
//!
//! "No observation" is tracked two ways: an optional explicit boolean
//! mask, and a nodata sentinel in the value domain. When a mask is
//! present it is authoritative; otherwise the mask is derived as
//! `value == nodata`. Producers that know exactly which cells were
//! observed (e.g. the point sampler) attach an explicit mask so that a
//! real value equal to the sentinel is not mistaken for a hole.

use crate::bbox::BoundingBox;
use crate::error::GridError;
use num_traits::{NumCast, ToPrimitive};

/// Tolerance for comparing origins and resolutions of two grids.
///
/// World coordinates are meters; a micrometer of disagreement is noise
/// from geotransform arithmetic, anything larger is a misalignment.
pub const ALIGNMENT_EPSILON: f64 = 1e-6;

/// Element types a [`Grid`] can hold.
pub trait GridValue:
    Copy + PartialEq + PartialOrd + NumCast + ToPrimitive + std::fmt::Debug + Send + Sync + 'static
{
    /// Human readable type name used in error messages.
    const TYPE_NAME: &'static str;
}

macro_rules! impl_grid_value {
    ($($t:ty => $name:literal),* $(,)?) => {
        $(impl GridValue for $t {
            const TYPE_NAME: &'static str = $name;
        })*
    };
}

impl_grid_value!(
    u8 => "uint8",
    u16 => "uint16",
    i16 => "int16",
    u32 => "uint32",
    i32 => "int32",
    f32 => "float32",
    f64 => "float64",
);

/// A single-band georeferenced raster held in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid<T: GridValue> {
    origin: (f64, f64),
    resolution: f64,
    rows: usize,
    cols: usize,
    nodata: Option<T>,
    data: Vec<T>,
    mask: Option<Vec<bool>>,
}

impl<T: GridValue> Grid<T> {
    /// Create a grid filled with a constant value.
    pub fn filled(
        rows: usize,
        cols: usize,
        origin: (f64, f64),
        resolution: f64,
        fill: T,
        nodata: Option<T>,
    ) -> Result<Self, GridError> {
        if resolution <= 0.0 {
            return Err(GridError::InvalidResolution { resolution });
        }
        Ok(Self {
            origin,
            resolution,
            rows,
            cols,
            nodata,
            data: vec![fill; rows * cols],
            mask: None,
        })
    }

    /// Create a grid from existing row-major data.
    pub fn from_data(
        data: Vec<T>,
        rows: usize,
        cols: usize,
        origin: (f64, f64),
        resolution: f64,
        nodata: Option<T>,
    ) -> Result<Self, GridError> {
        if resolution <= 0.0 {
            return Err(GridError::InvalidResolution { resolution });
        }
        if data.len() != rows * cols {
            return Err(GridError::DataLength {
                rows,
                cols,
                expected: rows * cols,
                actual: data.len(),
            });
        }
        Ok(Self {
            origin,
            resolution,
            rows,
            cols,
            nodata,
            data,
            mask: None,
        })
    }

    /// Number of rows and columns a grid covering `bbox` at `resolution`
    /// must have: `ceil(extent / resolution)` on both axes.
    pub fn shape_for_bbox(
        bbox: &BoundingBox,
        resolution: f64,
    ) -> Result<(usize, usize), GridError> {
        if resolution <= 0.0 {
            return Err(GridError::InvalidResolution { resolution });
        }
        let width = bbox.width();
        let height = bbox.height();
        if width <= 0.0 || height <= 0.0 {
            return Err(GridError::EmptyBbox { width, height });
        }
        let rows = (height / resolution).ceil() as usize;
        let cols = (width / resolution).ceil() as usize;
        Ok((rows, cols))
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// World coordinate of the upper left corner of the upper left cell.
    pub fn origin(&self) -> (f64, f64) {
        self.origin
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    pub fn nodata(&self) -> Option<T> {
        self.nodata
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    #[inline]
    fn index(&self, row: usize, col: usize) -> usize {
        debug_assert!(row < self.rows && col < self.cols);
        row * self.cols + col
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> T {
        self.data[self.index(row, col)]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: T) {
        let i = self.index(row, col);
        self.data[i] = value;
    }

    /// Attach an explicit observation mask (true = no observation).
    pub fn set_mask(&mut self, mask: Vec<bool>) -> Result<(), GridError> {
        if mask.len() != self.rows * self.cols {
            return Err(GridError::MaskLength {
                rows: self.rows,
                cols: self.cols,
                expected: self.rows * self.cols,
                actual: mask.len(),
            });
        }
        self.mask = Some(mask);
        Ok(())
    }

    /// Drop the explicit mask, making the grid dense.
    pub fn clear_mask(&mut self) {
        self.mask = None;
    }

    /// The explicit mask, if one was attached.
    pub fn mask(&self) -> Option<&[bool]> {
        self.mask.as_deref()
    }

    /// True if the cell holds no observation.
    #[inline]
    pub fn is_masked(&self, row: usize, col: usize) -> bool {
        let i = self.index(row, col);
        match &self.mask {
            Some(mask) => mask[i],
            None => match self.nodata {
                Some(nd) => self.data[i] == nd,
                None => false,
            },
        }
    }

    /// Materialize the per-cell mask (true = no observation), whether it
    /// was stored explicitly or is derived from the nodata sentinel.
    pub fn value_mask(&self) -> Vec<bool> {
        if let Some(mask) = &self.mask {
            return mask.clone();
        }
        match self.nodata {
            Some(nd) => self.data.iter().map(|v| *v == nd).collect(),
            None => vec![false; self.data.len()],
        }
    }

    /// Number of cells with no observation.
    pub fn masked_count(&self) -> usize {
        match &self.mask {
            Some(mask) => mask.iter().filter(|m| **m).count(),
            None => match self.nodata {
                Some(nd) => self.data.iter().filter(|v| **v == nd).count(),
                None => 0,
            },
        }
    }

    /// Row-major data with every masked cell replaced by the nodata
    /// sentinel, suitable for serialization.
    ///
    /// Fails if the grid carries masked cells but no nodata value.
    pub fn filled_data(&self) -> Result<Vec<T>, GridError> {
        let mask = match &self.mask {
            Some(mask) => mask,
            None => return Ok(self.data.clone()),
        };
        let masked = mask.iter().filter(|m| **m).count();
        if masked == 0 {
            return Ok(self.data.clone());
        }
        let nd = self.nodata.ok_or(GridError::NodataRequired { masked })?;
        let mut out = self.data.clone();
        for (v, m) in out.iter_mut().zip(mask.iter()) {
            if *m {
                *v = nd;
            }
        }
        Ok(out)
    }

    /// Bounding box covered by the grid.
    pub fn bbox(&self) -> BoundingBox {
        BoundingBox::new(
            self.origin.0,
            self.origin.1 - self.rows as f64 * self.resolution,
            self.origin.0 + self.cols as f64 * self.resolution,
            self.origin.1,
        )
    }

    /// GDAL-style geotransform:
    /// (origin_x, pixel_width, 0, origin_y, 0, -pixel_height).
    pub fn geotransform(&self) -> [f64; 6] {
        [
            self.origin.0,
            self.resolution,
            0.0,
            self.origin.1,
            0.0,
            -self.resolution,
        ]
    }

    /// Extract a `rows x cols` sub-grid whose upper-left cell is
    /// (`row`, `col`) of this grid. The origin shifts accordingly;
    /// nodata and any explicit mask carry over.
    pub fn window(
        &self,
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    ) -> Result<Self, GridError> {
        if row + rows > self.rows || col + cols > self.cols {
            return Err(GridError::WindowOutOfBounds {
                row,
                col,
                rows,
                cols,
                grid_rows: self.rows,
                grid_cols: self.cols,
            });
        }
        let mut data = Vec::with_capacity(rows * cols);
        for r in row..row + rows {
            let start = r * self.cols + col;
            data.extend_from_slice(&self.data[start..start + cols]);
        }
        let mask = self.mask.as_ref().map(|mask| {
            let mut out = Vec::with_capacity(rows * cols);
            for r in row..row + rows {
                let start = r * self.cols + col;
                out.extend_from_slice(&mask[start..start + cols]);
            }
            out
        });
        Ok(Self {
            origin: (
                self.origin.0 + col as f64 * self.resolution,
                self.origin.1 - row as f64 * self.resolution,
            ),
            resolution: self.resolution,
            rows,
            cols,
            nodata: self.nodata,
            data,
            mask,
        })
    }

    /// Verify this grid is co-registrable with another: identical shape,
    /// and origin/resolution equal within [`ALIGNMENT_EPSILON`].
    pub fn ensure_stackable<U: GridValue>(&self, other: &Grid<U>) -> Result<(), GridError> {
        if self.shape() != other.shape() {
            return Err(GridError::ShapeMismatch {
                a_rows: self.rows,
                a_cols: self.cols,
                b_rows: other.rows,
                b_cols: other.cols,
            });
        }
        if (self.resolution - other.resolution).abs() > ALIGNMENT_EPSILON {
            return Err(GridError::ResolutionMismatch {
                a: self.resolution,
                b: other.resolution,
            });
        }
        if (self.origin.0 - other.origin.0).abs() > ALIGNMENT_EPSILON
            || (self.origin.1 - other.origin.1).abs() > ALIGNMENT_EPSILON
        {
            return Err(GridError::OriginMismatch {
                a: self.origin,
                b: other.origin,
            });
        }
        Ok(())
    }
}
