//! Bounding box types and operations.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A projected bounding box in world coordinates.
///
/// Coordinates are in the units of the projected CRS the pipeline
/// operates in (typically meters, e.g. EPSG:25832 for Danish data).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

/// Errors from parsing a bounding box argument string.
#[derive(Debug, Error)]
pub enum BboxParseError {
    #[error("invalid bbox format '{0}', expected 'xmin,ymin,xmax,ymax'")]
    InvalidFormat(String),

    #[error("invalid bbox coordinate: '{0}'")]
    InvalidNumber(String),

    #[error("empty bbox extent: xmin={min_x}, ymin={min_y}, xmax={max_x}, ymax={max_y} (min must be < max)")]
    EmptyExtent {
        min_x: f64,
        min_y: f64,
        max_x: f64,
        max_y: f64,
    },
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Parse a CLI bbox argument: "xmin,ymin,xmax,ymax".
    ///
    /// Validates that the extent is non-empty (`min < max` on both axes).
    pub fn from_arg_string(s: &str) -> Result<Self, BboxParseError> {
        let parts: Vec<&str> = s.split(',').collect();
        if parts.len() != 4 {
            return Err(BboxParseError::InvalidFormat(s.to_string()));
        }

        let mut coords = [0.0f64; 4];
        for (i, part) in parts.iter().enumerate() {
            coords[i] = part
                .trim()
                .parse()
                .map_err(|_| BboxParseError::InvalidNumber(part.to_string()))?;
        }

        let bbox = Self::new(coords[0], coords[1], coords[2], coords[3]);
        if bbox.min_x >= bbox.max_x || bbox.min_y >= bbox.max_y {
            return Err(BboxParseError::EmptyExtent {
                min_x: bbox.min_x,
                min_y: bbox.min_y,
                max_x: bbox.max_x,
                max_y: bbox.max_y,
            });
        }
        Ok(bbox)
    }

    /// Width of the bounding box in coordinate units.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height of the bounding box in coordinate units.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Check if a point is contained, using the sampling-grid convention:
    /// x on the half-open interval [min_x, max_x), y on (min_y, max_y].
    ///
    /// The asymmetry matches cell indexing from the upper-left origin: a
    /// point exactly on max_y lands in row 0, a point exactly on min_x
    /// lands in column 0, and points on the far edges belong to the
    /// neighboring tile.
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x < self.max_x && y > self.min_y && y <= self.max_y
    }

    /// Check if this bbox intersects another.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_x < other.max_x
            && self.max_x > other.min_x
            && self.min_y < other.max_y
            && self.max_y > other.min_y
    }
}

impl std::fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({}, {}, {}, {})",
            self.min_x, self.min_y, self.max_x, self.max_y
        )
    }
}
