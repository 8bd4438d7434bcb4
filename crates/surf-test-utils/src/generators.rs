//! Deterministic generators for synthetic surfaces, class rasters and
//! ground points.
//!
//! Everything here is reproducible: either a closed-form pattern or a
//! seeded RNG, so tests can assert exact values.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use surf_common::{BoundingBox, Grid};

/// Upper-left origin shared by the generated rasters, matching a 1 km
/// Danish national-grid tile.
pub const TEST_ORIGIN: (f64, f64) = (727000.0, 6172000.0);

/// Cell size shared by the generated rasters.
pub const TEST_RESOLUTION: f64 = 4.0;

/// Nodata sentinel used by the generated float rasters.
pub const TEST_NODATA: f32 = -999.0;

/// A float feature grid with predictable values: cell (row, col) holds
/// `col as f32 * 1000.0 + row as f32`, so reads and writes can be
/// verified positionally.
pub fn feature_grid(rows: usize, cols: usize) -> Grid<f32> {
    let mut data = Vec::with_capacity(rows * cols);
    for row in 0..rows {
        for col in 0..cols {
            data.push((col * 1000 + row) as f32);
        }
    }
    Grid::from_data(
        data,
        rows,
        cols,
        TEST_ORIGIN,
        TEST_RESOLUTION,
        Some(TEST_NODATA),
    )
    .unwrap()
}

/// Like [`feature_grid`], with the nodata sentinel punched in at the
/// given (row, col) positions.
pub fn feature_grid_with_holes(rows: usize, cols: usize, holes: &[(usize, usize)]) -> Grid<f32> {
    let mut grid = feature_grid(rows, cols);
    for &(row, col) in holes {
        grid.set(row, col, TEST_NODATA);
    }
    grid
}

/// A smooth amplitude-like surface: a gentle gradient plus a bump in
/// the middle, everything well away from the nodata sentinel.
pub fn amplitude_grid(rows: usize, cols: usize) -> Grid<f32> {
    let mut data = Vec::with_capacity(rows * cols);
    for row in 0..rows {
        for col in 0..cols {
            let dr = row as f32 - rows as f32 / 2.0;
            let dc = col as f32 - cols as f32 / 2.0;
            let bump = 30.0 * (-(dr * dr + dc * dc) / (rows * cols) as f32).exp();
            data.push(80.0 + 0.1 * row as f32 + 0.05 * col as f32 + bump);
        }
    }
    Grid::from_data(
        data,
        rows,
        cols,
        TEST_ORIGIN,
        TEST_RESOLUTION,
        Some(TEST_NODATA),
    )
    .unwrap()
}

/// A class raster of vertical bands, one per entry of `classes`, each
/// `cols / classes.len()` cells wide (the last band absorbs the
/// remainder). Nodata is 0.
pub fn class_bands(rows: usize, cols: usize, classes: &[u8]) -> Grid<u8> {
    assert!(!classes.is_empty());
    let band_width = (cols / classes.len()).max(1);
    let mut data = Vec::with_capacity(rows * cols);
    for _ in 0..rows {
        for col in 0..cols {
            let band = (col / band_width).min(classes.len() - 1);
            data.push(classes[band]);
        }
    }
    Grid::from_data(data, rows, cols, TEST_ORIGIN, TEST_RESOLUTION, Some(0)).unwrap()
}

/// [`class_bands`] with `speckles` cells flipped to a random other
/// class and `holes` cells set to nodata, both from a seeded RNG.
pub fn speckled_class_bands(
    rows: usize,
    cols: usize,
    classes: &[u8],
    speckles: usize,
    holes: usize,
    seed: u64,
) -> Grid<u8> {
    let mut grid = class_bands(rows, cols, classes);
    let mut rng = StdRng::seed_from_u64(seed);
    for _ in 0..speckles {
        let row = rng.gen_range(0..rows);
        let col = rng.gen_range(0..cols);
        let class = classes[rng.gen_range(0..classes.len())];
        grid.set(row, col, class);
    }
    for _ in 0..holes {
        let row = rng.gen_range(0..rows);
        let col = rng.gen_range(0..cols);
        grid.set(row, col, 0);
    }
    grid
}

/// One synthetic ground return.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub scan_angle: f32,
}

/// Ground returns covering `bbox`: `per_cell` jittered points in every
/// cell of the implied `resolution` grid, with scan angles spread over
/// -15..15 degrees. Seeded, so repeated calls agree.
pub fn synthetic_ground_points(
    bbox: &BoundingBox,
    resolution: f64,
    per_cell: usize,
    seed: u64,
) -> Vec<GroundPoint> {
    let mut rng = StdRng::seed_from_u64(seed);
    let cols = (bbox.width() / resolution).ceil() as usize;
    let rows = (bbox.height() / resolution).ceil() as usize;
    let mut points = Vec::with_capacity(rows * cols * per_cell);
    for row in 0..rows {
        for col in 0..cols {
            for _ in 0..per_cell {
                let x = bbox.min_x + (col as f64 + rng.gen_range(0.05..0.95)) * resolution;
                let y = bbox.max_y - (row as f64 + rng.gen_range(0.05..0.95)) * resolution;
                let z = 40.0 + 0.01 * (x - bbox.min_x) + rng.gen_range(-0.2..0.2);
                let scan_angle = rng.gen_range(-15.0..15.0);
                points.push(GroundPoint { x, y, z, scan_angle });
            }
        }
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_grid_is_positional() {
        let grid = feature_grid(5, 10);
        assert_eq!(grid.shape(), (5, 10));
        assert_eq!(grid.get(0, 0), 0.0);
        assert_eq!(grid.get(0, 1), 1000.0);
        assert_eq!(grid.get(1, 0), 1.0);
        assert_eq!(grid.get(3, 7), 7003.0);
    }

    #[test]
    fn test_holes_are_masked() {
        let grid = feature_grid_with_holes(4, 4, &[(2, 2)]);
        assert!(grid.is_masked(2, 2));
        assert!(!grid.is_masked(0, 0));
    }

    #[test]
    fn test_class_bands_cover_all_classes() {
        let grid = class_bands(2, 9, &[1, 2, 3]);
        assert_eq!(grid.get(0, 0), 1);
        assert_eq!(grid.get(0, 4), 2);
        assert_eq!(grid.get(0, 8), 3);
    }

    #[test]
    fn test_speckled_bands_are_reproducible() {
        let a = speckled_class_bands(20, 20, &[1, 2], 15, 5, 7);
        let b = speckled_class_bands(20, 20, &[1, 2], 15, 5, 7);
        assert_eq!(a.data(), b.data());
    }

    #[test]
    fn test_ground_points_fill_every_cell() {
        let bbox = BoundingBox::new(0.0, 0.0, 8.0, 8.0);
        let points = synthetic_ground_points(&bbox, 4.0, 2, 1);
        assert_eq!(points.len(), 2 * 2 * 2);
        for p in &points {
            assert!(p.x >= bbox.min_x && p.x < bbox.max_x);
            assert!(p.y > bbox.min_y && p.y <= bbox.max_y);
        }
    }
}
