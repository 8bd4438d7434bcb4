//! Post-classification cleanup for class-label rasters.
//!
//! A classified raster comes out speckled: isolated misclassified
//! cells, plus holes wherever the feature stack had no observation.
//! [`denoise`] removes both in a fixed order: two majority-vote
//! passes knock out speckle, nearest-neighbor infill closes the
//! remaining holes, and one final vote pass smooths the seams the
//! infill introduced. The result is dense.
//!
//! Labels are `Grid<u8>`; the histogram vote is only defined over the
//! 8-bit class domain and the type system enforces that here.

pub mod error;
pub mod fill;
pub mod majority;
pub mod sieve;

pub use error::DenoiseError;
pub use fill::fill_nearest_neighbor;
pub use majority::{majority_vote, Connectivity};
pub use sieve::{sieve, sieve_mask};

use surf_common::Grid;
use tracing::debug;

/// Smooth a classified raster and fill its holes, returning a dense
/// grid. An empty grid is returned unchanged.
pub fn denoise(grid: &Grid<u8>) -> Result<Grid<u8>, DenoiseError> {
    let (rows, cols) = grid.shape();
    if rows * cols == 0 {
        return Ok(grid.clone());
    }
    debug!(rows, cols, holes = grid.masked_count(), "denoising classified raster");

    let voted = majority_vote(grid, 2, Connectivity::Eight)?;
    let filled = fill_nearest_neighbor(&voted);
    let mut out = majority_vote(&filled, 1, Connectivity::Eight)?;
    out.clear_mask();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use surf_test_utils::{class_bands, speckled_class_bands};

    fn labels(data: Vec<u8>, rows: usize, cols: usize) -> Grid<u8> {
        Grid::from_data(data, rows, cols, (0.0, 100.0), 1.0, Some(0)).unwrap()
    }

    #[test]
    fn test_denoise_produces_a_dense_grid() {
        // Two class blocks with speckle and a hole in each.
        let mut data = Vec::with_capacity(100);
        for _ in 0..10 {
            for c in 0..10 {
                data.push(if c < 5 { 1u8 } else { 2u8 });
            }
        }
        data[22] = 2; // speckle inside the class-1 block
        data[33] = 0; // hole
        data[77] = 1; // speckle inside the class-2 block
        data[66] = 0; // hole
        let grid = labels(data, 10, 10);

        let out = denoise(&grid).unwrap();
        assert_eq!(out.shape(), (10, 10));
        assert_eq!(out.masked_count(), 0);
        assert!(out.mask().is_none());
        assert!(out.data().iter().all(|v| *v == 1 || *v == 2));
        // The speckles are gone.
        assert_eq!(out.get(2, 2), 1);
        assert_eq!(out.get(7, 7), 2);
    }

    #[test]
    fn test_denoise_preserves_georeferencing() {
        let grid = labels(vec![1u8; 16], 4, 4);
        let out = denoise(&grid).unwrap();
        assert_eq!(out.origin(), grid.origin());
        assert_eq!(out.resolution(), grid.resolution());
        assert_eq!(out.nodata(), grid.nodata());
    }

    #[test]
    fn test_denoise_of_empty_grid_is_identity() {
        let grid = labels(vec![], 0, 0);
        let out = denoise(&grid).unwrap();
        assert_eq!(out.shape(), (0, 0));
    }

    #[test]
    fn test_denoise_is_stable_on_clean_dense_input() {
        // Two large uniform bands, no holes: a second run must change
        // nothing.
        let grid = class_bands(12, 12, &[3, 4]);
        let once = denoise(&grid).unwrap();
        let twice = denoise(&once).unwrap();
        assert_eq!(once.data(), twice.data());
    }

    #[test]
    fn test_denoise_cleans_a_speckled_raster() {
        let grid = speckled_class_bands(20, 20, &[1, 2], 12, 6, 3);
        let out = denoise(&grid).unwrap();
        assert_eq!(out.masked_count(), 0);
        assert!(out.data().iter().all(|v| *v == 1 || *v == 2));
        // Away from the band boundary the result matches the clean
        // bands.
        let clean = class_bands(20, 20, &[1, 2]);
        let agree = out
            .data()
            .iter()
            .zip(clean.data())
            .filter(|(a, b)| a == b)
            .count();
        assert!(agree as f64 >= 0.9 * (20.0 * 20.0));
    }
}
