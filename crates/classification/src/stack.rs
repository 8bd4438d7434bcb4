//! Aligning feature rasters into one observation matrix and scattering
//! classifier output back onto the grid.

use surf_common::Grid;
use tracing::debug;

use crate::error::ClassifyError;
use crate::matrix::FeatureMatrix;

/// N co-registered feature bands reduced to their jointly-valid cells.
///
/// Holds the observation matrix plus everything needed to put per-cell
/// results back where they came from: the valid-cell mask in row-major
/// cell order and the shared georeferencing of the bands.
#[derive(Debug, Clone)]
pub struct StackedFeatures {
    matrix: FeatureMatrix,
    valid: Vec<bool>,
    rows: usize,
    cols: usize,
    origin: (f64, f64),
    resolution: f64,
}

impl StackedFeatures {
    /// Stack feature bands into an observation matrix.
    ///
    /// Every band must be stackable with band 0 (same shape, origin and
    /// resolution); the first offender is reported by index. A cell is
    /// valid only if it is valid in every band. Band order is preserved
    /// in the matrix columns.
    pub fn stack(bands: &[Grid<f32>]) -> Result<Self, ClassifyError> {
        let first = bands.first().ok_or(ClassifyError::NoBands)?;
        for (band, grid) in bands.iter().enumerate().skip(1) {
            first
                .ensure_stackable(grid)
                .map_err(|source| ClassifyError::BandMisaligned { band, source })?;
        }

        let (rows, cols) = first.shape();
        let mut valid = vec![true; rows * cols];
        for band in bands {
            for (v, masked) in valid.iter_mut().zip(band.value_mask()) {
                *v &= !masked;
            }
        }
        let valid_count = valid.iter().filter(|v| **v).count();
        debug!(
            bands = bands.len(),
            cells = rows * cols,
            valid = valid_count,
            "stacked feature bands"
        );

        let mut values = Vec::with_capacity(valid_count * bands.len());
        for (i, ok) in valid.iter().enumerate() {
            if !ok {
                continue;
            }
            for band in bands {
                values.push(band.data()[i]);
            }
        }
        Ok(Self {
            matrix: FeatureMatrix::new(values, valid_count, bands.len())?,
            valid,
            rows,
            cols,
            origin: first.origin(),
            resolution: first.resolution(),
        })
    }

    pub fn matrix(&self) -> &FeatureMatrix {
        &self.matrix
    }

    /// Number of cells valid in every band.
    pub fn valid_cell_count(&self) -> usize {
        self.matrix.samples()
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Put per-sample class labels back onto the grid. Cells outside
    /// the valid mask get `nodata_label`.
    pub fn scatter_back(
        &self,
        labels: &[u8],
        nodata_label: u8,
    ) -> Result<Grid<u8>, ClassifyError> {
        self.scatter(labels, nodata_label)
    }

    /// Put per-sample confidence scores back onto the grid. Cells
    /// outside the valid mask get 0.
    pub fn scatter_confidence(&self, scores: &[f32]) -> Result<Grid<f32>, ClassifyError> {
        self.scatter(scores, 0.0)
    }

    fn scatter<T: surf_common::GridValue>(
        &self,
        results: &[T],
        nodata: T,
    ) -> Result<Grid<T>, ClassifyError> {
        if results.len() != self.valid_cell_count() {
            return Err(ClassifyError::ResultLengthMismatch {
                expected: self.valid_cell_count(),
                actual: results.len(),
            });
        }
        let mut grid = Grid::filled(
            self.rows,
            self.cols,
            self.origin,
            self.resolution,
            nodata,
            Some(nodata),
        )?;
        let mut next = results.iter();
        for (i, ok) in self.valid.iter().enumerate() {
            if *ok {
                // One result per valid cell, length checked above.
                if let Some(v) = next.next() {
                    grid.set(i / self.cols, i % self.cols, *v);
                }
            }
        }
        Ok(grid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use surf_common::GridError;

    fn band(data: Vec<f32>, origin: (f64, f64), resolution: f64) -> Grid<f32> {
        Grid::from_data(data, 2, 3, origin, resolution, Some(-999.0)).unwrap()
    }

    #[test]
    fn test_stack_rejects_empty_input() {
        assert!(matches!(
            StackedFeatures::stack(&[]),
            Err(ClassifyError::NoBands)
        ));
    }

    #[test]
    fn test_stack_names_the_misaligned_band() {
        let a = band(vec![1.0; 6], (0.0, 10.0), 1.0);
        let b = band(vec![2.0; 6], (0.0, 10.0), 1.0);
        let c = band(vec![3.0; 6], (0.0, 10.0), 2.0);
        let err = StackedFeatures::stack(&[a, b, c]).unwrap_err();
        match err {
            ClassifyError::BandMisaligned { band: 2, source } => {
                assert!(matches!(source, GridError::ResolutionMismatch { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_valid_count_is_the_and_of_band_masks() {
        let mut a = band(vec![1.0; 6], (0.0, 10.0), 1.0);
        let mut b = band(vec![2.0; 6], (0.0, 10.0), 1.0);
        a.set(0, 0, -999.0);
        b.set(1, 2, -999.0);
        let stacked = StackedFeatures::stack(&[a, b]).unwrap();
        assert_eq!(stacked.valid_cell_count(), 4);
        assert_eq!(stacked.matrix().features(), 2);
    }

    #[test]
    fn test_matrix_preserves_band_order_and_cell_order() {
        let a = band(vec![10.0, 11.0, 12.0, 13.0, 14.0, 15.0], (0.0, 10.0), 1.0);
        let b = band(vec![20.0, 21.0, 22.0, 23.0, 24.0, 25.0], (0.0, 10.0), 1.0);
        let stacked = StackedFeatures::stack(&[a, b]).unwrap();
        assert_eq!(stacked.matrix().sample(0), &[10.0, 20.0]);
        assert_eq!(stacked.matrix().sample(5), &[15.0, 25.0]);
    }

    #[test]
    fn test_scatter_back_reinserts_nodata() {
        let mut a = band(vec![1.0; 6], (0.0, 10.0), 1.0);
        a.set(0, 1, -999.0);
        let stacked = StackedFeatures::stack(&[a]).unwrap();
        assert_eq!(stacked.valid_cell_count(), 5);

        let labels = vec![1u8, 2, 3, 4, 5];
        let grid = stacked.scatter_back(&labels, 0).unwrap();
        assert_eq!(grid.data(), &[1, 0, 2, 3, 4, 5]);
        assert_eq!(grid.nodata(), Some(0));
        assert!(grid.is_masked(0, 1));
        assert_eq!(grid.origin(), (0.0, 10.0));
    }

    #[test]
    fn test_scatter_confidence_uses_zero_nodata() {
        let mut a = band(vec![1.0; 6], (0.0, 10.0), 1.0);
        a.set(1, 0, -999.0);
        let stacked = StackedFeatures::stack(&[a]).unwrap();
        let scores = vec![0.9f32, 0.8, 0.7, 0.6, 0.5];
        let grid = stacked.scatter_confidence(&scores).unwrap();
        assert_eq!(grid.data(), &[0.9, 0.8, 0.7, 0.0, 0.6, 0.5]);
        assert_eq!(grid.nodata(), Some(0.0));
    }

    #[test]
    fn test_scatter_checks_result_length() {
        let a = band(vec![1.0; 6], (0.0, 10.0), 1.0);
        let stacked = StackedFeatures::stack(&[a]).unwrap();
        assert!(matches!(
            stacked.scatter_back(&[1u8, 2], 0),
            Err(ClassifyError::ResultLengthMismatch {
                expected: 6,
                actual: 2
            })
        ));
    }
}
