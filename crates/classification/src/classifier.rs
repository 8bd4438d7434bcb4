//! The classifier seam.
//!
//! The pipeline never inspects a model's internals; it only needs the
//! declared feature count and the two prediction entry points.

use crate::error::ClassifyError;
use crate::matrix::FeatureMatrix;

pub trait Classifier {
    /// Number of features per sample the model was trained on.
    fn expected_feature_count(&self) -> usize;

    /// One class label per sample.
    fn predict(&self, matrix: &FeatureMatrix) -> Result<Vec<u8>, ClassifyError>;

    /// One class label and one confidence score in `[0, 1]` per sample.
    fn predict_with_confidence(
        &self,
        matrix: &FeatureMatrix,
    ) -> Result<(Vec<u8>, Vec<f32>), ClassifyError>;

    /// Reject a matrix whose width does not match the model.
    fn check_feature_count(&self, matrix: &FeatureMatrix) -> Result<(), ClassifyError> {
        let expected = self.expected_feature_count();
        if matrix.features() != expected {
            return Err(ClassifyError::FeatureCountMismatch {
                expected,
                actual: matrix.features(),
            });
        }
        Ok(())
    }
}
