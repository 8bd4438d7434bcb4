//! The sample-major observation matrix handed to classifiers.

use crate::error::ClassifyError;

/// A dense `samples x features` matrix, one row per jointly-valid grid
/// cell, stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    values: Vec<f32>,
    samples: usize,
    features: usize,
}

impl FeatureMatrix {
    pub fn new(values: Vec<f32>, samples: usize, features: usize) -> Result<Self, ClassifyError> {
        if values.len() != samples * features {
            return Err(ClassifyError::MatrixShape {
                samples,
                features,
                expected: samples * features,
                actual: values.len(),
            });
        }
        Ok(Self {
            values,
            samples,
            features,
        })
    }

    pub fn samples(&self) -> usize {
        self.samples
    }

    pub fn features(&self) -> usize {
        self.features
    }

    /// The feature row for one sample.
    #[inline]
    pub fn sample(&self, i: usize) -> &[f32] {
        &self.values[i * self.features..(i + 1) * self.features]
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }
}
