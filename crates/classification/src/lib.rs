//! Feature stacking and masked classification.
//!
//! Takes N co-registered feature rasters, reduces them to the cells
//! valid in every band, hands the resulting observation matrix to a
//! [`Classifier`], and scatters labels (and optionally confidence
//! scores) back into georeferenced grids with nodata reinserted.

pub mod classifier;
pub mod error;
pub mod forest;
pub mod matrix;
pub mod stack;

pub use classifier::Classifier;
pub use error::ClassifyError;
pub use forest::RandomForestModel;
pub use matrix::FeatureMatrix;
pub use stack::StackedFeatures;
