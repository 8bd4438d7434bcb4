//! Kernel feature extraction: per-cell neighborhood statistics.
//!
//! For every cell of a single-band grid, computes statistics over the
//! NxN neighborhood centered on it: the masked mean, the masked
//! population variance and the difference between the cell value and
//! the neighborhood mean. Neighbors holding the nodata sentinel are
//! excluded from the reductions.
//!
//! Two edge policies are supported: `Crop` discards cells whose full
//! neighborhood is not available (the output shrinks by N-1 per axis
//! and the origin shifts inward), `Reflect` mirrors boundary data
//! outward so the output covers the input extent exactly.

pub mod error;
pub mod extraction;

pub use error::FeatureError;
pub use extraction::{EdgeMode, FeatureKind, KernelFeatureExtraction, MAX_NEIGHBORHOOD};
