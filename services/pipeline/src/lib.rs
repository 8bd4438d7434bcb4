//! Pipeline driver library.
//!
//! The `surfmap` binary is a thin CLI over these modules; they are
//! exposed as a library so integration tests can drive the pipeline
//! without spawning the binary.

pub mod config;
pub mod error;
pub mod ops;
pub mod runner;

pub use config::{RunConfig, TileConfig};
pub use error::PipelineError;
