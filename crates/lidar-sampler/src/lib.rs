//! LiDAR point handling for the surfmap pipeline.
//!
//! [`PointCloud`] is the in-memory point model, [`LasSource`] fills it
//! from LAS/LAZ files, [`GridSampler`] reduces it to one value per
//! output grid cell and [`LidarRasterizer`] drives the whole
//! point-to-raster step for a list of dimensions.

pub mod error;
pub mod las_source;
pub mod points;
pub mod rasterizer;
pub mod sampler;

pub use error::SamplerError;
pub use las_source::{apply_pulse_width_cutoff, LasSource, LasSourceOptions};
pub use points::{default_nodata, PointCloud, PointRecord};
pub use rasterizer::{LidarRasterizer, RasterizeError};
pub use sampler::GridSampler;
