//! Reading LAS/LAZ point files into a [`PointCloud`].

use std::path::{Path, PathBuf};

use las::{Read as LasRead, Reader};
use tracing::{debug, info, warn};

use surf_common::BoundingBox;

use crate::error::SamplerError;
use crate::points::{PointCloud, PointRecord};

/// LiDAR ground classification code (ASPRS class 2).
pub const GROUND_CLASS: u8 = 2;

/// Returns with a pulse width at or above this value are sensor
/// saturation artifacts and are dropped when the dimension is present.
pub const PULSE_WIDTH_CUTOFF: f64 = 2.55;

/// Reader policy applied before points are handed to the sampler.
#[derive(Debug, Clone)]
pub struct LasSourceOptions {
    /// Keep only ground returns (classification == 2).
    pub ground_only: bool,
    /// Drop points outside this bbox while reading (half-open bounds,
    /// same convention as [`GridSampler::crop_to_bbox`]).
    ///
    /// [`GridSampler::crop_to_bbox`]: crate::sampler::GridSampler::crop_to_bbox
    pub bbox: Option<BoundingBox>,
}

impl Default for LasSourceOptions {
    fn default() -> Self {
        Self {
            ground_only: true,
            bbox: None,
        }
    }
}

/// Reads one or more LAS/LAZ files into a single merged point cloud.
pub struct LasSource {
    paths: Vec<PathBuf>,
    options: LasSourceOptions,
}

impl LasSource {
    pub fn new(paths: impl IntoIterator<Item = impl AsRef<Path>>, options: LasSourceOptions) -> Self {
        Self {
            paths: paths.into_iter().map(|p| p.as_ref().to_path_buf()).collect(),
            options,
        }
    }

    /// Read and merge all files, applying the configured filters.
    pub fn read(&self) -> Result<PointCloud, SamplerError> {
        let mut cloud = PointCloud::new();
        if self.options.ground_only {
            warn!("filtering away everything but ground returns");
        }
        for path in &self.paths {
            let part = self.read_one(path)?;
            debug!(path = %path.display(), points = part.len(), "read LAS file");
            if cloud.is_empty() {
                cloud = part;
            } else {
                cloud.append(part);
            }
        }
        info!(points = cloud.len(), files = self.paths.len(), "merged point cloud");
        Ok(cloud)
    }

    fn read_one(&self, path: &Path) -> Result<PointCloud, SamplerError> {
        let mut reader = Reader::from_path(path)?;
        let mut cloud = PointCloud::new();
        for wrapped in reader.points() {
            let point = wrapped?;
            let classification = u8::from(point.classification);
            if self.options.ground_only && classification != GROUND_CLASS {
                continue;
            }
            if let Some(bbox) = &self.options.bbox {
                if !bbox.contains_point(point.x, point.y) {
                    continue;
                }
            }
            cloud.push(PointRecord {
                x: point.x,
                y: point.y,
                z: point.z,
                intensity: point.intensity,
                return_number: point.return_number,
                number_of_returns: point.number_of_returns,
                classification,
                scan_angle: point.scan_angle,
                point_source_id: point.point_source_id,
            });
        }
        Ok(cloud)
    }
}

/// Drop points whose "Pulse width" is at or above [`PULSE_WIDTH_CUTOFF`].
///
/// A no-op for clouds without that dimension.
pub fn apply_pulse_width_cutoff(cloud: &mut PointCloud) -> Result<(), SamplerError> {
    if !cloud.has_dimension("Pulse width") {
        return Ok(());
    }
    let widths = cloud.dimension_values("Pulse width")?;
    let keep: Vec<bool> = widths.iter().map(|w| *w < PULSE_WIDTH_CUTOFF).collect();
    let before = cloud.len();
    cloud.retain_where(&keep);
    if cloud.len() != before {
        warn!(
            dropped = before - cloud.len(),
            cutoff = PULSE_WIDTH_CUTOFF,
            "dropped returns with saturated pulse width"
        );
    }
    Ok(())
}
