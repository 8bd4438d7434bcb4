//! In-memory point cloud model.

use std::collections::BTreeMap;

use crate::error::SamplerError;

/// Default nodata sentinel per point dimension, chosen to stay outside
/// each dimension's observed value range.
pub fn default_nodata(dimension: &str) -> Option<f64> {
    match dimension {
        "Z" => Some(-999.0),
        "Intensity" => Some(0.0),
        "ReturnNumber" => Some(0.0),
        "NumberOfReturns" => Some(0.0),
        "Classification" => Some(255.0),
        "ScanAngleRank" => Some(-999.0),
        "Pulse width" => Some(-999.0),
        "Amplitude" => Some(-999.0),
        "PointSourceId" => Some(0.0),
        _ => None,
    }
}

/// One point as carried by a [`PointCloud`].
///
/// Convenience for building clouds record-by-record in tests and small
/// tools; bulk readers fill the column vectors directly.
#[derive(Debug, Clone, Copy)]
pub struct PointRecord {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub intensity: u16,
    pub return_number: u8,
    pub number_of_returns: u8,
    pub classification: u8,
    pub scan_angle: f32,
    pub point_source_id: u16,
}

impl Default for PointRecord {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            intensity: 0,
            return_number: 1,
            number_of_returns: 1,
            classification: 2,
            scan_angle: 0.0,
            point_source_id: 0,
        }
    }
}

/// An ordered, column-oriented point cloud.
///
/// Standard dimensions are stored in their native width; additional
/// per-point attributes (e.g. "Amplitude", "Pulse width") are attached
/// as named f64 columns. Order is significant: the sampler's tie-break
/// rules refer to it.
#[derive(Debug, Clone, Default)]
pub struct PointCloud {
    pub(crate) x: Vec<f64>,
    pub(crate) y: Vec<f64>,
    pub(crate) z: Vec<f64>,
    pub(crate) intensity: Vec<u16>,
    pub(crate) return_number: Vec<u8>,
    pub(crate) number_of_returns: Vec<u8>,
    pub(crate) classification: Vec<u8>,
    pub(crate) scan_angle: Vec<f32>,
    pub(crate) point_source_id: Vec<u16>,
    pub(crate) extra: BTreeMap<String, Vec<f64>>,
}

impl PointCloud {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Append one point. Extra dimensions must be re-attached after all
    /// points are pushed.
    pub fn push(&mut self, record: PointRecord) {
        self.x.push(record.x);
        self.y.push(record.y);
        self.z.push(record.z);
        self.intensity.push(record.intensity);
        self.return_number.push(record.return_number);
        self.number_of_returns.push(record.number_of_returns);
        self.classification.push(record.classification);
        self.scan_angle.push(record.scan_angle);
        self.point_source_id.push(record.point_source_id);
    }

    pub fn from_records(records: impl IntoIterator<Item = PointRecord>) -> Self {
        let mut cloud = Self::new();
        for record in records {
            cloud.push(record);
        }
        cloud
    }

    /// Attach a named extra dimension with one value per point.
    pub fn insert_dimension(
        &mut self,
        name: impl Into<String>,
        values: Vec<f64>,
    ) -> Result<(), SamplerError> {
        let name = name.into();
        if values.len() != self.len() {
            return Err(SamplerError::DimensionLength {
                name,
                expected: self.len(),
                actual: values.len(),
            });
        }
        self.extra.insert(name, values);
        Ok(())
    }

    /// All dimension names present in this cloud.
    pub fn dimension_names(&self) -> Vec<String> {
        let mut names: Vec<String> = [
            "X",
            "Y",
            "Z",
            "Intensity",
            "ReturnNumber",
            "NumberOfReturns",
            "Classification",
            "ScanAngleRank",
            "PointSourceId",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        names.extend(self.extra.keys().cloned());
        names
    }

    pub fn has_dimension(&self, name: &str) -> bool {
        matches!(
            name,
            "X" | "Y"
                | "Z"
                | "Intensity"
                | "ReturnNumber"
                | "NumberOfReturns"
                | "Classification"
                | "ScanAngleRank"
                | "PointSourceId"
        ) || self.extra.contains_key(name)
    }

    /// The values of a dimension widened to f64, in point order.
    pub fn dimension_values(&self, name: &str) -> Result<Vec<f64>, SamplerError> {
        match name {
            "X" => Ok(self.x.clone()),
            "Y" => Ok(self.y.clone()),
            "Z" => Ok(self.z.clone()),
            "Intensity" => Ok(self.intensity.iter().map(|v| *v as f64).collect()),
            "ReturnNumber" => Ok(self.return_number.iter().map(|v| *v as f64).collect()),
            "NumberOfReturns" => Ok(self.number_of_returns.iter().map(|v| *v as f64).collect()),
            "Classification" => Ok(self.classification.iter().map(|v| *v as f64).collect()),
            "ScanAngleRank" => Ok(self.scan_angle.iter().map(|v| *v as f64).collect()),
            "PointSourceId" => Ok(self.point_source_id.iter().map(|v| *v as f64).collect()),
            other => match self.extra.get(other) {
                Some(values) => Ok(values.clone()),
                None => Err(SamplerError::UnknownDimension {
                    name: other.to_string(),
                    available: self.dimension_names(),
                }),
            },
        }
    }

    /// Keep only the points where `keep` is true.
    pub fn retain_where(&mut self, keep: &[bool]) {
        debug_assert_eq!(keep.len(), self.len());
        let mut i;

        macro_rules! retain_column {
            ($col:expr) => {
                i = 0;
                $col.retain(|_| {
                    let k = keep[i];
                    i += 1;
                    k
                });
            };
        }

        retain_column!(self.x);
        retain_column!(self.y);
        retain_column!(self.z);
        retain_column!(self.intensity);
        retain_column!(self.return_number);
        retain_column!(self.number_of_returns);
        retain_column!(self.classification);
        retain_column!(self.scan_angle);
        retain_column!(self.point_source_id);
        for values in self.extra.values_mut() {
            retain_column!(*values);
        }
    }

    /// Append all points (and matching extra dimensions) of another cloud.
    pub fn append(&mut self, mut other: PointCloud) {
        // Extra columns must exist on both sides to survive a merge;
        // a column missing from either cloud is dropped.
        let keys: Vec<String> = self.extra.keys().cloned().collect();
        for key in keys {
            match other.extra.remove(&key) {
                Some(theirs) => {
                    if let Some(ours) = self.extra.get_mut(&key) {
                        ours.extend(theirs);
                    }
                }
                None => {
                    self.extra.remove(&key);
                }
            }
        }
        self.x.extend(other.x);
        self.y.extend(other.y);
        self.z.extend(other.z);
        self.intensity.extend(other.intensity);
        self.return_number.extend(other.return_number);
        self.number_of_returns.extend(other.number_of_returns);
        self.classification.extend(other.classification);
        self.scan_angle.extend(other.scan_angle);
        self.point_source_id.extend(other.point_source_id);
    }
}
