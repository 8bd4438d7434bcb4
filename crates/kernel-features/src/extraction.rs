//! The sliding-window statistics engine.

use std::str::FromStr;

use tracing::debug;

use surf_common::Grid;

use crate::error::FeatureError;

/// Neighborhoods larger than this take longer to calculate and remove
/// too much information from the features.
pub const MAX_NEIGHBORHOOD: usize = 13;

/// How the raster edge is handled when the window does not fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeMode {
    /// Output shrinks by (N-1) cells per axis; origin shifts inward.
    Crop,
    /// Input is mirrored outward (without repeating the edge sample);
    /// output covers the input extent.
    Reflect,
}

impl FromStr for EdgeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "crop" => Ok(EdgeMode::Crop),
            "reflect" => Ok(EdgeMode::Reflect),
            other => Err(format!("unknown edge mode '{other}', expected crop|reflect")),
        }
    }
}

/// The neighborhood statistics this extractor can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureKind {
    /// Masked mean of the neighborhood, including the target cell.
    Mean,
    /// Masked population variance of the neighborhood.
    Var,
    /// Target cell value minus the neighborhood mean.
    DiffMean,
}

impl FeatureKind {
    /// Band name used in output filenames.
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureKind::Mean => "mean",
            FeatureKind::Var => "var",
            FeatureKind::DiffMean => "diffmean",
        }
    }
}

impl FromStr for FeatureKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mean" => Ok(FeatureKind::Mean),
            "var" => Ok(FeatureKind::Var),
            "diffmean" => Ok(FeatureKind::DiffMean),
            other => Err(format!(
                "unknown feature '{other}', expected mean|var|diffmean"
            )),
        }
    }
}

/// Extracts neighborhood statistics from a single-band grid.
pub struct KernelFeatureExtraction {
    grid: Grid<f32>,
    features: Vec<FeatureKind>,
    neighborhood: usize,
    edge_mode: EdgeMode,
}

impl KernelFeatureExtraction {
    /// Neighborhood size is validated here, before any computation:
    /// it must be odd and within 1..=[`MAX_NEIGHBORHOOD`].
    pub fn new(
        grid: Grid<f32>,
        features: Vec<FeatureKind>,
        neighborhood: usize,
        edge_mode: EdgeMode,
    ) -> Result<Self, FeatureError> {
        if neighborhood == 0 {
            return Err(FeatureError::ZeroNeighborhood(neighborhood));
        }
        if neighborhood % 2 == 0 {
            return Err(FeatureError::EvenNeighborhood(neighborhood));
        }
        if neighborhood > MAX_NEIGHBORHOOD {
            return Err(FeatureError::NeighborhoodTooLarge(neighborhood));
        }
        if features.is_empty() {
            return Err(FeatureError::NoFeatures);
        }
        Ok(Self {
            grid,
            features,
            neighborhood,
            edge_mode,
        })
    }

    /// (rows, cols) of the output grids.
    pub fn output_shape(&self) -> (usize, usize) {
        let (rows, cols) = self.grid.shape();
        match self.edge_mode {
            EdgeMode::Reflect => (rows, cols),
            EdgeMode::Crop => (
                rows.saturating_sub(self.neighborhood - 1),
                cols.saturating_sub(self.neighborhood - 1),
            ),
        }
    }

    /// Origin of the output grids. Crop mode trims (N-1)/2 cells from
    /// every edge, so the origin moves inward by that many cells.
    pub fn output_origin(&self) -> (f64, f64) {
        let (ox, oy) = self.grid.origin();
        match self.edge_mode {
            EdgeMode::Reflect => (ox, oy),
            EdgeMode::Crop => {
                let shift = ((self.neighborhood - 1) / 2) as f64 * self.grid.resolution();
                (ox + shift, oy - shift)
            }
        }
    }

    /// Compute all requested features.
    ///
    /// Returned grids are in request order, each paired with its kind.
    /// An output cell is masked when the corresponding input cell (at
    /// the original extent) is nodata, regardless of how many of its
    /// neighbors were valid.
    pub fn compute(&self) -> Result<Vec<(FeatureKind, Grid<f32>)>, FeatureError> {
        let (rows, cols) = self.grid.shape();
        let (out_rows, out_cols) = self.output_shape();
        let n = self.neighborhood;
        let pad = (n - 1) / 2;
        let nodata = self.grid.nodata();
        // Explicitly masked cells participate as the sentinel so the
        // reductions see a single representation of "no observation".
        let values = self.grid.filled_data()?;

        debug!(
            rows,
            cols,
            out_rows,
            out_cols,
            neighborhood = n,
            edge_mode = ?self.edge_mode,
            "computing kernel features"
        );

        // Per output cell: masked mean, masked population variance and
        // the center value, accumulated in one pass over each window.
        // Windows are addressed by index arithmetic over the flat input
        // buffer; nothing is copied per cell.
        let cells = out_rows * out_cols;
        let mut means = vec![0.0f64; cells];
        let mut vars = vec![0.0f64; cells];
        let mut counts = vec![0usize; cells];
        let mut centers = vec![0.0f32; cells];

        for out_r in 0..out_rows {
            for out_c in 0..out_cols {
                let out_i = out_r * out_cols + out_c;
                let mut sum = 0.0f64;
                let mut sumsq = 0.0f64;
                let mut count = 0usize;
                for wr in 0..n {
                    for wc in 0..n {
                        // Window coordinates in input space. Crop mode
                        // windows sit fully inside; reflect mode mirrors
                        // out-of-range indices back into the grid.
                        let (r, c) = match self.edge_mode {
                            EdgeMode::Crop => (out_r + wr, out_c + wc),
                            EdgeMode::Reflect => (
                                reflect_index(out_r as isize + wr as isize - pad as isize, rows),
                                reflect_index(out_c as isize + wc as isize - pad as isize, cols),
                            ),
                        };
                        let v = values[r * cols + c];
                        if nodata.map_or(false, |nd| v == nd) {
                            continue;
                        }
                        sum += v as f64;
                        sumsq += (v as f64) * (v as f64);
                        count += 1;
                    }
                }
                if count > 0 {
                    let mean = sum / count as f64;
                    means[out_i] = mean;
                    vars[out_i] = (sumsq / count as f64 - mean * mean).max(0.0);
                }
                counts[out_i] = count;

                // Center cell at the original extent; in crop mode the
                // output is offset by `pad` relative to the input.
                let (center_r, center_c) = match self.edge_mode {
                    EdgeMode::Crop => (out_r + pad, out_c + pad),
                    EdgeMode::Reflect => (out_r, out_c),
                };
                centers[out_i] = values[center_r * cols + center_c];
            }
        }

        let origin = self.output_origin();
        let resolution = self.grid.resolution();
        let mut outputs = Vec::with_capacity(self.features.len());
        for kind in &self.features {
            let mut data = vec![0.0f32; cells];
            let mut mask = vec![false; cells];
            for i in 0..cells {
                let center_is_nodata = nodata.map_or(false, |nd| centers[i] == nd);
                if center_is_nodata || counts[i] == 0 {
                    mask[i] = true;
                    data[i] = nodata.unwrap_or(f32::NAN);
                    continue;
                }
                data[i] = match kind {
                    FeatureKind::Mean => means[i] as f32,
                    FeatureKind::Var => vars[i] as f32,
                    FeatureKind::DiffMean => centers[i] - means[i] as f32,
                };
            }
            let mut grid =
                Grid::from_data(data, out_rows, out_cols, origin, resolution, nodata)?;
            grid.set_mask(mask)?;
            outputs.push((*kind, grid));
        }
        Ok(outputs)
    }
}

/// Mirror an index into `0..len` without repeating the edge sample:
/// -1 maps to 1, `len` maps to `len - 2`.
fn reflect_index(i: isize, len: usize) -> usize {
    debug_assert!(len > 0);
    if len == 1 {
        return 0;
    }
    let period = 2 * (len as isize - 1);
    let mut i = i.rem_euclid(period);
    if i >= len as isize {
        i = period - i;
    }
    i as usize
}
