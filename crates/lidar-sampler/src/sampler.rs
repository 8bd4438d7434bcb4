//! Point-to-grid sampling.

use num_traits::NumCast;
use tracing::debug;

use surf_common::{BoundingBox, Grid, GridValue};

use crate::error::SamplerError;
use crate::points::PointCloud;

/// Samples a point cloud with a grid: one and only one of the points
/// falling within a cell is selected for that cell, and the selected
/// point's value for a requested dimension is written to the cell.
///
/// With [`use_min_scanangle`](GridSampler::use_min_scanangle) enabled
/// (the default) the selected point is the one with the smallest
/// absolute scan angle, i.e. the most nadir-looking return. Otherwise
/// the last point in input order wins.
pub struct GridSampler {
    cloud: PointCloud,
    bbox: BoundingBox,
    resolution: f64,
    rows: usize,
    cols: usize,
    /// Select points with the lowest absolute scan angle per cell.
    pub use_min_scanangle: bool,
    /// Scatter order (indices into the cloud); rebuilt on demand.
    order: Option<Vec<usize>>,
}

impl GridSampler {
    /// Create a sampler for a cloud, a target bbox and a cell size.
    ///
    /// If the cloud has not been spatially filtered to `bbox`, call
    /// [`crop_to_bbox`](Self::crop_to_bbox) before the first
    /// [`make_grid`](Self::make_grid).
    pub fn new(
        cloud: PointCloud,
        bbox: BoundingBox,
        resolution: f64,
    ) -> Result<Self, SamplerError> {
        let (rows, cols) = Grid::<f32>::shape_for_bbox(&bbox, resolution)?;
        Ok(Self {
            cloud,
            bbox,
            resolution,
            rows,
            cols,
            use_min_scanangle: true,
            order: None,
        })
    }

    /// (rows, cols) of the output grid.
    pub fn grid_shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn point_count(&self) -> usize {
        self.cloud.len()
    }

    /// Remove points falling outside the sampling grid.
    ///
    /// Bounds are half-open to match cell indexing from the upper-left
    /// origin: `xmin <= X < xmax`, `ymin < Y <= ymax`. Idempotent for a
    /// fixed bbox.
    pub fn crop_to_bbox(&mut self) {
        let bbox = self.bbox;
        let keep: Vec<bool> = self
            .cloud
            .x
            .iter()
            .zip(self.cloud.y.iter())
            .map(|(&x, &y)| bbox.contains_point(x, y))
            .collect();
        let before = self.cloud.len();
        self.cloud.retain_where(&keep);
        self.order = None;
        debug!(
            removed = before - self.cloud.len(),
            remaining = self.cloud.len(),
            "cropped point cloud to bbox"
        );
    }

    /// Compute the scatter order. Later writes overwrite earlier ones,
    /// so sorting by descending |scan angle| leaves the most nadir
    /// return in each cell. The sort is stable: among equal absolute
    /// angles the original relative order is preserved.
    fn prepare(&mut self) {
        let mut order: Vec<usize> = (0..self.cloud.len()).collect();
        if self.use_min_scanangle {
            let angles = &self.cloud.scan_angle;
            order.sort_by(|&a, &b| angles[b].abs().total_cmp(&angles[a].abs()));
        }
        self.order = Some(order);
    }

    /// Cell index of a point, or None if it lies outside the grid.
    fn cell_index(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        let col = ((x - self.bbox.min_x) / self.resolution).floor();
        let row = ((self.bbox.max_y - y) / self.resolution).floor();
        if col < 0.0 || row < 0.0 {
            return None;
        }
        let (row, col) = (row as usize, col as usize);
        if row >= self.rows || col >= self.cols {
            return None;
        }
        Some((row, col))
    }

    /// Sample one dimension onto a grid.
    ///
    /// The output grid is pre-filled with `nodata` and carries an
    /// explicit observation mask built from which cells actually
    /// received a point, so a sampled value equal to the sentinel is
    /// still a valid observation.
    pub fn make_grid<T: GridValue>(
        &mut self,
        dimension: &str,
        nodata: f64,
    ) -> Result<Grid<T>, SamplerError> {
        if self.order.is_none() {
            self.prepare();
        }
        let values = self.cloud.dimension_values(dimension)?;
        let nd: T = NumCast::from(nodata).ok_or(SamplerError::NodataNotRepresentable {
            nodata,
            dtype: T::TYPE_NAME,
        })?;

        let mut grid = Grid::filled(
            self.rows,
            self.cols,
            (self.bbox.min_x, self.bbox.max_y),
            self.resolution,
            nd,
            Some(nd),
        )?;
        let mut observed = vec![false; self.rows * self.cols];

        debug!(
            dimension,
            nodata,
            rows = self.rows,
            cols = self.cols,
            points = self.cloud.len(),
            "gridding dimension"
        );

        let order = self.order.as_deref().unwrap_or(&[]);
        for &i in order {
            let (x, y) = (self.cloud.x[i], self.cloud.y[i]);
            let (row, col) = self
                .cell_index(x, y)
                .ok_or(SamplerError::PointOutsideGrid { x, y })?;
            let value: T =
                NumCast::from(values[i]).ok_or_else(|| SamplerError::ValueNotRepresentable {
                    dimension: dimension.to_string(),
                    value: values[i],
                    dtype: T::TYPE_NAME,
                })?;
            grid.set(row, col, value);
            observed[row * self.cols + col] = true;
        }

        let mask: Vec<bool> = observed.iter().map(|o| !o).collect();
        grid.set_mask(mask)?;
        Ok(grid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::points::PointRecord;

    fn bbox_10x10() -> BoundingBox {
        BoundingBox::new(0.0, 0.0, 10.0, 10.0)
    }

    fn point(x: f64, y: f64, z: f64, scan_angle: f32) -> PointRecord {
        PointRecord {
            x,
            y,
            z,
            scan_angle,
            ..Default::default()
        }
    }

    #[test]
    fn test_grid_shape_rounds_up() {
        let sampler = GridSampler::new(
            PointCloud::new(),
            BoundingBox::new(0.0, 0.0, 10.0, 7.0),
            4.0,
        )
        .unwrap();
        assert_eq!(sampler.grid_shape(), (2, 3));
    }

    #[test]
    fn test_rejects_nonpositive_resolution() {
        assert!(GridSampler::new(PointCloud::new(), bbox_10x10(), 0.0).is_err());
        assert!(GridSampler::new(PointCloud::new(), bbox_10x10(), -2.0).is_err());
    }

    #[test]
    fn test_empty_cloud_yields_all_nodata() {
        let mut sampler = GridSampler::new(PointCloud::new(), bbox_10x10(), 1.0).unwrap();
        let grid: Grid<f32> = sampler.make_grid("Z", -999.0).unwrap();
        assert_eq!(grid.shape(), (10, 10));
        assert!(grid.data().iter().all(|v| *v == -999.0));
        assert_eq!(grid.masked_count(), 100);
    }

    #[test]
    fn test_scatter_places_point_in_expected_cell() {
        let cloud = PointCloud::from_records(vec![point(2.5, 9.5, 42.0, 0.0)]);
        let mut sampler = GridSampler::new(cloud, bbox_10x10(), 1.0).unwrap();
        let grid: Grid<f32> = sampler.make_grid("Z", -999.0).unwrap();
        // x=2.5 -> col 2; y=9.5 -> row 0.
        assert_eq!(grid.get(0, 2), 42.0);
        assert!(!grid.is_masked(0, 2));
        assert_eq!(grid.masked_count(), 99);
    }

    #[test]
    fn test_edge_coordinates_follow_half_open_convention() {
        // y == ymax is row 0; x == xmin is col 0.
        let cloud = PointCloud::from_records(vec![point(0.0, 10.0, 5.0, 0.0)]);
        let mut sampler = GridSampler::new(cloud, bbox_10x10(), 1.0).unwrap();
        let grid: Grid<f32> = sampler.make_grid("Z", -999.0).unwrap();
        assert_eq!(grid.get(0, 0), 5.0);
    }

    #[test]
    fn test_crop_removes_outside_and_far_edges() {
        let cloud = PointCloud::from_records(vec![
            point(5.0, 5.0, 1.0, 0.0),   // inside
            point(10.0, 5.0, 2.0, 0.0),  // x == xmax: out
            point(5.0, 0.0, 3.0, 0.0),   // y == ymin: out
            point(-1.0, 5.0, 4.0, 0.0),  // out
            point(0.0, 10.0, 5.0, 0.0),  // x == xmin, y == ymax: in
        ]);
        let mut sampler = GridSampler::new(cloud, bbox_10x10(), 1.0).unwrap();
        sampler.crop_to_bbox();
        assert_eq!(sampler.point_count(), 2);
        sampler.crop_to_bbox();
        assert_eq!(sampler.point_count(), 2, "crop must be idempotent");
    }

    #[test]
    fn test_uncropped_outside_point_is_an_error() {
        let cloud = PointCloud::from_records(vec![point(20.0, 5.0, 1.0, 0.0)]);
        let mut sampler = GridSampler::new(cloud, bbox_10x10(), 1.0).unwrap();
        let result: Result<Grid<f32>, _> = sampler.make_grid("Z", -999.0);
        assert!(matches!(result, Err(SamplerError::PointOutsideGrid { .. })));
    }

    #[test]
    fn test_min_scanangle_tiebreak() {
        // Two points in the same cell: angle -10 with value 1, angle 3
        // with value 2. The +3 point is closer to nadir and must win.
        let cloud = PointCloud::from_records(vec![
            point(5.5, 5.5, 1.0, -10.0),
            point(5.4, 5.4, 2.0, 3.0),
        ]);
        let mut sampler = GridSampler::new(cloud, bbox_10x10(), 1.0).unwrap();
        let grid: Grid<f32> = sampler.make_grid("Z", -999.0).unwrap();
        assert_eq!(grid.get(4, 5), 2.0);
    }

    #[test]
    fn test_scanangle_disabled_keeps_input_order() {
        let cloud = PointCloud::from_records(vec![
            point(5.5, 5.5, 1.0, -10.0),
            point(5.4, 5.4, 2.0, 3.0),
        ]);
        let mut sampler = GridSampler::new(cloud, bbox_10x10(), 1.0).unwrap();
        sampler.use_min_scanangle = false;
        let grid: Grid<f32> = sampler.make_grid("Z", -999.0).unwrap();
        // Last point in input order wins.
        assert_eq!(grid.get(4, 5), 2.0);

        // Reversed input order flips the winner.
        let cloud = PointCloud::from_records(vec![
            point(5.4, 5.4, 2.0, 3.0),
            point(5.5, 5.5, 1.0, -10.0),
        ]);
        let mut sampler = GridSampler::new(cloud, bbox_10x10(), 1.0).unwrap();
        sampler.use_min_scanangle = false;
        let grid: Grid<f32> = sampler.make_grid("Z", -999.0).unwrap();
        assert_eq!(grid.get(4, 5), 1.0);
    }

    #[test]
    fn test_equal_angles_preserve_input_order() {
        // Same |angle|: stable sort keeps input order, so the later
        // point still wins the cell.
        let cloud = PointCloud::from_records(vec![
            point(5.5, 5.5, 1.0, 5.0),
            point(5.4, 5.4, 2.0, -5.0),
        ]);
        let mut sampler = GridSampler::new(cloud, bbox_10x10(), 1.0).unwrap();
        let grid: Grid<f32> = sampler.make_grid("Z", -999.0).unwrap();
        assert_eq!(grid.get(4, 5), 2.0);
    }

    #[test]
    fn test_determinism_repeated_runs() {
        let records: Vec<PointRecord> =
            surf_test_utils::synthetic_ground_points(&bbox_10x10(), 1.0, 3, 42)
                .into_iter()
                .map(|p| point(p.x, p.y, p.z, p.scan_angle))
                .collect();
        let run = || {
            let mut sampler =
                GridSampler::new(PointCloud::from_records(records.clone()), bbox_10x10(), 1.0)
                    .unwrap();
            sampler.crop_to_bbox();
            let grid: Grid<f32> = sampler.make_grid("Z", -999.0).unwrap();
            grid.data().to_vec()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_nodata_not_representable_is_type_error() {
        let cloud = PointCloud::from_records(vec![point(5.0, 5.0, 1.0, 0.0)]);
        let mut sampler = GridSampler::new(cloud, bbox_10x10(), 1.0).unwrap();
        let result: Result<Grid<u8>, _> = sampler.make_grid("Z", -999.0);
        assert!(matches!(
            result,
            Err(SamplerError::NodataNotRepresentable { .. })
        ));
    }

    #[test]
    fn test_unknown_dimension_is_domain_error() {
        let cloud = PointCloud::from_records(vec![point(5.0, 5.0, 1.0, 0.0)]);
        let mut sampler = GridSampler::new(cloud, bbox_10x10(), 1.0).unwrap();
        let result: Result<Grid<f32>, _> = sampler.make_grid("Reflectance", -999.0);
        assert!(matches!(result, Err(SamplerError::UnknownDimension { .. })));
    }

    #[test]
    fn test_sentinel_valued_observation_stays_unmasked() {
        // A real observation whose value equals the sentinel must not be
        // reported as a hole: the mask is built from occupancy.
        let cloud = PointCloud::from_records(vec![point(5.0, 5.0, -999.0, 0.0)]);
        let mut sampler = GridSampler::new(cloud, bbox_10x10(), 1.0).unwrap();
        let grid: Grid<f32> = sampler.make_grid("Z", -999.0).unwrap();
        assert_eq!(grid.get(5, 5), -999.0);
        assert!(!grid.is_masked(5, 5));
    }
}
