//! Nearest-neighbor infill of masked cells.
//!
//! Every masked cell takes the value of the closest observed cell by
//! exact Euclidean distance, computed with a two-pass distance
//! transform (per-column vertical sweep, then a per-row lower envelope
//! of parabolas). Ties are broken deterministically: the vertical sweep
//! prefers the source above, the row pass prefers the leftmost column
//! whose parabola wins the envelope.

use surf_common::Grid;

const INF: i64 = i64::MAX / 4;

/// Replace every masked cell with the value of its nearest observed
/// cell and return a dense grid.
///
/// A grid with no observed cells at all is returned unchanged.
pub fn fill_nearest_neighbor(grid: &Grid<u8>) -> Grid<u8> {
    let (rows, cols) = grid.shape();
    let mask = grid.value_mask();
    if !mask.iter().any(|m| *m) {
        let mut out = grid.clone();
        out.clear_mask();
        return out;
    }
    if mask.iter().all(|m| *m) {
        return grid.clone();
    }

    // Pass 1: per column, distance to the nearest observed row and
    // which row that is.
    let mut vdist = vec![INF; rows * cols];
    let mut vsrc = vec![0usize; rows * cols];
    for c in 0..cols {
        let mut best = INF;
        let mut src = 0usize;
        for r in 0..rows {
            if !mask[r * cols + c] {
                best = 0;
                src = r;
            } else if best < INF {
                best += 1;
            }
            vdist[r * cols + c] = best;
            vsrc[r * cols + c] = src;
        }
        best = INF;
        for r in (0..rows).rev() {
            if !mask[r * cols + c] {
                best = 0;
                src = r;
            } else if best < INF {
                best += 1;
            }
            let i = r * cols + c;
            if best < vdist[i] {
                vdist[i] = best;
                vsrc[i] = src;
            }
        }
    }

    // Pass 2: per row, minimize (c - c')^2 + vdist[r][c']^2 over the
    // columns c' that have any observation, via the lower envelope of
    // the parabolas rooted at those columns.
    let mut out = grid.clone();
    let mut sites = vec![0usize; cols];
    let mut bounds = vec![0f64; cols + 1];
    for r in 0..rows {
        let f = |c: usize| {
            let d = vdist[r * cols + c];
            if d == INF {
                INF
            } else {
                d * d
            }
        };

        let mut k = 0usize;
        let mut have_first = false;
        for q in 0..cols {
            let fq = f(q);
            if fq == INF {
                continue;
            }
            if !have_first {
                sites[0] = q;
                bounds[0] = f64::NEG_INFINITY;
                bounds[1] = f64::INFINITY;
                have_first = true;
                continue;
            }
            loop {
                let p = sites[k];
                let s = ((fq + (q * q) as i64 - f(p) - (p * p) as i64) as f64)
                    / (2.0 * (q as f64 - p as f64));
                if s <= bounds[k] && k > 0 {
                    k -= 1;
                } else {
                    k += 1;
                    sites[k] = q;
                    bounds[k] = s;
                    bounds[k + 1] = f64::INFINITY;
                    break;
                }
            }
        }

        k = 0;
        for c in 0..cols {
            if !mask[r * cols + c] {
                continue;
            }
            while bounds[k + 1] < c as f64 {
                k += 1;
            }
            let src_col = sites[k];
            let src_row = vsrc[r * cols + src_col];
            out.set(r, c, grid.get(src_row, src_col));
        }
    }
    out.clear_mask();
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(data: Vec<u8>, rows: usize, cols: usize) -> Grid<u8> {
        Grid::from_data(data, rows, cols, (0.0, 100.0), 1.0, Some(0)).unwrap()
    }

    #[test]
    fn test_dense_grid_passes_through() {
        let grid = labels(vec![1, 2, 3, 4], 2, 2);
        let filled = fill_nearest_neighbor(&grid);
        assert_eq!(filled.data(), grid.data());
        assert_eq!(filled.masked_count(), 0);
    }

    #[test]
    fn test_fully_masked_grid_is_unchanged() {
        let grid = labels(vec![0u8; 6], 2, 3);
        let filled = fill_nearest_neighbor(&grid);
        assert_eq!(filled.masked_count(), 6);
    }

    #[test]
    fn test_row_fill_takes_nearest_side() {
        let grid = labels(vec![7, 0, 0, 9], 1, 4);
        let filled = fill_nearest_neighbor(&grid);
        assert_eq!(filled.data(), &[7, 7, 9, 9]);
        assert_eq!(filled.masked_count(), 0);
    }

    #[test]
    fn test_column_fill_takes_nearest_side() {
        let grid = labels(vec![7, 0, 0, 9], 4, 1);
        let filled = fill_nearest_neighbor(&grid);
        assert_eq!(filled.data(), &[7, 7, 9, 9]);
    }

    #[test]
    fn test_euclidean_not_manhattan() {
        // Sources at (0, 3) and (2, 0). For the hole at (0, 0) the
        // straight-line distances are 3 and 2; a row-then-column
        // approximation would pick the same-row source.
        let mut data = vec![0u8; 12];
        data[3] = 5; // (0, 3)
        data[8] = 6; // (2, 0)
        let grid = labels(data, 3, 4);
        let filled = fill_nearest_neighbor(&grid);
        assert_eq!(filled.get(0, 0), 6);
        // (0, 2) is 1 from the class-5 source and sqrt(8) from class 6.
        assert_eq!(filled.get(0, 2), 5);
        assert_eq!(filled.masked_count(), 0);
    }

    #[test]
    fn test_fill_is_deterministic() {
        let mut data = vec![0u8; 49];
        data[10] = 3;
        data[38] = 4;
        let grid = labels(data, 7, 7);
        let a = fill_nearest_neighbor(&grid);
        let b = fill_nearest_neighbor(&grid);
        assert_eq!(a.data(), b.data());
    }

    #[test]
    fn test_surrounded_hole_takes_a_neighbor_value() {
        let mut data = vec![2u8; 9];
        data[4] = 0;
        let grid = labels(data, 3, 3);
        let filled = fill_nearest_neighbor(&grid);
        assert_eq!(filled.get(1, 1), 2);
    }
}
