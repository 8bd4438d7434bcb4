//! Majority-vote smoothing of class-label rasters.

use surf_common::Grid;

use crate::error::DenoiseError;

/// Which neighbors take part in the 3x3 vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    /// Center plus the four orthogonal neighbors.
    Four,
    /// The full 3x3 window.
    Eight,
}

impl Default for Connectivity {
    fn default() -> Self {
        Connectivity::Eight
    }
}

/// Replace every cell with the most frequent value in its 3x3
/// neighborhood, repeated `iterations` times.
///
/// The window is clipped at the raster border. Ties go to the smallest
/// class value. Masked cells vote as a class of their own: they are
/// remapped to `max(class) + 1` for the duration of the vote and any
/// cell the vote assigns to that class comes out masked again.
pub fn majority_vote(
    grid: &Grid<u8>,
    iterations: usize,
    connectivity: Connectivity,
) -> Result<Grid<u8>, DenoiseError> {
    let (rows, cols) = grid.shape();
    if rows * cols == 0 || iterations == 0 {
        return Ok(grid.clone());
    }

    let mask = grid.value_mask();
    let any_masked = mask.iter().any(|m| *m);
    if mask.iter().all(|m| *m) {
        // Nothing but holes, nothing to vote on.
        return Ok(grid.clone());
    }

    // Working buffer with masked cells remapped to one past the largest
    // real class, so the histogram never confuses a hole with a class.
    let remap = if any_masked {
        let max = grid
            .data()
            .iter()
            .zip(mask.iter())
            .filter(|(_, m)| !**m)
            .map(|(v, _)| *v)
            .max()
            .unwrap_or(0);
        if max == u8::MAX {
            return Err(DenoiseError::ClassOverflow { max });
        }
        Some(max + 1)
    } else {
        None
    };

    let mut current: Vec<u8> = grid
        .data()
        .iter()
        .zip(mask.iter())
        .map(|(v, m)| if *m { remap.unwrap_or(*v) } else { *v })
        .collect();
    let mut next = vec![0u8; current.len()];

    let mut counts = [0u16; 256];
    let mut touched: Vec<u8> = Vec::with_capacity(9);

    for _ in 0..iterations {
        for r in 0..rows {
            for c in 0..cols {
                for v in touched.drain(..) {
                    counts[v as usize] = 0;
                }
                vote_window(&current, rows, cols, r, c, connectivity, &mut counts, &mut touched);

                let mut best = touched[0];
                let mut best_count = counts[best as usize];
                for &v in &touched[1..] {
                    let count = counts[v as usize];
                    if count > best_count || (count == best_count && v < best) {
                        best = v;
                        best_count = count;
                    }
                }
                next[r * cols + c] = best;
            }
        }
        std::mem::swap(&mut current, &mut next);
    }

    let mut out = grid.clone();
    match remap {
        Some(remap) => {
            let mut out_mask = vec![false; current.len()];
            let nodata = grid.nodata();
            for (i, v) in current.iter().enumerate() {
                if *v == remap {
                    out_mask[i] = true;
                    out.set(i / cols, i % cols, nodata.unwrap_or(remap));
                } else {
                    out.set(i / cols, i % cols, *v);
                }
            }
            out.set_mask(out_mask)?;
        }
        None => {
            for (i, v) in current.iter().enumerate() {
                out.set(i / cols, i % cols, *v);
            }
            out.clear_mask();
        }
    }
    Ok(out)
}

#[allow(clippy::too_many_arguments)]
fn vote_window(
    values: &[u8],
    rows: usize,
    cols: usize,
    r: usize,
    c: usize,
    connectivity: Connectivity,
    counts: &mut [u16; 256],
    touched: &mut Vec<u8>,
) {
    let r0 = r.saturating_sub(1);
    let r1 = (r + 1).min(rows - 1);
    let c0 = c.saturating_sub(1);
    let c1 = (c + 1).min(cols - 1);
    for wr in r0..=r1 {
        for wc in c0..=c1 {
            if connectivity == Connectivity::Four && wr != r && wc != c {
                continue;
            }
            let v = values[wr * cols + wc];
            if counts[v as usize] == 0 {
                touched.push(v);
            }
            counts[v as usize] += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(data: Vec<u8>, rows: usize, cols: usize) -> Grid<u8> {
        Grid::from_data(data, rows, cols, (0.0, 100.0), 1.0, Some(0)).unwrap()
    }

    #[test]
    fn test_lone_speckle_is_voted_away() {
        let mut data = vec![1u8; 25];
        data[12] = 2;
        let grid = labels(data, 5, 5);
        let voted = majority_vote(&grid, 1, Connectivity::Eight).unwrap();
        assert!(voted.data().iter().all(|v| *v == 1));
    }

    #[test]
    fn test_tie_goes_to_smallest_class() {
        // Every 3x3 window over a [3, 1] grid sees one 3 and one 1.
        let grid = labels(vec![3, 1], 1, 2);
        let voted = majority_vote(&grid, 1, Connectivity::Eight).unwrap();
        assert_eq!(voted.data(), &[1, 1]);
    }

    #[test]
    fn test_four_connectivity_ignores_diagonals() {
        // Eight-connected the center sees five 3s; four-connected it
        // only sees {2, 3, 1, 1, 1}.
        let data = vec![
            3, 3, 3, //
            1, 2, 1, //
            3, 1, 3,
        ];
        let grid = labels(data, 3, 3);
        let eight = majority_vote(&grid, 1, Connectivity::Eight).unwrap();
        assert_eq!(eight.get(1, 1), 3);
        let four = majority_vote(&grid, 1, Connectivity::Four).unwrap();
        assert_eq!(four.get(1, 1), 1);
    }

    #[test]
    fn test_masked_cells_vote_as_their_own_class() {
        // A hole surrounded by holes must stay a hole, not leak class 0.
        let data = vec![
            7, 0, 0, //
            0, 0, 0, //
            0, 0, 0,
        ];
        let grid = labels(data, 3, 3);
        let voted = majority_vote(&grid, 1, Connectivity::Eight).unwrap();
        assert!(voted.is_masked(2, 2));
        assert!(voted.is_masked(1, 1));
        // Even the lone observation is outvoted by surrounding holes.
        assert_eq!(voted.masked_count(), 9);
    }

    #[test]
    fn test_vote_can_close_small_holes() {
        let mut data = vec![5u8; 25];
        data[12] = 0;
        let grid = labels(data, 5, 5);
        let voted = majority_vote(&grid, 1, Connectivity::Eight).unwrap();
        assert!(!voted.is_masked(2, 2));
        assert_eq!(voted.get(2, 2), 5);
    }

    #[test]
    fn test_class_255_with_holes_is_rejected() {
        let grid = labels(vec![255, 0, 255, 255], 2, 2);
        assert!(matches!(
            majority_vote(&grid, 1, Connectivity::Eight),
            Err(DenoiseError::ClassOverflow { max: 255 })
        ));
    }

    #[test]
    fn test_class_255_without_holes_is_fine() {
        let grid =
            Grid::from_data(vec![255u8, 255, 255, 1], 2, 2, (0.0, 1.0), 1.0, None).unwrap();
        let voted = majority_vote(&grid, 1, Connectivity::Eight).unwrap();
        assert!(voted.data().iter().all(|v| *v == 255));
    }

    #[test]
    fn test_zero_iterations_is_identity() {
        let grid = labels(vec![1, 2, 3, 4], 2, 2);
        let voted = majority_vote(&grid, 0, Connectivity::Eight).unwrap();
        assert_eq!(voted.data(), grid.data());
    }

    #[test]
    fn test_fully_masked_grid_is_unchanged() {
        let grid = labels(vec![0u8; 9], 3, 3);
        let voted = majority_vote(&grid, 2, Connectivity::Eight).unwrap();
        assert_eq!(voted.masked_count(), 9);
    }
}
