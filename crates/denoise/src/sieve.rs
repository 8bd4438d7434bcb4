//! Cluster sieving: mark connected runs of a class that are too small
//! to be believable.
//!
//! Both entry points are pure: they return a fresh mask (true = cell
//! belongs to an undersized cluster) and leave the input grid alone, so
//! tile workers can share the input freely.

use surf_common::Grid;

use crate::majority::Connectivity;

/// Mark cells of `class` whose connected cluster holds fewer than
/// `min_cluster_size` cells.
pub fn sieve_mask(
    grid: &Grid<u8>,
    class: u8,
    min_cluster_size: usize,
    connectivity: Connectivity,
) -> Vec<bool> {
    sieve_impl(grid, Some(class), min_cluster_size, connectivity)
}

/// Mark cells of any class whose connected cluster holds fewer than
/// `min_cluster_size` cells. Masked cells are never marked.
pub fn sieve(grid: &Grid<u8>, min_cluster_size: usize, connectivity: Connectivity) -> Vec<bool> {
    sieve_impl(grid, None, min_cluster_size, connectivity)
}

fn sieve_impl(
    grid: &Grid<u8>,
    class: Option<u8>,
    min_cluster_size: usize,
    connectivity: Connectivity,
) -> Vec<bool> {
    let (rows, cols) = grid.shape();
    let mask = grid.value_mask();
    let mut small = vec![false; rows * cols];
    if min_cluster_size <= 1 {
        return small;
    }

    let mut visited = vec![false; rows * cols];
    let mut component: Vec<usize> = Vec::new();
    let mut stack: Vec<usize> = Vec::new();

    for seed in 0..rows * cols {
        if visited[seed] || mask[seed] {
            continue;
        }
        let value = grid.data()[seed];
        if class.is_some_and(|c| c != value) {
            visited[seed] = true;
            continue;
        }

        component.clear();
        stack.push(seed);
        visited[seed] = true;
        while let Some(i) = stack.pop() {
            component.push(i);
            let (r, c) = (i / cols, i % cols);
            let r0 = r.saturating_sub(1);
            let r1 = (r + 1).min(rows - 1);
            let c0 = c.saturating_sub(1);
            let c1 = (c + 1).min(cols - 1);
            for nr in r0..=r1 {
                for nc in c0..=c1 {
                    if connectivity == Connectivity::Four && nr != r && nc != c {
                        continue;
                    }
                    let j = nr * cols + nc;
                    if !visited[j] && !mask[j] && grid.data()[j] == value {
                        visited[j] = true;
                        stack.push(j);
                    }
                }
            }
        }

        if component.len() < min_cluster_size {
            for &i in &component {
                small[i] = true;
            }
        }
    }
    small
}
