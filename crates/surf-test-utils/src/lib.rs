//! Shared test utilities for the surfmap workspace.
//!
//! Synthetic data generators and float assertion macros used across
//! the crates' test suites. Add as a dev-dependency:
//!
//! ```toml
//! [dev-dependencies]
//! surf-test-utils = { path = "../surf-test-utils" }
//! ```

pub mod generators;

pub use generators::*;

/// Assert two floats agree within an absolute tolerance.
///
/// ```
/// surf_test_utils::assert_approx_eq!(1.0001_f64, 1.0, 0.001);
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left = $left as f64;
        let right = $right as f64;
        let epsilon = $epsilon as f64;
        let diff = (left - right).abs();
        assert!(
            diff <= epsilon,
            "values differ by {diff}: left {left}, right {right}, tolerance {epsilon}"
        );
    }};
}

/// Assert every element of two float slices agrees within an absolute
/// tolerance. Lengths must match exactly.
#[macro_export]
macro_rules! assert_slices_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left = &$left;
        let right = &$right;
        assert_eq!(left.len(), right.len(), "slice lengths differ");
        for (i, (a, b)) in left.iter().zip(right.iter()).enumerate() {
            let diff = (*a as f64 - *b as f64).abs();
            assert!(
                diff <= $epsilon as f64,
                "element {i} differs by {diff}: left {a}, right {b}"
            );
        }
    }};
}
