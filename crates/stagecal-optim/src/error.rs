//! Fit errors.

use thiserror::Error;

use stagecal_core::Real;

#[derive(Debug, Error)]
pub enum FitError {
    #[error("no test patterns with observations were provided")]
    EmptyInput,

    #[error("seed length {got} does not match the model ({expected} parameters for {patterns} patterns)")]
    BadSeedLength {
        expected: usize,
        got: usize,
        patterns: usize,
    },

    #[error("pattern/pose count mismatch: {patterns} patterns vs {poses} poses")]
    SeedMismatch { patterns: usize, poses: usize },

    #[error("calibration was cancelled")]
    Cancelled,

    #[error(
        "camera model did not converge within {evaluations} evaluations \
         (residual {residual:.3} px); collect more detection points per \
         calibration height and check that the test patterns are level"
    )]
    DidNotConverge { evaluations: usize, residual: Real },

    #[error("numerical failure in the solver: {0}")]
    Numerical(&'static str),
}
