//! Solver configuration and reporting.

use serde::{Deserialize, Serialize};

use stagecal_core::Real;

/// Levenberg-Marquardt termination settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SolveOptions {
    /// Evaluation budget for one minimization.
    pub max_evaluations: usize,
    /// Relative reduction tolerance on the cost.
    pub ftol: Real,
    /// Relative change tolerance on the parameters.
    pub xtol: Real,
    /// Gradient orthogonality tolerance.
    pub gtol: Real,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            max_evaluations: 1000,
            ftol: 1e-12,
            xtol: 1e-12,
            gtol: 1e-12,
        }
    }
}

/// Outcome of one minimization.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SolveReport {
    /// Number of residual evaluations used.
    pub evaluations: usize,
    /// Final cost (half the squared residual norm).
    pub final_cost: Real,
    /// Whether a convergence criterion was met (rather than the budget).
    pub converged: bool,
}
