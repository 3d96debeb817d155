//! Levenberg-Marquardt backend.
//!
//! Wraps the `levenberg-marquardt` crate: the reprojection problem is
//! exposed through [`LeastSquaresProblem`] with dynamically sized storage,
//! and cancellation is cooperative (returning `None` from the residual or
//! Jacobian callback aborts the minimization).

use levenberg_marquardt::{LeastSquaresProblem, LevenbergMarquardt, TerminationReason};
use log::debug;
use nalgebra::storage::Owned;
use nalgebra::{DVector, Dyn, Matrix, Vector};

use stagecal_core::Real;

use crate::cancel::CancelToken;
use crate::error::FitError;
use crate::model::StageFitProblem;
use crate::options::{SolveOptions, SolveReport};

struct LmProblem<'a> {
    model: &'a StageFitProblem,
    observed: &'a DVector<Real>,
    params: DVector<Real>,
    cancel: Option<&'a CancelToken>,
}

impl LmProblem<'_> {
    fn cancelled(&self) -> bool {
        self.cancel.is_some_and(CancelToken::is_cancelled)
    }
}

impl LeastSquaresProblem<Real, Dyn, Dyn> for LmProblem<'_> {
    type ResidualStorage = Owned<Real, Dyn>;
    type JacobianStorage = Owned<Real, Dyn, Dyn>;
    type ParameterStorage = Owned<Real, Dyn>;

    fn set_params(&mut self, x: &Vector<Real, Dyn, Self::ParameterStorage>) {
        self.params.copy_from(x);
    }

    fn params(&self) -> Vector<Real, Dyn, Self::ParameterStorage> {
        self.params.clone()
    }

    fn residuals(&self) -> Option<Vector<Real, Dyn, Self::ResidualStorage>> {
        if self.cancelled() {
            return None;
        }
        Some(self.model.project(&self.params) - self.observed)
    }

    fn jacobian(&self) -> Option<Matrix<Real, Dyn, Dyn, Self::JacobianStorage>> {
        if self.cancelled() {
            return None;
        }
        Some(self.model.jacobian(&self.params))
    }
}

/// Minimize the reprojection residual starting from `x0`.
///
/// Returns the refined parameter vector and a report; `converged` in the
/// report is false when the evaluation budget ran out first. Cancellation
/// and numerical breakdown surface as errors.
pub fn solve(
    model: &StageFitProblem,
    observed: &DVector<Real>,
    x0: DVector<Real>,
    opts: &SolveOptions,
    cancel: Option<&CancelToken>,
) -> Result<(DVector<Real>, SolveReport), FitError> {
    if let Some(token) = cancel {
        if token.is_cancelled() {
            return Err(FitError::Cancelled);
        }
    }

    let problem = LmProblem {
        model,
        observed,
        params: x0,
        cancel,
    };
    let (solved, report) = LevenbergMarquardt::new()
        .with_ftol(opts.ftol)
        .with_xtol(opts.xtol)
        .with_gtol(opts.gtol)
        .with_patience(opts.max_evaluations)
        .minimize(problem);

    match report.termination {
        TerminationReason::User(_) => return Err(FitError::Cancelled),
        TerminationReason::Numerical(what) => return Err(FitError::Numerical(what)),
        _ => {}
    }

    let out = SolveReport {
        evaluations: report.number_of_evaluations,
        final_cost: report.objective_function,
        converged: report.termination.was_successful(),
    };
    debug!(
        "LM finished: {} evaluations, cost {:.6e}, converged = {}",
        out.evaluations, out.final_cost, out.converged
    );
    Ok((solved.params, out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::FitFlags;
    use crate::model::param_count;
    use stagecal_core::synthetic::{project_pattern, radial_stage_points};
    use stagecal_core::{BrownConrady5, Intrinsics, Pt2, StageCamera, TestPattern, Vec3};

    fn camera() -> StageCamera {
        StageCamera {
            intrinsics: Intrinsics::new(1200.0, 1200.0, 319.5, 239.5),
            distortion: BrownConrady5::default(),
            rvec: StageCamera::nominal_down_rvec(),
            position: Vec3::new(0.0, 0.0, 400.0),
        }
    }

    fn patterns(cam: &StageCamera) -> Vec<TestPattern> {
        [0.0, 10.0]
            .iter()
            .map(|&z| {
                let pts = radial_stage_points(Pt2::new(0.0, 0.0), z, 60.0, 8, 3);
                project_pattern(cam, &pts).unwrap()
            })
            .collect()
    }

    #[test]
    fn cancelled_token_aborts_before_solving() {
        let cam = camera();
        let pats = patterns(&cam);
        let model = StageFitProblem::new(&pats, FitFlags::NONE, 1.0);
        let observed = model.observed(&pats);
        let x0 = DVector::zeros(param_count(pats.len()));

        let token = CancelToken::new();
        token.cancel();
        let err = solve(&model, &observed, x0, &SolveOptions::default(), Some(&token))
            .unwrap_err();
        assert!(matches!(err, FitError::Cancelled));
    }

    #[test]
    fn perturbed_seed_converges_back() {
        let cam = camera();
        let pats = patterns(&cam);
        let model = StageFitProblem::new(&pats, FitFlags::NONE, 1.0);
        let observed = model.observed(&pats);

        let mut x0 = DVector::zeros(param_count(pats.len()));
        x0[0] = 1150.0; // fx
        x0[1] = 1150.0; // fy
        x0[2] = 319.5;
        x0[3] = 239.5;
        x0[9] = std::f64::consts::PI - 0.01; // rx
        x0[12] = 390.0; // camZ
        x0[13] = 2.0;
        x0[14] = -1.0;
        x0[15] = 2.0;
        x0[16] = -1.0;

        let (x, report) = solve(&model, &observed, x0, &SolveOptions::default(), None).unwrap();
        assert!(report.converged, "did not converge: {report:?}");
        assert!((x[0] - 1200.0).abs() < 1e-3, "fx = {}", x[0]);
        assert!((x[12] - 400.0).abs() < 1e-3, "camZ = {}", x[12]);
    }
}
