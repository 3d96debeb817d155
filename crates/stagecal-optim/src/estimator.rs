//! Two-pass outlier-rejecting parameter estimation.

use log::{debug, info};
use nalgebra::DVector;

use stagecal_core::{Pt2, Real, TestPattern};

use crate::backend_lm::solve;
use crate::cancel::CancelToken;
use crate::error::FitError;
use crate::flags::FitFlags;
use crate::model::{param_count, DecodedParams, StageFitProblem, IDX_FX, IDX_FY};
use crate::options::{SolveOptions, SolveReport};

/// Estimator configuration.
#[derive(Debug, Clone, Copy)]
pub struct FitConfig {
    pub flags: FitFlags,
    /// Outlier gate in per-axis standard deviations. A point is rejected
    /// when its squared pixel error exceeds `2 * (sigma * rms)^2`.
    pub outlier_sigma: Real,
    pub solve: SolveOptions,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            flags: FitFlags::NONE,
            // 2.4103 per-axis sigma keeps ~99.7% of inliers for a 2D
            // Gaussian error distribution
            outlier_sigma: 2.4103,
            solve: SolveOptions::default(),
        }
    }
}

/// Result of a completed fit.
#[derive(Debug, Clone)]
pub struct FitOutcome {
    /// Fitted parameter vector (`13 + 2N`).
    pub params: DVector<Real>,
    pub decoded: DecodedParams,
    /// Modeled pixels for every collected point, outliers included.
    pub modeled: Vec<Vec<Pt2>>,
    /// Distance RMS (pixels) over the points kept in the final pass.
    pub drms: Real,
    /// Distance RMS of the first pass, before outlier rejection.
    pub first_pass_drms: Real,
    /// Global indices of rejected points.
    pub outliers: Vec<usize>,
    pub report: SolveReport,
}

/// Fit the restricted-DOF camera model to the collected patterns.
///
/// Runs at most two minimization passes: after the first, points whose
/// squared error exceeds the sigma gate are excluded and the fit repeats
/// once from the first-pass parameters. Rejected points stay in the data
/// and in `modeled`, but not in the residual.
pub fn fit_stage_camera(
    patterns: &[TestPattern],
    seed: DVector<Real>,
    cfg: &FitConfig,
    cancel: Option<&CancelToken>,
) -> Result<FitOutcome, FitError> {
    if patterns.is_empty() {
        return Err(FitError::EmptyInput);
    }
    let expected = param_count(patterns.len());
    if seed.len() != expected {
        return Err(FitError::BadSeedLength {
            expected,
            got: seed.len(),
            patterns: patterns.len(),
        });
    }
    let aspect = seed[IDX_FY] / seed[IDX_FX];

    // first pass over everything
    let problem = StageFitProblem::new(patterns, cfg.flags, aspect);
    let observed = problem.observed(patterns);
    let (x, report) = solve(&problem, &observed, seed, &cfg.solve, cancel)?;
    let first_pass_drms = drms_of(&problem, &observed, &x);
    require_converged(&report, first_pass_drms)?;
    debug!("first pass: DRMS = {first_pass_drms:.4} px");

    // per-axis rms gate from the first pass
    let rms = first_pass_drms / std::f64::consts::SQRT_2;
    let threshold = 2.0 * (cfg.outlier_sigma * rms).powi(2);
    let outliers = collect_outliers(&problem.project_all(&x), patterns, threshold);

    let (problem, observed, mut params, report) = if outliers.is_empty() {
        (problem, observed, x, report)
    } else {
        info!(
            "rejecting {} of {} points, refitting",
            outliers.len(),
            problem.total_points()
        );
        let problem = StageFitProblem::new(patterns, cfg.flags, aspect)
            .with_excluded(outliers.iter().copied().collect());
        let observed = problem.observed(patterns);
        let (x, report) = solve(&problem, &observed, x, &cfg.solve, cancel)?;
        let drms = drms_of(&problem, &observed, &x);
        require_converged(&report, drms)?;
        (problem, observed, x, report)
    };

    if cfg.flags.contains(FitFlags::FIX_ASPECT_RATIO) {
        params[IDX_FY] = aspect * params[IDX_FX];
    }
    let drms = drms_of(&problem, &observed, &params);
    info!(
        "fit complete: DRMS = {drms:.4} px ({} outliers, {} evaluations)",
        outliers.len(),
        report.evaluations
    );

    Ok(FitOutcome {
        decoded: problem.decode(&params),
        modeled: problem.project_all(&params),
        params,
        drms,
        first_pass_drms,
        outliers,
        report,
    })
}

fn require_converged(report: &SolveReport, drms: Real) -> Result<(), FitError> {
    if report.converged {
        Ok(())
    } else {
        Err(FitError::DidNotConverge {
            evaluations: report.evaluations,
            residual: drms,
        })
    }
}

/// Distance RMS in pixels: `sqrt(mean over points of (du^2 + dv^2))`.
fn drms_of(problem: &StageFitProblem, observed: &DVector<Real>, x: &DVector<Real>) -> Real {
    let r = problem.project(x) - observed;
    let n_points = (r.len() / 2).max(1) as Real;
    (r.norm_squared() / n_points).sqrt()
}

fn collect_outliers(
    modeled: &[Vec<Pt2>],
    patterns: &[TestPattern],
    threshold: Real,
) -> Vec<usize> {
    let mut out = Vec::new();
    let mut global = 0;
    for (mod_pts, pattern) in modeled.iter().zip(patterns) {
        for (m, c) in mod_pts.iter().zip(pattern.iter()) {
            if (m - c.pixel).norm_squared() > threshold {
                out.push(global);
            }
            global += 1;
        }
    }
    out
}
