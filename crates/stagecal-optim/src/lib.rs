//! Nonlinear estimation of the restricted-DOF stage camera model.
//!
//! A camera rigidly mounted above a motion stage shares one orientation and
//! one height across every calibration height; only its apparent X/Y offset
//! varies per height (non-telecentricity and residual axis tilt). The
//! parameter vector is therefore `13 + 2N` for `N` test patterns:
//! intrinsics (4), distortion (5), rotation vector (3), shared camera Z (1),
//! and a per-pattern camera X/Y pair.

pub mod backend_lm;
pub mod cancel;
pub mod error;
pub mod estimator;
pub mod flags;
pub mod model;
pub mod options;
pub mod seed;

pub use cancel::CancelToken;
pub use error::FitError;
pub use estimator::{fit_stage_camera, FitConfig, FitOutcome};
pub use flags::FitFlags;
pub use model::{DecodedParams, StageFitProblem};
pub use options::{SolveOptions, SolveReport};
pub use seed::build_seed;
