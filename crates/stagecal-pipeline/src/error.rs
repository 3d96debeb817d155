//! Pipeline errors.

use thiserror::Error;

use stagecal_linear::{BootstrapError, HomographyError};
use stagecal_optim::FitError;

#[derive(Debug, Error)]
pub enum CalibrateError {
    #[error("calibration needs test patterns from at least one stage height")]
    NoPatterns,

    #[error("bootstrap pose estimation failed: {0}")]
    Bootstrap(#[from] BootstrapError),

    #[error(transparent)]
    Fit(#[from] FitError),

    #[error("rectification homography failed: {0}")]
    Rectification(#[from] HomographyError),

    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(&'static str),
}
