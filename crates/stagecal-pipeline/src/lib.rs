//! Calibration pipeline for cameras rigidly mounted over motion stages.
//!
//! [`calibrate`] takes test patterns collected at two or more stage heights
//! and produces a [`StageCalibration`]: physical intrinsics and distortion,
//! a rectification homography to an ideal straight-down virtual camera,
//! virtual intrinsics, camera geometry, and diagnostics.

pub mod calibrate;
pub mod config;
pub mod error;
pub mod geometry;
pub mod rectify;
pub mod result;
pub mod virtual_intrinsics;

pub use calibrate::calibrate;
pub use config::CalibrationConfig;
pub use error::CalibrateError;
pub use geometry::{fit_xy_trend, rotation_error_degrees, XyTrend};
pub use rectify::build_rectification;
pub use result::{RotationErrors, StageCalibration};
pub use virtual_intrinsics::compute_virtual_intrinsics;
