//! Facade crate: one `use stagecal::...` for the whole calibration stack.
//!
//! See [`stagecal_pipeline::calibrate`] for the main entry point.

pub use stagecal_core::{
    rotation, synthetic, BrownConrady5, Correspondence, ImageSize, Intrinsics, Mat3, Pt2, Pt3,
    Real, StageCamera, TestPattern, Vec2, Vec3,
};
pub use stagecal_linear::{
    bootstrap_poses, dlt_homography, pose_from_homography, seed_intrinsics, BootstrapError,
    HomographyError, PatternPose,
};
pub use stagecal_optim::{
    build_seed, fit_stage_camera, CancelToken, FitConfig, FitError, FitFlags, FitOutcome,
    SolveOptions, SolveReport,
};
pub use stagecal_pipeline::{
    calibrate, compute_virtual_intrinsics, CalibrateError, CalibrationConfig, RotationErrors,
    StageCalibration,
};
