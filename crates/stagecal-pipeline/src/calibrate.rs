//! Calibration orchestration.

use log::{debug, info};

use stagecal_core::{BrownConrady5, ImageSize, Real, TestPattern, Vec3};
use stagecal_linear::{bootstrap_poses, seed_intrinsics};
use stagecal_optim::{build_seed, fit_stage_camera, CancelToken, FitConfig};

use crate::config::CalibrationConfig;
use crate::error::CalibrateError;
use crate::geometry::{fit_xy_trend, rotation_error_degrees};
use crate::rectify::build_rectification;
use crate::result::{RotationErrors, StageCalibration};
use crate::virtual_intrinsics::compute_virtual_intrinsics;

/// Run the full calibration over patterns collected at one or more stage
/// heights. The first pattern's height is the primary height: rectification
/// and the virtual camera are exact there.
///
/// Cancellation via `cancel` is cooperative and total: a cancelled run
/// returns an error, never a partial calibration.
pub fn calibrate(
    patterns: &[TestPattern],
    image_size: ImageSize,
    config: &CalibrationConfig,
    cancel: Option<&CancelToken>,
) -> Result<StageCalibration, CalibrateError> {
    if patterns.is_empty() {
        return Err(CalibrateError::NoPatterns);
    }
    let primary_z = patterns[0].z();

    // seed: approximate focal length from the machine configuration
    let approx_f =
        (config.approx_camera_z - primary_z).abs() / config.approx_mm_per_pixel;
    if !approx_f.is_finite() || approx_f <= 0.0 {
        return Err(CalibrateError::DegenerateGeometry(
            "approximate camera height and mm-per-pixel must give a positive focal length",
        ));
    }
    let k_seed = seed_intrinsics(image_size, approx_f);
    debug!("seed focal length {approx_f:.1} px, primary Z {primary_z:.3} mm");

    let poses = bootstrap_poses(patterns, &k_seed)?;
    let seed = build_seed(patterns, &k_seed, &BrownConrady5::default(), &poses)?;

    let fit_cfg = FitConfig {
        flags: config.flags,
        outlier_sigma: config.outlier_sigma,
        solve: config.solve,
    };
    let outcome = fit_stage_camera(patterns, seed, &fit_cfg, cancel)?;
    let fitted = &outcome.decoded;

    // mounting errors and camera geometry
    let rot_err = rotation_error_degrees(&fitted.rotation);
    let heights: Vec<Real> = patterns.iter().map(TestPattern::z).collect();
    let trend = fit_xy_trend(&heights, &fitted.cam_xy)
        .ok_or(CalibrateError::DegenerateGeometry("camera X/Y trend fit failed"))?;
    let xy = trend.at(primary_z);
    let camera_position = Vec3::new(xy.x, xy.y, fitted.cam_z);

    let optical_axis = fitted.rotation.transpose() * Vec3::z();
    if optical_axis.z.abs() < 1e-9 {
        return Err(CalibrateError::DegenerateGeometry(
            "optical axis parallel to the stage plane",
        ));
    }
    // virtual camera: straight down, same X/Y, at the distance the physical
    // camera has to the primary-plane principal point
    let distance = ((primary_z - fitted.cam_z) / optical_axis.z).abs();
    let virtual_camera_position = Vec3::new(xy.x, xy.y, primary_z + distance);
    info!(
        "camera at {camera_position:?}, axis {optical_axis:?}, rotation errors \
         x {:.3} y {:.3} z {:.3} deg",
        rot_err.x, rot_err.y, rot_err.z
    );

    let rectification = build_rectification(
        &fitted.rotation,
        &camera_position,
        &virtual_camera_position,
        primary_z,
    )?;
    let virtual_intrinsics = compute_virtual_intrinsics(
        &fitted.intrinsics,
        &fitted.distortion,
        &rectification,
        image_size,
        config.alpha_percent.min(100) as Real / 100.0,
        config.keep_principal_point,
    );

    Ok(StageCalibration {
        image_size,
        primary_z,
        intrinsics: fitted.intrinsics,
        distortion: fitted.distortion,
        rectification,
        virtual_intrinsics,
        camera_position,
        optical_axis,
        virtual_camera_position,
        rotation_errors: RotationErrors {
            x: rot_err.x,
            y: rot_err.y,
            z: rot_err.z,
        },
        drms: outcome.drms,
        patterns: patterns.to_vec(),
        outliers: outcome.outliers,
    })
}
