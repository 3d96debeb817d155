//! Bootstrap seeding for the nonlinear fit.
//!
//! All test patterns are parallel horizontal planes, which makes closed-form
//! intrinsic calibration (Zhang) degenerate. Instead the intrinsic seed is
//! built from an approximate focal length with the principal point at the
//! image center, and each pattern gets an independent pose from its own
//! plane-to-image homography.

use log::debug;
use thiserror::Error;

use stagecal_core::{ImageSize, Intrinsics, Real, TestPattern};

use crate::homography::{dlt_homography, HomographyError};
use crate::planar_pose::{pose_from_homography, PatternPose};

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("pattern {pattern}: {source}")]
    Homography {
        pattern: usize,
        source: HomographyError,
    },
    #[error("pattern {pattern}: homography could not be decomposed into a pose")]
    PoseDecomposition { pattern: usize },
}

/// Intrinsic seed: shared approximate focal length, principal point at the
/// image center.
pub fn seed_intrinsics(size: ImageSize, approx_focal_px: Real) -> Intrinsics {
    let c = size.center();
    Intrinsics::new(approx_focal_px, approx_focal_px, c.x, c.y)
}

/// Independent per-pattern poses from per-pattern homographies.
///
/// Pattern Z is flattened to zero for the decomposition; callers restore the
/// height when backing out camera positions. A pose that lands behind the
/// camera is re-decomposed from the negated homography.
pub fn bootstrap_poses(
    patterns: &[TestPattern],
    intrinsics: &Intrinsics,
) -> Result<Vec<PatternPose>, BootstrapError> {
    let kmtx = intrinsics.matrix();
    let mut poses = Vec::with_capacity(patterns.len());
    for (i, pattern) in patterns.iter().enumerate() {
        let src = pattern.planar_stage_points();
        let dst = pattern.pixels();
        let h = dlt_homography(&src, &dst)
            .map_err(|source| BootstrapError::Homography { pattern: i, source })?;

        let mut pose = pose_from_homography(&kmtx, &h)
            .ok_or(BootstrapError::PoseDecomposition { pattern: i })?;
        if pose.translation.z < 0.0 {
            pose = pose_from_homography(&kmtx, &(-h))
                .ok_or(BootstrapError::PoseDecomposition { pattern: i })?;
        }
        debug!(
            "bootstrap pattern {} (z = {:.3}): t = {:?}",
            i,
            pattern.z(),
            pose.translation
        );
        poses.push(pose);
    }
    Ok(poses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagecal_core::synthetic::{project_pattern, radial_stage_points};
    use stagecal_core::{BrownConrady5, Pt2, StageCamera, Vec3};

    #[test]
    fn seed_centers_principal_point() {
        let k = seed_intrinsics(ImageSize::new(640, 480), 1200.0);
        assert_eq!(k.fx, 1200.0);
        assert_eq!(k.fy, 1200.0);
        assert_eq!(k.cx, 319.5);
        assert_eq!(k.cy, 239.5);
    }

    #[test]
    fn poses_recover_camera_height() {
        let cam = StageCamera {
            intrinsics: Intrinsics::new(1200.0, 1200.0, 319.5, 239.5),
            distortion: BrownConrady5::default(),
            rvec: StageCamera::nominal_down_rvec(),
            position: Vec3::new(0.0, 0.0, 400.0),
        };
        let patterns: Vec<TestPattern> = [0.0, 10.0]
            .iter()
            .map(|&z| {
                let pts = radial_stage_points(Pt2::new(0.0, 0.0), z, 60.0, 16, 4);
                project_pattern(&cam, &pts).unwrap()
            })
            .collect();

        let poses = bootstrap_poses(&patterns, &cam.intrinsics).unwrap();
        assert_eq!(poses.len(), 2);
        // pattern z was flattened to zero, so t.z is the camera height above
        // each pattern plane
        assert!((poses[0].translation.z - 400.0).abs() < 1e-6);
        assert!((poses[1].translation.z - 390.0).abs() < 1e-6);
        // restored camera position: (0, 0, z_i) - R^T t
        for (pose, pat) in poses.iter().zip(&patterns) {
            let cam_pos =
                Vec3::new(0.0, 0.0, pat.z()) - pose.rotation.transpose() * pose.translation;
            assert!((cam_pos - cam.position).norm() < 1e-6);
        }
    }
}
