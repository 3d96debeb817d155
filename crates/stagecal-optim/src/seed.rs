//! Packing the initial parameter vector from bootstrap poses.

use log::debug;
use nalgebra::DVector;

use stagecal_core::rotation::{average_rotations, rodrigues_vec};
use stagecal_core::{BrownConrady5, Intrinsics, Real, TestPattern, Vec3};
use stagecal_linear::PatternPose;

use crate::error::FitError;
use crate::model::{param_count, IDX_CAM_XY, IDX_CAM_Z, IDX_CX, IDX_CY, IDX_DIST, IDX_FX, IDX_FY, IDX_ROT};

/// Build the `13 + 2N` seed vector from independent per-pattern poses.
///
/// The per-pattern poses were estimated with pattern Z flattened to zero, so
/// each implies a camera position `(0, 0, z_i) - R_i^T t_i`. The shared
/// rotation seed is the chordal average of the pose rotations, the shared
/// camera height the mean of the per-pose heights, and each pattern keeps
/// its own X/Y.
pub fn build_seed(
    patterns: &[TestPattern],
    intrinsics: &Intrinsics,
    distortion: &BrownConrady5,
    poses: &[PatternPose],
) -> Result<DVector<Real>, FitError> {
    if patterns.is_empty() {
        return Err(FitError::EmptyInput);
    }
    if patterns.len() != poses.len() {
        return Err(FitError::SeedMismatch {
            patterns: patterns.len(),
            poses: poses.len(),
        });
    }

    let rotations: Vec<_> = poses.iter().map(|p| p.rotation).collect();
    let mean_rotation = average_rotations(&rotations)
        .ok_or(FitError::Numerical("rotation averaging SVD failed"))?;
    let rvec = rodrigues_vec(&mean_rotation);

    let positions: Vec<Vec3> = patterns
        .iter()
        .zip(poses)
        .map(|(pat, pose)| {
            Vec3::new(0.0, 0.0, pat.z()) - pose.rotation.transpose() * pose.translation
        })
        .collect();
    let cam_z = positions.iter().map(|p| p.z).sum::<Real>() / positions.len() as Real;
    debug!("seed: rvec = {rvec:?}, camZ = {cam_z:.3}");

    let mut x = DVector::zeros(param_count(patterns.len()));
    x[IDX_FX] = intrinsics.fx;
    x[IDX_FY] = intrinsics.fy;
    x[IDX_CX] = intrinsics.cx;
    x[IDX_CY] = intrinsics.cy;
    for (m, c) in distortion.as_array().iter().enumerate() {
        x[IDX_DIST + m] = *c;
    }
    for k in 0..3 {
        x[IDX_ROT + k] = rvec[k];
    }
    x[IDX_CAM_Z] = cam_z;
    for (i, p) in positions.iter().enumerate() {
        x[IDX_CAM_XY + 2 * i] = p.x;
        x[IDX_CAM_XY + 2 * i + 1] = p.y;
    }
    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagecal_core::synthetic::{project_pattern, radial_stage_points};
    use stagecal_core::{Pt2, StageCamera};
    use stagecal_linear::{bootstrap_poses, seed_intrinsics};
    use stagecal_core::ImageSize;

    #[test]
    fn seed_recovers_camera_geometry_without_noise() {
        let cam = StageCamera {
            intrinsics: Intrinsics::new(1200.0, 1200.0, 319.5, 239.5),
            distortion: BrownConrady5::default(),
            rvec: StageCamera::nominal_down_rvec(),
            position: Vec3::new(4.0, -6.0, 400.0),
        };
        let patterns: Vec<TestPattern> = [0.0, 5.0, 10.0]
            .iter()
            .map(|&z| {
                let pts = radial_stage_points(Pt2::new(4.0, -6.0), z, 60.0, 16, 4);
                project_pattern(&cam, &pts).unwrap()
            })
            .collect();

        let k = seed_intrinsics(ImageSize::new(640, 480), 1200.0);
        let poses = bootstrap_poses(&patterns, &k).unwrap();
        let x = build_seed(&patterns, &k, &BrownConrady5::default(), &poses).unwrap();

        assert_eq!(x.len(), param_count(3));
        assert!((x[IDX_CAM_Z] - 400.0).abs() < 1e-6, "camZ = {}", x[IDX_CAM_Z]);
        assert!((x[IDX_CAM_XY] - 4.0).abs() < 1e-6);
        assert!((x[IDX_CAM_XY + 1] + 6.0).abs() < 1e-6);
        // averaged rotation should match the straight-down ground truth
        let r = stagecal_core::rotation::rodrigues(&Vec3::new(
            x[IDX_ROT],
            x[IDX_ROT + 1],
            x[IDX_ROT + 2],
        ));
        assert!((r - cam.rotation()).norm() < 1e-6);
    }

    #[test]
    fn mismatched_pose_count_is_rejected() {
        let cam = StageCamera {
            intrinsics: Intrinsics::new(1000.0, 1000.0, 320.0, 240.0),
            distortion: BrownConrady5::default(),
            rvec: StageCamera::nominal_down_rvec(),
            position: Vec3::new(0.0, 0.0, 300.0),
        };
        let pts = radial_stage_points(Pt2::new(0.0, 0.0), 0.0, 40.0, 8, 2);
        let pattern = project_pattern(&cam, &pts).unwrap();
        let err = build_seed(
            &[pattern],
            &cam.intrinsics,
            &BrownConrady5::default(),
            &[],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            FitError::SeedMismatch {
                patterns: 1,
                poses: 0
            }
        ));
    }
}
