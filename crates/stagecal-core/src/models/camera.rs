//! Ground-truth stage camera model for synthetic data.

use serde::{Deserialize, Serialize};

use crate::math::rotation::rodrigues;
use crate::math::{Mat3, Pt2, Pt3, Real, Vec3};
use crate::models::distortion::BrownConrady5;
use crate::models::intrinsics::Intrinsics;

/// A camera rigidly mounted above a motion stage.
///
/// Projection of a stage point `X` is `u = K * D(R * (X - T))` where `T` is
/// the camera position in stage coordinates and `R` the stage-to-camera
/// rotation. For a camera looking straight down at the stage the nominal
/// rotation is `diag(1, -1, -1)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StageCamera {
    pub intrinsics: Intrinsics,
    pub distortion: BrownConrady5,
    /// Stage-to-camera rotation as a Rodrigues vector.
    pub rvec: Vec3,
    /// Camera position in stage coordinates, millimetres.
    pub position: Vec3,
}

impl StageCamera {
    /// The stage-to-camera rotation matrix.
    pub fn rotation(&self) -> Mat3 {
        rodrigues(&self.rvec)
    }

    /// Rodrigues vector of the nominal straight-down orientation
    /// `diag(1, -1, -1)` (stage X kept, Y and Z inverted).
    pub fn nominal_down_rvec() -> Vec3 {
        Vec3::new(std::f64::consts::PI, 0.0, 0.0)
    }

    /// Project a stage point to a pixel.
    ///
    /// Returns `None` for points at or behind the camera plane.
    pub fn project(&self, stage: &Pt3) -> Option<Pt2> {
        let pc = self.rotation() * (stage.coords - self.position);
        if pc.z <= Real::EPSILON {
            return None;
        }
        let n = pc.xy() / pc.z;
        Some(self.intrinsics.normalized_to_pixel(&self.distortion.distort(&n)))
    }

    /// Unit vector along the optical axis, expressed in stage coordinates.
    pub fn optical_axis(&self) -> Vec3 {
        self.rotation().transpose() * Vec3::z()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn straight_down_camera() -> StageCamera {
        StageCamera {
            intrinsics: Intrinsics::new(1200.0, 1200.0, 319.5, 239.5),
            distortion: BrownConrady5::default(),
            rvec: StageCamera::nominal_down_rvec(),
            position: Vec3::new(10.0, 20.0, 400.0),
        }
    }

    #[test]
    fn nominal_rotation_is_diag_1_m1_m1() {
        let r = rodrigues(&StageCamera::nominal_down_rvec());
        let expected = Mat3::from_diagonal(&Vec3::new(1.0, -1.0, -1.0));
        assert!((r - expected).norm() < 1e-12);
    }

    #[test]
    fn point_below_camera_hits_principal_point() {
        let cam = straight_down_camera();
        let px = cam.project(&Pt3::new(10.0, 20.0, 0.0)).unwrap();
        assert!((px - Pt2::new(319.5, 239.5)).norm() < 1e-9);
    }

    #[test]
    fn point_above_camera_does_not_project() {
        let cam = straight_down_camera();
        assert!(cam.project(&Pt3::new(10.0, 20.0, 500.0)).is_none());
    }

    #[test]
    fn optical_axis_of_down_camera_points_down() {
        let cam = straight_down_camera();
        assert!((cam.optical_axis() - Vec3::new(0.0, 0.0, -1.0)).norm() < 1e-12);
    }
}
