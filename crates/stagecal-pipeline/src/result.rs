//! The calibration result aggregate.

use serde::{Deserialize, Serialize};

use stagecal_core::{
    BrownConrady5, ImageSize, Intrinsics, Mat3, Pt2, Real, TestPattern, Vec3,
};

use crate::rectify::apply_homography;

/// Camera mounting errors about the stage axes, degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RotationErrors {
    pub x: Real,
    pub y: Real,
    pub z: Real,
}

/// Everything a machine needs to use a calibrated stage camera.
///
/// Serializes as one self-describing nested record; the raw test patterns
/// ride along so a calibration can be re-run or audited later.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageCalibration {
    pub image_size: ImageSize,
    /// Stage height the rectification and virtual camera are exact at.
    pub primary_z: Real,
    /// Physical intrinsics.
    pub intrinsics: Intrinsics,
    pub distortion: BrownConrady5,
    /// Undistorted normalized physical rays to normalized virtual rays.
    pub rectification: Mat3,
    pub virtual_intrinsics: Intrinsics,
    /// Physical camera position in stage coordinates at the primary height.
    pub camera_position: Vec3,
    /// Unit vector along the physical optical axis, stage coordinates.
    pub optical_axis: Vec3,
    /// Straight-down virtual camera position in stage coordinates.
    pub virtual_camera_position: Vec3,
    pub rotation_errors: RotationErrors,
    /// Distance RMS of the kept points, pixels.
    pub drms: Real,
    /// The collected data, all points included.
    pub patterns: Vec<TestPattern>,
    /// Global indices of points rejected as outliers.
    pub outliers: Vec<usize>,
}

impl StageCalibration {
    /// Map a physical pixel to the corresponding virtual pixel.
    ///
    /// Chain: physical `K^-1`, iterative undistortion, rectification
    /// homography, virtual `K`. Returns `None` if the ray rectifies to
    /// infinity.
    pub fn undistort_rectify(&self, px: &Pt2) -> Option<Pt2> {
        let n = self.intrinsics.pixel_to_normalized(px);
        let u = self.distortion.undistort(&n);
        let r = apply_homography(&self.rectification, &Pt2::new(u.x, u.y)).ok()?;
        Some(self.virtual_intrinsics.normalized_to_pixel(&r.coords))
    }

    /// Map a virtual pixel back to the physical pixel observing it; the
    /// exact inverse of [`Self::undistort_rectify`].
    pub fn distort_unrectify(&self, px: &Pt2) -> Option<Pt2> {
        let n = self.virtual_intrinsics.pixel_to_normalized(px);
        let unrect = self.rectification.try_inverse()?;
        let u = apply_homography(&unrect, &Pt2::new(n.x, n.y)).ok()?;
        let d = self.distortion.distort(&u.coords);
        Some(self.intrinsics.normalized_to_pixel(&d))
    }

    /// Distance from the camera to the stage plane at height `z`, measured
    /// along the optical axis.
    pub fn distance_to_camera_at_z(&self, z: Real) -> Real {
        ((z - self.camera_position.z) / self.optical_axis.z).abs()
    }

    /// Stage millimetres per virtual pixel at height `z`.
    pub fn mm_per_pixel_at_z(&self, z: Real) -> Real {
        (self.virtual_camera_position.z - z).abs() / self.virtual_intrinsics.fx
    }
}
