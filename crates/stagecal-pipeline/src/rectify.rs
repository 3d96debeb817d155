//! Rectification homography to the ideal straight-down virtual camera.

use stagecal_core::{Mat3, Pt2, Real, Vec3};
use stagecal_linear::{dlt_homography, HomographyError};

use crate::error::CalibrateError;

/// Orientation of the virtual camera: stage X kept, Y and Z inverted.
pub fn virtual_rotation() -> Mat3 {
    Mat3::from_diagonal(&Vec3::new(1.0, -1.0, -1.0))
}

/// Homography mapping undistorted normalized physical rays to normalized
/// virtual rays, exact for stage points on the primary-Z plane.
///
/// Five synthetic rays are traced from the physical camera onto the primary
/// plane, re-observed from the virtual camera, and the projective map is
/// recovered by DLT. The map between the two views of one plane is exactly
/// projective, so the choice of rays only needs to be non-degenerate.
pub fn build_rectification(
    physical_rotation: &Mat3,
    physical_position: &Vec3,
    virtual_position: &Vec3,
    primary_z: Real,
) -> Result<Mat3, CalibrateError> {
    let depth_phy = physical_position.z - primary_z;
    if depth_phy <= 0.0 {
        return Err(CalibrateError::DegenerateGeometry(
            "camera must sit above the primary calibration height",
        ));
    }
    let rot_phy_to_vir = virtual_rotation() * physical_rotation.transpose();
    // in the virtual frame, from virtual camera to physical camera
    let offset = virtual_rotation() * (physical_position - virtual_position);

    let rays = [
        Pt2::new(0.0, 0.0),
        Pt2::new(-100.0, -100.0),
        Pt2::new(100.0, -100.0),
        Pt2::new(100.0, 100.0),
        Pt2::new(-100.0, 100.0),
    ];
    let mut virtual_pts = Vec::with_capacity(rays.len());
    for p in &rays {
        let dir = rot_phy_to_vir * Vec3::new(p.x, p.y, 1.0);
        if dir.z.abs() < 1e-12 {
            return Err(CalibrateError::DegenerateGeometry(
                "rectified ray parallel to the primary plane",
            ));
        }
        // scale so the ray pierces the primary-Z plane, then shift to the
        // virtual camera center
        let hit = dir * (depth_phy / dir.z) + offset;
        if hit.z.abs() < 1e-12 {
            return Err(CalibrateError::DegenerateGeometry(
                "virtual camera lies on the primary plane",
            ));
        }
        virtual_pts.push(Pt2::new(hit.x / hit.z, hit.y / hit.z));
    }

    dlt_homography(&rays, &virtual_pts).map_err(CalibrateError::from)
}

/// Apply a rectification homography to a normalized point.
pub(crate) fn apply_homography(h: &Mat3, n: &Pt2) -> Result<Pt2, HomographyError> {
    let v = h * Vec3::new(n.x, n.y, 1.0);
    if v.z.abs() < 1e-15 {
        return Err(HomographyError::Degenerate);
    }
    Ok(Pt2::new(v.x / v.z, v.y / v.z))
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagecal_core::rotation::rodrigues;

    #[test]
    fn already_ideal_camera_rectifies_to_identity() {
        let r = virtual_rotation();
        let pos = Vec3::new(5.0, -3.0, 400.0);
        let h = build_rectification(&r, &pos, &pos, 0.0).unwrap();
        assert!((h - Mat3::identity()).norm() < 1e-9, "H = {h}");
    }

    #[test]
    fn tilted_camera_maps_principal_ray_to_plane_hit() {
        // physical camera tilted 2 degrees about stage X
        let tilt = rodrigues(&Vec3::new((-2.0_f64).to_radians(), 0.0, 0.0));
        let r_phy = virtual_rotation() * tilt;
        let phy_pos = Vec3::new(0.0, 0.0, 400.0);
        let vir_pos = Vec3::new(0.0, 0.0, 400.2);
        let h = build_rectification(&r_phy, &phy_pos, &vir_pos, 0.0).unwrap();

        // the physical principal ray (0,0) hits the stage at the point the
        // virtual camera sees at the rectified location
        let rectified = apply_homography(&h, &Pt2::new(0.0, 0.0)).unwrap();

        // trace the physical principal ray by hand
        let dir_stage = r_phy.transpose() * Vec3::z();
        let hit_stage = phy_pos + dir_stage * (-400.0 / dir_stage.z);
        let in_vir = virtual_rotation() * (hit_stage - vir_pos);
        let expected = Pt2::new(in_vir.x / in_vir.z, in_vir.y / in_vir.z);
        assert!((rectified - expected).norm() < 1e-9);
    }

    #[test]
    fn camera_below_plane_is_rejected() {
        let r = virtual_rotation();
        let pos = Vec3::new(0.0, 0.0, -10.0);
        assert!(build_rectification(&r, &pos, &pos, 0.0).is_err());
    }
}
