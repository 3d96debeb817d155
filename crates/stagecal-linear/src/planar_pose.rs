//! Planar pose decomposition of a homography.

use stagecal_core::{Mat3, Vec3};

/// Pose of a planar pattern (its own `Z = 0` frame) relative to the camera.
#[derive(Debug, Clone, Copy)]
pub struct PatternPose {
    /// Pattern-to-camera rotation.
    pub rotation: Mat3,
    /// Pattern origin in camera coordinates.
    pub translation: Vec3,
}

/// Decompose a plane-to-image homography `H = K [r1 r2 t]` into a pose.
///
/// The first two rotation columns come from `K^-1 H` scaled by the average
/// of their norms, the third from their cross product; the result is
/// projected onto SO(3) via SVD. Returns `None` when `K` is singular or the
/// SVD fails to produce the factors.
pub fn pose_from_homography(kmtx: &Mat3, hmtx: &Mat3) -> Option<PatternPose> {
    let k_inv = kmtx.try_inverse()?;

    let g = k_inv * hmtx;
    let g1 = g.column(0).into_owned();
    let g2 = g.column(1).into_owned();
    let g3 = g.column(2).into_owned();

    let scale = (g1.norm() + g2.norm()) * 0.5;
    if scale < 1e-12 {
        return None;
    }
    let lambda = 1.0 / scale;

    let r1 = g1 * lambda;
    let r2 = g2 * lambda;
    let r3 = r1.cross(&r2);

    let mut r_raw = Mat3::zeros();
    r_raw.set_column(0, &r1);
    r_raw.set_column(1, &r2);
    r_raw.set_column(2, &r3);

    let svd = r_raw.svd(true, true);
    let mut u = svd.u?;
    let v_t = svd.v_t?;
    if (u * v_t).determinant() < 0.0 {
        u.column_mut(2).neg_mut();
    }

    Some(PatternPose {
        rotation: u * v_t,
        translation: g3 * lambda,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagecal_core::rotation::rodrigues;

    #[test]
    fn recovers_synthetic_pose() {
        let k = Mat3::new(1000.0, 0.0, 320.0, 0.0, 1000.0, 240.0, 0.0, 0.0, 1.0);
        let r = rodrigues(&Vec3::new(0.1, -0.05, 0.2));
        let t = Vec3::new(5.0, -2.0, 100.0);

        let mut ext = Mat3::zeros();
        ext.set_column(0, &r.column(0).into_owned());
        ext.set_column(1, &r.column(1).into_owned());
        ext.set_column(2, &t);
        let h = k * ext;

        let pose = pose_from_homography(&k, &h).unwrap();
        assert!((pose.translation - t).norm() < 1e-6);
        assert!((pose.rotation - r).norm() < 1e-6);
    }

    #[test]
    fn recovers_straight_down_pose() {
        let k = Mat3::new(1200.0, 0.0, 319.5, 0.0, 1200.0, 239.5, 0.0, 0.0, 1.0);
        // camera looking straight down: R = diag(1, -1, -1)
        let r = Mat3::from_diagonal(&Vec3::new(1.0, -1.0, -1.0));
        let t = Vec3::new(0.0, 0.0, 400.0);

        let mut ext = Mat3::zeros();
        ext.set_column(0, &r.column(0).into_owned());
        ext.set_column(1, &r.column(1).into_owned());
        ext.set_column(2, &t);
        let h = k * ext;

        let pose = pose_from_homography(&k, &h).unwrap();
        assert!((pose.rotation - r).norm() < 1e-9);
        assert!((pose.translation - t).norm() < 1e-6);
    }

    #[test]
    fn singular_intrinsics_yield_none() {
        let k = Mat3::zeros();
        let h = Mat3::identity();
        assert!(pose_from_homography(&k, &h).is_none());
    }
}
