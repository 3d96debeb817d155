//! Rotation-vector (Rodrigues) utilities.
//!
//! The optimizer parameterizes the camera orientation as a rotation vector
//! (axis scaled by angle), so besides the forward/inverse maps we need the
//! closed-form derivative of the rotation matrix with respect to the vector
//! components (Gallego & Yezzi, "A compact formula for the derivative of a
//! 3-D rotation in exponential coordinates").

use nalgebra::{Rotation3, UnitQuaternion};

use super::{skew, Mat3, Real, Vec3};

/// Angles below this are treated as the identity rotation.
const SMALL_ANGLE: Real = 1e-12;

/// Rodrigues formula: rotation vector to rotation matrix.
pub fn rodrigues(r: &Vec3) -> Mat3 {
    let theta = r.norm();
    if theta < SMALL_ANGLE {
        return Mat3::identity() + skew(r);
    }
    let k = skew(r) / theta;
    Mat3::identity() + k * theta.sin() + k * k * (1.0 - theta.cos())
}

/// Inverse Rodrigues: rotation matrix to rotation vector.
///
/// The input is assumed to be (numerically close to) a proper rotation.
pub fn rodrigues_vec(m: &Mat3) -> Vec3 {
    let rot = Rotation3::from_matrix_unchecked(*m);
    UnitQuaternion::from_rotation_matrix(&rot).scaled_axis()
}

/// Derivatives of `rodrigues(r)` with respect to the three components of `r`.
///
/// Returns `[dR/dr_x, dR/dr_y, dR/dr_z]`. At the identity the limit
/// `dR/dr_i = [e_i]x` is used.
pub fn rodrigues_jacobian(r: &Vec3) -> [Mat3; 3] {
    let theta_sq = r.norm_squared();
    if theta_sq < SMALL_ANGLE * SMALL_ANGLE {
        return [
            skew(&Vec3::x()),
            skew(&Vec3::y()),
            skew(&Vec3::z()),
        ];
    }
    let rot = rodrigues(r);
    let eye_minus = Mat3::identity() - rot;
    let mut out = [Mat3::zeros(); 3];
    for (i, d) in out.iter_mut().enumerate() {
        let e_i = Vec3::ith(i, 1.0);
        let v = r.cross(&(eye_minus * e_i));
        *d = (skew(r) * r[i] + skew(&v)) * rot / theta_sq;
    }
    out
}

/// Chordal average of a set of rotation matrices.
///
/// Sums the matrices and projects the sum back onto SO(3) via SVD, flipping
/// the weakest singular direction if the determinant comes out negative.
pub fn average_rotations(rotations: &[Mat3]) -> Option<Mat3> {
    if rotations.is_empty() {
        return None;
    }
    let sum: Mat3 = rotations.iter().sum();
    let svd = sum.svd(true, true);
    let u = svd.u?;
    let v_t = svd.v_t?;
    let mut r = u * v_t;
    if r.determinant() < 0.0 {
        // nalgebra sorts singular values descending, so column 2 is weakest
        let mut u_flipped = u;
        u_flipped.column_mut(2).neg_mut();
        r = u_flipped * v_t;
    }
    Some(r)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_3;

    fn numeric_jacobian(r: &Vec3, i: usize) -> Mat3 {
        let h = 1e-7;
        let mut rp = *r;
        let mut rm = *r;
        rp[i] += h;
        rm[i] -= h;
        (rodrigues(&rp) - rodrigues(&rm)) / (2.0 * h)
    }

    #[test]
    fn rodrigues_roundtrip() {
        let r = Vec3::new(0.2, -0.7, 0.4);
        let back = rodrigues_vec(&rodrigues(&r));
        assert!((back - r).norm() < 1e-10);
    }

    #[test]
    fn rodrigues_identity() {
        let r = rodrigues(&Vec3::zeros());
        assert!((r - Mat3::identity()).norm() < 1e-15);
    }

    #[test]
    fn rodrigues_quarter_turn_about_z() {
        let r = rodrigues(&Vec3::new(0.0, 0.0, std::f64::consts::FRAC_PI_2));
        let v = r * Vec3::x();
        assert!((v - Vec3::y()).norm() < 1e-12);
    }

    #[test]
    fn jacobian_matches_finite_differences() {
        for r in [
            Vec3::new(0.3, -0.2, 0.9),
            Vec3::new(-1.1, 0.05, 0.0),
            Vec3::new(0.0, 0.0, 1e-3),
        ] {
            let analytic = rodrigues_jacobian(&r);
            for i in 0..3 {
                let numeric = numeric_jacobian(&r, i);
                assert!(
                    (analytic[i] - numeric).norm() < 1e-6,
                    "dR/dr_{} mismatch at {:?}",
                    i,
                    r
                );
            }
        }
    }

    #[test]
    fn jacobian_near_identity_is_skew_basis() {
        let analytic = rodrigues_jacobian(&Vec3::zeros());
        assert!((analytic[2] - skew(&Vec3::z())).norm() < 1e-12);
    }

    #[test]
    fn average_of_identical_rotations() {
        let r = rodrigues(&Vec3::new(0.1, 0.2, -0.3));
        let avg = average_rotations(&[r, r, r]).unwrap();
        assert!((avg - r).norm() < 1e-12);
    }

    #[test]
    fn average_of_opposing_perturbations() {
        let base = rodrigues(&Vec3::new(0.0, 0.0, FRAC_PI_3));
        let plus = rodrigues(&Vec3::new(0.01, 0.0, FRAC_PI_3));
        let minus = rodrigues(&Vec3::new(-0.01, 0.0, FRAC_PI_3));
        let avg = average_rotations(&[plus, minus]).unwrap();
        assert!((avg - base).norm() < 1e-4);
        assert!((avg.determinant() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn average_of_empty_set_is_none() {
        assert!(average_rotations(&[]).is_none());
    }
}
