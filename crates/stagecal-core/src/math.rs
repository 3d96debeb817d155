//! Math type aliases and small helpers shared across the workspace.

use nalgebra::{Matrix3, Point2, Point3, Vector2, Vector3};

pub mod rotation;

/// Scalar type used throughout the workspace.
pub type Real = f64;

/// 2D vector.
pub type Vec2 = Vector2<Real>;
/// 3D vector.
pub type Vec3 = Vector3<Real>;
/// 2D point (pixel or planar stage coordinates).
pub type Pt2 = Point2<Real>;
/// 3D point (stage coordinates, millimetres).
pub type Pt3 = Point3<Real>;
/// 3x3 matrix (rotations, intrinsics, homographies).
pub type Mat3 = Matrix3<Real>;

/// Lift a 2D point to homogeneous coordinates with `w = 1`.
#[inline]
pub fn to_homogeneous(p: &Pt2) -> Vec3 {
    Vec3::new(p.x, p.y, 1.0)
}

/// Project a homogeneous 3-vector back to a 2D point.
///
/// Returns `None` when the homogeneous scale is numerically zero.
#[inline]
pub fn from_homogeneous(v: &Vec3) -> Option<Pt2> {
    if v.z.abs() < Real::EPSILON {
        return None;
    }
    Some(Pt2::new(v.x / v.z, v.y / v.z))
}

/// Skew-symmetric cross-product matrix of `v`: `skew(v) * w == v × w`.
#[inline]
pub fn skew(v: &Vec3) -> Mat3 {
    Mat3::new(0.0, -v.z, v.y, v.z, 0.0, -v.x, -v.y, v.x, 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn homogeneous_roundtrip() {
        let p = Pt2::new(3.5, -1.25);
        let h = to_homogeneous(&p);
        let back = from_homogeneous(&(h * 4.0)).unwrap();
        assert!((back - p).norm() < 1e-12);
    }

    #[test]
    fn from_homogeneous_rejects_point_at_infinity() {
        assert!(from_homogeneous(&Vec3::new(1.0, 2.0, 0.0)).is_none());
    }

    #[test]
    fn skew_matches_cross_product() {
        let a = Vec3::new(0.3, -1.2, 2.0);
        let b = Vec3::new(-0.5, 0.7, 1.1);
        assert!((skew(&a) * b - a.cross(&b)).norm() < 1e-14);
    }
}
