//! 5-parameter Brown-Conrady lens distortion.

use nalgebra::{Matrix2, Matrix2x5};
use serde::{Deserialize, Serialize};

use crate::math::{Real, Vec2};

/// Brown-Conrady distortion with three radial and two tangential coefficients.
///
/// Coefficient order is `(k1, k2, p1, p2, k3)`, matching the layout used in
/// the fitted parameter vector. All operations work on normalized image
/// coordinates (pre-intrinsics).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BrownConrady5 {
    pub k1: Real,
    pub k2: Real,
    pub p1: Real,
    pub p2: Real,
    pub k3: Real,
}

/// Fixed-point iterations for the inverse map. The distortions this targets
/// are mild (machine-vision lenses), so convergence is fast.
const UNDISTORT_ITERS: usize = 10;

impl BrownConrady5 {
    pub fn new(k1: Real, k2: Real, p1: Real, p2: Real, k3: Real) -> Self {
        Self { k1, k2, p1, p2, k3 }
    }

    /// Coefficients in parameter-vector order.
    pub fn as_array(&self) -> [Real; 5] {
        [self.k1, self.k2, self.p1, self.p2, self.k3]
    }

    pub fn from_array(c: [Real; 5]) -> Self {
        Self::new(c[0], c[1], c[2], c[3], c[4])
    }

    /// Apply distortion to a normalized image point.
    pub fn distort(&self, n: &Vec2) -> Vec2 {
        let (x, y) = (n.x, n.y);
        let r2 = x * x + y * y;
        let radial = 1.0 + r2 * (self.k1 + r2 * (self.k2 + r2 * self.k3));
        let two_xy = 2.0 * x * y;
        Vec2::new(
            x * radial + self.p1 * two_xy + self.p2 * (r2 + 2.0 * x * x),
            y * radial + self.p1 * (r2 + 2.0 * y * y) + self.p2 * two_xy,
        )
    }

    /// Invert the distortion by fixed-point iteration.
    pub fn undistort(&self, d: &Vec2) -> Vec2 {
        let mut n = *d;
        for _ in 0..UNDISTORT_ITERS {
            let delta = self.distort(&n) - n;
            n = *d - delta;
        }
        n
    }

    /// Jacobian of the distorted point w.r.t. the undistorted point.
    pub fn point_jacobian(&self, n: &Vec2) -> Matrix2<Real> {
        let (x, y) = (n.x, n.y);
        let r2 = x * x + y * y;
        let radial = 1.0 + r2 * (self.k1 + r2 * (self.k2 + r2 * self.k3));
        // d(radial)/d(r^2)
        let g = self.k1 + r2 * (2.0 * self.k2 + 3.0 * self.k3 * r2);
        let dxdx = radial + 2.0 * x * x * g + 2.0 * self.p1 * y + 6.0 * self.p2 * x;
        let dxdy = 2.0 * x * y * g + 2.0 * self.p1 * x + 2.0 * self.p2 * y;
        let dydy = radial + 2.0 * y * y * g + 6.0 * self.p1 * y + 2.0 * self.p2 * x;
        Matrix2::new(dxdx, dxdy, dxdy, dydy)
    }

    /// Jacobian of the distorted point w.r.t. the coefficients
    /// `(k1, k2, p1, p2, k3)`.
    pub fn coeff_jacobian(&self, n: &Vec2) -> Matrix2x5<Real> {
        let (x, y) = (n.x, n.y);
        let r2 = x * x + y * y;
        let r4 = r2 * r2;
        let r6 = r4 * r2;
        let two_xy = 2.0 * x * y;
        Matrix2x5::new(
            x * r2, x * r4, two_xy, r2 + 2.0 * x * x, x * r6, //
            y * r2, y * r4, r2 + 2.0 * y * y, two_xy, y * r6,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> BrownConrady5 {
        BrownConrady5::new(-0.05, 0.01, 1e-3, -5e-4, 2e-3)
    }

    #[test]
    fn zero_coefficients_are_identity() {
        let d = BrownConrady5::default();
        let n = Vec2::new(0.21, -0.13);
        assert!((d.distort(&n) - n).norm() < 1e-15);
    }

    #[test]
    fn undistort_inverts_distort() {
        let d = sample();
        let n = Vec2::new(0.25, -0.18);
        let back = d.undistort(&d.distort(&n));
        assert!((back - n).norm() < 1e-9);
    }

    #[test]
    fn point_jacobian_matches_finite_differences() {
        let d = sample();
        let n = Vec2::new(0.22, 0.14);
        let h = 1e-7;
        let j = d.point_jacobian(&n);
        for col in 0..2 {
            let mut np = n;
            let mut nm = n;
            np[col] += h;
            nm[col] -= h;
            let numeric = (d.distort(&np) - d.distort(&nm)) / (2.0 * h);
            assert!((j.column(col) - numeric).norm() < 1e-6);
        }
    }

    #[test]
    fn coeff_jacobian_matches_finite_differences() {
        let d = sample();
        let n = Vec2::new(-0.17, 0.23);
        let h = 1e-7;
        let j = d.coeff_jacobian(&n);
        let coeffs = d.as_array();
        for (col, _) in coeffs.iter().enumerate() {
            let mut cp = coeffs;
            let mut cm = coeffs;
            cp[col] += h;
            cm[col] -= h;
            let numeric = (BrownConrady5::from_array(cp).distort(&n)
                - BrownConrady5::from_array(cm).distort(&n))
                / (2.0 * h);
            assert!((j.column(col) - numeric).norm() < 1e-6);
        }
    }
}
