//! Pinhole intrinsics (no skew).

use serde::{Deserialize, Serialize};

use crate::math::{Mat3, Pt2, Real, Vec2};

/// Pinhole intrinsic parameters: focal lengths and principal point, in pixels.
///
/// Skew is not modeled; the sensors this targets have square, axis-aligned
/// pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Intrinsics {
    pub fx: Real,
    pub fy: Real,
    pub cx: Real,
    pub cy: Real,
}

impl Intrinsics {
    pub fn new(fx: Real, fy: Real, cx: Real, cy: Real) -> Self {
        Self { fx, fy, cx, cy }
    }

    /// The 3x3 camera matrix `K`.
    pub fn matrix(&self) -> Mat3 {
        Mat3::new(self.fx, 0.0, self.cx, 0.0, self.fy, self.cy, 0.0, 0.0, 1.0)
    }

    /// Extract parameters from a camera matrix (skew entry is ignored).
    pub fn from_matrix(k: &Mat3) -> Self {
        Self {
            fx: k[(0, 0)],
            fy: k[(1, 1)],
            cx: k[(0, 2)],
            cy: k[(1, 2)],
        }
    }

    /// Normalized image coordinates to pixel coordinates.
    #[inline]
    pub fn normalized_to_pixel(&self, n: &Vec2) -> Pt2 {
        Pt2::new(self.fx * n.x + self.cx, self.fy * n.y + self.cy)
    }

    /// Pixel coordinates to normalized image coordinates.
    #[inline]
    pub fn pixel_to_normalized(&self, p: &Pt2) -> Vec2 {
        Vec2::new((p.x - self.cx) / self.fx, (p.y - self.cy) / self.fy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_normalized_roundtrip() {
        let k = Intrinsics::new(1200.0, 1180.0, 319.5, 239.5);
        let p = Pt2::new(100.0, 400.0);
        let back = k.normalized_to_pixel(&k.pixel_to_normalized(&p));
        assert!((back - p).norm() < 1e-12);
    }

    #[test]
    fn matrix_roundtrip() {
        let k = Intrinsics::new(800.0, 790.0, 640.0, 360.0);
        assert_eq!(Intrinsics::from_matrix(&k.matrix()), k);
    }
}
