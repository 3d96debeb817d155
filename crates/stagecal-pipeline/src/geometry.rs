//! Geometric post-processing of the fitted parameters.

use nalgebra::{DMatrix, DVector};

use stagecal_core::{Mat3, Real, Vec2, Vec3};

/// Decompose the fitted rotation into mounting-error angles, degrees.
///
/// The nearest axis-aligned 90-degree orientation is found by snapping the
/// dominant element of each row to +/-1; the residual `E = S^T R` is then
/// read as small Z-Y-X Euler angles. For a well-mounted straight-down
/// camera `S = diag(1, -1, -1)` and the angles are the stage-axis
/// misalignments of the camera.
pub fn rotation_error_degrees(r: &Mat3) -> Vec3 {
    let mut snap = Mat3::zeros();
    for i in 0..3 {
        let row = r.row(i);
        let mut j_max = 0;
        for j in 1..3 {
            if row[j].abs() > row[j_max].abs() {
                j_max = j;
            }
        }
        snap[(i, j_max)] = row[j_max].signum();
    }
    let e = snap.transpose() * r;
    let z = e[(0, 1)].atan2(e[(0, 0)]);
    let y = (-e[(0, 2)]).clamp(-1.0, 1.0).asin();
    let x = e[(1, 2)].atan2(e[(2, 2)]);
    Vec3::new(x.to_degrees(), y.to_degrees(), z.to_degrees())
}

/// Linear trend of the per-pattern camera X/Y against pattern height.
#[derive(Debug, Clone, Copy)]
pub struct XyTrend {
    pub slope: Vec2,
    pub intercept: Vec2,
}

impl XyTrend {
    /// Interpolated camera X/Y at height `z`.
    pub fn at(&self, z: Real) -> Vec2 {
        self.intercept + self.slope * z
    }
}

/// Least-squares line through `(z_i, xy_i)`, solved by SVD.
///
/// A single sample yields a flat trend through that sample. Returns `None`
/// when the solve breaks down numerically.
pub fn fit_xy_trend(heights: &[Real], xy: &[Vec2]) -> Option<XyTrend> {
    if heights.is_empty() || heights.len() != xy.len() {
        return None;
    }
    if heights.len() == 1 {
        return Some(XyTrend {
            slope: Vec2::zeros(),
            intercept: xy[0],
        });
    }

    let n = heights.len();
    let mut a = DMatrix::<Real>::zeros(n, 2);
    let mut bx = DVector::<Real>::zeros(n);
    let mut by = DVector::<Real>::zeros(n);
    for i in 0..n {
        a[(i, 0)] = heights[i];
        a[(i, 1)] = 1.0;
        bx[i] = xy[i].x;
        by[i] = xy[i].y;
    }
    let svd = a.svd(true, true);
    let sol_x = svd.solve(&bx, 1e-12).ok()?;
    let sol_y = svd.solve(&by, 1e-12).ok()?;
    Some(XyTrend {
        slope: Vec2::new(sol_x[0], sol_y[0]),
        intercept: Vec2::new(sol_x[1], sol_y[1]),
    })
}
