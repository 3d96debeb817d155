//! Virtual camera intrinsics from the rectified field of view.
//!
//! The rectified image border is no longer a rectangle (distortion bows it,
//! rectification shears it). The virtual focal length trades off between the
//! largest image-shaped rectangle inscribed in that border (alpha = 0, every
//! virtual pixel valid) and the smallest one containing it (alpha = 1, every
//! source pixel visible).

use log::warn;

use stagecal_core::{BrownConrady5, ImageSize, Intrinsics, Pt2, Real, Vec2};
use stagecal_core::Mat3;

use crate::rectify::apply_homography;

/// Border samples per image side.
const SAMPLES_PER_SIDE: usize = 250;
/// Inner-rectangle recentering convergence threshold, rectified units.
const CENTER_TOLERANCE: Real = 1e-4;

/// Compute the virtual camera matrix for a valid-pixel trade-off `alpha`
/// in `[0, 1]`.
///
/// With `keep_principal_point` the search rectangles are centered on the
/// rectified physical principal ray, so the virtual view stays centered on
/// what the physical camera considers straight ahead.
pub fn compute_virtual_intrinsics(
    physical: &Intrinsics,
    distortion: &BrownConrady5,
    rectification: &Mat3,
    size: ImageSize,
    alpha: Real,
    keep_principal_point: bool,
) -> Intrinsics {
    let alpha = alpha.clamp(0.0, 1.0);
    // center offsets use the pixel grid, the focal scale the full pixel count
    let half_img = Vec2::new(
        (size.width as Real - 1.0) / 2.0,
        (size.height as Real - 1.0) / 2.0,
    );
    let half_px = Vec2::new(size.width as Real / 2.0, size.height as Real / 2.0);

    let border = rectified_border(physical, distortion, rectification, size);

    let pp_center = if keep_principal_point {
        // the principal ray is (0, 0) in normalized coordinates and
        // distortion fixes the origin, so only rectification moves it
        apply_homography(rectification, &Pt2::new(0.0, 0.0))
            .ok()
            .map(|p| Vec2::new(p.x, p.y))
    } else {
        None
    };

    // inner seed: where the diagonals of the four rectified image corners
    // cross, unless the center is pinned to the principal ray
    let seed = pp_center
        .or_else(|| diagonal_intersection(physical, distortion, rectification, size))
        .unwrap_or_else(|| centroid(&border));

    let (outer_center, outer_f) = outer_rectangle(&border, &half_px, pp_center)
        .unwrap_or_else(|| fallback(&half_px, pp_center));
    let (inner_center, inner_f) = inner_rectangle(&border, &half_px, pp_center, seed)
        .unwrap_or_else(|| fallback(&half_px, pp_center));

    // focal length and principal point each blend linearly in alpha
    let lerp = |a: Real, b: Real| a + alpha * (b - a);
    let f = lerp(inner_f, outer_f);
    Intrinsics::new(
        f,
        f,
        lerp(
            half_img.x - inner_f * inner_center.x,
            half_img.x - outer_f * outer_center.x,
        ),
        lerp(
            half_img.y - inner_f * inner_center.y,
            half_img.y - outer_f * outer_center.y,
        ),
    )
}

/// Image border pixels pushed through undistortion and rectification.
fn rectified_border(
    physical: &Intrinsics,
    distortion: &BrownConrady5,
    rectification: &Mat3,
    size: ImageSize,
) -> Vec<Vec2> {
    let w = size.width as Real - 1.0;
    let h = size.height as Real - 1.0;
    let n = SAMPLES_PER_SIDE;
    let step = |i: usize, extent: Real| extent * i as Real / (n - 1) as Real;

    let mut pixels = Vec::with_capacity(4 * (n - 1));
    for i in 0..n - 1 {
        pixels.push(Pt2::new(step(i, w), 0.0)); // top, left to right
    }
    for i in 0..n - 1 {
        pixels.push(Pt2::new(w, step(i, h))); // right, top to bottom
    }
    for i in 0..n - 1 {
        pixels.push(Pt2::new(w - step(i, w), h)); // bottom, right to left
    }
    for i in 0..n - 1 {
        pixels.push(Pt2::new(0.0, h - step(i, h))); // left, bottom to top
    }

    pixels
        .iter()
        .filter_map(|px| {
            let n = physical.pixel_to_normalized(px);
            let u = distortion.undistort(&n);
            let r = apply_homography(rectification, &Pt2::new(u.x, u.y)).ok()?;
            let v = Vec2::new(r.x, r.y);
            (v.x.is_finite() && v.y.is_finite()).then_some(v)
        })
        .collect()
}

/// Smallest image-shaped rectangle containing every border point. Returns
/// the center (rectified units) and the focal length that maps it onto the
/// image.
fn outer_rectangle(
    border: &[Vec2],
    half_px: &Vec2,
    pp_center: Option<Vec2>,
) -> Option<(Vec2, Real)> {
    if border.is_empty() {
        return None;
    }
    let (center, half_w, half_h) = match pp_center {
        Some(c) => {
            let half_w = border.iter().map(|p| (p.x - c.x).abs()).fold(0.0, Real::max);
            let half_h = border.iter().map(|p| (p.y - c.y).abs()).fold(0.0, Real::max);
            (c, half_w, half_h)
        }
        None => {
            let min_x = border.iter().map(|p| p.x).fold(Real::INFINITY, Real::min);
            let max_x = border.iter().map(|p| p.x).fold(Real::NEG_INFINITY, Real::max);
            let min_y = border.iter().map(|p| p.y).fold(Real::INFINITY, Real::min);
            let max_y = border.iter().map(|p| p.y).fold(Real::NEG_INFINITY, Real::max);
            (
                Vec2::new((min_x + max_x) / 2.0, (min_y + max_y) / 2.0),
                (max_x - min_x) / 2.0,
                (max_y - min_y) / 2.0,
            )
        }
    };
    if half_w <= 0.0 || half_h <= 0.0 || !half_w.is_finite() || !half_h.is_finite() {
        return None;
    }
    let f = (half_px.x / half_w).min(half_px.y / half_h);
    Some((center, f))
}

fn centroid(border: &[Vec2]) -> Vec2 {
    if border.is_empty() {
        return Vec2::zeros();
    }
    border.iter().sum::<Vec2>() / border.len() as Real
}

/// Crossing point of the diagonals of the four rectified image corners.
fn diagonal_intersection(
    physical: &Intrinsics,
    distortion: &BrownConrady5,
    rectification: &Mat3,
    size: ImageSize,
) -> Option<Vec2> {
    let w = size.width as Real - 1.0;
    let h = size.height as Real - 1.0;
    let corners = [(0.0, 0.0), (w, 0.0), (w, h), (0.0, h)];
    let mut c = [Vec2::zeros(); 4];
    for (i, &(x, y)) in corners.iter().enumerate() {
        let n = physical.pixel_to_normalized(&Pt2::new(x, y));
        let u = distortion.undistort(&n);
        let r = apply_homography(rectification, &Pt2::new(u.x, u.y)).ok()?;
        if !(r.x.is_finite() && r.y.is_finite()) {
            return None;
        }
        c[i] = Vec2::new(r.x, r.y);
    }
    // c0 + t (c2 - c0) == c1 + s (c3 - c1)
    let d02 = c[2] - c[0];
    let d13 = c[3] - c[1];
    let det = d02.x * (-d13.y) - (-d13.x) * d02.y;
    if det.abs() < 1e-15 {
        return None;
    }
    let rhs = c[1] - c[0];
    let t = (rhs.x * (-d13.y) - (-d13.x) * rhs.y) / det;
    Some(c[0] + d02 * t)
}

/// Largest image-shaped rectangle inscribed in the border polygon, found by
/// iterative sector-based tightening with recentering.
fn inner_rectangle(
    border: &[Vec2],
    half_px: &Vec2,
    pp_center: Option<Vec2>,
    seed: Vec2,
) -> Option<(Vec2, Real)> {
    if border.is_empty() {
        return None;
    }
    let mut center = seed;

    let mut half_w = 0.0;
    let mut half_h = 0.0;
    for _ in 0..100 {
        let mut left = Real::INFINITY;
        let mut right = Real::INFINITY;
        let mut up = Real::INFINITY;
        let mut down = Real::INFINITY;
        for p in border {
            let d = p - center;
            // sector split along the image diagonal through the center
            if d.y.abs() * half_px.x <= d.x.abs() * half_px.y {
                if d.x >= 0.0 {
                    right = right.min(d.x);
                } else {
                    left = left.min(-d.x);
                }
            } else if d.y >= 0.0 {
                down = down.min(d.y);
            } else {
                up = up.min(-d.y);
            }
        }
        if !(left.is_finite() && right.is_finite() && up.is_finite() && down.is_finite()) {
            return None;
        }

        let (new_center, hw, hh) = if pp_center.is_some() {
            (center, left.min(right), up.min(down))
        } else {
            (
                center + Vec2::new((right - left) / 2.0, (down - up) / 2.0),
                (left + right) / 2.0,
                (up + down) / 2.0,
            )
        };
        // shrink to the image aspect
        let scale = (hw / half_px.x).min(hh / half_px.y);
        if scale <= 0.0 || !scale.is_finite() {
            return None;
        }
        half_w = scale * half_px.x;
        half_h = scale * half_px.y;

        let shift = (new_center - center).norm();
        center = new_center;
        if shift < CENTER_TOLERANCE {
            break;
        }
    }
    if half_w <= 0.0 || half_h <= 0.0 {
        return None;
    }
    let f = (half_px.x / half_w).max(half_px.y / half_h);
    Some((center, f))
}

/// Degenerate border: fall back to a unit box so the caller still gets a
/// usable (if arbitrary) virtual camera.
fn fallback(half_px: &Vec2, pp_center: Option<Vec2>) -> (Vec2, Real) {
    warn!("rectified image border is degenerate, using unit field of view");
    (
        pp_center.unwrap_or_else(Vec2::zeros),
        half_px.x.min(half_px.y),
    )
}
