//! Synthetic calibration data for tests and examples.
//!
//! Real collections walk the stage so a fiducial traces radial lines through
//! the image; the generators here lay the same radial-line point sets out
//! directly on the stage plane.

use anyhow::{bail, Result};

use crate::math::{Pt2, Pt3, Real};
use crate::models::camera::StageCamera;
use crate::pattern::{Correspondence, TestPattern};

/// Stage points along `lines` radial spokes around `center` on the plane
/// `z = height`, `points_per_line` samples per spoke plus the shared center
/// point.
pub fn radial_stage_points(
    center: Pt2,
    height: Real,
    max_radius: Real,
    lines: usize,
    points_per_line: usize,
) -> Vec<Pt3> {
    let mut out = Vec::with_capacity(lines * points_per_line + 1);
    out.push(Pt3::new(center.x, center.y, height));
    for line in 0..lines {
        let angle = 2.0 * std::f64::consts::PI * line as Real / lines as Real;
        let (sin, cos) = angle.sin_cos();
        for step in 1..=points_per_line {
            let radius = max_radius * step as Real / points_per_line as Real;
            out.push(Pt3::new(
                center.x + radius * cos,
                center.y + radius * sin,
                height,
            ));
        }
    }
    out
}

/// Project stage points through a ground-truth camera into a test pattern.
///
/// # Errors
///
/// Fails if any point does not project (behind the camera) so tests notice a
/// bad geometry setup instead of silently losing points.
pub fn project_pattern(camera: &StageCamera, stage_points: &[Pt3]) -> Result<TestPattern> {
    let mut points = Vec::with_capacity(stage_points.len());
    for p in stage_points {
        let Some(pixel) = camera.project(p) else {
            bail!("stage point {p} does not project into the image");
        };
        points.push(Correspondence::new(*p, pixel));
    }
    TestPattern::new(points)
}
