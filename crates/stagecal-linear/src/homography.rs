//! Direct linear transform homography estimation.

use nalgebra::DMatrix;
use thiserror::Error;

use stagecal_core::{Mat3, Pt2, Real};

#[derive(Debug, Error)]
pub enum HomographyError {
    #[error("point count mismatch: {src} source vs {dst} destination points")]
    CountMismatch { src: usize, dst: usize },
    #[error("homography needs at least 4 point pairs, got {0}")]
    TooFewPoints(usize),
    #[error("degenerate point configuration (coincident or collinear points)")]
    Degenerate,
}

/// Estimate the homography mapping `src` points to `dst` points.
///
/// Standard DLT with Hartley isotropic normalization: both point sets are
/// translated to their centroid and scaled to mean distance sqrt(2) before
/// building the design matrix, which keeps the system well conditioned for
/// pixel-scale inputs.
pub fn dlt_homography(src: &[Pt2], dst: &[Pt2]) -> Result<Mat3, HomographyError> {
    if src.len() != dst.len() {
        return Err(HomographyError::CountMismatch {
            src: src.len(),
            dst: dst.len(),
        });
    }
    if src.len() < 4 {
        return Err(HomographyError::TooFewPoints(src.len()));
    }

    let t_src = normalizing_transform(src)?;
    let t_dst = normalizing_transform(dst)?;

    let mut a = DMatrix::<Real>::zeros(2 * src.len(), 9);
    for (i, (s, d)) in src.iter().zip(dst.iter()).enumerate() {
        let (x, y) = apply(&t_src, s);
        let (u, v) = apply(&t_dst, d);
        let r = 2 * i;
        a[(r, 0)] = -x;
        a[(r, 1)] = -y;
        a[(r, 2)] = -1.0;
        a[(r, 6)] = u * x;
        a[(r, 7)] = u * y;
        a[(r, 8)] = u;
        a[(r + 1, 3)] = -x;
        a[(r + 1, 4)] = -y;
        a[(r + 1, 5)] = -1.0;
        a[(r + 1, 6)] = v * x;
        a[(r + 1, 7)] = v * y;
        a[(r + 1, 8)] = v;
    }

    // Null vector of A via the 9x9 normal matrix, so the minimal 4-point
    // case is handled the same way as the overdetermined one.
    let ata = a.transpose() * &a;
    let svd = ata.svd(false, true);
    let v_t = svd.v_t.as_ref().ok_or(HomographyError::Degenerate)?;
    let h = v_t.row(v_t.nrows() - 1);

    let h_norm = Mat3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], h[8]);
    let t_dst_inv = t_dst.try_inverse().ok_or(HomographyError::Degenerate)?;
    let mut hmtx = t_dst_inv * h_norm * t_src;

    let scale = hmtx[(2, 2)];
    if scale.abs() < 1e-12 {
        return Err(HomographyError::Degenerate);
    }
    hmtx /= scale;
    Ok(hmtx)
}

fn apply(t: &Mat3, p: &Pt2) -> (Real, Real) {
    (
        t[(0, 0)] * p.x + t[(0, 2)],
        t[(1, 1)] * p.y + t[(1, 2)],
    )
}

fn normalizing_transform(pts: &[Pt2]) -> Result<Mat3, HomographyError> {
    let n = pts.len() as Real;
    let cx = pts.iter().map(|p| p.x).sum::<Real>() / n;
    let cy = pts.iter().map(|p| p.y).sum::<Real>() / n;
    let mean_dist = pts
        .iter()
        .map(|p| ((p.x - cx).powi(2) + (p.y - cy).powi(2)).sqrt())
        .sum::<Real>()
        / n;
    if mean_dist < 1e-12 {
        return Err(HomographyError::Degenerate);
    }
    let s = std::f64::consts::SQRT_2 / mean_dist;
    Ok(Mat3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagecal_core::{from_homogeneous, to_homogeneous};

    fn map(h: &Mat3, p: &Pt2) -> Pt2 {
        from_homogeneous(&(h * to_homogeneous(p))).unwrap()
    }

    #[test]
    fn recovers_known_projective_map() {
        let h_gt = Mat3::new(1.2, 0.1, 30.0, -0.05, 0.9, -12.0, 1e-4, -2e-4, 1.0);
        let src: Vec<Pt2> = [
            (0.0, 0.0),
            (100.0, 0.0),
            (100.0, 80.0),
            (0.0, 80.0),
            (50.0, 40.0),
            (25.0, 60.0),
        ]
        .iter()
        .map(|&(x, y)| Pt2::new(x, y))
        .collect();
        let dst: Vec<Pt2> = src.iter().map(|p| map(&h_gt, p)).collect();

        let h = dlt_homography(&src, &dst).unwrap();
        for (s, d) in src.iter().zip(dst.iter()) {
            assert!((map(&h, s) - d).norm() < 1e-8);
        }
    }

    #[test]
    fn minimal_four_point_case() {
        let src = vec![
            Pt2::new(0.0, 0.0),
            Pt2::new(1.0, 0.0),
            Pt2::new(1.0, 1.0),
            Pt2::new(0.0, 1.0),
        ];
        let dst = vec![
            Pt2::new(10.0, 10.0),
            Pt2::new(30.0, 12.0),
            Pt2::new(28.0, 35.0),
            Pt2::new(8.0, 32.0),
        ];
        let h = dlt_homography(&src, &dst).unwrap();
        for (s, d) in src.iter().zip(dst.iter()) {
            assert!((map(&h, s) - d).norm() < 1e-7);
        }
    }

    #[test]
    fn rejects_too_few_points() {
        let pts = vec![Pt2::new(0.0, 0.0), Pt2::new(1.0, 1.0)];
        assert!(matches!(
            dlt_homography(&pts, &pts),
            Err(HomographyError::TooFewPoints(2))
        ));
    }

    #[test]
    fn rejects_coincident_points() {
        let src = vec![Pt2::new(1.0, 1.0); 4];
        let dst = vec![
            Pt2::new(0.0, 0.0),
            Pt2::new(1.0, 0.0),
            Pt2::new(1.0, 1.0),
            Pt2::new(0.0, 1.0),
        ];
        assert!(dlt_homography(&src, &dst).is_err());
    }
}
