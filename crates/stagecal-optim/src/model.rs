//! The restricted-DOF stage camera model and its analytic Jacobian.

use std::collections::BTreeSet;

use nalgebra::{DMatrix, DVector, Vector2};

use stagecal_core::rotation::{rodrigues, rodrigues_jacobian};
use stagecal_core::{BrownConrady5, Intrinsics, Mat3, Pt2, Pt3, Real, TestPattern, Vec2, Vec3};

use crate::flags::FitFlags;

// Parameter vector layout: [fx fy cx cy k1 k2 p1 p2 k3 rx ry rz camZ
// camX_0 camY_0 ... camX_{N-1} camY_{N-1}]
pub const IDX_FX: usize = 0;
pub const IDX_FY: usize = 1;
pub const IDX_CX: usize = 2;
pub const IDX_CY: usize = 3;
pub const IDX_DIST: usize = 4;
pub const IDX_ROT: usize = 9;
pub const IDX_CAM_Z: usize = 12;
pub const IDX_CAM_XY: usize = 13;

/// Number of parameters for `n` test patterns.
#[inline]
pub const fn param_count(n_patterns: usize) -> usize {
    IDX_CAM_XY + 2 * n_patterns
}

/// A rotation vector this close to zero is nudged off the Rodrigues
/// singularity before evaluating derivatives.
const ROTATION_NUDGE: Real = 1e-6;

/// Parameter vector unpacked into model terms.
#[derive(Debug, Clone)]
pub struct DecodedParams {
    pub intrinsics: Intrinsics,
    pub distortion: BrownConrady5,
    /// Stage-to-camera rotation vector (nudged off exact zero).
    pub rvec: Vec3,
    pub rotation: Mat3,
    /// Shared camera height, stage coordinates.
    pub cam_z: Real,
    /// Per-pattern camera X/Y, stage coordinates.
    pub cam_xy: Vec<Vec2>,
}

impl DecodedParams {
    /// Camera position associated with pattern `i`.
    #[inline]
    pub fn cam_position(&self, i: usize) -> Vec3 {
        Vec3::new(self.cam_xy[i].x, self.cam_xy[i].y, self.cam_z)
    }
}

/// Reprojection problem over all non-excluded points of all patterns.
///
/// Residual layout is `[du_0, dv_0, du_1, dv_1, ...]` over active points in
/// pattern order. Frozen parameter groups ([`FitFlags`]) keep their columns
/// zero, so the solver leaves them at the seed.
#[derive(Debug, Clone)]
pub struct StageFitProblem {
    stage_points: Vec<Vec<Pt3>>,
    excluded: BTreeSet<usize>,
    flags: FitFlags,
    /// `fy / fx` ratio enforced under `FIX_ASPECT_RATIO`.
    aspect: Real,
}

impl StageFitProblem {
    pub fn new(patterns: &[TestPattern], flags: FitFlags, aspect: Real) -> Self {
        Self {
            stage_points: patterns
                .iter()
                .map(|p| p.iter().map(|c| c.stage).collect())
                .collect(),
            excluded: BTreeSet::new(),
            flags,
            aspect,
        }
    }

    /// Exclude points by global index (counted across all patterns in order).
    pub fn with_excluded(mut self, excluded: BTreeSet<usize>) -> Self {
        self.excluded = excluded;
        self
    }

    #[inline]
    pub fn n_patterns(&self) -> usize {
        self.stage_points.len()
    }

    #[inline]
    pub fn param_count(&self) -> usize {
        param_count(self.n_patterns())
    }

    pub fn total_points(&self) -> usize {
        self.stage_points.iter().map(Vec::len).sum()
    }

    pub fn active_points(&self) -> usize {
        self.total_points() - self.excluded.len()
    }

    #[inline]
    pub fn residual_len(&self) -> usize {
        2 * self.active_points()
    }

    /// Unpack a parameter vector.
    pub fn decode(&self, x: &DVector<Real>) -> DecodedParams {
        let fx = x[IDX_FX];
        let fy = if self.flags.contains(FitFlags::FIX_ASPECT_RATIO) {
            self.aspect * fx
        } else {
            x[IDX_FY]
        };
        let mut rvec = Vec3::new(x[IDX_ROT], x[IDX_ROT + 1], x[IDX_ROT + 2]);
        if rvec.norm() < ROTATION_NUDGE {
            rvec.z = ROTATION_NUDGE;
        }
        DecodedParams {
            intrinsics: Intrinsics::new(fx, fy, x[IDX_CX], x[IDX_CY]),
            distortion: BrownConrady5::new(
                x[IDX_DIST],
                x[IDX_DIST + 1],
                x[IDX_DIST + 2],
                x[IDX_DIST + 3],
                x[IDX_DIST + 4],
            ),
            rvec,
            rotation: rodrigues(&rvec),
            cam_z: x[IDX_CAM_Z],
            cam_xy: (0..self.n_patterns())
                .map(|i| Vec2::new(x[IDX_CAM_XY + 2 * i], x[IDX_CAM_XY + 2 * i + 1]))
                .collect(),
        }
    }

    /// Modeled pixels of the active points, stacked `[u, v, u, v, ...]`.
    pub fn project(&self, x: &DVector<Real>) -> DVector<Real> {
        let d = self.decode(x);
        let mut out = DVector::zeros(self.residual_len());
        let mut row = 0;
        self.for_each_active(|_, _, global| {
            let p = self.point(global);
            let px = project_point(&d, p.0, &p.1);
            out[row] = px.x;
            out[row + 1] = px.y;
            row += 2;
        });
        out
    }

    /// Modeled pixels of every point, including excluded ones, grouped per
    /// pattern. Used to score outliers against the full collection.
    pub fn project_all(&self, x: &DVector<Real>) -> Vec<Vec<Pt2>> {
        let d = self.decode(x);
        self.stage_points
            .iter()
            .enumerate()
            .map(|(i, pts)| pts.iter().map(|p| project_point(&d, i, p)).collect())
            .collect()
    }

    /// Observed pixels of the active points, matching [`Self::project`] row
    /// for row.
    pub fn observed(&self, patterns: &[TestPattern]) -> DVector<Real> {
        let mut out = DVector::zeros(self.residual_len());
        let mut row = 0;
        self.for_each_active(|i, j, _| {
            let px = patterns[i].points()[j].pixel;
            out[row] = px.x;
            out[row + 1] = px.y;
            row += 2;
        });
        out
    }

    /// Analytic Jacobian of [`Self::project`] w.r.t. the parameter vector.
    pub fn jacobian(&self, x: &DVector<Real>) -> DMatrix<Real> {
        let d = self.decode(x);
        let drot = rodrigues_jacobian(&d.rvec);
        let fx = d.intrinsics.fx;
        let fy = d.intrinsics.fy;
        let fix_aspect = self.flags.contains(FitFlags::FIX_ASPECT_RATIO);
        let fix_pp = self.flags.contains(FitFlags::FIX_PRINCIPAL_POINT);
        let fix_dist = self.flags.contains(FitFlags::FIX_DISTORTION);
        let fix_rot = self.flags.contains(FitFlags::FIX_ROTATION);

        let mut jac = DMatrix::zeros(self.residual_len(), self.param_count());
        let mut row = 0;
        self.for_each_active(|i, _, global| {
            let p = self.point(global).1;
            let delta = p.coords - d.cam_position(i);
            let pc = d.rotation * delta;
            let inv_z = 1.0 / pc.z;
            let n = Vec2::new(pc.x * inv_z, pc.y * inv_z);
            let nd = d.distortion.distort(&n);
            let jd = d.distortion.point_jacobian(&n);

            // focal lengths
            jac[(row, IDX_FX)] = nd.x;
            if fix_aspect {
                jac[(row + 1, IDX_FX)] = self.aspect * nd.y;
            } else {
                jac[(row + 1, IDX_FY)] = nd.y;
            }
            // principal point
            if !fix_pp {
                jac[(row, IDX_CX)] = 1.0;
                jac[(row + 1, IDX_CY)] = 1.0;
            }
            // distortion coefficients
            if !fix_dist {
                let cj = d.distortion.coeff_jacobian(&n);
                for m in 0..5 {
                    jac[(row, IDX_DIST + m)] = fx * cj[(0, m)];
                    jac[(row + 1, IDX_DIST + m)] = fy * cj[(1, m)];
                }
            }
            // normalized-point derivative for a camera-point derivative dpc
            let chain = |dpc: Vec3| -> Vec2 {
                let dn = Vec2::new(
                    (dpc.x - n.x * dpc.z) * inv_z,
                    (dpc.y - n.y * dpc.z) * inv_z,
                );
                jd * dn
            };
            let mut set = |col: usize, dnd: Vec2| {
                jac[(row, col)] = fx * dnd.x;
                jac[(row + 1, col)] = fy * dnd.y;
            };

            // rotation vector
            if !fix_rot {
                for (k, dr) in drot.iter().enumerate() {
                    set(IDX_ROT + k, chain(dr * delta));
                }
            }
            // camera position: d(pc)/d(t) = -R, column per axis
            set(IDX_CAM_Z, chain(-d.rotation.column(2).into_owned()));
            set(IDX_CAM_XY + 2 * i, chain(-d.rotation.column(0).into_owned()));
            set(
                IDX_CAM_XY + 2 * i + 1,
                chain(-d.rotation.column(1).into_owned()),
            );
            drop(set);

            row += 2;
        });
        jac
    }

    fn for_each_active(&self, mut f: impl FnMut(usize, usize, usize)) {
        let mut global = 0;
        for (i, pts) in self.stage_points.iter().enumerate() {
            for j in 0..pts.len() {
                if !self.excluded.contains(&global) {
                    f(i, j, global);
                }
                global += 1;
            }
        }
    }

    /// Pattern index and stage point at a global index.
    fn point(&self, global: usize) -> (usize, Pt3) {
        let mut rest = global;
        for (i, pts) in self.stage_points.iter().enumerate() {
            if rest < pts.len() {
                return (i, pts[rest]);
            }
            rest -= pts.len();
        }
        unreachable!("global point index out of range")
    }
}

fn project_point(d: &DecodedParams, pattern: usize, p: &Pt3) -> Pt2 {
    let pc = d.rotation * (p.coords - d.cam_position(pattern));
    let n = Vector2::new(pc.x / pc.z, pc.y / pc.z);
    d.intrinsics.normalized_to_pixel(&d.distortion.distort(&n))
}
