//! Observation data model: stage/pixel correspondences grouped by
//! calibration height.

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

use crate::math::{Pt2, Pt3, Real};

/// A single stage-point / pixel observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Correspondence {
    /// Stage coordinates of the observed feature, millimetres.
    pub stage: Pt3,
    /// Observed pixel location.
    pub pixel: Pt2,
}

impl Correspondence {
    pub fn new(stage: Pt3, pixel: Pt2) -> Self {
        Self { stage, pixel }
    }
}

/// All correspondences collected at one calibration height.
///
/// Every stage point in a pattern shares the same Z; the calibration model
/// relies on patterns being horizontal planes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestPattern {
    points: Vec<Correspondence>,
}

/// Tolerance for the shared-Z invariant, millimetres.
const Z_TOLERANCE: Real = 1e-6;

impl TestPattern {
    /// Construct a pattern, checking the shared-height invariant.
    ///
    /// # Errors
    ///
    /// Fails on an empty point set or when stage Z values differ by more
    /// than a micrometre.
    pub fn new(points: Vec<Correspondence>) -> Result<Self> {
        ensure!(
            !points.is_empty(),
            "a test pattern needs at least one correspondence"
        );
        let z0 = points[0].stage.z;
        ensure!(
            points.iter().all(|c| (c.stage.z - z0).abs() <= Z_TOLERANCE),
            "all stage points of a test pattern must share one Z (height {z0})"
        );
        Ok(Self { points })
    }

    /// The calibration height this pattern was collected at.
    #[inline]
    pub fn z(&self) -> Real {
        self.points[0].stage.z
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[inline]
    pub fn points(&self) -> &[Correspondence] {
        &self.points
    }

    pub fn iter(&self) -> impl Iterator<Item = &Correspondence> {
        self.points.iter()
    }

    /// Stage points with Z flattened to zero, for planar homography fits.
    pub fn planar_stage_points(&self) -> Vec<Pt2> {
        self.points
            .iter()
            .map(|c| Pt2::new(c.stage.x, c.stage.y))
            .collect()
    }

    /// Observed pixels in pattern order.
    pub fn pixels(&self) -> Vec<Pt2> {
        self.points.iter().map(|c| c.pixel).collect()
    }
}

/// Sensor dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Geometric image center `((w-1)/2, (h-1)/2)`, the default principal
    /// point seed.
    pub fn center(&self) -> Pt2 {
        Pt2::new(
            (self.width as Real - 1.0) / 2.0,
            (self.height as Real - 1.0) / 2.0,
        )
    }
}
