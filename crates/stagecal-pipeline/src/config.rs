//! Pipeline configuration.

use serde::{Deserialize, Serialize};

use stagecal_core::Real;
use stagecal_optim::{FitFlags, SolveOptions};

/// Settings for a calibration run.
///
/// The two `approx_*` values seed the focal length before any fitting; they
/// come from the machine configuration (rough mounting height and rough
/// pixel pitch at the primary height) and only need to be in the right
/// ballpark.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CalibrationConfig {
    /// Approximate camera height in stage coordinates, millimetres.
    pub approx_camera_z: Real,
    /// Approximate stage millimetres per pixel at the primary height.
    pub approx_mm_per_pixel: Real,
    /// Parameter groups to keep at their seed values.
    pub flags: FitFlags,
    /// Outlier gate in per-axis standard deviations.
    pub outlier_sigma: Real,
    pub solve: SolveOptions,
    /// Valid-pixel trade-off for the virtual camera, 0..=100. 0 crops to
    /// fully valid pixels, 100 keeps every source pixel visible.
    pub alpha_percent: u32,
    /// Center the virtual camera on the physical principal point instead of
    /// the rectified field of view.
    pub keep_principal_point: bool,
}

impl CalibrationConfig {
    pub fn new(approx_camera_z: Real, approx_mm_per_pixel: Real) -> Self {
        Self {
            approx_camera_z,
            approx_mm_per_pixel,
            flags: FitFlags::FIX_PRINCIPAL_POINT,
            outlier_sigma: 2.4103,
            solve: SolveOptions::default(),
            alpha_percent: 100,
            keep_principal_point: true,
        }
    }

    pub fn with_flags(mut self, flags: FitFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_alpha_percent(mut self, alpha_percent: u32) -> Self {
        self.alpha_percent = alpha_percent.min(100);
        self
    }
}
