//! Core math types and the data model for stage-camera calibration.
//!
//! This crate provides:
//! - fixed-size linear-algebra type aliases over `nalgebra`,
//! - rotation utilities (Rodrigues forward/inverse, analytic derivative,
//!   chordal rotation averaging),
//! - the pinhole intrinsics and 5-parameter Brown-Conrady distortion models,
//! - the observation data model ([`Correspondence`], [`TestPattern`]),
//! - synthetic data helpers for tests and examples.

pub mod math;
pub mod models;
pub mod pattern;
pub mod synthetic;

pub use math::{
    from_homogeneous, rotation, skew, to_homogeneous, Mat3, Pt2, Pt3, Real, Vec2, Vec3,
};
pub use models::camera::StageCamera;
pub use models::distortion::BrownConrady5;
pub use models::intrinsics::Intrinsics;
pub use pattern::{Correspondence, ImageSize, TestPattern};
