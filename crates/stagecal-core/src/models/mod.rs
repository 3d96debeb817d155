//! Camera model components: intrinsics, lens distortion, and the ground-truth
//! stage camera used by synthetic data generation.

pub mod camera;
pub mod distortion;
pub mod intrinsics;
