//! Linear (closed-form) estimation stages: DLT homographies, planar pose
//! decomposition, and the bootstrap that seeds the nonlinear fit with
//! independent per-pattern poses.

pub mod bootstrap;
pub mod homography;
pub mod planar_pose;

pub use bootstrap::{bootstrap_poses, seed_intrinsics, BootstrapError};
pub use homography::{dlt_homography, HomographyError};
pub use planar_pose::{pose_from_homography, PatternPose};
