//! Closed-form initializers for planar-target calibration.
//!
//! These are the linear building blocks that seed the nonlinear refinement:
//!
//! - [`dlt_homography`]: normalized DLT for a plane-to-image homography.
//! - [`estimate_intrinsics_from_homographies`]: square-pixel focal length
//!   with the principal point at the image center.
//! - [`estimate_planar_pose_from_h`]: board pose from `H` and `K`.
//!
//! Degenerate inputs never panic. They produce values whose entries are NaN,
//! which downstream stages detect with [`mvcalib_core::is_defined_mat3`] and
//! [`mvcalib_core::Rigid::is_defined`].

pub mod math;

mod homography;
mod planar_pose;
mod zhang_intrinsics;

pub use homography::*;
pub use planar_pose::*;
pub use zhang_intrinsics::*;
