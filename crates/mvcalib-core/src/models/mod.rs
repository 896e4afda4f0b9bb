//! Camera model building blocks.
//!
//! A world point reaches the image through four stages:
//!
//! 1. rigid transform into the camera frame ([`crate::Rigid`]),
//! 2. perspective normalization ([`normalize`]),
//! 3. lens distortion ([`DistortionKind`]),
//! 4. pinhole intrinsics ([`IntrinsicsKind`]).
//!
//! Every stage has a generic `apply` over [`nalgebra::RealField`] so the
//! optimizer can push dual numbers through the same code that the f64 camera
//! model uses.

mod camera;
mod distortion;
mod intrinsics;

pub use camera::*;
pub use distortion::*;
pub use intrinsics::*;
