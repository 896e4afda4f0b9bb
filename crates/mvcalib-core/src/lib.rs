//! Core math and geometry primitives for `mvcalib`.
//!
//! This crate contains:
//! - linear algebra type aliases (`Real`, `Vec2`, `Pt3`, ...) and undefined-value sentinels,
//! - planar geometry primitives (point transforms, bounding boxes, lines),
//! - rigid transforms with a differentiable axis-angle parametrization,
//! - the camera pipeline (normalize, distortion strategy, pinhole intrinsics),
//! - the image and calibration-board abstractions consumed by the pipelines,
//! - reprojection statistics and synthetic data helpers.
//!
//! Camera pipeline:
//! `pixel = K ∘ distortion ∘ normalize ∘ rigid(world)`

/// Calibration board layout.
pub mod board;
/// Planar geometry primitives.
pub mod geometry;
/// Grayscale image abstraction.
pub mod image;
pub mod logger;
/// Linear algebra type aliases and helpers.
pub mod math;
/// Camera models and distortion strategies.
pub mod models;
/// Rigid transforms.
pub mod rigid;
pub mod synthetic;
mod types;

pub use board::*;
pub use geometry::*;
pub use image::*;
pub use math::*;
pub use models::*;
pub use rigid::*;
pub use types::observation::*;
