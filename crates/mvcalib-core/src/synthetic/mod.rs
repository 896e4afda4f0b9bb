//! Deterministic synthetic calibration data.
//!
//! Used by tests and demos to render exact board observations for known
//! cameras and poses:
//! - planar board layouts and well-conditioned board poses ([`planar`]),
//! - stable pseudo-random pixel noise ([`noise`]).
//!
//! # Example
//!
//! ```
//! use mvcalib_core::{synthetic::planar, BoardGeometry, CameraModel, Distortion, Intrinsics};
//!
//! let board = BoardGeometry::checker(7, 5, 0.03).unwrap();
//! let cam = CameraModel::new(
//!     Intrinsics::SingleFocal { f: 800.0, cx: 319.5, cy: 239.5 },
//!     Distortion::None,
//! );
//! let poses = planar::poses_around_board(&board, 6, 0.6, 0.35);
//! let views: Vec<_> = poses
//!     .iter()
//!     .map(|pose| planar::project_board(&cam, pose, &board))
//!     .collect();
//! assert_eq!(views.len(), 6);
//! ```

pub mod noise;
pub mod planar;
