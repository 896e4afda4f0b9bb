//! High-level entry crate for the `mvcalib` toolbox.
//!
//! Calibrates one or several cameras from images of a planar board seen at
//! one or more unknown placements. The layers are re-exported as modules:
//!
//! - [`core`]: math types, rigid transforms, camera models, board and image
//!   abstractions, synthetic data.
//! - [`linear`]: closed-form homography, intrinsic and pose initializers.
//! - [`optim`]: differentiable joint reprojection loss and L-BFGS refinement.
//! - [`pipeline`]: single- and multi-camera calibration with pose-graph fusion.
//!
//! ```no_run
//! use mvcalib::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let board = BoardGeometry::checker(9, 6, 0.025)?;
//! let observations: Vec<ImageObservation> = /* refined control points */
//! # vec![];
//!
//! let calib = calibrate_multi(&observations, &board, &CalibConfig::default())?;
//! for (i, cam) in calib.cameras.iter().enumerate() {
//!     println!("camera {i}: {:?}", cam.intrinsics);
//! }
//! println!("rms reprojection error: {:.4} px", calib.stats.rms);
//! # Ok(())
//! # }
//! ```

/// Core math types, geometry, camera models and synthetic data.
pub mod core {
    pub use mvcalib_core::*;
}

/// Closed-form initialization algorithms.
pub mod linear {
    pub use mvcalib_linear::*;
}

/// Joint reprojection loss and its L-BFGS minimization.
pub mod optim {
    pub use mvcalib_optim::*;
}

/// Calibration workflows.
pub mod pipeline {
    pub use mvcalib_pipeline::*;
}

/// Convenient re-exports for common use cases.
///
/// Import with `use mvcalib::prelude::*;` to get started quickly.
pub mod prelude {
    pub use crate::core::{
        ArrayImage, BoardGeometry, CalibImage, CameraModel, Distortion, DistortionKind,
        Intrinsics, IntrinsicsKind, Pt2, Pt3, ReprojectionStats, Rigid, Vec2, Vec3,
    };

    pub use crate::optim::{OptimReport, OptimizerConfig, PointLoss, ReprojectionLoss};

    pub use crate::pipeline::{
        calibrate_multi, calibrate_single, multi_calib, single_calib, CalibConfig, CalibError,
        CheckerRefiner, ControlPointKind, FiducialDetector, ImageObservation, ImageResult,
        MultiCalibration, Refiner, SingleCalibration, TaggedImage,
    };
}
