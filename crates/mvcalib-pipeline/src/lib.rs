//! Calibration pipelines built on top of `mvcalib-core`, `mvcalib-linear`
//! and `mvcalib-optim`.
//!
//! Two entry points per workflow:
//!
//! - image level: [`single_calib`] / [`multi_calib`] run fiducial detection
//!   and control-point refinement through the [`FiducialDetector`] and
//!   [`Refiner`] interfaces first;
//! - points level: [`calibrate_single`] / [`calibrate_multi`] start from
//!   already refined control points.
//!
//! Multi-camera calibration calibrates each camera on its own, fuses the
//! per-camera board poses through a [`PoseGraph`] into the frame of the
//! reference camera, and refines everything jointly.

mod config;
mod detect;
mod error;
pub mod graph;
mod multi;
pub mod refine;
mod single;
mod types;

pub use config::CalibConfig;
pub use detect::{ControlPointKind, FiducialDetector, Refiner, TaggedImage};
pub use error::CalibError;
pub use graph::{Edge, FusedPoses, Node, PoseGraph};
pub use multi::{calibrate_multi, multi_calib};
pub use refine::CheckerRefiner;
pub use single::{calibrate_single, refine_control_points, single_calib};
pub use types::{ImageObservation, ImageResult, MultiCalibration, SingleCalibration};
