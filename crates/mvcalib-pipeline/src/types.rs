//! Inputs and results of the calibration entry points.

use crate::graph::{FusedPoses, PoseGraph};
use mvcalib_core::{CameraModel, Pt2, ReprojectionStats, Rigid};
use mvcalib_optim::OptimReport;
use serde::{Deserialize, Serialize};

/// Refined control points of one image, in board control-point order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageObservation {
    pub name: String,
    pub camera: usize,
    pub placement: usize,
    /// `(height, width)` in pixels.
    pub size: (usize, usize),
    /// NaN where a point was not found.
    pub points: Vec<Pt2>,
}

/// Observed and model-predicted control points of one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageResult {
    pub name: String,
    pub camera: usize,
    pub placement: usize,
    pub observed: Vec<Pt2>,
    /// NaN for every point when the image was left out of the refinement.
    pub reprojected: Vec<Pt2>,
}

/// Result of calibrating one camera.
#[derive(Debug, Clone, Serialize)]
pub struct SingleCalibration {
    pub camera: CameraModel,
    /// Board-to-camera transform per input image, NaN for skipped images.
    pub rigids: Vec<Rigid>,
    pub images: Vec<ImageResult>,
    pub stats: ReprojectionStats,
    pub report: OptimReport,
}

/// Result of the joint calibration of several cameras.
#[derive(Debug, Clone, Serialize)]
pub struct MultiCalibration {
    pub cameras: Vec<CameraModel>,
    /// Camera frame to reference frame.
    pub camera_poses: Vec<Rigid>,
    /// Board placement frame to reference frame.
    pub placement_poses: Vec<Rigid>,
    pub images: Vec<ImageResult>,
    pub graph: PoseGraph,
    /// Poses right after graph fusion, before the joint refinement.
    pub fused: FusedPoses,
    /// Per-camera results that seeded the joint problem.
    pub singles: Vec<SingleCalibration>,
    pub stats: ReprojectionStats,
    pub report: OptimReport,
}
