use crate::graph::Node;
use mvcalib_optim::ParamError;
use thiserror::Error;

/// Structural failures that abort a calibration run.
///
/// Per-image and per-point failures never surface here; they are carried as
/// NaN values in the results instead.
#[derive(Debug, Error)]
pub enum CalibError {
    #[error("no images to calibrate")]
    NoImages,
    #[error("{what} indices must be dense and zero-based, got {indices:?}")]
    NonDenseIndices {
        what: &'static str,
        indices: Vec<usize>,
    },
    #[error("{node:?} is not reachable from reference camera {reference}")]
    DisconnectedGraph { node: Node, reference: usize },
    #[error("reference camera {reference} out of range ({num_cameras} cameras)")]
    ReferenceOutOfRange { reference: usize, num_cameras: usize },
    #[error("unsupported refiner: {0}")]
    UnsupportedRefiner(String),
    #[error("image {image} has {actual} control points, board has {expected}")]
    PointCount {
        image: String,
        expected: usize,
        actual: usize,
    },
    #[error("camera {camera}: intrinsic initialisation is undefined (are all views fronto-parallel?)")]
    DegenerateIntrinsics { camera: usize },
    #[error("camera {camera}: no image yields a defined homography and pose")]
    NoUsableImages { camera: usize },
    #[error("{kind} {index} out of range (count {count})")]
    NodeOutOfRange {
        kind: &'static str,
        index: usize,
        count: usize,
    },
    #[error(transparent)]
    Param(#[from] ParamError),
}
