//! Narrow interfaces to the image-side collaborators.

use mvcalib_core::{CalibImage, Pt2, Real};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// Locates the four board fiducials in a grayscale image.
///
/// Undetected fiducials are returned as NaN points. Any
/// `Fn(&DMatrix<f64>) -> [Pt2; 4]` closure is a detector.
pub trait FiducialDetector {
    fn detect(&self, gray: &DMatrix<Real>) -> [Pt2; 4];
}

impl<F> FiducialDetector for F
where
    F: Fn(&DMatrix<Real>) -> [Pt2; 4],
{
    fn detect(&self, gray: &DMatrix<Real>) -> [Pt2; 4] {
        self(gray)
    }
}

/// Shape of the control points a refiner localizes.
///
/// The kind is only a tag reported by external refiners; this crate ships no
/// refiner of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlPointKind {
    /// Checker corners. The only kind the calibration entry points accept.
    Checker,
    /// Ellipse (circle-grid) centers. Calibration rejects refiners of this
    /// kind with `CalibError::UnsupportedRefiner`, since the board geometry
    /// treats control points as corners.
    Ellipse,
}

/// Sub-pixel control-point refinement.
pub trait Refiner {
    fn kind(&self) -> ControlPointKind;

    /// Refine `points` (one per boundary polygon, all in pixels). The output
    /// has the same length; failed points are NaN.
    fn refine(&self, gray: &DMatrix<Real>, points: &[Pt2], boundaries: &[Vec<Pt2>]) -> Vec<Pt2>;
}

/// An image together with the camera that took it and the board placement
/// it shows.
#[derive(Debug, Clone)]
pub struct TaggedImage<I> {
    pub image: I,
    pub camera: usize,
    pub placement: usize,
}

impl<I: CalibImage> TaggedImage<I> {
    pub fn new(image: I, camera: usize, placement: usize) -> Self {
        Self {
            image,
            camera,
            placement,
        }
    }
}
