//! Observation-side helpers shared by the pipelines.

use crate::{is_defined_pt2, Pt2};
use serde::{Deserialize, Serialize};

/// Reprojection error statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ReprojectionStats {
    /// Mean reprojection error in pixels.
    pub mean: f64,
    /// Root mean square error in pixels.
    pub rms: f64,
    /// Maximum reprojection error in pixels.
    pub max: f64,
    /// Number of points evaluated.
    pub count: usize,
}

impl ReprojectionStats {
    /// Compute statistics from a collection of errors.
    pub fn from_errors(errors: &[f64]) -> Self {
        if errors.is_empty() {
            return Self::default();
        }

        let sum: f64 = errors.iter().sum();
        let sum_sq: f64 = errors.iter().map(|e| e * e).sum();
        let max = errors.iter().cloned().fold(0.0_f64, f64::max);
        let n = errors.len() as f64;

        Self {
            mean: sum / n,
            rms: (sum_sq / n).sqrt(),
            max,
            count: errors.len(),
        }
    }

    /// Statistics over every pair where both points are defined.
    pub fn from_points(observed: &[Pt2], predicted: &[Pt2]) -> Self {
        Self::from_errors(&reprojection_errors(observed, predicted))
    }
}

/// Pixel distances between observed and predicted points, skipping undefined pairs.
pub fn reprojection_errors(observed: &[Pt2], predicted: &[Pt2]) -> Vec<f64> {
    debug_assert_eq!(observed.len(), predicted.len());
    observed
        .iter()
        .zip(predicted)
        .filter(|(o, p)| is_defined_pt2(o) && is_defined_pt2(p))
        .map(|(o, p)| (o - p).norm())
        .collect()
}
