//! Calibration board geometry in board coordinates.

use crate::{Pt2, Pt3, Real};
use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

/// Fixed 2D layout of a planar calibration board.
///
/// `boundaries[i]` is the closed polygon that the `i`-th control point must
/// stay inside during refinement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardGeometry {
    /// Four fiducial markers used to seed the first homography.
    pub fiducials: [Pt2; 4],
    pub control_points: Vec<Pt2>,
    pub boundaries: Vec<Vec<Pt2>>,
}

impl BoardGeometry {
    pub fn new(fiducials: [Pt2; 4], control_points: Vec<Pt2>, boundaries: Vec<Vec<Pt2>>) -> Result<Self> {
        ensure!(
            control_points.len() == boundaries.len(),
            "need one boundary per control point: {} points, {} boundaries",
            control_points.len(),
            boundaries.len()
        );
        ensure!(
            control_points.len() >= 4,
            "need at least 4 control points, got {}",
            control_points.len()
        );
        Ok(Self {
            fiducials,
            control_points,
            boundaries,
        })
    }

    /// Checkerboard with `cols x rows` inner corners spaced `spacing` apart.
    ///
    /// Corners are ordered row-major starting at the origin. Each corner's
    /// boundary is the square of side `spacing` centred on it, and the
    /// fiducials sit on the four outermost corners.
    pub fn checker(cols: usize, rows: usize, spacing: Real) -> Result<Self> {
        ensure!(
            cols >= 2 && rows >= 2,
            "checkerboard needs at least 2x2 corners, got {cols}x{rows}"
        );
        ensure!(spacing > 0.0, "spacing must be positive, got {spacing}");

        let half = 0.5 * spacing;
        let mut control_points = Vec::with_capacity(cols * rows);
        let mut boundaries = Vec::with_capacity(cols * rows);
        for j in 0..rows {
            for i in 0..cols {
                let p = Pt2::new(i as Real * spacing, j as Real * spacing);
                boundaries.push(vec![
                    Pt2::new(p.x - half, p.y - half),
                    Pt2::new(p.x + half, p.y - half),
                    Pt2::new(p.x + half, p.y + half),
                    Pt2::new(p.x - half, p.y + half),
                ]);
                control_points.push(p);
            }
        }

        let w = (cols - 1) as Real * spacing;
        let h = (rows - 1) as Real * spacing;
        let fiducials = [
            Pt2::new(0.0, 0.0),
            Pt2::new(w, 0.0),
            Pt2::new(w, h),
            Pt2::new(0.0, h),
        ];
        Self::new(fiducials, control_points, boundaries)
    }

    pub fn num_control_points(&self) -> usize {
        self.control_points.len()
    }

    /// Control points lifted onto the board plane `z = 0`.
    pub fn control_points_3d(&self) -> Vec<Pt3> {
        self.control_points
            .iter()
            .map(|p| Pt3::new(p.x, p.y, 0.0))
            .collect()
    }
}
