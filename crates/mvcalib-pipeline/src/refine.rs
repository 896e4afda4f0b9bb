//! Gradient-based sub-pixel refinement of checkerboard corners.
//!
//! At a saddle corner `p`, every image gradient `g` sampled at a nearby
//! pixel `q` is orthogonal to `q - p`. The refiner solves the weighted
//! least squares
//!
//! ```text
//! Σ w g gᵀ p = Σ w g gᵀ q
//! ```
//!
//! over a square window around the current estimate, with Gaussian weights
//! centred on the estimate, and iterates until the step is small.

use crate::detect::{ControlPointKind, Refiner};
use mvcalib_core::{distance_to_polygon_lines, is_defined_pt2, nan_pt2, BoundingBox, Pt2, Real};
use nalgebra::{DMatrix, Matrix2, Vector2};
use serde::{Deserialize, Serialize};

/// Checkerboard corner refiner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckerRefiner {
    /// Smallest window half-width in pixels.
    pub hw_min: usize,
    /// Largest window half-width in pixels.
    pub hw_max: usize,
    pub max_iterations: usize,
    /// Stop when a step moves the point less than this many pixels.
    pub tolerance: Real,
}

impl Default for CheckerRefiner {
    fn default() -> Self {
        Self {
            hw_min: 5,
            hw_max: 15,
            max_iterations: 20,
            tolerance: 1e-3,
        }
    }
}

impl CheckerRefiner {
    /// Window half-width for a point inside `boundary`: `floor(d_min / √2)`
    /// clamped to `[hw_min, hw_max]`, where `d_min` is the distance to the
    /// nearest boundary edge line.
    pub fn half_width(&self, p: &Pt2, boundary: &[Pt2]) -> Option<usize> {
        let d_min = distance_to_polygon_lines(p, boundary)?;
        if !d_min.is_finite() {
            return None;
        }
        let hw = (d_min / 2.0_f64.sqrt()).floor().max(0.0) as usize;
        Some(hw.clamp(self.hw_min.max(1), self.hw_max.max(self.hw_min.max(1))))
    }

    /// Refine a single corner. Returns NaN when the window leaves the image,
    /// the system is singular, or the result leaves the boundary's bounding box.
    pub fn refine_point(&self, gray: &DMatrix<Real>, p: &Pt2, boundary: &[Pt2]) -> Pt2 {
        if !is_defined_pt2(p) || boundary.iter().any(|b| !is_defined_pt2(b)) {
            return nan_pt2();
        }
        let (Some(hw), Some(bb)) = (self.half_width(p, boundary), BoundingBox::from_points(boundary)) else {
            return nan_pt2();
        };

        let rows = gray.nrows() as i64;
        let cols = gray.ncols() as i64;
        let hw_i = hw as i64;
        let sigma = hw as Real / 2.0;
        let inv_two_sigma2 = 1.0 / (2.0 * sigma * sigma);

        let mut p = *p;
        for _ in 0..self.max_iterations.max(1) {
            let cx = p.x.round() as i64;
            let cy = p.y.round() as i64;
            if cx - hw_i < 0 || cy - hw_i < 0 || cx + hw_i > cols - 1 || cy + hw_i > rows - 1 {
                return nan_pt2();
            }

            let mut a = Matrix2::<Real>::zeros();
            let mut b = Vector2::<Real>::zeros();
            for r in (cy - hw_i)..=(cy + hw_i) {
                for c in (cx - hw_i)..=(cx + hw_i) {
                    let g = sobel(gray, r, c);
                    let dx = c as Real - p.x;
                    let dy = r as Real - p.y;
                    let w = (-(dx * dx + dy * dy) * inv_two_sigma2).exp();
                    // Window-local coordinates keep the 2x2 system well scaled.
                    let q = Vector2::new((c - cx) as Real, (r - cy) as Real);
                    let ggt = g * g.transpose();
                    a += ggt * w;
                    b += ggt * q * w;
                }
            }

            let Some(a_inv) = a.try_inverse() else {
                return nan_pt2();
            };
            let local = a_inv * b;
            let next = Pt2::new(cx as Real + local.x, cy as Real + local.y);
            if !is_defined_pt2(&next) {
                return nan_pt2();
            }
            let step = (next - p).norm();
            p = next;
            if step < self.tolerance {
                break;
            }
        }

        if bb.contains(&p) {
            p
        } else {
            nan_pt2()
        }
    }
}

impl Refiner for CheckerRefiner {
    fn kind(&self) -> ControlPointKind {
        ControlPointKind::Checker
    }

    fn refine(&self, gray: &DMatrix<Real>, points: &[Pt2], boundaries: &[Vec<Pt2>]) -> Vec<Pt2> {
        points
            .iter()
            .zip(boundaries)
            .map(|(p, b)| self.refine_point(gray, p, b))
            .collect()
    }
}

/// Sobel gradient `(d/dx, d/dy)` at `(row, col)` with edge padding.
fn sobel(gray: &DMatrix<Real>, row: i64, col: i64) -> Vector2<Real> {
    let at = |r: i64, c: i64| {
        let r = r.clamp(0, gray.nrows() as i64 - 1) as usize;
        let c = c.clamp(0, gray.ncols() as i64 - 1) as usize;
        gray[(r, c)]
    };
    let gx = 0.125 * (at(row - 1, col + 1) - at(row - 1, col - 1))
        + 0.25 * (at(row, col + 1) - at(row, col - 1))
        + 0.125 * (at(row + 1, col + 1) - at(row + 1, col - 1));
    let gy = 0.125 * (at(row + 1, col - 1) - at(row - 1, col - 1))
        + 0.25 * (at(row + 1, col) - at(row - 1, col))
        + 0.125 * (at(row + 1, col + 1) - at(row - 1, col + 1));
    Vector2::new(gx, gy)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Smooth saddle centred at `corner`, rotated by `angle`.
    fn saddle_image(rows: usize, cols: usize, corner: Pt2, angle: Real) -> DMatrix<Real> {
        let (s, c) = angle.sin_cos();
        DMatrix::from_fn(rows, cols, |r, col| {
            let dx = col as Real - corner.x;
            let dy = r as Real - corner.y;
            let u = c * dx + s * dy;
            let v = -s * dx + c * dy;
            0.5 + 0.5 * (u / 1.5).tanh() * (v / 1.5).tanh()
        })
    }

    fn square(center: Pt2, half: Real) -> Vec<Pt2> {
        vec![
            Pt2::new(center.x - half, center.y - half),
            Pt2::new(center.x + half, center.y - half),
            Pt2::new(center.x + half, center.y + half),
            Pt2::new(center.x - half, center.y + half),
        ]
    }

    #[test]
    fn half_width_follows_boundary_distance() {
        let refiner = CheckerRefiner {
            hw_min: 2,
            hw_max: 6,
            ..CheckerRefiner::default()
        };
        let center = Pt2::new(20.0, 20.0);
        assert_eq!(refiner.half_width(&center, &square(center, 5.0)), Some(3));
        assert_eq!(refiner.half_width(&center, &square(center, 50.0)), Some(6));
        assert_eq!(refiner.half_width(&center, &square(center, 1.0)), Some(2));
    }

    #[test]
    fn refines_rotated_saddle_to_subpixel() {
        let corner = Pt2::new(24.3, 19.6);
        let gray = saddle_image(40, 48, corner, 0.3);
        let refiner = CheckerRefiner {
            hw_min: 2,
            hw_max: 8,
            ..CheckerRefiner::default()
        };
        let start = Pt2::new(25.5, 18.4);
        let out = refiner.refine(&gray, &[start], &[square(corner, 9.0)]);
        assert_eq!(out.len(), 1);
        let err = (out[0] - corner).norm();
        assert!(err < 0.1, "corner error too large: {err} ({:?})", out[0]);
    }

    #[test]
    fn window_outside_image_gives_nan() {
        let corner = Pt2::new(3.0, 3.0);
        let gray = saddle_image(30, 30, corner, 0.0);
        let refiner = CheckerRefiner::default();
        let p = refiner.refine_point(&gray, &corner, &square(corner, 20.0));
        assert!(!is_defined_pt2(&p));
    }

    #[test]
    fn result_outside_boundary_box_gives_nan() {
        let corner = Pt2::new(20.0, 20.0);
        let gray = saddle_image(40, 40, corner, 0.0);
        let refiner = CheckerRefiner {
            hw_min: 4,
            hw_max: 4,
            ..CheckerRefiner::default()
        };
        // The boundary sits to the right of the true corner.
        let boundary = vec![
            Pt2::new(21.0, 14.0),
            Pt2::new(30.0, 14.0),
            Pt2::new(30.0, 26.0),
            Pt2::new(21.0, 26.0),
        ];
        let p = refiner.refine_point(&gray, &Pt2::new(22.0, 20.0), &boundary);
        assert!(!is_defined_pt2(&p));
    }

    #[test]
    fn flat_image_is_singular() {
        let gray = DMatrix::from_element(30, 30, 0.5);
        let p = Pt2::new(15.0, 15.0);
        let out = CheckerRefiner::default().refine_point(&gray, &p, &square(p, 10.0));
        assert!(!is_defined_pt2(&out));
    }
}
