//! Planar geometry primitives.
//!
//! Point-set transforms through 3x3 matrices, axis-aligned bounding boxes and
//! implicit 2D lines. Everything here is pure math without state.

use crate::{from_homogeneous, to_homogeneous, Mat3, Pt2, Real, Vec3};
use serde::{Deserialize, Serialize};

/// Apply a 3x3 projective (or affine) transform to each point.
///
/// Points are augmented with a unit coordinate, multiplied and normalized by
/// the resulting last coordinate. Undefined inputs stay undefined.
pub fn transform_points(m: &Mat3, points: &[Pt2]) -> Vec<Pt2> {
    points
        .iter()
        .map(|p| from_homogeneous(&(m * to_homogeneous(p))))
        .collect()
}

/// Scale each vector to unit length.
pub fn unitize(v: &Vec3) -> Vec3 {
    v / v.norm()
}

/// Axis-aligned bounding box with inclusive corners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Pt2,
    pub max: Pt2,
}

impl BoundingBox {
    pub fn new(min: Pt2, max: Pt2) -> Self {
        Self { min, max }
    }

    /// Tightest box around the points. `None` for an empty set.
    pub fn from_points(points: &[Pt2]) -> Option<Self> {
        let first = points.first()?;
        let mut min = *first;
        let mut max = *first;
        for p in &points[1..] {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }
        Some(Self { min, max })
    }

    /// Pixel-index box of an array with `rows x cols` entries.
    pub fn of_array(rows: usize, cols: usize) -> Self {
        Self {
            min: Pt2::new(0.0, 0.0),
            max: Pt2::new(cols as Real - 1.0, rows as Real - 1.0),
        }
    }

    pub fn contains(&self, p: &Pt2) -> bool {
        p.x >= self.min.x && p.y >= self.min.y && p.x <= self.max.x && p.y <= self.max.y
    }

    pub fn contains_box(&self, other: &BoundingBox) -> bool {
        self.contains(&other.min) && self.contains(&other.max)
    }

    pub fn width(&self) -> Real {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> Real {
        self.max.y - self.min.y
    }
}

/// Implicit line `a x + b y + c = 0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Line2 {
    pub a: Real,
    pub b: Real,
    pub c: Real,
}

impl Line2 {
    /// Line through `p` with slope `m`; a non-finite slope gives a vertical line.
    pub fn from_point_slope(p: &Pt2, m: Real) -> Self {
        if m.is_finite() {
            Self {
                a: m,
                b: -1.0,
                c: p.y - m * p.x,
            }
        } else {
            Self {
                a: 1.0,
                b: 0.0,
                c: -p.x,
            }
        }
    }

    pub fn through(p1: &Pt2, p2: &Pt2) -> Self {
        let m = (p2.y - p1.y) / (p2.x - p1.x);
        Self::from_point_slope(p1, m)
    }

    /// Unsigned distance from `p` to the line.
    pub fn distance(&self, p: &Pt2) -> Real {
        (self.a * p.x + self.b * p.y + self.c).abs() / (self.a * self.a + self.b * self.b).sqrt()
    }
}

/// Smallest distance from `p` to the edges (as infinite lines) of a closed polygon.
pub fn distance_to_polygon_lines(p: &Pt2, polygon: &[Pt2]) -> Option<Real> {
    if polygon.len() < 2 {
        return None;
    }
    (0..polygon.len())
        .map(|i| Line2::through(&polygon[i], &polygon[(i + 1) % polygon.len()]).distance(p))
        .reduce(Real::min)
}
