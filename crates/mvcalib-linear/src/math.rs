//! Shared numerical helpers for the closed-form initializers.
//!
//! - **Hartley conditioning** of 2D point sets before DLT.
//! - **Nearest rotation** projection with an undefined-value sentinel.
//!
//! # Example
//!
//! ```
//! use mvcalib_linear::math::normalize_points_2d;
//! use mvcalib_core::Pt2;
//!
//! let points = vec![
//!     Pt2::new(100.0, 200.0),
//!     Pt2::new(150.0, 250.0),
//!     Pt2::new(120.0, 220.0),
//! ];
//!
//! let (normalized, transform) = normalize_points_2d(&points).unwrap();
//! // normalized points have mean at origin, mean distance = sqrt(2)
//! # let _ = (normalized, transform);
//! ```

use mvcalib_core::{nan_mat3, Mat3, Pt2, Real};

/// Hartley normalization for 2D points.
///
/// Centers points at the origin and scales so that the mean distance from
/// the origin is `√2`.
///
/// Returns the conditioned points and the matrix `T` such that
/// `p_norm = T * p_homogeneous`, or `None` when the set is empty, contains
/// non-finite values, or all points coincide.
///
/// Hartley & Zisserman, "Multiple View Geometry in Computer Vision", 2nd ed.,
/// Algorithm 4.2.
pub fn normalize_points_2d(points: &[Pt2]) -> Option<(Vec<Pt2>, Mat3)> {
    if points.is_empty() || points.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
        return None;
    }

    let n = points.len() as Real;
    let mut cx = 0.0;
    let mut cy = 0.0;
    for p in points {
        cx += p.x;
        cy += p.y;
    }
    cx /= n;
    cy /= n;

    let mut mean_dist = 0.0;
    for p in points {
        let dx = p.x - cx;
        let dy = p.y - cy;
        mean_dist += (dx * dx + dy * dy).sqrt();
    }
    mean_dist /= n;

    if mean_dist <= Real::EPSILON {
        return None;
    }

    let scale = (2.0_f64).sqrt() / mean_dist;
    let t = Mat3::new(
        scale,
        0.0,
        -scale * cx,
        0.0,
        scale,
        -scale * cy,
        0.0,
        0.0,
        1.0,
    );

    let norm = points
        .iter()
        .map(|p| Pt2::new((p.x - cx) * scale, (p.y - cy) * scale))
        .collect();

    Some((norm, t))
}

/// Closest proper rotation `U Vᵀ` to `m`.
///
/// When `m` is not finite, or the projection is not a proper rotation
/// (`|det - 1| > 1e-8 + 1e-5`), the undefined sentinel is returned instead.
pub fn nearest_rotation(m: &Mat3) -> Mat3 {
    if m.iter().any(|v| !v.is_finite()) {
        return nan_mat3();
    }
    let svd = m.svd(true, true);
    let (Some(u), Some(v_t)) = (svd.u, svd.v_t) else {
        return nan_mat3();
    };
    let r = u * v_t;
    if (r.determinant() - 1.0).abs() > 1e-8 + 1e-5 {
        return nan_mat3();
    }
    r
}
