use crate::math::normalize_points_2d;
use mvcalib_core::{nan_mat3, Mat3, Pt2};
use nalgebra::DMatrix;

/// Estimate `H` such that `dst ~ H src` using the normalized DLT.
///
/// Both point sets are conditioned independently, the `2n x 9` homogeneous
/// system is solved by SVD (right-singular vector of the smallest singular
/// value), the conditioning is undone and the result is scaled so that
/// `H[(2, 2)] == 1`.
///
/// Degenerate input yields the undefined sentinel (all entries NaN): fewer
/// than 4 correspondences, mismatched lengths, non-finite points, coincident
/// points, or a vanishing `H[(2, 2)]`. Collinear but distinct points produce
/// a numerically unreliable matrix that callers must screen themselves.
pub fn dlt_homography(src: &[Pt2], dst: &[Pt2]) -> Mat3 {
    let n = src.len();
    if n < 4 || dst.len() != n {
        return nan_mat3();
    }
    let (Some((src_n, t_src)), Some((dst_n, t_dst))) =
        (normalize_points_2d(src), normalize_points_2d(dst))
    else {
        return nan_mat3();
    };

    // Zero rows pad the system so V^T is always 9x9.
    let rows = (2 * n).max(9);
    let mut a = DMatrix::<f64>::zeros(rows, 9);
    for (i, (ps, pd)) in src_n.iter().zip(dst_n.iter()).enumerate() {
        let (x, y) = (ps.x, ps.y);
        let (u, v) = (pd.x, pd.y);

        let r0 = 2 * i;
        let r1 = 2 * i + 1;

        a[(r0, 0)] = x;
        a[(r0, 1)] = y;
        a[(r0, 2)] = 1.0;
        a[(r0, 6)] = -u * x;
        a[(r0, 7)] = -u * y;
        a[(r0, 8)] = -u;

        a[(r1, 3)] = x;
        a[(r1, 4)] = y;
        a[(r1, 5)] = 1.0;
        a[(r1, 6)] = -v * x;
        a[(r1, 7)] = -v * y;
        a[(r1, 8)] = -v;
    }

    let svd = a.svd(false, true);
    let Some(v_t) = svd.v_t else {
        return nan_mat3();
    };
    let h = v_t.row(svd.singular_values.imin());

    let mut h_cond = Mat3::zeros();
    for r in 0..3 {
        for c in 0..3 {
            h_cond[(r, c)] = h[3 * r + c];
        }
    }

    let Some(t_dst_inv) = t_dst.try_inverse() else {
        return nan_mat3();
    };
    let h_mat = t_dst_inv * h_cond * t_src;

    let scale = h_mat[(2, 2)];
    if !(scale.abs() > f64::EPSILON) {
        return nan_mat3();
    }
    h_mat / scale
}

#[cfg(test)]
mod tests {
    use super::*;
    use mvcalib_core::{is_defined_mat3, transform_points};

    fn reference_h() -> Mat3 {
        Mat3::new(
            1.2, 0.1, 30.0, //
            -0.05, 0.9, 12.0, //
            1e-4, -2e-4, 1.0,
        )
    }

    #[test]
    fn four_exact_correspondences_recover_h() {
        let src = vec![
            Pt2::new(0.0, 0.0),
            Pt2::new(100.0, 0.0),
            Pt2::new(100.0, 80.0),
            Pt2::new(0.0, 80.0),
        ];
        let dst = transform_points(&reference_h(), &src);

        let h = dlt_homography(&src, &dst);
        assert!((h[(2, 2)] - 1.0).abs() < 1e-15);
        assert!(
            (h - reference_h()).norm() < 1e-9,
            "recovered H differs: {}",
            h
        );
    }

    #[test]
    fn overdetermined_grid_recovers_h() {
        let src: Vec<Pt2> = (0..6)
            .flat_map(|j| (0..7).map(move |i| Pt2::new(i as f64 * 0.03, j as f64 * 0.03)))
            .collect();
        let h_gt = Mat3::new(2500.0, 30.0, 320.0, -20.0, 2400.0, 240.0, 0.1, 0.2, 1.0);
        let dst = transform_points(&h_gt, &src);

        let h = dlt_homography(&src, &dst);
        let rel = (h - h_gt).norm() / h_gt.norm();
        assert!(rel < 1e-9, "relative error {}", rel);
    }

    #[test]
    fn degenerate_inputs_return_sentinel() {
        let three = vec![Pt2::new(0.0, 0.0), Pt2::new(1.0, 0.0), Pt2::new(0.0, 1.0)];
        assert!(!is_defined_mat3(&dlt_homography(&three, &three)));

        let four = vec![
            Pt2::new(0.0, 0.0),
            Pt2::new(1.0, 0.0),
            Pt2::new(1.0, 1.0),
            Pt2::new(0.0, 1.0),
        ];
        assert!(!is_defined_mat3(&dlt_homography(&four, &three)));

        let coincident = vec![Pt2::new(5.0, 5.0); 4];
        assert!(!is_defined_mat3(&dlt_homography(&four, &coincident)));

        let mut with_nan = four.clone();
        with_nan[1] = mvcalib_core::nan_pt2();
        assert!(!is_defined_mat3(&dlt_homography(&with_nan, &four)));
    }
}
