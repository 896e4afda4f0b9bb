use log::debug;
use mvcalib_core::{nan_mat3, unitize, Mat3, Real, Vec3};

/// Closed-form intrinsic guess from plane-to-image homographies.
///
/// A restricted form of Zhang's method: the principal point is fixed at the
/// image center `((w - 1) / 2, (h - 1) / 2)` and pixels are assumed square,
/// leaving a single focal length `α`. Each homography contributes the two
/// orthogonality constraints on its rotation columns
/// (`r1 ⟂ r2` and `|r1| = |r2|`, the latter via `r1 + r2 ⟂ r1 - r2`), and `α²`
/// is the least-squares ratio between the metric and projective terms.
///
/// Non-finite homographies are skipped. The result is not finite when no
/// homography constrains `α`, e.g. every view is fronto-parallel; callers
/// must screen for that.
///
/// `image_size` is `(height, width)`.
pub fn estimate_intrinsics_from_homographies(
    homographies: &[Mat3],
    image_size: (usize, usize),
) -> Mat3 {
    let (h, w) = image_size;
    let xo = (w as Real - 1.0) / 2.0;
    let yo = (h as Real - 1.0) / 2.0;
    let po_inv = Mat3::new(1.0, 0.0, -xo, 0.0, 1.0, -yo, 0.0, 0.0, 1.0);

    let mut ab = 0.0;
    let mut bb = 0.0;
    let mut used = 0usize;
    for hmtx in homographies {
        if hmtx.iter().any(|v| !v.is_finite()) {
            continue;
        }
        let hb = po_inv * hmtx;
        let c1: Vec3 = hb.column(0).into_owned();
        let c2: Vec3 = hb.column(1).into_owned();
        let v1 = unitize(&c1);
        let v2 = unitize(&c2);
        let v3 = unitize(&(c1 + c2));
        let v4 = unitize(&(c1 - c2));

        for (a, b) in [(v1, v2), (v3, v4)] {
            let metric = a.x * b.x + a.y * b.y;
            let projective = -a.z * b.z;
            ab += metric * projective;
            bb += projective * projective;
        }
        used += 1;
    }

    let alpha = (ab / bb).sqrt();
    debug!("focal initialisation from {used} homographies: {alpha}");
    if !alpha.is_finite() {
        return nan_mat3();
    }
    Mat3::new(alpha, 0.0, xo, 0.0, alpha, yo, 0.0, 0.0, 1.0)
}
