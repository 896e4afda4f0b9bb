use crate::math::nearest_rotation;
use mvcalib_core::{Mat3, Rigid, Vec3};

/// Pose of a planar board (`Z = 0`) relative to the camera, from the
/// plane-to-image homography `H` and intrinsics `K`.
///
/// With `H̄ = K⁻¹ H`, the first two columns scaled to unit length give `r1`,
/// `r2`; `r3 = r1 × r2` and the stacked matrix is projected onto SO(3).
/// The translation is the third column over the mean column norm.
///
/// The returned [`Rigid`] maps board coordinates into camera coordinates.
/// Its rotation is either orthonormal with determinant 1 or entirely NaN
/// (degenerate `H`, non-invertible `K`, or a reflection).
pub fn estimate_planar_pose_from_h(kmtx: &Mat3, hmtx: &Mat3) -> Rigid {
    let Some(k_inv) = kmtx.try_inverse() else {
        return Rigid::undefined();
    };
    let hb = k_inv * hmtx;

    let h1: Vec3 = hb.column(0).into_owned();
    let h2: Vec3 = hb.column(1).into_owned();
    let h3: Vec3 = hb.column(2).into_owned();
    let lambda1 = h1.norm();
    let lambda2 = h2.norm();

    let r1 = h1 / lambda1;
    let r2 = h2 / lambda2;
    let r3 = r1.cross(&r2);

    let mut r_mat = Mat3::zeros();
    r_mat.set_column(0, &r1);
    r_mat.set_column(1, &r2);
    r_mat.set_column(2, &r3);

    let rotation = nearest_rotation(&r_mat);
    let translation = h3 / ((lambda1 + lambda2) * 0.5);
    Rigid::new(rotation, translation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dlt_homography;
    use mvcalib_core::{is_defined_mat3, nan_mat3, Pt2, Pt3, Real};
    use nalgebra::Rotation3;

    fn kmtx() -> Mat3 {
        Mat3::new(800.0, 0.0, 640.0, 0.0, 780.0, 360.0, 0.0, 0.0, 1.0)
    }

    #[test]
    fn planar_pose_from_homography_recovers_pose() {
        let k = kmtx();
        let rot = Rotation3::from_euler_angles(0.1, -0.05, 0.2);
        let t = Vec3::new(0.1, -0.05, 1.0);

        let mut hmtx = Mat3::zeros();
        hmtx.set_column(0, &(k * rot.matrix().column(0)));
        hmtx.set_column(1, &(k * rot.matrix().column(1)));
        hmtx.set_column(2, &(k * t));
        hmtx /= hmtx[(2, 2)];

        let pose = estimate_planar_pose_from_h(&k, &hmtx);
        let gt = Rigid::new(*rot.matrix(), t);
        let (angle, dist) = pose.distance(&gt);
        assert!(angle < 1e-3, "rotation error too large: {}", angle);
        assert!(dist < 1e-6, "translation error too large: {}", dist);
    }

    #[test]
    fn pose_from_estimated_homography() {
        let k = kmtx();
        let gt = Rigid::new(
            *Rotation3::from_euler_angles(-0.3, 0.2, 0.05).matrix(),
            Vec3::new(-0.05, 0.02, 0.8),
        );
        let board: Vec<Pt2> = (0..5)
            .flat_map(|j| (0..6).map(move |i| Pt2::new(i as Real * 0.03, j as Real * 0.03)))
            .collect();
        let image: Vec<Pt2> = board
            .iter()
            .map(|p| {
                let pc = gt.transform_point(&Pt3::new(p.x, p.y, 0.0));
                let uv = k * pc.coords;
                Pt2::new(uv.x / uv.z, uv.y / uv.z)
            })
            .collect();

        let pose = estimate_planar_pose_from_h(&k, &dlt_homography(&board, &image));
        let (angle, dist) = pose.distance(&gt);
        assert!(angle < 1e-6 && dist < 1e-6, "angle {angle}, dist {dist}");
    }

    #[test]
    fn rotation_is_orthonormal_or_undefined() {
        let k = kmtx();
        // Deterministic spread of arbitrary matrices, some wildly degenerate.
        let mut seed = 0x2545_f491_u64;
        let mut next = || {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            ((seed >> 11) as Real / (1u64 << 53) as Real) * 2.0 - 1.0
        };
        for _ in 0..50 {
            let h = Mat3::from_fn(|_, _| next());
            let pose = estimate_planar_pose_from_h(&k, &h);
            let r = pose.rotation;
            if is_defined_mat3(&r) {
                assert!((r.transpose() * r - Mat3::identity()).norm() < 1e-9);
                assert!((r.determinant() - 1.0).abs() < 1e-9);
            } else {
                assert!(r.iter().all(|v| v.is_nan()));
            }
        }

        let pose = estimate_planar_pose_from_h(&k, &nan_mat3());
        assert!(!pose.is_defined());
        assert!(!estimate_planar_pose_from_h(&Mat3::zeros(), &Mat3::identity()).is_defined());
    }
}
