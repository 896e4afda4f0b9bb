use nalgebra::{Isometry3, Matrix3, Matrix4, Point2, Point3, Vector2, Vector3};

pub type Real = f64;

pub type Vec2 = Vector2<Real>;
pub type Vec3 = Vector3<Real>;
pub type Pt2 = Point2<Real>;
pub type Pt3 = Point3<Real>;
pub type Mat3 = Matrix3<Real>;
pub type Mat4 = Matrix4<Real>;
pub type Iso3 = Isometry3<Real>;

/// Append a unit third coordinate.
pub fn to_homogeneous(p: &Pt2) -> Vec3 {
    Vec3::new(p.x, p.y, 1.0)
}

/// Divide by the last coordinate.
pub fn from_homogeneous(v: &Vec3) -> Pt2 {
    Pt2::new(v.x / v.z, v.y / v.z)
}

/// Undefined 2D point, used for occluded or failed control points.
pub fn nan_pt2() -> Pt2 {
    Pt2::new(Real::NAN, Real::NAN)
}

/// Undefined 3x3 matrix, used for degenerate homographies and rotations.
pub fn nan_mat3() -> Mat3 {
    Mat3::from_element(Real::NAN)
}

/// A point is defined when both coordinates are finite.
pub fn is_defined_pt2(p: &Pt2) -> bool {
    p.x.is_finite() && p.y.is_finite()
}

/// A matrix is defined when every entry is finite.
pub fn is_defined_mat3(m: &Mat3) -> bool {
    m.iter().all(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn homogeneous_roundtrip_scales_out() {
        let p = Pt2::new(3.0, -2.0);
        let v = to_homogeneous(&p) * 4.0;
        let q = from_homogeneous(&v);
        assert!((q - p).norm() < 1e-12);
    }

    #[test]
    fn sentinels_are_undefined() {
        assert!(!is_defined_pt2(&nan_pt2()));
        assert!(!is_defined_mat3(&nan_mat3()));
        assert!(is_defined_mat3(&Mat3::identity()));

        let mut m = Mat3::identity();
        m[(1, 2)] = Real::INFINITY;
        assert!(!is_defined_mat3(&m));
    }
}
