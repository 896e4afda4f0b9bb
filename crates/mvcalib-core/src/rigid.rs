//! Rigid transforms and their differentiable parametrization.
//!
//! [`Rigid`] stores a rotation matrix and a translation and maps points as
//! `p' = R p + t`. The optimizer sees a rigid transform as six numbers,
//! `[wx, wy, wz, tx, ty, tz]`, where `w` is the axis-angle (Rodrigues) vector.
//! The generic helpers below evaluate that parametrization for any
//! [`RealField`], so dual numbers flow through them unchanged.

use crate::{Iso3, Mat3, Mat4, Pt3, Real, Vec3};
use nalgebra::{Matrix3, RealField, Rotation3, Translation3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// Number of parameters of a rigid transform.
pub const RIGID_DIM: usize = 6;

/// Rotation + translation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rigid {
    pub rotation: Mat3,
    pub translation: Vec3,
}

impl Default for Rigid {
    fn default() -> Self {
        Self::identity()
    }
}

impl Rigid {
    pub fn new(rotation: Mat3, translation: Vec3) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    pub fn identity() -> Self {
        Self::new(Mat3::identity(), Vec3::zeros())
    }

    /// Fully undefined transform.
    pub fn undefined() -> Self {
        Self::new(
            Mat3::from_element(Real::NAN),
            Vec3::from_element(Real::NAN),
        )
    }

    /// `true` when every rotation and translation entry is finite.
    pub fn is_defined(&self) -> bool {
        self.rotation.iter().all(|v| v.is_finite())
            && self.translation.iter().all(|v| v.is_finite())
    }

    pub fn from_iso3(iso: &Iso3) -> Self {
        Self::new(
            *iso.rotation.to_rotation_matrix().matrix(),
            iso.translation.vector,
        )
    }

    pub fn to_iso3(&self) -> Option<Iso3> {
        if !self.is_defined() {
            return None;
        }
        let rot = Rotation3::from_matrix_unchecked(self.rotation);
        Some(Iso3::from_parts(
            Translation3::from(self.translation),
            UnitQuaternion::from_rotation_matrix(&rot),
        ))
    }

    /// Homogeneous 4x4 form `[R t; 0 1]`.
    pub fn to_matrix(&self) -> Mat4 {
        let mut m = Mat4::identity();
        m.fixed_view_mut::<3, 3>(0, 0).copy_from(&self.rotation);
        m.fixed_view_mut::<3, 1>(0, 3).copy_from(&self.translation);
        m
    }

    /// Inverse of [`Rigid::to_matrix`]; the bottom row is ignored.
    pub fn from_matrix(m: &Mat4) -> Self {
        Self::new(
            m.fixed_view::<3, 3>(0, 0).into_owned(),
            m.fixed_view::<3, 1>(0, 3).into_owned(),
        )
    }

    pub fn transform_point(&self, p: &Pt3) -> Pt3 {
        Pt3::from(self.rotation * p.coords + self.translation)
    }

    pub fn inverse_transform_point(&self, p: &Pt3) -> Pt3 {
        Pt3::from(self.rotation.transpose() * (p.coords - self.translation))
    }

    /// `Rᵀ, -Rᵀ t`.
    pub fn inverse(&self) -> Self {
        let rt = self.rotation.transpose();
        Self::new(rt, -(rt * self.translation))
    }

    /// `self ∘ other`: applies `other` first.
    pub fn compose(&self, other: &Rigid) -> Self {
        Self::new(
            self.rotation * other.rotation,
            self.rotation * other.translation + self.translation,
        )
    }

    /// Axis-angle + translation parameters.
    pub fn to_params(&self) -> [Real; RIGID_DIM] {
        let w = axis_angle_from_rotation(&self.rotation);
        let t = self.translation;
        [w.x, w.y, w.z, t.x, t.y, t.z]
    }

    pub fn from_params(p: &[Real; RIGID_DIM]) -> Self {
        let w = Vec3::new(p[0], p[1], p[2]);
        Self::new(
            rotation_from_axis_angle(&w),
            Vec3::new(p[3], p[4], p[5]),
        )
    }

    /// Angle of the relative rotation and distance between translations.
    pub fn distance(&self, other: &Rigid) -> (Real, Real) {
        let rel = self.rotation.transpose() * other.rotation;
        let cos = ((rel.trace() - 1.0) * 0.5).clamp(-1.0, 1.0);
        (cos.acos(), (self.translation - other.translation).norm())
    }
}

/// Cross-product matrix `[w]x`.
pub fn skew<T: RealField>(w: &Vector3<T>) -> Matrix3<T> {
    Matrix3::new(
        T::zero(),
        -w.z.clone(),
        w.y.clone(),
        w.z.clone(),
        T::zero(),
        -w.x.clone(),
        -w.y.clone(),
        w.x.clone(),
        T::zero(),
    )
}

/// Rodrigues formula `R = I + sinθ/θ [w]x + (1 - cosθ)/θ² [w]x²`.
///
/// Near zero the second-order expansion is used so that derivatives stay
/// finite at exactly `w = 0`.
pub fn rotation_from_axis_angle<T: RealField>(w: &Vector3<T>) -> Matrix3<T> {
    let k = skew(w);
    let k2 = k.clone() * k.clone();
    let theta2 = w.norm_squared();
    let small: T = nalgebra::convert(1e-12);

    if theta2 < small {
        let half: T = nalgebra::convert(0.5);
        return Matrix3::identity() + k + k2 * half;
    }

    let theta = theta2.clone().sqrt();
    let a = theta.clone().sin() / theta.clone();
    let b = (T::one() - theta.cos()) / theta2;
    Matrix3::identity() + k * a + k2 * b
}

/// Axis-angle vector of a rotation matrix.
pub fn axis_angle_from_rotation(r: &Mat3) -> Vec3 {
    Rotation3::from_matrix_unchecked(*r).scaled_axis()
}

/// Apply `[w, t]` to a point: `R(w) p + t`.
pub fn apply_rigid<T: RealField>(params: &[T], p: &Vector3<T>) -> Vector3<T> {
    debug_assert!(params.len() == RIGID_DIM, "rigid must have 6 params");
    let (r, t) = split_rigid(params);
    r * p + t
}

/// Apply the inverse of `[w, t]` to a point: `R(w)ᵀ (p - t)`.
pub fn apply_rigid_inverse<T: RealField>(params: &[T], p: &Vector3<T>) -> Vector3<T> {
    debug_assert!(params.len() == RIGID_DIM, "rigid must have 6 params");
    let (r, t) = split_rigid(params);
    r.transpose() * (p - t)
}

fn split_rigid<T: RealField>(params: &[T]) -> (Matrix3<T>, Vector3<T>) {
    let w = Vector3::new(params[0].clone(), params[1].clone(), params[2].clone());
    let t = Vector3::new(params[3].clone(), params[4].clone(), params[5].clone());
    (rotation_from_axis_angle(&w), t)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_rigid() -> Rigid {
        let rot = Rotation3::from_euler_angles(0.3, -0.2, 0.9);
        Rigid::new(*rot.matrix(), Vec3::new(0.4, -1.2, 2.5))
    }

    #[test]
    fn compose_with_inverse_is_identity() {
        let r = sample_rigid();
        for id in [r.compose(&r.inverse()), r.inverse().compose(&r)] {
            assert!((id.rotation - Mat3::identity()).norm() < 1e-12);
            assert!(id.translation.norm() < 1e-12);
        }
    }

    #[test]
    fn inverse_transform_undoes_forward() {
        let r = sample_rigid();
        let p = Pt3::new(0.1, 0.2, 0.3);
        let q = r.inverse_transform_point(&r.transform_point(&p));
        assert!((q - p).norm() < 1e-12);
        let q2 = r.inverse().transform_point(&r.transform_point(&p));
        assert!((q2 - p).norm() < 1e-12);
    }

    #[test]
    fn composition_is_associative() {
        let a = sample_rigid();
        let b = Rigid::from_params(&[0.1, 0.0, -0.3, 1.0, 0.0, 0.5]);
        let c = Rigid::from_params(&[-0.2, 0.4, 0.1, 0.0, 2.0, -1.0]);
        let left = a.compose(&b).compose(&c);
        let right = a.compose(&b.compose(&c));
        assert!((left.to_matrix() - right.to_matrix()).norm() < 1e-12);
        assert!((a.compose(&Rigid::identity()).to_matrix() - a.to_matrix()).norm() < 1e-15);
    }

    #[test]
    fn params_roundtrip_and_match_generic_apply() {
        let r = sample_rigid();
        let params = r.to_params();
        let back = Rigid::from_params(&params);
        assert!((back.rotation - r.rotation).norm() < 1e-12);

        let p = Pt3::new(-0.3, 0.7, 1.1);
        let fwd = apply_rigid(&params, &p.coords);
        assert!((fwd - r.transform_point(&p).coords).norm() < 1e-12);
        let inv = apply_rigid_inverse(&params, &fwd);
        assert!((inv - p.coords).norm() < 1e-12);
    }

    #[test]
    fn small_angle_branch_is_continuous() {
        let w = Vec3::new(1e-7, -2e-7, 5e-8);
        let approx = rotation_from_axis_angle(&w);
        let exact = *Rotation3::from_scaled_axis(w).matrix();
        assert!((approx - exact).norm() < 1e-12);
    }

    #[test]
    fn matrix_form_roundtrip() {
        let r = sample_rigid();
        let back = Rigid::from_matrix(&r.to_matrix());
        assert_eq!(back, r);
        assert!(!Rigid::undefined().is_defined());
        assert!(Rigid::undefined().to_iso3().is_none());
        let iso = r.to_iso3().unwrap();
        let again = Rigid::from_iso3(&iso);
        assert!((again.rotation - r.rotation).norm() < 1e-12);
    }
}
