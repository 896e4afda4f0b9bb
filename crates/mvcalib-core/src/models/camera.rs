use super::{Distortion, DistortionKind, Intrinsics, IntrinsicsKind};
use crate::{Pt2, Pt3, Rigid};
use nalgebra::{RealField, Vector2, Vector3};
use serde::{Deserialize, Serialize};

/// Perspective division `(x/z, y/z)`.
pub fn normalize<T: RealField>(p: &Vector3<T>) -> Vector2<T> {
    let z = p.z.clone();
    Vector2::new(p.x.clone() / z.clone(), p.y.clone() / z)
}

/// Camera-frame point to pixel: normalize, distort, apply intrinsics.
pub fn project_generic<T: RealField>(
    intrinsics_kind: IntrinsicsKind,
    intrinsics: &[T],
    distortion_kind: DistortionKind,
    distortion: &[T],
    pc: &Vector3<T>,
) -> Vector2<T> {
    let n = normalize(pc);
    let nd = distortion_kind.apply(distortion, &n);
    intrinsics_kind.apply(intrinsics, &nd)
}

/// Pinhole camera with lens distortion.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraModel {
    pub intrinsics: Intrinsics,
    pub distortion: Distortion,
}

impl CameraModel {
    pub fn new(intrinsics: Intrinsics, distortion: Distortion) -> Self {
        Self {
            intrinsics,
            distortion,
        }
    }

    /// Project a point given in the camera frame.
    pub fn project_point(&self, pc: &Pt3) -> Pt2 {
        let uv = project_generic(
            self.intrinsics.kind(),
            &self.intrinsics.params(),
            self.distortion.kind(),
            &self.distortion.params(),
            &pc.coords,
        );
        Pt2::from(uv)
    }

    /// Project world points through `cam_from_world`.
    pub fn project_points(&self, cam_from_world: &Rigid, points: &[Pt3]) -> Vec<Pt2> {
        points
            .iter()
            .map(|p| self.project_point(&cam_from_world.transform_point(p)))
            .collect()
    }
}
