//! Parameter blocks of the joint problem and their flat-vector layout.
//!
//! The optimizer sees a single `Vec<f64>`. [`ParamLayout`] decides which
//! blocks appear in it and at which offsets:
//!
//! ```text
//! [ cam0: intrinsics | distortion ][ cam1: ... ] ... [ free camera poses ] [ placement poses ]
//! ```
//!
//! Camera poses listed as fixed are left out of the vector entirely; their
//! values stay in the [`JointParams`] the vector is unpacked against.

use mvcalib_core::{
    CameraModel, Distortion, DistortionKind, Intrinsics, IntrinsicsKind, Real, Rigid, RIGID_DIM,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Layout or block mismatch between a parameter vector and its problem.
#[derive(Debug, Error)]
pub enum ParamError {
    #[error("parameter vector has length {actual}, layout expects {expected}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("{what} count {actual} does not match layout ({expected})")]
    CountMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("camera {camera} has {actual:?} intrinsics, layout expects {expected:?}")]
    IntrinsicsKind {
        camera: usize,
        expected: IntrinsicsKind,
        actual: IntrinsicsKind,
    },
    #[error("camera {camera} has {actual:?} distortion, layout expects {expected:?}")]
    DistortionKind {
        camera: usize,
        expected: DistortionKind,
        actual: DistortionKind,
    },
    #[error("{what} index {index} out of range (count {count})")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        count: usize,
    },
    #[error("view {view} has {actual} points, board has {expected}")]
    PointCount {
        view: usize,
        expected: usize,
        actual: usize,
    },
    #[error(transparent)]
    Model(#[from] anyhow::Error),
}

/// All values the joint problem refines.
///
/// Poses map their own frame into the shared reference frame: a camera pose
/// takes camera-frame points to reference coordinates, a placement pose takes
/// board-frame points to reference coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointParams {
    pub cameras: Vec<CameraModel>,
    pub camera_poses: Vec<Rigid>,
    pub placement_poses: Vec<Rigid>,
}

/// Flat-vector layout with the fixed/optimizable partition.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamLayout {
    intrinsics_kind: IntrinsicsKind,
    distortion_kind: DistortionKind,
    num_cameras: usize,
    num_placements: usize,
    camera_pose_offsets: Vec<Option<usize>>,
    placement_base: usize,
    dim: usize,
}

impl ParamLayout {
    /// Build a layout; camera poses in `fixed_camera_poses` are excluded from
    /// the optimizable vector.
    pub fn new(
        intrinsics_kind: IntrinsicsKind,
        distortion_kind: DistortionKind,
        num_cameras: usize,
        num_placements: usize,
        fixed_camera_poses: &[usize],
    ) -> Result<Self, ParamError> {
        if let Some(&index) = fixed_camera_poses.iter().find(|&&c| c >= num_cameras) {
            return Err(ParamError::IndexOutOfRange {
                what: "fixed camera pose",
                index,
                count: num_cameras,
            });
        }

        let camera_block = intrinsics_kind.dim() + distortion_kind.dim();
        let mut offset = camera_block * num_cameras;
        let camera_pose_offsets = (0..num_cameras)
            .map(|c| {
                if fixed_camera_poses.contains(&c) {
                    None
                } else {
                    let o = offset;
                    offset += RIGID_DIM;
                    Some(o)
                }
            })
            .collect();
        let placement_base = offset;
        let dim = placement_base + RIGID_DIM * num_placements;

        Ok(Self {
            intrinsics_kind,
            distortion_kind,
            num_cameras,
            num_placements,
            camera_pose_offsets,
            placement_base,
            dim,
        })
    }

    /// Length of the optimizable vector.
    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn intrinsics_kind(&self) -> IntrinsicsKind {
        self.intrinsics_kind
    }

    pub fn distortion_kind(&self) -> DistortionKind {
        self.distortion_kind
    }

    pub fn num_cameras(&self) -> usize {
        self.num_cameras
    }

    pub fn num_placements(&self) -> usize {
        self.num_placements
    }

    pub fn intrinsics_offset(&self, camera: usize) -> usize {
        camera * (self.intrinsics_kind.dim() + self.distortion_kind.dim())
    }

    pub fn distortion_offset(&self, camera: usize) -> usize {
        self.intrinsics_offset(camera) + self.intrinsics_kind.dim()
    }

    /// `None` when the camera pose is fixed.
    pub fn camera_pose_offset(&self, camera: usize) -> Option<usize> {
        self.camera_pose_offsets.get(camera).copied().flatten()
    }

    pub fn placement_offset(&self, placement: usize) -> usize {
        self.placement_base + RIGID_DIM * placement
    }

    pub fn is_camera_pose_fixed(&self, camera: usize) -> bool {
        self.camera_pose_offset(camera).is_none()
    }

    /// Per-entry conditioning scales for the vector `x`.
    ///
    /// Intrinsic entries (focal lengths and principal point, hundreds of
    /// pixels) are scaled by their own magnitude so that the optimizer sees
    /// every entry at order one. All other entries have scale 1.
    pub fn scales(&self, x: &[Real]) -> Vec<Real> {
        let mut scales = vec![1.0; x.len()];
        let idim = self.intrinsics_kind.dim();
        for camera in 0..self.num_cameras {
            let io = self.intrinsics_offset(camera);
            for k in io..(io + idim).min(x.len()) {
                scales[k] = x[k].abs().max(1.0);
            }
        }
        scales
    }

    /// Verify that `params` has the block counts and model kinds of this layout.
    pub fn check(&self, params: &JointParams) -> Result<(), ParamError> {
        check_count("camera", self.num_cameras, params.cameras.len())?;
        check_count("camera pose", self.num_cameras, params.camera_poses.len())?;
        check_count("placement pose", self.num_placements, params.placement_poses.len())?;
        for (camera, model) in params.cameras.iter().enumerate() {
            if model.intrinsics.kind() != self.intrinsics_kind {
                return Err(ParamError::IntrinsicsKind {
                    camera,
                    expected: self.intrinsics_kind,
                    actual: model.intrinsics.kind(),
                });
            }
            if model.distortion.kind() != self.distortion_kind {
                return Err(ParamError::DistortionKind {
                    camera,
                    expected: self.distortion_kind,
                    actual: model.distortion.kind(),
                });
            }
        }
        Ok(())
    }

    /// Flatten the optimizable blocks of `params`.
    pub fn pack(&self, params: &JointParams) -> Result<Vec<Real>, ParamError> {
        self.check(params)?;
        let mut x = vec![0.0; self.dim];
        for (c, model) in params.cameras.iter().enumerate() {
            let io = self.intrinsics_offset(c);
            let intr = model.intrinsics.params();
            x[io..io + intr.len()].copy_from_slice(&intr);
            let d_o = self.distortion_offset(c);
            let dist = model.distortion.params();
            x[d_o..d_o + dist.len()].copy_from_slice(&dist);
        }
        for (c, pose) in params.camera_poses.iter().enumerate() {
            if let Some(o) = self.camera_pose_offset(c) {
                x[o..o + RIGID_DIM].copy_from_slice(&pose.to_params());
            }
        }
        for (p, pose) in params.placement_poses.iter().enumerate() {
            let o = self.placement_offset(p);
            x[o..o + RIGID_DIM].copy_from_slice(&pose.to_params());
        }
        Ok(x)
    }

    /// Rebuild the blocks from `x`, taking fixed blocks from `base`.
    pub fn unpack(&self, x: &[Real], base: &JointParams) -> Result<JointParams, ParamError> {
        if x.len() != self.dim {
            return Err(ParamError::LengthMismatch {
                expected: self.dim,
                actual: x.len(),
            });
        }
        self.check(base)?;

        let idim = self.intrinsics_kind.dim();
        let ddim = self.distortion_kind.dim();
        let cameras = (0..self.num_cameras)
            .map(|c| {
                let io = self.intrinsics_offset(c);
                let d_o = self.distortion_offset(c);
                Ok(CameraModel::new(
                    Intrinsics::from_params(self.intrinsics_kind, &x[io..io + idim])?,
                    Distortion::from_params(self.distortion_kind, &x[d_o..d_o + ddim])?,
                ))
            })
            .collect::<Result<Vec<_>, ParamError>>()?;

        let camera_poses = (0..self.num_cameras)
            .map(|c| match self.camera_pose_offset(c) {
                Some(o) => rigid_at(x, o),
                None => base.camera_poses[c],
            })
            .collect();
        let placement_poses = (0..self.num_placements)
            .map(|p| rigid_at(x, self.placement_offset(p)))
            .collect();

        Ok(JointParams {
            cameras,
            camera_poses,
            placement_poses,
        })
    }
}

fn check_count(what: &'static str, expected: usize, actual: usize) -> Result<(), ParamError> {
    if expected != actual {
        return Err(ParamError::CountMismatch {
            what,
            expected,
            actual,
        });
    }
    Ok(())
}

fn rigid_at(x: &[Real], offset: usize) -> Rigid {
    let mut p = [0.0; RIGID_DIM];
    p.copy_from_slice(&x[offset..offset + RIGID_DIM]);
    Rigid::from_params(&p)
}
