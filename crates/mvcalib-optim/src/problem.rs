//! Joint reprojection objective over cameras, camera poses and placements.
//!
//! Each view (one image) depends on four blocks only: its camera's
//! intrinsics and distortion, its placement pose and its camera pose.
//! Gradients are computed per view with forward-mode autodiff over a fixed
//! local vector of [`LOCAL_DIM`] entries and scattered into the global
//! gradient. Slots that a model does not use, and slots of fixed blocks,
//! carry values but have no global index, so their derivatives are dropped.

use crate::loss::{PointLoss, ReprojectionLoss};
use crate::params::{JointParams, ParamError, ParamLayout};
use mvcalib_core::{
    apply_rigid, apply_rigid_inverse, is_defined_pt2, project_generic, Pt2, Pt3, Real,
    ReprojectionStats, RIGID_DIM,
};
use nalgebra::{RealField, SVector, Vector3};
use num_dual::{gradient, DualSVec64};
use serde::{Deserialize, Serialize};

const INTRINSICS_SLOT: usize = 0;
const DISTORTION_SLOT: usize = 4;
const PLACEMENT_SLOT: usize = 9;
const CAMERA_POSE_SLOT: usize = 15;

/// Size of the per-view autodiff vector.
pub const LOCAL_DIM: usize = CAMERA_POSE_SLOT + RIGID_DIM;

/// Control points observed in one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewObservation {
    pub camera: usize,
    pub placement: usize,
    /// One pixel per board control point, NaN where missing.
    pub points: Vec<Pt2>,
}

/// Differentiable joint reprojection loss.
#[derive(Debug, Clone)]
pub struct JointProblem<L: PointLoss = ReprojectionLoss> {
    layout: ParamLayout,
    base: JointParams,
    board: Vec<Pt3>,
    views: Vec<ViewObservation>,
    loss: L,
}

impl<L: PointLoss> JointProblem<L> {
    /// `base` provides the starting values and the values of fixed blocks.
    pub fn new(
        layout: ParamLayout,
        base: JointParams,
        board: Vec<Pt3>,
        views: Vec<ViewObservation>,
        loss: L,
    ) -> Result<Self, ParamError> {
        layout.check(&base)?;
        for (i, view) in views.iter().enumerate() {
            if view.camera >= layout.num_cameras() {
                return Err(ParamError::IndexOutOfRange {
                    what: "camera",
                    index: view.camera,
                    count: layout.num_cameras(),
                });
            }
            if view.placement >= layout.num_placements() {
                return Err(ParamError::IndexOutOfRange {
                    what: "placement",
                    index: view.placement,
                    count: layout.num_placements(),
                });
            }
            if view.points.len() != board.len() {
                return Err(ParamError::PointCount {
                    view: i,
                    expected: board.len(),
                    actual: view.points.len(),
                });
            }
        }
        Ok(Self {
            layout,
            base,
            board,
            views,
            loss,
        })
    }

    pub fn layout(&self) -> &ParamLayout {
        &self.layout
    }

    pub fn views(&self) -> &[ViewObservation] {
        &self.views
    }

    pub fn base(&self) -> &JointParams {
        &self.base
    }

    /// Board control points in the board frame (`z = 0`).
    pub fn board(&self) -> &[Pt3] {
        &self.board
    }

    /// Starting vector packed from the base parameters.
    pub fn initial_params(&self) -> Result<Vec<Real>, ParamError> {
        self.layout.pack(&self.base)
    }

    /// Parameter blocks for the vector `x`.
    pub fn params_from(&self, x: &[Real]) -> Result<JointParams, ParamError> {
        self.layout.unpack(x, &self.base)
    }

    /// Total loss over all views.
    pub fn loss(&self, x: &[Real]) -> Real {
        self.views
            .iter()
            .map(|view| {
                let (local, _) = self.local_params(x, view);
                self.view_loss(local.as_slice(), view)
            })
            .sum()
    }

    /// Total loss and its exact gradient with respect to `x`.
    pub fn loss_and_gradient(&self, x: &[Real]) -> (Real, Vec<Real>) {
        debug_assert_eq!(x.len(), self.layout.dim());
        let mut total = 0.0;
        let mut grad = vec![0.0; x.len()];

        for view in &self.views {
            let (local, map) = self.local_params(x, view);
            let (value, g_view) = gradient(
                |p: SVector<DualSVec64<LOCAL_DIM>, LOCAL_DIM>| self.view_loss(p.as_slice(), view),
                local,
            );
            total += value;
            for (k, global) in map.iter().enumerate() {
                if let Some(g) = global {
                    grad[*g] += g_view[k];
                }
            }
        }
        (total, grad)
    }

    /// Predicted pixels of every board point, per view.
    pub fn reproject(&self, params: &JointParams) -> Vec<Vec<Pt2>> {
        self.views
            .iter()
            .map(|view| {
                let cam_from_board = params.camera_poses[view.camera]
                    .inverse()
                    .compose(&params.placement_poses[view.placement]);
                params.cameras[view.camera].project_points(&cam_from_board, &self.board)
            })
            .collect()
    }

    /// Pixel error statistics over every defined observation.
    pub fn stats(&self, params: &JointParams) -> ReprojectionStats {
        let predicted = self.reproject(params);
        let observed: Vec<Pt2> = self.views.iter().flat_map(|v| v.points.iter().copied()).collect();
        let predicted: Vec<Pt2> = predicted.into_iter().flatten().collect();
        ReprojectionStats::from_points(&observed, &predicted)
    }

    /// Local autodiff vector for `view` and the global index of each slot.
    fn local_params(
        &self,
        x: &[Real],
        view: &ViewObservation,
    ) -> (SVector<Real, LOCAL_DIM>, [Option<usize>; LOCAL_DIM]) {
        let mut local = SVector::<Real, LOCAL_DIM>::zeros();
        let mut map = [None; LOCAL_DIM];

        let mut gather = |slot: usize, offset: usize, len: usize| {
            for k in 0..len {
                local[slot + k] = x[offset + k];
                map[slot + k] = Some(offset + k);
            }
        };
        gather(
            INTRINSICS_SLOT,
            self.layout.intrinsics_offset(view.camera),
            self.layout.intrinsics_kind().dim(),
        );
        gather(
            DISTORTION_SLOT,
            self.layout.distortion_offset(view.camera),
            self.layout.distortion_kind().dim(),
        );
        gather(
            PLACEMENT_SLOT,
            self.layout.placement_offset(view.placement),
            RIGID_DIM,
        );
        let camera_pose_offset = self.layout.camera_pose_offset(view.camera);
        if let Some(offset) = camera_pose_offset {
            gather(CAMERA_POSE_SLOT, offset, RIGID_DIM);
        }
        if camera_pose_offset.is_none() {
            let fixed = self.base.camera_poses[view.camera].to_params();
            for (k, v) in fixed.iter().enumerate() {
                local[CAMERA_POSE_SLOT + k] = *v;
            }
        }
        (local, map)
    }

    /// `placement → inverse(camera pose) → normalize → distort → project`,
    /// summed over the defined observations of one view.
    fn view_loss<T: RealField>(&self, p: &[T], view: &ViewObservation) -> T {
        let ikind = self.layout.intrinsics_kind();
        let dkind = self.layout.distortion_kind();
        let intrinsics = &p[INTRINSICS_SLOT..INTRINSICS_SLOT + ikind.dim()];
        let distortion = &p[DISTORTION_SLOT..DISTORTION_SLOT + dkind.dim()];
        let placement = &p[PLACEMENT_SLOT..PLACEMENT_SLOT + RIGID_DIM];
        let camera_pose = &p[CAMERA_POSE_SLOT..CAMERA_POSE_SLOT + RIGID_DIM];

        let mut total = T::zero();
        for (pw, obs) in self.board.iter().zip(&view.points) {
            if !is_defined_pt2(obs) {
                continue;
            }
            let pw = Vector3::new(
                nalgebra::convert::<Real, T>(pw.x),
                nalgebra::convert::<Real, T>(pw.y),
                nalgebra::convert::<Real, T>(pw.z),
            );
            let pr = apply_rigid(placement, &pw);
            let pc = apply_rigid_inverse(camera_pose, &pr);
            let uv = project_generic(ikind, intrinsics, dkind, distortion, &pc);
            total += self.loss.eval(&uv, &obs.coords);
        }
        total
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use mvcalib_core::synthetic::planar::{poses_around_board, project_board};
    use mvcalib_core::{
        nan_pt2, BoardGeometry, CameraModel, Distortion, DistortionKind, Intrinsics, IntrinsicsKind, Rigid,
        Vec3,
    };
    use nalgebra::Rotation3;

    pub(crate) fn ground_truth_camera() -> CameraModel {
        CameraModel::new(
            Intrinsics::SingleFocal {
                f: 700.0,
                cx: 319.5,
                cy: 239.5,
            },
            Distortion::RadTan4 {
                k1: -0.05,
                k2: 0.01,
                p1: 0.0005,
                p2: -0.0003,
            },
        )
    }

    /// Two cameras, three placements seen by both, camera 0 is the reference.
    pub(crate) fn two_camera_problem() -> (JointProblem, JointParams) {
        let board = BoardGeometry::checker(6, 5, 0.03).unwrap();
        let cam = ground_truth_camera();
        let cam1_pose = Rigid::new(
            *Rotation3::from_euler_angles(0.0, -0.2, 0.0).matrix(),
            Vec3::new(0.15, 0.0, 0.02),
        );
        let camera_poses = vec![Rigid::identity(), cam1_pose];
        let placement_poses = poses_around_board(&board, 3, 0.5, 0.4);

        let mut views = Vec::new();
        for (p, placement) in placement_poses.iter().enumerate() {
            for (c, cam_pose) in camera_poses.iter().enumerate() {
                let cam_from_board = cam_pose.inverse().compose(placement);
                views.push(ViewObservation {
                    camera: c,
                    placement: p,
                    points: project_board(&cam, &cam_from_board, &board),
                });
            }
        }

        let truth = JointParams {
            cameras: vec![cam, cam],
            camera_poses,
            placement_poses,
        };
        let layout =
            ParamLayout::new(IntrinsicsKind::SingleFocal, DistortionKind::RadTan4, 2, 3, &[0]).unwrap();
        let problem = JointProblem::new(
            layout,
            truth.clone(),
            board.control_points_3d(),
            views,
            ReprojectionLoss::SumSquared,
        )
        .unwrap();
        (problem, truth)
    }

    #[test]
    fn exact_parameters_have_zero_loss() {
        let (problem, _) = two_camera_problem();
        let x = problem.initial_params().unwrap();
        let loss = problem.loss(&x);
        assert!(loss < 1e-16, "loss at ground truth {loss}");
    }

    #[test]
    fn gradient_matches_finite_differences() {
        let (problem, _) = two_camera_problem();
        let mut x = problem.initial_params().unwrap();
        // Move away from the optimum so the gradient is informative.
        for (i, v) in x.iter_mut().enumerate() {
            *v += 1e-3 * ((i % 7) as Real - 3.0) * v.abs().max(1.0);
        }
        let (value, grad) = problem.loss_and_gradient(&x);
        assert!((value - problem.loss(&x)).abs() <= 1e-9 * value.max(1.0));

        for i in 0..x.len() {
            let h = 1e-6 * x[i].abs().max(1.0);
            let mut xp = x.clone();
            let mut xm = x.clone();
            xp[i] += h;
            xm[i] -= h;
            let fd = (problem.loss(&xp) - problem.loss(&xm)) / (2.0 * h);
            let tol = 1e-4 * fd.abs().max(grad[i].abs()).max(1.0);
            assert!(
                (fd - grad[i]).abs() < tol,
                "gradient mismatch at {i}: ad {} vs fd {}",
                grad[i],
                fd
            );
        }
    }

    #[test]
    fn undefined_point_is_excluded_per_view() {
        let (problem, truth) = two_camera_problem();
        let mut views = problem.views().to_vec();
        views[2].points[4] = nan_pt2();
        views[2].points[5].x += 3.0;
        let occluded = JointProblem::new(
            problem.layout().clone(),
            truth.clone(),
            problem.board.clone(),
            views,
            ReprojectionLoss::SumSquared,
        )
        .unwrap();

        let x = occluded.initial_params().unwrap();
        let (value, grad) = occluded.loss_and_gradient(&x);
        assert!((value - 9.0).abs() < 1e-9, "only the shifted point contributes: {value}");
        assert!(grad.iter().all(|g| g.is_finite()));

        let reprojected = occluded.reproject(&truth);
        assert!(is_defined_pt2(&reprojected[2][4]));
        assert_eq!(occluded.stats(&truth).count, 6 * 30 - 1);
    }

    #[test]
    fn views_must_match_layout() {
        let (problem, truth) = two_camera_problem();
        let mut views = problem.views().to_vec();
        views[0].placement = 7;
        assert!(matches!(
            JointProblem::new(
                problem.layout().clone(),
                truth.clone(),
                problem.board.clone(),
                views,
                ReprojectionLoss::SumSquared
            ),
            Err(ParamError::IndexOutOfRange { what: "placement", .. })
        ));

        let mut views = problem.views().to_vec();
        views[1].points.pop();
        assert!(matches!(
            JointProblem::new(
                problem.layout().clone(),
                truth,
                problem.board.clone(),
                views,
                ReprojectionLoss::SumSquared
            ),
            Err(ParamError::PointCount { view: 1, .. })
        ));
    }
}
