//! Single-camera calibration.
//!
//! Homographies from the refined control points seed a square-pixel
//! intrinsic guess and one board pose per image; everything is then
//! refined jointly with the camera pose held at the identity.

use crate::config::CalibConfig;
use crate::detect::{ControlPointKind, FiducialDetector, Refiner};
use crate::error::CalibError;
use crate::types::{ImageObservation, ImageResult, SingleCalibration};
use log::{info, warn};
use mvcalib_core::{
    is_defined_mat3, is_defined_pt2, nan_pt2, transform_points, BoardGeometry, CalibImage,
    CameraModel, Distortion, Intrinsics, Mat3, Pt2, Rigid,
};
use mvcalib_linear::{dlt_homography, estimate_intrinsics_from_homographies, estimate_planar_pose_from_h};
use mvcalib_optim::{refine, JointParams, JointProblem, ParamLayout, ViewObservation};

/// Calibrate one camera from raw images.
///
/// Runs detection and control-point refinement per image, then
/// [`calibrate_single`] on the refined points.
pub fn single_calib<I, D, R>(
    images: &[I],
    board: &BoardGeometry,
    detector: &D,
    refiner: &R,
    config: &CalibConfig,
) -> Result<SingleCalibration, CalibError>
where
    I: CalibImage,
    D: FiducialDetector + ?Sized,
    R: Refiner + ?Sized,
{
    ensure_supported(refiner)?;
    let observations: Vec<ImageObservation> = images
        .iter()
        .enumerate()
        .map(|(i, image)| ImageObservation {
            name: image.name().to_string(),
            camera: 0,
            placement: i,
            size: image.size(),
            points: refine_control_points(image, board, detector, refiner),
        })
        .collect();
    calibrate_single(&observations, board, config)
}

/// Calibrate one camera from pre-refined control points.
///
/// The `camera` and `placement` tags of `observations` are carried into the
/// results but do not affect the computation: every image is its own
/// placement. Images whose homography or pose is undefined are skipped with
/// a warning and reported with NaN rigids and reprojections.
pub fn calibrate_single(
    observations: &[ImageObservation],
    board: &BoardGeometry,
    config: &CalibConfig,
) -> Result<SingleCalibration, CalibError> {
    let first = observations.first().ok_or(CalibError::NoImages)?;
    let camera_index = first.camera;
    check_point_counts(observations, board)?;

    let homographies: Vec<Mat3> = observations
        .iter()
        .map(|obs| board_homography(board, &obs.points))
        .collect();

    let kmtx = estimate_intrinsics_from_homographies(&homographies, first.size);
    if !is_defined_mat3(&kmtx) {
        return Err(CalibError::DegenerateIntrinsics {
            camera: camera_index,
        });
    }

    let mut rigids = vec![Rigid::undefined(); observations.len()];
    let mut usable = Vec::new();
    for (i, (obs, h)) in observations.iter().zip(&homographies).enumerate() {
        if !is_defined_mat3(h) {
            warn!("{}: homography undefined, skipping image", obs.name);
            continue;
        }
        let pose = estimate_planar_pose_from_h(&kmtx, h);
        if !pose.is_defined() {
            warn!("{}: extrinsic initialisation undefined, skipping image", obs.name);
            continue;
        }
        rigids[i] = pose;
        usable.push(i);
    }
    if usable.is_empty() {
        return Err(CalibError::NoUsableImages {
            camera: camera_index,
        });
    }

    let base = JointParams {
        cameras: vec![CameraModel::new(
            Intrinsics::from_k_matrix(config.intrinsics, &kmtx),
            Distortion::zeros(config.distortion),
        )],
        camera_poses: vec![Rigid::identity()],
        placement_poses: usable.iter().map(|&i| rigids[i]).collect(),
    };
    let views = usable
        .iter()
        .enumerate()
        .map(|(placement, &i)| ViewObservation {
            camera: 0,
            placement,
            points: observations[i].points.clone(),
        })
        .collect();
    let layout = ParamLayout::new(config.intrinsics, config.distortion, 1, usable.len(), &[0])?;
    let problem = JointProblem::new(layout, base, board.control_points_3d(), views, config.loss)?;

    info!("refining single parameters");
    let (params, report) = refine(&problem, &config.optimizer)?;

    let reprojected = problem.reproject(&params);
    let mut images: Vec<ImageResult> = observations
        .iter()
        .map(|obs| ImageResult {
            name: obs.name.clone(),
            camera: obs.camera,
            placement: obs.placement,
            observed: obs.points.clone(),
            reprojected: vec![nan_pt2(); obs.points.len()],
        })
        .collect();
    for (placement, &i) in usable.iter().enumerate() {
        rigids[i] = params.placement_poses[placement];
        images[i].reprojected = reprojected[placement].clone();
    }

    Ok(SingleCalibration {
        camera: params.cameras[0],
        rigids,
        images,
        stats: problem.stats(&params),
        report,
    })
}

/// Detect fiducials, seed the control points through the fiducial homography
/// and refine them. All points are NaN when the fiducials give no homography.
pub fn refine_control_points<I, D, R>(image: &I, board: &BoardGeometry, detector: &D, refiner: &R) -> Vec<Pt2>
where
    I: CalibImage + ?Sized,
    D: FiducialDetector + ?Sized,
    R: Refiner + ?Sized,
{
    info!("refining control points for {}", image.name());
    let gray = image.gray();
    let fiducials = detector.detect(&gray);
    let h = dlt_homography(&board.fiducials, &fiducials);
    if !is_defined_mat3(&h) {
        warn!("{}: fiducials give no homography", image.name());
        return vec![nan_pt2(); board.num_control_points()];
    }
    let initial = transform_points(&h, &board.control_points);
    let boundaries: Vec<Vec<Pt2>> = board
        .boundaries
        .iter()
        .map(|b| transform_points(&h, b))
        .collect();
    refiner.refine(&gray, &initial, &boundaries)
}

/// Only checker control points can be used: the homography fit treats the
/// refined points as exact images of the board points.
pub(crate) fn ensure_supported<R: Refiner + ?Sized>(refiner: &R) -> Result<(), CalibError> {
    match refiner.kind() {
        ControlPointKind::Checker => Ok(()),
        other => Err(CalibError::UnsupportedRefiner(format!(
            "{other:?} control points are not supported"
        ))),
    }
}

pub(crate) fn check_point_counts(
    observations: &[ImageObservation],
    board: &BoardGeometry,
) -> Result<(), CalibError> {
    for obs in observations {
        if obs.points.len() != board.num_control_points() {
            return Err(CalibError::PointCount {
                image: obs.name.clone(),
                expected: board.num_control_points(),
                actual: obs.points.len(),
            });
        }
    }
    Ok(())
}

/// Board-to-image homography from the defined control points only.
fn board_homography(board: &BoardGeometry, points: &[Pt2]) -> Mat3 {
    let (src, dst): (Vec<Pt2>, Vec<Pt2>) = board
        .control_points
        .iter()
        .zip(points)
        .filter(|(_, p)| is_defined_pt2(p))
        .map(|(b, p)| (*b, *p))
        .unzip();
    dlt_homography(&src, &dst)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mvcalib_core::synthetic::planar::{poses_around_board, project_board};
    use mvcalib_core::{DistortionKind, IntrinsicsKind};

    fn camera() -> CameraModel {
        CameraModel::new(
            Intrinsics::SingleFocal {
                f: 650.0,
                cx: 319.5,
                cy: 239.5,
            },
            Distortion::zeros(DistortionKind::RadTan4),
        )
    }

    fn observations(board: &BoardGeometry, n: usize) -> (Vec<ImageObservation>, Vec<Rigid>) {
        let poses = poses_around_board(board, n, 0.6, 0.5);
        let obs = poses
            .iter()
            .enumerate()
            .map(|(i, pose)| ImageObservation {
                name: format!("img{i:02}"),
                camera: 0,
                placement: i,
                size: (480, 640),
                points: project_board(&camera(), pose, board),
            })
            .collect();
        (obs, poses)
    }

    #[test]
    fn recovers_camera_from_exact_points() {
        let board = BoardGeometry::checker(8, 6, 0.03).unwrap();
        let (obs, poses) = observations(&board, 6);
        let calib = calibrate_single(&obs, &board, &CalibConfig::default()).unwrap();

        let (f, _, cx, cy) = calib.camera.intrinsics.focal_and_center();
        assert!((f - 650.0).abs() < 1e-3, "focal {f}");
        assert!((cx - 319.5).abs() < 1e-3 && (cy - 239.5).abs() < 1e-3);
        for (rigid, pose) in calib.rigids.iter().zip(&poses) {
            let (angle, dist) = rigid.distance(pose);
            assert!(angle < 1e-5 && dist < 1e-5, "pose error {angle} rad, {dist}");
        }
        assert!(calib.stats.rms < 1e-3, "rms {}", calib.stats.rms);
        assert_eq!(calib.images.len(), 6);
        assert!(calib.report.loss_history[0] >= calib.report.final_loss);
    }

    #[test]
    fn unusable_image_is_skipped() {
        let board = BoardGeometry::checker(8, 6, 0.03).unwrap();
        let (mut obs, _) = observations(&board, 5);
        obs[2].points = vec![nan_pt2(); board.num_control_points()];
        let calib = calibrate_single(&obs, &board, &CalibConfig::default()).unwrap();
        assert!(!calib.rigids[2].is_defined());
        assert!(calib.images[2].reprojected.iter().all(|p| !is_defined_pt2(p)));
        assert!(calib.rigids[3].is_defined());
        assert!(is_defined_pt2(&calib.images[3].reprojected[0]));
    }

    #[test]
    fn no_defined_homography_is_degenerate() {
        let board = BoardGeometry::checker(5, 4, 0.03).unwrap();
        let (mut obs, _) = observations(&board, 2);
        for o in &mut obs {
            o.camera = 3;
            o.points = vec![nan_pt2(); board.num_control_points()];
        }
        assert!(matches!(
            calibrate_single(&obs, &board, &CalibConfig::default()),
            Err(CalibError::DegenerateIntrinsics { camera: 3 })
        ));
    }

    #[test]
    fn bad_inputs_are_rejected() {
        let board = BoardGeometry::checker(5, 4, 0.03).unwrap();
        assert!(matches!(
            calibrate_single(&[], &board, &CalibConfig::default()),
            Err(CalibError::NoImages)
        ));
        let (mut obs, _) = observations(&board, 3);
        obs[1].points.pop();
        assert!(matches!(
            calibrate_single(&obs, &board, &CalibConfig::default()),
            Err(CalibError::PointCount { .. })
        ));
    }

    #[test]
    fn fxfy_model_is_supported() {
        let board = BoardGeometry::checker(8, 6, 0.03).unwrap();
        let (obs, _) = observations(&board, 6);
        let config = CalibConfig {
            intrinsics: IntrinsicsKind::FxFy,
            distortion: DistortionKind::None,
            ..CalibConfig::default()
        };
        let calib = calibrate_single(&obs, &board, &config).unwrap();
        assert_eq!(calib.camera.intrinsics.kind(), IntrinsicsKind::FxFy);
        assert_eq!(calib.camera.distortion.kind(), DistortionKind::None);
        let (f, _, _, _) = calib.camera.intrinsics.focal_and_center();
        assert!((f - 650.0).abs() < 1e-2, "focal {f}");
    }
}
