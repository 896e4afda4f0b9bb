//! Multi-camera calibration: per-camera calibration, pose-graph fusion and
//! a final joint refinement over every camera and placement.

use crate::config::CalibConfig;
use crate::detect::{FiducialDetector, Refiner, TaggedImage};
use crate::error::CalibError;
use crate::graph::PoseGraph;
use crate::single::{calibrate_single, check_point_counts, ensure_supported, refine_control_points};
use crate::types::{ImageObservation, ImageResult, MultiCalibration};
use log::{info, warn};
use mvcalib_core::{BoardGeometry, CalibImage};
use mvcalib_optim::{refine, JointParams, JointProblem, ParamLayout, ViewObservation};
use std::collections::BTreeSet;

/// Calibrate a multi-camera setup from raw, tagged images.
pub fn multi_calib<I, D, R>(
    images: &[TaggedImage<I>],
    board: &BoardGeometry,
    detector: &D,
    refiner: &R,
    config: &CalibConfig,
) -> Result<MultiCalibration, CalibError>
where
    I: CalibImage,
    D: FiducialDetector + ?Sized,
    R: Refiner + ?Sized,
{
    ensure_supported(refiner)?;
    dense_counts(images.iter().map(|t| (t.camera, t.placement)))?;

    let observations: Vec<ImageObservation> = images
        .iter()
        .map(|tagged| ImageObservation {
            name: tagged.image.name().to_string(),
            camera: tagged.camera,
            placement: tagged.placement,
            size: tagged.image.size(),
            points: refine_control_points(&tagged.image, board, detector, refiner),
        })
        .collect();
    calibrate_multi(&observations, board, config)
}

/// Calibrate a multi-camera setup from pre-refined control points.
///
/// Camera and placement indices must each form `0..n`. The reference camera
/// (`config.reference_camera`) defines the global frame and its pose stays
/// fixed during the joint refinement.
pub fn calibrate_multi(
    observations: &[ImageObservation],
    board: &BoardGeometry,
    config: &CalibConfig,
) -> Result<MultiCalibration, CalibError> {
    let (num_cameras, num_placements) =
        dense_counts(observations.iter().map(|o| (o.camera, o.placement)))?;
    if config.reference_camera >= num_cameras {
        return Err(CalibError::ReferenceOutOfRange {
            reference: config.reference_camera,
            num_cameras,
        });
    }
    check_point_counts(observations, board)?;

    let mut graph = PoseGraph::new(num_cameras, num_placements);
    let mut singles = Vec::with_capacity(num_cameras);
    for camera in 0..num_cameras {
        let indices: Vec<usize> = (0..observations.len())
            .filter(|&i| observations[i].camera == camera)
            .collect();
        let camera_obs: Vec<ImageObservation> =
            indices.iter().map(|&i| observations[i].clone()).collect();
        let single = calibrate_single(&camera_obs, board, config)?;

        for (&i, rigid) in indices.iter().zip(&single.rigids) {
            if !rigid.is_defined() {
                continue;
            }
            let placement = observations[i].placement;
            if !graph.add_observation(camera, placement, *rigid)? {
                warn!(
                    "{}: camera {camera} already observed placement {placement}, ignoring",
                    observations[i].name
                );
            }
        }
        singles.push(single);
    }

    let fused = graph.fuse(config.reference_camera)?;

    let base = JointParams {
        cameras: singles.iter().map(|s| s.camera).collect(),
        camera_poses: fused.camera_poses.clone(),
        placement_poses: fused.placement_poses.clone(),
    };
    let views = observations
        .iter()
        .map(|o| ViewObservation {
            camera: o.camera,
            placement: o.placement,
            points: o.points.clone(),
        })
        .collect();
    let layout = ParamLayout::new(
        config.intrinsics,
        config.distortion,
        num_cameras,
        num_placements,
        &[config.reference_camera],
    )?;
    let problem = JointProblem::new(layout, base, board.control_points_3d(), views, config.loss)?;

    info!("refining multi parameters");
    let (params, report) = refine(&problem, &config.optimizer)?;

    let images = observations
        .iter()
        .zip(problem.reproject(&params))
        .map(|(o, reprojected)| ImageResult {
            name: o.name.clone(),
            camera: o.camera,
            placement: o.placement,
            observed: o.points.clone(),
            reprojected,
        })
        .collect();

    Ok(MultiCalibration {
        stats: problem.stats(&params),
        cameras: params.cameras,
        camera_poses: params.camera_poses,
        placement_poses: params.placement_poses,
        images,
        graph,
        fused,
        singles,
        report,
    })
}

/// Number of cameras and placements, after checking that each index set is
/// exactly `0..n`.
fn dense_counts(tags: impl Iterator<Item = (usize, usize)>) -> Result<(usize, usize), CalibError> {
    let mut cameras = BTreeSet::new();
    let mut placements = BTreeSet::new();
    for (c, p) in tags {
        cameras.insert(c);
        placements.insert(p);
    }
    if cameras.is_empty() {
        return Err(CalibError::NoImages);
    }
    Ok((dense("camera", &cameras)?, dense("placement", &placements)?))
}

fn dense(what: &'static str, set: &BTreeSet<usize>) -> Result<usize, CalibError> {
    if set.iter().copied().eq(0..set.len()) {
        Ok(set.len())
    } else {
        Err(CalibError::NonDenseIndices {
            what,
            indices: set.iter().copied().collect(),
        })
    }
}
