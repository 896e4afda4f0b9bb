//! Synthetic planar board observations.

use crate::{
    nan_pt2, rigid::rotation_from_axis_angle, BoardGeometry, CameraModel, Pt2, Pt3, Real, Rigid,
    Vec3,
};
use std::f64::consts::PI;

/// Planar grid of 3D points (Z=0), row-major.
pub fn grid_points(nx: usize, ny: usize, spacing: Real) -> Vec<Pt3> {
    let mut points = Vec::with_capacity(nx * ny);
    for j in 0..ny {
        for i in 0..nx {
            points.push(Pt3::new(i as Real * spacing, j as Real * spacing, 0.0));
        }
    }
    points
}

/// `n` camera-from-board poses looking at the board centre from varied tilts.
///
/// The tilt axis rotates around the optical axis from pose to pose and the
/// tilt magnitude cycles between 50% and 100% of `max_tilt_rad`, which keeps
/// the homographies far from fronto-parallel.
pub fn poses_around_board(
    board: &BoardGeometry,
    n: usize,
    distance: Real,
    max_tilt_rad: Real,
) -> Vec<Rigid> {
    let center = board_center(board);
    (0..n)
        .map(|i| {
            let phase = 2.0 * PI * i as Real / n.max(1) as Real;
            let tilt = max_tilt_rad * (0.5 + 0.25 * (i % 3) as Real);
            let axis = Vec3::new(phase.cos(), phase.sin(), 0.0);
            let roll = Vec3::new(0.0, 0.0, 0.15 * ((i % 5) as Real - 2.0));
            let rotation = rotation_from_axis_angle(&roll) * rotation_from_axis_angle(&(axis * tilt));

            let z = distance * (1.0 + 0.08 * (i % 4) as Real);
            let offset = Vec3::new(0.04 * distance * phase.sin(), 0.04 * distance * phase.cos(), z);
            Rigid::new(rotation, offset - rotation * center.coords)
        })
        .collect()
}

/// Centre of the control-point bounding box on the board plane.
pub fn board_center(board: &BoardGeometry) -> Pt3 {
    let (mut min, mut max) = (Pt2::new(Real::MAX, Real::MAX), Pt2::new(Real::MIN, Real::MIN));
    for p in &board.control_points {
        min = Pt2::new(min.x.min(p.x), min.y.min(p.y));
        max = Pt2::new(max.x.max(p.x), max.y.max(p.y));
    }
    Pt3::new(0.5 * (min.x + max.x), 0.5 * (min.y + max.y), 0.0)
}

/// Exact pixel projections of the board control points.
pub fn project_board(camera: &CameraModel, cam_from_board: &Rigid, board: &BoardGeometry) -> Vec<Pt2> {
    camera.project_points(cam_from_board, &board.control_points_3d())
}

/// Exact pixel projections of the board fiducials.
pub fn project_fiducials(camera: &CameraModel, cam_from_board: &Rigid, board: &BoardGeometry) -> [Pt2; 4] {
    let lift = |p: &Pt2| camera.project_point(&cam_from_board.transform_point(&Pt3::new(p.x, p.y, 0.0)));
    [
        lift(&board.fiducials[0]),
        lift(&board.fiducials[1]),
        lift(&board.fiducials[2]),
        lift(&board.fiducials[3]),
    ]
}

/// Replace the listed points with the undefined sentinel.
pub fn occlude(points: &mut [Pt2], indices: &[usize]) {
    for &i in indices {
        if let Some(p) = points.get_mut(i) {
            *p = nan_pt2();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{is_defined_pt2, Distortion, Intrinsics};

    #[test]
    fn grid_points_order_is_stable() {
        let pts = grid_points(2, 3, 0.5);
        assert_eq!(pts.len(), 6);
        assert_eq!(pts[1], Pt3::new(0.5, 0.0, 0.0));
        assert_eq!(pts[2], Pt3::new(0.0, 0.5, 0.0));
    }

    #[test]
    fn poses_keep_board_in_front_of_camera() {
        let board = BoardGeometry::checker(8, 6, 0.025).unwrap();
        let poses = poses_around_board(&board, 10, 0.5, 0.4);
        assert_eq!(poses.len(), 10);
        for pose in &poses {
            let det = pose.rotation.determinant();
            assert!((det - 1.0).abs() < 1e-12);
            for p in board.control_points_3d() {
                assert!(pose.transform_point(&p).z > 0.2);
            }
        }
    }

    #[test]
    fn board_projects_inside_a_vga_sensor() {
        let board = BoardGeometry::checker(8, 6, 0.025).unwrap();
        let cam = CameraModel::new(
            Intrinsics::SingleFocal {
                f: 600.0,
                cx: 319.5,
                cy: 239.5,
            },
            Distortion::None,
        );
        for pose in poses_around_board(&board, 6, 0.5, 0.4) {
            let mut pixels = project_board(&cam, &pose, &board);
            assert!(pixels
                .iter()
                .all(|p| p.x > 0.0 && p.x < 640.0 && p.y > 0.0 && p.y < 480.0));
            occlude(&mut pixels, &[3]);
            assert!(!is_defined_pt2(&pixels[3]));
            assert!(is_defined_pt2(&pixels[2]));
        }
    }
}
