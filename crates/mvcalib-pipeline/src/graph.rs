//! Camera/placement pose graph and breadth-first fusion.
//!
//! Nodes live in an arena: cameras take ids `0..num_cameras`, placements
//! follow. Every co-observation adds a pair of mutually inverse edges, and
//! fusion writes one pose per node into a separate result vector.

use crate::error::CalibError;
use log::debug;
use mvcalib_core::Rigid;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// A frame in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Node {
    Camera(usize),
    Placement(usize),
}

/// Directed edge carrying the transform that maps `from`-frame points into
/// the `to` frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub from: Node,
    pub to: Node,
    pub transform: Rigid,
}

/// Fused poses, each mapping its node frame into the reference camera frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedPoses {
    pub reference_camera: usize,
    pub camera_poses: Vec<Rigid>,
    pub placement_poses: Vec<Rigid>,
}

/// Arena of camera and placement nodes plus an edge list keyed by
/// `(from, to)`.
#[derive(Debug, Clone, Serialize)]
pub struct PoseGraph {
    num_cameras: usize,
    num_placements: usize,
    edges: Vec<Edge>,
    #[serde(skip)]
    index: HashMap<(usize, usize), usize>,
    #[serde(skip)]
    adjacency: Vec<Vec<usize>>,
}

impl PoseGraph {
    pub fn new(num_cameras: usize, num_placements: usize) -> Self {
        Self {
            num_cameras,
            num_placements,
            edges: Vec::new(),
            index: HashMap::new(),
            adjacency: vec![Vec::new(); num_cameras + num_placements],
        }
    }

    pub fn num_nodes(&self) -> usize {
        self.num_cameras + self.num_placements
    }

    pub fn num_cameras(&self) -> usize {
        self.num_cameras
    }

    pub fn num_placements(&self) -> usize {
        self.num_placements
    }

    /// Edges in insertion order.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    fn node_id(&self, node: Node) -> Result<usize, CalibError> {
        match node {
            Node::Camera(c) if c < self.num_cameras => Ok(c),
            Node::Placement(p) if p < self.num_placements => Ok(self.num_cameras + p),
            Node::Camera(c) => Err(CalibError::NodeOutOfRange {
                kind: "camera",
                index: c,
                count: self.num_cameras,
            }),
            Node::Placement(p) => Err(CalibError::NodeOutOfRange {
                kind: "placement",
                index: p,
                count: self.num_placements,
            }),
        }
    }

    fn node(&self, id: usize) -> Node {
        if id < self.num_cameras {
            Node::Camera(id)
        } else {
            Node::Placement(id - self.num_cameras)
        }
    }

    /// Record that `camera` saw `placement`, with `cam_from_placement`
    /// mapping placement-frame points into the camera frame.
    ///
    /// Adds the placement→camera edge and its inverse. Returns `false` and
    /// leaves the graph unchanged when the pair is already connected.
    pub fn add_observation(
        &mut self,
        camera: usize,
        placement: usize,
        cam_from_placement: Rigid,
    ) -> Result<bool, CalibError> {
        let cam = self.node_id(Node::Camera(camera))?;
        let plc = self.node_id(Node::Placement(placement))?;
        if self.index.contains_key(&(plc, cam)) {
            debug!("duplicate observation of placement {placement} by camera {camera}, keeping first");
            return Ok(false);
        }
        self.push_edge(plc, cam, cam_from_placement);
        self.push_edge(cam, plc, cam_from_placement.inverse());
        Ok(true)
    }

    fn push_edge(&mut self, from: usize, to: usize, transform: Rigid) {
        self.index.insert((from, to), self.edges.len());
        self.edges.push(Edge {
            from: self.node(from),
            to: self.node(to),
            transform,
        });
        self.adjacency[from].push(to);
    }

    /// Transform of the edge `from → to`, if present.
    pub fn edge(&self, from: Node, to: Node) -> Option<&Rigid> {
        let key = (self.node_id(from).ok()?, self.node_id(to).ok()?);
        self.index.get(&key).map(|&i| &self.edges[i].transform)
    }

    /// Breadth-first fusion from `reference_camera`.
    ///
    /// The reference gets the identity; every newly reached child gets
    /// `pose(parent) ∘ edge(child → parent)`. Neighbours are visited in edge
    /// insertion order, so the result is deterministic.
    pub fn fuse(&self, reference_camera: usize) -> Result<FusedPoses, CalibError> {
        if reference_camera >= self.num_cameras {
            return Err(CalibError::ReferenceOutOfRange {
                reference: reference_camera,
                num_cameras: self.num_cameras,
            });
        }

        let mut poses: Vec<Option<Rigid>> = vec![None; self.num_nodes()];
        poses[reference_camera] = Some(Rigid::identity());
        let mut queue = VecDeque::from([reference_camera]);

        while let Some(parent) = queue.pop_front() {
            let Some(parent_pose) = poses[parent] else {
                continue;
            };
            for &child in &self.adjacency[parent] {
                if poses[child].is_some() {
                    continue;
                }
                let Some(&edge) = self.index.get(&(child, parent)) else {
                    continue;
                };
                poses[child] = Some(parent_pose.compose(&self.edges[edge].transform));
                debug!("fused {:?} via {:?}", self.node(child), self.node(parent));
                queue.push_back(child);
            }
        }

        let mut camera_poses = Vec::with_capacity(self.num_cameras);
        let mut placement_poses = Vec::with_capacity(self.num_placements);
        for (id, pose) in poses.into_iter().enumerate() {
            let pose = pose.ok_or(CalibError::DisconnectedGraph {
                node: self.node(id),
                reference: reference_camera,
            })?;
            if id < self.num_cameras {
                camera_poses.push(pose);
            } else {
                placement_poses.push(pose);
            }
        }

        Ok(FusedPoses {
            reference_camera,
            camera_poses,
            placement_poses,
        })
    }
}
