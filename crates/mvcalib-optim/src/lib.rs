//! Joint nonlinear refinement of cameras, camera poses and board placements.
//!
//! The crate turns a set of per-image control-point observations into a
//! differentiable scalar objective and minimizes it with L-BFGS:
//!
//! - [`ParamLayout`] maps parameter blocks to a flat vector and keeps fixed
//!   blocks (the reference camera pose) out of it.
//! - [`JointProblem`] evaluates the per-image pipeline
//!   `placement → inverse(camera pose) → normalize → distort → project`
//!   and its exact gradient via `num-dual`.
//! - [`PointLoss`] / [`ReprojectionLoss`] select the per-point metric.
//! - [`minimize`] / [`refine`] drive argmin's L-BFGS until the parameter
//!   change falls below the tolerance.
//!
//! Observations that are NaN are skipped, so occluded or failed control
//! points never reach the objective.

mod lbfgs;
mod loss;
mod params;
mod problem;

pub use lbfgs::{minimize, refine, OptimReport, OptimizerConfig};
pub use loss::{PointLoss, ReprojectionLoss};
pub use params::{JointParams, ParamError, ParamLayout};
pub use problem::{JointProblem, ViewObservation, LOCAL_DIM};
