//! L-BFGS driver with a parameter-change stopping rule.
//!
//! A single argmin L-BFGS run (More-Thuente line search) carries its
//! curvature history across iterations. The solver is wrapped so that every
//! accepted step is logged with its parameter-change norm, and the run stops
//! once that norm drops below `convergence_tolerance` or after
//! `max_iterations` steps.
//!
//! The optimizer works on a conditioned vector: intrinsic entries are divided
//! by their starting magnitude (see [`ParamLayout::scales`]), so focal lengths
//! in pixels and rotations in radians move on comparable scales.
//!
//! [`ParamLayout::scales`]: crate::ParamLayout::scales

use crate::loss::PointLoss;
use crate::params::{JointParams, ParamError};
use crate::problem::JointProblem;
use argmin::core::{
    CostFunction, Error, Executor, Gradient, IterState, Problem, Solver, State, TerminationReason,
    TerminationStatus, KV,
};
use argmin::solver::linesearch::MoreThuenteLineSearch;
use argmin::solver::quasinewton::LBFGS;
use log::{debug, info, warn};
use mvcalib_core::Real;
use serde::{Deserialize, Serialize};

type LbfgsState = IterState<Vec<Real>, Vec<Real>, (), (), (), Real>;

/// Stopping rule and L-BFGS settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Iteration cap.
    pub max_iterations: usize,
    /// Stop when `|x_k - x_{k-1}|` (conditioned vector) falls below this.
    pub convergence_tolerance: Real,
    /// L-BFGS history length.
    pub memory: usize,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            max_iterations: 500,
            convergence_tolerance: 1e-6,
            memory: 7,
        }
    }
}

/// Trail of one refinement run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptimReport {
    /// Loss before the first iteration followed by one entry per iteration.
    pub loss_history: Vec<Real>,
    pub iterations: usize,
    /// `true` when the step norm fell below the tolerance, or when no descent
    /// step exists from the current parameters (a numerical stationary point).
    pub converged: bool,
    pub final_loss: Real,
}

/// Joint loss seen through the conditioning scales: the solver variable is
/// `z = x / scales`.
struct Objective<'a, L: PointLoss> {
    problem: &'a JointProblem<L>,
    scales: Vec<Real>,
}

impl<L: PointLoss> Objective<'_, L> {
    fn condition(&self, x: &[Real]) -> Vec<Real> {
        x.iter().zip(&self.scales).map(|(x, s)| x / s).collect()
    }

    fn uncondition(&self, z: &[Real]) -> Vec<Real> {
        z.iter().zip(&self.scales).map(|(z, s)| z * s).collect()
    }
}

impl<L: PointLoss> CostFunction for Objective<'_, L> {
    type Param = Vec<Real>;
    type Output = Real;

    fn cost(&self, z: &Self::Param) -> Result<Self::Output, Error> {
        Ok(self.problem.loss(&self.uncondition(z)))
    }
}

impl<L: PointLoss> Gradient for Objective<'_, L> {
    type Param = Vec<Real>;
    type Gradient = Vec<Real>;

    fn gradient(&self, z: &Self::Param) -> Result<Self::Gradient, Error> {
        let (_, grad) = self.problem.loss_and_gradient(&self.uncondition(z));
        Ok(grad.iter().zip(&self.scales).map(|(g, s)| g * s).collect())
    }
}

/// Why a run ended without a usable step.
#[derive(Debug, Clone, PartialEq)]
enum StepFailure {
    /// The line search found no acceptable step along the search direction.
    LineSearch(String),
    NonFiniteLoss,
}

/// Quasi-Newton solver with the step-norm stopping rule and the
/// per-iteration log line.
///
/// A failed step does not abort the executor: the state from before the
/// step is returned, terminated, so the accepted parameters survive.
struct StepNormDriver<S> {
    inner: S,
    tolerance: Real,
    first_iteration: usize,
    iterations: usize,
    last_norm: Option<Real>,
    losses: Vec<Real>,
    failure: Option<StepFailure>,
}

impl<S> StepNormDriver<S> {
    fn new(inner: S, tolerance: Real, first_iteration: usize) -> Self {
        Self {
            inner,
            tolerance,
            first_iteration,
            iterations: 0,
            last_norm: None,
            losses: Vec::new(),
            failure: None,
        }
    }

    fn fail(&mut self, previous: LbfgsState, failure: StepFailure) -> (LbfgsState, Option<KV>) {
        let reason = match &failure {
            StepFailure::LineSearch(msg) => msg.clone(),
            StepFailure::NonFiniteLoss => "non-finite loss".to_string(),
        };
        self.failure = Some(failure);
        (previous.terminate_with(TerminationReason::SolverExit(reason)), None)
    }
}

impl<O, S> Solver<O, LbfgsState> for StepNormDriver<S>
where
    S: Solver<O, LbfgsState>,
{
    const NAME: &'static str = "L-BFGS (step-norm termination)";

    fn init(
        &mut self,
        problem: &mut Problem<O>,
        state: LbfgsState,
    ) -> Result<(LbfgsState, Option<KV>), Error> {
        self.inner.init(problem, state)
    }

    fn next_iter(
        &mut self,
        problem: &mut Problem<O>,
        state: LbfgsState,
    ) -> Result<(LbfgsState, Option<KV>), Error> {
        let previous = state.clone();
        let (next, kv) = match self.inner.next_iter(problem, state) {
            Ok(step) => step,
            Err(err) => return Ok(self.fail(previous, StepFailure::LineSearch(err.to_string()))),
        };

        let loss = next.get_cost();
        if !loss.is_finite() {
            return Ok(self.fail(previous, StepFailure::NonFiniteLoss));
        }
        let norm = match (previous.get_param(), next.get_param()) {
            (Some(a), Some(b)) => a
                .iter()
                .zip(b)
                .map(|(a, b)| (a - b) * (a - b))
                .sum::<Real>()
                .sqrt(),
            _ => Real::INFINITY,
        };
        let it = self.first_iteration + self.iterations;
        info!("iteration {it:03} - norm {norm:10.5} - loss {loss:10.5}");

        self.iterations += 1;
        self.last_norm = Some(norm);
        self.losses.push(loss);
        Ok((next, kv))
    }

    fn terminate(&mut self, state: &LbfgsState) -> TerminationStatus {
        if self.last_norm.is_some_and(|norm| norm < self.tolerance) {
            return TerminationStatus::Terminated(TerminationReason::SolverConverged);
        }
        self.inner.terminate(state)
    }
}

/// Minimize the joint loss starting at `x0`.
///
/// Returns the best parameters seen and the report. Non-convergence is not an
/// error: the run simply ends at `max_iterations`. When the line search
/// fails mid-run the solver restarts from the accepted parameters with an
/// empty history; when it fails on the first, steepest-descent step of a
/// fresh run, the current point is a numerical stationary point and the run
/// is reported as converged.
pub fn minimize<L: PointLoss>(
    problem: &JointProblem<L>,
    x0: Vec<Real>,
    config: &OptimizerConfig,
) -> (Vec<Real>, OptimReport) {
    let objective_scales = problem.layout().scales(&x0);
    let mut loss = problem.loss(&x0);
    let mut report = OptimReport {
        loss_history: vec![loss],
        ..OptimReport::default()
    };

    if x0.is_empty() {
        report.converged = true;
        report.final_loss = loss;
        return (x0, report);
    }
    if !loss.is_finite() {
        warn!("initial loss is not finite, skipping refinement");
        report.final_loss = loss;
        return (x0, report);
    }

    let conditioner = Objective {
        problem,
        scales: objective_scales.clone(),
    };
    let mut z = conditioner.condition(&x0);

    while report.iterations < config.max_iterations {
        let remaining = (config.max_iterations - report.iterations) as u64;
        // Stopping is left to the step-norm rule and the iteration cap.
        let solver = match LBFGS::new(MoreThuenteLineSearch::new(), config.memory.max(1))
            .with_tolerance_grad(0.0)
            .and_then(|solver| solver.with_tolerance_cost(0.0))
        {
            Ok(solver) => solver,
            Err(err) => {
                warn!("could not configure L-BFGS: {err}");
                break;
            }
        };
        let driver = StepNormDriver::new(solver, config.convergence_tolerance, report.iterations);
        let objective = Objective {
            problem,
            scales: objective_scales.clone(),
        };
        let start = z.clone();
        let run = Executor::new(objective, driver)
            .configure(|state| state.param(start).max_iters(remaining))
            .run();

        let res = match run {
            Ok(res) => res,
            Err(err) => {
                warn!("quasi-Newton solver could not start: {err}");
                break;
            }
        };
        let driver = &res.solver;
        report.loss_history.extend_from_slice(&driver.losses);
        report.iterations += driver.iterations;
        if let Some(best) = res.state.get_best_param() {
            z = best.clone();
            loss = res.state.get_best_cost();
        }

        match (&driver.failure, res.state.get_termination_reason()) {
            (Some(StepFailure::NonFiniteLoss), _) => {
                warn!("loss became non-finite, keeping the last finite parameters");
                break;
            }
            (Some(StepFailure::LineSearch(msg)), _) if driver.iterations == 0 => {
                debug!("no descent step from a fresh start ({msg}), stationary point reached");
                report.converged = true;
                break;
            }
            (Some(StepFailure::LineSearch(msg)), _) => {
                warn!("line search failed ({msg}), restarting from the accepted parameters");
            }
            (None, Some(TerminationReason::SolverConverged)) => {
                report.converged = true;
                break;
            }
            (None, _) => break,
        }
    }

    report.final_loss = loss;
    (conditioner.uncondition(&z), report)
}

/// Refine every optimizable block of `problem`, starting from its base values.
pub fn refine<L: PointLoss>(
    problem: &JointProblem<L>,
    config: &OptimizerConfig,
) -> Result<(JointParams, OptimReport), ParamError> {
    let x0 = problem.initial_params()?;
    let (x, report) = minimize(problem, x0, config);
    Ok((problem.params_from(&x)?, report))
}
