//! Optimization state

use std::collections::VecDeque;
use num_traits::Float;
use compstep_core::enums::*;

/// State of one optimization run.
///
/// Created from an initial guess, threaded through [`crate::Solver::solve`] and mutated once per outer iteration.
/// On return `x` (and `y` for equality-constrained problems) holds the last accepted iterate.
/// State manipulators see and may modify it at every [`OptimizationLocation`].
#[derive(Debug, Clone)]
pub struct State<F: Float>
{
    /// Current iterate.
    pub x: Vec<F>,
    /// Current step.
    pub dx: Vec<F>,
    /// Quasinormal step of the trust-region method.
    pub dx_n: Vec<F>,
    /// Cauchy point of the quasinormal step before cut by the trust region or the safeguard.
    pub dx_ncp: Vec<F>,
    /// Tangential step of the trust-region method.
    pub dx_t: Vec<F>,
    /// Direction of the line search, kept until the next one is computed.
    pub dx_dir: Vec<F>,
    /// Multiplier estimate of the equality constraint.
    pub y: Vec<F>,
    /// Gradient of the Lagrangian, including the barrier term.
    pub grad: Vec<F>,
    /// Equality constraint \\(g(x)\\).
    pub g_x: Vec<F>,
    /// Inequality constraint \\(h(x)\\).
    pub h_x: Vec<F>,

    /// Previous iterate.
    pub x_old: Vec<F>,
    /// Gradient of the barrier objective at the previous iterate.
    pub grad_old: Vec<F>,
    /// Difference of the gradient of the Lagrangian made by the last accepted step.
    pub dgrad: Vec<F>,

    /// Stored steps of the limited-memory quasi-Newton operators, newest first.
    pub old_s: VecDeque<Vec<F>>,
    /// Stored gradient differences paired with `old_s`.
    pub old_y: VecDeque<Vec<F>>,

    /// Objective value \\(f(x)\\).
    pub f_x: F,
    /// Trust-region radius.
    pub delta: F,
    /// Barrier parameter.
    pub mu: F,
    /// Penalty of the equality constraint violation.
    pub rho: F,
    /// Step length of the line search.
    pub alpha: F,
    /// Initial step length of the next line search.
    pub alpha0: F,

    /// Norm of `grad`.
    pub norm_grad: F,
    /// Norm of `grad` at the start, which relative tolerances refer to.
    pub norm_grad_typ: F,
    /// Norm of `dx`.
    pub norm_dx: F,
    /// Norm of the first accepted step, which relative tolerances refer to.
    pub norm_dx_typ: F,
    /// Norm of `g_x`.
    pub norm_g: F,
    /// Norm of `g_x` at the start, which relative tolerances refer to.
    pub norm_g_typ: F,

    /// Actual reduction of the merit function by the last step.
    pub ared: F,
    /// Predicted reduction of the merit function by the last step.
    pub pred: F,

    /// Number of accepted outer iterations.
    pub iter: usize,
    /// Number of consecutive rejected steps.
    pub rejected: usize,
    /// Number of rejected steps in the whole run.
    pub rejected_total: usize,
    /// Krylov iterations of the last tangential step.
    pub krylov_iter: usize,
    /// Krylov iterations of the whole run.
    pub krylov_iter_total: usize,
    /// Function evaluations of the last line search.
    pub linesearch_iter: usize,
    /// Function evaluations of the line searches in the whole run.
    pub linesearch_iter_total: usize,

    /// Why the last tangential step stopped.
    pub truncated_stop: TruncatedStop,
    /// How the last quasinormal step was determined.
    pub qn_stop: QuasinormalStop,
    /// Why the optimization stopped, [`OptimizationStop::NotConverged`] while running.
    pub opt_stop: OptimizationStop,

    /// Algorithm of this run.
    pub algorithm_class: AlgorithmClass,
    /// Class of the problem of this run.
    pub problem_class: ProblemClass,
    /// Hessian approximation of this run.
    pub h_type: OperatorKind,
    /// Preconditioner of this run.
    pub precond: OperatorKind,
    /// When the diagnostics run.
    pub dscheme: DiagnosticScheme,
}

impl<F: Float> State<F>
{
    /// Creates an instance from an initial guess.
    /// * `x0` is the initial guess \\(x_0\\).
    ///   For inequality-constrained problems \\(h(x_0)\\) shall be strictly feasible.
    pub fn new(x0: &[F]) -> Self
    {
        let n = x0.len();
        let f0 = F::zero();
        let f1 = F::one();

        State {
            x: x0.to_vec(),
            dx: vec![f0; n],
            dx_n: vec![f0; n],
            dx_ncp: vec![f0; n],
            dx_t: vec![f0; n],
            dx_dir: vec![f0; n],
            y: Vec::new(),
            grad: vec![f0; n],
            g_x: Vec::new(),
            h_x: Vec::new(),

            x_old: vec![f0; n],
            grad_old: vec![f0; n],
            dgrad: vec![f0; n],

            old_s: VecDeque::new(),
            old_y: VecDeque::new(),

            f_x: F::nan(),
            delta: f1,
            mu: f1,
            rho: f1,
            alpha: f1,
            alpha0: f1,

            norm_grad: F::nan(),
            norm_grad_typ: F::nan(),
            norm_dx: F::nan(),
            norm_dx_typ: F::nan(),
            norm_g: f0,
            norm_g_typ: f0,

            ared: F::nan(),
            pred: F::nan(),

            iter: 0,
            rejected: 0,
            rejected_total: 0,
            krylov_iter: 0,
            krylov_iter_total: 0,
            linesearch_iter: 0,
            linesearch_iter_total: 0,

            truncated_stop: TruncatedStop::NotConverged,
            qn_stop: QuasinormalStop::Skipped,
            opt_stop: OptimizationStop::NotConverged,

            algorithm_class: AlgorithmClass::TrustRegion,
            problem_class: ProblemClass::Unconstrained,
            h_type: OperatorKind::Identity,
            precond: OperatorKind::Identity,
            dscheme: DiagnosticScheme::Never,
        }
    }

    /// Sets the initial multiplier estimate of the equality constraint.
    ///
    /// Without this the multipliers start from the least-squares estimate.
    pub fn with_y(mut self, y0: &[F]) -> Self
    {
        self.y = y0.to_vec();
        self
    }

    /// Dimension of the iterate.
    pub fn dim(&self) -> usize
    {
        self.x.len()
    }
}
