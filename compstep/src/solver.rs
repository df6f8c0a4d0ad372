//! Composite-step solver

use core::fmt::{Debug, LowerExp};
use core::marker::PhantomData;
use num_traits::{Float, Zero, One};
use compstep_core::solver::{JordanAlg, LinAlg, Operator, SliceLike, SolverError};
use compstep_core::enums::*;
use compstep_core::trace::Failure;
use crate::{Functions, State, SolverParam, ParamError};
use crate::{Messaging, StdMessaging, StateManipulator, NoManipulator};
use crate::functions::JacobianOp;
use crate::lagrangian::{self, LagrangianHess, ModelOp};
use crate::quasi_newton::{QuasiNewton, push_history};
use crate::{diagnostics, format};

//

/// Composite-step solver
///
/// <script src="https://polyfill.io/v3/polyfill.min.js?features=es6"></script>
/// <script id="MathJax-script" async src="https://cdn.jsdelivr.net/npm/mathjax@3/es5/tex-mml-chtml.js"></script>
///
/// Solves
/// \\[
/// \begin{array}{ll}
/// {\rm minimize} & f(x) \\\\
/// {\rm subject \ to} & g(x) = 0 \\\\
/// & h(x) \succeq 0
/// \end{array}
/// \\]
/// by a composite-step trust-region method, or by a line-search method when \\(g\\) is absent.
/// The inequality constraint is handled by a log-barrier whose parameter \\(\mu\\) shrinks
/// as the iterates approach a stationary point of the barrier problem.
pub struct Solver<L: JordanAlg>
{
    ph_l: PhantomData<L>,
    /// Solver parameters.
    pub par: SolverParam<L::F>,
}

impl<L: JordanAlg> Default for Solver<L>
{
    fn default() -> Self
    {
        Self::new()
    }
}

impl<L: JordanAlg> Solver<L>
{
    /// Creates an instance.
    ///
    /// Returns [`Solver`] instance.
    pub fn new() -> Self
    {
        Solver {
            ph_l: PhantomData,
            par: SolverParam::default(),
        }
    }

    /// Changes solver parameters.
    ///
    /// Returns [`Solver`] with its parameters changed.
    /// * `f` is a function to change parameters given by its argument.
    pub fn par<P>(mut self, f: P) -> Self
    where P: FnOnce(&mut SolverParam<L::F>)
    {
        f(&mut self.par);
        self
    }
}

impl<L: JordanAlg> Solver<L>
where L::F: Debug + LowerExp
{
    /// Starts to solve an optimization problem.
    ///
    /// Messages go to the standard output and a fatal failure terminates the process;
    /// use [`Solver::solve_with`] to change that.
    ///
    /// Returns `Ok` with the reason why the optimization stopped,
    /// or `Err` with the failure trace if it cannot be carried on.
    /// * `fns` is the functions of the problem.
    /// * `state` is the initial state on entry, the final one on exit.
    pub fn solve(&self, fns: &Functions<L>, state: &mut State<L::F>) -> Result<OptimizationStop, Failure>
    {
        self.solve_with(fns, state, StdMessaging, &mut NoManipulator)
    }

    /// Starts to solve an optimization problem with a messaging and a state manipulator.
    ///
    /// Returns `Ok` with the reason why the optimization stopped,
    /// or `Err` with the failure trace if it cannot be carried on.
    /// * `fns` is the functions of the problem.
    /// * `state` is the initial state on entry, the final one on exit.
    /// * `msg` receives the iteration table and the failures.
    /// * `smanip` is called at every [`OptimizationLocation`].
    pub fn solve_with<M, S>(&self, fns: &Functions<L>, state: &mut State<L::F>, msg: M, smanip: &mut S) -> Result<OptimizationStop, Failure>
    where M: Messaging, S: StateManipulator<L> + ?Sized
    {
        let (m_g, m_h) = fns.dims();

        let mut core = SolverCore {
            par: &self.par,
            fns,
            msg,
            smanip,
            n: state.x.len(),
            m_g,
            m_h,
        };

        core.run(state)
    }
}

//

/// Point evaluated by a step.
pub(crate) struct Trial<F>
{
    pub(crate) x: Vec<F>,
    pub(crate) f_x: F,
    pub(crate) g_x: Vec<F>,
    pub(crate) h_x: Vec<F>,
}

pub(crate) struct SolverCore<'a, L, M, S>
where L: JordanAlg, M: Messaging, S: StateManipulator<L> + ?Sized
{
    pub(crate) par: &'a SolverParam<L::F>,
    pub(crate) fns: &'a Functions<'a, L>,
    pub(crate) msg: M,
    pub(crate) smanip: &'a mut S,
    pub(crate) n: usize,
    pub(crate) m_g: usize,
    pub(crate) m_h: usize,
}

impl<'a, L, M, S> SolverCore<'a, L, M, S>
where L: JordanAlg, L::F: Debug + LowerExp, M: Messaging, S: StateManipulator<L> + ?Sized
{
    fn run(&mut self, state: &mut State<L::F>) -> Result<OptimizationStop, Failure>
    {
        log::info!("----- Initializing");
        log::debug!("{:?}", self.par);

        self.manip(state, OptimizationLocation::BeginningOfOptimization);

        let problem_class = self.fns.problem_class();
        self.check(state, problem_class)?;
        self.init_state(state, problem_class);

        if self.par.dscheme != DiagnosticScheme::Never {
            self.diagnose(state);
            if state.opt_stop != OptimizationStop::NotConverged {
                return self.finish(state);
            }
            if self.par.dscheme == DiagnosticScheme::DiagnosticsOnly {
                state.opt_stop = OptimizationStop::UserDefined;
                return self.finish(state);
            }
        }

        self.manip(state, OptimizationLocation::BeforeInitialFuncAndGrad);

        let mut g_x = vec![L::F::zero(); self.m_g];
        let mut h_x = vec![L::F::zero(); self.m_h];
        state.f_x = self.eval_at(&state.x, &mut g_x, &mut h_x);
        state.g_x = g_x;
        state.h_x = h_x;

        if !lagrangian::barrier_obj::<L>(state.f_x, &state.h_x, state.mu).is_finite() {
            log::error!("initial point: f(x) {:.2e}, not strictly feasible or not finite", state.f_x);
            state.opt_stop = if self.m_h > 0 {
                OptimizationStop::InteriorPointInstability
            }
            else {
                OptimizationStop::GlobalizationFailure
            };
            return self.finish(state);
        }

        let init_y = state.y.len() != self.m_g;
        if init_y {
            state.y = vec![L::F::zero(); self.m_g];
        }
        if let Err(e) = self.update_grad(state, init_y) {
            self.step_failure(state, e, "Initial gradient")?;
            return self.finish(state);
        }
        state.norm_grad_typ = state.norm_grad;
        state.norm_g_typ = state.norm_g;

        self.manip(state, OptimizationLocation::AfterInitialFuncAndGrad);

        self.print_table(state, true);
        self.print_table(state, false);

        self.manip(state, OptimizationLocation::BeforeOptimizationLoop);

        log::info!("----- Started");

        loop {
            self.manip(state, OptimizationLocation::BeginningOfOptimizationLoop);

            self.update_mu(state)?;

            let stop = self.check_stop(state);
            if stop != OptimizationStop::NotConverged {
                state.opt_stop = stop;
                break;
            }

            if state.iter > 0 && self.par.dscheme == DiagnosticScheme::EveryIteration {
                self.diagnose(state);
                if state.opt_stop != OptimizationStop::NotConverged {
                    break;
                }
            }

            self.manip(state, OptimizationLocation::BeforeSaveOld);
            self.save_old(state);

            self.manip(state, OptimizationLocation::BeforeStep);
            state.rejected = 0;

            match self.par.algorithm_class {
                AlgorithmClass::TrustRegion => self.tr_step(state)?,
                AlgorithmClass::LineSearch => self.ls_step(state)?,
                AlgorithmClass::UserDefined => self.user_step(state)?,
            }
            if state.opt_stop != OptimizationStop::NotConverged {
                break;
            }

            self.manip(state, OptimizationLocation::BeforeQuasi);
            self.update_quasi(state);
            self.manip(state, OptimizationLocation::AfterQuasi);

            state.iter += 1;
            if state.iter == 1 {
                state.norm_dx_typ = state.norm_dx;
            }

            log::debug!("{}: f {:.2e} grad {:.2e} dx {:.2e} g {:.2e} mu {:.2e}",
                state.iter, state.f_x, state.norm_grad, state.norm_dx, state.norm_g, state.mu);
            self.print_table(state, false);

            self.manip(state, OptimizationLocation::EndOfOptimizationIteration);
        }

        self.finish(state)
    }

    fn finish(&mut self, state: &mut State<L::F>) -> Result<OptimizationStop, Failure>
    {
        match state.opt_stop {
            OptimizationStop::GradientSmall | OptimizationStop::StepSmall => log::info!("----- Converged"),
            OptimizationStop::UserDefined => log::info!("----- {}", state.opt_stop),
            _ => log::warn!("----- {}", state.opt_stop),
        }

        if self.par.msg_level >= 1 {
            self.msg.print(&format!("Optimization stopped: {}", state.opt_stop));
        }

        self.manip(state, OptimizationLocation::EndOfOptimization);

        Ok(state.opt_stop)
    }

    pub(crate) fn manip(&mut self, state: &mut State<L::F>, loc: OptimizationLocation)
    {
        log::trace!("{}", loc);
        self.smanip.eval(self.fns, state, loc);
    }

    fn check(&self, state: &State<L::F>, problem_class: ProblemClass) -> Result<(), Failure>
    {
        let n = self.n;

        let par_err = if let Err(e) = self.par.validate(problem_class) {
            Some(e)
        }
        else if self.par.precond == OperatorKind::UserDefined && self.fns.precond.is_none() {
            Some(ParamError::InvalidOperator("precond"))
        }
        else {
            None
        };
        if let Some(e) = par_err {
            log::error!("{}", e);
            return Err(self.msg.error(Failure::from_error(&e).context("Invalid parameters")));
        }

        let g_ok = self.fns.g.map_or(true, |g| g.size().1 == n);
        let h_ok = self.fns.h.map_or(true, |h| h.size().1 == n);
        let p_ok = self.fns.precond.map_or(true, |p| p.size() == (n, n));
        let y_ok = state.y.is_empty() || state.y.len() == self.m_g;
        if !(g_ok && h_ok && p_ok && y_ok) {
            log::error!("Size mismatch: x {}, g{:?}, h{:?}, precond{:?}, y {}", n,
                self.fns.g.map(|g| g.size()), self.fns.h.map(|h| h.size()), self.fns.precond.map(|p| p.size()), state.y.len());
            return Err(self.msg.error(Failure::from_error(&SolverError::InvalidOp).context("Invalid problem")));
        }

        Ok(())
    }

    fn init_state(&self, state: &mut State<L::F>, problem_class: ProblemClass)
    {
        let n = self.n;
        let f0 = L::F::zero();
        let f1 = L::F::one();

        state.algorithm_class = self.par.algorithm_class;
        state.problem_class = problem_class;
        state.h_type = self.par.h_type;
        state.precond = self.par.precond;
        state.dscheme = self.par.dscheme;

        for v in [&mut state.dx, &mut state.dx_n, &mut state.dx_ncp, &mut state.dx_t, &mut state.dx_dir,
                  &mut state.grad, &mut state.x_old, &mut state.grad_old, &mut state.dgrad] {
            v.clear();
            v.resize(n, f0);
        }
        state.g_x = vec![f0; self.m_g];
        state.h_x = vec![f0; self.m_h];
        state.old_s.clear();
        state.old_y.clear();

        state.delta = self.par.delta;
        state.mu = if self.m_h > 0 {self.par.mu} else {f0};
        state.rho = self.par.rho;
        state.alpha = f1;
        state.alpha0 = f1;

        state.norm_dx = L::F::nan();
        state.norm_dx_typ = L::F::nan();
        state.ared = L::F::nan();
        state.pred = L::F::nan();

        state.iter = 0;
        state.rejected = 0;
        state.rejected_total = 0;
        state.krylov_iter = 0;
        state.krylov_iter_total = 0;
        state.linesearch_iter = 0;
        state.linesearch_iter_total = 0;

        state.truncated_stop = TruncatedStop::NotConverged;
        state.qn_stop = QuasinormalStop::Skipped;
        state.opt_stop = OptimizationStop::NotConverged;
    }

    fn diagnose(&self, state: &mut State<L::F>)
    {
        let ok = diagnostics::run(self.fns, &state.x, self.par.f_diag, self.par.x_diag, &self.msg);
        if !ok {
            log::warn!("diagnostics found a non-finite value");
            state.opt_stop = OptimizationStop::GlobalizationFailure;
        }
    }

    // Maps a failure of an auxiliary solve either to a stopping reason or to a fatal failure.
    pub(crate) fn step_failure(&self, state: &mut State<L::F>, e: SolverError, context: &str) -> Result<(), Failure>
    {
        match e {
            SolverError::NumericalInstability => {
                log::warn!("{}: {}", context, e);
                state.opt_stop = OptimizationStop::GlobalizationFailure;
                Ok(())
            },
            _ => {
                log::error!("{}: {}", context, e);
                Err(self.msg.error(Failure::from_error(&e).context(context)))
            },
        }
    }

    /// Evaluates the functions at `x`, returning \\(f(x)\\).
    pub(crate) fn eval_at(&self, x: &[L::F], g_x: &mut [L::F], h_x: &mut [L::F]) -> L::F
    {
        let xs = L::Sl::new_ref(x);

        if let Some(g) = self.fns.g {
            g.eval(xs, L::Sl::new_mut(g_x));
        }
        if let Some(h) = self.fns.h {
            h.eval(xs, L::Sl::new_mut(h_x));
        }
        self.fns.f.eval(xs)
    }

    /// Evaluates the functions at \\(x + \alpha dx\\).
    pub(crate) fn trial(&self, x: &[L::F], dx: &[L::F], alpha: L::F) -> Trial<L::F>
    {
        let mut x_t = x.to_vec();
        L::add(alpha, L::Sl::new_ref(dx), L::Sl::new_mut(&mut x_t));

        let mut g_x = vec![L::F::zero(); self.m_g];
        let mut h_x = vec![L::F::zero(); self.m_h];
        let f_x = self.eval_at(&x_t, &mut g_x, &mut h_x);

        Trial {
            x: x_t, f_x, g_x, h_x,
        }
    }

    /// Moves to an accepted point and updates the multipliers and the gradient there.
    pub(crate) fn accept(&mut self, state: &mut State<L::F>, trial: Trial<L::F>) -> Result<(), Failure>
    {
        state.x = trial.x;
        state.f_x = trial.f_x;
        state.g_x = trial.g_x;
        state.h_x = trial.h_x;

        self.manip(state, OptimizationLocation::AfterStepBeforeGradient);

        if let Err(e) = self.update_grad(state, true) {
            return self.step_failure(state, e, "Gradient update");
        }

        self.manip(state, OptimizationLocation::AfterGradient);

        Ok(())
    }

    /// Updates `grad`, its norm and the norm of `g_x`,
    /// recomputing the least-squares multipliers if `update_y`.
    fn update_grad(&self, state: &mut State<L::F>, update_y: bool) -> Result<(), SolverError>
    {
        let f1 = L::F::one();

        lagrangian::grad_barrier(self.fns, &state.x, &state.h_x, state.mu, &mut state.grad);

        if let Some(g) = self.fns.g {
            if update_y {
                lagrangian::multiplier(self.fns, &state.x, &state.grad, &self.par.normal_eq, &mut state.y)?;
            }
            JacobianOp::new(g, L::Sl::new_ref(&state.x))
                .trans_op(f1, L::Sl::new_ref(&state.y), f1, L::Sl::new_mut(&mut state.grad));
        }

        state.norm_grad = L::norm(L::Sl::new_ref(&state.grad));
        state.norm_g = L::norm(L::Sl::new_ref(&state.g_x));

        if !state.norm_grad.is_finite() {
            return Err(SolverError::NumericalInstability);
        }

        Ok(())
    }

    fn update_mu(&self, state: &mut State<L::F>) -> Result<(), Failure>
    {
        if self.m_h == 0 || state.mu <= self.par.eps_mu {
            return Ok(());
        }

        if state.norm_grad <= self.par.eps_mu_grad * state.mu {
            state.mu = state.mu * self.par.mu_reduce;
            log::debug!("{}: mu reduced to {:.2e}", state.iter, state.mu);

            if let Err(e) = self.update_grad(state, true) {
                return self.step_failure(state, e, "Barrier update");
            }
        }

        Ok(())
    }

    fn check_stop(&self, state: &State<L::F>) -> OptimizationStop
    {
        if state.opt_stop != OptimizationStop::NotConverged {
            return state.opt_stop;
        }

        let f0 = L::F::zero();
        let f1 = L::F::one();
        let typ = |v: L::F| {
            if self.par.tolerance_kind == ToleranceKind::Relative && v > f0 && v.is_finite() {v} else {f1}
        };

        let grad_small = state.norm_grad <= self.par.eps_grad * typ(state.norm_grad_typ);
        let constr_small = self.m_g == 0 || state.norm_g <= self.par.eps_constr * typ(state.norm_g_typ);
        let mu_small = self.m_h == 0 || state.mu <= self.par.eps_mu;

        if grad_small && constr_small && mu_small {
            OptimizationStop::GradientSmall
        }
        else if state.iter > 0 && state.norm_dx <= self.par.eps_dx * typ(state.norm_dx_typ) {
            OptimizationStop::StepSmall
        }
        else if state.iter >= self.par.iter_max {
            OptimizationStop::MaxItersExceeded
        }
        else {
            OptimizationStop::NotConverged
        }
    }

    fn save_old(&self, state: &mut State<L::F>)
    {
        state.x_old.clone_from(&state.x);
        state.grad_old.clone_from(&state.grad);

        // gradient of the barrier objective alone
        if let Some(g) = self.fns.g {
            JacobianOp::new(g, L::Sl::new_ref(&state.x))
                .trans_op(-L::F::one(), L::Sl::new_ref(&state.y), L::F::one(), L::Sl::new_mut(&mut state.grad_old));
        }
    }

    fn update_quasi(&self, state: &mut State<L::F>)
    {
        let f1 = L::F::one();

        // gradient difference of the Lagrangian with the new multipliers
        let mut dgrad = state.grad.clone();
        L::add(-f1, L::Sl::new_ref(&state.grad_old), L::Sl::new_mut(&mut dgrad));
        if let Some(g) = self.fns.g {
            JacobianOp::new(g, L::Sl::new_ref(&state.x_old))
                .trans_op(-f1, L::Sl::new_ref(&state.y), f1, L::Sl::new_mut(&mut dgrad));
        }
        state.dgrad = dgrad;

        push_history(&mut state.old_s, &mut state.old_y, state.dx.clone(), state.dgrad.clone(), self.par.stored_history);
    }

    /// Hessian of the model: a quasi-Newton operator, or the exact one with [`OperatorKind::UserDefined`].
    ///
    /// [`OperatorKind::ScaledIdentity`] is scaled by \\(\\|\nabla\ell\\| / \delta_{\max}\\).
    /// The scale shrinks with the gradient, so the steps stay short near a solution
    /// and a tight `eps_grad` may take many iterations.
    pub(crate) fn hessian<'b>(&self, state: &'b State<L::F>) -> ModelOp<'b, L>
    where 'a: 'b
    {
        match self.par.h_type {
            OperatorKind::UserDefined => ModelOp::Exact(LagrangianHess::new(self.fns, &state.x, &state.y, &state.h_x, state.mu)),
            kind => {
                let scale = state.norm_grad / self.par.delta_max;
                ModelOp::Approx(QuasiNewton::new(kind, self.n, scale, &state.old_s, &state.old_y))
            },
        }
    }

    /// Preconditioner of the model, the user one with [`OperatorKind::UserDefined`].
    pub(crate) fn preconditioner<'b>(&self, state: &'b State<L::F>) -> ModelOp<'b, L>
    where 'a: 'b
    {
        match (self.par.precond, self.fns.precond) {
            (OperatorKind::UserDefined, Some(p)) => ModelOp::User(p),
            (kind, _) => ModelOp::Approx(QuasiNewton::new(kind, self.n, L::F::one(), &state.old_s, &state.old_y)),
        }
    }

    fn user_step(&mut self, state: &mut State<L::F>) -> Result<(), Failure>
    {
        self.manip(state, OptimizationLocation::BeforeGetStep);
        L::zero(L::Sl::new_mut(&mut state.dx));
        self.manip(state, OptimizationLocation::GetStep);

        if state.dx.len() != self.n {
            log::error!("Size mismatch: x {}, dx {}", self.n, state.dx.len());
            return Err(self.msg.error(Failure::from_error(&SolverError::InvalidOp).context("User-defined step")));
        }
        state.norm_dx = L::norm(L::Sl::new_ref(&state.dx));

        let trial = self.trial(&state.x, &state.dx, L::F::one());
        if !lagrangian::barrier_obj::<L>(trial.f_x, &trial.h_x, state.mu).is_finite() {
            log::warn!("user-defined step left the strictly feasible region");
            state.opt_stop = OptimizationStop::InteriorPointInstability;
            return Ok(());
        }

        self.accept(state, trial)
    }

    fn print_table(&self, state: &State<L::F>, header: bool)
    {
        if self.par.msg_level < 1 {
            return;
        }

        let mut s = String::new();
        let stepped = state.iter > 0;
        let mut col = |name: &str, value: Option<String>| {
            s.push_str(&if header {
                format::string(name)
            }
            else {
                value.unwrap_or_else(|| format::string(""))
            });
        };

        col("Iter", Some(format::int(state.iter)));
        col("f(x)", Some(format::real(state.f_x)));
        col("||grad||", Some(format::real(state.norm_grad)));
        if self.m_g > 0 {
            col("||g(x)||", Some(format::real(state.norm_g)));
        }
        if self.m_h > 0 {
            col("mu", Some(format::real(state.mu)));
        }
        col("||dx||", stepped.then(|| format::real(state.norm_dx)));

        match self.par.algorithm_class {
            AlgorithmClass::TrustRegion => {
                col("delta", Some(format::real(state.delta)));
                col("ared/pred", stepped.then(|| format::real(state.ared / state.pred)));
                col("#Krylov", stepped.then(|| format::int(state.krylov_iter)));
                col("KryStop", stepped.then(|| format::string(state.truncated_stop.short_str())));
                if self.m_g > 0 {
                    col("QNStop", stepped.then(|| format::string(state.qn_stop.short_str())));
                }
                col("#Rej", stepped.then(|| format::int(state.rejected)));
            },
            AlgorithmClass::LineSearch => {
                col("alpha", stepped.then(|| format::real(state.alpha)));
                col("#LS", stepped.then(|| format::int(state.linesearch_iter)));
                if self.par.dir == LineSearchDirection::NewtonCG {
                    col("#Krylov", stepped.then(|| format::int(state.krylov_iter)));
                    col("KryStop", stepped.then(|| format::string(state.truncated_stop.short_str())));
                }
                col("#Rej", stepped.then(|| format::int(state.rejected)));
            },
            AlgorithmClass::UserDefined => {},
        }

        self.msg.print(s.trim_end());
    }
}
