//! Solver parameters

use std::fmt::Display;
use std::str::FromStr;
use num_traits::{Float, Num};
use compstep_core::enums::*;
use compstep_core::solver::{TruncatedParam, QuasinormalParam, NormalEqParam};

//

/// Parameter errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamError
{
    /// Line search is requested for a problem with equality constraints.
    LineSearchWithEquality,
    /// A parameter, named by the field, is out of its valid range.
    OutOfRange(&'static str),
    /// An operator kind, named by the field, cannot be used at its place.
    InvalidOperator(&'static str),
}

impl Display for ParamError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match &self {
            ParamError::LineSearchWithEquality => write!(f, "LineSearchWithEquality: line search cannot handle equality constraints"),
            ParamError::OutOfRange(name)       => write!(f, "OutOfRange: {} is out of its valid range", name),
            ParamError::InvalidOperator(name)  => write!(f, "InvalidOperator: {} is not usable there", name),
        }
    }
}

impl std::error::Error for ParamError {}

//

/// Solver parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverParam<F: Float>
{
    /// Algorithm which computes the steps.
    pub algorithm_class: AlgorithmClass,
    /// Max number of outer iterations.
    pub iter_max: usize,
    /// Tolerance of the gradient of the Lagrangian.
    pub eps_grad: F,
    /// Tolerance of the step.
    pub eps_dx: F,
    /// Tolerance of the equality constraint violation.
    pub eps_constr: F,
    /// Whether the tolerances are relative to the values at the start or absolute.
    pub tolerance_kind: ToleranceKind,

    /// Initial trust-region radius.
    pub delta: F,
    /// Upper limit of the trust-region radius.
    pub delta_max: F,
    /// Steps with the reduction ratio below this are rejected.
    pub eta1: F,
    /// The radius grows with the reduction ratio above this and the step on the boundary.
    pub eta2: F,
    /// Max number of consecutive rejected steps.
    pub rejected_max: usize,

    /// Hessian approximation.
    pub h_type: OperatorKind,
    /// Preconditioner of the tangential step.
    pub precond: OperatorKind,
    /// Number of stored pairs of the limited-memory quasi-Newton operators.
    pub stored_history: usize,

    /// Direction of the line search.
    pub dir: LineSearchDirection,
    /// Step length selection of the line search.
    pub kind: LineSearchKind,
    /// Max number of function evaluations of one line search.
    pub linesearch_iter_max: usize,
    /// Sufficient decrease constant of the line search.
    pub c1: F,

    /// Fraction to the boundary of the inequality constraint.
    pub gamma: F,
    /// Initial barrier parameter.
    pub mu: F,
    /// Reduction factor of the barrier parameter.
    pub mu_reduce: F,
    /// The barrier parameter is reduced when the gradient falls below this times the barrier parameter.
    pub eps_mu_grad: F,
    /// Tolerance of the barrier parameter.
    pub eps_mu: F,

    /// Initial penalty of the equality constraint violation in the merit function.
    pub rho: F,

    /// Checks of the objective and constraint derivatives.
    pub f_diag: FunctionDiagnostics,
    /// Checks of the vector space.
    pub x_diag: VectorSpaceDiagnostics,
    /// When the checks run.
    pub dscheme: DiagnosticScheme,

    /// Level of the iteration table printed through messaging. `0` prints nothing.
    pub msg_level: usize,

    /// Parameters of the tangential step solver.
    pub truncated: TruncatedParam<F>,
    /// Parameters of the quasinormal step solver.
    pub quasinormal: QuasinormalParam<F>,
    /// Parameters of the augmented system solves for multipliers and projections.
    pub normal_eq: NormalEqParam<F>,
}

impl<F: Float> Default for SolverParam<F>
{
    fn default() -> Self
    {
        let ten = F::from(10).unwrap_or_else(F::one);
        let frac = |v: f64| F::from(v).unwrap_or_else(F::one);

        SolverParam {
            algorithm_class: AlgorithmClass::TrustRegion,
            iter_max: 1000,
            eps_grad: ten.powi(-8),
            eps_dx: ten.powi(-12),
            eps_constr: ten.powi(-8),
            tolerance_kind: ToleranceKind::Relative,

            delta: ten.powi(2),
            delta_max: ten.powi(4),
            eta1: frac(0.1),
            eta2: frac(0.9),
            rejected_max: 20,

            h_type: OperatorKind::Identity,
            precond: OperatorKind::Identity,
            stored_history: 0,

            dir: LineSearchDirection::SteepestDescent,
            kind: LineSearchKind::GoldenSection,
            linesearch_iter_max: 5,
            c1: ten.powi(-4),

            gamma: frac(0.95),
            mu: F::one(),
            mu_reduce: frac(0.5),
            eps_mu_grad: F::one(),
            eps_mu: ten.powi(-8),

            rho: F::one(),

            f_diag: FunctionDiagnostics::NoDiagnostics,
            x_diag: VectorSpaceDiagnostics::NoDiagnostics,
            dscheme: DiagnosticScheme::Never,

            msg_level: 1,

            truncated: TruncatedParam::default(),
            quasinormal: QuasinormalParam::default(),
            normal_eq: NormalEqParam::default(),
        }
    }
}

//

fn num_by_env<N: Num + Display>(e: &str) -> Option<N>
{
    let s = std::env::var(e).ok()?;

    match N::from_str_radix(s.trim(), 10) {
        Ok(v) => {
            log::info!("{}: {}", e, v);
            Some(v)
        },
        Err(_) => {
            log::warn!("{}: \"{}\" ignored", e, s);
            None
        },
    }
}

fn parse_by_env<T: FromStr + Display>(e: &str) -> Option<T>
{
    let s = std::env::var(e).ok()?;

    match s.trim().parse::<T>() {
        Ok(v) => {
            log::info!("{}: {}", e, v);
            Some(v)
        },
        Err(_) => {
            log::warn!("{}: \"{}\" ignored", e, s);
            None
        },
    }
}

impl<F: Float + Display> SolverParam<F>
{
    /// Overrides parameters by `COMPSTEP_*` environment variables.
    ///
    /// Each variable is the upper-cased field name, e.g. `COMPSTEP_ITER_MAX` or `COMPSTEP_H_TYPE`.
    /// Enumerated values take their registry strings, e.g. `COMPSTEP_ALGORITHM_CLASS=LineSearch`.
    /// Values that cannot be parsed leave the parameter unchanged.
    pub fn set_by_env(&mut self)
    {
        self.algorithm_class = parse_by_env("COMPSTEP_ALGORITHM_CLASS").unwrap_or(self.algorithm_class);
        self.iter_max = num_by_env("COMPSTEP_ITER_MAX").unwrap_or(self.iter_max);
        self.eps_grad = num_by_env("COMPSTEP_EPS_GRAD").unwrap_or(self.eps_grad);
        self.eps_dx = num_by_env("COMPSTEP_EPS_DX").unwrap_or(self.eps_dx);
        self.eps_constr = num_by_env("COMPSTEP_EPS_CONSTR").unwrap_or(self.eps_constr);
        self.tolerance_kind = parse_by_env("COMPSTEP_TOLERANCE_KIND").unwrap_or(self.tolerance_kind);

        self.delta = num_by_env("COMPSTEP_DELTA").unwrap_or(self.delta);
        self.delta_max = num_by_env("COMPSTEP_DELTA_MAX").unwrap_or(self.delta_max);
        self.eta1 = num_by_env("COMPSTEP_ETA1").unwrap_or(self.eta1);
        self.eta2 = num_by_env("COMPSTEP_ETA2").unwrap_or(self.eta2);
        self.rejected_max = num_by_env("COMPSTEP_REJECTED_MAX").unwrap_or(self.rejected_max);

        self.h_type = parse_by_env("COMPSTEP_H_TYPE").unwrap_or(self.h_type);
        self.precond = parse_by_env("COMPSTEP_PRECOND").unwrap_or(self.precond);
        self.stored_history = num_by_env("COMPSTEP_STORED_HISTORY").unwrap_or(self.stored_history);

        self.dir = parse_by_env("COMPSTEP_DIR").unwrap_or(self.dir);
        self.kind = parse_by_env("COMPSTEP_KIND").unwrap_or(self.kind);
        self.linesearch_iter_max = num_by_env("COMPSTEP_LINESEARCH_ITER_MAX").unwrap_or(self.linesearch_iter_max);
        self.c1 = num_by_env("COMPSTEP_C1").unwrap_or(self.c1);

        self.gamma = num_by_env("COMPSTEP_GAMMA").unwrap_or(self.gamma);
        self.mu = num_by_env("COMPSTEP_MU").unwrap_or(self.mu);
        self.mu_reduce = num_by_env("COMPSTEP_MU_REDUCE").unwrap_or(self.mu_reduce);
        self.eps_mu_grad = num_by_env("COMPSTEP_EPS_MU_GRAD").unwrap_or(self.eps_mu_grad);
        self.eps_mu = num_by_env("COMPSTEP_EPS_MU").unwrap_or(self.eps_mu);

        self.rho = num_by_env("COMPSTEP_RHO").unwrap_or(self.rho);

        self.f_diag = parse_by_env("COMPSTEP_F_DIAG").unwrap_or(self.f_diag);
        self.x_diag = parse_by_env("COMPSTEP_X_DIAG").unwrap_or(self.x_diag);
        self.dscheme = parse_by_env("COMPSTEP_DSCHEME").unwrap_or(self.dscheme);

        self.msg_level = num_by_env("COMPSTEP_MSG_LEVEL").unwrap_or(self.msg_level);

        self.truncated.iter_max = num_by_env("COMPSTEP_KRYLOV_ITER_MAX").unwrap_or(self.truncated.iter_max);
        self.truncated.eps = num_by_env("COMPSTEP_EPS_KRYLOV").unwrap_or(self.truncated.eps);
        self.truncated.orthog_max = num_by_env("COMPSTEP_KRYLOV_ORTHOG_MAX").unwrap_or(self.truncated.orthog_max);
        self.quasinormal.zeta = num_by_env("COMPSTEP_ZETA").unwrap_or(self.quasinormal.zeta);
        self.quasinormal.newton = parse_by_env("COMPSTEP_QN_NEWTON").unwrap_or(self.quasinormal.newton);
    }
}

impl<F: Float> SolverParam<F>
{
    /// Checks the parameters against each other and against the problem.
    ///
    /// Returns `Err` with [`ParamError`] at the first inconsistency found.
    /// * `problem_class` is the class of the problem to be solved.
    pub fn validate(&self, problem_class: ProblemClass) -> Result<(), ParamError>
    {
        let f0 = F::zero();
        let f1 = F::one();

        if self.algorithm_class == AlgorithmClass::LineSearch {
            match problem_class {
                ProblemClass::EqualityConstrained | ProblemClass::Constrained => {
                    return Err(ParamError::LineSearchWithEquality);
                },
                ProblemClass::Unconstrained | ProblemClass::InequalityConstrained => {},
            }
        }

        let checks = [
            (self.delta > f0, "delta"),
            (self.delta_max >= self.delta, "delta_max"),
            (f0 < self.eta1 && self.eta1 < self.eta2, "eta1"),
            (self.eta2 < f1, "eta2"),
            (self.eps_grad >= f0, "eps_grad"),
            (self.eps_dx >= f0, "eps_dx"),
            (self.eps_constr >= f0, "eps_constr"),
            (f0 < self.c1 && self.c1 < f1, "c1"),
            (self.linesearch_iter_max > 0, "linesearch_iter_max"),
            (f0 < self.gamma && self.gamma < f1, "gamma"),
            (self.mu > f0, "mu"),
            (f0 < self.mu_reduce && self.mu_reduce < f1, "mu_reduce"),
            (self.eps_mu_grad > f0, "eps_mu_grad"),
            (self.eps_mu >= f0, "eps_mu"),
            (self.rho > f0, "rho"),
            (f0 < self.quasinormal.zeta && self.quasinormal.zeta < f1, "quasinormal.zeta"),
            (self.truncated.iter_max > 0, "truncated.iter_max"),
        ];
        for (ok, name) in checks {
            if !ok {
                return Err(ParamError::OutOfRange(name));
            }
        }

        match self.h_type {
            OperatorKind::InvBFGS | OperatorKind::InvSR1 => return Err(ParamError::InvalidOperator("h_type")),
            _ => {},
        }
        match self.precond {
            OperatorKind::Identity | OperatorKind::InvBFGS | OperatorKind::InvSR1 | OperatorKind::UserDefined => {},
            _ => return Err(ParamError::InvalidOperator("precond")),
        }

        Ok(())
    }
}

//

#[test]
fn test_param1()
{
    let mut p = SolverParam::<f64>::default();
    assert_eq!(p.validate(ProblemClass::Constrained), Ok(()));

    p.algorithm_class = AlgorithmClass::LineSearch;
    assert_eq!(p.validate(ProblemClass::InequalityConstrained), Ok(()));
    assert_eq!(p.validate(ProblemClass::EqualityConstrained), Err(ParamError::LineSearchWithEquality));

    p.algorithm_class = AlgorithmClass::TrustRegion;
    p.delta = -1.;
    assert_eq!(p.validate(ProblemClass::Unconstrained), Err(ParamError::OutOfRange("delta")));

    p.delta = 1.;
    p.h_type = OperatorKind::InvBFGS;
    assert_eq!(p.validate(ProblemClass::Unconstrained), Err(ParamError::InvalidOperator("h_type")));
}
