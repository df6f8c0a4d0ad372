//! Quasinormal step

use num_traits::{Float, Zero, One, ToPrimitive};
use core::marker::PhantomData;
use crate::enums::QuasinormalStop;
use crate::solver::{LinAlg, Operator, Safeguard, SliceLike, SolverError, NormalEq, NormalEqParam};
use crate::splitm_mut;

//

/// Parameters of [`Quasinormal`].
#[derive(Debug, Clone, PartialEq)]
pub struct QuasinormalParam<F: Float>
{
    /// Fraction \\(\zeta\\) of the trust-region radius the quasinormal step may use.
    pub zeta: F,
    /// Whether to try the Newton step after the Cauchy point.
    pub newton: bool,
    /// Tolerance of the linearized residual, relative to \\(\\|g(x)\\|\\), below which it is regarded as solved.
    pub eps_solved: F,
    /// Parameters of the augmented system solves.
    pub normal_eq: NormalEqParam<F>,
}

impl<F: Float> Default for QuasinormalParam<F>
{
    fn default() -> Self
    {
        let ten = F::from(10).unwrap_or_else(F::one);

        QuasinormalParam {
            zeta: F::from(0.8).unwrap_or_else(F::one),
            newton: true,
            eps_solved: ten.powi(-10),
            normal_eq: NormalEqParam::default(),
        }
    }
}

//

/// Result of [`Quasinormal::solve`].
#[derive(Debug, Clone, PartialEq)]
pub struct QuasinormalResult<F: Float>
{
    /// How the step was determined.
    pub stop: QuasinormalStop,
    /// Linearized residual \\(\\|g(x) + g'(x) dx_n\\|\\) of the returned step.
    pub residual: F,
    /// Number of augmented system iterations.
    pub iter: usize,
}

//

/// Quasinormal step solver.
///
/// <script src="https://polyfill.io/v3/polyfill.min.js?features=es6"></script>
/// <script id="MathJax-script" async src="https://cdn.jsdelivr.net/npm/mathjax@3/es5/tex-mml-chtml.js"></script>
///
/// Reduces the linearized constraint violation
/// \\[
/// \begin{array}{ll}
/// {\rm minimize} & \frac12 \\| g(x) + g'(x) dx \\|^2 \\\\
/// {\rm subject \ to} & \\| dx \\| \le \zeta \delta \\\\
/// & dx \ {\rm is \ safe}
/// \end{array}
/// \\]
/// by the Cauchy point, the Newton step \\(dx = g'(x)^T w\\), \\(g'(x) g'(x)^T w = -g(x)\\),
/// or the dogleg between them.
pub struct Quasinormal<L: LinAlg>
{
    ph_l: PhantomData<L>,
    /// Solver parameters.
    pub par: QuasinormalParam<L::F>,
}

impl<L: LinAlg> Quasinormal<L>
{
    /// Query of a length of work slice.
    ///
    /// Returns a length of work slice that [`Quasinormal::solve`] requires.
    /// * `op_g_size` is a number of rows and columns of the Jacobian \\(g'(x)\\).
    pub fn query_worklen(op_g_size: (usize, usize)) -> usize
    {
        let (m, n) = op_g_size;

        n * 4 + // dn, t1, t2, zero
        m +     // residual
        NormalEq::<L>::query_worklen(op_g_size)
    }

    /// Creates an instance.
    ///
    /// Returns [`Quasinormal`] instance.
    pub fn new() -> Self
    {
        Quasinormal {
            ph_l: PhantomData,
            par: QuasinormalParam::default(),
        }
    }

    /// Changes solver parameters.
    ///
    /// Returns [`Quasinormal`] with its parameters changed.
    /// * `f` is a function to change parameters given by its argument.
    pub fn par<P>(mut self, f: P) -> Self
    where P: FnOnce(&mut QuasinormalParam<L::F>)
    {
        f(&mut self.par);
        self
    }

    // ||g + op_g*v||
    fn residual<O: Operator<L>>(op_g: &O, g_x: &L::Sl, v: &L::Sl, res: &mut L::Sl) -> L::F
    {
        L::copy(g_x, res);
        op_g.op(L::F::one(), v, L::F::one(), res);
        L::norm(res)
    }

    // largest theta in [0, 1] such that ||x + theta*p|| <= radius
    fn boundary(x: &L::Sl, p: &L::Sl, radius: L::F) -> L::F
    {
        let f0 = L::F::zero();
        let f1 = L::F::one();
        let f2 = f1 + f1;

        let a = L::inner(p, p);
        if a <= f0 {
            return f1;
        }
        let b = f2 * L::inner(x, p);
        let c = (L::inner(x, x) - radius * radius).min(f0);

        let disc = (b * b - f2 * f2 * a * c).max(f0).sqrt();
        let theta = if b >= f0 {
            if b + disc > f0 {(f2 * -c) / (b + disc)} else {f0}
        }
        else {
            (disc - b) / (f2 * a)
        };

        theta.min(f1)
    }

    /// Starts to solve the subproblem.
    ///
    /// Returns `Ok` with [`QuasinormalResult`], or `Err` on a size mismatch, a work shortage
    /// or a non-finite value in the augmented system.
    /// * `op_g` is the Jacobian \\(g'(x)\\) of the equality constraint.
    /// * `g_x` is \\(g(x)\\).
    /// * `delta` is the trust-region radius \\(\delta\\).
    /// * `safeguard` measures the safe fraction of a step from \\(x\\).
    /// * `dx_n` is the quasinormal step on exit.
    /// * `dx_ncp` is the Cauchy point before being cut by the trust region or the safeguard on exit.
    /// * `work` slice is used for temporal variables.
    pub fn solve<O, S>(&self,
        op_g: O, g_x: &L::Sl, delta: L::F, mut safeguard: S,
        dx_n: &mut L::Sl, dx_ncp: &mut L::Sl, work: &mut L::Sl) -> Result<QuasinormalResult<L::F>, SolverError>
    where O: Operator<L>, S: Safeguard<L>
    {
        let (m, n) = op_g.size();

        if g_x.len() != m || dx_n.len() != n || dx_ncp.len() != n {
            log::error!("Size mismatch: op_g{:?}, g_x {}, dx_n {}, dx_ncp {}", op_g.size(), g_x.len(), dx_n.len(), dx_ncp.len());
            return Err(SolverError::InvalidOp);
        }
        if work.len() < Self::query_worklen((m, n)) {
            log::error!("Work memory length {} must be >= {}", work.len(), Self::query_worklen((m, n)));
            return Err(SolverError::WorkShortage);
        }

        let f0 = L::F::zero();
        let f1 = L::F::one();

        L::zero(dx_n);
        L::zero(dx_ncp);

        let mut result = QuasinormalResult {
            stop: QuasinormalStop::Skipped,
            residual: f0,
            iter: 0,
        };

        if m == 0 {
            return Ok(result);
        }

        splitm_mut!(work, (dn; n), (t1; n), (t2; n), (zero; n), (res; m), (ne_work; NormalEq::<L>::query_worklen((m, n))));

        L::zero(zero);

        let radius = self.par.zeta * delta;
        let norm_g = L::norm(g_x);
        result.residual = norm_g;
        if !norm_g.is_finite() {
            return Err(SolverError::NumericalInstability);
        }
        let tol = self.par.eps_solved * norm_g;

        // Cauchy point: alpha*d, d = -g'^T*g, alpha = ||d||^2 / ||g'*d||^2
        op_g.trans_op(-f1, g_x, f0, t1);
        op_g.op(f1, t1, f0, res);
        let norm_d2 = L::inner(t1, t1);
        let norm_gd2 = L::inner(res, res);
        if !(norm_d2 > f0 && norm_gd2 > f0) {
            // already solved, or stationary for the violation
            result.stop = QuasinormalStop::CauchySolved;
            return Ok(result);
        }
        L::copy(t1, dx_ncp);
        L::scale(norm_d2 / norm_gd2, dx_ncp);

        let res_cp = Self::residual(&op_g, g_x, dx_ncp, res);

        let norm_cp = L::norm(dx_ncp);
        let frac_tr = if norm_cp > radius {radius / norm_cp} else {f1};
        let frac_sg = safeguard.step_fraction(zero, dx_ncp);

        if frac_sg < f1 && frac_sg <= frac_tr {
            L::copy(dx_ncp, dx_n);
            L::scale(frac_sg, dx_n);
            result.stop = QuasinormalStop::CauchySafeguard;
        }
        else if frac_tr < f1 {
            L::copy(dx_ncp, dx_n);
            L::scale(frac_tr, dx_n);
            result.stop = QuasinormalStop::CauchyTrustRegion;
        }
        else if res_cp <= tol || !self.par.newton {
            L::copy(dx_ncp, dx_n);
            result.stop = QuasinormalStop::CauchySolved;
        }
        else {
            // Newton
            result.iter = NormalEq::<L>::new().par(|p| *p = self.par.normal_eq.clone())
                .least_norm(&op_g, g_x, dn, ne_work)?;

            let norm_dn = L::norm(dn);
            let res_n = Self::residual(&op_g, g_x, dn, res);

            if norm_dn <= radius && res_n <= res_cp && safeguard.step_fraction(zero, dn) >= f1 {
                L::copy(dn, dx_n);
                result.stop = QuasinormalStop::Newton;
            }
            else {
                // dogleg from the Cauchy point toward Newton
                L::copy(dn, t2);
                L::add(-f1, dx_ncp, t2);
                let theta_tr = Self::boundary(dx_ncp, t2, radius);
                let theta_sg = safeguard.step_fraction(dx_ncp, t2);
                let (theta, stop) = cut(theta_tr, theta_sg, QuasinormalStop::DoglegTrustRegion, QuasinormalStop::DoglegSafeguard);
                L::copy(dx_ncp, t1);
                L::add(theta, t2, t1);
                let res_dl = Self::residual(&op_g, g_x, t1, res);

                if res_dl <= res_cp {
                    L::copy(t1, dx_n);
                    result.stop = stop;
                }
                else {
                    // Newton direction
                    let tau_tr = if norm_dn > radius {radius / norm_dn} else {f1};
                    let tau_sg = safeguard.step_fraction(zero, dn);
                    let (tau, stop) = cut(tau_tr, tau_sg, QuasinormalStop::NewtonTrustRegion, QuasinormalStop::NewtonSafeguard);
                    L::copy(dn, t1);
                    L::scale(tau, t1);
                    let res_nd = Self::residual(&op_g, g_x, t1, res);

                    if res_nd <= res_cp {
                        L::copy(t1, dx_n);
                        result.stop = stop;
                    }
                    else {
                        L::copy(dx_ncp, dx_n);
                        result.stop = QuasinormalStop::CauchySolved;
                    }
                }
            }
        }

        result.residual = Self::residual(&op_g, g_x, dx_n, res);

        log::debug!("quasinormal: {}, residual {:.3e} -> {:.3e}", result.stop,
            norm_g.to_f64().unwrap_or(f64::NAN), result.residual.to_f64().unwrap_or(f64::NAN));

        Ok(result)
    }
}

//

// Fraction of a path toward the Newton point and its label, uncut reaching the Newton point itself
fn cut<F: Float>(frac_tr: F, frac_sg: F, stop_tr: QuasinormalStop, stop_sg: QuasinormalStop) -> (F, QuasinormalStop)
{
    if frac_sg < F::one() && frac_sg <= frac_tr {
        (frac_sg, stop_sg)
    }
    else if frac_tr < F::one() {
        (frac_tr, stop_tr)
    }
    else {
        (F::one(), QuasinormalStop::Newton)
    }
}

#[test]
fn test_quasinormal_cut()
{
    let (tr, sg) = (QuasinormalStop::DoglegTrustRegion, QuasinormalStop::DoglegSafeguard);

    assert_eq!(cut(1., 1., tr, sg), (1., QuasinormalStop::Newton));
    assert_eq!(cut(0.5, 1., tr, sg), (0.5, tr));
    assert_eq!(cut(1., 0.5, tr, sg), (0.5, sg));
    assert_eq!(cut(0.3, 0.3, tr, sg), (0.3, sg));
    assert_eq!(cut(0.2, 0.3, tr, sg), (0.2, tr));
}
