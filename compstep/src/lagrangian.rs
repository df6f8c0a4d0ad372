//! Barrier Lagrangian and the operators of the step subproblems

use num_traits::{Float, Zero, One};
use compstep_core::solver::{LinAlg, JordanAlg, Operator, SliceLike, NormalEq, NormalEqParam, SolverError};
use crate::functions::{Functions, JacobianOp};
use crate::quasi_newton::QuasiNewton;

// y = alpha*t + beta*y, without reading y when beta is zero
fn axpby<L: LinAlg>(alpha: L::F, t: &L::Sl, beta: L::F, y: &mut L::Sl)
{
    if beta == L::F::zero() {
        L::zero(y);
    }
    else {
        L::scale(beta, y);
    }
    L::add(alpha, t, y);
}

//

/// Barrier objective \\(f(x) - \mu \log\det h(x)\\) from the function values.
///
/// Positive infinity when \\(h(x)\\) is not strictly feasible.
pub(crate) fn barrier_obj<L: JordanAlg>(f_x: L::F, h_x: &[L::F], mu: L::F) -> L::F
{
    if h_x.is_empty() {
        return f_x;
    }

    let b = L::barr(L::Sl::new_ref(h_x));
    if b.is_finite() {
        f_x - mu * b
    }
    else {
        L::F::infinity()
    }
}

/// Merit function \\(\phi(x) + \langle y, g(x) \rangle + \rho \\|g(x)\\|^2\\).
pub(crate) fn merit<L: JordanAlg>(f_x: L::F, g_x: &[L::F], h_x: &[L::F], y: &[L::F], mu: L::F, rho: L::F) -> L::F
{
    let phi = barrier_obj::<L>(f_x, h_x, mu);
    if g_x.is_empty() {
        return phi;
    }

    let g_x = L::Sl::new_ref(g_x);
    let norm_g = L::norm(g_x);
    phi + L::inner(L::Sl::new_ref(y), g_x) + rho * norm_g * norm_g
}

/// Calculate the gradient of the barrier objective
/// \\(\nabla f(x) - \mu h'(x)^* L(h(x))^{-1} e\\) into `out`.
pub(crate) fn grad_barrier<L: JordanAlg>(fns: &Functions<L>, x: &[L::F], h_x: &[L::F], mu: L::F, out: &mut [L::F])
{
    let x = L::Sl::new_ref(x);
    fns.f.grad(x, L::Sl::new_mut(out));

    if let Some(h) = fns.h {
        let m_h = h_x.len();
        let h_x = L::Sl::new_ref(h_x);

        let mut e = vec![L::F::zero(); m_h];
        let mut inv = vec![L::F::zero(); m_h];
        L::id(L::Sl::new_mut(&mut e));
        L::linv(h_x, L::Sl::new_ref(&e), L::Sl::new_mut(&mut inv));

        JacobianOp::new(h, x).trans_op(-mu, L::Sl::new_ref(&inv), L::F::one(), L::Sl::new_mut(out));
    }
}

/// Least-squares multiplier of the equality constraint,
/// \\(g'(x) g'(x)^* y = -g'(x) \nabla\phi(x)\\).
pub(crate) fn multiplier<L: LinAlg>(fns: &Functions<L>, x: &[L::F], grad_phi: &[L::F], par: &NormalEqParam<L::F>, y: &mut [L::F]) -> Result<(), SolverError>
{
    let g = match fns.g {
        Some(g) => g,
        None => return Ok(()),
    };
    let (m, n) = g.size();
    let op_g = JacobianOp::new(g, L::Sl::new_ref(x));

    let mut b = vec![L::F::zero(); m];
    op_g.op(-L::F::one(), L::Sl::new_ref(grad_phi), L::F::zero(), L::Sl::new_mut(&mut b));

    let mut work = vec![L::F::zero(); NormalEq::<L>::query_worklen((m, n))];
    NormalEq::<L>::new().par(|p| *p = par.clone())
        .solve(&op_g, L::Sl::new_ref(&b), L::Sl::new_mut(y), L::Sl::new_mut(&mut work))?;

    Ok(())
}

//

/// Hessian of the barrier Lagrangian at a point, as an [`Operator`].
///
/// <script src="https://polyfill.io/v3/polyfill.min.js?features=es6"></script>
/// <script id="MathJax-script" async src="https://cdn.jsdelivr.net/npm/mathjax@3/es5/tex-mml-chtml.js"></script>
///
/// \\[
/// \nabla^2 f(x) dx + (g''(x) dx)^* y
/// + \mu h'(x)^* L(h)^{-1} L(h)^{-1} h'(x) dx
/// - \mu (h''(x) dx)^* L(h)^{-1} e
/// \\]
pub struct LagrangianHess<'a, L: JordanAlg>
{
    fns: &'a Functions<'a, L>,
    x: &'a [L::F],
    y: &'a [L::F],
    h_x: &'a [L::F],
    mu: L::F,
}

impl<'a, L: JordanAlg> LagrangianHess<'a, L>
{
    /// Creates an instance.
    /// * `fns` is the functions of the problem.
    /// * `x` is the point.
    /// * `y` is the multiplier of the equality constraint.
    /// * `h_x` is \\(h(x)\\).
    /// * `mu` is the barrier parameter.
    pub fn new(fns: &'a Functions<'a, L>, x: &'a [L::F], y: &'a [L::F], h_x: &'a [L::F], mu: L::F) -> Self
    {
        LagrangianHess {
            fns, x, y, h_x, mu,
        }
    }
}

impl<'a, L: JordanAlg> Operator<L> for LagrangianHess<'a, L>
{
    fn size(&self) -> (usize, usize)
    {
        (self.x.len(), self.x.len())
    }

    fn op(&self, alpha: L::F, dx: &L::Sl, beta: L::F, out: &mut L::Sl)
    {
        let f0 = L::F::zero();
        let f1 = L::F::one();
        let n = self.x.len();
        let x = L::Sl::new_ref(self.x);

        let mut t = vec![f0; n];
        let mut u = vec![f0; n];
        let t = L::Sl::new_mut(&mut t);
        let u = L::Sl::new_mut(&mut u);

        self.fns.f.hessvec(x, dx, t);

        if let Some(g) = self.fns.g {
            g.pps(x, dx, L::Sl::new_ref(self.y), u);
            L::add(f1, u, t);
        }

        if let Some(h) = self.fns.h {
            let m = self.h_x.len();
            let h_x = L::Sl::new_ref(self.h_x);
            let op_h = JacobianOp::new(h, x);

            let mut hdx = vec![f0; m];
            let mut w1 = vec![f0; m];
            let mut w2 = vec![f0; m];
            let hdx = L::Sl::new_mut(&mut hdx);
            let w1 = L::Sl::new_mut(&mut w1);
            let w2 = L::Sl::new_mut(&mut w2);

            op_h.op(f1, dx, f0, hdx);
            L::linv(h_x, hdx, w1);
            L::linv(h_x, w1, w2);
            op_h.trans_op(self.mu, w2, f1, t);

            L::id(w1);
            L::linv(h_x, w1, w2);
            h.pps(x, dx, w2, u);
            L::add(-self.mu, u, t);
        }

        axpby::<L>(alpha, t, beta, out);
    }

    fn trans_op(&self, alpha: L::F, dx: &L::Sl, beta: L::F, out: &mut L::Sl)
    {
        // symmetric
        self.op(alpha, dx, beta, out);
    }
}

//

/// Orthogonal projector onto the null space of \\(g'(x)\\), as an [`Operator`].
///
/// A failed projection fills the output with NaN,
/// which the truncated CG reports as a broken preconditioner.
pub struct NullProjector<'a, L: LinAlg>
{
    op_g: JacobianOp<'a, L>,
    normal_eq: NormalEq<L>,
}

impl<'a, L: LinAlg> NullProjector<'a, L>
{
    /// Creates an instance.
    /// * `op_g` is the Jacobian \\(g'(x)\\).
    /// * `par` is the parameters of the normal equation solves.
    pub fn new(op_g: JacobianOp<'a, L>, par: &NormalEqParam<L::F>) -> Self
    {
        NullProjector {
            op_g,
            normal_eq: NormalEq::new().par(|p| *p = par.clone()),
        }
    }
}

impl<'a, L: LinAlg> Operator<L> for NullProjector<'a, L>
{
    fn size(&self) -> (usize, usize)
    {
        let (_, n) = self.op_g.size();
        (n, n)
    }

    fn op(&self, alpha: L::F, v: &L::Sl, beta: L::F, out: &mut L::Sl)
    {
        let size = self.op_g.size();
        let (_, n) = size;

        let mut u = vec![L::F::zero(); n];
        let mut work = vec![L::F::zero(); NormalEq::<L>::query_worklen(size)];

        if let Err(e) = self.normal_eq.project(&self.op_g, v, L::Sl::new_mut(&mut u), L::Sl::new_mut(&mut work)) {
            log::warn!("null space projection failed: {}", e);
            for e in u.iter_mut() {
                *e = L::F::nan();
            }
        }

        axpby::<L>(alpha, L::Sl::new_ref(&u), beta, out);
    }

    fn trans_op(&self, alpha: L::F, v: &L::Sl, beta: L::F, out: &mut L::Sl)
    {
        // symmetric
        self.op(alpha, v, beta, out);
    }
}

//

/// Model operator of a step subproblem: a Hessian or a preconditioner.
pub enum ModelOp<'a, L: JordanAlg>
{
    /// Quasi-Newton operator from the stored pairs.
    Approx(QuasiNewton<'a, L>),
    /// Exact Hessian of the barrier Lagrangian.
    Exact(LagrangianHess<'a, L>),
    /// Operator supplied by the user.
    User(&'a dyn Operator<L>),
}

impl<'a, L: JordanAlg> Operator<L> for ModelOp<'a, L>
{
    fn size(&self) -> (usize, usize)
    {
        match self {
            ModelOp::Approx(o) => o.size(),
            ModelOp::Exact(o) => o.size(),
            ModelOp::User(o) => o.size(),
        }
    }

    fn op(&self, alpha: L::F, x: &L::Sl, beta: L::F, y: &mut L::Sl)
    {
        match self {
            ModelOp::Approx(o) => o.op(alpha, x, beta, y),
            ModelOp::Exact(o) => o.op(alpha, x, beta, y),
            ModelOp::User(o) => o.op(alpha, x, beta, y),
        }
    }

    fn trans_op(&self, alpha: L::F, x: &L::Sl, beta: L::F, y: &mut L::Sl)
    {
        match self {
            ModelOp::Approx(o) => o.trans_op(alpha, x, beta, y),
            ModelOp::Exact(o) => o.trans_op(alpha, x, beta, y),
            ModelOp::User(o) => o.trans_op(alpha, x, beta, y),
        }
    }
}

//

#[test]
fn test_lagrangian1()
{
    use float_eq::assert_float_eq;
    use compstep_core::FloatGeneric;
    use crate::functions::{Objective, Constraint};

    type L = FloatGeneric<f64>;

    // f = (x0^2 + x1^2)/2
    struct F;
    impl Objective<L> for F
    {
        fn eval(&self, x: &[f64]) -> f64 { (x[0] * x[0] + x[1] * x[1]) / 2. }
        fn grad(&self, x: &[f64], g: &mut [f64]) { g.copy_from_slice(x); }
        fn hessvec(&self, _x: &[f64], dx: &[f64], h_dx: &mut [f64]) { h_dx.copy_from_slice(dx); }
    }
    // h = x0 >= 0
    struct H;
    impl Constraint<L> for H
    {
        fn size(&self) -> (usize, usize) { (1, 2) }
        fn eval(&self, x: &[f64], y: &mut [f64]) { y[0] = x[0]; }
        fn p(&self, _x: &[f64], dx: &[f64], y: &mut [f64]) { y[0] = dx[0]; }
        fn ps(&self, _x: &[f64], dy: &[f64], z: &mut [f64]) { z[0] = dy[0]; z[1] = 0.; }
        fn pps(&self, _x: &[f64], _dx: &[f64], _dy: &[f64], z: &mut [f64]) { z.fill(0.); }
    }

    let f = F;
    let h = H;
    let fns = Functions::<L>::new(&f).inequality(&h);

    let x = &[2., 1.];
    let h_x = &[2.];
    let mu = 0.5;

    // phi = 2.5 - 0.5*ln(2)
    assert_float_eq!(barrier_obj::<L>(2.5, h_x, mu), 2.5 - 0.5 * 2_f64.ln(), abs <= 1e-12);
    assert!(barrier_obj::<L>(2.5, &[-1.], mu).is_infinite());

    // grad = (2 - 0.5/2, 1)
    let out = &mut[0.; 2];
    grad_barrier::<L>(&fns, x, h_x, mu, out);
    assert_float_eq!(*out, [1.75, 1.], abs_all <= 1e-12);

    // hess = diag(1 + 0.5/4, 1)
    let hess = LagrangianHess::<L>::new(&fns, x, &[], h_x, mu);
    hess.op(1., &[1., 1.], 0., out);
    assert_float_eq!(*out, [1.125, 1.], abs_all <= 1e-12);
}
