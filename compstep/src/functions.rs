//! Objective and constraint functions

use num_traits::{Float, Zero, One};
use compstep_core::solver::{LinAlg, Operator, SliceLike};
use compstep_core::enums::ProblemClass;
use compstep_core::LinAlgEx;
use crate::MatBuild;

//

/// Objective function trait
///
/// <script src="https://polyfill.io/v3/polyfill.min.js?features=es6"></script>
/// <script id="MathJax-script" async src="https://cdn.jsdelivr.net/npm/mathjax@3/es5/tex-mml-chtml.js"></script>
///
/// A twice differentiable \\(f: \mathbb{R}^n \to \mathbb{R}\\).
pub trait Objective<L: LinAlg>
{
    /// Returns \\(f(x)\\).
    fn eval(&self, x: &L::Sl) -> L::F;

    /// Calculate \\(\nabla f(x)\\) into `g`.
    fn grad(&self, x: &L::Sl, g: &mut L::Sl);

    /// Calculate \\(\nabla^2 f(x) dx\\) into `h_dx`.
    fn hessvec(&self, x: &L::Sl, dx: &L::Sl, h_dx: &mut L::Sl);
}

/// Constraint function trait
///
/// <script src="https://polyfill.io/v3/polyfill.min.js?features=es6"></script>
/// <script id="MathJax-script" async src="https://cdn.jsdelivr.net/npm/mathjax@3/es5/tex-mml-chtml.js"></script>
///
/// A twice differentiable \\(g: \mathbb{R}^n \to \mathbb{R}^m\\).
pub trait Constraint<L: LinAlg>
{
    /// Size of the Jacobian.
    ///
    /// Returns a tuple of \\(m\\) and \\(n\\).
    fn size(&self) -> (usize, usize);

    /// Calculate \\(g(x)\\) into `y`.
    fn eval(&self, x: &L::Sl, y: &mut L::Sl);

    /// Calculate \\(g'(x) dx\\) into `y`.
    fn p(&self, x: &L::Sl, dx: &L::Sl, y: &mut L::Sl);

    /// Calculate \\(g'(x)^* dy\\) into `z`.
    fn ps(&self, x: &L::Sl, dy: &L::Sl, z: &mut L::Sl);

    /// Calculate \\((g''(x) dx)^* dy\\) into `z`.
    fn pps(&self, x: &L::Sl, dx: &L::Sl, dy: &L::Sl, z: &mut L::Sl);
}

//

/// Bundle of the functions of an optimization problem
///
/// <script src="https://polyfill.io/v3/polyfill.min.js?features=es6"></script>
/// <script id="MathJax-script" async src="https://cdn.jsdelivr.net/npm/mathjax@3/es5/tex-mml-chtml.js"></script>
///
/// \\[
/// \begin{array}{ll}
/// {\rm minimize} & f(x) \\\\
/// {\rm subject \ to} & g(x) = 0 \\\\
/// & h(x) \succeq 0
/// \end{array}
/// \\]
/// Which of \\(g\\) and \\(h\\) are present decides the [`ProblemClass`].
pub struct Functions<'a, L: LinAlg>
{
    /// Objective \\(f\\).
    pub f: &'a dyn Objective<L>,
    /// Equality constraint \\(g\\).
    pub g: Option<&'a dyn Constraint<L>>,
    /// Inequality constraint \\(h\\).
    pub h: Option<&'a dyn Constraint<L>>,
    /// Preconditioner of the tangential step, used with [`compstep_core::enums::OperatorKind::UserDefined`].
    pub precond: Option<&'a dyn Operator<L>>,
}

impl<'a, L: LinAlg> Functions<'a, L>
{
    /// Creates an unconstrained bundle.
    pub fn new(f: &'a dyn Objective<L>) -> Self
    {
        Functions {
            f,
            g: None,
            h: None,
            precond: None,
        }
    }

    /// Builder pattern to set the equality constraint.
    pub fn equality(mut self, g: &'a dyn Constraint<L>) -> Self
    {
        self.g = Some(g);
        self
    }

    /// Builder pattern to set the inequality constraint.
    pub fn inequality(mut self, h: &'a dyn Constraint<L>) -> Self
    {
        self.h = Some(h);
        self
    }

    /// Builder pattern to set the user-defined preconditioner.
    pub fn preconditioner(mut self, precond: &'a dyn Operator<L>) -> Self
    {
        self.precond = Some(precond);
        self
    }

    /// Class of the problem.
    pub fn problem_class(&self) -> ProblemClass
    {
        match (self.g.is_some(), self.h.is_some()) {
            (false, false) => ProblemClass::Unconstrained,
            (true, false) => ProblemClass::EqualityConstrained,
            (false, true) => ProblemClass::InequalityConstrained,
            (true, true) => ProblemClass::Constrained,
        }
    }

    /// Dimensions of \\(g\\) and \\(h\\), zero when absent.
    pub fn dims(&self) -> (usize, usize)
    {
        (self.g.map_or(0, |g| g.size().0), self.h.map_or(0, |h| h.size().0))
    }
}

//

/// Jacobian \\(g'(x)\\) of a [`Constraint`] at a point, as an [`Operator`].
pub struct JacobianOp<'a, L: LinAlg>
{
    c: &'a dyn Constraint<L>,
    x: &'a L::Sl,
}

impl<'a, L: LinAlg> JacobianOp<'a, L>
{
    /// Creates an instance.
    /// * `c` is the constraint.
    /// * `x` is the point.
    pub fn new(c: &'a dyn Constraint<L>, x: &'a L::Sl) -> Self
    {
        JacobianOp {c, x}
    }
}

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

impl<'a, L: LinAlg> Operator<L> for JacobianOp<'a, L>
{
    fn size(&self) -> (usize, usize)
    {
        self.c.size()
    }

    fn op(&self, alpha: L::F, x: &L::Sl, beta: L::F, y: &mut L::Sl)
    {
        let mut t = vec![L::F::zero(); y.len()];
        let t = L::Sl::new_mut(&mut t);

        self.c.p(self.x, x, t);
        axpby::<L>(alpha, t, beta, y);
    }

    fn trans_op(&self, alpha: L::F, x: &L::Sl, beta: L::F, y: &mut L::Sl)
    {
        let mut t = vec![L::F::zero(); y.len()];
        let t = L::Sl::new_mut(&mut t);

        self.c.ps(self.x, x, t);
        axpby::<L>(alpha, t, beta, y);
    }
}

//

/// Quadratic objective
///
/// <script src="https://polyfill.io/v3/polyfill.min.js?features=es6"></script>
/// <script id="MathJax-script" async src="https://cdn.jsdelivr.net/npm/mathjax@3/es5/tex-mml-chtml.js"></script>
///
/// \\(f(x) = \frac12 x^T P x + q^T x + r\\) with a symmetric \\(P\\).
pub struct QuadObjective<L: LinAlgEx>
{
    sym_p: MatBuild<L>,
    vec_q: MatBuild<L>,
    r: L::F,
}

impl<L: LinAlgEx> QuadObjective<L>
{
    /// Creates an instance.
    ///
    /// Returns `None` if \\(P\\) is not symmetric or the sizes mismatch.
    /// * `sym_p` is \\(P\\), [`compstep_core::MatType::SymPack`] or [`compstep_core::MatType::Diag`].
    /// * `vec_q` is \\(q\\), a one-column matrix.
    /// * `r` is \\(r\\).
    pub fn new(sym_p: MatBuild<L>, vec_q: MatBuild<L>, r: L::F) -> Option<Self>
    {
        let (n, _) = sym_p.size();

        if !sym_p.is_sym() || vec_q.size() != (n, 1) {
            log::error!("Size mismatch: sym_p{:?}, vec_q{:?}", sym_p.size(), vec_q.size());
            return None;
        }

        Some(QuadObjective {sym_p, vec_q, r})
    }
}

impl<L: LinAlgEx> Objective<L> for QuadObjective<L>
{
    fn eval(&self, x: &L::Sl) -> L::F
    {
        let f0 = L::F::zero();
        let f1 = L::F::one();

        let mut px = vec![f0; x.len()];
        let px = L::Sl::new_mut(&mut px);
        self.sym_p.as_op().op(f1, x, f0, px);

        let q = L::Sl::new_ref(self.vec_q.as_ref());

        (f1 + f1).recip() * L::inner(x, px) + L::inner(q, x) + self.r
    }

    fn grad(&self, x: &L::Sl, g: &mut L::Sl)
    {
        let f1 = L::F::one();

        L::copy(L::Sl::new_ref(self.vec_q.as_ref()), g);
        self.sym_p.as_op().op(f1, x, f1, g);
    }

    fn hessvec(&self, _x: &L::Sl, dx: &L::Sl, h_dx: &mut L::Sl)
    {
        self.sym_p.as_op().op(L::F::one(), dx, L::F::zero(), h_dx);
    }
}

//

/// Affine constraint
///
/// <script src="https://polyfill.io/v3/polyfill.min.js?features=es6"></script>
/// <script id="MathJax-script" async src="https://cdn.jsdelivr.net/npm/mathjax@3/es5/tex-mml-chtml.js"></script>
///
/// \\(g(x) = A x - b\\).
pub struct LinearConstraint<L: LinAlgEx>
{
    mat_a: MatBuild<L>,
    vec_b: MatBuild<L>,
}

impl<L: LinAlgEx> LinearConstraint<L>
{
    /// Creates an instance.
    ///
    /// Returns `None` if the sizes mismatch.
    /// * `mat_a` is \\(A\\).
    /// * `vec_b` is \\(b\\), a one-column matrix.
    pub fn new(mat_a: MatBuild<L>, vec_b: MatBuild<L>) -> Option<Self>
    {
        let (m, _) = mat_a.size();

        if vec_b.size() != (m, 1) {
            log::error!("Size mismatch: mat_a{:?}, vec_b{:?}", mat_a.size(), vec_b.size());
            return None;
        }

        Some(LinearConstraint {mat_a, vec_b})
    }
}

impl<L: LinAlgEx> Constraint<L> for LinearConstraint<L>
{
    fn size(&self) -> (usize, usize)
    {
        self.mat_a.size()
    }

    fn eval(&self, x: &L::Sl, y: &mut L::Sl)
    {
        let f1 = L::F::one();

        L::copy(L::Sl::new_ref(self.vec_b.as_ref()), y);
        self.mat_a.as_op().op(f1, x, -f1, y);
    }

    fn p(&self, _x: &L::Sl, dx: &L::Sl, y: &mut L::Sl)
    {
        self.mat_a.as_op().op(L::F::one(), dx, L::F::zero(), y);
    }

    fn ps(&self, _x: &L::Sl, dy: &L::Sl, z: &mut L::Sl)
    {
        self.mat_a.as_op().trans_op(L::F::one(), dy, L::F::zero(), z);
    }

    fn pps(&self, _x: &L::Sl, _dx: &L::Sl, _dy: &L::Sl, z: &mut L::Sl)
    {
        L::zero(z);
    }
}

//

#[test]
fn test_functions1()
{
    use float_eq::assert_float_eq;
    use compstep_core::{FloatGeneric, MatType};

    type L = FloatGeneric<f64>;

    // f = (x0 - 1)^2 / 2 + x1^2
    let sym_p = MatBuild::<L>::new(MatType::Diag(2)).iter_colmaj(&[1., 2.]);
    let vec_q = MatBuild::<L>::new(MatType::General(2, 1)).iter_colmaj(&[-1., 0.]);
    let f = QuadObjective::new(sym_p, vec_q, 0.5).unwrap();

    let x = &[3., 1.];
    assert_float_eq!(f.eval(x), 3., abs <= 1e-12);
    let g = &mut[0.; 2];
    f.grad(x, g);
    assert_float_eq!(*g, [2., 2.], abs_all <= 1e-12);

    // x0 + x1 = 1
    let mat_a = MatBuild::<L>::new(MatType::General(1, 2)).iter_rowmaj(&[1., 1.]);
    let vec_b = MatBuild::<L>::new(MatType::General(1, 1)).iter_colmaj(&[1.]);
    let c = LinearConstraint::new(mat_a, vec_b).unwrap();
    let fns = Functions::new(&f).equality(&c);
    assert_eq!(fns.problem_class(), ProblemClass::EqualityConstrained);
    assert_eq!(fns.dims(), (1, 0));

    let op = JacobianOp::<L>::new(&c, x);
    let y = &mut[f64::NAN];
    op.op(2., &[1., 2.], 0., y);
    assert_float_eq!(*y, [6.], abs_all <= 1e-12);
    op.trans_op(1., &[1.], 1., g);
    assert_float_eq!(*g, [3., 3.], abs_all <= 1e-12);
}
