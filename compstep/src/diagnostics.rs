//! Diagnostics of the user functions and the algebra
//!
//! Finite-difference checks compare a derivative against central differences
//! \\((\phi(x + \epsilon dx) - \phi(x - \epsilon dx)) / 2\epsilon\\) over \\(\epsilon = 10^{-1}, \ldots, 10^{-8}\\),
//! printing the relative error of every step and returning the smallest one.
//! A correct derivative shows errors shrinking with \\(\epsilon\\) until rounding takes over.
//! The other checks print and return a single relative error.

use core::fmt::LowerExp;
use num_traits::{Float, Zero, One};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256StarStar;
use compstep_core::solver::{JordanAlg, LinAlg, SliceLike};
use compstep_core::enums::{FunctionDiagnostics, VectorSpaceDiagnostics};
use crate::{Functions, Objective, Constraint, Messaging};
use crate::format;

const SEED: u64 = 0x5eed_c0de;

/// Random vector with entries uniform in \\([-1, 1)\\).
pub fn random_vec<F: Float, R: Rng>(rng: &mut R, n: usize) -> Vec<F>
{
    (0..n).map(|_| F::from(rng.gen_range(-1.0..1.0)).unwrap_or_else(F::zero)).collect()
}

fn sl<L: LinAlg>(v: &[L::F]) -> &L::Sl
{
    L::Sl::new_ref(v)
}

// x + a*d
fn shifted<L: LinAlg>(x: &[L::F], a: L::F, d: &[L::F]) -> Vec<L::F>
{
    let mut t = x.to_vec();
    L::add(a, sl::<L>(d), L::Sl::new_mut(&mut t));
    t
}

fn rel_err_vec<L: LinAlg>(approx: &[L::F], exact: &[L::F]) -> L::F
{
    let mut d = approx.to_vec();
    L::add(-L::F::one(), sl::<L>(exact), L::Sl::new_mut(&mut d));
    L::norm(sl::<L>(&d)) / (L::F::epsilon() + L::norm(sl::<L>(exact)))
}

fn rel_err<F: Float>(approx: F, exact: F) -> F
{
    (approx - exact).abs() / (F::epsilon() + exact.abs())
}

fn fd_report<F, M, D>(title: &str, msg: &M, mut err_at: D) -> F
where F: Float + LowerExp, M: Messaging, D: FnMut(F) -> F
{
    let ten = F::from(10).unwrap_or_else(F::one);

    msg.print(title);

    let mut best = F::infinity();
    for k in 1..=8 {
        let eps = ten.powi(-k);
        let err = err_at(eps);
        msg.print(format!("{}{}{}", format::string("  step"), format::real(eps), format::real(err)).trim_end());
        best = best.min(err);
    }

    log::debug!("{}: {:.2e}", title, best);
    best
}

fn single_report<F, M>(title: &str, msg: &M, err: F) -> F
where F: Float + LowerExp, M: Messaging
{
    msg.print(format!("{}{}", format::string(title), format::real(err)).trim_end());
    log::debug!("{}: {:.2e}", title, err);
    err
}

// max which propagates NaN
fn worst<F: Float>(errs: &[F]) -> F
{
    errs.iter().fold(F::zero(), |a, &e| if e.is_nan() || a.is_nan() {F::nan()} else {a.max(e)})
}

//

/// Checks \\(\nabla f(x)\\) along `dx`.
pub fn gradient_check<L, M>(f: &dyn Objective<L>, x: &[L::F], dx: &[L::F], msg: &M) -> L::F
where L: LinAlg, L::F: LowerExp, M: Messaging
{
    let f2 = L::F::one() + L::F::one();

    let mut g = vec![L::F::zero(); x.len()];
    f.grad(sl::<L>(x), L::Sl::new_mut(&mut g));
    let dd = L::inner(sl::<L>(&g), sl::<L>(dx));

    fd_report("Finite difference test on the gradient", msg, |eps| {
        let fp = f.eval(sl::<L>(&shifted::<L>(x, eps, dx)));
        let fm = f.eval(sl::<L>(&shifted::<L>(x, -eps, dx)));
        rel_err((fp - fm) / (f2 * eps), dd)
    })
}

/// Checks \\(\nabla^2 f(x) dx\\).
pub fn hessvec_check<L, M>(f: &dyn Objective<L>, x: &[L::F], dx: &[L::F], msg: &M) -> L::F
where L: LinAlg, L::F: LowerExp, M: Messaging
{
    let f0 = L::F::zero();
    let f2 = L::F::one() + L::F::one();
    let n = x.len();

    let mut dd = vec![f0; n];
    f.hessvec(sl::<L>(x), sl::<L>(dx), L::Sl::new_mut(&mut dd));

    fd_report("Finite difference test on the Hessian-vector product", msg, |eps| {
        let mut gp = vec![f0; n];
        let mut gm = vec![f0; n];
        f.grad(sl::<L>(&shifted::<L>(x, eps, dx)), L::Sl::new_mut(&mut gp));
        f.grad(sl::<L>(&shifted::<L>(x, -eps, dx)), L::Sl::new_mut(&mut gm));
        L::add(-L::F::one(), sl::<L>(&gm), L::Sl::new_mut(&mut gp));
        L::scale((f2 * eps).recip(), L::Sl::new_mut(&mut gp));
        rel_err_vec::<L>(&gp, &dd)
    })
}

/// Checks \\(\langle \nabla^2 f(x) dx, dxx \rangle = \langle dx, \nabla^2 f(x) dxx \rangle\\).
pub fn hessvec_symmetry_check<L, M>(f: &dyn Objective<L>, x: &[L::F], dx: &[L::F], dxx: &[L::F], msg: &M) -> L::F
where L: LinAlg, L::F: LowerExp, M: Messaging
{
    let n = x.len();
    let mut h_dx = vec![L::F::zero(); n];
    let mut h_dxx = vec![L::F::zero(); n];
    f.hessvec(sl::<L>(x), sl::<L>(dx), L::Sl::new_mut(&mut h_dx));
    f.hessvec(sl::<L>(x), sl::<L>(dxx), L::Sl::new_mut(&mut h_dxx));

    let a = L::inner(sl::<L>(&h_dx), sl::<L>(dxx));
    let b = L::inner(sl::<L>(dx), sl::<L>(&h_dxx));
    single_report("Symmetry test on the Hessian", msg, rel_err(a, b))
}

/// Checks \\(g'(x) dx\\).
pub fn derivative_check<L, M>(c: &dyn Constraint<L>, x: &[L::F], dx: &[L::F], msg: &M) -> L::F
where L: LinAlg, L::F: LowerExp, M: Messaging
{
    let f0 = L::F::zero();
    let f2 = L::F::one() + L::F::one();
    let (m, _) = c.size();

    let mut dd = vec![f0; m];
    c.p(sl::<L>(x), sl::<L>(dx), L::Sl::new_mut(&mut dd));

    fd_report("Finite difference test on the derivative", msg, |eps| {
        let mut cp = vec![f0; m];
        let mut cm = vec![f0; m];
        c.eval(sl::<L>(&shifted::<L>(x, eps, dx)), L::Sl::new_mut(&mut cp));
        c.eval(sl::<L>(&shifted::<L>(x, -eps, dx)), L::Sl::new_mut(&mut cm));
        L::add(-L::F::one(), sl::<L>(&cm), L::Sl::new_mut(&mut cp));
        L::scale((f2 * eps).recip(), L::Sl::new_mut(&mut cp));
        rel_err_vec::<L>(&cp, &dd)
    })
}

/// Checks \\(\langle g'(x) dx, dy \rangle = \langle dx, g'(x)^* dy \rangle\\).
pub fn derivative_adjoint_check<L, M>(c: &dyn Constraint<L>, x: &[L::F], dx: &[L::F], dy: &[L::F], msg: &M) -> L::F
where L: LinAlg, L::F: LowerExp, M: Messaging
{
    let (m, n) = c.size();
    let mut p_dx = vec![L::F::zero(); m];
    let mut ps_dy = vec![L::F::zero(); n];
    c.p(sl::<L>(x), sl::<L>(dx), L::Sl::new_mut(&mut p_dx));
    c.ps(sl::<L>(x), sl::<L>(dy), L::Sl::new_mut(&mut ps_dy));

    let a = L::inner(sl::<L>(&p_dx), sl::<L>(dy));
    let b = L::inner(sl::<L>(dx), sl::<L>(&ps_dy));
    single_report("Adjoint test on the derivative", msg, rel_err(a, b))
}

/// Checks \\((g''(x) dx)^* dy\\).
pub fn second_derivative_check<L, M>(c: &dyn Constraint<L>, x: &[L::F], dx: &[L::F], dy: &[L::F], msg: &M) -> L::F
where L: LinAlg, L::F: LowerExp, M: Messaging
{
    let f0 = L::F::zero();
    let f2 = L::F::one() + L::F::one();
    let (_, n) = c.size();

    let mut dd = vec![f0; n];
    c.pps(sl::<L>(x), sl::<L>(dx), sl::<L>(dy), L::Sl::new_mut(&mut dd));

    fd_report("Finite difference test on the second derivative", msg, |eps| {
        let mut cp = vec![f0; n];
        let mut cm = vec![f0; n];
        c.ps(sl::<L>(&shifted::<L>(x, eps, dx)), sl::<L>(dy), L::Sl::new_mut(&mut cp));
        c.ps(sl::<L>(&shifted::<L>(x, -eps, dx)), sl::<L>(dy), L::Sl::new_mut(&mut cm));
        L::add(-L::F::one(), sl::<L>(&cm), L::Sl::new_mut(&mut cp));
        L::scale((f2 * eps).recip(), L::Sl::new_mut(&mut cp));
        rel_err_vec::<L>(&cp, &dd)
    })
}

//

/// Checks the vector space operations on `x` and `y` against each other.
///
/// Returns the largest relative error.
pub fn vector_space_check<L, M>(x: &[L::F], y: &[L::F], msg: &M) -> L::F
where L: LinAlg, L::F: LowerExp, M: Messaging
{
    let f1 = L::F::one();
    let a = num_traits::cast::<_, L::F>(0.75).unwrap_or_else(L::F::one);
    let n = x.len();

    // x + y = y + x
    let xy = shifted::<L>(x, f1, y);
    let yx = shifted::<L>(y, f1, x);
    let e_comm = single_report("Commutativity of the addition", msg, rel_err_vec::<L>(&xy, &yx));

    // a(x + y) = ax + ay
    let mut lhs = xy.clone();
    L::scale(a, L::Sl::new_mut(&mut lhs));
    let mut rhs = x.to_vec();
    L::scale(a, L::Sl::new_mut(&mut rhs));
    L::add(a, sl::<L>(y), L::Sl::new_mut(&mut rhs));
    let e_dist = single_report("Distributivity of the scaling", msg, rel_err_vec::<L>(&lhs, &rhs));

    // copy and zero
    let mut t = vec![L::F::zero(); n];
    L::copy(sl::<L>(x), L::Sl::new_mut(&mut t));
    let e_copy = single_report("Copy", msg, rel_err_vec::<L>(&t, x));
    L::zero(L::Sl::new_mut(&mut t));
    let e_zero = single_report("Zero", msg, L::norm(sl::<L>(&t)));

    // <x, y> = <y, x>, ||x||^2 = <x, x>
    let e_sym = single_report("Symmetry of the inner product", msg,
        rel_err(L::inner(sl::<L>(x), sl::<L>(y)), L::inner(sl::<L>(y), sl::<L>(x))));
    let norm_x = L::norm(sl::<L>(x));
    let e_norm = single_report("Norm by the inner product", msg,
        rel_err(norm_x * norm_x, L::inner(sl::<L>(x), sl::<L>(x))));

    worst(&[e_comm, e_dist, e_copy, e_zero, e_sym, e_norm])
}

/// Checks the Euclidean-Jordan algebra operations on `x` and `y` against each other.
///
/// Returns the largest relative error.
pub fn jordan_check<L, M>(x: &[L::F], y: &[L::F], msg: &M) -> L::F
where L: JordanAlg, L::F: LowerExp, M: Messaging
{
    let f0 = L::F::zero();
    let f1 = L::F::one();
    let m = x.len();

    let mut e = vec![f0; m];
    L::id(L::Sl::new_mut(&mut e));

    // x o y = y o x
    let mut xy = vec![f0; m];
    let mut yx = vec![f0; m];
    L::prod(sl::<L>(x), sl::<L>(y), L::Sl::new_mut(&mut xy));
    L::prod(sl::<L>(y), sl::<L>(x), L::Sl::new_mut(&mut yx));
    let e_comm = single_report("Commutativity of the product", msg, rel_err_vec::<L>(&xy, &yx));

    // e o x = x
    let mut ex = vec![f0; m];
    L::prod(sl::<L>(&e), sl::<L>(x), L::Sl::new_mut(&mut ex));
    let e_id = single_report("Identity of the product", msg, rel_err_vec::<L>(&ex, x));

    // p = x o x + e is in the interior
    let mut p = vec![f0; m];
    L::prod(sl::<L>(x), sl::<L>(x), L::Sl::new_mut(&mut p));
    L::add(f1, sl::<L>(&e), L::Sl::new_mut(&mut p));

    // L(p)^-1 (p o y) = y
    let mut py = vec![f0; m];
    let mut t = vec![f0; m];
    L::prod(sl::<L>(&p), sl::<L>(y), L::Sl::new_mut(&mut py));
    L::linv(sl::<L>(&p), sl::<L>(&py), L::Sl::new_mut(&mut t));
    let e_linv = single_report("Inverse of the product operator", msg, rel_err_vec::<L>(&t, y));

    // sqrt(p) o sqrt(p) = p
    let mut s = vec![f0; m];
    L::sqrt(sl::<L>(&p), L::Sl::new_mut(&mut s));
    L::prod(sl::<L>(&s), sl::<L>(&s), L::Sl::new_mut(&mut t));
    let e_sqrt = single_report("Square root", msg, rel_err_vec::<L>(&t, &p));

    // log det e = 0, boundary of e along -e at 1
    let e_barr = single_report("Barrier at the identity", msg, L::barr(sl::<L>(&e)).abs());
    let mut ne = e.clone();
    L::scale(-f1, L::Sl::new_mut(&mut ne));
    let e_srch = single_report("Line search from the identity", msg, rel_err(L::srch(sl::<L>(&ne), sl::<L>(&e)), f1));

    worst(&[e_comm, e_id, e_linv, e_sqrt, e_barr, e_srch])
}

//

/// Runs the diagnostics selected by `f_diag` and `x_diag` at `x` on random directions.
///
/// Returns `false` if any check ends in a non-finite error.
pub fn run<L, M>(fns: &Functions<L>, x: &[L::F], f_diag: FunctionDiagnostics, x_diag: VectorSpaceDiagnostics, msg: &M) -> bool
where L: JordanAlg, L::F: LowerExp, M: Messaging
{
    let mut rng = Xoshiro256StarStar::seed_from_u64(SEED);
    let n = x.len();
    let dx: Vec<L::F> = random_vec(&mut rng, n);
    let dxx: Vec<L::F> = random_vec(&mut rng, n);

    let mut errs = Vec::new();

    if f_diag != FunctionDiagnostics::NoDiagnostics {
        let second = f_diag == FunctionDiagnostics::SecondOrder;

        msg.print("Diagnostics on the objective");
        errs.push(gradient_check(fns.f, x, &dx, msg));
        if second {
            errs.push(hessvec_check(fns.f, x, &dx, msg));
            errs.push(hessvec_symmetry_check(fns.f, x, &dx, &dxx, msg));
        }

        for (name, c) in [("equality", fns.g), ("inequality", fns.h)] {
            if let Some(c) = c {
                let (m, _) = c.size();
                let dy: Vec<L::F> = random_vec(&mut rng, m);

                msg.print(&format!("Diagnostics on the {} constraint", name));
                errs.push(derivative_check(c, x, &dx, msg));
                errs.push(derivative_adjoint_check(c, x, &dx, &dy, msg));
                if second {
                    errs.push(second_derivative_check(c, x, &dx, &dy, msg));
                }
            }
        }
    }

    if x_diag != VectorSpaceDiagnostics::NoDiagnostics {
        msg.print("Diagnostics on the vector space");
        errs.push(vector_space_check::<L, _>(&dx, &dxx, msg));

        if x_diag == VectorSpaceDiagnostics::EuclideanJordan {
            let m = fns.h.map_or(n, |h| h.size().0);
            let u: Vec<L::F> = random_vec(&mut rng, m);
            let v: Vec<L::F> = random_vec(&mut rng, m);

            msg.print("Diagnostics on the Euclidean-Jordan algebra");
            errs.push(jordan_check::<L, _>(&u, &v, msg));
        }
    }

    errs.iter().all(|e| e.is_finite())
}

//

#[test]
fn test_diagnostics1()
{
    use compstep_core::FloatGeneric;
    use crate::LogMessaging;

    type L = FloatGeneric<f64>;

    let _ = env_logger::builder().is_test(true).try_init();

    // f = x0^2 x1 + exp(x1), correct derivatives
    struct F;
    impl Objective<L> for F
    {
        fn eval(&self, x: &[f64]) -> f64 { x[0] * x[0] * x[1] + x[1].exp() }
        fn grad(&self, x: &[f64], g: &mut [f64])
        {
            g[0] = 2. * x[0] * x[1];
            g[1] = x[0] * x[0] + x[1].exp();
        }
        fn hessvec(&self, x: &[f64], dx: &[f64], h_dx: &mut [f64])
        {
            h_dx[0] = 2. * x[1] * dx[0] + 2. * x[0] * dx[1];
            h_dx[1] = 2. * x[0] * dx[0] + x[1].exp() * dx[1];
        }
    }
    // same with a wrong gradient
    struct G;
    impl Objective<L> for G
    {
        fn eval(&self, x: &[f64]) -> f64 { F.eval(x) }
        fn grad(&self, x: &[f64], g: &mut [f64])
        {
            F.grad(x, g);
            g[0] += 1.;
        }
        fn hessvec(&self, x: &[f64], dx: &[f64], h_dx: &mut [f64]) { F.hessvec(x, dx, h_dx); }
    }

    let x = &[0.5, -0.3];
    let dx = &[0.2, 0.7];
    let dxx = &[-0.4, 0.1];
    let msg = LogMessaging;

    assert!(gradient_check::<L, _>(&F, x, dx, &msg) < 1e-8);
    assert!(hessvec_check::<L, _>(&F, x, dx, &msg) < 1e-8);
    assert!(hessvec_symmetry_check::<L, _>(&F, x, dx, dxx, &msg) < 1e-12);
    assert!(gradient_check::<L, _>(&G, x, dx, &msg) > 1e-2);

    assert!(vector_space_check::<L, _>(dx, dxx, &msg) < 1e-12);
    assert!(jordan_check::<L, _>(dx, dxx, &msg) < 1e-12);

    let fns = Functions::<L>::new(&F);
    assert!(run(&fns, x, FunctionDiagnostics::SecondOrder, VectorSpaceDiagnostics::EuclideanJordan, &msg));
}
