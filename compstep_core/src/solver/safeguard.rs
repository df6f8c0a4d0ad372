//! Safeguard against leaving the strictly feasible region

use num_traits::{Float, One, Zero};
use crate::solver::{JordanAlg, LinAlg, Operator, SliceLike, SolverError};
use crate::splitm_mut;

/// Safeguard trait
///
/// <script src="https://polyfill.io/v3/polyfill.min.js?features=es6"></script>
/// <script id="MathJax-script" async src="https://cdn.jsdelivr.net/npm/mathjax@3/es5/tex-mml-chtml.js"></script>
///
/// Measures how far a step may go before it reaches a constraint bound.
pub trait Safeguard<L: LinAlg>
{
    /// Fraction of a step that stays safe.
    ///
    /// Returns the largest \\(\alpha \in [0, 1]\\) such that \\(b + \alpha d\\) is safe.
    /// `0` means that `base` itself is not safe.
    /// * `base` is a step \\(b\\) already taken.
    /// * `dir` is a step \\(d\\) to be added.
    fn step_fraction(&mut self, base: &L::Sl, dir: &L::Sl) -> L::F;
}

impl<L: LinAlg, S: Safeguard<L> + ?Sized> Safeguard<L> for &mut S
{
    fn step_fraction(&mut self, base: &L::Sl, dir: &L::Sl) -> L::F
    {
        (**self).step_fraction(base, dir)
    }
}

//

/// Safeguard of unconstrained problems, every step is safe.
pub struct NoSafeguard;

impl<L: LinAlg> Safeguard<L> for NoSafeguard
{
    fn step_fraction(&mut self, _base: &L::Sl, _dir: &L::Sl) -> L::F
    {
        L::F::one()
    }
}

//

/// Safeguard of a linearized inequality constraint.
///
/// <script src="https://polyfill.io/v3/polyfill.min.js?features=es6"></script>
/// <script id="MathJax-script" async src="https://cdn.jsdelivr.net/npm/mathjax@3/es5/tex-mml-chtml.js"></script>
///
/// With the slack \\(h(x) \succ 0\\) and the Jacobian \\(h'(x)\\),
/// a step \\(s\\) is safe when
/// \\[
/// \kappa h(x) + h'(x) s \succeq 0,
/// \\]
/// that is, the linearized constraint keeps at least \\(1-\kappa\\) of its current slack.
/// For an affine \\(h\\) the step never reaches the bound when \\(0 < \kappa < 1\\).
pub struct LinSafeguard<'a, L, O>
where L: JordanAlg, O: Operator<L>
{
    op_h: O,
    h_x: &'a L::Sl,
    kappa: L::F,
    work: &'a mut L::Sl,
}

impl<'a, L, O> LinSafeguard<'a, L, O>
where L: JordanAlg, O: Operator<L>
{
    /// Query of a length of work slice.
    ///
    /// Returns a length of work slice that [`LinSafeguard::new`] requires.
    /// * `m` is the dimension of the inequality constraint.
    pub fn query_worklen(m: usize) -> usize
    {
        m * 2
    }

    /// Creates an instance.
    ///
    /// Returns [`LinSafeguard`] instance, or `Err` if sizes mismatch.
    /// * `op_h` is the Jacobian \\(h'(x)\\).
    /// * `h_x` is the slack \\(h(x)\\) at the current iterate.
    /// * `kappa` is the margin \\(\kappa\\).
    /// * `work` slice is used for temporal variables.
    pub fn new(op_h: O, h_x: &'a L::Sl, kappa: L::F, work: &'a mut L::Sl) -> Result<Self, SolverError>
    {
        let (m, _) = op_h.size();

        if h_x.len() != m {
            log::error!("Size mismatch: op_h{:?}, h_x {}", op_h.size(), h_x.len());
            return Err(SolverError::InvalidOp);
        }
        if work.len() < Self::query_worklen(m) {
            log::error!("Work memory length {} must be >= {}", work.len(), Self::query_worklen(m));
            return Err(SolverError::WorkShortage);
        }

        Ok(LinSafeguard {
            op_h, h_x, kappa, work,
        })
    }
}

impl<'a, L, O> Safeguard<L> for LinSafeguard<'a, L, O>
where L: JordanAlg, O: Operator<L>
{
    fn step_fraction(&mut self, base: &L::Sl, dir: &L::Sl) -> L::F
    {
        let f0 = L::F::zero();
        let f1 = L::F::one();
        let m = self.h_x.len();

        splitm_mut!(self.work, (y; m), (d; m));

        // y = kappa*h(x) + h'(x)*base
        L::copy(self.h_x, y);
        self.op_h.op(f1, base, self.kappa, y);

        // base shall be safe itself: lambda_min(y) >= 0 up to rounding
        L::id(d);
        L::scale(-f1, d);
        let lmin = L::srch(d, y);
        let tol = L::F::epsilon().sqrt() * self.kappa * L::norm(self.h_x);
        if lmin.is_nan() || lmin < -tol {
            return f0;
        }

        // d = h'(x)*dir
        self.op_h.op(f1, dir, f0, d);

        let alpha = L::srch(d, y);
        if alpha.is_nan() {
            f0
        }
        else {
            alpha.min(f1).max(f0)
        }
    }
}
