//! Augmented system solves through the normal equations

use num_traits::{Float, Zero, One, ToPrimitive};
use core::marker::PhantomData;
use crate::solver::{LinAlg, Operator, SliceLike, SolverError};
use crate::splitm_mut;

//

/// Parameters of [`NormalEq`].
#[derive(Debug, Clone, PartialEq)]
pub struct NormalEqParam<F: Float>
{
    /// Max iteration number of conjugate gradient.
    pub max_iter: usize,
    /// Tolerance of the residual relative to the right-hand side.
    pub eps_rel: F,
}

impl<F: Float> Default for NormalEqParam<F>
{
    fn default() -> Self
    {
        let ten = F::from(10).unwrap_or_else(F::one);

        NormalEqParam {
            max_iter: 200,
            eps_rel: ten.powi(-10),
        }
    }
}

//

/// Augmented system solver.
///
/// <script src="https://polyfill.io/v3/polyfill.min.js?features=es6"></script>
/// <script id="MathJax-script" async src="https://cdn.jsdelivr.net/npm/mathjax@3/es5/tex-mml-chtml.js"></script>
///
/// The augmented system
/// \\[
/// \begin{bmatrix} I & A^T \\\\ A & 0 \end{bmatrix}
/// \begin{bmatrix} u \\\\ w \end{bmatrix} =
/// \begin{bmatrix} v \\\\ b \end{bmatrix}
/// \\]
/// is reduced to its Schur complement \\(AA^T w = Av - b\\), \\(u = v - A^T w\\),
/// which is solved by conjugate gradient in the range space of \\(A\\).
/// A rank-deficient \\(A\\) stops the iteration at the least-squares solution reached so far.
pub struct NormalEq<L: LinAlg>
{
    ph_l: PhantomData<L>,
    /// Solver parameters.
    pub par: NormalEqParam<L::F>,
}

impl<L: LinAlg> NormalEq<L>
{
    /// Query of a length of work slice.
    ///
    /// Returns a length of work slice that the methods of [`NormalEq`] require.
    /// * `op_a_size` is a number of rows and columns of \\(A\\).
    pub fn query_worklen(op_a_size: (usize, usize)) -> usize
    {
        let (m, n) = op_a_size;

        m * 3 + // r, p, q
        n +     // t
        m * 2   // w, rhs
    }

    /// Creates an instance.
    ///
    /// Returns [`NormalEq`] instance.
    pub fn new() -> Self
    {
        NormalEq {
            ph_l: PhantomData,
            par: NormalEqParam::default(),
        }
    }

    /// Changes solver parameters.
    ///
    /// Returns [`NormalEq`] with its parameters changed.
    /// * `f` is a function to change parameters given by its argument.
    pub fn par<P>(mut self, f: P) -> Self
    where P: FnOnce(&mut NormalEqParam<L::F>)
    {
        f(&mut self.par);
        self
    }

    /// Solves \\(AA^T w = b\\).
    ///
    /// Returns `Ok` with the number of iterations, or `Err` on a size mismatch or a non-finite value.
    /// * `op_a` is \\(A\\).
    /// * `b` is \\(b\\).
    /// * `w` is \\(w\\) on exit.
    /// * `work` slice is used for temporal variables.
    pub fn solve<O>(&self, op_a: &O, b: &L::Sl, w: &mut L::Sl, work: &mut L::Sl) -> Result<usize, SolverError>
    where O: Operator<L>
    {
        let (m, n) = op_a.size();

        if b.len() != m || w.len() != m {
            log::error!("Size mismatch: op_a{:?}, b {}, w {}", op_a.size(), b.len(), w.len());
            return Err(SolverError::InvalidOp);
        }
        if work.len() < m * 3 + n {
            log::error!("Work memory length {} must be >= {}", work.len(), m * 3 + n);
            return Err(SolverError::WorkShortage);
        }

        let f0 = L::F::zero();
        let f1 = L::F::one();

        splitm_mut!(work, (r; m), (p; m), (q; m), (t; n));

        L::zero(w);
        L::copy(b, r);
        L::copy(b, p);

        let mut rr = L::inner(r, r);
        let norm_b = rr.sqrt();
        if !norm_b.is_finite() {
            return Err(SolverError::NumericalInstability);
        }
        if norm_b == f0 {
            return Ok(0);
        }

        let mut i = 0;
        while i < self.par.max_iter {
            i += 1;

            // q = A*A^T*p
            op_a.trans_op(f1, p, f0, t);
            op_a.op(f1, t, f0, q);

            let ptq = L::inner(t, t);
            if !ptq.is_finite() {
                return Err(SolverError::NumericalInstability);
            }
            if ptq <= f0 {
                log::trace!("normal_eq {}: breakdown", i);
                break;
            }

            let alpha = rr / ptq;
            L::add(alpha, p, w);
            L::add(-alpha, q, r);

            let rr_next = L::inner(r, r);
            log::trace!("normal_eq {}: rel_res {:.2e}", i, (rr_next.sqrt() / norm_b).to_f64().unwrap_or(f64::NAN));
            if rr_next.sqrt() <= self.par.eps_rel * norm_b {
                break;
            }

            let beta = rr_next / rr;
            rr = rr_next;
            L::scale(beta, p);
            L::add(f1, r, p);
        }

        if w.is_finite() {
            Ok(i)
        }
        else {
            Err(SolverError::NumericalInstability)
        }
    }

    /// Least-norm solution of the linearized equation \\(Au = -g\\).
    ///
    /// Calculates \\(u = A^T w\\) with \\(AA^T w = -g\\).
    ///
    /// Returns `Ok` with the number of iterations, or `Err` as [`NormalEq::solve`].
    /// * `op_a` is \\(A\\).
    /// * `g` is \\(g\\).
    /// * `u` is \\(u\\) on exit.
    /// * `work` slice is used for temporal variables.
    pub fn least_norm<O>(&self, op_a: &O, g: &L::Sl, u: &mut L::Sl, work: &mut L::Sl) -> Result<usize, SolverError>
    where O: Operator<L>
    {
        let (m, n) = op_a.size();

        if u.len() != n {
            log::error!("Size mismatch: op_a{:?}, u {}", op_a.size(), u.len());
            return Err(SolverError::InvalidOp);
        }
        if work.len() < Self::query_worklen((m, n)) {
            log::error!("Work memory length {} must be >= {}", work.len(), Self::query_worklen((m, n)));
            return Err(SolverError::WorkShortage);
        }

        let f0 = L::F::zero();
        let f1 = L::F::one();

        splitm_mut!(work, (w; m), (rhs; m), (rest; m * 3 + n));

        L::copy(g, rhs);
        L::scale(-f1, rhs);

        let iter = self.solve(op_a, rhs, w, rest)?;

        op_a.trans_op(f1, w, f0, u);

        Ok(iter)
    }

    /// Projection onto the null space of \\(A\\).
    ///
    /// Calculates \\(u = v - A^T w\\) with \\(AA^T w = Av\\).
    ///
    /// Returns `Ok` with the number of iterations, or `Err` as [`NormalEq::solve`].
    /// * `op_a` is \\(A\\).
    /// * `v` is \\(v\\).
    /// * `u` is \\(u\\) on exit.
    /// * `work` slice is used for temporal variables.
    pub fn project<O>(&self, op_a: &O, v: &L::Sl, u: &mut L::Sl, work: &mut L::Sl) -> Result<usize, SolverError>
    where O: Operator<L>
    {
        let (m, n) = op_a.size();

        if v.len() != n || u.len() != n {
            log::error!("Size mismatch: op_a{:?}, v {}, u {}", op_a.size(), v.len(), u.len());
            return Err(SolverError::InvalidOp);
        }
        if work.len() < Self::query_worklen((m, n)) {
            log::error!("Work memory length {} must be >= {}", work.len(), Self::query_worklen((m, n)));
            return Err(SolverError::WorkShortage);
        }

        let f0 = L::F::zero();
        let f1 = L::F::one();

        splitm_mut!(work, (w; m), (rhs; m), (rest; m * 3 + n));

        op_a.op(f1, v, f0, rhs);

        let iter = self.solve(op_a, rhs, w, rest)?;

        L::copy(v, u);
        op_a.trans_op(-f1, w, f1, u);

        Ok(iter)
    }
}

//

#[test]
fn test_normal_eq1()
{
    use float_eq::assert_float_eq;
    use crate::{FloatGeneric, MatOp, MatType};

    type L = FloatGeneric<f64>;

    let array = &[ // column-major
        1.,
        1.,
    ];
    let op_a = MatOp::<L>::new(MatType::General(1, 2), array);
    let ne = NormalEq::<L>::new();
    let work = &mut alloc::vec![0.; NormalEq::<L>::query_worklen((1, 2))];

    let u = &mut[0.; 2];
    ne.project(&op_a, &[1., 0.], u, work).unwrap();
    assert_float_eq!(*u, [0.5, -0.5], abs_all <= 1e-9);

    ne.least_norm(&op_a, &[-1.], u, work).unwrap();
    assert_float_eq!(*u, [0.5, 0.5], abs_all <= 1e-9);
}
