//! Limited-memory quasi-Newton operators

use std::collections::VecDeque;
use std::marker::PhantomData;
use num_traits::{Float, Zero, One};
use compstep_core::solver::{LinAlg, Operator, SliceLike};
use compstep_core::enums::OperatorKind;

//

/// Stores a pair of a step and a gradient difference, newest first,
/// keeping at most `stored_history` pairs.
pub fn push_history<F: Float>(old_s: &mut VecDeque<Vec<F>>, old_y: &mut VecDeque<Vec<F>>,
    s: Vec<F>, y: Vec<F>, stored_history: usize)
{
    if stored_history == 0 {
        old_s.clear();
        old_y.clear();
        return;
    }

    old_s.push_front(s);
    old_y.push_front(y);
    old_s.truncate(stored_history);
    old_y.truncate(stored_history);
}

//

/// Limited-memory quasi-Newton operator
///
/// <script src="https://polyfill.io/v3/polyfill.min.js?features=es6"></script>
/// <script id="MathJax-script" async src="https://cdn.jsdelivr.net/npm/mathjax@3/es5/tex-mml-chtml.js"></script>
///
/// Built from the stored pairs \\((s_i, y_i)\\) on the identity:
/// * [`OperatorKind::BFGS`] and [`OperatorKind::SR1`] approximate the Hessian,
/// * [`OperatorKind::InvBFGS`] and [`OperatorKind::InvSR1`] approximate its inverse,
/// * [`OperatorKind::Identity`] and [`OperatorKind::ScaledIdentity`] ignore the pairs.
///
/// Pairs which would break the update (nonpositive curvature for BFGS, a vanishing denominator for SR1) are skipped.
pub struct QuasiNewton<'a, L: LinAlg>
{
    ph_l: PhantomData<L>,
    kind: OperatorKind,
    n: usize,
    scale: L::F,
    old_s: &'a VecDeque<Vec<L::F>>,
    old_y: &'a VecDeque<Vec<L::F>>,
}

impl<'a, L: LinAlg> QuasiNewton<'a, L>
{
    /// Creates an instance.
    ///
    /// [`OperatorKind::UserDefined`] is not a quasi-Newton operator and acts as the identity.
    /// * `kind` is the kind of the operator.
    /// * `n` is the dimension.
    /// * `scale` is the factor of [`OperatorKind::ScaledIdentity`], ignored otherwise.
    /// * `old_s` and `old_y` are the stored pairs, newest first.
    pub fn new(kind: OperatorKind, n: usize, scale: L::F,
        old_s: &'a VecDeque<Vec<L::F>>, old_y: &'a VecDeque<Vec<L::F>>) -> Self
    {
        QuasiNewton {
            ph_l: PhantomData,
            kind, n, scale, old_s, old_y,
        }
    }

    fn sl(v: &[L::F]) -> &L::Sl
    {
        L::Sl::new_ref(v)
    }

    // pairs oldest first
    fn pairs(&self) -> Vec<(&[L::F], &[L::F])>
    {
        self.old_s.iter().rev().zip(self.old_y.iter().rev())
            .map(|(s, y)| (s.as_slice(), y.as_slice()))
            .collect()
    }

    // B*v = v + sum_j (b_j^T v / c_j) b_j - (a_j^T v / d_j) a_j, built oldest first
    fn apply_bfgs(&self, v: &L::Sl, out: &mut L::Sl)
    {
        let f0 = L::F::zero();
        let mut terms: Vec<(Vec<L::F>, L::F, &[L::F], L::F)> = Vec::new(); // (B_j s_j, s_j^T B_j s_j, y_j, y_j^T s_j)

        for (s, y) in self.pairs() {
            let mut bs = s.to_vec();
            for (bs_j, sbs_j, y_j, ys_j) in terms.iter() {
                let a = -L::inner(Self::sl(bs_j), Self::sl(s)) / *sbs_j;
                let b = L::inner(Self::sl(y_j), Self::sl(s)) / *ys_j;
                L::add(a, Self::sl(bs_j), L::Sl::new_mut(&mut bs));
                L::add(b, Self::sl(y_j), L::Sl::new_mut(&mut bs));
            }
            let sbs = L::inner(Self::sl(s), Self::sl(&bs));
            let ys = L::inner(Self::sl(y), Self::sl(s));
            if ys > f0 && sbs > f0 {
                terms.push((bs, sbs, y, ys));
            }
        }

        L::copy(v, out);
        for (bs_j, sbs_j, y_j, ys_j) in terms.iter() {
            let a = -L::inner(Self::sl(bs_j), v) / *sbs_j;
            let b = L::inner(Self::sl(y_j), v) / *ys_j;
            L::add(a, Self::sl(bs_j), out);
            L::add(b, Self::sl(y_j), out);
        }
    }

    // H*v by the two-loop recursion
    fn apply_inv_bfgs(&self, v: &L::Sl, out: &mut L::Sl)
    {
        let f0 = L::F::zero();

        let valid: Vec<(&[L::F], &[L::F], L::F)> = self.old_s.iter().zip(self.old_y.iter())
            .map(|(s, y)| (s.as_slice(), y.as_slice(), L::inner(Self::sl(y), Self::sl(s))))
            .filter(|(_, _, ys)| *ys > f0)
            .collect();

        L::copy(v, out);

        // newest first
        let mut a = Vec::with_capacity(valid.len());
        for (s, y, ys) in valid.iter() {
            let a_i = L::inner(Self::sl(s), out) / *ys;
            L::add(-a_i, Self::sl(y), out);
            a.push(a_i);
        }

        // oldest first
        for ((s, y, ys), a_i) in valid.iter().zip(a.iter()).rev() {
            let b_i = L::inner(Self::sl(y), out) / *ys;
            L::add(*a_i - b_i, Self::sl(s), out);
        }
    }

    // SR1 on (u, w) pairs: M*v = v + sum_j (r_j^T v / r_j^T u_j) r_j, r_j = w_j - M_j u_j
    fn apply_sr1(&self, inverse: bool, v: &L::Sl, out: &mut L::Sl)
    {
        let eps = L::F::epsilon().sqrt();
        let mut terms: Vec<(Vec<L::F>, L::F)> = Vec::new(); // (r_j, r_j^T u_j)

        for (s, y) in self.pairs() {
            let (u, w) = if inverse {(y, s)} else {(s, y)};

            // r = w - M_j*u
            let mut r = w.to_vec();
            L::add(-L::F::one(), Self::sl(u), L::Sl::new_mut(&mut r));
            for (r_j, ru_j) in terms.iter() {
                let c = L::inner(Self::sl(r_j), Self::sl(u)) / *ru_j;
                L::add(-c, Self::sl(r_j), L::Sl::new_mut(&mut r));
            }

            let ru = L::inner(Self::sl(&r), Self::sl(u));
            if ru.abs() > eps * L::norm(Self::sl(&r)) * L::norm(Self::sl(u)) {
                terms.push((r, ru));
            }
        }

        L::copy(v, out);
        for (r_j, ru_j) in terms.iter() {
            let c = L::inner(Self::sl(r_j), v) / *ru_j;
            L::add(c, Self::sl(r_j), out);
        }
    }
}

impl<'a, L: LinAlg> Operator<L> for QuasiNewton<'a, L>
{
    fn size(&self) -> (usize, usize)
    {
        (self.n, self.n)
    }

    fn op(&self, alpha: L::F, x: &L::Sl, beta: L::F, y: &mut L::Sl)
    {
        let f0 = L::F::zero();

        let mut t = vec![f0; self.n];
        let t = L::Sl::new_mut(&mut t);

        match self.kind {
            OperatorKind::Identity | OperatorKind::UserDefined => L::copy(x, t),
            OperatorKind::ScaledIdentity => {
                L::copy(x, t);
                L::scale(self.scale, t);
            },
            OperatorKind::BFGS => self.apply_bfgs(x, t),
            OperatorKind::InvBFGS => self.apply_inv_bfgs(x, t),
            OperatorKind::SR1 => self.apply_sr1(false, x, t),
            OperatorKind::InvSR1 => self.apply_sr1(true, x, t),
        }

        if beta == f0 {
            L::zero(y);
        }
        else {
            L::scale(beta, y);
        }
        L::add(alpha, t, y);
    }

    fn trans_op(&self, alpha: L::F, x: &L::Sl, beta: L::F, y: &mut L::Sl)
    {
        // symmetric
        self.op(alpha, x, beta, y);
    }
}

//

#[test]
fn test_quasi_newton1()
{
    use float_eq::assert_float_eq;
    use compstep_core::FloatGeneric;

    type L = FloatGeneric<f64>;

    // pairs taken from H = diag(2, 4)
    let mut old_s = VecDeque::new();
    let mut old_y = VecDeque::new();
    push_history(&mut old_s, &mut old_y, vec![1., 0.], vec![2., 0.], 2);
    push_history(&mut old_s, &mut old_y, vec![0., 1.], vec![0., 4.], 2);

    let v = &[1., 1.];
    let out = &mut[0.; 2];

    for kind in [OperatorKind::BFGS, OperatorKind::SR1] {
        let op = QuasiNewton::<L>::new(kind, 2, 1., &old_s, &old_y);
        op.op(1., v, 0., out);
        assert_float_eq!(*out, [2., 4.], abs_all <= 1e-12);
    }

    for kind in [OperatorKind::InvBFGS, OperatorKind::InvSR1] {
        let op = QuasiNewton::<L>::new(kind, 2, 1., &old_s, &old_y);
        op.op(1., v, 0., out);
        assert_float_eq!(*out, [0.5, 0.25], abs_all <= 1e-12);
    }

    let op = QuasiNewton::<L>::new(OperatorKind::ScaledIdentity, 2, 3., &old_s, &old_y);
    op.op(1., v, 1., out);
    assert_float_eq!(*out, [3.5, 3.25], abs_all <= 1e-12);

    push_history(&mut old_s, &mut old_y, vec![1., 1.], vec![2., 4.], 2);
    assert_eq!(old_s.len(), 2);
    assert_eq!(old_s[0], vec![1., 1.]);
}
