//! Truncated conjugate gradient

use num_traits::{Float, Zero, One, ToPrimitive};
use core::marker::PhantomData;
use crate::enums::TruncatedStop;
use crate::solver::{LinAlg, Operator, Safeguard, SliceLike, SolverError};
use crate::{splitm, splitm_mut};

//

/// Parameters of [`TruncatedCg`].
#[derive(Debug, Clone, PartialEq)]
pub struct TruncatedParam<F: Float>
{
    /// Max iteration number.
    pub iter_max: usize,
    /// Tolerance of the preconditioned residual relative to the initial one.
    pub eps: F,
    /// Number of past residuals that the current one is checked to be orthogonal to.
    /// `0` disables the check.
    pub orthog_max: usize,
    /// Max number of steps cut by the safeguard before giving up.
    pub failed_safeguard_max: usize,
    /// Tolerance of the operator and preconditioner symmetry checks.
    pub eps_sym: F,
    /// Tolerance of the projector check.
    pub eps_proj: F,
    /// Tolerance of the orthogonality check.
    pub eps_orth: F,
}

impl<F: Float> Default for TruncatedParam<F>
{
    fn default() -> Self
    {
        let ten = F::from(10).unwrap_or_else(F::one);

        TruncatedParam {
            iter_max: 100,
            eps: ten.powi(-2),
            orthog_max: 1,
            failed_safeguard_max: 5,
            eps_sym: ten.powi(-6),
            eps_proj: ten.powi(-6),
            eps_orth: ten.powi(-1),
        }
    }
}

//

/// Result of [`TruncatedCg::solve`].
#[derive(Debug, Clone, PartialEq)]
pub struct TruncatedResult<F: Float>
{
    /// Reason why the iteration stopped.
    pub stop: TruncatedStop,
    /// Number of iterations.
    pub iter: usize,
    /// Number of steps cut by the safeguard.
    pub failed_safeguard: usize,
    /// Model value \\(m(s)\\) of the returned step.
    pub model: F,
}

//

/// Truncated conjugate gradient solver.
///
/// <script src="https://polyfill.io/v3/polyfill.min.js?features=es6"></script>
/// <script id="MathJax-script" async src="https://cdn.jsdelivr.net/npm/mathjax@3/es5/tex-mml-chtml.js"></script>
///
/// Steihaug-Toint method for the trust-region subproblem
/// \\[
/// \begin{array}{ll}
/// {\rm minimize} & m(s) = \langle g, s \rangle + \frac12 \langle s, Hs \rangle \\\\
/// {\rm subject \ to} & \\| s_o + s \\| \le \delta \\\\
/// & s_o + s \ {\rm is \ safe}
/// \end{array}
/// \\]
/// with a symmetric \\(H\\), possibly indefinite, and an offset \\(s_o\\).
/// The recurrence is preconditioned by \\(CBC\\), where \\(B\\) is a symmetric positive definite preconditioner
/// and \\(C\\) is a projector onto the space the step shall stay in.
pub struct TruncatedCg<L: LinAlg>
{
    ph_l: PhantomData<L>,
    /// Solver parameters.
    pub par: TruncatedParam<L::F>,
}

impl<L: LinAlg> TruncatedCg<L>
{
    /// Query of a length of work slice.
    ///
    /// Returns a length of work slice that [`TruncatedCg::solve`] requires.
    /// * `n` is the dimension of the step.
    /// * `orthog_max` shall be the same value as [`TruncatedParam::orthog_max`].
    pub fn query_worklen(n: usize, orthog_max: usize) -> usize
    {
        n * 11 +            // r, z, p, hp, r_prev, z_prev, p_prev, hp_prev, x, t1, t2
        orthog_max * n +    // past z
        orthog_max          // past <r, z>
    }

    /// Creates an instance.
    ///
    /// Returns [`TruncatedCg`] instance.
    pub fn new() -> Self
    {
        TruncatedCg {
            ph_l: PhantomData,
            par: TruncatedParam::default(),
        }
    }

    /// Changes solver parameters.
    ///
    /// Returns [`TruncatedCg`] with its parameters changed.
    /// * `f` is a function to change parameters given by its argument.
    pub fn par<P>(mut self, f: P) -> Self
    where P: FnOnce(&mut TruncatedParam<L::F>)
    {
        f(&mut self.par);
        self
    }

    fn boundary(x: &L::Sl, p: &L::Sl, delta: L::F) -> L::F
    {
        let f0 = L::F::zero();
        let f2 = L::F::one() + L::F::one();

        // ||x + sigma*p|| = delta, sigma >= 0
        let a = L::inner(p, p);
        let b = f2 * L::inner(x, p);
        let c = (L::inner(x, x) - delta * delta).min(f0);

        if a <= f0 {
            return f0;
        }

        let disc = (b * b - f2 * f2 * a * c).max(f0).sqrt();
        if b >= f0 {
            if b + disc > f0 {(f2 * -c) / (b + disc)} else {f0}
        }
        else {
            (disc - b) / (f2 * a)
        }
    }

    /// Starts to solve the subproblem.
    ///
    /// Returns `Ok` with [`TruncatedResult`], or `Err` on a size mismatch or a work shortage.
    /// Numerical troubles of the operators are not errors but reported through [`TruncatedResult::stop`];
    /// the step returned with them is the last one reached safely.
    /// * `op_h` is the operator \\(H\\).
    /// * `op_b` is the preconditioner \\(B\\).
    /// * `op_c` is the projector \\(C\\).
    /// * `g` is the gradient \\(g\\) of the model.
    /// * `offset` is the offset \\(s_o\\).
    /// * `delta` is the trust-region radius \\(\delta\\), which may be infinite.
    /// * `safeguard` measures the safe fraction of a step from \\(s_o + s\\).
    /// * `s` is the step \\(s\\) on exit.
    /// * `work` slice is used for temporal variables.
    pub fn solve<OH, OB, OC, S>(&self,
        op_h: OH, op_b: OB, op_c: OC,
        g: &L::Sl, offset: &L::Sl, delta: L::F, mut safeguard: S,
        s: &mut L::Sl, work: &mut L::Sl) -> Result<TruncatedResult<L::F>, SolverError>
    where OH: Operator<L>, OB: Operator<L>, OC: Operator<L>, S: Safeguard<L>
    {
        let n = g.len();
        let om = self.par.orthog_max;

        if op_h.size() != (n, n) || op_b.size() != (n, n) || op_c.size() != (n, n) {
            log::error!("Size mismatch: g {}, op_h{:?}, op_b{:?}, op_c{:?}", n, op_h.size(), op_b.size(), op_c.size());
            return Err(SolverError::InvalidOp);
        }
        if offset.len() != n || s.len() != n {
            log::error!("Size mismatch: g {}, offset {}, s {}", n, offset.len(), s.len());
            return Err(SolverError::InvalidOp);
        }
        if work.len() < Self::query_worklen(n, om) {
            log::error!("Work memory length {} must be >= {}", work.len(), Self::query_worklen(n, om));
            return Err(SolverError::WorkShortage);
        }

        let f0 = L::F::zero();
        let f1 = L::F::one();
        let f2 = f1 + f1;
        let fh = f1 / f2;

        splitm_mut!(work,
            (r; n), (z; n), (p; n), (hp; n),
            (r_prev; n), (z_prev; n), (p_prev; n), (hp_prev; n),
            (x; n), (t1; n), (t2; n),
            (past_z; om * n), (past_rz; om)
        );

        L::zero(s);

        let mut result = TruncatedResult {
            stop: TruncatedStop::NotConverged,
            iter: 0,
            failed_safeguard: 0,
            model: f0,
        };

        // offset shall be feasible
        let norm_offset = L::norm(offset);
        if !(norm_offset <= delta * (f1 + L::F::epsilon().sqrt())) {
            log::debug!("offset {:.3e} is out of the trust region {:.3e}",
                norm_offset.to_f64().unwrap_or(f64::NAN), delta.to_f64().unwrap_or(f64::NAN));
            result.stop = TruncatedStop::OffsetViolatesTrustRegion;
            return Ok(result);
        }
        L::zero(t1);
        if safeguard.step_fraction(t1, offset) < f1 {
            log::debug!("offset is not safe");
            result.stop = TruncatedStop::OffsetViolatesSafeguard;
            return Ok(result);
        }

        L::copy(offset, x);
        L::copy(g, r);
        L::scale(-f1, r);

        let mut norm_z0 = f0;
        let mut model = f0;
        let mut seq = 0; // iterations since the last (re)start
        let mut rz_prev = f0;

        loop {
            if result.iter >= self.par.iter_max {
                result.stop = TruncatedStop::MaxItersExceeded;
                break;
            }

            // z = C*B*C*r
            op_c.op(f1, r, f0, t1);
            op_c.op(f1, t1, f0, t2);
            L::add(-f1, t1, t2);
            let norm_cr = L::norm(t1);
            if !norm_cr.is_finite() {
                result.stop = TruncatedStop::NanPreconditioner;
                break;
            }
            if L::norm(t2) > self.par.eps_proj * norm_cr.max(f1) {
                result.stop = TruncatedStop::NonProjectorPreconditioner;
                break;
            }
            op_b.op(f1, t1, f0, t2);
            op_c.op(f1, t2, f0, z);
            if !z.is_finite() {
                result.stop = TruncatedStop::NanPreconditioner;
                break;
            }

            let norm_z = L::norm(z);
            if result.iter == 0 {
                norm_z0 = norm_z;
            }
            if norm_z <= self.par.eps * norm_z0 {
                result.stop = TruncatedStop::RelativeErrorSmall;
                break;
            }

            let rz = L::inner(r, z);

            if seq > 0 {
                // <z_k, r_{k-1}> = <r_k, z_{k-1}>
                let zr = L::inner(z, r_prev);
                let rz_swap = L::inner(r, z_prev);
                let scl = norm_z * L::norm(r_prev) + L::norm(r) * L::norm(z_prev);
                if (zr - rz_swap).abs() > self.par.eps_sym * scl {
                    result.stop = TruncatedStop::NonSymmetricPreconditioner;
                    break;
                }

                // <r_k, z_j> = 0, j < k
                let mut lost = false;
                for j in 0.. om.min(seq) {
                    splitm!(past_z, (_z; j * n), (zj; n));
                    let rzj = past_rz.get(j);
                    if L::inner(r, zj).abs() > self.par.eps_orth * (rz.abs() * rzj.abs()).sqrt() {
                        lost = true;
                    }
                }
                if lost {
                    result.stop = TruncatedStop::LossOfOrthogonality;
                    break;
                }
            }
            if om > 0 {
                let j = seq % om;
                splitm_mut!(past_z, (_z; j * n), (zj; n));
                L::copy(z, zj);
                past_rz.set(j, rz);
            }

            // p = z + beta*p
            if seq == 0 {
                L::copy(z, p);
            }
            else {
                let beta = rz / rz_prev;
                L::scale(beta, p);
                L::add(f1, z, p);
            }

            op_h.op(f1, p, f0, hp);
            if !hp.is_finite() {
                result.stop = TruncatedStop::NanOperator;
                break;
            }

            if seq > 0 {
                // <Hp_k, p_{k-1}> = <p_k, Hp_{k-1}>
                let a = L::inner(hp, p_prev);
                let b = L::inner(p, hp_prev);
                let scl = L::norm(hp) * L::norm(p_prev) + L::norm(p) * L::norm(hp_prev);
                if (a - b).abs() > self.par.eps_sym * scl {
                    result.stop = TruncatedStop::NonSymmetricOperator;
                    break;
                }
            }

            result.iter += 1;

            let kappa = L::inner(p, hp);
            let rp = L::inner(r, p);

            log::trace!("truncated_cg {}: rel_res {:.2e}, curv {:.2e}", result.iter,
                (norm_z / norm_z0).to_f64().unwrap_or(f64::NAN), kappa.to_f64().unwrap_or(f64::NAN));

            if kappa <= f0 {
                let sigma = if delta.is_finite() {
                    Self::boundary(x, p, delta)
                }
                else if L::norm(s) == f0 {
                    f1
                }
                else {
                    // stay at the current step
                    f0
                };
                L::copy(p, t1);
                L::scale(sigma, t1);
                let frac = safeguard.step_fraction(x, t1);
                let sigma = sigma * frac;

                L::add(sigma, p, s);
                model = model - sigma * rp + fh * sigma * sigma * kappa;
                result.stop = TruncatedStop::NegativeCurvature;
                break;
            }

            let alpha = rz / kappa;

            // x + alpha*p
            L::copy(x, t1);
            L::add(alpha, p, t1);
            let crossing = L::norm(t1) >= delta;
            let alpha = if crossing {Self::boundary(x, p, delta)} else {alpha};

            let model_next = model - alpha * rp + fh * alpha * alpha * kappa;
            if model_next > model {
                result.stop = TruncatedStop::ObjectiveIncrease;
                break;
            }

            L::copy(p, t1);
            L::scale(alpha, t1);
            let frac = safeguard.step_fraction(x, t1);

            if frac < f1 {
                let alpha = alpha * frac;
                L::add(alpha, p, s);
                L::add(alpha, p, x);
                model = model - alpha * rp + fh * alpha * alpha * kappa;
                result.failed_safeguard += 1;

                if result.failed_safeguard > self.par.failed_safeguard_max {
                    result.stop = TruncatedStop::TooManyFailedSafeguard;
                    break;
                }

                log::trace!("truncated_cg {}: safeguard cut {:.2e}, restart", result.iter, frac.to_f64().unwrap_or(f64::NAN));

                // restart from r = -(g + H*s)
                op_h.op(f1, s, f0, r);
                L::add(f1, g, r);
                L::scale(-f1, r);
                seq = 0;
                continue;
            }

            L::add(alpha, p, s);
            L::add(alpha, p, x);
            model = model_next;

            if crossing {
                result.stop = TruncatedStop::TrustRegionViolated;
                break;
            }

            L::copy(r, r_prev);
            L::copy(z, z_prev);
            L::copy(p, p_prev);
            L::copy(hp, hp_prev);
            rz_prev = rz;

            L::add(-alpha, hp, r);
            seq += 1;
        }

        result.model = model;

        log::debug!("truncated_cg: {} after {} iterations, model {:.3e}",
            result.stop, result.iter, model.to_f64().unwrap_or(f64::NAN));

        Ok(result)
    }
}

//

#[test]
fn test_truncated_cg1()
{
    use float_eq::assert_float_eq;
    use crate::{FloatGeneric, MatOp, MatType};
    use crate::solver::{IdentityOp, NoSafeguard};

    type L = FloatGeneric<f64>;

    let array = &[ // packed, SPD
        4.,
        1., 3.,
    ];
    let op_h = MatOp::<L>::new(MatType::SymPack(2), array);
    let g = &[1., 2.];
    let offset = &[0., 0.];
    let s = &mut[0.; 2];
    let work = &mut alloc::vec![0.; TruncatedCg::<L>::query_worklen(2, 1)];

    let cg = TruncatedCg::<L>::new().par(|p| {
        p.eps = 1e-10;
    });
    let rslt = cg.solve(&op_h, IdentityOp::<L>::new(2), IdentityOp::<L>::new(2),
        g, offset, f64::INFINITY, NoSafeguard, s, work).unwrap();

    // H*s = -g
    assert_eq!(rslt.stop, TruncatedStop::RelativeErrorSmall);
    assert_float_eq!(*s, [-1. / 11., -7. / 11.], abs_all <= 1e-9);
    assert!(rslt.model < 0.);
}
