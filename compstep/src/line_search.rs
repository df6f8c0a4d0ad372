//! Line-search method

use core::fmt::{Debug, LowerExp};
use core::mem;
use num_traits::{Float, Zero, One};
use compstep_core::solver::{JordanAlg, Operator, SliceLike, Safeguard, NoSafeguard, LinSafeguard, IdentityOp};
use compstep_core::solver::{TruncatedCg, TruncatedResult, SolverError};
use compstep_core::enums::*;
use compstep_core::trace::Failure;
use crate::{State, Messaging, StateManipulator};
use crate::functions::JacobianOp;
use crate::lagrangian;
use crate::quasi_newton::QuasiNewton;
use crate::solver::{SolverCore, Trial};

impl<'a, L, M, S> SolverCore<'a, L, M, S>
where L: JordanAlg, L::F: Debug + LowerExp, M: Messaging, S: StateManipulator<L> + ?Sized
{
    /// Takes one accepted line-search step, halving the initial step length on every rejected one.
    ///
    /// A stopping reason met on the way is set to [`State::opt_stop`].
    pub(crate) fn ls_step(&mut self, state: &mut State<L::F>) -> Result<(), Failure>
    {
        let f0 = L::F::zero();
        let f1 = L::F::one();
        let f2 = f1 + f1;
        let fh = f1 / f2;
        let ten = num_traits::cast::<_, L::F>(10).unwrap_or_else(L::F::one);

        self.manip(state, OptimizationLocation::BeforeGetStep);

        if let Err(e) = self.ls_direction(state) {
            return self.step_failure(state, e, "Search direction");
        }
        if state.opt_stop != OptimizationStop::NotConverged {
            return Ok(());
        }

        self.manip(state, OptimizationLocation::GetStep);

        let mut slope = L::inner(L::Sl::new_ref(&state.grad), L::Sl::new_ref(&state.dx_dir));
        if !(slope < f0) {
            log::debug!("{}: not a descent direction, restarted from the gradient", state.iter);
            state.dx_dir.clone_from(&state.grad);
            L::scale(-f1, L::Sl::new_mut(&mut state.dx_dir));
            slope = -state.norm_grad * state.norm_grad;
        }

        if let Some(alpha) = self.two_point_length(state) {
            state.alpha0 = alpha;
        }

        self.manip(state, OptimizationLocation::BeforeLineSearch);

        let merit_x = lagrangian::barrier_obj::<L>(state.f_x, &state.h_x, state.mu);
        // round-off allowance of the sufficient decrease
        let merit_tol = merit_x + ten * L::F::epsilon() * merit_x.abs().max(f1);

        loop {
            let alpha_max = self.safe_length(state, state.alpha0)?;
            if !(alpha_max > f0) {
                log::warn!("{}: step vanished at the boundary of the inequality constraint", state.iter);
                state.opt_stop = OptimizationStop::InteriorPointInstability;
                return Ok(());
            }

            let (trial, merit_t, alpha, evals) = match self.par.kind {
                LineSearchKind::GoldenSection => self.golden_section(state, alpha_max),
                LineSearchKind::BackTracking => self.back_tracking(state, alpha_max, merit_tol, slope),
                LineSearchKind::TwoPointA | LineSearchKind::TwoPointB => {
                    let (trial, merit_t) = self.ls_trial(state, alpha_max);
                    (trial, merit_t, alpha_max, 1)
                },
            };
            state.linesearch_iter = evals;
            state.linesearch_iter_total += evals;

            let sufficient = merit_t <= merit_tol + self.par.c1 * alpha * slope;

            if merit_t.is_finite() && (sufficient || !self.par.kind.is_sufficient_decrease()) {
                state.alpha = alpha;
                state.dx.clone_from(&state.dx_dir);
                L::scale(alpha, L::Sl::new_mut(&mut state.dx));
                state.norm_dx = L::norm(L::Sl::new_ref(&state.dx));
                state.ared = merit_x - merit_t;
                state.pred = -alpha * slope;

                state.alpha0 = match self.par.dir {
                    LineSearchDirection::BFGS | LineSearchDirection::NewtonCG => f1,
                    _ => f2 * alpha,
                };

                return self.accept(state, trial);
            }

            state.alpha0 = fh * alpha_max;
            state.rejected += 1;
            state.rejected_total += 1;

            log::debug!("{}: rejected, alpha {:.2e} merit {:.2e} -> {:.2e}", state.iter, alpha, merit_x, merit_t);

            self.manip(state, OptimizationLocation::AfterRejectedLineSearch);

            if state.rejected >= self.par.rejected_max {
                log::warn!("{}: {} line searches rejected in a row", state.iter, state.rejected);
                state.opt_stop = OptimizationStop::GlobalizationFailure;
                return Ok(());
            }
            if state.opt_stop != OptimizationStop::NotConverged {
                return Ok(());
            }
        }
    }

    fn ls_direction(&self, state: &mut State<L::F>) -> Result<(), SolverError>
    {
        let f0 = L::F::zero();
        let f1 = L::F::one();
        let n = self.n;

        // previous direction on entry
        let mut dir = mem::take(&mut state.dx_dir);
        dir.resize(n, f0);

        let grad = L::Sl::new_ref(&state.grad);
        let dgrad = L::Sl::new_ref(&state.dgrad);

        match self.par.dir {
            LineSearchDirection::SteepestDescent => {
                L::copy(grad, L::Sl::new_mut(&mut dir));
                L::scale(-f1, L::Sl::new_mut(&mut dir));
            },
            LineSearchDirection::FletcherReeves |
            LineSearchDirection::PolakRibiere |
            LineSearchDirection::HestenesStiefel => {
                let beta = if state.iter == 0 {
                    f0
                }
                else {
                    // previous gradient
                    let mut grad_prev = state.grad.clone();
                    L::add(-f1, dgrad, L::Sl::new_mut(&mut grad_prev));
                    let norm_prev = L::norm(L::Sl::new_ref(&grad_prev));

                    let b = match self.par.dir {
                        LineSearchDirection::FletcherReeves => state.norm_grad * state.norm_grad / (norm_prev * norm_prev),
                        LineSearchDirection::PolakRibiere => L::inner(grad, dgrad) / (norm_prev * norm_prev),
                        _ => L::inner(grad, dgrad) / L::inner(L::Sl::new_ref(&dir), dgrad),
                    };
                    if b.is_finite() {b} else {f0}
                };

                // dir = beta*dir - grad
                L::scale(beta, L::Sl::new_mut(&mut dir));
                L::add(-f1, grad, L::Sl::new_mut(&mut dir));
            },
            LineSearchDirection::BFGS => {
                QuasiNewton::<L>::new(OperatorKind::InvBFGS, n, f1, &state.old_s, &state.old_y)
                    .op(-f1, grad, f0, L::Sl::new_mut(&mut dir));
            },
            LineSearchDirection::NewtonCG => {
                let rslt = self.newton_cg(state, &mut dir);
                let rslt = match rslt {
                    Ok(r) => r,
                    Err(e) => {
                        state.dx_dir = dir;
                        return Err(e);
                    },
                };

                state.truncated_stop = rslt.stop;
                state.krylov_iter = rslt.iter;
                state.krylov_iter_total += rslt.iter;

                if rslt.stop.is_numerical_failure() {
                    log::warn!("{}: Newton direction stopped by {}", state.iter, rslt.stop);
                    state.opt_stop = OptimizationStop::GlobalizationFailure;
                }
            },
        }

        state.dx_dir = dir;
        Ok(())
    }

    fn newton_cg(&self, state: &State<L::F>, dir: &mut [L::F]) -> Result<TruncatedResult<L::F>, SolverError>
    {
        let f0 = L::F::zero();
        let n = self.n;

        let op_h = self.hessian(state);
        let op_b = self.preconditioner(state);
        let op_c = IdentityOp::<L>::new(n);
        let zero = vec![f0; n];

        let mut work = vec![f0; TruncatedCg::<L>::query_worklen(n, self.par.truncated.orthog_max)];

        TruncatedCg::<L>::new().par(|p| *p = self.par.truncated.clone())
            .solve(&op_h, &op_b, &op_c, L::Sl::new_ref(&state.grad), L::Sl::new_ref(&zero), L::F::infinity(), NoSafeguard,
                L::Sl::new_mut(dir), L::Sl::new_mut(&mut work))
    }

    // Barzilai-Borwein length from the last step, for the two-point kinds
    fn two_point_length(&self, state: &State<L::F>) -> Option<L::F>
    {
        if state.iter == 0 {
            return None;
        }

        let s = L::Sl::new_ref(&state.dx);
        let y = L::Sl::new_ref(&state.dgrad);

        let alpha = match self.par.kind {
            LineSearchKind::TwoPointA => L::inner(s, s) / L::inner(s, y),
            LineSearchKind::TwoPointB => L::inner(s, y) / L::inner(y, y),
            _ => return None,
        };

        if alpha > L::F::zero() && alpha.is_finite() {
            Some(alpha)
        }
        else {
            None
        }
    }

    // longest length along the direction which keeps the inequality constraint safe
    fn safe_length(&self, state: &State<L::F>, alpha: L::F) -> Result<L::F, Failure>
    {
        let h = match self.fns.h {
            Some(h) => h,
            None => return Ok(alpha),
        };

        let f0 = L::F::zero();
        let x = L::Sl::new_ref(&state.x);

        let mut work = vec![f0; LinSafeguard::<L, JacobianOp<L>>::query_worklen(self.m_h)];
        let mut sg = LinSafeguard::new(JacobianOp::new(h, x), L::Sl::new_ref(&state.h_x), self.par.gamma, L::Sl::new_mut(&mut work))
            .map_err(|e| self.msg.error(Failure::from_error(&e).context("Safeguard")))?;

        let mut d = state.dx_dir.clone();
        L::scale(alpha, L::Sl::new_mut(&mut d));
        let zero = vec![f0; self.n];

        Ok(alpha * sg.step_fraction(L::Sl::new_ref(&zero), L::Sl::new_ref(&d)))
    }

    // trial point at length alpha with its barrier objective, NaN taken as infinity
    fn ls_trial(&self, state: &State<L::F>, alpha: L::F) -> (Trial<L::F>, L::F)
    {
        let trial = self.trial(&state.x, &state.dx_dir, alpha);
        let merit = lagrangian::barrier_obj::<L>(trial.f_x, &trial.h_x, state.mu);
        let merit = if merit.is_nan() {L::F::infinity()} else {merit};

        (trial, merit)
    }

    fn golden_section(&self, state: &State<L::F>, alpha_max: L::F) -> (Trial<L::F>, L::F, L::F, usize)
    {
        let f1 = L::F::one();
        let f5 = num_traits::cast::<_, L::F>(5).unwrap_or_else(L::F::one);
        let tau = (f5.sqrt() - f1) / (f1 + f1);
        let iter_max = self.par.linesearch_iter_max;

        let (mut a, mut b) = (L::F::zero(), alpha_max);
        let mut c = b - tau * (b - a);
        let mut d = a + tau * (b - a);
        let (mut tc, mut mc) = self.ls_trial(state, c);
        let mut evals = 1;
        if iter_max <= 1 {
            return (tc, mc, c, evals);
        }
        let (mut td, mut md) = self.ls_trial(state, d);
        evals += 1;

        while evals < iter_max {
            if mc <= md {
                b = d;
                d = c;
                td = tc;
                md = mc;
                c = b - tau * (b - a);
                (tc, mc) = self.ls_trial(state, c);
            }
            else {
                a = c;
                c = d;
                tc = td;
                mc = md;
                d = a + tau * (b - a);
                (td, md) = self.ls_trial(state, d);
            }
            evals += 1;
        }

        if mc <= md {
            (tc, mc, c, evals)
        }
        else {
            (td, md, d, evals)
        }
    }

    fn back_tracking(&self, state: &State<L::F>, alpha_max: L::F, merit_tol: L::F, slope: L::F) -> (Trial<L::F>, L::F, L::F, usize)
    {
        let fh = (L::F::one() + L::F::one()).recip();

        let mut alpha = alpha_max;
        let mut evals = 0;

        loop {
            let (trial, merit_t) = self.ls_trial(state, alpha);
            evals += 1;

            if merit_t <= merit_tol + self.par.c1 * alpha * slope || evals >= self.par.linesearch_iter_max {
                return (trial, merit_t, alpha, evals);
            }
            alpha = fh * alpha;
        }
    }
}
