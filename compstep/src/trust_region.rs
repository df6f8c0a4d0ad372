//! Composite-step trust-region method

use core::fmt::{Debug, LowerExp};
use core::mem;
use num_traits::{Float, Zero, One};
use compstep_core::solver::{JordanAlg, Operator, SliceLike, Safeguard, NoSafeguard, LinSafeguard, IdentityOp};
use compstep_core::solver::{Quasinormal, QuasinormalResult, TruncatedCg, TruncatedResult, SolverError};
use compstep_core::enums::*;
use compstep_core::trace::Failure;
use crate::{State, Messaging, StateManipulator};
use crate::functions::JacobianOp;
use crate::lagrangian::{self, NullProjector};
use crate::solver::SolverCore;
use crate::format;

impl<'a, L, M, S> SolverCore<'a, L, M, S>
where L: JordanAlg, L::F: Debug + LowerExp, M: Messaging, S: StateManipulator<L> + ?Sized
{
    /// Takes one accepted trust-region step, shrinking the radius on every rejected one.
    ///
    /// A stopping reason met on the way is set to [`State::opt_stop`].
    pub(crate) fn tr_step(&mut self, state: &mut State<L::F>) -> Result<(), Failure>
    {
        let f0 = L::F::zero();
        let f1 = L::F::one();
        let f2 = f1 + f1;
        let fh = f1 / f2;
        let ten = num_traits::cast::<_, L::F>(10).unwrap_or_else(L::F::one);

        loop {
            self.manip(state, OptimizationLocation::BeforeGetStep);

            match self.quasinormal_step(state) {
                Ok(r) => state.qn_stop = r.stop,
                Err(e) => return self.step_failure(state, e, "Quasinormal step"),
            }

            let rslt = match self.tangential_step(state) {
                Ok(r) => r,
                Err(e) => return self.step_failure(state, e, "Tangential step"),
            };
            state.truncated_stop = rslt.stop;
            state.krylov_iter = rslt.iter;
            state.krylov_iter_total += rslt.iter;

            if rslt.stop.is_numerical_failure() || rslt.stop == TruncatedStop::OffsetViolatesTrustRegion {
                log::warn!("{}: tangential step stopped by {}", state.iter, rslt.stop);
                state.opt_stop = OptimizationStop::GlobalizationFailure;
                return Ok(());
            }

            // dx = dx_n + dx_t
            state.dx.clone_from(&state.dx_n);
            L::add(f1, L::Sl::new_ref(&state.dx_t), L::Sl::new_mut(&mut state.dx));

            self.manip(state, OptimizationLocation::GetStep);

            state.norm_dx = L::norm(L::Sl::new_ref(&state.dx));

            if state.norm_dx == f0 && self.safeguarded(state) {
                log::warn!("{}: step vanished at the boundary of the inequality constraint", state.iter);
                state.opt_stop = OptimizationStop::InteriorPointInstability;
                return Ok(());
            }

            self.manip(state, OptimizationLocation::BeforeActualVersusPredicted);

            let pred = self.predicted_reduction(state);

            let trial = self.trial(&state.x, &state.dx, f1);
            let merit_x = lagrangian::merit::<L>(state.f_x, &state.g_x, &state.h_x, &state.y, state.mu, state.rho);
            let merit_t = lagrangian::merit::<L>(trial.f_x, &trial.g_x, &trial.h_x, &state.y, state.mu, state.rho);
            let ared = merit_x - merit_t;

            let tiny = ten * L::F::epsilon() * merit_x.abs().max(f1);
            let ratio = if pred + tiny > f0 {
                (ared + tiny) / (pred + tiny)
            }
            else {
                L::F::neg_infinity()
            };

            state.ared = ared;
            state.pred = pred;

            if merit_t.is_finite() && ratio >= self.par.eta1 {
                let on_boundary = matches!(rslt.stop,
                    TruncatedStop::TrustRegionViolated | TruncatedStop::NegativeCurvature
                );
                if ratio > self.par.eta2 && on_boundary {
                    state.delta = (f2 * state.delta).min(self.par.delta_max);
                }

                return self.accept(state, trial);
            }

            state.delta = if state.norm_dx > f0 {
                fh * state.norm_dx
            }
            else {
                fh * state.delta
            };
            state.rejected += 1;
            state.rejected_total += 1;

            log::debug!("{}: rejected, ared {:.2e} pred {:.2e} delta {:.2e}", state.iter, ared, pred, state.delta);
            if self.par.msg_level >= 2 {
                self.msg.print(&format!("{}rejected: ared/pred {} delta {}",
                    format::string(""), format::real(ratio).trim_end(), format::real(state.delta).trim_end()));
            }

            self.manip(state, OptimizationLocation::AfterRejectedTrustRegion);

            if state.rejected >= self.par.rejected_max {
                log::warn!("{}: {} steps rejected in a row", state.iter, state.rejected);
                state.opt_stop = OptimizationStop::GlobalizationFailure;
                return Ok(());
            }
            if state.opt_stop != OptimizationStop::NotConverged {
                return Ok(());
            }
        }
    }

    // whether the step was cut by the inequality constraint
    fn safeguarded(&self, state: &State<L::F>) -> bool
    {
        matches!(state.truncated_stop,
            TruncatedStop::OffsetViolatesSafeguard | TruncatedStop::TooManyFailedSafeguard
        ) ||
        matches!(state.qn_stop,
            QuasinormalStop::CauchySafeguard | QuasinormalStop::DoglegSafeguard | QuasinormalStop::NewtonSafeguard
        )
    }

    fn quasinormal_step(&self, state: &mut State<L::F>) -> Result<QuasinormalResult<L::F>, SolverError>
    {
        let f0 = L::F::zero();

        let g = match self.fns.g {
            Some(g) => g,
            None => {
                L::zero(L::Sl::new_mut(&mut state.dx_n));
                L::zero(L::Sl::new_mut(&mut state.dx_ncp));
                return Ok(QuasinormalResult {
                    stop: QuasinormalStop::Skipped,
                    residual: f0,
                    iter: 0,
                });
            },
        };

        let x = L::Sl::new_ref(&state.x);
        let op_g = JacobianOp::new(g, x);

        let mut sg_work = vec![f0; LinSafeguard::<L, JacobianOp<L>>::query_worklen(self.m_h)];
        let mut no_sg = NoSafeguard;
        let mut lin_sg;
        let safeguard: &mut dyn Safeguard<L> = match self.fns.h {
            Some(h) => {
                let kappa = self.par.quasinormal.zeta * self.par.gamma;
                lin_sg = LinSafeguard::new(JacobianOp::new(h, x), L::Sl::new_ref(&state.h_x), kappa, L::Sl::new_mut(&mut sg_work))?;
                &mut lin_sg
            },
            None => &mut no_sg,
        };

        let mut work = vec![f0; Quasinormal::<L>::query_worklen((self.m_g, self.n))];

        Quasinormal::<L>::new().par(|p| *p = self.par.quasinormal.clone())
            .solve(op_g, L::Sl::new_ref(&state.g_x), state.delta, safeguard,
                L::Sl::new_mut(&mut state.dx_n), L::Sl::new_mut(&mut state.dx_ncp), L::Sl::new_mut(&mut work))
    }

    fn tangential_step(&self, state: &mut State<L::F>) -> Result<TruncatedResult<L::F>, SolverError>
    {
        let mut dx_t = mem::take(&mut state.dx_t);
        let rslt = self.tangential_solve(state, &mut dx_t);
        state.dx_t = dx_t;
        rslt
    }

    fn tangential_solve(&self, state: &State<L::F>, dx_t: &mut [L::F]) -> Result<TruncatedResult<L::F>, SolverError>
    {
        let f0 = L::F::zero();
        let f1 = L::F::one();
        let n = self.n;

        let x = L::Sl::new_ref(&state.x);
        let dx_n = L::Sl::new_ref(&state.dx_n);

        let op_h = self.hessian(state);
        let op_b = self.preconditioner(state);

        // gradient of the model at the quasinormal step
        let mut g_m = state.grad.clone();
        op_h.op(f1, dx_n, f1, L::Sl::new_mut(&mut g_m));

        let ident = IdentityOp::<L>::new(n);
        let proj;
        let op_c: &dyn Operator<L> = match self.fns.g {
            Some(g) => {
                proj = NullProjector::new(JacobianOp::new(g, x), &self.par.normal_eq);
                &proj
            },
            None => &ident,
        };

        let mut sg_work = vec![f0; LinSafeguard::<L, JacobianOp<L>>::query_worklen(self.m_h)];
        let mut no_sg = NoSafeguard;
        let mut lin_sg;
        let safeguard: &mut dyn Safeguard<L> = match self.fns.h {
            Some(h) => {
                lin_sg = LinSafeguard::new(JacobianOp::new(h, x), L::Sl::new_ref(&state.h_x), self.par.gamma, L::Sl::new_mut(&mut sg_work))?;
                &mut lin_sg
            },
            None => &mut no_sg,
        };

        let mut work = vec![f0; TruncatedCg::<L>::query_worklen(n, self.par.truncated.orthog_max)];

        TruncatedCg::<L>::new().par(|p| *p = self.par.truncated.clone())
            .solve(&op_h, &op_b, op_c, L::Sl::new_ref(&g_m), dx_n, state.delta, safeguard,
                L::Sl::new_mut(dx_t), L::Sl::new_mut(&mut work))
    }

    /// Predicted reduction of the merit function by `dx`,
    /// raising the penalty when the model would not reduce it.
    fn predicted_reduction(&self, state: &mut State<L::F>) -> L::F
    {
        let f0 = L::F::zero();
        let f1 = L::F::one();
        let f2 = f1 + f1;
        let fh = f1 / f2;

        let (model, v) = {
            let st: &State<L::F> = state;
            let x = L::Sl::new_ref(&st.x);
            let dx = L::Sl::new_ref(&st.dx);

            let op_h = self.hessian(st);
            let mut hdx = vec![f0; self.n];
            op_h.op(f1, dx, f0, L::Sl::new_mut(&mut hdx));
            let model = L::inner(L::Sl::new_ref(&st.grad), dx) + fh * L::inner(dx, L::Sl::new_ref(&hdx));

            // reduction of the linearized violation
            let v = match self.fns.g {
                Some(g) => {
                    let mut lin = st.g_x.clone();
                    JacobianOp::new(g, x).op(f1, dx, f1, L::Sl::new_mut(&mut lin));
                    let norm_g = L::norm(L::Sl::new_ref(&st.g_x));
                    let norm_lin = L::norm(L::Sl::new_ref(&lin));
                    norm_g * norm_g - norm_lin * norm_lin
                },
                None => f0,
            };

            (model, v)
        };

        if v > f0 && model > fh * state.rho * v {
            state.rho = (f2 * state.rho).max(f2 * model / v);
            log::debug!("{}: rho raised to {:.2e}", state.iter, state.rho);
        }

        -model + state.rho * v
    }
}

