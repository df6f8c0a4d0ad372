use std::collections::HashMap;
use float_eq::assert_float_eq;
use compstep::prelude::*;
use compstep::*;

type La = FloatGeneric<f64>;

type AMatBuild = MatBuild<La>;
type ASolver = Solver<La>;

//

// (1/2) x^T diag(1, 4) x - (1, 4)^T x
fn quad() -> QuadObjective<La>
{
    let sym_p = AMatBuild::new(MatType::Diag(2)).iter_colmaj(&[1., 4.]);
    let vec_q = AMatBuild::new(MatType::General(2, 1)).iter_colmaj(&[-1., -4.]);
    QuadObjective::new(sym_p, vec_q, 0.).unwrap()
}

fn count(locs: &[OptimizationLocation]) -> HashMap<OptimizationLocation, usize>
{
    let mut c = HashMap::new();
    for l in locs {
        *c.entry(*l).or_insert(0) += 1;
    }
    c
}

//

#[test]
fn test_manipulator_locations_tr()
{
    let _ = env_logger::builder().is_test(true).try_init();

    let f = quad();
    let fns = Functions::<La>::new(&f);
    let mut state = State::new(&[0., 0.]);

    let mut locs = Vec::new();
    let mut smanip = |_fns: &Functions<La>, _st: &mut State<f64>, loc: OptimizationLocation| {
        locs.push(loc);
    };

    let s = ASolver::new().par(|p| {
        p.h_type = OperatorKind::UserDefined;
    });
    let rslt = s.solve_with(&fns, &mut state, LogMessaging, &mut smanip).unwrap();
    assert_eq!(rslt, OptimizationStop::GradientSmall);

    assert_eq!(locs.first(), Some(&OptimizationLocation::BeginningOfOptimization));
    assert_eq!(locs.get(1), Some(&OptimizationLocation::BeforeInitialFuncAndGrad));
    assert_eq!(locs.last(), Some(&OptimizationLocation::EndOfOptimization));

    let c = count(&locs);
    let iter = state.iter;
    assert!(iter > 0);
    assert_eq!(c[&OptimizationLocation::AfterInitialFuncAndGrad], 1);
    assert_eq!(c[&OptimizationLocation::BeforeOptimizationLoop], 1);
    assert_eq!(c[&OptimizationLocation::BeginningOfOptimizationLoop], iter + 1);
    assert_eq!(c[&OptimizationLocation::EndOfOptimizationIteration], iter);
    assert_eq!(c[&OptimizationLocation::BeforeQuasi], iter);
    assert_eq!(c[&OptimizationLocation::AfterGradient], iter);
    assert_eq!(c[&OptimizationLocation::GetStep], iter + state.rejected_total);
    assert_eq!(c[&OptimizationLocation::BeforeActualVersusPredicted], iter + state.rejected_total);
    assert_eq!(c.get(&OptimizationLocation::BeforeLineSearch), None);
}

#[test]
fn test_manipulator_locations_ls()
{
    let _ = env_logger::builder().is_test(true).try_init();

    let f = quad();
    let fns = Functions::<La>::new(&f);
    let mut state = State::new(&[0., 0.]);

    let mut locs = Vec::new();
    let mut smanip = |_fns: &Functions<La>, _st: &mut State<f64>, loc: OptimizationLocation| {
        locs.push(loc);
    };

    let s = ASolver::new().par(|p| {
        p.algorithm_class = AlgorithmClass::LineSearch;
        p.kind = LineSearchKind::BackTracking;
        p.linesearch_iter_max = 20;
    });
    let rslt = s.solve_with(&fns, &mut state, LogMessaging, &mut smanip).unwrap();
    assert_eq!(rslt, OptimizationStop::GradientSmall);

    let c = count(&locs);
    let iter = state.iter;
    assert_eq!(c[&OptimizationLocation::BeforeLineSearch], iter);
    assert_eq!(c.get(&OptimizationLocation::BeforeActualVersusPredicted), None);
    assert_eq!(c.get(&OptimizationLocation::AfterRejectedLineSearch).copied().unwrap_or(0), state.rejected_total);
}

#[test]
fn test_manipulator_user_step()
{
    let _ = env_logger::builder().is_test(true).try_init();

    // ||x||^2
    let sym_p = AMatBuild::new(MatType::Diag(2)).iter_colmaj(&[2., 2.]);
    let vec_q = AMatBuild::new(MatType::General(2, 1));
    let f = QuadObjective::new(sym_p, vec_q, 0.).unwrap();
    let fns = Functions::<La>::new(&f);
    let mut state = State::new(&[3., -4.]);

    let mut smanip = |_fns: &Functions<La>, st: &mut State<f64>, loc: OptimizationLocation| {
        if loc == OptimizationLocation::GetStep {
            st.dx = st.grad.iter().map(|g| -0.5 * g).collect();
        }
    };

    let s = ASolver::new().par(|p| {
        p.algorithm_class = AlgorithmClass::UserDefined;
    });
    let rslt = s.solve_with(&fns, &mut state, LogMessaging, &mut smanip).unwrap();

    assert_eq!(rslt, OptimizationStop::GradientSmall);
    assert_eq!(state.iter, 1);
    assert_float_eq!(state.x[..], [0., 0.][..], abs_all <= 1e-12);
    assert_float_eq!(state.norm_dx, 5., abs <= 1e-12);
}

#[test]
fn test_manipulator_user_stop()
{
    let _ = env_logger::builder().is_test(true).try_init();

    let f = quad();
    let fns = Functions::<La>::new(&f);
    let mut state = State::new(&[0., 0.]);

    let mut smanip = |_fns: &Functions<La>, st: &mut State<f64>, loc: OptimizationLocation| {
        if loc == OptimizationLocation::EndOfOptimizationIteration && st.iter == 2 {
            st.opt_stop = OptimizationStop::UserDefined;
        }
    };

    let s = ASolver::new().par(|p| {
        p.algorithm_class = AlgorithmClass::LineSearch;
        p.kind = LineSearchKind::BackTracking;
    });
    let rslt = s.solve_with(&fns, &mut state, LogMessaging, &mut smanip).unwrap();

    assert_eq!(rslt, OptimizationStop::UserDefined);
    assert_eq!(state.iter, 2);
}
