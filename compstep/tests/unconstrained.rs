use float_eq::assert_float_eq;
use compstep::prelude::*;
use compstep::*;

type La = FloatGeneric<f64>;

type AMatBuild = MatBuild<La>;
type ASolver = Solver<La>;

//

struct Rosenbrock;

impl Objective<La> for Rosenbrock
{
    fn eval(&self, x: &[f64]) -> f64
    {
        (1. - x[0]).powi(2) + 100. * (x[1] - x[0] * x[0]).powi(2)
    }

    fn grad(&self, x: &[f64], g: &mut [f64])
    {
        g[0] = -400. * x[0] * (x[1] - x[0] * x[0]) - 2. * (1. - x[0]);
        g[1] = 200. * (x[1] - x[0] * x[0]);
    }

    fn hessvec(&self, x: &[f64], dx: &[f64], h_dx: &mut [f64])
    {
        let h00 = 1200. * x[0] * x[0] - 400. * x[1] + 2.;
        let h01 = -400. * x[0];
        h_dx[0] = h00 * dx[0] + h01 * dx[1];
        h_dx[1] = h01 * dx[0] + 200. * dx[1];
    }
}

// (1/2) x^T diag(1, 4) x - (1, 4)^T x + 5/2, minimum 0 at (1, 1)
fn quad() -> QuadObjective<La>
{
    let sym_p = AMatBuild::new(MatType::Diag(2)).iter_colmaj(&[1., 4.]);
    let vec_q = AMatBuild::new(MatType::General(2, 1)).iter_colmaj(&[-1., -4.]);
    QuadObjective::new(sym_p, vec_q, 2.5).unwrap()
}

//

#[test]
fn test_unconstrained_tr_exact()
{
    let _ = env_logger::builder().is_test(true).try_init();

    let f = Rosenbrock;
    let fns = Functions::<La>::new(&f);
    let mut state = State::new(&[-1.2, 1.]);

    let s = ASolver::new().par(|p| {
        p.h_type = OperatorKind::UserDefined;
    });
    let rslt = s.solve_with(&fns, &mut state, LogMessaging, &mut NoManipulator).unwrap();

    assert_eq!(rslt, OptimizationStop::GradientSmall);
    assert_eq!(state.problem_class, ProblemClass::Unconstrained);
    assert_float_eq!(state.x[..], [1., 1.][..], abs_all <= 1e-4);
    assert!(state.krylov_iter_total > 0);
}

#[test]
fn test_unconstrained_tr_bfgs()
{
    let _ = env_logger::builder().is_test(true).try_init();

    let f = Rosenbrock;
    let fns = Functions::<La>::new(&f);
    let mut state = State::new(&[-1.2, 1.]);

    let s = ASolver::new().par(|p| {
        p.h_type = OperatorKind::BFGS;
        p.stored_history = 10;
    });
    let rslt = s.solve_with(&fns, &mut state, LogMessaging, &mut NoManipulator).unwrap();
    println!("{:?} after {} iterations", rslt, state.iter);

    assert!(matches!(rslt, OptimizationStop::GradientSmall | OptimizationStop::StepSmall));
    assert_float_eq!(state.x[..], [1., 1.][..], abs_all <= 1e-3);
    assert!(state.old_s.len() <= 10);
}

#[test]
fn test_unconstrained_tr_identity()
{
    let _ = env_logger::builder().is_test(true).try_init();

    // identity is the exact Hessian of ||x - a||^2 / 2
    let sym_p = AMatBuild::new(MatType::Diag(3)).iter_colmaj(&[1., 1., 1.]);
    let vec_q = AMatBuild::new(MatType::General(3, 1)).iter_colmaj(&[-1., 2., -3.]);
    let f = QuadObjective::new(sym_p, vec_q, 0.).unwrap();
    let fns = Functions::<La>::new(&f);
    let mut state = State::new(&[0., 0., 0.]);

    let s = ASolver::new();
    let rslt = s.solve_with(&fns, &mut state, LogMessaging, &mut NoManipulator).unwrap();

    assert_eq!(rslt, OptimizationStop::GradientSmall);
    assert_float_eq!(state.x[..], [1., -2., 3.][..], abs_all <= 1e-6);
    assert!(state.iter <= 3);
}

#[test]
fn test_unconstrained_ls()
{
    let _ = env_logger::builder().is_test(true).try_init();

    let f = quad();
    let fns = Functions::<La>::new(&f);

    let cases = [
        (LineSearchDirection::SteepestDescent, LineSearchKind::GoldenSection),
        (LineSearchDirection::SteepestDescent, LineSearchKind::BackTracking),
        (LineSearchDirection::SteepestDescent, LineSearchKind::TwoPointA),
        (LineSearchDirection::SteepestDescent, LineSearchKind::TwoPointB),
        (LineSearchDirection::FletcherReeves, LineSearchKind::GoldenSection),
        (LineSearchDirection::PolakRibiere, LineSearchKind::GoldenSection),
        (LineSearchDirection::HestenesStiefel, LineSearchKind::GoldenSection),
        (LineSearchDirection::BFGS, LineSearchKind::BackTracking),
    ];

    for (dir, kind) in cases {
        let mut state = State::new(&[0., 0.]);

        let s = ASolver::new().par(|p| {
            p.algorithm_class = AlgorithmClass::LineSearch;
            p.dir = dir;
            p.kind = kind;
            p.linesearch_iter_max = 20;
            p.stored_history = 5;
        });
        let rslt = s.solve_with(&fns, &mut state, LogMessaging, &mut NoManipulator).unwrap();
        println!("{} {}: {:?} after {} iterations", dir, kind, rslt, state.iter);

        assert_eq!(rslt, OptimizationStop::GradientSmall);
        assert_float_eq!(state.x[..], [1., 1.][..], abs_all <= 1e-6);
        assert!(state.linesearch_iter_total >= state.iter);
    }
}

#[test]
fn test_unconstrained_ls_newton()
{
    let _ = env_logger::builder().is_test(true).try_init();

    let f = Rosenbrock;
    let fns = Functions::<La>::new(&f);
    let mut state = State::new(&[-1.2, 1.]);

    let s = ASolver::new().par(|p| {
        p.algorithm_class = AlgorithmClass::LineSearch;
        p.dir = LineSearchDirection::NewtonCG;
        p.kind = LineSearchKind::BackTracking;
        p.h_type = OperatorKind::UserDefined;
        p.linesearch_iter_max = 20;
    });
    let rslt = s.solve_with(&fns, &mut state, LogMessaging, &mut NoManipulator).unwrap();

    assert_eq!(rslt, OptimizationStop::GradientSmall);
    assert_float_eq!(state.x[..], [1., 1.][..], abs_all <= 1e-4);
    assert!(state.krylov_iter_total > 0);
}

#[test]
fn test_unconstrained_max_iters()
{
    let _ = env_logger::builder().is_test(true).try_init();

    let f = Rosenbrock;
    let fns = Functions::<La>::new(&f);
    let mut state = State::new(&[-1.2, 1.]);

    let s = ASolver::new().par(|p| {
        p.iter_max = 3;
    });
    let rslt = s.solve_with(&fns, &mut state, LogMessaging, &mut NoManipulator).unwrap();

    assert_eq!(rslt, OptimizationStop::MaxItersExceeded);
    assert_eq!(state.iter, 3);
    assert!(state.f_x < 24.2);
}
