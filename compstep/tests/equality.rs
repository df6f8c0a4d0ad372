use float_eq::assert_float_eq;
use compstep::prelude::*;
use compstep::*;

type La = FloatGeneric<f64>;

type AMatBuild = MatBuild<La>;
type ASolver = Solver<La>;

//

// x0 + x1
struct Sum;

impl Objective<La> for Sum
{
    fn eval(&self, x: &[f64]) -> f64
    {
        x[0] + x[1]
    }

    fn grad(&self, _x: &[f64], g: &mut [f64])
    {
        g[0] = 1.;
        g[1] = 1.;
    }

    fn hessvec(&self, _x: &[f64], _dx: &[f64], h_dx: &mut [f64])
    {
        h_dx[0] = 0.;
        h_dx[1] = 0.;
    }
}

// x0^2 + x1^2 - 2
struct Circle;

impl Constraint<La> for Circle
{
    fn size(&self) -> (usize, usize)
    {
        (1, 2)
    }

    fn eval(&self, x: &[f64], y: &mut [f64])
    {
        y[0] = x[0] * x[0] + x[1] * x[1] - 2.;
    }

    fn p(&self, x: &[f64], dx: &[f64], y: &mut [f64])
    {
        y[0] = 2. * x[0] * dx[0] + 2. * x[1] * dx[1];
    }

    fn ps(&self, x: &[f64], dy: &[f64], z: &mut [f64])
    {
        z[0] = 2. * x[0] * dy[0];
        z[1] = 2. * x[1] * dy[0];
    }

    fn pps(&self, _x: &[f64], dx: &[f64], dy: &[f64], z: &mut [f64])
    {
        z[0] = 2. * dx[0] * dy[0];
        z[1] = 2. * dx[1] * dy[0];
    }
}

//

#[test]
fn test_equality_linear()
{
    let _ = env_logger::builder().is_test(true).try_init();

    // (1/2)||x - a||^2 subject to x0 + x1 + x2 = 1
    let a = [1., 2., 3.];
    let sym_p = AMatBuild::new(MatType::Diag(3)).iter_colmaj(&[1., 1., 1.]);
    let vec_q = AMatBuild::new(MatType::General(3, 1)).iter_colmaj(&a.map(|v| -v));
    let f = QuadObjective::new(sym_p, vec_q, 0.).unwrap();

    let mat_a = AMatBuild::new(MatType::General(1, 3)).iter_rowmaj(&[1., 1., 1.]);
    let vec_b = AMatBuild::new(MatType::General(1, 1)).iter_colmaj(&[1.]);
    let g = LinearConstraint::new(mat_a, vec_b).unwrap();

    let fns = Functions::<La>::new(&f).equality(&g);
    let mut state = State::new(&[0., 0., 0.]);

    let s = ASolver::new();
    let rslt = s.solve_with(&fns, &mut state, LogMessaging, &mut NoManipulator).unwrap();

    assert_eq!(rslt, OptimizationStop::GradientSmall);
    assert_eq!(state.problem_class, ProblemClass::EqualityConstrained);
    assert_float_eq!(state.x[..], [-2. / 3., 1. / 3., 4. / 3.][..], abs_all <= 1e-6);
    assert_float_eq!(state.y[..], [5. / 3.][..], abs_all <= 1e-6);
    assert_float_eq!(state.norm_g, 0., abs <= 1e-8);
}

#[test]
fn test_equality_nonlinear()
{
    let _ = env_logger::builder().is_test(true).try_init();

    let f = Sum;
    let g = Circle;
    let fns = Functions::<La>::new(&f).equality(&g);
    let mut state = State::new(&[-1.4, -0.4]);

    let s = ASolver::new().par(|p| {
        p.h_type = OperatorKind::UserDefined;
    });
    let rslt = s.solve_with(&fns, &mut state, LogMessaging, &mut NoManipulator).unwrap();
    println!("{:?} after {} iterations, rho {}", rslt, state.iter, state.rho);

    assert_eq!(rslt, OptimizationStop::GradientSmall);
    assert_float_eq!(state.x[..], [-1., -1.][..], abs_all <= 1e-4);
    assert_float_eq!(state.y[..], [0.5][..], abs_all <= 1e-4);
    assert!(state.rho >= 1.);
}

#[test]
fn test_equality_scaled_identity()
{
    let _ = env_logger::builder().is_test(true).try_init();

    let f = Sum;
    let g = Circle;
    let fns = Functions::<La>::new(&f).equality(&g);
    let mut state = State::new(&[-1.4, -0.4]);

    // short steps near the solution, so only a loose tolerance is reached quickly
    let s = ASolver::new().par(|p| {
        p.h_type = OperatorKind::ScaledIdentity;
        p.eps_grad = 1e-4;
        p.eps_constr = 1e-4;
    });
    let rslt = s.solve_with(&fns, &mut state, LogMessaging, &mut NoManipulator).unwrap();
    println!("{:?} after {} iterations", rslt, state.iter);

    assert!(matches!(rslt, OptimizationStop::GradientSmall | OptimizationStop::MaxItersExceeded));
    assert_float_eq!(state.x[..], [-1., -1.][..], abs_all <= 1e-2);
}

#[test]
fn test_equality_initial_multiplier()
{
    let _ = env_logger::builder().is_test(true).try_init();

    let f = Sum;
    let g = Circle;
    let fns = Functions::<La>::new(&f).equality(&g);
    let mut state = State::new(&[-1.4, -0.4]).with_y(&[0.4]);

    let s = ASolver::new().par(|p| {
        p.h_type = OperatorKind::UserDefined;
        p.iter_max = 1;
    });
    let rslt = s.solve_with(&fns, &mut state, LogMessaging, &mut NoManipulator).unwrap();

    assert_eq!(rslt, OptimizationStop::MaxItersExceeded);
    assert_eq!(state.y.len(), 1);
    assert!(state.qn_stop != QuasinormalStop::Skipped);
}

#[test]
fn test_equality_ls_rejected()
{
    let _ = env_logger::builder().is_test(true).try_init();

    let f = Sum;
    let g = Circle;
    let fns = Functions::<La>::new(&f).equality(&g);
    let mut state = State::new(&[-1.4, -0.4]);

    let s = ASolver::new().par(|p| {
        p.algorithm_class = AlgorithmClass::LineSearch;
    });
    let rslt = s.solve_with(&fns, &mut state, LogMessaging, &mut NoManipulator);

    let failure = rslt.unwrap_err();
    assert_eq!(failure.message(), "Invalid parameters");
    assert_eq!(failure.depth(), 2);
    assert!(compstep_core::trace::to_string(&failure).contains("LineSearchWithEquality"));
}
