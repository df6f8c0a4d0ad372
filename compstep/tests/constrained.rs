use float_eq::assert_float_eq;
use compstep::prelude::*;
use compstep::*;

type La = FloatGeneric<f64>;

type AMatBuild = MatBuild<La>;
type ASolver = Solver<La>;

//

#[test]
fn test_constrained1()
{
    let _ = env_logger::builder().is_test(true).try_init();

    let n = 3; // x0, x1, x2

    // (x0 - 2)^2 + (x1 - 2)^2 + (x2 - 1)^2
    let sym_p = AMatBuild::new(MatType::Diag(n)).iter_colmaj(&[2., 2., 2.]);
    let vec_q = AMatBuild::new(MatType::General(n, 1)).iter_colmaj(&[-4., -4., -2.]);
    let f = QuadObjective::new(sym_p, vec_q, 9.).unwrap();

    // x2 - x0 = 0
    let mut mat_a = AMatBuild::new(MatType::General(1, n));
    mat_a[(0, 0)] = -1.;
    mat_a[(0, 2)] = 1.;
    let vec_b = AMatBuild::new(MatType::General(1, 1));
    let g = LinearConstraint::new(mat_a, vec_b).unwrap();

    // 1 - x1 >= 0
    let mut mat_g = AMatBuild::new(MatType::General(1, n));
    mat_g[(0, 1)] = -1.;
    let vec_h = AMatBuild::new(MatType::General(1, 1)).iter_colmaj(&[-1.]);
    let h = LinearConstraint::new(mat_g, vec_h).unwrap();

    let fns = Functions::<La>::new(&f).equality(&g).inequality(&h);
    let mut state = State::new(&[0., 0., 0.]);

    let s = ASolver::new().par(|p| {
        p.h_type = OperatorKind::UserDefined;
        p.eps_mu = 1e-6;
    });
    let rslt = s.solve_with(&fns, &mut state, LogMessaging, &mut NoManipulator).unwrap();
    println!("{:?} after {} iterations, mu {}", rslt, state.iter, state.mu);

    assert_eq!(rslt, OptimizationStop::GradientSmall);
    assert_eq!(state.problem_class, ProblemClass::Constrained);
    assert_float_eq!(state.x[..], [1.5, 1., 1.5][..], abs_all <= 1e-5);
    assert_float_eq!(state.y[..], [-1.][..], abs_all <= 1e-4);
    assert!(state.h_x[0] > 0.);
}
