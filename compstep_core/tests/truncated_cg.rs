use float_eq::assert_float_eq;
use rand::prelude::*;
use rand_xoshiro::Xoshiro256StarStar;
use compstep_core::solver::*;
use compstep_core::enums::TruncatedStop;
use compstep_core::*;

type La = FloatGeneric<f64>;
type ATruncatedCg = TruncatedCg<La>;

fn solve_unconstrained(op_h: &MatOp<La>, g: &[f64], delta: f64, s: &mut [f64]) -> TruncatedResult<f64>
{
    let n = g.len();
    let cg = ATruncatedCg::new();
    let mut work = vec![0.; ATruncatedCg::query_worklen(n, cg.par.orthog_max)];
    let offset = vec![0.; n];

    cg.solve(op_h, IdentityOp::<La>::new(n), IdentityOp::<La>::new(n),
        g, &offset, delta, NoSafeguard, s, &mut work).unwrap()
}

//

#[test]
fn test_truncated_cg_containment()
{
    let _ = env_logger::builder().is_test(true).try_init();

    let mut rng = Xoshiro256StarStar::seed_from_u64(0);
    let n = 6;

    for _ in 0.. 50 {
        // random symmetric, possibly indefinite
        let mut sym_h = vec![0.; n * (n + 1) / 2];
        for e in sym_h.iter_mut() {
            *e = rng.gen_range(-1.0..1.0);
        }
        let g: Vec<f64> = (0.. n).map(|_| rng.gen_range(-1.0..1.0)).collect();
        let delta = rng.gen_range(0.01..2.0);

        let op_h = MatOp::<La>::new(MatType::SymPack(n), &sym_h);
        let mut s = vec![0.; n];
        let rslt = solve_unconstrained(&op_h, &g, delta, &mut s);

        assert!(!rslt.stop.is_numerical_failure(), "{:?}", rslt);
        assert!(La::norm(&s) <= delta * (1. + 1e-9), "{} > {}", La::norm(&s), delta);
        assert!(rslt.model <= 0.);

        // model value reported matches the step
        let mut hs = vec![0.; n];
        op_h.op(1., &s, 0., &mut hs);
        let model = La::inner(&g, &s) + 0.5 * La::inner(&s, &hs);
        assert_float_eq!(rslt.model, model, abs <= 1e-9);
    }
}

#[test]
fn test_truncated_cg_offset()
{
    let _ = env_logger::builder().is_test(true).try_init();

    let n = 2;
    let op_h = MatOp::<La>::new(MatType::Diag(n), &[1., 1.]);
    let cg = ATruncatedCg::new();
    let mut work = vec![0.; ATruncatedCg::query_worklen(n, cg.par.orthog_max)];
    let mut s = [1.; 2];

    let rslt = cg.solve(&op_h, IdentityOp::<La>::new(n), IdentityOp::<La>::new(n),
        &[1., 1.], &[3., 4.], 4., NoSafeguard, &mut s, &mut work).unwrap();

    assert_eq!(rslt.stop, TruncatedStop::OffsetViolatesTrustRegion);
    assert_float_eq!(s, [0., 0.], abs_all <= 0.);
}

#[test]
fn test_truncated_cg_negative_curvature()
{
    let _ = env_logger::builder().is_test(true).try_init();

    let op_h = MatOp::<La>::new(MatType::Diag(2), &[-1., 1.]);
    let mut s = [0.; 2];
    let rslt = solve_unconstrained(&op_h, &[1., 0.], 2., &mut s);

    assert_eq!(rslt.stop, TruncatedStop::NegativeCurvature);
    assert_float_eq!(s, [-2., 0.], abs_all <= 1e-12);
    assert_float_eq!(rslt.model, -4., abs <= 1e-12);
}

#[test]
fn test_truncated_cg_trust_region()
{
    let _ = env_logger::builder().is_test(true).try_init();

    let op_h = MatOp::<La>::new(MatType::Diag(2), &[1., 1.]);
    let mut s = [0.; 2];
    let rslt = solve_unconstrained(&op_h, &[3., 4.], 1., &mut s);

    assert_eq!(rslt.stop, TruncatedStop::TrustRegionViolated);
    assert_float_eq!(s, [-0.6, -0.8], abs_all <= 1e-12);
}

#[test]
fn test_truncated_cg_nonsymmetric_operator()
{
    let _ = env_logger::builder().is_test(true).try_init();

    let mat_h = [ // column-major
        2., -1., 0.,
        1.,  2., 0.,
        0.,  0., 3.,
    ];
    let op_h = MatOp::<La>::new(MatType::General(3, 3), &mat_h);
    let mut s = [0.; 3];
    let rslt = solve_unconstrained(&op_h, &[1., 1., 1.], f64::INFINITY, &mut s);

    assert_eq!(rslt.stop, TruncatedStop::NonSymmetricOperator);
    assert_eq!(rslt.iter, 1);
}

#[test]
fn test_truncated_cg_nonprojector()
{
    let _ = env_logger::builder().is_test(true).try_init();

    let n = 3;
    let op_h = MatOp::<La>::new(MatType::Diag(n), &[1., 2., 3.]);
    let op_c = MatOp::<La>::new(MatType::Diag(n), &[2., 1., 1.]);
    let cg = ATruncatedCg::new();
    let mut work = vec![0.; ATruncatedCg::query_worklen(n, cg.par.orthog_max)];
    let mut s = [0.; 3];

    let rslt = cg.solve(&op_h, IdentityOp::<La>::new(n), &op_c,
        &[1., 1., 1.], &[0.; 3], 10., NoSafeguard, &mut s, &mut work).unwrap();

    assert_eq!(rslt.stop, TruncatedStop::NonProjectorPreconditioner);
}

#[test]
fn test_truncated_cg_nan_operator()
{
    let _ = env_logger::builder().is_test(true).try_init();

    let op_h = MatOp::<La>::new(MatType::Diag(2), &[f64::NAN, 1.]);
    let mut s = [0.; 2];
    let rslt = solve_unconstrained(&op_h, &[1., 1.], 10., &mut s);

    assert_eq!(rslt.stop, TruncatedStop::NanOperator);
    assert!(rslt.stop.is_numerical_failure());
}

#[test]
fn test_truncated_cg_safeguard()
{
    let _ = env_logger::builder().is_test(true).try_init();

    let n = 2;
    let op_h = MatOp::<La>::new(MatType::Diag(n), &[1., 1.]);
    let cg = ATruncatedCg::new();
    let mut work = vec![0.; ATruncatedCg::query_worklen(n, cg.par.orthog_max)];
    let mut s = [0.; 2];

    // x + s >= 0 around x = (0.5, 2)
    let h_x: &[f64] = &[0.5, 2.];
    let mut sg_work = vec![0.; LinSafeguard::<La, IdentityOp<La>>::query_worklen(n)];
    let sg = LinSafeguard::<La, _>::new(IdentityOp::<La>::new(n), h_x, 1., &mut sg_work).unwrap();

    let rslt = cg.solve(&op_h, IdentityOp::<La>::new(n), IdentityOp::<La>::new(n),
        &[1., 1.], &[0.; 2], 10., sg, &mut s, &mut work).unwrap();

    assert_eq!(rslt.stop, TruncatedStop::TooManyFailedSafeguard);
    assert_float_eq!(s, [-0.5, -0.5], abs_all <= 1e-12);
    assert!(rslt.model < 0.);
}

#[test]
fn test_truncated_cg_max_iters()
{
    let _ = env_logger::builder().is_test(true).try_init();

    let n = 3;
    let op_h = MatOp::<La>::new(MatType::Diag(n), &[1., 2., 3.]);
    let cg = ATruncatedCg::new().par(|p| {
        p.iter_max = 1;
    });
    let mut work = vec![0.; ATruncatedCg::query_worklen(n, cg.par.orthog_max)];
    let mut s = [0.; 3];

    let rslt = cg.solve(&op_h, IdentityOp::<La>::new(n), IdentityOp::<La>::new(n),
        &[1., 1., 1.], &[0.; 3], f64::INFINITY, NoSafeguard, &mut s, &mut work).unwrap();

    // one Cauchy step along -g
    assert_eq!(rslt.stop, TruncatedStop::MaxItersExceeded);
    assert_eq!(rslt.iter, 1);
    assert_float_eq!(s, [-0.5, -0.5, -0.5], abs_all <= 1e-12);
    assert_float_eq!(rslt.model, -0.75, abs <= 1e-12);
}

#[test]
fn test_truncated_cg_model_decrease()
{
    let _ = env_logger::builder().is_test(true).try_init();

    let mut rng = Xoshiro256StarStar::seed_from_u64(1);
    let n = 5;

    for _ in 0.. 20 {
        let sym_h: Vec<f64> = (0.. n * (n + 1) / 2).map(|_| rng.gen_range(-1.0..1.0)).collect();
        let g: Vec<f64> = (0.. n).map(|_| rng.gen_range(-1.0..1.0)).collect();
        let delta = rng.gen_range(0.1..3.0);
        let op_h = MatOp::<La>::new(MatType::SymPack(n), &sym_h);

        // the model never goes up as more iterations are allowed
        let mut model_prev = 0.;
        for iter_max in 1..= n + 1 {
            let cg = ATruncatedCg::new().par(|p| {
                p.iter_max = iter_max;
            });
            let mut work = vec![0.; ATruncatedCg::query_worklen(n, cg.par.orthog_max)];
            let mut s = vec![0.; n];

            let rslt = cg.solve(&op_h, IdentityOp::<La>::new(n), IdentityOp::<La>::new(n),
                &g, &vec![0.; n], delta, NoSafeguard, &mut s, &mut work).unwrap();

            assert!(rslt.model <= model_prev + 1e-12, "{} > {} at iter_max {}", rslt.model, model_prev, iter_max);
            model_prev = rslt.model;
        }
    }
}

#[test]
fn test_truncated_cg_objective_increase()
{
    let _ = env_logger::builder().is_test(true).try_init();

    let n = 2;
    let op_h = MatOp::<La>::new(MatType::Diag(n), &[1., 1.]);
    // negative definite, the direction goes uphill
    let op_b = MatOp::<La>::new(MatType::Diag(n), &[-1., -1.]);
    let cg = ATruncatedCg::new();
    let mut work = vec![0.; ATruncatedCg::query_worklen(n, cg.par.orthog_max)];
    let mut s = [0.; 2];

    let rslt = cg.solve(&op_h, &op_b, IdentityOp::<La>::new(n),
        &[1., 0.], &[0.; 2], 0.5, NoSafeguard, &mut s, &mut work).unwrap();

    assert_eq!(rslt.stop, TruncatedStop::ObjectiveIncrease);
    assert_eq!(rslt.iter, 1);
    assert_float_eq!(s, [0., 0.], abs_all <= 0.);
    assert_float_eq!(rslt.model, 0., abs <= 0.);
}

#[test]
fn test_truncated_cg_loss_of_orthogonality()
{
    let _ = env_logger::builder().is_test(true).try_init();

    let mat_h = [ // column-major
        2., -1., 0.,
        1.,  2., 0.,
        0.,  0., 3.,
    ];
    let op_h = MatOp::<La>::new(MatType::General(3, 3), &mat_h);
    // symmetry checks off, so the residuals drift apart instead
    let cg = ATruncatedCg::new().par(|p| {
        p.eps_sym = f64::INFINITY;
    });
    let mut work = vec![0.; ATruncatedCg::query_worklen(3, cg.par.orthog_max)];
    let mut s = [0.; 3];

    let rslt = cg.solve(&op_h, IdentityOp::<La>::new(3), IdentityOp::<La>::new(3),
        &[1., 1., 1.], &[0.; 3], f64::INFINITY, NoSafeguard, &mut s, &mut work).unwrap();

    assert_eq!(rslt.stop, TruncatedStop::LossOfOrthogonality);
    assert_eq!(rslt.iter, 2);
    assert!(rslt.model < 0.);
}

#[test]
fn test_truncated_cg_nonsymmetric_preconditioner()
{
    let _ = env_logger::builder().is_test(true).try_init();

    let n = 2;
    let op_h = MatOp::<La>::new(MatType::Diag(n), &[1., 2.]);
    let mat_b = [ // column-major, [[1, 0.5], [0, 1]]
        1., 0.,
        0.5, 1.,
    ];
    let op_b = MatOp::<La>::new(MatType::General(n, n), &mat_b);
    let cg = ATruncatedCg::new();
    let mut work = vec![0.; ATruncatedCg::query_worklen(n, cg.par.orthog_max)];
    let mut s = [0.; 2];

    let rslt = cg.solve(&op_h, &op_b, IdentityOp::<La>::new(n),
        &[1., 1.], &[0.; 2], f64::INFINITY, NoSafeguard, &mut s, &mut work).unwrap();

    assert_eq!(rslt.stop, TruncatedStop::NonSymmetricPreconditioner);
    assert_eq!(rslt.iter, 1);
    assert!(rslt.stop.is_numerical_failure());
}

#[test]
fn test_truncated_cg_nan_preconditioner()
{
    let _ = env_logger::builder().is_test(true).try_init();

    let n = 2;
    let op_h = MatOp::<La>::new(MatType::Diag(n), &[1., 2.]);
    let op_b = MatOp::<La>::new(MatType::Diag(n), &[f64::NAN, 1.]);
    let cg = ATruncatedCg::new();
    let mut work = vec![0.; ATruncatedCg::query_worklen(n, cg.par.orthog_max)];
    let mut s = [0.; 2];

    let rslt = cg.solve(&op_h, &op_b, IdentityOp::<La>::new(n),
        &[1., 1.], &[0.; 2], 10., NoSafeguard, &mut s, &mut work).unwrap();

    assert_eq!(rslt.stop, TruncatedStop::NanPreconditioner);
    assert_eq!(rslt.iter, 0);
    assert!(rslt.stop.is_numerical_failure());
    assert_float_eq!(s, [0., 0.], abs_all <= 0.);
}

#[test]
fn test_truncated_cg_offset_unsafe()
{
    let _ = env_logger::builder().is_test(true).try_init();

    let n = 2;
    let op_h = MatOp::<La>::new(MatType::Diag(n), &[1., 1.]);
    let cg = ATruncatedCg::new();
    let mut work = vec![0.; ATruncatedCg::query_worklen(n, cg.par.orthog_max)];
    let mut s = [1.; 2];

    // x + s >= 0 around x = (0.5, 2), the offset crosses the first bound
    let h_x: &[f64] = &[0.5, 2.];
    let mut sg_work = vec![0.; LinSafeguard::<La, IdentityOp<La>>::query_worklen(n)];
    let sg = LinSafeguard::<La, _>::new(IdentityOp::<La>::new(n), h_x, 1., &mut sg_work).unwrap();

    let rslt = cg.solve(&op_h, IdentityOp::<La>::new(n), IdentityOp::<La>::new(n),
        &[1., 1.], &[-1., 0.], 10., sg, &mut s, &mut work).unwrap();

    assert_eq!(rslt.stop, TruncatedStop::OffsetViolatesSafeguard);
    assert_eq!(rslt.iter, 0);
    assert_float_eq!(s, [0., 0.], abs_all <= 0.);
}

#[test]
fn test_truncated_cg_offset_safeguard_containment()
{
    let _ = env_logger::builder().is_test(true).try_init();

    let mut rng = Xoshiro256StarStar::seed_from_u64(2);
    let (m, n) = (4, 5);
    let kappa = 0.9;

    for _ in 0.. 200 {
        let sym_h: Vec<f64> = (0.. n * (n + 1) / 2).map(|_| rng.gen_range(-1.0..1.0)).collect();
        let g: Vec<f64> = (0.. n).map(|_| rng.gen_range(-1.0..1.0)).collect();
        let mat_a: Vec<f64> = (0.. m * n).map(|_| rng.gen_range(-1.0..1.0)).collect();
        let delta = rng.gen_range(0.1..2.0);

        // offset well inside the trust region
        let mut offset: Vec<f64> = (0.. n).map(|_| rng.gen_range(-1.0..1.0)).collect();
        let scl = rng.gen_range(0.0..0.9) * delta / La::norm(&offset);
        La::scale(scl, &mut offset);

        let op_h = MatOp::<La>::new(MatType::SymPack(n), &sym_h);
        let op_a = MatOp::<La>::new(MatType::General(m, n), &mat_a);

        // slack keeping the offset safe: kappa*h + A*offset > 0
        let mut a_off = vec![0.; m];
        op_a.op(1., &offset, 0., &mut a_off);
        let h_x: Vec<f64> = a_off.iter().map(|v| ((-v).max(0.) + rng.gen_range(0.01..0.5)) / kappa).collect();

        let mut sg_work = vec![0.; LinSafeguard::<La, &MatOp<La>>::query_worklen(m)];
        let sg = LinSafeguard::<La, _>::new(&op_a, &h_x, kappa, &mut sg_work).unwrap();

        let cg = ATruncatedCg::new();
        let mut work = vec![0.; ATruncatedCg::query_worklen(n, cg.par.orthog_max)];
        let mut s = vec![0.; n];

        let rslt = cg.solve(&op_h, IdentityOp::<La>::new(n), IdentityOp::<La>::new(n),
            &g, &offset, delta, sg, &mut s, &mut work).unwrap();

        assert!(!matches!(rslt.stop,
            TruncatedStop::OffsetViolatesTrustRegion | TruncatedStop::OffsetViolatesSafeguard
        ), "{:?}", rslt);

        // offset + s stays in the trust region
        let mut x = offset.clone();
        La::add(1., &s, &mut x);
        assert!(La::norm(&x) <= delta * (1. + 1e-9), "{} > {}", La::norm(&x), delta);

        // and in the safe region
        let mut y = h_x.clone();
        op_a.op(1., &x, kappa, &mut y);
        for v in y.iter() {
            assert!(*v >= -1e-9, "{:?}", y);
        }
    }
}
