use float_eq::assert_float_eq;
use compstep_core::solver::*;
use compstep_core::enums::QuasinormalStop;
use compstep_core::*;

type La = FloatGeneric<f64>;
type AQuasinormal = Quasinormal<La>;

fn solve<S: Safeguard<La>>(qn: &AQuasinormal, op_g: &MatOp<La>, g_x: &[f64], delta: f64, safeguard: S)
-> (QuasinormalResult<f64>, Vec<f64>, Vec<f64>)
{
    let (_, n) = op_g.size();
    let mut dx_n = vec![0.; n];
    let mut dx_ncp = vec![0.; n];
    let mut work = vec![0.; AQuasinormal::query_worklen(op_g.size())];

    let rslt = qn.solve(op_g, g_x, delta, safeguard, &mut dx_n, &mut dx_ncp, &mut work).unwrap();

    (rslt, dx_n, dx_ncp)
}

//

#[test]
fn test_quasinormal_cauchy_safeguard()
{
    let _ = env_logger::builder().is_test(true).try_init();

    let n = 2;
    let zeta = 0.8;
    let gamma = 0.95;
    let c = zeta * gamma;

    // g(x) = x0 + x1 - 1 at x = 0
    let op_g = MatOp::<La>::new(MatType::General(1, n), &[1., 1.]);
    let g_x = [-1.];

    // h(x) = [x + 1; 0.25/c - x] at x = 0
    let mat_h = [ // column-major
        1., 0., -1.,  0.,
        0., 1.,  0., -1.,
    ];
    let op_h = MatOp::<La>::new(MatType::General(4, n), &mat_h);
    let h_x: &[f64] = &[1., 1., 0.25 / c, 0.25 / c];
    let mut sg_work = vec![0.; LinSafeguard::<La, &MatOp<La>>::query_worklen(4)];
    let sg = LinSafeguard::<La, _>::new(&op_h, h_x, c, &mut sg_work).unwrap();

    let qn = AQuasinormal::new().par(|p| {
        p.zeta = zeta;
    });
    let (rslt, dx_n, dx_ncp) = solve(&qn, &op_g, &g_x, 100., sg);

    assert_eq!(rslt.stop, QuasinormalStop::CauchySafeguard);
    assert_float_eq!(dx_n[..], [0.25, 0.25][..], abs_all <= 1e-12);
    assert_float_eq!(dx_ncp[..], [0.5, 0.5][..], abs_all <= 1e-12);
    assert_float_eq!(rslt.residual, 0.5, abs <= 1e-12);
}

#[test]
fn test_quasinormal_cauchy_trust_region()
{
    let _ = env_logger::builder().is_test(true).try_init();

    let op_g = MatOp::<La>::new(MatType::General(1, 2), &[1., 1.]);
    let qn = AQuasinormal::new();
    let (rslt, dx_n, dx_ncp) = solve(&qn, &op_g, &[-1.], 0.5, NoSafeguard);

    assert_eq!(rslt.stop, QuasinormalStop::CauchyTrustRegion);
    assert_float_eq!(La::norm(&dx_n), 0.8 * 0.5, abs <= 1e-12);
    assert_float_eq!(dx_ncp[..], [0.5, 0.5][..], abs_all <= 1e-12);
}

#[test]
fn test_quasinormal_cauchy_solved()
{
    let _ = env_logger::builder().is_test(true).try_init();

    let op_g = MatOp::<La>::new(MatType::General(1, 2), &[1., 1.]);
    let qn = AQuasinormal::new();
    let (rslt, dx_n, _) = solve(&qn, &op_g, &[-1.], 100., NoSafeguard);

    assert_eq!(rslt.stop, QuasinormalStop::CauchySolved);
    assert_float_eq!(dx_n[..], [0.5, 0.5][..], abs_all <= 1e-12);
    assert_float_eq!(rslt.residual, 0., abs <= 1e-12);
}

// g'(x) = [1 0 0; 0 2 0], g(x) = (1, 1)
// Cauchy point does not solve it, Newton step is (-1, -0.5, 0).
const MAT_G2: [f64; 6] = [ // column-major
    1., 0.,
    0., 2.,
    0., 0.,
];

#[test]
fn test_quasinormal_newton()
{
    let _ = env_logger::builder().is_test(true).try_init();

    let op_g = MatOp::<La>::new(MatType::General(2, 3), &MAT_G2);
    let qn = AQuasinormal::new();
    let (rslt, dx_n, dx_ncp) = solve(&qn, &op_g, &[1., 1.], 100., NoSafeguard);

    assert_eq!(rslt.stop, QuasinormalStop::Newton);
    assert_float_eq!(dx_n[..], [-1., -0.5, 0.][..], abs_all <= 1e-8);
    assert_float_eq!(dx_ncp[..], [-5. / 17., -10. / 17., 0.][..], abs_all <= 1e-12);
    assert!(rslt.residual <= 1e-8);
}

#[test]
fn test_quasinormal_dogleg()
{
    let _ = env_logger::builder().is_test(true).try_init();

    let op_g = MatOp::<La>::new(MatType::General(2, 3), &MAT_G2);
    let qn = AQuasinormal::new();
    let delta = 1.;
    let (rslt, dx_n, dx_ncp) = solve(&qn, &op_g, &[1., 1.], delta, NoSafeguard);

    assert_eq!(rslt.stop, QuasinormalStop::DoglegTrustRegion);
    assert_float_eq!(La::norm(&dx_n), 0.8 * delta, abs <= 1e-9);

    // better than the Cauchy point
    let mut res = vec![1., 1.];
    op_g.op(1., &dx_ncp, 1., &mut res);
    assert!(rslt.residual < La::norm(&res));
}

#[test]
fn test_quasinormal_cauchy_only()
{
    let _ = env_logger::builder().is_test(true).try_init();

    let op_g = MatOp::<La>::new(MatType::General(2, 3), &MAT_G2);
    let qn = AQuasinormal::new().par(|p| {
        p.newton = false;
    });
    let (rslt, dx_n, dx_ncp) = solve(&qn, &op_g, &[1., 1.], 100., NoSafeguard);

    assert_eq!(rslt.stop, QuasinormalStop::CauchySolved);
    assert_float_eq!(dx_n[..], dx_ncp[..], abs_all <= 0.);
}

#[test]
fn test_quasinormal_skipped()
{
    let _ = env_logger::builder().is_test(true).try_init();

    let op_g = MatOp::<La>::new(MatType::General(0, 2), &[]);
    let qn = AQuasinormal::new();
    let (rslt, dx_n, _) = solve(&qn, &op_g, &[], 1., NoSafeguard);

    assert_eq!(rslt.stop, QuasinormalStop::Skipped);
    assert_float_eq!(dx_n[..], [0., 0.][..], abs_all <= 0.);
}
