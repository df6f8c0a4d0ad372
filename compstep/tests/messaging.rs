use std::cell::RefCell;
use compstep::prelude::*;
use compstep::*;

type La = FloatGeneric<f64>;

type AMatBuild = MatBuild<La>;
type ASolver = Solver<La>;

//

#[derive(Default)]
struct Capture
{
    lines: RefCell<Vec<String>>,
    failures: RefCell<Vec<Failure>>,
}

impl Messaging for Capture
{
    fn print(&self, msg: &str)
    {
        self.lines.borrow_mut().push(msg.to_string());
    }

    fn error(&self, failure: Failure) -> Failure
    {
        self.failures.borrow_mut().push(failure.clone());
        failure
    }
}

// (1/2) x^T diag(1, 4) x - (1, 4)^T x
fn quad() -> QuadObjective<La>
{
    let sym_p = AMatBuild::new(MatType::Diag(2)).iter_colmaj(&[1., 4.]);
    let vec_q = AMatBuild::new(MatType::General(2, 1)).iter_colmaj(&[-1., -4.]);
    QuadObjective::new(sym_p, vec_q, 0.).unwrap()
}

//

#[test]
fn test_messaging_table_tr()
{
    let _ = env_logger::builder().is_test(true).try_init();

    let f = quad();
    let fns = Functions::<La>::new(&f);
    let mut state = State::new(&[0., 0.]);
    let cap = Capture::default();

    let s = ASolver::new().par(|p| {
        p.h_type = OperatorKind::UserDefined;
    });
    let rslt = s.solve_with(&fns, &mut state, &cap, &mut NoManipulator).unwrap();
    assert_eq!(rslt, OptimizationStop::GradientSmall);

    let lines = cap.lines.borrow();
    for l in lines.iter() {
        println!("{}", l);
    }

    // header, initial row, one row per iteration, closing line
    assert_eq!(lines.len(), state.iter + 3);
    let header = &lines[0];
    for name in ["Iter", "f(x)", "||grad||", "||dx||", "delta", "ared/pred", "#Krylov", "KryStop", "#Rej"] {
        assert!(header.contains(name), "{} missing", name);
    }
    assert!(!header.contains("QNStop"));
    assert!(!header.contains("mu"));
    assert_eq!(lines.last().map(String::as_str), Some("Optimization stopped: GradientSmall"));
    assert!(cap.failures.borrow().is_empty());
}

#[test]
fn test_messaging_table_ls()
{
    let _ = env_logger::builder().is_test(true).try_init();

    let f = quad();
    let fns = Functions::<La>::new(&f);
    let mut state = State::new(&[0., 0.]);
    let cap = Capture::default();

    let s = ASolver::new().par(|p| {
        p.algorithm_class = AlgorithmClass::LineSearch;
        p.dir = LineSearchDirection::NewtonCG;
        p.kind = LineSearchKind::BackTracking;
        p.h_type = OperatorKind::UserDefined;
    });
    s.solve_with(&fns, &mut state, &cap, &mut NoManipulator).unwrap();

    let lines = cap.lines.borrow();
    let header = &lines[0];
    for name in ["alpha", "#LS", "#Krylov", "KryStop", "#Rej"] {
        assert!(header.contains(name), "{} missing", name);
    }
    assert!(!header.contains("delta"));
}

#[test]
fn test_messaging_quiet()
{
    let _ = env_logger::builder().is_test(true).try_init();

    let f = quad();
    let fns = Functions::<La>::new(&f);
    let mut state = State::new(&[0., 0.]);
    let cap = Capture::default();

    let s = ASolver::new().par(|p| {
        p.msg_level = 0;
    });
    s.solve_with(&fns, &mut state, &cap, &mut NoManipulator).unwrap();

    assert!(cap.lines.borrow().is_empty());
}

#[test]
fn test_messaging_param_error()
{
    let _ = env_logger::builder().is_test(true).try_init();

    let f = quad();
    let fns = Functions::<La>::new(&f);
    let mut state = State::new(&[0., 0.]);
    let cap = Capture::default();

    let s = ASolver::new().par(|p| {
        p.eta1 = 0.95;
    });
    let failure = s.solve_with(&fns, &mut state, &cap, &mut NoManipulator).unwrap_err();

    let failures = cap.failures.borrow();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0], failure);
    assert_eq!(failure.message(), "Invalid parameters");
    assert!(compstep_core::trace::to_string(&failure).contains("eta1"));
    assert!(cap.lines.borrow().is_empty());
}

#[test]
fn test_messaging_diagnostics_only()
{
    let _ = env_logger::builder().is_test(true).try_init();

    let f = quad();
    let fns = Functions::<La>::new(&f);
    let mut state = State::new(&[0.5, -0.5]);
    let cap = Capture::default();

    let s = ASolver::new().par(|p| {
        p.f_diag = FunctionDiagnostics::SecondOrder;
        p.x_diag = VectorSpaceDiagnostics::EuclideanJordan;
        p.dscheme = DiagnosticScheme::DiagnosticsOnly;
    });
    let rslt = s.solve_with(&fns, &mut state, &cap, &mut NoManipulator).unwrap();

    assert_eq!(rslt, OptimizationStop::UserDefined);
    assert_eq!(state.iter, 0);

    let lines = cap.lines.borrow();
    assert!(lines.iter().any(|l| l == "Diagnostics on the objective"));
    assert!(lines.iter().any(|l| l == "Diagnostics on the vector space"));
    assert!(lines.iter().any(|l| l == "Diagnostics on the Euclidean-Jordan algebra"));
    assert_eq!(lines.last().map(String::as_str), Some("Optimization stopped: UserDefined"));
}

#[test]
fn test_messaging_set_by_env()
{
    let _ = env_logger::builder().is_test(true).try_init();

    std::env::set_var("COMPSTEP_ITER_MAX", "7");
    std::env::set_var("COMPSTEP_ALGORITHM_CLASS", "LineSearch");
    std::env::set_var("COMPSTEP_DELTA", "not a number");

    let mut s = ASolver::new();
    s.par.set_by_env();

    std::env::remove_var("COMPSTEP_ITER_MAX");
    std::env::remove_var("COMPSTEP_ALGORITHM_CLASS");
    std::env::remove_var("COMPSTEP_DELTA");

    assert_eq!(s.par.iter_max, 7);
    assert_eq!(s.par.algorithm_class, AlgorithmClass::LineSearch);
    assert_eq!(s.par.delta, SolverParam::<f64>::default().delta);
}
