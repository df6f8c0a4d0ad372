use compstep_core::enums::*;

macro_rules! check_registry {
    ($name:ident, $len:expr) => {
        assert_eq!($name::ALL.len(), $len);

        for v in $name::ALL {
            let s = v.to_string();
            assert_eq!($name::from_string(&s), Ok(*v));
            assert_eq!(s.parse::<$name>(), Ok(*v));
            assert!($name::is_valid(&s));
        }

        // strings are unique over the registry
        for (i, v) in $name::ALL.iter().enumerate() {
            for w in &$name::ALL[i + 1..] {
                assert_ne!(v.as_str(), w.as_str());
            }
        }

        for bogus in ["Bogus", "", " TrustRegion", "trustregion", "NotConverged "] {
            if !$name::ALL.iter().any(|v| v.as_str() == bogus) {
                assert!(!$name::is_valid(bogus));
                assert_eq!($name::from_string(bogus), Err(EnumError::InvalidEnumValue {
                    domain: $name::DOMAIN,
                    value: bogus.to_string(),
                }));
            }
        }
    };
}

#[test]
fn test_registries()
{
    let _ = env_logger::builder().is_test(true).try_init();

    check_registry!(AlgorithmClass, 3);
    check_registry!(OptimizationStop, 7);
    check_registry!(OperatorKind, 7);
    check_registry!(LineSearchDirection, 6);
    check_registry!(LineSearchKind, 4);
    check_registry!(OptimizationLocation, 19);
    check_registry!(ProblemClass, 4);
    check_registry!(FunctionDiagnostics, 3);
    check_registry!(VectorSpaceDiagnostics, 3);
    check_registry!(DiagnosticScheme, 3);
    check_registry!(ToleranceKind, 2);
    check_registry!(QuasinormalStop, 9);
    check_registry!(TruncatedStop, 15);
}

#[test]
fn test_registry_strings()
{
    assert_eq!(AlgorithmClass::from_string("Bogus").map_err(|e| e.to_string()),
        Err("InvalidEnumValue: \"Bogus\" is not a valid AlgorithmClass".to_string()));

    assert_eq!(OptimizationLocation::ALL[0].as_str(), "BeginningOfOptimization");
    assert_eq!(OptimizationLocation::ALL[18].as_str(), "EndOfOptimization");
    assert_eq!(OperatorKind::from_string("Operators").is_err(), true);

    let shorts: Vec<_> = TruncatedStop::ALL.iter().map(|v| v.short_str()).collect();
    assert_eq!(shorts, [
        "NotConv", "NegCurv", "RelErrSml", "IterExcd", "TrstReg", "NanOp", "NanPre", "NonProjPre",
        "NonSymmPre", "NonSymmOp", "OrthogLost", "OffsetTR", "OffsetSafe", "Safeguard", "ObjIncr",
    ]);

    let shorts: Vec<_> = QuasinormalStop::ALL.iter().map(|v| v.short_str()).collect();
    assert_eq!(shorts, [
        "Newton", "CauchyTR", "CauchySafe", "DoglegTR", "DoglegSafe", "NewtonTR", "NewtonSafe", "Skipped", "CauchySlv",
    ]);
}
