//! Classification registries
//!
//! Each registry is a closed set of tags with exactly one canonical string per tag.
//! Strings are the persisted form of configurations and stopping reasons;
//! a new tag gets a new string and never alters the existing ones.

use alloc::string::String;

/// Registry errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnumError
{
    /// A string outside the valid set of a registry.
    InvalidEnumValue {
        /// Name of the registry.
        domain: &'static str,
        /// Offending string.
        value: String,
    },
}

impl core::fmt::Display for EnumError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match &self {
            EnumError::InvalidEnumValue {domain, value} => write!(f, "InvalidEnumValue: \"{}\" is not a valid {}", value, domain),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for EnumError {}

//

macro_rules! registry {
    (
        $(#[$meta:meta])*
        $name:ident ($domain:literal) {
            $( $(#[$vmeta:meta])* $var:ident => $s:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name
        {
            $( $(#[$vmeta])* $var, )+
        }

        impl $name
        {
            /// Every value in declaration order.
            pub const ALL: &'static [$name] = &[$( $name::$var, )+];

            /// Name of this registry.
            pub const DOMAIN: &'static str = $domain;

            /// Canonical string of the value.
            pub fn as_str(&self) -> &'static str
            {
                match self {
                    $( $name::$var => $s, )+
                }
            }

            /// Converts a canonical string to the value.
            ///
            /// Returns the value, or `Err` with [`EnumError::InvalidEnumValue`] if `s` is outside the registry.
            pub fn from_string(s: &str) -> Result<Self, EnumError>
            {
                match s {
                    $( $s => Ok($name::$var), )+
                    _ => Err(EnumError::InvalidEnumValue {
                        domain: $domain,
                        value: String::from(s),
                    }),
                }
            }

            /// Checks whether `s` is the canonical string of some value.
            pub fn is_valid(s: &str) -> bool
            {
                matches!(s, $( $s )|+)
            }
        }

        impl core::fmt::Display for $name
        {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result
            {
                f.write_str(self.as_str())
            }
        }

        impl core::str::FromStr for $name
        {
            type Err = EnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err>
            {
                Self::from_string(s)
            }
        }
    };
}

//

registry! {
    /// Which algorithm computes the steps.
    AlgorithmClass ("AlgorithmClass") {
        /// Composite-step trust-region method.
        TrustRegion => "TrustRegion",
        /// Line-search method.
        LineSearch => "LineSearch",
        /// Steps supplied through a state manipulator.
        UserDefined => "UserDefined",
    }
}

registry! {
    /// Reason why the optimization stopped.
    OptimizationStop ("OptimizationStop") {
        /// Still running.
        NotConverged => "NotConverged",
        /// Gradient of the Lagrangian below tolerance.
        GradientSmall => "GradientSmall",
        /// Step below tolerance.
        StepSmall => "StepSmall",
        /// Iteration budget exhausted.
        MaxItersExceeded => "MaxItersExceeded",
        /// The iterate cannot stay strictly feasible.
        InteriorPointInstability => "InteriorPointInstability",
        /// No acceptable step can be computed.
        GlobalizationFailure => "GlobalizationFailure",
        /// Stopped from outside the algorithm.
        UserDefined => "UserDefined",
    }
}

registry! {
    /// Kind of a Hessian approximation or preconditioner.
    OperatorKind ("Operators") {
        /// Identity.
        Identity => "Identity",
        /// Identity scaled by the gradient norm over the trust-region radius.
        ScaledIdentity => "ScaledIdentity",
        /// Limited-memory BFGS approximation of the Hessian.
        BFGS => "BFGS",
        /// Limited-memory BFGS approximation of the inverse Hessian.
        InvBFGS => "InvBFGS",
        /// Limited-memory SR1 approximation of the Hessian.
        SR1 => "SR1",
        /// Limited-memory SR1 approximation of the inverse Hessian.
        InvSR1 => "InvSR1",
        /// Supplied by the user.
        UserDefined => "UserDefined",
    }
}

registry! {
    /// Search direction of the line-search method.
    LineSearchDirection ("LineSearchDirection") {
        /// Negative gradient.
        SteepestDescent => "SteepestDescent",
        /// Nonlinear CG, Fletcher-Reeves.
        FletcherReeves => "FletcherReeves",
        /// Nonlinear CG, Polak-Ribiere.
        PolakRibiere => "PolakRibiere",
        /// Nonlinear CG, Hestenes-Stiefel.
        HestenesStiefel => "HestenesStiefel",
        /// Quasi-Newton with the inverse BFGS approximation.
        BFGS => "BFGS",
        /// Newton step by truncated CG.
        NewtonCG => "NewtonCG",
    }
}

registry! {
    /// Step length selection of the line-search method.
    LineSearchKind ("LineSearchKind") {
        /// Golden-section search.
        GoldenSection => "GoldenSection",
        /// Backtracking.
        BackTracking => "BackTracking",
        /// Barzilai-Borwein two-point step, first form.
        TwoPointA => "TwoPointA",
        /// Barzilai-Borwein two-point step, second form.
        TwoPointB => "TwoPointB",
    }
}

impl LineSearchKind
{
    /// Checks whether the kind enforces a sufficient decrease condition.
    pub fn is_sufficient_decrease(&self) -> bool
    {
        match self {
            LineSearchKind::GoldenSection | LineSearchKind::BackTracking => true,
            LineSearchKind::TwoPointA | LineSearchKind::TwoPointB => false,
        }
    }
}

registry! {
    /// Hook points of an optimization run.
    OptimizationLocation ("OptimizationLocation") {
        /// Start of the run.
        BeginningOfOptimization => "BeginningOfOptimization",
        /// Before the first function and gradient evaluation.
        BeforeInitialFuncAndGrad => "BeforeInitialFuncAndGrad",
        /// After the first function and gradient evaluation.
        AfterInitialFuncAndGrad => "AfterInitialFuncAndGrad",
        /// Before the main loop.
        BeforeOptimizationLoop => "BeforeOptimizationLoop",
        /// Start of each iteration.
        BeginningOfOptimizationLoop => "BeginningOfOptimizationLoop",
        /// Before the current iterate is saved as the old one.
        BeforeSaveOld => "BeforeSaveOld",
        /// Before a step is computed.
        BeforeStep => "BeforeStep",
        /// Before a step is requested.
        BeforeGetStep => "BeforeGetStep",
        /// Where a step is requested.
        GetStep => "GetStep",
        /// After the step is taken, before the gradient is evaluated.
        AfterStepBeforeGradient => "AfterStepBeforeGradient",
        /// After the gradient is evaluated.
        AfterGradient => "AfterGradient",
        /// Before the quasi-Newton update.
        BeforeQuasi => "BeforeQuasi",
        /// After the quasi-Newton update.
        AfterQuasi => "AfterQuasi",
        /// End of each iteration.
        EndOfOptimizationIteration => "EndOfOptimizationIteration",
        /// Before a line search.
        BeforeLineSearch => "BeforeLineSearch",
        /// After a trust-region step is rejected.
        AfterRejectedTrustRegion => "AfterRejectedTrustRegion",
        /// After a line-search step is rejected.
        AfterRejectedLineSearch => "AfterRejectedLineSearch",
        /// Before the actual versus predicted reduction is evaluated.
        BeforeActualVersusPredicted => "BeforeActualVersusPredicted",
        /// End of the run.
        EndOfOptimization => "EndOfOptimization",
    }
}

registry! {
    /// Which constraints a problem has.
    ProblemClass ("ProblemClass") {
        /// No constraints.
        Unconstrained => "Unconstrained",
        /// Equality constraints only.
        EqualityConstrained => "EqualityConstrained",
        /// Inequality constraints only.
        InequalityConstrained => "InequalityConstrained",
        /// Both kinds of constraints.
        Constrained => "Constrained",
    }
}

registry! {
    /// Finite-difference checks of the functions.
    FunctionDiagnostics ("FunctionDiagnostics") {
        /// No checks.
        NoDiagnostics => "NoDiagnostics",
        /// Gradients and Jacobians.
        FirstOrder => "FirstOrder",
        /// Also Hessians and second derivatives.
        SecondOrder => "SecondOrder",
    }
}

registry! {
    /// Algebraic checks of the vector spaces.
    VectorSpaceDiagnostics ("VectorSpaceDiagnostics") {
        /// No checks.
        NoDiagnostics => "NoDiagnostics",
        /// Linear space axioms.
        Basic => "Basic",
        /// Also Euclidean-Jordan algebra axioms.
        EuclideanJordan => "EuclideanJordan",
    }
}

registry! {
    /// When diagnostics run.
    DiagnosticScheme ("DiagnosticScheme") {
        /// Never.
        Never => "Never",
        /// Only diagnostics, no optimization.
        DiagnosticsOnly => "DiagnosticsOnly",
        /// At every iteration.
        EveryIteration => "EveryIteration",
    }
}

registry! {
    /// How a stopping tolerance is measured.
    ToleranceKind ("ToleranceKind") {
        /// Relative to the value at the starting point.
        Relative => "Relative",
        /// As is.
        Absolute => "Absolute",
    }
}

registry! {
    /// Reason why the quasinormal step stopped.
    QuasinormalStop ("QuasinormalStop") {
        /// Newton step inside the trust region and the safeguard.
        Newton => "Newton",
        /// Cauchy point cut at the trust region.
        CauchyTrustRegion => "CauchyTrustRegion",
        /// Cauchy point cut at the safeguard.
        CauchySafeguard => "CauchySafeguard",
        /// Dogleg step cut at the trust region.
        DoglegTrustRegion => "DoglegTrustRegion",
        /// Dogleg step cut at the safeguard.
        DoglegSafeguard => "DoglegSafeguard",
        /// Newton direction cut at the trust region.
        NewtonTrustRegion => "NewtonTrustRegion",
        /// Newton direction cut at the safeguard.
        NewtonSafeguard => "NewtonSafeguard",
        /// No constraint to satisfy.
        Skipped => "Skipped",
        /// Uncut Cauchy point.
        CauchySolved => "CauchySolved",
    }
}

impl QuasinormalStop
{
    /// Abbreviated string used as an iteration table column.
    pub fn short_str(&self) -> &'static str
    {
        match self {
            QuasinormalStop::Newton            => "Newton",
            QuasinormalStop::CauchyTrustRegion => "CauchyTR",
            QuasinormalStop::CauchySafeguard   => "CauchySafe",
            QuasinormalStop::DoglegTrustRegion => "DoglegTR",
            QuasinormalStop::DoglegSafeguard   => "DoglegSafe",
            QuasinormalStop::NewtonTrustRegion => "NewtonTR",
            QuasinormalStop::NewtonSafeguard   => "NewtonSafe",
            QuasinormalStop::Skipped           => "Skipped",
            QuasinormalStop::CauchySolved      => "CauchySlv",
        }
    }
}

registry! {
    /// Reason why truncated CG stopped.
    TruncatedStop ("TruncatedStop") {
        /// Still running.
        NotConverged => "NotConverged",
        /// Nonpositive curvature found.
        NegativeCurvature => "NegativeCurvature",
        /// Relative residual below tolerance.
        RelativeErrorSmall => "RelativeErrorSmall",
        /// Iteration budget exhausted.
        MaxItersExceeded => "MaxItersExceeded",
        /// Step reached the trust-region boundary.
        TrustRegionViolated => "TrustRegionViolated",
        /// Operator returned a non-finite value.
        NanOperator => "NanOperator",
        /// Preconditioner returned a non-finite value.
        NanPreconditioner => "NanPreconditioner",
        /// Projector applied twice differs from once.
        NonProjectorPreconditioner => "NonProjectorPreconditioner",
        /// Preconditioner is not symmetric.
        NonSymmetricPreconditioner => "NonSymmetricPreconditioner",
        /// Operator is not symmetric.
        NonSymmetricOperator => "NonSymmetricOperator",
        /// Residuals lost their mutual orthogonality.
        LossOfOrthogonality => "LossOfOrthogonality",
        /// Offset lies outside the trust region.
        OffsetViolatesTrustRegion => "OffsetViolatesTrustRegion",
        /// Offset violates the safeguard.
        OffsetViolatesSafeguard => "OffsetViolatesSafeguard",
        /// Safeguard cut the step too many times.
        TooManyFailedSafeguard => "TooManyFailedSafeguard",
        /// Model value increased.
        ObjectiveIncrease => "ObjectiveIncrease",
    }
}

impl TruncatedStop
{
    /// Abbreviated string used as an iteration table column.
    pub fn short_str(&self) -> &'static str
    {
        match self {
            TruncatedStop::NotConverged               => "NotConv",
            TruncatedStop::NegativeCurvature          => "NegCurv",
            TruncatedStop::RelativeErrorSmall         => "RelErrSml",
            TruncatedStop::MaxItersExceeded           => "IterExcd",
            TruncatedStop::TrustRegionViolated        => "TrstReg",
            TruncatedStop::NanOperator                => "NanOp",
            TruncatedStop::NanPreconditioner          => "NanPre",
            TruncatedStop::NonProjectorPreconditioner => "NonProjPre",
            TruncatedStop::NonSymmetricPreconditioner => "NonSymmPre",
            TruncatedStop::NonSymmetricOperator       => "NonSymmOp",
            TruncatedStop::LossOfOrthogonality        => "OrthogLost",
            TruncatedStop::OffsetViolatesTrustRegion  => "OffsetTR",
            TruncatedStop::OffsetViolatesSafeguard    => "OffsetSafe",
            TruncatedStop::TooManyFailedSafeguard     => "Safeguard",
            TruncatedStop::ObjectiveIncrease          => "ObjIncr",
        }
    }

    /// Checks whether the stop means the step cannot be trusted.
    ///
    /// Such stops are numerical failures of the operators rather than outcomes of the geometry.
    pub fn is_numerical_failure(&self) -> bool
    {
        matches!(self,
            TruncatedStop::NanOperator |
            TruncatedStop::NanPreconditioner |
            TruncatedStop::NonProjectorPreconditioner |
            TruncatedStop::NonSymmetricPreconditioner |
            TruncatedStop::NonSymmetricOperator |
            TruncatedStop::LossOfOrthogonality
        )
    }
}

//

#[test]
fn test_registry1()
{
    use alloc::string::ToString;

    assert_eq!(AlgorithmClass::TrustRegion.to_string(), "TrustRegion");
    assert_eq!(OperatorKind::DOMAIN, "Operators");
    assert_eq!("InvBFGS".parse::<OperatorKind>(), Ok(OperatorKind::InvBFGS));
    assert!(!ProblemClass::is_valid("constrained"));
    assert_eq!(OptimizationLocation::ALL.len(), 19);
    assert!(LineSearchKind::BackTracking.is_sufficient_decrease());
    assert!(!LineSearchKind::TwoPointB.is_sufficient_decrease());
    assert_eq!(TruncatedStop::TooManyFailedSafeguard.short_str(), "Safeguard");
    assert_eq!(QuasinormalStop::CauchySolved.short_str(), "CauchySlv");
}
