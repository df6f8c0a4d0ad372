/// Solver errors.
///
/// Failures with no safe fallback inside a step computation.
/// Expected geometric outcomes (trust-region or safeguard boundaries)
/// are reported through stop reasons instead.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SolverError
{
    /// Invalid [`crate::solver::Operator`]: its size does not match the vectors.
    InvalidOp,
    /// Shortage of work slice length.
    WorkShortage,
    /// A NaN or infinite value appeared in an auxiliary solve.
    NumericalInstability,
}

impl core::fmt::Display for SolverError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", match &self {
            SolverError::InvalidOp            => "InvalidOp: operator size mismatch",
            SolverError::WorkShortage         => "WorkShortage: shortage of work slice length",
            SolverError::NumericalInstability => "NumericalInstability: non-finite value in an auxiliary solve",
        })
    }
}

#[cfg(feature = "std")]
impl std::error::Error for SolverError {}
