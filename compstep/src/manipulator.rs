//! State manipulator

use compstep_core::solver::LinAlg;
use compstep_core::enums::OptimizationLocation;
use crate::{Functions, State};

/// State manipulator trait
///
/// Called by the solver at every [`OptimizationLocation`] with the state of the run.
/// It may inspect the state, modify it, or stop the run by setting
/// [`State::opt_stop`] to [`compstep_core::enums::OptimizationStop::UserDefined`].
/// With [`compstep_core::enums::AlgorithmClass::UserDefined`] it supplies the step
/// into [`State::dx`] at [`OptimizationLocation::GetStep`].
pub trait StateManipulator<L: LinAlg>
{
    /// Called at `loc`.
    fn eval(&mut self, fns: &Functions<L>, state: &mut State<L::F>, loc: OptimizationLocation);
}

impl<L, T> StateManipulator<L> for T
where L: LinAlg, T: FnMut(&Functions<L>, &mut State<L::F>, OptimizationLocation)
{
    fn eval(&mut self, fns: &Functions<L>, state: &mut State<L::F>, loc: OptimizationLocation)
    {
        self(fns, state, loc)
    }
}

/// State manipulator which does nothing.
pub struct NoManipulator;

impl<L: LinAlg> StateManipulator<L> for NoManipulator
{
    fn eval(&mut self, _fns: &Functions<L>, _state: &mut State<L::F>, _loc: OptimizationLocation)
    {
    }
}
