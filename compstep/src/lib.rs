/*!
Nonlinear optimization by composite-step trust-region and line-search methods.

<script src="https://polyfill.io/v3/polyfill.min.js?features=es6"></script>
<script id="MathJax-script" async src="https://cdn.jsdelivr.net/npm/mathjax@3/es5/tex-mml-chtml.js"></script>

This crate for Rust solves
\\[
\begin{array}{ll}
{\rm minimize} & f(x) \\\\
{\rm subject \ to} & g(x) = 0 \\\\
& h(x) \succeq 0
\end{array}
\\]
where \\(f\\), \\(g\\) and \\(h\\) are twice differentiable and \\(\succeq\\) is the order of a Euclidean-Jordan algebra,
using the kernels of [`compstep_core`].

# General usage

1. Implement [`Objective`] for \\(f\\), and [`Constraint`] for \\(g\\) and \\(h\\) if the problem has them.
   [`QuadObjective`] and [`LinearConstraint`] are ready-made ones built on [`MatBuild`] matrices.
1. Choose a [`compstep_core::solver::JordanAlg`] implementation to use:
   [`prelude::FloatGeneric`] is `num::Float`-generic, with the nonnegative orthant as its cone.
1. Bundle the functions by [`Functions`] and make an initial [`State`].
1. Create a [`Solver`] instance and optionally set its parameters, or read them by [`SolverParam::set_by_env`].
1. Invoke [`Solver::solve`], or [`Solver::solve_with`] to choose a [`Messaging`] and hook a [`StateManipulator`].

The algorithm follows the problem:
[`prelude::AlgorithmClass::TrustRegion`] handles every problem class by composite steps;
[`prelude::AlgorithmClass::LineSearch`] handles problems without equality constraints.

# Examples

The Rosenbrock function with its exact Hessian:
\\[
f(x) = (1 - x_0)^2 + 100 (x_1 - x_0^2)^2
\\]
whose minimum is at \\((1, 1)\\).

```
use float_eq::assert_float_eq;
use compstep::prelude::*;
use compstep::*;

//env_logger::init(); // Use any logger crate as `compstep` uses `log` crate.

type La = FloatGeneric<f64>;

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

let f = Rosenbrock;
let fns = Functions::<La>::new(&f);
let mut state = State::new(&[-1.2, 1.]);

let s = Solver::<La>::new().par(|p| {
    p.h_type = OperatorKind::UserDefined; // exact Hessian
    p.msg_level = 0;
});
let stop = s.solve(&fns, &mut state).unwrap();

assert_eq!(stop, OptimizationStop::GradientSmall);
assert_float_eq!(state.x[..], [1., 1.][..], abs_all <= 1e-4);
```

## Other examples

You can find other tests of the problem classes under `tests/`.
*/

mod matbuild;

pub use matbuild::*;

//

mod functions;
mod param;
mod state;
mod quasi_newton;
mod messaging;
mod manipulator;

pub use functions::*;
pub use param::*;
pub use state::*;
pub use quasi_newton::*;
pub use messaging::*;
pub use manipulator::*;

//

mod lagrangian;
mod solver;
mod trust_region;
mod line_search;

pub use lagrangian::{LagrangianHess, NullProjector};
pub use solver::Solver;

//

pub mod diagnostics;
pub mod format;

/// Prelude
pub mod prelude
{
   pub use crate::{Solver, SolverParam, State, Functions, Objective, Constraint};
   pub use compstep_core::solver::{LinAlg, JordanAlg, Operator, SliceLike};
   pub use compstep_core::enums::*;
   pub use compstep_core::trace::Failure;
   pub use compstep_core::{FloatGeneric, MatType};
}
