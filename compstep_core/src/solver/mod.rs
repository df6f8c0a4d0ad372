//! Step solvers

mod slicelike;
mod linalg;
mod jordan;
mod operator;
mod safeguard;
mod solver_error;
mod normal_eq;
mod truncated_cg;
mod quasinormal;

pub use slicelike::*;
pub use linalg::*;
pub use jordan::*;
pub use operator::*;
pub use safeguard::*;
pub use solver_error::*;
pub use normal_eq::*;
pub use truncated_cg::*;
pub use quasinormal::*;
