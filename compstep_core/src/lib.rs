//! Core of the composite-step trust-region optimizer.
//!
//! The step solvers work on vectors through the [`solver::LinAlg`] traits
//! and on linear maps through [`solver::Operator`],
//! with temporal variables in caller-provided work slices.

#![no_std]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod solver;
pub mod enums;
pub mod trace;

//

mod linalg_ex;

pub use linalg_ex::*;

//

mod floatgeneric;

pub use floatgeneric::*;

//

mod matop;

pub use matop::*;
