//! Node-voltage solver.
//!
//! The solve is a fixed sequence of [`Stage`]s. Each stage reads the latest
//! [`SolutionStep`] and produces a new one holding its own copy of the
//! circuit, so every intermediate state stays inspectable:
//!
//! ```text
//! choose reference -> KVL -> Ohm -> [numeric KCL] -> KCL equations
//!   -> known/unknown split -> substitution -> linear solve -> back substitution
//! ```
//!
//! The linear solve goes through a [`LinearBackend`]; the default is
//! [`GaussianElimination`] over complex numbers.

mod linear;
mod pipeline;
mod step;

pub use linear::{GaussianElimination, LinearBackend, LinearSystem};
pub use pipeline::{choose_reference_node, Solver, SolverConfig};
pub use step::{Solution, SolutionStep, Stage, StepSummary};

/// Default relative tolerance for voltage agreement checks.
pub const DEFAULT_TOLERANCE: f64 = 1e-9;

/// Pivots below this fraction of the largest matrix entry count as zero.
pub const PIVOT_TOLERANCE: f64 = 1e-12;
