//! # AutoSchaum Core
//!
//! Step-by-step node-voltage analysis of linear circuits.
//!
//! This library provides:
//! - A netlist reader for resistors, complex impedances and voltage sources
//! - A circuit graph split into branches and supernodes
//! - KVL voltage propagation and symbolic KCL equation synthesis
//! - A staged solver whose every intermediate state can be inspected
//!
//! ## Architecture
//!
//! - [`netlist`] - Parser for the netlist format
//! - [`circuit`] - Circuit graph, branch decomposition and supernodes
//! - [`components`] - Two-terminal component model
//! - [`cursor`] - Graph traversal
//! - [`analysis`] - KVL and KCL
//! - [`expr`] - Equation text, substitution and linearisation
//! - [`solver`] - Solver pipeline and linear backend
//! - [`explain`] - Human-readable account of a solution
//! - [`schematic`] - Placement order for drawing the circuit
//!
//! ## Usage
//!
//! ### Native CLI
//!
//! ```bash
//! autoschaum divider.crt
//! RUST_LOG=debug autoschaum --reference 2 divider.crt
//! ```
//!
//! ### Library
//!
//! ```
//! use autoschaum_core::{solve_netlist, SolverConfig};
//! use autoschaum_core::circuit::NodeId;
//!
//! let solution = solve_netlist("loop\nV1 0 1 5\nR1 1 0 10\n", SolverConfig::new()).unwrap();
//! assert_eq!(solution.voltage(NodeId(1)).map(|v| v.re), Some(5.0));
//! ```
//!
//! ## Method
//!
//! 1. Split the circuit into branches between nodes of degree three or more
//! 2. Merge branches made only of voltage sources into supernodes
//! 3. Fix every voltage reachable from the reference across sources (KVL)
//! 4. Write one current balance per remaining node or supernode (KCL)
//! 5. Substitute known values and solve the linear system
//! 6. Recover the remaining voltages and currents by back substitution

pub mod analysis;
pub mod circuit;
pub mod components;
pub mod cursor;
pub mod error;
pub mod explain;
pub mod expr;
pub mod netlist;
pub mod schematic;
pub mod solver;

// Re-export main types for convenience
pub use circuit::Circuit;
pub use error::{NodalError, Result};
pub use solver::{Solution, Solver, SolverConfig};

// WASM bindings
#[cfg(feature = "wasm")]
mod wasm;

#[cfg(feature = "wasm")]
pub use wasm::WasmNodalSolver;

/// Parse, set up and solve a netlist in one call.
pub fn solve_netlist(text: &str, config: SolverConfig) -> Result<Solution> {
    let netlist = netlist::parse(text)?;
    let circuit = Circuit::from_netlist(&netlist)?;
    Solver::new(circuit, config).solve()
}
