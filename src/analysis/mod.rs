//! Kirchhoff analysis on a set-up circuit.
//!
//! - [`kvl`]: voltages fixed by voltage sources, traced from a seed node
//! - [`kcl`]: branch currents and node current-balance equations

pub mod kcl;
pub mod kvl;

pub use kcl::{
    current_expr, gen_node_voltage_eq, identify_currents, node_voltage_kcl, numeric_kcl, unknown_nodes,
    CurrentExpr, KclTerm,
};
pub use kvl::{identify_voltages, propagate_from, trace_source_paths, SourcePath, SourceTrace};
