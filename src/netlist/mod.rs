//! Netlist reader.
//!
//! A netlist is a line-oriented circuit description. The first line names
//! the circuit; every other line declares one two-terminal component.
//!
//! ```text
//! divider
//! V1 0 1 5
//! R1 0 1 1
//! R2 0 2 10
//! R3 1 2 1
//! ```
//!
//! # Component Types
//!
//! | Prefix | Description | Value |
//! |--------|-------------|-------|
//! | R | Resistor | real ohms |
//! | C | Capacitor (not supported yet) | reactance |
//! | L | Inductor (not supported yet) | reactance |
//! | Z | General impedance | complex ohms, e.g. `3+4j` |
//! | V | Voltage source | complex volts |
//! | I | Current source (not supported yet) | amps |
//! | VCVS, CCVS, VCIS, ICIS | Controlled sources (not supported yet) | gain |
//!
//! Node indices are zero-based. Terminals are written low side first, so
//! `V1 0 1 5` holds node 1 five volts above node 0.

mod ast;
mod parser;
mod value;

pub use ast::*;
pub use parser::Parser;
pub use value::{format_complex, parse_complex, parse_value};

use crate::error::Result;

/// Parse netlist text.
pub fn parse(input: &str) -> Result<Netlist> {
    Parser::new(input).parse()
}

/// Parse a netlist file.
pub fn parse_file(path: &std::path::Path) -> Result<Netlist> {
    let content = std::fs::read_to_string(path).map_err(|e| crate::error::NodalError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    parse(&content)
}
