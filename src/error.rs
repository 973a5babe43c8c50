//! Error types for the AutoSchaum nodal solver.
//!
//! This module provides a unified error type [`NodalError`] that covers
//! all error conditions that can occur during netlist parsing, circuit
//! construction, graph traversal, equation synthesis and solving.

use thiserror::Error;

/// Result type alias using [`NodalError`].
pub type Result<T> = std::result::Result<T, NodalError>;

/// Unified error type for all AutoSchaum operations.
#[derive(Error, Debug)]
pub enum NodalError {
    // ============ Netlist Parsing Errors ============
    /// Malformed netlist line
    #[error("Parse error at line {line}: {message}")]
    ParseError { line: usize, message: String },

    /// Reference designator with no known kind prefix
    #[error("Unknown component type '{refdes}' at line {line}")]
    UnknownComponentType { refdes: String, line: usize },

    /// Invalid component definition
    #[error("Invalid component '{name}' at line {line}: {message}")]
    InvalidComponent {
        name: String,
        line: usize,
        message: String,
    },

    // ============ Circuit Construction Errors ============
    /// Component kind that the nodal engine cannot represent yet
    #[error("Component '{refdes}' is a {kind}, which is not supported")]
    UnsupportedComponentKind { refdes: String, kind: String },

    /// Node not found in circuit
    #[error("Node {node} not found in circuit")]
    NodeNotFound { node: usize },

    /// Node with no path to the rest of the circuit
    #[error("Floating node {node} detected - not connected to the rest of the circuit")]
    FloatingNode { node: usize },

    /// Invalid circuit topology
    #[error("Invalid circuit topology: {message}")]
    InvalidTopology { message: String },

    // ============ Traversal Errors ============
    /// Cursor asked to move to a node that shares no component with its location
    #[error("Node {to} is not adjacent to node {from}")]
    NotAdjacent { from: usize, to: usize },

    /// Cursor has nowhere new to go
    #[error("Cursor at node {node} has no unvisited component to follow")]
    DeadEnd { node: usize },

    /// KVL cursor asked to cross a voltage source where none is left
    #[error("No unseen voltage source is connected to node {node}")]
    NoUnseenSource { node: usize },

    /// A component was claimed by a second branch
    #[error("Component '{component}' already belongs to a branch")]
    BranchAlreadyAssigned { component: String },

    // ============ Analysis Errors ============
    /// Two different voltages were derived for the same node
    #[error("Node {node} already holds {existing} V, refusing to overwrite with {proposed} V")]
    VoltageConflict {
        node: usize,
        existing: String,
        proposed: String,
    },

    /// Numeric KCL shortcut called where it does not apply
    #[error("KCL is not solvable numerically at node {node}: {unknown} branch currents are unknown")]
    KclNotSolvableNumerically { node: usize, unknown: usize },

    /// Malformed algebraic expression
    #[error("Expression error at column {column}: {message}")]
    ExpressionError { column: usize, message: String },

    /// Equation that cannot be written as a linear combination of unknowns
    #[error("Equation is not linear in the node voltages: {equation}")]
    NonLinearEquation { equation: String },

    /// Reference node outside the reduced node set
    #[error("Node {node} cannot be the reference node")]
    InvalidReference { node: usize },

    /// Solver stage run before its prerequisites
    #[error("Stage '{stage}' cannot run yet: {message}")]
    StageOrder { stage: String, message: String },

    // ============ Solve Errors ============
    /// Inconsistent equation system
    #[error("The node-voltage equations have no solution")]
    NoSolution,

    /// Not enough independent equations
    #[error("The node-voltage equations are under-determined (free unknowns: {unknowns})")]
    UnderDetermined { unknowns: String },

    /// Topology that makes the nodal system meaningless
    #[error("Degenerate topology: {message}")]
    DegenerateTopology { message: String },

    // ============ I/O Errors ============
    /// Error reading netlist file
    #[error("Failed to read netlist file '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Error writing an explanation or schematic trace
    #[error("Output error: {source}")]
    OutputError {
        #[from]
        source: std::io::Error,
    },

    // ============ WASM Errors ============
    /// WASM-specific error
    #[cfg(feature = "wasm")]
    #[error("WASM error: {message}")]
    WasmError { message: String },
}

impl NodalError {
    /// Create a parse error
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::ParseError {
            line,
            message: message.into(),
        }
    }

    /// Create an invalid component error
    pub fn invalid_component(name: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Self::InvalidComponent {
            name: name.into(),
            line,
            message: message.into(),
        }
    }

    /// Create an invalid topology error
    pub fn topology(message: impl Into<String>) -> Self {
        Self::InvalidTopology {
            message: message.into(),
        }
    }

    /// Create a degenerate topology error
    pub fn degenerate(message: impl Into<String>) -> Self {
        Self::DegenerateTopology {
            message: message.into(),
        }
    }

    /// Create a stage ordering error
    pub fn stage_order(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StageOrder {
            stage: stage.into(),
            message: message.into(),
        }
    }
}
