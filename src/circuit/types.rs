//! Core types for circuit representation.

use std::fmt;

/// A unique identifier for a node in the circuit.
/// The id is the node index from the netlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A unique identifier for a component in the circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(pub usize);

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C{}", self.0)
    }
}

/// Index of a branch in [`Circuit::branches`](super::Circuit::branches).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BranchId(pub usize);

impl fmt::Display for BranchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "B{}", self.0)
    }
}

/// Index of a supernode in [`Circuit::supernodes`](super::Circuit::supernodes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SupernodeId(pub usize);

impl fmt::Display for SupernodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{}", self.0)
    }
}

/// Which end of a branch a node sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchEnd {
    /// `nodes[0]`, where the reference current enters the branch
    Start,
    /// The last node of the branch
    End,
}

/// Orientation of a voltage source relative to a walk across it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sign {
    /// Walked from the negative to the positive terminal: potential rises
    Rise,
    /// Walked from the positive to the negative terminal: potential drops
    Drop,
}

impl Sign {
    /// The opposite orientation.
    pub fn flip(self) -> Self {
        match self {
            Sign::Rise => Sign::Drop,
            Sign::Drop => Sign::Rise,
        }
    }

    /// `+1.0` for a rise, `-1.0` for a drop.
    pub fn factor(self) -> f64 {
        match self {
            Sign::Rise => 1.0,
            Sign::Drop => -1.0,
        }
    }
}
