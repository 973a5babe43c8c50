//! Circuit graph representation and validation.
//!
//! This module provides the arena representation of a circuit after
//! parsing. The [`Circuit`] struct owns every [`Node`], [`Component`],
//! [`Branch`] and [`Supernode`]; relations between them are stored as id
//! lists.
//!
//! [`Component`]: crate::components::Component

mod branch;
mod graph;
mod node;
mod supernode;
mod types;
mod validate;

pub use branch::{Branch, BranchEvent, DiscardReason};
pub use graph::Circuit;
pub use node::Node;
pub use supernode::Supernode;
pub use types::*;
pub use validate::validate_circuit;
