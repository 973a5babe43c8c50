//! Circuit nodes.

use num_complex::Complex64;

use super::types::{BranchId, ComponentId, NodeId};
use crate::error::{NodalError, Result};

/// A junction between component terminals.
///
/// `components` holds one entry per incident terminal, in netlist order, so
/// its length is the node degree.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    /// Incident components
    pub components: Vec<ComponentId>,
    /// Branches that start, end or pass through this node
    pub branches: Vec<BranchId>,
    voltage: Option<Complex64>,
}

impl Node {
    /// Create an empty node with undefined voltage.
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            components: Vec::new(),
            branches: Vec::new(),
            voltage: None,
        }
    }

    /// Number of incident component terminals.
    pub fn degree(&self) -> usize {
        self.components.len()
    }

    /// A node with more than two incident components: a branch boundary and
    /// a KCL evaluation point.
    pub fn is_non_trivial(&self) -> bool {
        self.degree() > 2
    }

    pub fn voltage(&self) -> Option<Complex64> {
        self.voltage
    }

    pub fn voltage_is_defined(&self) -> bool {
        self.voltage.is_some()
    }

    /// Set the node voltage.
    ///
    /// Setting an already defined voltage succeeds only when the new value
    /// agrees with the old one within `tolerance`; the stored value is never
    /// replaced.
    pub fn set_voltage(&mut self, value: Complex64, tolerance: f64) -> Result<()> {
        match self.voltage {
            None => {
                self.voltage = Some(value);
                Ok(())
            }
            Some(existing) if (existing - value).norm() <= tolerance * existing.norm().max(1.0) => Ok(()),
            Some(existing) => Err(NodalError::VoltageConflict {
                node: self.id.0,
                existing: existing.to_string(),
                proposed: value.to_string(),
            }),
        }
    }

    pub(crate) fn attach_branch(&mut self, branch: BranchId) {
        if !self.branches.contains(&branch) {
            self.branches.push(branch);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_is_a_defined_voltage() {
        let mut node = Node::new(NodeId(0));
        assert!(!node.voltage_is_defined());
        node.set_voltage(Complex64::new(0.0, 0.0), 1e-9).unwrap();
        assert!(node.voltage_is_defined());
        assert_eq!(node.voltage(), Some(Complex64::new(0.0, 0.0)));
    }

    #[test]
    fn test_voltage_is_never_overwritten() {
        let mut node = Node::new(NodeId(3));
        node.set_voltage(Complex64::new(5.0, 0.0), 1e-9).unwrap();
        node.set_voltage(Complex64::new(5.0 + 1e-12, 0.0), 1e-9).unwrap();
        let err = node.set_voltage(Complex64::new(4.0, 0.0), 1e-9).unwrap_err();
        assert!(matches!(err, NodalError::VoltageConflict { node: 3, .. }));
        assert_eq!(node.voltage(), Some(Complex64::new(5.0, 0.0)));
    }
}
