//! Circuit validation.

use crate::error::{NodalError, Result};

use super::types::NodeId;
use super::Circuit;

/// Validate a circuit graph before branch decomposition.
///
/// Checks:
/// - The circuit has at least one component
/// - No component has both terminals on the same node
/// - Every node has at least two incident components
/// - Every node is reachable from node 0
pub fn validate_circuit(circuit: &Circuit) -> Result<()> {
    if circuit.components().is_empty() {
        return Err(NodalError::topology("Circuit has no components"));
    }

    if let Some(shorted) = circuit.components().iter().find(|c| c.pos() == c.neg()) {
        return Err(NodalError::topology(format!(
            "component '{}' has both terminals on node {}",
            shorted.name,
            shorted.pos()
        )));
    }

    for node in circuit.nodes() {
        match node.degree() {
            0 => return Err(NodalError::FloatingNode { node: node.id.0 }),
            1 => {
                return Err(NodalError::topology(format!(
                    "node {} is a dead end: only '{}' connects to it",
                    node.id,
                    circuit.component(node.components[0]).name
                )))
            }
            _ => {}
        }
    }

    // Connectivity: flood fill from node 0.
    let mut reached = vec![false; circuit.node_count()];
    let mut stack = vec![NodeId(0)];
    reached[0] = true;
    while let Some(node) = stack.pop() {
        for &id in &circuit.node(node).components {
            let next = circuit.component(id).other_node(node);
            if !reached[next.0] {
                reached[next.0] = true;
                stack.push(next);
            }
        }
    }
    if let Some(unreached) = reached.iter().position(|r| !r) {
        return Err(NodalError::FloatingNode { node: unreached });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlist;

    fn validate(text: &str) -> Result<()> {
        let netlist = netlist::parse(text).unwrap();
        let circuit = Circuit::from_netlist(&netlist).unwrap();
        validate_circuit(&circuit)
    }

    #[test]
    fn test_valid_divider() {
        assert!(validate("divider\nV1 0 1 5\nR1 0 1 1\nR2 0 2 10\nR3 1 2 1\n").is_ok());
    }

    #[test]
    fn test_unused_node_index_is_floating() {
        assert!(matches!(
            validate("gap\nV1 0 2 5\nR1 2 0 1\n"),
            Err(NodalError::FloatingNode { node: 1 })
        ));
    }

    #[test]
    fn test_dangling_node() {
        assert!(matches!(
            validate("dangle\nV1 0 1 5\nR1 1 0 1\nR2 1 2 1\n"),
            Err(NodalError::InvalidTopology { .. })
        ));
    }

    #[test]
    fn test_shorted_component() {
        assert!(matches!(
            validate("short\nV1 0 1 5\nR1 1 0 1\nR2 1 1 1\n"),
            Err(NodalError::InvalidTopology { .. })
        ));
    }

    #[test]
    fn test_disconnected_islands() {
        assert!(matches!(
            validate("islands\nV1 0 1 5\nR1 1 0 1\nV2 2 3 1\nR2 3 2 1\n"),
            Err(NodalError::FloatingNode { node: 2 })
        ));
    }
}
