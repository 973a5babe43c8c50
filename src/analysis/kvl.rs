//! Voltage propagation across voltage sources.

use log::debug;
use num_complex::Complex64;

use crate::circuit::{Circuit, ComponentId, NodeId, Sign, Supernode};
use crate::cursor::Cursor;
use crate::error::{NodalError, Result};

/// Voltage sources crossed from a seed to some node, with orientation.
pub type SourcePath = Vec<(ComponentId, Sign)>;

/// Every node reachable from a seed through voltage sources alone.
#[derive(Debug, Clone)]
pub struct SourceTrace {
    pub seed: NodeId,
    /// Reached nodes in discovery order, seed first with an empty path
    pub paths: Vec<(NodeId, SourcePath)>,
    /// Further paths that arrived at an already reached node
    pub alternatives: Vec<(NodeId, SourcePath)>,
}

impl SourceTrace {
    pub fn path_to(&self, node: NodeId) -> Option<&SourcePath> {
        self.paths.iter().find(|(n, _)| *n == node).map(|(_, p)| p)
    }

    pub fn reaches(&self, node: NodeId) -> bool {
        self.path_to(node).is_some()
    }
}

/// Orientation of crossing `source` into `to`.
fn sign_into(circuit: &Circuit, source: ComponentId, to: NodeId) -> Sign {
    if circuit.component(source).pos() == to {
        Sign::Rise
    } else {
        Sign::Drop
    }
}

/// Signed sum of source values along a path.
pub fn path_value(circuit: &Circuit, path: &[(ComponentId, Sign)]) -> Complex64 {
    path.iter()
        .map(|(id, sign)| circuit.component(*id).value * sign.factor())
        .sum()
}

/// Render a path as signed refdes terms, e.g. `+V1-V3`.
pub fn render_path(circuit: &Circuit, path: &[(ComponentId, Sign)]) -> String {
    let mut out = String::new();
    for (id, sign) in path {
        out.push(match sign {
            Sign::Rise => '+',
            Sign::Drop => '-',
        });
        out.push_str(&circuit.component(*id).name);
    }
    out
}

/// Walk every voltage source reachable from `seed`, depth first, recording
/// the signed source path to each node.
pub fn trace_source_paths(circuit: &Circuit, seed: NodeId) -> Result<SourceTrace> {
    let mut trace = SourceTrace {
        seed,
        paths: vec![(seed, Vec::new())],
        alternatives: Vec::new(),
    };
    let mut cursor = Cursor::plain(seed);

    loop {
        let from = cursor.location();
        match cursor.step_down_unseen_vsource(circuit) {
            Ok(source) => {
                let to = cursor.location();
                let mut path = trace.path_to(from).cloned().unwrap_or_default();
                path.push((source, sign_into(circuit, source, to)));
                if trace.reaches(to) {
                    trace.alternatives.push((to, path));
                } else {
                    trace.paths.push((to, path));
                }
            }
            Err(NodalError::NoUnseenSource { .. }) => {
                if cursor.step_back(circuit)?.is_none() {
                    break;
                }
            }
            Err(e) => return Err(e),
        }
    }
    Ok(trace)
}

/// Assign voltages to every node reachable from `seed` through voltage
/// sources, starting from the seed's own voltage.
///
/// Returns the newly defined nodes. Does nothing while the seed voltage is
/// unknown. A source loop whose values do not add up is a
/// [`NodalError::DegenerateTopology`].
pub fn propagate_from(circuit: &mut Circuit, seed: NodeId, tolerance: f64) -> Result<Vec<NodeId>> {
    let base = match circuit.voltage(seed) {
        Some(v) => v,
        None => return Ok(Vec::new()),
    };
    let trace = trace_source_paths(circuit, seed)?;

    for (node, alternative) in &trace.alternatives {
        let first = trace.path_to(*node).map(|p| path_value(circuit, p)).unwrap_or_default();
        let second = path_value(circuit, alternative);
        if (first - second).norm() > tolerance * first.norm().max(second.norm()).max(1.0) {
            return Err(NodalError::degenerate(format!(
                "voltage sources between node {} and node {} disagree ({} V vs {} V)",
                seed, node, first, second
            )));
        }
    }

    let mut assigned = Vec::new();
    for (node, path) in trace.paths.iter().skip(1) {
        let value = base + path_value(circuit, path);
        let newly = !circuit.node(*node).voltage_is_defined();
        circuit.node_mut(*node).set_voltage(value, tolerance)?;
        if newly {
            debug!("KVL: V({}) = V({}){} = {}", node, seed, render_path(circuit, path), value);
            assigned.push(*node);
        }
    }
    Ok(assigned)
}

/// Fix the reference node at 0 V and propagate through voltage sources.
pub fn identify_voltages(circuit: &mut Circuit, reference: NodeId, tolerance: f64) -> Result<Vec<NodeId>> {
    circuit
        .node_mut(reference)
        .set_voltage(Complex64::new(0.0, 0.0), tolerance)?;
    propagate_from(circuit, reference, tolerance)
}

/// KVL equations tying the non-trivial members of a supernode to its master,
/// rendered as `V(m)-(V(master)+V1)`.
pub fn supernode_constraints(circuit: &Circuit, supernode: &Supernode) -> Result<Vec<String>> {
    let trace = trace_source_paths(circuit, supernode.master)?;
    let mut equations = Vec::new();
    for member in supernode.members() {
        if !circuit.node(member).is_non_trivial() {
            continue;
        }
        let path = trace.path_to(member).ok_or_else(|| {
            NodalError::topology(format!(
                "supernode member {} is not reachable from master {} through sources",
                member, supernode.master
            ))
        })?;
        equations.push(format!(
            "V({})-(V({}){})",
            member,
            supernode.master,
            render_path(circuit, path)
        ));
    }
    Ok(equations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_series_loop_voltages() {
        let mut circuit = Circuit::from_netlist_str("loop\nV1 0 1 5\nR1 1 0 10\n").unwrap();
        let assigned = identify_voltages(&mut circuit, NodeId(0), 1e-9).unwrap();
        assert_eq!(assigned, vec![NodeId(1)]);
        assert_abs_diff_eq!(circuit.voltage(NodeId(1)).unwrap().re, 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_chain_sums_signed_sources() {
        // V2 is written high side first, so crossing it from node 1 drops.
        let mut circuit =
            Circuit::from_netlist_str("chain\nV1 0 1 10\nV2 2 1 3\nR1 0 1 1\nR2 1 2 1\nR3 2 0 1\nR4 0 3 1\nR5 3 2 1\n")
                .unwrap();
        identify_voltages(&mut circuit, NodeId(0), 1e-9).unwrap();
        assert_abs_diff_eq!(circuit.voltage(NodeId(1)).unwrap().re, 10.0, epsilon = 1e-12);
        assert_abs_diff_eq!(circuit.voltage(NodeId(2)).unwrap().re, 7.0, epsilon = 1e-12);
        assert!(circuit.voltage(NodeId(3)).is_none());

        let trace = trace_source_paths(&circuit, NodeId(0)).unwrap();
        assert_eq!(render_path(&circuit, trace.path_to(NodeId(2)).unwrap()), "+V1-V2");
    }

    #[test]
    fn test_unreached_nodes_stay_undefined() {
        let mut circuit = Circuit::from_netlist_str("divider\nV1 0 1 5\nR1 0 1 1\nR2 0 2 10\nR3 1 2 1\n").unwrap();
        identify_voltages(&mut circuit, NodeId(0), 1e-9).unwrap();
        assert!(circuit.voltage(NodeId(2)).is_none());
    }

    #[test]
    fn test_inconsistent_source_loop() {
        let mut circuit = Circuit::from_netlist_str("clash\nV1 0 1 5\nV2 0 1 3\n").unwrap();
        assert!(matches!(
            identify_voltages(&mut circuit, NodeId(0), 1e-9),
            Err(NodalError::DegenerateTopology { .. })
        ));
    }

    #[test]
    fn test_consistent_source_loop() {
        let mut circuit = Circuit::from_netlist_str("agree\nV1 0 1 5\nV2 0 1 5\n").unwrap();
        identify_voltages(&mut circuit, NodeId(0), 1e-9).unwrap();
        assert_abs_diff_eq!(circuit.voltage(NodeId(1)).unwrap().re, 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_supernode_constraint_text() {
        let circuit = Circuit::from_netlist_str("float\nR1 1 0 1\nV1 1 2 3\nR2 2 0 1\nR3 2 0 1\nR4 1 0 1\n").unwrap();
        let supernode = &circuit.supernodes()[0];
        assert_eq!(supernode.master, NodeId(1));
        let equations = supernode_constraints(&circuit, supernode).unwrap();
        assert_eq!(equations, vec!["V(2)-(V(1)+V1)".to_string()]);
    }
}
