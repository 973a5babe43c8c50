//! Current balance at nodes: Ohm's law shortcut, numeric KCL and symbolic
//! KCL synthesis.

use log::debug;
use num_complex::Complex64;

use super::kvl::supernode_constraints;
use crate::circuit::{BranchEnd, BranchId, Circuit, ComponentId, NodeId, Sign, SupernodeId};
use crate::cursor::{BranchBound, Cursor};
use crate::error::{NodalError, Result};
use crate::netlist::format_complex;

/// Current through a branch written in terms of node voltages and
/// component values:
///
/// ```text
/// (V(from) ± sources - V(to)) / (Z1 + Z2 + ...)
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentExpr {
    pub from: NodeId,
    /// Sources in walk order; a rise adds to the driving voltage
    pub sources: Vec<(ComponentId, Sign)>,
    pub impedances: Vec<ComponentId>,
    pub to: NodeId,
}

impl CurrentExpr {
    /// The same current seen from the other end.
    pub fn reversed(&self) -> Self {
        Self {
            from: self.to,
            sources: self.sources.iter().rev().map(|(id, s)| (*id, s.flip())).collect(),
            impedances: self.impedances.iter().rev().copied().collect(),
            to: self.from,
        }
    }

    /// Numeric value, once both end voltages are known.
    pub fn evaluate(&self, circuit: &Circuit) -> Option<Complex64> {
        let driving = circuit.voltage(self.from)?
            + self
                .sources
                .iter()
                .map(|(id, s)| circuit.component(*id).value * s.factor())
                .sum::<Complex64>()
            - circuit.voltage(self.to)?;
        let total: Complex64 = self.impedances.iter().map(|id| circuit.component(*id).value).sum();
        if self.impedances.is_empty() {
            return None;
        }
        Some(driving / total)
    }

    /// Render as text, e.g. `(V(1)+V1-V(2))/(R2+R3)`.
    pub fn render(&self, circuit: &Circuit) -> String {
        let mut numerator = format!("V({})", self.from);
        for (id, sign) in &self.sources {
            numerator.push(match sign {
                Sign::Rise => '+',
                Sign::Drop => '-',
            });
            numerator.push_str(&circuit.component(*id).name);
        }
        numerator.push_str(&format!("-V({})", self.to));
        let denominator = self
            .impedances
            .iter()
            .map(|id| circuit.component(*id).name.as_str())
            .collect::<Vec<_>>()
            .join("+");
        format!("({})/({})", numerator, denominator)
    }
}

/// One branch's contribution to a node's current balance.
#[derive(Debug, Clone, PartialEq)]
pub enum KclTerm {
    /// Current leaving the node, already resolved
    Known(Complex64),
    /// Current leaving the node, in symbolic form
    Symbolic(CurrentExpr),
}

impl KclTerm {
    pub fn render(&self, circuit: &Circuit) -> String {
        match self {
            KclTerm::Known(value) => format_complex(*value),
            KclTerm::Symbolic(expr) => expr.render(circuit),
        }
    }
}

/// Walk a branch from its start and write its reference current.
fn build_current_expr(circuit: &Circuit, branch: BranchId) -> Result<CurrentExpr> {
    let from = circuit.branch(branch).start();
    let mut cursor = Cursor::new(from, BranchBound::new(branch));
    let mut sources = Vec::new();
    let mut impedances = Vec::new();

    while let Some(id) = cursor.step_down_branch(circuit) {
        let component = circuit.component(id);
        if component.is_voltage_source() {
            let sign = if cursor.location() == component.pos() {
                Sign::Rise
            } else {
                Sign::Drop
            };
            sources.push((id, sign));
        } else {
            impedances.push(id);
        }
    }

    if impedances.is_empty() {
        return Err(NodalError::degenerate(format!(
            "branch {} holds only voltage sources, so its current cannot be written from node voltages",
            branch
        )));
    }

    Ok(CurrentExpr {
        from,
        sources,
        impedances,
        to: cursor.location(),
    })
}

/// The symbolic reference current of a branch, cached on the branch.
pub fn current_expr(circuit: &mut Circuit, branch: BranchId) -> Result<CurrentExpr> {
    if let Some(expr) = circuit.branch(branch).current_expr() {
        return Ok(expr.clone());
    }
    let expr = build_current_expr(circuit, branch)?;
    circuit.branch_mut(branch).set_current_expr(expr.clone());
    Ok(expr)
}

/// Ohm's law shortcut: resolve the branch current of every impedance whose
/// two terminals already have voltages.
///
/// Returns the branches resolved by this call.
pub fn identify_currents(circuit: &mut Circuit) -> Vec<BranchId> {
    let mut resolved = Vec::new();
    for idx in 0..circuit.components().len() {
        let component = &circuit.components()[idx];
        let (branch, entry, z) = match (component.branch(), component.current_in(), component.impedance()) {
            (Some(b), Some(e), Some(z)) => (b, e, z),
            _ => continue,
        };
        if circuit.branch(branch).current().is_some() {
            continue;
        }
        let exit = component.other_node(entry);
        if let (Some(v_in), Some(v_out)) = (circuit.voltage(entry), circuit.voltage(exit)) {
            let current = (v_in - v_out) / z;
            debug!("Ohm: I({}) = {} through {}", branch, current, component.name);
            circuit.branch_mut(branch).set_current(current);
            resolved.push(branch);
        }
    }
    resolved
}

/// Every (branch, end) pair meeting at `node`.
fn incidences(circuit: &Circuit, node: NodeId) -> Vec<(BranchId, BranchEnd)> {
    circuit
        .node(node)
        .branches
        .iter()
        .flat_map(|&b| circuit.branch(b).ends_at(node).into_iter().map(move |end| (b, end)))
        .collect()
}

/// Numeric KCL: when exactly one branch current at `node` is unknown, set it
/// so the currents leaving the node sum to zero.
///
/// Fails with [`NodalError::KclNotSolvableNumerically`] otherwise.
pub fn numeric_kcl(circuit: &mut Circuit, node: NodeId) -> Result<BranchId> {
    let incident = incidences(circuit, node);
    let unknown: Vec<_> = incident
        .iter()
        .filter(|(b, _)| circuit.branch(*b).current().is_none())
        .copied()
        .collect();
    if unknown.len() != 1 {
        return Err(NodalError::KclNotSolvableNumerically {
            node: node.0,
            unknown: unknown.len(),
        });
    }

    let known: Complex64 = incident
        .iter()
        .filter_map(|(b, end)| circuit.branch(*b).current_leaving(*end))
        .sum();
    let (branch, end) = unknown[0];
    let current = match end {
        BranchEnd::Start => -known,
        BranchEnd::End => known,
    };
    debug!("KCL at node {}: I({}) = {}", node, branch, current);
    circuit.branch_mut(branch).set_current(current);
    Ok(branch)
}

/// Currents leaving `node`, skipping the branches of `skip`.
pub fn node_kcl_terms(circuit: &mut Circuit, node: NodeId, skip: Option<SupernodeId>) -> Result<Vec<KclTerm>> {
    let mut terms = Vec::new();
    for (branch, end) in incidences(circuit, node) {
        if skip.is_some() && circuit.branch(branch).supernode() == skip {
            continue;
        }
        if let Some(current) = circuit.branch(branch).current_leaving(end) {
            terms.push(KclTerm::Known(current));
            continue;
        }
        let expr = current_expr(circuit, branch)?;
        terms.push(KclTerm::Symbolic(match end {
            BranchEnd::Start => expr,
            BranchEnd::End => expr.reversed(),
        }));
    }
    Ok(terms)
}

/// The KCL equation of one unknown node, as the text of its left-hand side
/// (`... = 0`).
///
/// A supernode master balances the currents leaving the whole supernode.
/// Returns `None` when no branch current leaves the node.
pub fn gen_node_voltage_eq(circuit: &mut Circuit, node: NodeId) -> Result<Option<String>> {
    let (covered, skip) = match circuit.supernode_of(node) {
        Some(s) if s.master == node => {
            let covered: Vec<NodeId> = s
                .nodes
                .iter()
                .copied()
                .filter(|n| circuit.node(*n).is_non_trivial())
                .collect();
            (covered, Some(s.id))
        }
        _ => (vec![node], None),
    };

    let mut terms = Vec::new();
    for n in covered {
        terms.extend(node_kcl_terms(circuit, n, skip)?);
    }
    if terms.is_empty() {
        return Ok(None);
    }
    Ok(Some(
        terms
            .iter()
            .map(|t| t.render(circuit))
            .collect::<Vec<_>>()
            .join("+"),
    ))
}

/// Nodes that need a KCL equation: non-trivial reduced nodes other than
/// the reference whose voltage is still unknown.
pub fn unknown_nodes(circuit: &Circuit, reference: NodeId) -> Vec<NodeId> {
    circuit
        .non_trivial_reduced_nodes()
        .iter()
        .copied()
        .filter(|&n| n != reference && !circuit.node(n).voltage_is_defined())
        .collect()
}

/// KCL equations for every unknown node, followed by the KVL constraints of
/// supernodes that float free of the reference.
pub fn node_voltage_kcl(circuit: &mut Circuit, reference: NodeId) -> Result<Vec<String>> {
    let unknown = unknown_nodes(circuit, reference);
    let mut equations = Vec::new();
    for &node in &unknown {
        if let Some(eq) = gen_node_voltage_eq(circuit, node)? {
            debug!("KCL at node {}: {} = 0", node, eq);
            equations.push(eq);
        }
    }

    let floating: Vec<_> = circuit
        .supernodes()
        .iter()
        .filter(|s| unknown.contains(&s.master))
        .cloned()
        .collect();
    for supernode in &floating {
        equations.extend(supernode_constraints(circuit, supernode)?);
    }
    Ok(equations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::identify_voltages;
    use approx::assert_abs_diff_eq;

    fn prepared(text: &str) -> Circuit {
        let mut circuit = Circuit::from_netlist_str(text).unwrap();
        identify_voltages(&mut circuit, NodeId(0), 1e-9).unwrap();
        circuit
    }

    #[test]
    fn test_ohm_shortcut_on_series_loop() {
        let mut circuit = prepared("loop\nV1 0 1 5\nR1 1 0 10\n");
        let resolved = identify_currents(&mut circuit);
        assert_eq!(resolved, vec![BranchId(0)]);
        assert_abs_diff_eq!(circuit.branches()[0].current().unwrap().re, 0.5, epsilon = 1e-12);
        let r1 = circuit.find_component("R1").unwrap();
        assert_abs_diff_eq!(circuit.component_current(r1).unwrap().re, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_current_expr_walks_branch() {
        let mut circuit = prepared("src\nV1 0 1 10\nR1 1 2 2\nR2 2 0 4\nR3 2 0 4\n");
        let expr = current_expr(&mut circuit, BranchId(0)).unwrap();
        assert_eq!(expr.render(&circuit), "(V(0)+V1-V(2))/(R1)");
        assert_eq!(expr.reversed().render(&circuit), "(V(2)-V1-V(0))/(R1)");
        assert!(circuit.branch(BranchId(0)).current_expr().is_some());
        assert!(expr.evaluate(&circuit).is_none());
    }

    #[test]
    fn test_kcl_equation_text() {
        let mut circuit = prepared("src\nV1 0 1 10\nR1 1 2 2\nR2 2 0 4\nR3 2 0 4\n");
        let equations = node_voltage_kcl(&mut circuit, NodeId(0)).unwrap();
        assert_eq!(
            equations,
            vec!["(V(2)-V1-V(0))/(R1)+(V(2)-V(0))/(R2)+(V(2)-V(0))/(R3)".to_string()]
        );
    }

    #[test]
    fn test_floating_supernode_equations() {
        let mut circuit = prepared("float\nR1 1 0 1\nV1 1 2 3\nR2 2 0 1\nR3 2 0 1\nR4 1 0 1\n");
        let equations = node_voltage_kcl(&mut circuit, NodeId(0)).unwrap();
        assert_eq!(equations.len(), 2);
        assert_eq!(
            equations[0],
            "(V(1)-V(0))/(R1)+(V(1)-V(0))/(R4)+(V(2)-V(0))/(R2)+(V(2)-V(0))/(R3)"
        );
        assert_eq!(equations[1], "V(2)-(V(1)+V1)");
    }

    #[test]
    fn test_numeric_kcl_needs_one_unknown() {
        let mut circuit = prepared("divider\nV1 0 1 5\nR1 0 1 1\nR2 0 2 10\nR3 1 2 1\n");
        identify_currents(&mut circuit);
        // V1 and the R2-R3 branch are both unknown at node 0.
        assert!(matches!(
            numeric_kcl(&mut circuit, NodeId(0)),
            Err(NodalError::KclNotSolvableNumerically { node: 0, unknown: 2 })
        ));

        let expr = current_expr(&mut circuit, BranchId(2)).unwrap();
        let i = expr.evaluate(&circuit).unwrap();
        circuit.branch_mut(BranchId(2)).set_current(i);
        let solved = numeric_kcl(&mut circuit, NodeId(0)).unwrap();
        assert_eq!(solved, BranchId(0));

        // Leaving node 0: V1 branch + R1 branch + R2-R3 branch sum to zero.
        let total: Complex64 = (0..3)
            .map(|b| circuit.branch(BranchId(b)).current_leaving(BranchEnd::Start).unwrap())
            .sum();
        assert_abs_diff_eq!(total.norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_source_only_branch_has_no_current_expr() {
        let mut circuit = prepared("divider\nV1 0 1 5\nR1 0 1 1\nR2 0 2 10\nR3 1 2 1\n");
        assert!(matches!(
            current_expr(&mut circuit, BranchId(0)),
            Err(NodalError::DegenerateTopology { .. })
        ));
    }
}
