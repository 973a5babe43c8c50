//! Circuit graph structure.

use log::info;
use num_complex::Complex64;

use super::branch::{Branch, BranchEvent};
use super::node::Node;
use super::supernode::Supernode;
use super::types::{BranchId, ComponentId, NodeId, SupernodeId};
use super::validate::validate_circuit;
use crate::components::Component;
use crate::error::{NodalError, Result};
use crate::netlist::Netlist;

/// A circuit graph: nodes, components, branches and supernodes stored in
/// arenas and linked by id.
///
/// Cloning a circuit yields an independent snapshot.
#[derive(Debug, Clone)]
pub struct Circuit {
    /// Circuit name from the netlist
    pub name: String,

    pub(crate) nodes: Vec<Node>,
    pub(crate) components: Vec<Component>,
    pub(crate) branches: Vec<Branch>,
    pub(crate) supernodes: Vec<Supernode>,

    /// Nodes with more than two incident components
    pub(crate) non_trivial_nodes: Vec<NodeId>,
    /// All nodes except non-master supernode members
    pub(crate) reduced_nodes: Vec<NodeId>,
    /// Intersection of the two views above: the KCL candidates
    pub(crate) non_trivial_reduced_nodes: Vec<NodeId>,

    /// Outcomes of every candidate walk during branch decomposition
    pub(crate) branch_events: Vec<BranchEvent>,
}

impl Circuit {
    /// Build the nodes and components described by a netlist.
    ///
    /// Branches and supernodes are derived later by [`setup`](Self::setup).
    pub fn from_netlist(netlist: &Netlist) -> Result<Self> {
        let mut nodes: Vec<Node> = (0..netlist.node_count()).map(|i| Node::new(NodeId(i))).collect();

        let mut components = Vec::with_capacity(netlist.components.len());
        for (idx, def) in netlist.components.iter().enumerate() {
            if netlist.components[..idx].iter().any(|d| d.name == def.name) {
                return Err(NodalError::invalid_component(&def.name, def.line, "refdes declared twice"));
            }
            let component = Component::from_def(ComponentId(idx), def)?;
            for terminal in [component.neg(), component.pos()] {
                nodes[terminal.0].components.push(component.id);
            }
            components.push(component);
        }

        let mut circuit = Circuit {
            name: netlist.name.clone(),
            nodes,
            components,
            branches: Vec::new(),
            supernodes: Vec::new(),
            non_trivial_nodes: Vec::new(),
            reduced_nodes: Vec::new(),
            non_trivial_reduced_nodes: Vec::new(),
            branch_events: Vec::new(),
        };
        circuit.non_trivial_nodes = circuit.find_non_trivial_nodes();
        circuit.reduced_nodes = circuit.nodes.iter().map(|n| n.id).collect();
        Ok(circuit)
    }

    /// Parse netlist text and build the circuit graph in one go.
    pub fn from_netlist_str(text: &str) -> Result<Self> {
        let netlist = crate::netlist::parse(text)?;
        let mut circuit = Self::from_netlist(&netlist)?;
        circuit.setup()?;
        Ok(circuit)
    }

    /// Validate the graph, then derive branches, supernodes and node views.
    ///
    /// Running setup on a circuit that already has branches does nothing.
    pub fn setup(&mut self) -> Result<()> {
        if self.is_set_up() {
            return Ok(());
        }
        self.validate()?;
        self.non_trivial_nodes = self.find_non_trivial_nodes();
        self.create_branches()?;
        self.create_supernodes();
        self.sub_super_nodes();

        info!(
            "circuit '{}': {} nodes, {} components, {} branches, {} supernodes, {} KCL candidates",
            self.name,
            self.nodes.len(),
            self.components.len(),
            self.branches.len(),
            self.supernodes.len(),
            self.non_trivial_reduced_nodes.len()
        );
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        validate_circuit(self)
    }

    pub fn is_set_up(&self) -> bool {
        !self.branches.is_empty()
    }

    fn find_non_trivial_nodes(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|n| n.is_non_trivial())
            .map(|n| n.id)
            .collect()
    }

    // ============ Arena access ============

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    /// Look up a node by its netlist index.
    pub fn get_node(&self, index: usize) -> Result<&Node> {
        self.nodes.get(index).ok_or(NodalError::NodeNotFound { node: index })
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn component(&self, id: ComponentId) -> &Component {
        &self.components[id.0]
    }

    /// Find a component by reference designator.
    pub fn find_component(&self, name: &str) -> Option<ComponentId> {
        self.components.iter().find(|c| c.name == name).map(|c| c.id)
    }

    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    pub fn branch(&self, id: BranchId) -> &Branch {
        &self.branches[id.0]
    }

    pub(crate) fn branch_mut(&mut self, id: BranchId) -> &mut Branch {
        &mut self.branches[id.0]
    }

    pub fn supernodes(&self) -> &[Supernode] {
        &self.supernodes
    }

    pub fn supernode(&self, id: SupernodeId) -> &Supernode {
        &self.supernodes[id.0]
    }

    /// The supernode `node` belongs to, if any.
    pub fn supernode_of(&self, node: NodeId) -> Option<&Supernode> {
        self.supernodes.iter().find(|s| s.contains(node))
    }

    pub fn branch_events(&self) -> &[BranchEvent] {
        &self.branch_events
    }

    // ============ Node views ============

    pub fn non_trivial_nodes(&self) -> &[NodeId] {
        &self.non_trivial_nodes
    }

    pub fn reduced_nodes(&self) -> &[NodeId] {
        &self.reduced_nodes
    }

    pub fn non_trivial_reduced_nodes(&self) -> &[NodeId] {
        &self.non_trivial_reduced_nodes
    }

    // ============ Electrical state ============

    pub fn voltage(&self, node: NodeId) -> Option<Complex64> {
        self.node(node).voltage()
    }

    /// Every node voltage, indexed by node id.
    pub fn node_voltages(&self) -> Vec<Option<Complex64>> {
        self.nodes.iter().map(|n| n.voltage()).collect()
    }

    /// Whether every node voltage is known.
    pub fn is_solved(&self) -> bool {
        self.nodes.iter().all(|n| n.voltage_is_defined())
    }

    /// Voltage across a component, `V(pos) - V(neg)`.
    pub fn component_voltage(&self, id: ComponentId) -> Option<Complex64> {
        let component = self.component(id);
        Some(self.voltage(component.pos())? - self.voltage(component.neg())?)
    }

    /// Current through a component, flowing in from its `current_in` terminal.
    pub fn component_current(&self, id: ComponentId) -> Option<Complex64> {
        self.branch(self.component(id).branch()?).current()
    }

    /// Nodal admittance matrix over all nodes.
    ///
    /// `Y[i][i]` sums the admittances touching node `i`; `Y[i][j]` is minus
    /// the admittance joining `i` and `j`. Voltage sources contribute nothing.
    pub fn admittance_matrix(&self) -> Vec<Vec<Complex64>> {
        let n = self.nodes.len();
        let mut y = vec![vec![Complex64::new(0.0, 0.0); n]; n];
        for component in &self.components {
            if let Some(g) = component.admittance() {
                let (a, b) = (component.pos().0, component.neg().0);
                y[a][a] += g;
                y[b][b] += g;
                y[a][b] -= g;
                y[b][a] -= g;
            }
        }
        y
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_node_count_matches_netlist() {
        let circuit = Circuit::from_netlist_str("divider\nV1 0 1 5\nR1 0 1 1\nR2 0 2 10\nR3 1 2 1\n").unwrap();
        assert_eq!(circuit.node_count(), 3);
        assert!(circuit.nodes().iter().all(|n| !n.voltage_is_defined()));
        assert_eq!(circuit.non_trivial_nodes(), &[NodeId(0), NodeId(1)]);
        assert_eq!(circuit.node(NodeId(2)).degree(), 2);
        assert!(matches!(circuit.get_node(7), Err(NodalError::NodeNotFound { node: 7 })));
    }

    #[test]
    fn test_unsupported_component_fails_construction() {
        let err = Circuit::from_netlist_str("rc\nV1 0 1 5\nR1 1 2 1k\nC1 2 0 1u\n").unwrap_err();
        assert!(matches!(err, NodalError::UnsupportedComponentKind { ref refdes, .. } if refdes == "C1"));
    }

    #[test]
    fn test_repeated_refdes_fails_construction() {
        let mut netlist = crate::netlist::parse("dup\nV1 0 1 10\nR1 1 2 1\nR2 2 0 9\n").unwrap();
        netlist.components[2].name = "R1".to_string();
        let err = Circuit::from_netlist(&netlist).unwrap_err();
        assert!(matches!(err, NodalError::InvalidComponent { ref name, line: 4, .. } if name == "R1"));
    }

    #[test]
    fn test_admittance_matrix() {
        let circuit = Circuit::from_netlist_str("divider\nV1 0 1 5\nR1 0 1 1\nR2 0 2 10\nR3 1 2 1\n").unwrap();
        let y = circuit.admittance_matrix();
        assert_abs_diff_eq!(y[0][0].re, 1.1, epsilon = 1e-12);
        assert_abs_diff_eq!(y[1][1].re, 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(y[2][2].re, 1.1, epsilon = 1e-12);
        assert_abs_diff_eq!(y[1][2].re, -1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(y[0][2].re, -0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_clone_is_independent_snapshot() {
        let mut original = Circuit::from_netlist_str("loop\nV1 0 1 5\nR1 1 0 10\n").unwrap();
        let snapshot = original.clone();
        original.node_mut(NodeId(0)).set_voltage(Complex64::new(0.0, 0.0), 1e-9).unwrap();
        assert!(original.voltage(NodeId(0)).is_some());
        assert!(snapshot.voltage(NodeId(0)).is_none());
    }
}
