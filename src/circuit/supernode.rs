//! Supernodes: groups of nodes tied together by voltage sources only.

use log::debug;
use num_complex::Complex64;

use super::types::{BranchId, NodeId, SupernodeId};
use super::Circuit;

/// Nodes joined by source-only branches, collapsed into one KCL unknown.
#[derive(Debug, Clone)]
pub struct Supernode {
    pub id: SupernodeId,
    pub branches: Vec<BranchId>,
    /// Member nodes, master first
    pub nodes: Vec<NodeId>,
    pub master: NodeId,
}

impl Supernode {
    fn new(id: SupernodeId, branch: BranchId, branch_nodes: &[NodeId]) -> Self {
        let mut supernode = Self {
            id,
            branches: Vec::new(),
            nodes: Vec::new(),
            master: branch_nodes[0],
        };
        supernode.absorb(branch, branch_nodes);
        supernode
    }

    fn absorb(&mut self, branch: BranchId, branch_nodes: &[NodeId]) {
        if !self.branches.contains(&branch) {
            self.branches.push(branch);
        }
        for node in branch_nodes {
            if !self.nodes.contains(node) {
                self.nodes.push(*node);
            }
        }
    }

    /// Fold `other` into this supernode, keeping this master.
    fn merge(&mut self, other: Supernode) {
        for branch in other.branches {
            if !self.branches.contains(&branch) {
                self.branches.push(branch);
            }
        }
        for node in other.nodes {
            if !self.nodes.contains(&node) {
                self.nodes.push(node);
            }
        }
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains(&node)
    }

    /// Members other than the master.
    pub fn members(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().copied().filter(move |n| *n != self.master)
    }

    /// The supernode voltage: its master's voltage.
    pub fn voltage(&self, circuit: &Circuit) -> Option<Complex64> {
        circuit.node(self.master).voltage()
    }
}

impl Circuit {
    /// Group source-only branches that share endpoints into supernodes.
    pub fn create_supernodes(&mut self) {
        let sources: Vec<BranchId> = self
            .branches
            .iter()
            .filter(|b| b.is_source_only(&self.components))
            .map(|b| b.id)
            .collect();

        // Working slots; a merged-away supernode leaves `None` behind.
        let mut slots: Vec<Option<Supernode>> = Vec::new();
        let mut owner: Vec<Option<usize>> = vec![None; sources.len()];

        if sources.len() > 1 {
            for i in 0..sources.len() {
                for j in (i + 1)..sources.len() {
                    let (a, b) = (&self.branches[sources[i].0], &self.branches[sources[j].0]);
                    if !a.shares_endpoint(b) {
                        continue;
                    }
                    match (owner[i], owner[j]) {
                        (None, None) => {
                            let mut supernode = Supernode::new(SupernodeId(slots.len()), a.id, &a.nodes);
                            supernode.absorb(b.id, &b.nodes);
                            owner[i] = Some(slots.len());
                            owner[j] = Some(slots.len());
                            slots.push(Some(supernode));
                        }
                        (Some(s), None) => {
                            if let Some(supernode) = slots[s].as_mut() {
                                supernode.absorb(b.id, &b.nodes);
                            }
                            owner[j] = Some(s);
                        }
                        (None, Some(s)) => {
                            if let Some(supernode) = slots[s].as_mut() {
                                supernode.absorb(a.id, &a.nodes);
                            }
                            owner[i] = Some(s);
                        }
                        (Some(s), Some(t)) if s != t => {
                            let (keep, gone) = (s.min(t), s.max(t));
                            if let Some(absorbed) = slots[gone].take() {
                                if let Some(supernode) = slots[keep].as_mut() {
                                    supernode.merge(absorbed);
                                }
                            }
                            for slot in owner.iter_mut().filter(|o| **o == Some(gone)) {
                                *slot = Some(keep);
                            }
                        }
                        _ => {}
                    }
                }
            }
        }

        for (i, &branch) in sources.iter().enumerate() {
            if owner[i].is_none() {
                let nodes = &self.branches[branch.0].nodes;
                owner[i] = Some(slots.len());
                slots.push(Some(Supernode::new(SupernodeId(slots.len()), branch, nodes)));
            }
        }

        self.supernodes = slots
            .into_iter()
            .flatten()
            .enumerate()
            .map(|(idx, mut supernode)| {
                supernode.id = SupernodeId(idx);
                supernode
            })
            .collect();

        for branch in &mut self.branches {
            branch.set_supernode(None);
        }
        for supernode in &self.supernodes {
            for branch in &supernode.branches {
                self.branches[branch.0].set_supernode(Some(supernode.id));
            }
            debug!(
                "supernode {}: master {}, members {:?}",
                supernode.id,
                supernode.master,
                supernode.nodes.iter().map(|n| n.0).collect::<Vec<_>>()
            );
        }
    }

    /// Drop every non-master supernode member from the reduced node view.
    pub fn sub_super_nodes(&mut self) {
        let hidden: Vec<NodeId> = self.supernodes.iter().flat_map(|s| s.members()).collect();
        self.reduced_nodes = self
            .nodes
            .iter()
            .map(|n| n.id)
            .filter(|id| !hidden.contains(id))
            .collect();
        self.non_trivial_reduced_nodes = self
            .non_trivial_nodes
            .iter()
            .copied()
            .filter(|id| self.reduced_nodes.contains(id))
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlist;

    fn build(text: &str) -> Circuit {
        let netlist = netlist::parse(text).unwrap();
        let mut circuit = Circuit::from_netlist(&netlist).unwrap();
        circuit.setup().unwrap();
        circuit
    }

    #[test]
    fn test_single_source_branch() {
        let circuit = build("divider\nV1 0 1 5\nR1 0 1 1\nR2 0 2 10\nR3 1 2 1\n");
        assert_eq!(circuit.supernodes().len(), 1);
        let supernode = &circuit.supernodes()[0];
        assert_eq!(supernode.master, NodeId(0));
        assert_eq!(supernode.nodes, vec![NodeId(0), NodeId(1)]);
        assert_eq!(circuit.reduced_nodes(), &[NodeId(0), NodeId(2)]);
        assert_eq!(circuit.non_trivial_reduced_nodes(), &[NodeId(0)]);
    }

    #[test]
    fn test_chained_sources_merge() {
        // V1 and V2 meet at node 1; V3 stands alone between 3 and 4.
        let circuit = build(
            "chain\nV1 0 1 1\nV2 1 2 2\nR1 0 1 1\nR2 1 2 1\nR3 2 0 1\nR4 0 3 1\nV3 3 4 1\nR5 3 4 1\nR6 4 0 1\nR7 4 3 1\n",
        );
        assert_eq!(circuit.supernodes().len(), 2);
        let first = &circuit.supernodes()[0];
        assert_eq!(first.branches.len(), 2);
        assert!(first.contains(NodeId(0)) && first.contains(NodeId(1)) && first.contains(NodeId(2)));
        assert_eq!(first.master, NodeId(0));
        let second = &circuit.supernodes()[1];
        assert_eq!(second.nodes.len(), 2);

        for supernode in circuit.supernodes() {
            for branch in &supernode.branches {
                assert_eq!(circuit.branch(*branch).supernode(), Some(supernode.id));
            }
            for member in supernode.members() {
                assert!(!circuit.reduced_nodes().contains(&member));
            }
            assert!(circuit.reduced_nodes().contains(&supernode.master));
        }
    }

    #[test]
    fn test_circuit_without_sources_has_no_supernodes() {
        let circuit = build("mesh\nR1 0 1 1\nR2 0 1 1\nR3 1 2 1\nR4 1 2 1\nR5 0 2 1\n");
        assert!(circuit.supernodes().is_empty());
        assert_eq!(circuit.reduced_nodes().len(), 3);
    }
}
