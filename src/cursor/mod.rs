//! Graph traversal.
//!
//! A [`Cursor`] sits on a node and moves across components, remembering the
//! nodes and components it has seen and a breadcrumb trail for backtracking.
//! What it may cross and what happens on a crossing is decided by its
//! [`CrossStrategy`]:
//!
//! - [`PlainWalk`]: free walk (KVL propagation, schematic drawing)
//! - [`BranchBound`]: stays on one branch (KCL synthesis)
//! - [`BranchBuilder`]: records a candidate branch (branch decomposition)
//!
//! The cursor never holds a borrow of the circuit; every move takes the
//! circuit it walks.

mod strategy;

pub use strategy::{BranchBound, BranchBuilder, CrossStrategy, PlainWalk};

use crate::circuit::{Circuit, ComponentId, NodeId};
use crate::error::{NodalError, Result};

/// A position in a circuit graph plus its traversal history.
#[derive(Debug, Clone)]
pub struct Cursor<S: CrossStrategy = PlainWalk> {
    location: NodeId,
    nodes_seen: Vec<NodeId>,
    components_seen: Vec<ComponentId>,
    breadcrumbs: Vec<NodeId>,
    strategy: S,
}

impl Cursor<PlainWalk> {
    /// Create an unrestricted cursor at `start`.
    pub fn plain(start: NodeId) -> Self {
        Self::new(start, PlainWalk)
    }
}

impl<S: CrossStrategy> Cursor<S> {
    pub fn new(start: NodeId, strategy: S) -> Self {
        Self {
            location: start,
            nodes_seen: vec![start],
            components_seen: Vec::new(),
            breadcrumbs: Vec::new(),
            strategy,
        }
    }

    pub fn location(&self) -> NodeId {
        self.location
    }

    /// Nodes visited so far, in visiting order (repeats included).
    pub fn nodes_seen(&self) -> &[NodeId] {
        &self.nodes_seen
    }

    /// Components crossed so far, in crossing order.
    pub fn components_seen(&self) -> &[ComponentId] {
        &self.components_seen
    }

    pub fn has_seen(&self, component: ComponentId) -> bool {
        self.components_seen.contains(&component)
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    /// Swap in a new strategy, returning the old one.
    pub fn replace_strategy(&mut self, strategy: S) -> S {
        std::mem::replace(&mut self.strategy, strategy)
    }

    pub fn into_strategy(self) -> S {
        self.strategy
    }

    /// Jump to `node` without crossing anything.
    pub fn relocate(&mut self, node: NodeId) {
        self.location = node;
    }

    /// Whether the cursor sits on a branch boundary.
    pub fn at_branch_end(&self, circuit: &Circuit) -> bool {
        circuit.node(self.location).is_non_trivial()
    }

    /// Followable components incident on the current location.
    fn incident<'a>(&'a self, circuit: &'a Circuit) -> impl Iterator<Item = ComponentId> + 'a {
        circuit
            .node(self.location)
            .components
            .iter()
            .copied()
            .filter(move |&id| self.strategy.follows(circuit, id))
    }

    /// Followable components joining the current location to `node`.
    fn connecting(&self, circuit: &Circuit, node: NodeId) -> Vec<ComponentId> {
        self.incident(circuit)
            .filter(|&id| circuit.component(id).connects(self.location, node))
            .collect()
    }

    fn far_ends(&self, circuit: &Circuit, components: impl Iterator<Item = ComponentId>) -> Vec<NodeId> {
        let mut out = Vec::new();
        for id in components {
            let far = circuit.component(id).other_node(self.location);
            if !out.contains(&far) {
                out.push(far);
            }
        }
        out
    }

    /// Adjacent nodes, in incident-component order.
    pub fn directions(&self, circuit: &Circuit) -> Vec<NodeId> {
        self.far_ends(circuit, self.incident(circuit))
    }

    /// Adjacent nodes reachable across a component not yet crossed.
    pub fn new_directions(&self, circuit: &Circuit) -> Vec<NodeId> {
        let unseen: Vec<_> = self.new_alongs(circuit);
        self.far_ends(circuit, unseen.into_iter())
    }

    /// Incident components not yet crossed.
    pub fn new_alongs(&self, circuit: &Circuit) -> Vec<ComponentId> {
        self.incident(circuit).filter(|id| !self.has_seen(*id)).collect()
    }

    /// Voltage sources incident on the current location.
    pub fn vsources_connected(&self, circuit: &Circuit) -> Vec<ComponentId> {
        self.incident(circuit)
            .filter(|&id| circuit.component(id).is_voltage_source())
            .collect()
    }

    /// Voltage sources incident on the current location and not yet crossed.
    pub fn unseen_vsources_connected(&self, circuit: &Circuit) -> Vec<ComponentId> {
        self.vsources_connected(circuit)
            .into_iter()
            .filter(|id| !self.has_seen(*id))
            .collect()
    }

    fn arrive(&mut self, circuit: &Circuit, to: NodeId, crossed: &[ComponentId]) {
        for &id in crossed {
            if !self.has_seen(id) {
                self.components_seen.push(id);
            }
        }
        let from = self.location;
        self.location = to;
        self.nodes_seen.push(to);
        self.strategy.on_cross(circuit, from, to, crossed);
    }

    /// Move to an adjacent node, marking every connecting component as seen.
    ///
    /// Returns the connecting components. Fails with
    /// [`NodalError::NotAdjacent`] and leaves the cursor untouched when no
    /// followable component joins the two nodes.
    pub fn step_to(&mut self, circuit: &Circuit, node: NodeId) -> Result<Vec<ComponentId>> {
        let crossed = self.connecting(circuit, node);
        if crossed.is_empty() {
            return Err(NodalError::NotAdjacent {
                from: self.location.0,
                to: node.0,
            });
        }
        self.arrive(circuit, node, &crossed);
        Ok(crossed)
    }

    /// Move to an adjacent node across exactly one unseen connecting component.
    pub fn step_along(&mut self, circuit: &Circuit, node: NodeId) -> Result<ComponentId> {
        let connecting = self.connecting(circuit, node);
        if connecting.is_empty() {
            return Err(NodalError::NotAdjacent {
                from: self.location.0,
                to: node.0,
            });
        }
        let id = connecting
            .into_iter()
            .find(|id| !self.has_seen(*id))
            .ok_or(NodalError::DeadEnd { node: self.location.0 })?;
        self.arrive(circuit, node, &[id]);
        Ok(id)
    }

    /// Cross one specific component incident on the current location.
    pub fn cross(&mut self, circuit: &Circuit, component: ComponentId) -> Result<NodeId> {
        let comp = circuit.component(component);
        if !comp.touches(self.location) || !self.strategy.follows(circuit, component) {
            return Err(NodalError::NotAdjacent {
                from: self.location.0,
                to: comp.pos().0,
            });
        }
        let to = comp.other_node(self.location);
        self.arrive(circuit, to, &[component]);
        Ok(to)
    }

    /// Cross the first unseen voltage source, leaving a breadcrumb behind.
    pub fn step_down_unseen_vsource(&mut self, circuit: &Circuit) -> Result<ComponentId> {
        let id = self
            .unseen_vsources_connected(circuit)
            .into_iter()
            .next()
            .ok_or(NodalError::NoUnseenSource { node: self.location.0 })?;
        self.breadcrumbs.push(self.location);
        self.cross(circuit, id)?;
        Ok(id)
    }

    /// Return to the last breadcrumb with [`step_to`](Self::step_to).
    ///
    /// `Ok(None)` when the trail is empty.
    pub fn step_back(&mut self, circuit: &Circuit) -> Result<Option<Vec<ComponentId>>> {
        match self.breadcrumbs.pop() {
            Some(node) => self.step_to(circuit, node).map(Some),
            None => Ok(None),
        }
    }
}

impl Cursor<BranchBound> {
    /// Cross the next unseen component of the bound branch at the current
    /// location, in branch order.
    pub fn step_down_branch(&mut self, circuit: &Circuit) -> Option<ComponentId> {
        let branch = circuit.branch(self.strategy.branch);
        let next = branch
            .components
            .iter()
            .copied()
            .find(|&id| !self.has_seen(id) && circuit.component(id).touches(self.location))?;
        self.cross(circuit, next).ok()?;
        Some(next)
    }
}
