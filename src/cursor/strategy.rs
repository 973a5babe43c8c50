//! Crossing behaviours plugged into a [`Cursor`](super::Cursor).

use crate::circuit::{Branch, BranchId, Circuit, ComponentId, NodeId};

/// What a cursor may follow and what happens when it crosses components.
pub trait CrossStrategy {
    /// Whether the cursor may cross `component` at all.
    fn follows(&self, _circuit: &Circuit, _component: ComponentId) -> bool {
        true
    }

    /// Called after the cursor moved from `from` to `to` across `crossed`.
    fn on_cross(&mut self, _circuit: &Circuit, _from: NodeId, _to: NodeId, _crossed: &[ComponentId]) {}
}

/// Unrestricted walk with no side effects.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainWalk;

impl CrossStrategy for PlainWalk {}

/// Walk confined to the components of a single branch.
#[derive(Debug, Clone, Copy)]
pub struct BranchBound {
    pub branch: BranchId,
}

impl BranchBound {
    pub fn new(branch: BranchId) -> Self {
        Self { branch }
    }
}

impl CrossStrategy for BranchBound {
    fn follows(&self, circuit: &Circuit, component: ComponentId) -> bool {
        circuit.component(component).branch() == Some(self.branch)
    }
}

/// Walk that records a candidate branch as it goes.
///
/// Every crossed component that is not yet owned by a branch is appended
/// together with the node it was entered from; the destination node is
/// appended on every crossing. Components already owned by a registered
/// branch are crossed but not recorded.
#[derive(Debug, Clone, Default)]
pub struct BranchBuilder {
    pub nodes: Vec<NodeId>,
    pub components: Vec<ComponentId>,
    /// For each recorded component, the terminal the walk entered by
    pub entries: Vec<NodeId>,
}

impl BranchBuilder {
    /// Start a candidate anchored at `start`.
    pub fn new(start: NodeId) -> Self {
        Self {
            nodes: vec![start],
            components: Vec::new(),
            entries: Vec::new(),
        }
    }

    /// Whether the candidate recorded no component.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Turn the candidate into an unregistered branch.
    pub fn into_branch(self, id: BranchId) -> (Branch, Vec<NodeId>) {
        (Branch::new(id, self.nodes, self.components), self.entries)
    }
}

impl CrossStrategy for BranchBuilder {
    fn on_cross(&mut self, circuit: &Circuit, from: NodeId, to: NodeId, crossed: &[ComponentId]) {
        for &id in crossed {
            if !circuit.component(id).has_branch() {
                self.components.push(id);
                self.entries.push(from);
            }
        }
        self.nodes.push(to);
    }
}
