//! Branches and branch decomposition.

use log::{debug, info, warn};
use num_complex::Complex64;

use super::types::{BranchEnd, BranchId, ComponentId, NodeId, SupernodeId};
use super::Circuit;
use crate::analysis::CurrentExpr;
use crate::components::Component;
use crate::cursor::{BranchBuilder, Cursor};
use crate::error::{NodalError, Result};

/// A maximal series run of components between two branch boundaries.
///
/// `nodes` has one more entry than `components`: component `k` joins
/// `nodes[k]` and `nodes[k + 1]`. The reference current flows from
/// `nodes[0]` towards the last node.
#[derive(Debug, Clone)]
pub struct Branch {
    pub id: BranchId,
    pub nodes: Vec<NodeId>,
    pub components: Vec<ComponentId>,
    current: Option<Complex64>,
    current_expr: Option<CurrentExpr>,
    supernode: Option<SupernodeId>,
}

impl Branch {
    pub fn new(id: BranchId, nodes: Vec<NodeId>, components: Vec<ComponentId>) -> Self {
        Self {
            id,
            nodes,
            components,
            current: None,
            current_expr: None,
            supernode: None,
        }
    }

    /// First node, where the reference current enters.
    pub fn start(&self) -> NodeId {
        self.nodes[0]
    }

    /// Last node, where the reference current leaves.
    pub fn end(&self) -> NodeId {
        self.nodes[self.nodes.len() - 1]
    }

    /// The ends of this branch sitting on `node`: none for interior or
    /// unrelated nodes, both for a branch that starts and ends on `node`.
    pub fn ends_at(&self, node: NodeId) -> Vec<BranchEnd> {
        let mut ends = Vec::with_capacity(2);
        if self.start() == node {
            ends.push(BranchEnd::Start);
        }
        if self.end() == node {
            ends.push(BranchEnd::End);
        }
        ends
    }

    /// Whether the two branches share a boundary node.
    pub fn shares_endpoint(&self, other: &Branch) -> bool {
        [self.start(), self.end()]
            .iter()
            .any(|n| *n == other.start() || *n == other.end())
    }

    /// Whether `components` lists the same run, in either direction.
    pub fn same_components(&self, components: &[ComponentId]) -> bool {
        self.components == components || self.components.iter().rev().eq(components.iter())
    }

    /// Whether every component of the branch is a voltage source.
    pub fn is_source_only(&self, components: &[Component]) -> bool {
        !self.components.is_empty() && self.components.iter().all(|id| components[id.0].is_voltage_source())
    }

    /// Branch current in the reference direction, once resolved.
    pub fn current(&self) -> Option<Complex64> {
        self.current
    }

    /// Current leaving the node at `end` through this branch.
    pub fn current_leaving(&self, end: BranchEnd) -> Option<Complex64> {
        self.current.map(|i| match end {
            BranchEnd::Start => i,
            BranchEnd::End => -i,
        })
    }

    /// Record the branch current. An already resolved current is kept.
    pub(crate) fn set_current(&mut self, value: Complex64) -> bool {
        if self.current.is_some() {
            return false;
        }
        self.current = Some(value);
        true
    }

    /// Cached symbolic current, in the reference direction.
    pub fn current_expr(&self) -> Option<&CurrentExpr> {
        self.current_expr.as_ref()
    }

    pub(crate) fn set_current_expr(&mut self, expr: CurrentExpr) {
        self.current_expr = Some(expr);
    }

    pub fn supernode(&self) -> Option<SupernodeId> {
        self.supernode
    }

    pub(crate) fn set_supernode(&mut self, supernode: Option<SupernodeId>) {
        self.supernode = supernode;
    }
}

/// Outcome of one candidate walk during branch decomposition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchEvent {
    Registered { branch: BranchId },
    Discarded { start: NodeId, reason: DiscardReason },
}

/// Why a candidate branch was thrown away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    /// Every crossed component already belonged to a branch.
    ///
    /// A walk back along a registered branch from its far end lands here:
    /// the builder never records owned components.
    Empty,
    /// Same run as a registered branch, possibly reversed. The builder's
    /// skip of owned components makes this unreachable during
    /// [`Circuit::create_branches`]; it guards the registry itself.
    Duplicate { of: BranchId },
    /// The walk ran out of new components before reaching a boundary
    SelfLoop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Walk {
    Complete,
    Stalled,
}

impl Circuit {
    /// Partition the components into branches, starting from the
    /// non-trivial nodes in ascending order.
    pub fn create_branches(&mut self) -> Result<()> {
        let order = self.non_trivial_nodes.clone();
        self.create_branches_in_order(&order)
    }

    /// Partition the components into branches, visiting the non-trivial
    /// nodes in `order`.
    pub fn create_branches_in_order(&mut self, order: &[NodeId]) -> Result<()> {
        if self.non_trivial_nodes.is_empty() {
            let start = match self.nodes.iter().find(|n| n.degree() > 0) {
                Some(node) => node.id,
                None => return Err(NodalError::topology("circuit has no connected node")),
            };
            self.walk_whole_loop(start)?;
        } else {
            for &start in order {
                if !self.node(start).is_non_trivial() {
                    return Err(NodalError::topology(format!(
                        "node {} is not a branch boundary",
                        start
                    )));
                }
                self.walk_branches_from(start)?;
            }
        }

        if let Some(orphan) = self.components.iter().find(|c| !c.has_branch()) {
            return Err(NodalError::topology(format!(
                "component '{}' could not be placed in a branch",
                orphan.name
            )));
        }

        info!(
            "{} branches over {} components ({} candidates discarded)",
            self.branches.len(),
            self.components.len(),
            self.branch_events
                .iter()
                .filter(|e| matches!(e, BranchEvent::Discarded { .. }))
                .count()
        );
        Ok(())
    }

    /// The all-series case: one branch around the whole circuit.
    fn walk_whole_loop(&mut self, start: NodeId) -> Result<()> {
        let mut cursor = Cursor::new(start, BranchBuilder::new(start));
        let outcome = loop {
            let next = match cursor.new_directions(self).first() {
                Some(&node) => node,
                None => break Walk::Stalled,
            };
            cursor.step_along(self, next)?;
            if cursor.location() == start {
                break Walk::Complete;
            }
        };
        self.settle_candidate(start, cursor.into_strategy(), outcome)
    }

    fn walk_branches_from(&mut self, start: NodeId) -> Result<()> {
        let mut cursor = Cursor::new(start, BranchBuilder::new(start));

        while self.has_unassigned_component(start) {
            cursor.relocate(start);
            let mut next = match cursor.new_directions(self).first() {
                Some(&node) => node,
                None => break,
            };
            cursor.replace_strategy(BranchBuilder::new(start));

            let outcome = loop {
                cursor.step_along(self, next)?;
                if cursor.at_branch_end(self) {
                    break Walk::Complete;
                }
                next = match cursor.new_directions(self).first() {
                    Some(&node) => node,
                    None => break Walk::Stalled,
                };
            };

            let candidate = cursor.replace_strategy(BranchBuilder::new(start));
            self.settle_candidate(start, candidate, outcome)?;
        }
        Ok(())
    }

    fn has_unassigned_component(&self, node: NodeId) -> bool {
        self.node(node)
            .components
            .iter()
            .any(|&id| !self.component(id).has_branch())
    }

    fn settle_candidate(&mut self, start: NodeId, candidate: BranchBuilder, outcome: Walk) -> Result<()> {
        let reason = if candidate.is_empty() {
            Some(DiscardReason::Empty)
        } else if outcome == Walk::Stalled {
            Some(DiscardReason::SelfLoop)
        } else {
            self.branches
                .iter()
                .find(|b| b.same_components(&candidate.components))
                .map(|b| DiscardReason::Duplicate { of: b.id })
        };

        match reason {
            Some(reason) => {
                if reason == DiscardReason::Empty {
                    debug!("discarded empty candidate from node {}", start);
                } else {
                    warn!("discarded candidate from node {}: {:?}", start, reason);
                }
                self.branch_events.push(BranchEvent::Discarded { start, reason });
                Ok(())
            }
            None => self.register_branch(candidate),
        }
    }

    fn register_branch(&mut self, candidate: BranchBuilder) -> Result<()> {
        let id = BranchId(self.branches.len());
        let (branch, entries) = candidate.into_branch(id);

        for (&component, &entry) in branch.components.iter().zip(entries.iter()) {
            self.components[component.0].assign_branch(id, entry)?;
        }
        for &node in &branch.nodes {
            self.nodes[node.0].attach_branch(id);
        }

        debug!(
            "registered branch {}: {} via [{}]",
            id,
            branch
                .nodes
                .iter()
                .map(|n| n.to_string())
                .collect::<Vec<_>>()
                .join(" -> "),
            branch
                .components
                .iter()
                .map(|c| self.components[c.0].name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        self.branch_events.push(BranchEvent::Registered { branch: id });
        self.branches.push(branch);
        Ok(())
    }
}
