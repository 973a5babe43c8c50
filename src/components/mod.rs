//! Component models for nodal analysis.
//!
//! Every component is a two-terminal element with a complex parameter:
//! - Impedances: Resistor, general complex Impedance
//! - Sources: independent Voltage Source
//!
//! Capacitors, inductors, current sources and controlled sources are
//! recognised by the netlist reader but rejected here with
//! [`NodalError::UnsupportedComponentKind`].

use num_complex::Complex64;

use crate::circuit::{BranchId, ComponentId, NodeId};
use crate::error::{NodalError, Result};
use crate::netlist::{ComponentDef, ComponentKind};

/// A circuit component.
#[derive(Debug, Clone)]
pub struct Component {
    pub id: ComponentId,
    /// Reference designator
    pub name: String,
    pub kind: ComponentKind,
    pub nodes: [NodeId; 2], // [positive, negative]
    /// Impedance in ohms, or source magnitude in volts
    pub value: Complex64,
    branch: Option<BranchId>,
    current_in: Option<NodeId>,
}

impl Component {
    /// Create a component from a netlist definition.
    ///
    /// Netlists list the low side first, so `[a, b]` becomes `pos = b`,
    /// `neg = a`.
    pub fn from_def(id: ComponentId, def: &ComponentDef) -> Result<Self> {
        if !def.kind.is_supported() {
            return Err(NodalError::UnsupportedComponentKind {
                refdes: def.name.clone(),
                kind: def.kind.to_string(),
            });
        }

        match def.kind {
            ComponentKind::Resistor => {
                if def.value.im != 0.0 {
                    return Err(NodalError::invalid_component(
                        &def.name,
                        def.line,
                        "resistance must be real (use a Z element for complex impedance)",
                    ));
                }
                if def.value.re == 0.0 {
                    return Err(NodalError::invalid_component(&def.name, def.line, "resistance cannot be zero"));
                }
            }
            ComponentKind::Impedance => {
                if def.value.norm() == 0.0 {
                    return Err(NodalError::invalid_component(&def.name, def.line, "impedance cannot be zero"));
                }
            }
            _ => {}
        }

        Ok(Self::new(
            id,
            def.name.clone(),
            def.kind,
            [NodeId(def.nodes[1]), NodeId(def.nodes[0])],
            def.value,
        ))
    }

    /// Create a component directly from its terminals `[pos, neg]`.
    pub fn new(id: ComponentId, name: String, kind: ComponentKind, nodes: [NodeId; 2], value: Complex64) -> Self {
        Self {
            id,
            name,
            kind,
            nodes,
            value,
            branch: None,
            current_in: None,
        }
    }

    pub fn pos(&self) -> NodeId {
        self.nodes[0]
    }

    pub fn neg(&self) -> NodeId {
        self.nodes[1]
    }

    /// Whether `node` is one of the terminals.
    pub fn touches(&self, node: NodeId) -> bool {
        self.nodes[0] == node || self.nodes[1] == node
    }

    /// The terminal opposite `node`. `node` must be a terminal.
    pub fn other_node(&self, node: NodeId) -> NodeId {
        debug_assert!(self.touches(node), "{} does not touch node {}", self.name, node);
        if self.pos() == node {
            self.neg()
        } else {
            self.pos()
        }
    }

    /// Whether this component connects `a` and `b`.
    pub fn connects(&self, a: NodeId, b: NodeId) -> bool {
        a != b && self.touches(a) && self.touches(b)
    }

    pub fn is_voltage_source(&self) -> bool {
        self.kind == ComponentKind::VoltageSource
    }

    pub fn is_impedance(&self) -> bool {
        self.kind.is_impedance()
    }

    /// Impedance in ohms, for impedance-like components.
    pub fn impedance(&self) -> Option<Complex64> {
        self.is_impedance().then_some(self.value)
    }

    /// Admittance (1/Z), for impedance-like components.
    pub fn admittance(&self) -> Option<Complex64> {
        self.impedance().map(|z| z.inv())
    }

    /// Source magnitude, for voltage sources.
    pub fn source_voltage(&self) -> Option<Complex64> {
        self.is_voltage_source().then_some(self.value)
    }

    /// The branch this component belongs to, once assigned.
    pub fn branch(&self) -> Option<BranchId> {
        self.branch
    }

    pub fn has_branch(&self) -> bool {
        self.branch.is_some()
    }

    /// The terminal where the owning branch's reference current enters.
    pub fn current_in(&self) -> Option<NodeId> {
        self.current_in
    }

    /// Assign the owning branch and the terminal the branch current enters by.
    ///
    /// The assignment is made once; a second assignment fails.
    pub fn assign_branch(&mut self, branch: BranchId, entry: NodeId) -> Result<()> {
        if self.branch.is_some() {
            return Err(NodalError::BranchAlreadyAssigned {
                component: self.name.clone(),
            });
        }
        debug_assert!(self.touches(entry));
        self.branch = Some(branch);
        self.current_in = Some(entry);
        Ok(())
    }
}
