//! Parsed representation of a netlist.

use std::fmt;

use num_complex::Complex64;

/// Complete parsed netlist.
#[derive(Debug, Clone)]
pub struct Netlist {
    /// Circuit name (first line of the file)
    pub name: String,
    /// Component lines in file order
    pub components: Vec<ComponentDef>,
}

impl Netlist {
    /// Create a new empty netlist.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            components: Vec::new(),
        }
    }

    /// Number of nodes implied by the netlist: the highest index plus one.
    pub fn node_count(&self) -> usize {
        self.components
            .iter()
            .map(|c| c.nodes[0].max(c.nodes[1]) + 1)
            .max()
            .unwrap_or(0)
    }
}

/// A component line from the netlist.
#[derive(Debug, Clone)]
pub struct ComponentDef {
    /// Kind selected by the reference designator prefix
    pub kind: ComponentKind,
    /// Reference designator (e.g. `R1`)
    pub name: String,
    /// Node indices in file order: `[a, b]`
    pub nodes: [usize; 2],
    /// Impedance or source magnitude
    pub value: Complex64,
    /// Source line number for error reporting
    pub line: usize,
}

/// Component kinds known to the netlist format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    /// Resistor (`R`)
    Resistor,
    /// Capacitor (`C`)
    Capacitor,
    /// Inductor (`L`)
    Inductor,
    /// General complex impedance (`Z`)
    Impedance,
    /// Independent voltage source (`V`)
    VoltageSource,
    /// Independent current source (`I`)
    CurrentSource,
    /// Voltage-controlled voltage source (`VCVS`)
    Vcvs,
    /// Current-controlled voltage source (`CCVS`)
    Ccvs,
    /// Voltage-controlled current source (`VCIS`)
    Vcis,
    /// Current-controlled current source (`ICIS`)
    Icis,
}

impl ComponentKind {
    /// Select a kind from the leading letters of a reference designator.
    ///
    /// Controlled-source prefixes are matched before the single-letter ones,
    /// otherwise every `VCVS` would read as a plain voltage source.
    pub fn from_refdes(refdes: &str) -> Option<Self> {
        let upper = refdes.to_ascii_uppercase();
        let controlled = [
            ("VCVS", ComponentKind::Vcvs),
            ("CCVS", ComponentKind::Ccvs),
            ("VCIS", ComponentKind::Vcis),
            ("ICIS", ComponentKind::Icis),
            ("CCIS", ComponentKind::Icis),
        ];
        if let Some((_, kind)) = controlled.iter().find(|(p, _)| upper.starts_with(p)) {
            return Some(*kind);
        }
        match upper.chars().next()? {
            'R' => Some(ComponentKind::Resistor),
            'C' => Some(ComponentKind::Capacitor),
            'L' => Some(ComponentKind::Inductor),
            'Z' => Some(ComponentKind::Impedance),
            'V' => Some(ComponentKind::VoltageSource),
            'I' => Some(ComponentKind::CurrentSource),
            _ => None,
        }
    }

    /// Whether the nodal engine can build this kind.
    pub fn is_supported(&self) -> bool {
        matches!(
            self,
            ComponentKind::Resistor | ComponentKind::Impedance | ComponentKind::VoltageSource
        )
    }

    /// Whether the kind contributes an impedance to a branch.
    pub fn is_impedance(&self) -> bool {
        matches!(
            self,
            ComponentKind::Resistor
                | ComponentKind::Capacitor
                | ComponentKind::Inductor
                | ComponentKind::Impedance
        )
    }

    /// Unit used when labelling a value of this kind.
    pub fn unit(&self) -> &'static str {
        match self {
            ComponentKind::VoltageSource | ComponentKind::Vcvs | ComponentKind::Ccvs => "V",
            ComponentKind::CurrentSource | ComponentKind::Vcis | ComponentKind::Icis => "A",
            _ => "Ω",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ComponentKind::Resistor => "resistor",
            ComponentKind::Capacitor => "capacitor",
            ComponentKind::Inductor => "inductor",
            ComponentKind::Impedance => "impedance",
            ComponentKind::VoltageSource => "voltage source",
            ComponentKind::CurrentSource => "current source",
            ComponentKind::Vcvs => "voltage-controlled voltage source",
            ComponentKind::Ccvs => "current-controlled voltage source",
            ComponentKind::Vcis => "voltage-controlled current source",
            ComponentKind::Icis => "current-controlled current source",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_refdes() {
        assert_eq!(ComponentKind::from_refdes("R12"), Some(ComponentKind::Resistor));
        assert_eq!(ComponentKind::from_refdes("V1"), Some(ComponentKind::VoltageSource));
        assert_eq!(ComponentKind::from_refdes("VCVS1"), Some(ComponentKind::Vcvs));
        assert_eq!(ComponentKind::from_refdes("ICIS2"), Some(ComponentKind::Icis));
        assert_eq!(ComponentKind::from_refdes("z3"), Some(ComponentKind::Impedance));
        assert_eq!(ComponentKind::from_refdes("Q1"), None);
    }

    #[test]
    fn test_supported_kinds() {
        assert!(ComponentKind::Resistor.is_supported());
        assert!(ComponentKind::VoltageSource.is_supported());
        assert!(!ComponentKind::Capacitor.is_supported());
        assert!(!ComponentKind::Ccvs.is_supported());
    }
}
