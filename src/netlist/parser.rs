//! Line parser for netlists.

use std::collections::HashMap;

use super::ast::{ComponentDef, ComponentKind, Netlist};
use super::value::parse_complex;
use crate::error::{NodalError, Result};

/// Parser for the line-oriented netlist format.
pub struct Parser<'a> {
    lines: std::iter::Enumerate<std::str::Lines<'a>>,
}

impl<'a> Parser<'a> {
    /// Create a new parser over netlist text.
    pub fn new(input: &'a str) -> Self {
        Self {
            lines: input.lines().enumerate(),
        }
    }

    /// Parse the whole netlist.
    pub fn parse(&mut self) -> Result<Netlist> {
        let name = match self.lines.next() {
            Some((_, line)) if !line.trim().is_empty() => line.trim(),
            _ => return Err(NodalError::parse(1, "missing circuit name")),
        };
        let mut netlist = Netlist::new(name);
        // Equations name components by refdes, so each one must be unique.
        let mut declared: HashMap<String, usize> = HashMap::new();

        for (idx, line) in self.lines.by_ref() {
            let line_no = idx + 1;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with(['#', ';', '*']) {
                continue;
            }
            let def = parse_component(trimmed, line_no)?;
            if let Some(first) = declared.insert(def.name.clone(), line_no) {
                return Err(NodalError::parse(
                    line_no,
                    format!("'{}' is already declared at line {}", def.name, first),
                ));
            }
            netlist.components.push(def);
        }

        if netlist.components.is_empty() {
            return Err(NodalError::parse(1, "netlist declares no components"));
        }
        Ok(netlist)
    }
}

/// Parse a single `<refdes> <node_a> <node_b> <value>` line.
fn parse_component(line: &str, line_no: usize) -> Result<ComponentDef> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != 4 {
        return Err(NodalError::parse(
            line_no,
            format!("expected 4 fields (refdes, node, node, value), found {}", fields.len()),
        ));
    }

    let name = fields[0];
    if let Some(bad) = name.chars().find(|c| !(c.is_alphanumeric() || *c == '_')) {
        return Err(NodalError::parse(
            line_no,
            format!("'{}' contains '{}'; a refdes may only hold letters, digits and '_'", name, bad),
        ));
    }
    let kind = ComponentKind::from_refdes(name).ok_or_else(|| NodalError::UnknownComponentType {
        refdes: name.to_string(),
        line: line_no,
    })?;

    let node = |text: &str| {
        text.parse::<usize>().map_err(|_| {
            NodalError::parse(line_no, format!("node '{}' is not a non-negative integer", text))
        })
    };
    let nodes = [node(fields[1])?, node(fields[2])?];

    let value = parse_complex(fields[3]).ok_or_else(|| {
        NodalError::invalid_component(name, line_no, format!("cannot read value '{}'", fields[3]))
    })?;

    Ok(ComponentDef {
        kind,
        name: name.to_string(),
        nodes,
        value,
        line: line_no,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex64;

    #[test]
    fn test_parse_divider() {
        let input = "divider\nV1 0 1 5\nR1 0 1 1\nR2 0 2 10\nR3 1 2 1\n";
        let netlist = super::super::parse(input).unwrap();
        assert_eq!(netlist.name, "divider");
        assert_eq!(netlist.components.len(), 4);
        assert_eq!(netlist.node_count(), 3);
        assert_eq!(netlist.components[0].kind, ComponentKind::VoltageSource);
        assert_eq!(netlist.components[3].nodes, [1, 2]);
        assert_eq!(netlist.components[2].value, Complex64::new(10.0, 0.0));
    }

    #[test]
    fn test_parse_skips_comments_and_blank_lines() {
        let input = "loop\n\n# source\nV1 0 1 5\n; load\nR1 1 0 10k\n";
        let netlist = super::super::parse(input).unwrap();
        assert_eq!(netlist.components.len(), 2);
        assert_eq!(netlist.components[1].value, Complex64::new(10_000.0, 0.0));
        assert_eq!(netlist.components[1].line, 6);
    }

    #[test]
    fn test_parse_complex_impedance() {
        let netlist = super::super::parse("ac\nZ1 0 1 3+4j\nV1 1 0 1\n").unwrap();
        assert_eq!(netlist.components[0].kind, ComponentKind::Impedance);
        assert_eq!(netlist.components[0].value, Complex64::new(3.0, 4.0));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            super::super::parse("bad\nR1 0 1\n"),
            Err(NodalError::ParseError { line: 2, .. })
        ));
        assert!(matches!(
            super::super::parse("bad\nQ1 0 1 5\n"),
            Err(NodalError::UnknownComponentType { .. })
        ));
        assert!(matches!(
            super::super::parse("bad\nR1 0 -1 5\n"),
            Err(NodalError::ParseError { .. })
        ));
        assert!(matches!(
            super::super::parse("bad\nR1 0 1 five\n"),
            Err(NodalError::InvalidComponent { .. })
        ));
        assert!(matches!(super::super::parse("only a name\n"), Err(NodalError::ParseError { .. })));
    }

    #[test]
    fn test_repeated_refdes_rejected() {
        let err = super::super::parse("dup\nV1 0 1 10\nR1 1 2 1\nR1 2 0 9\nR2 2 0 9\n").unwrap_err();
        match err {
            NodalError::ParseError { line, message } => {
                assert_eq!(line, 4);
                assert!(message.contains("line 3"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_refdes_characters_checked() {
        for input in ["dash\nV1 0 1 10\nR-a 1 2 1\nR2 2 0 2\n", "dot\nV1 0 1 10\nR1.a 1 2 1\nR2 2 0 2\n"] {
            assert!(matches!(
                super::super::parse(input),
                Err(NodalError::ParseError { line: 3, .. })
            ));
        }
        let netlist = super::super::parse("ok\nV_in 0 1 10\nR_load 1 0 2\n").unwrap();
        assert_eq!(netlist.components[1].name, "R_load");
    }
}
