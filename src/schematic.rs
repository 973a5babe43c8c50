//! Schematic placement.
//!
//! [`draw_schematic`] decides the order and direction in which components are
//! placed; drawing itself is left to a [`SchematicSink`].

use std::fmt;

use log::debug;

use crate::circuit::{Circuit, ComponentId, NodeId};
use crate::components::Component;
use crate::cursor::Cursor;
use crate::error::Result;
use crate::netlist::{format_complex, ComponentKind};

/// Symbol to place for a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchematicSymbol {
    Resistor,
    Impedance,
    VoltageSource,
}

impl SchematicSymbol {
    fn for_component(component: &Component) -> Self {
        match component.kind {
            ComponentKind::VoltageSource => SchematicSymbol::VoltageSource,
            ComponentKind::Resistor => SchematicSymbol::Resistor,
            _ => SchematicSymbol::Impedance,
        }
    }
}

/// Direction a symbol is laid out in, relative to the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutDirection {
    Right,
    Down,
    Left,
    Up,
}

impl LayoutDirection {
    /// The next direction clockwise.
    pub fn turn(self) -> Self {
        match self {
            LayoutDirection::Right => LayoutDirection::Down,
            LayoutDirection::Down => LayoutDirection::Left,
            LayoutDirection::Left => LayoutDirection::Up,
            LayoutDirection::Up => LayoutDirection::Right,
        }
    }
}

impl fmt::Display for LayoutDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LayoutDirection::Right => "right",
            LayoutDirection::Down => "down",
            LayoutDirection::Left => "left",
            LayoutDirection::Up => "up",
        };
        write!(f, "{}", s)
    }
}

/// Receiver of placement commands.
pub trait SchematicSink {
    /// Remember the current drawing position.
    fn push(&mut self);
    /// Return to the last remembered position.
    fn pop(&mut self);
    /// Place one symbol, advancing the drawing position.
    fn place(&mut self, symbol: SchematicSymbol, direction: LayoutDirection, label: &str);
}

/// One recorded placement command.
#[derive(Debug, Clone, PartialEq)]
pub enum Placement {
    Push,
    Pop,
    Place {
        symbol: SchematicSymbol,
        direction: LayoutDirection,
        label: String,
    },
}

/// A sink that records every command.
#[derive(Debug, Default, Clone)]
pub struct PlacementLog {
    pub commands: Vec<Placement>,
}

impl PlacementLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Labels of the placed components, in placement order.
    pub fn labels(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                Placement::Place { label, .. } => Some(label.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl SchematicSink for PlacementLog {
    fn push(&mut self) {
        self.commands.push(Placement::Push);
    }

    fn pop(&mut self) {
        self.commands.push(Placement::Pop);
    }

    fn place(&mut self, symbol: SchematicSymbol, direction: LayoutDirection, label: &str) {
        self.commands.push(Placement::Place {
            symbol,
            direction,
            label: label.to_string(),
        });
    }
}

impl fmt::Display for PlacementLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut depth = 0usize;
        for command in &self.commands {
            match command {
                Placement::Push => {
                    writeln!(f, "{}push", "  ".repeat(depth))?;
                    depth += 1;
                }
                Placement::Pop => {
                    depth = depth.saturating_sub(1);
                    writeln!(f, "{}pop", "  ".repeat(depth))?;
                }
                Placement::Place {
                    symbol,
                    direction,
                    label,
                } => writeln!(f, "{}{:?} {} {}", "  ".repeat(depth), symbol, direction, label)?,
            }
        }
        Ok(())
    }
}

fn label(component: &Component) -> String {
    format!(
        "{} {}{}",
        component.name,
        format_complex(component.value),
        component.kind.unit()
    )
}

/// Place every component of `circuit`, depth first from node 0.
///
/// When several new components leave a node, all but the last are placed
/// inside a push/pop pair so the drawing returns to the node afterwards.
pub fn draw_schematic(circuit: &Circuit, sink: &mut dyn SchematicSink) -> Result<()> {
    let mut cursor = Cursor::plain(NodeId(0));
    draw_from(circuit, &mut cursor, LayoutDirection::Right, sink)
}

fn draw_from(
    circuit: &Circuit,
    cursor: &mut Cursor,
    direction: LayoutDirection,
    sink: &mut dyn SchematicSink,
) -> Result<()> {
    let here = cursor.location();
    let alongs: Vec<ComponentId> = cursor.new_alongs(circuit);
    let last = alongs.len().saturating_sub(1);

    for (k, id) in alongs.into_iter().enumerate() {
        if cursor.has_seen(id) {
            continue;
        }
        let component = circuit.component(id);
        let branch_direction = if k == 0 { direction } else { direction.turn() };
        let nested = k != last;

        if nested {
            sink.push();
        }
        sink.place(SchematicSymbol::for_component(component), branch_direction, &label(component));
        debug!("placed {} {} from node {}", component.name, branch_direction, here);

        let next = cursor.cross(circuit, id)?;
        let revisit = cursor.nodes_seen()[..cursor.nodes_seen().len() - 1].contains(&next);
        if !revisit {
            draw_from(circuit, cursor, branch_direction, sink)?;
        }
        cursor.relocate(here);

        if nested {
            sink.pop();
        }
    }
    Ok(())
}
