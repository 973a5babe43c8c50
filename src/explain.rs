//! Step-by-step write-up of a solution.

use std::io::Write;

use crate::circuit::{BranchId, Circuit};
use crate::error::Result;
use crate::netlist::format_complex;
use crate::solver::{Solution, SolutionStep, Stage};

/// Writes the account of a [`Solution`] to any writer.
pub struct Explainer<W: Write> {
    out: W,
    /// Only print the final node voltages
    pub quiet: bool,
}

impl<W: Write> Explainer<W> {
    pub fn new(out: W) -> Self {
        Self { out, quiet: false }
    }

    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Write the whole explanation.
    pub fn explain(&mut self, solution: &Solution) -> Result<()> {
        if !self.quiet {
            writeln!(self.out, "Circuit: {}", solution.circuit().name)?;
            for step in solution.steps() {
                self.explain_step(solution, step)?;
            }
            writeln!(self.out)?;
        }
        self.write_voltages(solution.circuit())?;
        if !self.quiet {
            self.write_currents(solution.circuit())?;
        }
        self.out.flush()?;
        Ok(())
    }

    fn explain_step(&mut self, solution: &Solution, step: &SolutionStep) -> Result<()> {
        let summary = step.summary();
        match summary.stage {
            Stage::Initial => {
                let circuit = &step.circuit;
                writeln!(
                    self.out,
                    "{} nodes, {} branches, {} supernodes",
                    circuit.node_count(),
                    circuit.branches().len(),
                    circuit.supernodes().len()
                )?;
            }
            Stage::ChooseReference => {
                if let Some(reference) = summary.reference {
                    writeln!(self.out, "Reference node: {} (V({}) = 0)", reference, reference)?;
                }
            }
            Stage::IdentifyVoltages | Stage::BackSubstitute => {
                let before = previous(solution, step);
                for node in step.circuit.nodes() {
                    let was_known = before.map_or(false, |s| s.circuit.voltage(node.id).is_some());
                    if let (Some(v), false) = (node.voltage(), was_known) {
                        writeln!(self.out, "  {}: V({}) = {} V", summary.stage, node.id, format_complex(v))?;
                    }
                }
            }
            Stage::IdentifyCurrents | Stage::NumericKcl => {
                let before = previous(solution, step);
                for (idx, branch) in step.circuit.branches().iter().enumerate() {
                    let was_known = before.map_or(false, |s| s.circuit.branches()[idx].current().is_some());
                    if let (Some(i), false) = (branch.current(), was_known) {
                        writeln!(self.out, "  {}: I({}) = {} A", summary.stage, BranchId(idx), format_complex(i))?;
                    }
                }
            }
            Stage::GenerateEquations => {
                writeln!(self.out, "Node-voltage equations:")?;
                for eq in &summary.equations {
                    writeln!(self.out, "  {} = 0", eq)?;
                }
            }
            Stage::DetermineKnownVars => {
                for (name, value) in &summary.substitutions {
                    writeln!(self.out, "  {} = {}", name, format_complex(*value))?;
                }
            }
            Stage::SubstituteKnowns => {
                writeln!(self.out, "After substitution:")?;
                for eq in &summary.substituted {
                    writeln!(self.out, "  {} = 0", eq)?;
                }
            }
            Stage::SolveEquations => {
                for (symbol, value) in &step.solved {
                    writeln!(self.out, "  solved: {} = {} V", symbol, format_complex(*value))?;
                }
            }
        }
        Ok(())
    }

    fn write_voltages(&mut self, circuit: &Circuit) -> Result<()> {
        for node in circuit.nodes() {
            match node.voltage() {
                Some(v) => writeln!(self.out, "V({}) = {} V", node.id, format_complex(v))?,
                None => writeln!(self.out, "V({}) = ?", node.id)?,
            }
        }
        Ok(())
    }

    fn write_currents(&mut self, circuit: &Circuit) -> Result<()> {
        for component in circuit.components() {
            if let Some(i) = circuit.component_current(component.id) {
                let entry = component.current_in().unwrap_or_else(|| component.pos());
                writeln!(
                    self.out,
                    "I({}) = {} A entering at node {}",
                    component.name,
                    format_complex(i),
                    entry
                )?;
            }
        }
        Ok(())
    }
}

fn previous<'a>(solution: &'a Solution, step: &SolutionStep) -> Option<&'a SolutionStep> {
    let steps = solution.steps();
    let idx = steps.iter().position(|s| s.stage == step.stage)?;
    idx.checked_sub(1).map(|i| &steps[i])
}
