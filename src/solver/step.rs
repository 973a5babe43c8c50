//! Solution snapshots.

use std::collections::BTreeMap;
use std::fmt;

use num_complex::Complex64;

use crate::circuit::{Circuit, NodeId};
use crate::error::{NodalError, Result};
use crate::expr::{Expr, Symbol};

/// A solver stage, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Initial,
    ChooseReference,
    IdentifyVoltages,
    IdentifyCurrents,
    /// Optional numeric KCL fast path
    NumericKcl,
    GenerateEquations,
    DetermineKnownVars,
    SubstituteKnowns,
    SolveEquations,
    BackSubstitute,
}

impl Stage {
    /// The stages run by a full solve.
    pub fn pipeline(numeric_kcl: bool) -> Vec<Stage> {
        let mut stages = vec![
            Stage::ChooseReference,
            Stage::IdentifyVoltages,
            Stage::IdentifyCurrents,
        ];
        if numeric_kcl {
            stages.push(Stage::NumericKcl);
        }
        stages.extend([
            Stage::GenerateEquations,
            Stage::DetermineKnownVars,
            Stage::SubstituteKnowns,
            Stage::SolveEquations,
            Stage::BackSubstitute,
        ]);
        stages
    }

    /// Stages that may directly precede this one.
    pub fn prerequisites(self) -> &'static [Stage] {
        match self {
            Stage::Initial => &[],
            Stage::ChooseReference => &[Stage::Initial],
            Stage::IdentifyVoltages => &[Stage::ChooseReference],
            Stage::IdentifyCurrents => &[Stage::IdentifyVoltages],
            Stage::NumericKcl => &[Stage::IdentifyCurrents],
            Stage::GenerateEquations => &[Stage::IdentifyCurrents, Stage::NumericKcl],
            Stage::DetermineKnownVars => &[Stage::GenerateEquations],
            Stage::SubstituteKnowns => &[Stage::DetermineKnownVars],
            Stage::SolveEquations => &[Stage::SubstituteKnowns],
            Stage::BackSubstitute => &[Stage::SolveEquations],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Stage::Initial => "initial",
            Stage::ChooseReference => "choose reference",
            Stage::IdentifyVoltages => "identify voltages",
            Stage::IdentifyCurrents => "identify currents",
            Stage::NumericKcl => "numeric KCL",
            Stage::GenerateEquations => "generate equations",
            Stage::DetermineKnownVars => "determine known variables",
            Stage::SubstituteKnowns => "substitute knowns",
            Stage::SolveEquations => "solve equations",
            Stage::BackSubstitute => "back substitute",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// The circuit and equation state after one stage.
#[derive(Debug, Clone)]
pub struct SolutionStep {
    pub stage: Stage,
    /// Independent snapshot of the circuit
    pub circuit: Circuit,
    pub reference: Option<NodeId>,
    /// KCL/KVL equations as rendered text, each meaning `... = 0`
    pub node_voltage_eqs_str: Vec<String>,
    /// The same equations parsed
    pub node_voltage_eqs: Vec<Expr>,
    /// Unknown node voltages
    pub node_vars: Vec<Symbol>,
    /// Values substituted into the equations
    pub known_vars: BTreeMap<Symbol, Complex64>,
    /// Equations after substitution
    pub subbed_eqs: Vec<Expr>,
    /// Values found by the linear solve
    pub solved: BTreeMap<Symbol, Complex64>,
}

impl SolutionStep {
    /// The first snapshot: a set-up circuit with nothing solved.
    pub fn initial(circuit: Circuit) -> Self {
        Self {
            stage: Stage::Initial,
            circuit,
            reference: None,
            node_voltage_eqs_str: Vec::new(),
            node_voltage_eqs: Vec::new(),
            node_vars: Vec::new(),
            known_vars: BTreeMap::new(),
            subbed_eqs: Vec::new(),
            solved: BTreeMap::new(),
        }
    }

    /// A copy of this snapshot relabelled as `stage`, after checking that
    /// `stage` may follow this one.
    pub(crate) fn successor(&self, stage: Stage) -> Result<Self> {
        if !stage.prerequisites().contains(&self.stage) {
            return Err(NodalError::stage_order(
                stage.name(),
                format!("it cannot follow '{}'", self.stage),
            ));
        }
        let mut next = self.clone();
        next.stage = stage;
        Ok(next)
    }

    /// The reference node, required by every stage after its choice.
    pub(crate) fn require_reference(&self, stage: Stage) -> Result<NodeId> {
        self.reference
            .ok_or_else(|| NodalError::stage_order(stage.name(), "no reference node has been chosen"))
    }

    /// What this snapshot shows to an explanation.
    pub fn summary(&self) -> StepSummary {
        StepSummary {
            stage: self.stage,
            reference: self.reference,
            equations: self.node_voltage_eqs_str.clone(),
            substitutions: self
                .known_vars
                .iter()
                .map(|(s, v)| (s.to_string(), *v))
                .collect(),
            substituted: self.subbed_eqs.iter().map(|e| e.to_string()).collect(),
        }
    }
}

/// Display-only view of a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct StepSummary {
    pub stage: Stage,
    pub reference: Option<NodeId>,
    pub equations: Vec<String>,
    pub substitutions: Vec<(String, Complex64)>,
    pub substituted: Vec<String>,
}

/// An immutable trace of solution snapshots, oldest first.
#[derive(Debug, Clone)]
pub struct Solution {
    steps: Vec<SolutionStep>,
}

impl Solution {
    /// Start a trace from a set-up circuit.
    pub fn new(circuit: Circuit) -> Self {
        Self {
            steps: vec![SolutionStep::initial(circuit)],
        }
    }

    /// Extend the trace by one snapshot.
    pub fn push(mut self, step: SolutionStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn steps(&self) -> &[SolutionStep] {
        &self.steps
    }

    pub fn latest(&self) -> &SolutionStep {
        // A trace is never empty.
        &self.steps[self.steps.len() - 1]
    }

    /// The snapshot produced by `stage`, if it ran.
    pub fn step(&self, stage: Stage) -> Option<&SolutionStep> {
        self.steps.iter().find(|s| s.stage == stage)
    }

    /// The final circuit state.
    pub fn circuit(&self) -> &Circuit {
        &self.latest().circuit
    }

    pub fn reference(&self) -> Option<NodeId> {
        self.latest().reference
    }

    pub fn voltage(&self, node: NodeId) -> Option<Complex64> {
        self.circuit().voltage(node)
    }

    pub fn voltages(&self) -> Vec<Option<Complex64>> {
        self.circuit().node_voltages()
    }

    /// The KCL/KVL equations as rendered text.
    pub fn equations(&self) -> &[String] {
        &self.latest().node_voltage_eqs_str
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_order() {
        let stages = Stage::pipeline(true);
        assert!(stages.windows(2).all(|w| w[0] < w[1]));
        assert!(stages.windows(2).all(|w| w[1].prerequisites().contains(&w[0])));
        assert!(!Stage::pipeline(false).contains(&Stage::NumericKcl));
    }

    #[test]
    fn test_successor_checks_order() {
        let circuit = Circuit::from_netlist_str("loop\nV1 0 1 5\nR1 1 0 10\n").unwrap();
        let step = SolutionStep::initial(circuit);
        assert!(step.successor(Stage::ChooseReference).is_ok());
        assert!(matches!(
            step.successor(Stage::SolveEquations),
            Err(NodalError::StageOrder { .. })
        ));
        assert!(matches!(
            step.require_reference(Stage::IdentifyVoltages),
            Err(NodalError::StageOrder { .. })
        ));
    }
}
