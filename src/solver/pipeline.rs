//! The ordered solve: reference, KVL, Ohm, KCL, substitution, linear solve
//! and back substitution.

use std::collections::BTreeSet;

use log::{debug, info, warn};
use num_complex::Complex64;

use super::linear::{GaussianElimination, LinearBackend, LinearSystem};
use super::step::{Solution, SolutionStep, Stage};
use super::DEFAULT_TOLERANCE;
use crate::analysis::{current_expr, identify_currents, identify_voltages, node_voltage_kcl, numeric_kcl, propagate_from};
use crate::circuit::{BranchId, Circuit, NodeId, Sign};
use crate::error::{NodalError, Result};
use crate::expr::{Expr, Symbol};

/// Configuration for the solver.
#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Reference node; chosen automatically when `None`.
    pub reference: Option<NodeId>,
    /// Run the numeric KCL stage before generating equations.
    pub numeric_kcl: bool,
    /// Relative tolerance for voltage agreement checks.
    pub tolerance: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            reference: None,
            numeric_kcl: false,
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl SolverConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fix the reference node.
    pub fn with_reference(mut self, node: NodeId) -> Self {
        self.reference = Some(node);
        self
    }

    /// Enable or disable the numeric KCL stage.
    pub fn with_numeric_kcl(mut self, enabled: bool) -> Self {
        self.numeric_kcl = enabled;
        self
    }

    /// Set the voltage agreement tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }
}

/// Nodal-analysis solver for one circuit.
pub struct Solver<B: LinearBackend = GaussianElimination> {
    circuit: Circuit,
    config: SolverConfig,
    backend: B,
}

impl Solver<GaussianElimination> {
    /// Create a solver with the default linear backend.
    pub fn new(circuit: Circuit, config: SolverConfig) -> Self {
        Self::with_backend(circuit, config, GaussianElimination::default())
    }
}

impl<B: LinearBackend> Solver<B> {
    pub fn with_backend(circuit: Circuit, config: SolverConfig, backend: B) -> Self {
        Self {
            circuit,
            config,
            backend,
        }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Start a trace from a set-up copy of the circuit.
    pub fn start(&self) -> Result<Solution> {
        let mut circuit = self.circuit.clone();
        circuit.setup()?;
        Ok(Solution::new(circuit))
    }

    /// Run the whole pipeline.
    pub fn solve(&self) -> Result<Solution> {
        let mut solution = self.start()?;
        for stage in Stage::pipeline(self.config.numeric_kcl) {
            solution = self.advance(solution, stage)?;
        }
        info!(
            "solved '{}' with {} equations",
            solution.circuit().name,
            solution.equations().len()
        );
        Ok(solution)
    }

    /// Run one stage on the latest snapshot and append the result.
    pub fn advance(&self, solution: Solution, stage: Stage) -> Result<Solution> {
        let next = self.run_stage(solution.latest(), stage)?;
        Ok(solution.push(next))
    }

    /// Produce the snapshot of `stage` from `step`, leaving `step` untouched.
    pub fn run_stage(&self, step: &SolutionStep, stage: Stage) -> Result<SolutionStep> {
        let mut next = step.successor(stage)?;
        debug!("stage: {}", stage);
        match stage {
            Stage::Initial => {}
            Stage::ChooseReference => self.choose_reference(&mut next)?,
            Stage::IdentifyVoltages => {
                let reference = next.require_reference(stage)?;
                identify_voltages(&mut next.circuit, reference, self.config.tolerance)?;
            }
            Stage::IdentifyCurrents => {
                identify_currents(&mut next.circuit);
            }
            Stage::NumericKcl => {
                numeric_kcl_sweep(&mut next.circuit)?;
            }
            Stage::GenerateEquations => {
                let reference = next.require_reference(stage)?;
                let equations = node_voltage_kcl(&mut next.circuit, reference)?;
                next.node_voltage_eqs = equations
                    .iter()
                    .map(|eq| Expr::parse(eq))
                    .collect::<Result<Vec<_>>>()?;
                next.node_voltage_eqs_str = equations;
            }
            Stage::DetermineKnownVars => determine_known_vars(&mut next),
            Stage::SubstituteKnowns => {
                next.subbed_eqs = next
                    .node_voltage_eqs
                    .iter()
                    .map(|eq| eq.substitute(&next.known_vars))
                    .collect();
            }
            Stage::SolveEquations => self.solve_equations(&mut next)?,
            Stage::BackSubstitute => back_substitute(&mut next.circuit, self.config.tolerance)?,
        }
        Ok(next)
    }

    fn choose_reference(&self, step: &mut SolutionStep) -> Result<()> {
        let circuit = &step.circuit;
        let reference = match self.config.reference {
            Some(node) => {
                circuit.get_node(node.0)?;
                if !circuit.reduced_nodes().contains(&node) {
                    return Err(NodalError::InvalidReference { node: node.0 });
                }
                node
            }
            None => choose_reference_node(circuit)?,
        };
        info!("reference node: {}", reference);
        step.reference = Some(reference);
        Ok(())
    }

    fn solve_equations(&self, step: &mut SolutionStep) -> Result<()> {
        let tolerance = self.config.tolerance;
        let mut rows = Vec::new();
        for eq in &step.subbed_eqs {
            let form = eq.linearize()?;
            if form.is_constant() {
                if form.constant.norm() > tolerance {
                    return Err(NodalError::NoSolution);
                }
                warn!("dropping equation with no unknowns: {}", eq);
                continue;
            }
            rows.push(form);
        }

        if step.node_vars.is_empty() {
            return Ok(());
        }

        let names = step.node_vars.iter().map(|s| s.to_string()).collect();
        let mut system = LinearSystem::new(rows.len(), names);
        for (i, form) in rows.iter().enumerate() {
            for (symbol, coeff) in &form.coeffs {
                match step.node_vars.iter().position(|s| s == symbol) {
                    Some(j) => system.add(i, j, *coeff),
                    None if coeff.norm() == 0.0 => {}
                    None => {
                        return Err(NodalError::stage_order(
                            Stage::SolveEquations.name(),
                            format!("symbol {} was neither known nor an unknown", symbol),
                        ))
                    }
                }
            }
            system.b[i] = -form.constant;
        }

        info!("solving {} equations in {} unknowns", system.rows, system.cols);
        let x = self.backend.solve(&system)?;
        for (symbol, value) in step.node_vars.iter().zip(x) {
            if let Symbol::NodeVoltage(node) = symbol {
                step.circuit.node_mut(*node).set_voltage(value, tolerance)?;
            }
            debug!("{} = {}", symbol, value);
            step.solved.insert(symbol.clone(), value);
        }
        Ok(())
    }
}

/// The reduced node with the most incident components; ties go to the
/// lowest id.
pub fn choose_reference_node(circuit: &Circuit) -> Result<NodeId> {
    circuit
        .reduced_nodes()
        .iter()
        .copied()
        .max_by(|a, b| {
            circuit
                .node(*a)
                .degree()
                .cmp(&circuit.node(*b).degree())
                .then(b.cmp(a))
        })
        .ok_or_else(|| NodalError::topology("circuit has no candidate reference node"))
}

/// Split the equation symbols into unknown node voltages and known values.
fn determine_known_vars(step: &mut SolutionStep) {
    let symbols: BTreeSet<Symbol> = step.node_voltage_eqs.iter().flat_map(|eq| eq.symbols()).collect();
    step.node_vars.clear();
    step.known_vars.clear();
    for symbol in symbols {
        let known = match &symbol {
            Symbol::NodeVoltage(node) => step.circuit.voltage(*node),
            Symbol::Component(name) => step
                .circuit
                .find_component(name)
                .map(|id| step.circuit.component(id).value),
        };
        match known {
            Some(value) => {
                step.known_vars.insert(symbol, value);
            }
            None => step.node_vars.push(symbol),
        }
    }
}

/// Apply numeric KCL wherever exactly one branch current is unknown,
/// until nothing changes. Returns the resolved branches.
fn numeric_kcl_sweep(circuit: &mut Circuit) -> Result<Vec<BranchId>> {
    let mut resolved = Vec::new();
    loop {
        let mut progress = false;
        for node in circuit.non_trivial_nodes().to_vec() {
            match numeric_kcl(circuit, node) {
                Ok(branch) => {
                    resolved.push(branch);
                    progress = true;
                }
                Err(NodalError::KclNotSolvableNumerically { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        if !progress {
            return Ok(resolved);
        }
    }
}

/// Walk a branch with a known current from whichever end has a voltage,
/// filling in the voltages along it.
fn walk_branch_voltages(circuit: &mut Circuit, branch: BranchId, tolerance: f64) -> Result<bool> {
    let b = circuit.branch(branch).clone();
    let current = match b.current() {
        Some(i) => i,
        None => return Ok(false),
    };

    let (nodes, components, current): (Vec<_>, Vec<_>, Complex64) = if circuit.voltage(b.start()).is_some() {
        (b.nodes.clone(), b.components.clone(), current)
    } else if circuit.voltage(b.end()).is_some() {
        (
            b.nodes.iter().rev().copied().collect(),
            b.components.iter().rev().copied().collect(),
            -current,
        )
    } else {
        return Ok(false);
    };

    let mut changed = false;
    let mut v = circuit.voltage(nodes[0]).unwrap_or_default();
    for (k, &id) in components.iter().enumerate() {
        let next = nodes[k + 1];
        let component = circuit.component(id);
        if component.is_voltage_source() {
            let sign = if component.pos() == next { Sign::Rise } else { Sign::Drop };
            v += component.value * sign.factor();
        } else {
            v -= current * component.value;
        }
        match circuit.voltage(next) {
            Some(actual) => v = actual,
            None => {
                circuit.node_mut(next).set_voltage(v, tolerance)?;
                debug!("V({}) = {} walking branch {}", next, v, branch);
                changed = true;
            }
        }
    }
    Ok(changed)
}

/// Fill in every remaining voltage and current from what is known.
fn back_substitute(circuit: &mut Circuit, tolerance: f64) -> Result<()> {
    loop {
        let mut progress = false;

        let defined: Vec<NodeId> = circuit
            .nodes()
            .iter()
            .filter(|n| n.voltage_is_defined())
            .map(|n| n.id)
            .collect();
        for node in defined {
            progress |= !propagate_from(circuit, node, tolerance)?.is_empty();
        }

        progress |= !identify_currents(circuit).is_empty();

        for idx in 0..circuit.branches().len() {
            let branch = BranchId(idx);
            let b = circuit.branch(branch);
            if b.current().is_some() || !b.components.iter().any(|c| circuit.component(*c).is_impedance()) {
                continue;
            }
            let expr = current_expr(circuit, branch)?;
            if let Some(i) = expr.evaluate(circuit) {
                debug!("I({}) = {} from {}", branch, i, expr.render(circuit));
                circuit.branch_mut(branch).set_current(i);
                progress = true;
            }
        }

        for idx in 0..circuit.branches().len() {
            progress |= walk_branch_voltages(circuit, BranchId(idx), tolerance)?;
        }

        progress |= !numeric_kcl_sweep(circuit)?.is_empty();

        if !progress {
            break;
        }
    }

    let missing: Vec<String> = circuit
        .nodes()
        .iter()
        .filter(|n| !n.voltage_is_defined())
        .map(|n| format!("V({})", n.id))
        .collect();
    if !missing.is_empty() {
        return Err(NodalError::UnderDetermined {
            unknowns: missing.join(", "),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlist;
    use approx::assert_abs_diff_eq;

    fn solve(text: &str) -> Result<Solution> {
        solve_with(text, SolverConfig::new())
    }

    fn solve_with(text: &str, config: SolverConfig) -> Result<Solution> {
        let netlist = netlist::parse(text)?;
        let circuit = Circuit::from_netlist(&netlist)?;
        Solver::new(circuit, config).solve()
    }

    fn volts(solution: &Solution, node: usize) -> Complex64 {
        solution.voltage(NodeId(node)).unwrap()
    }

    const DIVIDER: &str = "divider\nV1 0 1 5\nR1 0 1 1\nR2 0 2 10\nR3 1 2 1\n";

    #[test]
    fn test_series_loop() {
        let solution = solve("loop\nV1 0 1 5\nR1 1 0 10\n").unwrap();
        assert_eq!(solution.reference(), Some(NodeId(0)));
        assert_abs_diff_eq!(volts(&solution, 0).re, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(volts(&solution, 1).re, 5.0, epsilon = 1e-12);
        let circuit = solution.circuit();
        assert_eq!(circuit.branches().len(), 1);
        assert_abs_diff_eq!(circuit.branches()[0].current().unwrap().re, 0.5, epsilon = 1e-12);
        assert!(solution.equations().is_empty());
    }

    #[test]
    fn test_divider_matches_admittance_analysis() {
        let solution = solve(DIVIDER).unwrap();
        assert_abs_diff_eq!(volts(&solution, 1).re, 5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(volts(&solution, 2).re, 50.0 / 11.0, epsilon = 1e-9);

        // Node 2 has degree two, so it gets no KCL equation; its voltage is
        // recovered from the R2-R3 branch current during back substitution.
        assert!(solution.equations().is_empty());
        let solved = solution.step(Stage::SolveEquations).unwrap();
        assert!(solved.circuit.voltage(NodeId(2)).is_none());

        // Independent check: node 2 from the admittance matrix row,
        // Y22 V2 + Y20 V0 + Y21 V1 = 0.
        let y = solution.circuit().admittance_matrix();
        let v2 = -(y[2][0] * volts(&solution, 0) + y[2][1] * volts(&solution, 1)) / y[2][2];
        assert_abs_diff_eq!(volts(&solution, 2).re, v2.re, epsilon = 1e-9);

        // Node 1 came from the source, not from the linear solve.
        let after_kvl = solution.step(Stage::IdentifyVoltages).unwrap();
        assert!(after_kvl.circuit.voltage(NodeId(1)).is_some());
        assert!(after_kvl.circuit.voltage(NodeId(2)).is_none());
    }

    #[test]
    fn test_source_in_series_with_resistor() {
        let solution = solve("src\nV1 0 1 10\nR1 1 2 2\nR2 2 0 4\nR3 2 0 4\n").unwrap();
        assert_eq!(
            solution.equations(),
            &["(V(2)-V1-V(0))/(R1)+(V(2)-V(0))/(R2)+(V(2)-V(0))/(R3)".to_string()]
        );
        let step = solution.step(Stage::SubstituteKnowns).unwrap();
        assert_eq!(step.node_vars, vec![Symbol::NodeVoltage(NodeId(2))]);
        assert_eq!(step.known_vars.len(), 5);
        assert_abs_diff_eq!(volts(&solution, 2).re, 5.0, epsilon = 1e-9);
        assert_abs_diff_eq!(volts(&solution, 1).re, 10.0, epsilon = 1e-12);

        let r1 = solution.circuit().find_component("R1").unwrap();
        assert_abs_diff_eq!(solution.circuit().component_current(r1).unwrap().re, 2.5, epsilon = 1e-9);
    }

    #[test]
    fn test_floating_supernode() {
        let solution = solve("float\nR1 1 0 1\nV1 1 2 3\nR2 2 0 1\nR3 2 0 1\nR4 1 0 1\n").unwrap();
        assert_eq!(solution.reference(), Some(NodeId(0)));
        assert_eq!(solution.equations().len(), 2);
        assert_abs_diff_eq!(volts(&solution, 1).re, -1.5, epsilon = 1e-9);
        assert_abs_diff_eq!(volts(&solution, 2).re, 1.5, epsilon = 1e-9);

        // Member = master + source along the path.
        let circuit = solution.circuit();
        let supernode = &circuit.supernodes()[0];
        let master = supernode.voltage(circuit).unwrap();
        for member in supernode.members() {
            assert_abs_diff_eq!((circuit.voltage(member).unwrap() - master).re, 3.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_complex_impedances() {
        let solution = solve("ac\nV1 0 1 10\nZ1 1 2 3+4j\nR1 2 0 5\nR2 2 0 5\n").unwrap();
        // Z1 in series with 2.5 ohm: V2 = 10 * 2.5 / (5.5 + 4j)
        let expected = Complex64::new(25.0, 0.0) / Complex64::new(5.5, 4.0);
        let v2 = volts(&solution, 2);
        assert_abs_diff_eq!(v2.re, expected.re, epsilon = 1e-9);
        assert_abs_diff_eq!(v2.im, expected.im, epsilon = 1e-9);
    }

    #[test]
    fn test_bridge_against_admittance_matrix() {
        let text = "bridge\nV1 0 1 10\nR1 1 2 1\nR2 1 3 2\nR3 2 3 3\nR4 2 0 4\nR5 3 0 5\n";
        let solution = solve(text).unwrap();
        let y = solution.circuit().admittance_matrix();
        // KCL residual at every node not touching the source must vanish.
        for n in [2usize, 3] {
            let residual: Complex64 = (0..4).map(|j| y[n][j] * volts(&solution, j)).sum();
            assert_abs_diff_eq!(residual.norm(), 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_explicit_reference() {
        let text = "src\nV1 0 1 10\nR1 1 2 2\nR2 2 0 4\nR3 2 0 4\n";
        let solution = solve_with(text, SolverConfig::new().with_reference(NodeId(2))).unwrap();
        assert_eq!(solution.reference(), Some(NodeId(2)));
        assert_abs_diff_eq!(volts(&solution, 2).re, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(volts(&solution, 0).re, -5.0, epsilon = 1e-9);
        assert_abs_diff_eq!(volts(&solution, 1).re, 5.0, epsilon = 1e-9);
    }

    #[test]
    fn test_supernode_member_cannot_be_reference() {
        assert!(matches!(
            solve_with(DIVIDER, SolverConfig::new().with_reference(NodeId(1))),
            Err(NodalError::InvalidReference { node: 1 })
        ));
        assert!(matches!(
            solve_with(DIVIDER, SolverConfig::new().with_reference(NodeId(9))),
            Err(NodalError::NodeNotFound { node: 9 })
        ));
    }

    #[test]
    fn test_numeric_kcl_stage_is_optional() {
        let plain = solve(DIVIDER).unwrap();
        let fast = solve_with(DIVIDER, SolverConfig::new().with_numeric_kcl(true)).unwrap();
        assert!(fast.step(Stage::NumericKcl).is_some());
        assert!(plain.step(Stage::NumericKcl).is_none());
        assert_abs_diff_eq!(volts(&plain, 2).re, volts(&fast, 2).re, epsilon = 1e-12);
    }

    #[test]
    fn test_source_loop_is_degenerate() {
        assert!(matches!(
            solve("clash\nV1 0 1 5\nV2 0 1 3\n"),
            Err(NodalError::DegenerateTopology { .. })
        ));
    }

    #[test]
    fn test_repeated_refdes_is_rejected_before_solving() {
        // A second R1 would otherwise pick up the first one's value.
        assert!(matches!(
            solve("dup\nV1 0 1 10\nR1 1 2 1\nR1 2 0 9\nR2 2 0 9\n"),
            Err(NodalError::ParseError { line: 4, .. })
        ));
        let solution = solve("dup\nV1 0 1 10\nR1 1 2 1\nR3 2 0 9\nR2 2 0 9\n").unwrap();
        assert_abs_diff_eq!(volts(&solution, 2).re, 90.0 / 11.0, epsilon = 1e-9);
    }

    #[test]
    fn test_unsupported_component() {
        assert!(matches!(
            solve("rc\nV1 0 1 5\nR1 1 2 1k\nC1 2 0 1u\n"),
            Err(NodalError::UnsupportedComponentKind { .. })
        ));
    }

    #[test]
    fn test_snapshots_are_independent() {
        let solution = solve(DIVIDER).unwrap();
        let initial = &solution.steps()[0];
        assert_eq!(initial.stage, Stage::Initial);
        assert!(initial.circuit.nodes().iter().all(|n| !n.voltage_is_defined()));
        let reference = solution.step(Stage::ChooseReference).unwrap();
        assert!(reference.circuit.voltage(NodeId(0)).is_none());
        assert!(solution.circuit().is_solved());
    }

    #[test]
    fn test_solving_is_deterministic() {
        let first = solve(DIVIDER).unwrap();
        let second = solve(DIVIDER).unwrap();
        assert_eq!(first.voltages(), second.voltages());
        assert_eq!(first.equations(), second.equations());

        let copy = Solver::new(first.steps()[0].circuit.clone(), SolverConfig::new())
            .solve()
            .unwrap();
        assert_eq!(copy.voltages(), first.voltages());
    }

    #[test]
    fn test_stage_order_enforced() {
        let circuit = Circuit::from_netlist_str(DIVIDER).unwrap();
        let solver = Solver::new(circuit, SolverConfig::new());
        let solution = solver.start().unwrap();
        assert!(matches!(
            solver.advance(solution.clone(), Stage::GenerateEquations),
            Err(NodalError::StageOrder { .. })
        ));
        let solution = solver.advance(solution, Stage::ChooseReference).unwrap();
        assert_eq!(solution.steps().len(), 2);
    }
}
