//! AutoSchaum - step-by-step nodal analysis
//!
//! Solves the node voltages of a netlist and explains how.
//!
//! # Usage
//!
//! ```bash
//! autoschaum divider.crt
//! autoschaum --reference 2 --numeric-kcl divider.crt
//! RUST_LOG=debug autoschaum --schematic divider.crt
//! ```

use std::io;
use std::path::PathBuf;

use autoschaum_core::{
    circuit::{Circuit, NodeId},
    error::Result,
    explain::Explainer,
    netlist,
    schematic::{draw_schematic, PlacementLog},
    Solver, SolverConfig,
};
use clap::Parser;

/// Node-voltage analysis of linear circuits
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the netlist file
    #[arg(value_name = "NETLIST")]
    netlist: PathBuf,

    /// Reference node (chosen automatically if omitted)
    #[arg(short, long)]
    reference: Option<usize>,

    /// Resolve branch currents numerically before writing KCL equations
    #[arg(long)]
    numeric_kcl: bool,

    /// Print the schematic placement trace
    #[arg(long)]
    schematic: bool,

    /// Only print the final node voltages
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    // Parse the netlist
    let netlist = netlist::parse_file(&args.netlist)?;

    // Build the circuit
    let circuit = Circuit::from_netlist(&netlist)?;

    let mut config = SolverConfig::new().with_numeric_kcl(args.numeric_kcl);
    if let Some(reference) = args.reference {
        config = config.with_reference(NodeId(reference));
    }

    let solution = Solver::new(circuit, config).solve()?;

    if args.schematic {
        let mut log = PlacementLog::new();
        draw_schematic(solution.circuit(), &mut log)?;
        print!("{}", log);
    }

    Explainer::new(io::stdout().lock())
        .quiet(args.quiet)
        .explain(&solution)?;

    Ok(())
}
