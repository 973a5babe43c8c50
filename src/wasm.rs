//! WASM bindings for AutoSchaum Core.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { WasmNodalSolver } from 'autoschaum_core';
//!
//! await init();
//!
//! const solver = new WasmNodalSolver(`divider
//! V1 0 1 5
//! R1 0 1 1
//! R2 0 2 10
//! R3 1 2 1`);
//!
//! solver.node_voltage(2);   // 4.545...
//! solver.equations();       // ["..."]
//! solver.explanation();     // step-by-step text
//! ```

use wasm_bindgen::prelude::*;

use crate::circuit::NodeId;
use crate::error::NodalError;
use crate::explain::Explainer;
use crate::solver::{Solution, SolverConfig};

/// Initialize panic hook for better error messages in browser console.
#[wasm_bindgen(start)]
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
}

fn to_js(e: NodalError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// A solved circuit, queryable from JavaScript.
#[wasm_bindgen]
pub struct WasmNodalSolver {
    solution: Solution,
}

#[wasm_bindgen]
impl WasmNodalSolver {
    /// Parse and solve a netlist with the automatic reference node.
    #[wasm_bindgen(constructor)]
    pub fn new(netlist: &str) -> Result<WasmNodalSolver, JsValue> {
        Self::with_config(netlist, None, false)
    }

    /// Parse and solve a netlist.
    ///
    /// # Arguments
    /// * `netlist` - The netlist text
    /// * `reference` - Reference node index, or `undefined` for automatic
    /// * `numeric_kcl` - Resolve currents numerically before writing KCL
    #[wasm_bindgen]
    pub fn with_config(
        netlist: &str,
        reference: Option<usize>,
        numeric_kcl: bool,
    ) -> Result<WasmNodalSolver, JsValue> {
        let mut config = SolverConfig::new().with_numeric_kcl(numeric_kcl);
        if let Some(node) = reference {
            config = config.with_reference(NodeId(node));
        }
        let solution = crate::solve_netlist(netlist, config).map_err(to_js)?;
        Ok(WasmNodalSolver { solution })
    }

    /// Real part of a node voltage, or `undefined` if unknown.
    #[wasm_bindgen]
    pub fn node_voltage(&self, node: usize) -> Option<f64> {
        self.voltage(node).map(|v| v.0)
    }

    /// Imaginary part of a node voltage, or `undefined` if unknown.
    #[wasm_bindgen]
    pub fn node_voltage_imag(&self, node: usize) -> Option<f64> {
        self.voltage(node).map(|v| v.1)
    }

    #[wasm_bindgen(getter)]
    pub fn node_count(&self) -> usize {
        self.solution.circuit().node_count()
    }

    #[wasm_bindgen(getter)]
    pub fn reference(&self) -> Option<usize> {
        self.solution.reference().map(|n| n.0)
    }

    /// The KCL equations, each meaning `... = 0`.
    #[wasm_bindgen]
    pub fn equations(&self) -> Vec<String> {
        self.solution.equations().to_vec()
    }

    /// The full step-by-step explanation.
    #[wasm_bindgen]
    pub fn explanation(&self) -> Result<String, JsValue> {
        let mut explainer = Explainer::new(Vec::new());
        explainer.explain(&self.solution).map_err(to_js)?;
        String::from_utf8(explainer.into_inner()).map_err(|e| {
            to_js(NodalError::WasmError {
                message: e.to_string(),
            })
        })
    }
}

impl WasmNodalSolver {
    fn voltage(&self, node: usize) -> Option<(f64, f64)> {
        if node >= self.solution.circuit().node_count() {
            return None;
        }
        self.solution.voltage(NodeId(node)).map(|v| (v.re, v.im))
    }
}

/// Get the library version.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
