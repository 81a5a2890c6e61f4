//! WASM bindings for Cirsim Core.
//!
//! This module exposes the tick driver to a browser presentation layer,
//! which calls [`WasmCircuitSim::tick`] once per animation frame and reads
//! element outputs back for display.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { WasmCircuitSim } from 'cirsim_core';
//!
//! await init();
//!
//! const sim = new WasmCircuitSim(`
//!   V1 2 0 1
//!   R1 1 2 1k
//!   R2 0 1 1k
//! `);
//!
//! let time = 0;
//! function frame(delta) {
//!   time += delta;
//!   const shorted = sim.tick(delta, time);
//!   console.log(sim.element_current("R1"), shorted);
//! }
//! ```

use wasm_bindgen::prelude::*;

use crate::circuit::{validate_network, Network, SlotId};
use crate::components::Element;
use crate::dsl;
use crate::error::{CirsimError, Result};
use crate::solver::{Simulator, TickParams};

/// Initialize panic hook for better error messages in browser console.
#[wasm_bindgen(start)]
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
}

fn js_error(e: CirsimError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// WASM-compatible network simulator.
///
/// Wraps the native [`Simulator`]; elements are addressed by name.
#[wasm_bindgen]
pub struct WasmCircuitSim {
    simulator: Simulator,
}

#[wasm_bindgen]
impl WasmCircuitSim {
    /// Create a new simulator from a board description string.
    ///
    /// # Example
    /// ```javascript
    /// const sim = new WasmCircuitSim("V1 1 0 AC 1 f=50\nR1 1 0 100");
    /// ```
    #[wasm_bindgen(constructor)]
    pub fn new(board: &str) -> std::result::Result<WasmCircuitSim, JsValue> {
        let ast = dsl::parse(board).map_err(js_error)?;
        let network = Network::from_ast(&ast).map_err(js_error)?;
        validate_network(&network).map_err(js_error)?;

        Ok(WasmCircuitSim {
            simulator: Simulator::new(network),
        })
    }

    /// Run one tick. Returns whether any subsystem is shorted.
    #[wasm_bindgen]
    pub fn tick(&mut self, delta: f64, time: f64) -> std::result::Result<bool, JsValue> {
        self.simulator
            .tick(TickParams::new(delta, time))
            .map(|report| report.shorted)
            .map_err(js_error)
    }

    /// Pause or resume solving.
    #[wasm_bindgen]
    pub fn set_running(&mut self, running: bool) {
        self.simulator.set_running(running);
    }

    /// Branch current of a named element, or `undefined` if it doesn't exist.
    #[wasm_bindgen]
    pub fn element_current(&self, name: &str) -> Option<f64> {
        self.simulator.network().element_by_name(name).map(|e| e.current)
    }

    /// Branch voltage of a named element, or `undefined` if it doesn't exist.
    #[wasm_bindgen]
    pub fn element_voltage(&self, name: &str) -> Option<f64> {
        self.simulator.network().element_by_name(name).map(|e| e.voltage)
    }

    /// Voltage of the terminals on a grid slot, or `undefined` if none.
    #[wasm_bindgen]
    pub fn slot_voltage(&self, slot: u64) -> Option<f64> {
        self.simulator.network().slot_voltage(SlotId(slot))
    }

    /// Set the main parameter of a named element.
    ///
    /// Resistance, capacitance, inductance, DC voltage or AC amplitude,
    /// depending on the element.
    #[wasm_bindgen]
    pub fn set_parameter(&mut self, name: &str, value: f64) -> std::result::Result<(), JsValue> {
        self.apply_parameter(name, value).map_err(js_error)
    }

    /// Set the amplitude and angular frequency of a named AC source.
    #[wasm_bindgen]
    pub fn set_ac_source(
        &mut self,
        name: &str,
        amplitude: f64,
        omega: f64,
    ) -> std::result::Result<(), JsValue> {
        let network = self.simulator.network_mut();
        let id = find(network, name).map_err(js_error)?;
        network.set_ac_source(id, amplitude, omega).map_err(js_error)
    }

    /// Element records of the whole network as a JSON array.
    #[wasm_bindgen]
    pub fn records_json(&self) -> std::result::Result<String, JsValue> {
        serde_json::to_string(&self.simulator.network().records())
            .map_err(|e| js_error(CirsimError::from(e)))
    }
}

impl WasmCircuitSim {
    fn apply_parameter(&mut self, name: &str, value: f64) -> Result<()> {
        let network = self.simulator.network_mut();
        let id = find(network, name)?;

        let mut settable = true;
        network.update_element(id, |element| match element {
            Element::Wire => settable = false,
            Element::Resistor(r) => r.resistance = value,
            Element::DcSource(v) => v.voltage = value,
            Element::AcSource(v) => v.amplitude = value,
            Element::Inductor(l) => l.inductance = value,
            Element::Capacitor(c) => c.capacitance = value,
        })?;

        if settable {
            Ok(())
        } else {
            Err(CirsimError::WasmError {
                message: format!("{} has no settable parameter", name),
            })
        }
    }
}

fn find(network: &Network, name: &str) -> Result<crate::circuit::ElementId> {
    network
        .find_element(name)
        .ok_or_else(|| CirsimError::ComponentNotFound {
            name: name.to_string(),
        })
}

/// Get the library version.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
