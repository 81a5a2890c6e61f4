//! # Cirsim Core
//!
//! A per-tick electrical network solver for interactive circuit sandboxes.
//!
//! This library provides:
//! - A network model of two-terminal elements placed on grid slots
//! - Partitioning of the network into independently solvable subsystems
//! - Branch-form Modified Nodal Analysis with backward-Euler companion models
//! - Phasor solves for AC sources, superposed into the time domain
//! - A line-oriented board format for describing networks
//!
//! ## Architecture
//!
//! - [`circuit`] - Network model, handles, change tracking and records
//! - [`components`] - Element models (wire, R, C, L, DC and AC sources)
//! - [`solver`] - Partitioner, MNA assembly, LU solving and the tick driver
//! - [`dsl`] - Parser for the board description format
//! - [`trace`] - CSV output of per-tick results (CLI only)
//!
//! ## Usage
//!
//! ```no_run
//! use cirsim_core::{dsl, Network, Simulator, TickParams};
//!
//! let ast = dsl::parse("V1 2 0 1\nR1 1 2 1k\nR2 0 1 1k\n")?;
//! let mut sim = Simulator::new(Network::from_ast(&ast)?);
//! let report = sim.tick(TickParams::new(0.01, 0.01))?;
//! assert!(!report.shorted);
//! # Ok::<(), cirsim_core::CirsimError>(())
//! ```
//!
//! ## Tick Cycle
//!
//! 1. If elements or slots changed, re-partition and re-solve AC phasors
//! 2. If only AC sources changed, re-solve AC phasors
//! 3. Solve each subsystem's DC/transient system and add the AC terms
//! 4. Write voltages, currents and reactive state back onto the network

pub mod circuit;
pub mod components;
pub mod dsl;
pub mod error;
pub mod solver;

#[cfg(feature = "cli")]
pub mod trace;

// Re-export main types for convenience
pub use circuit::{ElementId, Network, NodeId, SlotId};
pub use components::Element;
pub use error::{CirsimError, Result};
pub use solver::{Simulator, SimulatorConfig, TickParams, TickReport};

// WASM bindings
#[cfg(feature = "wasm")]
mod wasm;

#[cfg(feature = "wasm")]
pub use wasm::WasmCircuitSim;
