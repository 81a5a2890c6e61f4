//! Per-tick network solver.
//!
//! ## Branch-form MNA
//!
//! Each connected subsystem is described by branch quantities:
//!
//! ```text
//! L = A^T C A          (Laplacian, ground row/column removed)
//! R = A^T C b + A^T i0
//! L u = R,   v = A u,   i = C (b - v) + i0
//! ```
//!
//! where `A` is the incidence matrix, `C` the diagonal branch admittance,
//! `b` the branch voltage sources and `i0` the branch current sources.
//!
//! Every tick a subsystem runs one real solve (DC sources plus the
//! backward-Euler companion models of its capacitors and inductors) and
//! adds the AC phasor solutions, one per distinct angular frequency,
//! evaluated at the tick's time. The phasor solutions are cached and only
//! recomputed when an AC source changes or the topology is rebuilt.

mod mna;
mod partition;
mod scalar;
mod simulator;
mod subsystem;

pub use mna::{BranchSolution, BranchSystem, DenseMatrix, Incidence, SolvePath};
pub use partition::{partition, DisjointSet};
pub use scalar::Scalar;
pub use simulator::{Simulator, SimulatorConfig, TickParams, TickReport};
pub use subsystem::{AcBand, LocalNode, Subsystem};

/// Conductance standing in for wires and ideal voltage sources (siemens).
pub const DEFAULT_WIRE_CONDUCTANCE: f64 = 1e9;

/// Branch current above which a subsystem reports a short circuit (amps).
pub const DEFAULT_SHORT_CIRCUIT_CURRENT: f64 = 1e6;

/// Smallest pivot accepted by the LU factorization.
pub const DEFAULT_PIVOT_TOLERANCE: f64 = 1e-15;
