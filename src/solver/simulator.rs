//! Main simulator interface.

use log::{debug, trace};

use crate::circuit::Network;
use crate::error::{CirsimError, Result};

use super::partition::partition;
use super::subsystem::Subsystem;
use super::{DEFAULT_PIVOT_TOLERANCE, DEFAULT_SHORT_CIRCUIT_CURRENT, DEFAULT_WIRE_CONDUCTANCE};

/// Configuration for the simulator.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Conductance standing in for wires and ideal sources (siemens).
    pub wire_conductance: f64,
    /// Branch current magnitude above which a subsystem counts as shorted (amps).
    pub short_circuit_current: f64,
    /// Smallest pivot magnitude accepted by the linear solve.
    pub pivot_tolerance: f64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            wire_conductance: DEFAULT_WIRE_CONDUCTANCE,
            short_circuit_current: DEFAULT_SHORT_CIRCUIT_CURRENT,
            pivot_tolerance: DEFAULT_PIVOT_TOLERANCE,
        }
    }
}

impl SimulatorConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the wire conductance.
    ///
    /// Higher values make wires and sources closer to ideal but worsen the
    /// conditioning of the system.
    pub fn with_wire_conductance(mut self, conductance: f64) -> Self {
        self.wire_conductance = conductance;
        self
    }

    /// Set the short-circuit current threshold.
    pub fn with_short_circuit_current(mut self, current: f64) -> Self {
        self.short_circuit_current = current;
        self
    }

    /// Set the pivot tolerance.
    pub fn with_pivot_tolerance(mut self, tolerance: f64) -> Self {
        self.pivot_tolerance = tolerance;
        self
    }

    fn validate(&self) -> Result<()> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(self.wire_conductance) {
            return Err(CirsimError::InvalidSimulationParam {
                message: format!("wire conductance must be positive, got {}", self.wire_conductance),
            });
        }
        if !positive(self.short_circuit_current) {
            return Err(CirsimError::InvalidSimulationParam {
                message: format!(
                    "short-circuit current must be positive, got {}",
                    self.short_circuit_current
                ),
            });
        }
        if !(self.pivot_tolerance.is_finite() && self.pivot_tolerance >= 0.0) {
            return Err(CirsimError::InvalidSimulationParam {
                message: format!("pivot tolerance must be non-negative, got {}", self.pivot_tolerance),
            });
        }
        Ok(())
    }
}

/// Per-tick inputs from the host loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickParams {
    /// Time step (seconds)
    pub delta: f64,
    /// Absolute time used to evaluate AC phasors (seconds)
    pub time: f64,
}

impl TickParams {
    pub fn new(delta: f64, time: f64) -> Self {
        Self { delta, time }
    }

    fn validate(&self) -> Result<()> {
        if !(self.delta.is_finite() && self.delta > 0.0) {
            return Err(CirsimError::InvalidSimulationParam {
                message: format!("time step must be positive, got {}", self.delta),
            });
        }
        if !self.time.is_finite() {
            return Err(CirsimError::InvalidSimulationParam {
                message: format!("time must be finite, got {}", self.time),
            });
        }
        Ok(())
    }
}

/// What a tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Any solved subsystem was shorted
    pub shorted: bool,
    /// The topology was partitioned again
    pub rebuilt: bool,
    /// AC phasors were re-solved without a rebuild
    pub ac_resolved: bool,
    /// Number of subsystems solved
    pub solved: usize,
}

/// The main circuit simulator.
pub struct Simulator {
    /// The network being simulated
    network: Network,
    config: SimulatorConfig,
    /// Solvable subsystems from the last partition
    subsystems: Vec<Subsystem>,
    built: bool,
    running: bool,
    shorted: bool,
    /// Time accumulated by [`Simulator::advance`]
    time: f64,
}

impl Simulator {
    /// Create a new simulator for the given network with default configuration.
    pub fn new(network: Network) -> Self {
        Self {
            network,
            config: SimulatorConfig::default(),
            subsystems: Vec::new(),
            built: false,
            running: true,
            shorted: false,
            time: 0.0,
        }
    }

    /// Create a new simulator for the given network with custom configuration.
    pub fn with_config(network: Network, config: SimulatorConfig) -> Result<Self> {
        config.validate()?;
        let mut sim = Self::new(network);
        sim.config = config;
        Ok(sim)
    }

    /// Get the network.
    pub fn network(&self) -> &Network {
        &self.network
    }

    /// Get the network for editing; edits raise change flags picked up next tick.
    pub fn network_mut(&mut self) -> &mut Network {
        &mut self.network
    }

    /// Take the network back.
    pub fn into_network(self) -> Network {
        self.network
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Solvable subsystems from the last partition.
    pub fn subsystems(&self) -> &[Subsystem] {
        &self.subsystems
    }

    /// Pause or resume solving. A paused simulator still tracks edits.
    pub fn set_running(&mut self, running: bool) {
        self.running = running;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Whether any subsystem was shorted on the last solved tick.
    pub fn shorted(&self) -> bool {
        self.shorted
    }

    /// Time accumulated by [`Simulator::advance`].
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Step the internal clock by `delta` and tick at the new time.
    pub fn advance(&mut self, delta: f64) -> Result<TickReport> {
        let params = TickParams::new(delta, self.time + delta);
        let report = self.tick(params)?;
        self.time = params.time;
        Ok(report)
    }

    /// Process one tick.
    ///
    /// A structural change re-partitions the network and re-solves every
    /// AC band; an AC-only change re-solves the bands of the existing
    /// subsystems. When running, each subsystem is then stepped and its
    /// results written back onto the network.
    pub fn tick(&mut self, params: TickParams) -> Result<TickReport> {
        params.validate()?;
        let mut report = TickReport::default();

        let changes = self.network.take_changes();
        if changes.structure || !self.built {
            self.rebuild();
            report.rebuilt = true;
        } else if changes.ac_sources {
            for subsystem in &mut self.subsystems {
                subsystem.solve_ac(&self.network, &self.config);
            }
            debug!("re-solved AC bands of {} subsystems", self.subsystems.len());
            report.ac_resolved = true;
        }

        if !self.running {
            report.shorted = self.shorted;
            return Ok(report);
        }

        self.shorted = self.step(params);
        for subsystem in &self.subsystems {
            subsystem.write_back(&mut self.network, params.delta);
        }

        report.shorted = self.shorted;
        report.solved = self.subsystems.len();
        trace!(
            "tick t={} dt={}: {} subsystems, shorted={}",
            params.time,
            params.delta,
            report.solved,
            report.shorted
        );
        Ok(report)
    }

    fn rebuild(&mut self) {
        let mut solvable = Vec::new();
        let mut skipped = 0;

        for (_, mut subsystem) in partition(&self.network) {
            if subsystem.is_solvable() {
                subsystem.init(&self.network);
                subsystem.solve_ac(&self.network, &self.config);
                solvable.push(subsystem);
            } else {
                subsystem.clear_outputs(&mut self.network);
                skipped += 1;
            }
        }

        debug!(
            "rebuilt topology: {} subsystems ({} too small to solve)",
            solvable.len(),
            skipped
        );
        self.subsystems = solvable;
        self.built = true;
    }

    #[cfg(not(feature = "parallel"))]
    fn step(&mut self, params: TickParams) -> bool {
        let network = &self.network;
        let config = &self.config;
        self.subsystems
            .iter_mut()
            .map(|s| s.update(network, params, config))
            .fold(false, |acc, shorted| acc || shorted)
    }

    #[cfg(feature = "parallel")]
    fn step(&mut self, params: TickParams) -> bool {
        use rayon::prelude::*;

        let network = &self.network;
        let config = &self.config;
        self.subsystems
            .par_iter_mut()
            .map(|s| s.update(network, params, config))
            .reduce(|| false, |a, b| a || b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::SlotId;
    use crate::components::{Capacitor, DcVoltageSource, Element, Resistor};
    use approx::assert_abs_diff_eq;

    fn divider() -> Network {
        let ast = crate::dsl::parse("R2 0 1 1\nR1 1 2 1\nV1 2 0 1\n").unwrap();
        Network::from_ast(&ast).unwrap()
    }

    #[test]
    fn test_divider_end_to_end() {
        let mut sim = Simulator::new(divider());
        let report = sim.tick(TickParams::new(0.01, 0.01)).unwrap();
        assert!(report.rebuilt);
        assert!(!report.shorted);
        assert_eq!(report.solved, 1);

        let net = sim.network();
        assert_abs_diff_eq!(net.slot_voltage(SlotId(0)).unwrap(), 0.0);
        assert_abs_diff_eq!(net.slot_voltage(SlotId(1)).unwrap(), 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(net.slot_voltage(SlotId(2)).unwrap(), 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(net.element_by_name("R1").unwrap().current, 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(net.element_by_name("R2").unwrap().current, 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_rebuild_only_on_structural_change() {
        let mut sim = Simulator::new(divider());
        assert!(sim.advance(0.01).unwrap().rebuilt);
        assert!(!sim.advance(0.01).unwrap().rebuilt);

        let r1 = sim.network().find_element("R1").unwrap();
        sim.network_mut()
            .update_element(r1, |e| *e = Element::Resistor(Resistor::new(3.0)))
            .unwrap();
        let report = sim.advance(0.01).unwrap();
        assert!(!report.rebuilt && !report.ac_resolved);
        // Parameter edits take effect without a rebuild
        assert_abs_diff_eq!(
            sim.network().slot_voltage(SlotId(1)).unwrap(),
            0.25,
            epsilon = 1e-6
        );

        sim.network_mut()
            .add_element("R3", Element::Resistor(Resistor::new(1.0)), [SlotId(1), SlotId(0)])
            .unwrap();
        assert!(sim.advance(0.01).unwrap().rebuilt);
        assert_abs_diff_eq!(
            sim.network().slot_voltage(SlotId(1)).unwrap(),
            0.5 / 3.5,
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_ac_change_resolves_bands() {
        let ast = crate::dsl::parse("V1 1 0 AC 2 w=10\nR1 1 0 1\n").unwrap();
        let mut sim = Simulator::new(Network::from_ast(&ast).unwrap());
        sim.tick(TickParams::new(0.01, 0.0)).unwrap();
        let v = sim.network().element_by_name("R1").unwrap().voltage;
        assert_abs_diff_eq!(v.abs(), 2.0, epsilon = 1e-6);

        let id = sim.network().find_element("V1").unwrap();
        sim.network_mut().set_ac_source(id, 5.0, 10.0).unwrap();
        let report = sim.tick(TickParams::new(0.01, 0.0)).unwrap();
        assert!(report.ac_resolved && !report.rebuilt);
        let v = sim.network().element_by_name("R1").unwrap().voltage;
        assert_abs_diff_eq!(v.abs(), 5.0, epsilon = 1e-6);
    }

    #[test]
    fn test_shorted_flag_clears_when_short_removed() {
        let mut net = Network::new();
        net.add_element("V1", Element::DcSource(DcVoltageSource::new(1.0)), [SlotId(0), SlotId(1)])
            .unwrap();
        let wire = net.add_element("W1", Element::Wire, [SlotId(1), SlotId(0)]).unwrap();
        let mut sim = Simulator::new(net);
        assert!(sim.advance(0.01).unwrap().shorted);
        assert!(sim.shorted());

        sim.network_mut()
            .update_element(wire, |e| *e = Element::Resistor(Resistor::new(10.0)))
            .unwrap();
        assert!(!sim.advance(0.01).unwrap().shorted);
        assert!(!sim.shorted());
    }

    #[test]
    fn test_unsolvable_subsystems_are_zeroed() {
        let mut net = divider();
        let lone = net.add_element("W9", Element::Wire, [SlotId(9), SlotId::INVALID]).unwrap();
        let mut sim = Simulator::new(net);
        let report = sim.advance(0.01).unwrap();
        assert_eq!(report.solved, 1);
        assert_eq!(sim.network().element(lone).unwrap().current, 0.0);
        assert_eq!(sim.subsystems().len(), 1);
    }

    #[test]
    fn test_paused_simulator_keeps_outputs() {
        let mut sim = Simulator::new(divider());
        sim.advance(0.01).unwrap();
        sim.set_running(false);

        let r1 = sim.network().find_element("R1").unwrap();
        sim.network_mut()
            .update_element(r1, |e| *e = Element::Resistor(Resistor::new(3.0)))
            .unwrap();
        let report = sim.advance(0.01).unwrap();
        assert_eq!(report.solved, 0);
        assert_abs_diff_eq!(sim.network().slot_voltage(SlotId(1)).unwrap(), 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_capacitor_charge_survives_rebuild() {
        let mut net = Network::new();
        net.add_element("C1", Element::Capacitor(Capacitor::with_charge(1.0, 3.0)), [SlotId(0), SlotId(1)])
            .unwrap();
        let mut sim = Simulator::new(net);
        sim.advance(0.01).unwrap();

        // Touching the topology forces a re-partition
        sim.network_mut()
            .add_element("W1", Element::Wire, [SlotId(5), SlotId(6)])
            .unwrap();
        assert!(sim.advance(0.01).unwrap().rebuilt);
        let c1 = sim.network().element_by_name("C1").unwrap();
        assert_abs_diff_eq!(c1.voltage, 3.0, epsilon = 1e-9);
        assert_abs_diff_eq!(c1.stored_energy().unwrap(), 4.5, epsilon = 1e-9);
    }

    #[test]
    fn test_charge_edit_is_seeded_into_solver() {
        let mut net = Network::new();
        let c = net
            .add_element("C1", Element::Capacitor(Capacitor::new(1.0)), [SlotId(0), SlotId(1)])
            .unwrap();
        net.add_element("R1", Element::Resistor(Resistor::new(1e6)), [SlotId(1), SlotId(0)])
            .unwrap();
        let mut sim = Simulator::new(net);
        sim.advance(0.01).unwrap();

        sim.network_mut()
            .update_element(c, |e| *e = Element::Capacitor(Capacitor::with_charge(1.0, 5.0)))
            .unwrap();
        assert!(sim.advance(0.01).unwrap().rebuilt);

        let c1 = sim.network().element(c).unwrap();
        assert_abs_diff_eq!(c1.voltage.abs(), 5.0, epsilon = 1e-6);
        match &c1.element {
            Element::Capacitor(cap) => assert_abs_diff_eq!(cap.charge.abs(), 5.0, epsilon = 1e-6),
            other => panic!("expected capacitor, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_params_rejected() {
        let mut sim = Simulator::new(divider());
        assert!(sim.tick(TickParams::new(0.0, 0.0)).is_err());
        assert!(sim.tick(TickParams::new(0.01, f64::NAN)).is_err());
        assert!(Simulator::with_config(divider(), SimulatorConfig::new().with_wire_conductance(-1.0)).is_err());

        let config = SimulatorConfig::new()
            .with_wire_conductance(1e6)
            .with_short_circuit_current(1e3)
            .with_pivot_tolerance(1e-12);
        let sim = Simulator::with_config(divider(), config).unwrap();
        assert_eq!(sim.config().short_circuit_current, 1e3);
    }

    #[test]
    fn test_separate_subsystems_solved_independently() {
        let ast = crate::dsl::parse("V1 1 0 2\nR1 1 0 1\nV2 11 10 4\nR2 11 10 2\nW1 NC NC\n").unwrap();
        let mut sim = Simulator::new(Network::from_ast(&ast).unwrap());
        let report = sim.advance(0.01).unwrap();
        assert_eq!(report.solved, 2);
        let net = sim.network();
        assert_abs_diff_eq!(net.element_by_name("R1").unwrap().current.abs(), 2.0, epsilon = 1e-6);
        assert_abs_diff_eq!(net.element_by_name("R2").unwrap().current.abs(), 2.0, epsilon = 1e-6);
    }
}
