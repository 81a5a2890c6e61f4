//! One electrically connected piece of the network and its solver state.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use log::{debug, error, trace, warn};
use num_complex::Complex64;

use crate::circuit::{ElementId, Network, NodeId, SlotId};
use crate::components::Element;
use crate::error::CirsimError;

use super::mna::{BranchSolution, BranchSystem, Incidence};
use super::simulator::{SimulatorConfig, TickParams};

/// Identity of a local node: every terminal on one slot, or a lone unplaced terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum NodeKey {
    Slot(SlotId),
    Floating(NodeId),
}

/// A node of the subsystem's reduced graph.
#[derive(Debug, Clone)]
pub struct LocalNode {
    key: NodeKey,
    members: Vec<NodeId>,
}

impl LocalNode {
    /// Grid slot shared by the members, if placed.
    pub fn slot(&self) -> Option<SlotId> {
        match self.key {
            NodeKey::Slot(slot) => Some(slot),
            NodeKey::Floating(_) => None,
        }
    }

    /// Element terminals merged into this node.
    pub fn members(&self) -> &[NodeId] {
        &self.members
    }
}

/// Phasor solution for every AC source sharing one angular frequency.
#[derive(Debug, Clone)]
pub struct AcBand {
    pub omega: f64,
    /// Branch indices of the sources driving this band
    pub sources: Vec<usize>,
    pub solution: BranchSolution<Complex64>,
}

/// A connected component of the network.
///
/// Node 0 is the ground reference. Branch `e` corresponds to element
/// `elements()[e]`, oriented from its left to its right terminal.
#[derive(Debug, Clone)]
pub struct Subsystem {
    root: usize,
    nodes: Vec<LocalNode>,
    node_index: HashMap<NodeKey, usize>,
    elements: Vec<ElementId>,
    ends: Vec<(usize, usize)>,
    system: BranchSystem<f64>,
    prev_charge: Vec<f64>,
    prev_current: Vec<f64>,
    dc: BranchSolution<f64>,
    bands: Vec<AcBand>,
    output: BranchSolution<f64>,
    dc_shorted: bool,
    ac_shorted: bool,
}

impl Subsystem {
    pub(crate) fn new(root: usize) -> Self {
        Self {
            root,
            nodes: Vec::new(),
            node_index: HashMap::new(),
            elements: Vec::new(),
            ends: Vec::new(),
            system: BranchSystem::new(Incidence::default()),
            prev_charge: Vec::new(),
            prev_current: Vec::new(),
            dc: BranchSolution::zeros(0, 0),
            bands: Vec::new(),
            output: BranchSolution::zeros(0, 0),
            dc_shorted: false,
            ac_shorted: false,
        }
    }

    fn local_node(&mut self, node: NodeId, slot: SlotId) -> usize {
        let key = if slot.is_valid() {
            NodeKey::Slot(slot)
        } else {
            NodeKey::Floating(node)
        };
        let index = match self.node_index.entry(key) {
            Entry::Occupied(o) => *o.get(),
            Entry::Vacant(v) => {
                self.nodes.push(LocalNode {
                    key,
                    members: Vec::new(),
                });
                *v.insert(self.nodes.len() - 1)
            }
        };
        self.nodes[index].members.push(node);
        index
    }

    /// Append an element as a branch between its terminals' local nodes.
    pub(crate) fn push_element(&mut self, id: ElementId, terminals: [(NodeId, SlotId); 2]) {
        let [(node_l, slot_l), (node_r, slot_r)] = terminals;
        let l = self.local_node(node_l, slot_l);
        let r = self.local_node(node_r, slot_r);
        self.elements.push(id);
        self.ends.push((l, r));
    }

    /// Root node handle the subsystem was grouped under.
    pub fn root(&self) -> usize {
        self.root
    }

    pub fn elements(&self) -> &[ElementId] {
        &self.elements
    }

    pub fn nodes(&self) -> &[LocalNode] {
        &self.nodes
    }

    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the subsystem spans at least two distinct slots.
    pub fn is_solvable(&self) -> bool {
        !self.elements.is_empty() && self.nodes.iter().filter(|n| n.slot().is_some()).count() >= 2
    }

    /// Build the incidence matrix and seed reactive state from the elements.
    pub fn init(&mut self, network: &Network) {
        let mut incidence = Incidence::new(self.nodes.len());
        for &(l, r) in &self.ends {
            incidence.push_branch(l, r);
        }
        self.system = BranchSystem::new(incidence);

        let m = self.elements.len();
        self.prev_charge = vec![0.0; m];
        self.prev_current = vec![0.0; m];
        for (e, id) in self.elements.iter().enumerate() {
            match network.element(*id).map(|el| &el.element) {
                Some(Element::Capacitor(c)) => self.prev_charge[e] = c.charge,
                Some(Element::Inductor(l)) => self.prev_current[e] = l.current,
                _ => {}
            }
        }

        self.dc = BranchSolution::zeros(self.nodes.len(), m);
        self.output = self.dc.clone();
        self.bands.clear();
        self.dc_shorted = false;
        self.ac_shorted = false;

        debug!(
            "subsystem {}: {} nodes, {} branches",
            self.root,
            self.nodes.len(),
            m
        );
    }

    fn debug_check_dimensions(&self) {
        let m = self.elements.len();
        debug_assert_eq!(self.ends.len(), m, "subsystem {}: branch ends", self.root);
        debug_assert_eq!(self.system.incidence.branch_count(), m, "subsystem {}: incidence", self.root);
        debug_assert_eq!(self.system.incidence.node_count(), self.nodes.len());
        debug_assert_eq!(self.prev_charge.len(), m);
        debug_assert_eq!(self.prev_current.len(), m);
    }

    /// Group AC sources by angular frequency and solve each band.
    pub fn solve_ac(&mut self, network: &Network, config: &SimulatorConfig) {
        self.debug_check_dimensions();
        let mut groups: Vec<(f64, Vec<usize>)> = Vec::new();
        for (e, id) in self.elements.iter().enumerate() {
            let Some(omega) = network.element(*id).and_then(|el| el.element.ac_omega()) else {
                continue;
            };
            match groups.iter_mut().find(|(w, _)| *w == omega) {
                Some((_, sources)) => sources.push(e),
                None => groups.push((omega, vec![e])),
            }
        }

        self.bands.clear();
        self.ac_shorted = false;

        for (omega, sources) in groups {
            let mut band = BranchSystem::<Complex64>::new(self.system.incidence.clone());
            for (e, id) in self.elements.iter().enumerate() {
                if let Some(el) = network.element(*id) {
                    band.stamp(e, el.element.ac_stamp(omega, config.wire_conductance));
                }
            }

            let solution = match band.solve(config.pivot_tolerance) {
                Ok(solution) if solution.is_finite() => {
                    if solution
                        .branch_currents
                        .iter()
                        .any(|i| i.norm() > config.short_circuit_current)
                    {
                        self.ac_shorted = true;
                    }
                    solution
                }
                Ok(_) => {
                    warn!("subsystem {}: non-finite phasors at omega={}", self.root, omega);
                    self.ac_shorted = true;
                    BranchSolution::zeros(self.nodes.len(), self.elements.len())
                }
                Err(e @ CirsimError::DimensionMismatch { .. }) => {
                    error!("subsystem {}: {}", self.root, e);
                    self.ac_shorted = true;
                    BranchSolution::zeros(self.nodes.len(), self.elements.len())
                }
                Err(e) => {
                    warn!("subsystem {}: AC solve at omega={} failed: {}", self.root, omega, e);
                    self.ac_shorted = true;
                    BranchSolution::zeros(self.nodes.len(), self.elements.len())
                }
            };

            trace!("subsystem {}: band omega={} with {} sources", self.root, omega, sources.len());
            self.bands.push(AcBand {
                omega,
                sources,
                solution,
            });
        }
    }

    /// Advance one tick: DC/transient solve, reactive state update and AC superposition.
    ///
    /// Returns whether the subsystem is shorted this tick.
    pub fn update(&mut self, network: &Network, params: TickParams, config: &SimulatorConfig) -> bool {
        self.debug_check_dimensions();
        self.system.clear();
        for (e, id) in self.elements.iter().enumerate() {
            if let Some(el) = network.element(*id) {
                let stamp = el.element.dc_stamp(
                    params.delta,
                    config.wire_conductance,
                    self.prev_charge[e],
                    self.prev_current[e],
                );
                self.system.stamp(e, stamp);
            }
        }

        match self.system.solve(config.pivot_tolerance) {
            Ok(solution) if solution.is_finite() => {
                self.dc_shorted = solution
                    .branch_currents
                    .iter()
                    .any(|i| i.abs() > config.short_circuit_current);
                if self.dc_shorted {
                    warn!("subsystem {}: short circuit", self.root);
                }

                self.prev_current.copy_from_slice(&solution.branch_currents);
                for (e, id) in self.elements.iter().enumerate() {
                    if let Some(Element::Capacitor(c)) = network.element(*id).map(|el| &el.element) {
                        self.prev_charge[e] = c.charge_at(solution.branch_voltages[e]);
                    }
                }
                self.dc = solution;
            }
            Ok(_) => {
                warn!("subsystem {}: non-finite DC solution", self.root);
                self.dc_shorted = true;
                self.dc = BranchSolution::zeros(self.nodes.len(), self.elements.len());
            }
            Err(e @ CirsimError::DimensionMismatch { .. }) => {
                error!("subsystem {}: {}", self.root, e);
                self.dc_shorted = true;
                self.dc = BranchSolution::zeros(self.nodes.len(), self.elements.len());
            }
            Err(e) => {
                warn!("subsystem {}: DC solve failed: {}", self.root, e);
                self.dc_shorted = true;
                self.dc = BranchSolution::zeros(self.nodes.len(), self.elements.len());
            }
        }

        self.output = self.dc.clone();
        for band in &self.bands {
            let rotation = Complex64::from_polar(1.0, band.omega * params.time);
            let phasors = &band.solution;
            for (out, x) in self.output.node_voltages.iter_mut().zip(&phasors.node_voltages) {
                *out += (x * rotation).re;
            }
            for (out, x) in self.output.branch_currents.iter_mut().zip(&phasors.branch_currents) {
                *out += (x * rotation).re;
            }
            for (out, x) in self.output.branch_voltages.iter_mut().zip(&phasors.branch_voltages) {
                *out += (x * rotation).re;
            }
        }

        self.shorted()
    }

    /// Copy this tick's results and reactive state onto the network.
    pub fn write_back(&self, network: &mut Network, delta: f64) {
        for (node, &voltage) in self.nodes.iter().zip(&self.output.node_voltages) {
            for &member in &node.members {
                if let Some(n) = network.node_mut(member) {
                    n.voltage = voltage;
                }
            }
        }

        for (e, id) in self.elements.iter().enumerate() {
            let Some(el) = network.element_mut(*id) else {
                continue;
            };
            let current = self.output.branch_currents[e];
            el.current = current;
            el.voltage = self.output.branch_voltages[e];
            match &mut el.element {
                Element::Resistor(r) => r.dissipate(current, delta),
                Element::Capacitor(c) => c.charge = self.prev_charge[e],
                Element::Inductor(l) => l.current = self.prev_current[e],
                _ => {}
            }
        }
    }

    /// Zero the outputs of every member, for subsystems that are not solved.
    pub fn clear_outputs(&self, network: &mut Network) {
        for node in &self.nodes {
            for &member in &node.members {
                if let Some(n) = network.node_mut(member) {
                    n.voltage = 0.0;
                }
            }
        }
        for id in &self.elements {
            if let Some(el) = network.element_mut(*id) {
                el.current = 0.0;
                el.voltage = 0.0;
            }
        }
    }

    /// Check if the last solve saw a short circuit or a singular system.
    pub fn shorted(&self) -> bool {
        self.dc_shorted || self.ac_shorted
    }

    /// DC/transient part of the last solve.
    pub fn dc_solution(&self) -> &BranchSolution<f64> {
        &self.dc
    }

    /// Phasor solutions, one per distinct AC frequency.
    pub fn ac_bands(&self) -> &[AcBand] {
        &self.bands
    }

    /// Time-domain result of the last tick.
    pub fn output(&self) -> &BranchSolution<f64> {
        &self.output
    }

    /// Local index of the node holding `slot`.
    pub fn slot_index(&self, slot: SlotId) -> Option<usize> {
        self.node_index.get(&NodeKey::Slot(slot)).copied()
    }

    /// Branch index of an element.
    pub fn branch_index(&self, id: ElementId) -> Option<usize> {
        self.elements.iter().position(|&e| e == id)
    }
}
