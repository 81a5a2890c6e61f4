//! Element/node arena with change tracking.

use std::collections::HashMap;

use super::record::ElementRecord;
use super::types::{ElementId, NodeId, Point3, SlotId, Terminal};
use crate::components::{AcVoltageSource, Element, ElementRole};
use crate::dsl::BoardAst;
use crate::error::{CirsimError, Result};

/// A placed two-terminal element (a branch of the network graph).
#[derive(Debug, Clone)]
pub struct CircuitElement {
    /// Unique name
    pub name: String,
    /// Role and parameters
    pub element: Element,
    /// Left terminal
    pub node_l: NodeId,
    /// Right terminal
    pub node_r: NodeId,
    /// Branch current from the last tick
    pub current: f64,
    /// Branch voltage drop V_L - V_R from the last tick
    pub voltage: f64,
}

impl CircuitElement {
    /// Get the role tag.
    pub fn role(&self) -> ElementRole {
        self.element.role()
    }

    /// Both terminals, left first.
    pub fn terminals(&self) -> [NodeId; 2] {
        [self.node_l, self.node_r]
    }

    /// Energy currently held by a reactive element, from the last tick's outputs.
    pub fn stored_energy(&self) -> Option<f64> {
        match &self.element {
            Element::Capacitor(c) => Some(c.energy(self.voltage)),
            Element::Inductor(l) => Some(l.energy(self.current)),
            _ => None,
        }
    }
}

/// An element terminal (a vertex of the network graph).
#[derive(Debug, Clone)]
pub struct CircuitNode {
    /// Owning element
    pub element: ElementId,
    /// The other terminal of the owning element
    pub other: NodeId,
    /// Which side of the element this terminal is
    pub terminal: Terminal,
    /// Grid identity assigned by the placement layer
    pub slot: SlotId,
    /// Scene position, carried for records only
    pub position: Point3,
    /// Node voltage from the last tick
    pub voltage: f64,
}

/// Pending re-solve triggers raised by edits since the last tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetworkChanges {
    /// Elements or nodes were added/removed, or a slot was reassigned
    pub structure: bool,
    /// An AC source's amplitude or frequency was edited
    pub ac_sources: bool,
}

impl NetworkChanges {
    /// Check if nothing needs re-solving.
    pub fn is_empty(&self) -> bool {
        !self.structure && !self.ac_sources
    }
}

/// The live network: every placed element and its terminals.
///
/// Handles are indices into append-only arenas; removed entries leave a hole
/// so that outstanding handles never alias a different element.
#[derive(Debug, Default)]
pub struct Network {
    elements: Vec<Option<CircuitElement>>,
    nodes: Vec<Option<CircuitNode>>,
    names: HashMap<String, ElementId>,
    changes: NetworkChanges,
}

impl Network {
    /// Create an empty network.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a network from a parsed board description.
    pub fn from_ast(ast: &BoardAst) -> Result<Self> {
        let mut network = Network::new();

        for def in &ast.elements {
            let element = Element::from_def(def)?;
            let id = network.add_element(def.name.clone(), element, def.terminals)?;

            for node in network.element_nodes(id)? {
                let slot = network.nodes[node.0].as_ref().map(|n| n.slot);
                if let Some(&position) = slot.and_then(|s| ast.positions.get(&s)) {
                    network.set_position(node, position)?;
                }
            }
        }

        Ok(network)
    }

    /// Rebuild a network from element records.
    pub fn from_records(records: &[ElementRecord]) -> Result<Self> {
        let mut network = Network::new();

        for record in records {
            let id = network.add_element(record.name.clone(), record.element.clone(), record.slots)?;
            let [node_l, node_r] = network.element_nodes(id)?;
            network.set_position(node_l, record.positions[0])?;
            network.set_position(node_r, record.positions[1])?;
        }

        Ok(network)
    }

    /// Enumerate every element as a record for save/load.
    pub fn records(&self) -> Vec<ElementRecord> {
        self.elements()
            .map(|(_, e)| {
                let terminal = |id: NodeId| {
                    self.node(id)
                        .map(|n| (n.slot, n.position))
                        .unwrap_or((SlotId::INVALID, Point3::ORIGIN))
                };
                let (slot_l, pos_l) = terminal(e.node_l);
                let (slot_r, pos_r) = terminal(e.node_r);
                ElementRecord {
                    name: e.name.clone(),
                    element: e.element.clone(),
                    slots: [slot_l, slot_r],
                    positions: [pos_l, pos_r],
                }
            })
            .collect()
    }

    /// Place a new element with its two terminals on the given slots.
    pub fn add_element(
        &mut self,
        name: impl Into<String>,
        element: Element,
        slots: [SlotId; 2],
    ) -> Result<ElementId> {
        let name = name.into();
        if self.names.contains_key(&name) {
            return Err(CirsimError::DuplicateComponent { name });
        }
        element.validate(&name)?;

        let id = ElementId(self.elements.len());
        let node_l = NodeId(self.nodes.len());
        let node_r = NodeId(self.nodes.len() + 1);

        for (terminal, node, other, slot) in [
            (Terminal::Left, node_l, node_r, slots[0]),
            (Terminal::Right, node_r, node_l, slots[1]),
        ] {
            debug_assert_eq!(node.0, self.nodes.len());
            self.nodes.push(Some(CircuitNode {
                element: id,
                other,
                terminal,
                slot,
                position: Point3::ORIGIN,
                voltage: 0.0,
            }));
        }

        self.elements.push(Some(CircuitElement {
            name: name.clone(),
            element,
            node_l,
            node_r,
            current: 0.0,
            voltage: 0.0,
        }));
        self.names.insert(name, id);
        self.changes.structure = true;

        Ok(id)
    }

    /// Remove an element and its terminals.
    pub fn remove_element(&mut self, id: ElementId) -> Result<CircuitElement> {
        let element = self
            .elements
            .get_mut(id.0)
            .and_then(Option::take)
            .ok_or(CirsimError::ElementNotFound { element: id.0 })?;

        for node in element.terminals() {
            if let Some(slot) = self.nodes.get_mut(node.0) {
                *slot = None;
            }
        }
        self.names.remove(&element.name);
        self.changes.structure = true;

        Ok(element)
    }

    /// Get an element by handle.
    pub fn element(&self, id: ElementId) -> Option<&CircuitElement> {
        self.elements.get(id.0).and_then(Option::as_ref)
    }

    /// Mutable access for write-back; callers must not change roles or slots.
    pub(crate) fn element_mut(&mut self, id: ElementId) -> Option<&mut CircuitElement> {
        self.elements.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Find an element handle by name.
    pub fn find_element(&self, name: &str) -> Option<ElementId> {
        self.names.get(name).copied()
    }

    /// Get an element by name.
    pub fn element_by_name(&self, name: &str) -> Option<&CircuitElement> {
        self.find_element(name).and_then(|id| self.element(id))
    }

    /// Terminal handles of an element, left first.
    pub fn element_nodes(&self, id: ElementId) -> Result<[NodeId; 2]> {
        self.element(id)
            .map(CircuitElement::terminals)
            .ok_or(CirsimError::ElementNotFound { element: id.0 })
    }

    /// Edit an element's role or parameters.
    ///
    /// The edit is rolled back if the result does not validate. Changing an AC
    /// source (or turning an element into or out of one) raises the AC flag.
    /// Changing the role, a capacitor's charge or an inductor's current raises
    /// the structure flag so the solver reseeds its reactive state. Other
    /// parameter edits are picked up on the next tick without a flag.
    pub fn update_element(&mut self, id: ElementId, edit: impl FnOnce(&mut Element)) -> Result<()> {
        let entry = self
            .elements
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(CirsimError::ElementNotFound { element: id.0 })?;

        let before = entry.element.clone();
        edit(&mut entry.element);

        if let Err(e) = entry.element.validate(&entry.name) {
            entry.element = before;
            return Err(e);
        }

        let ac_before = match &before {
            Element::AcSource(s) => Some((s.amplitude, s.omega)),
            _ => None,
        };
        let ac_after = match &entry.element {
            Element::AcSource(s) => Some((s.amplitude, s.omega)),
            _ => None,
        };
        if ac_before != ac_after {
            self.changes.ac_sources = true;
        }

        let state = |element: &Element| match element {
            Element::Capacitor(c) => Some(c.charge),
            Element::Inductor(l) => Some(l.current),
            _ => None,
        };
        if before.role() != entry.element.role() || state(&before) != state(&entry.element) {
            self.changes.structure = true;
        }

        Ok(())
    }

    /// Set the amplitude and angular frequency of an AC source.
    pub fn set_ac_source(&mut self, id: ElementId, amplitude: f64, omega: f64) -> Result<()> {
        let name = self
            .element(id)
            .map(|e| e.name.clone())
            .ok_or(CirsimError::ElementNotFound { element: id.0 })?;

        let mut is_ac = true;
        self.update_element(id, |element| match element {
            Element::AcSource(s) => *s = AcVoltageSource::new(amplitude, omega),
            _ => is_ac = false,
        })?;

        if is_ac {
            Ok(())
        } else {
            Err(CirsimError::invalid_parameter(name, "amplitude", "element is not an AC source"))
        }
    }

    /// Get a node by handle.
    pub fn node(&self, id: NodeId) -> Option<&CircuitNode> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut CircuitNode> {
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Reassign a terminal to a grid slot (or unplace it with [`SlotId::INVALID`]).
    pub fn set_slot(&mut self, id: NodeId, slot: SlotId) -> Result<()> {
        let node = self
            .nodes
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(CirsimError::NodeNotFound { node: id.0 })?;

        if node.slot != slot {
            node.slot = slot;
            self.changes.structure = true;
        }
        Ok(())
    }

    /// Record a terminal's scene position.
    pub fn set_position(&mut self, id: NodeId, position: Point3) -> Result<()> {
        let node = self
            .node_mut(id)
            .ok_or(CirsimError::NodeNotFound { node: id.0 })?;
        node.position = position;
        Ok(())
    }

    /// Voltage of the terminals sitting on `slot`, from the last tick.
    pub fn slot_voltage(&self, slot: SlotId) -> Option<f64> {
        if !slot.is_valid() {
            return None;
        }
        self.nodes()
            .find(|(_, n)| n.slot == slot)
            .map(|(_, n)| n.voltage)
    }

    /// Iterate over live elements in handle order.
    pub fn elements(&self) -> impl Iterator<Item = (ElementId, &CircuitElement)> {
        self.elements
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.as_ref().map(|e| (ElementId(i), e)))
    }

    /// Iterate over live nodes in handle order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &CircuitNode)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, n)| n.as_ref().map(|n| (NodeId(i), n)))
    }

    /// Number of live elements.
    pub fn element_count(&self) -> usize {
        self.names.len()
    }

    /// Size of the node arena, including holes left by removals.
    pub fn node_capacity(&self) -> usize {
        self.nodes.len()
    }

    /// Check if there are no elements.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Flag a structural change made outside this API.
    pub fn mark_structure_changed(&mut self) {
        self.changes.structure = true;
    }

    /// Flag an AC parameter change made outside this API.
    pub fn mark_ac_changed(&mut self) {
        self.changes.ac_sources = true;
    }

    /// Changes recorded since the last [`Network::take_changes`].
    pub fn pending_changes(&self) -> NetworkChanges {
        self.changes
    }

    /// Drain the recorded changes.
    pub fn take_changes(&mut self) -> NetworkChanges {
        std::mem::take(&mut self.changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Capacitor, DcVoltageSource, Resistor};

    #[test]
    fn test_add_element_links_terminals() {
        let mut net = Network::new();
        let id = net
            .add_element("R1", Element::Resistor(Resistor::new(1.0)), [SlotId(3), SlotId(4)])
            .unwrap();
        let [l, r] = net.element_nodes(id).unwrap();

        let left = net.node(l).unwrap();
        assert_eq!(left.element, id);
        assert_eq!(left.other, r);
        assert_eq!(left.terminal, Terminal::Left);
        assert_eq!(left.slot, SlotId(3));
        assert_eq!(net.node(r).unwrap().other, l);
        assert_eq!(net.find_element("R1"), Some(id));
    }

    #[test]
    fn test_duplicate_and_invalid_elements_rejected() {
        let mut net = Network::new();
        net.add_element("R1", Element::Wire, [SlotId(0), SlotId(1)]).unwrap();
        assert!(matches!(
            net.add_element("R1", Element::Wire, [SlotId(0), SlotId(1)]),
            Err(CirsimError::DuplicateComponent { .. })
        ));
        assert!(net
            .add_element("R2", Element::Resistor(Resistor::new(-1.0)), [SlotId(0), SlotId(1)])
            .is_err());
        assert_eq!(net.element_count(), 1);
    }

    #[test]
    fn test_change_flags() {
        let mut net = Network::new();
        let id = net
            .add_element("V1", Element::AcSource(AcVoltageSource::new(1.0, 2.0)), [SlotId(0), SlotId(1)])
            .unwrap();
        assert!(net.take_changes().structure);
        assert!(net.take_changes().is_empty());

        net.set_ac_source(id, 2.0, 2.0).unwrap();
        assert_eq!(
            net.take_changes(),
            NetworkChanges {
                structure: false,
                ac_sources: true
            }
        );

        let [l, _] = net.element_nodes(id).unwrap();
        net.set_slot(l, SlotId(0)).unwrap();
        assert!(net.take_changes().is_empty());
        net.set_slot(l, SlotId(9)).unwrap();
        assert!(net.take_changes().structure);

        net.remove_element(id).unwrap();
        assert!(net.take_changes().structure);
        assert!(net.node(l).is_none());
        assert!(net.is_empty());
    }

    #[test]
    fn test_update_element_rolls_back_invalid_edit() {
        let mut net = Network::new();
        let id = net
            .add_element("C1", Element::Capacitor(Capacitor::new(1.0)), [SlotId(0), SlotId(1)])
            .unwrap();
        let result = net.update_element(id, |e| {
            if let Element::Capacitor(c) = e {
                c.capacitance = 0.0;
            }
        });
        assert!(result.is_err());
        assert_eq!(net.element(id).unwrap().element, Element::Capacitor(Capacitor::new(1.0)));
        assert!(net.set_ac_source(id, 1.0, 1.0).is_err());
    }

    #[test]
    fn test_reactive_state_edit_raises_structure_flag() {
        let mut net = Network::new();
        let c = net
            .add_element("C1", Element::Capacitor(Capacitor::new(1.0)), [SlotId(0), SlotId(1)])
            .unwrap();
        let r = net
            .add_element("R1", Element::Resistor(Resistor::new(1.0)), [SlotId(0), SlotId(1)])
            .unwrap();
        net.take_changes();

        // Capacitance alone keeps the stored charge
        net.update_element(c, |e| *e = Element::Capacitor(Capacitor::new(2.0))).unwrap();
        assert!(net.take_changes().is_empty());

        net.update_element(c, |e| *e = Element::Capacitor(Capacitor::with_charge(2.0, 5.0)))
            .unwrap();
        assert!(net.take_changes().structure);

        net.update_element(r, |e| *e = Element::Capacitor(Capacitor::new(1.0))).unwrap();
        assert!(net.take_changes().structure);
    }

    #[test]
    fn test_handles_not_reused() {
        let mut net = Network::new();
        let a = net.add_element("A", Element::Wire, [SlotId(0), SlotId(1)]).unwrap();
        net.remove_element(a).unwrap();
        let b = net
            .add_element("B", Element::DcSource(DcVoltageSource::new(1.0)), [SlotId(0), SlotId(1)])
            .unwrap();
        assert_ne!(a, b);
        assert!(net.element(a).is_none());
        assert_eq!(net.node_capacity(), 4);
        assert_eq!(net.nodes().count(), 2);
    }

    #[test]
    fn test_from_ast_and_records_round_trip() {
        let ast = crate::dsl::parse(".pos 1 0.5 0 0\nV1 0 1 AC 1 w=3\nR1 1 0 2k\n").unwrap();
        let net = Network::from_ast(&ast).unwrap();
        let records = net.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].slots, [SlotId(0), SlotId(1)]);
        assert_eq!(records[0].positions[1], Point3::new(0.5, 0.0, 0.0));

        let rebuilt = Network::from_records(&records).unwrap();
        assert_eq!(rebuilt.records(), records);
    }
}
