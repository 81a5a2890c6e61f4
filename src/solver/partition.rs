//! Splits a network into independently solvable subsystems.
//!
//! Two terminals belong to the same subsystem when they are the two ends of
//! one element, or when they sit on the same grid slot. Terminals without a
//! slot only join through their own element.

use std::collections::btree_map::Entry as BTreeEntry;
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};

use log::{debug, error};

use crate::circuit::{Network, SlotId};

use super::subsystem::Subsystem;

/// Union-find over node handles.
#[derive(Debug, Clone)]
pub struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSet {
    /// Create `size` singleton sets.
    pub fn new(size: usize) -> Self {
        Self {
            parent: (0..size).collect(),
            rank: vec![0; size],
        }
    }

    /// Canonical representative of `x`'s set (with path halving).
    pub fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    /// Merge the sets containing `a` and `b`.
    pub fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
    }

    /// Check if `a` and `b` are in the same set.
    pub fn connected(&mut self, a: usize, b: usize) -> bool {
        self.find(a) == self.find(b)
    }
}

/// Group every live element into subsystems keyed by their root node.
///
/// The result includes subsystems too small to solve; callers check
/// [`Subsystem::is_solvable`].
pub fn partition(network: &Network) -> BTreeMap<usize, Subsystem> {
    let mut sets = DisjointSet::new(network.node_capacity());
    let mut slot_roots: HashMap<SlotId, usize> = HashMap::new();

    for (_, element) in network.elements() {
        sets.union(element.node_l.0, element.node_r.0);

        for id in element.terminals() {
            let Some(node) = network.node(id) else {
                continue;
            };
            if !node.slot.is_valid() {
                debug!("{:?} terminal {} of {} is unplaced", node.terminal, id, element.name);
                continue;
            }
            match slot_roots.entry(node.slot) {
                Entry::Vacant(v) => {
                    v.insert(sets.find(id.0));
                }
                Entry::Occupied(o) => sets.union(*o.get(), id.0),
            }
        }
    }

    let mut subsystems = BTreeMap::new();
    for (id, element) in network.elements() {
        let root_l = sets.find(element.node_l.0);
        let root_r = sets.find(element.node_r.0);
        if root_l != root_r {
            error!(
                "{} {} has terminals in different components ({} vs {}), skipping",
                element.role(),
                element.name,
                root_l,
                root_r
            );
            continue;
        }

        let slot = |node| network.node(node).map(|n| n.slot).unwrap_or(SlotId::INVALID);
        let subsystem = match subsystems.entry(root_l) {
            BTreeEntry::Vacant(v) => v.insert(Subsystem::new(root_l)),
            BTreeEntry::Occupied(o) => o.into_mut(),
        };
        subsystem.push_element(
            id,
            [(element.node_l, slot(element.node_l)), (element.node_r, slot(element.node_r))],
        );
    }

    debug!(
        "partitioned {} elements into {} subsystems",
        network.element_count(),
        subsystems.len()
    );
    subsystems
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::Network;
    use crate::components::{Element, Resistor};

    fn resistor(net: &mut Network, name: &str, l: u64, r: u64) {
        net.add_element(name, Element::Resistor(Resistor::new(1.0)), [SlotId(l), SlotId(r)])
            .unwrap();
    }

    #[test]
    fn test_disjoint_set() {
        let mut sets = DisjointSet::new(6);
        sets.union(0, 1);
        sets.union(2, 3);
        sets.union(1, 3);
        assert!(sets.connected(0, 2));
        assert!(!sets.connected(0, 4));
        sets.union(4, 4);
        assert_eq!(sets.find(4), 4);
    }

    #[test]
    fn test_shared_slot_merges_elements() {
        let mut net = Network::new();
        resistor(&mut net, "R1", 1, 2);
        resistor(&mut net, "R2", 2, 3);
        let subsystems = partition(&net);
        assert_eq!(subsystems.len(), 1);
        let sub = subsystems.values().next().unwrap();
        assert_eq!(sub.element_count(), 2);
        assert_eq!(sub.node_count(), 3);
        assert!(sub.is_solvable());
    }

    #[test]
    fn test_disjoint_slots_stay_separate() {
        let mut net = Network::new();
        resistor(&mut net, "R1", 1, 2);
        resistor(&mut net, "R2", 3, 4);
        resistor(&mut net, "R3", 4, 5);
        let subsystems = partition(&net);
        let mut sizes: Vec<_> = subsystems.values().map(Subsystem::element_count).collect();
        sizes.sort_unstable();
        assert_eq!(sizes, vec![1, 2]);
    }

    #[test]
    fn test_unplaced_terminals_do_not_merge() {
        let mut net = Network::new();
        net.add_element("W1", Element::Wire, [SlotId(1), SlotId::INVALID]).unwrap();
        net.add_element("W2", Element::Wire, [SlotId::INVALID, SlotId(2)]).unwrap();
        let subsystems = partition(&net);
        assert_eq!(subsystems.len(), 2);
        assert!(subsystems.values().all(|s| !s.is_solvable()));
    }

    #[test]
    fn test_single_slot_loop_is_not_solvable() {
        let mut net = Network::new();
        resistor(&mut net, "R1", 7, 7);
        let subsystems = partition(&net);
        assert_eq!(subsystems.len(), 1);
        let sub = subsystems.values().next().unwrap();
        assert_eq!(sub.node_count(), 1);
        assert!(!sub.is_solvable());
    }
}
