//! Core handle types for the network model.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable handle to a circuit node (an element terminal).
///
/// Handles index the network's node arena and are never reused after the
/// node is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "N{}", self.0)
    }
}

/// Stable handle to a circuit element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub usize);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

/// Grid identity of a terminal.
///
/// Produced by the placement layer's spatial quantization. Two nodes with the
/// same slot are the same electrical point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotId(pub u64);

impl SlotId {
    /// Sentinel for a terminal that has not been placed on the grid.
    pub const INVALID: SlotId = SlotId(u64::MAX);

    /// Check if this slot refers to a grid position.
    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }
}

impl Default for SlotId {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "S{}", self.0)
        } else {
            write!(f, "NC")
        }
    }
}

/// Position of a terminal in scene space.
///
/// The solver never reads it; it is carried so element records can
/// round-trip through save/load.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub const ORIGIN: Point3 = Point3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Which side of an element a terminal sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Terminal {
    Left,
    Right,
}
