//! Abstract Syntax Tree types for the board description.

use std::collections::HashMap;

use crate::circuit::{Point3, SlotId};

/// Complete AST representation of a parsed board.
#[derive(Debug, Clone, Default)]
pub struct BoardAst {
    /// All element instances, in file order
    pub elements: Vec<ElementDef>,
    /// Terminal positions declared with `.pos`, keyed by slot
    pub positions: HashMap<SlotId, Point3>,
    /// Element names selected with `.probe`
    pub probes: Vec<String>,
}

impl BoardAst {
    /// Create a new empty board AST.
    pub fn new() -> Self {
        Self::default()
    }
}

/// An element definition from the board description.
#[derive(Debug, Clone)]
pub struct ElementDef {
    /// Element type (W, R, C, L, V)
    pub element_type: ElementType,
    /// Unique element name
    pub name: String,
    /// Slots of the left and right terminals
    pub terminals: [SlotId; 2],
    /// Primary value (resistance, capacitance, voltage, amplitude, ...)
    pub value: Option<f64>,
    /// Set when the source was declared with the `AC` keyword
    pub ac: bool,
    /// Additional `key=value` parameters
    pub params: HashMap<String, f64>,
    /// Source line number for error reporting
    pub line: usize,
}

/// Element types supported by the board description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    /// Ideal wire
    Wire,
    /// Resistor
    Resistor,
    /// Capacitor
    Capacitor,
    /// Inductor
    Inductor,
    /// Voltage source (DC, or AC with the `AC` keyword)
    VoltageSource,
}

impl ElementType {
    /// Parse an element type from its name prefix.
    pub fn from_prefix(prefix: char) -> Option<Self> {
        match prefix.to_ascii_uppercase() {
            'W' => Some(Self::Wire),
            'R' => Some(Self::Resistor),
            'C' => Some(Self::Capacitor),
            'L' => Some(Self::Inductor),
            'V' => Some(Self::VoltageSource),
            _ => None,
        }
    }
}
