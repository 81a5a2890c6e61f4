//! Network model: elements, terminals and their grid slots.
//!
//! The [`Network`] is what the placement layer edits. Elements and nodes are
//! addressed by stable integer handles; a node's owning element and its
//! sibling terminal are handle fields. Edits record [`NetworkChanges`] that
//! the tick driver drains to decide what to rebuild.

mod graph;
mod record;
mod types;
mod validate;

pub use graph::{CircuitElement, CircuitNode, Network, NetworkChanges};
pub use record::ElementRecord;
pub use types::*;
pub use validate::validate_network;
