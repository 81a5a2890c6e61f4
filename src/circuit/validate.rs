//! Network validation.

use log::debug;

use crate::error::{CirsimError, Result};

use super::Network;

/// Validate a network before handing it to the simulator.
///
/// Checks:
/// - The network has at least one element
/// - Every element's parameters are solvable
///
/// Unplaced terminals are not an error; they are logged and the tick driver
/// leaves them floating.
pub fn validate_network(network: &Network) -> Result<()> {
    if network.is_empty() {
        return Err(CirsimError::InvalidSimulationParam {
            message: "network has no elements".to_string(),
        });
    }

    for (_, element) in network.elements() {
        element.element.validate(&element.name)?;
    }

    let unplaced = network.nodes().filter(|(_, n)| !n.slot.is_valid()).count();
    if unplaced > 0 {
        debug!("network has {} unplaced terminal(s)", unplaced);
    }

    Ok(())
}
