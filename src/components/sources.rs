//! Ideal voltage sources.

use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};

/// An ideal DC voltage source.
///
/// The source raises the left terminal above the right one: V_L - V_R = voltage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DcVoltageSource {
    pub voltage: f64,
}

impl DcVoltageSource {
    pub fn new(voltage: f64) -> Self {
        Self { voltage }
    }
}

/// An ideal sinusoidal voltage source.
///
/// Contributes a phasor of `amplitude` (zero phase) at angular frequency
/// `omega`. Sources sharing an exact `omega` are solved in one frequency-domain
/// system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcVoltageSource {
    /// Peak amplitude in volts
    pub amplitude: f64,
    /// Angular frequency in rad/s
    pub omega: f64,
}

impl AcVoltageSource {
    pub fn new(amplitude: f64, omega: f64) -> Self {
        Self { amplitude, omega }
    }

    /// Create a source from an ordinary frequency in hertz.
    pub fn from_hertz(amplitude: f64, hertz: f64) -> Self {
        Self::new(amplitude, TAU * hertz)
    }

    /// Instantaneous open-circuit voltage at `time`.
    pub fn voltage_at(&self, time: f64) -> f64 {
        self.amplitude * (self.omega * time).cos()
    }

    /// Check whether this source drives the given frequency group.
    pub fn drives(&self, omega: f64) -> bool {
        self.omega.to_bits() == omega.to_bits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_ac_from_hertz() {
        let s = AcVoltageSource::from_hertz(1.0, 50.0);
        assert_relative_eq!(s.omega, 100.0 * std::f64::consts::PI);
        assert!(s.drives(s.omega));
        assert!(!s.drives(s.omega + 1e-9));
    }

    #[test]
    fn test_ac_voltage_at() {
        let s = AcVoltageSource::new(2.0, std::f64::consts::PI);
        assert_relative_eq!(s.voltage_at(0.0), 2.0);
        assert_relative_eq!(s.voltage_at(1.0), -2.0);
    }
}
