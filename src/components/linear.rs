//! Linear passive elements: Resistor, Capacitor, Inductor.

use std::f64::consts::PI;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// Default permittivity-like constant for plate-derived capacitance.
pub const DEFAULT_PLATE_CONSTANT: f64 = 0.1;

/// Default permeability-like constant for coil-derived inductance.
pub const DEFAULT_COIL_CONSTANT: f64 = 1.0;

/// A resistor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resistor {
    /// Resistance in ohms
    pub resistance: f64,
    /// Energy dissipated so far (joules), accumulated every tick
    #[serde(skip)]
    pub heat: f64,
}

impl Resistor {
    /// Create a new resistor.
    pub fn new(resistance: f64) -> Self {
        Self {
            resistance,
            heat: 0.0,
        }
    }

    /// Get the conductance (1/R).
    pub fn conductance(&self) -> f64 {
        1.0 / self.resistance
    }

    /// Accumulate the heat dissipated by `current` over `dt`.
    ///
    /// Q_heat += R * I^2 * dt
    pub fn dissipate(&mut self, current: f64, dt: f64) {
        self.heat += self.resistance * current * current * dt;
    }
}

/// A capacitor.
///
/// The transient model is the backward-Euler companion: a conductance
/// G = C/dt in series with a voltage source equal to the voltage the stored
/// charge produces on the *current* capacitance. Tracking charge instead of
/// the previous voltage keeps Q constant when C is edited mid-simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capacitor {
    /// Capacitance in farads
    pub capacitance: f64,
    /// Stored charge in coulombs (companion-model state)
    #[serde(skip)]
    pub charge: f64,
}

impl Capacitor {
    /// Create a new, uncharged capacitor.
    pub fn new(capacitance: f64) -> Self {
        Self {
            capacitance,
            charge: 0.0,
        }
    }

    /// Create a capacitor with an initial charge.
    pub fn with_charge(capacitance: f64, charge: f64) -> Self {
        Self {
            capacitance,
            charge,
        }
    }

    /// Derive the capacitance of a square parallel-plate capacitor.
    ///
    /// C = k * edge^2 / spacing
    pub fn from_plates(edge: f64, spacing: f64, constant: f64) -> Self {
        Self::new(constant * edge * edge / spacing)
    }

    /// Companion conductance for a time step.
    pub fn conductance(&self, dt: f64) -> f64 {
        self.capacitance / dt
    }

    /// Companion source voltage for a given stored charge (V = Q/C).
    pub fn voltage_for_charge(&self, charge: f64) -> f64 {
        charge / self.capacitance
    }

    /// Charge held at a given branch voltage (Q = C*V).
    pub fn charge_at(&self, voltage: f64) -> f64 {
        self.capacitance * voltage
    }

    /// Admittance at angular frequency `omega` (jwC).
    pub fn admittance(&self, omega: f64) -> Complex64 {
        Complex64::new(0.0, omega * self.capacitance)
    }

    /// Energy stored at a given branch voltage.
    ///
    /// W = 0.5 * C * V^2
    pub fn energy(&self, voltage: f64) -> f64 {
        0.5 * self.capacitance * voltage * voltage
    }
}

/// An inductor.
///
/// The transient model is the backward-Euler companion: a conductance
/// G = dt/L in parallel with a current source carrying the previous branch
/// current.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inductor {
    /// Inductance in henries
    pub inductance: f64,
    /// Branch current from the last solved step (companion-model state)
    #[serde(skip)]
    pub current: f64,
}

impl Inductor {
    /// Create a new inductor with no current flowing.
    pub fn new(inductance: f64) -> Self {
        Self {
            inductance,
            current: 0.0,
        }
    }

    /// Create an inductor with an initial branch current.
    pub fn with_current(inductance: f64, current: f64) -> Self {
        Self {
            inductance,
            current,
        }
    }

    /// Derive the inductance of a solenoid.
    ///
    /// L = k * N^2 * (pi * r^2) / length
    pub fn from_coil(turns: f64, radius: f64, length: f64, constant: f64) -> Self {
        let area = PI * radius * radius;
        Self::new(constant * turns * turns * area / length)
    }

    /// Companion conductance for a time step.
    pub fn conductance(&self, dt: f64) -> f64 {
        dt / self.inductance
    }

    /// Admittance at angular frequency `omega`.
    ///
    /// Z = jwL, so Y = -j/(wL).
    pub fn admittance(&self, omega: f64) -> Complex64 {
        Complex64::new(0.0, -1.0 / (omega * self.inductance))
    }

    /// Energy stored at a given branch current.
    ///
    /// W = 0.5 * L * I^2
    pub fn energy(&self, current: f64) -> f64 {
        0.5 * self.inductance * current * current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_resistor_conductance() {
        let r = Resistor::new(1000.0);
        assert_relative_eq!(r.conductance(), 0.001);
    }

    #[test]
    fn test_resistor_heat_accumulates() {
        let mut r = Resistor::new(2.0);
        r.dissipate(0.5, 0.1);
        r.dissipate(-0.5, 0.1);
        // 2 * 0.25 * 0.1 twice
        assert_relative_eq!(r.heat, 0.1);
    }

    #[test]
    fn test_capacitor_companion_model() {
        let c = Capacitor::with_charge(1e-6, 2e-6);
        let dt = 1e-3;
        assert_relative_eq!(c.conductance(dt), 1e-3);
        assert_relative_eq!(c.voltage_for_charge(c.charge), 2.0);
        assert_relative_eq!(c.charge_at(3.0), 3e-6);
        assert_relative_eq!(c.energy(2.0), 2e-6);
    }

    #[test]
    fn test_capacitor_from_plates() {
        let c = Capacitor::from_plates(0.1, 0.05, DEFAULT_PLATE_CONSTANT);
        assert_relative_eq!(c.capacitance, 0.1 * 0.01 / 0.05);
    }

    #[test]
    fn test_inductor_companion_and_admittance() {
        let l = Inductor::new(0.5);
        assert_relative_eq!(l.conductance(1e-3), 2e-3);
        let y = l.admittance(4.0);
        assert_relative_eq!(y.re, 0.0);
        assert_relative_eq!(y.im, -0.5);
        assert_relative_eq!(l.energy(2.0), 1.0);
    }

    #[test]
    fn test_inductor_from_coil() {
        let l = Inductor::from_coil(5.0, 0.03, 0.1, DEFAULT_COIL_CONSTANT);
        assert_relative_eq!(l.inductance, 25.0 * PI * 0.0009 / 0.1, max_relative = 1e-12);
    }
}
