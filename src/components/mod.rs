//! Element models for the network solver.
//!
//! Every circuit element is one variant of [`Element`]:
//! - Wire (ideal connection, modelled as a very large conductance)
//! - Linear: Resistor, Capacitor, Inductor
//! - Sources: DC voltage source, AC voltage source
//!
//! Each variant knows how it contributes one branch to the DC/transient
//! system ([`Element::dc_stamp`]) and to a frequency-domain system
//! ([`Element::ac_stamp`]).

mod linear;
mod sources;

pub use linear::{Capacitor, Inductor, Resistor, DEFAULT_COIL_CONSTANT, DEFAULT_PLATE_CONSTANT};
pub use sources::{AcVoltageSource, DcVoltageSource};

use std::fmt;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::dsl::{ElementDef, ElementType};
use crate::error::{CirsimError, Result};

/// Role tag of an element, without its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementRole {
    Wire,
    Resistor,
    DcVoltageSource,
    AcVoltageSource,
    Inductor,
    Capacitor,
}

impl fmt::Display for ElementRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ElementRole::Wire => "wire",
            ElementRole::Resistor => "resistor",
            ElementRole::DcVoltageSource => "DC voltage",
            ElementRole::AcVoltageSource => "AC voltage",
            ElementRole::Inductor => "inductor",
            ElementRole::Capacitor => "capacitor",
        };
        f.write_str(name)
    }
}

/// One branch's contribution to a branch-form MNA system.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BranchStamp<T> {
    /// Diagonal entry of the admittance matrix
    pub admittance: T,
    /// Entry of the branch voltage-source vector
    pub voltage_source: T,
    /// Entry of the branch current-source vector
    pub current_source: T,
}

/// A circuit element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Element {
    Wire,
    Resistor(Resistor),
    DcSource(DcVoltageSource),
    AcSource(AcVoltageSource),
    Inductor(Inductor),
    Capacitor(Capacitor),
}

impl Element {
    /// Create an element from a board definition.
    pub fn from_def(def: &ElementDef) -> Result<Self> {
        let element = match def.element_type {
            ElementType::Wire => Element::Wire,

            ElementType::Resistor => {
                let value = def.value.ok_or_else(|| {
                    CirsimError::invalid_component(&def.name, def.line, "resistor requires a value")
                })?;
                Element::Resistor(Resistor::new(value))
            }

            ElementType::Capacitor => {
                let mut capacitor = match def.value {
                    Some(value) => Capacitor::new(value),
                    None => {
                        let (edge, spacing) = match (def.params.get("edge"), def.params.get("spacing")) {
                            (Some(&edge), Some(&spacing)) => (edge, spacing),
                            _ => {
                                return Err(CirsimError::invalid_component(
                                    &def.name,
                                    def.line,
                                    "capacitor requires a value or edge= and spacing=",
                                ))
                            }
                        };
                        let k = def.params.get("k").copied().unwrap_or(DEFAULT_PLATE_CONSTANT);
                        Capacitor::from_plates(edge, spacing, k)
                    }
                };
                capacitor.charge = def.params.get("q").copied().unwrap_or(0.0);
                Element::Capacitor(capacitor)
            }

            ElementType::Inductor => {
                let mut inductor = match def.value {
                    Some(value) => Inductor::new(value),
                    None => {
                        let turns = def.params.get("turns");
                        let radius = def.params.get("radius");
                        let length = def.params.get("length");
                        let (turns, radius, length) = match (turns, radius, length) {
                            (Some(&n), Some(&r), Some(&l)) => (n, r, l),
                            _ => {
                                return Err(CirsimError::invalid_component(
                                    &def.name,
                                    def.line,
                                    "inductor requires a value or turns=, radius= and length=",
                                ))
                            }
                        };
                        let k = def.params.get("k").copied().unwrap_or(DEFAULT_COIL_CONSTANT);
                        Inductor::from_coil(turns, radius, length, k)
                    }
                };
                inductor.current = def.params.get("i").copied().unwrap_or(0.0);
                Element::Inductor(inductor)
            }

            ElementType::VoltageSource if def.ac => {
                let amplitude = def.value.unwrap_or(1.0);
                let source = if let Some(&omega) = def.params.get("w").or(def.params.get("omega")) {
                    AcVoltageSource::new(amplitude, omega)
                } else if let Some(&hertz) = def.params.get("f") {
                    AcVoltageSource::from_hertz(amplitude, hertz)
                } else {
                    return Err(CirsimError::invalid_component(
                        &def.name,
                        def.line,
                        "AC source requires w= (rad/s) or f= (Hz)",
                    ));
                };
                Element::AcSource(source)
            }

            ElementType::VoltageSource => {
                Element::DcSource(DcVoltageSource::new(def.value.unwrap_or(0.0)))
            }
        };

        element.validate(&def.name)?;
        Ok(element)
    }

    /// Get the role tag.
    pub fn role(&self) -> ElementRole {
        match self {
            Element::Wire => ElementRole::Wire,
            Element::Resistor(_) => ElementRole::Resistor,
            Element::DcSource(_) => ElementRole::DcVoltageSource,
            Element::AcSource(_) => ElementRole::AcVoltageSource,
            Element::Inductor(_) => ElementRole::Inductor,
            Element::Capacitor(_) => ElementRole::Capacitor,
        }
    }

    /// Check that the element's parameters can be solved.
    pub fn validate(&self, name: &str) -> Result<()> {
        fn positive(name: &str, param: &str, value: f64) -> Result<()> {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(CirsimError::invalid_parameter(
                    name,
                    param,
                    format!("must be finite and positive, got {}", value),
                ))
            }
        }

        fn finite(name: &str, param: &str, value: f64) -> Result<()> {
            if value.is_finite() {
                Ok(())
            } else {
                Err(CirsimError::invalid_parameter(name, param, "must be finite"))
            }
        }

        match self {
            Element::Wire => Ok(()),
            Element::Resistor(r) => positive(name, "resistance", r.resistance),
            Element::DcSource(v) => finite(name, "voltage", v.voltage),
            Element::AcSource(v) => {
                finite(name, "amplitude", v.amplitude)?;
                positive(name, "omega", v.omega)
            }
            Element::Inductor(l) => {
                positive(name, "inductance", l.inductance)?;
                finite(name, "current", l.current)
            }
            Element::Capacitor(c) => {
                positive(name, "capacitance", c.capacitance)?;
                finite(name, "charge", c.charge)
            }
        }
    }

    /// Branch contribution to the DC/transient system.
    ///
    /// `prev_charge` and `prev_current` are the companion-model states the
    /// owning subsystem keeps for this branch. AC sources appear as wires.
    pub fn dc_stamp(
        &self,
        dt: f64,
        wire_conductance: f64,
        prev_charge: f64,
        prev_current: f64,
    ) -> BranchStamp<f64> {
        let wire = BranchStamp {
            admittance: wire_conductance,
            voltage_source: 0.0,
            current_source: 0.0,
        };

        match self {
            Element::Wire | Element::AcSource(_) => wire,
            Element::DcSource(v) => BranchStamp {
                voltage_source: v.voltage,
                ..wire
            },
            Element::Resistor(r) => BranchStamp {
                admittance: r.conductance(),
                ..wire
            },
            Element::Capacitor(c) => BranchStamp {
                admittance: c.conductance(dt),
                voltage_source: c.voltage_for_charge(prev_charge),
                current_source: 0.0,
            },
            Element::Inductor(l) => BranchStamp {
                admittance: l.conductance(dt),
                voltage_source: 0.0,
                current_source: prev_current,
            },
        }
    }

    /// Branch contribution to the frequency-domain system at `omega`.
    ///
    /// Only AC sources driving exactly `omega` excite the system; every other
    /// source is shorted.
    pub fn ac_stamp(&self, omega: f64, wire_conductance: f64) -> BranchStamp<Complex64> {
        let zero = Complex64::new(0.0, 0.0);
        let wire = BranchStamp {
            admittance: Complex64::new(wire_conductance, 0.0),
            voltage_source: zero,
            current_source: zero,
        };

        match self {
            Element::Wire | Element::DcSource(_) => wire,
            Element::AcSource(v) if v.drives(omega) => BranchStamp {
                voltage_source: Complex64::new(v.amplitude, 0.0),
                ..wire
            },
            Element::AcSource(_) => wire,
            Element::Resistor(r) => BranchStamp {
                admittance: Complex64::new(r.conductance(), 0.0),
                ..wire
            },
            Element::Capacitor(c) => BranchStamp {
                admittance: c.admittance(omega),
                ..wire
            },
            Element::Inductor(l) => BranchStamp {
                admittance: l.admittance(omega),
                ..wire
            },
        }
    }

    /// Angular frequency of an AC source.
    pub fn ac_omega(&self) -> Option<f64> {
        match self {
            Element::AcSource(v) => Some(v.omega),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn def(input: &str) -> ElementDef {
        let ast = crate::dsl::parse(input).unwrap();
        ast.elements.into_iter().next().unwrap()
    }

    #[test]
    fn test_from_def_roles() {
        assert_eq!(Element::from_def(&def("W1 0 1")).unwrap().role(), ElementRole::Wire);
        assert_eq!(Element::from_def(&def("R1 0 1 1k")).unwrap().role(), ElementRole::Resistor);
        assert_eq!(Element::from_def(&def("V1 0 1 5")).unwrap().role(), ElementRole::DcVoltageSource);
        assert_eq!(
            Element::from_def(&def("V2 0 1 AC 2 w=10")).unwrap().role(),
            ElementRole::AcVoltageSource
        );
        assert_eq!(Element::from_def(&def("L1 0 1 10m")).unwrap().role(), ElementRole::Inductor);
        assert_eq!(Element::from_def(&def("C1 0 1 1u")).unwrap().role(), ElementRole::Capacitor);
    }

    #[test]
    fn test_from_def_geometry_and_state() {
        let c = Element::from_def(&def("C1 0 1 edge=0.1 spacing=0.05 q=1m")).unwrap();
        match c {
            Element::Capacitor(c) => {
                assert_relative_eq!(c.capacitance, 0.02, max_relative = 1e-12);
                assert_relative_eq!(c.charge, 1e-3);
            }
            other => panic!("expected capacitor, got {:?}", other),
        }

        let l = Element::from_def(&def("L1 0 1 turns=4 radius=0.5 length=2 k=1 i=0.25")).unwrap();
        match l {
            Element::Inductor(l) => {
                assert_relative_eq!(l.inductance, 16.0 * std::f64::consts::PI * 0.25 / 2.0);
                assert_relative_eq!(l.current, 0.25);
            }
            other => panic!("expected inductor, got {:?}", other),
        }
    }

    #[test]
    fn test_from_def_rejects_bad_values() {
        assert!(Element::from_def(&def("R1 0 1")).is_err());
        assert!(Element::from_def(&def("R1 0 1 0")).is_err());
        assert!(Element::from_def(&def("V1 0 1 AC 1")).is_err());
        assert!(Element::from_def(&def("V1 0 1 AC 1 w=0")).is_err());
        assert!(Element::from_def(&def("C1 0 1 edge=0.1")).is_err());
    }

    #[test]
    fn test_dc_stamps() {
        let g = 1e9;
        let cap = Element::Capacitor(Capacitor::new(2e-3));
        let s = cap.dc_stamp(1e-3, g, 4e-3, 0.0);
        assert_relative_eq!(s.admittance, 2.0);
        assert_relative_eq!(s.voltage_source, 2.0);

        let ind = Element::Inductor(Inductor::new(0.5));
        let s = ind.dc_stamp(1e-3, g, 0.0, 0.3);
        assert_relative_eq!(s.admittance, 2e-3);
        assert_relative_eq!(s.current_source, 0.3);

        let ac = Element::AcSource(AcVoltageSource::new(1.0, 5.0));
        assert_eq!(ac.dc_stamp(1e-3, g, 0.0, 0.0), Element::Wire.dc_stamp(1e-3, g, 0.0, 0.0));
    }

    #[test]
    fn test_ac_stamps_only_excite_own_band() {
        let g = 1e9;
        let ac = Element::AcSource(AcVoltageSource::new(3.0, 5.0));
        assert_relative_eq!(ac.ac_stamp(5.0, g).voltage_source.re, 3.0);
        assert_relative_eq!(ac.ac_stamp(7.0, g).voltage_source.re, 0.0);

        let dc = Element::DcSource(DcVoltageSource::new(9.0));
        assert_relative_eq!(dc.ac_stamp(5.0, g).voltage_source.norm(), 0.0);

        let cap = Element::Capacitor(Capacitor::new(0.1));
        assert_relative_eq!(cap.ac_stamp(5.0, g).admittance.im, 0.5);
    }
}
