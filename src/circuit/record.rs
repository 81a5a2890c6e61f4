//! Element records for save/load.

use serde::{Deserialize, Serialize};

use super::types::{Point3, SlotId};
use crate::components::Element;

/// Everything about an element that must survive a save/load cycle.
///
/// Runtime state (stored charge, accumulated heat, tick outputs) is not part
/// of a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementRecord {
    pub name: String,
    pub element: Element,
    pub slots: [SlotId; 2],
    pub positions: [Point3; 2],
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;
    use crate::components::AcVoltageSource;

    #[test]
    fn test_record_json_shape() {
        let record = ElementRecord {
            name: "VS".to_string(),
            element: Element::AcSource(AcVoltageSource::new(1.5, 20.0)),
            slots: [SlotId(2), SlotId::INVALID],
            positions: [Point3::new(1.0, 0.0, 2.0), Point3::ORIGIN],
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["element"]["role"], "ac_source");
        assert_eq!(json["element"]["omega"], 20.0);
        assert_eq!(json["slots"][0], 2);

        let back: ElementRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_record_skips_runtime_state() {
        let record = ElementRecord {
            name: "C1".to_string(),
            element: Element::Capacitor(crate::components::Capacitor::with_charge(1e-3, 5e-3)),
            slots: [SlotId(0), SlotId(1)],
            positions: [Point3::ORIGIN; 2],
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("charge"));
    }
}
