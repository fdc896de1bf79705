//! Retirement reasons reported in the car status word

use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a car left the race, decoded from a non-zero car status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RetirementReason {
    Accident,
    Engine,
    Electrical,
    Gearbox,
    OilPump,
    WheelBearing,
    Header,
    FuelPump,
    Suspension,
    Fire,
    WaterPump,
    Mechanical,
    Wastegate,
    Halfshaft,
    Turbo,
    Dnf,
}

/// Status codes 1..=16 in table order. Code 0 means the car is running.
const REASONS: [RetirementReason; 16] = [
    RetirementReason::Accident,
    RetirementReason::Engine,
    RetirementReason::Electrical,
    RetirementReason::Gearbox,
    RetirementReason::OilPump,
    RetirementReason::WheelBearing,
    RetirementReason::Header,
    RetirementReason::FuelPump,
    RetirementReason::Suspension,
    RetirementReason::Fire,
    RetirementReason::WaterPump,
    RetirementReason::Mechanical,
    RetirementReason::Wastegate,
    RetirementReason::Halfshaft,
    RetirementReason::Turbo,
    RetirementReason::Dnf,
];

impl RetirementReason {
    /// Highest status code that maps to a reason.
    pub const MAX_CODE: i64 = REASONS.len() as i64;

    /// Decode a car status code.
    ///
    /// Total over every integer: `0` and codes outside `1..=16` are `None`.
    pub fn from_code(code: i64) -> Option<Self> {
        if !(1..=Self::MAX_CODE).contains(&code) {
            return None;
        }
        REASONS.get((code - 1) as usize).copied()
    }

    /// Status code for this reason.
    pub fn code(self) -> i64 {
        REASONS.iter().position(|r| *r == self).map_or(0, |i| i as i64 + 1)
    }

    /// Display label shown in the gap column.
    pub fn label(self) -> &'static str {
        match self {
            RetirementReason::Accident => "Accident",
            RetirementReason::Engine => "Engine",
            RetirementReason::Electrical => "Electrical",
            RetirementReason::Gearbox => "Gearbox",
            RetirementReason::OilPump => "Oil pump",
            RetirementReason::WheelBearing => "Wheel Bearing",
            RetirementReason::Header => "Header",
            RetirementReason::FuelPump => "Fuel pump",
            RetirementReason::Suspension => "Suspension",
            RetirementReason::Fire => "Fire",
            RetirementReason::WaterPump => "Water pump",
            RetirementReason::Mechanical => "Mechanical",
            RetirementReason::Wastegate => "Wastegate",
            RetirementReason::Halfshaft => "Halfshaft",
            RetirementReason::Turbo => "Turbo",
            RetirementReason::Dnf => "DNF",
        }
    }
}

impl fmt::Display for RetirementReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn running_code_is_not_a_reason() {
        assert_eq!(RetirementReason::from_code(0), None);
    }

    #[test]
    fn known_codes_and_labels() {
        assert_eq!(RetirementReason::from_code(1), Some(RetirementReason::Accident));
        assert_eq!(RetirementReason::from_code(10).map(|r| r.label()), Some("Fire"));
        assert_eq!(RetirementReason::from_code(6).map(|r| r.label()), Some("Wheel Bearing"));
        assert_eq!(RetirementReason::from_code(16).map(|r| r.label()), Some("DNF"));
        assert_eq!(RetirementReason::Turbo.to_string(), "Turbo");
    }

    #[test]
    fn code_round_trips_for_every_reason() {
        for code in 1..=RetirementReason::MAX_CODE {
            let reason = RetirementReason::from_code(code).expect("code in table");
            assert_eq!(reason.code(), code);
        }
    }

    proptest! {
        #[test]
        fn unknown_codes_mean_not_retired(code in any::<i64>()) {
            let reason = RetirementReason::from_code(code);
            prop_assert_eq!(reason.is_some(), (1..=16).contains(&code));
        }
    }
}
