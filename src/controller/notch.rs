//! Table-driven resolution of raw handle patterns into logical notches.
//!
//! All controller wiring knowledge lives in the constant tables below. A new
//! controller revision means a new table, not new logic.

use super::decoder::PowerPattern;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result of a table lookup. `Undefined` marks transient or invalid contact
/// combinations and is never a notch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RawNotch {
    Notch(u8),
    #[default]
    Undefined,
}

impl From<Option<u8>> for RawNotch {
    fn from(value: Option<u8>) -> Self {
        value.map_or(RawNotch::Undefined, RawNotch::Notch)
    }
}

impl fmt::Display for RawNotch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawNotch::Notch(n) => write!(f, "{}", n),
            RawNotch::Undefined => write!(f, "?"),
        }
    }
}

/// Raw brake value reserved for the emergency position, before clamping.
pub const RAW_EMERGENCY: u8 = 9;

/// Stage codes produced by the automatic-air table.
pub const STAGE_CODE_RUN: u8 = 0;
pub const STAGE_CODE_OVERLAP: u8 = 6;
pub const STAGE_CODE_SERVICE: u8 = 8;
pub const STAGE_CODE_EMERGENCY: u8 = 9;

// Lookup table for one 4-bit brake channel
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NotchTable {
    name: &'static str,
    entries: [Option<u8>; 16],
}

impl NotchTable {
    /// Coarse electric-command table: N, B1..B8 and emergency.
    pub const ELECTRIC: NotchTable = NotchTable {
        name: "electric",
        entries: [
            Some(9), // 0000 emergency
            None,
            None,
            None,
            None,
            None,
            Some(8), // 0110
            Some(7),
            Some(6),
            Some(5),
            Some(4),
            Some(3),
            Some(2),
            Some(1),
            Some(0), // 1110 neutral
            None,
        ],
    };

    /// Automatic-air table producing stage codes.
    pub const AUTO_AIR: NotchTable = NotchTable {
        name: "auto-air",
        entries: [
            Some(STAGE_CODE_EMERGENCY),
            Some(STAGE_CODE_SERVICE),
            Some(STAGE_CODE_SERVICE),
            Some(STAGE_CODE_SERVICE),
            Some(STAGE_CODE_SERVICE),
            Some(STAGE_CODE_SERVICE),
            Some(STAGE_CODE_OVERLAP),
            Some(STAGE_CODE_RUN),
            Some(STAGE_CODE_RUN),
            Some(STAGE_CODE_RUN),
            Some(STAGE_CODE_RUN),
            Some(STAGE_CODE_RUN),
            Some(STAGE_CODE_RUN),
            Some(STAGE_CODE_RUN),
            Some(STAGE_CODE_RUN),
            None,
        ],
    };

    pub fn resolve(&self, pattern: u8) -> RawNotch {
        self.entries
            .get(usize::from(pattern))
            .copied()
            .flatten()
            .into()
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Resolves the 3-bit power pattern. Only six combinations are valid.
pub fn resolve_power(pattern: PowerPattern) -> RawNotch {
    match pattern.as_bits() {
        (1, 1, 0) => RawNotch::Notch(0),
        (1, 0, 1) => RawNotch::Notch(1),
        (1, 0, 0) => RawNotch::Notch(2),
        (0, 1, 1) => RawNotch::Notch(3),
        (0, 1, 0) => RawNotch::Notch(4),
        (0, 0, 1) => RawNotch::Notch(5),
        _ => RawNotch::Undefined,
    }
}

/// Coarse stage of an automatic-air brake handle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AutoAirStage {
    #[default]
    Run,
    Overlap,
    Service,
    Emergency,
}

impl AutoAirStage {
    /// Maps a stage code from [`NotchTable::AUTO_AIR`]. Unknown codes read as `Run`.
    pub fn from_code(code: u8) -> Self {
        match code {
            STAGE_CODE_OVERLAP => AutoAirStage::Overlap,
            STAGE_CODE_SERVICE => AutoAirStage::Service,
            STAGE_CODE_EMERGENCY => AutoAirStage::Emergency,
            _ => AutoAirStage::Run,
        }
    }

    pub fn index(self) -> i32 {
        match self {
            AutoAirStage::Run => 0,
            AutoAirStage::Overlap => 1,
            AutoAirStage::Service => 2,
            AutoAirStage::Emergency => 3,
        }
    }
}

impl fmt::Display for AutoAirStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AutoAirStage::Run => write!(f, "Run"),
            AutoAirStage::Overlap => write!(f, "Overlap"),
            AutoAirStage::Service => write!(f, "Service"),
            AutoAirStage::Emergency => write!(f, "Emergency"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_power_table() {
        let cases = [
            (PowerPattern(true, true, false), RawNotch::Notch(0)),
            (PowerPattern(true, false, true), RawNotch::Notch(1)),
            (PowerPattern(true, false, false), RawNotch::Notch(2)),
            (PowerPattern(false, true, true), RawNotch::Notch(3)),
            (PowerPattern(false, true, false), RawNotch::Notch(4)),
            (PowerPattern(false, false, true), RawNotch::Notch(5)),
            (PowerPattern(true, true, true), RawNotch::Undefined),
            (PowerPattern(false, false, false), RawNotch::Undefined),
        ];
        for (pattern, expected) in cases {
            assert_eq!(resolve_power(pattern), expected, "pattern {:?}", pattern);
        }
    }

    #[test]
    fn test_electric_table() {
        assert_eq!(NotchTable::ELECTRIC.resolve(14), RawNotch::Notch(0));
        assert_eq!(NotchTable::ELECTRIC.resolve(6), RawNotch::Notch(8));
        assert_eq!(NotchTable::ELECTRIC.resolve(0), RawNotch::Notch(RAW_EMERGENCY));
        for pattern in 1..=5 {
            assert_eq!(NotchTable::ELECTRIC.resolve(pattern), RawNotch::Undefined);
        }
        assert_eq!(NotchTable::ELECTRIC.resolve(15), RawNotch::Undefined);
    }

    #[test]
    fn test_auto_air_table() {
        for pattern in 7..=14 {
            assert_eq!(NotchTable::AUTO_AIR.resolve(pattern), RawNotch::Notch(STAGE_CODE_RUN));
        }
        assert_eq!(NotchTable::AUTO_AIR.resolve(6), RawNotch::Notch(STAGE_CODE_OVERLAP));
        for pattern in 1..=5 {
            assert_eq!(
                NotchTable::AUTO_AIR.resolve(pattern),
                RawNotch::Notch(STAGE_CODE_SERVICE)
            );
        }
        assert_eq!(NotchTable::AUTO_AIR.resolve(0), RawNotch::Notch(STAGE_CODE_EMERGENCY));
        assert_eq!(NotchTable::AUTO_AIR.resolve(15), RawNotch::Undefined);
    }

    #[test]
    fn test_stage_codes() {
        assert_eq!(AutoAirStage::from_code(0), AutoAirStage::Run);
        assert_eq!(AutoAirStage::from_code(6), AutoAirStage::Overlap);
        assert_eq!(AutoAirStage::from_code(8), AutoAirStage::Service);
        assert_eq!(AutoAirStage::from_code(9), AutoAirStage::Emergency);
    }

    proptest! {
        #[test]
        fn prop_patterns_above_four_bits_are_undefined(pattern in 16u8..=255) {
            prop_assert_eq!(NotchTable::ELECTRIC.resolve(pattern), RawNotch::Undefined);
            prop_assert_eq!(NotchTable::AUTO_AIR.resolve(pattern), RawNotch::Undefined);
        }

        #[test]
        fn prop_electric_stays_in_domain(pattern in 0u8..16) {
            if let RawNotch::Notch(n) = NotchTable::ELECTRIC.resolve(pattern) {
                prop_assert!(n <= RAW_EMERGENCY);
            }
        }
    }
}
