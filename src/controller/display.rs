//! Values a console would show for the current tick.

use super::notch::{AutoAirStage, RAW_EMERGENCY};
use crate::config::ConfigurationContext;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DisplayNotches {
    pub power: u8,
    /// Clamped brake, `max_brake + 1` for emergency. Stage code under auto-air.
    pub brake: u8,
    pub emergency: bool,
    pub stage: Option<AutoAirStage>,
}

impl DisplayNotches {
    /// Projects confirmed notches through the active limits. Power reads 0
    /// while any brake is applied.
    pub fn project(config: &ConfigurationContext, power: u8, brake: u8) -> Self {
        if config.uses_auto_air_table() {
            let stage = AutoAirStage::from_code(brake);
            let power = if stage == AutoAirStage::Run {
                power.min(config.max_power)
            } else {
                0
            };
            return Self {
                power,
                brake,
                emergency: stage == AutoAirStage::Emergency,
                stage: Some(stage),
            };
        }

        let brake = if brake >= RAW_EMERGENCY {
            config.emergency_brake()
        } else {
            brake.min(config.max_brake)
        };
        let power = if brake > 0 {
            0
        } else {
            power.min(config.max_power)
        };
        Self {
            power,
            brake,
            emergency: brake == config.emergency_brake(),
            stage: None,
        }
    }
}

impl fmt::Display for DisplayNotches {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.stage, self.emergency) {
            (Some(stage), _) => write!(f, "P{} {}", self.power, stage),
            (None, true) => write!(f, "P{} EB", self.power),
            (None, false) => write!(f, "P{} B{}", self.power, self.brake),
        }
    }
}
