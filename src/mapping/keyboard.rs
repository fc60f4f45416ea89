//! Key bindings and timing used by the target translators.

use super::{ActionPlan, Key};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Keys for the two-axis (handle) targets, JRETS and BVE.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandleKeys {
    pub power_up: Key,
    pub power_down: Key,
    pub power_neutral: Key,
    pub brake_up: Key,
    pub brake_down: Key,
    pub brake_neutral: Key,
    pub emergency: Key,
    pub start: Key,
    pub select: Key,
}

impl Default for HandleKeys {
    fn default() -> Self {
        Self {
            power_up: Key::Z,
            power_down: Key::A,
            power_neutral: Key::S,
            brake_up: Key::Period,
            brake_down: Key::Comma,
            brake_neutral: Key::M,
            emergency: Key::Slash,
            start: Key::Backspace,
            select: Key::Enter,
        }
    }
}

/// Keys for the axis-unified emulator targets, PCSX2 and RPCS3.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AxisKeys {
    pub power_inc: Key,
    pub power_dec: Key,
    pub brake_inc: Key,
    pub brake_dec: Key,
    pub neutral: Key,
    pub emergency: Key,
    /// Held while select is pressed.
    pub horn_primary: Key,
    /// Held while start is pressed.
    pub horn_secondary: Key,
    /// Extra key held with select under the RPCS3 cruise variant.
    pub cruise_select_extra: Key,
}

impl Default for AxisKeys {
    fn default() -> Self {
        Self {
            power_inc: Key::Z,
            power_dec: Key::Q,
            brake_inc: Key::Period,
            brake_dec: Key::Comma,
            neutral: Key::S,
            emergency: Key::Slash,
            horn_primary: Key::Enter,
            horn_secondary: Key::Backspace,
            cruise_select_extra: Key::E,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    pub handle: HandleKeys,
    pub axis: AxisKeys,
}

/// Output timing in milliseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timing {
    /// Pause after each press on the handle targets
    pub key_repeat_delay_ms: u64,
    /// Key-down time of one press on the emulator targets
    pub emu_press_ms: u64,
    /// Pause after one press on the emulator targets
    pub emu_release_ms: u64,
    /// Wait after the neutral press on the emulator targets
    pub settle_ms: u64,
    /// Wait after releasing a held key before the next key event
    pub guard_ms: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            key_repeat_delay_ms: 20,
            emu_press_ms: 40,
            emu_release_ms: 40,
            settle_ms: 50,
            guard_ms: 50,
        }
    }
}

impl Timing {
    pub fn handle_plan(&self) -> ActionPlan {
        ActionPlan::new(Duration::ZERO, Duration::from_millis(self.key_repeat_delay_ms))
    }

    pub fn emu_plan(&self) -> ActionPlan {
        ActionPlan::new(
            Duration::from_millis(self.emu_press_ms),
            Duration::from_millis(self.emu_release_ms),
        )
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn guard(&self) -> Duration {
        Duration::from_millis(self.guard_ms)
    }
}
