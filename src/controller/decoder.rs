//! Raw decoding of the controller's 16-button vector into handle channels.
//!
//! The controller reports both handles as plain buttons. Four of them carry
//! the brake handle as a 4-bit gray-ish pattern, three carry the power handle.

use serde::{Deserialize, Serialize};

/// Number of physical buttons reported by the controller.
pub const BUTTON_COUNT: usize = 16;

/// 1-indexed button numbers, as printed in the controller wiring table.
pub const START_BUTTON: usize = 9;
pub const SELECT_BUTTON: usize = 10;

// Snapshot of all buttons, 1-indexed (index 0 is never set)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ButtonVector {
    buttons: [bool; BUTTON_COUNT + 1],
}

impl ButtonVector {
    /// Builds a vector from the 0-indexed button states the device reports.
    pub fn from_raw(raw: [bool; BUTTON_COUNT]) -> Self {
        let mut buttons = [false; BUTTON_COUNT + 1];
        buttons[1..].copy_from_slice(&raw);
        Self { buttons }
    }

    /// Reads a 1-indexed button. Out-of-range indices read as released.
    pub fn get(&self, index: usize) -> bool {
        (1..=BUTTON_COUNT).contains(&index) && self.buttons[index]
    }

    pub fn set(&mut self, index: usize, pressed: bool) {
        if (1..=BUTTON_COUNT).contains(&index) {
            self.buttons[index] = pressed;
        }
    }

    pub fn clear(&mut self) {
        self.buttons = [false; BUTTON_COUNT + 1];
    }

    fn bit(&self, index: usize) -> u8 {
        u8::from(self.get(index))
    }
}

/// Power handle pattern as read from buttons 14, 16 and 1.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PowerPattern(pub bool, pub bool, pub bool);

impl PowerPattern {
    pub fn as_bits(&self) -> (u8, u8, u8) {
        (u8::from(self.0), u8::from(self.1), u8::from(self.2))
    }
}

/// The two raw handle channels extracted from one button snapshot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawChannels {
    /// 4-bit brake pattern, `(b6<<3) | (b8<<2) | (b5<<1) | b7`
    pub brake_pattern: u8,
    pub power_pattern: PowerPattern,
}

impl RawChannels {
    pub fn decode(buttons: &ButtonVector) -> Self {
        let brake_pattern = (buttons.bit(6) << 3)
            | (buttons.bit(8) << 2)
            | (buttons.bit(5) << 1)
            | buttons.bit(7);
        let power_pattern = PowerPattern(buttons.get(14), buttons.get(16), buttons.get(1));

        Self {
            brake_pattern,
            power_pattern,
        }
    }
}

/// Level of the start/select buttons for one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ButtonLatches {
    pub start: bool,
    pub select: bool,
}

impl ButtonLatches {
    pub fn read(buttons: &ButtonVector) -> Self {
        Self {
            start: buttons.get(START_BUTTON),
            select: buttons.get(SELECT_BUTTON),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector_with(pressed: &[usize]) -> ButtonVector {
        let mut v = ButtonVector::default();
        for &i in pressed {
            v.set(i, true);
        }
        v
    }

    #[test]
    fn test_brake_bit_order() {
        assert_eq!(RawChannels::decode(&vector_with(&[6])).brake_pattern, 0b1000);
        assert_eq!(RawChannels::decode(&vector_with(&[8])).brake_pattern, 0b0100);
        assert_eq!(RawChannels::decode(&vector_with(&[5])).brake_pattern, 0b0010);
        assert_eq!(RawChannels::decode(&vector_with(&[7])).brake_pattern, 0b0001);
        assert_eq!(
            RawChannels::decode(&vector_with(&[6, 8, 5])).brake_pattern,
            14
        );
    }

    #[test]
    fn test_power_pattern_order() {
        let channels = RawChannels::decode(&vector_with(&[14, 16]));
        assert_eq!(channels.power_pattern, PowerPattern(true, true, false));

        let channels = RawChannels::decode(&vector_with(&[1]));
        assert_eq!(channels.power_pattern, PowerPattern(false, false, true));
    }

    #[test]
    fn test_from_raw_shifts_to_one_indexed() {
        let mut raw = [false; BUTTON_COUNT];
        raw[0] = true;
        raw[15] = true;
        let v = ButtonVector::from_raw(raw);
        assert!(v.get(1));
        assert!(v.get(16));
        assert!(!v.get(0));
    }

    #[test]
    fn test_out_of_range_is_released() {
        let mut v = ButtonVector::default();
        v.set(0, true);
        v.set(17, true);
        assert!(!v.get(0));
        assert!(!v.get(17));
    }

    #[test]
    fn test_latches() {
        let latches = ButtonLatches::read(&vector_with(&[9]));
        assert!(latches.start);
        assert!(!latches.select);
    }
}
