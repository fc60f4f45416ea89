//! PCSX2 translator.

use crate::config::{ConfigurationContext, Target};
use crate::controller::decoder::ButtonLatches;
use crate::mapping::axis::{AxisProfile, AxisTranslator};
use crate::mapping::{AxisKeys, OutputAction, TargetTranslator, Timing};

const PROFILE: AxisProfile = AxisProfile {
    target: Target::Pcsx2,
    emergency_key: true,
    cruise_select_extra: false,
};

#[derive(Debug)]
pub struct Pcsx2Translator {
    inner: AxisTranslator,
}

impl Pcsx2Translator {
    pub fn new(keys: AxisKeys, timing: Timing) -> Self {
        Self {
            inner: AxisTranslator::new(keys, timing, PROFILE),
        }
    }
}

impl TargetTranslator for Pcsx2Translator {
    fn target(&self) -> Target {
        self.inner.profile().target
    }

    fn reset(&mut self) -> Vec<OutputAction> {
        self.inner.reset()
    }

    fn update(
        &mut self,
        power: u8,
        brake: u8,
        latches: ButtonLatches,
        config: &ConfigurationContext,
    ) -> Vec<OutputAction> {
        self.inner.update(power, brake, latches, config)
    }
}
