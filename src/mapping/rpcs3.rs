//! RPCS3 translator.
//!
//! Same axis model as PCSX2, but there is no emergency key: the emergency
//! position is reached by stepping. The cruise variant also holds an extra
//! key together with the select horn.

use crate::config::{ConfigurationContext, Target};
use crate::controller::decoder::ButtonLatches;
use crate::mapping::axis::{AxisProfile, AxisTranslator};
use crate::mapping::{AxisKeys, OutputAction, TargetTranslator, Timing};

const PROFILE: AxisProfile = AxisProfile {
    target: Target::Rpcs3,
    emergency_key: false,
    cruise_select_extra: true,
};

#[derive(Debug)]
pub struct Rpcs3Translator {
    inner: AxisTranslator,
}

impl Rpcs3Translator {
    pub fn new(keys: AxisKeys, timing: Timing) -> Self {
        Self {
            inner: AxisTranslator::new(keys, timing, PROFILE),
        }
    }
}

impl TargetTranslator for Rpcs3Translator {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigChange, VehicleVariant};
    use crate::mapping::test_support::{presses, steps, Step};
    use crate::mapping::Key;

    fn rpcs3() -> ConfigurationContext {
        ConfigurationContext {
            target: Target::Rpcs3,
            ..Default::default()
        }
    }

    fn synced(config: &ConfigurationContext) -> Rpcs3Translator {
        let mut t = Rpcs3Translator::new(AxisKeys::default(), Timing::default());
        assert!(t.update(0, 0, ButtonLatches::default(), config).is_empty());
        t
    }

    #[test]
    fn test_emergency_is_stepped_not_keyed() {
        let config = rpcs3();
        let mut t = synced(&config);
        t.update(0, 6, ButtonLatches::default(), &config);
        let keys = presses(&t.update(0, 9, ButtonLatches::default(), &config));
        assert_eq!(keys, vec![Key::Q; 3]);
    }

    #[test]
    fn test_cruise_select_holds_extra_key() {
        let config = rpcs3()
            .apply(ConfigChange::ToggleVariant(VehicleVariant::CruiseB))
            .unwrap()
            .config;
        let mut t = synced(&config);
        let select = ButtonLatches {
            start: false,
            select: true,
        };
        assert_eq!(
            steps(&t.update(0, 0, select, &config)),
            vec![Step::Down(Key::Enter), Step::Down(Key::E)]
        );
        assert_eq!(
            steps(&t.update(0, 0, ButtonLatches::default(), &config)),
            vec![Step::Up(Key::Enter), Step::Up(Key::E)]
        );
    }

    #[test]
    fn test_normal_select_has_no_extra_key() {
        let config = rpcs3();
        let mut t = synced(&config);
        let select = ButtonLatches {
            start: false,
            select: true,
        };
        assert_eq!(
            steps(&t.update(0, 0, select, &config)),
            vec![Step::Down(Key::Enter)]
        );
    }
}
