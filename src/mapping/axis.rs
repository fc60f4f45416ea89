//! Signed-axis translation shared by the emulator targets.
//!
//! Both handles collapse into one axis: positive values are power notches,
//! negative values are brake steps. Crossing zero always passes through the
//! neutral key and a settle delay. The cruise variants hold the power key at
//! full power instead of stepping.

use crate::config::{BrakeTopology, ConfigurationContext, Target, VehicleVariant};
use crate::controller::decoder::ButtonLatches;
use crate::mapping::strategy::{clamp_electric_brake, clamp_power, step_towards};
use crate::mapping::{ActionPlan, AxisKeys, Key, OutputAction, Timing, TranslatorState};
use tracing::debug;

/// What distinguishes the emulator targets from each other.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AxisProfile {
    pub target: Target,
    /// Whether the emergency axis position presses the emergency key.
    pub emergency_key: bool,
    /// Whether select also holds the extra key under the cruise variant.
    pub cruise_select_extra: bool,
}

#[derive(Debug)]
pub struct AxisTranslator {
    keys: AxisKeys,
    timing: Timing,
    profile: AxisProfile,
    state: TranslatorState,
}

impl AxisTranslator {
    pub fn new(keys: AxisKeys, timing: Timing, profile: AxisProfile) -> Self {
        Self {
            keys,
            timing,
            profile,
            state: TranslatorState::new(),
        }
    }

    pub fn profile(&self) -> AxisProfile {
        self.profile
    }

    pub fn reset(&mut self) -> Vec<OutputAction> {
        self.state.reset()
    }

    pub fn update(
        &mut self,
        power: u8,
        brake: u8,
        latches: ButtonLatches,
        config: &ConfigurationContext,
    ) -> Vec<OutputAction> {
        let cur_p = clamp_power(power, config);
        let cur_b = clamp_electric_brake(brake, config);
        let cur_axis = if cur_b > 0 { -cur_b } else { cur_p };

        if self.state.needs_sync() {
            self.state.sync(cur_p, cur_b, cur_axis);
            return Vec::new();
        }

        let mut plan = self.timing.emu_plan();

        let settled =
            config.variant.is_cruise() && self.apply_cruise(&mut plan, cur_axis, cur_b, config);
        if !settled {
            self.apply_axis(&mut plan, cur_axis, config);
        }
        self.state.prev_power = cur_p;
        self.state.prev_brake = cur_b;

        let select_keys = [self.keys.horn_primary, self.keys.cruise_select_extra];
        // The extra key is always part of the release set so it cannot stick
        let with_extra = self.profile.cruise_select_extra
            && (config.variant == VehicleVariant::CruiseB || !latches.select);
        let select_len = if with_extra { 2 } else { 1 };
        self.state.apply_latches(
            &mut plan,
            latches,
            &[self.keys.horn_secondary],
            &select_keys[..select_len],
        );

        plan.into_actions()
    }

    /// Keys that move the axis further into braking and back towards zero.
    fn brake_keys(&self, config: &ConfigurationContext) -> (Key, Key) {
        match config.brake_topology {
            BrakeTopology::Electric => (self.keys.power_dec, self.keys.power_inc),
            BrakeTopology::AutoAir if config.variant == VehicleVariant::Mirrored => {
                (self.keys.brake_dec, self.keys.brake_inc)
            }
            BrakeTopology::AutoAir => (self.keys.brake_inc, self.keys.brake_dec),
        }
    }

    fn emergency_enabled(&self, config: &ConfigurationContext) -> bool {
        self.profile.emergency_key && config.variant != VehicleVariant::NoEmergency
    }

    fn press_neutral(&self, plan: &mut ActionPlan) {
        plan.press(self.keys.neutral);
        plan.wait(self.timing.settle());
    }

    /// Cruise handling. Returns true when the tick is fully handled and the
    /// ordinary axis logic must be skipped.
    fn apply_cruise(
        &mut self,
        plan: &mut ActionPlan,
        cur_axis: i32,
        cur_b: i32,
        config: &ConfigurationContext,
    ) -> bool {
        let top = i32::from(config.max_power);
        let prev = self.state.prev_axis;
        let inc = self.keys.power_inc;
        if prev <= 0 {
            self.state.cruise_armed = true;
        }

        if cur_axis < 0 && prev > 0 {
            if self.state.release(plan, inc) {
                plan.wait(self.timing.guard());
                self.state.cruise_armed = false;
            }
            self.press_neutral(plan);
            self.state.prev_axis = 0;
            false
        } else if prev == top && cur_axis < top && self.state.is_held(inc) {
            self.state.release(plan, inc);
            plan.wait(self.timing.guard());
            self.state.cruise_armed = false;
            self.state.prev_axis = top - 1;
            false
        } else if cur_axis == top && cur_b == 0 && self.state.cruise_armed {
            if prev < top {
                if prev < 0 {
                    self.press_neutral(plan);
                }
                plan.cascade(inc, (top - 1 - prev.max(0)).unsigned_abs());
                self.state.hold(plan, inc);
                self.state.prev_axis = top;
                debug!("{} cruise engaged", self.profile.target);
            }
            true
        } else {
            false
        }
    }

    fn apply_axis(&mut self, plan: &mut ActionPlan, cur: i32, config: &ConfigurationContext) {
        let prev = self.state.prev_axis;
        if cur == prev {
            return;
        }
        let (brake_more, brake_less) = self.brake_keys(config);
        let emergency = -i32::from(config.emergency_brake());

        if cur == emergency && self.emergency_enabled(config) {
            plan.press(self.keys.emergency);
        } else if cur == 0 {
            self.press_neutral(plan);
        } else if (prev > 0 && cur < 0) || (prev < 0 && cur > 0) {
            self.press_neutral(plan);
            if cur > 0 {
                plan.cascade(self.keys.power_inc, cur.unsigned_abs());
            } else {
                plan.cascade(brake_more, cur.unsigned_abs());
            }
        } else if cur > 0 {
            step_towards(plan, prev, cur, self.keys.power_inc, self.keys.power_dec);
        } else {
            step_towards(plan, prev, cur, brake_less, brake_more);
        }
        self.state.prev_axis = cur;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigChange;
    use crate::mapping::test_support::{presses, steps, Step};
    use proptest::prelude::*;

    const PROFILE: AxisProfile = AxisProfile {
        target: Target::Pcsx2,
        emergency_key: true,
        cruise_select_extra: false,
    };

    fn config(topology: BrakeTopology) -> ConfigurationContext {
        ConfigurationContext {
            target: Target::Pcsx2,
            brake_topology: topology,
            ..Default::default()
        }
    }

    fn with_variant(variant: VehicleVariant) -> ConfigurationContext {
        config(BrakeTopology::Electric)
            .apply(ConfigChange::ToggleVariant(variant))
            .unwrap()
            .config
    }

    fn synced(power: u8, brake: u8, config: &ConfigurationContext) -> AxisTranslator {
        let mut t = AxisTranslator::new(AxisKeys::default(), Timing::default(), PROFILE);
        assert!(t.update(power, brake, ButtonLatches::default(), config).is_empty());
        t
    }

    fn tick(
        t: &mut AxisTranslator,
        power: u8,
        brake: u8,
        config: &ConfigurationContext,
    ) -> Vec<Step> {
        steps(&t.update(power, brake, ButtonLatches::default(), config))
    }

    #[test]
    fn test_sign_crossing_passes_through_neutral() {
        let cfg = config(BrakeTopology::AutoAir);
        let mut t = synced(2, 0, &cfg);
        assert_eq!(
            tick(&mut t, 0, 3, &cfg),
            vec![
                Step::Press(Key::S),
                Step::Wait,
                Step::Press(Key::Period),
                Step::Press(Key::Period),
                Step::Press(Key::Period),
            ]
        );
    }

    #[test]
    fn test_shared_handle_brakes_with_power_keys() {
        let cfg = config(BrakeTopology::Electric);
        let mut t = synced(2, 0, &cfg);
        assert_eq!(
            tick(&mut t, 0, 3, &cfg),
            vec![
                Step::Press(Key::S),
                Step::Wait,
                Step::Press(Key::Q),
                Step::Press(Key::Q),
                Step::Press(Key::Q),
            ]
        );
        // back across zero into power
        assert_eq!(
            tick(&mut t, 2, 0, &cfg),
            vec![Step::Press(Key::S), Step::Wait, Step::Press(Key::Z), Step::Press(Key::Z)]
        );
    }

    #[test]
    fn test_return_to_zero() {
        let cfg = config(BrakeTopology::Electric);
        let mut t = synced(3, 0, &cfg);
        assert_eq!(tick(&mut t, 0, 0, &cfg), vec![Step::Press(Key::S), Step::Wait]);
    }

    #[test]
    fn test_same_quadrant_steps() {
        let cfg = config(BrakeTopology::AutoAir);
        let mut t = synced(1, 0, &cfg);
        assert_eq!(presses(&t.update(4, 0, ButtonLatches::default(), &cfg)), vec![Key::Z; 3]);
        assert_eq!(presses(&t.update(2, 0, ButtonLatches::default(), &cfg)), vec![Key::Q; 2]);

        let mut t = synced(0, 2, &cfg);
        assert_eq!(presses(&t.update(0, 5, ButtonLatches::default(), &cfg)), vec![Key::Period; 3]);
        assert_eq!(presses(&t.update(0, 1, ButtonLatches::default(), &cfg)), vec![Key::Comma; 4]);
    }

    #[test]
    fn test_mirrored_swaps_brake_keys() {
        let cfg = with_variant(VehicleVariant::Mirrored);
        let mut t = synced(0, 1, &cfg);
        assert_eq!(presses(&t.update(0, 3, ButtonLatches::default(), &cfg)), vec![Key::Comma; 2]);
        assert_eq!(presses(&t.update(0, 2, ButtonLatches::default(), &cfg)), vec![Key::Period]);
    }

    #[test]
    fn test_emergency_key_and_recovery() {
        let cfg = config(BrakeTopology::AutoAir);
        let mut t = synced(0, 3, &cfg);
        assert_eq!(tick(&mut t, 0, 9, &cfg), vec![Step::Press(Key::Slash)]);
        assert_eq!(presses(&t.update(0, 5, ButtonLatches::default(), &cfg)), vec![Key::Comma; 4]);
    }

    #[test]
    fn test_no_emergency_variant_steps_instead() {
        let cfg = with_variant(VehicleVariant::NoEmergency);
        let mut t = synced(0, 3, &cfg);
        // emergency sits at max_brake + 1 = 8
        assert_eq!(presses(&t.update(0, 9, ButtonLatches::default(), &cfg)), vec![Key::Period; 5]);
    }

    #[test]
    fn test_cruise_engages_and_holds() {
        let cfg = with_variant(VehicleVariant::CruiseA);
        let mut t = synced(0, 0, &cfg);
        assert_eq!(
            tick(&mut t, 5, 0, &cfg),
            vec![
                Step::Press(Key::Z),
                Step::Press(Key::Z),
                Step::Press(Key::Z),
                Step::Press(Key::Z),
                Step::Down(Key::Z),
            ]
        );
        assert!(tick(&mut t, 5, 0, &cfg).is_empty());
    }

    #[test]
    fn test_cruise_drop_releases_with_guard() {
        let cfg = with_variant(VehicleVariant::CruiseA);
        let mut t = synced(0, 0, &cfg);
        tick(&mut t, 5, 0, &cfg);
        assert_eq!(
            tick(&mut t, 3, 0, &cfg),
            vec![Step::Up(Key::Z), Step::Wait, Step::Press(Key::Q)]
        );
    }

    #[test]
    fn test_cruise_reentry_needs_zero() {
        let cfg = with_variant(VehicleVariant::CruiseA);
        let mut t = synced(0, 0, &cfg);
        tick(&mut t, 5, 0, &cfg);
        assert_eq!(tick(&mut t, 4, 0, &cfg), vec![Step::Up(Key::Z), Step::Wait]);
        // back at full power without passing zero: a plain step
        assert_eq!(tick(&mut t, 5, 0, &cfg), vec![Step::Press(Key::Z)]);
        assert!(tick(&mut t, 5, 0, &cfg).is_empty());
        assert_eq!(tick(&mut t, 3, 0, &cfg), vec![Step::Press(Key::Q), Step::Press(Key::Q)]);
    }

    #[test]
    fn test_cruise_rearms_at_zero() {
        let cfg = with_variant(VehicleVariant::CruiseA);
        let mut t = synced(0, 0, &cfg);
        tick(&mut t, 5, 0, &cfg);
        tick(&mut t, 4, 0, &cfg);
        assert_eq!(tick(&mut t, 0, 0, &cfg), vec![Step::Press(Key::S), Step::Wait]);
        let actions = tick(&mut t, 5, 0, &cfg);
        assert_eq!(actions.last(), Some(&Step::Down(Key::Z)));
        assert_eq!(actions.iter().filter(|s| **s == Step::Press(Key::Z)).count(), 4);
    }

    #[test]
    fn test_cruise_not_armed_when_synced_at_full_power() {
        let cfg = with_variant(VehicleVariant::CruiseA);
        let mut t = synced(5, 0, &cfg);
        assert!(tick(&mut t, 5, 0, &cfg).is_empty());
        assert_eq!(tick(&mut t, 4, 0, &cfg), vec![Step::Press(Key::Q)]);
    }

    #[test]
    fn test_cruise_to_brake_releases_then_neutral() {
        let cfg = with_variant(VehicleVariant::CruiseA);
        let mut t = synced(0, 0, &cfg);
        tick(&mut t, 5, 0, &cfg);
        assert_eq!(
            tick(&mut t, 0, 2, &cfg),
            vec![
                Step::Up(Key::Z),
                Step::Wait,
                Step::Press(Key::S),
                Step::Wait,
                Step::Press(Key::Q),
                Step::Press(Key::Q),
            ]
        );
    }

    #[test]
    fn test_cruise_entry_from_braking() {
        let cfg = with_variant(VehicleVariant::CruiseA);
        let mut t = synced(0, 2, &cfg);
        let actions = tick(&mut t, 5, 0, &cfg);
        assert_eq!(&actions[..2], &[Step::Press(Key::S), Step::Wait]);
        assert_eq!(actions.last(), Some(&Step::Down(Key::Z)));
        assert_eq!(actions.iter().filter(|s| **s == Step::Press(Key::Z)).count(), 4);
    }

    #[test]
    fn test_reset_releases_cruise_key() {
        let cfg = with_variant(VehicleVariant::CruiseA);
        let mut t = synced(0, 0, &cfg);
        tick(&mut t, 5, 0, &cfg);
        assert_eq!(t.reset(), vec![OutputAction::KeyUp(Key::Z)]);
    }

    #[test]
    fn test_horn_latches() {
        let cfg = config(BrakeTopology::Electric);
        let mut t = synced(0, 0, &cfg);
        let both = ButtonLatches {
            start: true,
            select: true,
        };
        assert_eq!(
            steps(&t.update(0, 0, both, &cfg)),
            vec![Step::Down(Key::Backspace), Step::Down(Key::Enter)]
        );
        assert_eq!(
            steps(&t.update(0, 0, ButtonLatches::default(), &cfg)),
            vec![Step::Up(Key::Backspace), Step::Up(Key::Enter)]
        );
    }

    proptest! {
        #[test]
        fn prop_crossing_always_starts_with_neutral(power in 1u8..=5, brake in 1u8..=8) {
            let cfg = config(BrakeTopology::AutoAir);
            let mut t = synced(power, 0, &cfg);
            let actions = tick(&mut t, 0, brake, &cfg);
            prop_assert_eq!(actions[0], Step::Press(Key::S));
            prop_assert_eq!(actions[1], Step::Wait);
            prop_assert_eq!(actions.len(), 2 + usize::from(brake));
        }

        #[test]
        fn prop_power_only_walk_ends_balanced(path in proptest::collection::vec(0u8..=5, 1..20)) {
            let cfg = config(BrakeTopology::AutoAir);
            let mut t = synced(0, 0, &cfg);
            let mut level: i32 = 0;
            for p in path {
                for step in tick(&mut t, p, 0, &cfg) {
                    match step {
                        Step::Press(Key::Z) => level += 1,
                        Step::Press(Key::Q) => level -= 1,
                        Step::Press(Key::S) => level = 0,
                        _ => {}
                    }
                }
                prop_assert_eq!(level, i32::from(p));
            }
        }
    }
}
