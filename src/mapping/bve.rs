//! Two-handle translator for BVE.
//!
//! BVE has no brake-neutral key. Releasing the brake is a cascade of
//! decrement presses, and the automatic-air stages are walked one press per
//! stage.

use crate::config::{ConfigurationContext, Target};
use crate::controller::decoder::ButtonLatches;
use crate::controller::notch::AutoAirStage;
use crate::mapping::strategy::{clamp_electric_brake, clamp_power, step_towards};
use crate::mapping::{
    ActionPlan, HandleKeys, OutputAction, TargetTranslator, Timing, TranslatorState,
};
use tracing::debug;

const EMERGENCY_STAGE: i32 = 3;

#[derive(Debug)]
pub struct BveTranslator {
    keys: HandleKeys,
    timing: Timing,
    state: TranslatorState,
}

impl BveTranslator {
    pub fn new(keys: HandleKeys, timing: Timing) -> Self {
        Self {
            keys,
            timing,
            state: TranslatorState::new(),
        }
    }

    fn apply_electric(&mut self, plan: &mut ActionPlan, cur: i32, config: &ConfigurationContext) {
        let prev = self.state.prev_brake;
        if cur == prev {
            return;
        }
        let emergency = i32::from(config.emergency_brake());

        if cur == emergency {
            plan.press(self.keys.emergency);
        } else if prev == emergency {
            plan.press(self.keys.brake_down);
            let remaining = i32::from(config.max_brake) - cur;
            plan.cascade(self.keys.brake_down, remaining.unsigned_abs());
        } else {
            step_towards(plan, prev, cur, self.keys.brake_up, self.keys.brake_down);
        }
    }

    // Stage index walk: Run=0 .. Emergency=3
    fn apply_stage(&mut self, plan: &mut ActionPlan, stage: AutoAirStage) {
        let cur = stage.index();
        let mut prev = self.state.prev_brake;
        if cur == prev {
            return;
        }
        debug!("BVE auto-air stage {} -> {}", prev, stage);

        if cur == EMERGENCY_STAGE {
            plan.press(self.keys.emergency);
            return;
        }
        if prev == EMERGENCY_STAGE {
            plan.press(self.keys.brake_down);
            prev = EMERGENCY_STAGE - 1;
        }
        step_towards(plan, prev, cur, self.keys.brake_up, self.keys.brake_down);
    }

    fn apply_power(&mut self, plan: &mut ActionPlan, cur: i32) {
        step_towards(
            plan,
            self.state.prev_power,
            cur,
            self.keys.power_up,
            self.keys.power_down,
        );
        self.state.prev_power = cur;
    }
}

impl TargetTranslator for BveTranslator {
    fn target(&self) -> Target {
        Target::Bve
    }

    fn reset(&mut self) -> Vec<OutputAction> {
        self.state.reset()
    }

    fn update(
        &mut self,
        power: u8,
        brake: u8,
        latches: ButtonLatches,
        config: &ConfigurationContext,
    ) -> Vec<OutputAction> {
        let auto_air = config.uses_auto_air_table();
        let stage = AutoAirStage::from_code(brake);
        let cur_p = clamp_power(power, config);
        let cur_b = if auto_air {
            stage.index()
        } else {
            clamp_electric_brake(brake, config)
        };

        if self.state.needs_sync() {
            let synced_power = if cur_b > 0 { 0 } else { cur_p };
            self.state.sync(synced_power, cur_b, 0);
            return Vec::new();
        }

        let mut plan = self.timing.handle_plan();

        if self.state.prev_brake == 0 && cur_b > 0 {
            plan.press(self.keys.power_neutral);
            self.state.prev_power = 0;
        }

        if auto_air {
            self.apply_stage(&mut plan, stage);
        } else {
            self.apply_electric(&mut plan, cur_b, config);
        }
        self.state.prev_brake = cur_b;

        if cur_b == 0 {
            self.apply_power(&mut plan, cur_p);
        }

        self.state
            .apply_latches(&mut plan, latches, &[self.keys.start], &[self.keys.select]);

        plan.into_actions()
    }
}
