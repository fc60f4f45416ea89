//! Translator contract and the state shared by all target translators.

use crate::config::{ConfigurationContext, Target};
use crate::controller::decoder::ButtonLatches;
use crate::controller::notch::RAW_EMERGENCY;
use crate::mapping::bve::BveTranslator;
use crate::mapping::jrets::JretsTranslator;
use crate::mapping::pcsx2::Pcsx2Translator;
use crate::mapping::rpcs3::Rpcs3Translator;
use crate::mapping::{ActionPlan, Key, KeyBindings, OutputAction, Timing};

/// Per-target state machine turning confirmed notches into key actions.
pub trait TargetTranslator: Send {
    fn target(&self) -> Target;

    /// Forgets all history and returns the key releases needed to leave no
    /// key held. The next `update` is a silent sync tick.
    fn reset(&mut self) -> Vec<OutputAction>;

    /// Produces the actions for one tick.
    fn update(
        &mut self,
        power: u8,
        brake: u8,
        latches: ButtonLatches,
        config: &ConfigurationContext,
    ) -> Vec<OutputAction>;
}

/// History kept between ticks.
///
/// `prev_brake` holds the clamped brake value, or the stage index when the
/// automatic-air table is active. `prev_axis` and `cruise_armed` are only
/// used by the axis-unified targets.
#[derive(Debug, Clone, Default)]
pub struct TranslatorState {
    pub prev_power: i32,
    pub prev_brake: i32,
    pub prev_axis: i32,
    /// Cruise may engage at full power. Cleared when the cruise key is
    /// released, set again once the axis is back at or below zero.
    pub cruise_armed: bool,
    latches: ButtonLatches,
    held: Vec<Key>,
    synced: bool,
}

impl TranslatorState {
    pub fn new() -> Self {
        Self::default()
    }

    /// True until the first tick after construction or reset.
    pub fn needs_sync(&self) -> bool {
        !self.synced
    }

    /// Records the tick's values as history without producing output.
    pub fn sync(&mut self, power: i32, brake: i32, axis: i32) {
        self.prev_power = power;
        self.prev_brake = brake;
        self.prev_axis = axis;
        self.cruise_armed = axis <= 0;
        self.synced = true;
    }

    pub fn is_held(&self, key: Key) -> bool {
        self.held.contains(&key)
    }

    /// Presses `key` without releasing it. No-op if already held.
    pub fn hold(&mut self, plan: &mut ActionPlan, key: Key) {
        if !self.is_held(key) {
            plan.key_down(key);
            self.held.push(key);
        }
    }

    /// Releases a held key. Returns false if it was not held.
    pub fn release(&mut self, plan: &mut ActionPlan, key: Key) -> bool {
        match self.held.iter().position(|k| *k == key) {
            Some(idx) => {
                self.held.remove(idx);
                plan.key_up(key);
                true
            }
            None => false,
        }
    }

    /// Releases every held key and clears all history.
    pub fn reset(&mut self) -> Vec<OutputAction> {
        let releases = self.held.drain(..).map(OutputAction::KeyUp).collect();
        *self = Self::default();
        releases
    }

    /// Mirrors the button levels onto held keys. Keys go down on the rising
    /// edge and up on the falling edge.
    pub fn apply_latches(
        &mut self,
        plan: &mut ActionPlan,
        latches: ButtonLatches,
        start_keys: &[Key],
        select_keys: &[Key],
    ) {
        if latches.start != self.latches.start {
            for &key in start_keys {
                self.set_level(plan, key, latches.start);
            }
        }
        if latches.select != self.latches.select {
            for &key in select_keys {
                self.set_level(plan, key, latches.select);
            }
        }
        self.latches = latches;
    }

    fn set_level(&mut self, plan: &mut ActionPlan, key: Key, pressed: bool) {
        if pressed {
            self.hold(plan, key);
        } else {
            self.release(plan, key);
        }
    }
}

/// Power notch limited to the configured maximum.
pub fn clamp_power(power: u8, config: &ConfigurationContext) -> i32 {
    i32::from(power.min(config.max_power))
}

/// Electric brake limited to the configured maximum. The emergency
/// position maps to `max_brake + 1`.
pub fn clamp_electric_brake(brake: u8, config: &ConfigurationContext) -> i32 {
    if brake >= RAW_EMERGENCY {
        i32::from(config.emergency_brake())
    } else {
        i32::from(brake.min(config.max_brake))
    }
}

/// Presses `up` or `down` as many times as needed to move from `from` to `to`.
pub fn step_towards(plan: &mut ActionPlan, from: i32, to: i32, up: Key, down: Key) {
    let diff = to - from;
    if diff > 0 {
        plan.cascade(up, diff.unsigned_abs());
    } else if diff < 0 {
        plan.cascade(down, diff.unsigned_abs());
    }
}

/// Closed set of translators, one per target.
#[derive(Debug)]
pub enum Translator {
    Jrets(JretsTranslator),
    Bve(BveTranslator),
    Pcsx2(Pcsx2Translator),
    Rpcs3(Rpcs3Translator),
}

impl TargetTranslator for Translator {
    fn target(&self) -> Target {
        match self {
            Translator::Jrets(t) => t.target(),
            Translator::Bve(t) => t.target(),
            Translator::Pcsx2(t) => t.target(),
            Translator::Rpcs3(t) => t.target(),
        }
    }

    fn reset(&mut self) -> Vec<OutputAction> {
        match self {
            Translator::Jrets(t) => t.reset(),
            Translator::Bve(t) => t.reset(),
            Translator::Pcsx2(t) => t.reset(),
            Translator::Rpcs3(t) => t.reset(),
        }
    }

    fn update(
        &mut self,
        power: u8,
        brake: u8,
        latches: ButtonLatches,
        config: &ConfigurationContext,
    ) -> Vec<OutputAction> {
        match self {
            Translator::Jrets(t) => t.update(power, brake, latches, config),
            Translator::Bve(t) => t.update(power, brake, latches, config),
            Translator::Pcsx2(t) => t.update(power, brake, latches, config),
            Translator::Rpcs3(t) => t.update(power, brake, latches, config),
        }
    }
}

/// All four translators. Only the one matching the active target is driven.
#[derive(Debug)]
pub struct TranslatorSet {
    translators: [Translator; 4],
}

impl TranslatorSet {
    pub fn new(bindings: &KeyBindings, timing: Timing) -> Self {
        Self {
            translators: [
                Translator::Jrets(JretsTranslator::new(bindings.handle.clone(), timing)),
                Translator::Bve(BveTranslator::new(bindings.handle.clone(), timing)),
                Translator::Pcsx2(Pcsx2Translator::new(bindings.axis.clone(), timing)),
                Translator::Rpcs3(Rpcs3Translator::new(bindings.axis.clone(), timing)),
            ],
        }
    }

    pub fn get_mut(&mut self, target: Target) -> &mut Translator {
        let slot = match target {
            Target::Jrets => 0,
            Target::Bve => 1,
            Target::Pcsx2 => 2,
            Target::Rpcs3 => 3,
        };
        &mut self.translators[slot]
    }

    /// Resets every translator and collects their releases.
    pub fn reset_all(&mut self) -> Vec<OutputAction> {
        self.translators
            .iter_mut()
            .flat_map(|t| t.reset())
            .collect()
    }
}
