//! Session configuration shared by the pipeline and the translators.
//!
//! The context is an immutable snapshot during a tick. All changes go through
//! [`ConfigurationContext::apply`], which enforces variant exclusivity and
//! reports which translators must be reset before the next tick.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub const MAX_POWER_LIMIT: u8 = 5;
pub const MAX_BRAKE_LIMIT: u8 = 8;

/// Simulator the keystrokes are produced for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Target {
    #[default]
    Jrets,
    Bve,
    Pcsx2,
    Rpcs3,
}

impl Target {
    pub const ALL: [Target; 4] = [Target::Jrets, Target::Bve, Target::Pcsx2, Target::Rpcs3];

    /// Next target in the selection cycle, wrapping around in both directions.
    pub fn cycle(self, forward: bool) -> Target {
        let idx = Target::ALL.iter().position(|t| *t == self).unwrap_or(0);
        let len = Target::ALL.len();
        let next = if forward {
            (idx + 1) % len
        } else {
            (idx + len - 1) % len
        };
        Target::ALL[next]
    }

    /// Targets that merge both handles into one signed axis.
    pub fn is_axis_unified(self) -> bool {
        matches!(self, Target::Pcsx2 | Target::Rpcs3)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Jrets => write!(f, "JRETS"),
            Target::Bve => write!(f, "BVE"),
            Target::Pcsx2 => write!(f, "PCSX2"),
            Target::Rpcs3 => write!(f, "RPCS3"),
        }
    }
}

/// Brake handle topology.
///
/// On the axis-unified targets the brake is always read through the electric
/// table, and the topology instead selects the key layout of the brake side:
/// `Electric` reuses the power keys (single shared handle), `AutoAir` drives
/// the dedicated brake key pair.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BrakeTopology {
    #[default]
    Electric,
    AutoAir,
}

impl BrakeTopology {
    pub fn toggled(self) -> Self {
        match self {
            BrakeTopology::Electric => BrakeTopology::AutoAir,
            BrakeTopology::AutoAir => BrakeTopology::Electric,
        }
    }
}

impl fmt::Display for BrakeTopology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrakeTopology::Electric => write!(f, "electric"),
            BrakeTopology::AutoAir => write!(f, "auto-air"),
        }
    }
}

/// Vehicle-specific behaviour. Mutually exclusive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VehicleVariant {
    #[default]
    Normal,
    /// Brake handle physically reversed (PCSX2).
    Mirrored,
    /// Cruise control latched at full power (PCSX2).
    CruiseA,
    /// Cruise control latched at full power (RPCS3).
    CruiseB,
    /// No emergency key at the emergency axis position (PCSX2).
    NoEmergency,
}

impl VehicleVariant {
    pub fn is_cruise(self) -> bool {
        matches!(self, VehicleVariant::CruiseA | VehicleVariant::CruiseB)
    }

    /// Target on which the variant can be selected. `None` for `Normal`.
    pub fn target(self) -> Option<Target> {
        match self {
            VehicleVariant::Normal => None,
            VehicleVariant::Mirrored | VehicleVariant::CruiseA | VehicleVariant::NoEmergency => {
                Some(Target::Pcsx2)
            }
            VehicleVariant::CruiseB => Some(Target::Rpcs3),
        }
    }

    /// Topology, max power and max brake forced when the variant is selected.
    pub fn forced_limits(self) -> Option<(BrakeTopology, u8, u8)> {
        match self {
            VehicleVariant::Normal => None,
            VehicleVariant::Mirrored => Some((BrakeTopology::AutoAir, 4, 6)),
            VehicleVariant::CruiseA => Some((BrakeTopology::Electric, 5, 5)),
            VehicleVariant::CruiseB => Some((BrakeTopology::Electric, 5, 8)),
            VehicleVariant::NoEmergency => Some((BrakeTopology::AutoAir, 5, 7)),
        }
    }
}

impl fmt::Display for VehicleVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VehicleVariant::Normal => write!(f, "normal"),
            VehicleVariant::Mirrored => write!(f, "mirrored"),
            VehicleVariant::CruiseA => write!(f, "cruise-a"),
            VehicleVariant::CruiseB => write!(f, "cruise-b"),
            VehicleVariant::NoEmergency => write!(f, "no-emergency"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Variant {variant} is not available for target {target}")]
    VariantUnavailable {
        variant: VehicleVariant,
        target: Target,
    },

    #[error("Invalid limit: {0}")]
    InvalidLimit(String),
}

/// Requested change to the configuration, applied between ticks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigChange {
    CycleTarget { forward: bool },
    ToggleBrakeTopology,
    ToggleVariant(VehicleVariant),
    AdjustMaxPower(i8),
    AdjustMaxBrake(i8),
    ForceResync,
}

/// Translators that must be reset before the new context is used.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResetScope {
    None,
    Active,
    /// Target switch: reset the previous translator, then the new one.
    Switch { from: Target, to: Target },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConfigTransition {
    pub config: ConfigurationContext,
    pub reset: ResetScope,
}

/// Immutable per-tick configuration snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigurationContext {
    pub target: Target,
    pub brake_topology: BrakeTopology,
    pub max_power: u8,
    pub max_brake: u8,
    pub variant: VehicleVariant,
}

impl Default for ConfigurationContext {
    fn default() -> Self {
        Self {
            target: Target::Jrets,
            brake_topology: BrakeTopology::Electric,
            max_power: MAX_POWER_LIMIT,
            max_brake: MAX_BRAKE_LIMIT,
            variant: VehicleVariant::Normal,
        }
    }
}

impl ConfigurationContext {
    /// Brake value meaning "emergency" after clamping.
    pub fn emergency_brake(&self) -> u8 {
        self.max_brake + 1
    }

    /// True for JRETS/BVE with the automatic-air handle.
    pub fn uses_auto_air_table(&self) -> bool {
        !self.target.is_axis_unified() && self.brake_topology == BrakeTopology::AutoAir
    }

    pub fn limits_locked(&self) -> bool {
        self.variant != VehicleVariant::Normal
    }

    /// Checks a context loaded from disk.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_POWER_LIMIT).contains(&self.max_power) {
            return Err(ConfigError::InvalidLimit(format!(
                "max_power {} outside 1..={}",
                self.max_power, MAX_POWER_LIMIT
            )));
        }
        if !(1..=MAX_BRAKE_LIMIT).contains(&self.max_brake) {
            return Err(ConfigError::InvalidLimit(format!(
                "max_brake {} outside 1..={}",
                self.max_brake, MAX_BRAKE_LIMIT
            )));
        }
        if let Some(target) = self.variant.target() {
            if target != self.target {
                return Err(ConfigError::VariantUnavailable {
                    variant: self.variant,
                    target: self.target,
                });
            }
        }
        Ok(())
    }

    /// Applies one change and returns the new context plus the reset signal.
    pub fn apply(&self, change: ConfigChange) -> Result<ConfigTransition, ConfigError> {
        let mut next = *self;
        let reset = match change {
            ConfigChange::CycleTarget { forward } => {
                next = ConfigurationContext {
                    target: self.target.cycle(forward),
                    ..ConfigurationContext::default()
                };
                ResetScope::Switch {
                    from: self.target,
                    to: next.target,
                }
            }
            ConfigChange::ToggleBrakeTopology => {
                next.brake_topology = self.brake_topology.toggled();
                ResetScope::Active
            }
            ConfigChange::ToggleVariant(variant) => {
                if variant == VehicleVariant::Normal || self.variant == variant {
                    next.variant = VehicleVariant::Normal;
                    if self.variant == VehicleVariant::Normal {
                        ResetScope::None
                    } else {
                        ResetScope::Active
                    }
                } else {
                    if variant.target() != Some(self.target) {
                        return Err(ConfigError::VariantUnavailable {
                            variant,
                            target: self.target,
                        });
                    }
                    next.variant = variant;
                    if let Some((topology, max_power, max_brake)) = variant.forced_limits() {
                        next.brake_topology = topology;
                        next.max_power = max_power;
                        next.max_brake = max_brake;
                    }
                    ResetScope::Active
                }
            }
            ConfigChange::AdjustMaxPower(delta) => {
                if !self.limits_locked() {
                    next.max_power = step_limit(self.max_power, delta, MAX_POWER_LIMIT);
                }
                ResetScope::None
            }
            ConfigChange::AdjustMaxBrake(delta) => {
                if !self.limits_locked() {
                    next.max_brake = step_limit(self.max_brake, delta, MAX_BRAKE_LIMIT);
                }
                ResetScope::None
            }
            ConfigChange::ForceResync => ResetScope::Active,
        };

        Ok(ConfigTransition {
            config: next,
            reset,
        })
    }
}

fn step_limit(value: u8, delta: i8, max: u8) -> u8 {
    let stepped = i16::from(value) + i16::from(delta);
    stepped.clamp(1, i16::from(max)) as u8
}
