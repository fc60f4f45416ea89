//! Decode → resolve → stabilize, one button snapshot at a time.

use super::decoder::{ButtonLatches, ButtonVector, RawChannels};
use super::filter::{FilterPolicy, NotchFilter, StabilizationFilter};
use super::notch::{resolve_power, NotchTable, RawNotch};
use crate::config::ConfigurationContext;
use std::time::Instant;
use tracing::{debug, info};

/// Confirmed notches plus the raw values they were derived from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NotchReading {
    pub power: u8,
    pub brake: u8,
    pub raw_power: RawNotch,
    pub raw_brake: RawNotch,
    pub channels: RawChannels,
    pub latches: ButtonLatches,
    /// The brake value was resolved through the automatic-air table
    pub auto_air_table: bool,
}

/// Owns one filter per handle. Filters are created lazily from the first
/// defined reading so startup never produces a spurious transition.
#[derive(Debug)]
pub struct NotchPipeline {
    policy: FilterPolicy,
    brake_table: NotchTable,
    power: Option<StabilizationFilter>,
    brake: Option<StabilizationFilter>,
}

impl NotchPipeline {
    pub fn new(policy: FilterPolicy) -> Self {
        Self {
            policy,
            brake_table: NotchTable::ELECTRIC,
            power: None,
            brake: None,
        }
    }

    pub fn process(
        &mut self,
        buttons: &ButtonVector,
        now: Instant,
        config: &ConfigurationContext,
    ) -> NotchReading {
        let table = if config.uses_auto_air_table() {
            NotchTable::AUTO_AIR
        } else {
            NotchTable::ELECTRIC
        };
        if table != self.brake_table {
            // Values from the old table mean nothing under the new one
            info!("Brake table switched to {}", table.name());
            self.brake_table = table;
            self.brake = None;
        }

        let channels = RawChannels::decode(buttons);
        let raw_power = resolve_power(channels.power_pattern);
        let raw_brake = self.brake_table.resolve(channels.brake_pattern);
        debug!(
            "brake pattern {:04b} -> {}, power {:?} -> {}",
            channels.brake_pattern, raw_brake, channels.power_pattern, raw_power
        );

        NotchReading {
            power: feed(&mut self.power, self.policy, raw_power, now),
            brake: feed(&mut self.brake, self.policy, raw_brake, now),
            raw_power,
            raw_brake,
            channels,
            latches: ButtonLatches::read(buttons),
            auto_air_table: self.brake_table == NotchTable::AUTO_AIR,
        }
    }

    /// Drops both filters, e.g. after the device went away.
    pub fn reset(&mut self) {
        self.power = None;
        self.brake = None;
    }
}

fn feed(
    slot: &mut Option<StabilizationFilter>,
    policy: FilterPolicy,
    raw: RawNotch,
    now: Instant,
) -> u8 {
    if let Some(filter) = slot.as_mut() {
        return filter.update(raw, now);
    }
    match raw {
        RawNotch::Notch(value) => {
            *slot = Some(policy.build(value, now));
            value
        }
        RawNotch::Undefined => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BrakeTopology;
    use std::time::Duration;

    // B3 = pattern 11 (buttons 6, 5, 7); P2 = button 14 only
    fn b3_p0() -> ButtonVector {
        let mut v = ButtonVector::default();
        for i in [6, 5, 7, 14, 16] {
            v.set(i, true);
        }
        v
    }

    fn neutral() -> ButtonVector {
        let mut v = ButtonVector::default();
        for i in [6, 8, 5, 14, 16] {
            v.set(i, true);
        }
        v
    }

    #[test]
    fn test_first_defined_reading_seeds_filters() {
        let mut pipeline = NotchPipeline::new(FilterPolicy::default());
        let reading = pipeline.process(&b3_p0(), Instant::now(), &ConfigurationContext::default());
        assert_eq!(reading.brake, 3);
        assert_eq!(reading.power, 0);
        assert_eq!(reading.raw_brake, RawNotch::Notch(3));
    }

    #[test]
    fn test_undefined_before_seed_reads_zero() {
        let mut pipeline = NotchPipeline::new(FilterPolicy::default());
        let reading = pipeline.process(
            &ButtonVector::default(),
            Instant::now(),
            &ConfigurationContext::default(),
        );
        assert_eq!(reading.raw_power, RawNotch::Undefined);
        assert_eq!(reading.power, 0);
        // pattern 0000 is the emergency position
        assert_eq!(reading.brake, 9);
    }

    #[test]
    fn test_guard_delays_change() {
        let t0 = Instant::now();
        let config = ConfigurationContext::default();
        let mut pipeline = NotchPipeline::new(FilterPolicy::default());
        pipeline.process(&neutral(), t0, &config);
        assert_eq!(pipeline.process(&b3_p0(), t0 + Duration::from_millis(16), &config).brake, 0);
        assert_eq!(pipeline.process(&b3_p0(), t0 + Duration::from_millis(32), &config).brake, 0);
        assert_eq!(pipeline.process(&b3_p0(), t0 + Duration::from_millis(48), &config).brake, 3);
    }

    #[test]
    fn test_table_switch_reseeds_brake() {
        let t0 = Instant::now();
        let mut pipeline = NotchPipeline::new(FilterPolicy::default());
        let electric = pipeline.process(&b3_p0(), t0, &ConfigurationContext::default());
        assert!(!electric.auto_air_table);
        let auto_air = ConfigurationContext {
            brake_topology: BrakeTopology::AutoAir,
            ..Default::default()
        };
        // pattern 11 is Run on the auto-air table
        let reading = pipeline.process(&b3_p0(), t0 + Duration::from_millis(1), &auto_air);
        assert_eq!(reading.brake, 0);
        assert!(reading.auto_air_table);
    }

    #[test]
    fn test_latches_pass_through() {
        let mut v = neutral();
        v.set(10, true);
        let mut pipeline = NotchPipeline::new(FilterPolicy::Immediate);
        let reading = pipeline.process(&v, Instant::now(), &ConfigurationContext::default());
        assert!(reading.latches.select);
        assert!(!reading.latches.start);
    }
}
