//! Chatter suppression between the notch resolver and the translators.
//!
//! Two policies share one interface. The immediate policy forwards every
//! defined reading; the chattering guard only confirms a reading after it has
//! been stable for a hold time, with a longer hold for Neutral.

use super::notch::RawNotch;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Default hold before a non-neutral notch is confirmed.
pub const DEFAULT_NOTCH_HOLD_MS: u64 = 20;
/// Default hold before a return to Neutral is confirmed.
pub const DEFAULT_NEUTRAL_HOLD_MS: u64 = 100;

/// Filter policy as stored in the settings file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum FilterPolicy {
    Immediate,
    ChatteringGuard {
        notch_hold_ms: u64,
        neutral_hold_ms: u64,
    },
}

impl Default for FilterPolicy {
    fn default() -> Self {
        FilterPolicy::ChatteringGuard {
            notch_hold_ms: DEFAULT_NOTCH_HOLD_MS,
            neutral_hold_ms: DEFAULT_NEUTRAL_HOLD_MS,
        }
    }
}

impl FilterPolicy {
    pub fn build(&self, initial: u8, now: Instant) -> StabilizationFilter {
        match *self {
            FilterPolicy::Immediate => {
                StabilizationFilter::Immediate(ImmediateFilter::new(initial))
            }
            FilterPolicy::ChatteringGuard {
                notch_hold_ms,
                neutral_hold_ms,
            } => StabilizationFilter::ChatteringGuard(ChatteringGuardFilter::new(
                initial,
                Duration::from_millis(notch_hold_ms),
                Duration::from_millis(neutral_hold_ms),
                now,
            )),
        }
    }
}

/// Common interface of both policies.
pub trait NotchFilter {
    /// Feeds one raw reading and returns the confirmed notch.
    fn update(&mut self, raw: RawNotch, now: Instant) -> u8;

    fn confirmed(&self) -> u8;
}

// Forwards any defined value as-is
#[derive(Clone, Debug)]
pub struct ImmediateFilter {
    confirmed: u8,
}

impl ImmediateFilter {
    pub fn new(initial: u8) -> Self {
        Self { confirmed: initial }
    }
}

impl NotchFilter for ImmediateFilter {
    fn update(&mut self, raw: RawNotch, _now: Instant) -> u8 {
        if let RawNotch::Notch(value) = raw {
            self.confirmed = value;
        }
        self.confirmed
    }

    fn confirmed(&self) -> u8 {
        self.confirmed
    }
}

/// Debouncing filter. A reading is provisional until it has been seen
/// continuously for longer than its hold time.
#[derive(Clone, Debug)]
pub struct ChatteringGuardFilter {
    last_raw: RawNotch,
    since: Instant,
    confirmed: u8,
    notch_hold: Duration,
    neutral_hold: Duration,
}

impl ChatteringGuardFilter {
    /// The neutral hold is raised to at least the notch hold.
    pub fn new(initial: u8, notch_hold: Duration, neutral_hold: Duration, now: Instant) -> Self {
        Self {
            last_raw: RawNotch::Notch(initial),
            since: now,
            confirmed: initial,
            notch_hold,
            neutral_hold: neutral_hold.max(notch_hold),
        }
    }

    pub fn hold_time(&self, value: u8) -> Duration {
        if value == 0 {
            self.neutral_hold
        } else {
            self.notch_hold
        }
    }
}

impl NotchFilter for ChatteringGuardFilter {
    fn update(&mut self, raw: RawNotch, now: Instant) -> u8 {
        let RawNotch::Notch(value) = raw else {
            return self.confirmed;
        };

        if raw != self.last_raw {
            self.last_raw = raw;
            self.since = now;
            return self.confirmed;
        }

        if now.saturating_duration_since(self.since) > self.hold_time(value) {
            self.confirmed = value;
        }
        self.confirmed
    }

    fn confirmed(&self) -> u8 {
        self.confirmed
    }
}

/// Closed set of filter policies, selected from settings.
#[derive(Clone, Debug)]
pub enum StabilizationFilter {
    Immediate(ImmediateFilter),
    ChatteringGuard(ChatteringGuardFilter),
}

impl NotchFilter for StabilizationFilter {
    fn update(&mut self, raw: RawNotch, now: Instant) -> u8 {
        match self {
            StabilizationFilter::Immediate(f) => f.update(raw, now),
            StabilizationFilter::ChatteringGuard(f) => f.update(raw, now),
        }
    }

    fn confirmed(&self) -> u8 {
        match self {
            StabilizationFilter::Immediate(f) => f.confirmed(),
            StabilizationFilter::ChatteringGuard(f) => f.confirmed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const NOTCH_HOLD: Duration = Duration::from_millis(20);
    const NEUTRAL_HOLD: Duration = Duration::from_millis(100);

    fn guard(initial: u8, t0: Instant) -> ChatteringGuardFilter {
        ChatteringGuardFilter::new(initial, NOTCH_HOLD, NEUTRAL_HOLD, t0)
    }

    #[test]
    fn test_immediate_forwards_defined_values() {
        let now = Instant::now();
        let mut f = ImmediateFilter::new(0);
        assert_eq!(f.update(RawNotch::Notch(3), now), 3);
        assert_eq!(f.update(RawNotch::Undefined, now), 3);
        assert_eq!(f.update(RawNotch::Notch(1), now), 1);
    }

    #[test]
    fn test_guard_changed_reading_is_provisional() {
        let t0 = Instant::now();
        let mut f = guard(0, t0);
        assert_eq!(f.update(RawNotch::Notch(2), t0), 0);
        assert_eq!(f.update(RawNotch::Notch(2), t0 + Duration::from_millis(10)), 0);
        assert_eq!(f.update(RawNotch::Notch(2), t0 + Duration::from_millis(21)), 2);
    }

    #[test]
    fn test_guard_switch_before_hold_never_confirms() {
        let t0 = Instant::now();
        let mut f = guard(0, t0);
        f.update(RawNotch::Notch(3), t0);
        f.update(RawNotch::Notch(3), t0 + NOTCH_HOLD - Duration::from_millis(1));
        assert_eq!(f.update(RawNotch::Notch(4), t0 + NOTCH_HOLD), 0);
        assert_eq!(f.confirmed(), 0);
    }

    #[test]
    fn test_guard_neutral_hold_is_longer() {
        let t0 = Instant::now();
        let mut f = guard(2, t0);
        f.update(RawNotch::Notch(0), t0);
        assert_eq!(f.update(RawNotch::Notch(0), t0 + Duration::from_millis(50)), 2);
        assert_eq!(f.update(RawNotch::Notch(0), t0 + Duration::from_millis(101)), 0);
    }

    #[test]
    fn test_guard_neutral_hold_never_shorter_than_notch_hold() {
        let f = ChatteringGuardFilter::new(
            0,
            Duration::from_millis(50),
            Duration::from_millis(10),
            Instant::now(),
        );
        assert!(f.hold_time(0) >= f.hold_time(1));
    }

    #[test]
    fn test_guard_undefined_does_not_reset_timer() {
        let t0 = Instant::now();
        let mut f = guard(0, t0);
        f.update(RawNotch::Notch(1), t0);
        f.update(RawNotch::Undefined, t0 + Duration::from_millis(10));
        assert_eq!(f.update(RawNotch::Notch(1), t0 + Duration::from_millis(25)), 1);
    }

    #[test]
    fn test_policy_build() {
        let now = Instant::now();
        let filter = FilterPolicy::Immediate.build(4, now);
        assert_eq!(filter.confirmed(), 4);
        let filter = FilterPolicy::default().build(1, now);
        assert!(matches!(filter, StabilizationFilter::ChatteringGuard(_)));
    }

    proptest! {
        #[test]
        fn prop_undefined_forever_keeps_initial(initial in 0u8..=9, steps in 1usize..200) {
            let t0 = Instant::now();
            let mut f = guard(initial, t0);
            let mut i = ImmediateFilter::new(initial);
            for step in 0..steps {
                let now = t0 + Duration::from_millis(step as u64 * 7);
                prop_assert_eq!(f.update(RawNotch::Undefined, now), initial);
                prop_assert_eq!(i.update(RawNotch::Undefined, now), initial);
            }
        }

        #[test]
        fn prop_held_value_confirms(value in 0u8..=9, extra_ms in 1u64..50) {
            let t0 = Instant::now();
            let mut f = guard(if value == 0 { 5 } else { 0 }, t0);
            f.update(RawNotch::Notch(value), t0);
            let hold = f.hold_time(value);
            prop_assert_eq!(
                f.update(RawNotch::Notch(value), t0 + hold + Duration::from_millis(extra_ms)),
                value
            );
        }
    }
}
