#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Embassy instants adapted to the time traits of `jiggler-core`.

use core::{ops::Add, time::Duration};

use embassy_time::{Duration as EmbassyDuration, Instant};
use jiggler_core::telemetry::TelemetryInstant;

/// Monotonic timestamp used by the state machine and telemetry.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub struct FirmwareInstant(Instant);

impl FirmwareInstant {
    pub fn now() -> Self {
        Self(Instant::now())
    }

    pub const fn into_embassy(self) -> Instant {
        self.0
    }

    pub fn as_micros(self) -> u64 {
        self.0.as_micros()
    }
}

impl From<Instant> for FirmwareInstant {
    fn from(value: Instant) -> Self {
        Self(value)
    }
}

/// Converts a core duration, saturating at the largest Embassy duration.
pub fn to_embassy_duration(duration: Duration) -> EmbassyDuration {
    EmbassyDuration::from_micros(u64::try_from(duration.as_micros()).unwrap_or(u64::MAX))
}

impl Add<Duration> for FirmwareInstant {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        let later = self
            .0
            .checked_add(to_embassy_duration(rhs))
            .unwrap_or(Instant::MAX);
        Self(later)
    }
}

impl TelemetryInstant for FirmwareInstant {
    fn saturating_duration_since(&self, earlier: Self) -> Duration {
        let micros = self
            .0
            .checked_duration_since(earlier.0)
            .map_or(0, |elapsed| elapsed.as_micros());
        Duration::from_micros(micros)
    }
}
