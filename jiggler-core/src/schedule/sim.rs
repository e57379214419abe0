//! Software model of the RTC used by the host emulator and tests.

use core::fmt;

use super::{AlarmFilter, CalendarTime, RealTimeClock};

/// Error returned when the simulated clock is read before being started.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct NotRunning;

impl fmt::Display for NotRunning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("rtc not running")
    }
}

/// Second-resolution RTC with a single alarm comparator.
#[derive(Clone, Debug, Default)]
pub struct SimulatedRtc {
    time: Option<CalendarTime>,
    alarm: Option<AlarmFilter>,
    armed_count: u32,
}

impl SimulatedRtc {
    /// Creates a stopped clock with no alarm.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            time: None,
            alarm: None,
            armed_count: 0,
        }
    }

    /// Alarm currently enabled, if any.
    #[must_use]
    pub const fn alarm(&self) -> Option<AlarmFilter> {
        self.alarm
    }

    /// Number of times an alarm has been programmed.
    #[must_use]
    pub const fn armed_count(&self) -> u32 {
        self.armed_count
    }

    /// Advances one second. Returns `true` when the enabled alarm matches
    /// the new value.
    pub fn tick(&mut self) -> bool {
        let Some(time) = self.time.as_mut() else {
            return false;
        };
        *time = time.plus_seconds(1);

        self.alarm.is_some_and(|filter| filter.matches(time))
    }

    /// Advances until the alarm matches or `limit_secs` elapse, returning the
    /// seconds advanced when it matched.
    pub fn run_until_alarm(&mut self, limit_secs: u32) -> Option<u32> {
        (1..=limit_secs).find(|_| self.tick())
    }
}

impl RealTimeClock for SimulatedRtc {
    type Error = NotRunning;

    fn now(&mut self) -> Result<CalendarTime, Self::Error> {
        self.time.ok_or(NotRunning)
    }

    fn set_time(&mut self, time: CalendarTime) -> Result<(), Self::Error> {
        self.time = Some(time);
        Ok(())
    }

    fn schedule_alarm(&mut self, filter: AlarmFilter) {
        self.alarm = Some(filter);
        self.armed_count += 1;
    }

    fn disable_alarm(&mut self) {
        self.alarm = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stopped_clock_reports_error_and_never_matches() {
        let mut rtc = SimulatedRtc::new();
        assert_eq!(rtc.now(), Err(NotRunning));
        rtc.schedule_alarm(AlarmFilter::minute_second(0, 1));
        assert!(!rtc.tick());
    }

    #[test]
    fn wildcard_alarm_repeats_hourly_until_disabled() {
        let mut rtc = SimulatedRtc::new();
        rtc.set_time(CalendarTime::seed()).expect("set");
        rtc.schedule_alarm(AlarmFilter::minute_second(0, 30));

        assert_eq!(rtc.run_until_alarm(3_600), Some(30));
        assert_eq!(rtc.run_until_alarm(7_200), Some(3_600));

        rtc.disable_alarm();
        assert_eq!(rtc.run_until_alarm(7_200), None);
    }
}
