//! Wake scheduling on top of the RP2040 real-time clock.
//!
//! The RTC alarm compares each calendar field against a programmed value and
//! can treat any field as "match anything". Arming only the minute and second
//! turns it into a repeating sub-hour alarm: it fires the next time the clock
//! reaches `mm:ss`, which is always within the next hour. That keeps the
//! arithmetic free of hour/day/month rollover, at the cost of a hard bound on
//! the delay ([`MAX_ALARM_DELAY_SECS`]) and of disarming on every fire so the
//! same `mm:ss` does not match again an hour later.

use core::fmt;

use crate::config::{SEED_DAY, SEED_MONTH, SEED_WEEKDAY, SEED_YEAR};

mod latch;
pub mod sim;

pub use latch::WakeLatch;

/// Exclusive upper bound on an alarm delay.
///
/// A delay of 3600 s or more would land on a `mm:ss` that also occurs
/// earlier within the same hour, so the alarm would fire too soon.
pub const MAX_ALARM_DELAY_SECS: u32 = 3_600;

/// Calendar value as stored in the RTC.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct CalendarTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    /// 0 = Sunday.
    pub weekday: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

/// Calendar field rejected by [`CalendarTime::new`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CalendarError {
    Month(u8),
    Day(u8),
    Weekday(u8),
    Hour(u8),
    Minute(u8),
    Second(u8),
}

impl fmt::Display for CalendarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalendarError::Month(value) => write!(f, "month {value} out of range"),
            CalendarError::Day(value) => write!(f, "day {value} out of range"),
            CalendarError::Weekday(value) => write!(f, "weekday {value} out of range"),
            CalendarError::Hour(value) => write!(f, "hour {value} out of range"),
            CalendarError::Minute(value) => write!(f, "minute {value} out of range"),
            CalendarError::Second(value) => write!(f, "second {value} out of range"),
        }
    }
}

const fn is_leap_year(year: u16) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

const fn days_in_month(year: u16, month: u8) -> u8 {
    match month {
        2 if is_leap_year(year) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

impl CalendarTime {
    /// Validates and builds a calendar value.
    pub fn new(
        year: u16,
        month: u8,
        day: u8,
        weekday: u8,
        hour: u8,
        minute: u8,
        second: u8,
    ) -> Result<Self, CalendarError> {
        if !(1..=12).contains(&month) {
            return Err(CalendarError::Month(month));
        }
        if day == 0 || day > days_in_month(year, month) {
            return Err(CalendarError::Day(day));
        }
        if weekday > 6 {
            return Err(CalendarError::Weekday(weekday));
        }
        if hour > 23 {
            return Err(CalendarError::Hour(hour));
        }
        if minute > 59 {
            return Err(CalendarError::Minute(minute));
        }
        if second > 59 {
            return Err(CalendarError::Second(second));
        }

        Ok(Self {
            year,
            month,
            day,
            weekday,
            hour,
            minute,
            second,
        })
    }

    /// Value the RTC is seeded with at boot.
    #[must_use]
    pub const fn seed() -> Self {
        Self {
            year: SEED_YEAR,
            month: SEED_MONTH,
            day: SEED_DAY,
            weekday: SEED_WEEKDAY,
            hour: 0,
            minute: 0,
            second: 0,
        }
    }

    /// Returns the value `seconds` later, carrying through every field.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn plus_seconds(self, seconds: u32) -> Self {
        let mut next = self;

        let total = u32::from(next.second) + seconds;
        next.second = (total % 60) as u8;
        let total = u32::from(next.minute) + total / 60;
        next.minute = (total % 60) as u8;
        let total = u32::from(next.hour) + total / 60;
        next.hour = (total % 24) as u8;

        for _ in 0..total / 24 {
            next.weekday = (next.weekday + 1) % 7;
            if next.day < days_in_month(next.year, next.month) {
                next.day += 1;
            } else if next.month < 12 {
                next.day = 1;
                next.month += 1;
            } else {
                next.day = 1;
                next.month = 1;
                next.year = next.year.wrapping_add(1);
            }
        }

        next
    }
}

/// Per-field alarm comparison; `None` matches any value.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct AlarmFilter {
    pub year: Option<u16>,
    pub month: Option<u8>,
    pub day: Option<u8>,
    pub weekday: Option<u8>,
    pub hour: Option<u8>,
    pub minute: Option<u8>,
    pub second: Option<u8>,
}

impl AlarmFilter {
    /// Filter matching `minute:second` of any hour, day, month, and year.
    #[must_use]
    pub const fn minute_second(minute: u8, second: u8) -> Self {
        Self {
            year: None,
            month: None,
            day: None,
            weekday: None,
            hour: None,
            minute: Some(minute),
            second: Some(second),
        }
    }

    /// Evaluates the filter the way the RTC comparator does.
    #[must_use]
    pub fn matches(&self, time: &CalendarTime) -> bool {
        fn field<T: PartialEq>(expected: Option<T>, actual: T) -> bool {
            expected.is_none_or(|value| value == actual)
        }

        field(self.year, time.year)
            && field(self.month, time.month)
            && field(self.day, time.day)
            && field(self.weekday, time.weekday)
            && field(self.hour, time.hour)
            && field(self.minute, time.minute)
            && field(self.second, time.second)
    }

    /// Returns `true` when every field coarser than the minute is a wildcard.
    #[must_use]
    pub const fn is_sub_hour(&self) -> bool {
        self.year.is_none()
            && self.month.is_none()
            && self.day.is_none()
            && self.weekday.is_none()
            && self.hour.is_none()
    }
}

/// Alarm computed from a relative delay.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct AlarmRequest {
    pub delay_secs: u32,
    pub target_minute: u8,
    pub target_second: u8,
}

impl AlarmRequest {
    /// Computes the `mm:ss` target `delay_secs` after `now`.
    pub fn after<E>(now: &CalendarTime, delay_secs: u32) -> Result<Self, ScheduleError<E>> {
        if delay_secs >= MAX_ALARM_DELAY_SECS {
            return Err(ScheduleError::DelayOutOfRange { delay_secs });
        }

        let (target_minute, target_second) = alarm_target(now.minute, now.second, delay_secs);
        Ok(Self {
            delay_secs,
            target_minute,
            target_second,
        })
    }

    /// Filter to program into the RTC.
    #[must_use]
    pub const fn filter(&self) -> AlarmFilter {
        AlarmFilter::minute_second(self.target_minute, self.target_second)
    }
}

/// Minute and second reached `delay_secs` after `minute:second`, modulo one hour.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub const fn alarm_target(minute: u8, second: u8, delay_secs: u32) -> (u8, u8) {
    let seconds = second as u32 + delay_secs;
    let target_second = (seconds % 60) as u8;
    let carry = seconds / 60;
    let target_minute = ((minute as u32 + carry) % 60) as u8;
    (target_minute, target_second)
}

/// Failure reported while arming an alarm.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ScheduleError<E> {
    /// The delay violates the sub-hour bound.
    DelayOutOfRange { delay_secs: u32 },
    /// The RTC could not be read or written.
    Clock(E),
}

impl<E: fmt::Debug> fmt::Display for ScheduleError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleError::DelayOutOfRange { delay_secs } => write!(
                f,
                "alarm delay {delay_secs}s not below {MAX_ALARM_DELAY_SECS}s"
            ),
            ScheduleError::Clock(err) => write!(f, "rtc error: {err:?}"),
        }
    }
}

/// Access to the RTC hardware.
pub trait RealTimeClock {
    /// Hardware-specific error type.
    type Error;

    /// Reads the current calendar value.
    fn now(&mut self) -> Result<CalendarTime, Self::Error>;

    /// Starts the clock (if needed) and loads `time`.
    fn set_time(&mut self, time: CalendarTime) -> Result<(), Self::Error>;

    /// Programs and enables the alarm comparator along with its interrupt.
    fn schedule_alarm(&mut self, filter: AlarmFilter);

    /// Disables the alarm comparator, clearing any pending match.
    fn disable_alarm(&mut self);
}

/// Owns the RTC and the wake latch the alarm interrupt feeds.
pub struct RealTimeScheduler<'a, C: RealTimeClock> {
    clock: C,
    latch: &'a WakeLatch,
    last_request: Option<AlarmRequest>,
}

impl<'a, C: RealTimeClock> RealTimeScheduler<'a, C> {
    /// Wraps a clock and the latch its interrupt handler signals.
    pub const fn new(clock: C, latch: &'a WakeLatch) -> Self {
        Self {
            clock,
            latch,
            last_request: None,
        }
    }

    /// Starts the clock from the seed calendar value with no alarm armed.
    pub fn initialize(&mut self) -> Result<(), C::Error> {
        self.clock.disable_alarm();
        self.clock.set_time(CalendarTime::seed())
    }

    /// Replaces any armed alarm with one firing `delay_secs` from now.
    ///
    /// The previous alarm is disarmed even when the new one is rejected.
    pub fn arm(&mut self, delay_secs: u32) -> Result<AlarmRequest, ScheduleError<C::Error>> {
        self.clock.disable_alarm();

        if delay_secs >= MAX_ALARM_DELAY_SECS {
            return Err(ScheduleError::DelayOutOfRange { delay_secs });
        }

        let now = self.clock.now().map_err(ScheduleError::Clock)?;
        let request = AlarmRequest::after(&now, delay_secs)?;

        self.clock.schedule_alarm(request.filter());
        self.last_request = Some(request);
        Ok(request)
    }

    /// Disarms the alarm without scheduling a new one.
    pub fn disarm(&mut self) {
        self.clock.disable_alarm();
    }

    /// Consumes a pending wake.
    pub fn consume_wake(&self) -> bool {
        self.latch.take()
    }

    /// Requests a wake without waiting for the alarm.
    pub fn request_wake(&self) {
        self.latch.signal();
    }

    /// Most recently armed alarm.
    pub const fn last_request(&self) -> Option<AlarmRequest> {
        self.last_request
    }

    /// Provides access to the wrapped clock.
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Provides mutable access to the wrapped clock.
    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    /// Returns the latch the alarm interrupt signals.
    pub const fn latch(&self) -> &'a WakeLatch {
        self.latch
    }
}

/// Alarm interrupt body: disarm first so the `mm:ss` match cannot repeat an
/// hour later, then publish the wake.
pub fn alarm_fired<C: RealTimeClock>(clock: &mut C, latch: &WakeLatch) {
    clock.disable_alarm();
    latch.signal();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_carries_into_minute_and_wraps_hour() {
        assert_eq!(alarm_target(59, 55, 10), (0, 5));
        assert_eq!(alarm_target(10, 30, 0), (10, 30));
        assert_eq!(alarm_target(0, 0, 3_599), (59, 59));
        assert_eq!(alarm_target(12, 58, 112), (14, 50));
    }

    #[test]
    fn request_rejects_delay_of_an_hour() {
        let now = CalendarTime::seed();
        assert_eq!(
            AlarmRequest::after::<()>(&now, 3_600),
            Err(ScheduleError::DelayOutOfRange { delay_secs: 3_600 })
        );
        assert!(AlarmRequest::after::<()>(&now, 3_599).is_ok());
    }

    #[test]
    fn minute_second_filter_ignores_coarse_fields() {
        let filter = AlarmFilter::minute_second(0, 5);
        assert!(filter.is_sub_hour());

        let mut time = CalendarTime::seed();
        time.minute = 0;
        time.second = 5;
        assert!(filter.matches(&time));

        time.hour = 17;
        time.day = 28;
        time.year = 2031;
        assert!(filter.matches(&time));

        time.second = 6;
        assert!(!filter.matches(&time));
    }

    #[test]
    fn calendar_validation_rejects_bad_fields() {
        assert_eq!(
            CalendarTime::new(2020, 13, 1, 0, 0, 0, 0),
            Err(CalendarError::Month(13))
        );
        assert_eq!(
            CalendarTime::new(2021, 2, 29, 0, 0, 0, 0),
            Err(CalendarError::Day(29))
        );
        assert!(CalendarTime::new(2020, 2, 29, 6, 23, 59, 59).is_ok());
        assert_eq!(
            CalendarTime::new(2020, 1, 1, 7, 0, 0, 0),
            Err(CalendarError::Weekday(7))
        );
        assert_eq!(
            CalendarTime::new(2020, 1, 1, 3, 0, 60, 0),
            Err(CalendarError::Minute(60))
        );
    }

    #[test]
    fn plus_seconds_rolls_over_year_end() {
        let eve = CalendarTime::new(2020, 12, 31, 4, 23, 59, 50).expect("valid");
        let next = eve.plus_seconds(15);
        assert_eq!(
            next,
            CalendarTime::new(2021, 1, 1, 5, 0, 0, 5).expect("valid")
        );
    }

    #[test]
    fn plus_seconds_handles_leap_day() {
        let start = CalendarTime::new(2020, 2, 28, 5, 12, 0, 0).expect("valid");
        let next = start.plus_seconds(24 * 3_600);
        assert_eq!((next.month, next.day, next.weekday), (2, 29, 6));
        let next = next.plus_seconds(24 * 3_600);
        assert_eq!((next.month, next.day, next.weekday), (3, 1, 0));
    }
}
