//! RP2040 RTC behind the [`RealTimeClock`] trait.
//!
//! The driver lives in a critical-section mutex so the alarm interrupt can
//! disarm it while the jiggle task holds a [`RtcHandle`].

use core::cell::RefCell;

use critical_section::Mutex;
use embassy_rp::interrupt;
use embassy_rp::interrupt::InterruptExt;
use embassy_rp::peripherals::RTC;
use embassy_rp::rtc::{DateTime, DateTimeFilter, DayOfWeek, Rtc, RtcError};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use jiggler_core::schedule::{
    AlarmFilter, CalendarError, CalendarTime, RealTimeClock, WakeLatch, alarm_fired,
};

static RTC_DRIVER: Mutex<RefCell<Option<Rtc<'static, RTC>>>> = Mutex::new(RefCell::new(None));

/// Set by the alarm interrupt, consumed by the state machine.
pub static WAKE_LATCH: WakeLatch = WakeLatch::new();
/// Wakes the jiggle task after the latch is set.
pub static ALARM_EVENT: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Failure reported by [`RtcHandle`].
#[derive(Debug)]
pub enum RtcAccessError {
    /// [`install`] has not run.
    NotInstalled,
    /// The peripheral rejected the request or is not running.
    Hardware(RtcError),
    /// The peripheral returned a value outside the calendar.
    Calendar(CalendarError),
}

/// Hands the driver to the alarm interrupt and unmasks `RTC_IRQ`.
pub fn install(rtc: Rtc<'static, RTC>) -> RtcHandle {
    critical_section::with(|cs| {
        RTC_DRIVER.borrow_ref_mut(cs).replace(rtc);
    });
    interrupt::RTC_IRQ.unpend();
    unsafe { interrupt::RTC_IRQ.enable() };
    RtcHandle
}

/// Access token for the installed driver.
pub struct RtcHandle;

impl RtcHandle {
    fn with<R>(
        &mut self,
        f: impl FnOnce(&mut Rtc<'static, RTC>) -> R,
    ) -> Result<R, RtcAccessError> {
        critical_section::with(|cs| {
            RTC_DRIVER
                .borrow_ref_mut(cs)
                .as_mut()
                .map(f)
                .ok_or(RtcAccessError::NotInstalled)
        })
    }
}

impl RealTimeClock for RtcHandle {
    type Error = RtcAccessError;

    fn now(&mut self) -> Result<CalendarTime, Self::Error> {
        let time = self
            .with(|rtc| rtc.now())?
            .map_err(RtcAccessError::Hardware)?;
        to_calendar(&time).map_err(RtcAccessError::Calendar)
    }

    fn set_time(&mut self, time: CalendarTime) -> Result<(), Self::Error> {
        self.with(|rtc| rtc.set_datetime(to_datetime(&time)))?
            .map_err(RtcAccessError::Hardware)
    }

    fn schedule_alarm(&mut self, filter: AlarmFilter) {
        if self.with(|rtc| rtc.schedule_alarm(to_filter(&filter))).is_err() {
            defmt::warn!("rtc: alarm requested before install");
        }
    }

    fn disable_alarm(&mut self) {
        let _ = self.with(|rtc| rtc.disable_alarm());
    }
}

#[interrupt]
fn RTC_IRQ() {
    alarm_fired(&mut RtcHandle, &WAKE_LATCH);
    ALARM_EVENT.signal(());
}

const fn weekday_index(day: DayOfWeek) -> u8 {
    match day {
        DayOfWeek::Sunday => 0,
        DayOfWeek::Monday => 1,
        DayOfWeek::Tuesday => 2,
        DayOfWeek::Wednesday => 3,
        DayOfWeek::Thursday => 4,
        DayOfWeek::Friday => 5,
        DayOfWeek::Saturday => 6,
    }
}

const fn day_of_week(index: u8) -> DayOfWeek {
    match index % 7 {
        0 => DayOfWeek::Sunday,
        1 => DayOfWeek::Monday,
        2 => DayOfWeek::Tuesday,
        3 => DayOfWeek::Wednesday,
        4 => DayOfWeek::Thursday,
        5 => DayOfWeek::Friday,
        _ => DayOfWeek::Saturday,
    }
}

fn to_calendar(time: &DateTime) -> Result<CalendarTime, CalendarError> {
    CalendarTime::new(
        time.year,
        time.month,
        time.day,
        weekday_index(time.day_of_week),
        time.hour,
        time.minute,
        time.second,
    )
}

fn to_datetime(time: &CalendarTime) -> DateTime {
    DateTime {
        year: time.year,
        month: time.month,
        day: time.day,
        day_of_week: day_of_week(time.weekday),
        hour: time.hour,
        minute: time.minute,
        second: time.second,
    }
}

fn to_filter(filter: &AlarmFilter) -> DateTimeFilter {
    let mut out = DateTimeFilter::default();
    if let Some(year) = filter.year {
        out = out.year(year);
    }
    if let Some(month) = filter.month {
        out = out.month(month);
    }
    if let Some(day) = filter.day {
        out = out.day(day);
    }
    if let Some(weekday) = filter.weekday {
        out = out.day_of_week(day_of_week(weekday));
    }
    if let Some(hour) = filter.hour {
        out = out.hour(hour);
    }
    if let Some(minute) = filter.minute {
        out = out.minute(minute);
    }
    if let Some(second) = filter.second {
        out = out.second(second);
    }
    out
}
