//! Nudge cycle state machine.
//!
//! One cycle moves the pointer by a small displacement, holds for a dwell so
//! the host sees two distinct frames, moves it back, and arms the next alarm.
//! The machine never blocks: each [`JiggleMachine::poll`] performs at most one
//! transition and tells the driver what to wait for before polling again.

use core::{fmt, ops::Add, time::Duration};

use crate::config::{BASE_INTERVAL_SECS, HOLD_DWELL, JIGGLE_ON_BOOT, SUSPENDED_RETRY};
use crate::jitter::JitterSequence;
use crate::schedule::{RealTimeClock, RealTimeScheduler, ScheduleError};
use crate::telemetry::{
    ReportDirection, TELEMETRY_RING_CAPACITY, TelemetryInstant, TelemetryRecorder,
};

mod report;

pub use report::{ActivityIndicator, HidReportSink, MovementReport, NoIndicator};

/// Phase of the nudge cycle.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum JiggleState {
    Idle,
    Triggering,
    Holding,
    Releasing,
}

impl JiggleState {
    /// Returns `true` from the outbound report until the return report.
    pub const fn is_nudging(self) -> bool {
        matches!(self, JiggleState::Holding | JiggleState::Releasing)
    }
}

impl fmt::Display for JiggleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JiggleState::Idle => f.write_str("idle"),
            JiggleState::Triggering => f.write_str("triggering"),
            JiggleState::Holding => f.write_str("holding"),
            JiggleState::Releasing => f.write_str("releasing"),
        }
    }
}

/// Tunables for the nudge cycle.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct JiggleConfig {
    /// Interval between nudges before jitter.
    pub base_interval_secs: u16,
    /// Minimum time between the outbound and the return report.
    pub hold_dwell: Duration,
    /// Outbound report; the return report is its inverse.
    pub nudge: MovementReport,
    /// Run the first cycle immediately after boot.
    pub jiggle_on_boot: bool,
    /// Pause between remote wake attempts while the host is suspended.
    pub suspended_retry: Duration,
}

impl JiggleConfig {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            base_interval_secs: BASE_INTERVAL_SECS,
            hold_dwell: HOLD_DWELL,
            nudge: MovementReport::nudge(),
            jiggle_on_boot: JIGGLE_ON_BOOT,
            suspended_retry: SUSPENDED_RETRY,
        }
    }

    #[must_use]
    pub const fn with_base_interval(mut self, secs: u16) -> Self {
        self.base_interval_secs = secs;
        self
    }

    #[must_use]
    pub const fn with_hold_dwell(mut self, dwell: Duration) -> Self {
        self.hold_dwell = dwell;
        self
    }

    #[must_use]
    pub const fn with_displacement(mut self, dx: i8, dy: i8) -> Self {
        self.nudge = MovementReport::displacement(dx, dy);
        self
    }

    #[must_use]
    pub const fn with_jiggle_on_boot(mut self, enabled: bool) -> Self {
        self.jiggle_on_boot = enabled;
        self
    }

    #[must_use]
    pub const fn with_suspended_retry(mut self, retry: Duration) -> Self {
        self.suspended_retry = retry;
        self
    }
}

impl Default for JiggleConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// What the driver should wait for before the next poll.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Wait<I> {
    /// Poll again right away.
    Now,
    /// Nothing to do until the wake latch is signalled.
    Wake,
    /// Nothing to do before the instant.
    Until(I),
    /// The report channel is busy.
    ReportSlot,
    /// Remote wake was requested; poll again once the bus resumes or after
    /// the suspended retry interval.
    HostResume,
}

/// Result of one poll.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Step<I> {
    pub state: JiggleState,
    pub next: Wait<I>,
}

/// Failure surfaced by [`JiggleMachine::poll`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum JiggleError<E> {
    /// Re-arming failed. The cycle itself completed and the machine is idle.
    Schedule(ScheduleError<E>),
}

impl<E: fmt::Debug> fmt::Display for JiggleError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JiggleError::Schedule(err) => write!(f, "re-arm failed: {err}"),
        }
    }
}

impl<E> From<ScheduleError<E>> for JiggleError<E> {
    fn from(err: ScheduleError<E>) -> Self {
        JiggleError::Schedule(err)
    }
}

/// Nudge cycle driver state.
pub struct JiggleMachine<I, const CAPACITY: usize = TELEMETRY_RING_CAPACITY>
where
    I: Copy,
{
    config: JiggleConfig,
    state: JiggleState,
    jitter: JitterSequence,
    hold_until: Option<I>,
    cycle_started: Option<I>,
    remote_wakes: u16,
    cycles_completed: u32,
    telemetry: TelemetryRecorder<I, CAPACITY>,
}

impl<I, const CAPACITY: usize> JiggleMachine<I, CAPACITY>
where
    I: TelemetryInstant + PartialOrd + Add<Duration, Output = I>,
{
    /// Creates an idle machine using the default jitter table.
    #[must_use]
    pub fn new(config: JiggleConfig) -> Self {
        Self::with_jitter(config, JitterSequence::default())
    }

    /// Creates an idle machine drawing offsets from `jitter`.
    #[must_use]
    pub fn with_jitter(config: JiggleConfig, jitter: JitterSequence) -> Self {
        Self {
            config,
            state: JiggleState::Idle,
            jitter,
            hold_until: None,
            cycle_started: None,
            remote_wakes: 0,
            cycles_completed: 0,
            telemetry: TelemetryRecorder::new(),
        }
    }

    pub const fn state(&self) -> JiggleState {
        self.state
    }

    pub const fn config(&self) -> &JiggleConfig {
        &self.config
    }

    pub const fn jitter(&self) -> &JitterSequence {
        &self.jitter
    }

    /// Number of cycles that reached the return report.
    pub const fn cycles_completed(&self) -> u32 {
        self.cycles_completed
    }

    pub const fn telemetry(&self) -> &TelemetryRecorder<I, CAPACITY> {
        &self.telemetry
    }

    /// Schedules the first cycle: immediately when `jiggle_on_boot` is set,
    /// otherwise one base interval from now.
    pub fn start<C: RealTimeClock>(
        &self,
        scheduler: &mut RealTimeScheduler<'_, C>,
    ) -> Result<(), ScheduleError<C::Error>> {
        if self.config.jiggle_on_boot {
            scheduler.request_wake();
            Ok(())
        } else {
            scheduler
                .arm(u32::from(self.config.base_interval_secs))
                .map(|_| ())
        }
    }

    /// Runs one pass of the state machine at `now`.
    pub fn poll<S, A, C>(
        &mut self,
        now: I,
        sink: &mut S,
        indicator: &mut A,
        scheduler: &mut RealTimeScheduler<'_, C>,
    ) -> Result<Step<I>, JiggleError<C::Error>>
    where
        S: HidReportSink,
        A: ActivityIndicator,
        C: RealTimeClock,
    {
        if !sink.is_report_channel_ready() {
            return Ok(self.step(Wait::ReportSlot));
        }

        match self.state {
            JiggleState::Idle => {
                if !scheduler.consume_wake() {
                    return Ok(self.step(Wait::Wake));
                }

                self.cycle_started = Some(now);
                self.remote_wakes = 0;
                self.telemetry.record_wake_consumed(now);
                self.state = JiggleState::Triggering;
                Ok(self.step(Wait::Now))
            }
            JiggleState::Triggering => {
                if sink.is_host_suspended() {
                    sink.request_remote_wake();
                    self.remote_wakes = self.remote_wakes.saturating_add(1);
                    self.telemetry.record_remote_wake(self.remote_wakes, now);
                    return Ok(self.step(Wait::HostResume));
                }

                let report = self.config.nudge;
                sink.send_movement_report(report);
                indicator.set_active(true);
                self.telemetry
                    .record_report(ReportDirection::Outbound, report, now);

                let deadline = now + self.config.hold_dwell;
                self.hold_until = Some(deadline);
                self.state = JiggleState::Holding;
                Ok(self.step(Wait::Until(deadline)))
            }
            JiggleState::Holding => {
                if let Some(deadline) = self.hold_until
                    && now < deadline
                {
                    return Ok(self.step(Wait::Until(deadline)));
                }

                self.hold_until = None;
                self.state = JiggleState::Releasing;
                Ok(self.step(Wait::Now))
            }
            JiggleState::Releasing => {
                let report = self.config.nudge.inverse();
                sink.send_movement_report(report);
                indicator.set_active(false);
                self.telemetry
                    .record_report(ReportDirection::Return, report, now);
                self.telemetry.record_cycle_complete(
                    self.cycle_started.take(),
                    self.remote_wakes,
                    now,
                );
                self.cycles_completed = self.cycles_completed.wrapping_add(1);
                self.state = JiggleState::Idle;

                let offset = self.jitter.peek();
                let delay = self.jitter.next_delay(self.config.base_interval_secs);
                let request = scheduler.arm(delay)?;
                self.telemetry.record_alarm_armed(request, offset, now);
                Ok(self.step(Wait::Wake))
            }
        }
    }

    fn step(&self, next: Wait<I>) -> Step<I> {
        Step {
            state: self.state,
            next,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let config = JiggleConfig::default()
            .with_base_interval(30)
            .with_hold_dwell(Duration::from_millis(25))
            .with_displacement(2, -1)
            .with_jiggle_on_boot(false)
            .with_suspended_retry(Duration::from_millis(5));

        assert_eq!(config.base_interval_secs, 30);
        assert_eq!(config.hold_dwell, Duration::from_millis(25));
        assert_eq!(config.nudge, MovementReport::displacement(2, -1));
        assert!(!config.jiggle_on_boot);
        assert_eq!(config.suspended_retry, Duration::from_millis(5));
    }

    #[test]
    fn defaults_match_shipped_constants() {
        let config = JiggleConfig::default();
        assert_eq!(config.base_interval_secs, 90);
        assert_eq!(config.hold_dwell, Duration::from_millis(10));
        assert_eq!((config.nudge.x, config.nudge.y), (0, 1));
        assert!(config.jiggle_on_boot);
    }

    #[test]
    fn only_holding_and_releasing_count_as_nudging() {
        assert!(!JiggleState::Idle.is_nudging());
        assert!(!JiggleState::Triggering.is_nudging());
        assert!(JiggleState::Holding.is_nudging());
        assert!(JiggleState::Releasing.is_nudging());
    }
}
