//! Polling driver for targets without an async executor.
//!
//! Each pass pumps the USB stack until it reports no pending work, evaluates
//! the state machine, and tells the caller how long it may idle.

use core::{ops::Add, time::Duration};

use crate::config::IDLE_TICK;
use crate::jiggle::{ActivityIndicator, HidReportSink, JiggleError, JiggleMachine, Step, Wait};
use crate::schedule::{RealTimeClock, RealTimeScheduler, ScheduleError};
use crate::telemetry::{TELEMETRY_RING_CAPACITY, TelemetryInstant};

/// USB device stack that needs periodic servicing from the main loop.
pub trait UsbStack {
    /// Services queued bus events and transfers.
    fn pump_pending_work(&mut self);

    /// Returns `true` while more work is queued.
    fn has_pending_work(&self) -> bool;
}

/// Summary of one [`CooperativeLoop::run_pass`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Pass<I> {
    /// Number of times the USB stack was pumped.
    pub pumps: u32,
    pub step: Step<I>,
    /// How long the caller may idle before the next pass.
    pub idle: Duration,
}

/// Scheduler plus state machine, driven one pass at a time.
pub struct CooperativeLoop<'a, I, C, const CAPACITY: usize = TELEMETRY_RING_CAPACITY>
where
    I: Copy,
    C: RealTimeClock,
{
    machine: JiggleMachine<I, CAPACITY>,
    scheduler: RealTimeScheduler<'a, C>,
}

impl<'a, I, C, const CAPACITY: usize> CooperativeLoop<'a, I, C, CAPACITY>
where
    I: TelemetryInstant + PartialOrd + Add<Duration, Output = I>,
    C: RealTimeClock,
{
    pub fn new(machine: JiggleMachine<I, CAPACITY>, scheduler: RealTimeScheduler<'a, C>) -> Self {
        Self { machine, scheduler }
    }

    /// Seeds the RTC and schedules the first cycle.
    pub fn start(&mut self) -> Result<(), ScheduleError<C::Error>> {
        self.scheduler.initialize().map_err(ScheduleError::Clock)?;
        self.machine.start(&mut self.scheduler)
    }

    /// Runs one loop iteration at `now`.
    pub fn run_pass<U, A>(
        &mut self,
        now: I,
        usb: &mut U,
        indicator: &mut A,
    ) -> Result<Pass<I>, JiggleError<C::Error>>
    where
        U: UsbStack + HidReportSink,
        A: ActivityIndicator,
    {
        let mut pumps = 0_u32;
        loop {
            usb.pump_pending_work();
            pumps = pumps.saturating_add(1);
            if !usb.has_pending_work() {
                break;
            }
        }

        let step = self
            .machine
            .poll(now, usb, indicator, &mut self.scheduler)?;

        Ok(Pass {
            pumps,
            step,
            idle: idle_budget(step.next, now),
        })
    }

    pub fn machine(&self) -> &JiggleMachine<I, CAPACITY> {
        &self.machine
    }

    pub fn scheduler(&self) -> &RealTimeScheduler<'a, C> {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut RealTimeScheduler<'a, C> {
        &mut self.scheduler
    }
}

/// Idle time before the next pass, capped at one tick so the USB stack keeps
/// being serviced.
fn idle_budget<I: TelemetryInstant>(next: Wait<I>, now: I) -> Duration {
    match next {
        Wait::Now => Duration::ZERO,
        Wait::Until(deadline) => deadline.saturating_duration_since(now).min(IDLE_TICK),
        Wait::Wake | Wait::ReportSlot | Wait::HostResume => IDLE_TICK,
    }
}
