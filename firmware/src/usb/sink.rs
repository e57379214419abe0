#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Single-slot report sink between the state machine and the HID endpoint.
//!
//! The state machine queues at most one report per poll; the jiggle task
//! flushes it to the endpoint before the next poll. An occupied slot is what
//! the state machine sees as a busy report channel.

use jiggler_core::jiggle::{HidReportSink, MovementReport};

#[derive(Debug, Default)]
pub struct ReportSlot {
    pending: Option<MovementReport>,
    host_suspended: bool,
    wake_requested: bool,
}

impl ReportSlot {
    pub const fn new() -> Self {
        Self {
            pending: None,
            host_suspended: false,
            wake_requested: false,
        }
    }

    /// Refreshes the bus state before a poll.
    pub fn set_host_suspended(&mut self, suspended: bool) {
        self.host_suspended = suspended;
    }

    /// Removes the queued report so it can be written to the endpoint.
    pub fn take_pending(&mut self) -> Option<MovementReport> {
        self.pending.take()
    }

    /// Returns `true` once per remote wake request made by the state machine.
    pub fn take_wake_request(&mut self) -> bool {
        core::mem::take(&mut self.wake_requested)
    }
}

impl HidReportSink for ReportSlot {
    fn is_report_channel_ready(&self) -> bool {
        self.pending.is_none()
    }

    fn is_host_suspended(&self) -> bool {
        self.host_suspended
    }

    fn request_remote_wake(&mut self) {
        self.wake_requested = true;
    }

    fn send_movement_report(&mut self, report: MovementReport) {
        self.pending = Some(report);
    }
}
