//! HID-facing types: the relative pointer report and the sinks it goes to.

use crate::config::{NUDGE_DX, NUDGE_DY};

/// Relative pointer report in the standard boot-mouse layout.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct MovementReport {
    pub buttons: u8,
    pub x: i8,
    pub y: i8,
    pub wheel: i8,
    pub pan: i8,
}

impl MovementReport {
    /// Report moving the pointer by `(dx, dy)` with nothing else pressed.
    #[must_use]
    pub const fn displacement(dx: i8, dy: i8) -> Self {
        Self {
            buttons: 0,
            x: dx,
            y: dy,
            wheel: 0,
            pan: 0,
        }
    }

    /// Default nudge: one count down the Y axis.
    #[must_use]
    pub const fn nudge() -> Self {
        Self::displacement(NUDGE_DX, NUDGE_DY)
    }

    /// Report undoing this one's displacement. Buttons are carried over.
    ///
    /// `i8::MIN` saturates to `i8::MAX`, so only reports with every axis in
    /// `-127..=127` are exactly reversible.
    #[must_use]
    pub const fn inverse(self) -> Self {
        Self {
            buttons: self.buttons,
            x: self.x.saturating_neg(),
            y: self.y.saturating_neg(),
            wheel: self.wheel.saturating_neg(),
            pan: self.pan.saturating_neg(),
        }
    }

    /// Returns `true` when the report moves nothing.
    #[must_use]
    pub const fn is_still(&self) -> bool {
        self.x == 0 && self.y == 0 && self.wheel == 0 && self.pan == 0
    }
}

/// USB HID interface as seen by the state machine.
pub trait HidReportSink {
    /// Returns `true` when a report can be queued without blocking.
    fn is_report_channel_ready(&self) -> bool;

    /// Returns `true` while the host keeps the bus suspended.
    fn is_host_suspended(&self) -> bool;

    /// Asks the host to resume the bus.
    fn request_remote_wake(&mut self);

    /// Queues a report on the interrupt IN endpoint.
    fn send_movement_report(&mut self, report: MovementReport);
}

/// Visible "nudge in progress" signal.
pub trait ActivityIndicator {
    fn set_active(&mut self, active: bool);
}

/// Indicator for boards without one.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoIndicator;

impl ActivityIndicator for NoIndicator {
    fn set_active(&mut self, _: bool) {}
}
