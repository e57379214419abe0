//! On-board LED used as the nudge indicator.

use embassy_rp::gpio::Output;
use jiggler_core::jiggle::ActivityIndicator;

/// Active-high LED; lit from the outbound report until the return report.
pub struct LedIndicator<'d> {
    pin: Output<'d>,
}

impl<'d> LedIndicator<'d> {
    pub fn new(pin: Output<'d>) -> Self {
        Self { pin }
    }
}

impl ActivityIndicator for LedIndicator<'_> {
    fn set_active(&mut self, active: bool) {
        if active {
            self.pin.set_high();
        } else {
            self.pin.set_low();
        }
    }
}
