//! RP2040 bindings for the board: clock tree, RTC alarm and activity LED.

pub mod clocks;
pub mod led;
pub mod rtc;
