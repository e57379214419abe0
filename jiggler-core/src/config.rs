//! Compile-time defaults shared by the firmware and the host emulator.
//!
//! Timing and displacement values are tunable through
//! [`JiggleConfig`](crate::jiggle::JiggleConfig); the constants here are the
//! values the device ships with.

use core::time::Duration;

/// Interval between nudges before jitter is applied.
pub const BASE_INTERVAL_SECS: u16 = 90;

/// Minimum time between the outbound and the return report.
///
/// The host input stack needs two separate frames to register the movement;
/// a move and its inverse inside one frame may collapse to nothing.
pub const HOLD_DWELL: Duration = Duration::from_millis(10);

/// Delay between passes of the cooperative loop when no work is pending.
pub const IDLE_TICK: Duration = Duration::from_millis(1);

/// Delay between remote-wake retries while the host keeps the bus suspended.
pub const SUSPENDED_RETRY: Duration = Duration::from_millis(1);

/// Default outbound displacement on the X axis.
pub const NUDGE_DX: i8 = 0;

/// Default outbound displacement on the Y axis.
pub const NUDGE_DY: i8 = 1;

/// Whether the first nudge runs right after boot instead of waiting a full interval.
pub const JIGGLE_ON_BOOT: bool = true;

/// Reference crystal on the Pico board.
pub const XOSC_HZ: u32 = 12_000_000;

/// Target system clock.
pub const SYS_CLK_HZ: u32 = 48_000_000;

/// Divider from the crystal to the RTC reference (12 MHz / 256 = 46 875 Hz).
pub const RTC_CLK_DIV: u32 = 256;

/// Arbitrary but valid calendar value the RTC is seeded with at boot.
///
/// Only elapsed-time arithmetic matters downstream; 2020-01-01 was a Wednesday.
pub const SEED_YEAR: u16 = 2020;
pub const SEED_MONTH: u8 = 1;
pub const SEED_DAY: u8 = 1;
pub const SEED_WEEKDAY: u8 = 3;
