#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Shared USB link status for the firmware target.
//!
//! The USB device callbacks write these flags; the jiggle task reads them
//! through its report sink.

use portable_atomic::{AtomicBool, AtomicU32, Ordering};

/// Set while the host keeps the bus suspended.
static BUS_SUSPENDED: AtomicBool = AtomicBool::new(false);
/// Set once the host selects a configuration; cleared on reset.
static CONFIGURED: AtomicBool = AtomicBool::new(false);
/// Remote wake requests issued since boot.
static REMOTE_WAKE_REQUESTS: AtomicU32 = AtomicU32::new(0);

/// Point-in-time copy of the link flags.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct LinkStatus {
    pub suspended: bool,
    pub configured: bool,
    pub remote_wake_requests: u32,
}

pub fn set_suspended(suspended: bool) {
    BUS_SUSPENDED.store(suspended, Ordering::Release);
}

pub fn is_suspended() -> bool {
    BUS_SUSPENDED.load(Ordering::Acquire)
}

pub fn set_configured(configured: bool) {
    CONFIGURED.store(configured, Ordering::Release);
}

pub fn is_configured() -> bool {
    CONFIGURED.load(Ordering::Acquire)
}

/// Counts a remote wake request and returns the new total.
pub fn record_remote_wake_request() -> u32 {
    REMOTE_WAKE_REQUESTS
        .fetch_add(1, Ordering::Relaxed)
        .wrapping_add(1)
}

pub fn snapshot() -> LinkStatus {
    LinkStatus {
        suspended: is_suspended(),
        configured: is_configured(),
        remote_wake_requests: REMOTE_WAKE_REQUESTS.load(Ordering::Relaxed),
    }
}
