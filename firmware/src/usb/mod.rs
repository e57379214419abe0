//! USB HID mouse.
//!
//! One HID interface carrying the boot-style mouse report (buttons, x, y,
//! wheel, pan) on a 5 ms interrupt endpoint. The configuration descriptor
//! advertises remote wakeup so the device can rouse a sleeping host.

#![cfg_attr(not(target_os = "none"), allow(dead_code))]

#[cfg(target_os = "none")]
mod device;
mod sink;

#[cfg(target_os = "none")]
pub use device::{MouseWriter, UsbBuffers, UsbMouse, to_mouse_report};
pub use sink::ReportSlot;

/// Test VID used by the TinyUSB examples.
pub const USB_VID: u16 = 0xCAFE;
/// TinyUSB-style PID: 0x4000 with the HID interface bit (bit 2) set.
pub const USB_PID: u16 = 0x4000 | (1 << 2);
/// Interrupt endpoint polling interval.
pub const HID_POLL_MS: u8 = 5;
/// Bus power drawn from the host.
pub const MAX_POWER_MA: u16 = 100;

/// Descriptor strings the host shows for the mouse.
#[derive(Clone, Copy, Debug)]
pub struct MouseIdentity {
    pub vendor: &'static str,
    pub name: &'static str,
    pub serial: Option<&'static str>,
}

impl MouseIdentity {
    pub const JIGGLER: Self = Self {
        vendor: "bruelltuete.com",
        name: "Jiggle mouse",
        serial: Some("1"),
    };
}
