//! Embassy USB device construction for the mouse interface.

use embassy_usb::class::hid::{
    Config as HidConfig, HidBootProtocol, HidSubclass, HidWriter, State as HidState,
};
use embassy_usb::driver::Driver;
use embassy_usb::{Builder, Handler, UsbDevice};
use jiggler_core::jiggle::MovementReport;
use usbd_hid::descriptor::{MouseReport, SerializedDescriptor};

use super::{HID_POLL_MS, MAX_POWER_MA, MouseIdentity, USB_PID, USB_VID};
use crate::status;

const EP0_PACKET: u8 = 64;
/// `MouseReport` serializes to five bytes; the endpoint buffer rounds up.
const REPORT_BUF: usize = 8;
const REPORT_PACKET: u16 = 8;

/// Interrupt IN endpoint carrying mouse reports.
pub type MouseWriter<D> = HidWriter<'static, D, REPORT_BUF>;

/// Descriptor and class buffers borrowed by the device for its lifetime.
pub struct UsbBuffers {
    control: [u8; 64],
    config_desc: [u8; 128],
    bos_desc: [u8; 64],
    msos_desc: [u8; 0],
    hid: HidState<'static>,
    link: BusWatcher,
}

impl UsbBuffers {
    pub fn new() -> Self {
        Self {
            control: [0; 64],
            config_desc: [0; 128],
            bos_desc: [0; 64],
            msos_desc: [],
            hid: HidState::new(),
            link: BusWatcher,
        }
    }
}

impl Default for UsbBuffers {
    fn default() -> Self {
        Self::new()
    }
}

/// Copies bus state transitions into [`status`].
struct BusWatcher;

impl Handler for BusWatcher {
    fn enabled(&mut self, enabled: bool) {
        if !enabled {
            forget_link();
        }
    }

    fn reset(&mut self) {
        forget_link();
    }

    fn configured(&mut self, configured: bool) {
        status::set_configured(configured);
        defmt::info!("usb: configured={}", configured);
    }

    fn suspended(&mut self, suspended: bool) {
        status::set_suspended(suspended);
        defmt::info!("usb: suspended={}", suspended);
    }
}

fn forget_link() {
    status::set_configured(false);
    status::set_suspended(false);
}

/// The device to run plus the report endpoint.
pub struct UsbMouse<D: Driver<'static>> {
    pub device: UsbDevice<'static, D>,
    pub writer: MouseWriter<D>,
}

impl<D: Driver<'static>> UsbMouse<D> {
    pub fn new(driver: D, buffers: &'static mut UsbBuffers, identity: MouseIdentity) -> Self {
        let mut config = embassy_usb::Config::new(USB_VID, USB_PID);
        config.manufacturer = Some(identity.vendor);
        config.product = Some(identity.name);
        config.serial_number = identity.serial;
        config.max_packet_size_0 = EP0_PACKET;
        config.max_power = MAX_POWER_MA;
        config.supports_remote_wakeup = true;

        let mut builder = Builder::new(
            driver,
            config,
            &mut buffers.config_desc,
            &mut buffers.bos_desc,
            &mut buffers.msos_desc,
            &mut buffers.control,
        );
        builder.handler(&mut buffers.link);

        let writer = HidWriter::new(
            &mut builder,
            &mut buffers.hid,
            HidConfig {
                report_descriptor: MouseReport::desc(),
                request_handler: None,
                poll_ms: HID_POLL_MS,
                max_packet_size: REPORT_PACKET,
                hid_subclass: HidSubclass::No,
                hid_boot_protocol: HidBootProtocol::None,
            },
        );

        Self {
            device: builder.build(),
            writer,
        }
    }
}

/// Converts a core report into the `usbd-hid` wire layout.
pub fn to_mouse_report(report: MovementReport) -> MouseReport {
    MouseReport {
        buttons: report.buttons,
        x: report.x,
        y: report.y,
        wheel: report.wheel,
        pan: report.pan,
    }
}
