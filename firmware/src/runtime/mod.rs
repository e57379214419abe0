use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_futures::join::join;
use embassy_rp::gpio::{Level, Output};
use embassy_rp::peripherals::USB;
use embassy_rp::rtc::Rtc;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use static_cell::StaticCell;

use crate::hw;
use crate::hw::led::LedIndicator;
use crate::usb::{MouseIdentity, UsbBuffers, UsbMouse};

mod jiggle_task;
mod usb_task;

embassy_rp::bind_interrupts!(struct Irqs {
    USBCTRL_IRQ => embassy_rp::usb::InterruptHandler<USB>;
});

/// Raised by the jiggle task when the state machine asks the host to resume.
pub(super) static REMOTE_WAKE: Signal<CriticalSectionRawMutex, ()> = Signal::new();
pub(super) static USB_STORAGE: StaticCell<UsbBuffers> = StaticCell::new();

#[embassy_executor::main]
pub async fn main(_spawner: Spawner) {
    let p = hw::clocks::configure();

    let rtc = hw::rtc::install(Rtc::new(p.RTC));
    let led = LedIndicator::new(Output::new(p.PIN_25, Level::Low));

    let driver = embassy_rp::usb::Driver::new(p.USB, Irqs);
    let buffers = USB_STORAGE.init(UsbBuffers::new());
    let UsbMouse { device, writer } = UsbMouse::new(driver, buffers, MouseIdentity::JIGGLER);

    join(usb_task::run(device), jiggle_task::run(writer, rtc, led)).await;
}
