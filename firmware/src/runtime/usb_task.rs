use embassy_futures::select::{Either, select};
use embassy_usb::UsbDevice;
use embassy_usb::driver::Driver;

use super::REMOTE_WAKE;
use crate::status;

/// Runs the USB device, signalling remote wakeup on request while suspended.
pub async fn run<D>(mut device: UsbDevice<'static, D>) -> !
where
    D: Driver<'static>,
{
    loop {
        device.run_until_suspend().await;
        REMOTE_WAKE.reset();

        let mut warned = false;
        loop {
            match select(device.wait_resume(), REMOTE_WAKE.wait()).await {
                Either::First(()) => {
                    defmt::info!("usb: host resumed bus");
                    break;
                }
                Either::Second(()) => match device.remote_wakeup().await {
                    Ok(()) => {
                        status::set_suspended(false);
                        defmt::info!(
                            "usb: remote wakeup sent (requests={})",
                            status::snapshot().remote_wake_requests
                        );
                        break;
                    }
                    Err(err) => {
                        if !warned {
                            defmt::warn!(
                                "usb: remote wakeup refused: {}",
                                defmt::Debug2Format(&err)
                            );
                            warned = true;
                        }
                    }
                },
            }
        }
    }
}
