use embassy_time::Timer;
use embassy_usb::driver::Driver;
use jiggler_core::jiggle::{JiggleConfig, JiggleMachine, Wait};
use jiggler_core::schedule::RealTimeScheduler;

use super::REMOTE_WAKE;
use crate::hw::led::LedIndicator;
use crate::hw::rtc::{ALARM_EVENT, RtcHandle, WAKE_LATCH};
use crate::instant::{FirmwareInstant, to_embassy_duration};
use crate::status;
use crate::telemetry::TelemetryMirror;
use crate::usb::{MouseWriter, ReportSlot, to_mouse_report};

/// Drives the nudge cycle: polls the state machine, flushes its report to the
/// HID endpoint, and sleeps on whatever the machine asked to wait for.
pub async fn run<D>(
    mut writer: MouseWriter<D>,
    clock: RtcHandle,
    mut led: LedIndicator<'static>,
) -> !
where
    D: Driver<'static>,
{
    let mut scheduler = RealTimeScheduler::new(clock, &WAKE_LATCH);
    let mut machine = JiggleMachine::<FirmwareInstant>::new(JiggleConfig::default());
    let mut mirror = TelemetryMirror::new();
    let mut slot = ReportSlot::new();

    scheduler.initialize().expect("rtc failed to start");
    machine
        .start(&mut scheduler)
        .expect("failed to schedule first nudge");
    defmt::info!(
        "jiggle: started (base={}s, on_boot={})",
        machine.config().base_interval_secs,
        machine.config().jiggle_on_boot
    );

    loop {
        slot.set_host_suspended(status::is_suspended());

        let next = match machine.poll(FirmwareInstant::now(), &mut slot, &mut led, &mut scheduler)
        {
            Ok(step) => step.next,
            Err(err) => {
                defmt::error!("jiggle: {}", defmt::Display2Format(&err));
                Wait::Wake
            }
        };
        mirror.flush(machine.telemetry());

        if slot.take_wake_request() {
            status::record_remote_wake_request();
            REMOTE_WAKE.signal(());
        }

        if let Some(report) = slot.take_pending()
            && let Err(err) = writer.write_serialize(&to_mouse_report(report)).await
        {
            defmt::warn!("jiggle: report write failed: {}", defmt::Debug2Format(&err));
        }

        match next {
            Wait::Now | Wait::ReportSlot => {}
            Wait::Wake => {
                if !WAKE_LATCH.is_pending() {
                    ALARM_EVENT.wait().await;
                }
            }
            Wait::Until(deadline) => Timer::at(deadline.into_embassy()).await,
            Wait::HostResume => {
                Timer::after(to_embassy_duration(machine.config().suspended_retry)).await;
            }
        }
    }
}
