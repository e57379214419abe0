//! Boot clock tree and clock-domain gating.

use embassy_rp::clocks::{ClockConfig, PeriClkSrc, PllConfig, RtcClkSrc, SysClkSrc};
use embassy_rp::pac;
use jiggler_core::power::{CLOCK_PLAN, PeriClockSource, PllPlan, PowerProfile, SysClockSource};

const _: () = assert!(CLOCK_PLAN.meets_target(), "clock plan misses 48 MHz");

/// Boots the clock tree from [`clock_config`], gates the unused domains and
/// arms deep sleep. Runs once; any failure here is a boot fault.
pub fn configure() -> embassy_rp::Peripherals {
    let peripherals = embassy_rp::init(embassy_rp::config::Config::new(clock_config()));
    let mut core = cortex_m::Peripherals::take().expect("core peripherals already taken");
    apply_power_profile(PowerProfile::jiggler(), &mut core.SCB);
    peripherals
}

/// Builds the Embassy clock configuration from [`CLOCK_PLAN`]: `clk_sys` runs
/// off the USB PLL, the system PLL stays down and the ADC clock is off.
fn clock_config() -> ClockConfig {
    let plan = CLOCK_PLAN;
    let mut clocks = ClockConfig::crystal(plan.xosc_hz);

    if let Some(xosc) = clocks.xosc.as_mut() {
        xosc.sys_pll = plan.sys_pll.map(pll_config);
        xosc.usb_pll = Some(pll_config(plan.usb_pll));
    }

    clocks.sys_clk.src = match plan.sys_source {
        SysClockSource::PllUsb => SysClkSrc::PllUsb,
        SysClockSource::PllSys => SysClkSrc::PllSys,
    };
    clocks.peri_clk_src = Some(match plan.peri_source {
        PeriClockSource::Xosc => PeriClkSrc::Xosc,
        PeriClockSource::Sys => PeriClkSrc::Sys,
    });
    if !plan.adc_enabled {
        clocks.adc_clk = None;
    }
    if let Some(rtc) = clocks.rtc_clk.as_mut() {
        rtc.src = RtcClkSrc::Xosc;
        rtc.div_int = plan.rtc_div;
        rtc.div_frac = 0;
    }

    clocks
}

fn pll_config(plan: PllPlan) -> PllConfig {
    PllConfig {
        refdiv: plan.refdiv,
        fbdiv: plan.fbdiv,
        post_div1: plan.post_div1,
        post_div2: plan.post_div2,
    }
}

/// Loads the wake/sleep enable registers and selects deep sleep for `WFI`/`WFE`.
///
/// Must run after `embassy_rp::init`, which re-enables every domain it touches.
fn apply_power_profile(profile: PowerProfile, scb: &mut cortex_m::peripheral::SCB) {
    let awake = profile.awake();
    let asleep = profile.asleep();

    pac::CLOCKS
        .wake_en0()
        .write_value(pac::clocks::regs::WakeEn0(awake.en0));
    pac::CLOCKS
        .wake_en1()
        .write_value(pac::clocks::regs::WakeEn1(awake.en1));
    pac::CLOCKS
        .sleep_en0()
        .write_value(pac::clocks::regs::SleepEn0(asleep.en0));
    pac::CLOCKS
        .sleep_en1()
        .write_value(pac::clocks::regs::SleepEn1(asleep.en1));

    scb.set_sleepdeep();

    defmt::info!(
        "power: wake_en={=u32:#x}/{=u32:#x} sleep_en={=u32:#x}/{=u32:#x}",
        awake.en0,
        awake.en1,
        asleep.en0,
        asleep.en1
    );
}
