//! Clock tree plan for the jiggle mouse.
//!
//! Run the system from the USB PLL at 48 MHz, leave the system PLL off, feed
//! the peripheral clock straight from the crystal and drop the ADC clock.

use core::fmt;

use crate::config::{RTC_CLK_DIV, SYS_CLK_HZ, XOSC_HZ};

/// Lowest reference frequency the PLL phase detector accepts.
pub const PLL_MIN_REF_HZ: u32 = 5_000_000;
/// Lowest supported VCO frequency.
pub const PLL_MIN_VCO_HZ: u64 = 750_000_000;
/// Highest supported VCO frequency.
pub const PLL_MAX_VCO_HZ: u64 = 1_600_000_000;

/// Divider settings for one of the RP2040 PLLs.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PllPlan {
    pub refdiv: u8,
    pub fbdiv: u16,
    pub post_div1: u8,
    pub post_div2: u8,
}

/// Reason a [`PllPlan`] is rejected.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PllError {
    RefDivOutOfRange(u8),
    FeedbackOutOfRange(u16),
    PostDivOutOfRange { post_div1: u8, post_div2: u8 },
    ReferenceTooSlow { ref_hz: u32 },
    VcoOutOfRange { vco_hz: u64 },
}

impl fmt::Display for PllError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PllError::RefDivOutOfRange(value) => write!(f, "refdiv {value} outside 1..=63"),
            PllError::FeedbackOutOfRange(value) => write!(f, "fbdiv {value} outside 16..=320"),
            PllError::PostDivOutOfRange {
                post_div1,
                post_div2,
            } => write!(f, "post dividers {post_div1}/{post_div2} outside 1..=7"),
            PllError::ReferenceTooSlow { ref_hz } => {
                write!(f, "reference {ref_hz} Hz below {PLL_MIN_REF_HZ} Hz")
            }
            PllError::VcoOutOfRange { vco_hz } => write!(f, "VCO {vco_hz} Hz out of range"),
        }
    }
}

impl PllPlan {
    /// 12 MHz × 120 / 6 / 5 = 48 MHz, VCO at 1440 MHz.
    pub const USB_48MHZ: Self = Self {
        refdiv: 1,
        fbdiv: 120,
        post_div1: 6,
        post_div2: 5,
    };

    /// VCO frequency produced from `input_hz`.
    #[must_use]
    pub const fn vco_hz(&self, input_hz: u32) -> u64 {
        (input_hz as u64 / self.refdiv as u64) * self.fbdiv as u64
    }

    /// Output frequency produced from `input_hz`, without validation.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn output_hz(&self, input_hz: u32) -> u32 {
        (self.vco_hz(input_hz) / (self.post_div1 as u64 * self.post_div2 as u64)) as u32
    }

    /// Checks the plan against the PLL limits and returns the output frequency.
    pub fn validate(&self, input_hz: u32) -> Result<u32, PllError> {
        if !(1..=63).contains(&self.refdiv) {
            return Err(PllError::RefDivOutOfRange(self.refdiv));
        }
        if !(16..=320).contains(&self.fbdiv) {
            return Err(PllError::FeedbackOutOfRange(self.fbdiv));
        }
        if !(1..=7).contains(&self.post_div1) || !(1..=7).contains(&self.post_div2) {
            return Err(PllError::PostDivOutOfRange {
                post_div1: self.post_div1,
                post_div2: self.post_div2,
            });
        }

        let ref_hz = input_hz / u32::from(self.refdiv);
        if ref_hz < PLL_MIN_REF_HZ {
            return Err(PllError::ReferenceTooSlow { ref_hz });
        }

        let vco_hz = self.vco_hz(input_hz);
        if !(PLL_MIN_VCO_HZ..=PLL_MAX_VCO_HZ).contains(&vco_hz) {
            return Err(PllError::VcoOutOfRange { vco_hz });
        }

        Ok(self.output_hz(input_hz))
    }
}

/// Source selected for `clk_sys` once the PLLs are locked.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SysClockSource {
    PllSys,
    PllUsb,
}

/// Source selected for `clk_peri`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PeriClockSource {
    Sys,
    Xosc,
}

/// Complete boot-time clock configuration.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ClockPlan {
    pub xosc_hz: u32,
    /// `None` leaves the system PLL powered down.
    pub sys_pll: Option<PllPlan>,
    pub usb_pll: PllPlan,
    pub sys_source: SysClockSource,
    pub peri_source: PeriClockSource,
    pub adc_enabled: bool,
    pub rtc_div: u32,
}

/// Plan applied by the firmware at boot.
pub const CLOCK_PLAN: ClockPlan = ClockPlan {
    xosc_hz: XOSC_HZ,
    sys_pll: None,
    usb_pll: PllPlan::USB_48MHZ,
    sys_source: SysClockSource::PllUsb,
    peri_source: PeriClockSource::Xosc,
    adc_enabled: false,
    rtc_div: RTC_CLK_DIV,
};

impl ClockPlan {
    /// Frequency of `clk_sys`, or `None` when the selected PLL is not configured.
    #[must_use]
    pub const fn sys_hz(&self) -> Option<u32> {
        match self.sys_source {
            SysClockSource::PllUsb => Some(self.usb_pll.output_hz(self.xosc_hz)),
            SysClockSource::PllSys => match self.sys_pll {
                Some(plan) => Some(plan.output_hz(self.xosc_hz)),
                None => None,
            },
        }
    }

    /// Frequency of `clk_peri`.
    #[must_use]
    pub const fn peri_hz(&self) -> Option<u32> {
        match self.peri_source {
            PeriClockSource::Xosc => Some(self.xosc_hz),
            PeriClockSource::Sys => self.sys_hz(),
        }
    }

    /// Frequency of `clk_rtc`.
    #[must_use]
    pub const fn rtc_hz(&self) -> u32 {
        self.xosc_hz / self.rtc_div
    }

    /// Returns `true` when the plan reaches the intended system frequency.
    #[must_use]
    pub const fn meets_target(&self) -> bool {
        matches!(self.sys_hz(), Some(hz) if hz == SYS_CLK_HZ)
    }
}
