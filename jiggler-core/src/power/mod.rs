//! Clock-domain gating profile for the RP2040.
//!
//! The clocks block exposes two pairs of enable registers: `WAKE_EN0/1`
//! select the domains clocked while the processor runs, `SLEEP_EN0/1` the
//! domains clocked while it is halted in deep sleep. This module names every
//! domain bit and derives both register pairs from the lists of domains the
//! jiggle mouse never uses, so the firmware only has to write four words.

pub mod clocks;

pub use clocks::{CLOCK_PLAN, ClockPlan, PeriClockSource, PllError, PllPlan, SysClockSource};

/// Enable register bank a domain lives in.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum EnableBank {
    /// `WAKE_EN0` / `SLEEP_EN0`.
    Zero,
    /// `WAKE_EN1` / `SLEEP_EN1`.
    One,
}

/// Individually gateable clock domain.
///
/// Bit positions follow the RP2040 datasheet, section 2.15.7.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ClockDomain {
    SysClocks,
    AdcAdc,
    SysAdc,
    SysBusctrl,
    SysBusfabric,
    SysDma,
    SysI2c0,
    SysI2c1,
    SysIo,
    SysJtag,
    SysVregAndChipReset,
    SysPads,
    SysPio0,
    SysPio1,
    SysPllSys,
    SysPllUsb,
    SysPsm,
    SysPwm,
    SysResets,
    SysRom,
    SysRosc,
    RtcRtc,
    SysRtc,
    SysSio,
    PeriSpi0,
    SysSpi0,
    PeriSpi1,
    SysSpi1,
    SysSram0,
    SysSram1,
    SysSram2,
    SysSram3,
    SysSram4,
    SysSram5,
    SysSyscfg,
    SysSysinfo,
    SysTbman,
    SysTimer,
    PeriUart0,
    SysUart0,
    PeriUart1,
    SysUart1,
    SysUsbctrl,
    UsbUsbctrl,
    SysWatchdog,
    SysXip,
    SysXosc,
}

/// Every clock domain, in register bit order.
pub const ALL_DOMAINS: [ClockDomain; 47] = [
    ClockDomain::SysClocks,
    ClockDomain::AdcAdc,
    ClockDomain::SysAdc,
    ClockDomain::SysBusctrl,
    ClockDomain::SysBusfabric,
    ClockDomain::SysDma,
    ClockDomain::SysI2c0,
    ClockDomain::SysI2c1,
    ClockDomain::SysIo,
    ClockDomain::SysJtag,
    ClockDomain::SysVregAndChipReset,
    ClockDomain::SysPads,
    ClockDomain::SysPio0,
    ClockDomain::SysPio1,
    ClockDomain::SysPllSys,
    ClockDomain::SysPllUsb,
    ClockDomain::SysPsm,
    ClockDomain::SysPwm,
    ClockDomain::SysResets,
    ClockDomain::SysRom,
    ClockDomain::SysRosc,
    ClockDomain::RtcRtc,
    ClockDomain::SysRtc,
    ClockDomain::SysSio,
    ClockDomain::PeriSpi0,
    ClockDomain::SysSpi0,
    ClockDomain::PeriSpi1,
    ClockDomain::SysSpi1,
    ClockDomain::SysSram0,
    ClockDomain::SysSram1,
    ClockDomain::SysSram2,
    ClockDomain::SysSram3,
    ClockDomain::SysSram4,
    ClockDomain::SysSram5,
    ClockDomain::SysSyscfg,
    ClockDomain::SysSysinfo,
    ClockDomain::SysTbman,
    ClockDomain::SysTimer,
    ClockDomain::PeriUart0,
    ClockDomain::SysUart0,
    ClockDomain::PeriUart1,
    ClockDomain::SysUart1,
    ClockDomain::SysUsbctrl,
    ClockDomain::UsbUsbctrl,
    ClockDomain::SysWatchdog,
    ClockDomain::SysXip,
    ClockDomain::SysXosc,
];

/// Number of domains held in `*_EN0`.
const BANK_ZERO_LEN: usize = 32;

impl ClockDomain {
    /// Position of the domain in [`ALL_DOMAINS`].
    #[must_use]
    pub const fn as_index(self) -> usize {
        self as usize
    }

    /// Register bank holding the domain's enable bit.
    #[must_use]
    pub const fn bank(self) -> EnableBank {
        if self.as_index() < BANK_ZERO_LEN {
            EnableBank::Zero
        } else {
            EnableBank::One
        }
    }

    /// Bit index within [`bank`](Self::bank).
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn bit(self) -> u32 {
        (self.as_index() % BANK_ZERO_LEN) as u32
    }
}

/// Raw contents of one `*_EN0` / `*_EN1` register pair.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DomainMask {
    pub en0: u32,
    pub en1: u32,
}

impl DomainMask {
    /// All 47 domains clocked (hardware reset value).
    pub const ALL: Self = Self {
        en0: u32::MAX,
        en1: (1 << (ALL_DOMAINS.len() - BANK_ZERO_LEN)) - 1,
    };

    /// No domains clocked.
    pub const NONE: Self = Self { en0: 0, en1: 0 };

    /// Returns the mask with `domain` enabled.
    #[must_use]
    pub const fn with(self, domain: ClockDomain) -> Self {
        match domain.bank() {
            EnableBank::Zero => Self {
                en0: self.en0 | (1 << domain.bit()),
                en1: self.en1,
            },
            EnableBank::One => Self {
                en0: self.en0,
                en1: self.en1 | (1 << domain.bit()),
            },
        }
    }

    /// Returns the mask with `domain` gated.
    #[must_use]
    pub const fn without(self, domain: ClockDomain) -> Self {
        match domain.bank() {
            EnableBank::Zero => Self {
                en0: self.en0 & !(1 << domain.bit()),
                en1: self.en1,
            },
            EnableBank::One => Self {
                en0: self.en0,
                en1: self.en1 & !(1 << domain.bit()),
            },
        }
    }

    /// Returns the mask with every domain in `domains` gated.
    #[must_use]
    pub const fn without_all(self, domains: &[ClockDomain]) -> Self {
        let mut mask = self;
        let mut index = 0;
        while index < domains.len() {
            mask = mask.without(domains[index]);
            index += 1;
        }
        mask
    }

    /// Returns `true` when `domain` is clocked.
    #[must_use]
    pub const fn contains(self, domain: ClockDomain) -> bool {
        let word = match domain.bank() {
            EnableBank::Zero => self.en0,
            EnableBank::One => self.en1,
        };
        word & (1 << domain.bit()) != 0
    }

    /// Returns `true` when every domain enabled in `self` is also enabled in `other`.
    #[must_use]
    pub const fn is_subset_of(self, other: Self) -> bool {
        self.en0 & !other.en0 == 0 && self.en1 & !other.en1 == 0
    }

    /// Number of domains clocked.
    #[must_use]
    pub const fn count(self) -> u32 {
        self.en0.count_ones() + self.en1.count_ones()
    }
}

/// Peripheral domains the device never touches; gated awake and asleep.
///
/// UART0 stays on for the diagnostic console. UART1 is the secondary port.
pub const UNUSED_PERIPHERALS: [ClockDomain; 14] = [
    ClockDomain::PeriSpi0,
    ClockDomain::SysSpi0,
    ClockDomain::PeriSpi1,
    ClockDomain::SysSpi1,
    ClockDomain::SysI2c0,
    ClockDomain::SysI2c1,
    ClockDomain::SysPio0,
    ClockDomain::SysPio1,
    ClockDomain::PeriUart1,
    ClockDomain::SysUart1,
    ClockDomain::SysPwm,
    ClockDomain::SysJtag,
    ClockDomain::AdcAdc,
    ClockDomain::SysAdc,
];

/// CPU-support domains needed while executing but not while halted.
///
/// SRAM4/5 are the scratch banks outside the striped main RAM the linker uses.
pub const HALTED_CPU_SUPPORT: [ClockDomain; 5] = [
    ClockDomain::SysSram4,
    ClockDomain::SysSram5,
    ClockDomain::SysBusfabric,
    ClockDomain::SysDma,
    ClockDomain::SysRom,
];

/// Domains that must keep running in deep sleep for the device to wake up again.
pub const WAKE_SOURCES: [ClockDomain; 10] = [
    ClockDomain::RtcRtc,
    ClockDomain::SysRtc,
    ClockDomain::SysTimer,
    ClockDomain::SysUsbctrl,
    ClockDomain::UsbUsbctrl,
    ClockDomain::SysXosc,
    ClockDomain::SysPllUsb,
    ClockDomain::SysIo,
    ClockDomain::SysPads,
    ClockDomain::SysClocks,
];

/// Awake and asleep clock-domain enables, fixed at boot.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PowerProfile {
    awake: DomainMask,
    asleep: DomainMask,
}

impl PowerProfile {
    /// Builds a profile by gating `awake_gated` in both states and
    /// `sleep_gated` only while halted.
    #[must_use]
    pub const fn from_gated(awake_gated: &[ClockDomain], sleep_gated: &[ClockDomain]) -> Self {
        let awake = DomainMask::ALL.without_all(awake_gated);
        let asleep = awake.without_all(sleep_gated);
        Self { awake, asleep }
    }

    /// Profile used by the jiggle mouse.
    #[must_use]
    pub const fn jiggler() -> Self {
        Self::from_gated(&UNUSED_PERIPHERALS, &HALTED_CPU_SUPPORT)
    }

    /// Value for `WAKE_EN0/1`.
    #[must_use]
    pub const fn awake(&self) -> DomainMask {
        self.awake
    }

    /// Value for `SLEEP_EN0/1`.
    #[must_use]
    pub const fn asleep(&self) -> DomainMask {
        self.asleep
    }

    /// Returns `true` when `domain` is clocked while the processor runs.
    #[must_use]
    pub const fn is_enabled_awake(&self, domain: ClockDomain) -> bool {
        self.awake.contains(domain)
    }

    /// Returns `true` when `domain` is clocked during deep sleep.
    #[must_use]
    pub const fn is_enabled_asleep(&self, domain: ClockDomain) -> bool {
        self.asleep.contains(domain)
    }

    /// Returns `true` when every wake source survives deep sleep.
    #[must_use]
    pub const fn keeps_wake_sources(&self) -> bool {
        let mut index = 0;
        while index < WAKE_SOURCES.len() {
            if !self.asleep.contains(WAKE_SOURCES[index]) {
                return false;
            }
            index += 1;
        }
        true
    }
}

impl Default for PowerProfile {
    fn default() -> Self {
        Self::jiggler()
    }
}
