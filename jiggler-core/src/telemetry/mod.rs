//! Event history shared by the firmware and the emulator.
//!
//! Each event carries a 16-bit code so a sink can print it without knowing
//! the enum layout. Old entries are overwritten once the history is full.

use core::{fmt, time::Duration};

use heapless::{HistoryBuf, OldestOrdered};

use crate::jiggle::MovementReport;
use crate::schedule::AlarmRequest;

/// Sequence number stamped on each entry; wraps at `u32::MAX`.
pub type EventId = u32;

/// Leg of the nudge a report belongs to.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ReportDirection {
    Outbound,
    Return,
}

impl ReportDirection {
    const fn name(self) -> &'static str {
        match self {
            ReportDirection::Outbound => "outbound",
            ReportDirection::Return => "return",
        }
    }
}

impl fmt::Display for ReportDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TelemetryEventKind {
    WakeConsumed,
    RemoteWakeRequested,
    ReportSent(ReportDirection),
    AlarmArmed,
    CycleComplete,
    /// Code outside the known set.
    Custom(u16),
}

const WAKE_CONSUMED: u16 = 0x0001;
const REMOTE_WAKE: u16 = 0x0002;
const REPORT_OUTBOUND: u16 = 0x0010;
const REPORT_RETURN: u16 = 0x0011;
const ALARM_ARMED: u16 = 0x0020;
const CYCLE_COMPLETE: u16 = 0x0030;

impl TelemetryEventKind {
    /// Wire code for this event.
    #[must_use]
    pub const fn to_raw(self) -> u16 {
        match self {
            Self::WakeConsumed => WAKE_CONSUMED,
            Self::RemoteWakeRequested => REMOTE_WAKE,
            Self::ReportSent(ReportDirection::Outbound) => REPORT_OUTBOUND,
            Self::ReportSent(ReportDirection::Return) => REPORT_RETURN,
            Self::AlarmArmed => ALARM_ARMED,
            Self::CycleComplete => CYCLE_COMPLETE,
            Self::Custom(raw) => raw,
        }
    }

    /// Inverse of [`to_raw`](Self::to_raw); unknown codes become `Custom`.
    #[must_use]
    pub const fn from_raw(raw: u16) -> Self {
        match raw {
            WAKE_CONSUMED => Self::WakeConsumed,
            REMOTE_WAKE => Self::RemoteWakeRequested,
            REPORT_OUTBOUND => Self::ReportSent(ReportDirection::Outbound),
            REPORT_RETURN => Self::ReportSent(ReportDirection::Return),
            ALARM_ARMED => Self::AlarmArmed,
            CYCLE_COMPLETE => Self::CycleComplete,
            unknown => Self::Custom(unknown),
        }
    }
}

impl fmt::Display for TelemetryEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::WakeConsumed => "wake-consumed",
            Self::RemoteWakeRequested => "remote-wake-requested",
            Self::AlarmArmed => "alarm-armed",
            Self::CycleComplete => "cycle-complete",
            Self::ReportSent(direction) => return write!(f, "report-sent {direction}"),
            Self::Custom(raw) => return write!(f, "custom({raw:#06x})"),
        };
        f.write_str(label)
    }
}

/// Event-specific data attached to an entry.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TelemetryPayload {
    None,
    RemoteWake { attempt: u16 },
    Report(MovementReport),
    Alarm(AlarmTelemetry),
    Cycle(CycleTelemetry),
}

/// Alarm armed at the end of a cycle.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct AlarmTelemetry {
    pub request: AlarmRequest,
    pub jitter_offset: i8,
}

/// Summary of one completed nudge.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct CycleTelemetry {
    /// Time from the wake being consumed to the return report.
    pub duration: Option<Duration>,
    /// Remote wake requests issued before the host resumed.
    pub remote_wakes: u16,
}

/// Entries kept by the default recorder.
pub const TELEMETRY_RING_CAPACITY: usize = 64;

/// Clock type the recorder stamps entries with.
pub trait TelemetryInstant: Copy {
    /// Elapsed time since `earlier`, zero if `earlier` is later.
    fn saturating_duration_since(&self, earlier: Self) -> Duration;
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TelemetryRecord<I: Copy> {
    pub id: EventId,
    pub timestamp: I,
    pub event: TelemetryEventKind,
    pub details: TelemetryPayload,
}

/// Bounded event log; the oldest entry is dropped when full.
pub struct TelemetryRecorder<I: Copy, const CAPACITY: usize = TELEMETRY_RING_CAPACITY> {
    history: HistoryBuf<TelemetryRecord<I>, CAPACITY>,
    issued: EventId,
}

impl<I: TelemetryInstant, const CAPACITY: usize> TelemetryRecorder<I, CAPACITY> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            history: HistoryBuf::new(),
            issued: 0,
        }
    }

    /// Retained entries, oldest to newest.
    pub fn oldest_first(&self) -> OldestOrdered<'_, TelemetryRecord<I>> {
        self.history.oldest_ordered()
    }

    pub fn latest(&self) -> Option<&TelemetryRecord<I>> {
        self.history.recent()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Identifier the next entry will receive.
    pub const fn next_id(&self) -> EventId {
        self.issued
    }

    /// Appends an entry and returns its identifier.
    pub fn record(&mut self, event: TelemetryEventKind, details: TelemetryPayload, at: I) -> EventId {
        let id = self.issued;
        self.issued = id.wrapping_add(1);
        self.history.write(TelemetryRecord {
            id,
            timestamp: at,
            event,
            details,
        });
        id
    }

    pub fn record_wake_consumed(&mut self, at: I) -> EventId {
        self.record(TelemetryEventKind::WakeConsumed, TelemetryPayload::None, at)
    }

    /// `attempt` counts from one within a cycle.
    pub fn record_remote_wake(&mut self, attempt: u16, at: I) -> EventId {
        let details = TelemetryPayload::RemoteWake { attempt };
        self.record(TelemetryEventKind::RemoteWakeRequested, details, at)
    }

    pub fn record_report(
        &mut self,
        direction: ReportDirection,
        report: MovementReport,
        at: I,
    ) -> EventId {
        let event = TelemetryEventKind::ReportSent(direction);
        self.record(event, TelemetryPayload::Report(report), at)
    }

    pub fn record_alarm_armed(&mut self, request: AlarmRequest, jitter_offset: i8, at: I) -> EventId {
        let details = TelemetryPayload::Alarm(AlarmTelemetry {
            request,
            jitter_offset,
        });
        self.record(TelemetryEventKind::AlarmArmed, details, at)
    }

    /// Closes a cycle; the duration is only known when `started_at` is.
    pub fn record_cycle_complete(
        &mut self,
        started_at: Option<I>,
        remote_wakes: u16,
        at: I,
    ) -> EventId {
        let details = TelemetryPayload::Cycle(CycleTelemetry {
            duration: started_at.map(|start| at.saturating_duration_since(start)),
            remote_wakes,
        });
        self.record(TelemetryEventKind::CycleComplete, details, at)
    }
}

impl<I: TelemetryInstant, const CAPACITY: usize> Default for TelemetryRecorder<I, CAPACITY> {
    fn default() -> Self {
        Self::new()
    }
}
