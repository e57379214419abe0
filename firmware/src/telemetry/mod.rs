//! Mirrors state machine telemetry to defmt / stdout.
//!
//! The jiggle machine keeps its own history ring; this module tracks which
//! records have already been logged and forwards the new ones after each poll.

#![cfg_attr(not(target_os = "none"), allow(dead_code))]

use jiggler_core::telemetry::{
    EventId, ReportDirection, TelemetryEventKind, TelemetryPayload, TelemetryRecord,
    TelemetryRecorder,
};

use crate::instant::FirmwareInstant;

/// Log-friendly summary of a telemetry payload.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum LogDetail {
    None,
    RemoteWake { attempt: u16 },
    Report { dx: i8, dy: i8 },
    Alarm { delay_secs: u32, minute: u8, second: u8, offset: i8 },
    Cycle { duration_us: u64, remote_wakes: u16 },
}

impl From<TelemetryPayload> for LogDetail {
    fn from(payload: TelemetryPayload) -> Self {
        match payload {
            TelemetryPayload::None => LogDetail::None,
            TelemetryPayload::RemoteWake { attempt } => LogDetail::RemoteWake { attempt },
            TelemetryPayload::Report(report) => LogDetail::Report {
                dx: report.x,
                dy: report.y,
            },
            TelemetryPayload::Alarm(alarm) => LogDetail::Alarm {
                delay_secs: alarm.request.delay_secs,
                minute: alarm.request.target_minute,
                second: alarm.request.target_second,
                offset: alarm.jitter_offset,
            },
            TelemetryPayload::Cycle(cycle) => LogDetail::Cycle {
                duration_us: cycle
                    .duration
                    .map_or(0, |elapsed| u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX)),
                remote_wakes: cycle.remote_wakes,
            },
        }
    }
}

/// Cursor over a recorder's history marking the next unlogged record.
#[derive(Debug, Default)]
pub struct TelemetryMirror {
    next_id: EventId,
}

impl TelemetryMirror {
    pub const fn new() -> Self {
        Self { next_id: 0 }
    }

    /// Identifier of the next record that has not been logged yet.
    pub const fn next_id(&self) -> EventId {
        self.next_id
    }

    /// Logs every record added since the previous call and returns how many
    /// were emitted. Records that fell out of the ring are skipped.
    pub fn flush<const CAPACITY: usize>(
        &mut self,
        recorder: &TelemetryRecorder<FirmwareInstant, CAPACITY>,
    ) -> usize {
        let mut emitted = 0;
        for record in recorder.oldest_first() {
            if record.id < self.next_id {
                continue;
            }
            log_record(record);
            emitted += 1;
        }
        self.next_id = recorder.next_id();
        emitted
    }
}

fn log_record(record: &TelemetryRecord<FirmwareInstant>) {
    emit_log(
        record.id,
        event_label(record.event),
        record.timestamp.as_micros(),
        LogDetail::from(record.details),
    );
}

const fn event_label(event: TelemetryEventKind) -> &'static str {
    match event {
        TelemetryEventKind::WakeConsumed => "wake",
        TelemetryEventKind::RemoteWakeRequested => "remote-wake",
        TelemetryEventKind::ReportSent(ReportDirection::Outbound) => "report-out",
        TelemetryEventKind::ReportSent(ReportDirection::Return) => "report-back",
        TelemetryEventKind::AlarmArmed => "alarm",
        TelemetryEventKind::CycleComplete => "cycle",
        TelemetryEventKind::Custom(_) => "custom",
    }
}

#[cfg(target_os = "none")]
fn emit_log(id: EventId, label: &'static str, timestamp_us: u64, detail: LogDetail) {
    defmt::info!(
        "telemetry:{} #{} t={}us {}",
        label,
        id,
        timestamp_us,
        detail
    );
}

#[cfg(not(target_os = "none"))]
fn emit_log(id: EventId, label: &'static str, timestamp_us: u64, detail: LogDetail) {
    println!("telemetry:{label} #{id} t={timestamp_us}us {detail:?}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_time::Instant;
    use jiggler_core::jiggle::MovementReport;

    fn at(micros: u64) -> FirmwareInstant {
        FirmwareInstant::from(Instant::from_micros(micros))
    }

    #[test]
    fn flush_emits_only_new_records() {
        let mut recorder = TelemetryRecorder::<FirmwareInstant, 8>::new();
        let mut mirror = TelemetryMirror::new();

        recorder.record_wake_consumed(at(10));
        recorder.record_report(ReportDirection::Outbound, MovementReport::nudge(), at(20));
        assert_eq!(mirror.flush(&recorder), 2);
        assert_eq!(mirror.flush(&recorder), 0);

        recorder.record_report(ReportDirection::Return, MovementReport::nudge().inverse(), at(30));
        assert_eq!(mirror.flush(&recorder), 1);
        assert_eq!(mirror.next_id(), 3);
    }

    #[test]
    fn flush_skips_records_lost_to_wraparound() {
        let mut recorder = TelemetryRecorder::<FirmwareInstant, 2>::new();
        let mut mirror = TelemetryMirror::new();

        for tick in 0..5 {
            recorder.record_wake_consumed(at(tick));
        }
        assert_eq!(mirror.flush(&recorder), 2);
        assert_eq!(mirror.next_id(), 5);
    }

    #[test]
    fn report_payload_keeps_displacement() {
        let detail = LogDetail::from(TelemetryPayload::Report(MovementReport::displacement(3, -2)));
        assert_eq!(detail, LogDetail::Report { dx: 3, dy: -2 });
    }
}
