use core::ops::Add;
use core::time::Duration;

use heapless::Vec as HeaplessVec;
use jiggler_core::driver::{CooperativeLoop, UsbStack};
use jiggler_core::jiggle::{
    ActivityIndicator, HidReportSink, JiggleConfig, JiggleError, JiggleMachine, JiggleState,
    MovementReport, Wait,
};
use jiggler_core::jitter::DEFAULT_OFFSETS;
use jiggler_core::schedule::sim::{NotRunning, SimulatedRtc};
use jiggler_core::schedule::{
    AlarmFilter, RealTimeScheduler, ScheduleError, WakeLatch, alarm_fired,
};
use jiggler_core::telemetry::{
    ReportDirection, TelemetryEventKind, TelemetryInstant, TelemetryPayload,
};

#[test]
fn boot_cycle_nudges_and_returns_then_arms_jittered_alarm() {
    let latch = WakeLatch::new();
    let mut scheduler = RealTimeScheduler::new(SimulatedRtc::new(), &latch);
    scheduler.initialize().expect("initialize");

    let mut machine = JiggleMachine::<MockInstant>::new(JiggleConfig::default());
    machine.start(&mut scheduler).expect("start");
    assert!(latch.is_pending(), "boot should request the first cycle");

    let mut sink = MockSink::new();
    let mut led = MockIndicator::default();
    let t0 = MockInstant::millis(0);

    let step = machine
        .poll(t0, &mut sink, &mut led, &mut scheduler)
        .expect("poll");
    assert_eq!(step.state, JiggleState::Triggering);
    assert_eq!(step.next, Wait::Now);
    assert!(sink.reports.is_empty());

    let step = machine
        .poll(t0, &mut sink, &mut led, &mut scheduler)
        .expect("poll");
    assert_eq!(step.state, JiggleState::Holding);
    assert_eq!(step.next, Wait::Until(MockInstant::millis(10)));
    assert_eq!(sink.reports.as_slice(), &[MovementReport::displacement(0, 1)]);
    assert!(led.active);

    let step = machine
        .poll(MockInstant::millis(10), &mut sink, &mut led, &mut scheduler)
        .expect("poll");
    assert_eq!(step.state, JiggleState::Releasing);
    assert_eq!(step.next, Wait::Now);

    let step = machine
        .poll(MockInstant::millis(10), &mut sink, &mut led, &mut scheduler)
        .expect("poll");
    assert_eq!(step.state, JiggleState::Idle);
    assert_eq!(step.next, Wait::Wake);
    assert_eq!(
        sink.reports.as_slice(),
        &[
            MovementReport::displacement(0, 1),
            MovementReport::displacement(0, -1)
        ]
    );
    assert!(!led.active);
    assert_eq!(machine.cycles_completed(), 1);

    let request = scheduler.last_request().expect("alarm armed");
    assert_eq!(request.delay_secs, 112);
    assert_eq!(
        scheduler.clock().alarm(),
        Some(AlarmFilter::minute_second(1, 52))
    );
}

#[test]
fn hold_never_ends_before_dwell() {
    let latch = WakeLatch::new();
    let mut scheduler = RealTimeScheduler::new(SimulatedRtc::new(), &latch);
    scheduler.initialize().expect("initialize");

    let config = JiggleConfig::default().with_hold_dwell(Duration::from_millis(25));
    let mut machine = JiggleMachine::<MockInstant>::new(config);
    let mut sink = MockSink::new();
    let mut led = MockIndicator::default();

    scheduler.request_wake();
    let start = MockInstant::millis(1_000);
    machine
        .poll(start, &mut sink, &mut led, &mut scheduler)
        .expect("poll");
    machine
        .poll(start, &mut sink, &mut led, &mut scheduler)
        .expect("poll");

    for elapsed in 0..25 {
        let step = machine
            .poll(
                MockInstant::millis(1_000 + elapsed),
                &mut sink,
                &mut led,
                &mut scheduler,
            )
            .expect("poll");
        assert_eq!(step.state, JiggleState::Holding, "left hold after {elapsed} ms");
        assert_eq!(step.next, Wait::Until(MockInstant::millis(1_025)));
    }
    assert_eq!(sink.reports.len(), 1);

    let step = machine
        .poll(MockInstant::millis(1_025), &mut sink, &mut led, &mut scheduler)
        .expect("poll");
    assert_eq!(step.state, JiggleState::Releasing);
}

#[test]
fn idle_without_wake_sends_nothing() {
    let latch = WakeLatch::new();
    let mut scheduler = RealTimeScheduler::new(SimulatedRtc::new(), &latch);
    scheduler.initialize().expect("initialize");

    let mut machine = JiggleMachine::<MockInstant>::new(JiggleConfig::default());
    let mut sink = MockSink::new();
    let mut led = MockIndicator::default();

    for tick in 0..10 {
        let step = machine
            .poll(MockInstant::millis(tick), &mut sink, &mut led, &mut scheduler)
            .expect("poll");
        assert_eq!(step.state, JiggleState::Idle);
        assert_eq!(step.next, Wait::Wake);
    }
    assert!(sink.reports.is_empty());
    assert!(machine.telemetry().is_empty());
}

#[test]
fn busy_channel_defers_without_consuming_wake() {
    let latch = WakeLatch::new();
    let mut scheduler = RealTimeScheduler::new(SimulatedRtc::new(), &latch);
    scheduler.initialize().expect("initialize");

    let mut machine = JiggleMachine::<MockInstant>::new(JiggleConfig::default());
    let mut sink = MockSink::new();
    sink.ready = false;
    let mut led = MockIndicator::default();

    scheduler.request_wake();
    let step = machine
        .poll(MockInstant::millis(0), &mut sink, &mut led, &mut scheduler)
        .expect("poll");
    assert_eq!(step.state, JiggleState::Idle);
    assert_eq!(step.next, Wait::ReportSlot);
    assert!(latch.is_pending());

    sink.ready = true;
    let step = machine
        .poll(MockInstant::millis(1), &mut sink, &mut led, &mut scheduler)
        .expect("poll");
    assert_eq!(step.state, JiggleState::Triggering);
    assert!(!latch.is_pending());
}

#[test]
fn suspended_host_gets_remote_wake_every_pass_until_resumed() {
    let latch = WakeLatch::new();
    let mut scheduler = RealTimeScheduler::new(SimulatedRtc::new(), &latch);
    scheduler.initialize().expect("initialize");

    let mut machine = JiggleMachine::<MockInstant>::new(JiggleConfig::default());
    let mut sink = MockSink::new();
    sink.suspended = true;
    let mut led = MockIndicator::default();

    scheduler.request_wake();
    machine
        .poll(MockInstant::millis(0), &mut sink, &mut led, &mut scheduler)
        .expect("poll");

    for pass in 1..=3_u64 {
        let step = machine
            .poll(MockInstant::millis(pass), &mut sink, &mut led, &mut scheduler)
            .expect("poll");
        assert_eq!(step.state, JiggleState::Triggering);
        assert_eq!(step.next, Wait::HostResume);
    }
    assert_eq!(sink.remote_wakes, 3);
    assert!(sink.reports.is_empty());
    assert!(!led.active);

    sink.suspended = false;
    let step = machine
        .poll(MockInstant::millis(4), &mut sink, &mut led, &mut scheduler)
        .expect("poll");
    assert_eq!(step.state, JiggleState::Holding);
    assert_eq!(sink.reports.as_slice(), &[MovementReport::displacement(0, 1)]);
    assert_eq!(sink.remote_wakes, 3);

    finish_cycle(&mut machine, &mut sink, &mut led, &mut scheduler, 14);
    let cycle = machine
        .telemetry()
        .oldest_first()
        .find(|record| record.event == TelemetryEventKind::CycleComplete)
        .expect("cycle record");
    match cycle.details {
        TelemetryPayload::Cycle(details) => {
            assert_eq!(details.remote_wakes, 3);
            assert_eq!(details.duration, Some(Duration::from_millis(14)));
        }
        other => panic!("unexpected payload: {other:?}"),
    }
}

#[test]
fn successive_cycles_follow_jitter_table_and_cancel_out() {
    let latch = WakeLatch::new();
    let mut scheduler = RealTimeScheduler::new(SimulatedRtc::new(), &latch);
    scheduler.initialize().expect("initialize");

    let mut machine = JiggleMachine::<MockInstant>::new(JiggleConfig::default());
    let mut sink = MockSink::new();
    let mut led = MockIndicator::default();
    machine.start(&mut scheduler).expect("start");

    let mut now_ms = 0_u64;
    let mut delays = HeaplessVec::<u32, 20>::new();
    for _ in 0..18 {
        run_cycle(&mut machine, &mut sink, &mut led, &mut scheduler, now_ms);
        let request = scheduler.last_request().expect("armed");
        delays.push(request.delay_secs).expect("capacity");

        let waited = scheduler
            .clock_mut()
            .run_until_alarm(3_600)
            .expect("alarm should fire within the hour");
        assert_eq!(waited, request.delay_secs);
        alarm_fired(scheduler.clock_mut(), &latch);
        now_ms += u64::from(waited) * 1_000;
        sink.reports.clear();
    }

    for (cycle, delay) in delays.iter().enumerate() {
        let expected = 90 + i32::from(DEFAULT_OFFSETS[cycle % DEFAULT_OFFSETS.len()]);
        assert_eq!(i64::from(*delay), i64::from(expected), "cycle {cycle}");
    }
    assert_eq!(machine.cycles_completed(), 18);
}

#[test]
fn every_cycle_reports_are_additive_inverses() {
    let latch = WakeLatch::new();
    let mut scheduler = RealTimeScheduler::new(SimulatedRtc::new(), &latch);
    scheduler.initialize().expect("initialize");

    let config = JiggleConfig::default().with_displacement(-4, 7);
    let mut machine = JiggleMachine::<MockInstant>::new(config);
    let mut sink = MockSink::new();
    let mut led = MockIndicator::default();

    scheduler.request_wake();
    run_cycle(&mut machine, &mut sink, &mut led, &mut scheduler, 0);

    assert_eq!(sink.reports.len(), 2);
    let (outbound, back) = (sink.reports[0], sink.reports[1]);
    assert_eq!(outbound, MovementReport::displacement(-4, 7));
    assert_eq!(i16::from(outbound.x) + i16::from(back.x), 0);
    assert_eq!(i16::from(outbound.y) + i16::from(back.y), 0);
    assert_eq!(back.buttons, 0);
}

#[test]
fn arm_failure_is_reported_after_cycle_completes() {
    let latch = WakeLatch::new();
    let mut scheduler = RealTimeScheduler::new(SimulatedRtc::new(), &latch);
    scheduler.initialize().expect("initialize");

    let config = JiggleConfig::default().with_base_interval(3_590);
    let mut machine = JiggleMachine::<MockInstant>::new(config);
    let mut sink = MockSink::new();
    let mut led = MockIndicator::default();

    scheduler.request_wake();
    let mut result = Ok(());
    for tick in 0..4 {
        let now = MockInstant::millis(tick * 10);
        if let Err(err) = machine.poll(now, &mut sink, &mut led, &mut scheduler) {
            result = Err(err);
            break;
        }
    }

    assert_eq!(
        result,
        Err(JiggleError::Schedule(ScheduleError::DelayOutOfRange {
            delay_secs: 3_612
        }))
    );
    assert_eq!(machine.state(), JiggleState::Idle);
    assert_eq!(machine.cycles_completed(), 1);
    assert_eq!(sink.reports.len(), 2);
    assert_eq!(scheduler.clock().alarm(), None);
}

#[test]
fn stopped_clock_error_propagates_from_release() {
    let latch = WakeLatch::new();
    let mut scheduler = RealTimeScheduler::new(SimulatedRtc::new(), &latch);

    let mut machine = JiggleMachine::<MockInstant>::new(JiggleConfig::default());
    let mut sink = MockSink::new();
    let mut led = MockIndicator::default();

    scheduler.request_wake();
    let mut outcome = None;
    for tick in 0..4 {
        match machine.poll(MockInstant::millis(tick * 10), &mut sink, &mut led, &mut scheduler) {
            Ok(_) => {}
            Err(err) => {
                outcome = Some(err);
                break;
            }
        }
    }

    assert_eq!(
        outcome,
        Some(JiggleError::Schedule(ScheduleError::Clock(NotRunning)))
    );
    assert_eq!(machine.state(), JiggleState::Idle);
}

#[test]
fn start_without_boot_jiggle_arms_base_interval() {
    let latch = WakeLatch::new();
    let mut scheduler = RealTimeScheduler::new(SimulatedRtc::new(), &latch);
    scheduler.initialize().expect("initialize");

    let machine =
        JiggleMachine::<MockInstant>::new(JiggleConfig::default().with_jiggle_on_boot(false));
    machine.start(&mut scheduler).expect("start");

    assert!(!latch.is_pending());
    assert_eq!(scheduler.last_request().map(|r| r.delay_secs), Some(90));
    assert_eq!(machine.jitter().cursor(), 0);
}

#[test]
fn stopped_clock_cannot_start_loop_without_initialize() {
    let latch = WakeLatch::new();
    let mut scheduler = RealTimeScheduler::new(SimulatedRtc::new(), &latch);
    let machine =
        JiggleMachine::<MockInstant>::new(JiggleConfig::default().with_jiggle_on_boot(false));

    assert_eq!(
        machine.start(&mut scheduler),
        Err(ScheduleError::Clock(NotRunning))
    );
}

#[test]
fn telemetry_traces_one_cycle_in_order() {
    let latch = WakeLatch::new();
    let mut scheduler = RealTimeScheduler::new(SimulatedRtc::new(), &latch);
    scheduler.initialize().expect("initialize");

    let mut machine = JiggleMachine::<MockInstant>::new(JiggleConfig::default());
    let mut sink = MockSink::new();
    let mut led = MockIndicator::default();

    scheduler.request_wake();
    run_cycle(&mut machine, &mut sink, &mut led, &mut scheduler, 0);

    let events: HeaplessVec<TelemetryEventKind, 8> = machine
        .telemetry()
        .oldest_first()
        .map(|record| record.event)
        .collect();
    assert_eq!(
        events.as_slice(),
        &[
            TelemetryEventKind::WakeConsumed,
            TelemetryEventKind::ReportSent(ReportDirection::Outbound),
            TelemetryEventKind::ReportSent(ReportDirection::Return),
            TelemetryEventKind::CycleComplete,
            TelemetryEventKind::AlarmArmed,
        ]
    );

    let armed = machine.telemetry().latest().expect("record");
    match armed.details {
        TelemetryPayload::Alarm(details) => {
            assert_eq!(details.jitter_offset, 22);
            assert_eq!(details.request.delay_secs, 112);
        }
        other => panic!("unexpected payload: {other:?}"),
    }
}

#[test]
fn cooperative_loop_pumps_until_idle_before_polling() {
    let latch = WakeLatch::new();
    let scheduler = RealTimeScheduler::new(SimulatedRtc::new(), &latch);
    let machine = JiggleMachine::<MockInstant>::new(JiggleConfig::default());
    let mut driver = CooperativeLoop::new(machine, scheduler);
    driver.start().expect("start");

    let mut usb = MockUsb::new(3);
    let mut led = MockIndicator::default();

    let pass = driver
        .run_pass(MockInstant::millis(0), &mut usb, &mut led)
        .expect("pass");
    assert_eq!(pass.pumps, 3);
    assert_eq!(pass.step.state, JiggleState::Triggering);
    assert_eq!(pass.idle, Duration::ZERO);

    let pass = driver
        .run_pass(MockInstant::millis(0), &mut usb, &mut led)
        .expect("pass");
    assert_eq!(pass.pumps, 1);
    assert_eq!(pass.step.state, JiggleState::Holding);
    assert_eq!(pass.idle, Duration::from_millis(1));
    assert_eq!(usb.sink.reports.len(), 1);

    let mut now = 1;
    while driver.machine().state() != JiggleState::Idle {
        driver
            .run_pass(MockInstant::millis(now), &mut usb, &mut led)
            .expect("pass");
        now += 1;
    }
    assert_eq!(usb.sink.reports.len(), 2);
    assert_eq!(driver.scheduler().last_request().map(|r| r.delay_secs), Some(112));
}

fn run_cycle(
    machine: &mut JiggleMachine<MockInstant>,
    sink: &mut MockSink,
    led: &mut MockIndicator,
    scheduler: &mut RealTimeScheduler<'_, SimulatedRtc>,
    start_ms: u64,
) {
    let step = machine
        .poll(MockInstant::millis(start_ms), sink, led, scheduler)
        .expect("consume wake");
    assert_eq!(step.state, JiggleState::Triggering);
    let step = machine
        .poll(MockInstant::millis(start_ms), sink, led, scheduler)
        .expect("trigger");
    assert_eq!(step.state, JiggleState::Holding);
    finish_cycle(machine, sink, led, scheduler, start_ms + 10);
}

fn finish_cycle(
    machine: &mut JiggleMachine<MockInstant>,
    sink: &mut MockSink,
    led: &mut MockIndicator,
    scheduler: &mut RealTimeScheduler<'_, SimulatedRtc>,
    at_ms: u64,
) {
    let now = MockInstant::millis(at_ms);
    let step = machine.poll(now, sink, led, scheduler).expect("hold");
    assert_eq!(step.state, JiggleState::Releasing);
    let step = machine.poll(now, sink, led, scheduler).expect("release");
    assert_eq!(step.state, JiggleState::Idle);
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct MockInstant(u64);

impl MockInstant {
    fn millis(value: u64) -> Self {
        Self(value)
    }
}

impl Add<Duration> for MockInstant {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        Self(self.0 + rhs.as_millis() as u64)
    }
}

impl TelemetryInstant for MockInstant {
    fn saturating_duration_since(&self, earlier: Self) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }
}

struct MockSink {
    ready: bool,
    suspended: bool,
    remote_wakes: u32,
    reports: HeaplessVec<MovementReport, 8>,
}

impl MockSink {
    fn new() -> Self {
        Self {
            ready: true,
            suspended: false,
            remote_wakes: 0,
            reports: HeaplessVec::new(),
        }
    }
}

impl HidReportSink for MockSink {
    fn is_report_channel_ready(&self) -> bool {
        self.ready
    }

    fn is_host_suspended(&self) -> bool {
        self.suspended
    }

    fn request_remote_wake(&mut self) {
        self.remote_wakes += 1;
    }

    fn send_movement_report(&mut self, report: MovementReport) {
        self.reports.push(report).expect("report capacity");
    }
}

#[derive(Default)]
struct MockIndicator {
    active: bool,
}

impl ActivityIndicator for MockIndicator {
    fn set_active(&mut self, active: bool) {
        self.active = active;
    }
}

struct MockUsb {
    sink: MockSink,
    backlog: u32,
}

impl MockUsb {
    fn new(backlog: u32) -> Self {
        Self {
            sink: MockSink::new(),
            backlog,
        }
    }
}

impl UsbStack for MockUsb {
    fn pump_pending_work(&mut self) {
        self.backlog = self.backlog.saturating_sub(1);
    }

    fn has_pending_work(&self) -> bool {
        self.backlog > 0
    }
}

impl HidReportSink for MockUsb {
    fn is_report_channel_ready(&self) -> bool {
        self.sink.is_report_channel_ready()
    }

    fn is_host_suspended(&self) -> bool {
        self.sink.is_host_suspended()
    }

    fn request_remote_wake(&mut self) {
        self.sink.request_remote_wake();
    }

    fn send_movement_report(&mut self, report: MovementReport) {
        self.sink.send_movement_report(report);
    }
}
