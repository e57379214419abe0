use std::io::{self, Write};
use std::ops::Add;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use jiggler_core::driver::{CooperativeLoop, UsbStack};
use jiggler_core::jiggle::{
    ActivityIndicator, HidReportSink, JiggleConfig, JiggleMachine, MovementReport,
};
use jiggler_core::schedule::sim::{NotRunning, SimulatedRtc};
use jiggler_core::schedule::{
    AlarmFilter, CalendarTime, RealTimeClock, RealTimeScheduler, WakeLatch, alarm_fired,
};
use jiggler_core::telemetry::{TelemetryInstant, TelemetryPayload, TelemetryRecord};

const DEFAULT_CYCLES: u32 = 3;
const DEFAULT_TIME_SCALE: u32 = 60;
/// Time the simulated host takes to resume the bus after a remote wake.
const HOST_RESUME_LATENCY: Duration = Duration::from_millis(20);

/// Command-line tunables for one emulator run.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SessionOptions {
    /// Stop after this many completed nudges.
    pub cycles: u32,
    /// Simulated RTC seconds per wall-clock second.
    pub time_scale: u32,
    /// Host suspends the bus at boot and again after every nudge.
    pub start_suspended: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            cycles: DEFAULT_CYCLES,
            time_scale: DEFAULT_TIME_SCALE,
            start_suspended: false,
        }
    }
}

/// Wall-clock instant used for dwell deadlines and telemetry.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub struct HostInstant(Instant);

impl HostInstant {
    pub fn now() -> Self {
        Self(Instant::now())
    }
}

impl Add<Duration> for HostInstant {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        Self(self.0 + rhs)
    }
}

impl TelemetryInstant for HostInstant {
    fn saturating_duration_since(&self, earlier: Self) -> Duration {
        self.0.saturating_duration_since(earlier.0)
    }
}

enum Event {
    Alarm(Option<CalendarTime>),
    HostResumed,
}

/// Simulated RTC shared between the ticking thread and the scheduler.
#[derive(Clone, Default)]
struct SharedRtc(Arc<Mutex<SimulatedRtc>>);

impl SharedRtc {
    fn lock(&self) -> MutexGuard<'_, SimulatedRtc> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RealTimeClock for SharedRtc {
    type Error = NotRunning;

    fn now(&mut self) -> Result<CalendarTime, Self::Error> {
        self.lock().now()
    }

    fn set_time(&mut self, time: CalendarTime) -> Result<(), Self::Error> {
        self.lock().set_time(time)
    }

    fn schedule_alarm(&mut self, filter: AlarmFilter) {
        self.lock().schedule_alarm(filter);
    }

    fn disable_alarm(&mut self) {
        self.lock().disable_alarm();
    }
}

/// Advances the RTC one second per `tick` and plays the alarm interrupt.
fn spawn_rtc(
    rtc: SharedRtc,
    latch: Arc<WakeLatch>,
    tick: Duration,
    stop: Arc<AtomicBool>,
    events: Sender<Event>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        while !stop.load(Ordering::Relaxed) {
            thread::sleep(tick);

            let mut clock = rtc.lock();
            if !clock.tick() {
                continue;
            }
            alarm_fired(&mut *clock, &latch);
            let at = clock.now().ok();
            drop(clock);

            if events.send(Event::Alarm(at)).is_err() {
                break;
            }
        }
    })
}

/// USB host as seen by the device: one report in flight per pass.
#[derive(Debug, Default)]
struct SimulatedHost {
    suspended: bool,
    in_flight: Option<MovementReport>,
    delivered: Vec<MovementReport>,
    wake_requests: u32,
    resume_pending: bool,
}

impl SimulatedHost {
    /// Sum of every delivered displacement.
    fn cursor(&self) -> (i32, i32) {
        self.delivered.iter().fold((0, 0), |(x, y), report| {
            (x + i32::from(report.x), y + i32::from(report.y))
        })
    }
}

impl UsbStack for SimulatedHost {
    fn pump_pending_work(&mut self) {
        if let Some(report) = self.in_flight.take() {
            self.delivered.push(report);
        }
    }

    fn has_pending_work(&self) -> bool {
        self.in_flight.is_some()
    }
}

impl HidReportSink for SimulatedHost {
    fn is_report_channel_ready(&self) -> bool {
        self.in_flight.is_none()
    }

    fn is_host_suspended(&self) -> bool {
        self.suspended
    }

    fn request_remote_wake(&mut self) {
        self.wake_requests += 1;
    }

    fn send_movement_report(&mut self, report: MovementReport) {
        self.in_flight = Some(report);
    }
}

#[derive(Debug, Default)]
struct TranscriptLed {
    lit: bool,
    changed: bool,
}

impl ActivityIndicator for TranscriptLed {
    fn set_active(&mut self, active: bool) {
        self.changed |= self.lit != active;
        self.lit = active;
    }
}

pub struct Session {
    options: SessionOptions,
    host: SimulatedHost,
    led: TranscriptLed,
    started_at: HostInstant,
}

impl Session {
    pub fn new(options: SessionOptions) -> Self {
        Self {
            options,
            host: SimulatedHost {
                suspended: options.start_suspended,
                ..SimulatedHost::default()
            },
            led: TranscriptLed::default(),
            started_at: HostInstant::now(),
        }
    }

    /// Runs until the requested number of nudges completed, writing the
    /// transcript and the telemetry history to `out`.
    pub fn run<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        let rtc = SharedRtc::default();
        let latch = Arc::new(WakeLatch::new());
        let stop = Arc::new(AtomicBool::new(false));
        let (events, inbox) = mpsc::channel();

        let ticker = spawn_rtc(
            rtc.clone(),
            Arc::clone(&latch),
            Duration::from_secs(1) / self.options.time_scale,
            Arc::clone(&stop),
            events.clone(),
        );

        let machine = JiggleMachine::<HostInstant>::new(JiggleConfig::default());
        let scheduler = RealTimeScheduler::new(rtc, &latch);
        let mut driver = CooperativeLoop::new(machine, scheduler);

        let result = self.drive(out, &mut driver, &events, &inbox);

        stop.store(true, Ordering::Relaxed);
        drop(inbox);
        let _ = ticker.join();
        result
    }

    fn drive<W: Write>(
        &mut self,
        out: &mut W,
        driver: &mut CooperativeLoop<'_, HostInstant, SharedRtc>,
        events: &Sender<Event>,
        inbox: &Receiver<Event>,
    ) -> io::Result<()> {
        writeln!(
            out,
            "Jiggle mouse emulator: {} cycle(s), time scale {}x{}",
            self.options.cycles,
            self.options.time_scale,
            if self.options.start_suspended {
                ", host suspended while idle"
            } else {
                ""
            }
        )?;

        driver
            .start()
            .map_err(|err| io::Error::other(err.to_string()))?;
        if self.host.suspended {
            self.line(out, Role::Host, "bus suspended")?;
        }

        let mut state = driver.machine().state();
        let mut delivered = 0;
        let mut cycles = 0;

        while cycles < self.options.cycles {
            let pass = driver
                .run_pass(HostInstant::now(), &mut self.host, &mut self.led)
                .map_err(|err| io::Error::other(err.to_string()))?;

            delivered = self.log_deliveries(out, delivered)?;
            if pass.step.state != state {
                let text = format!("state {state} -> {}", pass.step.state);
                self.line(out, Role::Device, &text)?;
                state = pass.step.state;
            }
            if std::mem::take(&mut self.led.changed) {
                let text = if self.led.lit { "led on" } else { "led off" };
                self.line(out, Role::Device, text)?;
            }
            if self.host.wake_requests > 0 && !self.host.resume_pending && self.host.suspended {
                self.request_resume(out, events)?;
            }
            if driver.machine().cycles_completed() > cycles {
                cycles = driver.machine().cycles_completed();
                self.finish_cycle(out, driver, cycles)?;
            }

            match inbox.recv_timeout(pass.idle) {
                Ok(event) => self.handle_event(out, event)?,
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(io::Error::other("rtc thread stopped"));
                }
            }
        }

        self.host.pump_pending_work();
        self.log_deliveries(out, delivered)?;
        self.summarize(out, driver)
    }

    fn request_resume<W: Write>(&mut self, out: &mut W, events: &Sender<Event>) -> io::Result<()> {
        self.host.resume_pending = true;
        let text = format!("remote wake request #{}", self.host.wake_requests);
        self.line(out, Role::Device, &text)?;

        let events = events.clone();
        thread::spawn(move || {
            thread::sleep(HOST_RESUME_LATENCY);
            let _ = events.send(Event::HostResumed);
        });
        Ok(())
    }

    fn handle_event<W: Write>(&mut self, out: &mut W, event: Event) -> io::Result<()> {
        match event {
            Event::Alarm(Some(at)) => {
                let text = format!("alarm fired at {:02}:{:02}:{:02}", at.hour, at.minute, at.second);
                self.line(out, Role::Rtc, &text)
            }
            Event::Alarm(None) => self.line(out, Role::Rtc, "alarm fired"),
            Event::HostResumed => {
                self.host.suspended = false;
                self.host.resume_pending = false;
                self.line(out, Role::Host, "bus resumed")
            }
        }
    }

    fn finish_cycle<W: Write>(
        &mut self,
        out: &mut W,
        driver: &CooperativeLoop<'_, HostInstant, SharedRtc>,
        cycle: u32,
    ) -> io::Result<()> {
        let text = match driver.scheduler().last_request() {
            Some(request) => format!(
                "cycle {cycle} complete; next alarm in {}s at xx:{:02}:{:02}",
                request.delay_secs, request.target_minute, request.target_second
            ),
            None => format!("cycle {cycle} complete"),
        };
        self.line(out, Role::Device, &text)?;

        if self.options.start_suspended && cycle < self.options.cycles {
            self.host.suspended = true;
            self.host.wake_requests = 0;
            self.line(out, Role::Host, "bus suspended")?;
        }
        Ok(())
    }

    fn log_deliveries<W: Write>(&self, out: &mut W, from: usize) -> io::Result<usize> {
        for report in &self.host.delivered[from..] {
            let text = format!("report dx={} dy={}", report.x, report.y);
            self.line(out, Role::Host, &text)?;
        }
        Ok(self.host.delivered.len())
    }

    fn summarize<W: Write>(
        &self,
        out: &mut W,
        driver: &CooperativeLoop<'_, HostInstant, SharedRtc>,
    ) -> io::Result<()> {
        let (x, y) = self.host.cursor();
        writeln!(out, "--- summary ---")?;
        writeln!(out, "cycles completed: {}", driver.machine().cycles_completed())?;
        writeln!(out, "reports delivered: {}", self.host.delivered.len())?;
        writeln!(out, "net displacement: ({x}, {y})")?;
        writeln!(out, "final state: {}", driver.machine().state())?;

        writeln!(out, "--- telemetry ---")?;
        for record in driver.machine().telemetry().oldest_first() {
            writeln!(out, "{}", self.describe_record(record))?;
        }
        Ok(())
    }

    fn describe_record(&self, record: &TelemetryRecord<HostInstant>) -> String {
        let elapsed = record.timestamp.saturating_duration_since(self.started_at);
        let details = match record.details {
            TelemetryPayload::None => String::new(),
            TelemetryPayload::RemoteWake { attempt } => format!(" attempt={attempt}"),
            TelemetryPayload::Report(report) => format!(" dx={} dy={}", report.x, report.y),
            TelemetryPayload::Alarm(alarm) => format!(
                " delay={}s offset={:+} target=xx:{:02}:{:02}",
                alarm.request.delay_secs,
                alarm.jitter_offset,
                alarm.request.target_minute,
                alarm.request.target_second
            ),
            TelemetryPayload::Cycle(cycle) => format!(
                " duration={} remote_wakes={}",
                cycle
                    .duration
                    .map_or_else(|| "?".to_string(), format_duration_short),
                cycle.remote_wakes
            ),
        };
        format!(
            "#{:<3} {:>9} {:#06x} {}{details}",
            record.id,
            format_duration_short(elapsed),
            record.event.to_raw(),
            record.event
        )
    }

    fn line<W: Write>(&self, out: &mut W, role: Role, text: &str) -> io::Result<()> {
        let elapsed = HostInstant::now().saturating_duration_since(self.started_at);
        writeln!(
            out,
            "[{:>8.3}s] {} {text}",
            elapsed.as_secs_f64(),
            role.prefix()
        )
    }
}

#[derive(Clone, Copy)]
enum Role {
    Host,
    Device,
    Rtc,
}

impl Role {
    fn prefix(self) -> &'static str {
        match self {
            Role::Host => "HOST>",
            Role::Device => "DEV <",
            Role::Rtc => "RTC *",
        }
    }
}

fn format_duration_short(duration: Duration) -> String {
    if duration.as_secs() == 0 {
        format!("{}ms", duration.as_millis())
    } else {
        format!("{:.3}s", duration.as_secs_f64())
    }
}
