//! Mock hardware and network adapters for integration tests.
//!
//! Every mock records what the service did to it so tests can assert on
//! the full call history without a sensor, an access point or a broker.

use core::cell::Cell;
use core::convert::Infallible;
use core::net::Ipv4Addr;
use std::collections::VecDeque;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, OutputPin};

use roomsense::app::events::AppEvent;
use roomsense::app::ports::{ClockPort, CloudPort, EventSink, NetworkPort, SensorPort, SessionState};
use roomsense::app::service::DeviceService;
use roomsense::config::DeviceConfig;
use roomsense::drivers::status_led::StatusIndicator;
use roomsense::error::{CommsError, SensorError};

// ── Indicator pin ─────────────────────────────────────────────

/// Output pin that records every level written to it.
#[derive(Debug, Default)]
pub struct RecordingPin {
    pub writes: Vec<bool>,
}

impl ErrorType for RecordingPin {
    type Error = Infallible;
}

impl OutputPin for RecordingPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.writes.push(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.writes.push(true);
        Ok(())
    }
}

/// Delay that returns immediately and adds up what it was asked to wait.
#[derive(Debug, Default)]
pub struct CountingDelay {
    pub total_ns: u64,
}

impl DelayNs for CountingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += u64::from(ns);
    }
}

impl CountingDelay {
    pub fn total_ms(&self) -> u64 {
        self.total_ns / 1_000_000
    }
}

// ── Sensor ────────────────────────────────────────────────────

/// Sensor that plays back a script of readings.  Once the script runs
/// out, the last entry repeats.
pub struct ScriptedSensor {
    script: VecDeque<Result<(f32, f32), SensorError>>,
    current: Result<(f32, f32), SensorError>,
    pub begin_calls: u32,
}

#[allow(dead_code)]
impl ScriptedSensor {
    pub fn steady(temperature: f32, humidity: f32) -> Self {
        Self::scripted(vec![Ok((temperature, humidity))])
    }

    pub fn scripted(script: Vec<Result<(f32, f32), SensorError>>) -> Self {
        Self {
            script: script.into(),
            current: Err(SensorError::NotReady),
            begin_calls: 0,
        }
    }

    pub fn push(&mut self, reading: Result<(f32, f32), SensorError>) {
        self.script.push_back(reading);
    }
}

impl SensorPort for ScriptedSensor {
    fn begin(&mut self) -> Result<(), SensorError> {
        self.begin_calls += 1;
        Ok(())
    }

    // One script step per temperature read; humidity reads the same step.
    fn read_temperature(&mut self) -> Result<f32, SensorError> {
        if let Some(next) = self.script.pop_front() {
            self.current = next;
        }
        self.current.map(|(t, _)| t)
    }

    fn read_humidity(&mut self) -> Result<f32, SensorError> {
        self.current.map(|(_, h)| h)
    }
}

// ── Network ───────────────────────────────────────────────────

/// WiFi stand-in that comes up after a fixed number of status polls.
pub struct MockNetwork {
    polls_until_up: Cell<u32>,
    joined: bool,
    pub begin_calls: Vec<(String, String)>,
    pub ip: Option<Ipv4Addr>,
}

#[allow(dead_code)]
impl MockNetwork {
    pub fn up() -> Self {
        Self::up_after(0)
    }

    /// Link reports down for `polls` status checks after the first join.
    pub fn up_after(polls: u32) -> Self {
        Self {
            polls_until_up: Cell::new(polls),
            joined: false,
            begin_calls: Vec::new(),
            ip: Some(Ipv4Addr::new(192, 168, 1, 50)),
        }
    }

    /// Take the link down; it returns after `polls` status checks.
    pub fn drop_link(&mut self, polls: u32) {
        self.polls_until_up.set(polls);
        self.joined = false;
    }
}

impl NetworkPort for MockNetwork {
    fn begin(&mut self, ssid: &str, password: &str) -> Result<(), CommsError> {
        self.begin_calls.push((ssid.to_owned(), password.to_owned()));
        self.joined = true;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        if !self.joined {
            return false;
        }
        match self.polls_until_up.get() {
            0 => true,
            n => {
                self.polls_until_up.set(n - 1);
                false
            }
        }
    }

    fn local_ip(&self) -> Option<Ipv4Addr> {
        self.ip
    }
}

// ── Cloud ─────────────────────────────────────────────────────

/// Broker stand-in with scripted connect results and a recorded
/// publish log.
pub struct MockCloud {
    connected: bool,
    state: SessionState,
    /// Results for upcoming connect attempts; empty means success.
    pub connect_script: VecDeque<Result<(), SessionState>>,
    pub fail_publish: bool,
    pub fail_subscribe: bool,
    pub server: Option<(String, u16)>,
    pub connect_calls: Vec<(String, String, String)>,
    pub subscriptions: Vec<String>,
    pub published: Vec<(String, String)>,
    pub publish_attempts: u32,
    inbox: VecDeque<(String, Vec<u8>)>,
}

#[allow(dead_code)]
impl MockCloud {
    pub fn new() -> Self {
        Self {
            connected: false,
            state: SessionState::Disconnected,
            connect_script: VecDeque::new(),
            fail_publish: false,
            fail_subscribe: false,
            server: None,
            connect_calls: Vec::new(),
            subscriptions: Vec::new(),
            published: Vec::new(),
            publish_attempts: 0,
            inbox: VecDeque::new(),
        }
    }

    pub fn refusing(results: Vec<SessionState>) -> Self {
        let mut c = Self::new();
        c.connect_script = results.into_iter().map(Err).collect();
        c
    }

    pub fn drop_session(&mut self) {
        self.connected = false;
        self.state = SessionState::ConnectionLost;
        self.subscriptions.clear();
    }

    /// Queue a message for the next pump.
    pub fn inject(&mut self, topic: &str, payload: &[u8]) {
        self.inbox.push_back((topic.to_owned(), payload.to_vec()));
    }

    pub fn last_payload(&self) -> Option<&str> {
        self.published.last().map(|(_, p)| p.as_str())
    }
}

impl CloudPort for MockCloud {
    fn set_server(&mut self, host: &str, port: u16) {
        self.server = Some((host.to_owned(), port));
    }

    fn connect(
        &mut self,
        client_id: &str,
        username: &str,
        password: &str,
    ) -> Result<(), SessionState> {
        self.connect_calls
            .push((client_id.to_owned(), username.to_owned(), password.to_owned()));
        self.subscriptions.clear();
        match self.connect_script.pop_front().unwrap_or(Ok(())) {
            Ok(()) => {
                self.connected = true;
                self.state = SessionState::Connected;
                Ok(())
            }
            Err(state) => {
                self.connected = false;
                self.state = state;
                Err(state)
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn state(&self) -> SessionState {
        self.state
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), CommsError> {
        if self.fail_subscribe {
            return Err(CommsError::SubscribeFailed);
        }
        self.subscriptions.push(topic.to_owned());
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), CommsError> {
        self.publish_attempts += 1;
        if self.fail_publish {
            return Err(CommsError::PublishFailed);
        }
        self.published
            .push((topic.to_owned(), String::from_utf8_lossy(payload).into_owned()));
        Ok(())
    }

    fn pump(&mut self, handler: &mut dyn FnMut(&str, &[u8])) {
        while let Some((topic, payload)) = self.inbox.pop_front() {
            handler(&topic, &payload);
        }
    }
}

// ── Clock and sink ────────────────────────────────────────────

#[derive(Default)]
pub struct ManualClock {
    now: Cell<u64>,
}

#[allow(dead_code)]
impl ManualClock {
    pub fn at(ms: u64) -> Self {
        Self { now: Cell::new(ms) }
    }

    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get() + ms);
    }
}

impl ClockPort for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }
}

/// Event sink that keeps every event.
#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Assembly ──────────────────────────────────────────────────

pub type TestService =
    DeviceService<ScriptedSensor, MockNetwork, MockCloud, RecordingPin, CountingDelay>;

pub fn test_config() -> DeviceConfig {
    DeviceConfig::with_identity("HomeWiFi", "mysecret8", "Xk2mQ9", "room-01", "version=2018-10-31&sign=abc")
        .unwrap()
}

pub fn service(sensor: ScriptedSensor, network: MockNetwork, cloud: MockCloud) -> TestService {
    DeviceService::new(
        test_config(),
        sensor,
        network,
        cloud,
        StatusIndicator::new(RecordingPin::default(), CountingDelay::default()),
    )
}

/// Service with WiFi and cloud that come up immediately, already started
/// at t = 0.
pub fn started(sensor: ScriptedSensor) -> (TestService, ManualClock, RecordingSink) {
    let clock = ManualClock::at(0);
    let mut sink = RecordingSink::default();
    let mut svc = service(sensor, MockNetwork::up(), MockCloud::new());
    svc.start(&clock, &mut sink);
    (svc, clock, sink)
}
