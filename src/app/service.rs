//! Device service: the hexagonal core.
//!
//! [`DeviceService`] owns the device state, the sensor reader, the
//! status indicator and the report timer, plus the network and cloud
//! adapters.  It exposes a hardware-agnostic lifecycle: [`start`] once,
//! then [`run_once`] forever.  All I/O flows through port traits, so the
//! whole service runs on the host against mock adapters.
//!
//! ```text
//!  SensorPort  ──▶ ┌──────────────────────────┐ ──▶ EventSink
//!  NetworkPort ◀──▶│      DeviceService        │
//!  CloudPort   ◀──▶│ state · timer · indicator │ ──▶ OutputPin
//!  ClockPort   ──▶ └──────────────────────────┘
//! ```
//!
//! [`start`]: DeviceService::start
//! [`run_once`]: DeviceService::run_once

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use log::{debug, info};

use crate::config::{DeviceConfig, Topics};
use crate::drivers::status_led::StatusIndicator;
use crate::error::Error;
use crate::scheduler::ReportTimer;
use crate::sensors::SensorReader;

use super::commands::{self, InboundOutcome};
use super::events::AppEvent;
use super::link::{self, CloudOutcome, LinkState, NetworkOutcome};
use super::payload;
use super::ports::{ClockPort, CloudPort, EventSink, NetworkPort, SensorPort};
use super::state::{DeviceState, Sample};

/// What happened to one report timer fire.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReportOutcome {
    /// Handed to the broker under this id.
    Published(u32),
    /// Attempted under this id and failed.
    Failed(u32, Error),
    /// Cloud session down; nothing sent and no id consumed.
    Skipped,
}

/// The application service orchestrates all domain logic.
pub struct DeviceService<S, N, C, P, D> {
    config: DeviceConfig,
    topics: Topics,
    state: DeviceState,
    sensor: SensorReader<S>,
    network: N,
    cloud: C,
    indicator: StatusIndicator<P, D>,
    report_timer: ReportTimer,
    link: LinkState,
}

impl<S, N, C, P, D> DeviceService<S, N, C, P, D>
where
    S: SensorPort,
    N: NetworkPort,
    C: CloudPort,
    P: OutputPin,
    D: DelayNs,
{
    /// Assemble the service.  Touches no hardware; call
    /// [`start`](Self::start) next.
    pub fn new(
        config: DeviceConfig,
        sensor: S,
        network: N,
        cloud: C,
        indicator: StatusIndicator<P, D>,
    ) -> Self {
        let topics = config.topics();
        let report_timer = ReportTimer::new(config.report_interval_ms);
        Self {
            config,
            topics,
            state: DeviceState::new(),
            sensor: SensorReader::new(sensor),
            network,
            cloud,
            indicator,
            report_timer,
            link: LinkState::Offline,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Initialisation: indicator off, sensor up, WiFi joined, one cloud
    /// attempt, report timer armed.
    ///
    /// Blocks until WiFi associates.  A failed cloud attempt is not fatal;
    /// [`run_once`](Self::run_once) keeps retrying.
    pub fn start(&mut self, clock: &impl ClockPort, sink: &mut impl EventSink) {
        self.indicator.init();
        self.sensor.begin();
        self.maintain_link(sink);

        self.report_timer.arm(clock.now_ms());
        info!(
            "Report: timer armed, every {} ms",
            self.config.report_interval_ms
        );
        sink.emit(&AppEvent::Started {
            report_interval_ms: self.config.report_interval_ms,
        });
    }

    /// One main-loop pass: keep the link up, deliver inbound messages,
    /// refresh the sample, and publish if the report timer fired.
    pub fn run_once(&mut self, clock: &impl ClockPort, sink: &mut impl EventSink) {
        self.maintain_link(sink);
        self.pump_messages(sink);
        self.refresh_sample(sink);
        if self.report_timer.poll(clock.now_ms()) {
            self.report(sink);
        }
    }

    // ── Connectivity ──────────────────────────────────────────

    fn maintain_link(&mut self, sink: &mut impl EventSink) {
        if let NetworkOutcome::Joined { attempts, ip } =
            link::ensure_network(&mut self.network, &mut self.indicator, &self.config)
        {
            sink.emit(&AppEvent::NetworkUp { ip, attempts });
        }

        match link::ensure_cloud(
            &mut self.cloud,
            &mut self.indicator,
            &self.config,
            &self.topics,
        ) {
            Ok(CloudOutcome::AlreadyUp) => {}
            Ok(CloudOutcome::Connected { subscribed }) => {
                sink.emit(&AppEvent::CloudConnected { subscribed });
            }
            Err(state) => sink.emit(&AppEvent::CloudConnectFailed(state)),
        }

        let now = LinkState::from_flags(self.network.is_connected(), self.cloud.is_connected());
        if now != self.link {
            sink.emit(&AppEvent::LinkChanged {
                from: self.link,
                to: now,
            });
            self.link = now;
        }
    }

    // ── Inbound ───────────────────────────────────────────────

    fn pump_messages(&mut self, sink: &mut impl EventSink) {
        let topics = &self.topics;
        let indicator = &mut self.indicator;
        self.cloud.pump(&mut |topic, payload| {
            commands::on_message(topics, indicator, topic, payload, &mut *sink);
        });
    }

    /// Handle one inbound message directly, bypassing the cloud pump.
    pub fn handle_message(
        &mut self,
        topic: &str,
        payload: &[u8],
        sink: &mut impl EventSink,
    ) -> InboundOutcome {
        commands::on_message(&self.topics, &mut self.indicator, topic, payload, sink)
    }

    // ── Sampling ──────────────────────────────────────────────

    /// Read the sensor; keep the old sample if the read fails.
    fn refresh_sample(&mut self, sink: &mut impl EventSink) {
        let failures_before = self.sensor.consecutive_failures();
        match self.sensor.sample() {
            Ok(sample) => {
                self.state.sample = sample;
                if failures_before > 0 {
                    sink.emit(&AppEvent::SensorRecovered {
                        failures: failures_before,
                    });
                }
            }
            Err(error) => sink.emit(&AppEvent::SensorFailed {
                error,
                consecutive: self.sensor.consecutive_failures(),
            }),
        }
    }

    // ── Reporting ─────────────────────────────────────────────

    /// Publish one property report with the current sample and indicator
    /// state.
    ///
    /// Dropped without consuming an id while the cloud session is down.
    /// Otherwise the id advances exactly once, whatever the outcome.
    pub fn report(&mut self, sink: &mut impl EventSink) -> ReportOutcome {
        if !self.cloud.is_connected() {
            debug!("Report: cloud session down, skipping");
            return ReportOutcome::Skipped;
        }

        let id = self.state.next_message_id();
        let sample = self.state.sample;
        let led_on = self.indicator.is_on();

        let result = payload::encode_property_post(id, &sample, led_on)
            .map_err(Error::from)
            .and_then(|json| {
                debug!("Report: {}", json);
                self.cloud
                    .publish(&self.topics.property_post, json.as_bytes())
                    .map_err(Error::from)
            });

        match result {
            Ok(()) => {
                self.indicator.blink(self.config.blink_half_period_ms);
                sink.emit(&AppEvent::Reported { id, sample, led_on });
                ReportOutcome::Published(id)
            }
            Err(error) => {
                sink.emit(&AppEvent::ReportFailed { id, error });
                ReportOutcome::Failed(id, error)
            }
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    /// Last good sample.
    pub fn sample(&self) -> Sample {
        self.state.sample
    }

    pub fn link_state(&self) -> LinkState {
        self.link
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    pub fn indicator(&self) -> &StatusIndicator<P, D> {
        &self.indicator
    }

    pub fn report_timer(&self) -> &ReportTimer {
        &self.report_timer
    }

    pub fn sensor(&self) -> &SensorReader<S> {
        &self.sensor
    }

    pub fn sensor_mut(&mut self) -> &mut SensorReader<S> {
        &mut self.sensor
    }

    pub fn network(&self) -> &N {
        &self.network
    }

    pub fn network_mut(&mut self) -> &mut N {
        &mut self.network
    }

    pub fn cloud(&self) -> &C {
        &self.cloud
    }

    pub fn cloud_mut(&mut self) -> &mut C {
        &mut self.cloud
    }
}
