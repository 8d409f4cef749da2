//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).
//!
//! Sensor failures are throttled: the first one of a run is a warning,
//! repeats drop to debug, and the recovery is logged once at info.

use log::{debug, info, warn};

use crate::app::events::AppEvent;
use crate::app::link::INBOUND_TOPICS;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
pub struct LogEventSink;

impl Default for LogEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started { report_interval_ms } => {
                info!("START | report every {} ms", report_interval_ms);
            }
            AppEvent::LinkChanged { from, to } => {
                info!("LINK | {} -> {}", from, to);
            }
            AppEvent::NetworkUp { ip, attempts } => match ip {
                Some(ip) => info!("LINK | WiFi up, ip={} after {} attempts", ip, attempts),
                None => info!("LINK | WiFi up after {} attempts", attempts),
            },
            AppEvent::CloudConnected { subscribed } if *subscribed < INBOUND_TOPICS => {
                warn!(
                    "LINK | cloud session up, only {}/{} subscriptions accepted",
                    subscribed, INBOUND_TOPICS
                );
            }
            AppEvent::CloudConnected { .. } => info!("LINK | cloud session up"),
            AppEvent::CloudConnectFailed(state) => {
                warn!("LINK | cloud connect failed, rc={}", state.code());
            }
            AppEvent::Reported { id, sample, led_on } => {
                info!(
                    "REPORT | id={} | T={:.1}\u{00b0}C | RH={:.1}% | LED={}",
                    id,
                    sample.temperature,
                    sample.humidity,
                    if *led_on { "on" } else { "off" },
                );
            }
            AppEvent::ReportFailed { id, error } => {
                warn!("REPORT | id={} failed: {}", id, error);
            }
            AppEvent::ReportAcknowledged { id, code: 200 } => {
                info!("REPORT | id={} acknowledged", id);
            }
            AppEvent::ReportAcknowledged { id, code } => {
                warn!("REPORT | id={} refused, code={}", id, code);
            }
            AppEvent::SensorFailed { error, consecutive } => {
                if *consecutive == 1 {
                    warn!("SENSOR | read failed: {}", error);
                } else {
                    debug!("SENSOR | read failed ({} in a row): {}", consecutive, error);
                }
            }
            AppEvent::SensorRecovered { failures } => {
                info!("SENSOR | recovered after {} failed reads", failures);
            }
            AppEvent::IndicatorChanged { on } => {
                info!("CMD | LED {}", if *on { "on" } else { "off" });
            }
            AppEvent::MessageRejected { error } => {
                warn!("CMD | message rejected: {}", error);
            }
        }
    }
}
