//! Outbound application events.
//!
//! The [`DeviceService`](super::service::DeviceService) emits these through
//! the [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them: log to serial, count them in a test,
//! etc.

use core::net::Ipv4Addr;

use super::link::LinkState;
use super::ports::SessionState;
use super::state::Sample;
use crate::error::{Error, PayloadError, SensorError};

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// Initialisation finished; the report timer is armed.
    Started { report_interval_ms: u32 },

    /// Overall connectivity changed.
    LinkChanged { from: LinkState, to: LinkState },

    /// The network link came up after `attempts` blink cycles of waiting.
    NetworkUp { ip: Option<Ipv4Addr>, attempts: u32 },

    /// The cloud session connected.  `subscribed` of the
    /// [`INBOUND_TOPICS`](super::link::INBOUND_TOPICS) subscriptions were
    /// accepted.
    CloudConnected { subscribed: u8 },

    /// A cloud connect attempt failed; retried next loop iteration.
    CloudConnectFailed(SessionState),

    /// A property report was handed to the broker.
    Reported { id: u32, sample: Sample, led_on: bool },

    /// A property report could not be sent.  The id is consumed anyway.
    ReportFailed { id: u32, error: Error },

    /// The cloud acknowledged a property report.
    ReportAcknowledged { id: heapless::String<16>, code: i32 },

    /// A sensor read failed; the previous sample is kept.
    SensorFailed { error: SensorError, consecutive: u32 },

    /// The sensor answered again after `failures` failed reads.
    SensorRecovered { failures: u32 },

    /// A remote command changed the indicator state.
    IndicatorChanged { on: bool },

    /// An inbound message was discarded.
    MessageRejected { error: PayloadError },
}
