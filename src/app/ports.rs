//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ DeviceService (domain)
//! ```
//!
//! Driven adapters (sensor, WiFi, MQTT session, event sinks) implement
//! these traits.  The [`DeviceService`](super::service::DeviceService)
//! consumes them via generics, so the domain core never touches the
//! ESP-IDF drivers directly.
//!
//! The indicator pin and blink delays are not ports of their own: they
//! use the `embedded-hal` [`OutputPin`](embedded_hal::digital::OutputPin)
//! and [`DelayNs`](embedded_hal::delay::DelayNs) traits.

use core::fmt;
use core::net::Ipv4Addr;

use crate::error::{CommsError, SensorError};

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Temperature/humidity sensor driver.
pub trait SensorPort {
    /// Prepare the data line.  Called once during initialisation.
    fn begin(&mut self) -> Result<(), SensorError>;

    /// Degrees Celsius.
    fn read_temperature(&mut self) -> Result<f32, SensorError>;

    /// Relative humidity, percent.
    fn read_humidity(&mut self) -> Result<f32, SensorError>;
}

// ───────────────────────────────────────────────────────────────
// Network port (driven adapter: domain ↔ WiFi)
// ───────────────────────────────────────────────────────────────

/// Wireless network link.
pub trait NetworkPort {
    /// Issue a join request.  Does not wait for the link to come up.
    fn begin(&mut self, ssid: &str, password: &str) -> Result<(), CommsError>;

    /// Link is associated and has an address.
    fn is_connected(&self) -> bool;

    /// Station address, once the link is up.
    fn local_ip(&self) -> Option<Ipv4Addr>;
}

// ───────────────────────────────────────────────────────────────
// Cloud port (driven adapter: domain ↔ publish/subscribe session)
// ───────────────────────────────────────────────────────────────

/// Publish/subscribe session with the cloud broker.
pub trait CloudPort {
    /// Set the broker endpoint used by the next [`connect`](Self::connect).
    fn set_server(&mut self, host: &str, port: u16);

    /// Single, blocking connect attempt.  The error is the session state
    /// the attempt ended in.
    fn connect(&mut self, client_id: &str, username: &str, password: &str)
    -> Result<(), SessionState>;

    fn is_connected(&self) -> bool;

    /// Last observed session state.
    fn state(&self) -> SessionState;

    fn subscribe(&mut self, topic: &str) -> Result<(), CommsError>;

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), CommsError>;

    /// Deliver every pending inbound message to `handler`, synchronously,
    /// on the caller's thread.
    fn pump(&mut self, handler: &mut dyn FnMut(&str, &[u8]));
}

/// Session state codes, numbered the way Arduino-class MQTT clients
/// report them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i8)]
pub enum SessionState {
    ConnectionTimeout = -4,
    ConnectionLost = -3,
    ConnectFailed = -2,
    Disconnected = -1,
    Connected = 0,
    BadProtocol = 1,
    BadClientId = 2,
    Unavailable = 3,
    BadCredentials = 4,
    Unauthorized = 5,
}

impl SessionState {
    /// Numeric code, as logged.
    pub const fn code(self) -> i32 {
        self as i8 as i32
    }

    /// Inverse of [`code`](Self::code).
    pub const fn from_code(code: i32) -> Option<Self> {
        Some(match code {
            -4 => Self::ConnectionTimeout,
            -3 => Self::ConnectionLost,
            -2 => Self::ConnectFailed,
            -1 => Self::Disconnected,
            0 => Self::Connected,
            1 => Self::BadProtocol,
            2 => Self::BadClientId,
            3 => Self::Unavailable,
            4 => Self::BadCredentials,
            5 => Self::Unauthorized,
            _ => return None,
        })
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::ConnectionTimeout => "connection timeout",
            Self::ConnectionLost => "connection lost",
            Self::ConnectFailed => "connect failed",
            Self::Disconnected => "disconnected",
            Self::Connected => "connected",
            Self::BadProtocol => "bad protocol",
            Self::BadClientId => "bad client id",
            Self::Unavailable => "server unavailable",
            Self::BadCredentials => "bad credentials",
            Self::Unauthorized => "unauthorized",
        };
        write!(f, "{} ({})", text, self.code())
    }
}

// ───────────────────────────────────────────────────────────────
// Clock port (driven adapter: hardware timer → domain)
// ───────────────────────────────────────────────────────────────

/// Monotonic millisecond clock used by the report timer.
pub trait ClockPort {
    /// Milliseconds since boot.
    fn now_ms(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}
