//! Unified error types for the RoomSense firmware.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! main loop's error handling uniform.  All variants are `Copy` so they
//! can be logged and passed around without allocation.
//!
//! Nothing in this firmware is fatal: every error ends up logged and the
//! main loop retries on its next iteration.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The temperature/humidity sensor could not be read.
    Sensor(SensorError),
    /// A network or publish/subscribe operation failed.
    Comms(CommsError),
    /// An inbound or outbound payload was rejected.
    Payload(PayloadError),
    /// Configuration is invalid.
    Config(ConfigError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Comms(e) => write!(f, "comms: {e}"),
            Self::Payload(e) => write!(f, "payload: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// The sensor did not answer the start pulse in time.
    Timeout,
    /// The frame arrived but its checksum did not match.
    Checksum,
    /// The data line could not be driven or sampled.
    Gpio,
    /// The driver produced a non-finite value (NaN or infinity).
    InvalidReading,
    /// The sensor has not been initialised yet.
    NotReady,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "sensor timeout"),
            Self::Checksum => write!(f, "checksum mismatch"),
            Self::Gpio => write!(f, "data line I/O failed"),
            Self::InvalidReading => write!(f, "reading is not a number"),
            Self::NotReady => write!(f, "sensor not initialised"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Communications errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommsError {
    /// The WiFi driver refused the join request.
    WifiJoinFailed,
    /// SSID or password could not be handed to the WiFi driver.
    InvalidCredentials,
    /// The publish/subscribe session is not connected.
    NotConnected,
    /// A SUBSCRIBE request was rejected locally.
    SubscribeFailed,
    /// A PUBLISH request was rejected locally.
    PublishFailed,
}

impl fmt::Display for CommsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WifiJoinFailed => write!(f, "WiFi join request failed"),
            Self::InvalidCredentials => write!(f, "WiFi credentials rejected by driver"),
            Self::NotConnected => write!(f, "session not connected"),
            Self::SubscribeFailed => write!(f, "subscribe failed"),
            Self::PublishFailed => write!(f, "publish failed"),
        }
    }
}

impl From<CommsError> for Error {
    fn from(e: CommsError) -> Self {
        Self::Comms(e)
    }
}

// ---------------------------------------------------------------------------
// Payload errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadError {
    /// Payload does not fit the fixed message buffer.
    TooLarge { len: usize, max: usize },
    /// Payload is not valid JSON or does not match the expected shape.
    Malformed,
    /// JSON serialisation failed.
    Encode,
    /// A value to report is non-finite or implausibly large.
    OutOfRange,
}

impl fmt::Display for PayloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooLarge { len, max } => write!(f, "{len} bytes exceeds limit of {max}"),
            Self::Malformed => write!(f, "malformed JSON"),
            Self::Encode => write!(f, "JSON encoding failed"),
            Self::OutOfRange => write!(f, "value outside reportable range"),
        }
    }
}

impl From<PayloadError> for Error {
    fn from(e: PayloadError) -> Self {
        Self::Payload(e)
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// A config field failed validation.  The `&'static str` names the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    InvalidSsid,
    InvalidPassword,
    MissingField(&'static str),
    OutOfRange(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => {
                write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)")
            }
            Self::MissingField(name) => write!(f, "{name} must not be empty"),
            Self::OutOfRange(name) => write!(f, "{name} out of range"),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
