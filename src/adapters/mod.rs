//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements   | Connects to               |
//! |------------|--------------|---------------------------|
//! | `log_sink` | EventSink    | Serial log output         |
//! | `mqtt`     | CloudPort    | ESP-IDF MQTT client       |
//! | `time`     | ClockPort    | ESP32 system timer        |
//! | `wifi`     | NetworkPort  | ESP-IDF WiFi STA          |
//!
//! The sensor adapter lives in [`crate::sensors::dht`].

pub mod log_sink;
pub mod mqtt;
pub mod time;
pub mod wifi;
