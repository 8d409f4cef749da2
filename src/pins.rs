//! GPIO assignments for the RoomSense board (ESP32 DevKit).
//!
//! Single source of truth: drivers reference this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Status indicator
// ---------------------------------------------------------------------------

/// On-board blue LED.  Active HIGH.
pub const INDICATOR_GPIO: i32 = 2;

// ---------------------------------------------------------------------------
// Sensors
// ---------------------------------------------------------------------------

/// DHT11 single-wire data line (open drain, external 10 kΩ pull-up).
pub const DHT_DATA_GPIO: i32 = 4;
