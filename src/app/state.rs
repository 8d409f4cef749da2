//! Process-wide device state, held in one explicit struct.

/// One temperature/humidity reading.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Sample {
    /// Degrees Celsius.
    pub temperature: f32,
    /// Relative humidity, percent.
    pub humidity: f32,
}

impl Sample {
    pub const fn new(temperature: f32, humidity: f32) -> Self {
        Self {
            temperature,
            humidity,
        }
    }

    /// Both fields hold real numbers.
    pub fn is_valid(&self) -> bool {
        self.temperature.is_finite() && self.humidity.is_finite()
    }
}

/// Mutable state shared by the main loop, the report timer and the
/// command handler.  Indicator state lives in
/// [`StatusIndicator`](crate::drivers::status_led::StatusIndicator).
#[derive(Debug, Clone, Default)]
pub struct DeviceState {
    /// Last good reading.  Starts at zero and is never cleared.
    pub sample: Sample,
    /// Id of the next property report.  Advances once per publish attempt.
    pub message_id: u32,
}

impl DeviceState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the current message id and advance the counter (wrapping).
    pub fn next_message_id(&mut self) -> u32 {
        let id = self.message_id;
        self.message_id = self.message_id.wrapping_add(1);
        id
    }
}
