//! Sensor subsystem: the DHT driver and the validating [`SensorReader`].
//!
//! The reader wraps any [`SensorPort`] and turns its two separate reads
//! into one [`Sample`], or a [`SensorError`] if either read fails or comes
//! back non-finite.  It also counts consecutive failures so the caller can
//! throttle its logging.

pub mod dht;

use crate::app::ports::SensorPort;
use crate::app::state::Sample;
use crate::error::SensorError;
use log::warn;

/// Validating front end for a temperature/humidity driver.
pub struct SensorReader<S> {
    driver: S,
    consecutive_failures: u32,
}

impl<S: SensorPort> SensorReader<S> {
    pub fn new(driver: S) -> Self {
        Self {
            driver,
            consecutive_failures: 0,
        }
    }

    /// Initialise the driver.  A failure is logged; reads will keep
    /// failing until the driver recovers on its own.
    pub fn begin(&mut self) {
        if let Err(e) = self.driver.begin() {
            warn!("Sensor: init failed — {}", e);
        }
    }

    /// Read both channels.
    ///
    /// Both reads are always issued, so a driver that samples lazily sees
    /// the same access pattern whether or not the first one fails.
    pub fn sample(&mut self) -> Result<Sample, SensorError> {
        let temperature = self.driver.read_temperature();
        let humidity = self.driver.read_humidity();

        let result = match (temperature, humidity) {
            (Ok(t), Ok(h)) => {
                let s = Sample::new(t, h);
                if s.is_valid() {
                    Ok(s)
                } else {
                    Err(SensorError::InvalidReading)
                }
            }
            (Err(e), _) | (_, Err(e)) => Err(e),
        };

        match result {
            Ok(_) => self.consecutive_failures = 0,
            Err(_) => self.consecutive_failures = self.consecutive_failures.saturating_add(1),
        }
        result
    }

    /// Failed reads since the last good one.
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn driver(&self) -> &S {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut S {
        &mut self.driver
    }
}
