//! DHT11 temperature/humidity sensor on a single open-drain data line.
//!
//! The DHT11 needs about two seconds between conversions; reading faster
//! returns the previous frame at best and a timeout at worst.  The adapter
//! therefore runs at most one bus transaction per [`MIN_SAMPLE_INTERVAL`]
//! and answers both `read_temperature` and `read_humidity` from the cached
//! frame in between.  A failed transaction is cached too, so a dead sensor
//! does not get hammered every loop iteration.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: bit-bangs the line through `dht-sensor` with `Ets` delays.
//! On host/test: reads from static atomics set by [`sim_set_reading`].

use std::time::{Duration, Instant};

#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::{AtomicU32, Ordering};

#[cfg(target_os = "espidf")]
use esp_idf_hal::{
    delay::Ets,
    gpio::{AnyIOPin, InputOutput, PinDriver, Pull},
    sys::EspError,
};

use crate::app::ports::SensorPort;
use crate::error::SensorError;

/// Shortest spacing between two bus transactions.
pub const MIN_SAMPLE_INTERVAL: Duration = Duration::from_secs(2);

// 22.0 °C, 50.0 %RH
#[cfg(not(target_os = "espidf"))]
static SIM_TEMPERATURE_BITS: AtomicU32 = AtomicU32::new(0x41B0_0000);
#[cfg(not(target_os = "espidf"))]
static SIM_HUMIDITY_BITS: AtomicU32 = AtomicU32::new(0x4248_0000);

/// Set what the simulated sensor reports next.  NaN in either channel
/// simulates a failed conversion.
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_reading(temperature: f32, humidity: f32) {
    SIM_TEMPERATURE_BITS.store(temperature.to_bits(), Ordering::Relaxed);
    SIM_HUMIDITY_BITS.store(humidity.to_bits(), Ordering::Relaxed);
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    temperature: f32,
    humidity: f32,
}

pub struct Dht11Sensor {
    #[cfg(target_os = "espidf")]
    pin: PinDriver<'static, AnyIOPin, InputOutput>,
    #[cfg(target_os = "espidf")]
    delay: Ets,
    ready: bool,
    last: Option<(Instant, Result<Frame, SensorError>)>,
}

#[cfg(target_os = "espidf")]
impl Dht11Sensor {
    /// Claim `pin` as an open-drain line with the internal pull-up.
    pub fn new(pin: AnyIOPin) -> Result<Self, EspError> {
        let mut pin = PinDriver::input_output_od(pin)?;
        pin.set_pull(Pull::Up)?;
        Ok(Self {
            pin,
            delay: Ets,
            ready: false,
            last: None,
        })
    }
}

#[cfg(not(target_os = "espidf"))]
impl Dht11Sensor {
    pub fn new() -> Self {
        Self {
            ready: false,
            last: None,
        }
    }
}

#[cfg(not(target_os = "espidf"))]
impl Default for Dht11Sensor {
    fn default() -> Self {
        Self::new()
    }
}

impl Dht11Sensor {
    fn frame(&mut self) -> Result<Frame, SensorError> {
        if !self.ready {
            return Err(SensorError::NotReady);
        }
        if let Some((at, cached)) = self.last {
            if at.elapsed() < MIN_SAMPLE_INTERVAL {
                return cached;
            }
        }
        let fresh = self.transact();
        self.last = Some((Instant::now(), fresh));
        fresh
    }

    #[cfg(target_os = "espidf")]
    fn platform_begin(&mut self) -> Result<(), SensorError> {
        // Idle level is high; the first start pulse pulls it low.
        self.pin.set_high().map_err(|_| SensorError::Gpio)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_begin(&mut self) -> Result<(), SensorError> {
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn transact(&mut self) -> Result<Frame, SensorError> {
        use dht_sensor::{DhtError, dht11};

        self.pin.set_high().map_err(|_| SensorError::Gpio)?;
        match dht11::blocking::read(&mut self.delay, &mut self.pin) {
            Ok(reading) => Ok(Frame {
                temperature: f32::from(reading.temperature),
                humidity: f32::from(reading.relative_humidity),
            }),
            Err(DhtError::Timeout) => Err(SensorError::Timeout),
            Err(DhtError::ChecksumMismatch) => Err(SensorError::Checksum),
            Err(_) => Err(SensorError::Gpio),
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn transact(&mut self) -> Result<Frame, SensorError> {
        Ok(Frame {
            temperature: f32::from_bits(SIM_TEMPERATURE_BITS.load(Ordering::Relaxed)),
            humidity: f32::from_bits(SIM_HUMIDITY_BITS.load(Ordering::Relaxed)),
        })
    }
}

impl SensorPort for Dht11Sensor {
    fn begin(&mut self) -> Result<(), SensorError> {
        self.platform_begin()?;
        self.ready = true;
        self.last = None;
        Ok(())
    }

    fn read_temperature(&mut self) -> Result<f32, SensorError> {
        self.frame().map(|f| f.temperature)
    }

    fn read_humidity(&mut self) -> Result<f32, SensorError> {
        self.frame().map(|f| f.humidity)
    }
}
