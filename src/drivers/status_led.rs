//! Single-colour status indicator.
//!
//! One GPIO drives one LED.  The driver keeps two levels apart:
//!
//! * the **logical** state, which the cloud owns through the `LED`
//!   property and which is what reports carry;
//! * the **physical** pin level, which blinks and the steady-on "network
//!   up" signal may override for a while.
//!
//! A blink always leaves the pin at the logical level.  `steady_on` only
//! moves the pin; the logical state is untouched, so the next report
//! still says what the cloud last asked for.
//!
//! Generic over `embedded-hal` pins and delays, so tests drive it with
//! recording mocks and the firmware with `PinDriver` + `FreeRtos`.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{Error as _, OutputPin};
use log::warn;

pub struct StatusIndicator<P, D> {
    pin: P,
    delay: D,
    logical_on: bool,
    level_high: bool,
}

impl<P: OutputPin, D: DelayNs> StatusIndicator<P, D> {
    /// Wrap a pin.  The pin is not written until [`init`](Self::init).
    pub fn new(pin: P, delay: D) -> Self {
        Self {
            pin,
            delay,
            logical_on: false,
            level_high: false,
        }
    }

    /// Drive the pin low and reset the logical state to off.
    pub fn init(&mut self) {
        self.logical_on = false;
        self.write(false);
    }

    /// Logical state, as reported to the cloud.
    pub fn is_on(&self) -> bool {
        self.logical_on
    }

    /// Last level written to the pin.
    pub fn is_lit(&self) -> bool {
        self.level_high
    }

    /// Set the logical state.  Writes the pin only if the state changes;
    /// returns whether it did.
    pub fn set_state(&mut self, on: bool) -> bool {
        if on == self.logical_on {
            return false;
        }
        self.logical_on = on;
        self.write(on);
        true
    }

    /// One blocking blink: high, wait, low, wait.  Then back to the
    /// logical level.
    pub fn blink(&mut self, half_period_ms: u32) {
        self.write(true);
        self.delay.delay_ms(half_period_ms);
        self.write(false);
        self.delay.delay_ms(half_period_ms);
        if self.logical_on {
            self.write(true);
        }
    }

    /// Light the pin without changing the logical state.
    pub fn steady_on(&mut self) {
        self.write(true);
    }

    pub fn pin(&self) -> &P {
        &self.pin
    }

    pub fn delay(&self) -> &D {
        &self.delay
    }

    fn write(&mut self, high: bool) {
        let result = if high {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        if let Err(e) = result {
            warn!("Indicator: pin write failed ({:?})", e.kind());
        }
        self.level_high = high;
    }
}
