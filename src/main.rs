//! RoomSense Firmware: Main Entry Point
//!
//! Samples a DHT11, reports temperature, humidity and LED state to the
//! cloud every ten seconds, and switches the LED on remote command.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  Dht11Sensor   WifiAdapter    MqttAdapter   LogEventSink       │
//! │  (SensorPort)  (NetworkPort)  (CloudPort)   (EventSink)        │
//! │  Esp32Time     PinDriver + FreeRtos                            │
//! │  (ClockPort)   (OutputPin + DelayNs)                           │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │            DeviceService (pure logic)                  │    │
//! │  │  link upkeep · sampling · reporting · commands         │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use log::{error, info, warn};

use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::gpio::{IOPin, PinDriver};
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::nvs::EspDefaultNvsPartition;

use roomsense::adapters::log_sink::LogEventSink;
use roomsense::adapters::mqtt::MqttAdapter;
use roomsense::adapters::time::Esp32TimeAdapter;
use roomsense::adapters::wifi::WifiAdapter;
use roomsense::app::service::DeviceService;
use roomsense::config::DeviceConfig;
use roomsense::drivers::status_led::StatusIndicator;
use roomsense::pins;
use roomsense::sensors::dht::Dht11Sensor;

/// Idle time between main-loop passes.
const LOOP_IDLE_MS: u32 = 10;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  RoomSense v{}                       ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Configuration ──────────────────────────────────────
    let config = match DeviceConfig::from_build_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Config: build-time identity rejected — {}", e);
            DeviceConfig::default()
        }
    };
    if let Err(e) = config.validate() {
        warn!("Config: {} — continuing with compiled-in values", e);
    }
    info!(
        "Config: device '{}' on product '{}', indicator GPIO{}, sensor GPIO{}",
        config.device_name,
        config.product_id,
        pins::INDICATOR_GPIO,
        pins::DHT_DATA_GPIO
    );

    // ── 3. Peripherals ────────────────────────────────────────
    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    let led_pin = PinDriver::output(peripherals.pins.gpio2)?;
    let indicator = StatusIndicator::new(led_pin, FreeRtos);
    let sensor = Dht11Sensor::new(peripherals.pins.gpio4.downgrade())?;
    let wifi = WifiAdapter::new(peripherals.modem, sysloop, Some(nvs))?;
    let cloud = MqttAdapter::new();

    // ── 4. Application core ───────────────────────────────────
    let clock = Esp32TimeAdapter::new();
    let mut sink = LogEventSink::new();
    let mut service = DeviceService::new(config, sensor, wifi, cloud, indicator);
    service.start(&clock, &mut sink);

    // ── 5. Main loop ──────────────────────────────────────────
    loop {
        service.run_once(&clock, &mut sink);
        FreeRtos::delay_ms(LOOP_IDLE_MS);
    }
}
