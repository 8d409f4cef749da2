//! RoomSense firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod error;
pub mod pins;
pub mod scheduler;

// Each of these carries a real ESP-IDF implementation and a host
// simulation, selected by cfg inside the module.
pub mod adapters;
pub mod drivers;
pub mod sensors;
