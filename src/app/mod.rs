//! Application core: pure domain logic, zero I/O.
//!
//! This module holds the rules of the RoomSense node: when to join the
//! network, when to (re)connect the cloud session, what a report looks
//! like, and what an inbound command does.  All interaction with hardware
//! happens through **port traits** defined in [`ports`], keeping this
//! layer fully testable without real peripherals.

pub mod commands;
pub mod events;
pub mod link;
pub mod payload;
pub mod ports;
pub mod service;
pub mod state;
