//! Inbound commands and the message handler.
//!
//! The cloud session's event pump calls [`on_message`] synchronously on
//! the main loop for every message on a subscribed topic.  It must return
//! quickly: no sensor reads, no blinking.
//!
//! Nothing is ever surfaced back to the broker.  Bad payloads are logged
//! and dropped.

use log::{debug, info, warn};

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use super::events::AppEvent;
use super::payload;
use super::ports::EventSink;
use crate::config::Topics;
use crate::drivers::status_led::StatusIndicator;
use crate::error::PayloadError;

/// Commands the cloud can send to the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceCommand {
    /// Switch the indicator on (`true`) or off (`false`).
    SetIndicator(bool),
}

/// What the handler did with one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundOutcome {
    /// The command changed device state.
    Applied(DeviceCommand),
    /// The command matched the current state; nothing was written.
    Unchanged(DeviceCommand),
    /// A report acknowledgement, logged only.
    Acknowledged { code: i32 },
    /// Unrelated topic, or no recognised command key.
    Ignored,
    /// Oversize or malformed payload.
    Rejected(PayloadError),
}

/// Handle one inbound message.
pub fn on_message<P, D>(
    topics: &Topics,
    indicator: &mut StatusIndicator<P, D>,
    topic: &str,
    payload: &[u8],
    sink: &mut impl EventSink,
) -> InboundOutcome
where
    P: OutputPin,
    D: DelayNs,
{
    let buffer = match payload::copy_bounded(payload) {
        Ok(b) => b,
        Err(error) => {
            warn!("Command: message on '{}' rejected — {}", topic, error);
            return reject(error, sink);
        }
    };
    info!(
        "Command: message on '{}': {}",
        topic,
        String::from_utf8_lossy(&buffer)
    );

    if topic == topics.property_set.as_str() {
        match payload::decode_property_set(&buffer) {
            Ok(Some(cmd)) => apply(cmd, indicator, sink),
            Ok(None) => {
                debug!("Command: no recognised property in set request");
                InboundOutcome::Ignored
            }
            Err(error) => {
                warn!("Command: JSON parse failed — {}", error);
                reject(error, sink)
            }
        }
    } else if topic == topics.property_post_reply.as_str() {
        match payload::decode_post_reply(&buffer) {
            Ok(reply) => {
                if reply.is_success() {
                    info!("Command: report {} acknowledged", reply.id);
                } else {
                    warn!(
                        "Command: report {} refused, code={} msg='{}'",
                        reply.id, reply.code, reply.msg
                    );
                }
                let code = reply.code;
                sink.emit(&AppEvent::ReportAcknowledged { id: reply.id, code });
                InboundOutcome::Acknowledged { code }
            }
            Err(error) => {
                warn!("Command: unreadable report reply — {}", error);
                reject(error, sink)
            }
        }
    } else {
        debug!("Command: no handler for topic '{}'", topic);
        InboundOutcome::Ignored
    }
}

fn apply<P, D>(
    cmd: DeviceCommand,
    indicator: &mut StatusIndicator<P, D>,
    sink: &mut impl EventSink,
) -> InboundOutcome
where
    P: OutputPin,
    D: DelayNs,
{
    match cmd {
        DeviceCommand::SetIndicator(on) => {
            info!("Command: LED -> {}", if on { "on" } else { "off" });
            if indicator.set_state(on) {
                sink.emit(&AppEvent::IndicatorChanged { on });
                InboundOutcome::Applied(cmd)
            } else {
                InboundOutcome::Unchanged(cmd)
            }
        }
    }
}

fn reject(error: PayloadError, sink: &mut impl EventSink) -> InboundOutcome {
    sink.emit(&AppEvent::MessageRejected { error });
    InboundOutcome::Rejected(error)
}
