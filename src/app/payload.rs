//! Thing-model JSON payloads.
//!
//! Outbound: the property report
//!
//! ```text
//! {"id":"7","version":"1.0","params":{"CurrentTemperature":{"value":23.4},
//!  "CurrentHumidity":{"value":60.2},"LED":{"value":true}}}
//! ```
//!
//! Inbound: property commands (`{"LED":{"value":true}}`) and report
//! acknowledgements (`{"id":"7","code":200,"msg":"success"}`).
//!
//! Both directions are bounded by the 256-byte message buffer; one byte
//! is reserved, so payloads may be at most 255 bytes long.

use core::fmt::Write;

use serde::{Deserialize, Serialize};

use super::commands::DeviceCommand;
use super::state::Sample;
use crate::config::MESSAGE_BUFFER_LEN;
use crate::error::PayloadError;

/// Longest payload accepted in either direction.
pub const MAX_PAYLOAD_LEN: usize = MESSAGE_BUFFER_LEN - 1;

/// Thing-model protocol version sent with every report.
pub const THING_MODEL_VERSION: &str = "1.0";

/// Largest magnitude a report may carry.  Well past anything a room
/// sensor reads, and small enough that the thousandths stay exact.
pub const MAX_REPORTABLE: f32 = 1.0e6;

/// Fixed-capacity copy of an inbound payload.
pub type InboundBuffer = heapless::Vec<u8, MESSAGE_BUFFER_LEN>;

// ───────────────────────────────────────────────────────────────
// Outbound
// ───────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct PropertyPost<'a> {
    id: heapless::String<10>,
    version: &'a str,
    params: PostParams,
}

#[derive(Serialize)]
struct PostParams {
    #[serde(rename = "CurrentTemperature")]
    temperature: Property<f64>,
    #[serde(rename = "CurrentHumidity")]
    humidity: Property<f64>,
    #[serde(rename = "LED")]
    led: Property<bool>,
}

#[derive(Serialize)]
struct Property<T> {
    value: T,
}

/// Serialise one property report.
pub fn encode_property_post(
    id: u32,
    sample: &Sample,
    led_on: bool,
) -> Result<String, PayloadError> {
    let mut id_text = heapless::String::<10>::new();
    write!(id_text, "{}", id).map_err(|_| PayloadError::Encode)?;

    let post = PropertyPost {
        id: id_text,
        version: THING_MODEL_VERSION,
        params: PostParams {
            temperature: Property {
                value: round_tenths(sample.temperature)?,
            },
            humidity: Property {
                value: round_tenths(sample.humidity)?,
            },
            led: Property { value: led_on },
        },
    };

    let json = serde_json::to_string(&post).map_err(|_| PayloadError::Encode)?;
    if json.len() > MAX_PAYLOAD_LEN {
        return Err(PayloadError::TooLarge {
            len: json.len(),
            max: MAX_PAYLOAD_LEN,
        });
    }
    Ok(json)
}

/// Round to one decimal place.
///
/// The value is first quantised to thousandths, which absorbs the f32
/// representation error (23.45f32 is really 23.4500007…), then rounded
/// to tenths with ties to even.  Never returns negative zero.
///
/// Values beyond [`MAX_REPORTABLE`] (or non-finite) are refused rather
/// than saturated.
pub fn round_tenths(value: f32) -> Result<f64, PayloadError> {
    if !value.is_finite() || value.abs() > MAX_REPORTABLE {
        return Err(PayloadError::OutOfRange);
    }
    let thousandths = (f64::from(value) * 1000.0).round() as i64;
    let magnitude = thousandths.unsigned_abs();
    let mut tenths = magnitude / 100;
    let rest = magnitude % 100;
    if rest > 50 || (rest == 50 && tenths % 2 == 1) {
        tenths += 1;
    }
    let tenths = tenths as i64;
    let signed = if thousandths < 0 { -tenths } else { tenths };
    Ok(signed as f64 / 10.0)
}

// ───────────────────────────────────────────────────────────────
// Inbound
// ───────────────────────────────────────────────────────────────

/// Copy `payload` into a fixed buffer, rejecting anything longer than
/// [`MAX_PAYLOAD_LEN`].
pub fn copy_bounded(payload: &[u8]) -> Result<InboundBuffer, PayloadError> {
    let too_large = PayloadError::TooLarge {
        len: payload.len(),
        max: MAX_PAYLOAD_LEN,
    };
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(too_large);
    }
    InboundBuffer::from_slice(payload).map_err(|()| too_large)
}

/// Decode a property-set command.
///
/// `Ok(None)` when the document has no `LED` key; `Malformed` when the
/// JSON does not parse or `LED.value` is not a boolean.
pub fn decode_property_set(payload: &[u8]) -> Result<Option<DeviceCommand>, PayloadError> {
    let doc: serde_json::Value =
        serde_json::from_slice(payload).map_err(|_| PayloadError::Malformed)?;

    let Some(led) = doc.get("LED") else {
        return Ok(None);
    };
    led.get("value")
        .and_then(serde_json::Value::as_bool)
        .map(|on| Some(DeviceCommand::SetIndicator(on)))
        .ok_or(PayloadError::Malformed)
}

/// Cloud acknowledgement of a property report.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PostReply {
    pub id: heapless::String<16>,
    pub code: i32,
    #[serde(default)]
    pub msg: heapless::String<128>,
}

impl PostReply {
    pub fn is_success(&self) -> bool {
        self.code == 200
    }
}

pub fn decode_post_reply(payload: &[u8]) -> Result<PostReply, PayloadError> {
    serde_json::from_slice(payload).map_err(|_| PayloadError::Malformed)
}
