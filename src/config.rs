//! Device configuration.
//!
//! Identity and credentials are compile-time constants.  They are picked
//! up from the build environment (`ROOMSENSE_*` variables) so secrets stay
//! out of the source tree; unset variables fall back to blank placeholders.
//!
//! Every identity field has a fixed capacity.  A value that does not fit
//! is refused with [`ConfigError::OutOfRange`] naming the field; it is
//! never cut short, since a shortened token or device name only shows up
//! later as a refused connect or a deaf subscription.

use core::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// WiFi network name, baked in at build time.
pub const WIFI_SSID: &str = match option_env!("ROOMSENSE_WIFI_SSID") {
    Some(v) => v,
    None => " ",
};

/// WiFi passphrase, baked in at build time.
pub const WIFI_PASSWORD: &str = match option_env!("ROOMSENSE_WIFI_PASSWORD") {
    Some(v) => v,
    None => " ",
};

/// Cloud product identifier (also the MQTT username).
pub const PRODUCT_ID: &str = match option_env!("ROOMSENSE_PRODUCT_ID") {
    Some(v) => v,
    None => " ",
};

/// Cloud device name (also the MQTT client id).
pub const DEVICE_NAME: &str = match option_env!("ROOMSENSE_DEVICE_NAME") {
    Some(v) => v,
    None => " ",
};

/// Pre-computed device access token (the MQTT password).
pub const ACCESS_TOKEN: &str = match option_env!("ROOMSENSE_TOKEN") {
    Some(v) => v,
    None => " ",
};

pub const BROKER_HOST: &str = "mqtts.heclouds.com";
pub const BROKER_PORT: u16 = 1883;

/// Capacity of the inbound and outbound message buffers, in bytes.
pub const MESSAGE_BUFFER_LEN: usize = 256;

/// Longest topic string [`Topics`] can hold.
pub const MAX_TOPIC_LEN: usize = 128;

pub type TopicString = heapless::String<MAX_TOPIC_LEN>;

/// Core device configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    // --- Network ---
    pub wifi_ssid: heapless::String<32>,
    pub wifi_password: heapless::String<64>,
    /// Blink cycles to wait before re-issuing the WiFi join request.
    pub wifi_rejoin_attempts: u32,

    // --- Cloud ---
    pub broker_host: heapless::String<64>,
    pub broker_port: u16,
    pub product_id: heapless::String<32>,
    pub device_name: heapless::String<64>,
    pub access_token: heapless::String<192>,

    // --- Timing ---
    /// Property report period (milliseconds).
    pub report_interval_ms: u32,
    /// Half-period of one indicator blink (milliseconds).
    pub blink_half_period_ms: u32,
}

/// Tunables only.  Credentials and identity are left blank; see
/// [`DeviceConfig::from_build_env`].
impl Default for DeviceConfig {
    fn default() -> Self {
        let mut broker_host = heapless::String::new();
        // 18 bytes into 64.
        let _ = broker_host.push_str(BROKER_HOST);
        Self {
            wifi_ssid: heapless::String::new(),
            wifi_password: heapless::String::new(),
            wifi_rejoin_attempts: 20,

            broker_host,
            broker_port: BROKER_PORT,
            product_id: heapless::String::new(),
            device_name: heapless::String::new(),
            access_token: heapless::String::new(),

            report_interval_ms: 10_000, // 10 s
            blink_half_period_ms: 500,
        }
    }
}

impl DeviceConfig {
    /// Range-check every field.  Returns the first failure.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_ssid(&self.wifi_ssid)?;
        validate_password(&self.wifi_password)?;
        if self.broker_host.is_empty() {
            return Err(ConfigError::MissingField("broker_host"));
        }
        if self.broker_port == 0 {
            return Err(ConfigError::OutOfRange("broker_port"));
        }
        if self.product_id.trim().is_empty() {
            return Err(ConfigError::MissingField("product_id"));
        }
        if self.device_name.trim().is_empty() {
            return Err(ConfigError::MissingField("device_name"));
        }
        if self.report_interval_ms == 0 {
            return Err(ConfigError::OutOfRange("report_interval_ms"));
        }
        if self.wifi_rejoin_attempts == 0 {
            return Err(ConfigError::OutOfRange("wifi_rejoin_attempts"));
        }
        Ok(())
    }

    /// Defaults plus the credentials and identity baked in at build time.
    pub fn from_build_env() -> Result<Self, ConfigError> {
        Self::with_identity(WIFI_SSID, WIFI_PASSWORD, PRODUCT_ID, DEVICE_NAME, ACCESS_TOKEN)
    }

    /// Defaults with the given credentials and identity.  Fails on the
    /// first value longer than its field.
    pub fn with_identity(
        wifi_ssid: &str,
        wifi_password: &str,
        product_id: &str,
        device_name: &str,
        access_token: &str,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            wifi_ssid: fitted(wifi_ssid, "wifi_ssid")?,
            wifi_password: fitted(wifi_password, "wifi_password")?,
            product_id: fitted(product_id, "product_id")?,
            device_name: fitted(device_name, "device_name")?,
            access_token: fitted(access_token, "access_token")?,
            ..Self::default()
        })
    }

    /// Topic set for this device's identity.
    pub fn topics(&self) -> Topics {
        Topics::new(&self.product_id, &self.device_name)
    }
}

fn fitted<const N: usize>(
    s: &str,
    field: &'static str,
) -> Result<heapless::String<N>, ConfigError> {
    let mut out = heapless::String::new();
    out.push_str(s).map_err(|()| ConfigError::OutOfRange(field))?;
    Ok(out)
}

// ───────────────────────────────────────────────────────────────
// Validation
// ───────────────────────────────────────────────────────────────

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

pub fn validate_ssid(ssid: &str) -> Result<(), ConfigError> {
    if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(ConfigError::InvalidSsid);
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), ConfigError> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(ConfigError::InvalidPassword);
    }
    Ok(())
}

// ───────────────────────────────────────────────────────────────
// Topics
// ───────────────────────────────────────────────────────────────

/// The four thing-model topics of one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    /// Device → cloud property report.
    pub property_post: TopicString,
    /// Cloud → device property command.
    pub property_set: TopicString,
    /// Cloud → device acknowledgement of a report.
    pub property_post_reply: TopicString,
    /// Device → cloud acknowledgement of a command.
    pub property_set_reply: TopicString,
}

impl Topics {
    pub fn new(product_id: &str, device_name: &str) -> Self {
        Self {
            property_post: topic(product_id, device_name, "property/post"),
            property_set: topic(product_id, device_name, "property/set"),
            property_post_reply: topic(product_id, device_name, "property/post/reply"),
            property_set_reply: topic(product_id, device_name, "property/set_reply"),
        }
    }
}

fn topic(product_id: &str, device_name: &str, suffix: &str) -> TopicString {
    let mut t = TopicString::new();
    // Longest case: 5 + 32 + 1 + 64 + 7 + 19 bytes, exactly MAX_TOPIC_LEN.
    let _ = write!(t, "$sys/{}/{}/thing/{}", product_id, device_name, suffix);
    t
}
