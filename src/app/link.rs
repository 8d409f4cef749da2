//! Keeping the device reachable: WiFi first, then the cloud session.
//!
//! Both helpers are cheap when the link is already up.  The network one
//! blocks until WiFi associates; the cloud one makes a single attempt and
//! returns, so the main loop paces the retries.

use core::fmt;
use core::net::Ipv4Addr;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use log::{debug, info, warn};

use super::ports::{CloudPort, NetworkPort, SessionState};
use crate::config::{DeviceConfig, Topics};
use crate::drivers::status_led::StatusIndicator;

/// Overall connectivity, as seen by the main loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkState {
    /// No WiFi.
    #[default]
    Offline,
    /// WiFi up, cloud session down.
    NetworkOnly,
    /// WiFi up and cloud session connected.
    Online,
}

impl LinkState {
    pub fn from_flags(network_up: bool, cloud_up: bool) -> Self {
        match (network_up, cloud_up) {
            (false, _) => Self::Offline,
            (true, false) => Self::NetworkOnly,
            (true, true) => Self::Online,
        }
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Offline => "offline",
            Self::NetworkOnly => "network only",
            Self::Online => "online",
        })
    }
}

/// Result of [`ensure_network`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkOutcome {
    AlreadyUp,
    /// Joined after `attempts` blink cycles.
    Joined {
        attempts: u32,
        ip: Option<Ipv4Addr>,
    },
}

/// Make sure WiFi is associated, blocking until it is.
///
/// While waiting the indicator blinks once per attempt.  The join request
/// is re-issued every `wifi_rejoin_attempts` blinks in case the driver
/// gave up.  Once up, the indicator is held lit.
pub fn ensure_network<N, P, D>(
    network: &mut N,
    indicator: &mut StatusIndicator<P, D>,
    config: &DeviceConfig,
) -> NetworkOutcome
where
    N: NetworkPort,
    P: OutputPin,
    D: DelayNs,
{
    if network.is_connected() {
        return NetworkOutcome::AlreadyUp;
    }

    info!("WiFi: joining '{}'", config.wifi_ssid);
    request_join(network, config);

    let rejoin_every = config.wifi_rejoin_attempts.max(1);
    let mut attempts: u32 = 0;
    while !network.is_connected() {
        indicator.blink(config.blink_half_period_ms);
        attempts = attempts.wrapping_add(1);
        info!("WiFi: waiting for network (attempt {})", attempts);
        if attempts % rejoin_every == 0 {
            request_join(network, config);
        }
    }

    let ip = network.local_ip();
    match ip {
        Some(addr) => info!("WiFi: connected, ip={}", addr),
        None => info!("WiFi: connected, no address yet"),
    }
    indicator.steady_on();
    NetworkOutcome::Joined { attempts, ip }
}

fn request_join<N: NetworkPort>(network: &mut N, config: &DeviceConfig) {
    if let Err(e) = network.begin(&config.wifi_ssid, &config.wifi_password) {
        warn!("WiFi: join request failed — {}", e);
    }
}

/// Result of a successful [`ensure_cloud`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloudOutcome {
    AlreadyUp,
    /// Connected this call; `subscribed` of the two command topics took.
    Connected { subscribed: u8 },
}

/// Topics subscribed on every new session: property set and post reply.
pub const INBOUND_TOPICS: u8 = 2;

/// One attempt at bringing the cloud session up.
///
/// On success the indicator blinks once and both inbound topics are
/// subscribed.  On failure the session state is logged and returned; the
/// caller tries again on its next pass.
pub fn ensure_cloud<C, P, D>(
    cloud: &mut C,
    indicator: &mut StatusIndicator<P, D>,
    config: &DeviceConfig,
    topics: &Topics,
) -> Result<CloudOutcome, SessionState>
where
    C: CloudPort,
    P: OutputPin,
    D: DelayNs,
{
    if cloud.is_connected() {
        return Ok(CloudOutcome::AlreadyUp);
    }

    cloud.set_server(&config.broker_host, config.broker_port);
    info!(
        "Cloud: connecting to {}:{} as '{}'",
        config.broker_host, config.broker_port, config.device_name
    );
    if let Err(state) = cloud.connect(
        &config.device_name,
        &config.product_id,
        &config.access_token,
    ) {
        warn!("Cloud: connect failed, state={}", state);
        return Err(state);
    }

    info!("Cloud: connected");
    indicator.blink(config.blink_half_period_ms);

    let mut subscribed: u8 = 0;
    for topic in [&topics.property_set, &topics.property_post_reply] {
        match cloud.subscribe(topic) {
            Ok(()) => {
                debug!("Cloud: subscribed to '{}'", topic);
                subscribed += 1;
            }
            Err(e) => warn!("Cloud: subscribe to '{}' failed — {}", topic, e),
        }
    }
    Ok(CloudOutcome::Connected { subscribed })
}
