//! WiFi station-mode adapter.
//!
//! Implements [`NetworkPort`].  `begin` only issues the join request; the
//! domain polls `is_connected` and blinks while the driver works.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: real ESP-IDF WiFi driver calls via `esp_idf_svc::wifi`.
//! - **all other targets**: simulation stubs for host-side tests.

use core::net::Ipv4Addr;

#[cfg(not(target_os = "espidf"))]
use core::cell::Cell;
#[cfg(not(target_os = "espidf"))]
use log::info;
#[cfg(target_os = "espidf")]
use log::warn;

#[cfg(target_os = "espidf")]
use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    hal::modem::Modem,
    nvs::EspDefaultNvsPartition,
    sys::EspError,
    wifi::{AuthMethod, ClientConfiguration, Configuration, EspWifi},
};

use crate::app::ports::NetworkPort;
use crate::config::{validate_password, validate_ssid};
use crate::error::CommsError;

/// Simulation: `is_connected` polls after a join request before the link
/// comes up.
#[cfg(not(target_os = "espidf"))]
pub const SIM_JOIN_POLLS: u32 = 3;

pub struct WifiAdapter {
    #[cfg(target_os = "espidf")]
    wifi: EspWifi<'static>,
    #[cfg(not(target_os = "espidf"))]
    sim_pending_polls: Cell<Option<u32>>,
    #[cfg(not(target_os = "espidf"))]
    sim_join_requests: u32,
}

#[cfg(target_os = "espidf")]
impl WifiAdapter {
    pub fn new(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: Option<EspDefaultNvsPartition>,
    ) -> Result<Self, EspError> {
        let wifi = EspWifi::new(modem, sysloop, nvs)?;
        Ok(Self { wifi })
    }
}

#[cfg(not(target_os = "espidf"))]
impl WifiAdapter {
    pub fn new() -> Self {
        Self {
            sim_pending_polls: Cell::new(None),
            sim_join_requests: 0,
        }
    }

    /// Simulation: number of join requests issued so far.
    pub fn sim_join_requests(&self) -> u32 {
        self.sim_join_requests
    }

    /// Simulation: drop the link, as if the AP went away.
    pub fn sim_drop_link(&mut self) {
        self.sim_pending_polls.set(None);
        info!("WiFi(sim): link dropped");
    }
}

#[cfg(not(target_os = "espidf"))]
impl Default for WifiAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl WifiAdapter {
    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_join(&mut self, ssid: &str, password: &str) -> Result<(), CommsError> {
        let conf = Configuration::Client(ClientConfiguration {
            ssid: ssid.try_into().map_err(|_| CommsError::InvalidCredentials)?,
            password: password
                .try_into()
                .map_err(|_| CommsError::InvalidCredentials)?,
            auth_method: if password.is_empty() {
                AuthMethod::None
            } else {
                AuthMethod::WPA2Personal
            },
            ..Default::default()
        });
        self.apply_and_connect(&conf).map_err(|e| {
            warn!("WiFi: driver refused join — {}", e);
            CommsError::WifiJoinFailed
        })
    }

    #[cfg(target_os = "espidf")]
    fn apply_and_connect(&mut self, conf: &Configuration) -> Result<(), EspError> {
        self.wifi.set_configuration(conf)?;
        if !self.wifi.is_started()? {
            self.wifi.start()?;
        }
        // Non-blocking; association completes in the background.
        self.wifi.connect()
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_join(&mut self, ssid: &str, _password: &str) -> Result<(), CommsError> {
        self.sim_join_requests += 1;
        if self.sim_pending_polls.get() != Some(0) {
            self.sim_pending_polls.set(Some(SIM_JOIN_POLLS));
        }
        info!("WiFi(sim): join '{}' requested", ssid);
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_is_connected(&self) -> bool {
        self.wifi.is_up().unwrap_or(false)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_is_connected(&self) -> bool {
        match self.sim_pending_polls.get() {
            Some(0) => true,
            Some(n) => {
                self.sim_pending_polls.set(Some(n - 1));
                false
            }
            None => false,
        }
    }

    #[cfg(target_os = "espidf")]
    fn platform_local_ip(&self) -> Option<Ipv4Addr> {
        self.wifi
            .sta_netif()
            .get_ip_info()
            .ok()
            .map(|info| info.ip)
            .filter(|ip| !ip.is_unspecified())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_local_ip(&self) -> Option<Ipv4Addr> {
        (self.sim_pending_polls.get() == Some(0)).then_some(Ipv4Addr::new(192, 168, 4, 2))
    }
}

impl NetworkPort for WifiAdapter {
    fn begin(&mut self, ssid: &str, password: &str) -> Result<(), CommsError> {
        validate_ssid(ssid).map_err(|_| CommsError::InvalidCredentials)?;
        validate_password(password).map_err(|_| CommsError::InvalidCredentials)?;
        self.platform_join(ssid, password)
    }

    fn is_connected(&self) -> bool {
        self.platform_is_connected()
    }

    fn local_ip(&self) -> Option<Ipv4Addr> {
        self.platform_local_ip()
    }
}
