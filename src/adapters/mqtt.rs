//! MQTT session adapter.
//!
//! Implements [`CloudPort`] on top of the ESP-IDF MQTT client.  The
//! client runs its own task and reports through a callback; the adapter
//! turns that into the synchronous shape the domain expects:
//!
//! - connection state lands in atomics the main loop can read;
//! - inbound messages are queued, and only [`CloudPort::pump`] hands
//!   them to the domain, on the main loop's thread;
//! - only a connect the main loop asked for counts.  If the client gets
//!   back in on its own after a drop, that session has no subscriptions,
//!   so it is reported as lost and the next pass builds a fresh one.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `esp_idf_svc::mqtt::client::EspMqttClient`.
//! - **all other targets**: an in-memory broker stand-in for host tests.

use std::collections::VecDeque;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

#[cfg(not(target_os = "espidf"))]
use log::info;
use log::{debug, warn};

use crate::app::ports::{CloudPort, SessionState};
use crate::error::CommsError;

#[cfg(target_os = "espidf")]
use std::sync::{Arc, Mutex};
#[cfg(target_os = "espidf")]
use std::time::{Duration, Instant};

#[cfg(target_os = "espidf")]
use esp_idf_svc::mqtt::client::{
    Details, EspMqttClient, EspMqttEvent, EventPayload, MqttClientConfiguration, QoS,
};

/// Inbound messages held between two pumps.  Older ones win.
pub const MAX_PENDING: usize = 8;

/// How long one connect attempt may block the main loop.
#[cfg(target_os = "espidf")]
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
#[cfg(target_os = "espidf")]
const CONNECT_POLL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, PartialEq, Eq)]
struct Inbound {
    topic: String,
    payload: Vec<u8>,
}

fn enqueue(queue: &mut VecDeque<Inbound>, topic: &str, payload: &[u8]) {
    if queue.len() >= MAX_PENDING {
        warn!("Cloud: inbound queue full, dropping message on '{}'", topic);
        return;
    }
    queue.push_back(Inbound {
        topic: topic.to_owned(),
        payload: payload.to_vec(),
    });
}

// ───────────────────────────────────────────────────────────────
// Session bookkeeping (ESP-IDF: written by the client task)
// ───────────────────────────────────────────────────────────────

/// Connection state as seen by the main loop.
#[derive(Debug)]
struct SessionTracker {
    state: AtomicI32,
    /// Set while the main loop waits on its own connect request.
    requested: AtomicBool,
}

impl SessionTracker {
    fn new() -> Self {
        Self {
            state: AtomicI32::new(SessionState::Disconnected.code()),
            requested: AtomicBool::new(false),
        }
    }

    fn state(&self) -> SessionState {
        SessionState::from_code(self.state.load(Ordering::Acquire))
            .unwrap_or(SessionState::Disconnected)
    }

    fn is_connected(&self) -> bool {
        self.state() == SessionState::Connected
    }

    fn set_state(&self, state: SessionState) {
        self.state.store(state.code(), Ordering::Release);
    }

    /// The main loop starts a connect; its outcome will be accepted.
    fn request(&self) {
        self.set_state(SessionState::Disconnected);
        self.requested.store(true, Ordering::Release);
    }

    /// The main loop stopped waiting.  Later connects are unsolicited.
    fn settle(&self) {
        self.requested.store(false, Ordering::Release);
    }

    fn on_connected(&self) {
        if self.requested.load(Ordering::Acquire) {
            self.set_state(SessionState::Connected);
        } else {
            warn!("Cloud: client reconnected on its own, waiting for a fresh session");
        }
    }

    fn on_disconnected(&self) {
        if self.is_connected() {
            self.set_state(SessionState::ConnectionLost);
        } else if self.requested.load(Ordering::Acquire) {
            self.set_state(SessionState::ConnectFailed);
        }
    }
}

#[cfg(target_os = "espidf")]
struct Shared {
    session: SessionTracker,
    inbox: Mutex<VecDeque<Inbound>>,
}

#[cfg(target_os = "espidf")]
impl Shared {
    fn new() -> Self {
        Self {
            session: SessionTracker::new(),
            inbox: Mutex::new(VecDeque::with_capacity(MAX_PENDING)),
        }
    }

    fn on_event(&self, event: &EspMqttEvent<'_>) {
        match event.payload() {
            EventPayload::Connected(_) => self.session.on_connected(),
            EventPayload::Disconnected => self.session.on_disconnected(),
            EventPayload::Received {
                topic: Some(topic),
                data,
                details: Details::Complete,
                ..
            } => match self.inbox.lock() {
                Ok(mut inbox) => enqueue(&mut inbox, topic, data),
                Err(_) => warn!("Cloud: inbox lock poisoned"),
            },
            EventPayload::Received { .. } => {
                warn!("Cloud: fragmented or topic-less message dropped");
            }
            EventPayload::Error(e) => warn!("Cloud: client error — {:?}", e),
            _ => {}
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Adapter
// ───────────────────────────────────────────────────────────────

pub struct MqttAdapter {
    url: String,
    #[cfg(target_os = "espidf")]
    client: Option<EspMqttClient<'static>>,
    #[cfg(target_os = "espidf")]
    shared: Arc<Shared>,

    #[cfg(not(target_os = "espidf"))]
    sim: SimBroker,
}

impl Default for MqttAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl MqttAdapter {
    pub fn new() -> Self {
        Self {
            url: String::new(),
            #[cfg(target_os = "espidf")]
            client: None,
            #[cfg(target_os = "espidf")]
            shared: Arc::new(Shared::new()),
            #[cfg(not(target_os = "espidf"))]
            sim: SimBroker::default(),
        }
    }

    /// Broker URL set by the last [`CloudPort::set_server`].
    pub fn url(&self) -> &str {
        &self.url
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_connect(
        &mut self,
        client_id: &str,
        username: &str,
        password: &str,
    ) -> Result<(), SessionState> {
        // Dropping the old client stops its reconnect loop.
        self.client = None;
        self.shared.session.request();

        let conf = MqttClientConfiguration {
            client_id: Some(client_id),
            username: Some(username),
            password: Some(password),
            ..Default::default()
        };
        let shared = Arc::clone(&self.shared);
        let client = match EspMqttClient::new_cb(&self.url, &conf, move |event| {
            shared.on_event(&event);
        }) {
            Ok(client) => client,
            Err(e) => {
                warn!("Cloud: client setup failed — {}", e);
                self.shared.session.set_state(SessionState::ConnectFailed);
                self.shared.session.settle();
                return Err(SessionState::ConnectFailed);
            }
        };

        let started = Instant::now();
        let outcome = loop {
            match self.shared.session.state() {
                SessionState::Connected => break Ok(()),
                SessionState::Disconnected if started.elapsed() < CONNECT_TIMEOUT => {
                    std::thread::sleep(CONNECT_POLL);
                }
                SessionState::Disconnected => {
                    self.shared.session.set_state(SessionState::ConnectionTimeout);
                    break Err(SessionState::ConnectionTimeout);
                }
                other => break Err(other),
            }
        };
        self.shared.session.settle();
        if outcome.is_ok() {
            self.client = Some(client);
        }
        outcome
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_connect(
        &mut self,
        client_id: &str,
        username: &str,
        password: &str,
    ) -> Result<(), SessionState> {
        self.sim.connect(&self.url, client_id, username, password)
    }

    #[cfg(target_os = "espidf")]
    fn platform_is_connected(&self) -> bool {
        self.client.is_some() && self.shared.session.is_connected()
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_is_connected(&self) -> bool {
        self.sim.session.is_connected()
    }

    #[cfg(target_os = "espidf")]
    fn platform_state(&self) -> SessionState {
        self.shared.session.state()
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_state(&self) -> SessionState {
        self.sim.session.state()
    }

    #[cfg(target_os = "espidf")]
    fn platform_subscribe(&mut self, topic: &str) -> Result<(), CommsError> {
        let client = self.client.as_mut().ok_or(CommsError::NotConnected)?;
        client
            .subscribe(topic, QoS::AtMostOnce)
            .map(|_| ())
            .map_err(|_| CommsError::SubscribeFailed)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_subscribe(&mut self, topic: &str) -> Result<(), CommsError> {
        self.sim.subscribe(topic)
    }

    #[cfg(target_os = "espidf")]
    fn platform_publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), CommsError> {
        let client = self.client.as_mut().ok_or(CommsError::NotConnected)?;
        client
            .publish(topic, QoS::AtMostOnce, false, payload)
            .map(|_| ())
            .map_err(|_| CommsError::PublishFailed)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), CommsError> {
        self.sim.publish(topic, payload)
    }

    #[cfg(target_os = "espidf")]
    fn take_pending(&mut self) -> VecDeque<Inbound> {
        match self.shared.inbox.lock() {
            Ok(mut inbox) => core::mem::take(&mut *inbox),
            Err(_) => VecDeque::new(),
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn take_pending(&mut self) -> VecDeque<Inbound> {
        core::mem::take(&mut self.sim.inbox)
    }
}

impl CloudPort for MqttAdapter {
    fn set_server(&mut self, host: &str, port: u16) {
        self.url.clear();
        let _ = write!(self.url, "mqtt://{}:{}", host, port);
    }

    fn connect(
        &mut self,
        client_id: &str,
        username: &str,
        password: &str,
    ) -> Result<(), SessionState> {
        if self.url.is_empty() {
            warn!("Cloud: connect without a server");
            return Err(SessionState::ConnectFailed);
        }
        self.platform_connect(client_id, username, password)
    }

    fn is_connected(&self) -> bool {
        self.platform_is_connected()
    }

    fn state(&self) -> SessionState {
        self.platform_state()
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), CommsError> {
        self.platform_subscribe(topic)
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), CommsError> {
        self.platform_publish(topic, payload)?;
        debug!("Cloud: published {} bytes to '{}'", payload.len(), topic);
        Ok(())
    }

    fn pump(&mut self, handler: &mut dyn FnMut(&str, &[u8])) {
        for msg in self.take_pending() {
            handler(&msg.topic, &msg.payload);
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Host simulation
// ───────────────────────────────────────────────────────────────

/// In-memory broker: accepts any non-blank credentials, records
/// publishes, and delivers injected messages on subscribed topics.
#[cfg(not(target_os = "espidf"))]
#[derive(Debug)]
struct SimBroker {
    session: SessionTracker,
    refuse_next: Option<SessionState>,
    subscriptions: Vec<String>,
    published: Vec<(String, Vec<u8>)>,
    inbox: VecDeque<Inbound>,
}

#[cfg(not(target_os = "espidf"))]
impl Default for SimBroker {
    fn default() -> Self {
        Self {
            session: SessionTracker::new(),
            refuse_next: None,
            subscriptions: Vec::new(),
            published: Vec::new(),
            inbox: VecDeque::new(),
        }
    }
}

#[cfg(not(target_os = "espidf"))]
impl SimBroker {
    fn connect(
        &mut self,
        url: &str,
        client_id: &str,
        username: &str,
        password: &str,
    ) -> Result<(), SessionState> {
        // A fresh session starts without subscriptions.
        self.subscriptions.clear();
        self.session.request();
        let outcome = if let Some(state) = self.refuse_next.take() {
            state
        } else if client_id.trim().is_empty() {
            SessionState::BadClientId
        } else if username.trim().is_empty() || password.trim().is_empty() {
            SessionState::BadCredentials
        } else {
            SessionState::Connected
        };
        if outcome == SessionState::Connected {
            self.session.on_connected();
        } else {
            self.session.set_state(outcome);
        }
        self.session.settle();
        if outcome == SessionState::Connected {
            info!("Cloud(sim): '{}' connected to {}", client_id, url);
            Ok(())
        } else {
            Err(outcome)
        }
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), CommsError> {
        if !self.session.is_connected() {
            return Err(CommsError::NotConnected);
        }
        if !self.subscriptions.iter().any(|t| t == topic) {
            self.subscriptions.push(topic.to_owned());
        }
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), CommsError> {
        if !self.session.is_connected() {
            return Err(CommsError::NotConnected);
        }
        self.published.push((topic.to_owned(), payload.to_vec()));
        Ok(())
    }
}

#[cfg(not(target_os = "espidf"))]
impl MqttAdapter {
    /// Simulation: queue a broker → device message.  Dropped unless the
    /// topic is subscribed and the session is up.
    pub fn sim_inject(&mut self, topic: &str, payload: &[u8]) -> bool {
        let deliverable = self.sim.session.is_connected()
            && self.sim.subscriptions.iter().any(|t| t == topic);
        if deliverable {
            enqueue(&mut self.sim.inbox, topic, payload);
        }
        deliverable
    }

    /// Simulation: make the next connect attempt end in `state`.
    pub fn sim_refuse_next(&mut self, state: SessionState) {
        self.sim.refuse_next = Some(state);
    }

    /// Simulation: the broker drops the session.
    pub fn sim_drop_session(&mut self) {
        self.sim.session.on_disconnected();
        self.sim.subscriptions.clear();
    }

    /// Simulation: the client's own reconnect timer gets a session back
    /// without the main loop asking.
    pub fn sim_client_reconnect(&mut self) {
        self.sim.session.on_connected();
    }

    pub fn sim_subscriptions(&self) -> &[String] {
        &self.sim.subscriptions
    }

    /// Simulation: every `(topic, payload)` published so far.
    pub fn sim_published(&self) -> &[(String, Vec<u8>)] {
        &self.sim.published
    }
}
