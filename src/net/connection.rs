//! Connection manager: one logical stream, bounded reconnects, fallback hand-off.
//!
//! The manager is a pure state machine. It never touches sockets or timers;
//! it tells the driver what to open and how long to wait, and the driver
//! reports back acknowledgements and transport errors.
//!
//! ```text
//! DISCONNECTED -> CONNECTING -> CONNECTED -(error)-> RECONNECTING -> CONNECTING -> ...
//!                                      \-(attempts exhausted)-> POLLING
//! ```
//!
//! ERROR HANDLING
//! ==============
//! Transport errors always go through the bounded retry schedule. Payload
//! errors never reach this module.

#[cfg(test)]
#[path = "connection_test.rs"]
mod connection_test;

use std::time::Duration;

use crate::config::MonitorConfig;
use crate::net::backoff::{BackoffPolicy, JitterSource};
use crate::net::types::{ConnectedAck, ControlInfo, StreamRequest};
use crate::state::status::ConnectionStatus;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionPhase {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    /// Push delivery abandoned; only an explicit `connect()` leaves this.
    Polling,
}

impl ConnectionPhase {
    /// Whether a stream is open (or being opened) that could send a
    /// `connected` acknowledgement.
    pub fn expects_ack(self) -> bool {
        matches!(self, Self::Connecting | Self::Reconnecting | Self::Connected)
    }
}

/// Connection counters and server-announced settings.
#[derive(Clone, Debug, PartialEq)]
pub struct ConnectionState {
    pub connected: bool,
    /// Consecutive failures since the last acknowledgement.
    pub reconnect_attempts: u32,
    pub max_reconnect_attempts: u32,
    /// Poll cadence, replaced by the server's value on each acknowledgement.
    pub poll_interval_ms: u64,
    pub base_reconnect_delay_ms: u64,
    pub max_reconnect_delay_ms: u64,
    pub sm_enabled: bool,
    pub control: Option<ControlInfo>,
}

/// Proof that a scheduled reconnect is still wanted when its delay elapses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReconnectTicket(u64);

/// What the driver must do after a transport error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Recovery {
    /// Wait `delay`, then redeem `ticket` with
    /// [`ConnectionManager::reconnect_due`].
    Retry { attempt: u32, delay: Duration, ticket: ReconnectTicket },
    /// Attempts exhausted; switch every consumer to polling.
    Fallback,
    /// Nothing to do (closed, or already polling).
    Idle,
}

#[derive(Debug)]
pub struct ConnectionManager {
    state: ConnectionState,
    phase: ConnectionPhase,
    policy: BackoffPolicy,
    endpoint: String,
    token: Option<String>,
    /// Bumped whenever a pending reconnect must be abandoned.
    generation: u64,
}

impl ConnectionManager {
    pub fn new(config: &MonitorConfig) -> Self {
        Self {
            state: ConnectionState {
                connected: false,
                reconnect_attempts: 0,
                max_reconnect_attempts: config.max_reconnect_attempts.max(1),
                poll_interval_ms: config.default_poll_interval_ms,
                base_reconnect_delay_ms: config.base_reconnect_delay_ms,
                max_reconnect_delay_ms: config.max_reconnect_delay_ms,
                sm_enabled: false,
                control: None,
            },
            phase: ConnectionPhase::Disconnected,
            policy: BackoffPolicy::new(config.base_reconnect_delay_ms, config.max_reconnect_delay_ms, config.jitter_ratio),
            endpoint: config.stream_endpoint.clone(),
            token: config.token.clone(),
            generation: 0,
        }
    }

    /// Begin a fresh connection, superseding any open stream or pending retry.
    ///
    /// The attempt counter is left alone; only an acknowledgement resets it.
    pub fn connect(&mut self) -> StreamRequest {
        self.generation += 1;
        self.state.connected = false;
        self.phase = ConnectionPhase::Connecting;
        log::info!("connecting to {}", self.endpoint);
        StreamRequest { endpoint: self.endpoint.clone(), token: self.token.clone() }
    }

    /// Handle the server's `connected` acknowledgement.
    pub fn on_connected(&mut self, ack: &ConnectedAck) {
        self.state.connected = true;
        self.state.reconnect_attempts = 0;
        if let Some(interval) = ack.poll_interval_ms.filter(|ms| *ms > 0) {
            self.state.poll_interval_ms = interval;
        }
        self.state.sm_enabled = ack.sm_enabled;
        self.state.control.clone_from(&ack.control);
        self.phase = ConnectionPhase::Connected;
        log::info!("stream connected (poll interval {}ms)", self.state.poll_interval_ms);
    }

    /// Handle a dropped stream or failed handshake.
    pub fn on_transport_error(&mut self, jitter: &mut dyn JitterSource) -> Recovery {
        if matches!(self.phase, ConnectionPhase::Disconnected | ConnectionPhase::Polling) {
            return Recovery::Idle;
        }
        self.state.connected = false;
        self.state.reconnect_attempts = self.state.reconnect_attempts.saturating_add(1);
        let attempt = self.state.reconnect_attempts;
        if attempt >= self.state.max_reconnect_attempts {
            self.phase = ConnectionPhase::Polling;
            self.generation += 1;
            log::warn!("stream failed {attempt} time(s); falling back to polling");
            return Recovery::Fallback;
        }
        self.phase = ConnectionPhase::Reconnecting;
        self.generation += 1;
        let delay = self.policy.delay(attempt, jitter);
        log::warn!(
            "stream lost; reconnect {attempt}/{} in {}ms",
            self.state.max_reconnect_attempts,
            delay.as_millis()
        );
        Recovery::Retry { attempt, delay, ticket: ReconnectTicket(self.generation) }
    }

    /// Redeem a reconnect ticket once its delay has elapsed. Returns the
    /// stream to open, or `None` when the retry was superseded.
    pub fn reconnect_due(&mut self, ticket: ReconnectTicket) -> Option<StreamRequest> {
        if ticket.0 != self.generation || self.phase != ConnectionPhase::Reconnecting {
            return None;
        }
        Some(self.connect())
    }

    /// Explicit teardown; cancels any pending retry.
    pub fn close(&mut self) {
        self.generation += 1;
        self.state.connected = false;
        self.phase = ConnectionPhase::Disconnected;
        log::info!("stream closed");
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.phase
    }

    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.state.poll_interval_ms)
    }

    /// Status indicator value for the current phase.
    pub fn status(&self) -> ConnectionStatus {
        match self.phase {
            ConnectionPhase::Disconnected => ConnectionStatus::Disconnected,
            ConnectionPhase::Connecting => ConnectionStatus::Connecting,
            ConnectionPhase::Connected => ConnectionStatus::Connected,
            ConnectionPhase::Reconnecting => ConnectionStatus::Reconnecting {
                attempt: self.state.reconnect_attempts,
                max: self.state.max_reconnect_attempts,
            },
            ConnectionPhase::Polling => ConnectionStatus::Polling,
        }
    }
}
