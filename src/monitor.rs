//! The monitoring session: connection, subscriptions, topology and counters.
//!
//! SYSTEM CONTEXT
//! ==============
//! `Monitor` is the one object the browser driver talks to. It owns the
//! connection state machine, the subscriber registry, the server directory
//! and the poll scheduler, and it is the only place where errors are turned
//! into log lines and counters. Nothing is global; tests build as many
//! monitors as they like with fake schedulers and renderers.
//!
//! ERROR HANDLING
//! ==============
//! Malformed payloads and failed polls are logged, counted and dropped. They
//! never change connection state and never reach renderers.

#[cfg(test)]
#[path = "monitor_test.rs"]
mod monitor_test;

use std::time::Duration;

use serde_json::Value;

use crate::config::MonitorConfig;
use crate::error::MonitorError;
use crate::net::api::{PolledSnapshot, PolledValue};
use crate::net::backoff::JitterSource;
use crate::net::connection::{ConnectionManager, ConnectionPhase, ReconnectTicket, Recovery};
use crate::net::fallback::{self, PollScheduler, PollTarget};
use crate::net::router::{self, Delivery};
use crate::net::types::{ConnectedAck, Envelope, EventKind, ObjectKey, SeriesKey, StreamRequest};
use crate::state::registry::{ObjectRenderer, SubscriberRegistry, TabState};
use crate::state::series::{ChartSurface, DisplayOptions};
use crate::state::servers::ServerDirectory;
use crate::state::status::ConnectionStatus;
use crate::state::time_range::TimeRange;

/// Session counters for diagnostics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MonitorStats {
    pub events_received: u64,
    /// Rejected as malformed.
    pub events_dropped: u64,
    /// Parsed fine but nothing was subscribed.
    pub events_unrouted: u64,
    pub points_appended: u64,
    pub poll_failures: u64,
    pub reconnects_scheduled: u64,
    pub fallback_activations: u64,
}

/// What happened to one inbound stream message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventOutcome {
    /// Connection acknowledgement; poll timers cleared before push resumes.
    Acknowledged { timers_cleared: usize },
    Delivered(Delivery),
    /// Unknown tag, no open consumer, or an ack with no stream open.
    Unrouted,
    /// Malformed payload, logged and discarded.
    Dropped,
}

pub struct Monitor<S: PollScheduler> {
    config: MonitorConfig,
    connection: ConnectionManager,
    registry: SubscriberRegistry<S::Handle>,
    servers: ServerDirectory,
    scheduler: S,
    stats: MonitorStats,
}

impl<S: PollScheduler> Monitor<S> {
    pub fn new(config: MonitorConfig, scheduler: S) -> Self {
        let connection = ConnectionManager::new(&config);
        let registry = SubscriberRegistry::new(
            config.series_capacity,
            TimeRange::Follow { span_ms: config.window_span_ms },
        );
        Self {
            config,
            connection,
            registry,
            servers: ServerDirectory::default(),
            scheduler,
            stats: MonitorStats::default(),
        }
    }

    // =============================================================
    // Connection
    // =============================================================

    /// Open (or re-open) the stream. Leaves polling running until the
    /// server acknowledges.
    pub fn connect(&mut self) -> StreamRequest {
        self.connection.connect()
    }

    /// Handle one raw stream message. `event_name` is the stream-level event
    /// name, used when the JSON carries no `type`.
    pub fn handle_message(&mut self, event_name: Option<&str>, raw: &str, received_at_ms: i64) -> EventOutcome {
        self.stats.events_received += 1;
        let envelope = match Envelope::parse(raw) {
            Ok(envelope) => envelope,
            Err(err) => return self.drop_event(event_name, &err),
        };
        let Some(kind) = envelope.event_kind(event_name) else {
            log::debug!("ignoring event with unknown type {:?}", envelope.kind.as_deref().or(event_name));
            self.stats.events_unrouted += 1;
            return EventOutcome::Unrouted;
        };
        if kind == EventKind::Connected {
            return match parse_ack(&envelope, raw) {
                Ok(ack) => self.acknowledge(&ack),
                Err(err) => self.drop_event(event_name, &err),
            };
        }
        match router::route(&mut self.registry, &mut self.servers, kind, &envelope, received_at_ms) {
            Ok(delivery) => self.record_delivery(delivery),
            Err(err) => self.drop_event(Some(kind.tag()), &err),
        }
    }

    fn acknowledge(&mut self, ack: &ConnectedAck) -> EventOutcome {
        if !self.connection.phase().expects_ack() {
            log::debug!("ignoring connected ack while {:?}", self.connection.phase());
            self.stats.events_unrouted += 1;
            return EventOutcome::Unrouted;
        }
        let timers_cleared = fallback::deactivate(&mut self.registry);
        self.connection.on_connected(ack);
        EventOutcome::Acknowledged { timers_cleared }
    }

    fn record_delivery(&mut self, delivery: Delivery) -> EventOutcome {
        if delivery.is_unrouted() {
            self.stats.events_unrouted += 1;
            return EventOutcome::Unrouted;
        }
        self.stats.points_appended += delivery.points_appended as u64;
        EventOutcome::Delivered(delivery)
    }

    fn drop_event(&mut self, event_name: Option<&str>, err: &MonitorError) -> EventOutcome {
        log::warn!("dropping {} event: {err}", event_name.unwrap_or("stream"));
        self.stats.events_dropped += 1;
        EventOutcome::Dropped
    }

    /// Report a dropped stream or failed handshake. On exhaustion every open
    /// tab and chart is switched to polling before this returns.
    pub fn on_transport_error(&mut self, jitter: &mut dyn JitterSource) -> Recovery {
        let recovery = self.connection.on_transport_error(jitter);
        match recovery {
            Recovery::Retry { .. } => self.stats.reconnects_scheduled += 1,
            Recovery::Fallback => {
                self.stats.fallback_activations += 1;
                self.activate_fallback();
            }
            Recovery::Idle => {}
        }
        recovery
    }

    /// Redeem a reconnect ticket; `None` when the retry was superseded.
    pub fn reconnect_due(&mut self, ticket: ReconnectTicket) -> Option<StreamRequest> {
        self.connection.reconnect_due(ticket)
    }

    /// Tear down the session: cancels pending reconnects and all poll timers.
    pub fn close(&mut self) {
        self.connection.close();
        fallback::deactivate(&mut self.registry);
    }

    // =============================================================
    // Subscriptions
    // =============================================================

    /// Open a tab. While polling, the new tab gets its timer immediately.
    pub fn open_tab(&mut self, key: ObjectKey, display_name: Option<String>, renderer: Box<dyn ObjectRenderer>) -> bool {
        if !self.registry.open_tab(key.clone(), display_name, renderer) {
            return false;
        }
        self.backfill_polls(&key);
        true
    }

    pub fn close_tab(&mut self, key: &ObjectKey) -> bool {
        self.registry.close_tab(key)
    }

    /// Open a chart on an open tab; `false` when the tab is closed or the
    /// series already charted.
    pub fn open_chart(
        &mut self,
        key: &ObjectKey,
        series: SeriesKey,
        options: DisplayOptions,
        surface: Box<dyn ChartSurface>,
    ) -> bool {
        let Some(tab) = self.registry.tab_mut(key) else {
            log::debug!("open_chart {series}: tab {key} is not open");
            return false;
        };
        if !tab.open_chart(series, options, surface) {
            return false;
        }
        self.backfill_polls(key);
        true
    }

    pub fn close_chart(&mut self, key: &ObjectKey, series: &SeriesKey) -> bool {
        self.registry.tab_mut(key).is_some_and(|tab| tab.close_chart(series))
    }

    /// Change a tab's time range and realign its charts.
    pub fn set_time_range(&mut self, key: &ObjectKey, range: TimeRange) -> bool {
        let Some(tab) = self.registry.tab_mut(key) else {
            return false;
        };
        tab.set_time_range(range);
        tab.synchronize_and_repaint();
        true
    }

    fn backfill_polls(&mut self, key: &ObjectKey) {
        if self.connection.phase() != ConnectionPhase::Polling {
            return;
        }
        let every = self.connection.poll_interval();
        if let Some(tab) = self.registry.tab_mut(key) {
            fallback::activate_tab(tab, &mut self.scheduler, every);
        }
    }

    // =============================================================
    // Polling fallback
    // =============================================================

    /// Give every open tab and chart its poll timer; returns timers created.
    pub fn activate_fallback(&mut self) -> usize {
        let every = self.connection.poll_interval();
        fallback::activate(&mut self.registry, &mut self.scheduler, every)
    }

    /// Feed a polled object snapshot through the push snapshot path.
    pub fn apply_polled_snapshot(&mut self, key: &ObjectKey, snapshot: &PolledSnapshot, received_at_ms: i64) -> Delivery {
        if !self.accepts_polled_data(key) {
            return Delivery::default();
        }
        let at_ms = snapshot.timestamp_ms.unwrap_or(received_at_ms);
        let delivery = router::route_snapshot(&mut self.registry, key, &snapshot.data, at_ms);
        self.stats.points_appended += delivery.points_appended as u64;
        delivery
    }

    /// Feed a polled series value through the single-sensor path.
    pub fn apply_polled_value(
        &mut self,
        key: &ObjectKey,
        series: &SeriesKey,
        value: PolledValue,
        received_at_ms: i64,
    ) -> Delivery {
        if !self.accepts_polled_data(key) {
            return Delivery::default();
        }
        let at_ms = value.timestamp_ms.unwrap_or(received_at_ms);
        let delivery = router::apply_series_value(&mut self.registry, key, series, value.sample, at_ms);
        self.stats.points_appended += delivery.points_appended as u64;
        delivery
    }

    /// Poll timers outlive an explicit `connect()` until the server
    /// acknowledges, so results are accepted for as long as the tab still
    /// holds one.
    fn accepts_polled_data(&self, key: &ObjectKey) -> bool {
        if self.registry.tab(key).is_some_and(|tab| tab.active_poll_count() > 0) {
            return true;
        }
        log::debug!("discarding polled data for {key}: no poll timer is running");
        false
    }

    /// Record a failed poll. The last value stays on screen; the timer tries
    /// again at its next tick.
    pub fn poll_failed(&mut self, target: &PollTarget, err: &MonitorError) {
        self.stats.poll_failures += 1;
        log::warn!("poll for {} failed: {err}", target.object());
    }

    // =============================================================
    // Accessors
    // =============================================================

    pub fn status(&self) -> ConnectionStatus {
        self.connection.status()
    }

    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    pub fn poll_interval(&self) -> Duration {
        self.connection.poll_interval()
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn registry(&self) -> &SubscriberRegistry<S::Handle> {
        &self.registry
    }

    pub fn tab(&self, key: &ObjectKey) -> Option<&TabState<S::Handle>> {
        self.registry.tab(key)
    }

    pub fn servers(&self) -> &ServerDirectory {
        &self.servers
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn stats(&self) -> MonitorStats {
        self.stats
    }
}

/// The acknowledgement's fields live in `data` when it is an object, else at
/// the top level of the message.
fn parse_ack(envelope: &Envelope, raw: &str) -> Result<ConnectedAck, MonitorError> {
    if envelope.data.is_object() {
        return Ok(serde_json::from_value(envelope.data.clone())?);
    }
    let top: Value = serde_json::from_str(raw)?;
    Ok(serde_json::from_value(top)?)
}
