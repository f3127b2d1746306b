//! Browser driver: EventSource stream, backoff sleeps and poll timers.
//!
//! `EventClient` owns the shared [`Monitor`] and runs its connection loop as
//! a local async task. Poll timers are spawned loops wrapped in
//! `futures::future::Abortable`; their handles abort on drop, so the
//! registry tears them down just by forgetting them. Status, server
//! directory and counters are mirrored into `RwSignal`s after every
//! mutation for the rendering layer.
//!
//! All of this is gated behind `#[cfg(feature = "hydrate")]` since it needs
//! a browser environment.
//!
//! ERROR HANDLING
//! ==============
//! The first stream error closes the EventSource and goes through the
//! monitor's bounded reconnect schedule. Poll failures are counted and the
//! timer simply waits for its next tick.

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::Duration;

use futures::StreamExt;
use futures::future::{AbortHandle, Abortable};
use gloo_net::eventsource::futures::EventSource;
use leptos::prelude::{GetUntracked, RwSignal, Set, WithUntracked};

use crate::config::MonitorConfig;
use crate::error::MonitorError;
use crate::monitor::{Monitor, MonitorStats};
use crate::net::api::{self, fetch_object_snapshot, fetch_series_value};
use crate::net::backoff::MathRandom;
use crate::net::connection::Recovery;
use crate::net::fallback::{PollScheduler, PollTarget};
use crate::net::types::{EventKind, StreamRequest};
use crate::state::servers::ServerDirectory;
use crate::state::status::ConnectionStatus;

/// Event name the browser uses for messages sent without an `event:` line.
const DEFAULT_EVENT_NAME: &str = "message";

pub type SharedMonitor = Rc<RefCell<Monitor<BrowserPoller>>>;

/// Reactive mirrors of the monitor's user-visible state.
#[derive(Clone, Copy)]
pub struct MonitorSignals {
    pub status: RwSignal<ConnectionStatus>,
    pub servers: RwSignal<ServerDirectory>,
    pub stats: RwSignal<MonitorStats>,
}

impl MonitorSignals {
    fn new() -> Self {
        Self {
            status: RwSignal::new(ConnectionStatus::default()),
            servers: RwSignal::new(ServerDirectory::default()),
            stats: RwSignal::new(MonitorStats::default()),
        }
    }

    fn sync(&self, monitor: &Monitor<BrowserPoller>) {
        if self.status.get_untracked() != monitor.status() {
            self.status.set(monitor.status());
        }
        if self.servers.with_untracked(|servers| servers != monitor.servers()) {
            self.servers.set(monitor.servers().clone());
        }
        self.stats.set(monitor.stats());
    }
}

#[allow(clippy::cast_possible_truncation)]
fn now_ms() -> i64 {
    js_sys::Date::now() as i64
}

fn js_error(err: &wasm_bindgen::JsValue) -> MonitorError {
    MonitorError::Transport(format!("{err:?}"))
}

/// Read [`MonitorConfig`] from the page query string.
///
/// # Errors
///
/// Returns an error if the location is unavailable or a value does not parse.
pub fn config_from_location() -> Result<MonitorConfig, MonitorError> {
    let window = web_sys::window().ok_or_else(|| MonitorError::Transport("no window".into()))?;
    let search = window.location().search().map_err(|e| js_error(&e))?;
    let params = web_sys::UrlSearchParams::new_with_str(&search).map_err(|e| js_error(&e))?;
    MonitorConfig::from_params(|key| params.get(key))
}

// =============================================================
// Poll timers
// =============================================================

/// Poll timer handle; stops the timer when dropped.
pub struct PollTimer(AbortHandle);

impl Drop for PollTimer {
    fn drop(&mut self) {
        self.0.abort();
    }
}

pub struct BrowserPoller {
    monitor: Weak<RefCell<Monitor<BrowserPoller>>>,
    api_base: String,
    signals: MonitorSignals,
}

impl PollScheduler for BrowserPoller {
    type Handle = PollTimer;

    fn start_polling(&mut self, target: PollTarget, every: Duration) -> PollTimer {
        let (handle, registration) = AbortHandle::new_pair();
        let task = Abortable::new(
            poll_loop(self.monitor.clone(), self.api_base.clone(), target, every, self.signals),
            registration,
        );
        leptos::task::spawn_local(async move {
            if task.await.is_err() {
                log::debug!("poll timer stopped");
            }
        });
        PollTimer(handle)
    }
}

async fn poll_loop(
    monitor: Weak<RefCell<Monitor<BrowserPoller>>>,
    api_base: String,
    target: PollTarget,
    every: Duration,
    signals: MonitorSignals,
) {
    loop {
        gloo_timers::future::sleep(every).await;
        let result = match &target {
            PollTarget::Object(key) => fetch_object_snapshot(&api_base, key).await.map(Polled::Snapshot),
            PollTarget::Series { object, series } => {
                fetch_series_value(&api_base, object, series).await.map(Polled::Value)
            }
        };
        let Some(monitor) = monitor.upgrade() else {
            return;
        };
        let mut monitor = monitor.borrow_mut();
        match (result, &target) {
            (Ok(Polled::Snapshot(snapshot)), PollTarget::Object(key)) => {
                monitor.apply_polled_snapshot(key, &snapshot, now_ms());
            }
            (Ok(Polled::Value(value)), PollTarget::Series { object, series }) => {
                monitor.apply_polled_value(object, series, value, now_ms());
            }
            (Ok(_), _) => log::debug!("poll result does not match target {}", target.object()),
            (Err(err), _) => monitor.poll_failed(&target, &err),
        }
        signals.sync(&monitor);
    }
}

enum Polled {
    Snapshot(api::PolledSnapshot),
    Value(api::PolledValue),
}

// =============================================================
// Stream
// =============================================================

/// Handle to a running monitoring session.
pub struct EventClient {
    monitor: SharedMonitor,
    signals: MonitorSignals,
    stream_task: Option<AbortHandle>,
}

/// Build the monitor and open the stream.
pub fn spawn_event_client(config: MonitorConfig) -> EventClient {
    let signals = MonitorSignals::new();
    let api_base = config.api_base.clone();
    let monitor = Rc::new_cyclic(|weak| {
        let poller = BrowserPoller { monitor: weak.clone(), api_base, signals };
        RefCell::new(Monitor::new(config, poller))
    });
    let mut client = EventClient { monitor, signals, stream_task: None };
    client.connect();
    client
}

impl EventClient {
    /// (Re)open the stream, superseding any running connection loop. This is
    /// also the only way out of polling.
    pub fn connect(&mut self) {
        self.abort_stream();
        let request = {
            let mut monitor = self.monitor.borrow_mut();
            let request = monitor.connect();
            self.signals.sync(&monitor);
            request
        };
        let (handle, registration) = AbortHandle::new_pair();
        let task = Abortable::new(connection_loop(Rc::clone(&self.monitor), request, self.signals), registration);
        leptos::task::spawn_local(async move {
            if task.await.is_err() {
                log::debug!("connection loop superseded");
            }
        });
        self.stream_task = Some(handle);
    }

    /// Close the stream, cancel pending reconnects and stop all poll timers.
    pub fn close(&mut self) {
        self.abort_stream();
        let mut monitor = self.monitor.borrow_mut();
        monitor.close();
        self.signals.sync(&monitor);
    }

    fn abort_stream(&mut self) {
        if let Some(handle) = self.stream_task.take() {
            handle.abort();
        }
    }

    pub fn monitor(&self) -> &SharedMonitor {
        &self.monitor
    }

    pub fn signals(&self) -> MonitorSignals {
        self.signals
    }
}

impl Drop for EventClient {
    fn drop(&mut self) {
        self.abort_stream();
    }
}

async fn connection_loop(monitor: SharedMonitor, mut request: StreamRequest, signals: MonitorSignals) {
    let mut jitter = MathRandom;
    loop {
        if let Err(err) = run_stream(&monitor, &request, signals).await {
            log::warn!("event stream error: {err}");
        }
        let recovery = {
            let mut guard = monitor.borrow_mut();
            let recovery = guard.on_transport_error(&mut jitter);
            signals.sync(&guard);
            recovery
        };
        let Recovery::Retry { delay, ticket, .. } = recovery else {
            return;
        };
        gloo_timers::future::sleep(delay).await;
        let next = {
            let mut guard = monitor.borrow_mut();
            let next = guard.reconnect_due(ticket);
            signals.sync(&guard);
            next
        };
        match next {
            Some(next) => request = next,
            None => return,
        }
    }
}

/// Read the stream until it fails. Returns the failure that ended it.
async fn run_stream(monitor: &SharedMonitor, request: &StreamRequest, signals: MonitorSignals) -> Result<(), MonitorError> {
    let url = api::stream_url(request);
    let mut source = EventSource::new(&url).map_err(|e| MonitorError::Transport(e.to_string()))?;
    let mut subscriptions = Vec::with_capacity(EventKind::ALL_TAGS.len() + 1);
    for tag in EventKind::ALL_TAGS.into_iter().chain([DEFAULT_EVENT_NAME]) {
        subscriptions.push(source.subscribe(tag).map_err(|e| MonitorError::Transport(e.to_string()))?);
    }
    let mut events = futures::stream::select_all(subscriptions);
    while let Some(item) = events.next().await {
        let (event_name, message) = match item {
            Ok(event) => event,
            Err(err) => {
                source.close();
                return Err(MonitorError::Transport(format!("{err:?}")));
            }
        };
        let Some(raw) = message.data().as_string() else {
            log::debug!("{event_name}: non-text event data");
            continue;
        };
        let name = (event_name != DEFAULT_EVENT_NAME).then_some(event_name.as_str());
        let mut guard = monitor.borrow_mut();
        guard.handle_message(name, &raw, now_ms());
        signals.sync(&guard);
    }
    source.close();
    Err(MonitorError::Transport("event stream ended".into()))
}
