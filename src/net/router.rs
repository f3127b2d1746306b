//! Event router: demultiplex one stream envelope into renderers and charts.
//!
//! SYSTEM CONTEXT
//! ==============
//! Pushed events and polled results both land here. Every handler follows the
//! same shape: resolve the tab, feed the renderer, append to matching chart
//! buffers, then run one synchronize + repaint pass for the tab. Repainting
//! once per event keeps redraw cost independent of how many points the event
//! carried.
//!
//! ERROR HANDLING
//! ==============
//! A payload missing fields its handler needs is an error for the caller to
//! log and drop. An event nobody is subscribed to is not an error; it is
//! reported as an empty [`Delivery`].

#[cfg(test)]
#[path = "router_test.rs"]
mod router_test;

use serde_json::Value;

use crate::error::MonitorError;
use crate::net::parse::{coerce_sample, lookup_path, pick_bool, timestamp_or};
use crate::net::types::{BatchDomain, BatchEntry, Envelope, EventKind, ObjectKey, SensorUpdate, SeriesKey};
use crate::state::registry::{SubscriberRegistry, TabState};
use crate::state::series::ChartPoint;
use crate::state::servers::ServerDirectory;

/// What one routed event reached.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Delivery {
    /// Renderers and charts that received the event.
    pub consumers: usize,
    pub points_appended: usize,
    pub charts_redrawn: usize,
}

impl Delivery {
    pub fn is_unrouted(&self) -> bool {
        self.consumers == 0
    }
}

/// Route one parsed envelope. `received_at_ms` stands in for a missing or
/// unparsable timestamp.
///
/// Connection acknowledgements belong to the connection manager and are
/// reported as unrouted here.
///
/// # Errors
///
/// Returns [`MonitorError::MissingField`] or [`MonitorError::Malformed`] when
/// the payload lacks what its handler needs.
pub fn route<H>(
    registry: &mut SubscriberRegistry<H>,
    servers: &mut ServerDirectory,
    kind: EventKind,
    envelope: &Envelope,
    received_at_ms: i64,
) -> Result<Delivery, MonitorError> {
    let at_ms = timestamp_or(envelope.timestamp.as_ref(), received_at_ms);
    match kind {
        EventKind::Connected => Ok(Delivery::default()),
        EventKind::ObjectSnapshot => {
            let key = require_key(envelope)?;
            Ok(route_snapshot(registry, &key, &envelope.data, at_ms))
        }
        EventKind::SensorUpdate => route_sensor_update(registry, envelope, at_ms),
        EventKind::Batch(domain) => {
            let key = require_key(envelope)?;
            let entries: Vec<BatchEntry> = serde_json::from_value(envelope.data.clone())?;
            Ok(route_batch(registry, &key, domain, &entries, at_ms))
        }
        EventKind::ServerStatus => route_server_status(servers, envelope, received_at_ms),
        EventKind::ObjectsList => {
            servers.request_object_list_refresh();
            Ok(Delivery { consumers: 1, ..Delivery::default() })
        }
    }
}

fn require_key(envelope: &Envelope) -> Result<ObjectKey, MonitorError> {
    if envelope.server_id.is_none() {
        return Err(MonitorError::MissingField("serverId"));
    }
    envelope.object_key().ok_or(MonitorError::MissingField("objectName"))
}

// =============================================================
// Per-object snapshot
// =============================================================

/// Render a full snapshot and append every charted path found in it.
pub fn route_snapshot<H>(registry: &mut SubscriberRegistry<H>, key: &ObjectKey, data: &Value, at_ms: i64) -> Delivery {
    let Some(tab) = registry.tab_mut(key) else {
        log::debug!("object_data for {key}: no open tab");
        return Delivery::default();
    };
    tab.renderer_mut().render_snapshot(data, at_ms);
    let mut delivery = Delivery { consumers: 1, ..Delivery::default() };
    for series in tab.series_keys() {
        let Some(sample) = lookup_path(data, series.as_str()).and_then(coerce_sample) else {
            continue;
        };
        if tab.append_point(&series, ChartPoint::new(at_ms, sample)) {
            delivery.consumers += 1;
            delivery.points_appended += 1;
        }
    }
    delivery.charts_redrawn = tab.synchronize_and_repaint();
    delivery
}

// =============================================================
// Single external sensor
// =============================================================

fn route_sensor_update<H>(
    registry: &mut SubscriberRegistry<H>,
    envelope: &Envelope,
    at_ms: i64,
) -> Result<Delivery, MonitorError> {
    let update: SensorUpdate = serde_json::from_value(envelope.data.clone())?;
    let key = match (envelope.object_key(), envelope.object_name.as_deref()) {
        (Some(key), _) => key,
        (None, Some(name)) => {
            let Some(key) = registry.resolve_display_name(name) else {
                log::debug!("sensor_data for `{name}`: no tab with that display name");
                return Ok(Delivery::default());
            };
            key
        }
        (None, None) => return Err(MonitorError::MissingField("objectName")),
    };
    let Some(sample) = coerce_sample(&update.value) else {
        log::debug!("sensor_data {}: non-numeric value {}", update.name, update.value);
        return Ok(Delivery::default());
    };
    Ok(apply_series_value(registry, &key, &SeriesKey::external(&update.name), sample, at_ms))
}

/// Append one value to one series and refresh its legend. Shared by pushed
/// sensor updates and polled series values.
pub fn apply_series_value<H>(
    registry: &mut SubscriberRegistry<H>,
    key: &ObjectKey,
    series: &SeriesKey,
    sample: Option<f64>,
    at_ms: i64,
) -> Delivery {
    let Some(tab) = registry.tab_mut(key) else {
        log::debug!("value for {key}: no open tab");
        return Delivery::default();
    };
    if !tab.append_point(series, ChartPoint::new(at_ms, sample)) {
        log::debug!("value for {key} {series}: no open chart");
        return Delivery::default();
    }
    if let Some(chart) = tab.chart_mut(series) {
        chart.refresh_legend();
    }
    Delivery { consumers: 1, points_appended: 1, charts_redrawn: tab.synchronize_and_repaint() }
}

// =============================================================
// Batched updates
// =============================================================

/// Hand a batch to the renderer's batch sink (when it has one for `domain`)
/// and, independently, to every chart keyed `prefix:name`.
pub fn route_batch<H>(
    registry: &mut SubscriberRegistry<H>,
    key: &ObjectKey,
    domain: BatchDomain,
    entries: &[BatchEntry],
    at_ms: i64,
) -> Delivery {
    let Some(tab) = registry.tab_mut(key) else {
        log::debug!("{} for {key}: no open tab", domain.tag());
        return Delivery::default();
    };
    let mut delivery = Delivery::default();
    if let Some(sink) = tab.renderer_mut().batch_sink(domain) {
        sink.apply_batch(domain, entries);
        delivery.consumers += 1;
    }
    delivery.points_appended = append_batch(tab, domain, entries, at_ms);
    delivery.consumers += delivery.points_appended;
    delivery.charts_redrawn = tab.synchronize_and_repaint();
    delivery
}

fn append_batch<H>(tab: &mut TabState<H>, domain: BatchDomain, entries: &[BatchEntry], at_ms: i64) -> usize {
    let mut appended = 0;
    for entry in entries {
        let series = SeriesKey::prefixed(domain.prefix(), &entry.name);
        if !tab.has_chart(&series) {
            continue;
        }
        let Some(sample) = coerce_sample(&entry.value) else {
            continue;
        };
        if tab.append_point(&series, ChartPoint::new(at_ms, sample)) {
            appended += 1;
        }
    }
    appended
}

// =============================================================
// Topology
// =============================================================

fn route_server_status(
    servers: &mut ServerDirectory,
    envelope: &Envelope,
    received_at_ms: i64,
) -> Result<Delivery, MonitorError> {
    let server_id = envelope.server_id.as_deref().ok_or(MonitorError::MissingField("serverId"))?;
    let connected = pick_bool(&envelope.data, &["connected"]).ok_or(MonitorError::MissingField("data.connected"))?;
    if servers.apply_status(server_id, envelope.server_name.as_deref(), connected, received_at_ms) {
        log::info!("server {server_id} {}", if connected { "connected" } else { "disconnected" });
    }
    Ok(Delivery { consumers: 1, ..Delivery::default() })
}
