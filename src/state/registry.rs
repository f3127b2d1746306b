//! Subscriber registry: open tabs, their charts, renderers and poll timers.
//!
//! SYSTEM CONTEXT
//! ==============
//! A tab is keyed by `(serverId, objectName)` and owns everything live about
//! that object: the renderer consuming raw payloads, one chart series per
//! variable, and at most one poll timer per object and per series. Poll
//! timers are opaque handles that cancel on drop, so removing a tab or chart
//! from here is the whole teardown.
//!
//! DESIGN
//! ======
//! Renderers advertise batch support through [`ObjectRenderer::batch_sink`]
//! per protocol domain; the router checks for the capability instead of
//! inspecting renderer types.

#[cfg(test)]
#[path = "registry_test.rs"]
mod registry_test;

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;

use crate::config::DEFAULT_SERIES_CAPACITY;
use crate::net::types::{BatchDomain, BatchEntry, ObjectKey, SeriesKey};
use crate::state::series::{ChartPoint, ChartSeries, ChartSurface, DisplayOptions};
use crate::state::time_range::{self, TimeRange};

/// Chart colours assigned round-robin within a tab.
pub const CHART_PALETTE: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f", "#bcbd22", "#17becf",
];

/// Type-specific view of one object, implemented by the rendering layer.
pub trait ObjectRenderer {
    /// Render a full object snapshot.
    fn render_snapshot(&mut self, snapshot: &Value, timestamp_ms: i64);

    /// Batch-update entry point for `domain`, if this renderer has one.
    fn batch_sink(&mut self, _domain: BatchDomain) -> Option<&mut dyn BatchSink> {
        None
    }
}

/// Table-level batch update capability of a renderer.
pub trait BatchSink {
    fn apply_batch(&mut self, domain: BatchDomain, entries: &[BatchEntry]);
}

/// Renderer for tabs that only host charts.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeadlessRenderer;

impl ObjectRenderer for HeadlessRenderer {
    fn render_snapshot(&mut self, _snapshot: &Value, _timestamp_ms: i64) {}
}

/// Live state of one open object.
pub struct TabState<H> {
    key: ObjectKey,
    display_name: String,
    renderer: Box<dyn ObjectRenderer>,
    charts: BTreeMap<SeriesKey, ChartSeries>,
    object_poll: Option<H>,
    series_polls: HashMap<SeriesKey, H>,
    time_range: TimeRange,
    last_touched: Option<SeriesKey>,
    capacity: usize,
    next_color: usize,
}

impl<H> TabState<H> {
    fn new(key: ObjectKey, display_name: String, renderer: Box<dyn ObjectRenderer>, capacity: usize, time_range: TimeRange) -> Self {
        Self {
            key,
            display_name,
            renderer,
            charts: BTreeMap::new(),
            object_poll: None,
            series_polls: HashMap::new(),
            time_range,
            last_touched: None,
            capacity,
            next_color: 0,
        }
    }

    pub fn key(&self) -> &ObjectKey {
        &self.key
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn renderer_mut(&mut self) -> &mut dyn ObjectRenderer {
        self.renderer.as_mut()
    }

    // -----------------------------------------------------------------
    // Charts
    // -----------------------------------------------------------------

    /// Open a chart; returns `false` if the series is already charted.
    pub fn open_chart(&mut self, series: SeriesKey, mut options: DisplayOptions, surface: Box<dyn ChartSurface>) -> bool {
        if self.charts.contains_key(&series) {
            return false;
        }
        if options.color.is_none() {
            options.color = Some(CHART_PALETTE[self.next_color % CHART_PALETTE.len()].to_owned());
            self.next_color += 1;
        }
        let chart = ChartSeries::new(series.clone(), self.capacity, options, surface);
        self.charts.insert(series, chart);
        true
    }

    /// Close a chart and its poll timer together.
    pub fn close_chart(&mut self, series: &SeriesKey) -> bool {
        self.series_polls.remove(series);
        if self.last_touched.as_ref() == Some(series) {
            self.last_touched = None;
        }
        self.charts.remove(series).is_some()
    }

    pub fn chart(&self, series: &SeriesKey) -> Option<&ChartSeries> {
        self.charts.get(series)
    }

    pub fn chart_mut(&mut self, series: &SeriesKey) -> Option<&mut ChartSeries> {
        self.charts.get_mut(series)
    }

    pub fn has_chart(&self, series: &SeriesKey) -> bool {
        self.charts.contains_key(series)
    }

    pub fn charts(&self) -> impl Iterator<Item = &ChartSeries> {
        self.charts.values()
    }

    pub fn series_keys(&self) -> Vec<SeriesKey> {
        self.charts.keys().cloned().collect()
    }

    /// Append to one chart; `false` when the series is not charted.
    pub fn append_point(&mut self, series: &SeriesKey, point: ChartPoint) -> bool {
        let Some(chart) = self.charts.get_mut(series) else {
            return false;
        };
        chart.append(point);
        self.last_touched = Some(series.clone());
        true
    }

    // -----------------------------------------------------------------
    // Time range + redraw
    // -----------------------------------------------------------------

    pub fn time_range(&self) -> TimeRange {
        self.time_range
    }

    pub fn set_time_range(&mut self, range: TimeRange) {
        self.time_range = range;
    }

    /// Align every chart to the canonical window, then redraw the dirty
    /// ones in one pass. Returns the number of charts redrawn.
    pub fn synchronize_and_repaint(&mut self) -> usize {
        time_range::synchronize(self.time_range, &mut self.charts, self.last_touched.as_ref());
        let mut redrawn = 0;
        for chart in self.charts.values_mut() {
            if chart.repaint() {
                redrawn += 1;
            }
        }
        redrawn
    }

    // -----------------------------------------------------------------
    // Poll timers
    // -----------------------------------------------------------------

    pub fn has_object_poll(&self) -> bool {
        self.object_poll.is_some()
    }

    /// Install the object poll timer unless one is already running.
    pub fn set_object_poll(&mut self, handle: H) -> bool {
        if self.object_poll.is_some() {
            return false;
        }
        self.object_poll = Some(handle);
        true
    }

    pub fn has_series_poll(&self, series: &SeriesKey) -> bool {
        self.series_polls.contains_key(series)
    }

    /// Install a series poll timer unless the series already has one or is
    /// not charted.
    pub fn set_series_poll(&mut self, series: SeriesKey, handle: H) -> bool {
        if !self.charts.contains_key(&series) || self.series_polls.contains_key(&series) {
            return false;
        }
        self.series_polls.insert(series, handle);
        true
    }

    /// Charted series without a poll timer.
    pub fn series_without_poll(&self) -> Vec<SeriesKey> {
        self.charts
            .keys()
            .filter(|key| !self.series_polls.contains_key(*key))
            .cloned()
            .collect()
    }

    pub fn active_poll_count(&self) -> usize {
        usize::from(self.object_poll.is_some()) + self.series_polls.len()
    }

    /// Drop every poll timer of this tab; returns how many were running.
    pub fn clear_polls(&mut self) -> usize {
        let cleared = self.active_poll_count();
        self.object_poll = None;
        self.series_polls.clear();
        cleared
    }
}

/// All open tabs, keyed by object.
pub struct SubscriberRegistry<H> {
    tabs: BTreeMap<ObjectKey, TabState<H>>,
    series_capacity: usize,
    default_range: TimeRange,
}

impl<H> Default for SubscriberRegistry<H> {
    fn default() -> Self {
        Self::new(DEFAULT_SERIES_CAPACITY, TimeRange::default())
    }
}

impl<H> SubscriberRegistry<H> {
    pub fn new(series_capacity: usize, default_range: TimeRange) -> Self {
        Self { tabs: BTreeMap::new(), series_capacity, default_range }
    }

    /// Open a tab. An already-open key keeps its existing state and returns
    /// `false`; two tabs never share a key.
    pub fn open_tab(&mut self, key: ObjectKey, display_name: Option<String>, renderer: Box<dyn ObjectRenderer>) -> bool {
        if self.tabs.contains_key(&key) {
            return false;
        }
        let display_name = display_name.unwrap_or_else(|| key.object_name.clone());
        let tab = TabState::new(key.clone(), display_name, renderer, self.series_capacity, self.default_range);
        self.tabs.insert(key, tab);
        true
    }

    /// Close a tab, dropping its buffers and poll timers together.
    pub fn close_tab(&mut self, key: &ObjectKey) -> bool {
        self.tabs.remove(key).is_some()
    }

    pub fn tab(&self, key: &ObjectKey) -> Option<&TabState<H>> {
        self.tabs.get(key)
    }

    pub fn tab_mut(&mut self, key: &ObjectKey) -> Option<&mut TabState<H>> {
        self.tabs.get_mut(key)
    }

    pub fn contains(&self, key: &ObjectKey) -> bool {
        self.tabs.contains_key(key)
    }

    pub fn keys(&self) -> Vec<ObjectKey> {
        self.tabs.keys().cloned().collect()
    }

    pub fn tabs(&self) -> impl Iterator<Item = &TabState<H>> {
        self.tabs.values()
    }

    pub fn tabs_mut(&mut self) -> impl Iterator<Item = &mut TabState<H>> {
        self.tabs.values_mut()
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    /// Best-effort lookup of a tab by display name, for events that carry no
    /// server id. Ambiguous names resolve to nothing.
    pub fn resolve_display_name(&self, name: &str) -> Option<ObjectKey> {
        let mut matches = self.tabs.values().filter(|tab| tab.display_name == name);
        let first = matches.next()?;
        if matches.next().is_some() {
            log::warn!("display name `{name}` matches several open objects; event dropped");
            return None;
        }
        Some(first.key.clone())
    }

    /// Total running poll timers across all tabs.
    pub fn active_poll_count(&self) -> usize {
        self.tabs.values().map(TabState::active_poll_count).sum()
    }
}
