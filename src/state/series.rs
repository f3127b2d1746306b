//! Bounded time-series storage for live charts.
//!
//! DESIGN
//! ======
//! A series owns its ring buffer and a handle to the surface that draws it.
//! Appends only mark the series dirty; drawing happens in an explicit
//! [`ChartSeries::repaint`] pass so one event touching many series costs one
//! redraw per series, not one per point.

#[cfg(test)]
#[path = "series_test.rs"]
mod series_test;

use std::collections::VecDeque;

use crate::config::DEFAULT_SERIES_CAPACITY;
use crate::net::types::SeriesKey;
use crate::state::time_range::TimeWindow;

/// One chart sample; `y = None` draws as a gap.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChartPoint {
    /// Epoch milliseconds.
    pub x: i64,
    pub y: Option<f64>,
}

impl ChartPoint {
    pub fn new(x: i64, y: Option<f64>) -> Self {
        Self { x, y }
    }
}

/// Fixed-capacity FIFO of chart points.
#[derive(Clone, Debug, PartialEq)]
pub struct RingBuffer {
    points: VecDeque<ChartPoint>,
    capacity: usize,
}

impl Default for RingBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_SERIES_CAPACITY)
    }
}

impl RingBuffer {
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { points: VecDeque::with_capacity(capacity.min(DEFAULT_SERIES_CAPACITY)), capacity }
    }

    /// Append a point, evicting from the front until back at capacity.
    pub fn append(&mut self, point: ChartPoint) {
        self.points.push_back(point);
        while self.points.len() > self.capacity {
            self.points.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChartPoint> {
        self.points.iter()
    }

    pub fn first(&self) -> Option<&ChartPoint> {
        self.points.front()
    }

    pub fn last(&self) -> Option<&ChartPoint> {
        self.points.back()
    }

    pub fn to_vec(&self) -> Vec<ChartPoint> {
        self.points.iter().copied().collect()
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }
}

/// Drawing side of a chart, implemented by the rendering layer.
pub trait ChartSurface {
    /// Redraw the whole series against the given visible window.
    fn redraw(&mut self, points: &RingBuffer, window: Option<TimeWindow>);

    /// Show the latest value next to the series legend entry.
    fn set_legend_value(&mut self, _value: Option<f64>) {}
}

/// Surface for series kept without a visible chart.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeadlessSurface;

impl ChartSurface for HeadlessSurface {
    fn redraw(&mut self, _points: &RingBuffer, _window: Option<TimeWindow>) {}
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DisplayOptions {
    /// CSS colour; assigned from the tab palette when `None`.
    pub color: Option<String>,
    pub label: Option<String>,
    /// Draw as a step line (discrete signals).
    pub stepped: bool,
    pub fill: bool,
}

/// One open chart: buffer, display options, visible window and surface.
pub struct ChartSeries {
    key: SeriesKey,
    buffer: RingBuffer,
    options: DisplayOptions,
    window: Option<TimeWindow>,
    legend_value: Option<f64>,
    surface: Box<dyn ChartSurface>,
    dirty: bool,
}

impl std::fmt::Debug for ChartSeries {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChartSeries")
            .field("key", &self.key)
            .field("points", &self.buffer.len())
            .field("window", &self.window)
            .field("dirty", &self.dirty)
            .finish_non_exhaustive()
    }
}

impl ChartSeries {
    pub fn new(key: SeriesKey, capacity: usize, options: DisplayOptions, surface: Box<dyn ChartSurface>) -> Self {
        Self {
            key,
            buffer: RingBuffer::new(capacity),
            options,
            window: None,
            legend_value: None,
            surface,
            dirty: false,
        }
    }

    /// Append one point; the capacity bound holds before this returns.
    pub fn append(&mut self, point: ChartPoint) {
        self.buffer.append(point);
        self.legend_value = point.y;
        self.dirty = true;
    }

    /// Push the latest value to the legend immediately.
    pub fn refresh_legend(&mut self) {
        self.surface.set_legend_value(self.legend_value);
    }

    /// Set the visible window; a change forces the next repaint.
    pub fn set_window(&mut self, window: Option<TimeWindow>) -> bool {
        if self.window == window {
            return false;
        }
        self.window = window;
        self.dirty = true;
        true
    }

    /// Redraw if anything changed since the last repaint.
    pub fn repaint(&mut self) -> bool {
        if !self.dirty {
            return false;
        }
        self.surface.redraw(&self.buffer, self.window);
        self.dirty = false;
        true
    }

    pub fn key(&self) -> &SeriesKey {
        &self.key
    }

    pub fn buffer(&self) -> &RingBuffer {
        &self.buffer
    }

    pub fn options(&self) -> &DisplayOptions {
        &self.options
    }

    pub fn window(&self) -> Option<TimeWindow> {
        self.window
    }

    pub fn legend_value(&self) -> Option<f64> {
        self.legend_value
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}
