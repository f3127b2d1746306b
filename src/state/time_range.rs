//! Time-range synchronisation across the charts of one object.
//!
//! DESIGN
//! ======
//! Each tab has one canonical window source: an explicit fixed window, or in
//! follow mode the newest point of the most recently touched chart. The
//! window is computed once per event and copied onto every chart of the tab.

#[cfg(test)]
#[path = "time_range_test.rs"]
mod time_range_test;

use std::collections::BTreeMap;

use crate::config::DEFAULT_WINDOW_SPAN_MS;
use crate::net::types::SeriesKey;
use crate::state::series::ChartSeries;

/// Visible x-axis range in epoch milliseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeWindow {
    pub start_ms: i64,
    pub end_ms: i64,
}

impl TimeWindow {
    /// Endpoints are swapped when given in reverse.
    pub fn new(start_ms: i64, end_ms: i64) -> Self {
        if start_ms <= end_ms {
            Self { start_ms, end_ms }
        } else {
            Self { start_ms: end_ms, end_ms: start_ms }
        }
    }

    pub fn span_ms(&self) -> i64 {
        self.end_ms - self.start_ms
    }

    pub fn contains(&self, ts_ms: i64) -> bool {
        (self.start_ms..=self.end_ms).contains(&ts_ms)
    }
}

/// How a tab chooses its visible window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeRange {
    /// Trail the newest data by `span_ms`.
    Follow { span_ms: i64 },
    /// Pinned by the user.
    Fixed(TimeWindow),
}

impl Default for TimeRange {
    fn default() -> Self {
        Self::Follow { span_ms: DEFAULT_WINDOW_SPAN_MS }
    }
}

/// Compute the canonical window for a tab's charts.
///
/// `None` in follow mode when the canonical chart has no points yet.
pub fn canonical_window(
    range: TimeRange,
    charts: &BTreeMap<SeriesKey, ChartSeries>,
    last_touched: Option<&SeriesKey>,
) -> Option<TimeWindow> {
    match range {
        TimeRange::Fixed(window) => Some(window),
        TimeRange::Follow { span_ms } => {
            let end = last_touched
                .and_then(|key| charts.get(key))
                .and_then(|chart| chart.buffer().last())
                .map(|point| point.x)?;
            Some(TimeWindow::new(end.saturating_sub(span_ms), end))
        }
    }
}

/// Apply the canonical window to every chart; returns how many changed.
pub fn synchronize(
    range: TimeRange,
    charts: &mut BTreeMap<SeriesKey, ChartSeries>,
    last_touched: Option<&SeriesKey>,
) -> usize {
    let Some(window) = canonical_window(range, charts, last_touched) else {
        return 0;
    };
    let mut changed = 0;
    for chart in charts.values_mut() {
        if chart.set_window(Some(window)) {
            changed += 1;
        }
    }
    changed
}
