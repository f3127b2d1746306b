use super::*;
use crate::state::series::{ChartPoint, DisplayOptions, HeadlessSurface};

fn chart(key: &str) -> (SeriesKey, ChartSeries) {
    let key = SeriesKey::path(key);
    let series = ChartSeries::new(key.clone(), 10, DisplayOptions::default(), Box::new(HeadlessSurface));
    (key, series)
}

fn two_charts() -> BTreeMap<SeriesKey, ChartSeries> {
    let mut charts = BTreeMap::new();
    let (a, mut chart_a) = chart("a");
    let (b, mut chart_b) = chart("b");
    chart_a.append(ChartPoint::new(10_000, Some(1.0)));
    chart_b.append(ChartPoint::new(4_000, Some(1.0)));
    charts.insert(a, chart_a);
    charts.insert(b, chart_b);
    charts
}

#[test]
fn time_window_normalizes_reversed_bounds() {
    let window = TimeWindow::new(10, 2);
    assert_eq!(window, TimeWindow { start_ms: 2, end_ms: 10 });
    assert_eq!(window.span_ms(), 8);
    assert!(window.contains(2));
    assert!(!window.contains(11));
}

#[test]
fn default_range_follows_fifteen_minutes() {
    assert_eq!(TimeRange::default(), TimeRange::Follow { span_ms: 900_000 });
}

#[test]
fn follow_mode_uses_last_touched_chart() {
    let charts = two_charts();
    let b = SeriesKey::path("b");
    let window = canonical_window(TimeRange::Follow { span_ms: 1_000 }, &charts, Some(&b));
    assert_eq!(window, Some(TimeWindow::new(3_000, 4_000)));
}

#[test]
fn follow_mode_without_touch_has_no_window() {
    let charts = two_charts();
    assert_eq!(canonical_window(TimeRange::default(), &charts, None), None);
}

#[test]
fn fixed_mode_ignores_data() {
    let charts = two_charts();
    let pinned = TimeWindow::new(0, 50);
    assert_eq!(canonical_window(TimeRange::Fixed(pinned), &charts, None), Some(pinned));
}

#[test]
fn synchronize_aligns_every_chart() {
    let mut charts = two_charts();
    let a = SeriesKey::path("a");
    let changed = synchronize(TimeRange::Follow { span_ms: 5_000 }, &mut charts, Some(&a));
    assert_eq!(changed, 2);
    for chart in charts.values() {
        assert_eq!(chart.window(), Some(TimeWindow::new(5_000, 10_000)));
    }

    let again = synchronize(TimeRange::Follow { span_ms: 5_000 }, &mut charts, Some(&a));
    assert_eq!(again, 0);
}
