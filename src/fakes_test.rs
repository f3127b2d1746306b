//! Recording collaborators shared by the unit tests.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use serde_json::Value;

use crate::net::fallback::{PollScheduler, PollTarget};
use crate::net::types::{BatchDomain, BatchEntry};
use crate::state::registry::{BatchSink, ObjectRenderer};
use crate::state::series::{ChartSurface, RingBuffer};
use crate::state::time_range::TimeWindow;

// =============================================================
// Poll timers
// =============================================================

/// Timer handle that counts itself out of `live` when dropped.
#[derive(Debug)]
pub struct FakeTimer {
    pub target: PollTarget,
    pub every: Duration,
    live: Rc<Cell<usize>>,
}

impl Drop for FakeTimer {
    fn drop(&mut self) {
        self.live.set(self.live.get() - 1);
    }
}

#[derive(Debug, Default)]
pub struct FakeScheduler {
    pub live: Rc<Cell<usize>>,
    pub started: Vec<(PollTarget, Duration)>,
}

impl FakeScheduler {
    pub fn live_timers(&self) -> usize {
        self.live.get()
    }
}

impl PollScheduler for FakeScheduler {
    type Handle = FakeTimer;

    fn start_polling(&mut self, target: PollTarget, every: Duration) -> FakeTimer {
        self.live.set(self.live.get() + 1);
        self.started.push((target.clone(), every));
        FakeTimer { target, every, live: Rc::clone(&self.live) }
    }
}

// =============================================================
// Renderers
// =============================================================

#[derive(Debug, Default)]
pub struct RendererLog {
    pub snapshots: Vec<(Value, i64)>,
    pub batches: Vec<(BatchDomain, Vec<String>)>,
}

/// Renderer recording snapshots; batch-capable for `domains` only.
pub struct RecordingRenderer {
    pub log: Rc<RefCell<RendererLog>>,
    pub domains: Vec<BatchDomain>,
}

impl RecordingRenderer {
    pub fn new(domains: &[BatchDomain]) -> (Box<Self>, Rc<RefCell<RendererLog>>) {
        let log = Rc::new(RefCell::new(RendererLog::default()));
        (Box::new(Self { log: Rc::clone(&log), domains: domains.to_vec() }), log)
    }
}

impl ObjectRenderer for RecordingRenderer {
    fn render_snapshot(&mut self, snapshot: &Value, timestamp_ms: i64) {
        self.log.borrow_mut().snapshots.push((snapshot.clone(), timestamp_ms));
    }

    fn batch_sink(&mut self, domain: BatchDomain) -> Option<&mut dyn BatchSink> {
        if self.domains.contains(&domain) { Some(self as &mut dyn BatchSink) } else { None }
    }
}

impl BatchSink for RecordingRenderer {
    fn apply_batch(&mut self, domain: BatchDomain, entries: &[BatchEntry]) {
        let names = entries.iter().map(|e| e.name.clone()).collect();
        self.log.borrow_mut().batches.push((domain, names));
    }
}

// =============================================================
// Chart surfaces
// =============================================================

#[derive(Debug, Default)]
pub struct SurfaceLog {
    pub redraws: Vec<(Vec<(i64, Option<f64>)>, Option<TimeWindow>)>,
    pub legend: Vec<Option<f64>>,
}

impl SurfaceLog {
    pub fn redraw_count(&self) -> usize {
        self.redraws.len()
    }
}

pub struct RecordingSurface(pub Rc<RefCell<SurfaceLog>>);

impl RecordingSurface {
    pub fn new() -> (Box<Self>, Rc<RefCell<SurfaceLog>>) {
        let log = Rc::new(RefCell::new(SurfaceLog::default()));
        (Box::new(Self(Rc::clone(&log))), log)
    }
}

impl ChartSurface for RecordingSurface {
    fn redraw(&mut self, points: &RingBuffer, window: Option<TimeWindow>) {
        let points = points.iter().map(|p| (p.x, p.y)).collect();
        self.0.borrow_mut().redraws.push((points, window));
    }

    fn set_legend_value(&mut self, value: Option<f64>) {
        self.0.borrow_mut().legend.push(value);
    }
}
