//! Polling fallback: periodic pulls standing in for the push stream.
//!
//! SYSTEM CONTEXT
//! ==============
//! Once the connection manager gives up on the stream, every open object gets
//! a timer re-fetching its snapshot and every open series a timer re-fetching
//! its latest value. Results re-enter the same update path as pushed events,
//! so renderers and charts never know which transport fed them. All timers
//! are cleared the moment a stream acknowledgement arrives again.

#[cfg(test)]
#[path = "fallback_test.rs"]
mod fallback_test;

use std::time::Duration;

use crate::net::types::{ObjectKey, SeriesKey};
use crate::state::registry::{SubscriberRegistry, TabState};

/// What a poll timer re-fetches on each tick.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PollTarget {
    /// The full object snapshot.
    Object(ObjectKey),
    /// The latest value of one series.
    Series { object: ObjectKey, series: SeriesKey },
}

impl PollTarget {
    pub fn object(&self) -> &ObjectKey {
        match self {
            Self::Object(object) | Self::Series { object, .. } => object,
        }
    }
}

/// Creates recurring poll timers.
///
/// Handles must stop their timer when dropped; the registry relies on that
/// to tear timers down together with the tab or chart that owns them.
pub trait PollScheduler {
    type Handle;

    fn start_polling(&mut self, target: PollTarget, every: Duration) -> Self::Handle;
}

/// Give one tab its missing poll timers; returns how many were created.
pub fn activate_tab<S: PollScheduler>(tab: &mut TabState<S::Handle>, scheduler: &mut S, every: Duration) -> usize {
    let mut created = 0;
    if !tab.has_object_poll() {
        let handle = scheduler.start_polling(PollTarget::Object(tab.key().clone()), every);
        if tab.set_object_poll(handle) {
            created += 1;
        }
    }
    for series in tab.series_without_poll() {
        let target = PollTarget::Series { object: tab.key().clone(), series: series.clone() };
        let handle = scheduler.start_polling(target, every);
        if tab.set_series_poll(series, handle) {
            created += 1;
        }
    }
    created
}

/// Give every open tab its missing poll timers. Tabs that already poll are
/// left alone, so repeated activation never duplicates timers.
pub fn activate<S: PollScheduler>(registry: &mut SubscriberRegistry<S::Handle>, scheduler: &mut S, every: Duration) -> usize {
    let mut created = 0;
    for tab in registry.tabs_mut() {
        created += activate_tab(tab, scheduler, every);
    }
    if created > 0 {
        log::info!("polling fallback: started {created} timer(s) every {}ms", every.as_millis());
    }
    created
}

/// Stop every poll timer; returns how many were running.
pub fn deactivate<H>(registry: &mut SubscriberRegistry<H>) -> usize {
    let mut cleared = 0;
    for tab in registry.tabs_mut() {
        cleared += tab.clear_polls();
    }
    if cleared > 0 {
        log::info!("push delivery resumed: cleared {cleared} poll timer(s)");
    }
    cleared
}
