//! # objwatch
//!
//! Live-monitoring client core for a fleet of industrial-automation object
//! servers. One multiplexed server-push stream is demultiplexed into per-object
//! renderers and bounded per-series chart buffers; when the stream cannot be
//! recovered the same update path is fed by periodic polling.
//!
//! The core (`config`, `error`, `monitor`, `net`, `state`) has no browser
//! dependencies and is tested natively. The `hydrate` feature adds the WASM
//! driver in [`net::event_client`].

pub mod config;
pub mod error;
pub mod monitor;
pub mod net;
pub mod state;

#[cfg(test)]
#[path = "fakes_test.rs"]
pub(crate) mod fakes;

pub use config::MonitorConfig;
pub use error::MonitorError;
pub use monitor::{EventOutcome, Monitor, MonitorStats};

/// Install browser console logging and the panic hook.
///
/// Safe to call more than once; later calls keep the first logger.
#[cfg(feature = "hydrate")]
pub fn init_logging(level: log::Level) {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(level).is_err() {
        log::debug!("console logger already installed");
    }
}
