//! Networking and event-flow modules.
//!
//! SYSTEM CONTEXT
//! ==============
//! `types` defines the wire schema, `parse` the payload helpers, `connection`
//! the reconnect state machine, `router` the event fan-out, `fallback` the
//! poll-timer bookkeeping and `api` the pull endpoints. `event_client` drives
//! all of it from the browser event loop.

pub mod api;
pub mod backoff;
pub mod connection;
#[cfg(feature = "hydrate")]
pub mod event_client;
pub mod fallback;
pub mod parse;
pub mod router;
pub mod types;
