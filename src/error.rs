//! Error type shared by the monitoring core.
//!
//! ERROR HANDLING
//! ==============
//! Every failure the core can observe is local: a bad payload drops one event,
//! a failed poll leaves the last value on screen, a transport failure feeds the
//! reconnect schedule. `Monitor` is the boundary that turns these into log
//! lines and counters, so nothing here ever reaches rendering code.

/// Failures raised while parsing, fetching or configuring.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// The payload was not valid JSON or did not match the envelope shape.
    #[error("malformed event payload: {0}")]
    Malformed(String),
    /// A handler needed a field the payload does not carry.
    #[error("event payload is missing `{0}`")]
    MissingField(&'static str),
    /// A fallback pull returned a non-OK HTTP status.
    #[error("fetch {url} failed with status {status}")]
    Fetch { url: String, status: u16 },
    /// The stream or an HTTP request failed below the protocol level.
    #[error("transport failure: {0}")]
    Transport(String),
    /// A configuration value could not be parsed or is out of range.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<serde_json::Error> for MonitorError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}
