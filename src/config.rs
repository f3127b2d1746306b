//! Monitor configuration loaded from the page query string or a JSON block.

use serde::Deserialize;

use crate::error::MonitorError;

pub const DEFAULT_STREAM_ENDPOINT: &str = "/api/events";
pub const DEFAULT_API_BASE: &str = "/api";
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 10;
pub const DEFAULT_BASE_RECONNECT_DELAY_MS: u64 = 1_000;
pub const DEFAULT_MAX_RECONNECT_DELAY_MS: u64 = 30_000;
pub const DEFAULT_JITTER_RATIO: f64 = 0.1;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5_000;
pub const DEFAULT_SERIES_CAPACITY: usize = 1_000;
pub const DEFAULT_WINDOW_SPAN_MS: i64 = 15 * 60 * 1_000;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MonitorConfig {
    /// Path of the server-push event stream.
    pub stream_endpoint: String,
    /// Prefix for the fallback pull endpoints.
    pub api_base: String,
    /// Access token sent as the `token` query parameter when present.
    pub token: Option<String>,
    pub max_reconnect_attempts: u32,
    pub base_reconnect_delay_ms: u64,
    pub max_reconnect_delay_ms: u64,
    /// Fractional jitter applied to each reconnect delay (0.1 = ±10%).
    pub jitter_ratio: f64,
    /// Poll cadence used until the server announces its own.
    pub default_poll_interval_ms: u64,
    /// Ring buffer capacity per chart series.
    pub series_capacity: usize,
    /// Width of the follow-mode time window.
    pub window_span_ms: i64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            stream_endpoint: DEFAULT_STREAM_ENDPOINT.to_owned(),
            api_base: DEFAULT_API_BASE.to_owned(),
            token: None,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            base_reconnect_delay_ms: DEFAULT_BASE_RECONNECT_DELAY_MS,
            max_reconnect_delay_ms: DEFAULT_MAX_RECONNECT_DELAY_MS,
            jitter_ratio: DEFAULT_JITTER_RATIO,
            default_poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            series_capacity: DEFAULT_SERIES_CAPACITY,
            window_span_ms: DEFAULT_WINDOW_SPAN_MS,
        }
    }
}

impl MonitorConfig {
    /// Build typed config from a key lookup (the page query string in the
    /// browser).
    ///
    /// Optional keys:
    /// - `endpoint`: stream path, default `/api/events`
    /// - `api`: pull endpoint prefix, default `/api`
    /// - `token`: access token, no default
    /// - `maxReconnect`: default 10
    /// - `reconnectDelay`: base backoff in ms, default 1000
    /// - `maxReconnectDelay`: backoff cap in ms, default 30000
    /// - `pollInterval`: poll cadence in ms before the server sends one, default 5000
    /// - `points`: ring buffer capacity, default 1000
    /// - `window`: follow window in ms, default 900000
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Config`] when a present value does not parse or
    /// the resulting config fails [`MonitorConfig::validate`].
    pub fn from_params<F>(lookup: F) -> Result<Self, MonitorError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let token = lookup("token").filter(|t| !t.trim().is_empty());
        let config = Self {
            stream_endpoint: lookup("endpoint").unwrap_or(defaults.stream_endpoint),
            api_base: lookup("api")
                .unwrap_or(defaults.api_base)
                .trim_end_matches('/')
                .to_owned(),
            token,
            max_reconnect_attempts: parse_param(&lookup, "maxReconnect", defaults.max_reconnect_attempts)?,
            base_reconnect_delay_ms: parse_param(&lookup, "reconnectDelay", defaults.base_reconnect_delay_ms)?,
            max_reconnect_delay_ms: parse_param(&lookup, "maxReconnectDelay", defaults.max_reconnect_delay_ms)?,
            jitter_ratio: defaults.jitter_ratio,
            default_poll_interval_ms: parse_param(&lookup, "pollInterval", defaults.default_poll_interval_ms)?,
            series_capacity: parse_param(&lookup, "points", defaults.series_capacity)?,
            window_span_ms: parse_param(&lookup, "window", defaults.window_span_ms)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse an embedded JSON config block; absent fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Config`] for invalid JSON or out-of-range values.
    pub fn from_json(raw: &str) -> Result<Self, MonitorError> {
        let config: Self = serde_json::from_str(raw).map_err(|e| MonitorError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the reconnect and buffer logic cannot work with.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Config`] naming the offending field.
    pub fn validate(&self) -> Result<(), MonitorError> {
        if self.max_reconnect_attempts == 0 {
            return Err(MonitorError::Config("maxReconnectAttempts must be at least 1".into()));
        }
        if self.series_capacity == 0 {
            return Err(MonitorError::Config("seriesCapacity must be at least 1".into()));
        }
        if self.base_reconnect_delay_ms > self.max_reconnect_delay_ms {
            return Err(MonitorError::Config(format!(
                "baseReconnectDelayMs ({}) exceeds maxReconnectDelayMs ({})",
                self.base_reconnect_delay_ms, self.max_reconnect_delay_ms
            )));
        }
        if !(0.0..1.0).contains(&self.jitter_ratio) {
            return Err(MonitorError::Config(format!("jitterRatio {} outside [0, 1)", self.jitter_ratio)));
        }
        if self.default_poll_interval_ms == 0 {
            return Err(MonitorError::Config("defaultPollIntervalMs must be positive".into()));
        }
        if self.window_span_ms <= 0 {
            return Err(MonitorError::Config("windowSpanMs must be positive".into()));
        }
        Ok(())
    }
}

fn parse_param<F, T>(lookup: &F, key: &str, default: T) -> Result<T, MonitorError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| MonitorError::Config(format!("{key}: cannot parse `{raw}`"))),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
