//! Pull endpoints used by the polling fallback, and the stream URL.
//!
//! URL building and response decoding are plain functions so they run in
//! native tests; the fetchers themselves exist only in the browser build.
//!
//! ERROR HANDLING
//! ==============
//! Fetchers return `Result<_, MonitorError>`. The caller logs the failure and
//! keeps the stale value on screen; nothing here retries.

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde_json::Value;

use crate::error::MonitorError;
use crate::net::parse::{coerce_sample, parse_timestamp};
use crate::net::types::{ObjectKey, SeriesKey, StreamRequest};

/// Everything outside the RFC 3986 unreserved set.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b'~');

/// Percent-encode one path segment or query value.
pub fn encode_component(raw: &str) -> String {
    utf8_percent_encode(raw, COMPONENT).to_string()
}

/// Full stream URL, with the access token as the `token` query parameter.
pub fn stream_url(request: &StreamRequest) -> String {
    match request.token.as_deref() {
        Some(token) => {
            let separator = if request.endpoint.contains('?') { '&' } else { '?' };
            format!("{}{separator}token={}", request.endpoint, encode_component(token))
        }
        None => request.endpoint.clone(),
    }
}

/// `GET {api}/objects/{server}/{object}`: current object snapshot.
pub fn object_endpoint(api_base: &str, key: &ObjectKey) -> String {
    format!(
        "{}/objects/{}/{}",
        api_base.trim_end_matches('/'),
        encode_component(&key.server_id),
        encode_component(&key.object_name)
    )
}

/// `GET {api}/objects/{server}/{object}/series/{series}`: latest value of
/// one series.
pub fn series_endpoint(api_base: &str, key: &ObjectKey, series: &SeriesKey) -> String {
    format!("{}/series/{}", object_endpoint(api_base, key), encode_component(series.as_str()))
}

/// Decoded object poll response.
#[derive(Clone, Debug, PartialEq)]
pub struct PolledSnapshot {
    pub data: Value,
    pub timestamp_ms: Option<i64>,
}

impl PolledSnapshot {
    /// Accepts either an envelope-like `{ data, timestamp }` body or the bare
    /// object state.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Malformed`] when the body is not a JSON object.
    pub fn from_body(body: Value) -> Result<Self, MonitorError> {
        let Value::Object(mut map) = body else {
            return Err(MonitorError::Malformed("object snapshot is not a JSON object".into()));
        };
        let timestamp_ms = map.get("timestamp").and_then(parse_timestamp);
        if map.get("data").is_some_and(Value::is_object) {
            let data = map.remove("data").unwrap_or_default();
            return Ok(Self { data, timestamp_ms });
        }
        Ok(Self { data: Value::Object(map), timestamp_ms })
    }
}

/// Decoded series poll response.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PolledValue {
    pub sample: Option<f64>,
    pub timestamp_ms: Option<i64>,
}

impl PolledValue {
    /// Accepts `{ value, timestamp? }` or a bare scalar.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Malformed`] when the value cannot be charted.
    pub fn from_body(body: &Value) -> Result<Self, MonitorError> {
        let sample = coerce_sample(body)
            .ok_or_else(|| MonitorError::Malformed(format!("series value is not numeric: {body}")))?;
        let timestamp_ms = body.get("timestamp").and_then(parse_timestamp);
        Ok(Self { sample, timestamp_ms })
    }
}

#[cfg(feature = "hydrate")]
async fn fetch_json(url: &str) -> Result<Value, MonitorError> {
    let resp = gloo_net::http::Request::get(url)
        .send()
        .await
        .map_err(|e| MonitorError::Transport(e.to_string()))?;
    let status = resp.status();
    if !(200..300).contains(&status) {
        return Err(MonitorError::Fetch { url: url.to_owned(), status });
    }
    resp.json::<Value>().await.map_err(|e| MonitorError::Malformed(e.to_string()))
}

/// Fetch the current snapshot of one object.
///
/// # Errors
///
/// Returns an error if the request fails, the server answers non-OK, or the
/// body is not an object.
#[cfg(feature = "hydrate")]
pub async fn fetch_object_snapshot(api_base: &str, key: &ObjectKey) -> Result<PolledSnapshot, MonitorError> {
    let body = fetch_json(&object_endpoint(api_base, key)).await?;
    PolledSnapshot::from_body(body)
}

/// Fetch the latest value of one series.
///
/// # Errors
///
/// Returns an error if the request fails, the server answers non-OK, or the
/// value is not numeric.
#[cfg(feature = "hydrate")]
pub async fn fetch_series_value(api_base: &str, key: &ObjectKey, series: &SeriesKey) -> Result<PolledValue, MonitorError> {
    let body = fetch_json(&series_endpoint(api_base, key, series)).await?;
    PolledValue::from_body(&body)
}
