//! Wire-protocol DTOs and routing keys.
//!
//! DESIGN
//! ======
//! The envelope keeps `data` as raw `serde_json::Value`: object snapshots are
//! resolved by dotted path at routing time, so only the fields a handler
//! needs are ever interpreted.

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::MonitorError;

/// One pushed message from the event stream.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Envelope {
    /// Handler tag; falls back to the SSE event name when absent.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(rename = "serverId", default)]
    pub server_id: Option<String>,
    #[serde(rename = "serverName", default)]
    pub server_name: Option<String>,
    #[serde(rename = "objectName", default)]
    pub object_name: Option<String>,
    /// Type-specific payload.
    #[serde(default)]
    pub data: Value,
    /// Epoch milliseconds or an ISO-8601 string.
    #[serde(default)]
    pub timestamp: Option<Value>,
}

impl Envelope {
    /// Parse one raw stream message.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Malformed`] when the text is not a JSON object
    /// of envelope shape.
    pub fn parse(raw: &str) -> Result<Self, MonitorError> {
        Ok(serde_json::from_str::<Self>(raw)?)
    }

    /// Resolve the handler kind from the `type` field or the stream event name.
    pub fn event_kind(&self, event_name: Option<&str>) -> Option<EventKind> {
        self.kind
            .as_deref()
            .or(event_name)
            .and_then(EventKind::from_tag)
    }

    /// The full subscription key, when both halves are present.
    pub fn object_key(&self) -> Option<ObjectKey> {
        match (&self.server_id, &self.object_name) {
            (Some(server), Some(object)) => Some(ObjectKey::new(server.clone(), object.clone())),
            _ => None,
        }
    }
}

/// Handler selected by an envelope's tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventKind {
    /// Connection acknowledgement carrying poll cadence and capabilities.
    Connected,
    /// Full state of one object.
    ObjectSnapshot,
    /// One external-sensor value change.
    SensorUpdate,
    /// Several `{name, value}` changes from one protocol domain.
    Batch(BatchDomain),
    /// A server went up or down.
    ServerStatus,
    /// The server's object list changed.
    ObjectsList,
}

impl EventKind {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "connected" => Some(Self::Connected),
            "object_data" => Some(Self::ObjectSnapshot),
            "sensor_data" => Some(Self::SensorUpdate),
            "server_status" => Some(Self::ServerStatus),
            "objects_list" => Some(Self::ObjectsList),
            other => BatchDomain::from_tag(other).map(Self::Batch),
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::ObjectSnapshot => "object_data",
            Self::SensorUpdate => "sensor_data",
            Self::Batch(domain) => domain.tag(),
            Self::ServerStatus => "server_status",
            Self::ObjectsList => "objects_list",
        }
    }

    /// Every tag the stream may carry, for per-event subscriptions.
    pub const ALL_TAGS: [&'static str; 8] = [
        "connected",
        "object_data",
        "sensor_data",
        "ionc_sensor_batch",
        "modbus_register_batch",
        "opcua_sensor_batch",
        "server_status",
        "objects_list",
    ];
}

/// Protocol domain of a batched update; selects the series key prefix.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BatchDomain {
    Ionc,
    Modbus,
    Opcua,
}

impl BatchDomain {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "ionc_sensor_batch" => Some(Self::Ionc),
            "modbus_register_batch" => Some(Self::Modbus),
            "opcua_sensor_batch" => Some(Self::Opcua),
            _ => None,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Self::Ionc => "ionc_sensor_batch",
            Self::Modbus => "modbus_register_batch",
            Self::Opcua => "opcua_sensor_batch",
        }
    }

    pub fn prefix(self) -> &'static str {
        match self {
            Self::Ionc => "ionc",
            Self::Modbus => "mb",
            Self::Opcua => "opcua",
        }
    }
}

/// Payload of the `connected` acknowledgement.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectedAck {
    /// Server-chosen poll cadence in milliseconds.
    #[serde(rename = "pollInterval", default)]
    pub poll_interval_ms: Option<u64>,
    /// Whether the shared-memory integration is available on the server.
    #[serde(rename = "smEnabled", default)]
    pub sm_enabled: bool,
    #[serde(default)]
    pub control: Option<ControlInfo>,
}

/// Control-session capability block of the acknowledgement.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlInfo {
    #[serde(default)]
    pub enabled: bool,
    #[serde(rename = "isController", default)]
    pub is_controller: bool,
    #[serde(rename = "hasController", default)]
    pub has_controller: bool,
}

/// Payload of a single external-sensor update.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct SensorUpdate {
    pub name: String,
    #[serde(default)]
    pub value: Value,
}

/// One row of a batched update.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct BatchEntry {
    pub name: String,
    #[serde(default)]
    pub value: Value,
    /// Remaining per-row fields, kept for renderers.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Identity of one monitored remote object.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    pub server_id: String,
    pub object_name: String,
}

impl ObjectKey {
    pub fn new(server_id: impl Into<String>, object_name: impl Into<String>) -> Self {
        Self { server_id: server_id.into(), object_name: object_name.into() }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.server_id, self.object_name)
    }
}

/// Identity of one chart series within an object.
///
/// Snapshot-fed series use the dotted payload path (`io.in.flow`); pushed
/// sensors and batches use `prefix:name`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeriesKey(String);

/// Prefix of series fed by single external-sensor updates.
pub const EXTERNAL_SENSOR_PREFIX: &str = "ext";

impl SeriesKey {
    /// A series read from the object snapshot at `path`.
    pub fn path(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// A series fed by pushed values, keyed `prefix:name`.
    pub fn prefixed(prefix: &str, name: &str) -> Self {
        Self(format!("{prefix}:{name}"))
    }

    pub fn external(name: &str) -> Self {
        Self::prefixed(EXTERNAL_SENSOR_PREFIX, name)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `prefix` half of a `prefix:name` key.
    pub fn prefix(&self) -> Option<&str> {
        self.0.split_once(':').map(|(prefix, _)| prefix)
    }

    /// The variable name without any domain prefix.
    pub fn name(&self) -> &str {
        self.0.split_once(':').map_or(self.0.as_str(), |(_, name)| name)
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the platform must open to (re)establish the stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamRequest {
    pub endpoint: String,
    /// Token to send as the `token` query parameter, unencoded.
    pub token: Option<String>,
}
