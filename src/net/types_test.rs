use super::*;
use serde_json::json;

// =============================================================
// Envelope
// =============================================================

#[test]
fn envelope_parses_full_snapshot() {
    let env = Envelope::parse(
        r#"{"type":"object_data","serverId":"s1","objectName":"Pump1","data":{"io":{}},"timestamp":"2024-05-01T10:00:00Z"}"#,
    )
    .unwrap();
    assert_eq!(env.event_kind(None), Some(EventKind::ObjectSnapshot));
    assert_eq!(env.object_key(), Some(ObjectKey::new("s1", "Pump1")));
    assert_eq!(env.data, json!({"io":{}}));
}

#[test]
fn envelope_falls_back_to_stream_event_name() {
    let env = Envelope::parse(r#"{"objectName":"Pump1","data":{"name":"T1","value":3}}"#).unwrap();
    assert_eq!(env.event_kind(Some("sensor_data")), Some(EventKind::SensorUpdate));
    assert!(env.object_key().is_none());
}

#[test]
fn envelope_type_field_wins_over_event_name() {
    let env = Envelope::parse(r#"{"type":"server_status","serverId":"s1"}"#).unwrap();
    assert_eq!(env.event_kind(Some("object_data")), Some(EventKind::ServerStatus));
}

#[test]
fn envelope_rejects_non_json() {
    assert!(matches!(Envelope::parse("not json"), Err(MonitorError::Malformed(_))));
}

#[test]
fn envelope_rejects_non_object_json() {
    assert!(Envelope::parse("[1,2,3]").is_err());
}

#[test]
fn unknown_tag_has_no_kind() {
    let env = Envelope::parse(r#"{"type":"journal_entry"}"#).unwrap();
    assert_eq!(env.event_kind(None), None);
}

// =============================================================
// EventKind / BatchDomain
// =============================================================

#[test]
fn every_listed_tag_round_trips() {
    for tag in EventKind::ALL_TAGS {
        let kind = EventKind::from_tag(tag).unwrap();
        assert_eq!(kind.tag(), tag);
    }
}

#[test]
fn batch_domains_have_distinct_prefixes() {
    assert_eq!(BatchDomain::Ionc.prefix(), "ionc");
    assert_eq!(BatchDomain::Modbus.prefix(), "mb");
    assert_eq!(BatchDomain::Opcua.prefix(), "opcua");
}

// =============================================================
// Payloads
// =============================================================

#[test]
fn connected_ack_reads_camel_case_fields() {
    let ack: ConnectedAck = serde_json::from_value(json!({
        "pollInterval": 5000,
        "smEnabled": true,
        "control": {"enabled": true, "isController": false, "hasController": true}
    }))
    .unwrap();
    assert_eq!(ack.poll_interval_ms, Some(5000));
    assert!(ack.sm_enabled);
    let control = ack.control.unwrap();
    assert!(control.enabled);
    assert!(!control.is_controller);
    assert!(control.has_controller);
}

#[test]
fn connected_ack_tolerates_empty_payload() {
    let ack: ConnectedAck = serde_json::from_value(json!({})).unwrap();
    assert_eq!(ack, ConnectedAck::default());
}

#[test]
fn batch_entry_keeps_extra_fields() {
    let entry: BatchEntry = serde_json::from_value(json!({"name":"R1","value":7,"addr":40001})).unwrap();
    assert_eq!(entry.name, "R1");
    assert_eq!(entry.value, json!(7));
    assert_eq!(entry.extra.get("addr"), Some(&json!(40001)));
}

// =============================================================
// Keys
// =============================================================

#[test]
fn series_key_prefix_and_name() {
    let key = SeriesKey::prefixed("mb", "Reg1");
    assert_eq!(key.as_str(), "mb:Reg1");
    assert_eq!(key.prefix(), Some("mb"));
    assert_eq!(key.name(), "Reg1");

    let path = SeriesKey::path("io.in.flow");
    assert_eq!(path.prefix(), None);
    assert_eq!(path.name(), "io.in.flow");
}

#[test]
fn external_series_uses_ext_prefix() {
    assert_eq!(SeriesKey::external("Temp").as_str(), "ext:Temp");
}

#[test]
fn object_key_display_joins_halves() {
    assert_eq!(ObjectKey::new("s1", "Pump1").to_string(), "s1/Pump1");
}
