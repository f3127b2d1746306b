use super::*;
use serde_json::json;

#[test]
fn pick_str_returns_first_matching_string_key() {
    let data = json!({ "a": 1, "b": "two", "c": "three" });
    assert_eq!(pick_str(&data, &["x", "b", "c"]), Some("two"));
    assert_eq!(pick_str(&data, &["x", "y"]), None);
}

#[test]
fn pick_number_supports_float_and_integer_values() {
    let data = json!({ "float": 1.5, "int": 7 });
    assert_eq!(pick_number(&data, &["float"]), Some(1.5));
    assert_eq!(pick_number(&data, &["int"]), Some(7.0));
    assert_eq!(pick_number(&data, &["missing"]), None);
}

#[test]
fn pick_bool_skips_non_bool_values() {
    let data = json!({ "connected": "yes", "online": true });
    assert_eq!(pick_bool(&data, &["connected", "online"]), Some(true));
}

// =============================================================
// lookup_path
// =============================================================

#[test]
fn lookup_path_walks_nested_objects() {
    let data = json!({ "io": { "in": { "flow": { "value": 42 } } } });
    assert_eq!(lookup_path(&data, "io.in.flow"), Some(&json!({ "value": 42 })));
}

#[test]
fn lookup_path_prefers_literal_dotted_key() {
    let data = json!({ "io.in.flow": 1, "io": { "in": { "flow": 2 } } });
    assert_eq!(lookup_path(&data, "io.in.flow"), Some(&json!(1)));
}

#[test]
fn lookup_path_misses_cleanly() {
    let data = json!({ "io": { "in": {} } });
    assert_eq!(lookup_path(&data, "io.in.flow"), None);
    assert_eq!(lookup_path(&data, "io..flow"), None);
    assert_eq!(lookup_path(&json!(5), "io"), None);
}

// =============================================================
// coerce_sample
// =============================================================

#[test]
fn coerce_sample_accepts_numbers_bools_and_numeric_strings() {
    assert_eq!(coerce_sample(&json!(42)), Some(Some(42.0)));
    assert_eq!(coerce_sample(&json!(true)), Some(Some(1.0)));
    assert_eq!(coerce_sample(&json!(" 3.5 ")), Some(Some(3.5)));
}

#[test]
fn coerce_sample_null_is_a_gap() {
    assert_eq!(coerce_sample(&json!(null)), Some(None));
}

#[test]
fn coerce_sample_unwraps_value_member_once() {
    assert_eq!(coerce_sample(&json!({ "value": 7, "quality": 0 })), Some(Some(7.0)));
    assert_eq!(coerce_sample(&json!({ "value": { "value": 7 } })), None);
    assert_eq!(coerce_sample(&json!({ "quality": 0 })), None);
}

#[test]
fn coerce_sample_rejects_garbage() {
    assert_eq!(coerce_sample(&json!("n/a")), None);
    assert_eq!(coerce_sample(&json!([1, 2])), None);
}

// =============================================================
// timestamps
// =============================================================

#[test]
fn parse_timestamp_reads_epoch_millis() {
    assert_eq!(parse_timestamp(&json!(1_700_000_000_123_i64)), Some(1_700_000_000_123));
    assert_eq!(parse_timestamp(&json!(1_700_000_000_123.4)), Some(1_700_000_000_123));
}

#[test]
fn parse_timestamp_reads_rfc3339_and_naive_iso() {
    assert_eq!(parse_timestamp(&json!("1970-01-01T00:00:01Z")), Some(1_000));
    assert_eq!(parse_timestamp(&json!("1970-01-01T01:00:01+01:00")), Some(1_000));
    assert_eq!(parse_timestamp(&json!("1970-01-01T00:00:02.500")), Some(2_500));
    assert_eq!(parse_timestamp(&json!("1970-01-01 00:00:03")), Some(3_000));
}

#[test]
fn timestamp_or_falls_back_on_missing_or_bad_values() {
    assert_eq!(timestamp_or(None, 99), 99);
    assert_eq!(timestamp_or(Some(&json!("yesterday")), 99), 99);
    assert_eq!(timestamp_or(Some(&json!(5)), 99), 5);
}
