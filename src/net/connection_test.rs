use super::*;
use crate::net::backoff::FixedJitter;

fn manager(max: u32) -> ConnectionManager {
    let config = MonitorConfig { max_reconnect_attempts: max, token: Some("s3cret".into()), ..MonitorConfig::default() };
    ConnectionManager::new(&config)
}

fn ack(poll_interval_ms: Option<u64>) -> ConnectedAck {
    ConnectedAck { poll_interval_ms, ..ConnectedAck::default() }
}

fn mid() -> FixedJitter {
    FixedJitter(0.5)
}

// =============================================================
// Connect / acknowledge
// =============================================================

#[test]
fn starts_disconnected() {
    let mgr = manager(3);
    assert_eq!(mgr.phase(), ConnectionPhase::Disconnected);
    assert_eq!(mgr.status(), ConnectionStatus::Disconnected);
    assert!(!mgr.state().connected);
}

#[test]
fn only_open_streams_expect_an_ack() {
    assert!(!ConnectionPhase::Disconnected.expects_ack());
    assert!(!ConnectionPhase::Polling.expects_ack());
    assert!(ConnectionPhase::Connecting.expects_ack());
    assert!(ConnectionPhase::Reconnecting.expects_ack());
    assert!(ConnectionPhase::Connected.expects_ack());
}

#[test]
fn connect_carries_endpoint_and_token() {
    let mut mgr = manager(3);
    let request = mgr.connect();
    assert_eq!(request.endpoint, "/api/events");
    assert_eq!(request.token.as_deref(), Some("s3cret"));
    assert_eq!(mgr.phase(), ConnectionPhase::Connecting);
}

#[test]
fn ack_adopts_server_poll_interval() {
    let mut mgr = manager(3);
    mgr.connect();
    mgr.on_connected(&ack(Some(2_500)));
    assert!(mgr.state().connected);
    assert_eq!(mgr.poll_interval(), Duration::from_millis(2_500));
    assert_eq!(mgr.status(), ConnectionStatus::Connected);
}

#[test]
fn ack_without_interval_keeps_default() {
    let mut mgr = manager(3);
    mgr.connect();
    mgr.on_connected(&ack(None));
    assert_eq!(mgr.state().poll_interval_ms, 5_000);
    mgr.on_connected(&ack(Some(0)));
    assert_eq!(mgr.state().poll_interval_ms, 5_000);
}

#[test]
fn ack_records_capabilities() {
    let mut mgr = manager(3);
    mgr.connect();
    let control = ControlInfo { enabled: true, is_controller: false, has_controller: true };
    mgr.on_connected(&ConnectedAck { poll_interval_ms: None, sm_enabled: true, control: Some(control.clone()) });
    assert!(mgr.state().sm_enabled);
    assert_eq!(mgr.state().control, Some(control));
}

// =============================================================
// Reconnect schedule
// =============================================================

#[test]
fn first_error_schedules_base_delay() {
    let mut mgr = manager(5);
    mgr.connect();
    mgr.on_connected(&ack(None));
    let Recovery::Retry { attempt, delay, .. } = mgr.on_transport_error(&mut mid()) else {
        panic!("expected a retry");
    };
    assert_eq!(attempt, 1);
    assert_eq!(delay, Duration::from_millis(1_000));
    assert_eq!(mgr.status(), ConnectionStatus::Reconnecting { attempt: 1, max: 5 });
    assert!(!mgr.state().connected);
}

#[test]
fn delays_double_until_capped() {
    let mut mgr = manager(20);
    mgr.connect();
    let mut delays = Vec::new();
    for _ in 0..7 {
        let Recovery::Retry { delay, ticket, .. } = mgr.on_transport_error(&mut mid()) else {
            panic!("expected a retry");
        };
        delays.push(delay.as_millis());
        assert!(mgr.reconnect_due(ticket).is_some());
    }
    assert_eq!(delays, vec![1_000, 2_000, 4_000, 8_000, 16_000, 30_000, 30_000]);
}

#[test]
fn ack_resets_attempts() {
    let mut mgr = manager(5);
    mgr.connect();
    for _ in 0..3 {
        if let Recovery::Retry { ticket, .. } = mgr.on_transport_error(&mut mid()) {
            mgr.reconnect_due(ticket);
        }
    }
    assert_eq!(mgr.state().reconnect_attempts, 3);
    mgr.on_connected(&ack(None));
    assert_eq!(mgr.state().reconnect_attempts, 0);

    let Recovery::Retry { attempt, delay, .. } = mgr.on_transport_error(&mut mid()) else {
        panic!("expected a retry");
    };
    assert_eq!(attempt, 1);
    assert_eq!(delay, Duration::from_millis(1_000));
}

#[test]
fn connect_does_not_reset_attempts() {
    let mut mgr = manager(5);
    mgr.connect();
    mgr.on_transport_error(&mut mid());
    mgr.connect();
    assert_eq!(mgr.state().reconnect_attempts, 1);
}

// =============================================================
// Fallback
// =============================================================

#[test]
fn nth_error_falls_back_exactly_once() {
    let mut mgr = manager(3);
    mgr.connect();
    let mut outcomes = Vec::new();
    for _ in 0..5 {
        let outcome = mgr.on_transport_error(&mut mid());
        if let Recovery::Retry { ticket, .. } = outcome {
            mgr.reconnect_due(ticket);
        }
        outcomes.push(outcome);
    }
    let fallbacks = outcomes.iter().filter(|o| **o == Recovery::Fallback).count();
    assert_eq!(fallbacks, 1);
    assert_eq!(outcomes[2], Recovery::Fallback);
    assert_eq!(outcomes[3], Recovery::Idle);
    assert_eq!(mgr.status(), ConnectionStatus::Polling);
    assert_eq!(mgr.state().reconnect_attempts, 3);
}

#[test]
fn polling_is_left_only_by_explicit_connect() {
    let mut mgr = manager(1);
    mgr.connect();
    assert_eq!(mgr.on_transport_error(&mut mid()), Recovery::Fallback);
    assert_eq!(mgr.phase(), ConnectionPhase::Polling);

    mgr.connect();
    assert_eq!(mgr.phase(), ConnectionPhase::Connecting);
    mgr.on_connected(&ack(None));
    assert_eq!(mgr.phase(), ConnectionPhase::Connected);
    assert_eq!(mgr.state().reconnect_attempts, 0);
}

#[test]
fn jittered_delays_stay_within_bounds() {
    let mut mgr = manager(2);
    mgr.connect();
    for unit in [0.0, 0.25, 0.999] {
        let mut jitter = FixedJitter(unit);
        let Recovery::Retry { delay, ticket, .. } = mgr.on_transport_error(&mut jitter) else {
            panic!("expected a retry");
        };
        let ms = delay.as_millis();
        assert!((900..=1_100).contains(&ms), "delay {ms}ms out of range");
        mgr.reconnect_due(ticket);
        mgr.on_connected(&ack(None));
    }
}

// =============================================================
// Cancellation
// =============================================================

#[test]
fn close_cancels_pending_reconnect() {
    let mut mgr = manager(5);
    mgr.connect();
    let Recovery::Retry { ticket, .. } = mgr.on_transport_error(&mut mid()) else {
        panic!("expected a retry");
    };
    mgr.close();
    assert_eq!(mgr.reconnect_due(ticket), None);
    assert_eq!(mgr.status(), ConnectionStatus::Disconnected);
}

#[test]
fn errors_after_close_are_ignored() {
    let mut mgr = manager(5);
    mgr.connect();
    mgr.close();
    assert_eq!(mgr.on_transport_error(&mut mid()), Recovery::Idle);
    assert_eq!(mgr.state().reconnect_attempts, 0);
}

#[test]
fn stale_ticket_is_rejected() {
    let mut mgr = manager(5);
    mgr.connect();
    let Recovery::Retry { ticket: first, .. } = mgr.on_transport_error(&mut mid()) else {
        panic!("expected a retry");
    };
    // A manual connect supersedes the scheduled retry.
    mgr.connect();
    let Recovery::Retry { ticket: second, .. } = mgr.on_transport_error(&mut mid()) else {
        panic!("expected a retry");
    };
    assert_eq!(mgr.reconnect_due(first), None);
    assert!(mgr.reconnect_due(second).is_some());
    assert_eq!(mgr.reconnect_due(second), None);
}
