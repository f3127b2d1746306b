use super::*;

#[test]
fn connection_status_default_is_disconnected() {
    assert_eq!(ConnectionStatus::default(), ConnectionStatus::Disconnected);
}

#[test]
fn labels_match_indicator_vocabulary() {
    assert_eq!(ConnectionStatus::Connected.label(), "connected");
    assert_eq!(ConnectionStatus::Reconnecting { attempt: 2, max: 10 }.label(), "reconnecting");
    assert_eq!(ConnectionStatus::Polling.label(), "polling");
    assert_eq!(ConnectionStatus::Connecting.label(), "connecting");
}

#[test]
fn only_connected_and_polling_are_live() {
    assert!(ConnectionStatus::Connected.is_live());
    assert!(ConnectionStatus::Polling.is_live());
    assert!(!ConnectionStatus::Connecting.is_live());
    assert!(!ConnectionStatus::Reconnecting { attempt: 1, max: 3 }.is_live());
}
