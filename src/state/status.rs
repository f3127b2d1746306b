//! User-visible connection status indicator.

#[cfg(test)]
#[path = "status_test.rs"]
mod status_test;

/// Transport status shown to the user.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// Not connected; stream closed or never opened.
    #[default]
    Disconnected,
    /// Stream request issued, acknowledgement not yet received.
    Connecting,
    /// The server sent its `connected` acknowledgement.
    Connected,
    /// Waiting out a backoff delay before the next attempt.
    Reconnecting { attempt: u32, max: u32 },
    /// Push delivery given up; data arrives by periodic polling.
    Polling,
}

impl ConnectionStatus {
    /// Stable lowercase label for the status indicator.
    pub fn label(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting { .. } => "reconnecting",
            Self::Polling => "polling",
        }
    }

    /// Whether fresh data is currently flowing by either transport.
    pub fn is_live(self) -> bool {
        matches!(self, Self::Connected | Self::Polling)
    }
}
