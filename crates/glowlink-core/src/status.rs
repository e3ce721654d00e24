//! Connection status.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The lifecycle state of the serial connection.
///
/// Exactly one value is current at any time; it is the single source of
/// truth every other component observes. Transitions follow the manager's
/// state machine -- callers never set the status directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    /// No connection and no attempt in flight.
    Disconnected,
    /// A connection attempt is in flight (port selection or open).
    Connecting,
    /// The port is open and the read loop is running.
    Connected,
    /// Teardown is in flight.
    Disconnecting,
    /// The read loop terminated abnormally; teardown follows immediately.
    Error,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Disconnecting => "disconnecting",
            ConnectionStatus::Error => "error",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_display_matches_wire_name() {
        assert_eq!(ConnectionStatus::Disconnected.to_string(), "disconnected");
        assert_eq!(ConnectionStatus::Connecting.to_string(), "connecting");
        assert_eq!(ConnectionStatus::Error.to_string(), "error");
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&ConnectionStatus::Connecting).unwrap();
        assert_eq!(json, "\"connecting\"");
        let back: ConnectionStatus = serde_json::from_str("\"connected\"").unwrap();
        assert_eq!(back, ConnectionStatus::Connected);
    }
}
