//! Transport log records.
//!
//! Every byte exchange with the controller is recorded as a [`LogEntry`],
//! independent of whether anything is subscribed to the data stream. The
//! log is append-only from the manager's perspective; clearing it is a
//! caller decision.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Direction of a logged exchange, seen from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Received from the controller (also used for lifecycle notes).
    Inbound,
    /// Sent to the controller.
    Outbound,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Inbound => f.write_str("inbound"),
            Direction::Outbound => f.write_str("outbound"),
        }
    }
}

/// One immutable record in the transport log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Unique identifier for the entry.
    pub id: Uuid,
    /// When the exchange was recorded.
    pub timestamp: DateTime<Utc>,
    /// Whether the payload travelled to or from the controller.
    pub direction: Direction,
    /// The raw text of the exchange, without the line terminator.
    pub payload: String,
}

impl LogEntry {
    /// Create an entry stamped with the current time and a fresh id.
    pub fn new(direction: Direction, payload: impl Into<String>) -> Self {
        LogEntry {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            direction,
            payload: payload.into(),
        }
    }
}
