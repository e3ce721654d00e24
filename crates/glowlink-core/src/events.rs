//! Event payload types.
//!
//! The manager publishes three kinds of events: status changes, received
//! lines, and transport-log appends (the log event payload is
//! [`LogEntry`](crate::LogEntry) itself). Listeners subscribe per kind and
//! receive the payloads below by reference, cloning what they keep.

use crate::error::Error;
use crate::status::ConnectionStatus;

/// A connection status transition.
///
/// Emitted in the exact order transitions occur. When a transition was
/// caused by a failure (an open error, an abort, a stream fault), the
/// triggering error rides along.
#[derive(Debug, Clone)]
pub struct StatusEvent {
    /// The status that just became current.
    pub status: ConnectionStatus,
    /// The error that caused the transition, if any.
    pub error: Option<Error>,
}

/// One complete line received from the controller.
///
/// The raw text is always present. `value` carries the best-effort JSON
/// parse of the line; a parse failure is not an error and simply leaves it
/// empty.
#[derive(Debug, Clone)]
pub struct DataEvent {
    /// The received line, without its terminator.
    pub line: String,
    /// Best-effort structured parse of the line.
    pub value: Option<serde_json::Value>,
}
