//! Error types for glowlink.
//!
//! All fallible operations across the workspace return [`Result<T>`], which
//! uses [`Error`] as the error type. The variants separate failures a caller
//! caused directly (a denied port request, a send while disconnected) from
//! failures that arrive asynchronously on the link itself.
//!
//! `Error` is `Clone` so status events can carry the triggering error to
//! every listener; underlying I/O errors are captured as their message.

/// The error type for all glowlink operations.
///
/// Variants cover the failure modes of a serial link to a lighting
/// controller: the host not exposing serial at all, port selection and open
/// failures, cancelled connection attempts, and stream faults on an active
/// connection.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// The host environment exposes no serial capability.
    #[error("serial capability not available on this host")]
    Unsupported,

    /// No port could be acquired: the user declined the request or no
    /// device is available.
    #[error("failed to acquire serial port: {0}")]
    PortAcquisition(String),

    /// The underlying open call failed (wrong parameters, port busy,
    /// device vanished between selection and open).
    #[error("failed to open serial port: {0}")]
    Open(String),

    /// The connection attempt was cancelled by a concurrent disconnect.
    ///
    /// Distinct from [`Open`](Error::Open) so callers can tell "cancelled
    /// by me" apart from "device rejected".
    #[error("connection attempt aborted")]
    Aborted,

    /// A connection attempt or teardown is already in flight.
    #[error("connection attempt already in progress")]
    Busy,

    /// No connection is established.
    #[error("serial port not connected")]
    NotConnected,

    /// A read or write primitive failed during an active connection
    /// (including device unplug).
    #[error("stream fault: {0}")]
    Stream(String),

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;
