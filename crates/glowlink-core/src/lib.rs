//! glowlink-core: Core traits, types, and error definitions for glowlink.
//!
//! This crate defines the transport-agnostic abstractions the connection
//! manager is built on. UI layers and tools depend on these types without
//! pulling in any real serial backend.
//!
//! # Key types
//!
//! - [`PortProvider`] / [`SerialLink`] -- the injectable host serial capability
//! - [`ConnectionStatus`] -- the connection lifecycle state
//! - [`LineFramer`] -- newline framing over a chunked byte stream
//! - [`LogEntry`] -- one transport-log record
//! - [`Error`] / [`Result`] -- error handling

pub mod error;
pub mod events;
pub mod framing;
pub mod link;
pub mod log;
pub mod status;

// Re-export key types at crate root for ergonomic `use glowlink_core::*`.
pub use error::{Error, Result};
pub use events::{DataEvent, StatusEvent};
pub use framing::LineFramer;
pub use link::{
    ConnectOptions, DataBits, FlowControl, Parity, PortProvider, SerialLink, StopBits,
};
pub use log::{Direction, LogEntry};
pub use status::ConnectionStatus;
