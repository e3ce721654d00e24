//! glowlink-manager: the serial connection manager.
//!
//! This crate holds the connection state machine and everything that hangs
//! off it: the IO task that owns the open port, the outbound sender, the
//! typed event bus, and the transport log. The serial capability itself is
//! injected as a [`PortProvider`](glowlink_core::PortProvider), so the same
//! logic runs against real hardware (`glowlink-transport`) and against
//! mocks (`glowlink-test-harness`).
//!
//! # Key types
//!
//! - [`SerialManager`] -- connect/disconnect/send plus event subscriptions
//! - [`SerialManagerBuilder`] -- configuration before construction
//! - [`Payload`] -- outbound text or structured value
//! - [`Subscription`] -- explicit unsubscribe handle for listeners

mod builder;
mod bus;
mod io;
mod manager;

pub use builder::{SerialManagerBuilder, DEFAULT_MAX_LOG_ENTRIES};
pub use bus::Subscription;
pub use manager::{Payload, SerialManager};
