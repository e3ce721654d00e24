//! glowlink-transport: native serial implementation of the glowlink
//! capability traits.
//!
//! Provides [`NativePortProvider`] and [`NativeSerialLink`], which put a
//! real USB virtual COM port (or physical RS-232 port) behind the
//! [`PortProvider`](glowlink_core::PortProvider) and
//! [`SerialLink`](glowlink_core::SerialLink) traits using `tokio-serial`.

mod serial;

pub use serial::{NativePortProvider, NativeSerialLink};
