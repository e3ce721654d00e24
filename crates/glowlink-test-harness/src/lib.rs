//! glowlink-test-harness: mock serial capability for deterministic tests.
//!
//! [`MockSerialLink`] implements the [`SerialLink`](glowlink_core::SerialLink)
//! trait against in-memory channels, and [`MockPortProvider`] hands mock
//! links out through the [`PortProvider`](glowlink_core::PortProvider)
//! trait. Tests script the device side through a [`MockLinkHandle`]:
//! inject inbound chunks, end the stream, fault it, hold an `open` call in
//! flight, and inspect everything the manager wrote or closed.
//!
//! # Example
//!
//! ```
//! use glowlink_test_harness::{MockPortProvider, MockSerialLink};
//!
//! let (link, handle) = MockSerialLink::new();
//! let provider = MockPortProvider::new();
//! provider.add_link(link);
//!
//! // Later, from the test: feed the device side.
//! handle.push_chunk(b"{\"status\":\"ok\"}\n");
//! ```

mod mock_link;

pub use mock_link::{HeldOpen, MockLinkHandle, MockPortProvider, MockSerialLink};
