//! # glowlink -- Serial connection management for Glow lighting controllers
//!
//! `glowlink` is the link layer of the Glow configuration tool: it owns one
//! serial port to an embedded lighting controller, drives the port's whole
//! open/close lifecycle, frames the byte stream into newline-delimited
//! messages, and exposes a cancellable, event-driven interface the rest of
//! the application builds on.
//!
//! ## Quick start
//!
//! ```no_run
//! use glowlink::{ConnectOptions, NativePortProvider, SerialManager};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let manager = SerialManager::new(Box::new(NativePortProvider::first_available()));
//!
//!     let sub = manager.on_data(|event| {
//!         println!("<- {}", event.line);
//!     });
//!
//!     manager.connect(ConnectOptions::default()).await?;
//!     manager.send("{\"cmd\":\"ping\"}").await?;
//!
//!     manager.disconnect().await;
//!     sub.unsubscribe();
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! The library is organized as a workspace of focused crates:
//!
//! | Crate                   | Purpose                                          |
//! |-------------------------|--------------------------------------------------|
//! | `glowlink-core`         | Traits ([`PortProvider`], [`SerialLink`]), types, errors |
//! | `glowlink-transport`    | Native serial implementation over tokio-serial   |
//! | `glowlink-manager`      | [`SerialManager`]: state machine, IO task, events, log |
//! | `glowlink-test-harness` | Mock provider/link for hardware-free tests       |
//! | **`glowlink`**          | This facade crate -- re-exports everything       |
//!
//! ## The connection lifecycle
//!
//! [`SerialManager`] holds a [`ConnectionStatus`] that moves along a fixed
//! set of edges: `disconnected -> connecting -> connected`, back down
//! through `disconnecting`, and through `error` when the read loop faults.
//! Two guarantees hold under any interleaving:
//!
//! - a `disconnect()` racing an in-flight `connect()` makes the attempt
//!   fail with [`Error::Aborted`] and closes the port once the open
//!   resolves, never leaving it orphaned;
//! - any number of concurrent `disconnect()` calls coalesce into a single
//!   teardown with exactly one underlying close.
//!
//! ## Events and the transport log
//!
//! Subscribe with [`SerialManager::on_status`], [`on_data`](SerialManager::on_data),
//! and [`on_log`](SerialManager::on_log); each returns a [`Subscription`]
//! with an explicit `unsubscribe()`. Every inbound line is delivered as a
//! [`DataEvent`] (raw text plus a best-effort JSON parse) and recorded as an
//! inbound [`LogEntry`]; every send is recorded as an outbound one.
//! [`SerialManager::log`] returns the bounded, oldest-first snapshot.

pub use glowlink_core::{
    ConnectOptions, ConnectionStatus, DataBits, DataEvent, Direction, Error, FlowControl,
    LineFramer, LogEntry, Parity, PortProvider, Result, SerialLink, StatusEvent, StopBits,
};
pub use glowlink_manager::{Payload, SerialManager, SerialManagerBuilder, Subscription};
pub use glowlink_transport::{NativePortProvider, NativeSerialLink};
