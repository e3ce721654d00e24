//! The serial connection manager.
//!
//! [`SerialManager`] owns one serial port at a time and drives its whole
//! lifecycle: port selection, open, the read loop, sending, and teardown.
//! It is an explicitly constructed object -- create as many managers as you
//! have ports (or tests) -- and a cheap clone, so UI tasks can share one
//! handle freely.
//!
//! The state machine is the heart of the crate. The transitions:
//!
//! ```text
//! disconnected -> connecting    connect()
//! connecting   -> connected     open succeeded, handles acquired
//! connecting   -> disconnected  open failed, or aborted by disconnect()
//! connected    -> disconnecting disconnect()
//! connected    -> error         read loop fault (teardown follows)
//! disconnecting -> disconnected always
//! ```
//!
//! Two concurrency properties hold no matter how callers interleave:
//! a `disconnect()` racing an in-flight `connect()` makes the attempt fail
//! with [`Error::Aborted`] and the freshly opened port is closed rather
//! than orphaned; and any number of concurrent `disconnect()` calls share
//! a single teardown with exactly one underlying close.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::oneshot;
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use glowlink_core::{
    ConnectOptions, ConnectionStatus, DataEvent, Direction, Error, LogEntry, PortProvider,
    Result, StatusEvent,
};

use crate::bus::{EventBus, Subscription};
use crate::io::{self, WriteRequest};

const STATUS_DISCONNECTED: u8 = 0;
const STATUS_CONNECTING: u8 = 1;
const STATUS_CONNECTED: u8 = 2;
const STATUS_DISCONNECTING: u8 = 3;
const STATUS_ERROR: u8 = 4;

fn encode_status(status: ConnectionStatus) -> u8 {
    match status {
        ConnectionStatus::Disconnected => STATUS_DISCONNECTED,
        ConnectionStatus::Connecting => STATUS_CONNECTING,
        ConnectionStatus::Connected => STATUS_CONNECTED,
        ConnectionStatus::Disconnecting => STATUS_DISCONNECTING,
        ConnectionStatus::Error => STATUS_ERROR,
    }
}

fn decode_status(value: u8) -> ConnectionStatus {
    match value {
        STATUS_CONNECTING => ConnectionStatus::Connecting,
        STATUS_CONNECTED => ConnectionStatus::Connected,
        STATUS_DISCONNECTING => ConnectionStatus::Disconnecting,
        STATUS_ERROR => ConnectionStatus::Error,
        _ => ConnectionStatus::Disconnected,
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// An outbound message: raw text, or a structured value serialized to its
/// compact JSON form before framing.
#[derive(Debug, Clone)]
pub enum Payload {
    Text(String),
    Value(serde_json::Value),
}

impl Payload {
    fn into_text(self) -> String {
        match self {
            Payload::Text(text) => text,
            Payload::Value(value) => value.to_string(),
        }
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_string())
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl From<serde_json::Value> for Payload {
    fn from(value: serde_json::Value) -> Self {
        Payload::Value(value)
    }
}

/// The live connection: everything that exists only between a successful
/// open and teardown. The IO task inside `io` owns the port exclusively;
/// the write queue and cancellation token are the only ways in.
struct Connection {
    io: io::LinkIo,
}

/// Outcome of claiming the `disconnected -> connecting` edge.
enum Begin {
    Started,
    AlreadyConnected,
    Busy,
}

pub(crate) struct Shared {
    provider: Box<dyn PortProvider>,
    status: AtomicU8,
    bus: EventBus,
    log: Mutex<Vec<LogEntry>>,
    max_log_entries: usize,
    connection: Mutex<Option<Connection>>,
    cancel: Mutex<Option<CancellationToken>>,
    teardown_gate: AsyncMutex<()>,
}

impl Shared {
    pub(crate) fn status(&self) -> ConnectionStatus {
        decode_status(self.status.load(Ordering::SeqCst))
    }

    fn try_begin_connecting(&self) -> Begin {
        match self.status.compare_exchange(
            STATUS_DISCONNECTED,
            STATUS_CONNECTING,
            Ordering::SeqCst,
            Ordering::SeqCst,
        ) {
            Ok(_) => Begin::Started,
            Err(current) if current == STATUS_CONNECTED => Begin::AlreadyConnected,
            Err(_) => Begin::Busy,
        }
    }

    fn try_commit_connected(&self) -> bool {
        self.status
            .compare_exchange(
                STATUS_CONNECTING,
                STATUS_CONNECTED,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }

    /// Emit a status event (and, for failures, an inbound log entry).
    /// The status value itself must already be current.
    fn emit_status(&self, status: ConnectionStatus, error: Option<Error>) {
        self.bus.emit_status(&StatusEvent {
            status,
            error: error.clone(),
        });
        if let Some(err) = error {
            self.push_log(Direction::Inbound, format!("Error: {err}"));
        }
    }

    fn set_status(&self, status: ConnectionStatus, error: Option<Error>) {
        self.status.store(encode_status(status), Ordering::SeqCst);
        self.emit_status(status, error);
    }

    /// Append a transport-log entry and notify log listeners. The log is
    /// bounded: oldest entries drop first once the capacity is reached.
    pub(crate) fn push_log(&self, direction: Direction, payload: String) {
        let entry = LogEntry::new(direction, payload);
        {
            let mut log = lock(&self.log);
            log.push(entry.clone());
            if log.len() > self.max_log_entries {
                log.remove(0);
            }
        }
        self.bus.emit_log(&entry);
    }

    /// Publish one received line: a data event and an inbound log entry,
    /// each exactly once.
    pub(crate) fn publish_data(&self, line: String, value: Option<serde_json::Value>) {
        self.bus.emit_data(&DataEvent {
            line: line.clone(),
            value,
        });
        self.push_log(Direction::Inbound, line);
    }

    /// Tear the connection down, converging on `disconnected`.
    ///
    /// Single-flight: concurrent callers queue on the gate; whoever gets
    /// there first performs the close, the rest observe the finished state
    /// and return. Never fails -- errors during close are logged and
    /// swallowed.
    pub(crate) async fn teardown(&self) {
        let _gate = self.teardown_gate.lock().await;
        if self.status() == ConnectionStatus::Disconnected {
            return;
        }

        self.set_status(ConnectionStatus::Disconnecting, None);

        if let Some(token) = lock(&self.cancel).take() {
            token.cancel();
        }

        let connection = lock(&self.connection).take();
        if let Some(connection) = connection {
            // The IO task exits on cancellation and hands the link back;
            // the one and only close happens here.
            connection.io.cancel.cancel();
            match connection.io.task.await {
                Ok(mut link) => {
                    if let Err(err) = link.close().await {
                        warn!(error = %err, "error closing serial port (ignored)");
                    }
                }
                Err(err) => {
                    warn!(error = %err, "io task did not shut down cleanly");
                }
            }
        }

        self.set_status(ConnectionStatus::Disconnected, None);
        self.push_log(Direction::Inbound, "Disconnected".to_string());
    }
}

/// Connection manager for one serial port.
///
/// See the [module docs](self) for the state machine. Constructed via
/// [`SerialManager::new`] or [`SerialManagerBuilder`](crate::SerialManagerBuilder)
/// with an injected [`PortProvider`], so the same logic runs against real
/// hardware and against mocks.
#[derive(Clone)]
pub struct SerialManager {
    shared: Arc<Shared>,
}

impl SerialManager {
    /// Create a manager with default settings over the given provider.
    pub fn new(provider: Box<dyn PortProvider>) -> Self {
        crate::builder::SerialManagerBuilder::new(provider).build()
    }

    pub(crate) fn from_parts(provider: Box<dyn PortProvider>, max_log_entries: usize) -> Self {
        SerialManager {
            shared: Arc::new(Shared {
                provider,
                status: AtomicU8::new(STATUS_DISCONNECTED),
                bus: EventBus::new(),
                log: Mutex::new(Vec::new()),
                max_log_entries,
                connection: Mutex::new(None),
                cancel: Mutex::new(None),
                teardown_gate: AsyncMutex::new(()),
            }),
        }
    }

    /// Whether the host exposes a serial capability at all.
    pub fn is_supported(&self) -> bool {
        self.shared.provider.is_supported()
    }

    /// The current connection status.
    pub fn status(&self) -> ConnectionStatus {
        self.shared.status()
    }

    /// Whether a connection is currently established.
    pub fn is_connected(&self) -> bool {
        self.status() == ConnectionStatus::Connected
    }

    /// Select a port, open it, and start the read loop.
    ///
    /// Emits a `connecting` status event immediately, then either
    /// `connected`, or `disconnected` with the failure attached. Returns
    /// `Ok(())` without side effects when already connected, and
    /// [`Error::Busy`] while another attempt or a teardown is in flight.
    ///
    /// A concurrent [`disconnect`](SerialManager::disconnect) aborts the
    /// attempt: `connect` returns [`Error::Aborted`] and the port, if the
    /// open had already succeeded, is closed rather than orphaned.
    pub async fn connect(&self, options: ConnectOptions) -> Result<()> {
        if !self.shared.provider.is_supported() {
            return Err(Error::Unsupported);
        }

        match self.shared.try_begin_connecting() {
            Begin::Started => {}
            Begin::AlreadyConnected => return Ok(()),
            Begin::Busy => return Err(Error::Busy),
        }
        self.shared.emit_status(ConnectionStatus::Connecting, None);

        let cancel = CancellationToken::new();
        *lock(&self.shared.cancel) = Some(cancel.clone());

        match self.open_link(&options, &cancel).await {
            Ok(()) => Ok(()),
            Err(err) => {
                self.shared
                    .set_status(ConnectionStatus::Disconnected, Some(err.clone()));
                Err(err)
            }
        }
    }

    async fn open_link(&self, options: &ConnectOptions, cancel: &CancellationToken) -> Result<()> {
        let mut link = self.shared.provider.request_port().await?;
        link.open(options).await?;

        // The open itself cannot be interrupted, so the intent to abort is
        // recorded in the token and checked the moment the open resolves.
        // A port opened for an abandoned attempt is closed, never orphaned.
        if cancel.is_cancelled() {
            if let Err(err) = link.close().await {
                warn!(error = %err, "error closing aborted serial port (ignored)");
            }
            return Err(Error::Aborted);
        }

        let (fault_tx, fault_rx) = oneshot::channel();
        let mut link = Some(link);

        // Commit under the connection lock: a teardown that starts during
        // the commit either finds the live connection in the slot (and
        // closes it), or wins the status race, in which case this attempt
        // still owns the port and closes it below.
        let committed = {
            let mut slot = lock(&self.shared.connection);
            match (self.shared.try_commit_connected(), link.take()) {
                (true, Some(link)) => {
                    let io = io::spawn_io_task(
                        link,
                        Arc::clone(&self.shared),
                        cancel.clone(),
                        fault_tx,
                    );
                    *slot = Some(Connection { io });
                    true
                }
                (_, remaining) => {
                    link = remaining;
                    false
                }
            }
        };

        if !committed {
            if let Some(mut link) = link.take() {
                if let Err(err) = link.close().await {
                    warn!(error = %err, "error closing aborted serial port (ignored)");
                }
            }
            return Err(Error::Aborted);
        }

        self.shared.emit_status(ConnectionStatus::Connected, None);
        self.shared
            .push_log(Direction::Inbound, "Connected to serial port".to_string());

        // Watch for read-loop faults for the lifetime of this connection.
        // A fault is not surfaced to any caller -- nothing is awaiting it --
        // so it drives the status stream instead: error, then teardown.
        // The token check keeps a fault delivered late, after this
        // connection's teardown already ran, from touching a successor.
        let shared = Arc::clone(&self.shared);
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Ok(err) = fault_rx.await {
                if cancel.is_cancelled() || shared.status() != ConnectionStatus::Connected {
                    return;
                }
                debug!(error = %err, "read loop fault, tearing down");
                shared.set_status(ConnectionStatus::Error, Some(err));
                shared.teardown().await;
            }
        });

        Ok(())
    }

    /// Tear down the current connection, cancelling an in-flight connect.
    ///
    /// Idempotent and concurrency-safe: parallel callers share one
    /// teardown, the underlying close runs exactly once, and every caller
    /// returns only after the port is closed and the status is
    /// `disconnected`. Never fails; close errors are swallowed.
    pub async fn disconnect(&self) {
        self.shared.teardown().await;
    }

    /// Serialize `payload`, append the line terminator, and write it.
    ///
    /// Fails with [`Error::NotConnected`] (before any I/O) unless the
    /// status is `connected`. On success an outbound log entry is recorded
    /// with the payload text.
    pub async fn send(&self, payload: impl Into<Payload>) -> Result<()> {
        let payload = payload.into();
        if self.shared.status() != ConnectionStatus::Connected {
            return Err(Error::NotConnected);
        }
        let write_tx = lock(&self.shared.connection)
            .as_ref()
            .map(|connection| connection.io.write_tx.clone())
            .ok_or(Error::NotConnected)?;

        let text = payload.into_text();
        let mut line = text.clone();
        line.push('\n');

        let (reply_tx, reply_rx) = oneshot::channel();
        write_tx
            .send(WriteRequest {
                bytes: line.into_bytes(),
                reply: reply_tx,
            })
            .await
            .map_err(|_| Error::NotConnected)?;
        reply_rx.await.map_err(|_| Error::NotConnected)??;

        self.shared.push_log(Direction::Outbound, text);
        Ok(())
    }

    /// Subscribe to status transitions.
    pub fn on_status(
        &self,
        listener: impl Fn(&StatusEvent) + Send + Sync + 'static,
    ) -> Subscription {
        self.shared.bus.on_status(listener)
    }

    /// Subscribe to received lines.
    pub fn on_data(&self, listener: impl Fn(&DataEvent) + Send + Sync + 'static) -> Subscription {
        self.shared.bus.on_data(listener)
    }

    /// Subscribe to transport-log appends.
    pub fn on_log(&self, listener: impl Fn(&LogEntry) + Send + Sync + 'static) -> Subscription {
        self.shared.bus.on_log(listener)
    }

    /// Snapshot of the transport log, oldest entry first.
    pub fn log(&self) -> Vec<LogEntry> {
        lock(&self.shared.log).clone()
    }

    /// Clear the transport log. The manager itself never does this.
    pub fn clear_log(&self) {
        lock(&self.shared.log).clear();
    }
}

impl std::fmt::Debug for SerialManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialManager")
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}
