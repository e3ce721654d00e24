//! Mock implementations of the serial capability traits.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use glowlink_core::{ConnectOptions, Error, PortProvider, Result, SerialLink};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// What the scripted device does next on the read side.
enum ReadEvent {
    Data(Vec<u8>),
    Eof,
    Fault(String),
}

struct LinkState {
    opened: AtomicBool,
    open_count: AtomicUsize,
    close_count: AtomicUsize,
    written: Mutex<Vec<Vec<u8>>>,
    open_options: Mutex<Option<ConnectOptions>>,
    open_error: Mutex<Option<Error>>,
    open_gate: Mutex<Option<(oneshot::Sender<()>, oneshot::Receiver<()>)>>,
}

/// A mock [`SerialLink`] driven from the test through a [`MockLinkHandle`].
///
/// Reads block until the handle pushes a chunk, an end-of-stream marker, or
/// a fault. Chunks larger than the caller's buffer are delivered across
/// multiple reads. Writes and closes are recorded for inspection.
pub struct MockSerialLink {
    state: Arc<LinkState>,
    read_rx: mpsc::UnboundedReceiver<ReadEvent>,
    /// Remainder of a pushed chunk that did not fit the last read buffer.
    pending: Vec<u8>,
}

impl MockSerialLink {
    /// Create a link plus the handle that scripts and inspects it.
    pub fn new() -> (MockSerialLink, MockLinkHandle) {
        let (read_tx, read_rx) = mpsc::unbounded_channel();
        let state = Arc::new(LinkState {
            opened: AtomicBool::new(false),
            open_count: AtomicUsize::new(0),
            close_count: AtomicUsize::new(0),
            written: Mutex::new(Vec::new()),
            open_options: Mutex::new(None),
            open_error: Mutex::new(None),
            open_gate: Mutex::new(None),
        });
        (
            MockSerialLink {
                state: Arc::clone(&state),
                read_rx,
                pending: Vec::new(),
            },
            MockLinkHandle { state, read_tx },
        )
    }
}

#[async_trait]
impl SerialLink for MockSerialLink {
    async fn open(&mut self, options: &ConnectOptions) -> Result<()> {
        let gate = lock(&self.state.open_gate).take();
        if let Some((started_tx, release_rx)) = gate {
            let _ = started_tx.send(());
            let _ = release_rx.await;
        }
        if let Some(err) = lock(&self.state.open_error).take() {
            return Err(err);
        }
        *lock(&self.state.open_options) = Some(options.clone());
        self.state.opened.store(true, Ordering::SeqCst);
        self.state.open_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if !self.state.opened.load(Ordering::SeqCst) {
            return Err(Error::NotConnected);
        }
        while self.pending.is_empty() {
            match self.read_rx.recv().await {
                Some(ReadEvent::Data(bytes)) if !bytes.is_empty() => self.pending = bytes,
                Some(ReadEvent::Data(_)) => continue,
                Some(ReadEvent::Eof) | None => return Ok(0),
                Some(ReadEvent::Fault(message)) => return Err(Error::Stream(message)),
            }
        }
        let n = self.pending.len().min(buf.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        Ok(n)
    }

    async fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        if !self.state.opened.load(Ordering::SeqCst) {
            return Err(Error::NotConnected);
        }
        lock(&self.state.written).push(bytes.to_vec());
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.state.opened.store(false, Ordering::SeqCst);
        self.state.close_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Test-side controller and inspector for one [`MockSerialLink`].
///
/// Stays valid after the link is handed to a manager; all state is shared.
#[derive(Clone)]
pub struct MockLinkHandle {
    state: Arc<LinkState>,
    read_tx: mpsc::UnboundedSender<ReadEvent>,
}

impl MockLinkHandle {
    /// Deliver a chunk of inbound bytes to the next read.
    pub fn push_chunk(&self, bytes: &[u8]) {
        let _ = self.read_tx.send(ReadEvent::Data(bytes.to_vec()));
    }

    /// End the inbound stream: the next read returns 0 bytes.
    pub fn push_eof(&self) {
        let _ = self.read_tx.send(ReadEvent::Eof);
    }

    /// Fault the inbound stream: the next read fails with
    /// [`Error::Stream`], as an unplugged device would.
    pub fn push_fault(&self, message: &str) {
        let _ = self.read_tx.send(ReadEvent::Fault(message.to_string()));
    }

    /// Make the next `open` call fail with the given error.
    pub fn fail_open(&self, error: Error) {
        *lock(&self.state.open_error) = Some(error);
    }

    /// Hold the next `open` call until [`HeldOpen::release`] is called.
    ///
    /// Lets tests park a connect attempt mid-open and race a disconnect
    /// against it.
    pub fn hold_open(&self) -> HeldOpen {
        let (started_tx, started_rx) = oneshot::channel();
        let (release_tx, release_rx) = oneshot::channel();
        *lock(&self.state.open_gate) = Some((started_tx, release_rx));
        HeldOpen {
            started: started_rx,
            release: Some(release_tx),
        }
    }

    /// Whether the link is currently open.
    pub fn is_open(&self) -> bool {
        self.state.opened.load(Ordering::SeqCst)
    }

    /// Number of successful `open` calls so far.
    pub fn open_count(&self) -> usize {
        self.state.open_count.load(Ordering::SeqCst)
    }

    /// Number of `close` calls so far.
    pub fn close_count(&self) -> usize {
        self.state.close_count.load(Ordering::SeqCst)
    }

    /// The options passed to the most recent successful `open`.
    pub fn open_options(&self) -> Option<ConnectOptions> {
        lock(&self.state.open_options).clone()
    }

    /// Every write so far, one element per `write_all` call.
    pub fn written(&self) -> Vec<Vec<u8>> {
        lock(&self.state.written).clone()
    }
}

/// An `open` call parked by [`MockLinkHandle::hold_open`].
pub struct HeldOpen {
    started: oneshot::Receiver<()>,
    release: Option<oneshot::Sender<()>>,
}

impl HeldOpen {
    /// Wait until the manager has actually entered the held `open` call.
    pub async fn opening(&mut self) {
        let _ = (&mut self.started).await;
    }

    /// Let the held `open` call complete.
    pub fn release(mut self) {
        if let Some(release) = self.release.take() {
            let _ = release.send(());
        }
    }
}

/// A mock [`PortProvider`] with a scripted queue of links.
///
/// `request_port` hands out queued links in order and fails with
/// [`Error::PortAcquisition`] once the queue is empty or when requests have
/// been denied (the "user declined the picker" case).
pub struct MockPortProvider {
    supported: bool,
    links: Mutex<VecDeque<MockSerialLink>>,
    deny_message: Mutex<Option<String>>,
}

impl MockPortProvider {
    /// A supported provider with an empty link queue.
    pub fn new() -> Self {
        MockPortProvider {
            supported: true,
            links: Mutex::new(VecDeque::new()),
            deny_message: Mutex::new(None),
        }
    }

    /// A provider whose host has no serial capability at all.
    pub fn unsupported() -> Self {
        MockPortProvider {
            supported: false,
            ..MockPortProvider::new()
        }
    }

    /// Queue a link to be handed out by the next `request_port` call.
    pub fn add_link(&self, link: MockSerialLink) {
        lock(&self.links).push_back(link);
    }

    /// Make every `request_port` call fail, as if the user declined.
    pub fn deny_requests(&self, message: &str) {
        *lock(&self.deny_message) = Some(message.to_string());
    }
}

impl Default for MockPortProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PortProvider for MockPortProvider {
    fn is_supported(&self) -> bool {
        self.supported
    }

    async fn request_port(&self) -> Result<Box<dyn SerialLink>> {
        if let Some(message) = lock(&self.deny_message).clone() {
            return Err(Error::PortAcquisition(message));
        }
        lock(&self.links)
            .pop_front()
            .map(|link| Box::new(link) as Box<dyn SerialLink>)
            .ok_or_else(|| Error::PortAcquisition("no serial device selected".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn read_returns_pushed_chunks() {
        let (mut link, handle) = MockSerialLink::new();
        link.open(&ConnectOptions::default()).await.unwrap();

        handle.push_chunk(b"hello");
        let mut buf = [0u8; 64];
        let n = link.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"hello");
    }

    #[tokio::test]
    async fn oversized_chunks_span_multiple_reads() {
        let (mut link, handle) = MockSerialLink::new();
        link.open(&ConnectOptions::default()).await.unwrap();

        handle.push_chunk(b"abcdef");
        let mut buf = [0u8; 4];
        let n = link.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"abcd");
        let n = link.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"ef");
    }

    #[tokio::test]
    async fn eof_reads_as_zero_bytes() {
        let (mut link, handle) = MockSerialLink::new();
        link.open(&ConnectOptions::default()).await.unwrap();

        handle.push_eof();
        let mut buf = [0u8; 8];
        assert_eq!(link.read(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn fault_reads_as_stream_error() {
        let (mut link, handle) = MockSerialLink::new();
        link.open(&ConnectOptions::default()).await.unwrap();

        handle.push_fault("unplugged");
        let mut buf = [0u8; 8];
        let result = link.read(&mut buf).await;
        assert!(matches!(result, Err(Error::Stream(_))));
    }

    #[tokio::test]
    async fn io_before_open_is_not_connected() {
        let (mut link, _handle) = MockSerialLink::new();
        let mut buf = [0u8; 8];
        assert!(matches!(link.read(&mut buf).await, Err(Error::NotConnected)));
        assert!(matches!(
            link.write_all(b"x").await,
            Err(Error::NotConnected)
        ));
    }

    #[tokio::test]
    async fn writes_and_closes_are_recorded() {
        let (mut link, handle) = MockSerialLink::new();
        link.open(&ConnectOptions::default()).await.unwrap();

        link.write_all(b"one").await.unwrap();
        link.write_all(b"two").await.unwrap();
        link.close().await.unwrap();

        assert_eq!(handle.written(), vec![b"one".to_vec(), b"two".to_vec()]);
        assert_eq!(handle.close_count(), 1);
        assert!(!handle.is_open());
    }

    #[tokio::test]
    async fn failed_open_consumes_the_scripted_error() {
        let (mut link, handle) = MockSerialLink::new();
        handle.fail_open(Error::Open("busy".into()));

        assert!(matches!(
            link.open(&ConnectOptions::default()).await,
            Err(Error::Open(_))
        ));
        assert!(!handle.is_open());

        // The error was one-shot; a retry succeeds.
        link.open(&ConnectOptions::default()).await.unwrap();
        assert!(handle.is_open());
    }

    #[tokio::test]
    async fn held_open_blocks_until_released() {
        let (mut link, handle) = MockSerialLink::new();
        let mut held = handle.hold_open();

        let open_task = tokio::spawn(async move {
            link.open(&ConnectOptions::default()).await.unwrap();
            link
        });

        held.opening().await;
        assert!(!handle.is_open());

        held.release();
        let _link = open_task.await.unwrap();
        assert!(handle.is_open());
    }

    #[tokio::test]
    async fn provider_hands_out_queued_links_then_fails() {
        let provider = MockPortProvider::new();
        let (link, _handle) = MockSerialLink::new();
        provider.add_link(link);

        assert!(provider.is_supported());
        assert!(provider.request_port().await.is_ok());
        assert!(matches!(
            provider.request_port().await,
            Err(Error::PortAcquisition(_))
        ));
    }

    #[tokio::test]
    async fn denied_provider_rejects_every_request() {
        let provider = MockPortProvider::new();
        let (link, _handle) = MockSerialLink::new();
        provider.add_link(link);
        provider.deny_requests("user cancelled");

        assert!(matches!(
            provider.request_port().await,
            Err(Error::PortAcquisition(_))
        ));
    }

    #[test]
    fn unsupported_provider_reports_it() {
        let provider = MockPortProvider::unsupported();
        assert!(!provider.is_supported());
    }
}
