//! IO task for an open serial link.
//!
//! This module implements the single-IO-task pattern: one tokio task owns
//! the opened [`SerialLink`] exclusively and processes everything that
//! touches it -- outbound writes, the inbound read loop, and shutdown.
//! Nothing else in the process ever holds the port.
//!
//! The task exits when its cancellation token fires and hands the link back
//! through its join handle, so the teardown path can invoke the one and
//! only `close()`.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use glowlink_core::{Error, LineFramer, Result, SerialLink};

use crate::manager::Shared;

/// Depth of the outbound write queue.
pub(crate) const WRITE_QUEUE_DEPTH: usize = 32;

/// Size of the inbound read buffer. Controller messages are short lines;
/// 1 KiB per read is generous headroom.
const READ_BUF: usize = 1024;

/// An outbound write routed through the IO task.
pub(crate) struct WriteRequest {
    pub bytes: Vec<u8>,
    pub reply: oneshot::Sender<Result<()>>,
}

/// Handle to the IO task. Stored inside the live connection.
pub(crate) struct LinkIo {
    /// Outbound write queue; requests are serviced FIFO.
    pub write_tx: mpsc::Sender<WriteRequest>,
    /// Cancellation token scoped to this connection's open attempt.
    pub cancel: CancellationToken,
    /// Join handle; resolves to the link for the final close.
    pub task: JoinHandle<Box<dyn SerialLink>>,
}

/// Spawn the IO task for a freshly opened link.
///
/// `fault_tx` fires at most once, when the read side hits a stream fault;
/// the manager's monitor drives the error transition and teardown from it.
pub(crate) fn spawn_io_task(
    link: Box<dyn SerialLink>,
    shared: Arc<Shared>,
    cancel: CancellationToken,
    fault_tx: oneshot::Sender<Error>,
) -> LinkIo {
    let (write_tx, write_rx) = mpsc::channel(WRITE_QUEUE_DEPTH);
    let task = tokio::spawn(io_loop(link, shared, write_rx, cancel.clone(), fault_tx));
    LinkIo {
        write_tx,
        cancel,
        task,
    }
}

/// The main IO loop. Runs as a spawned tokio task.
///
/// Uses `tokio::select! { biased; }` to prioritize:
/// 1. Cancellation (teardown)
/// 2. Outbound write requests
/// 3. Reading the next inbound chunk
///
/// End of stream stops the read arm but keeps the loop alive so the write
/// side stays usable until teardown. A read fault also stops the read arm
/// and reports the error exactly once; bytes that would arrive after that
/// point are gone with the stream.
async fn io_loop(
    mut link: Box<dyn SerialLink>,
    shared: Arc<Shared>,
    mut write_rx: mpsc::Receiver<WriteRequest>,
    cancel: CancellationToken,
    fault_tx: oneshot::Sender<Error>,
) -> Box<dyn SerialLink> {
    let mut framer = LineFramer::new();
    let mut buf = vec![0u8; READ_BUF];
    let mut fault_tx = Some(fault_tx);
    let mut reading = true;

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                debug!("io task cancelled");
                break;
            }

            req = write_rx.recv() => match req {
                Some(WriteRequest { bytes, reply }) => {
                    let result = link.write_all(&bytes).await;
                    let _ = reply.send(result);
                }
                None => {
                    debug!("write channel closed, exiting io task");
                    break;
                }
            },

            read = link.read(&mut buf), if reading => match read {
                Ok(0) => {
                    debug!("serial stream ended");
                    reading = false;
                    if let Some(line) = framer.flush() {
                        publish_line(&shared, line);
                    }
                }
                Ok(n) => {
                    for line in framer.feed(&buf[..n]) {
                        publish_line(&shared, line);
                    }
                }
                Err(err) => {
                    debug!(error = %err, "read fault");
                    reading = false;
                    if let Some(tx) = fault_tx.take() {
                        let _ = tx.send(err);
                    }
                }
            },
        }
    }

    link
}

/// Publish one completed inbound line: a best-effort JSON parse, one data
/// event, and one inbound log entry. Parse failures are not errors -- the
/// raw text is always delivered.
fn publish_line(shared: &Shared, line: String) {
    let value = serde_json::from_str::<serde_json::Value>(&line).ok();
    shared.publish_data(line, value);
}
