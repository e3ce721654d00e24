//! Capability traits for the host serial transport.
//!
//! The manager never talks to a serial API directly. It is handed a
//! [`PortProvider`], asks it for a [`SerialLink`], and drives the link
//! through open/read/write/close. Implementations exist for native hosts
//! (`glowlink-transport`, over tokio-serial) and for tests
//! (`glowlink-test-harness`), so the connection logic is exercised without
//! hardware.

use async_trait::async_trait;

use crate::error::Result;

/// Serial line parameters for opening a port.
///
/// Defaults match the controllers' USB CDC ports: 115 200 baud, 8 data
/// bits, 1 stop bit, no parity, no flow control. Most transports only care
/// about the baud rate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectOptions {
    /// Baud rate (e.g. 9600, 115200).
    pub baud_rate: u32,
    /// Number of data bits per character (typically 8).
    pub data_bits: DataBits,
    /// Number of stop bits per character (typically 1).
    pub stop_bits: StopBits,
    /// Parity checking (typically none).
    pub parity: Parity,
    /// Flow control (typically none).
    pub flow_control: FlowControl,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        ConnectOptions {
            baud_rate: 115_200,
            data_bits: DataBits::Eight,
            stop_bits: StopBits::One,
            parity: Parity::None,
            flow_control: FlowControl::None,
        }
    }
}

impl ConnectOptions {
    /// Options with the given baud rate and conventional 8N1 settings.
    pub fn baud(baud_rate: u32) -> Self {
        ConnectOptions {
            baud_rate,
            ..Default::default()
        }
    }
}

/// Number of data bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataBits {
    Five,
    Six,
    Seven,
    Eight,
}

/// Number of stop bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopBits {
    One,
    Two,
}

/// Parity checking mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    None,
    Odd,
    Even,
}

/// Flow control mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowControl {
    None,
    Software,
    Hardware,
}

/// Host capability for discovering and handing out serial ports.
///
/// The analog of a browser's port picker: `request_port` may involve user
/// interaction or device enumeration and fails with
/// [`Error::PortAcquisition`](crate::Error::PortAcquisition) when nothing
/// was selected.
#[async_trait]
pub trait PortProvider: Send + Sync {
    /// Whether this host exposes a serial capability at all.
    fn is_supported(&self) -> bool;

    /// Select a port and return it, unopened.
    async fn request_port(&self) -> Result<Box<dyn SerialLink>>;
}

/// A single serial port: open it, move bytes, close it.
///
/// The manager owns the link exclusively for the lifetime of one
/// connection; no other component touches it.
#[async_trait]
pub trait SerialLink: Send {
    /// Open the port with the given line parameters.
    async fn open(&mut self, options: &ConnectOptions) -> Result<()>;

    /// Read the next chunk of bytes into `buf`, waiting until data arrives.
    ///
    /// Returns `Ok(0)` at end of stream. Errors model stream faults,
    /// including device unplug. Implementations must be cancel-safe:
    /// dropping the returned future before completion must not lose
    /// buffered data.
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Write all of `bytes` to the port.
    async fn write_all(&mut self, bytes: &[u8]) -> Result<()>;

    /// Close the port. Safe to call on a port that never opened.
    async fn close(&mut self) -> Result<()>;
}
