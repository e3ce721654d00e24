//! Native serial port transport.
//!
//! Lighting controllers enumerate as USB CDC virtual COM ports. This module
//! opens them with `tokio-serial` and adapts the stream to the glowlink
//! capability traits.
//!
//! # Example
//!
//! ```no_run
//! use glowlink_core::{ConnectOptions, SerialLink};
//! use glowlink_transport::NativeSerialLink;
//!
//! # async fn example() -> glowlink_core::Result<()> {
//! let mut link = NativeSerialLink::new("/dev/ttyACM0");
//! link.open(&ConnectOptions::baud(115_200)).await?;
//! link.write_all(b"{\"cmd\":\"ping\"}\n").await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{SerialPortBuilderExt, SerialStream};

use glowlink_core::{
    ConnectOptions, DataBits, Error, FlowControl, Parity, PortProvider, Result, SerialLink,
    StopBits,
};

fn serial_data_bits(bits: DataBits) -> tokio_serial::DataBits {
    match bits {
        DataBits::Five => tokio_serial::DataBits::Five,
        DataBits::Six => tokio_serial::DataBits::Six,
        DataBits::Seven => tokio_serial::DataBits::Seven,
        DataBits::Eight => tokio_serial::DataBits::Eight,
    }
}

fn serial_stop_bits(bits: StopBits) -> tokio_serial::StopBits {
    match bits {
        StopBits::One => tokio_serial::StopBits::One,
        StopBits::Two => tokio_serial::StopBits::Two,
    }
}

fn serial_parity(parity: Parity) -> tokio_serial::Parity {
    match parity {
        Parity::None => tokio_serial::Parity::None,
        Parity::Odd => tokio_serial::Parity::Odd,
        Parity::Even => tokio_serial::Parity::Even,
    }
}

fn serial_flow_control(flow: FlowControl) -> tokio_serial::FlowControl {
    match flow {
        FlowControl::None => tokio_serial::FlowControl::None,
        FlowControl::Software => tokio_serial::FlowControl::Software,
        FlowControl::Hardware => tokio_serial::FlowControl::Hardware,
    }
}

/// Map an I/O error on an active stream to the glowlink taxonomy: broken
/// pipes and vanished devices are stream faults, everything else is I/O.
fn map_stream_error(err: std::io::Error) -> Error {
    if err.kind() == std::io::ErrorKind::BrokenPipe
        || err.kind() == std::io::ErrorKind::NotConnected
    {
        Error::Stream(format!("device disconnected: {err}"))
    } else {
        err.into()
    }
}

/// Native [`PortProvider`] for hosts with a real serial stack.
///
/// Either pins a specific device path, or picks the first enumerated port
/// at request time (the closest native analog to a browser port picker on
/// a machine with one controller plugged in).
pub struct NativePortProvider {
    path: Option<String>,
}

impl NativePortProvider {
    /// A provider that always hands out the given device path.
    pub fn new(path: impl Into<String>) -> Self {
        NativePortProvider {
            path: Some(path.into()),
        }
    }

    /// A provider that picks the first enumerated serial device at
    /// request time.
    pub fn first_available() -> Self {
        NativePortProvider { path: None }
    }

    /// Enumerate the serial device paths present on this host.
    pub fn available_ports() -> Result<Vec<String>> {
        tokio_serial::available_ports()
            .map(|ports| ports.into_iter().map(|port| port.port_name).collect())
            .map_err(|err| Error::PortAcquisition(err.to_string()))
    }
}

#[async_trait]
impl PortProvider for NativePortProvider {
    fn is_supported(&self) -> bool {
        tokio_serial::available_ports().is_ok()
    }

    async fn request_port(&self) -> Result<Box<dyn SerialLink>> {
        let path = match &self.path {
            Some(path) => path.clone(),
            None => Self::available_ports()?
                .into_iter()
                .next()
                .ok_or_else(|| Error::PortAcquisition("no serial devices present".into()))?,
        };
        Ok(Box::new(NativeSerialLink::new(path)))
    }
}

/// A native [`SerialLink`] over a `tokio-serial` stream.
pub struct NativeSerialLink {
    path: String,
    stream: Option<SerialStream>,
}

impl NativeSerialLink {
    /// A link for the given device path, not yet opened.
    pub fn new(path: impl Into<String>) -> Self {
        NativeSerialLink {
            path: path.into(),
            stream: None,
        }
    }

    /// The device path this link targets.
    pub fn path(&self) -> &str {
        &self.path
    }
}

#[async_trait]
impl SerialLink for NativeSerialLink {
    async fn open(&mut self, options: &ConnectOptions) -> Result<()> {
        tracing::debug!(
            path = %self.path,
            baud_rate = options.baud_rate,
            data_bits = ?options.data_bits,
            stop_bits = ?options.stop_bits,
            parity = ?options.parity,
            flow_control = ?options.flow_control,
            "opening serial port"
        );

        let stream = tokio_serial::new(self.path.as_str(), options.baud_rate)
            .data_bits(serial_data_bits(options.data_bits))
            .stop_bits(serial_stop_bits(options.stop_bits))
            .parity(serial_parity(options.parity))
            .flow_control(serial_flow_control(options.flow_control))
            .open_native_async()
            .map_err(|err| {
                tracing::error!(path = %self.path, error = %err, "failed to open serial port");
                Error::Open(format!("{}: {}", self.path, err))
            })?;

        tracing::info!(path = %self.path, baud_rate = options.baud_rate, "serial port opened");
        self.stream = Some(stream);
        Ok(())
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;
        match stream.read(buf).await {
            Ok(n) => {
                tracing::trace!(path = %self.path, bytes = n, "received data");
                Ok(n)
            }
            Err(err) => {
                tracing::error!(path = %self.path, error = %err, "read failed");
                Err(map_stream_error(err))
            }
        }
    }

    async fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;

        tracing::trace!(path = %self.path, bytes = bytes.len(), "sending data");
        stream.write_all(bytes).await.map_err(|err| {
            tracing::error!(path = %self.path, error = %err, "write failed");
            map_stream_error(err)
        })?;

        // Flush so short command lines reach the controller immediately.
        stream.flush().await.map_err(|err| {
            tracing::error!(path = %self.path, error = %err, "flush failed");
            map_stream_error(err)
        })?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut stream) = self.stream.take() {
            tracing::debug!(path = %self.path, "closing serial port");
            if let Err(err) = stream.flush().await {
                tracing::warn!(
                    path = %self.path,
                    error = %err,
                    "flush before close failed (continuing)"
                );
            }
            // Dropping the stream closes the port.
            tracing::info!(path = %self.path, "serial port closed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_bits_conversion() {
        let _: tokio_serial::DataBits = serial_data_bits(DataBits::Five);
        let _: tokio_serial::DataBits = serial_data_bits(DataBits::Six);
        let _: tokio_serial::DataBits = serial_data_bits(DataBits::Seven);
        let _: tokio_serial::DataBits = serial_data_bits(DataBits::Eight);
    }

    #[test]
    fn stop_bits_conversion() {
        let _: tokio_serial::StopBits = serial_stop_bits(StopBits::One);
        let _: tokio_serial::StopBits = serial_stop_bits(StopBits::Two);
    }

    #[test]
    fn parity_conversion() {
        let _: tokio_serial::Parity = serial_parity(Parity::None);
        let _: tokio_serial::Parity = serial_parity(Parity::Odd);
        let _: tokio_serial::Parity = serial_parity(Parity::Even);
    }

    #[test]
    fn flow_control_conversion() {
        let _: tokio_serial::FlowControl = serial_flow_control(FlowControl::None);
        let _: tokio_serial::FlowControl = serial_flow_control(FlowControl::Software);
        let _: tokio_serial::FlowControl = serial_flow_control(FlowControl::Hardware);
    }

    #[test]
    fn stream_error_mapping() {
        let broken = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone");
        assert!(matches!(map_stream_error(broken), Error::Stream(_)));

        let other = std::io::Error::new(std::io::ErrorKind::InvalidData, "noise");
        assert!(matches!(map_stream_error(other), Error::Io(_)));
    }

    #[tokio::test]
    async fn io_before_open_is_not_connected() {
        let mut link = NativeSerialLink::new("/dev/ttyACM0");
        let mut buf = [0u8; 8];
        assert!(matches!(link.read(&mut buf).await, Err(Error::NotConnected)));
        assert!(matches!(
            link.write_all(b"x").await,
            Err(Error::NotConnected)
        ));
    }

    #[tokio::test]
    async fn close_without_open_is_fine() {
        let mut link = NativeSerialLink::new("/dev/ttyACM0");
        assert!(link.close().await.is_ok());
        assert_eq!(link.path(), "/dev/ttyACM0");
    }
}
