//! Serial link module
//!
//! The serial hardware collaborator behind the [`SerialLink`] trait, a
//! `serialport`-backed implementation of it, and the [`SerialForwarder`]
//! activity that pumps serial bytes toward the attached network client.

use std::io::{self, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::thread;

use crossbeam_channel::Sender;
use log::{error, info, trace};
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};

use crate::bridge::BridgeEvent;
use crate::config::SerialConfig;
use crate::error::{Error, Result};
use crate::shutdown::ShutdownToken;
use crate::slot::ConnectionSlot;

/// Interface the serial driver collaborator offers to the bridge core
///
/// The two primitives the core consumes: a poll read bounded by the
/// configured timeout, and a write. `try_clone` yields a second handle to
/// the same device so each transfer direction owns its own handle.
pub trait SerialLink: Send {
    /// Read available bytes, returning within the configured poll timeout.
    /// `Ok(0)` means no data arrived before the timeout; it is not an error.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Write a chunk verbatim to the serial device
    fn write_all(&mut self, data: &[u8]) -> Result<()>;

    /// Second handle to the same device for the opposite direction
    fn try_clone(&self) -> Result<Box<dyn SerialLink>>;
}

/// Serial link backed by a host serial device
pub struct SerialPortLink {
    port: Box<dyn SerialPort>,
}

impl SerialPortLink {
    /// Open the configured serial device
    pub fn open(config: &SerialConfig) -> Result<Self> {
        let port = serialport::new(config.device, config.baudrate)
            .data_bits(data_bits(config.data_bits))
            .parity(if config.parity { Parity::Even } else { Parity::None })
            .stop_bits(stop_bits(config.stop_bits))
            .flow_control(FlowControl::None)
            .timeout(config.poll_timeout)
            .open()
            .map_err(|e| Error::Serial(format!("failed to open {}: {}", config.device, e)))?;

        info!(
            "opened serial device {} at {} baud",
            config.device, config.baudrate
        );

        Ok(Self { port })
    }
}

impl SerialLink for SerialPortLink {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        match self.port.read(buf) {
            Ok(n) => Ok(n),
            // A poll timeout with no data is the idle case, not a failure.
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    fn write_all(&mut self, data: &[u8]) -> Result<()> {
        self.port.write_all(data)?;
        Ok(())
    }

    fn try_clone(&self) -> Result<Box<dyn SerialLink>> {
        let port = self
            .port
            .try_clone()
            .map_err(|e| Error::Serial(format!("failed to clone serial handle: {}", e)))?;
        Ok(Box::new(SerialPortLink { port }))
    }
}

fn data_bits(bits: u8) -> DataBits {
    match bits {
        5 => DataBits::Five,
        6 => DataBits::Six,
        7 => DataBits::Seven,
        _ => DataBits::Eight,
    }
}

fn stop_bits(bits: u8) -> StopBits {
    match bits {
        2 => StopBits::Two,
        _ => StopBits::One,
    }
}

/// Serial forwarder activity
///
/// Continuously polls the serial link and forwards chunks to the client
/// currently in the connection slot. A chunk whose first byte is the
/// reserved control byte is consumed instead of forwarded and reported to
/// the bridge as a device reset request.
pub struct SerialForwarder<W: Write + Send = TcpStream> {
    link: Box<dyn SerialLink>,
    slot: Arc<ConnectionSlot<W>>,
    shutdown: ShutdownToken,
    events: Sender<BridgeEvent>,
    config: SerialConfig,
}

impl<W: Write + Send> SerialForwarder<W> {
    pub fn new(
        config: SerialConfig,
        link: Box<dyn SerialLink>,
        slot: Arc<ConnectionSlot<W>>,
        shutdown: ShutdownToken,
        events: Sender<BridgeEvent>,
    ) -> Self {
        Self {
            link,
            slot,
            shutdown,
            events,
            config,
        }
    }

    /// Run the forwarding loop
    ///
    /// Returns only when shutdown is requested or the control byte arrives.
    /// Each serial read is bounded by the poll timeout, so the slot and the
    /// shutdown token are re-checked promptly even when the line is idle.
    pub fn run(mut self) {
        let mut buffer = vec![0u8; self.config.buffer_size];
        info!("serial forwarder started");

        loop {
            if self.shutdown.is_triggered() {
                info!("serial forwarder stopping");
                return;
            }

            let len = match self.link.read(&mut buffer) {
                Ok(len) => len,
                Err(e) => {
                    error!("serial read failed: {}", e);
                    thread::sleep(self.config.poll_timeout);
                    continue;
                }
            };

            if len == 0 {
                continue;
            }

            if buffer[0] == self.config.control_byte {
                // The whole chunk is consumed; nothing from it reaches the
                // client.
                info!("reset control byte received, requesting device reset");
                let _ = self.events.send(BridgeEvent::ResetRequested);
                return;
            }

            trace!("serial produced {} bytes", len);
            if let Err(e) = self.slot.forward(&buffer[..len]) {
                error!("forwarding to client failed: {}", e);
            }
        }
    }
}
