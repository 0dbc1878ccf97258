//! Connection manager module
//!
//! Owns the listening endpoint, admits one network client at a time and
//! pumps the client-to-serial direction of the bridge.

use std::io::{self, Read};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

use log::{debug, error, info, trace};

use crate::config::TcpServerConfig;
use crate::error::{Error, Result};
use crate::serial::SerialLink;
use crate::shutdown::ShutdownToken;
use crate::slot::ConnectionSlot;

/// Connection manager activity
///
/// Accepts exactly one client at a time on the fixed port. While a client is
/// attached, bytes it sends are written verbatim to the serial link; on
/// disconnect or error the slot is cleared and accepting resumes.
pub struct ConnectionManager {
    listener: TcpListener,
    slot: Arc<ConnectionSlot<TcpStream>>,
    serial: Box<dyn SerialLink>,
    shutdown: ShutdownToken,
    config: TcpServerConfig,
}

impl ConnectionManager {
    /// Create and bind the listening endpoint
    ///
    /// Endpoint creation or bind failure is fatal: the bridge has no network
    /// capability without it and there is no retry.
    pub fn bind(
        config: TcpServerConfig,
        slot: Arc<ConnectionSlot<TcpStream>>,
        serial: Box<dyn SerialLink>,
        shutdown: ShutdownToken,
    ) -> Result<Self> {
        let bind_address = format!("{}:{}", config.bind_address, config.port);
        let listener = TcpListener::bind(&bind_address)
            .map_err(|e| Error::Net(format!("failed to bind to {}: {}", bind_address, e)))?;

        // Non-blocking accept lets the loop poll the shutdown token.
        listener
            .set_nonblocking(true)
            .map_err(|e| Error::Net(format!("failed to configure listener: {}", e)))?;

        info!("listening on {}", bind_address);

        Ok(Self {
            listener,
            slot,
            serial,
            shutdown,
            config,
        })
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .map_err(|e| Error::Net(format!("failed to get local address: {}", e)))
    }

    /// Run the accept loop
    ///
    /// Returns `Ok(())` only on requested shutdown; an accept failure on the
    /// established endpoint is fatal and propagates without retry.
    pub fn run(mut self) -> Result<()> {
        loop {
            if self.shutdown.is_triggered() {
                info!("connection manager stopping");
                return Ok(());
            }

            match self.listener.accept() {
                Ok((stream, peer)) => self.serve_client(stream, peer),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    thread::sleep(self.config.accept_poll);
                }
                Err(e) => {
                    error!("accept failed: {}", e);
                    return Err(Error::Net(format!("accept failed: {}", e)));
                }
            }
        }
    }

    /// Service one client session, start to finish
    ///
    /// Session-level failures end the session and are not fatal to the
    /// manager.
    fn serve_client(&mut self, mut stream: TcpStream, peer: SocketAddr) {
        info!("client connected: {}", peer);

        // The accepted socket may inherit the listener's non-blocking mode;
        // reads below rely on the bounded timeout instead.
        if let Err(e) = stream
            .set_nonblocking(false)
            .and_then(|_| stream.set_read_timeout(Some(self.config.read_timeout)))
        {
            error!("failed to configure client {}: {}", peer, e);
            return;
        }

        // The forwarder writes through its own handle to the same socket.
        let writer = match stream.try_clone() {
            Ok(writer) => writer,
            Err(e) => {
                error!("failed to clone client handle for {}: {}", peer, e);
                return;
            }
        };

        if let Err(e) = self.slot.attach(writer) {
            error!("failed to attach client {}: {}", peer, e);
            return;
        }

        let mut buffer = vec![0u8; self.config.buffer_size];

        loop {
            if self.shutdown.is_triggered() {
                debug!("shutdown requested, closing client {}", peer);
                break;
            }

            match stream.read(&mut buffer) {
                Ok(0) => {
                    // Graceful disconnect.
                    info!("client {} disconnected", peer);
                    break;
                }
                Ok(n) => {
                    trace!("client -> serial: {} bytes from {}", n, peer);
                    // Serial write failures are logged, never retried; the
                    // session continues.
                    if let Err(e) = self.serial.write_all(&buffer[..n]) {
                        error!("serial write failed: {}", e);
                    }
                }
                Err(e)
                    if e.kind() == io::ErrorKind::WouldBlock
                        || e.kind() == io::ErrorKind::TimedOut =>
                {
                    // No data before the read timeout; re-check shutdown.
                    continue;
                }
                Err(e) => {
                    // Same control flow as a graceful disconnect, only the
                    // log line differs.
                    error!("error reading from client {}: {}", peer, e);
                    break;
                }
            }
        }

        // Clear the slot before the next accept; the forwarder's handle is
        // dropped under the slot lock.
        if let Err(e) = self.slot.detach() {
            error!("failed to clear connection slot: {}", e);
        }
        debug!("connection slot cleared after {}", peer);
    }
}
