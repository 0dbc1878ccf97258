//! Connection slot module
//!
//! The single shared coordination point between the two bridge activities:
//! the manager attaches and detaches the current client's write handle, the
//! serial forwarder forwards through it. Holding the handle behind one mutex
//! and dropping it inside [`ConnectionSlot::detach`] guarantees the forwarder
//! never writes to a handle the manager has already closed.

use std::io::Write;
use std::net::TcpStream;
use std::sync::Mutex;

use log::{debug, trace};

use crate::error::{Error, Result};

/// Single-occupancy holder of the currently attached client's write handle
///
/// Empty means no client attached. Generic over the handle so tests can
/// attach plain in-memory writers.
pub struct ConnectionSlot<W: Write = TcpStream> {
    client: Mutex<Option<W>>,
}

impl<W: Write> ConnectionSlot<W> {
    /// Create an empty slot
    pub fn new() -> Self {
        Self {
            client: Mutex::new(None),
        }
    }

    /// Publish a client handle, making it visible to the serial forwarder
    ///
    /// Any previous occupant is dropped; the manager only attaches after
    /// clearing the previous session, so the slot holds at most one handle.
    pub fn attach(&self, handle: W) -> Result<()> {
        let mut client = self
            .client
            .lock()
            .map_err(|_| Error::Client("connection slot lock poisoned".to_string()))?;
        *client = Some(handle);
        Ok(())
    }

    /// Clear the slot, closing the current client handle
    pub fn detach(&self) -> Result<()> {
        let mut client = self
            .client
            .lock()
            .map_err(|_| Error::Client("connection slot lock poisoned".to_string()))?;
        // Dropping the handle under the lock closes it before any later
        // forward can observe it.
        *client = None;
        Ok(())
    }

    /// Forward a chunk to the attached client, if any
    ///
    /// Returns the number of bytes handed to a client, or 0 when the slot is
    /// empty and the chunk is discarded. Write failures are logged and
    /// otherwise ignored; the manager's own receive loop detects the broken
    /// link and clears the slot.
    pub fn forward(&self, chunk: &[u8]) -> Result<usize> {
        if chunk.is_empty() {
            return Ok(0);
        }

        let mut client = self
            .client
            .lock()
            .map_err(|_| Error::Client("connection slot lock poisoned".to_string()))?;

        match client.as_mut() {
            Some(handle) => {
                if let Err(e) = handle.write_all(chunk).and_then(|_| handle.flush()) {
                    debug!("client write failed ({} bytes dropped): {}", chunk.len(), e);
                } else {
                    trace!("serial -> client: {} bytes", chunk.len());
                }
                Ok(chunk.len())
            }
            None => {
                // No client attached: the chunk is lost by design.
                trace!("no client attached, discarding {} bytes", chunk.len());
                Ok(0)
            }
        }
    }

    /// Whether a client is currently attached
    pub fn is_attached(&self) -> bool {
        self.client
            .lock()
            .map(|client| client.is_some())
            .unwrap_or(false)
    }
}

impl<W: Write> Default for ConnectionSlot<W> {
    fn default() -> Self {
        Self::new()
    }
}
