//! Bridge module
//!
//! The supervising layer that owns the connection slot, runs the two bridge
//! activities on their own threads and performs the orderly reset when the
//! serial side requests one.

use std::net::SocketAddr;
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{error, info};

use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::serial::{SerialForwarder, SerialLink};
use crate::server::ConnectionManager;
use crate::shutdown::ShutdownToken;
use crate::slot::ConnectionSlot;

/// Notification from a bridge activity to the supervising layer
#[derive(Debug)]
pub enum BridgeEvent {
    /// The serial side observed the reset control byte
    ResetRequested,
    /// The connection manager died of a fatal endpoint failure
    ManagerFailed(Error),
}

/// Why [`Bridge::run`] returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeExit {
    /// The control byte asked for a device reset; the caller performs it
    ResetRequested,
    /// Both activities ended, normally after an external shutdown request
    Stopped,
}

/// The combined forwarding engine: connection manager plus serial forwarder
pub struct Bridge {
    manager: ConnectionManager,
    forwarder: SerialForwarder,
    shutdown: ShutdownToken,
    events_tx: Sender<BridgeEvent>,
    events_rx: Receiver<BridgeEvent>,
}

impl Bridge {
    /// Build the bridge around an opened serial link
    ///
    /// Binds the listening endpoint up front, so the fatal startup failures
    /// surface here rather than inside a detached thread.
    pub fn new(config: AppConfig, serial: Box<dyn SerialLink>) -> Result<Self> {
        let shutdown = ShutdownToken::new();
        let slot = Arc::new(ConnectionSlot::new());
        let (events_tx, events_rx) = unbounded();

        let serial_writer = serial.try_clone()?;
        let manager = ConnectionManager::bind(
            config.tcp,
            Arc::clone(&slot),
            serial_writer,
            shutdown.clone(),
        )?;
        let forwarder = SerialForwarder::new(
            config.serial,
            serial,
            slot,
            shutdown.clone(),
            events_tx.clone(),
        );

        Ok(Self {
            manager,
            forwarder,
            shutdown,
            events_tx,
            events_rx,
        })
    }

    /// Address of the listening endpoint
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.manager.local_addr()
    }

    /// Token for stopping the bridge from outside
    pub fn shutdown_handle(&self) -> ShutdownToken {
        self.shutdown.clone()
    }

    /// Run both activities until a reset is requested or the bridge stops
    ///
    /// The activities fail independently: a dead connection manager leaves
    /// the serial side running, and only the control byte (or an external
    /// shutdown) brings the whole bridge down.
    pub fn run(self) -> Result<BridgeExit> {
        let Bridge {
            manager,
            forwarder,
            shutdown,
            events_tx,
            events_rx,
        } = self;

        let manager_events = events_tx.clone();
        let manager_thread = thread::Builder::new()
            .name("connection_manager".into())
            .spawn(move || {
                if let Err(e) = manager.run() {
                    let _ = manager_events.send(BridgeEvent::ManagerFailed(e));
                }
            })?;

        let forwarder_thread = match thread::Builder::new()
            .name("serial_forwarder".into())
            .spawn(move || forwarder.run())
        {
            Ok(handle) => handle,
            Err(e) => {
                shutdown.trigger();
                let _ = manager_thread.join();
                return Err(e.into());
            }
        };

        // Keeping a sender here would keep the channel open after both
        // activities are gone.
        drop(events_tx);

        let exit = loop {
            match events_rx.recv() {
                Ok(BridgeEvent::ResetRequested) => break BridgeExit::ResetRequested,
                Ok(BridgeEvent::ManagerFailed(e)) => {
                    // Network side is dead until reset; the serial side
                    // keeps running.
                    error!("connection manager failed: {}", e);
                }
                Err(_) => break BridgeExit::Stopped,
            }
        };

        shutdown.trigger();
        let _ = manager_thread.join();
        let _ = forwarder_thread.join();

        info!("bridge stopped ({:?})", exit);
        Ok(exit)
    }
}
