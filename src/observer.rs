//! Event observer module
//!
//! Logs station join/leave notifications from the access-point
//! collaborator. These are network-layer stations enrolling on the wireless
//! network, distinct from the application-layer client the bridge services.

use std::thread::{self, JoinHandle};

use crossbeam_channel::Receiver;
use log::{debug, info};

use crate::error::{Error, Result};

/// Station MAC address
pub type MacAddr = [u8; 6];

/// Notification from the access-point collaborator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApEvent {
    /// A station joined the wireless network
    StationJoined { mac: MacAddr, aid: u16 },
    /// A station left the wireless network
    StationLeft { mac: MacAddr, aid: u16 },
}

/// Render a MAC address in the usual colon-separated form
pub fn format_mac(mac: &MacAddr) -> String {
    mac.iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(":")
}

/// External logging of station join/leave events
pub struct EventObserver;

impl EventObserver {
    /// Spawn the observer thread
    ///
    /// The thread drains the event stream and ends when the collaborator
    /// drops its sender.
    pub fn spawn(events: Receiver<ApEvent>) -> Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("ap_events".into())
            .spawn(move || {
                for event in events {
                    match event {
                        ApEvent::StationJoined { mac, aid } => {
                            info!("station {} joined (aid {})", format_mac(&mac), aid);
                        }
                        ApEvent::StationLeft { mac, aid } => {
                            info!("station {} left (aid {})", format_mac(&mac), aid);
                        }
                    }
                }
                debug!("access point event stream closed");
            })
            .map_err(|e| Error::Ap(format!("failed to spawn observer thread: {}", e)))
    }
}
