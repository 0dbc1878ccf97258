//! Access point module
//!
//! The wireless collaborator behind the [`AccessPoint`] trait: it brings up
//! the local network, assigns the gateway its fixed address and emits
//! station join/leave notifications. The bridge core only requires that
//! `bring_up` has returned before it binds its listening endpoint.

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::info;

use crate::config::WirelessApConfig;
use crate::error::Result;
use crate::observer::ApEvent;

/// Interface the access-point collaborator offers to the bridge core
pub trait AccessPoint {
    /// Bring up the wireless network and return the station event stream.
    ///
    /// Must not return until inbound connections can be accepted.
    fn bring_up(&mut self) -> Result<Receiver<ApEvent>>;
}

/// Access point on a host whose wireless interface is managed by the
/// platform
///
/// The interface, static gateway address and DHCP service are assumed to be
/// configured externally (hostapd or equivalent); this implementation
/// announces the identity and provides the event-stream seam a platform AP
/// driver would feed.
pub struct PreconfiguredAp {
    config: WirelessApConfig,
    events: Option<Sender<ApEvent>>,
}

impl PreconfiguredAp {
    pub fn new(config: WirelessApConfig) -> Self {
        Self {
            config,
            events: None,
        }
    }

    /// Sender half of the station event stream, for the platform driver
    pub fn event_sender(&self) -> Option<Sender<ApEvent>> {
        self.events.clone()
    }
}

impl AccessPoint for PreconfiguredAp {
    fn bring_up(&mut self) -> Result<Receiver<ApEvent>> {
        info!(
            "wireless network ready: SSID {} on channel {} ({}), gateway {}/{} (max {} stations)",
            self.config.ssid,
            self.config.channel,
            self.config.effective_auth(),
            self.config.gateway,
            self.config.netmask,
            self.config.max_stations,
        );

        let (tx, rx) = unbounded();
        self.events = Some(tx);
        Ok(rx)
    }
}
