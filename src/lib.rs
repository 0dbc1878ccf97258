//! skylink — wireless serial gateway
//!
//! Exposes a local serial peripheral link over a wireless network as a
//! single-client, bidirectional byte-stream bridge. The [`bridge::Bridge`]
//! runs two independent activities: the connection manager pumps client
//! bytes to the serial link, the serial forwarder pumps serial bytes to the
//! attached client and intercepts the in-band reset command.

pub mod bridge;
pub mod config;
pub mod error;
pub mod observer;
pub mod serial;
pub mod server;
pub mod shutdown;
pub mod slot;
pub mod wifi;

pub use bridge::{Bridge, BridgeExit};
pub use config::{create_config, AppConfig};
pub use error::{Error, Result};
pub use serial::{SerialLink, SerialPortLink};
pub use shutdown::ShutdownToken;
