use std::fmt;
use std::net::Ipv4Addr;
use std::time::Duration;

use heapless::String;
use log::LevelFilter;

/// Authentication mode for the access point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Open,
    Wpa2Personal,
    Wpa3Personal,
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMode::Open => write!(f, "open"),
            AuthMode::Wpa2Personal => write!(f, "WPA2-Personal"),
            AuthMode::Wpa3Personal => write!(f, "WPA3-Personal"),
        }
    }
}

/// Wireless access point configuration
///
/// Owned by the access-point collaborator; immutable after initialization.
#[derive(Debug, Clone)]
pub struct WirelessApConfig {
    /// Network name announced by the access point
    pub ssid: String<32>,
    /// Network passphrase
    pub passphrase: String<64>,
    /// WiFi channel
    pub channel: u8,
    /// Maximum number of associated stations
    pub max_stations: u16,
    /// Configured authentication mode
    pub auth: AuthMode,
    /// Static address of the gateway on its own network
    pub gateway: Ipv4Addr,
    /// Netmask for the gateway network
    pub netmask: Ipv4Addr,
}

impl Default for WirelessApConfig {
    fn default() -> Self {
        Self {
            ssid: String::try_from("eSky_aircraft").unwrap_or_default(),
            passphrase: String::try_from("eSky1234").unwrap_or_default(),
            channel: 2,
            max_stations: 4,
            auth: AuthMode::Wpa3Personal,
            gateway: Ipv4Addr::new(192, 168, 4, 254),
            netmask: Ipv4Addr::new(255, 255, 255, 0),
        }
    }
}

impl WirelessApConfig {
    /// Authentication mode actually applied: an empty passphrase
    /// downgrades the network to open, matching the device firmware.
    pub fn effective_auth(&self) -> AuthMode {
        if self.passphrase.is_empty() {
            AuthMode::Open
        } else {
            self.auth
        }
    }
}

/// TCP server configuration
#[derive(Debug, Clone)]
pub struct TcpServerConfig {
    /// Bind address for the listening endpoint
    pub bind_address: &'static str,
    /// Fixed port the companion application connects to
    pub port: u16,
    /// Buffer size for a single client read
    pub buffer_size: usize,
    /// Upper bound on a blocking client read before the shutdown
    /// token is re-checked
    pub read_timeout: Duration,
    /// Interval between accept attempts while no client is pending
    pub accept_poll: Duration,
}

impl Default for TcpServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0",
            port: 8766,
            buffer_size: 128,
            read_timeout: Duration::from_millis(50),
            accept_poll: Duration::from_millis(50),
        }
    }
}

/// Serial link configuration
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Serial device path
    pub device: &'static str,
    /// Baud rate
    pub baudrate: u32,
    /// Data bits per frame
    pub data_bits: u8,
    /// Parity enabled
    pub parity: bool,
    /// Stop bits per frame
    pub stop_bits: u8,
    /// Buffer size for a single serial read
    pub buffer_size: usize,
    /// Upper bound on a poll read; a timeout with no data is not an error
    pub poll_timeout: Duration,
    /// Reserved first byte of a serial chunk that requests a device reset
    pub control_byte: u8,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            device: "/dev/ttyUSB0",
            baudrate: 115_200,
            data_bits: 8,
            parity: false,
            stop_bits: 1,
            buffer_size: 1024,
            poll_timeout: Duration::from_millis(20),
            control_byte: b'@',
        }
    }
}

/// Application configuration
///
/// One bridge parameterized by this struct replaces the firmware's two
/// near-duplicate variants; they differed only in network identity,
/// address assignment and log verbosity.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Wireless access point configuration
    pub wifi: WirelessApConfig,
    /// TCP server configuration
    pub tcp: TcpServerConfig,
    /// Serial link configuration
    pub serial: SerialConfig,
    /// Diagnostic verbosity
    pub log_level: LevelFilter,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            wifi: WirelessApConfig::default(),
            tcp: TcpServerConfig::default(),
            serial: SerialConfig::default(),
            log_level: LevelFilter::Info,
        }
    }
}

/// Create a new application configuration with default values
pub fn create_config() -> AppConfig {
    AppConfig::default()
}
