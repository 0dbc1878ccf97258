use log::info;

use skylink::{
    bridge::{Bridge, BridgeExit},
    config::create_config,
    observer::EventObserver,
    serial::SerialPortLink,
    wifi::{AccessPoint, PreconfiguredAp},
};

fn main() -> anyhow::Result<()> {
    // Fixed startup sequence: logging, configuration, network, serial,
    // bridge. No config file, no command-line surface.
    let config = create_config();
    env_logger::Builder::from_default_env()
        .filter_level(config.log_level)
        .init();

    info!("skylink gateway starting");

    let mut ap = PreconfiguredAp::new(config.wifi.clone());
    let station_events = ap.bring_up()?;
    let _observer = EventObserver::spawn(station_events)?;

    let serial = SerialPortLink::open(&config.serial)?;

    let bridge = Bridge::new(config, Box::new(serial))?;
    info!("bridge ready on {}", bridge.local_addr()?);

    match bridge.run()? {
        BridgeExit::ResetRequested => {
            // The orderly reset: exit and let the process supervisor
            // restart the gateway.
            info!("device reset requested, exiting for supervisor restart");
        }
        BridgeExit::Stopped => {
            info!("bridge stopped");
        }
    }

    Ok(())
}
