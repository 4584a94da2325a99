//! CLI for the IPoE/PPPoE relay
//!
//! Argument parsing, logging setup and the startup sequence behind the
//! `ipoe-relay` binary: resolve interfaces, open ports, spawn receivers and
//! run the event loop until interrupted.

pub mod args;
pub mod logging;

pub use args::Cli;

use ipoe_capture::{list_interfaces, open_ports, CaptureConfig, PortRole, PortSpec};
use ipoe_core::{Error, Interface, InterfaceRole, Result};
use ipoe_protocols::IpoeConnection;
use ipoe_relay::{BridgeConfig, EventLoop, IpoeBridge, RelayConfig, RelayCore, SessionLink};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Frames buffered between the receive threads and the event loop
const CHANNEL_CAPACITY: usize = 1024;

/// Run whatever the command line asked for
pub async fn run(cli: Cli) -> Result<()> {
    if cli.list_interfaces {
        return print_interfaces();
    }

    let relay_config = cli.relay_config()?;
    let bridge_config = cli.bridge_config(&relay_config)?;
    if relay_config.interfaces.is_empty() && bridge_config.is_none() {
        return Err(Error::invalid_parameter(
            "interfaces",
            "give at least one of -S, -C, -B or --ipoe-iface",
        ));
    }

    serve(relay_config, bridge_config).await
}

fn print_interfaces() -> Result<()> {
    for iface in list_interfaces()? {
        let marker = if iface.is_relay_capable() { "*" } else { " " };
        println!("{} {}", marker, iface);
    }
    Ok(())
}

fn build_bridge(
    config: &BridgeConfig,
    relay: &RelayConfig,
    interfaces: &[Interface],
) -> Result<(IpoeBridge, PortSpec)> {
    let index = interfaces.len();
    let iface = Interface::by_name(&config.interface, index, InterfaceRole::Client)?;

    let conn = IpoeConnection::new(iface.mac, config.gateway, config.netmask, config.peer_ip)
        .with_dns(config.dns);

    let link = match (config.session, relay.first_ac_interface()) {
        (Some(session), Some(ac)) => interfaces.get(ac).map(|ac_iface| SessionLink {
            interface: ac_iface.index,
            local_mac: ac_iface.mac,
            ac_mac: session.ac_mac,
            session_id: session.session_id,
        }),
        _ => None,
    };
    if link.is_none() {
        warn!(interface = %iface.name, "IPoE bridge has no PPPoE session; IP traffic stays local");
    }

    let port = PortSpec {
        index,
        name: iface.name,
        mac: iface.mac,
        role: PortRole::Bridge,
    };
    Ok((IpoeBridge::new(index, conn, link), port))
}

async fn serve(relay_config: RelayConfig, bridge_config: Option<BridgeConfig>) -> Result<()> {
    let interfaces = relay_config
        .interfaces
        .iter()
        .enumerate()
        .map(|(index, spec)| Interface::by_name(&spec.name, index, spec.role))
        .collect::<Result<Vec<_>>>()?;

    for iface in &interfaces {
        info!(index = iface.index, "Relay interface {}", iface);
    }

    let mut ports: Vec<PortSpec> = interfaces
        .iter()
        .map(|iface| PortSpec {
            index: iface.index,
            name: iface.name.clone(),
            mac: iface.mac,
            role: PortRole::Relay,
        })
        .collect();

    let bridge = match &bridge_config {
        Some(config) => {
            let (bridge, port) = build_bridge(config, &relay_config, &interfaces)?;
            ports.push(port);
            Some(bridge)
        }
        None => None,
    };

    let (sink, receivers) = open_ports(&ports, &CaptureConfig::default())?;

    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let handles: Vec<_> = receivers
        .into_iter()
        .map(|receiver| receiver.spawn(tx.clone()))
        .collect();
    drop(tx);

    let relay = RelayCore::new(interfaces, &relay_config);
    let mut event_loop = EventLoop::new(relay, bridge, sink, relay_config.clean_period);
    let result = event_loop.run(rx, shutdown_signal()).await;

    // Receivers notice the closed channel on their next read timeout
    for handle in handles {
        if let Err(e) = handle.await {
            error!(error = %e, "Receiver task failed");
        }
    }
    event_loop.sink().log_counters();

    result
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Interrupted, shutting down"),
        Err(e) => error!(error = %e, "Cannot listen for interrupts, shutting down"),
    }
}
