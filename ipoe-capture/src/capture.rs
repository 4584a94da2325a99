//! Raw Ethernet ports over pnet datalink channels
//!
//! Each port gets one channel. The sending half goes into a
//! [`DatalinkSink`]; the receiving half runs on a blocking thread that only
//! classifies and copies frames into the relay's mpsc channel.

use crate::interface::find_interface;
use crate::stats::{PortCounters, PortStats};
use ipoe_core::{Error, MacAddr, Packet, Result, SocketKind};
use ipoe_packet::{peek_ethertype, EtherType, EthernetFrame};
use ipoe_relay::FrameSink;
use pnet_datalink::{Channel, DataLinkReceiver, DataLinkSender};
use std::io;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Default read timeout; bounds how long a receiver takes to notice shutdown
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(250);

#[derive(Debug, Clone)]
pub struct CaptureConfig {
    pub read_timeout: Duration,
    pub promiscuous: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            read_timeout: DEFAULT_READ_TIMEOUT,
            promiscuous: false,
        }
    }
}

/// What a port carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortRole {
    /// PPPoE discovery and session frames
    Relay,
    /// ARP and IPv4 from the IPoE client
    Bridge,
}

/// A port to open
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortSpec {
    /// Index used to address the port, the same one the relay uses
    pub index: usize,
    pub name: String,
    pub mac: MacAddr,
    pub role: PortRole,
}

/// Which socket a received frame belongs to, if any
///
/// Frames we sent ourselves come back on packet sockets and are skipped, as
/// is every ethertype the port's role does not carry.
pub fn classify(frame: &[u8], role: PortRole, own_mac: &MacAddr) -> Option<SocketKind> {
    if frame.len() < EthernetFrame::HEADER_SIZE || frame[6..12] == own_mac.0 {
        return None;
    }

    match (role, peek_ethertype(frame)?) {
        (PortRole::Relay, EtherType::PPPoEDiscovery) => Some(SocketKind::Discovery),
        (PortRole::Relay, EtherType::PPPoESession) => Some(SocketKind::Session),
        (PortRole::Bridge, EtherType::ARP | EtherType::IPv4) => Some(SocketKind::Ip),
        _ => None,
    }
}

/// Open a datalink channel for every port
pub fn open_ports(ports: &[PortSpec], config: &CaptureConfig) -> Result<(DatalinkSink, Vec<Receiver>)> {
    let mut sink = DatalinkSink::default();
    let mut receivers = Vec::with_capacity(ports.len());

    for spec in ports {
        let iface = find_interface(&spec.name)?;

        let mut channel_config = pnet_datalink::Config::default();
        channel_config.read_timeout = Some(config.read_timeout);
        channel_config.promiscuous = config.promiscuous;

        let (tx, rx) = match pnet_datalink::channel(&iface, channel_config) {
            Ok(Channel::Ethernet(tx, rx)) => (tx, rx),
            Ok(_) => {
                return Err(Error::Interface(format!(
                    "{}: unsupported channel type",
                    spec.name
                )))
            }
            Err(e) => {
                return Err(Error::Interface(format!(
                    "{}: failed to create channel: {}. Try running as root or with CAP_NET_RAW.",
                    spec.name, e
                )))
            }
        };

        let stats = PortStats::new();
        sink.attach(spec, tx, stats.clone());
        receivers.push(Receiver {
            spec: spec.clone(),
            rx,
            stats,
        });

        info!(
            interface = %spec.name,
            index = spec.index,
            mac = %spec.mac,
            role = ?spec.role,
            "Opened port"
        );
    }

    Ok((sink, receivers))
}

/// Receiving half of a port
pub struct Receiver {
    spec: PortSpec,
    rx: Box<dyn DataLinkReceiver>,
    stats: PortStats,
}

impl Receiver {
    pub fn spec(&self) -> &PortSpec {
        &self.spec
    }

    /// Move the receive loop onto a blocking thread
    ///
    /// The thread ends once the channel's receiving end is dropped.
    pub fn spawn(self, tx: mpsc::Sender<Packet>) -> JoinHandle<()> {
        tokio::task::spawn_blocking(move || self.run(tx))
    }

    fn run(self, tx: mpsc::Sender<Packet>) {
        let Receiver {
            spec,
            mut rx,
            stats,
        } = self;
        debug!(interface = %spec.name, "Receiver started");

        loop {
            match rx.next() {
                Ok(frame) => {
                    let Some(socket) = classify(frame, spec.role, &spec.mac) else {
                        stats.record_skipped();
                        continue;
                    };
                    stats.record_received(frame.len());

                    let packet = Packet::new(spec.index, socket, frame.to_vec());
                    if tx.blocking_send(packet).is_err() {
                        break;
                    }
                }
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::TimedOut | io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock
                    ) =>
                {
                    if tx.is_closed() {
                        break;
                    }
                }
                Err(e) => {
                    error!(interface = %spec.name, error = %e, "Receive failed");
                    break;
                }
            }
        }

        debug!(interface = %spec.name, "Receiver stopped");
    }
}

struct Port {
    name: String,
    tx: Box<dyn DataLinkSender>,
    stats: PortStats,
}

/// Sending halves of all ports, addressed by port index
#[derive(Default)]
pub struct DatalinkSink {
    ports: Vec<Option<Port>>,
}

impl DatalinkSink {
    fn attach(&mut self, spec: &PortSpec, tx: Box<dyn DataLinkSender>, stats: PortStats) {
        if self.ports.len() <= spec.index {
            self.ports.resize_with(spec.index + 1, || None);
        }
        self.ports[spec.index] = Some(Port {
            name: spec.name.clone(),
            tx,
            stats,
        });
    }

    /// Counters for every open port, by name
    pub fn counters(&self) -> Vec<(String, PortCounters)> {
        self.ports
            .iter()
            .flatten()
            .map(|p| (p.name.clone(), p.stats.snapshot()))
            .collect()
    }

    pub fn log_counters(&self) {
        for (name, counters) in self.counters() {
            info!(interface = %name, "{}", counters);
        }
    }
}

impl FrameSink for DatalinkSink {
    fn send(&mut self, interface: usize, socket: SocketKind, frame: &[u8]) -> Result<()> {
        let port = self
            .ports
            .get_mut(interface)
            .and_then(Option::as_mut)
            .ok_or_else(|| Error::Interface(format!("no port {}", interface)))?;

        match port.tx.send_to(frame, None) {
            Some(Ok(())) => {
                port.stats.record_sent(frame.len());
                debug!(interface = %port.name, socket = %socket, size = frame.len(), "Frame sent");
                Ok(())
            }
            Some(Err(e)) => {
                port.stats.record_send_error();
                Err(Error::Io(e))
            }
            None => {
                port.stats.record_send_error();
                Err(Error::Interface(format!("{}: send not supported", port.name)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ipoe_protocols::pppoe::{PppoeCode, PppoePacket};

    const OWN: MacAddr = MacAddr([0x02, 0, 0, 0, 0, 1]);
    const PEER: MacAddr = MacAddr([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);

    fn frame(source: MacAddr, ethertype: EtherType) -> Vec<u8> {
        EthernetFrame::new(OWN, source, ethertype, vec![0; 46]).to_bytes()
    }

    #[test]
    fn test_classify_relay_port() {
        let padi = PppoePacket::new_discovery(MacAddr::BROADCAST, PEER, PppoeCode::PADI, 0, &[]);
        assert_eq!(
            classify(&padi.to_frame(), PortRole::Relay, &OWN),
            Some(SocketKind::Discovery)
        );
        assert_eq!(
            classify(&frame(PEER, EtherType::PPPoESession), PortRole::Relay, &OWN),
            Some(SocketKind::Session)
        );
        assert_eq!(classify(&frame(PEER, EtherType::IPv4), PortRole::Relay, &OWN), None);
    }

    #[test]
    fn test_classify_bridge_port() {
        assert_eq!(
            classify(&frame(PEER, EtherType::ARP), PortRole::Bridge, &OWN),
            Some(SocketKind::Ip)
        );
        assert_eq!(
            classify(&frame(PEER, EtherType::IPv4), PortRole::Bridge, &OWN),
            Some(SocketKind::Ip)
        );
        assert_eq!(
            classify(&frame(PEER, EtherType::PPPoEDiscovery), PortRole::Bridge, &OWN),
            None
        );
    }

    #[test]
    fn test_classify_skips_own_and_short_frames() {
        assert_eq!(
            classify(&frame(OWN, EtherType::PPPoEDiscovery), PortRole::Relay, &OWN),
            None
        );
        assert_eq!(classify(&[0u8; 10], PortRole::Relay, &OWN), None);
    }

    #[test]
    fn test_default_config_is_not_promiscuous() {
        let config = CaptureConfig::default();
        assert!(!config.promiscuous);
        assert_eq!(config.read_timeout, DEFAULT_READ_TIMEOUT);
    }

    #[test]
    fn test_send_to_unknown_port() {
        let mut sink = DatalinkSink::default();
        let err = sink.send(3, SocketKind::Discovery, &[0; 60]).unwrap_err();
        assert!(matches!(err, Error::Interface(_)));
        assert!(sink.counters().is_empty());
    }

    #[test]
    fn test_open_unknown_interface() {
        let ports = [PortSpec {
            index: 0,
            name: "nonexistent_interface_xyz".to_string(),
            mac: OWN,
            role: PortRole::Relay,
        }];
        let err = open_ports(&ports, &CaptureConfig::default()).err().unwrap();
        assert!(matches!(err, Error::InterfaceNotFound(_)));
    }
}
