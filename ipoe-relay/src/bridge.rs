//! IPoE bridge
//!
//! Connects one Ethernet-attached client to a PPPoE session. ARP and DHCP
//! from the client are answered locally; every other IPv4 datagram travels
//! inside the session as PPP protocol 0x0021, and IPv4 coming back from the
//! AC is unwrapped and handed to the client as plain Ethernet.

use crate::sink::FrameSink;
use ipoe_core::{Error, MacAddr, Packet, Result, SocketKind};
use ipoe_packet::{EtherType, EthernetFrame};
use ipoe_protocols::ppp::{ppp_protocol, PPP_IPV4};
use ipoe_protocols::pppoe::{PppoeCode, PppoePacket, MAX_PPPOE_PAYLOAD};
use ipoe_protocols::{intercept_frame, Intercept, InterceptStats, IpoeConnection};
use tracing::{debug, error, info};

/// The PPPoE session a bridge tunnels through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLink {
    /// Relay interface facing the AC
    pub interface: usize,
    /// Our MAC on that interface
    pub local_mac: MacAddr,
    pub ac_mac: MacAddr,
    pub session_id: u16,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BridgeStats {
    pub intercept: InterceptStats,
    /// IPv4 datagrams sent into the session
    pub to_session: u64,
    /// IPv4 datagrams delivered to the client
    pub to_client: u64,
}

pub struct IpoeBridge {
    /// Interface index of the client-facing port
    index: usize,
    conn: IpoeConnection,
    link: Option<SessionLink>,
    stats: BridgeStats,
}

impl IpoeBridge {
    pub fn new(index: usize, conn: IpoeConnection, link: Option<SessionLink>) -> Self {
        info!(
            index,
            mac = %conn.my_mac,
            gateway = %conn.gateway,
            peer_ip = %conn.peer_ip,
            session = link.map(|l| l.session_id),
            "IPoE bridge ready"
        );
        Self {
            index,
            conn,
            link,
            stats: BridgeStats::default(),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn connection(&self) -> &IpoeConnection {
        &self.conn
    }

    pub fn stats(&self) -> &BridgeStats {
        &self.stats
    }

    /// True if `packet` is session traffic from the AC for this bridge
    pub fn owns(&self, packet: &Packet) -> bool {
        let Some(link) = &self.link else {
            return false;
        };
        let data = packet.data();
        packet.socket == SocketKind::Session
            && packet.interface == link.interface
            && data.len() >= 20
            && data[6..12] == link.ac_mac.0
            && u16::from_be_bytes([data[16], data[17]]) == link.session_id
    }

    /// Handle one frame from the client-facing port
    pub fn handle_frame<S: FrameSink>(&mut self, sink: &mut S, data: &[u8]) {
        match intercept_frame(&mut self.conn, &mut self.stats.intercept, data) {
            Intercept::Reply(frame) => self.send(sink, self.index, SocketKind::Ip, &frame),
            Intercept::Forward(datagram) => {
                if let Err(e) = self.send_session_packet(sink, &datagram) {
                    debug!(error = %e, "Dropping datagram for session");
                }
            }
            Intercept::Drop => {}
        }
    }

    /// Carry an IPv4 datagram into the PPPoE session
    pub fn send_session_packet<S: FrameSink>(&mut self, sink: &mut S, datagram: &[u8]) -> Result<()> {
        let link = self
            .link
            .ok_or_else(|| Error::mismatch("no PPPoE session configured"))?;

        let needed = 2 + datagram.len();
        if needed > MAX_PPPOE_PAYLOAD {
            return Err(Error::overflow(needed, MAX_PPPOE_PAYLOAD));
        }

        let mut payload = Vec::with_capacity(needed);
        payload.extend_from_slice(&PPP_IPV4.to_be_bytes());
        payload.extend_from_slice(datagram);

        let packet = PppoePacket::new_session(link.ac_mac, link.local_mac, link.session_id, payload);
        self.send(sink, link.interface, SocketKind::Session, &packet.to_frame());
        self.stats.to_session += 1;
        Ok(())
    }

    /// Handle a session frame from the AC (see [`IpoeBridge::owns`])
    pub fn handle_session_frame<S: FrameSink>(&mut self, sink: &mut S, data: &[u8]) -> Result<()> {
        let packet = PppoePacket::from_frame(data)?;
        if packet.code != PppoeCode::SessionData {
            return Err(Error::mismatch("discovery frame on session socket"));
        }

        match ppp_protocol(&packet.payload) {
            Some((PPP_IPV4, datagram)) => self.send_ip_packet(sink, datagram),
            Some((protocol, _)) => Err(Error::mismatch(format!(
                "PPP protocol 0x{:04x} not bridged",
                protocol
            ))),
            None => Err(Error::malformed("empty PPP frame")),
        }
    }

    /// Deliver an IPv4 datagram to the client as an Ethernet frame
    pub fn send_ip_packet<S: FrameSink>(&mut self, sink: &mut S, datagram: &[u8]) -> Result<()> {
        if !self.conn.has_peer() {
            return Err(Error::mismatch("client MAC not learned yet"));
        }
        if datagram.len() > EthernetFrame::MAX_PAYLOAD_SIZE {
            return Err(Error::overflow(datagram.len(), EthernetFrame::MAX_PAYLOAD_SIZE));
        }

        let frame = EthernetFrame::new(
            self.conn.peer_mac,
            self.conn.my_mac,
            EtherType::IPv4,
            datagram.to_vec(),
        );
        self.send(sink, self.index, SocketKind::Ip, &frame.to_bytes());
        self.stats.to_client += 1;
        Ok(())
    }

    fn send<S: FrameSink>(&self, sink: &mut S, index: usize, socket: SocketKind, frame: &[u8]) {
        if let Err(e) = sink.send(index, socket, frame) {
            error!(interface = index, socket = %socket, error = %e, "Send failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::recording::RecordingSink;
    use ipoe_packet::{Ipv4Header, UdpHeader};
    use ipoe_protocols::arp::ArpPacket;
    use std::net::Ipv4Addr;

    const BRIDGE_MAC: MacAddr = MacAddr([0x02, 0x00, 0x00, 0x00, 0x00, 0x09]);
    const RELAY_MAC: MacAddr = MacAddr([0x02, 0x00, 0x00, 0x00, 0x00, 0x01]);
    const CLIENT: MacAddr = MacAddr([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
    const AC: MacAddr = MacAddr([0x00, 0xaa, 0xbb, 0xcc, 0xdd, 0xee]);

    fn link() -> SessionLink {
        SessionLink {
            interface: 1,
            local_mac: RELAY_MAC,
            ac_mac: AC,
            session_id: 0x0042,
        }
    }

    fn bridge(link: Option<SessionLink>) -> IpoeBridge {
        let conn = IpoeConnection::new(
            BRIDGE_MAC,
            Ipv4Addr::new(10, 0, 0, 1),
            Ipv4Addr::new(255, 255, 255, 0),
            Ipv4Addr::new(10, 0, 0, 2),
        );
        IpoeBridge::new(3, conn, link)
    }

    fn datagram(payload: &[u8]) -> Vec<u8> {
        let ip = Ipv4Header::new(
            Ipv4Addr::new(10, 0, 0, 2),
            Ipv4Addr::new(192, 0, 2, 1),
            17,
            UdpHeader::HEADER_SIZE + payload.len(),
        );
        let mut out = ip.to_bytes();
        out.extend_from_slice(&UdpHeader::new(40000, 53, payload.len()).to_bytes());
        out.extend_from_slice(payload);
        out
    }

    fn arp_request() -> Vec<u8> {
        let mut body = ArpPacket::new_reply(
            CLIENT,
            Ipv4Addr::new(10, 0, 0, 2),
            MacAddr::ZERO,
            Ipv4Addr::new(10, 0, 0, 1),
        );
        body.operation = 1;
        EthernetFrame::new(MacAddr::BROADCAST, CLIENT, EtherType::ARP, body.serialize()).to_bytes()
    }

    #[test]
    fn test_arp_reply_goes_back_out_the_bridge_port() {
        let mut bridge = bridge(None);
        let mut sink = RecordingSink::default();

        bridge.handle_frame(&mut sink, &arp_request());

        assert_eq!(sink.sent.len(), 1);
        assert_eq!(sink.sent[0].interface, 3);
        assert_eq!(sink.sent[0].socket, SocketKind::Ip);
        assert_eq!(bridge.connection().peer_mac, CLIENT);
        assert_eq!(bridge.stats().intercept.arp_replies, 1);
    }

    #[test]
    fn test_ipv4_wrapped_into_session() {
        let mut bridge = bridge(Some(link()));
        let mut sink = RecordingSink::default();
        let dgram = datagram(b"query");

        let frame = EthernetFrame::new(BRIDGE_MAC, CLIENT, EtherType::IPv4, dgram.clone()).to_bytes();
        bridge.handle_frame(&mut sink, &frame);

        assert_eq!(sink.sent.len(), 1);
        assert_eq!(sink.sent[0].interface, 1);
        assert_eq!(sink.sent[0].socket, SocketKind::Session);

        let packet = PppoePacket::from_frame(&sink.sent[0].frame).unwrap();
        assert_eq!(packet.destination, AC);
        assert_eq!(packet.source, RELAY_MAC);
        assert_eq!(packet.session_id, 0x0042);
        assert_eq!(&packet.payload[..2], &[0x00, 0x21]);
        assert_eq!(&packet.payload[2..], dgram.as_slice());
        assert_eq!(bridge.stats().to_session, 1);
    }

    #[test]
    fn test_ipv4_without_session_dropped() {
        let mut bridge = bridge(None);
        let mut sink = RecordingSink::default();

        let frame =
            EthernetFrame::new(BRIDGE_MAC, CLIENT, EtherType::IPv4, datagram(b"x")).to_bytes();
        bridge.handle_frame(&mut sink, &frame);

        assert!(sink.sent.is_empty());
        assert_eq!(bridge.stats().to_session, 0);
    }

    #[test]
    fn test_session_ipv4_unwrapped_to_client() {
        let mut bridge = bridge(Some(link()));
        let mut sink = RecordingSink::default();

        // Learn the client first
        bridge.handle_frame(&mut sink, &arp_request());
        sink.take();

        let dgram = datagram(b"answer");
        let mut payload = PPP_IPV4.to_be_bytes().to_vec();
        payload.extend_from_slice(&dgram);
        let frame = PppoePacket::new_session(RELAY_MAC, AC, 0x0042, payload).to_frame();

        let packet = Packet::new(1, SocketKind::Session, frame);
        assert!(bridge.owns(&packet));
        bridge.handle_session_frame(&mut sink, packet.data()).unwrap();

        assert_eq!(sink.sent.len(), 1);
        assert_eq!(sink.sent[0].interface, 3);
        let eth = EthernetFrame::from_bytes(&sink.sent[0].frame).unwrap();
        assert_eq!(eth.destination, CLIENT);
        assert_eq!(eth.source, BRIDGE_MAC);
        assert_eq!(eth.ethertype, EtherType::IPv4);
        assert_eq!(&eth.payload[..dgram.len()], dgram.as_slice());
    }

    #[test]
    fn test_session_ipv4_before_peer_learned() {
        let mut bridge = bridge(Some(link()));
        let mut sink = RecordingSink::default();

        let err = bridge.send_ip_packet(&mut sink, &datagram(b"x")).unwrap_err();
        assert!(matches!(err, Error::ProtocolMismatch(_)));
        assert!(sink.sent.is_empty());
    }

    #[test]
    fn test_non_ip_session_traffic_not_bridged() {
        let mut bridge = bridge(Some(link()));
        let mut sink = RecordingSink::default();

        let lcp = vec![0xc0, 0x21, 0x09, 0x01, 0x00, 0x08, 0, 0, 0, 0];
        let frame = PppoePacket::new_session(RELAY_MAC, AC, 0x0042, lcp).to_frame();

        assert!(bridge.handle_session_frame(&mut sink, &frame).is_err());
        assert!(sink.sent.is_empty());
    }

    #[test]
    fn test_owns_matches_only_bridge_session() {
        let bridge = bridge(Some(link()));
        let frame = PppoePacket::new_session(RELAY_MAC, AC, 0x0042, vec![0, 0x21]).to_frame();

        assert!(bridge.owns(&Packet::new(1, SocketKind::Session, frame.clone())));
        assert!(!bridge.owns(&Packet::new(2, SocketKind::Session, frame.clone())));
        assert!(!bridge.owns(&Packet::new(1, SocketKind::Discovery, frame)));

        let other = PppoePacket::new_session(RELAY_MAC, AC, 0x0043, vec![0, 0x21]).to_frame();
        assert!(!bridge.owns(&Packet::new(1, SocketKind::Session, other)));

        let unlinked = IpoeBridge::new(3, bridge.connection().clone(), None);
        let frame = PppoePacket::new_session(RELAY_MAC, AC, 0x0042, vec![0, 0x21]).to_frame();
        assert!(!unlinked.owns(&Packet::new(1, SocketKind::Session, frame)));
    }

    #[test]
    fn test_oversized_datagram_rejected() {
        let mut bridge = bridge(Some(link()));
        let mut sink = RecordingSink::default();

        let err = bridge
            .send_session_packet(&mut sink, &vec![0x45; MAX_PPPOE_PAYLOAD - 1])
            .unwrap_err();
        assert!(matches!(err, Error::BufferOverflow { .. }));
    }
}
