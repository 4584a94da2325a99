//! IP-path dispatch for the IPoE interface
//!
//! Decides what happens to each frame received from the Ethernet-attached
//! client: ARP and DHCP are answered locally, other IPv4 datagrams are handed
//! back to the caller for encapsulation toward the access concentrator.
//! Frames not addressed to the relay MAC or to broadcast are dropped.

use crate::arp::handle_arp_request;
use crate::connection::IpoeConnection;
use crate::dhcp::handle_dhcp_request;
use ipoe_core::Error;
use ipoe_packet::{classify_dhcp_candidate, EtherType, EthernetFrame, Ipv4Header};
use tracing::debug;

/// Outcome of intercepting one frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intercept {
    /// Send this frame back out the IPoE interface
    Reply(Vec<u8>),
    /// Carry this IPv4 datagram into the PPP session
    Forward(Vec<u8>),
    /// Nothing to do
    Drop,
}

/// Counters kept per IPoE connection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterceptStats {
    pub arp_replies: u64,
    pub dhcp_replies: u64,
    pub forwarded: u64,
    pub dropped: u64,
}

/// Classify and handle one frame from the IPoE client
pub fn intercept_frame(
    conn: &mut IpoeConnection,
    stats: &mut InterceptStats,
    data: &[u8],
) -> Intercept {
    let Some(frame) = EthernetFrame::from_bytes(data) else {
        stats.dropped += 1;
        return Intercept::Drop;
    };

    if frame.destination != conn.my_mac && !frame.destination.is_broadcast() {
        debug!(destination = %frame.destination, "Dropping frame for another host");
        stats.dropped += 1;
        return Intercept::Drop;
    }

    let outcome = match frame.ethertype {
        EtherType::ARP => match handle_arp_request(conn, &frame) {
            Ok(reply) => {
                stats.arp_replies += 1;
                Intercept::Reply(reply.to_bytes())
            }
            Err(e) => {
                debug!(error = %e, "Dropping ARP frame");
                Intercept::Drop
            }
        },
        EtherType::IPv4 => intercept_ipv4(conn, stats, &frame),
        _ => Intercept::Drop,
    };

    if outcome == Intercept::Drop {
        stats.dropped += 1;
    }
    outcome
}

fn intercept_ipv4(
    conn: &mut IpoeConnection,
    stats: &mut InterceptStats,
    frame: &EthernetFrame,
) -> Intercept {
    if frame.payload.first().map(|b| b >> 4) != Some(4) {
        return Intercept::Drop;
    }

    if classify_dhcp_candidate(&frame.payload) {
        match handle_dhcp_request(conn, frame) {
            Ok(Some(reply)) => {
                stats.dhcp_replies += 1;
                return Intercept::Reply(reply.to_bytes());
            }
            Ok(None) => return Intercept::Drop,
            Err(Error::ProtocolMismatch(reason)) => {
                debug!(reason = %reason, "Forwarding non-DHCP BOOTP datagram");
            }
            Err(e) => {
                debug!(error = %e, "Dropping DHCP frame");
                return Intercept::Drop;
            }
        }
    }

    stats.forwarded += 1;
    Intercept::Forward(trim_datagram(&frame.payload).to_vec())
}

/// Strip Ethernet padding using the IPv4 total length
fn trim_datagram(payload: &[u8]) -> &[u8] {
    match Ipv4Header::from_bytes(payload) {
        Some(ip) if (ip.total_length as usize) <= payload.len() => {
            &payload[..ip.total_length as usize]
        }
        _ => payload,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arp::ArpPacket;
    use ipoe_core::MacAddr;
    use ipoe_packet::UdpHeader;
    use std::net::Ipv4Addr;

    const RELAY_MAC: MacAddr = MacAddr([0x02, 0x00, 0x00, 0x00, 0x00, 0x01]);
    const CLIENT_MAC: MacAddr = MacAddr([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);

    fn connection() -> IpoeConnection {
        IpoeConnection::new(
            RELAY_MAC,
            Ipv4Addr::new(10, 0, 0, 1),
            Ipv4Addr::new(255, 255, 255, 0),
            Ipv4Addr::new(10, 0, 0, 2),
        )
    }

    fn udp_frame(sport: u16, dport: u16, payload: &[u8]) -> Vec<u8> {
        let ip = Ipv4Header::new(
            Ipv4Addr::new(10, 0, 0, 2),
            Ipv4Addr::new(1, 1, 1, 1),
            17,
            UdpHeader::HEADER_SIZE + payload.len(),
        );
        let mut datagram = ip.to_bytes();
        datagram.extend_from_slice(&UdpHeader::new(sport, dport, payload.len()).to_bytes());
        datagram.extend_from_slice(payload);
        EthernetFrame::new(RELAY_MAC, CLIENT_MAC, EtherType::IPv4, datagram).to_bytes()
    }

    #[test]
    fn test_arp_is_answered() {
        let mut conn = connection();
        let mut stats = InterceptStats::default();
        let mut body = ArpPacket::new_reply(
            CLIENT_MAC,
            Ipv4Addr::new(10, 0, 0, 2),
            MacAddr::ZERO,
            Ipv4Addr::new(10, 0, 0, 1),
        );
        body.operation = 1;
        let frame =
            EthernetFrame::new(MacAddr::BROADCAST, CLIENT_MAC, EtherType::ARP, body.serialize())
                .to_bytes();

        assert!(matches!(
            intercept_frame(&mut conn, &mut stats, &frame),
            Intercept::Reply(_)
        ));
        assert_eq!(stats.arp_replies, 1);
    }

    #[test]
    fn test_plain_ipv4_is_forwarded_without_padding() {
        let mut conn = connection();
        let mut stats = InterceptStats::default();
        let frame = udp_frame(5353, 53, b"q");

        // 14 + 20 + 8 + 1 = 43 bytes, padded to 60 on the wire
        assert_eq!(frame.len(), 60);
        match intercept_frame(&mut conn, &mut stats, &frame) {
            Intercept::Forward(datagram) => assert_eq!(datagram.len(), 29),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(stats.forwarded, 1);
    }

    #[test]
    fn test_unicast_to_other_host_is_dropped() {
        let mut conn = connection();
        let mut stats = InterceptStats::default();
        let mut frame = udp_frame(5353, 53, b"q");
        frame[..6].copy_from_slice(&[0x00, 0x99, 0x99, 0x99, 0x99, 0x99]);

        assert_eq!(intercept_frame(&mut conn, &mut stats, &frame), Intercept::Drop);
        assert_eq!(stats.forwarded, 0);
        assert_eq!(stats.dropped, 1);
    }

    #[test]
    fn test_bootp_without_cookie_is_forwarded() {
        let mut conn = connection();
        let mut stats = InterceptStats::default();
        let frame = udp_frame(68, 67, &[0u8; 300]);

        assert!(matches!(
            intercept_frame(&mut conn, &mut stats, &frame),
            Intercept::Forward(_)
        ));
    }

    #[test]
    fn test_truncated_dhcp_is_dropped() {
        let mut conn = connection();
        let mut stats = InterceptStats::default();
        let frame = udp_frame(68, 67, &[0u8; 10]);

        assert_eq!(intercept_frame(&mut conn, &mut stats, &frame), Intercept::Drop);
        assert_eq!(stats.dropped, 1);
    }

    #[test]
    fn test_ipv6_ethertype_is_dropped() {
        let mut conn = connection();
        let mut stats = InterceptStats::default();
        let frame = EthernetFrame::new(
            RELAY_MAC,
            CLIENT_MAC,
            EtherType::Custom(0x86DD),
            vec![0x60; 40],
        )
        .to_bytes();
        assert_eq!(intercept_frame(&mut conn, &mut stats, &frame), Intercept::Drop);
    }
}
