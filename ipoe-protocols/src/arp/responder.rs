//! Proxy ARP for the virtual gateway

use super::packet::ArpPacket;
use crate::connection::IpoeConnection;
use ipoe_core::{Error, Result};
use ipoe_packet::{EtherType, EthernetFrame};
use tracing::debug;

/// Answer an ARP request received on the IPoE interface
///
/// Anything other than an Ethernet/IPv4 request is rejected with
/// `MalformedPacket` and must be dropped silently. On success the requester
/// becomes the connection's peer and the reply frame is returned for
/// transmission on the same interface.
pub fn handle_arp_request(conn: &mut IpoeConnection, frame: &EthernetFrame) -> Result<EthernetFrame> {
    let request = ArpPacket::parse(&frame.payload)?;

    if !request.is_ethernet_ipv4() {
        return Err(Error::malformed(format!(
            "ARP htype={} ptype=0x{:04x} hlen={} plen={}",
            request.htype, request.ptype, request.hlen, request.plen
        )));
    }
    if !request.is_request() {
        return Err(Error::malformed(format!("ARP opcode {}", request.operation)));
    }

    conn.peer_mac = request.sender_hw_addr;

    let reply = ArpPacket::new_reply(
        conn.my_mac,
        request.target_proto_addr,
        conn.peer_mac,
        request.sender_proto_addr,
    );

    debug!(
        peer = %conn.peer_mac,
        target = %request.target_proto_addr,
        "Answering ARP request"
    );

    Ok(EthernetFrame::new(
        conn.peer_mac,
        conn.my_mac,
        EtherType::ARP,
        reply.serialize(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ipoe_core::MacAddr;
    use std::net::Ipv4Addr;

    const RELAY_MAC: MacAddr = MacAddr([0x02, 0x00, 0x00, 0x00, 0x00, 0x01]);
    const CLIENT_MAC: MacAddr = MacAddr([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);

    fn connection() -> IpoeConnection {
        IpoeConnection::new(
            RELAY_MAC,
            Ipv4Addr::new(192, 168, 1, 1),
            Ipv4Addr::new(255, 255, 255, 0),
            Ipv4Addr::new(192, 168, 1, 2),
        )
    }

    fn request_frame(hlen: u8, op: u16) -> EthernetFrame {
        let mut body = ArpPacket::new_reply(
            CLIENT_MAC,
            Ipv4Addr::new(192, 168, 1, 2),
            MacAddr::ZERO,
            Ipv4Addr::new(192, 168, 1, 1),
        );
        body.hlen = hlen;
        body.operation = op;
        EthernetFrame::new(MacAddr::BROADCAST, CLIENT_MAC, EtherType::ARP, body.serialize())
    }

    #[test]
    fn test_arp_request_is_answered() {
        let mut conn = connection();
        let reply = handle_arp_request(&mut conn, &request_frame(6, 1)).unwrap();

        assert_eq!(conn.peer_mac, CLIENT_MAC);
        assert_eq!(reply.destination, CLIENT_MAC);
        assert_eq!(reply.source, RELAY_MAC);
        assert_eq!(reply.ethertype, EtherType::ARP);

        let body = ArpPacket::parse(&reply.payload).unwrap();
        assert_eq!(body.operation, 2);
        assert_eq!(body.sender_hw_addr, RELAY_MAC);
        assert_eq!(body.sender_proto_addr, Ipv4Addr::new(192, 168, 1, 1));
        assert_eq!(body.target_hw_addr, CLIENT_MAC);
        assert_eq!(body.target_proto_addr, Ipv4Addr::new(192, 168, 1, 2));
    }

    #[test]
    fn test_arp_wrong_hlen_produces_no_reply() {
        let mut conn = connection();
        let result = handle_arp_request(&mut conn, &request_frame(4, 1));

        assert!(matches!(result, Err(Error::MalformedPacket(_))));
        assert!(!conn.has_peer());
    }

    #[test]
    fn test_arp_reply_is_ignored() {
        let mut conn = connection();
        assert!(handle_arp_request(&mut conn, &request_frame(6, 2)).is_err());
        assert!(!conn.has_peer());
    }
}
