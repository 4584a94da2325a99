//! ARP packet structure and parsing

use bytes::{BufMut, BytesMut};
use ipoe_core::{Error, MacAddr, Result};
use std::net::Ipv4Addr;

/// Size of an Ethernet/IPv4 ARP body
pub const ARP_PACKET_SIZE: usize = 28;

/// Hardware types
pub const HTYPE_ETHERNET: u16 = 1;

/// Protocol types
pub const PTYPE_IPV4: u16 = 0x0800;

/// ARP Operation Codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArpOpcode {
    Request = 1,
    Reply = 2,
}

impl ArpOpcode {
    pub fn from_u16(val: u16) -> Option<Self> {
        match val {
            1 => Some(Self::Request),
            2 => Some(Self::Reply),
            _ => None,
        }
    }
}

/// ARP Packet
///
/// The header fields are kept raw so that requests with unexpected lengths
/// or types survive parsing and can be rejected by the responder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArpPacket {
    pub htype: u16,
    pub ptype: u16,
    pub hlen: u8,
    pub plen: u8,
    pub operation: u16,
    pub sender_hw_addr: MacAddr,
    pub sender_proto_addr: Ipv4Addr,
    pub target_hw_addr: MacAddr,
    pub target_proto_addr: Ipv4Addr,
}

impl ArpPacket {
    /// Create new ARP reply
    pub fn new_reply(
        sender_mac: MacAddr,
        sender_ip: Ipv4Addr,
        target_mac: MacAddr,
        target_ip: Ipv4Addr,
    ) -> Self {
        Self {
            htype: HTYPE_ETHERNET,
            ptype: PTYPE_IPV4,
            hlen: 6,
            plen: 4,
            operation: ArpOpcode::Reply as u16,
            sender_hw_addr: sender_mac,
            sender_proto_addr: sender_ip,
            target_hw_addr: target_mac,
            target_proto_addr: target_ip,
        }
    }

    /// Parse an ARP body laid out for Ethernet/IPv4 addresses
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < ARP_PACKET_SIZE {
            return Err(Error::malformed("ARP packet too short"));
        }

        let mac = |range: std::ops::Range<usize>| {
            MacAddr::from_slice(&data[range]).ok_or_else(|| Error::malformed("ARP address"))
        };

        Ok(Self {
            htype: u16::from_be_bytes([data[0], data[1]]),
            ptype: u16::from_be_bytes([data[2], data[3]]),
            hlen: data[4],
            plen: data[5],
            operation: u16::from_be_bytes([data[6], data[7]]),
            sender_hw_addr: mac(8..14)?,
            sender_proto_addr: Ipv4Addr::new(data[14], data[15], data[16], data[17]),
            target_hw_addr: mac(18..24)?,
            target_proto_addr: Ipv4Addr::new(data[24], data[25], data[26], data[27]),
        })
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(ARP_PACKET_SIZE);

        buf.put_u16(self.htype);
        buf.put_u16(self.ptype);
        buf.put_u8(self.hlen);
        buf.put_u8(self.plen);
        buf.put_u16(self.operation);
        buf.put_slice(self.sender_hw_addr.as_bytes());
        buf.put_slice(&self.sender_proto_addr.octets());
        buf.put_slice(self.target_hw_addr.as_bytes());
        buf.put_slice(&self.target_proto_addr.octets());

        buf.to_vec()
    }

    /// Ethernet hardware, IPv4 protocol, 6/4 address lengths
    pub fn is_ethernet_ipv4(&self) -> bool {
        self.htype == HTYPE_ETHERNET && self.ptype == PTYPE_IPV4 && self.hlen == 6 && self.plen == 4
    }

    pub fn is_request(&self) -> bool {
        ArpOpcode::from_u16(self.operation) == Some(ArpOpcode::Request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_bytes() -> Vec<u8> {
        vec![
            0x00, 0x01, 0x08, 0x00, 0x06, 0x04, 0x00, 0x01, // header
            0x11, 0x22, 0x33, 0x44, 0x55, 0x66, // sha
            192, 168, 1, 100, // spa
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // tha
            192, 168, 1, 1, // tpa
        ]
    }

    #[test]
    fn test_arp_parse_request() {
        let packet = ArpPacket::parse(&request_bytes()).unwrap();

        assert!(packet.is_request());
        assert!(packet.is_ethernet_ipv4());
        assert_eq!(packet.sender_hw_addr, MacAddr([0x11, 0x22, 0x33, 0x44, 0x55, 0x66]));
        assert_eq!(packet.sender_proto_addr, Ipv4Addr::new(192, 168, 1, 100));
        assert_eq!(packet.target_proto_addr, Ipv4Addr::new(192, 168, 1, 1));
    }

    #[test]
    fn test_arp_parse_keeps_odd_lengths() {
        let mut bytes = request_bytes();
        bytes[4] = 4;
        let packet = ArpPacket::parse(&bytes).unwrap();
        assert_eq!(packet.hlen, 4);
        assert!(!packet.is_ethernet_ipv4());
    }

    #[test]
    fn test_arp_reply_serialize() {
        let reply = ArpPacket::new_reply(
            MacAddr([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]),
            Ipv4Addr::new(10, 0, 0, 1),
            MacAddr([0x11, 0x22, 0x33, 0x44, 0x55, 0x66]),
            Ipv4Addr::new(10, 0, 0, 2),
        );
        let bytes = reply.serialize();

        assert_eq!(bytes.len(), ARP_PACKET_SIZE);
        assert_eq!(&bytes[6..8], &[0x00, 0x02]);
        assert_eq!(ArpPacket::parse(&bytes).unwrap(), reply);
    }

    #[test]
    fn test_arp_too_short() {
        assert!(matches!(
            ArpPacket::parse(&request_bytes()[..27]),
            Err(Error::MalformedPacket(_))
        ));
    }
}
