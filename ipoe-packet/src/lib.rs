//! Packet framing for the IPoE/PPPoE relay
//!
//! Bounds-checked encoders and decoders for the layers the relay touches:
//!
//! - [`ethernet`] - Ethernet II frames
//! - [`ip`] - IPv4 headers
//! - [`udp`] - UDP headers
//! - [`checksum`] - Internet checksum (RFC 1071)
//!
//! plus [`classify_dhcp_candidate`], which decides whether an IPv4 datagram
//! should be handed to the local DHCP responder.
//!
//! # Example
//!
//! ```rust
//! use ipoe_core::MacAddr;
//! use ipoe_packet::ethernet::{EtherType, EthernetFrame};
//!
//! let src = MacAddr([0x02, 0x00, 0x00, 0x00, 0x00, 0x01]);
//! let frame = EthernetFrame::new(MacAddr::BROADCAST, src, EtherType::ARP, vec![0; 28]);
//! assert_eq!(frame.to_bytes().len(), 60);
//! ```

pub mod checksum;
pub mod ethernet;
pub mod ip;
pub mod udp;

pub use checksum::{internet_checksum, validate_checksum};
pub use ethernet::{peek_ethertype, EtherType, EthernetFrame};
pub use ip::Ipv4Header;
pub use udp::UdpHeader;

use ipoe_core::protocol_constants::{DHCP_CLIENT_PORT, DHCP_SERVER_PORT, IPPROTO_UDP};

/// True if an IPv4 datagram (Ethernet payload) is a client-to-server DHCP packet
///
/// The datagram must be version 4 with the whole flags/fragment field zero,
/// carry UDP, and go from port 68 to port 67. Buffers too short for both
/// headers are never candidates.
pub fn classify_dhcp_candidate(datagram: &[u8]) -> bool {
    let Some(ip) = Ipv4Header::from_bytes(datagram) else {
        return false;
    };

    if ip.flags_fragment != 0 || ip.protocol != IPPROTO_UDP {
        return false;
    }

    match UdpHeader::from_bytes(&datagram[ip.header_len()..]) {
        Some(udp) => udp.source_port == DHCP_CLIENT_PORT && udp.destination_port == DHCP_SERVER_PORT,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn datagram(flags_fragment: u16, protocol: u8, sport: u16, dport: u16) -> Vec<u8> {
        let mut ip = Ipv4Header::new(Ipv4Addr::UNSPECIFIED, Ipv4Addr::BROADCAST, protocol, 8);
        ip.flags_fragment = flags_fragment;
        let mut bytes = ip.to_bytes();
        bytes.extend_from_slice(&UdpHeader::new(sport, dport, 0).to_bytes());
        bytes
    }

    #[test]
    fn test_dhcp_candidate() {
        assert!(classify_dhcp_candidate(&datagram(0, 17, 68, 67)));
    }

    #[test]
    fn test_dhcp_candidate_rejects_reversed_ports() {
        assert!(!classify_dhcp_candidate(&datagram(0, 17, 67, 68)));
        assert!(!classify_dhcp_candidate(&datagram(0, 17, 68, 53)));
    }

    #[test]
    fn test_dhcp_candidate_rejects_any_flag_bits() {
        // DF alone is enough to disqualify
        assert!(!classify_dhcp_candidate(&datagram(0x4000, 17, 68, 67)));
        assert!(!classify_dhcp_candidate(&datagram(0x0001, 17, 68, 67)));
    }

    #[test]
    fn test_dhcp_candidate_rejects_tcp() {
        assert!(!classify_dhcp_candidate(&datagram(0, 6, 68, 67)));
    }

    #[test]
    fn test_dhcp_candidate_short_buffers() {
        let bytes = datagram(0, 17, 68, 67);
        assert!(!classify_dhcp_candidate(&bytes[..24]));
        assert!(!classify_dhcp_candidate(&bytes[..10]));
        assert!(!classify_dhcp_candidate(&[]));
    }
}
