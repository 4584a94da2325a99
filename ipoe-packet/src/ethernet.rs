//! Ethernet II frame construction and parsing

use bytes::{BufMut, BytesMut};
use ipoe_core::{ethertypes, MacAddr};
use std::fmt;

/// EtherType values the relay handles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EtherType {
    /// IPv4 (0x0800)
    IPv4,
    /// ARP (0x0806)
    ARP,
    /// PPPoE Discovery (0x8863)
    PPPoEDiscovery,
    /// PPPoE Session (0x8864)
    PPPoESession,
    /// Anything else, carried through untouched
    Custom(u16),
}

impl EtherType {
    pub fn to_u16(self) -> u16 {
        match self {
            EtherType::IPv4 => ethertypes::IPV4,
            EtherType::ARP => ethertypes::ARP,
            EtherType::PPPoEDiscovery => ethertypes::PPPOE_DISCOVERY,
            EtherType::PPPoESession => ethertypes::PPPOE_SESSION,
            EtherType::Custom(val) => val,
        }
    }

    pub fn from_u16(value: u16) -> Self {
        match value {
            ethertypes::IPV4 => EtherType::IPv4,
            ethertypes::ARP => EtherType::ARP,
            ethertypes::PPPOE_DISCOVERY => EtherType::PPPoEDiscovery,
            ethertypes::PPPOE_SESSION => EtherType::PPPoESession,
            val => EtherType::Custom(val),
        }
    }
}

impl fmt::Display for EtherType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EtherType::IPv4 => write!(f, "IPv4"),
            EtherType::ARP => write!(f, "ARP"),
            EtherType::PPPoEDiscovery => write!(f, "PPPoE-Discovery"),
            EtherType::PPPoESession => write!(f, "PPPoE-Session"),
            EtherType::Custom(val) => write!(f, "0x{:04X}", val),
        }
    }
}

/// Ethernet II frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EthernetFrame {
    pub destination: MacAddr,
    pub source: MacAddr,
    pub ethertype: EtherType,
    pub payload: Vec<u8>,
}

impl EthernetFrame {
    /// Minimum Ethernet frame size (without FCS)
    pub const MIN_FRAME_SIZE: usize = 60;

    /// Maximum Ethernet frame size (without FCS)
    pub const MAX_FRAME_SIZE: usize = 1514;

    /// Ethernet header size (dst + src + type)
    pub const HEADER_SIZE: usize = 14;

    /// Maximum payload size (MTU)
    pub const MAX_PAYLOAD_SIZE: usize = 1500;

    pub fn new(
        destination: MacAddr,
        source: MacAddr,
        ethertype: EtherType,
        payload: Vec<u8>,
    ) -> Self {
        EthernetFrame {
            destination,
            source,
            ethertype,
            payload,
        }
    }

    /// Serialize the frame, padding short frames to the 60-byte minimum
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buffer = BytesMut::with_capacity(Self::HEADER_SIZE + self.payload.len());

        buffer.put_slice(self.destination.as_bytes());
        buffer.put_slice(self.source.as_bytes());
        buffer.put_u16(self.ethertype.to_u16());
        buffer.put_slice(&self.payload);

        let mut result = buffer.to_vec();
        if result.len() < Self::MIN_FRAME_SIZE {
            result.resize(Self::MIN_FRAME_SIZE, 0);
        }

        result
    }

    /// Parse an Ethernet II frame
    ///
    /// Returns `None` for frames shorter than the header, frames longer than
    /// 1514 bytes and 802.3 length-field frames.
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < Self::HEADER_SIZE || data.len() > Self::MAX_FRAME_SIZE {
            return None;
        }

        let destination = MacAddr::from_slice(&data[0..6])?;
        let source = MacAddr::from_slice(&data[6..12])?;

        let ethertype = u16::from_be_bytes([data[12], data[13]]);
        if ethertype <= 1500 {
            return None;
        }

        Some(EthernetFrame {
            destination,
            source,
            ethertype: EtherType::from_u16(ethertype),
            payload: data[Self::HEADER_SIZE..].to_vec(),
        })
    }
}

/// Read the EtherType of a raw frame without copying it
pub fn peek_ethertype(frame: &[u8]) -> Option<EtherType> {
    if frame.len() < EthernetFrame::HEADER_SIZE {
        return None;
    }
    Some(EtherType::from_u16(u16::from_be_bytes([frame[12], frame[13]])))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ethertype_conversion() {
        assert_eq!(EtherType::IPv4.to_u16(), 0x0800);
        assert_eq!(EtherType::PPPoESession.to_u16(), 0x8864);
        assert_eq!(EtherType::from_u16(0x8863), EtherType::PPPoEDiscovery);
        assert_eq!(EtherType::from_u16(0x86DD), EtherType::Custom(0x86DD));
    }

    #[test]
    fn test_ethernet_frame_to_bytes() {
        let src = MacAddr([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
        let dst = MacAddr([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);

        let frame = EthernetFrame::new(dst, src, EtherType::ARP, vec![1, 2, 3, 4]);
        let bytes = frame.to_bytes();

        assert_eq!(bytes.len(), EthernetFrame::MIN_FRAME_SIZE);
        assert_eq!(&bytes[0..6], dst.as_bytes());
        assert_eq!(&bytes[6..12], src.as_bytes());
        assert_eq!(u16::from_be_bytes([bytes[12], bytes[13]]), 0x0806);
        assert_eq!(&bytes[14..18], &[1, 2, 3, 4]);
        assert!(bytes[18..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_ethernet_frame_from_bytes() {
        let data = vec![
            0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF, // dst
            0x00, 0x11, 0x22, 0x33, 0x44, 0x55, // src
            0x88, 0x64, // PPPoE session
            0x11, 0x00, 0x00, 0x01,
        ];

        let frame = EthernetFrame::from_bytes(&data).unwrap();
        assert_eq!(frame.destination.0, [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);
        assert_eq!(frame.source.0, [0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
        assert_eq!(frame.ethertype, EtherType::PPPoESession);
        assert_eq!(frame.payload, vec![0x11, 0x00, 0x00, 0x01]);
    }

    #[test]
    fn test_ethernet_frame_rejects_bad_sizes() {
        assert!(EthernetFrame::from_bytes(&[0u8; 13]).is_none());

        let mut oversize = vec![0u8; 1515];
        oversize[12] = 0x08;
        assert!(EthernetFrame::from_bytes(&oversize).is_none());

        // 802.3 length field
        let mut llc = vec![0u8; 60];
        llc[12] = 0x00;
        llc[13] = 0x2e;
        assert!(EthernetFrame::from_bytes(&llc).is_none());
    }

    #[test]
    fn test_peek_ethertype() {
        let frame = EthernetFrame::new(
            MacAddr::BROADCAST,
            MacAddr([2, 0, 0, 0, 0, 1]),
            EtherType::PPPoEDiscovery,
            vec![],
        )
        .to_bytes();
        assert_eq!(peek_ethertype(&frame), Some(EtherType::PPPoEDiscovery));
        assert_eq!(peek_ethertype(&frame[..10]), None);
    }
}
