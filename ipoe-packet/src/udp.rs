//! UDP header encoding and decoding

use bytes::{BufMut, BytesMut};

/// UDP header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UdpHeader {
    pub source_port: u16,
    pub destination_port: u16,
    /// Length of header plus data
    pub length: u16,
    /// Zero means "no checksum"
    pub checksum: u16,
}

impl UdpHeader {
    /// UDP header size in bytes
    pub const HEADER_SIZE: usize = 8;

    /// Create a header covering `payload_len` data bytes, without a checksum
    pub fn new(source_port: u16, destination_port: u16, payload_len: usize) -> Self {
        UdpHeader {
            source_port,
            destination_port,
            length: (Self::HEADER_SIZE + payload_len) as u16,
            checksum: 0,
        }
    }

    pub fn to_bytes(&self) -> [u8; 8] {
        let mut buffer = BytesMut::with_capacity(Self::HEADER_SIZE);
        buffer.put_u16(self.source_port);
        buffer.put_u16(self.destination_port);
        buffer.put_u16(self.length);
        buffer.put_u16(self.checksum);

        let mut out = [0u8; 8];
        out.copy_from_slice(&buffer);
        out
    }

    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < Self::HEADER_SIZE {
            return None;
        }

        Some(UdpHeader {
            source_port: u16::from_be_bytes([data[0], data[1]]),
            destination_port: u16::from_be_bytes([data[2], data[3]]),
            length: u16::from_be_bytes([data[4], data[5]]),
            checksum: u16::from_be_bytes([data[6], data[7]]),
        })
    }
}
