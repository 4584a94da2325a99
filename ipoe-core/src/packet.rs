//! Received frame envelope

use std::fmt;

/// Which socket a frame arrived on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketKind {
    /// PPPoE discovery (0x8863)
    Discovery,
    /// PPPoE session (0x8864)
    Session,
    /// IPoE client side (ARP and IPv4)
    Ip,
}

impl fmt::Display for SocketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SocketKind::Discovery => write!(f, "discovery"),
            SocketKind::Session => write!(f, "session"),
            SocketKind::Ip => write!(f, "ip"),
        }
    }
}

/// A frame received from one of the relay's sockets
#[derive(Debug, Clone)]
pub struct Packet {
    /// Index of the interface the frame arrived on
    pub interface: usize,
    /// Socket the frame arrived on
    pub socket: SocketKind,
    /// Frame bytes, starting at the Ethernet header
    pub data: Vec<u8>,
}

impl Packet {
    /// Create a new packet
    pub fn new(interface: usize, socket: SocketKind, data: Vec<u8>) -> Self {
        Self {
            interface,
            socket,
            data,
        }
    }

    /// Get packet data as slice
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
