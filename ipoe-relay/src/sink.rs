//! Outbound frame path
//!
//! The relay never owns sockets. Frames leave through a [`FrameSink`],
//! addressed by interface index and socket kind, the same way they arrive.

use ipoe_core::{Result, SocketKind};

/// Something that can put a finished Ethernet frame on the wire
pub trait FrameSink {
    fn send(&mut self, interface: usize, socket: SocketKind, frame: &[u8]) -> Result<()>;
}

impl<T: FrameSink + ?Sized> FrameSink for &mut T {
    fn send(&mut self, interface: usize, socket: SocketKind, frame: &[u8]) -> Result<()> {
        (**self).send(interface, socket, frame)
    }
}
