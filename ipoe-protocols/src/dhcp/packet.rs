//! BOOTP/DHCP message layout
//!
//! A message as it travels over the IPoE link: IPv4 header, UDP header, the
//! 236-byte BOOTP header and an options area of at most 312 bytes starting
//! with the magic cookie. Lengths in the IP and UDP headers are recomputed
//! from the actual extent whenever a message is encoded.

use bytes::{BufMut, BytesMut};
use ipoe_core::{Error, Result};
use ipoe_packet::{Ipv4Header, UdpHeader};
use std::fmt;
use std::net::Ipv4Addr;

/// DHCP magic cookie (0x63825363)
pub const DHCP_MAGIC_COOKIE: [u8; 4] = [0x63, 0x82, 0x53, 0x63];

/// Broadcast flag value
pub const DHCP_BROADCAST_FLAG: u16 = 0x8000;

pub const BOOTREQUEST: u8 = 1;
pub const BOOTREPLY: u8 = 2;

/// Ethernet hardware type
pub const HTYPE_ETHERNET: u8 = 1;

/// Ethernet hardware address length
pub const HLEN_ETHERNET: u8 = 6;

/// Fixed BOOTP header size
pub const BOOTP_HEADER_SIZE: usize = 236;

/// Options area size, magic cookie included
pub const MAX_OPTIONS_SIZE: usize = 312;

/// DHCP Message Types (RFC 2132, RFC 3203)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DhcpMessageType {
    Discover = 1,
    Offer = 2,
    Request = 3,
    Decline = 4,
    Ack = 5,
    Nak = 6,
    Release = 7,
    Inform = 8,
    ForceRenew = 9,
}

impl DhcpMessageType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(DhcpMessageType::Discover),
            2 => Some(DhcpMessageType::Offer),
            3 => Some(DhcpMessageType::Request),
            4 => Some(DhcpMessageType::Decline),
            5 => Some(DhcpMessageType::Ack),
            6 => Some(DhcpMessageType::Nak),
            7 => Some(DhcpMessageType::Release),
            8 => Some(DhcpMessageType::Inform),
            9 => Some(DhcpMessageType::ForceRenew),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DhcpMessageType::Discover => "DISCOVER",
            DhcpMessageType::Offer => "OFFER",
            DhcpMessageType::Request => "REQUEST",
            DhcpMessageType::Decline => "DECLINE",
            DhcpMessageType::Ack => "ACK",
            DhcpMessageType::Nak => "NAK",
            DhcpMessageType::Release => "RELEASE",
            DhcpMessageType::Inform => "INFORM",
            DhcpMessageType::ForceRenew => "FORCERENEW",
        }
    }
}

impl fmt::Display for DhcpMessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Fixed BOOTP header (RFC 951 / RFC 2131)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootpHeader {
    /// 1 = BOOTREQUEST, 2 = BOOTREPLY
    pub op: u8,
    pub htype: u8,
    pub hlen: u8,
    pub hops: u8,
    /// Transaction ID
    pub xid: u32,
    pub secs: u16,
    /// Flags (broadcast bit)
    pub flags: u16,
    pub ciaddr: Ipv4Addr,
    pub yiaddr: Ipv4Addr,
    pub siaddr: Ipv4Addr,
    pub giaddr: Ipv4Addr,
    /// Client hardware address (only the first hlen bytes are meaningful)
    pub chaddr: [u8; 16],
    pub sname: [u8; 64],
    pub file: [u8; 128],
}

impl BootpHeader {
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < BOOTP_HEADER_SIZE {
            return Err(Error::malformed(format!(
                "BOOTP header too short: {} bytes (minimum {})",
                data.len(),
                BOOTP_HEADER_SIZE
            )));
        }

        let addr = |i: usize| Ipv4Addr::new(data[i], data[i + 1], data[i + 2], data[i + 3]);

        let mut chaddr = [0u8; 16];
        chaddr.copy_from_slice(&data[28..44]);
        let mut sname = [0u8; 64];
        sname.copy_from_slice(&data[44..108]);
        let mut file = [0u8; 128];
        file.copy_from_slice(&data[108..236]);

        Ok(Self {
            op: data[0],
            htype: data[1],
            hlen: data[2],
            hops: data[3],
            xid: u32::from_be_bytes([data[4], data[5], data[6], data[7]]),
            secs: u16::from_be_bytes([data[8], data[9]]),
            flags: u16::from_be_bytes([data[10], data[11]]),
            ciaddr: addr(12),
            yiaddr: addr(16),
            siaddr: addr(20),
            giaddr: addr(24),
            chaddr,
            sname,
            file,
        })
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.op);
        buf.put_u8(self.htype);
        buf.put_u8(self.hlen);
        buf.put_u8(self.hops);
        buf.put_u32(self.xid);
        buf.put_u16(self.secs);
        buf.put_u16(self.flags);
        buf.put_slice(&self.ciaddr.octets());
        buf.put_slice(&self.yiaddr.octets());
        buf.put_slice(&self.siaddr.octets());
        buf.put_slice(&self.giaddr.octets());
        buf.put_slice(&self.chaddr);
        buf.put_slice(&self.sname);
        buf.put_slice(&self.file);
    }

    /// Set the server host name, zero-filling the rest of the field
    pub fn set_sname(&mut self, name: &[u8]) {
        self.sname = [0; 64];
        let len = name.len().min(self.sname.len());
        self.sname[..len].copy_from_slice(&name[..len]);
    }

    pub fn is_broadcast(&self) -> bool {
        self.flags & DHCP_BROADCAST_FLAG != 0
    }
}

/// A complete BOOTP/DHCP datagram
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootpMessage {
    pub ip: Ipv4Header,
    pub udp: UdpHeader,
    pub bootp: BootpHeader,
    /// Options area: magic cookie followed by the option list
    pub options: Vec<u8>,
}

impl BootpMessage {
    /// Decode an IPv4 datagram carrying BOOTP
    ///
    /// The options area is bounded by the UDP length, the bytes actually
    /// received and the 312-byte maximum, whichever is smallest.
    pub fn from_datagram(data: &[u8]) -> Result<Self> {
        let ip = Ipv4Header::from_bytes(data).ok_or_else(|| Error::malformed("IPv4 header"))?;
        let udp_start = ip.header_len();
        let udp = UdpHeader::from_bytes(&data[udp_start..])
            .ok_or_else(|| Error::malformed("UDP header"))?;

        let bootp_start = udp_start + UdpHeader::HEADER_SIZE;
        let bootp = BootpHeader::parse(&data[bootp_start..])?;

        let options_start = bootp_start + BOOTP_HEADER_SIZE;
        let options_len = (data.len() - options_start)
            .min(Self::declared_options_len(&udp))
            .min(MAX_OPTIONS_SIZE);

        Ok(Self {
            ip,
            udp,
            bootp,
            options: data[options_start..options_start + options_len].to_vec(),
        })
    }

    /// Options-area length implied by a UDP header (UDP length - 244), never negative
    pub fn declared_options_len(udp: &UdpHeader) -> usize {
        (udp.length as usize).saturating_sub(UdpHeader::HEADER_SIZE + BOOTP_HEADER_SIZE)
    }

    /// True if the options area starts with the DHCP magic cookie
    pub fn has_magic_cookie(&self) -> bool {
        self.options.starts_with(&DHCP_MAGIC_COOKIE)
    }

    /// Option list following the magic cookie
    pub fn option_list(&self) -> &[u8] {
        self.options.get(DHCP_MAGIC_COOKIE.len()..).unwrap_or(&[])
    }

    /// UDP length for the current options area
    pub fn udp_length(&self) -> usize {
        UdpHeader::HEADER_SIZE + BOOTP_HEADER_SIZE + self.options.len()
    }

    /// IP total length for the current options area
    pub fn ip_total_length(&self) -> usize {
        Ipv4Header::MIN_HEADER_SIZE + self.udp_length()
    }

    /// Encode the datagram, fixing up both length fields and the IP checksum
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut ip = self.ip.clone();
        ip.ihl = 5;
        ip.options.clear();
        ip.total_length = self.ip_total_length() as u16;

        let mut udp = self.udp;
        udp.length = self.udp_length() as u16;

        let mut buf = BytesMut::with_capacity(self.ip_total_length());
        buf.put_slice(&ip.to_bytes());
        buf.put_slice(&udp.to_bytes());
        self.bootp.encode(&mut buf);
        buf.put_slice(&self.options);

        buf.to_vec()
    }
}
