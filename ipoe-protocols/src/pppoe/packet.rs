//! PPPoE Packet Structures

use ipoe_core::{ethertypes, Error, MacAddr, Result};
use ipoe_packet::{EtherType, EthernetFrame};
use std::fmt;

pub const PPPOE_DISCOVERY_ETHERTYPE: u16 = ethertypes::PPPOE_DISCOVERY;
pub const PPPOE_SESSION_ETHERTYPE: u16 = ethertypes::PPPOE_SESSION;

/// PPPoE header size (ver/type, code, session, length)
pub const PPPOE_HEADER_SIZE: usize = 6;

/// Largest payload that fits a 1500-byte Ethernet payload
pub const MAX_PPPOE_PAYLOAD: usize = EthernetFrame::MAX_PAYLOAD_SIZE - PPPOE_HEADER_SIZE;

/// Tag header size (type + length)
pub const TAG_HEADER_SIZE: usize = 4;

/// PPPoE Discovery/Session Codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PppoeCode {
    /// PADI - PPPoE Active Discovery Initiation (client broadcast)
    PADI = 0x09,
    /// PADO - PPPoE Active Discovery Offer (server unicast)
    PADO = 0x07,
    /// PADR - PPPoE Active Discovery Request (client unicast)
    PADR = 0x19,
    /// PADS - PPPoE Active Discovery Session-confirmation (server unicast)
    PADS = 0x65,
    /// PADT - PPPoE Active Discovery Terminate (either party)
    PADT = 0xA7,
    /// Session data packet
    SessionData = 0x00,
}

impl PppoeCode {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x09 => Some(Self::PADI),
            0x07 => Some(Self::PADO),
            0x19 => Some(Self::PADR),
            0x65 => Some(Self::PADS),
            0xA7 => Some(Self::PADT),
            0x00 => Some(Self::SessionData),
            _ => None,
        }
    }
}

impl fmt::Display for PppoeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PppoeCode::PADI => "PADI",
            PppoeCode::PADO => "PADO",
            PppoeCode::PADR => "PADR",
            PppoeCode::PADS => "PADS",
            PppoeCode::PADT => "PADT",
            PppoeCode::SessionData => "session",
        };
        f.write_str(name)
    }
}

/// PPPoE Tag Types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum PppoeTagType {
    EndOfList = 0x0000,
    ServiceName = 0x0101,
    ACName = 0x0102,
    HostUniq = 0x0103,
    ACCookie = 0x0104,
    VendorSpecific = 0x0105,
    RelaySessionId = 0x0110,
    ServiceNameError = 0x0201,
    ACSystemError = 0x0202,
    GenericError = 0x0203,
}

impl PppoeTagType {
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            0x0000 => Some(Self::EndOfList),
            0x0101 => Some(Self::ServiceName),
            0x0102 => Some(Self::ACName),
            0x0103 => Some(Self::HostUniq),
            0x0104 => Some(Self::ACCookie),
            0x0105 => Some(Self::VendorSpecific),
            0x0110 => Some(Self::RelaySessionId),
            0x0201 => Some(Self::ServiceNameError),
            0x0202 => Some(Self::ACSystemError),
            0x0203 => Some(Self::GenericError),
            _ => None,
        }
    }
}

/// Owned PPPoE tag (TLV structure)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PppoeTag {
    pub tag_type: u16,
    pub value: Vec<u8>,
}

impl PppoeTag {
    pub fn new(tag_type: PppoeTagType, value: Vec<u8>) -> Self {
        Self {
            tag_type: tag_type as u16,
            value,
        }
    }

    /// Encode tag to bytes (Type + Length + Value)
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(TAG_HEADER_SIZE + self.value.len());
        bytes.extend_from_slice(&self.tag_type.to_be_bytes());
        bytes.extend_from_slice(&(self.value.len() as u16).to_be_bytes());
        bytes.extend_from_slice(&self.value);
        bytes
    }
}

/// Location of a tag inside a packet's payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagRef {
    pub tag_type: u16,
    /// Offset of the tag header within the payload
    pub offset: usize,
    /// Value length
    pub length: usize,
}

impl TagRef {
    /// Offset of the value within the payload
    pub fn value_offset(&self) -> usize {
        self.offset + TAG_HEADER_SIZE
    }

    /// Header plus value
    pub fn total_len(&self) -> usize {
        TAG_HEADER_SIZE + self.length
    }

    /// Known tag type, if any
    pub fn kind(&self) -> Option<PppoeTagType> {
        PppoeTagType::from_u16(self.tag_type)
    }
}

/// A PPPoE frame, Ethernet addressing included
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PppoePacket {
    pub destination: MacAddr,
    pub source: MacAddr,
    pub code: PppoeCode,
    /// Session ID (0x0000 for PADI/PADO/PADR)
    pub session_id: u16,
    /// Tags (discovery) or PPP frame (session), exactly `length` bytes
    pub payload: Vec<u8>,
}

impl PppoePacket {
    /// Build a discovery packet from a list of tags
    pub fn new_discovery(
        destination: MacAddr,
        source: MacAddr,
        code: PppoeCode,
        session_id: u16,
        tags: &[PppoeTag],
    ) -> Self {
        let payload = tags.iter().flat_map(|t| t.to_bytes()).collect();
        Self {
            destination,
            source,
            code,
            session_id,
            payload,
        }
    }

    /// Build a session packet around a PPP frame
    pub fn new_session(destination: MacAddr, source: MacAddr, session_id: u16, payload: Vec<u8>) -> Self {
        Self {
            destination,
            source,
            code: PppoeCode::SessionData,
            session_id,
            payload,
        }
    }

    /// Build a discovery packet that reports `message` in a Generic-Error tag
    ///
    /// A Host-Uniq tag, when given, is echoed before the error so the client
    /// can match the reply to its request.
    pub fn error(
        code: PppoeCode,
        session_id: u16,
        destination: MacAddr,
        source: MacAddr,
        host_uniq: Option<&[u8]>,
        message: &str,
    ) -> Self {
        let mut tags = Vec::with_capacity(2);
        if let Some(value) = host_uniq {
            tags.push(PppoeTag::new(PppoeTagType::HostUniq, value.to_vec()));
        }
        tags.push(PppoeTag::new(
            PppoeTagType::GenericError,
            message.as_bytes().to_vec(),
        ));
        Self::new_discovery(destination, source, code, session_id, &tags)
    }

    /// Parse a PPPoE frame received from a raw socket
    ///
    /// Bytes past the declared length (Ethernet padding) are discarded.
    /// Discovery tag lists must be well formed.
    pub fn from_frame(data: &[u8]) -> Result<Self> {
        let header_end = EthernetFrame::HEADER_SIZE + PPPOE_HEADER_SIZE;
        if data.len() < header_end {
            return Err(Error::malformed(format!("PPPoE frame too short: {} bytes", data.len())));
        }

        let ethertype = u16::from_be_bytes([data[12], data[13]]);
        if ethertype != PPPOE_DISCOVERY_ETHERTYPE && ethertype != PPPOE_SESSION_ETHERTYPE {
            return Err(Error::mismatch(format!("ethertype 0x{:04x}", ethertype)));
        }

        let pppoe = &data[EthernetFrame::HEADER_SIZE..];
        if pppoe[0] != 0x11 {
            return Err(Error::malformed(format!("PPPoE version/type 0x{:02x}", pppoe[0])));
        }

        let code = PppoeCode::from_u8(pppoe[1])
            .ok_or_else(|| Error::malformed(format!("unknown PPPoE code 0x{:02x}", pppoe[1])))?;
        let is_session = ethertype == PPPOE_SESSION_ETHERTYPE;
        if is_session != (code == PppoeCode::SessionData) {
            return Err(Error::malformed(format!("{} on ethertype 0x{:04x}", code, ethertype)));
        }

        let session_id = u16::from_be_bytes([pppoe[2], pppoe[3]]);
        let length = u16::from_be_bytes([pppoe[4], pppoe[5]]) as usize;
        if length > MAX_PPPOE_PAYLOAD || header_end + length > data.len() {
            return Err(Error::malformed(format!(
                "PPPoE length {} exceeds frame of {} bytes",
                length,
                data.len()
            )));
        }

        let packet = Self {
            destination: MacAddr::from_slice(&data[0..6]).unwrap_or_default(),
            source: MacAddr::from_slice(&data[6..12]).unwrap_or_default(),
            code,
            session_id,
            payload: data[header_end..header_end + length].to_vec(),
        };

        if !is_session {
            packet.tags()?;
        }

        Ok(packet)
    }

    pub fn ethertype(&self) -> u16 {
        if self.code == PppoeCode::SessionData {
            PPPOE_SESSION_ETHERTYPE
        } else {
            PPPOE_DISCOVERY_ETHERTYPE
        }
    }

    /// Value of the length field
    pub fn length(&self) -> usize {
        self.payload.len()
    }

    /// Serialize to an Ethernet frame (padded to the 60-byte minimum)
    pub fn to_frame(&self) -> Vec<u8> {
        let mut body = Vec::with_capacity(PPPOE_HEADER_SIZE + self.payload.len());
        body.push(0x11);
        body.push(self.code as u8);
        body.extend_from_slice(&self.session_id.to_be_bytes());
        body.extend_from_slice(&(self.payload.len() as u16).to_be_bytes());
        body.extend_from_slice(&self.payload);

        EthernetFrame::new(
            self.destination,
            self.source,
            EtherType::from_u16(self.ethertype()),
            body,
        )
        .to_bytes()
    }

    /// Walk the tag list up to End-Of-List or the end of the payload
    pub fn tags(&self) -> Result<Vec<TagRef>> {
        let mut tags = Vec::new();
        let mut offset = 0;

        while offset + TAG_HEADER_SIZE <= self.payload.len() {
            let tag_type = u16::from_be_bytes([self.payload[offset], self.payload[offset + 1]]);
            let length =
                u16::from_be_bytes([self.payload[offset + 2], self.payload[offset + 3]]) as usize;

            if tag_type == PppoeTagType::EndOfList as u16 {
                return Ok(tags);
            }
            if offset + TAG_HEADER_SIZE + length > self.payload.len() {
                return Err(Error::malformed(format!(
                    "tag 0x{:04x} of {} bytes overruns payload",
                    tag_type, length
                )));
            }

            tags.push(TagRef {
                tag_type,
                offset,
                length,
            });
            offset += TAG_HEADER_SIZE + length;
        }

        if offset != self.payload.len() {
            return Err(Error::malformed("truncated tag header"));
        }

        Ok(tags)
    }

    /// First tag of the given type
    pub fn find_tag(&self, tag_type: PppoeTagType) -> Option<TagRef> {
        self.tags()
            .ok()?
            .into_iter()
            .find(|t| t.kind() == Some(tag_type))
    }

    pub fn tag_value(&self, tag: &TagRef) -> &[u8] {
        &self.payload[tag.value_offset()..tag.value_offset() + tag.length]
    }

    /// Append a tag to the end of the payload
    pub fn add_tag(&mut self, tag: &PppoeTag) -> Result<()> {
        let end = self.payload.len();
        self.insert_bytes(end, &tag.to_bytes())
    }

    /// Splice `bytes` into the payload at `offset`
    ///
    /// Fails with `BufferOverflow`, leaving the packet untouched, if `offset`
    /// lies past the payload or the result would not fit.
    pub fn insert_bytes(&mut self, offset: usize, bytes: &[u8]) -> Result<()> {
        if offset > self.payload.len() {
            return Err(Error::overflow(offset, self.payload.len()));
        }
        let needed = self.payload.len() + bytes.len();
        if needed > MAX_PPPOE_PAYLOAD {
            return Err(Error::overflow(needed, MAX_PPPOE_PAYLOAD));
        }

        let tail = self.payload.split_off(offset);
        self.payload.extend_from_slice(bytes);
        self.payload.extend_from_slice(&tail);
        Ok(())
    }

    /// Cut `len` bytes out of the payload at `offset`
    ///
    /// Fails with `BufferOverflow`, leaving the packet untouched, if the
    /// range is not inside the payload.
    pub fn remove_bytes(&mut self, offset: usize, len: usize) -> Result<()> {
        let end = offset.checked_add(len).unwrap_or(usize::MAX);
        if end > self.payload.len() {
            return Err(Error::overflow(end, self.payload.len()));
        }

        self.payload.drain(offset..end);
        Ok(())
    }
}
