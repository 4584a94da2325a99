//! DHCP option lists
//!
//! [`OptionTable`] is a parsed view over an options area. It borrows the
//! buffer it was parsed from, so it lives exactly as long as the packet being
//! handled. [`OptionWriter`] appends options to an outgoing options area and
//! keeps the list terminated after every write.

use ipoe_core::{Error, Result};

/// Single pad byte
pub const OPTION_PAD: u8 = 0;
/// End of the option list
pub const OPTION_END: u8 = 255;

pub const OPTION_SUBNET_MASK: u8 = 1;
pub const OPTION_ROUTER: u8 = 3;
pub const OPTION_DNS_SERVER: u8 = 6;
pub const OPTION_LEASE_TIME: u8 = 51;
pub const OPTION_MESSAGE_TYPE: u8 = 53;
pub const OPTION_SERVER_ID: u8 = 54;

/// One option, borrowing its value from the options area
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DhcpOption<'a> {
    pub code: u8,
    pub value: &'a [u8],
}

impl<'a> DhcpOption<'a> {
    pub fn len(&self) -> usize {
        self.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

/// Parsed option list of a single DHCP message
#[derive(Debug, Clone, Default)]
pub struct OptionTable<'a> {
    entries: Vec<DhcpOption<'a>>,
    terminated: bool,
}

impl<'a> OptionTable<'a> {
    /// Maximum number of options kept per message
    pub const MAX_OPTIONS: usize = 255;

    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the first `max_length` bytes of `buffer`
    ///
    /// Pad bytes are skipped. Scanning stops at the terminator, after
    /// `max_length` bytes, after [`Self::MAX_OPTIONS`] options, or at the
    /// first option that runs past the buffer. Anything parsed before is
    /// discarded. Returns the number of options found.
    pub fn parse(&mut self, buffer: &'a [u8], max_length: usize) -> usize {
        self.entries.clear();
        self.terminated = false;

        let limit = max_length.min(buffer.len());
        let mut pos = 0;

        while pos < limit && self.entries.len() < Self::MAX_OPTIONS {
            match buffer[pos] {
                OPTION_PAD => pos += 1,
                OPTION_END => {
                    self.terminated = true;
                    break;
                }
                code => {
                    let Some(&len) = buffer.get(pos + 1) else {
                        break;
                    };
                    let start = pos + 2;
                    let end = start + len as usize;
                    if end > buffer.len() {
                        break;
                    }
                    self.entries.push(DhcpOption {
                        code,
                        value: &buffer[start..end],
                    });
                    pos = end;
                }
            }
        }

        self.entries.len()
    }

    /// First option with the given code
    pub fn find(&self, code: u8) -> Option<&DhcpOption<'a>> {
        self.entries.iter().find(|opt| opt.code == code)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DhcpOption<'a>> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True if the list ended with an explicit terminator
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }
}

/// Appends options into a fixed-size options area
///
/// The cursor always sits on the terminator written by the last append.
#[derive(Debug)]
pub struct OptionWriter<'b> {
    buffer: &'b mut [u8],
    cursor: usize,
}

impl<'b> OptionWriter<'b> {
    /// Start writing at `cursor` (e.g. just past the magic cookie)
    pub fn new(buffer: &'b mut [u8], cursor: usize) -> Self {
        Self { buffer, cursor }
    }

    /// Write `code`, length and `value`, padding odd lengths to a word boundary
    ///
    /// Fails with `BufferOverflow`, leaving the buffer untouched, if the
    /// option, its pad and the terminator do not fit.
    pub fn append(&mut self, code: u8, value: &[u8]) -> Result<()> {
        let len = u8::try_from(value.len())
            .map_err(|_| Error::malformed(format!("option {} value exceeds 255 bytes", code)))?;

        let pad = value.len() & 1;
        let needed = self.cursor + 2 + value.len() + pad + 1;
        if needed > self.buffer.len() {
            return Err(Error::overflow(needed, self.buffer.len()));
        }

        let mut pos = self.cursor;
        self.buffer[pos] = code;
        self.buffer[pos + 1] = len;
        pos += 2;
        self.buffer[pos..pos + value.len()].copy_from_slice(value);
        pos += value.len();
        if pad == 1 {
            self.buffer[pos] = OPTION_PAD;
            pos += 1;
        }
        self.buffer[pos] = OPTION_END;
        self.cursor = pos;

        Ok(())
    }

    /// Position of the terminator
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Bytes used, terminator included
    pub fn extent(&self) -> usize {
        self.cursor + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_then_parse() {
        let mut area = [0u8; 32];
        let mut writer = OptionWriter::new(&mut area, 0);
        writer.append(OPTION_MESSAGE_TYPE, &[2]).unwrap();
        writer.append(OPTION_SERVER_ID, &[192, 168, 1, 1]).unwrap();
        let extent = writer.extent();

        // 53/1/value/pad, 54/4/value, terminator
        assert_eq!(extent, 4 + 6 + 1);
        assert_eq!(&area[..extent], &[53, 1, 2, 0, 54, 4, 192, 168, 1, 1, 255]);

        let mut table = OptionTable::new();
        assert_eq!(table.parse(&area, area.len()), 2);
        assert!(table.is_terminated());
        assert_eq!(table.find(OPTION_MESSAGE_TYPE).unwrap().value, &[2]);
        assert_eq!(table.find(OPTION_SERVER_ID).unwrap().value, &[192, 168, 1, 1]);
    }

    #[test]
    fn test_append_overflow_writes_nothing() {
        let mut area = [0xAAu8; 8];
        let mut writer = OptionWriter::new(&mut area, 0);
        writer.append(OPTION_SERVER_ID, &[1, 2, 3, 4]).unwrap();
        assert_eq!(writer.cursor(), 6);

        let err = writer.append(OPTION_ROUTER, &[1, 2, 3, 4]).unwrap_err();
        assert!(matches!(err, Error::BufferOverflow { needed: 13, capacity: 8 }));
        assert_eq!(writer.cursor(), 6);
        assert_eq!(area[6], OPTION_END);
        assert_eq!(area[7], 0xAA);
    }

    #[test]
    fn test_parse_skips_pads_and_stops_at_end() {
        let area = [0, 0, 53, 1, 3, 0, 255, 54, 4, 1, 2, 3, 4];
        let mut table = OptionTable::new();
        assert_eq!(table.parse(&area, area.len()), 1);
        assert!(table.find(OPTION_SERVER_ID).is_none());
    }

    #[test]
    fn test_parse_honours_max_length() {
        let area = [53, 1, 1, 54, 4, 1, 2, 3, 4, 255];
        let mut table = OptionTable::new();
        assert_eq!(table.parse(&area, 3), 1);
        assert!(!table.is_terminated());
    }

    #[test]
    fn test_parse_truncated_option_stops_at_boundary() {
        let area = [53, 1, 1, 12, 10, b'h', b'o'];
        let mut table = OptionTable::new();
        assert_eq!(table.parse(&area, 312), 1);
        assert!(table.find(12).is_none());

        // Code byte with no length byte
        let area = [53, 1, 5, 61];
        assert_eq!(table.parse(&area, area.len()), 1);
    }

    #[test]
    fn test_reparse_clears_previous_contents() {
        let first = [53, 1, 1, 255];
        let second = [54, 4, 10, 0, 0, 1, 255];
        let mut table = OptionTable::new();
        table.parse(&first, first.len());
        table.parse(&second, second.len());

        assert!(table.find(OPTION_MESSAGE_TYPE).is_none());
        assert!(table.find(OPTION_SERVER_ID).is_some());
    }

    #[test]
    fn test_parse_caps_option_count() {
        // 300 zero-length options, no terminator
        let area: Vec<u8> = std::iter::repeat([12u8, 0]).take(300).flatten().collect();
        let mut table = OptionTable::new();
        assert_eq!(table.parse(&area, area.len()), OptionTable::MAX_OPTIONS);
    }

    #[test]
    fn test_find_returns_first_match() {
        let area = [12, 1, b'a', 12, 1, b'b', 255];
        let mut table = OptionTable::new();
        table.parse(&area, area.len());
        assert_eq!(table.find(12).unwrap().value, b"a");
    }
}
