//! Internet checksum (RFC 1071)
//!
//! Only the IPv4 header checksum is ever computed by the relay. UDP checksums
//! of synthesized replies are sent as zero.

/// Calculates the Internet Checksum as defined in RFC 1071.
///
/// The data is summed as big-endian 16-bit words with end-around carry. An odd
/// trailing byte is treated as the high byte of a final word whose low byte
/// is zero.
///
/// # Examples
///
/// ```
/// use ipoe_packet::checksum::internet_checksum;
///
/// let header = [0x45, 0x00, 0x00, 0x3c];
/// let checksum = internet_checksum(&header);
/// assert_ne!(checksum, 0);
/// ```
pub fn internet_checksum(data: &[u8]) -> u16 {
    let mut sum: u32 = 0;

    let mut chunks = data.chunks_exact(2);
    for chunk in &mut chunks {
        sum += u16::from_be_bytes([chunk[0], chunk[1]]) as u32;
    }

    if let Some(&byte) = chunks.remainder().first() {
        sum += (byte as u32) << 8;
    }

    while (sum >> 16) != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }

    !sum as u16
}

/// Validates an Internet checksum.
///
/// Summing a header that already carries its checksum yields zero (or the
/// equivalent 0xFFFF in one's complement).
pub fn validate_checksum(data: &[u8]) -> bool {
    let result = internet_checksum(data);
    result == 0 || result == 0xFFFF
}
