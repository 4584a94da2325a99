//! PPP authentication snooping
//!
//! Session-stage payloads are inspected, never modified, to learn who
//! authenticated on a session and which multilink endpoint it belongs to.

/// PPP protocol numbers
pub const PPP_IPV4: u16 = 0x0021;
pub const PPP_LCP: u16 = 0xC021;
pub const PPP_PAP: u16 = 0xC023;
pub const PPP_CHAP: u16 = 0xC223;

const LCP_CONFIGURE_REQUEST: u8 = 1;
const LCP_OPT_ENDPOINT_DISCRIMINATOR: u8 = 19;

const PAP_AUTHENTICATE_REQUEST: u8 = 1;
const PAP_AUTHENTICATE_ACK: u8 = 2;

const CHAP_RESPONSE: u8 = 2;
const CHAP_SUCCESS: u8 = 3;

/// Longest endpoint discriminator address accepted (RFC 1990)
pub const MAX_EPDIS_DATA: usize = 20;

/// Longest userid kept per session
pub const MAX_USERID_LEN: usize = 128;

/// Something worth remembering about a session's authentication
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent<'a> {
    /// Client offered an LCP Endpoint Discriminator
    EndpointDiscriminator { class: u8, data: &'a [u8] },
    /// Client sent a PAP Authenticate-Request
    PapRequest { id: u8, peer_id: &'a [u8] },
    /// AC accepted a PAP request
    PapAck { id: u8 },
    /// Client answered a CHAP challenge
    ChapResponse { id: u8, name: &'a [u8] },
    /// AC accepted a CHAP response
    ChapSuccess { id: u8 },
}

/// Split a PPP frame into protocol number and information field
pub fn ppp_protocol(frame: &[u8]) -> Option<(u16, &[u8])> {
    if frame.len() < 2 {
        return None;
    }
    Some((u16::from_be_bytes([frame[0], frame[1]]), &frame[2..]))
}

/// Control packet body (code, identifier, data) bounded by its length field
fn control_packet(info: &[u8]) -> Option<(u8, u8, &[u8])> {
    if info.len() < 4 {
        return None;
    }
    let len = u16::from_be_bytes([info[2], info[3]]) as usize;
    if len < 4 || len > info.len() {
        return None;
    }
    Some((info[0], info[1], &info[4..len]))
}

/// Inspect one PPP frame travelling in the given direction
pub fn snoop(frame: &[u8], from_client: bool) -> Option<AuthEvent<'_>> {
    let (protocol, info) = ppp_protocol(frame)?;
    let (code, id, data) = control_packet(info)?;

    match (protocol, code, from_client) {
        (PPP_LCP, LCP_CONFIGURE_REQUEST, true) => endpoint_discriminator(data),
        (PPP_PAP, PAP_AUTHENTICATE_REQUEST, true) => {
            let peer_id_len = *data.first()? as usize;
            let peer_id = data.get(1..1 + peer_id_len)?;
            Some(AuthEvent::PapRequest { id, peer_id })
        }
        (PPP_PAP, PAP_AUTHENTICATE_ACK, false) => Some(AuthEvent::PapAck { id }),
        (PPP_CHAP, CHAP_RESPONSE, true) => {
            let value_size = *data.first()? as usize;
            let name = data.get(1 + value_size..)?;
            Some(AuthEvent::ChapResponse { id, name })
        }
        (PPP_CHAP, CHAP_SUCCESS, false) => Some(AuthEvent::ChapSuccess { id }),
        _ => None,
    }
}

fn endpoint_discriminator(mut options: &[u8]) -> Option<AuthEvent<'_>> {
    while options.len() >= 2 {
        let opt_type = options[0];
        let opt_len = options[1] as usize;
        if opt_len < 2 || opt_len > options.len() {
            return None;
        }
        if opt_type == LCP_OPT_ENDPOINT_DISCRIMINATOR && opt_len >= 3 {
            let data = &options[3..opt_len];
            if data.len() > MAX_EPDIS_DATA {
                return None;
            }
            return Some(AuthEvent::EndpointDiscriminator {
                class: options[2],
                data,
            });
        }
        options = &options[opt_len..];
    }
    None
}
