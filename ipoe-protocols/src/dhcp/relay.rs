//! Local DHCP responder for the IPoE client
//!
//! Every DISCOVER gets an OFFER and every REQUEST or FORCERENEW gets an ACK,
//! always for the same fixed address and a short lease. No lease state is
//! kept. Other message types are swallowed.

use super::options::{
    OptionTable, OptionWriter, OPTION_DNS_SERVER, OPTION_LEASE_TIME, OPTION_MESSAGE_TYPE,
    OPTION_ROUTER, OPTION_SERVER_ID, OPTION_SUBNET_MASK,
};
use super::packet::{
    BootpMessage, DhcpMessageType, BOOTREPLY, DHCP_MAGIC_COOKIE, HLEN_ETHERNET, HTYPE_ETHERNET,
    MAX_OPTIONS_SIZE,
};
use crate::connection::IpoeConnection;
use ipoe_core::protocol_constants::{DHCP_CLIENT_PORT, DHCP_SERVER_PORT};
use ipoe_core::{Error, MacAddr, Result};
use ipoe_packet::{EtherType, EthernetFrame};
use std::net::Ipv4Addr;
use tracing::debug;

/// Server host name placed in replies
pub const SERVER_NAME: &[u8] = b"modem";

/// Lease time offered to the client, in seconds
pub const LEASE_TIME_SECS: u32 = 300;

/// Answer a DHCP request received on the IPoE interface
///
/// Returns `ProtocolMismatch` when the datagram carries no DHCP message type
/// (plain BOOTP or a missing cookie); the caller forwards such frames
/// unchanged. `Ok(None)` means the message was understood but needs no
/// answer.
pub fn handle_dhcp_request(
    conn: &mut IpoeConnection,
    frame: &EthernetFrame,
) -> Result<Option<EthernetFrame>> {
    let request = BootpMessage::from_datagram(&frame.payload)?;

    if !request.has_magic_cookie() {
        return Err(Error::mismatch("BOOTP request without DHCP cookie"));
    }

    let list = request.option_list();
    let mut table = OptionTable::new();
    table.parse(list, list.len());

    let msg_type = table
        .find(OPTION_MESSAGE_TYPE)
        .and_then(|opt| opt.value.first().copied())
        .ok_or_else(|| Error::mismatch("no DHCP message type option"))?;

    let reply_type = match DhcpMessageType::from_u8(msg_type) {
        Some(DhcpMessageType::Discover) => DhcpMessageType::Offer,
        Some(DhcpMessageType::Request) | Some(DhcpMessageType::ForceRenew) => DhcpMessageType::Ack,
        _ => {
            debug!(msg_type, "Ignoring DHCP message");
            return Ok(None);
        }
    };

    conn.peer_mac = frame.source;

    let reply = build_reply(conn, &request, frame.source, reply_type)?;

    let destination = if request.bootp.is_broadcast() {
        MacAddr::BROADCAST
    } else {
        conn.peer_mac
    };

    debug!(
        peer = %conn.peer_mac,
        xid = request.bootp.xid,
        reply = %reply_type,
        yiaddr = %conn.peer_ip,
        "Answering DHCP request"
    );

    Ok(Some(EthernetFrame::new(
        destination,
        conn.my_mac,
        EtherType::IPv4,
        reply.to_bytes(),
    )))
}

fn build_reply(
    conn: &IpoeConnection,
    request: &BootpMessage,
    client: MacAddr,
    reply_type: DhcpMessageType,
) -> Result<BootpMessage> {
    let mut bootp = request.bootp.clone();
    bootp.op = BOOTREPLY;
    bootp.htype = HTYPE_ETHERNET;
    bootp.hlen = HLEN_ETHERNET;
    bootp.hops = 0;
    bootp.ciaddr = Ipv4Addr::UNSPECIFIED;
    bootp.yiaddr = conn.peer_ip;
    bootp.siaddr = conn.gateway;
    bootp.giaddr = Ipv4Addr::UNSPECIFIED;
    bootp.chaddr[..6].copy_from_slice(client.as_bytes());
    bootp.set_sname(SERVER_NAME);
    bootp.file = [0; 128];

    let mut area = vec![0u8; MAX_OPTIONS_SIZE];
    area[..4].copy_from_slice(&DHCP_MAGIC_COOKIE);

    let extent = {
        let mut writer = OptionWriter::new(&mut area, DHCP_MAGIC_COOKIE.len());
        writer.append(OPTION_MESSAGE_TYPE, &[reply_type as u8])?;
        writer.append(OPTION_SERVER_ID, &conn.gateway.octets())?;
        writer.append(OPTION_LEASE_TIME, &LEASE_TIME_SECS.to_be_bytes())?;
        writer.append(OPTION_SUBNET_MASK, &conn.netmask.octets())?;
        writer.append(OPTION_ROUTER, &conn.gateway.octets())?;
        writer.append(OPTION_DNS_SERVER, &conn.dns.octets())?;
        writer.extent()
    };

    // Zero-pad up to the size of the request's options area
    let requested = BootpMessage::declared_options_len(&request.udp).min(MAX_OPTIONS_SIZE);
    area.truncate(extent.max(requested));

    let mut ip = request.ip.clone();
    ip.version = 4;
    ip.tos = 0;
    ip.source = conn.gateway;
    ip.destination = conn.peer_ip;

    let mut udp = request.udp;
    udp.source_port = DHCP_SERVER_PORT;
    udp.destination_port = DHCP_CLIENT_PORT;
    udp.checksum = 0;

    Ok(BootpMessage {
        ip,
        udp,
        bootp,
        options: area,
    })
}
