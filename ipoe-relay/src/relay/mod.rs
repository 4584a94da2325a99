//! PPPoE discovery and session relay
//!
//! The relay sits between clients and access concentrators on separate
//! Ethernet segments. Until a PADS arrives it keeps no state at all: the
//! receiving interface and the originating MAC ride along in a
//! Relay-Session-Id tag and come back in the AC's answer.
//!
//! ```text
//!   client            relay                          AC
//!     | PADI -------->  | + tag(cli_if, cli_mac) ----> |
//!     |  <-------- PADO | tag := (ac_if, ac_mac)  <--- |
//!     | PADR -------->  | tag := (cli_if, cli_mac) --> |
//!     |  <-------- PADS | create, strip tag      <---- |
//!     | session <=====> | rewrite ses + MACs  <======> |
//!     | PADT  ------->  | free                ------>  |
//! ```

use crate::config::RelayConfig;
use crate::directory::{EndpointDiscriminator, SessionDirectory, SessionHandle, Side};
use crate::sink::FrameSink;
use ipoe_core::{Error, Interface, MacAddr, Packet, Result, SocketKind};
use ipoe_protocols::ppp::{self, AuthEvent, MAX_USERID_LEN};
use ipoe_protocols::pppoe::{PppoeCode, PppoePacket, PppoeTag, PppoeTagType, TagRef};
use tracing::{debug, error, warn};

/// Relay-Session-Id payload: big-endian interface index then peer MAC
pub const RELAY_TAG_LEN: usize = 10;

/// Counters for the discovery and session paths
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayStats {
    pub discovery_relayed: u64,
    pub session_relayed: u64,
    pub dropped: u64,
    pub errors_sent: u64,
    pub send_failures: u64,
    pub sessions_reaped: u64,
}

/// Discovery/session state machine over a session directory
pub struct RelayCore {
    interfaces: Vec<Interface>,
    directory: SessionDirectory,
    /// Epochs without traffic before a session is reaped (0 disables)
    idle_timeout: u64,
    stats: RelayStats,
}

fn relay_tag(interface: usize, mac: MacAddr) -> [u8; RELAY_TAG_LEN] {
    let mut value = [0u8; RELAY_TAG_LEN];
    value[..4].copy_from_slice(&(interface as u32).to_be_bytes());
    value[4..].copy_from_slice(mac.as_bytes());
    value
}

impl RelayCore {
    pub fn new(interfaces: Vec<Interface>, config: &RelayConfig) -> Self {
        Self {
            interfaces,
            directory: SessionDirectory::new(config.max_sessions),
            idle_timeout: config.idle_timeout,
            stats: RelayStats::default(),
        }
    }

    pub fn interfaces(&self) -> &[Interface] {
        &self.interfaces
    }

    pub fn directory(&self) -> &SessionDirectory {
        &self.directory
    }

    pub fn stats(&self) -> &RelayStats {
        &self.stats
    }

    /// Handle one frame from a discovery or session socket
    ///
    /// Per-frame failures are logged and counted here; none of them is fatal.
    pub fn handle_packet<S: FrameSink>(&mut self, sink: &mut S, packet: &Packet) {
        let result = match packet.socket {
            SocketKind::Discovery => self.handle_discovery(sink, packet.interface, packet.data()),
            SocketKind::Session => self.handle_session(sink, packet.interface, packet.data()),
            SocketKind::Ip => Err(Error::mismatch("IP frame on the relay path")),
        };

        if let Err(e) = result {
            self.stats.dropped += 1;
            let interface = self
                .interfaces
                .get(packet.interface)
                .map(|i| i.name.as_str())
                .unwrap_or("?");
            match e {
                Error::PolicyViolation(_) | Error::BufferOverflow { .. } | Error::ResourceExhausted(_) => {
                    warn!(interface, socket = %packet.socket, error = %e, "Dropping frame")
                }
                _ => debug!(interface, socket = %packet.socket, error = %e, "Dropping frame"),
            }
        }
    }

    fn interface(&self, index: usize) -> Result<&Interface> {
        self.interfaces
            .get(index)
            .ok_or_else(|| Error::Interface(format!("no relay interface {}", index)))
    }

    /// Handle a PPPoE discovery frame received on `index`
    pub fn handle_discovery<S: FrameSink>(
        &mut self,
        sink: &mut S,
        index: usize,
        data: &[u8],
    ) -> Result<()> {
        let iface = self.interface(index)?.clone();
        let mut packet = PppoePacket::from_frame(data)?;

        if !packet.source.is_unicast() {
            return Err(Error::malformed(format!(
                "{} from non-unicast {}",
                packet.code, packet.source
            )));
        }

        match packet.code {
            PppoeCode::PADI => {
                if !packet.destination.is_broadcast() || packet.session_id != 0 {
                    return Err(Error::malformed("PADI must be broadcast with session 0"));
                }
            }
            PppoeCode::SessionData => return Err(Error::mismatch("session frame on discovery socket")),
            _ => {
                if packet.destination != iface.mac {
                    return Err(Error::malformed(format!(
                        "{} addressed to {}, not to us",
                        packet.code, packet.destination
                    )));
                }
            }
        }

        match packet.code {
            PppoeCode::PADI => self.relay_padi(sink, &iface, &mut packet),
            PppoeCode::PADO => self.relay_pado(sink, &iface, &mut packet),
            PppoeCode::PADR => self.relay_padr(sink, &iface, &mut packet),
            PppoeCode::PADS => self.relay_pads(sink, &iface, &mut packet),
            PppoeCode::PADT => self.relay_padt(sink, &iface, &mut packet),
            PppoeCode::SessionData => Ok(()),
        }
    }

    fn relay_padi<S: FrameSink>(
        &mut self,
        sink: &mut S,
        iface: &Interface,
        packet: &mut PppoePacket,
    ) -> Result<()> {
        if !iface.client_ok {
            return Err(Error::policy(format!("PADI on non-client interface {}", iface.name)));
        }
        if packet.find_tag(PppoeTagType::ServiceName).is_none() {
            return Err(Error::malformed("PADI without Service-Name"));
        }
        if packet.find_tag(PppoeTagType::RelaySessionId).is_some() {
            return Err(Error::policy("PADI already carries a Relay-Session-Id"));
        }

        packet.add_tag(&PppoeTag::new(
            PppoeTagType::RelaySessionId,
            relay_tag(iface.index, packet.source).to_vec(),
        ))?;

        let targets: Vec<(usize, MacAddr)> = self
            .interfaces
            .iter()
            .filter(|i| i.ac_ok && i.index != iface.index)
            .map(|i| (i.index, i.mac))
            .collect();

        packet.destination = MacAddr::BROADCAST;
        for (index, mac) in targets {
            packet.source = mac;
            self.send(sink, index, SocketKind::Discovery, &packet.to_frame());
            self.stats.discovery_relayed += 1;
        }
        Ok(())
    }

    /// Check and decode the Relay-Session-Id tag of a returning packet
    ///
    /// The named interface must exist, differ from `iface` and accept
    /// traffic in the direction given by `toward_client`.
    fn relay_target(
        &self,
        iface: &Interface,
        packet: &PppoePacket,
        toward_client: bool,
    ) -> Result<(TagRef, usize, MacAddr)> {
        let tag = packet
            .find_tag(PppoeTagType::RelaySessionId)
            .ok_or_else(|| Error::malformed(format!("{} without Relay-Session-Id", packet.code)))?;
        if tag.length != RELAY_TAG_LEN {
            return Err(Error::malformed(format!(
                "Relay-Session-Id of {} bytes",
                tag.length
            )));
        }

        let value = packet.tag_value(&tag);
        let index = u32::from_be_bytes([value[0], value[1], value[2], value[3]]) as usize;
        let mac = MacAddr::from_slice(&value[4..]).unwrap_or_default();

        let target = self
            .interfaces
            .get(index)
            .filter(|t| t.index != iface.index)
            .ok_or_else(|| Error::malformed(format!("Relay-Session-Id names interface {}", index)))?;

        let allowed = if toward_client {
            target.client_ok
        } else {
            target.ac_ok
        };
        if !allowed {
            return Err(Error::policy(format!(
                "{} would leave through {}",
                packet.code, target.name
            )));
        }

        Ok((tag, index, mac))
    }

    /// Rewrite the tag to point back at the sender, then forward
    fn relay_through_tag<S: FrameSink>(
        &mut self,
        sink: &mut S,
        iface: &Interface,
        packet: &mut PppoePacket,
        toward_client: bool,
    ) -> Result<()> {
        let (tag, target, peer) = self.relay_target(iface, packet, toward_client)?;

        let start = tag.value_offset();
        packet.payload[start..start + RELAY_TAG_LEN]
            .copy_from_slice(&relay_tag(iface.index, packet.source));

        packet.destination = peer;
        packet.source = self.interfaces[target].mac;
        self.send(sink, target, SocketKind::Discovery, &packet.to_frame());
        self.stats.discovery_relayed += 1;
        Ok(())
    }

    fn relay_pado<S: FrameSink>(
        &mut self,
        sink: &mut S,
        iface: &Interface,
        packet: &mut PppoePacket,
    ) -> Result<()> {
        if !iface.ac_ok {
            return Err(Error::policy(format!("PADO on non-server interface {}", iface.name)));
        }
        self.relay_through_tag(sink, iface, packet, true)
    }

    fn relay_padr<S: FrameSink>(
        &mut self,
        sink: &mut S,
        iface: &Interface,
        packet: &mut PppoePacket,
    ) -> Result<()> {
        if !iface.client_ok {
            return Err(Error::policy(format!("PADR on non-client interface {}", iface.name)));
        }
        if packet.find_tag(PppoeTagType::ServiceName).is_none() {
            return Err(Error::malformed("PADR without Service-Name"));
        }
        self.relay_through_tag(sink, iface, packet, false)
    }

    fn relay_pads<S: FrameSink>(
        &mut self,
        sink: &mut S,
        iface: &Interface,
        packet: &mut PppoePacket,
    ) -> Result<()> {
        if !iface.ac_ok {
            return Err(Error::policy(format!("PADS on non-server interface {}", iface.name)));
        }
        let (tag, target, client_mac) = self.relay_target(iface, packet, true)?;
        let ac_mac = packet.source;
        let ac_session = packet.session_id;

        if ac_session != 0 {
            // Keyed on the AC side only; a retransmitted PADS must not open a second session
            if self.directory.find(&ac_mac, ac_session, Side::Ac).is_some() {
                debug!(ac_mac = %ac_mac, ac_session, "Duplicate PADS");
                return Ok(());
            }

            match self
                .directory
                .create(iface.index, target, ac_mac, client_mac, ac_session)
            {
                Ok(handle) => packet.session_id = handle.relay_session_id(),
                Err(e) => {
                    let host_uniq = packet
                        .find_tag(PppoeTagType::HostUniq)
                        .map(|t| packet.tag_value(&t).to_vec());
                    self.relay_send_error(
                        sink,
                        PppoeCode::PADS,
                        0,
                        target,
                        client_mac,
                        host_uniq.as_deref(),
                        "Unable to allocate session",
                    );
                    self.relay_send_error(
                        sink,
                        PppoeCode::PADT,
                        ac_session,
                        iface.index,
                        ac_mac,
                        None,
                        "Unable to allocate session",
                    );
                    return Err(e);
                }
            }
        }

        packet.remove_bytes(tag.offset, tag.total_len())?;
        packet.destination = client_mac;
        packet.source = self.interfaces[target].mac;
        self.send(sink, target, SocketKind::Discovery, &packet.to_frame());
        self.stats.discovery_relayed += 1;
        Ok(())
    }

    fn relay_padt<S: FrameSink>(
        &mut self,
        sink: &mut S,
        iface: &Interface,
        packet: &mut PppoePacket,
    ) -> Result<()> {
        let Some((handle, side)) = self.directory.find_any(&packet.source, packet.session_id) else {
            debug!(mac = %packet.source, session = packet.session_id, "PADT for unknown session");
            return Ok(());
        };

        let Some((from, to)) = self
            .directory
            .get(handle)
            .map(|s| (s.entry(side).clone(), s.entry(side.peer()).clone()))
        else {
            return Ok(());
        };
        if from.interface != iface.index {
            return Err(Error::policy(format!(
                "PADT for session {} on {}",
                packet.session_id, iface.name
            )));
        }

        packet.session_id = to.session_id;
        packet.destination = to.peer_mac;
        packet.source = self.interfaces[to.interface].mac;
        self.send(sink, to.interface, SocketKind::Discovery, &packet.to_frame());
        self.stats.discovery_relayed += 1;

        self.directory.free(handle, "Received PADT");
        Ok(())
    }

    /// Handle a PPPoE session frame received on `index`
    pub fn handle_session<S: FrameSink>(
        &mut self,
        sink: &mut S,
        index: usize,
        data: &[u8],
    ) -> Result<()> {
        let iface = self.interface(index)?.clone();
        let mut packet = PppoePacket::from_frame(data)?;

        if packet.code != PppoeCode::SessionData {
            return Err(Error::mismatch("discovery frame on session socket"));
        }
        if !packet.source.is_unicast() || packet.destination != iface.mac {
            return Err(Error::malformed(format!(
                "session frame {} -> {}",
                packet.source, packet.destination
            )));
        }

        let Some((handle, side)) = self.directory.find_any(&packet.source, packet.session_id) else {
            self.relay_send_error(
                sink,
                PppoeCode::PADT,
                packet.session_id,
                index,
                packet.source,
                None,
                "Session packet for unknown session",
            );
            debug!(mac = %packet.source, session = packet.session_id, "Session frame for unknown session");
            self.stats.dropped += 1;
            return Ok(());
        };

        let Some((from, to)) = self
            .directory
            .get(handle)
            .map(|s| (s.entry(side).clone(), s.entry(side.peer()).clone()))
        else {
            return Ok(());
        };
        if from.interface != index {
            return Err(Error::policy(format!(
                "session {} frame on {}",
                packet.session_id, iface.name
            )));
        }

        self.directory.touch(handle);
        if let Some(event) = ppp::snoop(&packet.payload, side == Side::Client) {
            self.record_auth(handle, event);
        }

        packet.session_id = to.session_id;
        packet.destination = to.peer_mac;
        packet.source = self.interfaces[to.interface].mac;
        self.send(sink, to.interface, SocketKind::Session, &packet.to_frame());
        self.stats.session_relayed += 1;
        Ok(())
    }

    fn record_auth(&mut self, handle: SessionHandle, event: AuthEvent<'_>) {
        let Some(session) = self.directory.get_mut(handle) else {
            return;
        };

        let accepted = match event {
            AuthEvent::EndpointDiscriminator { class, data } => {
                session.epdis = Some(EndpointDiscriminator {
                    class,
                    data: data.to_vec(),
                });
                false
            }
            AuthEvent::PapRequest { id, peer_id: name } | AuthEvent::ChapResponse { id, name } => {
                session.userid = name[..name.len().min(MAX_USERID_LEN)].to_vec();
                session.auth_seq_id = Some(id);
                session.auth_ok = false;
                false
            }
            AuthEvent::PapAck { id } | AuthEvent::ChapSuccess { id } => {
                if session.auth_seq_id == Some(id) {
                    session.auth_ok = true;
                    debug!(
                        session = handle.relay_session_id(),
                        user = %String::from_utf8_lossy(&session.userid),
                        "Authenticated"
                    );
                    true
                } else {
                    false
                }
            }
        };

        if accepted {
            self.directory.join_bundle(handle);
        }
    }

    /// Send a discovery error toward a peer
    ///
    /// The frame carries `message` in a Generic-Error tag, preceded by the
    /// peer's Host-Uniq when one is known.
    #[allow(clippy::too_many_arguments)]
    pub fn relay_send_error<S: FrameSink>(
        &mut self,
        sink: &mut S,
        code: PppoeCode,
        session_id: u16,
        index: usize,
        mac: MacAddr,
        host_uniq: Option<&[u8]>,
        message: &str,
    ) {
        let Some(source) = self.interfaces.get(index).map(|i| i.mac) else {
            return;
        };
        let packet = PppoePacket::error(code, session_id, mac, source, host_uniq, message);
        debug!(code = %code, session = session_id, mac = %mac, message, "Sending error");
        self.send(sink, index, SocketKind::Discovery, &packet.to_frame());
        self.stats.errors_sent += 1;
    }

    /// Advance the logical clock by one tick
    pub fn tick(&mut self) -> u64 {
        self.directory.advance_epoch()
    }

    /// Tear down every idle session, telling both ends
    pub fn clean_sessions<S: FrameSink>(&mut self, sink: &mut S) -> usize {
        if self.idle_timeout == 0 {
            return 0;
        }

        let idle = self.directory.idle_sessions(self.idle_timeout);
        for &handle in &idle {
            let Some((ac, client)) = self
                .directory
                .get(handle)
                .map(|s| (s.ac.clone(), s.client.clone()))
            else {
                continue;
            };

            for entry in [ac, client] {
                self.relay_send_error(
                    sink,
                    PppoeCode::PADT,
                    entry.session_id,
                    entry.interface,
                    entry.peer_mac,
                    None,
                    "Idle Timeout",
                );
            }
            self.directory.free(handle, "Idle Timeout");
            self.stats.sessions_reaped += 1;
        }
        idle.len()
    }

    fn send<S: FrameSink>(&mut self, sink: &mut S, index: usize, socket: SocketKind, frame: &[u8]) {
        if let Err(e) = sink.send(index, socket, frame) {
            self.stats.send_failures += 1;
            error!(interface = index, socket = %socket, error = %e, "Send failed");
        }
    }
}
