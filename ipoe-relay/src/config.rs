//! Runtime configuration for the relay and the IPoE bridge
//!
//! Values arrive already parsed from the command line; `validate` checks the
//! combinations the parser cannot express.

use crate::directory::{DEFAULT_SESSIONS, MAX_SESSIONS};
use ipoe_core::{Error, InterfaceRole, MacAddr, Result};
use ipoe_protocols::connection::DEFAULT_DNS;
use std::net::Ipv4Addr;

/// Most relay interfaces a single process serves
pub const MAX_INTERFACES: usize = 8;

pub const DEFAULT_IDLE_TIMEOUT: u64 = 600;
pub const DEFAULT_CLEAN_PERIOD: u64 = 60;

/// A relay interface requested by name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceSpec {
    pub name: String,
    pub role: InterfaceRole,
}

impl InterfaceSpec {
    pub fn new(name: impl Into<String>, role: InterfaceRole) -> Self {
        Self {
            name: name.into(),
            role,
        }
    }
}

/// PPPoE discovery relay settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    /// Relay interfaces, in table order
    pub interfaces: Vec<InterfaceSpec>,
    /// Session slots in the directory
    pub max_sessions: usize,
    /// Seconds without traffic before a session is reaped (0 disables)
    pub idle_timeout: u64,
    /// Seconds between idle sweeps
    pub clean_period: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            interfaces: Vec::new(),
            max_sessions: DEFAULT_SESSIONS,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            clean_period: DEFAULT_CLEAN_PERIOD,
        }
    }
}

impl RelayConfig {
    pub fn validate(&self) -> Result<()> {
        if self.interfaces.len() > MAX_INTERFACES {
            return Err(Error::invalid_parameter(
                "interfaces".to_string(),
                format!("at most {} relay interfaces", MAX_INTERFACES),
            ));
        }

        for (i, spec) in self.interfaces.iter().enumerate() {
            if self.interfaces[..i].iter().any(|s| s.name == spec.name) {
                return Err(Error::invalid_parameter(
                    "interfaces".to_string(),
                    format!("{} given more than once", spec.name),
                ));
            }
        }

        if !(1..=MAX_SESSIONS).contains(&self.max_sessions) {
            return Err(Error::invalid_parameter(
                "max-sessions".to_string(),
                format!("must be between 1 and {}", MAX_SESSIONS),
            ));
        }

        if self.clean_period == 0 {
            return Err(Error::invalid_parameter("clean-period", "must be at least 1"));
        }

        Ok(())
    }

    /// Index the first interface facing an access concentrator would get
    pub fn first_ac_interface(&self) -> Option<usize> {
        self.interfaces.iter().position(|s| s.role.ac_ok())
    }
}

/// PPPoE session an IPoE bridge tunnels its traffic through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeSession {
    pub ac_mac: MacAddr,
    pub session_id: u16,
}

/// IPoE bridge settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Interface the Ethernet-attached client sits behind
    pub interface: String,
    pub gateway: Ipv4Addr,
    pub netmask: Ipv4Addr,
    pub peer_ip: Ipv4Addr,
    pub dns: Ipv4Addr,
    pub session: Option<BridgeSession>,
}

impl BridgeConfig {
    pub fn new(
        interface: impl Into<String>,
        gateway: Ipv4Addr,
        netmask: Ipv4Addr,
        peer_ip: Ipv4Addr,
    ) -> Self {
        Self {
            interface: interface.into(),
            gateway,
            netmask,
            peer_ip,
            dns: DEFAULT_DNS,
            session: None,
        }
    }

    /// Build from the optional AC MAC / session id pair given on the command line
    pub fn with_session(mut self, ac_mac: Option<MacAddr>, session_id: Option<u16>) -> Result<Self> {
        self.session = match (ac_mac, session_id) {
            (Some(ac_mac), Some(session_id)) => Some(BridgeSession { ac_mac, session_id }),
            (None, None) => None,
            _ => {
                return Err(Error::invalid_parameter(
                    "session-id",
                    "--ac-mac and --session-id go together",
                ))
            }
        };
        Ok(self)
    }

    pub fn validate(&self, relay: &RelayConfig) -> Result<()> {
        let mask = u32::from(self.netmask);
        if mask.leading_ones() + mask.trailing_zeros() != 32 {
            return Err(Error::invalid_parameter(
                "netmask".to_string(),
                format!("{} is not a contiguous mask", self.netmask),
            ));
        }

        if self.peer_ip == self.gateway {
            return Err(Error::invalid_parameter(
                "peer-ip",
                "must differ from the gateway address",
            ));
        }

        if u32::from(self.peer_ip) & mask != u32::from(self.gateway) & mask {
            return Err(Error::invalid_parameter(
                "peer-ip".to_string(),
                format!("{} is not on the gateway's subnet", self.peer_ip),
            ));
        }

        if relay.interfaces.iter().any(|s| s.name == self.interface) {
            return Err(Error::invalid_parameter(
                "ipoe-iface".to_string(),
                format!("{} is already a relay interface", self.interface),
            ));
        }

        if let Some(session) = &self.session {
            if session.session_id == 0 || session.session_id == 0xFFFF {
                return Err(Error::invalid_parameter("session-id", "must be 1..=65534"));
            }
            if !session.ac_mac.is_unicast() || session.ac_mac == MacAddr::ZERO {
                return Err(Error::invalid_parameter("ac-mac", "must be a unicast address"));
            }
            if relay.first_ac_interface().is_none() {
                return Err(Error::invalid_parameter(
                    "ac-mac",
                    "a session needs a server-facing relay interface",
                ));
            }
        }

        Ok(())
    }
}
