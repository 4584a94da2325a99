//! Relay interface descriptions

use crate::{Error, MacAddr, Result};
use std::fmt;

/// Which discovery directions an interface accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterfaceRole {
    /// Clients live behind it (PADI/PADR accepted)
    Client,
    /// Access concentrators live behind it (PADO/PADS accepted)
    Server,
    /// Both directions
    Both,
}

impl InterfaceRole {
    pub fn client_ok(self) -> bool {
        matches!(self, InterfaceRole::Client | InterfaceRole::Both)
    }

    pub fn ac_ok(self) -> bool {
        matches!(self, InterfaceRole::Server | InterfaceRole::Both)
    }
}

/// An Ethernet interface taking part in the relay
///
/// `index` is the position in the relay's interface table. It is what the
/// Relay-Session-Id tag carries on the wire, so it must stay stable for the
/// life of the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interface {
    /// Interface name (e.g., "eth0")
    pub name: String,
    /// Position in the relay's interface table
    pub index: usize,
    /// MAC address
    pub mac: MacAddr,
    /// Client requests allowed (PADI, PADR)
    pub client_ok: bool,
    /// AC replies allowed (PADO, PADS)
    pub ac_ok: bool,
}

impl Interface {
    /// Create a new interface with an explicit MAC address
    pub fn new(name: impl Into<String>, index: usize, mac: MacAddr, role: InterfaceRole) -> Self {
        Self {
            name: name.into(),
            index,
            mac,
            client_ok: role.client_ok(),
            ac_ok: role.ac_ok(),
        }
    }

    /// Look up an OS interface by name and take its hardware address
    pub fn by_name(name: &str, index: usize, role: InterfaceRole) -> Result<Self> {
        let iface = pnet_datalink::interfaces()
            .into_iter()
            .find(|i| i.name == name)
            .ok_or_else(|| Error::InterfaceNotFound(name.to_string()))?;

        let mac = iface
            .mac
            .map(|m| MacAddr([m.0, m.1, m.2, m.3, m.4, m.5]))
            .ok_or_else(|| Error::Interface(format!("{} has no hardware address", name)))?;

        if !iface.is_up() {
            return Err(Error::Interface(format!("{} is not up", name)));
        }

        Ok(Self::new(name, index, mac, role))
    }
}

impl fmt::Display for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let role = match (self.client_ok, self.ac_ok) {
            (true, true) => "both",
            (true, false) => "client",
            (false, true) => "server",
            (false, false) => "none",
        };
        write!(f, "{} ({}, {})", self.name, self.mac, role)
    }
}
