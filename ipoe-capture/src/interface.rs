//! Network interface enumeration

use ipoe_core::{Error, MacAddr, Result};
use pnet_datalink::{self, NetworkInterface};
use std::fmt;
use std::net::IpAddr;

/// What the host reports about one interface
#[derive(Debug, Clone)]
pub struct InterfaceInfo {
    pub name: String,
    pub mac: Option<MacAddr>,
    pub ips: Vec<IpAddr>,
    pub is_up: bool,
    pub is_loopback: bool,
}

impl From<&NetworkInterface> for InterfaceInfo {
    fn from(iface: &NetworkInterface) -> Self {
        let mac = iface
            .mac
            .map(|m| MacAddr([m.0, m.1, m.2, m.3, m.4, m.5]))
            .filter(|m| *m != MacAddr::ZERO);

        InterfaceInfo {
            name: iface.name.clone(),
            mac,
            ips: iface.ips.iter().map(|network| network.ip()).collect(),
            is_up: iface.is_up(),
            is_loopback: iface.is_loopback(),
        }
    }
}

impl InterfaceInfo {
    /// Up, not loopback, and has an Ethernet address
    pub fn is_relay_capable(&self) -> bool {
        self.is_up && !self.is_loopback && self.mac.is_some()
    }
}

impl fmt::Display for InterfaceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mac = self
            .mac
            .map(|m| m.to_string())
            .unwrap_or_else(|| "-".to_string());
        write!(
            f,
            "{:<16} {:<17} {}",
            self.name,
            mac,
            if self.is_up { "up" } else { "down" }
        )?;
        for ip in &self.ips {
            write!(f, " {}", ip)?;
        }
        Ok(())
    }
}

/// List all network interfaces
pub fn list_interfaces() -> Result<Vec<InterfaceInfo>> {
    let interfaces = pnet_datalink::interfaces();

    if interfaces.is_empty() {
        return Err(Error::Interface(
            "No network interfaces found. Are you running with sufficient privileges?".to_string(),
        ));
    }

    Ok(interfaces.iter().map(InterfaceInfo::from).collect())
}

/// List interfaces that can carry relay traffic
pub fn list_relay_interfaces() -> Result<Vec<InterfaceInfo>> {
    Ok(list_interfaces()?
        .into_iter()
        .filter(InterfaceInfo::is_relay_capable)
        .collect())
}

pub(crate) fn find_interface(name: &str) -> Result<NetworkInterface> {
    pnet_datalink::interfaces()
        .into_iter()
        .find(|iface| iface.name == name)
        .ok_or_else(|| Error::InterfaceNotFound(name.to_string()))
}
