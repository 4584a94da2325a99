//! IPoE connection state

use ipoe_core::MacAddr;
use std::net::Ipv4Addr;

/// Default DNS server handed out in DHCP replies
pub const DEFAULT_DNS: Ipv4Addr = Ipv4Addr::new(8, 8, 8, 8);

/// The IP side of one Ethernet-attached client
///
/// The relay plays the client's gateway. `peer_mac` starts out zero and is
/// learned from ARP requests and DHCP DISCOVER/REQUEST frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpoeConnection {
    /// MAC address the relay answers with
    pub my_mac: MacAddr,
    /// Last learned client MAC address
    pub peer_mac: MacAddr,
    /// Virtual gateway address (DHCP server identifier and router)
    pub gateway: Ipv4Addr,
    pub netmask: Ipv4Addr,
    /// Address leased to the client
    pub peer_ip: Ipv4Addr,
    pub dns: Ipv4Addr,
}

impl IpoeConnection {
    pub fn new(my_mac: MacAddr, gateway: Ipv4Addr, netmask: Ipv4Addr, peer_ip: Ipv4Addr) -> Self {
        Self {
            my_mac,
            peer_mac: MacAddr::ZERO,
            gateway,
            netmask,
            peer_ip,
            dns: DEFAULT_DNS,
        }
    }

    pub fn with_dns(mut self, dns: Ipv4Addr) -> Self {
        self.dns = dns;
        self
    }

    /// True once a client MAC has been learned
    pub fn has_peer(&self) -> bool {
        self.peer_mac != MacAddr::ZERO
    }
}
