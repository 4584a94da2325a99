//! CLI argument parsing
//!
//! Relay flags follow the classic `pppoe-relay` letters; the IPoE bridge
//! group is only read when `--ipoe-iface` is given.

use clap::Parser;
use ipoe_core::{Error, InterfaceRole, MacAddr, Result};
use ipoe_relay::config::{
    BridgeConfig, InterfaceSpec, RelayConfig, DEFAULT_CLEAN_PERIOD, DEFAULT_IDLE_TIMEOUT,
};
use ipoe_relay::directory::DEFAULT_SESSIONS;
use std::net::Ipv4Addr;

#[derive(Parser, Debug)]
#[command(name = "ipoe-relay")]
#[command(version, about = "PPPoE discovery relay with an IPoE bridge", long_about = None)]
pub struct Cli {
    /// Interface facing access concentrators (repeatable)
    #[arg(short = 'S', long = "server-iface", value_name = "IFACE")]
    pub server_ifaces: Vec<String>,

    /// Interface facing PPPoE clients (repeatable)
    #[arg(short = 'C', long = "client-iface", value_name = "IFACE")]
    pub client_ifaces: Vec<String>,

    /// Interface carrying both clients and access concentrators (repeatable)
    #[arg(short = 'B', long = "both-iface", value_name = "IFACE")]
    pub both_ifaces: Vec<String>,

    /// Maximum number of relayed sessions
    #[arg(short = 'n', long, value_name = "N", default_value_t = DEFAULT_SESSIONS)]
    pub max_sessions: usize,

    /// Seconds of silence before a session is torn down (0 disables)
    #[arg(short = 'i', long, value_name = "SECONDS", default_value_t = DEFAULT_IDLE_TIMEOUT)]
    pub idle_timeout: u64,

    /// Seconds between idle session sweeps
    #[arg(long, value_name = "SECONDS", default_value_t = DEFAULT_CLEAN_PERIOD)]
    pub clean_period: u64,

    /// Interface of the Ethernet-attached IPoE client
    #[arg(long, value_name = "IFACE", requires_all = ["gateway", "peer_ip"])]
    pub ipoe_iface: Option<String>,

    /// Virtual gateway address answered for on the IPoE interface
    #[arg(long, value_name = "ADDR", requires = "ipoe_iface")]
    pub gateway: Option<Ipv4Addr>,

    /// Netmask handed to the IPoE client
    #[arg(long, value_name = "MASK", default_value = "255.255.255.0")]
    pub netmask: Ipv4Addr,

    /// Address leased to the IPoE client
    #[arg(long, value_name = "ADDR", requires = "ipoe_iface")]
    pub peer_ip: Option<Ipv4Addr>,

    /// DNS server handed to the IPoE client
    #[arg(long, value_name = "ADDR", default_value = "8.8.8.8")]
    pub dns: Ipv4Addr,

    /// Access concentrator of the PPPoE session the IPoE client rides on
    #[arg(long, value_name = "MAC", requires_all = ["ipoe_iface", "session_id"])]
    pub ac_mac: Option<MacAddr>,

    /// PPPoE session id assigned by that access concentrator
    #[arg(long, value_name = "ID", requires = "ac_mac")]
    pub session_id: Option<u16>,

    /// Verbose output (-v, -vv, -vvv for increasing verbosity)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// List network interfaces and exit
    #[arg(long)]
    pub list_interfaces: bool,
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Relay settings, validated
    ///
    /// Interfaces are numbered server-facing first, then client-facing, then
    /// both; that numbering is what Relay-Session-Id tags carry.
    pub fn relay_config(&self) -> Result<RelayConfig> {
        let interfaces = self
            .server_ifaces
            .iter()
            .map(|name| InterfaceSpec::new(name, InterfaceRole::Server))
            .chain(
                self.client_ifaces
                    .iter()
                    .map(|name| InterfaceSpec::new(name, InterfaceRole::Client)),
            )
            .chain(
                self.both_ifaces
                    .iter()
                    .map(|name| InterfaceSpec::new(name, InterfaceRole::Both)),
            )
            .collect();

        let config = RelayConfig {
            interfaces,
            max_sessions: self.max_sessions,
            idle_timeout: self.idle_timeout,
            clean_period: self.clean_period,
        };
        config.validate()?;
        Ok(config)
    }

    /// Bridge settings, validated against the relay's, if a bridge was asked for
    pub fn bridge_config(&self, relay: &RelayConfig) -> Result<Option<BridgeConfig>> {
        let Some(interface) = &self.ipoe_iface else {
            return Ok(None);
        };
        let gateway = self
            .gateway
            .ok_or_else(|| Error::invalid_parameter("gateway", "required with --ipoe-iface"))?;
        let peer_ip = self
            .peer_ip
            .ok_or_else(|| Error::invalid_parameter("peer-ip", "required with --ipoe-iface"))?;

        let mut config = BridgeConfig::new(interface, gateway, self.netmask, peer_ip)
            .with_session(self.ac_mac, self.session_id)?;
        config.dns = self.dns;
        config.validate(relay)?;
        Ok(Some(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("ipoe-relay").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_command_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&["-S", "eth1"]);
        let config = cli.relay_config().unwrap();
        assert_eq!(config.max_sessions, 5000);
        assert_eq!(config.idle_timeout, 600);
        assert_eq!(config.clean_period, 60);
        assert_eq!(cli.netmask, Ipv4Addr::new(255, 255, 255, 0));
        assert_eq!(cli.dns, Ipv4Addr::new(8, 8, 8, 8));
        assert!(cli.bridge_config(&config).unwrap().is_none());
    }

    #[test]
    fn test_interface_numbering() {
        let cli = parse(&["-C", "eth0", "-S", "eth1", "-B", "eth2", "-S", "eth3"]);
        let config = cli.relay_config().unwrap();
        let names: Vec<_> = config.interfaces.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["eth1", "eth3", "eth0", "eth2"]);
        assert_eq!(config.interfaces[2].role, InterfaceRole::Client);
        assert_eq!(config.interfaces[3].role, InterfaceRole::Both);
        assert_eq!(config.first_ac_interface(), Some(0));
    }

    #[test]
    fn test_relay_limits() {
        let cli = parse(&["-S", "eth1", "-n", "0"]);
        assert!(matches!(cli.relay_config(), Err(Error::InvalidParameter { .. })));

        let cli = parse(&["-S", "eth1", "-C", "eth1"]);
        assert!(matches!(cli.relay_config(), Err(Error::InvalidParameter { .. })));

        let cli = parse(&["-S", "eth1", "-i", "0", "--clean-period", "5"]);
        let config = cli.relay_config().unwrap();
        assert_eq!(config.idle_timeout, 0);
        assert_eq!(config.clean_period, 5);
    }

    #[test]
    fn test_bridge_config() {
        let cli = parse(&[
            "-S", "eth1",
            "--ipoe-iface", "eth2",
            "--gateway", "10.0.0.1",
            "--peer-ip", "10.0.0.2",
            "--dns", "1.1.1.1",
            "--ac-mac", "00:aa:bb:cc:dd:ee",
            "--session-id", "66",
        ]);
        let relay = cli.relay_config().unwrap();
        let bridge = cli.bridge_config(&relay).unwrap().unwrap();

        assert_eq!(bridge.interface, "eth2");
        assert_eq!(bridge.gateway, Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(bridge.dns, Ipv4Addr::new(1, 1, 1, 1));
        let session = bridge.session.unwrap();
        assert_eq!(session.ac_mac, MacAddr([0x00, 0xaa, 0xbb, 0xcc, 0xdd, 0xee]));
        assert_eq!(session.session_id, 66);
    }

    #[test]
    fn test_bridge_requires_addresses() {
        let result = Cli::try_parse_from(["ipoe-relay", "--ipoe-iface", "eth2", "--gateway", "10.0.0.1"]);
        assert!(result.is_err());

        let result = Cli::try_parse_from(["ipoe-relay", "--gateway", "10.0.0.1"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_bridge_session_needs_both_values() {
        let result = Cli::try_parse_from([
            "ipoe-relay",
            "--ipoe-iface", "eth2",
            "--gateway", "10.0.0.1",
            "--peer-ip", "10.0.0.2",
            "--ac-mac", "00:aa:bb:cc:dd:ee",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_bridge_rejects_off_subnet_peer() {
        let cli = parse(&[
            "--ipoe-iface", "eth2",
            "--gateway", "10.0.0.1",
            "--peer-ip", "10.0.1.2",
        ]);
        let relay = cli.relay_config().unwrap();
        assert!(matches!(
            cli.bridge_config(&relay),
            Err(Error::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_bad_mac_rejected_by_parser() {
        let result = Cli::try_parse_from([
            "ipoe-relay",
            "--ipoe-iface", "eth2",
            "--gateway", "10.0.0.1",
            "--peer-ip", "10.0.0.2",
            "--ac-mac", "00:aa:bb",
            "--session-id", "1",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_verbosity_count() {
        assert_eq!(parse(&["-vv", "--list-interfaces"]).verbose, 2);
        assert!(parse(&["--list-interfaces"]).list_interfaces);
    }
}
