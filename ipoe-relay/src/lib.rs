//! PPPoE relay and IPoE bridge
//!
//! This crate holds all relay state and the loop that drives it:
//!
//! - [`SessionDirectory`]: dual-keyed session table with idle reaping
//! - [`BundleManager`]: multilink bundle membership
//! - [`RelayCore`]: PPPoE discovery/session relay
//! - [`IpoeBridge`]: local ARP/DHCP plus IPv4-in-PPPoE for one client
//! - [`EventLoop`]: single-task dispatch over received frames and the epoch tick
//!
//! Frames leave through a [`FrameSink`]; sockets live elsewhere.
//!
//! # Example
//!
//! ```no_run
//! use ipoe_core::{Interface, InterfaceRole, MacAddr, Packet};
//! use ipoe_relay::{EventLoop, FrameSink, RelayConfig, RelayCore};
//! use tokio::sync::mpsc;
//!
//! # fn sink() -> impl FrameSink { struct Null; impl FrameSink for Null {
//! #     fn send(&mut self, _: usize, _: ipoe_core::SocketKind, _: &[u8]) -> ipoe_core::Result<()> { Ok(()) }
//! # } Null }
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RelayConfig::default();
//!     let interfaces = vec![
//!         Interface::new("eth0", 0, MacAddr([0x02, 0, 0, 0, 0, 1]), InterfaceRole::Client),
//!         Interface::new("eth1", 1, MacAddr([0x02, 0, 0, 0, 0, 2]), InterfaceRole::Server),
//!     ];
//!
//!     let (_tx, rx) = mpsc::channel::<Packet>(1024);
//!     let relay = RelayCore::new(interfaces, &config);
//!     let mut event_loop = EventLoop::new(relay, None, sink(), config.clean_period);
//!     event_loop
//!         .run(rx, async {
//!             let _ = tokio::signal::ctrl_c().await;
//!         })
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod bridge;
pub mod bundle;
pub mod config;
pub mod directory;
pub mod event_loop;
pub mod relay;
pub mod sink;

pub use bridge::{IpoeBridge, SessionLink};
pub use bundle::{BundleId, BundleManager};
pub use config::{BridgeConfig, InterfaceSpec, RelayConfig};
pub use directory::{Session, SessionDirectory, SessionHandle, Side};
pub use event_loop::EventLoop;
pub use relay::{RelayCore, RelayStats};
pub use sink::FrameSink;
