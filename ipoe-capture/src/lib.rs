//! Raw Ethernet ports for the IPoE/PPPoE relay
//!
//! ## Features
//!
//! - **Interface Management**: list interfaces and check they can carry relay traffic
//! - **Ports**: one pnet datalink channel per interface, split into a
//!   [`DatalinkSink`] for sending and [`Receiver`]s for reading
//! - **Statistics**: per-port atomic counters, readable while ports run
//!
//! ## Example
//!
//! ```no_run
//! use ipoe_capture::{open_ports, CaptureConfig, PortRole, PortSpec};
//! use ipoe_core::MacAddr;
//! use tokio::sync::mpsc;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let ports = [PortSpec {
//!     index: 0,
//!     name: "eth0".to_string(),
//!     mac: MacAddr([0x02, 0, 0, 0, 0, 1]),
//!     role: PortRole::Relay,
//! }];
//! let (sink, receivers) = open_ports(&ports, &CaptureConfig::default())?;
//!
//! let (tx, mut rx) = mpsc::channel(1024);
//! for receiver in receivers {
//!     receiver.spawn(tx.clone());
//! }
//! while let Some(packet) = rx.recv().await {
//!     println!("{} bytes on port {} ({})", packet.len(), packet.interface, packet.socket);
//! }
//! sink.log_counters();
//! # Ok(())
//! # }
//! ```

pub mod capture;
pub mod interface;
pub mod stats;

pub use capture::{classify, open_ports, CaptureConfig, DatalinkSink, PortRole, PortSpec, Receiver};
pub use interface::{list_interfaces, list_relay_interfaces, InterfaceInfo};
pub use stats::{PortCounters, PortStats};
