//! Protocol handling for the IPoE/PPPoE relay
//!
//! ### ARP
//! Proxy ARP for the virtual gateway. See [`arp`].
//!
//! ### DHCP
//! BOOTP/DHCP decoding, option lists and the local OFFER/ACK responder.
//! See [`dhcp`].
//!
//! ### PPPoE
//! Discovery and session framing with in-place tag editing. See [`pppoe`].
//!
//! ### PPP
//! Read-only snooping of LCP, PAP and CHAP exchanges. See [`ppp`].
//!
//! [`intercept`] ties ARP and DHCP together into the IP path of an
//! [`IpoeConnection`].

pub mod arp;
pub mod connection;
pub mod dhcp;
pub mod intercept;
pub mod ppp;
pub mod pppoe;

pub use connection::IpoeConnection;
pub use intercept::{intercept_frame, Intercept, InterceptStats};
pub use pppoe::{PppoeCode, PppoePacket, PppoeTag, PppoeTagType};
