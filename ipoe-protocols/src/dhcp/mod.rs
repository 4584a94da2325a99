//! DHCP (Dynamic Host Configuration Protocol) responder
//!
//! This module provides:
//! - BOOTP/DHCP message decoding and encoding
//! - Option list parsing and appending
//! - The local OFFER/ACK synthesizer for the IPoE client

pub mod options;
pub mod packet;
pub mod relay;

pub use options::{DhcpOption, OptionTable, OptionWriter};
pub use packet::{BootpHeader, BootpMessage, DhcpMessageType};
pub use relay::handle_dhcp_request;
