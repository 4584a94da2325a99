//! IPoE relay core library
//!
//! Shared error taxonomy, address types and interface descriptions for the
//! IPoE/PPPoE relay workspace.

pub mod error;
pub mod interface;
pub mod packet;
pub mod types;

// Re-export commonly used types
pub use error::{Error, Result};
pub use interface::{Interface, InterfaceRole};
pub use packet::{Packet, SocketKind};
pub use types::*;
