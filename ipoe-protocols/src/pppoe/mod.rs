//! PPPoE (Point-to-Point Protocol over Ethernet) - RFC 2516
//!
//! Frame-level access to discovery and session packets. Tags are kept in
//! their wire form inside the payload so they can be rewritten in place and
//! relayed byte for byte.

pub mod packet;

pub use packet::{
    PppoeCode, PppoePacket, PppoeTag, PppoeTagType, TagRef, MAX_PPPOE_PAYLOAD,
    PPPOE_DISCOVERY_ETHERTYPE, PPPOE_SESSION_ETHERTYPE,
};
