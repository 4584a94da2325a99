//! Error types for the IPoE/PPPoE relay
//!
//! The first five variants are the per-frame taxonomy: none of them is fatal,
//! each one maps to a drop, a pass-through or an error packet toward the peer.
//! The remaining variants cover setup and I/O.

use thiserror::Error;

/// Result type alias for relay operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the relay
#[derive(Error, Debug)]
pub enum Error {
    /// Frame failed structural validation; dropped without a reply
    #[error("Malformed packet: {0}")]
    MalformedPacket(String),

    /// Frame is plausible but not the protocol we intercept; forwarded unchanged
    #[error("Protocol mismatch: {0}")]
    ProtocolMismatch(String),

    /// Control packet arrived from the wrong direction
    #[error("Policy violation: {0}")]
    PolicyViolation(String),

    /// No free session slot
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// A tag rewrite would run past the packet capacity
    #[error("Buffer overflow: need {needed} bytes, capacity {capacity}")]
    BufferOverflow { needed: usize, capacity: usize },

    /// Network I/O error
    #[error("Network I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Interface not found
    #[error("Interface '{0}' not found")]
    InterfaceNotFound(String),

    /// Interface error
    #[error("Interface error: {0}")]
    Interface(String),

    /// Invalid parameter error
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    /// Receive/dispatch channel closed
    #[error("Channel error: {0}")]
    Channel(String),
}

impl Error {
    /// Create a malformed-packet error with a custom message
    pub fn malformed<S: Into<String>>(msg: S) -> Self {
        Error::MalformedPacket(msg.into())
    }

    /// Create a protocol-mismatch error with a custom message
    pub fn mismatch<S: Into<String>>(msg: S) -> Self {
        Error::ProtocolMismatch(msg.into())
    }

    /// Create a policy-violation error with a custom message
    pub fn policy<S: Into<String>>(msg: S) -> Self {
        Error::PolicyViolation(msg.into())
    }

    /// Create a buffer-overflow error
    pub fn overflow(needed: usize, capacity: usize) -> Self {
        Error::BufferOverflow { needed, capacity }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter<S: Into<String>>(name: S, reason: S) -> Self {
        Error::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
