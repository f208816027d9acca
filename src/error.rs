//! Error taxonomy for the codec, peer, node and application layers.
//!
//! Kept as hand-rolled enums with manual `Display`/`Error` impls rather than
//! a derive-macro crate.

use std::fmt;

/// Raised when an `Unpacker` runs out of bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionError {
    Underflow { wanted: usize, available: usize },
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionError::Underflow { wanted, available } => write!(
                f,
                "buffer underflow: wanted {} bytes, {} available",
                wanted, available
            ),
        }
    }
}

impl std::error::Error for ConversionError {}

/// A logical value could not be converted into an AVP payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AvpEncodeError {
    OutOfRange { avp_code: u32, reason: String },
    WrongType { avp_code: u32, expected: &'static str },
}

impl fmt::Display for AvpEncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AvpEncodeError::OutOfRange { avp_code, reason } => {
                write!(f, "avp {}: value out of range: {}", avp_code, reason)
            }
            AvpEncodeError::WrongType { avp_code, expected } => {
                write!(f, "avp {}: expected a {} value", avp_code, expected)
            }
        }
    }
}

impl std::error::Error for AvpEncodeError {}

/// A payload could not be interpreted as its declared AVP type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AvpDecodeError {
    Malformed { avp_code: u32, reason: String },
    Conversion(ConversionError),
}

impl fmt::Display for AvpDecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AvpDecodeError::Malformed { avp_code, reason } => {
                write!(f, "avp {}: malformed payload: {}", avp_code, reason)
            }
            AvpDecodeError::Conversion(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for AvpDecodeError {}

impl From<ConversionError> for AvpDecodeError {
    fn from(e: ConversionError) -> Self {
        AvpDecodeError::Conversion(e)
    }
}

/// Message-level decode failure: either the header was bad, or an AVP inside
/// it was.
#[derive(Debug)]
pub enum MessageError {
    BadVersion(u8),
    TooShort { wanted: usize, available: usize },
    Avp(AvpDecodeError),
}

impl fmt::Display for MessageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageError::BadVersion(v) => write!(f, "unsupported diameter version {}", v),
            MessageError::TooShort { wanted, available } => {
                write!(f, "truncated message: wanted {} bytes, {} available", wanted, available)
            }
            MessageError::Avp(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for MessageError {}

impl From<AvpDecodeError> for MessageError {
    fn from(e: AvpDecodeError) -> Self {
        MessageError::Avp(e)
    }
}

impl From<ConversionError> for MessageError {
    fn from(e: ConversionError) -> Self {
        MessageError::Avp(AvpDecodeError::Conversion(e))
    }
}

impl From<AvpEncodeError> for MessageError {
    fn from(e: AvpEncodeError) -> Self {
        MessageError::Avp(AvpDecodeError::Malformed {
            avp_code: match &e {
                AvpEncodeError::OutOfRange { avp_code, .. } => *avp_code,
                AvpEncodeError::WrongType { avp_code, .. } => *avp_code,
            },
            reason: e.to_string(),
        })
    }
}

/// Errors surfaced by `Node` routing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeError {
    NotRoutable(String),
    UnknownPeer(String),
}

impl fmt::Display for NodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeError::NotRoutable(reason) => write!(f, "not routable: {}", reason),
            NodeError::UnknownPeer(id) => write!(f, "unknown peer: {}", id),
        }
    }
}

impl std::error::Error for NodeError {}

/// Errors surfaced by the `Application` interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplicationError {
    RequestTimeout,
    EmptyAnswer,
    NotRoutable(String),
}

impl fmt::Display for ApplicationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplicationError::RequestTimeout => write!(f, "request timed out waiting for an answer"),
            ApplicationError::EmptyAnswer => write!(f, "no answer was delivered (application stopped?)"),
            ApplicationError::NotRoutable(reason) => write!(f, "not routable: {}", reason),
        }
    }
}

impl std::error::Error for ApplicationError {}

impl From<NodeError> for ApplicationError {
    fn from(e: NodeError) -> Self {
        match e {
            NodeError::NotRoutable(r) => ApplicationError::NotRoutable(r),
            NodeError::UnknownPeer(id) => ApplicationError::NotRoutable(format!("unknown peer: {}", id)),
        }
    }
}