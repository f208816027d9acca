//! A Diameter base protocol ([RFC 6733](https://tools.ietf.org/html/rfc6733)) node.
//!
//! Covers the wire codec (AVPs and messages), the peer state machine
//! (CER/CEA, DWR/DWA, DPR/DPA), and the node-level routing/correlation
//! tables an application is built on top of. Concrete applications (NASREQ,
//! credit control, and so on) implement [`application::Application`] against
//! a running [`node::Node`]; this crate does not ship any of them itself.
//!
//! ## Errors
//! Decode failures surface as typed errors (see [`error`]) rather than
//! panics; a peer that sends a malformed AVP gets the frame logged and
//! dropped rather than tearing down the connection.

pub mod application;
pub mod avp;
pub mod constants;
pub mod error;
pub mod message;
pub mod node;
pub mod packer;
pub mod peer;
pub mod session;
pub mod transport;
pub mod uri;

pub use avp::{Avp, AvpValue};
pub use error::{ApplicationError, MessageError, NodeError};
pub use message::Message;
pub use node::{Node, NodeConfig};
pub use peer::{Peer, PeerConfig, PeerState};
