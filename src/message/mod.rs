//! Diameter message header and the generic envelope around an AVP list.
//!
//! `type_factory` replaces the upstream pattern of walking a class hierarchy
//! by string-matching `"Request"`/`"Answer"` onto a class name: each known
//! command instead registers a plain function `fn(&MessageHeader) -> CommandKind`.

pub mod catalogue;
pub mod commands;

use hashbrown::HashMap;
use std::cell::RefCell;

use crate::avp::dictionary::AvpDictionary;
use crate::avp::{Avp, AvpValue};
use crate::error::MessageError;
use crate::packer::{Packer, Unpacker};

pub const HEADER_LEN: usize = 20;

/// Command header flags (RFC 6733 §3), unpacked into named fields instead of
/// a raw bitmask at every call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommandFlags {
    pub request: bool,
    pub proxiable: bool,
    pub error: bool,
    pub retransmit: bool,
}

impl CommandFlags {
    pub fn from_byte(b: u8) -> Self {
        CommandFlags {
            request: b & 0x80 != 0,
            proxiable: b & 0x40 != 0,
            error: b & 0x20 != 0,
            retransmit: b & 0x10 != 0,
        }
    }

    pub fn to_byte(self) -> u8 {
        (if self.request { 0x80 } else { 0 })
            | (if self.proxiable { 0x40 } else { 0 })
            | (if self.error { 0x20 } else { 0 })
            | (if self.retransmit { 0x10 } else { 0 })
    }
}

/// The 20-byte Diameter message header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    pub version: u8,
    /// Populated by `Message::encode`; zero until then.
    pub length: u32,
    pub flags: CommandFlags,
    pub command_code: u32,
    pub application_id: u32,
    pub hop_by_hop_id: u32,
    pub end_to_end_id: u32,
}

impl MessageHeader {
    pub fn is_request(&self) -> bool {
        self.flags.request
    }

    pub fn new_request(command_code: u32, application_id: u32) -> Self {
        MessageHeader {
            version: 1,
            length: 0,
            flags: CommandFlags { request: true, proxiable: true, error: false, retransmit: false },
            command_code,
            application_id,
            hop_by_hop_id: 0,
            end_to_end_id: 0,
        }
    }

    fn decode(up: &mut Unpacker<'_>) -> Result<Self, MessageError> {
        if up.remaining() < HEADER_LEN {
            return Err(MessageError::TooShort { wanted: HEADER_LEN, available: up.remaining() });
        }
        let version_and_len = up.unpack_uint()?;
        let version = (version_and_len >> 24) as u8;
        let length = version_and_len & 0x00FF_FFFF;
        if version != 1 {
            return Err(MessageError::BadVersion(version));
        }
        let flags_and_code = up.unpack_uint()?;
        let flags = CommandFlags::from_byte((flags_and_code >> 24) as u8);
        let command_code = flags_and_code & 0x00FF_FFFF;
        let application_id = up.unpack_uint()?;
        let hop_by_hop_id = up.unpack_uint()?;
        let end_to_end_id = up.unpack_uint()?;
        Ok(MessageHeader { version, length, flags, command_code, application_id, hop_by_hop_id, end_to_end_id })
    }

    fn encode(&self, p: &mut Packer) {
        p.pack_uint(((self.version as u32) << 24) | (self.length & 0x00FF_FFFF));
        p.pack_uint(((self.flags.to_byte() as u32) << 24) | (self.command_code & 0x00FF_FFFF));
        p.pack_uint(self.application_id);
        p.pack_uint(self.hop_by_hop_id);
        p.pack_uint(self.end_to_end_id);
    }
}

/// Dispatches a decoded header to a concrete command kind. Registered once
/// per command pair in [`commands`].
pub trait TypeFactory: Send + Sync {
    fn command_code(&self) -> u32;
    fn build(&self, header: MessageHeader, avps: Vec<Avp>) -> commands::CommandKind;
}

/// A generic Diameter message: header plus an ordered AVP list, with a
/// per-message memoized `find_avps` cache (the upstream `__find_cache`
/// localized to one message instance instead of shared global state).
#[derive(Debug, Clone)]
pub struct Message {
    pub header: MessageHeader,
    pub avps: Vec<Avp>,
    find_cache: RefCell<HashMap<Vec<(u32, u32)>, Vec<Vec<usize>>>>,
}

impl PartialEq for Message {
    fn eq(&self, other: &Self) -> bool {
        self.header == other.header && self.avps == other.avps
    }
}

impl Message {
    pub fn new(header: MessageHeader, avps: Vec<Avp>) -> Self {
        Message { header, avps, find_cache: RefCell::new(HashMap::new()) }
    }

    pub fn decode(bytes: &[u8], dict: &dyn AvpDictionary) -> Result<Self, MessageError> {
        let mut up = Unpacker::new(bytes);
        let header = MessageHeader::decode(&mut up)?;
        let mut avps = Vec::new();
        while !up.is_done() {
            avps.push(Avp::decode(&mut up, dict)?);
        }
        Ok(Message::new(header, avps))
    }

    pub fn encode(&mut self) -> Vec<u8> {
        let mut avp_bytes = Vec::new();
        for avp in &self.avps {
            avp_bytes.extend_from_slice(&avp.encode());
        }
        self.header.length = (HEADER_LEN + avp_bytes.len()) as u32;

        let mut p = Packer::with_capacity(self.header.length as usize);
        self.header.encode(&mut p);
        let mut out = p.into_bytes();
        out.extend_from_slice(&avp_bytes);
        out.to_vec()
    }

    /// Builds a fresh answer envelope for this request: same command code,
    /// application id and identifiers; Request bit cleared, Proxiable bit
    /// preserved, Error/Retransmit cleared. Populating `Result-Code` is left
    /// to the caller (or to `commands::*::generate_answer`).
    pub fn to_answer(&self) -> Message {
        let header = MessageHeader {
            version: 1,
            length: 0,
            flags: CommandFlags {
                request: false,
                proxiable: self.header.flags.proxiable,
                error: false,
                retransmit: false,
            },
            command_code: self.header.command_code,
            application_id: self.header.application_id,
            hop_by_hop_id: self.header.hop_by_hop_id,
            end_to_end_id: self.header.end_to_end_id,
        };
        Message::new(header, Vec::new())
    }

    /// Depth-first search for AVPs matching a `(code, vendor_id)` path,
    /// descending into grouped AVPs whose child code matches the next path
    /// element, collecting matches at the path tail. Results are memoized
    /// per-message keyed by the path, mirroring the upstream `__find_cache`
    /// but scoped to this single message rather than shared globally.
    pub fn find_avps(&self, path: &[(u32, u32)]) -> Vec<&Avp> {
        if path.is_empty() {
            return Vec::new();
        }
        let have_cached = self.find_cache.borrow().contains_key(path);
        if !have_cached {
            let mut index_paths = Vec::new();
            let mut stack = Vec::new();
            Self::collect(&self.avps, path, &mut stack, &mut index_paths);
            self.find_cache.borrow_mut().insert(path.to_vec(), index_paths);
        }
        let index_paths = self.find_cache.borrow().get(path).cloned().unwrap_or_default();
        index_paths.iter().map(|ip| self.resolve(ip)).collect()
    }

    fn resolve(&self, index_path: &[usize]) -> &Avp {
        let mut avps = &self.avps;
        let mut cur = &avps[index_path[0]];
        for &i in &index_path[1..] {
            avps = cur.value.as_grouped().expect("cached index path must point through grouped avps");
            cur = &avps[i];
        }
        cur
    }

    fn collect(avps: &[Avp], path: &[(u32, u32)], stack: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
        let (code, vendor) = path[0];
        for (i, avp) in avps.iter().enumerate() {
            if avp.code != code || avp.vendor_id != vendor {
                continue;
            }
            if path.len() == 1 {
                let mut index_path = stack.clone();
                index_path.push(i);
                out.push(index_path);
            } else if let Some(children) = avp.value.as_grouped() {
                stack.push(i);
                Self::collect(children, &path[1..], stack, out);
                stack.pop();
            }
        }
    }
}
