//! AVP (Attribute-Value Pair) types and their wire codec.
//!
//! Grounded on the typed `Avp` subclasses of the upstream implementation
//! (`AvpAddress`, `AvpInteger32`, `AvpGrouped`, ...): here they become
//! variants of a single [`AvpValue`] enum rather than a class hierarchy, with
//! the dictionary only needed to pick a variant during decode.

pub mod dictionary;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use chrono::{DateTime, TimeZone, Utc};
use std::io::Cursor;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use crate::error::{AvpDecodeError, AvpEncodeError};
use crate::packer::{padded_len, Unpacker};
use dictionary::AvpDictionary;

/// Three flag bits defined by RFC 6733 §4.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AvpFlags {
    pub vendor: bool,
    pub mandatory: bool,
    pub private: bool,
}

impl AvpFlags {
    pub fn from_byte(b: u8) -> Self {
        AvpFlags {
            vendor: b & 0x80 != 0,
            mandatory: b & 0x40 != 0,
            private: b & 0x20 != 0,
        }
    }

    pub fn to_byte(self) -> u8 {
        (if self.vendor { 0x80 } else { 0 })
            | (if self.mandatory { 0x40 } else { 0 })
            | (if self.private { 0x20 } else { 0 })
    }
}

/// The declared type of an AVP, used by the dictionary to pick how to decode
/// a payload it otherwise has no field-catalogue entry for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvpType {
    Address,
    Integer32,
    Integer64,
    Unsigned32,
    Unsigned64,
    Float32,
    Float64,
    OctetString,
    Utf8String,
    Time,
    Grouped,
    /// Alias for Integer32, kept distinct only for readability at call sites.
    Enumerated,
}

/// A decoded (or about-to-be-encoded) IP/E.164 address value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AvpAddress {
    V4(Ipv4Addr),
    V6(Ipv6Addr),
    E164(String),
}

impl AvpAddress {
    const FAMILY_IPV4: u16 = 1;
    const FAMILY_IPV6: u16 = 2;
    const FAMILY_E164: u16 = 8;

    /// Auto-detects the family the way the upstream setter does: try a
    /// dotted-quad, then colon-hex, else treat the string as E.164 digits.
    pub fn parse(s: &str) -> Self {
        if let Ok(v4) = Ipv4Addr::from_str(s) {
            return AvpAddress::V4(v4);
        }
        if let Ok(v6) = Ipv6Addr::from_str(s) {
            return AvpAddress::V6(v6);
        }
        AvpAddress::E164(s.to_string())
    }

    fn decode(payload: &[u8], avp_code: u32) -> Result<Self, AvpDecodeError> {
        if payload.len() < 2 {
            return Err(AvpDecodeError::Malformed {
                avp_code,
                reason: "address payload shorter than family field".into(),
            });
        }
        let mut cur = Cursor::new(payload);
        let family = cur.read_u16::<BigEndian>().unwrap();
        let rest = &payload[2..];
        match family {
            Self::FAMILY_IPV4 => {
                if rest.len() != 4 {
                    return Err(AvpDecodeError::Malformed {
                        avp_code,
                        reason: format!("ipv4 address must be 4 bytes, got {}", rest.len()),
                    });
                }
                Ok(AvpAddress::V4(Ipv4Addr::new(rest[0], rest[1], rest[2], rest[3])))
            }
            Self::FAMILY_IPV6 => {
                if rest.len() != 16 {
                    return Err(AvpDecodeError::Malformed {
                        avp_code,
                        reason: format!("ipv6 address must be 16 bytes, got {}", rest.len()),
                    });
                }
                let mut octets = [0u8; 16];
                octets.copy_from_slice(rest);
                Ok(AvpAddress::V6(Ipv6Addr::from(octets)))
            }
            Self::FAMILY_E164 => {
                let s = std::str::from_utf8(rest).map_err(|_| AvpDecodeError::Malformed {
                    avp_code,
                    reason: "e.164 address is not valid utf-8".into(),
                })?;
                Ok(AvpAddress::E164(s.to_string()))
            }
            other => Err(AvpDecodeError::Malformed {
                avp_code,
                reason: format!("unknown address family {}", other),
            }),
        }
    }

    fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        match self {
            AvpAddress::V4(a) => {
                out.write_u16::<BigEndian>(Self::FAMILY_IPV4).unwrap();
                out.extend_from_slice(&a.octets());
            }
            AvpAddress::V6(a) => {
                out.write_u16::<BigEndian>(Self::FAMILY_IPV6).unwrap();
                out.extend_from_slice(&a.octets());
            }
            AvpAddress::E164(s) => {
                out.write_u16::<BigEndian>(Self::FAMILY_E164).unwrap();
                out.extend_from_slice(s.as_bytes());
            }
        }
        out
    }
}

impl std::fmt::Display for AvpAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AvpAddress::V4(a) => write!(f, "{}", a),
            AvpAddress::V6(a) => write!(f, "{}", a),
            AvpAddress::E164(s) => write!(f, "{}", s),
        }
    }
}

/// NTP seconds-since-1900 offset to the Unix epoch: `((70*365)+17)*86400`.
const NTP_UNIX_OFFSET: i64 = ((70 * 365) + 17) * 86400;
/// Values below this (top bit clear) are post-2036 rollover timestamps.
const ROLLOVER_CUTOFF: u32 = 0x8000_0000;

fn decode_time(raw: u32) -> DateTime<Utc> {
    let ntp_secs: i64 = if raw < ROLLOVER_CUTOFF {
        raw as i64 + 0x1_0000_0000
    } else {
        raw as i64
    };
    let unix_secs = ntp_secs - NTP_UNIX_OFFSET;
    Utc.timestamp_opt(unix_secs, 0)
        .single()
        .unwrap_or_else(|| Utc.timestamp_opt(0, 0).single().unwrap())
}

fn encode_time(dt: &DateTime<Utc>) -> u32 {
    let ntp_secs = dt.timestamp() + NTP_UNIX_OFFSET;
    (ntp_secs as u64 & 0xFFFF_FFFF) as u32
}

/// The logical value carried by an AVP. Grouped AVPs recursively hold a list
/// of child AVPs; everything else is a flat scalar.
#[derive(Debug, Clone, PartialEq)]
pub enum AvpValue {
    Address(AvpAddress),
    Integer32(i32),
    Integer64(i64),
    Unsigned32(u32),
    Unsigned64(u64),
    Float32(f32),
    Float64(f64),
    OctetString(Vec<u8>),
    Utf8String(String),
    Time(DateTime<Utc>),
    Grouped(Vec<Avp>),
    /// An AVP whose code wasn't found in the dictionary in effect; carried
    /// as opaque bytes so it still round-trips.
    Unknown(Vec<u8>),
}

impl AvpValue {
    fn decode(ty: AvpType, payload: &[u8], avp_code: u32, dict: &dyn AvpDictionary) -> Result<Self, AvpDecodeError> {
        Ok(match ty {
            AvpType::Address => AvpValue::Address(AvpAddress::decode(payload, avp_code)?),
            AvpType::Integer32 | AvpType::Enumerated => {
                AvpValue::Integer32(read_exact(payload, avp_code)?.read_i32::<BigEndian>().unwrap())
            }
            AvpType::Integer64 => AvpValue::Integer64(read_exact(payload, avp_code)?.read_i64::<BigEndian>().unwrap()),
            AvpType::Unsigned32 => AvpValue::Unsigned32(read_exact(payload, avp_code)?.read_u32::<BigEndian>().unwrap()),
            AvpType::Unsigned64 => AvpValue::Unsigned64(read_exact(payload, avp_code)?.read_u64::<BigEndian>().unwrap()),
            AvpType::Float32 => AvpValue::Float32(read_exact(payload, avp_code)?.read_f32::<BigEndian>().unwrap()),
            AvpType::Float64 => AvpValue::Float64(read_exact(payload, avp_code)?.read_f64::<BigEndian>().unwrap()),
            AvpType::OctetString => AvpValue::OctetString(payload.to_vec()),
            AvpType::Utf8String => {
                let s = std::str::from_utf8(payload).map_err(|_| AvpDecodeError::Malformed {
                    avp_code,
                    reason: "not valid utf-8".into(),
                })?;
                AvpValue::Utf8String(s.to_string())
            }
            AvpType::Time => {
                let raw = read_exact(payload, avp_code)?.read_u32::<BigEndian>().unwrap();
                AvpValue::Time(decode_time(raw))
            }
            AvpType::Grouped => {
                let mut children = Vec::new();
                let mut up = Unpacker::new(payload);
                while !up.is_done() {
                    children.push(Avp::decode(&mut up, dict)?);
                }
                AvpValue::Grouped(children)
            }
        })
    }

    fn encode(&self) -> Result<Vec<u8>, AvpEncodeError> {
        let mut out = Vec::new();
        match self {
            AvpValue::Address(a) => out = a.encode(),
            AvpValue::Integer32(v) => out.write_i32::<BigEndian>(*v).unwrap(),
            AvpValue::Integer64(v) => out.write_i64::<BigEndian>(*v).unwrap(),
            AvpValue::Unsigned32(v) => out.write_u32::<BigEndian>(*v).unwrap(),
            AvpValue::Unsigned64(v) => out.write_u64::<BigEndian>(*v).unwrap(),
            AvpValue::Float32(v) => out.write_f32::<BigEndian>(*v).unwrap(),
            AvpValue::Float64(v) => out.write_f64::<BigEndian>(*v).unwrap(),
            AvpValue::OctetString(v) => out = v.clone(),
            AvpValue::Utf8String(v) => out = v.as_bytes().to_vec(),
            AvpValue::Time(dt) => out.write_u32::<BigEndian>(encode_time(dt)).unwrap(),
            AvpValue::Grouped(children) => {
                for child in children {
                    out.extend_from_slice(&child.encode());
                }
            }
            AvpValue::Unknown(raw) => out = raw.clone(),
        }
        Ok(out)
    }

    pub fn as_grouped(&self) -> Option<&[Avp]> {
        match self {
            AvpValue::Grouped(v) => Some(v),
            _ => None,
        }
    }
}

fn read_exact(payload: &[u8], avp_code: u32) -> Result<Cursor<&[u8]>, AvpDecodeError> {
    if payload.is_empty() {
        return Err(AvpDecodeError::Malformed { avp_code, reason: "empty payload".into() });
    }
    Ok(Cursor::new(payload))
}

/// A single Attribute-Value Pair: header fields plus a typed value.
#[derive(Debug, Clone, PartialEq)]
pub struct Avp {
    pub code: u32,
    pub vendor_id: u32,
    pub flags: AvpFlags,
    pub value: AvpValue,
}

impl Avp {
    const HEADER_LEN: usize = 8;
    const VENDOR_LEN: usize = 4;

    /// Builds a new AVP from a dictionary-known code and a logical value.
    /// Mirrors `Avp.new(code, vendor, value)` upstream: the Vendor flag is
    /// derived from `vendor_id`, Mandatory defaults to `true` unless
    /// overridden.
    pub fn new(code: u32, vendor_id: u32, value: AvpValue, is_mandatory: Option<bool>) -> Self {
        Avp {
            code,
            vendor_id,
            flags: AvpFlags {
                vendor: vendor_id != 0,
                mandatory: is_mandatory.unwrap_or(true),
                private: false,
            },
            value,
        }
    }

    pub fn decode(up: &mut Unpacker<'_>, dict: &dyn AvpDictionary) -> Result<Self, AvpDecodeError> {
        let code = up.unpack_uint()?;
        let flags_len = up.unpack_uint()?;
        let flags = AvpFlags::from_byte((flags_len >> 24) as u8);
        let total_len = (flags_len & 0x00FF_FFFF) as usize;
        if total_len < Self::HEADER_LEN {
            return Err(AvpDecodeError::Malformed {
                avp_code: code,
                reason: format!("declared length {} shorter than avp header", total_len),
            });
        }
        let mut content_len = total_len - Self::HEADER_LEN;
        let vendor_id = if flags.vendor {
            if content_len < Self::VENDOR_LEN {
                return Err(AvpDecodeError::Malformed {
                    avp_code: code,
                    reason: "vendor flag set but no room for vendor id".into(),
                });
            }
            content_len -= Self::VENDOR_LEN;
            up.unpack_uint()?
        } else {
            0
        };

        let payload = up.unpack_fopaque(content_len)?;

        let ty = dict.lookup(code, vendor_id);
        let value = match ty {
            Some(ty) => AvpValue::decode(ty, &payload, code, dict)?,
            None => AvpValue::Unknown(payload),
        };

        Ok(Avp { code, vendor_id, flags, value })
    }

    /// Total on-wire length for this AVP, including header, optional vendor
    /// id and padding — but not the header's own `length` field value, which
    /// excludes padding (see [`Avp::declared_len`]).
    pub fn wire_len(&self) -> Result<usize, AvpEncodeError> {
        Ok(padded_len(self.declared_len()?))
    }

    /// The value written into the AVP header's length field: header + vendor
    /// + payload, unpadded.
    pub fn declared_len(&self) -> Result<usize, AvpEncodeError> {
        let payload_len = self.value.encode()?.len();
        Ok(Self::HEADER_LEN + if self.flags.vendor { Self::VENDOR_LEN } else { 0 } + payload_len)
    }

    pub fn encode(&self) -> Vec<u8> {
        let payload = self.value.encode().expect("avp was constructed with a valid value");
        let declared_len = Self::HEADER_LEN
            + if self.flags.vendor { Self::VENDOR_LEN } else { 0 }
            + payload.len();

        let mut out = Vec::with_capacity(padded_len(declared_len));
        out.write_u32::<BigEndian>(self.code).unwrap();
        out.write_u32::<BigEndian>(((self.flags.to_byte() as u32) << 24) | declared_len as u32).unwrap();
        if self.flags.vendor {
            out.write_u32::<BigEndian>(self.vendor_id).unwrap();
        }
        out.extend_from_slice(&payload);
        let pad = padded_len(out.len()) - out.len();
        out.extend(std::iter::repeat(0u8).take(pad));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::avp::dictionary::{codes, StaticDictionary};

    #[test]
    fn scalar_roundtrip() {
        let dict = StaticDictionary::new();
        let avp = Avp::new(codes::RESULT_CODE, 0, AvpValue::Unsigned32(2001), None);
        let bytes = avp.encode();
        assert_eq!(bytes.len() % 4, 0);
        let mut up = Unpacker::new(&bytes);
        let decoded = Avp::decode(&mut up, &dict).unwrap();
        assert_eq!(decoded.value, AvpValue::Unsigned32(2001));
        assert!(up.is_done());
    }

    #[test]
    fn utf8_string_with_padding() {
        let dict = StaticDictionary::new();
        let avp = Avp::new(codes::PRODUCT_NAME, 0, AvpValue::Utf8String("abc".into()), Some(false));
        let bytes = avp.encode();
        // header (8) + "abc" padded to 4 = 12
        assert_eq!(bytes.len(), 12);
        let mut up = Unpacker::new(&bytes);
        let decoded = Avp::decode(&mut up, &dict).unwrap();
        assert_eq!(decoded.value, AvpValue::Utf8String("abc".into()));
    }

    #[test]
    fn vendor_flag_roundtrip() {
        let dict = StaticDictionary::new();
        let avp = Avp::new(9999, 10415, AvpValue::Unsigned32(1), None);
        assert!(avp.flags.vendor);
        let bytes = avp.encode();
        let mut up = Unpacker::new(&bytes);
        let decoded = Avp::decode(&mut up, &dict).unwrap();
        assert_eq!(decoded.vendor_id, 10415);
        assert!(decoded.flags.vendor);
    }

    #[test]
    fn grouped_nested_three_deep() {
        let dict = StaticDictionary::new();
        let inner = Avp::new(codes::VENDOR_ID, 0, AvpValue::Unsigned32(99), None);
        let mid = Avp::new(codes::EXPERIMENTAL_RESULT, 0, AvpValue::Grouped(vec![inner.clone()]), None);
        let outer = Avp::new(codes::FAILED_AVP, 0, AvpValue::Grouped(vec![mid.clone()]), None);

        let bytes = outer.encode();
        let mut up = Unpacker::new(&bytes);
        let decoded = Avp::decode(&mut up, &dict).unwrap();
        let level1 = decoded.value.as_grouped().unwrap();
        assert_eq!(level1.len(), 1);
        let level2 = level1[0].value.as_grouped().unwrap();
        assert_eq!(level2.len(), 1);
        assert_eq!(level2[0].value, AvpValue::Unsigned32(99));
    }

    #[test]
    fn address_family_auto_detect() {
        assert_eq!(AvpAddress::parse("10.0.0.1"), AvpAddress::V4(Ipv4Addr::new(10, 0, 0, 1)));
        assert_eq!(AvpAddress::parse("::1"), AvpAddress::V6(Ipv6Addr::LOCALHOST));
        assert_eq!(AvpAddress::parse("15551234567"), AvpAddress::E164("15551234567".into()));
    }

    #[test]
    fn time_rollover_boundary_roundtrips() {
        // A timestamp just after the 2036 rollover.
        let raw_post_rollover: u32 = 0x0000_0010;
        let decoded = decode_time(raw_post_rollover);
        let re_encoded = encode_time(&decoded);
        assert_eq!(re_encoded, raw_post_rollover);

        // A timestamp well before the rollover.
        let raw_pre_rollover: u32 = 0xD000_0000;
        let decoded = decode_time(raw_pre_rollover);
        let re_encoded = encode_time(&decoded);
        assert_eq!(re_encoded, raw_pre_rollover);
    }

    #[test]
    fn vendor_avp_with_zero_vendor_id_is_invalid_shape() {
        // Boundary case: a decoded AVP may have the vendor flag set with a
        // literal vendor_id of zero. The codec must preserve this as-read
        // rather than silently "fixing" it.
        let mut raw = Vec::new();
        raw.write_u32::<BigEndian>(9999).unwrap();
        raw.write_u32::<BigEndian>((0x80u32 << 24) | 12).unwrap();
        raw.write_u32::<BigEndian>(0).unwrap();
        let dict = StaticDictionary::new();
        let mut up = Unpacker::new(&raw);
        let decoded = Avp::decode(&mut up, &dict).unwrap();
        assert!(decoded.flags.vendor);
        assert_eq!(decoded.vendor_id, 0);
    }
}
