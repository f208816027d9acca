//! Big-endian, XDR-style primitive codec shared by the AVP and message layers.
//!
//! Every primitive is written/read at a fixed width and payloads are
//! zero-padded to a 4-byte boundary, mirroring the wire alignment Diameter
//! inherits from RFC 4506 XDR.

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use bytes::{BufMut, BytesMut};
use std::io::Cursor;

use crate::error::ConversionError;

/// Rounds `len` up to the next multiple of 4.
pub fn padded_len(len: usize) -> usize {
    (len + 3) & !3
}

/// Accumulates primitives into a growable byte buffer.
#[derive(Debug, Default)]
pub struct Packer {
    buf: BytesMut,
}

impl Packer {
    pub fn new() -> Self {
        Packer { buf: BytesMut::new() }
    }

    pub fn with_capacity(cap: usize) -> Self {
        Packer { buf: BytesMut::with_capacity(cap) }
    }

    pub fn pack_uint(&mut self, v: u32) {
        self.buf.put_u32(v);
    }

    pub fn pack_int(&mut self, v: i32) {
        self.buf.put_i32(v);
    }

    pub fn pack_uhyper(&mut self, v: u64) {
        // Mask each half to 32 bits explicitly before packing.
        self.pack_uint((v >> 32) as u32);
        self.pack_uint(v as u32);
    }

    pub fn pack_hyper(&mut self, v: i64) {
        self.pack_uhyper(v as u64);
    }

    pub fn pack_float(&mut self, v: f32) {
        self.buf.put_f32(v);
    }

    pub fn pack_double(&mut self, v: f64) {
        self.buf.put_f64(v);
    }

    pub fn pack_bool(&mut self, v: bool) {
        self.pack_uint(if v { 1 } else { 0 });
    }

    /// Writes raw bytes followed by zero padding to the next 4-byte boundary.
    pub fn pack_fopaque(&mut self, data: &[u8]) {
        self.buf.put_slice(data);
        let pad = padded_len(data.len()) - data.len();
        for _ in 0..pad {
            self.buf.put_u8(0);
        }
    }

    pub fn into_bytes(self) -> BytesMut {
        self.buf
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

/// Reads primitives off a byte slice, tracking a position cursor.
pub struct Unpacker<'a> {
    cur: Cursor<&'a [u8]>,
}

impl<'a> Unpacker<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Unpacker { cur: Cursor::new(data) }
    }

    pub fn get_position(&self) -> usize {
        self.cur.position() as usize
    }

    pub fn set_position(&mut self, pos: usize) {
        self.cur.set_position(pos as u64);
    }

    pub fn remaining(&self) -> usize {
        self.cur.get_ref().len().saturating_sub(self.get_position())
    }

    pub fn is_done(&self) -> bool {
        self.remaining() == 0
    }

    pub fn unpack_uint(&mut self) -> Result<u32, ConversionError> {
        self.cur.read_u32::<BigEndian>().map_err(|_| ConversionError::Underflow {
            wanted: 4,
            available: self.remaining(),
        })
    }

    pub fn unpack_int(&mut self) -> Result<i32, ConversionError> {
        self.cur.read_i32::<BigEndian>().map_err(|_| ConversionError::Underflow {
            wanted: 4,
            available: self.remaining(),
        })
    }

    pub fn unpack_uhyper(&mut self) -> Result<u64, ConversionError> {
        let hi = self.unpack_uint()? as u64;
        let lo = self.unpack_uint()? as u64;
        Ok((hi << 32) | lo)
    }

    pub fn unpack_hyper(&mut self) -> Result<i64, ConversionError> {
        Ok(self.unpack_uhyper()? as i64)
    }

    pub fn unpack_float(&mut self) -> Result<f32, ConversionError> {
        self.cur.read_f32::<BigEndian>().map_err(|_| ConversionError::Underflow {
            wanted: 4,
            available: self.remaining(),
        })
    }

    pub fn unpack_double(&mut self) -> Result<f64, ConversionError> {
        self.cur.read_f64::<BigEndian>().map_err(|_| ConversionError::Underflow {
            wanted: 8,
            available: self.remaining(),
        })
    }

    pub fn unpack_bool(&mut self) -> Result<bool, ConversionError> {
        Ok(self.unpack_uint()? != 0)
    }

    /// Reads exactly `n` bytes, then skips padding bytes to the next 4-byte boundary.
    pub fn unpack_fopaque(&mut self, n: usize) -> Result<Vec<u8>, ConversionError> {
        if self.remaining() < n {
            return Err(ConversionError::Underflow { wanted: n, available: self.remaining() });
        }
        let mut out = vec![0u8; n];
        self.cur.read_exact(&mut out).map_err(|_| ConversionError::Underflow {
            wanted: n,
            available: self.remaining(),
        })?;
        let pad = padded_len(n) - n;
        self.skip(pad)?;
        Ok(out)
    }

    pub fn skip(&mut self, n: usize) -> Result<(), ConversionError> {
        if self.remaining() < n {
            return Err(ConversionError::Underflow { wanted: n, available: self.remaining() });
        }
        self.set_position(self.get_position() + n);
        Ok(())
    }
}

use std::io::Read as _;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_unpack_uint_roundtrip() {
        let mut p = Packer::new();
        p.pack_uint(0xdead_beef);
        let bytes = p.into_bytes();
        let mut u = Unpacker::new(&bytes);
        assert_eq!(u.unpack_uint().unwrap(), 0xdead_beef);
        assert!(u.is_done());
    }

    #[test]
    fn pack_unpack_uhyper_roundtrip() {
        let mut p = Packer::new();
        p.pack_uhyper(0x0102_0304_0506_0708);
        let bytes = p.into_bytes();
        let mut u = Unpacker::new(&bytes);
        assert_eq!(u.unpack_uhyper().unwrap(), 0x0102_0304_0506_0708);
    }

    #[test]
    fn pack_hyper_negative_roundtrip() {
        let mut p = Packer::new();
        p.pack_hyper(-1);
        let bytes = p.into_bytes();
        let mut u = Unpacker::new(&bytes);
        assert_eq!(u.unpack_hyper().unwrap(), -1);
    }

    #[test]
    fn fopaque_pads_to_four_bytes() {
        let mut p = Packer::new();
        p.pack_fopaque(b"abc");
        assert_eq!(p.len(), 4);
        let mut p2 = Packer::new();
        p2.pack_fopaque(b"abcd");
        assert_eq!(p2.len(), 4);
    }

    #[test]
    fn unpack_underflow_errors() {
        let data = [0u8; 2];
        let mut u = Unpacker::new(&data);
        assert!(u.unpack_uint().is_err());
    }
}
