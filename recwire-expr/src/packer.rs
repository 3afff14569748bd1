//! Msgpack writer.
//!
//! Integers always take the smallest width that holds them. Strings come in
//! two flavors: plain strings (str family) for names, and typed values
//! (bin family, first byte is the particle type) for data.

use crate::error::ExprError;
use bytes::{BufMut, Bytes, BytesMut};
use recwire_protocol::ParticleType;

/// Extension type used for the infinity and wildcard sentinels.
pub const EXT_SENTINEL: u8 = 0xff;
pub const SENTINEL_WILDCARD: u8 = 0x00;
pub const SENTINEL_INFINITY: u8 = 0x01;

/// Appends msgpack items to a buffer.
#[derive(Debug, Default)]
pub struct Packer {
    buf: BytesMut,
}

fn checked_len(len: usize) -> Result<u32, ExprError> {
    u32::try_from(len).map_err(|_| ExprError::SizeOverflow(len))
}

impl Packer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }

    pub fn pack_nil(&mut self) {
        self.buf.put_u8(0xc0);
    }

    pub fn pack_bool(&mut self, v: bool) {
        self.buf.put_u8(if v { 0xc3 } else { 0xc2 });
    }

    pub fn pack_uint(&mut self, v: u64) {
        if v < 0x80 {
            self.buf.put_u8(v as u8);
        } else if v <= u8::MAX as u64 {
            self.buf.put_u8(0xcc);
            self.buf.put_u8(v as u8);
        } else if v <= u16::MAX as u64 {
            self.buf.put_u8(0xcd);
            self.buf.put_u16(v as u16);
        } else if v <= u32::MAX as u64 {
            self.buf.put_u8(0xce);
            self.buf.put_u32(v as u32);
        } else {
            self.buf.put_u8(0xcf);
            self.buf.put_u64(v);
        }
    }

    pub fn pack_int(&mut self, v: i64) {
        if v >= 0 {
            self.pack_uint(v as u64);
        } else if v >= -32 {
            self.buf.put_i8(v as i8);
        } else if v >= i8::MIN as i64 {
            self.buf.put_u8(0xd0);
            self.buf.put_i8(v as i8);
        } else if v >= i16::MIN as i64 {
            self.buf.put_u8(0xd1);
            self.buf.put_i16(v as i16);
        } else if v >= i32::MIN as i64 {
            self.buf.put_u8(0xd2);
            self.buf.put_i32(v as i32);
        } else {
            self.buf.put_u8(0xd3);
            self.buf.put_i64(v);
        }
    }

    pub fn pack_float(&mut self, v: f64) {
        self.buf.put_u8(0xcb);
        self.buf.put_f64(v);
    }

    /// Packs a plain string (bin and variable names).
    ///
    /// Names may not start with the string or blob particle byte: readers
    /// treat such str payloads as typed values.
    pub fn pack_str(&mut self, s: &str) -> Result<(), ExprError> {
        if let Some(&first) = s.as_bytes().first() {
            if first == ParticleType::String.code() || first == ParticleType::Blob.code() {
                return Err(ExprError::AmbiguousName(s.to_string()));
            }
        }
        let len = checked_len(s.len())?;
        if len < 32 {
            self.buf.put_u8(0xa0 | len as u8);
        } else if len <= u8::MAX as u32 {
            self.buf.put_u8(0xd9);
            self.buf.put_u8(len as u8);
        } else if len <= u16::MAX as u32 {
            self.buf.put_u8(0xda);
            self.buf.put_u16(len as u16);
        } else {
            self.buf.put_u8(0xdb);
            self.buf.put_u32(len);
        }
        self.buf.put_slice(s.as_bytes());
        Ok(())
    }

    /// Packs a typed value: bin family, payload prefixed by its particle type.
    pub fn pack_typed(&mut self, particle: ParticleType, data: &[u8]) -> Result<(), ExprError> {
        let len = checked_len(data.len() + 1)?;
        if len <= u8::MAX as u32 {
            self.buf.put_u8(0xc4);
            self.buf.put_u8(len as u8);
        } else if len <= u16::MAX as u32 {
            self.buf.put_u8(0xc5);
            self.buf.put_u16(len as u16);
        } else {
            self.buf.put_u8(0xc6);
            self.buf.put_u32(len);
        }
        self.buf.put_u8(particle.code());
        self.buf.put_slice(data);
        Ok(())
    }

    pub fn pack_array_header(&mut self, n: usize) -> Result<(), ExprError> {
        let n = checked_len(n)?;
        if n < 16 {
            self.buf.put_u8(0x90 | n as u8);
        } else if n <= u16::MAX as u32 {
            self.buf.put_u8(0xdc);
            self.buf.put_u16(n as u16);
        } else {
            self.buf.put_u8(0xdd);
            self.buf.put_u32(n);
        }
        Ok(())
    }

    pub fn pack_map_header(&mut self, n: usize) -> Result<(), ExprError> {
        let n = checked_len(n)?;
        if n < 16 {
            self.buf.put_u8(0x80 | n as u8);
        } else if n <= u16::MAX as u32 {
            self.buf.put_u8(0xde);
            self.buf.put_u16(n as u16);
        } else {
            self.buf.put_u8(0xdf);
            self.buf.put_u32(n);
        }
        Ok(())
    }

    /// Packs an extension header. Zero-length extensions use ext8.
    pub fn pack_ext_header(&mut self, len: usize, ext_type: u8) -> Result<(), ExprError> {
        let len = checked_len(len)?;
        match len {
            1 => self.buf.put_u8(0xd4),
            2 => self.buf.put_u8(0xd5),
            4 => self.buf.put_u8(0xd6),
            8 => self.buf.put_u8(0xd7),
            16 => self.buf.put_u8(0xd8),
            n if n <= u8::MAX as u32 => {
                self.buf.put_u8(0xc7);
                self.buf.put_u8(n as u8);
            }
            n if n <= u16::MAX as u32 => {
                self.buf.put_u8(0xc8);
                self.buf.put_u16(n as u16);
            }
            n => {
                self.buf.put_u8(0xc9);
                self.buf.put_u32(n);
            }
        }
        self.buf.put_u8(ext_type);
        Ok(())
    }

    pub fn pack_infinity(&mut self) {
        self.buf.put_slice(&[0xd4, EXT_SENTINEL, SENTINEL_INFINITY]);
    }

    pub fn pack_wildcard(&mut self) {
        self.buf.put_slice(&[0xd4, EXT_SENTINEL, SENTINEL_WILDCARD]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packed(f: impl FnOnce(&mut Packer)) -> Vec<u8> {
        let mut p = Packer::new();
        f(&mut p);
        p.as_bytes().to_vec()
    }

    #[test]
    fn test_int_widths() {
        assert_eq!(packed(|p| p.pack_int(0)), vec![0x00]);
        assert_eq!(packed(|p| p.pack_int(127)), vec![0x7f]);
        assert_eq!(packed(|p| p.pack_int(128)), vec![0xcc, 0x80]);
        assert_eq!(packed(|p| p.pack_int(256)), vec![0xcd, 0x01, 0x00]);
        assert_eq!(packed(|p| p.pack_int(65536)), vec![0xce, 0, 1, 0, 0]);
        assert_eq!(packed(|p| p.pack_int(1 << 32)).len(), 9);
        assert_eq!(packed(|p| p.pack_int(-1)), vec![0xff]);
        assert_eq!(packed(|p| p.pack_int(-32)), vec![0xe0]);
        assert_eq!(packed(|p| p.pack_int(-33)), vec![0xd0, 0xdf]);
        assert_eq!(packed(|p| p.pack_int(-129)), vec![0xd1, 0xff, 0x7f]);
        assert_eq!(packed(|p| p.pack_int(-40000)).len(), 5);
        assert_eq!(packed(|p| p.pack_int(i64::MIN))[0], 0xd3);
    }

    #[test]
    fn test_float_and_scalars() {
        assert_eq!(
            packed(|p| p.pack_float(1.0)),
            vec![0xcb, 0x3f, 0xf0, 0, 0, 0, 0, 0, 0]
        );
        assert_eq!(packed(|p| p.pack_nil()), vec![0xc0]);
        assert_eq!(packed(|p| p.pack_bool(true)), vec![0xc3]);
        assert_eq!(packed(|p| p.pack_bool(false)), vec![0xc2]);
    }

    #[test]
    fn test_plain_vs_typed_strings() {
        assert_eq!(
            packed(|p| p.pack_str("age").unwrap()),
            vec![0xa3, b'a', b'g', b'e']
        );
        assert_eq!(
            packed(|p| p.pack_typed(ParticleType::String, b"active").unwrap()),
            vec![0xc4, 7, 3, b'a', b'c', b't', b'i', b'v', b'e']
        );

        let long = "x".repeat(40);
        let bytes = packed(|p| p.pack_str(&long).unwrap());
        assert_eq!(&bytes[..2], &[0xd9, 40]);

        let big = vec![0u8; 300];
        let bytes = packed(|p| p.pack_typed(ParticleType::Blob, &big).unwrap());
        assert_eq!(&bytes[..4], &[0xc5, 0x01, 0x2d, 4]);
    }

    #[test]
    fn test_headers() {
        assert_eq!(packed(|p| p.pack_array_header(3).unwrap()), vec![0x93]);
        assert_eq!(packed(|p| p.pack_array_header(16).unwrap()), vec![0xdc, 0, 16]);
        assert_eq!(packed(|p| p.pack_map_header(1).unwrap()), vec![0x81]);
        assert_eq!(
            packed(|p| p.pack_map_header(70000).unwrap()),
            vec![0xdf, 0, 1, 0x11, 0x70]
        );
        assert_eq!(packed(|p| p.pack_ext_header(0, 1).unwrap()), vec![0xc7, 0, 1]);
    }

    #[test]
    fn test_sentinels() {
        assert_eq!(packed(|p| p.pack_infinity()), vec![0xd4, 0xff, 0x01]);
        assert_eq!(packed(|p| p.pack_wildcard()), vec![0xd4, 0xff, 0x00]);
    }
}
