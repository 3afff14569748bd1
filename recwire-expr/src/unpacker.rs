//! Msgpack reader for values returned by collection operations.
//!
//! Bin- and str-family payloads whose first byte is a string or blob particle
//! type are stripped of that byte. Other str payloads are plain strings;
//! other bin payloads are returned whole as blobs.

use crate::error::ExprError;
use crate::opcode::MapOrder;
use crate::packer::{EXT_SENTINEL, SENTINEL_INFINITY, SENTINEL_WILDCARD};
use crate::value::Value;
use recwire_protocol::ParticleType;

/// Deepest container nesting accepted. Decoding recurses per level, so this
/// stays well inside a default 2 MiB thread stack.
pub const MAX_DEPTH: usize = 128;

/// Decodes exactly one value; trailing bytes are an error.
pub fn unpack(bytes: &[u8]) -> Result<Value, ExprError> {
    let mut unpacker = Unpacker::new(bytes);
    let value = unpacker.next_value()?;
    if !unpacker.is_empty() {
        return Err(ExprError::TrailingBytes {
            offset: unpacker.position(),
            remaining: unpacker.remaining(),
        });
    }
    Ok(value)
}

/// Decodes a sequence of concatenated values.
pub fn unpack_all(bytes: &[u8]) -> Result<Vec<Value>, ExprError> {
    let mut unpacker = Unpacker::new(bytes);
    let mut values = Vec::new();
    while !unpacker.is_empty() {
        values.push(unpacker.next_value()?);
    }
    Ok(values)
}

/// Reads msgpack values from a byte slice.
pub struct Unpacker<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Unpacker<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Reads the next value.
    pub fn next_value(&mut self) -> Result<Value, ExprError> {
        self.value(0)
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], ExprError> {
        if self.remaining() < n {
            return Err(ExprError::Truncated { offset: self.pos });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn peek(&self) -> Option<u8> {
        self.buf.get(self.pos).copied()
    }

    fn u8(&mut self) -> Result<u8, ExprError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, ExprError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32, ExprError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn u64(&mut self) -> Result<u64, ExprError> {
        let b = self.take(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(b);
        Ok(u64::from_be_bytes(raw))
    }

    fn value(&mut self, depth: usize) -> Result<Value, ExprError> {
        if depth > MAX_DEPTH {
            return Err(ExprError::TooDeep(MAX_DEPTH));
        }
        let offset = self.pos;
        let marker = self.u8()?;
        match marker {
            0x00..=0x7f => Ok(Value::Int(marker as i64)),
            0x80..=0x8f => self.map((marker & 0x0f) as usize, depth),
            0x90..=0x9f => self.array((marker & 0x0f) as usize, depth),
            0xa0..=0xbf => self.str((marker & 0x1f) as usize),
            0xc0 => Ok(Value::Nil),
            0xc2 => Ok(Value::Bool(false)),
            0xc3 => Ok(Value::Bool(true)),
            0xc4 => {
                let len = self.u8()? as usize;
                self.bin(len)
            }
            0xc5 => {
                let len = self.u16()? as usize;
                self.bin(len)
            }
            0xc6 => {
                let len = self.u32()? as usize;
                self.bin(len)
            }
            0xc7 => {
                let len = self.u8()? as usize;
                self.ext(len, offset)
            }
            0xc8 => {
                let len = self.u16()? as usize;
                self.ext(len, offset)
            }
            0xc9 => {
                let len = self.u32()? as usize;
                self.ext(len, offset)
            }
            0xca => {
                let bits = self.u32()?;
                Ok(Value::Float(f32::from_bits(bits) as f64))
            }
            0xcb => Ok(Value::Float(f64::from_bits(self.u64()?))),
            0xcc => Ok(Value::Int(self.u8()? as i64)),
            0xcd => Ok(Value::Int(self.u16()? as i64)),
            0xce => Ok(Value::Int(self.u32()? as i64)),
            0xcf => Ok(Value::from(self.u64()?)),
            0xd0 => Ok(Value::Int(self.u8()? as i8 as i64)),
            0xd1 => Ok(Value::Int(self.u16()? as i16 as i64)),
            0xd2 => Ok(Value::Int(self.u32()? as i32 as i64)),
            0xd3 => Ok(Value::Int(self.u64()? as i64)),
            0xd4 => self.ext(1, offset),
            0xd5 => self.ext(2, offset),
            0xd6 => self.ext(4, offset),
            0xd7 => self.ext(8, offset),
            0xd8 => self.ext(16, offset),
            0xd9 => {
                let len = self.u8()? as usize;
                self.str(len)
            }
            0xda => {
                let len = self.u16()? as usize;
                self.str(len)
            }
            0xdb => {
                let len = self.u32()? as usize;
                self.str(len)
            }
            0xdc => {
                let n = self.u16()? as usize;
                self.array(n, depth)
            }
            0xdd => {
                let n = self.u32()? as usize;
                self.array(n, depth)
            }
            0xde => {
                let n = self.u16()? as usize;
                self.map(n, depth)
            }
            0xdf => {
                let n = self.u32()? as usize;
                self.map(n, depth)
            }
            0xe0..=0xff => Ok(Value::Int(marker as i8 as i64)),
            0xc1 => Err(ExprError::UnknownMarker { marker, offset }),
        }
    }

    fn array(&mut self, n: usize, depth: usize) -> Result<Value, ExprError> {
        let mut items = Vec::with_capacity(n.min(self.remaining()));
        for _ in 0..n {
            items.push(self.value(depth + 1)?);
        }
        Ok(Value::List(items))
    }

    fn map(&mut self, n: usize, depth: usize) -> Result<Value, ExprError> {
        let mut n = n;
        let mut order = MapOrder::Unordered;

        // An ordered map leads with an empty extension (flags as its type) mapped to nil.
        if n > 0 && self.peek() == Some(0xc7) && self.buf.get(self.pos + 1) == Some(&0) {
            self.take(2)?;
            order = MapOrder::from_flag(self.u8()?);
            self.value(depth + 1)?;
            n -= 1;
        }

        let mut pairs = Vec::with_capacity(n.min(self.remaining()));
        for _ in 0..n {
            let key = self.value(depth + 1)?;
            let value = self.value(depth + 1)?;
            pairs.push((key, value));
        }
        Ok(Value::Map(pairs, order))
    }

    // Servers send typed strings and blobs in the str family too, so a
    // leading particle byte marks a typed value. The packer never writes a
    // plain name with that prefix.
    fn str(&mut self, len: usize) -> Result<Value, ExprError> {
        let offset = self.pos;
        let raw = self.take(len)?;
        let text = match raw.split_first() {
            Some((&tag, rest)) if tag == ParticleType::String.code() => rest,
            Some((&tag, rest)) if tag == ParticleType::Blob.code() => {
                return Ok(Value::Blob(rest.to_vec()))
            }
            _ => raw,
        };
        std::str::from_utf8(text)
            .map(|s| Value::Str(s.to_string()))
            .map_err(|_| ExprError::InvalidUtf8 { offset })
    }

    fn bin(&mut self, len: usize) -> Result<Value, ExprError> {
        let offset = self.pos;
        let raw = self.take(len)?;
        match raw.split_first() {
            Some((&tag, rest)) if tag == ParticleType::String.code() => std::str::from_utf8(rest)
                .map(|s| Value::Str(s.to_string()))
                .map_err(|_| ExprError::InvalidUtf8 { offset }),
            Some((&tag, rest)) if tag == ParticleType::Blob.code() => Ok(Value::Blob(rest.to_vec())),
            _ => Ok(Value::Blob(raw.to_vec())),
        }
    }

    fn ext(&mut self, len: usize, offset: usize) -> Result<Value, ExprError> {
        let ext_type = self.u8()?;
        let data = self.take(len)?;
        match (ext_type, data) {
            (EXT_SENTINEL, [SENTINEL_INFINITY]) => Ok(Value::Infinity),
            (EXT_SENTINEL, [SENTINEL_WILDCARD]) => Ok(Value::Wildcard),
            _ => Err(ExprError::UnknownMarker {
                marker: self.buf[offset],
                offset,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packer::Packer;
    use proptest::prelude::*;

    fn pack(value: &Value) -> Vec<u8> {
        crate::encoder::encode_value(value).unwrap().to_vec()
    }

    #[test]
    fn test_scalars() {
        assert_eq!(unpack(&[0x05]).unwrap(), Value::Int(5));
        assert_eq!(unpack(&[0xff]).unwrap(), Value::Int(-1));
        assert_eq!(unpack(&[0xd0, 0xdf]).unwrap(), Value::Int(-33));
        assert_eq!(unpack(&[0xcd, 0x01, 0x00]).unwrap(), Value::Int(256));
        assert_eq!(unpack(&[0xc0]).unwrap(), Value::Nil);
        assert_eq!(unpack(&[0xc3]).unwrap(), Value::Bool(true));
        assert_eq!(
            unpack(&[0xcf, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]).unwrap(),
            Value::Uint(u64::MAX)
        );
        assert_eq!(
            unpack(&[0xca, 0x3f, 0xc0, 0x00, 0x00]).unwrap(),
            Value::Float(1.5)
        );
    }

    #[test]
    fn test_strings() {
        assert_eq!(
            unpack(&[0xa3, b'a', b'g', b'e']).unwrap(),
            Value::Str("age".into())
        );
        assert_eq!(
            unpack(&[0xa3, 0x03, b'h', b'i']).unwrap(),
            Value::Str("hi".into())
        );
        assert_eq!(
            unpack(&[0xc4, 0x03, 0x03, b'h', b'i']).unwrap(),
            Value::Str("hi".into())
        );
        assert_eq!(
            unpack(&[0xc4, 0x02, 0x04, 0x09]).unwrap(),
            Value::Blob(vec![9])
        );
        assert_eq!(unpack(&[0xc4, 0x01, 0x09]).unwrap(), Value::Blob(vec![9]));
        assert!(matches!(
            unpack(&[0xa2, 0xff, 0xfe]),
            Err(ExprError::InvalidUtf8 { offset: 1 })
        ));
    }

    #[test]
    fn test_ordered_map() {
        let map = Value::Map(
            vec![(Value::from("a"), Value::Int(1)), (Value::from("b"), Value::Int(2))],
            MapOrder::KeyOrdered,
        );
        assert_eq!(unpack(&pack(&map)).unwrap(), map);
    }

    #[test]
    fn test_sentinels() {
        assert_eq!(unpack(&[0xd4, 0xff, 0x01]).unwrap(), Value::Infinity);
        assert_eq!(unpack(&[0xd4, 0xff, 0x00]).unwrap(), Value::Wildcard);
        assert!(matches!(
            unpack(&[0xd4, 0x05, 0x00]),
            Err(ExprError::UnknownMarker { marker: 0xd4, offset: 0 })
        ));
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            unpack(&[0xc1]),
            Err(ExprError::UnknownMarker { marker: 0xc1, offset: 0 })
        ));
        assert!(matches!(
            unpack(&[0x92, 0x01]),
            Err(ExprError::Truncated { offset: 2 })
        ));
        assert!(matches!(
            unpack(&[0xcd, 0x01]),
            Err(ExprError::Truncated { offset: 1 })
        ));
        assert!(matches!(
            unpack(&[0x01, 0x02]),
            Err(ExprError::TrailingBytes { offset: 1, remaining: 1 })
        ));
        assert!(matches!(unpack(&[]), Err(ExprError::Truncated { offset: 0 })));
    }

    #[test]
    fn test_huge_count_does_not_allocate() {
        assert!(matches!(
            unpack(&[0xdd, 0xff, 0xff, 0xff, 0xff]),
            Err(ExprError::Truncated { .. })
        ));
    }

    fn nested(levels: usize) -> Vec<u8> {
        let mut bytes = vec![0x91u8; levels];
        bytes.push(0x01);
        bytes
    }

    #[test]
    fn test_depth_limit() {
        let mut value = unpack(&nested(MAX_DEPTH)).unwrap();
        for _ in 0..MAX_DEPTH {
            value = value.as_list().unwrap()[0].clone();
        }
        assert_eq!(value, Value::Int(1));

        assert!(matches!(
            unpack(&nested(MAX_DEPTH + 1)),
            Err(ExprError::TooDeep(MAX_DEPTH))
        ));
        assert!(matches!(
            unpack(&vec![0x91u8; 4 * MAX_DEPTH]),
            Err(ExprError::TooDeep(MAX_DEPTH))
        ));
    }

    #[test]
    fn test_unpack_all() {
        let mut packer = Packer::new();
        packer.pack_int(1);
        packer.pack_str("x").unwrap();
        packer.pack_nil();
        assert_eq!(
            unpack_all(packer.as_bytes()).unwrap(),
            vec![Value::Int(1), Value::Str("x".into()), Value::Nil]
        );
    }

    fn arb_value() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Nil),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::Int),
            "[a-z]{0,40}".prop_map(Value::Str),
            proptest::collection::vec(any::<u8>(), 0..300).prop_map(Value::Blob),
        ];
        leaf.prop_recursive(4, 64, 8, |inner| {
            prop_oneof![
                proptest::collection::vec(inner.clone(), 0..20).prop_map(Value::List),
                proptest::collection::vec((inner.clone(), inner), 0..8)
                    .prop_map(|pairs| Value::Map(pairs, MapOrder::Unordered)),
            ]
        })
    }

    #[test]
    fn test_plain_str_prefix_rule() {
        let mut packer = Packer::new();
        assert!(matches!(
            packer.pack_str("\u{3}hi"),
            Err(ExprError::AmbiguousName(_))
        ));
        assert!(matches!(
            packer.pack_str("\u{4}x"),
            Err(ExprError::AmbiguousName(_))
        ));
        assert!(packer.is_empty());

        // A server-sent str payload with a blob prefix is a blob.
        assert_eq!(unpack(&[0xa2, 0x04, 0x09]).unwrap(), Value::Blob(vec![9]));
        // Other control bytes stay part of the string.
        assert_eq!(
            unpack(&[0xa2, 0x05, b'x']).unwrap(),
            Value::Str("\u{5}x".into())
        );
    }

    proptest! {
        #[test]
        fn prop_decode_inverts_encode(value in arb_value()) {
            prop_assert_eq!(unpack(&pack(&value)).unwrap(), value);
        }

        #[test]
        fn prop_plain_str_is_lossless(name in "\\PC{0,40}|[\\x00-\\x08][a-z]{0,8}") {
            let mut packer = Packer::new();
            if packer.pack_str(&name).is_ok() {
                prop_assert_eq!(unpack(packer.as_bytes()).unwrap(), Value::Str(name));
            }
        }
    }
}
