//! Database message body: fixed header, field records, operation records.
//!
//! Body layout (22 bytes header, then records):
//!
//! ```text
//! +--------+--------+--------+------------+------------+------------+---------+---------+
//! | hdr_sz | flags  | result | generation | record_ttl | txn_ttl    | n_field | n_ops   |
//! | 1 byte | 4 bytes| 1 byte | 4 bytes    | 4 bytes    | 4 bytes    | 2 bytes | 2 bytes |
//! +--------+--------+--------+------------+------------+------------+---------+---------+
//! | field records (n_field) | operation records (n_ops)                               |
//! +-------------------------+---------------------------------------------------------+
//!
//! field:     | len u32 (1 + payload) | type u8 | payload |
//! operation: | len u32 (4 + name + data) | kind u8 | value_type u8 | flags u8 | name_len u8 | name | data |
//! ```
//!
//! Records carry their own length, so the walker finds the next record by
//! adding the decoded length to the current offset. There is no side index.
//! The body is append-only: records are never reordered or removed, and all
//! fields precede all operations.

use crate::cursor::Cursor;
use crate::error::{ProtocolError, ResultCode};
use crate::frame::{Frame, MessageKind};
use crate::types::{FieldType, OpKind, ParticleType};
use crate::MAX_BODY_SIZE;
use bytes::{BufMut, Bytes, BytesMut};

/// Size of the fixed body header in bytes.
pub const BODY_HEADER_SIZE: usize = 22;

/// Size of a field record header (length + type).
pub const FIELD_HEADER_SIZE: usize = 5;

/// Size of an operation record header (length + kind + value type + flags + name length).
pub const OP_HEADER_SIZE: usize = 8;

/// Longest operation (bin) name the record format can describe.
pub const MAX_NAME_LEN: usize = u8::MAX as usize;

const OFF_FLAGS: usize = 1;
const OFF_RESULT: usize = 5;
const OFF_GENERATION: usize = 6;
const OFF_RECORD_TTL: usize = 10;
const OFF_TXN_TTL: usize = 14;
const OFF_FIELD_COUNT: usize = 18;
const OFF_OP_COUNT: usize = 20;

/// A message body being built or walked.
///
/// The body owns its buffer and enforces a byte limit on every append;
/// appends that would cross the limit fail with
/// [`ProtocolError::CapacityExceeded`] and leave the body untouched.
#[derive(Debug, Clone)]
pub struct MessageBody {
    buf: BytesMut,
    limit: usize,
}

impl MessageBody {
    /// Creates an empty body limited to [`MAX_BODY_SIZE`] bytes.
    pub fn new() -> Self {
        Self::with_capacity(MAX_BODY_SIZE as usize)
    }

    /// Creates an empty body that may grow to at most `limit` bytes.
    ///
    /// The limit never drops below the fixed header size.
    pub fn with_capacity(limit: usize) -> Self {
        let limit = limit.max(BODY_HEADER_SIZE);
        let mut body = Self {
            buf: BytesMut::with_capacity(limit.min(4096)),
            limit,
        };
        body.clear();
        body
    }

    /// Parses and validates a complete body.
    ///
    /// Every declared record is walked and the walk must end exactly at the
    /// end of `buf`.
    pub fn parse(buf: BytesMut) -> Result<Self, ProtocolError> {
        if buf.len() < BODY_HEADER_SIZE {
            return Err(ProtocolError::malformed(
                buf.len(),
                format!(
                    "body is {} bytes, header needs {}",
                    buf.len(),
                    BODY_HEADER_SIZE
                ),
            ));
        }
        if buf[0] as usize != BODY_HEADER_SIZE {
            return Err(ProtocolError::malformed(
                0,
                format!("unexpected header size {}", buf[0]),
            ));
        }

        let limit = buf.len().max(MAX_BODY_SIZE as usize);
        let body = Self { buf, limit };
        let end = body.end_offset()?;
        if end != body.buf.len() {
            return Err(ProtocolError::malformed(
                end,
                format!("{} trailing bytes after last record", body.buf.len() - end),
            ));
        }
        Ok(body)
    }

    /// Parses a body from a borrowed slice.
    pub fn parse_slice(data: &[u8]) -> Result<Self, ProtocolError> {
        Self::parse(BytesMut::from(data))
    }

    /// Resets the body to an empty header.
    ///
    /// Views previously returned from this body cannot outlive this call.
    pub fn clear(&mut self) {
        self.buf.clear();
        self.buf.put_bytes(0, BODY_HEADER_SIZE);
        self.buf[0] = BODY_HEADER_SIZE as u8;
    }

    // ------------------------------------------------------------------
    // Header accessors
    // ------------------------------------------------------------------

    fn get_u16(&self, off: usize) -> u16 {
        u16::from_be_bytes([self.buf[off], self.buf[off + 1]])
    }

    fn get_u32(&self, off: usize) -> u32 {
        u32::from_be_bytes([
            self.buf[off],
            self.buf[off + 1],
            self.buf[off + 2],
            self.buf[off + 3],
        ])
    }

    fn set_u16(&mut self, off: usize, value: u16) {
        self.buf[off..off + 2].copy_from_slice(&value.to_be_bytes());
    }

    fn set_u32(&mut self, off: usize, value: u32) {
        self.buf[off..off + 4].copy_from_slice(&value.to_be_bytes());
    }

    pub fn header_size(&self) -> u8 {
        self.buf[0]
    }

    /// The four info bytes as one word, `info1` most significant.
    pub fn flags(&self) -> u32 {
        self.get_u32(OFF_FLAGS)
    }

    pub fn set_flags(&mut self, flags: u32) {
        self.set_u32(OFF_FLAGS, flags);
    }

    /// Sets the given bits without clearing others.
    pub fn insert_flags(&mut self, bits: u32) {
        let flags = self.flags() | bits;
        self.set_flags(flags);
    }

    pub fn has_flags(&self, bits: u32) -> bool {
        self.flags() & bits == bits
    }

    pub fn result_code(&self) -> ResultCode {
        ResultCode::from(self.buf[OFF_RESULT])
    }

    pub fn set_result_code(&mut self, code: u8) {
        self.buf[OFF_RESULT] = code;
    }

    pub fn generation(&self) -> u32 {
        self.get_u32(OFF_GENERATION)
    }

    pub fn set_generation(&mut self, generation: u32) {
        self.set_u32(OFF_GENERATION, generation);
    }

    pub fn record_ttl(&self) -> u32 {
        self.get_u32(OFF_RECORD_TTL)
    }

    pub fn set_record_ttl(&mut self, ttl: u32) {
        self.set_u32(OFF_RECORD_TTL, ttl);
    }

    pub fn transaction_ttl(&self) -> u32 {
        self.get_u32(OFF_TXN_TTL)
    }

    pub fn set_transaction_ttl(&mut self, ttl: u32) {
        self.set_u32(OFF_TXN_TTL, ttl);
    }

    pub fn field_count(&self) -> u16 {
        self.get_u16(OFF_FIELD_COUNT)
    }

    pub fn op_count(&self) -> u16 {
        self.get_u16(OFF_OP_COUNT)
    }

    // ------------------------------------------------------------------
    // Appending
    // ------------------------------------------------------------------

    fn reserve(&self, extra: usize) -> Result<(), ProtocolError> {
        let needed = self.buf.len() + extra;
        if needed > self.limit {
            return Err(ProtocolError::CapacityExceeded {
                needed,
                capacity: self.limit,
            });
        }
        Ok(())
    }

    /// Appends a field record.
    ///
    /// Fails if any operation has been added, if a field of the same type is
    /// already present, or if the record does not fit.
    pub fn add_field(
        &mut self,
        field_type: FieldType,
        payload: &[u8],
    ) -> Result<Field<'_>, ProtocolError> {
        if self.op_count() > 0 {
            return Err(ProtocolError::FieldAfterOperation);
        }
        if self.find_field(field_type)?.is_some() {
            return Err(ProtocolError::DuplicateField(field_type));
        }
        let count = self.field_count();
        if count == u16::MAX {
            return Err(ProtocolError::SizeOverflow {
                size: count as u64 + 1,
                max: u16::MAX as u64,
            });
        }
        let len = wire_len(1 + payload.len())?;
        self.reserve(FIELD_HEADER_SIZE + payload.len())?;

        let offset = self.buf.len();
        self.buf.put_u32(len);
        self.buf.put_u8(field_type.code());
        self.buf.put_slice(payload);
        self.set_u16(OFF_FIELD_COUNT, count + 1);

        tracing::trace!(
            field = %field_type,
            len = payload.len(),
            offset,
            "appended field"
        );
        read_field(&self.buf, offset)
    }

    /// Appends an operation record carrying `data`.
    pub fn add_operation(
        &mut self,
        kind: OpKind,
        value_type: ParticleType,
        name: &str,
        data: &[u8],
    ) -> Result<Operation<'_>, ProtocolError> {
        self.add_operation_with_flags(kind, value_type, 0, name, data)
    }

    /// Appends an operation record with an explicit flags byte.
    pub fn add_operation_with_flags(
        &mut self,
        kind: OpKind,
        value_type: ParticleType,
        op_flags: u8,
        name: &str,
        data: &[u8],
    ) -> Result<Operation<'_>, ProtocolError> {
        let offset = self.append_op_header(kind, value_type, op_flags, name, data.len())?;
        self.buf.put_slice(data);
        read_operation(&self.buf, offset)
    }

    /// Appends an operation record with a zeroed data region of `data_len`
    /// bytes and returns that region for the caller to fill.
    pub fn reserve_operation(
        &mut self,
        kind: OpKind,
        value_type: ParticleType,
        name: &str,
        data_len: usize,
    ) -> Result<&mut [u8], ProtocolError> {
        self.append_op_header(kind, value_type, 0, name, data_len)?;
        let start = self.buf.len();
        self.buf.put_bytes(0, data_len);
        Ok(&mut self.buf[start..])
    }

    fn append_op_header(
        &mut self,
        kind: OpKind,
        value_type: ParticleType,
        op_flags: u8,
        name: &str,
        data_len: usize,
    ) -> Result<usize, ProtocolError> {
        let name = name.as_bytes();
        if name.len() > MAX_NAME_LEN {
            return Err(ProtocolError::NameTooLong(name.len()));
        }
        let count = self.op_count();
        if count == u16::MAX {
            return Err(ProtocolError::SizeOverflow {
                size: count as u64 + 1,
                max: u16::MAX as u64,
            });
        }
        let len = wire_len(4 + name.len() + data_len)?;
        self.reserve(OP_HEADER_SIZE + name.len() + data_len)?;

        let offset = self.buf.len();
        self.buf.put_u32(len);
        self.buf.put_u8(kind.code());
        self.buf.put_u8(value_type.code());
        self.buf.put_u8(op_flags);
        self.buf.put_u8(name.len() as u8);
        self.buf.put_slice(name);
        self.set_u16(OFF_OP_COUNT, count + 1);

        tracing::trace!(
            op = %kind,
            value_type = %value_type,
            data_len,
            offset,
            "appended operation"
        );
        Ok(offset)
    }

    // ------------------------------------------------------------------
    // Walking
    // ------------------------------------------------------------------

    /// Iterates over the field records in order.
    pub fn fields(&self) -> Fields<'_> {
        Fields {
            buf: &self.buf,
            offset: BODY_HEADER_SIZE,
            remaining: self.field_count(),
            failed: false,
        }
    }

    /// Iterates over the operation records in order.
    ///
    /// The start of the operation list is found by walking all fields first.
    pub fn operations(&self) -> Operations<'_> {
        match self.ops_offset() {
            Ok(offset) => Operations {
                buf: &self.buf,
                offset,
                remaining: self.op_count(),
                pending: None,
            },
            Err(e) => Operations {
                buf: &self.buf,
                offset: 0,
                remaining: 0,
                pending: Some(e),
            },
        }
    }

    /// Returns the first field of the given type.
    pub fn find_field(&self, field_type: FieldType) -> Result<Option<Field<'_>>, ProtocolError> {
        for field in self.fields() {
            let field = field?;
            if field.type_code() == field_type.code() {
                return Ok(Some(field));
            }
        }
        Ok(None)
    }

    fn ops_offset(&self) -> Result<usize, ProtocolError> {
        let mut offset = BODY_HEADER_SIZE;
        for field in self.fields() {
            offset = field?.next_offset();
        }
        Ok(offset)
    }

    /// Offset immediately after the last record.
    pub fn end_offset(&self) -> Result<usize, ProtocolError> {
        let mut offset = self.ops_offset()?;
        for op in self.operations() {
            offset = op?.next_offset();
        }
        Ok(offset)
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.field_count() == 0 && self.op_count() == 0
    }

    /// Byte limit enforced on appends.
    pub fn capacity(&self) -> usize {
        self.limit
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn freeze(self) -> Bytes {
        self.buf.freeze()
    }

    /// Wraps the body in a database message frame.
    pub fn into_frame(self) -> Frame {
        Frame::new(MessageKind::Message, self.freeze())
    }
}

impl Default for MessageBody {
    fn default() -> Self {
        Self::new()
    }
}

fn wire_len(len: usize) -> Result<u32, ProtocolError> {
    u32::try_from(len).map_err(|_| ProtocolError::SizeOverflow {
        size: len as u64,
        max: u32::MAX as u64,
    })
}

/// A field record viewed in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field<'a> {
    offset: usize,
    type_code: u8,
    data: &'a [u8],
}

impl<'a> Field<'a> {
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn type_code(&self) -> u8 {
        self.type_code
    }

    /// The field type, or `None` for codes this crate does not know.
    pub fn kind(&self) -> Option<FieldType> {
        FieldType::try_from(self.type_code).ok()
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Total bytes the record occupies, header included.
    pub fn encoded_len(&self) -> usize {
        FIELD_HEADER_SIZE + self.data.len()
    }

    pub fn next_offset(&self) -> usize {
        self.offset + self.encoded_len()
    }
}

/// An operation record viewed in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operation<'a> {
    offset: usize,
    kind_code: u8,
    value_type_code: u8,
    flags: u8,
    name: &'a [u8],
    data: &'a [u8],
}

impl<'a> Operation<'a> {
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn kind_code(&self) -> u8 {
        self.kind_code
    }

    pub fn kind(&self) -> Option<OpKind> {
        OpKind::try_from(self.kind_code).ok()
    }

    pub fn value_type_code(&self) -> u8 {
        self.value_type_code
    }

    pub fn value_type(&self) -> Option<ParticleType> {
        ParticleType::try_from(self.value_type_code).ok()
    }

    pub fn flags(&self) -> u8 {
        self.flags
    }

    pub fn name(&self) -> &'a [u8] {
        self.name
    }

    pub fn name_str(&self) -> Result<&'a str, ProtocolError> {
        std::str::from_utf8(self.name).map_err(|_| ProtocolError::InvalidUtf8)
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    pub fn encoded_len(&self) -> usize {
        OP_HEADER_SIZE + self.name.len() + self.data.len()
    }

    pub fn next_offset(&self) -> usize {
        self.offset + self.encoded_len()
    }
}

fn read_field(buf: &[u8], offset: usize) -> Result<Field<'_>, ProtocolError> {
    let mut cur = Cursor::at(buf, offset);
    let len = cur.read_u32_be()? as usize;
    if len < 1 {
        return Err(ProtocolError::malformed(offset, "field length is zero"));
    }
    let type_code = cur.read_u8()?;
    let data = cur.take(len - 1)?;
    Ok(Field {
        offset,
        type_code,
        data,
    })
}

fn read_operation(buf: &[u8], offset: usize) -> Result<Operation<'_>, ProtocolError> {
    let mut cur = Cursor::at(buf, offset);
    let len = cur.read_u32_be()? as usize;
    if len < 4 {
        return Err(ProtocolError::malformed(
            offset,
            format!("operation length {} below minimum 4", len),
        ));
    }
    let kind_code = cur.read_u8()?;
    let value_type_code = cur.read_u8()?;
    let flags = cur.read_u8()?;
    let name_len = cur.read_u8()? as usize;
    if 4 + name_len > len {
        return Err(ProtocolError::malformed(
            offset,
            format!("name length {} exceeds operation length {}", name_len, len),
        ));
    }
    let name = cur.take(name_len)?;
    let data = cur.take(len - 4 - name_len)?;
    Ok(Operation {
        offset,
        kind_code,
        value_type_code,
        flags,
        name,
        data,
    })
}

/// Iterator over field records. Stops after the first error.
pub struct Fields<'a> {
    buf: &'a [u8],
    offset: usize,
    remaining: u16,
    failed: bool,
}

impl<'a> Iterator for Fields<'a> {
    type Item = Result<Field<'a>, ProtocolError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 || self.failed {
            return None;
        }
        match read_field(self.buf, self.offset) {
            Ok(field) => {
                self.offset = field.next_offset();
                self.remaining -= 1;
                Some(Ok(field))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

/// Iterator over operation records. Stops after the first error.
pub struct Operations<'a> {
    buf: &'a [u8],
    offset: usize,
    remaining: u16,
    pending: Option<ProtocolError>,
}

impl<'a> Iterator for Operations<'a> {
    type Item = Result<Operation<'a>, ProtocolError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(e) = self.pending.take() {
            self.remaining = 0;
            return Some(Err(e));
        }
        if self.remaining == 0 {
            return None;
        }
        match read_operation(self.buf, self.offset) {
            Ok(op) => {
                self.offset = op.next_offset();
                self.remaining -= 1;
                Some(Ok(op))
            }
            Err(e) => {
                self.remaining = 0;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::flags;
    use proptest::prelude::*;

    #[test]
    fn test_new_body_header() {
        let body = MessageBody::new();
        assert_eq!(body.len(), BODY_HEADER_SIZE);
        assert_eq!(body.header_size(), 22);
        assert_eq!(body.field_count(), 0);
        assert_eq!(body.op_count(), 0);
        assert_eq!(body.end_offset().unwrap(), BODY_HEADER_SIZE);
        assert!(body.is_empty());
    }

    #[test]
    fn test_header_setters() {
        let mut body = MessageBody::new();
        body.set_flags(flags::READ | flags::GET_ALL);
        body.insert_flags(flags::LAST);
        body.set_generation(7);
        body.set_record_ttl(3600);
        body.set_transaction_ttl(1000);
        body.set_result_code(2);

        assert!(body.has_flags(flags::READ | flags::LAST));
        assert!(!body.has_flags(flags::WRITE));
        assert_eq!(body.generation(), 7);
        assert_eq!(body.record_ttl(), 3600);
        assert_eq!(body.transaction_ttl(), 1000);
        assert_eq!(body.result_code(), ResultCode::KeyNotFound);

        let bytes = body.as_bytes();
        assert_eq!(&bytes[1..5], &[0x03, 0x00, 0x01, 0x00]);
        assert_eq!(bytes[5], 2);
        assert_eq!(&bytes[6..10], &7u32.to_be_bytes());
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut body = MessageBody::new();
        body.set_generation(9);
        body.add_field(FieldType::Namespace, b"test").unwrap();
        body.add_operation(OpKind::Read, ParticleType::Null, "bin", &[])
            .unwrap();

        body.clear();
        assert_eq!(body.len(), BODY_HEADER_SIZE);
        assert_eq!(body.generation(), 0);
        assert_eq!(body.header_size(), 22);
        assert!(body.is_empty());
        body.add_field(FieldType::Namespace, b"test").unwrap();
    }

    #[test]
    fn test_field_layout() {
        let mut body = MessageBody::new();
        let field = body.add_field(FieldType::Set, b"demo").unwrap();
        assert_eq!(field.offset(), BODY_HEADER_SIZE);
        assert_eq!(field.kind(), Some(FieldType::Set));
        assert_eq!(field.data(), b"demo");

        let bytes = body.as_bytes();
        assert_eq!(&bytes[22..26], &5u32.to_be_bytes());
        assert_eq!(bytes[26], 1);
        assert_eq!(&bytes[27..31], b"demo");
        assert_eq!(body.field_count(), 1);
    }

    #[test]
    fn test_operation_layout() {
        let mut body = MessageBody::new();
        let op = body
            .add_operation(OpKind::Write, ParticleType::Integer, "age", &42i64.to_be_bytes())
            .unwrap();
        assert_eq!(op.kind(), Some(OpKind::Write));
        assert_eq!(op.value_type(), Some(ParticleType::Integer));
        assert_eq!(op.name_str().unwrap(), "age");
        assert_eq!(op.encoded_len(), 8 + 3 + 8);

        let bytes = body.as_bytes();
        // len = 4 + name(3) + data(8)
        assert_eq!(&bytes[22..26], &15u32.to_be_bytes());
        assert_eq!(&bytes[26..30], &[2, 1, 0, 3]);
        assert_eq!(&bytes[30..33], b"age");
        assert_eq!(&bytes[33..41], &42i64.to_be_bytes());
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let mut body = MessageBody::new();
        body.add_field(FieldType::Namespace, b"test").unwrap();
        let before = body.len();

        let err = body.add_field(FieldType::Namespace, b"other").unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::DuplicateField(FieldType::Namespace)
        ));
        assert_eq!(body.field_count(), 1);
        assert_eq!(body.len(), before);
    }

    #[test]
    fn test_field_after_operation_rejected() {
        let mut body = MessageBody::new();
        body.add_field(FieldType::Namespace, b"test").unwrap();
        body.add_operation(OpKind::Read, ParticleType::Null, "a", &[])
            .unwrap();

        let err = body.add_field(FieldType::Set, b"demo").unwrap_err();
        assert!(matches!(err, ProtocolError::FieldAfterOperation));
        assert_eq!(body.field_count(), 1);
    }

    #[test]
    fn test_name_too_long() {
        let mut body = MessageBody::new();
        let name = "x".repeat(256);
        let err = body
            .add_operation(OpKind::Read, ParticleType::Null, &name, &[])
            .unwrap_err();
        assert!(matches!(err, ProtocolError::NameTooLong(256)));
        assert_eq!(body.op_count(), 0);

        let name = "x".repeat(255);
        body.add_operation(OpKind::Read, ParticleType::Null, &name, &[])
            .unwrap();
    }

    #[test]
    fn test_capacity_exceeded_leaves_body_intact() {
        let mut body = MessageBody::with_capacity(40);
        body.add_field(FieldType::Namespace, b"test").unwrap();
        let snapshot = body.as_bytes().to_vec();

        let err = body
            .add_operation(OpKind::Write, ParticleType::Blob, "bin", &[0u8; 64])
            .unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::CapacityExceeded { capacity: 40, .. }
        ));
        assert_eq!(body.as_bytes(), &snapshot[..]);
        assert_eq!(body.op_count(), 0);
    }

    #[test]
    fn test_reserve_operation() {
        let mut body = MessageBody::new();
        let data = body
            .reserve_operation(OpKind::Write, ParticleType::Integer, "n", 8)
            .unwrap();
        assert_eq!(data, &[0u8; 8]);
        data.copy_from_slice(&99i64.to_be_bytes());

        let op = body.operations().next().unwrap().unwrap();
        assert_eq!(op.data(), &99i64.to_be_bytes());
        assert_eq!(body.end_offset().unwrap(), body.len());
    }

    #[test]
    fn test_find_field() {
        let mut body = MessageBody::new();
        body.add_field(FieldType::Namespace, b"test").unwrap();
        body.add_field(FieldType::Digest, &[7u8; 20]).unwrap();

        let digest = body.find_field(FieldType::Digest).unwrap().unwrap();
        assert_eq!(digest.data(), &[7u8; 20]);
        assert!(body.find_field(FieldType::Set).unwrap().is_none());
    }

    #[test]
    fn test_operations_skip_fields() {
        let mut body = MessageBody::new();
        body.add_field(FieldType::Namespace, b"test").unwrap();
        body.add_field(FieldType::Set, b"demo").unwrap();
        body.add_operation(OpKind::Read, ParticleType::Null, "a", &[])
            .unwrap();
        body.add_operation(OpKind::Write, ParticleType::String, "b", b"hello")
            .unwrap();

        let names: Vec<_> = body
            .operations()
            .map(|op| op.unwrap().name_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a", "b"]);

        // Iterators restart from the counts every time.
        assert_eq!(body.fields().count(), 2);
        assert_eq!(body.fields().count(), 2);
    }

    #[test]
    fn test_unknown_codes_kept_raw() {
        let mut raw = MessageBody::new().as_bytes().to_vec();
        raw[19] = 1; // field_count = 1
        raw.extend_from_slice(&3u32.to_be_bytes());
        raw.push(99);
        raw.extend_from_slice(b"zz");

        let body = MessageBody::parse_slice(&raw).unwrap();
        let field = body.fields().next().unwrap().unwrap();
        assert_eq!(field.type_code(), 99);
        assert_eq!(field.kind(), None);
        assert_eq!(field.data(), b"zz");
    }

    #[test]
    fn test_parse_rejects_truncated_record() {
        let mut body = MessageBody::new();
        body.add_operation(OpKind::Write, ParticleType::String, "bin", b"value")
            .unwrap();
        let bytes = body.as_bytes();
        let err = MessageBody::parse_slice(&bytes[..bytes.len() - 2]).unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedBody { offset: 33, .. }));
    }

    #[test]
    fn test_parse_rejects_trailing_bytes() {
        let mut raw = MessageBody::new().as_bytes().to_vec();
        raw.push(0);
        let err = MessageBody::parse_slice(&raw).unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedBody { offset: 22, .. }));
    }

    #[test]
    fn test_parse_rejects_short_header() {
        let err = MessageBody::parse_slice(&[22, 0, 0]).unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedBody { .. }));

        let mut raw = MessageBody::new().as_bytes().to_vec();
        raw[0] = 30;
        assert!(MessageBody::parse_slice(&raw).is_err());
    }

    #[test]
    fn test_parse_rejects_bad_name_length() {
        let mut raw = MessageBody::new().as_bytes().to_vec();
        raw[21] = 1; // op_count = 1
        raw.extend_from_slice(&4u32.to_be_bytes());
        raw.extend_from_slice(&[1, 0, 0, 5]);
        let err = MessageBody::parse_slice(&raw).unwrap_err();
        assert!(err.to_string().contains("name length"));
    }

    #[test]
    fn test_into_frame() {
        let mut body = MessageBody::new();
        body.add_field(FieldType::Namespace, b"test").unwrap();
        let len = body.len();
        let frame = body.into_frame();
        assert_eq!(frame.kind, MessageKind::Message);
        assert_eq!(frame.body.len(), len);
    }

    fn arb_op() -> impl Strategy<Value = (String, Vec<u8>)> {
        ("[a-z]{0,14}", proptest::collection::vec(any::<u8>(), 0..64))
    }

    proptest! {
        #[test]
        fn prop_roundtrip(
            ns in "[a-z]{1,12}",
            set in proptest::option::of("[a-z]{0,12}"),
            ops in proptest::collection::vec(arb_op(), 0..16),
            generation in any::<u32>(),
        ) {
            let mut body = MessageBody::new();
            body.set_generation(generation);
            body.add_field(FieldType::Namespace, ns.as_bytes()).unwrap();
            if let Some(set) = &set {
                body.add_field(FieldType::Set, set.as_bytes()).unwrap();
            }
            for (name, data) in &ops {
                body.add_operation(OpKind::Write, ParticleType::Blob, name, data).unwrap();
            }

            let decoded = MessageBody::parse_slice(body.as_bytes()).unwrap();
            prop_assert_eq!(decoded.generation(), generation);
            prop_assert_eq!(decoded.field_count(), body.field_count());
            prop_assert!(decoded.fields().map(|f| f.unwrap()).eq(body.fields().map(|f| f.unwrap())));
            let decoded_ops: Vec<_> = decoded.operations().map(|op| op.unwrap()).collect();
            prop_assert_eq!(decoded_ops.len(), ops.len());
            for (op, (name, data)) in decoded_ops.iter().zip(&ops) {
                prop_assert_eq!(op.name(), name.as_bytes());
                prop_assert_eq!(op.data(), &data[..]);
                prop_assert_eq!(op.value_type(), Some(ParticleType::Blob));
            }
        }

        #[test]
        fn prop_self_description(ops in proptest::collection::vec(arb_op(), 1..24)) {
            let mut body = MessageBody::new();
            body.add_field(FieldType::Namespace, b"test").unwrap();
            for (name, data) in &ops {
                body.add_operation(OpKind::Write, ParticleType::Blob, name, data).unwrap();
            }

            let mut offset = body.fields().next().unwrap().unwrap().next_offset();
            let mut walked = 0;
            for op in body.operations() {
                let op = op.unwrap();
                prop_assert_eq!(op.offset(), offset);
                let declared = u32::from_be_bytes(
                    body.as_bytes()[offset..offset + 4].try_into().unwrap(),
                ) as usize;
                offset += 4 + declared;
                prop_assert_eq!(op.next_offset(), offset);
                walked += 1;
            }
            prop_assert_eq!(walked, ops.len());
            prop_assert_eq!(offset, body.end_offset().unwrap());
            prop_assert_eq!(offset, body.len());
        }
    }
}
