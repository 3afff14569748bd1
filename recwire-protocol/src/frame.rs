//! Binary frame format.
//!
//! Frame layout (8 bytes header + body):
//!
//! ```text
//! +---------+--------+----------+-----------+
//! | version | kind   | reserved | body_size |
//! | 1 byte  | 1 byte | 2 bytes  | 4 bytes   |
//! +---------+--------+----------+-----------+
//! | body                                    |
//! | body_size bytes                         |
//! +-----------------------------------------+
//! ```
//!
//! The reserved bytes are the high half of a 48-bit size and are always
//! written as zero. The size is derived from the body on every encode.

use crate::error::ProtocolError;
use crate::{MAX_BODY_SIZE, PROTOCOL_VERSION};
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Size of the frame header in bytes.
pub const FRAME_HEADER_SIZE: usize = 8;

/// Kind of message carried by a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageKind {
    /// Control message: newline separated command text.
    Info = 1,
    /// Database message: body header, fields and operations.
    Message = 3,
    /// Compressed database message. The body is kept opaque.
    Compressed = 4,
}

impl MessageKind {
    pub fn name(&self) -> &'static str {
        match self {
            MessageKind::Info => "INFO",
            MessageKind::Message => "MESSAGE",
            MessageKind::Compressed => "COMPRESSED",
        }
    }
}

impl TryFrom<u8> for MessageKind {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(MessageKind::Info),
            3 => Ok(MessageKind::Message),
            4 => Ok(MessageKind::Compressed),
            other => Err(ProtocolError::UnknownMessageKind(other)),
        }
    }
}

/// A decoded frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub version: u8,
    pub kind: MessageKind,
    pub body_size: u64,
}

/// Encodes a frame header for a body of `body_size` bytes.
pub fn encode_header(kind: MessageKind, body_size: u64) -> Result<[u8; FRAME_HEADER_SIZE], ProtocolError> {
    let size = u32::try_from(body_size).map_err(|_| ProtocolError::SizeOverflow {
        size: body_size,
        max: u32::MAX as u64,
    })?;
    let mut header = [0u8; FRAME_HEADER_SIZE];
    header[0] = PROTOCOL_VERSION;
    header[1] = kind as u8;
    header[4..8].copy_from_slice(&size.to_be_bytes());
    Ok(header)
}

/// Decodes a frame header from the first 8 bytes of `buf`.
pub fn decode_header(buf: &[u8]) -> Result<FrameHeader, ProtocolError> {
    if buf.len() < FRAME_HEADER_SIZE {
        return Err(ProtocolError::ShortRead {
            needed: FRAME_HEADER_SIZE - buf.len(),
        });
    }

    let version = buf[0];
    if version != PROTOCOL_VERSION {
        return Err(ProtocolError::UnsupportedVersion(version));
    }
    let kind = MessageKind::try_from(buf[1])?;

    let mut size = [0u8; 8];
    size[2..8].copy_from_slice(&buf[2..8]);
    let body_size = u64::from_be_bytes(size);
    if body_size > MAX_BODY_SIZE {
        return Err(ProtocolError::FrameTooLarge {
            size: body_size,
            max: MAX_BODY_SIZE,
        });
    }

    Ok(FrameHeader {
        version,
        kind,
        body_size,
    })
}

/// A complete protocol message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub kind: MessageKind,
    pub body: Bytes,
}

impl Frame {
    pub fn new(kind: MessageKind, body: Bytes) -> Self {
        Self { kind, body }
    }

    /// Header describing this frame's current body.
    pub fn header(&self) -> Result<FrameHeader, ProtocolError> {
        let body_size = self.body.len() as u64;
        encode_header(self.kind, body_size)?;
        Ok(FrameHeader {
            version: PROTOCOL_VERSION,
            kind: self.kind,
            body_size,
        })
    }

    /// Encodes the frame into bytes.
    pub fn encode(&self) -> Result<BytesMut, ProtocolError> {
        let body_size = self.body.len() as u64;
        if body_size > MAX_BODY_SIZE {
            return Err(ProtocolError::FrameTooLarge {
                size: body_size,
                max: MAX_BODY_SIZE,
            });
        }

        let header = encode_header(self.kind, body_size)?;
        let mut buf = BytesMut::with_capacity(FRAME_HEADER_SIZE + self.body.len());
        buf.put_slice(&header);
        buf.put_slice(&self.body);
        Ok(buf)
    }

    /// Decodes a frame from bytes.
    ///
    /// Returns `Ok(Some(frame))` if a complete frame was decoded,
    /// `Ok(None)` if more data is needed, or `Err` on protocol errors.
    pub fn decode(buf: &mut BytesMut) -> Result<Option<Self>, ProtocolError> {
        if buf.len() < FRAME_HEADER_SIZE {
            return Ok(None);
        }

        // Peek at header without consuming
        let header = decode_header(&buf[..FRAME_HEADER_SIZE])?;
        let body_len = header.body_size as usize;
        if buf.len() < FRAME_HEADER_SIZE + body_len {
            return Ok(None);
        }

        buf.advance(FRAME_HEADER_SIZE);
        let body = buf.split_to(body_len).freeze();

        Ok(Some(Self {
            kind: header.kind,
            body,
        }))
    }
}
