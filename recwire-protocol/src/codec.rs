//! Encoder and decoder for frames and messages.

use crate::body::{MessageBody, BODY_HEADER_SIZE};
use crate::error::ProtocolError;
use crate::frame::{decode_header, Frame, MessageKind, FRAME_HEADER_SIZE};
use crate::info::info_frame;
use crate::MAX_BODY_SIZE;
use bytes::{Bytes, BytesMut};

/// A decoded message.
#[derive(Debug, Clone)]
pub enum Message {
    /// Info response text.
    Info(Bytes),
    /// Database message body.
    Body(MessageBody),
    /// Compressed database message, left opaque.
    Compressed(Bytes),
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::Info(_) => MessageKind::Info,
            Message::Body(_) => MessageKind::Message,
            Message::Compressed(_) => MessageKind::Compressed,
        }
    }

    /// Decodes the payload of a complete frame.
    pub fn from_frame(frame: Frame) -> Result<Self, ProtocolError> {
        match frame.kind {
            MessageKind::Info => Ok(Message::Info(frame.body)),
            MessageKind::Message => {
                if frame.body.len() < BODY_HEADER_SIZE {
                    return Err(ProtocolError::MalformedFrame(format!(
                        "message frame carries {} bytes, shorter than the {}-byte body header",
                        frame.body.len(),
                        BODY_HEADER_SIZE
                    )));
                }
                Ok(Message::Body(MessageBody::parse(BytesMut::from(
                    frame.body.as_ref(),
                ))?))
            }
            MessageKind::Compressed => Ok(Message::Compressed(frame.body)),
        }
    }
}

/// Encodes messages into frames.
pub struct Encoder;

impl Encoder {
    /// Encodes a database message body into a frame.
    pub fn encode_message(body: &MessageBody) -> Result<BytesMut, ProtocolError> {
        let frame = Frame::new(MessageKind::Message, Bytes::copy_from_slice(body.as_bytes()));
        frame.encode()
    }

    /// Encodes info commands into a frame.
    pub fn encode_info(commands: &[&str]) -> Result<BytesMut, ProtocolError> {
        info_frame(commands).encode()
    }
}

/// Decodes frames and messages from a byte stream.
pub struct Decoder {
    buffer: BytesMut,
    max_body_size: u64,
}

impl Decoder {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(8192),
            max_body_size: MAX_BODY_SIZE,
        }
    }

    /// Rejects frames announcing a body larger than `limit` (capped at
    /// [`MAX_BODY_SIZE`]) as soon as their header arrives.
    pub fn with_max_body_size(mut self, limit: u64) -> Self {
        self.max_body_size = limit.min(MAX_BODY_SIZE);
        self
    }

    /// Appends data to the internal buffer.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Attempts to decode the next frame from the buffer.
    pub fn decode_frame(&mut self) -> Result<Option<Frame>, ProtocolError> {
        if self.buffer.len() >= FRAME_HEADER_SIZE {
            let header = decode_header(&self.buffer[..FRAME_HEADER_SIZE])?;
            if header.body_size > self.max_body_size {
                return Err(ProtocolError::FrameTooLarge {
                    size: header.body_size,
                    max: self.max_body_size,
                });
            }
        }
        Frame::decode(&mut self.buffer)
    }

    /// Attempts to decode the next message from the buffer.
    pub fn decode_message(&mut self) -> Result<Option<Message>, ProtocolError> {
        match self.decode_frame()? {
            Some(frame) => Ok(Some(Message::from_frame(frame)?)),
            None => Ok(None),
        }
    }

    /// Returns the number of bytes currently buffered.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Clears the internal buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}
