//! # recwire-protocol
//!
//! Wire protocol implementation for recwire.
//!
//! This crate provides:
//! - 8-byte frame header encoding and incremental frame decoding
//! - Append-only message bodies with self-describing field and operation records
//! - Record key digests (RIPEMD-160)
//! - Info (control) message helpers
//! - Code tables for fields, operations, particle types and header flags

pub mod body;
pub mod codec;
pub mod cursor;
pub mod error;
pub mod frame;
pub mod info;
pub mod key;
pub mod types;

pub use body::{Field, MessageBody, Operation, BODY_HEADER_SIZE};
pub use codec::{Decoder, Encoder, Message};
pub use cursor::Cursor;
pub use error::{ProtocolError, ResultCode};
pub use frame::{decode_header, encode_header, Frame, FrameHeader, MessageKind, FRAME_HEADER_SIZE};
pub use info::{encode_info_request, info_frame, parse_info_response};
pub use key::{compute_digest, Key, KeyValue, DIGEST_SIZE};
pub use types::{flags, FieldType, OpKind, ParticleType};

/// Protocol version written in every frame header.
pub const PROTOCOL_VERSION: u8 = 2;

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;

/// Maximum body size accepted or produced (128 MiB).
pub const MAX_BODY_SIZE: u64 = 128 * 1024 * 1024;
