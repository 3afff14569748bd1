//! Protocol error types and server result codes.

use crate::types::FieldType;
use std::fmt;
use thiserror::Error;

/// Protocol-level errors that can occur while framing, building or walking a message.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("size {size} does not fit the wire length field (max {max})")]
    SizeOverflow { size: u64, max: u64 },

    #[error("capacity exceeded: need {needed} bytes, limit is {capacity}")]
    CapacityExceeded { needed: usize, capacity: usize },

    #[error("duplicate field: {0}")]
    DuplicateField(FieldType),

    #[error("fields cannot be added after an operation")]
    FieldAfterOperation,

    #[error("operation name too long: {0} bytes (max 255)")]
    NameTooLong(usize),

    #[error("short read: need {needed} more bytes")]
    ShortRead { needed: usize },

    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    #[error("malformed body at offset {offset}: {reason}")]
    MalformedBody { offset: usize, reason: String },

    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(u8),

    #[error("unknown message kind: {0}")]
    UnknownMessageKind(u8),

    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: u64, max: u64 },

    #[error("invalid digest input: {0}")]
    DigestInputInvalid(&'static str),

    #[error("invalid UTF-8 in payload")]
    InvalidUtf8,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProtocolError {
    pub(crate) fn malformed(offset: usize, reason: impl Into<String>) -> Self {
        ProtocolError::MalformedBody {
            offset,
            reason: reason.into(),
        }
    }
}

/// Result codes returned by the server in the body header.
///
/// Unknown values are preserved in [`ResultCode::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultCode {
    Ok,
    ServerError,
    KeyNotFound,
    GenerationError,
    ParameterError,
    KeyExists,
    BinExists,
    ClusterKeyMismatch,
    ServerMemError,
    Timeout,
    AlwaysForbidden,
    PartitionUnavailable,
    BinTypeError,
    RecordTooBig,
    KeyBusy,
    ScanAbort,
    UnsupportedFeature,
    BinNotFound,
    DeviceOverload,
    KeyMismatch,
    InvalidNamespace,
    BinNameTooLong,
    FailForbidden,
    ElementNotFound,
    ElementExists,
    EnterpriseOnly,
    OpNotApplicable,
    FilteredOut,
    LostConflict,
    Other(u8),
}

impl ResultCode {
    pub fn code(&self) -> u8 {
        match self {
            ResultCode::Ok => 0,
            ResultCode::ServerError => 1,
            ResultCode::KeyNotFound => 2,
            ResultCode::GenerationError => 3,
            ResultCode::ParameterError => 4,
            ResultCode::KeyExists => 5,
            ResultCode::BinExists => 6,
            ResultCode::ClusterKeyMismatch => 7,
            ResultCode::ServerMemError => 8,
            ResultCode::Timeout => 9,
            ResultCode::AlwaysForbidden => 10,
            ResultCode::PartitionUnavailable => 11,
            ResultCode::BinTypeError => 12,
            ResultCode::RecordTooBig => 13,
            ResultCode::KeyBusy => 14,
            ResultCode::ScanAbort => 15,
            ResultCode::UnsupportedFeature => 16,
            ResultCode::BinNotFound => 17,
            ResultCode::DeviceOverload => 18,
            ResultCode::KeyMismatch => 19,
            ResultCode::InvalidNamespace => 20,
            ResultCode::BinNameTooLong => 21,
            ResultCode::FailForbidden => 22,
            ResultCode::ElementNotFound => 23,
            ResultCode::ElementExists => 24,
            ResultCode::EnterpriseOnly => 25,
            ResultCode::OpNotApplicable => 26,
            ResultCode::FilteredOut => 27,
            ResultCode::LostConflict => 28,
            ResultCode::Other(code) => *code,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, ResultCode::Ok)
    }
}

impl From<u8> for ResultCode {
    fn from(code: u8) -> Self {
        match code {
            0 => ResultCode::Ok,
            1 => ResultCode::ServerError,
            2 => ResultCode::KeyNotFound,
            3 => ResultCode::GenerationError,
            4 => ResultCode::ParameterError,
            5 => ResultCode::KeyExists,
            6 => ResultCode::BinExists,
            7 => ResultCode::ClusterKeyMismatch,
            8 => ResultCode::ServerMemError,
            9 => ResultCode::Timeout,
            10 => ResultCode::AlwaysForbidden,
            11 => ResultCode::PartitionUnavailable,
            12 => ResultCode::BinTypeError,
            13 => ResultCode::RecordTooBig,
            14 => ResultCode::KeyBusy,
            15 => ResultCode::ScanAbort,
            16 => ResultCode::UnsupportedFeature,
            17 => ResultCode::BinNotFound,
            18 => ResultCode::DeviceOverload,
            19 => ResultCode::KeyMismatch,
            20 => ResultCode::InvalidNamespace,
            21 => ResultCode::BinNameTooLong,
            22 => ResultCode::FailForbidden,
            23 => ResultCode::ElementNotFound,
            24 => ResultCode::ElementExists,
            25 => ResultCode::EnterpriseOnly,
            26 => ResultCode::OpNotApplicable,
            27 => ResultCode::FilteredOut,
            28 => ResultCode::LostConflict,
            other => ResultCode::Other(other),
        }
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultCode::Ok => write!(f, "OK"),
            ResultCode::ServerError => write!(f, "SERVER_ERROR"),
            ResultCode::KeyNotFound => write!(f, "KEY_NOT_FOUND"),
            ResultCode::GenerationError => write!(f, "GENERATION_ERROR"),
            ResultCode::ParameterError => write!(f, "PARAMETER_ERROR"),
            ResultCode::KeyExists => write!(f, "KEY_EXISTS"),
            ResultCode::BinExists => write!(f, "BIN_EXISTS"),
            ResultCode::ClusterKeyMismatch => write!(f, "CLUSTER_KEY_MISMATCH"),
            ResultCode::ServerMemError => write!(f, "SERVER_MEM_ERROR"),
            ResultCode::Timeout => write!(f, "TIMEOUT"),
            ResultCode::AlwaysForbidden => write!(f, "ALWAYS_FORBIDDEN"),
            ResultCode::PartitionUnavailable => write!(f, "PARTITION_UNAVAILABLE"),
            ResultCode::BinTypeError => write!(f, "BIN_TYPE_ERROR"),
            ResultCode::RecordTooBig => write!(f, "RECORD_TOO_BIG"),
            ResultCode::KeyBusy => write!(f, "KEY_BUSY"),
            ResultCode::ScanAbort => write!(f, "SCAN_ABORT"),
            ResultCode::UnsupportedFeature => write!(f, "UNSUPPORTED_FEATURE"),
            ResultCode::BinNotFound => write!(f, "BIN_NOT_FOUND"),
            ResultCode::DeviceOverload => write!(f, "DEVICE_OVERLOAD"),
            ResultCode::KeyMismatch => write!(f, "KEY_MISMATCH"),
            ResultCode::InvalidNamespace => write!(f, "INVALID_NAMESPACE"),
            ResultCode::BinNameTooLong => write!(f, "BIN_NAME_TOO_LONG"),
            ResultCode::FailForbidden => write!(f, "FAIL_FORBIDDEN"),
            ResultCode::ElementNotFound => write!(f, "ELEMENT_NOT_FOUND"),
            ResultCode::ElementExists => write!(f, "ELEMENT_EXISTS"),
            ResultCode::EnterpriseOnly => write!(f, "ENTERPRISE_ONLY"),
            ResultCode::OpNotApplicable => write!(f, "OP_NOT_APPLICABLE"),
            ResultCode::FilteredOut => write!(f, "FILTERED_OUT"),
            ResultCode::LostConflict => write!(f, "LOST_CONFLICT"),
            ResultCode::Other(code) => write!(f, "UNKNOWN({})", code),
        }
    }
}
