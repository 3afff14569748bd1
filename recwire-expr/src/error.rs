//! Expression encoding and decoding errors.

use thiserror::Error;

/// Errors raised while encoding an expression tree or decoding packed values.
#[derive(Debug, Error, PartialEq)]
pub enum ExprError {
    #[error("unsupported node: {0}")]
    UnsupportedNode(String),

    #[error("{op} takes {expected} operands, got {got}")]
    InvalidArity {
        op: String,
        expected: String,
        got: usize,
    },

    #[error("invalid context: {0}")]
    InvalidContext(String),

    #[error("length {0} exceeds the 32-bit limit")]
    SizeOverflow(usize),

    #[error("truncated input at offset {offset}")]
    Truncated { offset: usize },

    #[error("unknown marker 0x{marker:02x} at offset {offset}")]
    UnknownMarker { marker: u8, offset: usize },

    #[error("invalid UTF-8 string at offset {offset}")]
    InvalidUtf8 { offset: usize },

    #[error("{remaining} trailing bytes at offset {offset}")]
    TrailingBytes { offset: usize, remaining: usize },

    #[error("nesting deeper than {0} levels")]
    TooDeep(usize),

    #[error("name {0:?} starts with a particle type byte")]
    AmbiguousName(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = ExprError::InvalidArity {
            op: "gt".into(),
            expected: "2".into(),
            got: 3,
        };
        assert_eq!(err.to_string(), "gt takes 2 operands, got 3");

        let err = ExprError::UnknownMarker {
            marker: 0xc1,
            offset: 4,
        };
        assert_eq!(err.to_string(), "unknown marker 0xc1 at offset 4");
    }
}
