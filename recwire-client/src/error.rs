//! Client error types.

use crate::config::ConfigError;
use recwire_expr::ExprError;
use recwire_protocol::{ProtocolError, ResultCode};
use thiserror::Error;

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("expression error: {0}")]
    Expr(#[from] ExprError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("connection closed")]
    ConnectionClosed,

    #[error("request timeout")]
    Timeout,

    #[error("server error: {code}")]
    Server { code: ResultCode },

    #[error("unexpected {0} message")]
    UnexpectedMessage(&'static str),

    #[error("invalid {particle} particle: {reason}")]
    InvalidParticle {
        particle: &'static str,
        reason: String,
    },

    #[error("cannot store {0} in a bin")]
    UnsupportedValue(String),
}

impl ClientError {
    /// Returns whether the connection that produced this error is no longer
    /// in a known state and must be dropped.
    pub fn breaks_connection(&self) -> bool {
        !matches!(
            self,
            ClientError::Server { .. }
                | ClientError::InvalidParticle { .. }
                | ClientError::UnsupportedValue(_)
                | ClientError::Expr(_)
                | ClientError::Config(_)
        )
    }
}
