//! # recwire-client
//!
//! Client library for recwire.
//!
//! This crate provides:
//! - Single-record request building on top of the message body codec
//! - Bin particle encoding and response record decoding
//! - Async TCP connections with timeouts and a high-level client
//! - JSON rendering of message bodies for diagnostics

pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod particle;
pub mod record;
pub mod render;
pub mod request;

pub use client::Client;
pub use config::{ClientConfig, ConfigError};
pub use connection::Connection;
pub use error::ClientError;
pub use particle::{decode_particle, encode_particle};
pub use record::Record;
pub use render::{body_to_json, value_to_json};
pub use request::RecordRequest;
