//! recwire - client-side codec for a binary record-store wire protocol
//!
//! Re-exports the workspace crates:
//! - [`protocol`]: frames, message bodies, record key digests, info messages
//! - [`expr`]: expression and collection operation trees and their encoding
//! - [`client`]: request building, response records, async connections

pub use recwire_client as client;
pub use recwire_expr as expr;
pub use recwire_protocol as protocol;

pub use recwire_client::{Client, ClientConfig, ClientError, Record, RecordRequest};
pub use recwire_expr::{Context, ExprError, Node, Value};
pub use recwire_protocol::{Key, MessageBody, ProtocolError};
