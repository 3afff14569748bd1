//! # recwire-expr
//!
//! Server-side expressions and collection (list/map) operations for recwire.
//!
//! Trees are built from [`Node`] values with the builder functions in
//! [`node`], [`cdt`] and [`context`], then compiled to msgpack with
//! [`encode_expression`] (filters and expression operations) or
//! [`encode_cdt`] (collection operation payloads).
//!
//! ```
//! use recwire_expr::{cdt, context::Context, encode_cdt, subcontext_eval};
//!
//! let op = subcontext_eval(Context::new().map_key("data"), cdt::list_append(42));
//! let bytes = encode_cdt(&op).unwrap();
//! assert_eq!(bytes[0], 0x93);
//! ```

pub mod cdt;
pub mod context;
pub mod encoder;
pub mod error;
pub mod node;
pub mod opcode;
pub mod packer;
pub mod unpacker;
pub mod value;

pub use context::{select, select_apply, subcontext_eval, Context, CtxKind, SelectMode, Step};
pub use encoder::{
    encode_cdt, encode_expression, encode_value, exp_read_payload, exp_write_payload,
};
pub use error::ExprError;
pub use node::Node;
pub use opcode::{BuiltinVar, ExpOp, ExpType, ListOp, MapOp, MapOrder, MetaKind, Opcode, ReturnType};
pub use packer::Packer;
pub use unpacker::{unpack, unpack_all, Unpacker};
pub use value::Value;
