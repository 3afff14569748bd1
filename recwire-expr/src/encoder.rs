//! Compiles node trees into their msgpack wire form.
//!
//! There are two entry positions. Expression position (filters, expression
//! read/write operations) and collection position (list/map operation
//! payloads). Literal lists are quoted in expression position and bare as
//! collection arguments. Output is only returned once the whole tree has
//! encoded; an error never yields partial bytes.

use crate::context::{Context, CtxKind, SelectMode};
use crate::error::ExprError;
use crate::node::Node;
use crate::opcode::{call, reference, MapOrder, Opcode, CONTEXT_EVAL, SELECT};
use crate::packer::Packer;
use crate::value::Value;
use bytes::Bytes;
use recwire_protocol::ParticleType;
use tracing::trace;

/// Flags of an expression read operation.
pub mod exp_read_flags {
    pub const DEFAULT: u32 = 0;
    /// Evaluate to nil instead of failing.
    pub const EVAL_NO_FAIL: u32 = 16;
}

/// Flags of an expression write operation.
pub mod exp_write_flags {
    pub const DEFAULT: u32 = 0;
    pub const CREATE_ONLY: u32 = 1;
    pub const UPDATE_ONLY: u32 = 2;
    pub const ALLOW_DELETE: u32 = 4;
    pub const POLICY_NO_FAIL: u32 = 8;
    pub const EVAL_NO_FAIL: u32 = 16;
}

/// Encodes a tree in expression position.
pub fn encode_expression(node: &Node) -> Result<Bytes, ExprError> {
    let mut encoder = ExprEncoder::new();
    encoder.expression(node)?;
    let bytes = encoder.packer.into_bytes();
    trace!(len = bytes.len(), "encoded expression");
    Ok(bytes)
}

/// Encodes a collection operation (list, map, subcontext evaluation or selection).
pub fn encode_cdt(node: &Node) -> Result<Bytes, ExprError> {
    let mut encoder = ExprEncoder::new();
    encoder.collection(node)?;
    let bytes = encoder.packer.into_bytes();
    trace!(len = bytes.len(), "encoded collection operation");
    Ok(bytes)
}

/// Encodes a standalone value with collection argument rules, e.g. the
/// payload of a list or map bin.
pub fn encode_value(value: &Value) -> Result<Bytes, ExprError> {
    let mut encoder = ExprEncoder::new();
    encoder.value(value)?;
    Ok(encoder.packer.into_bytes())
}

/// Operation data of an expression read: `[expr, flags]`.
pub fn exp_read_payload(expr: &Node, flags: u32) -> Result<Bytes, ExprError> {
    wrap_with_flags(expr, flags)
}

/// Operation data of an expression write: `[expr, flags]`.
pub fn exp_write_payload(expr: &Node, flags: u32) -> Result<Bytes, ExprError> {
    wrap_with_flags(expr, flags)
}

fn wrap_with_flags(expr: &Node, flags: u32) -> Result<Bytes, ExprError> {
    let mut encoder = ExprEncoder::new();
    encoder.packer.pack_array_header(2)?;
    encoder.expression(expr)?;
    encoder.packer.pack_uint(flags as u64);
    Ok(encoder.packer.into_bytes())
}

struct ExprEncoder {
    packer: Packer,
}

impl ExprEncoder {
    fn new() -> Self {
        Self {
            packer: Packer::with_capacity(64),
        }
    }

    fn code(&mut self, code: u8) {
        self.packer.pack_uint(code as u64);
    }

    fn expression(&mut self, node: &Node) -> Result<(), ExprError> {
        match node {
            Node::Literal(value) => self.literal(value),
            Node::Bin(name, ty) => {
                self.packer.pack_array_header(3)?;
                self.code(reference::BIN);
                self.code(ty.code());
                self.packer.pack_str(name)
            }
            Node::BinType(name) => {
                self.packer.pack_array_header(2)?;
                self.code(reference::BIN_TYPE);
                self.packer.pack_str(name)
            }
            Node::Meta(kind) => {
                self.packer.pack_array_header(1)?;
                self.code(kind.code());
                Ok(())
            }
            Node::Key(ty) => {
                self.packer.pack_array_header(2)?;
                self.code(reference::KEY);
                self.code(ty.code());
                Ok(())
            }
            Node::Builtin(var) => {
                self.packer.pack_array_header(2)?;
                self.code(reference::VAR_BUILTIN);
                self.code(var.code());
                Ok(())
            }
            Node::Var(name) => {
                self.packer.pack_array_header(2)?;
                self.code(reference::VAR);
                self.packer.pack_str(name)
            }
            Node::Let(bindings, scope) => {
                if bindings.is_empty() {
                    return Err(ExprError::InvalidArity {
                        op: "let".into(),
                        expected: "at least 1 binding".into(),
                        got: 0,
                    });
                }
                self.packer.pack_array_header(2 + bindings.len() * 2)?;
                self.code(reference::LET);
                for (name, value) in bindings {
                    self.packer.pack_str(name)?;
                    self.expression(value)?;
                }
                self.expression(scope)
            }
            Node::Call { ret, op, bin } => {
                let flags = if op.is_modify() {
                    call::MODULE_CDT | call::MODIFY
                } else {
                    call::MODULE_CDT
                };
                self.packer.pack_array_header(5)?;
                self.code(reference::CALL);
                self.code(ret.code());
                self.code(flags);
                self.collection(op)?;
                self.expression(bin)
            }
            Node::Op(Opcode::Exp(op), operands) => {
                let arity = op.arity();
                if !arity.accepts(operands.len()) {
                    return Err(ExprError::InvalidArity {
                        op: op.name().into(),
                        expected: arity.to_string(),
                        got: operands.len(),
                    });
                }
                self.packer.pack_array_header(1 + operands.len())?;
                self.code(op.code());
                for operand in operands {
                    self.expression(operand)?;
                }
                Ok(())
            }
            Node::Op(opcode, _) => Err(ExprError::UnsupportedNode(format!(
                "{} outside a call",
                opcode
            ))),
            Node::Context(_) => Err(ExprError::UnsupportedNode(
                "context outside a subcontext evaluation or selection".into(),
            )),
        }
    }

    fn literal(&mut self, value: &Value) -> Result<(), ExprError> {
        match value {
            Value::List(_) => {
                self.packer.pack_array_header(2)?;
                self.code(reference::QUOTE);
                self.value(value)
            }
            Value::Infinity | Value::Wildcard => Err(ExprError::UnsupportedNode(format!(
                "{} is only valid as a range argument",
                value
            ))),
            _ => self.value(value),
        }
    }

    fn value(&mut self, value: &Value) -> Result<(), ExprError> {
        match value {
            Value::Nil => self.packer.pack_nil(),
            Value::Bool(b) => self.packer.pack_bool(*b),
            Value::Int(v) => self.packer.pack_int(*v),
            Value::Uint(v) => self.packer.pack_uint(*v),
            Value::Float(v) => self.packer.pack_float(*v),
            Value::Str(s) => self.packer.pack_typed(ParticleType::String, s.as_bytes())?,
            Value::Blob(b) => self.packer.pack_typed(ParticleType::Blob, b)?,
            Value::List(items) => {
                self.packer.pack_array_header(items.len())?;
                for item in items {
                    self.value(item)?;
                }
            }
            Value::Map(pairs, order) => {
                if *order == MapOrder::Unordered {
                    self.packer.pack_map_header(pairs.len())?;
                } else {
                    self.packer.pack_map_header(pairs.len() + 1)?;
                    self.packer.pack_ext_header(0, order.flag())?;
                    self.packer.pack_nil();
                }
                for (k, v) in pairs {
                    self.value(k)?;
                    self.value(v)?;
                }
            }
            Value::Infinity => self.packer.pack_infinity(),
            Value::Wildcard => self.packer.pack_wildcard(),
        }
        Ok(())
    }

    /// Collection operation arguments: literals use value rules, anything
    /// else is an expression evaluated by the server.
    fn argument(&mut self, node: &Node) -> Result<(), ExprError> {
        match node {
            Node::Literal(value) => self.value(value),
            Node::Context(_) => Err(ExprError::UnsupportedNode(
                "context as a collection argument".into(),
            )),
            other => self.expression(other),
        }
    }

    fn collection(&mut self, node: &Node) -> Result<(), ExprError> {
        match node {
            Node::Op(opcode @ (Opcode::List(_) | Opcode::Map(_)), args) => {
                self.packer.pack_array_header(1 + args.len())?;
                self.code(opcode.code());
                for arg in args {
                    self.argument(arg)?;
                }
                Ok(())
            }
            Node::Op(Opcode::ContextEval, operands) => {
                let (ctx, inner) = match operands.as_slice() {
                    [Node::Context(ctx), inner] => (ctx, inner),
                    [_, _] => {
                        return Err(ExprError::InvalidContext(
                            "subcontext evaluation needs a context first".into(),
                        ))
                    }
                    _ => {
                        return Err(ExprError::InvalidArity {
                            op: "context_eval".into(),
                            expected: "2".into(),
                            got: operands.len(),
                        })
                    }
                };
                self.packer.pack_array_header(3)?;
                self.code(CONTEXT_EVAL);
                self.context(ctx)?;
                self.collection(inner)
            }
            Node::Op(Opcode::Select, operands) => self.select(operands),
            other => Err(ExprError::UnsupportedNode(format!(
                "not a collection operation: {:?}",
                other
            ))),
        }
    }

    fn select(&mut self, operands: &[Node]) -> Result<(), ExprError> {
        let (ctx, flags, apply) = match operands {
            [Node::Context(ctx), Node::Literal(Value::Int(flags))] => (ctx, *flags, None),
            [Node::Context(ctx), Node::Literal(Value::Int(flags)), expr] => {
                (ctx, *flags, Some(expr))
            }
            [Node::Context(_), ..] if (2..=3).contains(&operands.len()) => {
                return Err(ExprError::UnsupportedNode(
                    "selection flags must be an integer literal".into(),
                ))
            }
            [first, ..] if !matches!(first, Node::Context(_)) => {
                return Err(ExprError::InvalidContext(
                    "selection needs a context first".into(),
                ))
            }
            _ => {
                return Err(ExprError::InvalidArity {
                    op: "select".into(),
                    expected: "2 or 3".into(),
                    got: operands.len(),
                })
            }
        };

        let applies = flags & 0x0f == SelectMode::Apply as i64;
        if applies != apply.is_some() {
            return Err(ExprError::InvalidArity {
                op: "select".into(),
                expected: if applies { "3" } else { "2" }.into(),
                got: operands.len(),
            });
        }

        self.packer.pack_array_header(operands.len() + 1)?;
        self.code(SELECT);
        self.context(ctx)?;
        self.packer.pack_int(flags);
        if let Some(expr) = apply {
            self.expression(expr)?;
        }
        Ok(())
    }

    fn context(&mut self, ctx: &Context) -> Result<(), ExprError> {
        if ctx.is_empty() {
            return Err(ExprError::InvalidContext("empty context".into()));
        }
        self.packer.pack_array_header(ctx.len() * 2)?;
        for step in ctx.steps() {
            if step.create != 0 && !step.kind.accepts_create() {
                return Err(ExprError::InvalidContext(format!(
                    "create flags on a {:?} step",
                    step.kind
                )));
            }
            self.code(step.type_code());
            match (step.kind, &step.operand) {
                (CtxKind::Exp, filter) => self.expression(filter)?,
                (
                    CtxKind::ListIndex | CtxKind::ListRank | CtxKind::MapIndex | CtxKind::MapRank,
                    Node::Literal(Value::Int(v)),
                ) => self.packer.pack_int(*v),
                (
                    CtxKind::ListValue | CtxKind::MapKey | CtxKind::MapValue,
                    Node::Literal(value),
                ) => self.value(value)?,
                (kind, operand) => {
                    return Err(ExprError::InvalidContext(format!(
                        "bad operand for a {:?} step: {:?}",
                        kind, operand
                    )))
                }
            }
        }
        Ok(())
    }
}
