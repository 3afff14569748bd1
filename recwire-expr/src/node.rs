//! The expression tree and its builder functions.
//!
//! Every node variant has a fixed encoding role. Names (bins, variables) are
//! separate variants from literal strings, so the encoder never has to guess
//! whether a string is a name or a value.

use crate::context::Context;
use crate::opcode::{BuiltinVar, ExpOp, ExpType, MetaKind, Opcode};
use crate::value::Value;

/// A node of an expression or collection-operation tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Literal(Value),
    /// Value of a bin, read as the given type.
    Bin(String, ExpType),
    /// Particle type of a bin.
    BinType(String),
    /// Record metadata.
    Meta(MetaKind),
    /// Stored user key, read as the given type.
    Key(ExpType),
    /// Loop variable of a selection.
    Builtin(BuiltinVar),
    /// Reference to a `Let` binding.
    Var(String),
    /// Named bindings visible in the scope expression.
    Let(Vec<(String, Node)>, Box<Node>),
    /// Collection operation applied to a bin expression.
    Call {
        ret: ExpType,
        op: Box<Node>,
        bin: Box<Node>,
    },
    Op(Opcode, Vec<Node>),
    /// Navigation path; only valid as the first operand of a subcontext
    /// evaluation or selection.
    Context(Context),
}

impl Node {
    /// Whether this node is a modifying collection operation.
    pub fn is_modify(&self) -> bool {
        match self {
            Node::Op(Opcode::List(op), _) => op.is_modify(),
            Node::Op(Opcode::Map(op), _) => op.is_modify(),
            Node::Op(Opcode::ContextEval, operands) => {
                operands.get(1).map(Node::is_modify).unwrap_or(false)
            }
            Node::Op(Opcode::Select, operands) => operands.len() > 2,
            _ => false,
        }
    }
}

impl From<Value> for Node {
    fn from(v: Value) -> Self {
        Node::Literal(v)
    }
}

fn op(code: ExpOp, operands: Vec<Node>) -> Node {
    Node::Op(Opcode::Exp(code), operands)
}

// Literals.

pub fn val(v: impl Into<Value>) -> Node {
    Node::Literal(v.into())
}

pub fn int(v: i64) -> Node {
    Node::Literal(Value::Int(v))
}

pub fn float(v: f64) -> Node {
    Node::Literal(Value::Float(v))
}

pub fn string(v: impl Into<String>) -> Node {
    Node::Literal(Value::Str(v.into()))
}

pub fn blob(v: impl Into<Vec<u8>>) -> Node {
    Node::Literal(Value::Blob(v.into()))
}

pub fn bool_val(v: bool) -> Node {
    Node::Literal(Value::Bool(v))
}

pub fn nil() -> Node {
    Node::Literal(Value::Nil)
}

// Bins and record metadata.

pub fn bin(name: impl Into<String>, ty: ExpType) -> Node {
    Node::Bin(name.into(), ty)
}

pub fn bin_int(name: impl Into<String>) -> Node {
    bin(name, ExpType::Int)
}

pub fn bin_float(name: impl Into<String>) -> Node {
    bin(name, ExpType::Float)
}

pub fn bin_str(name: impl Into<String>) -> Node {
    bin(name, ExpType::String)
}

pub fn bin_bool(name: impl Into<String>) -> Node {
    bin(name, ExpType::Bool)
}

pub fn bin_blob(name: impl Into<String>) -> Node {
    bin(name, ExpType::Blob)
}

pub fn bin_list(name: impl Into<String>) -> Node {
    bin(name, ExpType::List)
}

pub fn bin_map(name: impl Into<String>) -> Node {
    bin(name, ExpType::Map)
}

pub fn bin_type(name: impl Into<String>) -> Node {
    Node::BinType(name.into())
}

pub fn key(ty: ExpType) -> Node {
    Node::Key(ty)
}

pub fn key_exists() -> Node {
    Node::Meta(MetaKind::KeyExists)
}

pub fn ttl() -> Node {
    Node::Meta(MetaKind::Ttl)
}

pub fn void_time() -> Node {
    Node::Meta(MetaKind::VoidTime)
}

pub fn last_update() -> Node {
    Node::Meta(MetaKind::LastUpdate)
}

pub fn since_update() -> Node {
    Node::Meta(MetaKind::SinceUpdate)
}

pub fn set_name() -> Node {
    Node::Meta(MetaKind::SetName)
}

pub fn is_tombstone() -> Node {
    Node::Meta(MetaKind::IsTombstone)
}

pub fn record_size() -> Node {
    Node::Meta(MetaKind::RecordSize)
}

pub fn device_size() -> Node {
    Node::Meta(MetaKind::DeviceSize)
}

pub fn memory_size() -> Node {
    Node::Meta(MetaKind::MemorySize)
}

/// Record digest modulo `modulus`.
pub fn digest_modulo(modulus: i64) -> Node {
    op(ExpOp::DigestModulo, vec![int(modulus)])
}

// Comparison.

pub fn eq(left: Node, right: Node) -> Node {
    op(ExpOp::Eq, vec![left, right])
}

pub fn ne(left: Node, right: Node) -> Node {
    op(ExpOp::Ne, vec![left, right])
}

pub fn gt(left: Node, right: Node) -> Node {
    op(ExpOp::Gt, vec![left, right])
}

pub fn ge(left: Node, right: Node) -> Node {
    op(ExpOp::Ge, vec![left, right])
}

pub fn lt(left: Node, right: Node) -> Node {
    op(ExpOp::Lt, vec![left, right])
}

pub fn le(left: Node, right: Node) -> Node {
    op(ExpOp::Le, vec![left, right])
}

/// Regular expression match of a string expression. `flags` are POSIX regcomp flags.
pub fn regex(flags: i64, pattern: impl Into<String>, target: Node) -> Node {
    op(ExpOp::Regex, vec![int(flags), string(pattern), target])
}

/// Geospatial comparison of two GeoJSON expressions.
pub fn geo_compare(left: Node, right: Node) -> Node {
    op(ExpOp::Geo, vec![left, right])
}

// Logic.

pub fn and(operands: Vec<Node>) -> Node {
    op(ExpOp::And, operands)
}

pub fn or(operands: Vec<Node>) -> Node {
    op(ExpOp::Or, operands)
}

pub fn not(operand: Node) -> Node {
    op(ExpOp::Not, vec![operand])
}

/// True when exactly one operand is true.
pub fn exclusive(operands: Vec<Node>) -> Node {
    op(ExpOp::Exclusive, operands)
}

// Arithmetic.

pub fn add(operands: Vec<Node>) -> Node {
    op(ExpOp::Add, operands)
}

pub fn sub(operands: Vec<Node>) -> Node {
    op(ExpOp::Sub, operands)
}

pub fn mul(operands: Vec<Node>) -> Node {
    op(ExpOp::Mul, operands)
}

pub fn div(operands: Vec<Node>) -> Node {
    op(ExpOp::Div, operands)
}

pub fn pow(base: Node, exponent: Node) -> Node {
    op(ExpOp::Pow, vec![base, exponent])
}

pub fn log(num: Node, base: Node) -> Node {
    op(ExpOp::Log, vec![num, base])
}

pub fn modulo(num: Node, denom: Node) -> Node {
    op(ExpOp::Mod, vec![num, denom])
}

pub fn abs(operand: Node) -> Node {
    op(ExpOp::Abs, vec![operand])
}

pub fn floor(operand: Node) -> Node {
    op(ExpOp::Floor, vec![operand])
}

pub fn ceil(operand: Node) -> Node {
    op(ExpOp::Ceil, vec![operand])
}

pub fn to_int(operand: Node) -> Node {
    op(ExpOp::ToInt, vec![operand])
}

pub fn to_float(operand: Node) -> Node {
    op(ExpOp::ToFloat, vec![operand])
}

pub fn min(operands: Vec<Node>) -> Node {
    op(ExpOp::Min, operands)
}

pub fn max(operands: Vec<Node>) -> Node {
    op(ExpOp::Max, operands)
}

// Integer bit operations.

pub fn int_and(operands: Vec<Node>) -> Node {
    op(ExpOp::IntAnd, operands)
}

pub fn int_or(operands: Vec<Node>) -> Node {
    op(ExpOp::IntOr, operands)
}

pub fn int_xor(operands: Vec<Node>) -> Node {
    op(ExpOp::IntXor, operands)
}

pub fn int_not(operand: Node) -> Node {
    op(ExpOp::IntNot, vec![operand])
}

pub fn int_lshift(value: Node, shift: Node) -> Node {
    op(ExpOp::IntLshift, vec![value, shift])
}

pub fn int_rshift(value: Node, shift: Node) -> Node {
    op(ExpOp::IntRshift, vec![value, shift])
}

pub fn int_arshift(value: Node, shift: Node) -> Node {
    op(ExpOp::IntArshift, vec![value, shift])
}

pub fn int_count(value: Node) -> Node {
    op(ExpOp::IntCount, vec![value])
}

pub fn int_lscan(value: Node, search: Node) -> Node {
    op(ExpOp::IntLscan, vec![value, search])
}

pub fn int_rscan(value: Node, search: Node) -> Node {
    op(ExpOp::IntRscan, vec![value, search])
}

// Control flow and bindings.

/// `cond(c1, a1, c2, a2, ..., default)`.
pub fn cond(operands: Vec<Node>) -> Node {
    op(ExpOp::Cond, operands)
}

pub fn def_let(bindings: Vec<(String, Node)>, scope: Node) -> Node {
    Node::Let(bindings, Box::new(scope))
}

pub fn var(name: impl Into<String>) -> Node {
    Node::Var(name.into())
}

pub fn builtin(var: BuiltinVar) -> Node {
    Node::Builtin(var)
}

/// Applies a collection operation to the collection produced by `bin`.
pub fn call(ret: ExpType, operation: Node, bin: Node) -> Node {
    Node::Call {
        ret,
        op: Box::new(operation),
        bin: Box::new(bin),
    }
}
