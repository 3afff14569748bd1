//! Opcode and type-code tables for expressions and collection operations.

use std::fmt;

/// Result type of an expression, as declared to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ExpType {
    Nil = 0,
    Bool = 1,
    Int = 2,
    String = 3,
    List = 4,
    Map = 5,
    Blob = 6,
    Float = 7,
    Geo = 8,
    Hll = 9,
}

impl ExpType {
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Expression opcodes: comparison, logical, arithmetic, bitwise, conversion,
/// min/max and control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExpOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Regex,
    Geo,
    And,
    Or,
    Not,
    Exclusive,
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Log,
    Mod,
    Abs,
    Floor,
    Ceil,
    ToInt,
    ToFloat,
    IntAnd,
    IntOr,
    IntXor,
    IntNot,
    IntLshift,
    IntRshift,
    IntArshift,
    IntCount,
    IntLscan,
    IntRscan,
    Min,
    Max,
    DigestModulo,
    Cond,
}

/// How many operands an opcode takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
    /// An odd count of at least the given size (condition/action pairs plus a default).
    Odd(usize),
}

impl Arity {
    pub fn accepts(self, n: usize) -> bool {
        match self {
            Arity::Exact(k) => n == k,
            Arity::AtLeast(k) => n >= k,
            Arity::Odd(k) => n >= k && n % 2 == 1,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(k) => write!(f, "{}", k),
            Arity::AtLeast(k) => write!(f, "at least {}", k),
            Arity::Odd(k) => write!(f, "an odd count of at least {}", k),
        }
    }
}

impl ExpOp {
    pub fn code(self) -> u8 {
        match self {
            ExpOp::Eq => 1,
            ExpOp::Ne => 2,
            ExpOp::Gt => 3,
            ExpOp::Ge => 4,
            ExpOp::Lt => 5,
            ExpOp::Le => 6,
            ExpOp::Regex => 7,
            ExpOp::Geo => 8,
            ExpOp::And => 16,
            ExpOp::Or => 17,
            ExpOp::Not => 18,
            ExpOp::Exclusive => 19,
            ExpOp::Add => 20,
            ExpOp::Sub => 21,
            ExpOp::Mul => 22,
            ExpOp::Div => 23,
            ExpOp::Pow => 24,
            ExpOp::Log => 25,
            ExpOp::Mod => 26,
            ExpOp::Abs => 27,
            ExpOp::Floor => 28,
            ExpOp::Ceil => 29,
            ExpOp::ToInt => 30,
            ExpOp::ToFloat => 31,
            ExpOp::IntAnd => 32,
            ExpOp::IntOr => 33,
            ExpOp::IntXor => 34,
            ExpOp::IntNot => 35,
            ExpOp::IntLshift => 36,
            ExpOp::IntRshift => 37,
            ExpOp::IntArshift => 38,
            ExpOp::IntCount => 39,
            ExpOp::IntLscan => 40,
            ExpOp::IntRscan => 41,
            ExpOp::Min => 50,
            ExpOp::Max => 51,
            ExpOp::DigestModulo => 64,
            ExpOp::Cond => 123,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ExpOp::Eq => "eq",
            ExpOp::Ne => "ne",
            ExpOp::Gt => "gt",
            ExpOp::Ge => "ge",
            ExpOp::Lt => "lt",
            ExpOp::Le => "le",
            ExpOp::Regex => "regex",
            ExpOp::Geo => "geo",
            ExpOp::And => "and",
            ExpOp::Or => "or",
            ExpOp::Not => "not",
            ExpOp::Exclusive => "exclusive",
            ExpOp::Add => "add",
            ExpOp::Sub => "sub",
            ExpOp::Mul => "mul",
            ExpOp::Div => "div",
            ExpOp::Pow => "pow",
            ExpOp::Log => "log",
            ExpOp::Mod => "mod",
            ExpOp::Abs => "abs",
            ExpOp::Floor => "floor",
            ExpOp::Ceil => "ceil",
            ExpOp::ToInt => "to_int",
            ExpOp::ToFloat => "to_float",
            ExpOp::IntAnd => "int_and",
            ExpOp::IntOr => "int_or",
            ExpOp::IntXor => "int_xor",
            ExpOp::IntNot => "int_not",
            ExpOp::IntLshift => "int_lshift",
            ExpOp::IntRshift => "int_rshift",
            ExpOp::IntArshift => "int_arshift",
            ExpOp::IntCount => "int_count",
            ExpOp::IntLscan => "int_lscan",
            ExpOp::IntRscan => "int_rscan",
            ExpOp::Min => "min",
            ExpOp::Max => "max",
            ExpOp::DigestModulo => "digest_modulo",
            ExpOp::Cond => "cond",
        }
    }

    pub fn arity(self) -> Arity {
        match self {
            ExpOp::Eq
            | ExpOp::Ne
            | ExpOp::Gt
            | ExpOp::Ge
            | ExpOp::Lt
            | ExpOp::Le
            | ExpOp::Geo
            | ExpOp::Pow
            | ExpOp::Log
            | ExpOp::Mod
            | ExpOp::IntLshift
            | ExpOp::IntRshift
            | ExpOp::IntArshift
            | ExpOp::IntLscan
            | ExpOp::IntRscan => Arity::Exact(2),
            ExpOp::Regex => Arity::Exact(3),
            ExpOp::Not
            | ExpOp::Abs
            | ExpOp::Floor
            | ExpOp::Ceil
            | ExpOp::ToInt
            | ExpOp::ToFloat
            | ExpOp::IntNot
            | ExpOp::IntCount
            | ExpOp::DigestModulo => Arity::Exact(1),
            ExpOp::Sub | ExpOp::Div => Arity::AtLeast(1),
            ExpOp::And
            | ExpOp::Or
            | ExpOp::Exclusive
            | ExpOp::Add
            | ExpOp::Mul
            | ExpOp::IntAnd
            | ExpOp::IntOr
            | ExpOp::IntXor
            | ExpOp::Min
            | ExpOp::Max => Arity::AtLeast(2),
            ExpOp::Cond => Arity::Odd(3),
        }
    }
}

/// Record metadata accessors. Each encodes as a one-element array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MetaKind {
    DeviceSize = 65,
    LastUpdate = 66,
    SinceUpdate = 67,
    VoidTime = 68,
    Ttl = 69,
    SetName = 70,
    KeyExists = 71,
    IsTombstone = 72,
    MemorySize = 73,
    RecordSize = 74,
}

impl MetaKind {
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Codes for reference and binding nodes.
pub mod reference {
    pub const KEY: u8 = 80;
    pub const BIN: u8 = 81;
    pub const BIN_TYPE: u8 = 82;
    pub const VAR_BUILTIN: u8 = 122;
    pub const VAR: u8 = 124;
    pub const LET: u8 = 125;
    pub const QUOTE: u8 = 126;
    pub const CALL: u8 = 127;
}

/// Module flags of a call node.
pub mod call {
    pub const MODULE_CDT: u8 = 0;
    pub const MODIFY: u8 = 0x40;
}

/// Loop variables available while a selection filter runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BuiltinVar {
    /// Map key of the element under test.
    Key = 0,
    /// Value of the element under test.
    Value = 1,
    /// Index of the element under test.
    Index = 2,
}

impl BuiltinVar {
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// List operation codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ListOp {
    SetType = 0,
    Append = 1,
    AppendItems = 2,
    Insert = 3,
    InsertItems = 4,
    Pop = 5,
    PopRange = 6,
    Remove = 7,
    RemoveRange = 8,
    Set = 9,
    Trim = 10,
    Clear = 11,
    Increment = 12,
    Sort = 13,
    Size = 16,
    Get = 17,
    GetRange = 18,
    GetByIndex = 19,
    GetByRank = 21,
    GetAllByValue = 22,
    GetByValueList = 23,
    GetByIndexRange = 24,
    GetByValueInterval = 25,
    GetByRankRange = 26,
    GetByValueRelRankRange = 27,
    RemoveByIndex = 32,
    RemoveByRank = 34,
    RemoveAllByValue = 35,
    RemoveByValueList = 36,
    RemoveByIndexRange = 37,
    RemoveByValueInterval = 38,
    RemoveByRankRange = 39,
    RemoveByValueRelRankRange = 40,
}

impl ListOp {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn is_modify(self) -> bool {
        let code = self.code();
        code < 16 || code >= 32
    }
}

/// Map operation codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MapOp {
    SetType = 64,
    Add = 65,
    AddItems = 66,
    Put = 67,
    PutItems = 68,
    Replace = 69,
    ReplaceItems = 70,
    Increment = 73,
    Decrement = 74,
    Clear = 75,
    RemoveByKey = 76,
    RemoveByIndex = 77,
    RemoveByRank = 79,
    RemoveByKeyList = 81,
    RemoveAllByValue = 82,
    RemoveByValueList = 83,
    RemoveByKeyInterval = 84,
    RemoveByIndexRange = 85,
    RemoveByValueInterval = 86,
    RemoveByRankRange = 87,
    RemoveByKeyRelIndexRange = 88,
    RemoveByValueRelRankRange = 89,
    Size = 96,
    GetByKey = 97,
    GetByIndex = 98,
    GetByRank = 100,
    GetAllByValue = 102,
    GetByKeyInterval = 103,
    GetByIndexRange = 104,
    GetByValueInterval = 105,
    GetByRankRange = 106,
    GetByKeyList = 107,
    GetByValueList = 108,
    GetByKeyRelIndexRange = 109,
    GetByValueRelRankRange = 110,
}

impl MapOp {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn is_modify(self) -> bool {
        self.code() < 96
    }
}

/// Wire code of a subcontext evaluation.
pub const CONTEXT_EVAL: u8 = 0xff;

/// Wire code of a selection.
pub const SELECT: u8 = 0xfe;

/// Operator at the head of a compound node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Exp(ExpOp),
    List(ListOp),
    Map(MapOp),
    /// Navigate a context, then apply an inner collection operation.
    ContextEval,
    /// Filter-based extraction or transformation across container elements.
    Select,
}

impl Opcode {
    pub fn code(self) -> u8 {
        match self {
            Opcode::Exp(op) => op.code(),
            Opcode::List(op) => op.code(),
            Opcode::Map(op) => op.code(),
            Opcode::ContextEval => CONTEXT_EVAL,
            Opcode::Select => SELECT,
        }
    }

    /// Whether the operation belongs to the collection family (list, map,
    /// subcontext evaluation or selection).
    pub fn is_collection(self) -> bool {
        !matches!(self, Opcode::Exp(_))
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Opcode::Exp(op) => f.write_str(op.name()),
            Opcode::List(op) => write!(f, "list:{:?}", op),
            Opcode::Map(op) => write!(f, "map:{:?}", op),
            Opcode::ContextEval => f.write_str("context_eval"),
            Opcode::Select => f.write_str("select"),
        }
    }
}

/// Which part of matched collection elements an operation returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReturnType(u32);

impl ReturnType {
    pub const NONE: ReturnType = ReturnType(0);
    pub const INDEX: ReturnType = ReturnType(1);
    pub const REVERSE_INDEX: ReturnType = ReturnType(2);
    pub const RANK: ReturnType = ReturnType(3);
    pub const REVERSE_RANK: ReturnType = ReturnType(4);
    pub const COUNT: ReturnType = ReturnType(5);
    pub const KEY: ReturnType = ReturnType(6);
    pub const VALUE: ReturnType = ReturnType(7);
    pub const KEY_VALUE: ReturnType = ReturnType(8);
    pub const EXISTS: ReturnType = ReturnType(13);

    const INVERTED: u32 = 0x10000;

    /// Selects the elements that did *not* match.
    pub fn inverted(self) -> ReturnType {
        ReturnType(self.0 | Self::INVERTED)
    }

    pub fn bits(self) -> u32 {
        self.0
    }
}

/// Ordering of a list value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ListOrder {
    #[default]
    Unordered,
    Ordered,
}

impl ListOrder {
    pub fn flag(self) -> u8 {
        match self {
            ListOrder::Unordered => 0,
            ListOrder::Ordered => 1,
        }
    }
}

/// Ordering of a map value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MapOrder {
    #[default]
    Unordered,
    KeyOrdered,
    KeyValueOrdered,
}

impl MapOrder {
    pub fn flag(self) -> u8 {
        match self {
            MapOrder::Unordered => 0,
            MapOrder::KeyOrdered => 1,
            MapOrder::KeyValueOrdered => 3,
        }
    }

    pub fn from_flag(flag: u8) -> Self {
        match flag {
            1 => MapOrder::KeyOrdered,
            3 => MapOrder::KeyValueOrdered,
            _ => MapOrder::Unordered,
        }
    }
}

/// List write flags.
pub mod list_write {
    pub const DEFAULT: u8 = 0;
    pub const ADD_UNIQUE: u8 = 1;
    pub const INSERT_BOUNDED: u8 = 2;
    pub const NO_FAIL: u8 = 4;
    pub const PARTIAL: u8 = 8;
}

/// Map write flags.
pub mod map_write {
    pub const DEFAULT: u8 = 0;
    pub const CREATE_ONLY: u8 = 1;
    pub const UPDATE_ONLY: u8 = 2;
    pub const NO_FAIL: u8 = 4;
    pub const PARTIAL: u8 = 8;
}
