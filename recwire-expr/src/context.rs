//! Navigation contexts into nested lists and maps, and the operations that
//! use them: subcontext evaluation and selection.
//!
//! A context is encoded as one flat array of `[type, operand, type, operand, ...]`.
//! Create flags are OR'd into the type of index and key steps so that missing
//! intermediate containers are created on write.

use crate::node::Node;
use crate::opcode::{ListOrder, MapOrder, Opcode};
use crate::value::Value;

/// The kind of a navigation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CtxKind {
    /// Filter step: keep the elements for which an expression holds.
    Exp = 0x04,
    ListIndex = 0x10,
    ListRank = 0x11,
    ListValue = 0x13,
    MapIndex = 0x20,
    MapRank = 0x21,
    MapKey = 0x22,
    MapValue = 0x23,
}

impl CtxKind {
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Whether create flags may be attached to this step.
    pub fn accepts_create(self) -> bool {
        matches!(self, CtxKind::ListIndex | CtxKind::MapKey)
    }
}

/// Create flags OR'd into a step type.
pub mod create {
    pub const LIST_UNORDERED: u8 = 0x40;
    pub const LIST_UNORDERED_PAD: u8 = 0x80;
    pub const LIST_ORDERED: u8 = 0xc0;
    pub const MAP_UNORDERED: u8 = 0x40;
    pub const MAP_KEY_ORDERED: u8 = 0x80;
    pub const MAP_KEY_VALUE_ORDERED: u8 = 0xc0;
}

/// One navigation step.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub kind: CtxKind,
    /// Create flags, zero when none.
    pub create: u8,
    /// Literal operand for index/rank/key/value steps, an expression for filter steps.
    pub operand: Node,
}

impl Step {
    pub fn new(kind: CtxKind, operand: Node) -> Self {
        Self {
            kind,
            create: 0,
            operand,
        }
    }

    /// The type code written on the wire.
    pub fn type_code(&self) -> u8 {
        self.kind.code() | self.create
    }
}

/// An ordered path of navigation steps.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Context {
    steps: Vec<Step>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn push(&mut self, step: Step) {
        self.steps.push(step);
    }

    fn step(mut self, kind: CtxKind, operand: Node) -> Self {
        self.steps.push(Step::new(kind, operand));
        self
    }

    pub fn list_index(self, index: i64) -> Self {
        self.step(CtxKind::ListIndex, Node::Literal(Value::Int(index)))
    }

    /// Index step that creates the list (and pads up to `index`) when missing.
    pub fn list_index_create(mut self, index: i64, order: ListOrder, pad: bool) -> Self {
        let flags = match (order, pad) {
            (ListOrder::Ordered, _) => create::LIST_ORDERED,
            (ListOrder::Unordered, true) => create::LIST_UNORDERED_PAD,
            (ListOrder::Unordered, false) => create::LIST_UNORDERED,
        };
        self.steps.push(Step {
            kind: CtxKind::ListIndex,
            create: flags,
            operand: Node::Literal(Value::Int(index)),
        });
        self
    }

    pub fn list_rank(self, rank: i64) -> Self {
        self.step(CtxKind::ListRank, Node::Literal(Value::Int(rank)))
    }

    pub fn list_value(self, value: impl Into<Value>) -> Self {
        self.step(CtxKind::ListValue, Node::Literal(value.into()))
    }

    pub fn map_index(self, index: i64) -> Self {
        self.step(CtxKind::MapIndex, Node::Literal(Value::Int(index)))
    }

    pub fn map_rank(self, rank: i64) -> Self {
        self.step(CtxKind::MapRank, Node::Literal(Value::Int(rank)))
    }

    pub fn map_key(self, key: impl Into<Value>) -> Self {
        self.step(CtxKind::MapKey, Node::Literal(key.into()))
    }

    /// Key step that creates the map when missing.
    pub fn map_key_create(mut self, key: impl Into<Value>, order: MapOrder) -> Self {
        let flags = match order {
            MapOrder::Unordered => create::MAP_UNORDERED,
            MapOrder::KeyOrdered => create::MAP_KEY_ORDERED,
            MapOrder::KeyValueOrdered => create::MAP_KEY_VALUE_ORDERED,
        };
        self.steps.push(Step {
            kind: CtxKind::MapKey,
            create: flags,
            operand: Node::Literal(key.into()),
        });
        self
    }

    pub fn map_value(self, value: impl Into<Value>) -> Self {
        self.step(CtxKind::MapValue, Node::Literal(value.into()))
    }

    /// Filter step: descend into every element for which `filter` is true.
    pub fn exp(self, filter: Node) -> Self {
        self.step(CtxKind::Exp, filter)
    }

    /// Appends all steps of another context.
    pub fn join(mut self, other: Context) -> Self {
        self.steps.extend(other.steps);
        self
    }
}

/// Selection behavior, written as the low bits of the select flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SelectMode {
    /// The containers along the path, pruned to matching elements.
    MatchingTree = 0,
    /// Leaf values.
    Values = 1,
    /// Keys of matching map entries.
    MapKeys = 2,
    /// Key/value pairs of matching map entries.
    MapKeyValues = 3,
    /// Rewrite matching elements with an expression.
    Apply = 4,
}

/// Do not fail when the path does not resolve.
pub const SELECT_NO_FAIL: u8 = 0x10;

/// Navigates `ctx`, then applies `inner` (a collection operation, selection
/// or nested subcontext evaluation) at the resolved position.
pub fn subcontext_eval(ctx: Context, inner: Node) -> Node {
    Node::Op(Opcode::ContextEval, vec![Node::Context(ctx), inner])
}

/// Extracts elements reached through `ctx`.
///
/// To select inside a list, put the list steps and the filter step in one
/// context: `select(Context::new().list_index(0).exp(filter), mode)`. That
/// is the form the server accepts. Wrapping the selection in
/// [`subcontext_eval`] over a list context encodes, but the server rejects
/// it.
pub fn select(ctx: Context, mode: SelectMode) -> Node {
    select_with_flags(ctx, mode as u8)
}

/// Like [`select`] but with raw flags, e.g. `SelectMode::Values as u8 | SELECT_NO_FAIL`.
pub fn select_with_flags(ctx: Context, flags: u8) -> Node {
    Node::Op(
        Opcode::Select,
        vec![Node::Context(ctx), Node::Literal(Value::Int(flags as i64))],
    )
}

/// Rewrites every element reached through `ctx` with `modify`, which may
/// reference the element through built-in variables.
pub fn select_apply(ctx: Context, modify: Node) -> Node {
    Node::Op(
        Opcode::Select,
        vec![
            Node::Context(ctx),
            Node::Literal(Value::Int(SelectMode::Apply as i64)),
            modify,
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let ctx = Context::new().map_key("data").list_index(0).map_rank(-1);
        assert_eq!(ctx.len(), 3);
        assert_eq!(ctx.steps()[0].kind, CtxKind::MapKey);
        assert_eq!(ctx.steps()[1].type_code(), 0x10);
        assert_eq!(ctx.steps()[2].operand, Node::Literal(Value::Int(-1)));
    }

    #[test]
    fn test_create_flags() {
        let ctx = Context::new()
            .map_key_create("a", MapOrder::KeyOrdered)
            .list_index_create(3, ListOrder::Unordered, true);
        assert_eq!(ctx.steps()[0].type_code(), 0x22 | 0x80);
        assert_eq!(ctx.steps()[1].type_code(), 0x10 | 0x80);
        assert!(CtxKind::ListIndex.accepts_create());
        assert!(!CtxKind::MapValue.accepts_create());
    }

    #[test]
    fn test_join() {
        let ctx = Context::new().map_key("a").join(Context::new().list_index(1));
        assert_eq!(ctx.len(), 2);
    }

    #[test]
    fn test_select_shapes() {
        let node = select(Context::new().list_index(0), SelectMode::Values);
        match node {
            Node::Op(Opcode::Select, operands) => {
                assert_eq!(operands.len(), 2);
                assert_eq!(operands[1], Node::Literal(Value::Int(1)));
            }
            other => panic!("unexpected node: {:?}", other),
        }

        let node = select_apply(Context::new().list_index(0), Node::Literal(Value::Int(0)));
        assert!(matches!(node, Node::Op(Opcode::Select, ref ops) if ops.len() == 3));
    }
}
