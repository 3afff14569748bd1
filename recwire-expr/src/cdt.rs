//! Builders for list and map (collection) operations.
//!
//! Each builder returns `Node::Op` with the collection opcode and its
//! arguments in wire order. Selector operations carry the return type first:
//! `[op, return_type, selector...]`.

use crate::node::Node;
use crate::opcode::{list_write, map_write, ListOp, ListOrder, MapOp, MapOrder, Opcode, ReturnType};
use crate::value::Value;

macro_rules! node_from_value {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Node {
                fn from(v: $t) -> Self {
                    Node::Literal(Value::from(v))
                }
            }
        )*
    };
}

node_from_value!(bool, i32, i64, u32, u64, f64, &str, String, Vec<u8>);

/// Write policy for list operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ListPolicy {
    pub order: ListOrder,
    pub flags: u8,
}

impl ListPolicy {
    pub fn new(order: ListOrder, flags: u8) -> Self {
        Self { order, flags }
    }

    pub fn is_default(&self) -> bool {
        self.order == ListOrder::Unordered && self.flags == list_write::DEFAULT
    }
}

/// Write policy for map operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MapPolicy {
    pub order: MapOrder,
    pub flags: u8,
}

impl MapPolicy {
    pub fn new(order: MapOrder, flags: u8) -> Self {
        Self { order, flags }
    }

    pub fn is_default(&self) -> bool {
        self.order == MapOrder::Unordered && self.flags == map_write::DEFAULT
    }
}

fn list(op: ListOp, args: Vec<Node>) -> Node {
    Node::Op(Opcode::List(op), args)
}

fn map(op: MapOp, args: Vec<Node>) -> Node {
    Node::Op(Opcode::Map(op), args)
}

fn int(v: i64) -> Node {
    Node::Literal(Value::Int(v))
}

fn rt(return_type: ReturnType) -> Node {
    Node::Literal(Value::Int(return_type.bits() as i64))
}

fn items(values: Vec<Value>) -> Node {
    Node::Literal(Value::List(values))
}

// List modify operations.

pub fn list_set_order(order: ListOrder) -> Node {
    list(ListOp::SetType, vec![int(order.flag() as i64)])
}

pub fn list_append(value: impl Into<Node>) -> Node {
    list(ListOp::Append, vec![value.into()])
}

pub fn list_append_with_policy(value: impl Into<Node>, policy: ListPolicy) -> Node {
    if policy.is_default() {
        return list_append(value);
    }
    list(
        ListOp::Append,
        vec![
            value.into(),
            int(policy.order.flag() as i64),
            int(policy.flags as i64),
        ],
    )
}

pub fn list_append_items(values: Vec<Value>) -> Node {
    list(ListOp::AppendItems, vec![items(values)])
}

pub fn list_insert(index: i64, value: impl Into<Node>) -> Node {
    list(ListOp::Insert, vec![int(index), value.into()])
}

pub fn list_insert_items(index: i64, values: Vec<Value>) -> Node {
    list(ListOp::InsertItems, vec![int(index), items(values)])
}

pub fn list_pop(index: i64) -> Node {
    list(ListOp::Pop, vec![int(index)])
}

pub fn list_pop_range(index: i64, count: i64) -> Node {
    list(ListOp::PopRange, vec![int(index), int(count)])
}

pub fn list_remove(index: i64) -> Node {
    list(ListOp::Remove, vec![int(index)])
}

pub fn list_remove_range(index: i64, count: i64) -> Node {
    list(ListOp::RemoveRange, vec![int(index), int(count)])
}

pub fn list_set(index: i64, value: impl Into<Node>) -> Node {
    list(ListOp::Set, vec![int(index), value.into()])
}

pub fn list_trim(index: i64, count: i64) -> Node {
    list(ListOp::Trim, vec![int(index), int(count)])
}

pub fn list_clear() -> Node {
    list(ListOp::Clear, vec![])
}

pub fn list_increment(index: i64, delta: impl Into<Node>) -> Node {
    list(ListOp::Increment, vec![int(index), delta.into()])
}

/// Sorts the list. Flag 2 drops duplicates.
pub fn list_sort(flags: u8) -> Node {
    list(ListOp::Sort, vec![int(flags as i64)])
}

// List read operations.

pub fn list_size() -> Node {
    list(ListOp::Size, vec![])
}

pub fn list_get(index: i64) -> Node {
    list(ListOp::Get, vec![int(index)])
}

pub fn list_get_range(index: i64, count: i64) -> Node {
    list(ListOp::GetRange, vec![int(index), int(count)])
}

pub fn list_get_by_index(index: i64, return_type: ReturnType) -> Node {
    list(ListOp::GetByIndex, vec![rt(return_type), int(index)])
}

pub fn list_get_by_rank(rank: i64, return_type: ReturnType) -> Node {
    list(ListOp::GetByRank, vec![rt(return_type), int(rank)])
}

pub fn list_get_by_value(value: impl Into<Node>, return_type: ReturnType) -> Node {
    list(ListOp::GetAllByValue, vec![rt(return_type), value.into()])
}

pub fn list_get_by_value_list(values: Vec<Value>, return_type: ReturnType) -> Node {
    list(ListOp::GetByValueList, vec![rt(return_type), items(values)])
}

pub fn list_get_by_index_range(index: i64, count: i64, return_type: ReturnType) -> Node {
    list(
        ListOp::GetByIndexRange,
        vec![rt(return_type), int(index), int(count)],
    )
}

/// Values in `[begin, end)`. Use `Value::Infinity` as an open upper bound.
pub fn list_get_by_value_range(
    begin: impl Into<Node>,
    end: impl Into<Node>,
    return_type: ReturnType,
) -> Node {
    list(
        ListOp::GetByValueInterval,
        vec![rt(return_type), begin.into(), end.into()],
    )
}

pub fn list_get_by_rank_range(rank: i64, count: i64, return_type: ReturnType) -> Node {
    list(
        ListOp::GetByRankRange,
        vec![rt(return_type), int(rank), int(count)],
    )
}

pub fn list_get_by_value_rel_rank_range(
    value: impl Into<Node>,
    rank: i64,
    count: i64,
    return_type: ReturnType,
) -> Node {
    list(
        ListOp::GetByValueRelRankRange,
        vec![rt(return_type), value.into(), int(rank), int(count)],
    )
}

// List remove operations.

pub fn list_remove_by_index(index: i64, return_type: ReturnType) -> Node {
    list(ListOp::RemoveByIndex, vec![rt(return_type), int(index)])
}

pub fn list_remove_by_rank(rank: i64, return_type: ReturnType) -> Node {
    list(ListOp::RemoveByRank, vec![rt(return_type), int(rank)])
}

pub fn list_remove_by_value(value: impl Into<Node>, return_type: ReturnType) -> Node {
    list(ListOp::RemoveAllByValue, vec![rt(return_type), value.into()])
}

pub fn list_remove_by_value_list(values: Vec<Value>, return_type: ReturnType) -> Node {
    list(ListOp::RemoveByValueList, vec![rt(return_type), items(values)])
}

pub fn list_remove_by_index_range(index: i64, count: i64, return_type: ReturnType) -> Node {
    list(
        ListOp::RemoveByIndexRange,
        vec![rt(return_type), int(index), int(count)],
    )
}

pub fn list_remove_by_value_range(
    begin: impl Into<Node>,
    end: impl Into<Node>,
    return_type: ReturnType,
) -> Node {
    list(
        ListOp::RemoveByValueInterval,
        vec![rt(return_type), begin.into(), end.into()],
    )
}

pub fn list_remove_by_rank_range(rank: i64, count: i64, return_type: ReturnType) -> Node {
    list(
        ListOp::RemoveByRankRange,
        vec![rt(return_type), int(rank), int(count)],
    )
}

// Map modify operations.

pub fn map_set_order(order: MapOrder) -> Node {
    map(MapOp::SetType, vec![int(order.flag() as i64)])
}

pub fn map_put(key: impl Into<Node>, value: impl Into<Node>) -> Node {
    map(MapOp::Put, vec![key.into(), value.into()])
}

pub fn map_put_with_policy(key: impl Into<Node>, value: impl Into<Node>, policy: MapPolicy) -> Node {
    if policy.is_default() {
        return map_put(key, value);
    }
    map(
        MapOp::Put,
        vec![
            key.into(),
            value.into(),
            int(policy.order.flag() as i64),
            int(policy.flags as i64),
        ],
    )
}

/// Puts every entry of `entries`, which must be a `Value::Map`.
pub fn map_put_items(entries: Value) -> Node {
    map(MapOp::PutItems, vec![Node::Literal(entries)])
}

/// Inserts only when the key is absent.
pub fn map_add(key: impl Into<Node>, value: impl Into<Node>) -> Node {
    map(MapOp::Add, vec![key.into(), value.into()])
}

/// Updates only when the key is present.
pub fn map_replace(key: impl Into<Node>, value: impl Into<Node>) -> Node {
    map(MapOp::Replace, vec![key.into(), value.into()])
}

pub fn map_increment(key: impl Into<Node>, delta: impl Into<Node>) -> Node {
    map(MapOp::Increment, vec![key.into(), delta.into()])
}

pub fn map_decrement(key: impl Into<Node>, delta: impl Into<Node>) -> Node {
    map(MapOp::Decrement, vec![key.into(), delta.into()])
}

pub fn map_clear() -> Node {
    map(MapOp::Clear, vec![])
}

// Map remove operations.

pub fn map_remove_by_key(key: impl Into<Node>, return_type: ReturnType) -> Node {
    map(MapOp::RemoveByKey, vec![rt(return_type), key.into()])
}

pub fn map_remove_by_index(index: i64, return_type: ReturnType) -> Node {
    map(MapOp::RemoveByIndex, vec![rt(return_type), int(index)])
}

pub fn map_remove_by_rank(rank: i64, return_type: ReturnType) -> Node {
    map(MapOp::RemoveByRank, vec![rt(return_type), int(rank)])
}

pub fn map_remove_by_key_list(keys: Vec<Value>, return_type: ReturnType) -> Node {
    map(MapOp::RemoveByKeyList, vec![rt(return_type), items(keys)])
}

pub fn map_remove_by_value(value: impl Into<Node>, return_type: ReturnType) -> Node {
    map(MapOp::RemoveAllByValue, vec![rt(return_type), value.into()])
}

pub fn map_remove_by_key_range(
    begin: impl Into<Node>,
    end: impl Into<Node>,
    return_type: ReturnType,
) -> Node {
    map(
        MapOp::RemoveByKeyInterval,
        vec![rt(return_type), begin.into(), end.into()],
    )
}

pub fn map_remove_by_index_range(index: i64, count: i64, return_type: ReturnType) -> Node {
    map(
        MapOp::RemoveByIndexRange,
        vec![rt(return_type), int(index), int(count)],
    )
}

// Map read operations.

pub fn map_size() -> Node {
    map(MapOp::Size, vec![])
}

pub fn map_get_by_key(key: impl Into<Node>, return_type: ReturnType) -> Node {
    map(MapOp::GetByKey, vec![rt(return_type), key.into()])
}

pub fn map_get_by_index(index: i64, return_type: ReturnType) -> Node {
    map(MapOp::GetByIndex, vec![rt(return_type), int(index)])
}

pub fn map_get_by_rank(rank: i64, return_type: ReturnType) -> Node {
    map(MapOp::GetByRank, vec![rt(return_type), int(rank)])
}

pub fn map_get_by_value(value: impl Into<Node>, return_type: ReturnType) -> Node {
    map(MapOp::GetAllByValue, vec![rt(return_type), value.into()])
}

pub fn map_get_by_key_range(
    begin: impl Into<Node>,
    end: impl Into<Node>,
    return_type: ReturnType,
) -> Node {
    map(
        MapOp::GetByKeyInterval,
        vec![rt(return_type), begin.into(), end.into()],
    )
}

pub fn map_get_by_index_range(index: i64, count: i64, return_type: ReturnType) -> Node {
    map(
        MapOp::GetByIndexRange,
        vec![rt(return_type), int(index), int(count)],
    )
}

pub fn map_get_by_value_range(
    begin: impl Into<Node>,
    end: impl Into<Node>,
    return_type: ReturnType,
) -> Node {
    map(
        MapOp::GetByValueInterval,
        vec![rt(return_type), begin.into(), end.into()],
    )
}

pub fn map_get_by_rank_range(rank: i64, count: i64, return_type: ReturnType) -> Node {
    map(
        MapOp::GetByRankRange,
        vec![rt(return_type), int(rank), int(count)],
    )
}

pub fn map_get_by_key_list(keys: Vec<Value>, return_type: ReturnType) -> Node {
    map(MapOp::GetByKeyList, vec![rt(return_type), items(keys)])
}

pub fn map_get_by_value_list(values: Vec<Value>, return_type: ReturnType) -> Node {
    map(MapOp::GetByValueList, vec![rt(return_type), items(values)])
}

pub fn map_get_by_key_rel_index_range(
    key: impl Into<Node>,
    index: i64,
    count: i64,
    return_type: ReturnType,
) -> Node {
    map(
        MapOp::GetByKeyRelIndexRange,
        vec![rt(return_type), key.into(), int(index), int(count)],
    )
}

pub fn map_get_by_value_rel_rank_range(
    value: impl Into<Node>,
    rank: i64,
    count: i64,
    return_type: ReturnType,
) -> Node {
    map(
        MapOp::GetByValueRelRankRange,
        vec![rt(return_type), value.into(), int(rank), int(count)],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn operands(node: &Node) -> &[Node] {
        match node {
            Node::Op(_, operands) => operands,
            other => panic!("not an op: {:?}", other),
        }
    }

    #[test]
    fn test_selector_argument_order() {
        let node = map_get_by_index(3, ReturnType::VALUE);
        assert!(matches!(node, Node::Op(Opcode::Map(MapOp::GetByIndex), _)));
        assert_eq!(
            operands(&node),
            &[Node::Literal(Value::Int(7)), Node::Literal(Value::Int(3))]
        );
    }

    #[test]
    fn test_default_policy_omitted() {
        assert_eq!(
            list_append_with_policy(1, ListPolicy::default()),
            list_append(1)
        );
        let node = list_append_with_policy(
            1,
            ListPolicy::new(ListOrder::Ordered, list_write::ADD_UNIQUE),
        );
        assert_eq!(operands(&node).len(), 3);

        let node = map_put_with_policy(
            "k",
            2,
            MapPolicy::new(MapOrder::KeyOrdered, map_write::CREATE_ONLY),
        );
        assert_eq!(
            &operands(&node)[2..],
            &[Node::Literal(Value::Int(1)), Node::Literal(Value::Int(1))]
        );
    }

    #[test]
    fn test_literal_conversions() {
        assert_eq!(Node::from("x"), Node::Literal(Value::Str("x".into())));
        assert_eq!(Node::from(2.5), Node::Literal(Value::Float(2.5)));
        assert_eq!(
            operands(&list_append(42))[0],
            Node::Literal(Value::Int(42))
        );
    }
}
