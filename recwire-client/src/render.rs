//! JSON rendering of message bodies for diagnostics.

use crate::particle::decode_particle;
use recwire_expr::Value;
use recwire_protocol::{flags, FieldType, MessageBody, OpKind, ParticleType};
use serde_json::{json, Map, Value as Json};

/// Converts a value to JSON. Blobs become hex strings, maps become arrays of
/// `[key, value]` pairs since keys need not be strings.
pub fn value_to_json(value: &Value) -> Json {
    match value {
        Value::Nil => Json::Null,
        Value::Bool(b) => json!(b),
        Value::Int(v) => json!(v),
        Value::Uint(v) => json!(v),
        Value::Float(v) => json!(v),
        Value::Str(s) => json!(s),
        Value::Blob(b) => json!(hex::encode(b)),
        Value::List(items) => Json::Array(items.iter().map(value_to_json).collect()),
        Value::Map(pairs, _) => Json::Array(
            pairs
                .iter()
                .map(|(k, v)| json!([value_to_json(k), value_to_json(v)]))
                .collect(),
        ),
        Value::Infinity | Value::Wildcard => json!(value.to_string()),
    }
}

fn field_data_to_json(kind: Option<FieldType>, data: &[u8]) -> Json {
    let textual = matches!(
        kind,
        Some(
            FieldType::Namespace
                | FieldType::Set
                | FieldType::IndexName
                | FieldType::UdfFilename
                | FieldType::UdfFunction
        )
    );
    match std::str::from_utf8(data) {
        Ok(text) if textual => json!(text),
        _ => json!(hex::encode(data)),
    }
}

fn type_name<T: std::fmt::Display>(kind: Option<T>, code: u8) -> Json {
    match kind {
        Some(kind) => json!(kind.to_string()),
        None => json!(format!("UNKNOWN({})", code)),
    }
}

/// Renders the header, fields and operations of a body as a JSON tree.
///
/// Decoding problems are reported inline under an `error` key rather than
/// aborting the render.
pub fn body_to_json(body: &MessageBody) -> Json {
    let mut root = Map::new();
    root.insert(
        "header".into(),
        json!({
            "flags": flags::names(body.flags()),
            "result_code": body.result_code().to_string(),
            "generation": body.generation(),
            "record_ttl": body.record_ttl(),
            "transaction_ttl": body.transaction_ttl(),
            "field_count": body.field_count(),
            "op_count": body.op_count(),
        }),
    );

    let mut fields = Vec::new();
    for field in body.fields() {
        match field {
            Ok(field) => fields.push(json!({
                "type": type_name(field.kind(), field.type_code()),
                "len": field.data().len(),
                "data": field_data_to_json(field.kind(), field.data()),
            })),
            Err(e) => {
                fields.push(json!({ "error": e.to_string() }));
                break;
            }
        }
    }
    root.insert("fields".into(), Json::Array(fields));

    let mut operations = Vec::new();
    for op in body.operations() {
        match op {
            Ok(op) => {
                let value = match op.kind() {
                    Some(OpKind::CdtRead | OpKind::CdtModify | OpKind::ExpRead | OpKind::ExpModify)
                        if op.value_type() == Some(ParticleType::Blob) =>
                    {
                        json!(hex::encode(op.data()))
                    }
                    _ => match decode_particle(op.value_type_code(), op.data()) {
                        Ok(value) => value_to_json(&value),
                        Err(e) => json!({ "error": e.to_string() }),
                    },
                };
                operations.push(json!({
                    "kind": type_name(op.kind(), op.kind_code()),
                    "value_type": type_name(op.value_type(), op.value_type_code()),
                    "flags": op.flags(),
                    "name": String::from_utf8_lossy(op.name()),
                    "value": value,
                }));
            }
            Err(e) => {
                operations.push(json!({ "error": e.to_string() }));
                break;
            }
        }
    }
    root.insert("operations".into(), Json::Array(operations));

    Json::Object(root)
}
