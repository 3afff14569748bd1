//! Single-record request builder.
//!
//! A request becomes one message body: namespace, set, optional user key,
//! digest and filter fields, followed by one operation record per bin
//! operation. Header flags are derived from the operations.

use crate::error::ClientError;
use crate::particle::encode_particle;
use recwire_expr::{encode_cdt, encode_expression, exp_read_payload, exp_write_payload, Node, Value};
use recwire_protocol::{flags, FieldType, Key, MessageBody, OpKind, ParticleType};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
enum BinOp {
    Read(String),
    Put(String, Value),
    Add(String, i64),
    Append(String, String),
    Prepend(String, String),
    Touch,
    Cdt(String, Node),
    ExpRead(String, Node, u32),
    ExpWrite(String, Node, u32),
}

impl BinOp {
    fn is_write(&self) -> bool {
        match self {
            BinOp::Read(_) | BinOp::ExpRead(..) => false,
            BinOp::Cdt(_, node) => node.is_modify(),
            _ => true,
        }
    }
}

/// Builds the message body for one record.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordRequest {
    key: Key,
    flags: u32,
    generation: Option<u32>,
    ttl: u32,
    timeout: Option<Duration>,
    send_key: bool,
    filter: Option<Node>,
    ops: Vec<BinOp>,
}

impl RecordRequest {
    fn new(key: Key, flags: u32) -> Self {
        Self {
            key,
            flags,
            generation: None,
            ttl: 0,
            timeout: None,
            send_key: false,
            filter: None,
            ops: Vec::new(),
        }
    }

    /// Reads the record. Without `.bin(..)` calls all bins are returned.
    pub fn read(key: Key) -> Self {
        Self::new(key, flags::READ)
    }

    /// Reads only the record metadata.
    pub fn exists(key: Key) -> Self {
        Self::new(key, flags::READ | flags::GET_NO_BINS)
    }

    /// Writes the bins added with `.put(..)` and friends.
    pub fn write(key: Key) -> Self {
        Self::new(key, flags::WRITE)
    }

    /// Deletes the record.
    pub fn delete(key: Key) -> Self {
        Self::new(key, flags::WRITE | flags::DELETE)
    }

    /// Mixed read/write operations, each result returned in order.
    pub fn operate(key: Key) -> Self {
        Self::new(key, flags::RESPOND_ALL_OPS)
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    pub fn bin(mut self, name: impl Into<String>) -> Self {
        self.ops.push(BinOp::Read(name.into()));
        self
    }

    pub fn put(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.ops.push(BinOp::Put(name.into(), value.into()));
        self
    }

    pub fn add(mut self, name: impl Into<String>, delta: i64) -> Self {
        self.ops.push(BinOp::Add(name.into(), delta));
        self
    }

    pub fn append(mut self, name: impl Into<String>, suffix: impl Into<String>) -> Self {
        self.ops.push(BinOp::Append(name.into(), suffix.into()));
        self
    }

    pub fn prepend(mut self, name: impl Into<String>, prefix: impl Into<String>) -> Self {
        self.ops.push(BinOp::Prepend(name.into(), prefix.into()));
        self
    }

    /// Resets the record's time to live without changing bins.
    pub fn touch(mut self) -> Self {
        self.ops.push(BinOp::Touch);
        self
    }

    /// Applies a list, map, subcontext or selection operation to a bin.
    pub fn cdt(mut self, name: impl Into<String>, op: Node) -> Self {
        self.ops.push(BinOp::Cdt(name.into(), op));
        self
    }

    /// Evaluates `expr` and returns the result under `name`.
    pub fn exp_read(mut self, name: impl Into<String>, expr: Node) -> Self {
        self.ops.push(BinOp::ExpRead(name.into(), expr, 0));
        self
    }

    /// Like [`exp_read`](Self::exp_read) with read flags, e.g. `exp_read_flags::EVAL_NO_FAIL`.
    pub fn exp_read_with_flags(mut self, name: impl Into<String>, expr: Node, flags: u32) -> Self {
        self.ops.push(BinOp::ExpRead(name.into(), expr, flags));
        self
    }

    /// Evaluates `expr` and stores the result in bin `name`.
    pub fn exp_write(mut self, name: impl Into<String>, expr: Node, flags: u32) -> Self {
        self.ops.push(BinOp::ExpWrite(name.into(), expr, flags));
        self
    }

    /// Only applies the request when `expr` holds for the record.
    pub fn filter(mut self, expr: Node) -> Self {
        self.filter = Some(expr);
        self
    }

    /// Record time to live in seconds (0 uses the namespace default).
    pub fn ttl(mut self, seconds: u32) -> Self {
        self.ttl = seconds;
        self
    }

    /// Only applies the write when the record generation matches.
    pub fn generation(mut self, generation: u32) -> Self {
        self.generation = Some(generation);
        self
    }

    /// Server-side deadline for the transaction.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the deadline only if none was given.
    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.timeout.get_or_insert(timeout);
        self
    }

    pub fn durable_delete(mut self) -> Self {
        self.flags |= flags::DURABLE_DELETE;
        self
    }

    pub fn create_only(mut self) -> Self {
        self.flags |= flags::CREATE_ONLY;
        self
    }

    pub fn update_only(mut self) -> Self {
        self.flags |= flags::UPDATE_ONLY;
        self
    }

    pub fn replace_only(mut self) -> Self {
        self.flags |= flags::REPLACE_ONLY;
        self
    }

    /// Stores the user key alongside the record.
    pub fn send_key(mut self) -> Self {
        self.send_key = true;
        self
    }

    /// Header flags for the current operations.
    pub fn header_flags(&self) -> u32 {
        let reads = self.ops.iter().any(|op| !op.is_write());
        let writes = self.ops.iter().any(BinOp::is_write);
        let mut word = self.flags;
        if reads {
            word |= flags::READ;
        }
        if writes {
            word |= flags::WRITE;
        }
        if word & flags::READ != 0 && !reads && word & flags::GET_NO_BINS == 0 {
            word |= flags::GET_ALL;
        }
        if self.generation.is_some() {
            word |= flags::GENERATION;
        }
        word
    }

    /// Builds the message body.
    pub fn build(&self) -> Result<MessageBody, ClientError> {
        let mut body = MessageBody::new();
        body.set_flags(self.header_flags());
        body.set_generation(self.generation.unwrap_or(0));
        body.set_record_ttl(self.ttl);
        if let Some(timeout) = self.timeout {
            body.set_transaction_ttl(u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX));
        }

        body.add_field(FieldType::Namespace, self.key.namespace.as_bytes())?;
        if !self.key.set.is_empty() {
            body.add_field(FieldType::Set, self.key.set.as_bytes())?;
        }
        if self.send_key {
            if let Some(value) = &self.key.value {
                body.add_field(FieldType::Key, &value.to_field_bytes())?;
            }
        }
        body.add_field(FieldType::Digest, &self.key.digest)?;
        if let Some(filter) = &self.filter {
            body.add_field(FieldType::FilterExpression, &encode_expression(filter)?)?;
        }

        for op in &self.ops {
            match op {
                BinOp::Read(name) => {
                    body.add_operation(OpKind::Read, ParticleType::Null, name, &[])?;
                }
                BinOp::Put(name, value) => {
                    let (particle, data) = encode_particle(value)?;
                    body.add_operation(OpKind::Write, particle, name, &data)?;
                }
                BinOp::Add(name, delta) => {
                    body.add_operation(
                        OpKind::Incr,
                        ParticleType::Integer,
                        name,
                        &delta.to_be_bytes(),
                    )?;
                }
                BinOp::Append(name, suffix) => {
                    body.add_operation(OpKind::Append, ParticleType::String, name, suffix.as_bytes())?;
                }
                BinOp::Prepend(name, prefix) => {
                    body.add_operation(OpKind::Prepend, ParticleType::String, name, prefix.as_bytes())?;
                }
                BinOp::Touch => {
                    body.add_operation(OpKind::Touch, ParticleType::Null, "", &[])?;
                }
                BinOp::Cdt(name, node) => {
                    let kind = if node.is_modify() {
                        OpKind::CdtModify
                    } else {
                        OpKind::CdtRead
                    };
                    body.add_operation(kind, ParticleType::Blob, name, &encode_cdt(node)?)?;
                }
                BinOp::ExpRead(name, expr, flags) => {
                    let data = exp_read_payload(expr, *flags)?;
                    body.add_operation(OpKind::ExpRead, ParticleType::Blob, name, &data)?;
                }
                BinOp::ExpWrite(name, expr, flags) => {
                    let data = exp_write_payload(expr, *flags)?;
                    body.add_operation(OpKind::ExpModify, ParticleType::Blob, name, &data)?;
                }
            }
        }

        tracing::debug!(
            ns = %self.key.namespace,
            set = %self.key.set,
            digest = %hex::encode(self.key.digest),
            fields = body.field_count(),
            ops = body.op_count(),
            "built request"
        );
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recwire_expr::cdt::{list_append, list_get};
    use recwire_expr::encoder::exp_read_flags;
    use recwire_expr::node::{bin_int, gt, int};

    fn key() -> Key {
        Key::new("test", "demo", 12345i64).unwrap()
    }

    #[test]
    fn test_field_order() {
        let body = RecordRequest::read(key())
            .send_key()
            .filter(gt(bin_int("age"), int(21)))
            .build()
            .unwrap();

        let kinds: Vec<_> = body
            .fields()
            .map(|f| f.unwrap().kind().unwrap())
            .collect();
        assert_eq!(
            kinds,
            vec![
                FieldType::Namespace,
                FieldType::Set,
                FieldType::Key,
                FieldType::Digest,
                FieldType::FilterExpression,
            ]
        );
        let digest = body.find_field(FieldType::Digest).unwrap().unwrap();
        assert_eq!(
            hex::encode(digest.data()),
            "8d60730e4a37c88b573022bdfe2e94497669c6b1"
        );
    }

    #[test]
    fn test_read_all_flags() {
        let body = RecordRequest::read(key()).build().unwrap();
        assert!(body.has_flags(flags::READ | flags::GET_ALL));
        assert!(!body.has_flags(flags::WRITE));
        assert_eq!(body.op_count(), 0);

        let body = RecordRequest::read(key()).bin("a").build().unwrap();
        assert!(body.has_flags(flags::READ));
        assert!(!body.has_flags(flags::GET_ALL));
    }

    #[test]
    fn test_exists_reads_no_bins() {
        let body = RecordRequest::exists(key()).build().unwrap();
        assert!(body.has_flags(flags::READ | flags::GET_NO_BINS));
        assert!(!body.has_flags(flags::GET_ALL));
    }

    #[test]
    fn test_write_operations() {
        let body = RecordRequest::write(key())
            .put("name", "Ann")
            .put("age", 30i64)
            .add("visits", 1)
            .ttl(60)
            .generation(4)
            .build()
            .unwrap();

        assert!(body.has_flags(flags::WRITE | flags::GENERATION));
        assert_eq!(body.record_ttl(), 60);
        assert_eq!(body.generation(), 4);

        let ops: Vec<_> = body.operations().map(|o| o.unwrap()).collect();
        assert_eq!(ops.len(), 3);
        assert_eq!(ops[0].kind(), Some(OpKind::Write));
        assert_eq!(ops[0].value_type(), Some(ParticleType::String));
        assert_eq!(ops[0].data(), b"Ann");
        assert_eq!(ops[1].data(), &30i64.to_be_bytes());
        assert_eq!(ops[2].kind(), Some(OpKind::Incr));
    }

    #[test]
    fn test_cdt_kind_follows_operation() {
        let body = RecordRequest::operate(key())
            .cdt("list", list_append(1))
            .cdt("list", list_get(0))
            .build()
            .unwrap();
        let ops: Vec<_> = body.operations().map(|o| o.unwrap()).collect();
        assert_eq!(ops[0].kind(), Some(OpKind::CdtModify));
        assert_eq!(ops[1].kind(), Some(OpKind::CdtRead));
        assert_eq!(ops[1].data(), &[0x92, 0x11, 0x00]);
        assert!(body.has_flags(flags::READ | flags::WRITE | flags::RESPOND_ALL_OPS));
    }

    #[test]
    fn test_delete_and_timeout() {
        let body = RecordRequest::delete(key())
            .durable_delete()
            .timeout(Duration::from_millis(750))
            .build()
            .unwrap();
        assert!(body.has_flags(flags::WRITE | flags::DELETE | flags::DURABLE_DELETE));
        assert_eq!(body.transaction_ttl(), 750);
        assert_eq!(body.op_count(), 0);
    }

    #[test]
    fn test_default_timeout_keeps_explicit() {
        let body = RecordRequest::read(key())
            .timeout(Duration::from_millis(100))
            .default_timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        assert_eq!(body.transaction_ttl(), 100);

        let body = RecordRequest::read(key())
            .default_timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        assert_eq!(body.transaction_ttl(), 5000);
    }

    #[test]
    fn test_expression_errors_surface() {
        let bad = recwire_expr::node::not(recwire_expr::cdt::list_size());
        let err = RecordRequest::read(key()).filter(bad).build().unwrap_err();
        assert!(matches!(err, ClientError::Expr(_)));
    }

    #[test]
    fn test_write_policies() {
        let body = RecordRequest::write(key())
            .put("a", 1i64)
            .replace_only()
            .build()
            .unwrap();
        assert!(body.has_flags(flags::WRITE | flags::REPLACE_ONLY));
        assert!(!body.has_flags(flags::UPDATE_ONLY | flags::CREATE_ONLY));

        let body = RecordRequest::write(key()).put("a", 1i64).create_only().build().unwrap();
        assert!(body.has_flags(flags::CREATE_ONLY));
    }

    #[test]
    fn test_exp_read_flags_in_payload() {
        let body = RecordRequest::read(key())
            .exp_read("plain", bin_int("age"))
            .exp_read_with_flags("lenient", bin_int("age"), exp_read_flags::EVAL_NO_FAIL)
            .build()
            .unwrap();
        let ops: Vec<_> = body.operations().map(|o| o.unwrap()).collect();
        assert_eq!(ops[0].kind(), Some(OpKind::ExpRead));
        assert_eq!(ops[0].data().last(), Some(&0x00));
        assert_eq!(ops[1].name_str().unwrap(), "lenient");
        assert_eq!(ops[1].data().last(), Some(&0x10));
        assert!(body.has_flags(flags::READ));
    }

    #[test]
    fn test_digest_only_key() {
        let digest = key().digest;
        let body = RecordRequest::read(Key::from_digest("test", "demo", digest))
            .send_key()
            .build()
            .unwrap();
        // No user key to send, so only namespace, set and digest are present.
        assert_eq!(body.field_count(), 3);
        assert!(body.find_field(FieldType::Key).unwrap().is_none());
        let field = body.find_field(FieldType::Digest).unwrap().unwrap();
        assert_eq!(field.data(), &digest);
    }
}
