//! Records decoded from response bodies.

use crate::error::ClientError;
use crate::particle::decode_particle;
use recwire_expr::Value;
use recwire_protocol::{MessageBody, ResultCode};

/// A record as returned by the server.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub result_code: ResultCode,
    pub generation: u32,
    /// Server-relative expiration as sent in the header.
    pub ttl: u32,
    /// Bins in response order. A bin may appear more than once when every
    /// operation result is returned.
    pub bins: Vec<(String, Value)>,
}

impl Record {
    /// Decodes the header and every operation record of a response.
    pub fn from_body(body: &MessageBody) -> Result<Self, ClientError> {
        let mut bins = Vec::with_capacity(body.op_count() as usize);
        for op in body.operations() {
            let op = op?;
            let name = op.name_str()?.to_string();
            let value = decode_particle(op.value_type_code(), op.data())?;
            bins.push((name, value));
        }
        Ok(Self {
            result_code: body.result_code(),
            generation: body.generation(),
            ttl: body.record_ttl(),
            bins,
        })
    }

    pub fn is_ok(&self) -> bool {
        self.result_code.is_ok()
    }

    /// Last value returned for `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bins
            .iter()
            .rev()
            .find(|(bin, _)| bin == name)
            .map(|(_, value)| value)
    }

    /// Every value returned for `name`, in order.
    pub fn all(&self, name: &str) -> Vec<&Value> {
        self.bins
            .iter()
            .filter(|(bin, _)| bin == name)
            .map(|(_, value)| value)
            .collect()
    }
}
