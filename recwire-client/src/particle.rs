//! Bin value encoding: particle type plus raw bytes.

use crate::error::ClientError;
use recwire_expr::{encode_value, unpack, Value};
use recwire_protocol::ParticleType;

/// Encodes a value as a bin particle.
pub fn encode_particle(value: &Value) -> Result<(ParticleType, Vec<u8>), ClientError> {
    Ok(match value {
        Value::Nil => (ParticleType::Null, Vec::new()),
        Value::Bool(b) => (ParticleType::Bool, vec![*b as u8]),
        Value::Int(v) => (ParticleType::Integer, v.to_be_bytes().to_vec()),
        Value::Uint(v) => {
            let v = i64::try_from(*v)
                .map_err(|_| ClientError::UnsupportedValue(format!("integer {}", v)))?;
            (ParticleType::Integer, v.to_be_bytes().to_vec())
        }
        Value::Float(v) => (ParticleType::Float, v.to_bits().to_be_bytes().to_vec()),
        Value::Str(s) => (ParticleType::String, s.as_bytes().to_vec()),
        Value::Blob(b) => (ParticleType::Blob, b.clone()),
        Value::List(_) => (ParticleType::List, encode_value(value)?.to_vec()),
        Value::Map(..) => (ParticleType::Map, encode_value(value)?.to_vec()),
        Value::Infinity | Value::Wildcard => {
            return Err(ClientError::UnsupportedValue(value.to_string()))
        }
    })
}

fn fixed<const N: usize>(particle: &'static str, data: &[u8]) -> Result<[u8; N], ClientError> {
    data.try_into().map_err(|_| ClientError::InvalidParticle {
        particle,
        reason: format!("expected {} bytes, got {}", N, data.len()),
    })
}

/// Decodes a bin particle. Unknown particle types come back as blobs.
pub fn decode_particle(particle: u8, data: &[u8]) -> Result<Value, ClientError> {
    let Ok(kind) = ParticleType::try_from(particle) else {
        return Ok(Value::Blob(data.to_vec()));
    };
    match kind {
        ParticleType::Null => Ok(Value::Nil),
        ParticleType::Integer => Ok(Value::Int(i64::from_be_bytes(fixed("integer", data)?))),
        ParticleType::Float => Ok(Value::Float(f64::from_bits(u64::from_be_bytes(fixed(
            "float", data,
        )?)))),
        ParticleType::Bool => {
            let [b] = fixed::<1>("bool", data)?;
            Ok(Value::Bool(b != 0))
        }
        ParticleType::String => std::str::from_utf8(data)
            .map(|s| Value::Str(s.to_string()))
            .map_err(|e| ClientError::InvalidParticle {
                particle: "string",
                reason: e.to_string(),
            }),
        ParticleType::GeoJson => decode_geojson(data),
        ParticleType::List | ParticleType::Map => Ok(unpack(data)?),
        ParticleType::Blob | ParticleType::Hll => Ok(Value::Blob(data.to_vec())),
    }
}

/// GeoJSON particles carry a flags byte and a cell index ahead of the text.
fn decode_geojson(data: &[u8]) -> Result<Value, ClientError> {
    let invalid = |reason: &str| ClientError::InvalidParticle {
        particle: "geojson",
        reason: reason.to_string(),
    };
    if data.len() < 3 {
        return Err(invalid("missing header"));
    }
    let ncells = u16::from_be_bytes([data[1], data[2]]) as usize;
    let start = 3 + ncells * 8;
    let text = data.get(start..).ok_or_else(|| invalid("cell index overruns data"))?;
    std::str::from_utf8(text)
        .map(|s| Value::Str(s.to_string()))
        .map_err(|_| invalid("text is not UTF-8"))
}
