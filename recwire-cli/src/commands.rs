//! Command execution.

use crate::Commands;
use colored::Colorize;
use recwire_client::{body_to_json, Client, ClientConfig, Record, RecordRequest};
use recwire_expr::Value;
use recwire_protocol::{Decoder, Key, KeyValue, Message, MessageBody};

type CliResult = Result<String, Box<dyn std::error::Error>>;

/// Executes a command that needs no server.
pub fn execute_local(config: &ClientConfig, cmd: Commands) -> CliResult {
    match cmd {
        Commands::Digest { set, key, int } => {
            let key = Key::new(&config.namespace, set, parse_key_value(&key, int)?)?;
            Ok(hex::encode(key.digest))
        }

        Commands::Decode { hex, frame } => {
            let body = decode_body(&read_arg(&hex)?, frame)?;
            Ok(format_json(&body_to_json(&body)))
        }

        _ => unreachable!("server commands are run by execute"),
    }
}

/// Executes a command against the server and returns the formatted output.
pub async fn execute(client: &Client, cmd: Commands) -> CliResult {
    match cmd {
        Commands::Info { commands } => {
            let commands: Vec<&str> = commands.iter().map(String::as_str).collect();
            let pairs = client.info(&commands).await?;
            let mut output = String::new();
            for (name, value) in pairs {
                output.push_str(&format!("{}\t{}\n", name.cyan(), value));
            }
            Ok(output.trim_end().to_string())
        }

        Commands::Get {
            set,
            key,
            int,
            bins,
        } => {
            let key = client.key(&set, parse_key_value(&key, int)?)?;
            let bins: Vec<&str> = bins.iter().map(String::as_str).collect();
            match client.get(key, &bins).await? {
                Some(record) => Ok(format_record(&record)),
                None => Ok("Record not found".yellow().to_string()),
            }
        }

        Commands::Put {
            set,
            key,
            int,
            ttl,
            bins,
        } => {
            let key = client.key(&set, parse_key_value(&key, int)?)?;
            let mut request = RecordRequest::write(key);
            if let Some(ttl) = ttl {
                request = request.ttl(ttl);
            }
            for bin in &bins {
                let (name, value) = parse_bin(bin)?;
                request = request.put(name, value);
            }
            client.execute(request).await?;
            Ok(format!("{} {} bin(s)", "Wrote".green(), bins.len()))
        }

        Commands::Delete { set, key, int } => {
            let key = client.key(&set, parse_key_value(&key, int)?)?;
            if client.delete(key).await? {
                Ok("Deleted".green().to_string())
            } else {
                Ok("Record not found".yellow().to_string())
            }
        }

        Commands::Digest { .. } | Commands::Decode { .. } => {
            unreachable!("local commands are run by execute_local")
        }
    }
}

fn parse_key_value(key: &str, int: bool) -> Result<KeyValue, Box<dyn std::error::Error>> {
    if int {
        Ok(KeyValue::from(key.parse::<i64>()?))
    } else {
        Ok(KeyValue::from(key))
    }
}

/// Splits `name=value`. The value is read as JSON when it parses, else as a
/// plain string.
fn parse_bin(arg: &str) -> Result<(String, Value), Box<dyn std::error::Error>> {
    let (name, raw) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{}'", arg))?;
    let value = match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(json) => json_to_value(json),
        Err(_) => Value::Str(raw.to_string()),
    };
    Ok((name.to_string(), value))
}

fn json_to_value(json: serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Nil,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => {
            if let Some(v) = n.as_i64() {
                Value::Int(v)
            } else if let Some(v) = n.as_u64() {
                Value::Uint(v)
            } else {
                Value::Float(n.as_f64().unwrap_or_default())
            }
        }
        serde_json::Value::String(s) => Value::Str(s),
        serde_json::Value::Array(items) => {
            Value::List(items.into_iter().map(json_to_value).collect())
        }
        serde_json::Value::Object(map) => {
            Value::map(map.into_iter().map(|(k, v)| (k, json_to_value(v))))
        }
    }
}

/// Reads an argument inline or from `@file`.
fn read_arg(arg: &str) -> Result<String, Box<dyn std::error::Error>> {
    match arg.strip_prefix('@') {
        Some(path) => Ok(std::fs::read_to_string(path)?),
        None => Ok(arg.to_string()),
    }
}

fn decode_body(text: &str, frame: bool) -> Result<MessageBody, Box<dyn std::error::Error>> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    let data = hex::decode(compact)?;
    if !frame {
        return Ok(MessageBody::parse_slice(&data)?);
    }

    let mut decoder = Decoder::new();
    decoder.extend(&data);
    match decoder.decode_message()? {
        Some(Message::Body(body)) => Ok(body),
        Some(other) => Err(format!("{} frames carry no message body", other.kind().name()).into()),
        None => Err("incomplete frame".into()),
    }
}

fn format_record(record: &Record) -> String {
    let mut output = format!(
        "{}  generation: {}  ttl: {}",
        "Record".bold(),
        record.generation,
        record.ttl
    );
    for (name, value) in &record.bins {
        output.push_str(&format!("\n  {} = {}", name.cyan(), value));
    }
    output
}

/// Formats JSON for display.
fn format_json(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use recwire_protocol::{Encoder, OpKind, ParticleType};

    #[test]
    fn test_parse_bin() {
        assert_eq!(parse_bin("age=30").unwrap(), ("age".to_string(), Value::Int(30)));
        assert_eq!(
            parse_bin("name=Ann").unwrap(),
            ("name".to_string(), Value::from("Ann"))
        );
        assert_eq!(
            parse_bin("tags=[1,\"a\"]").unwrap().1,
            Value::list([Value::Int(1), Value::from("a")])
        );
        assert_eq!(
            parse_bin("m={\"k\":1.5}").unwrap().1,
            Value::map([("k", 1.5)])
        );
        assert!(parse_bin("novalue").is_err());
    }

    #[test]
    fn test_digest_command() {
        let out = execute_local(
            &ClientConfig::default(),
            Commands::Digest {
                set: "demo".to_string(),
                key: "12345".to_string(),
                int: true,
            },
        )
        .unwrap();
        assert_eq!(out, "8d60730e4a37c88b573022bdfe2e94497669c6b1");
    }

    #[test]
    fn test_decode_body_and_frame() {
        let mut body = MessageBody::new();
        body.add_operation(OpKind::Read, ParticleType::Integer, "n", &5i64.to_be_bytes())
            .unwrap();

        let decoded = decode_body(&hex::encode(body.as_bytes()), false).unwrap();
        assert_eq!(decoded.op_count(), 1);

        let framed = hex::encode(Encoder::encode_message(&body).unwrap());
        let decoded = decode_body(&framed, true).unwrap();
        assert_eq!(decoded.as_bytes(), body.as_bytes());

        assert!(decode_body(&framed[..20], true).is_err());
        assert!(decode_body("zz", false).is_err());
    }
}
