//! Info (control) messages: newline separated commands and `name\tvalue` responses.

use crate::error::ProtocolError;
use crate::frame::{Frame, MessageKind};
use bytes::Bytes;

/// Builds the body of an info request. Each command ends with a newline.
pub fn encode_info_request(commands: &[&str]) -> Bytes {
    let mut body = String::with_capacity(commands.iter().map(|c| c.len() + 1).sum());
    for command in commands {
        body.push_str(command);
        body.push('\n');
    }
    Bytes::from(body)
}

/// Builds an info request frame.
pub fn info_frame(commands: &[&str]) -> Frame {
    Frame::new(MessageKind::Info, encode_info_request(commands))
}

/// Parses an info response body into `(name, value)` pairs.
///
/// A line without a tab yields an empty value. Empty lines are skipped.
pub fn parse_info_response(body: &[u8]) -> Result<Vec<(String, String)>, ProtocolError> {
    let text = std::str::from_utf8(body).map_err(|_| ProtocolError::InvalidUtf8)?;
    Ok(text
        .split('\n')
        .filter(|line| !line.is_empty())
        .map(|line| match line.split_once('\t') {
            Some((name, value)) => (name.to_string(), value.to_string()),
            None => (line.to_string(), String::new()),
        })
        .collect())
}
