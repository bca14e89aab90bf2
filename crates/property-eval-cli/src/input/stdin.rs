use property_eval_core::RawRequest;
use serde_json::Value;
use std::io::{self, Read};

/// Read a JSON request from stdin if data is being piped.
/// Returns None if stdin is a TTY (interactive) or empty.
pub fn read_stdin() -> Result<Option<RawRequest>, Box<dyn std::error::Error>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;

    let trimmed = buffer.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    match serde_json::from_str(trimmed)? {
        Value::Object(map) => Ok(Some(map)),
        _ => Err("stdin must hold a JSON object of request fields".into()),
    }
}
