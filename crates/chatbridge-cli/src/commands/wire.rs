//! `encode` and `decode` commands.

use anyhow::{Result, bail};
use chatbridge_core::channel::protocol::{decode_request, encode_request};
use chatbridge_core::StatusMessage;

pub fn encode(text: &str) -> Result<()> {
    println!("{}", encode_request(text));
    Ok(())
}

pub fn decode(line: &str) -> Result<()> {
    println!("{}", describe(line)?);
    Ok(())
}

/// Human-readable form of a status line, or the text of a request line.
pub fn describe(line: &str) -> Result<String> {
    if let Ok(status) = line.parse::<StatusMessage>() {
        return Ok(format!(
            "pid={} kind={} ok={}",
            status.pid, status.kind, status.ok
        ));
    }
    match decode_request(line) {
        Ok(text) => Ok(format!("request: {:?}", text)),
        Err(e) => bail!("neither a status line nor a request: {}", e),
    }
}
