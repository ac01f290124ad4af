//! Wire messages exchanged with the controller.
//!
//! One message per line:
//! - controller → client: base64 of the UTF-8 chat text
//! - client → controller: `<pid>:scanned:<bool>` on connect,
//!   `<pid>:chatted:<bool>` after each request

use std::fmt;
use std::str::FromStr;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use strum::{Display, EnumString};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum StatusKind {
    /// Sent once per connect: did the one-time signature scan succeed
    Scanned,
    /// Sent after each request: was the chat call issued
    Chatted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusMessage {
    pub pid: u32,
    pub kind: StatusKind,
    pub ok: bool,
}

impl StatusMessage {
    pub fn scanned(pid: u32, ok: bool) -> Self {
        Self {
            pid,
            kind: StatusKind::Scanned,
            ok,
        }
    }

    pub fn chatted(pid: u32, ok: bool) -> Self {
        Self {
            pid,
            kind: StatusKind::Chatted,
            ok,
        }
    }
}

impl fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.pid, self.kind, self.ok)
    }
}

impl FromStr for StatusMessage {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::Decode(format!("invalid status message '{}'", s));
        let mut parts = s.trim().split(':');
        let (Some(pid), Some(kind), Some(ok), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };

        Ok(Self {
            pid: pid.parse().map_err(|_| invalid())?,
            kind: kind.parse().map_err(|_| invalid())?,
            ok: ok.parse().map_err(|_| invalid())?,
        })
    }
}

/// Encode chat text as a request line.
pub fn encode_request(text: &str) -> String {
    STANDARD.encode(text.as_bytes())
}

/// Decode a request line into UTF-8 chat text.
pub fn decode_request(request: &str) -> Result<String> {
    let bytes = STANDARD.decode(request.trim())?;
    Ok(String::from_utf8(bytes)?)
}

/// Full path of a named pipe.
pub fn pipe_path(name: &str) -> String {
    format!(r"\\.\pipe\{}", name)
}
