//! Windows named-pipe transport.
//!
//! Framing is one UTF-8 message per `\n`-terminated line.

use std::io::ErrorKind;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, ReadHalf, WriteHalf};
use tokio::net::windows::named_pipe::{ClientOptions, NamedPipeClient};
use tracing::debug;

use crate::channel::protocol::pipe_path;
use crate::channel::{Connection, Transport};
use crate::error::{Error, Result};

/// Connects to the controller's pipe server by name.
#[derive(Debug, Clone)]
pub struct PipeTransport {
    path: String,
}

impl PipeTransport {
    pub fn new(pipe_name: &str) -> Self {
        Self {
            path: pipe_path(pipe_name),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

pub struct PipeConnection {
    lines: Lines<BufReader<ReadHalf<NamedPipeClient>>>,
    writer: WriteHalf<NamedPipeClient>,
}

impl Transport for PipeTransport {
    type Connection = PipeConnection;

    async fn connect(&mut self) -> Result<PipeConnection> {
        let client = ClientOptions::new().open(&self.path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                Error::Transport(format!("no server listening on {}", self.path))
            } else {
                Error::Transport(format!("failed to open {}: {}", self.path, e))
            }
        })?;
        debug!("Opened pipe {}", self.path);

        let (reader, writer) = tokio::io::split(client);
        Ok(PipeConnection {
            lines: BufReader::new(reader).lines(),
            writer,
        })
    }
}

impl Connection for PipeConnection {
    async fn recv(&mut self) -> Result<Option<String>> {
        match self.lines.next_line().await {
            Ok(line) => Ok(line.map(|l| l.trim_end_matches('\r').to_string())),
            Err(e) if e.kind() == ErrorKind::BrokenPipe => Ok(None),
            Err(e) => Err(Error::Transport(e.to_string())),
        }
    }

    async fn send(&mut self, message: &str) -> Result<()> {
        let mut line = String::with_capacity(message.len() + 1);
        line.push_str(message);
        line.push('\n');
        self.writer
            .write_all(line.as_bytes())
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        self.writer
            .flush()
            .await
            .map_err(|e| Error::Transport(e.to_string()))
    }

    async fn close(&mut self) -> Result<()> {
        self.writer
            .shutdown()
            .await
            .map_err(|e| Error::Transport(e.to_string()))
    }
}
