//! CLI argument definitions for chatbridge.

use chatbridge_core::config::channel::PIPE_NAME;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "chatbridge")]
#[command(about = "Developer controller for the in-game chat bridge", version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Host the pipe, print status lines, and send chat requests
    Serve {
        /// Pipe name (without the \\.\pipe\ prefix)
        #[arg(long, env = "CHATBRIDGE_PIPE", default_value = PIPE_NAME)]
        pipe: String,
        /// Messages to send once the client connects (stdin lines follow)
        messages: Vec<String>,
    },
    /// Print the request line for TEXT
    Encode {
        text: String,
    },
    /// Explain a status line or decode a request line
    Decode {
        line: String,
    },
}
