//! Controller channel: transport seam, wire protocol, and the reconnecting client.

mod client;
#[cfg(target_os = "windows")]
mod pipe;
pub mod protocol;

// In-memory transport (always available for unit and integration tests)
#[doc(hidden)]
pub mod testing;

use std::future::Future;

use strum::Display;

use crate::error::Result;

pub use client::{ChannelClient, ChannelHandle};
#[cfg(target_os = "windows")]
pub use pipe::{PipeConnection, PipeTransport};
pub use protocol::{StatusKind, StatusMessage};

/// Connection state of the client end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ChannelState {
    Disconnected,
    Connecting,
    Connected,
}

/// Opens connections to the controller.
pub trait Transport: Send + 'static {
    type Connection: Connection;

    /// Open a connection. May wait for the controller to start listening.
    fn connect(&mut self) -> impl Future<Output = Result<Self::Connection>> + Send;
}

/// One live, ordered, duplex text connection.
pub trait Connection: Send + 'static {
    /// Next message, or `None` once the controller has gone away.
    fn recv(&mut self) -> impl Future<Output = Result<Option<String>>> + Send;

    fn send(&mut self, message: &str) -> impl Future<Output = Result<()>> + Send;

    /// Graceful disconnect.
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;
}

/// Application side of the channel.
///
/// Both callbacks return the status line to write back, if any.
pub trait MessageHandler: Send + Sync + 'static {
    fn on_connected(&self) -> Option<String>;

    fn on_message(&self, message: &str) -> Option<String>;
}
