//! In-memory transport.
//!
//! `MemoryServer` plays the controller: each `accept()` queues one session
//! for the client's next `connect()` and returns the controller's end of it.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::mpsc;

use crate::channel::{Connection, Transport};
use crate::error::{Error, Result};

/// Shared count of `connect()` calls
#[derive(Debug, Clone, Default)]
pub struct ConnectCounter(Arc<AtomicUsize>);

impl ConnectCounter {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn increment(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct MemoryTransport {
    sessions: mpsc::UnboundedReceiver<MemoryConnection>,
    refusals: Arc<AtomicUsize>,
    connects: ConnectCounter,
}

pub struct MemoryServer {
    sessions: mpsc::UnboundedSender<MemoryConnection>,
    refusals: Arc<AtomicUsize>,
    connects: ConnectCounter,
}

/// Client end of one in-memory session
pub struct MemoryConnection {
    from_controller: mpsc::UnboundedReceiver<String>,
    to_controller: Option<mpsc::UnboundedSender<String>>,
}

/// Controller end of one in-memory session. Dropping it disconnects the client.
pub struct ControllerEnd {
    from_client: mpsc::UnboundedReceiver<String>,
    to_client: mpsc::UnboundedSender<String>,
}

pub fn memory_transport() -> (MemoryTransport, MemoryServer) {
    let (tx, rx) = mpsc::unbounded_channel();
    let refusals = Arc::new(AtomicUsize::new(0));
    let connects = ConnectCounter::default();

    let transport = MemoryTransport {
        sessions: rx,
        refusals: Arc::clone(&refusals),
        connects: connects.clone(),
    };
    let server = MemoryServer {
        sessions: tx,
        refusals,
        connects,
    };
    (transport, server)
}

impl MemoryServer {
    /// Queue a session for the client's next connect.
    pub fn accept(&self) -> ControllerEnd {
        let (to_client, from_controller) = mpsc::unbounded_channel();
        let (to_controller, from_client) = mpsc::unbounded_channel();

        let _ = self.sessions.send(MemoryConnection {
            from_controller,
            to_controller: Some(to_controller),
        });

        ControllerEnd {
            from_client,
            to_client,
        }
    }

    /// Make the next `count` connect attempts fail outright.
    pub fn refuse(&self, count: usize) {
        self.refusals.store(count, Ordering::SeqCst);
    }

    pub fn connect_attempts(&self) -> ConnectCounter {
        self.connects.clone()
    }
}

impl ControllerEnd {
    pub fn send(&self, message: &str) {
        let _ = self.to_client.send(message.to_string());
    }

    /// Next line from the client, or `None` once it has disconnected.
    pub async fn recv(&mut self) -> Option<String> {
        self.from_client.recv().await
    }
}

impl Transport for MemoryTransport {
    type Connection = MemoryConnection;

    async fn connect(&mut self) -> Result<MemoryConnection> {
        self.connects.increment();

        let refused = self
            .refusals
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            return Err(Error::Transport("connection refused".to_string()));
        }

        self.sessions
            .recv()
            .await
            .ok_or_else(|| Error::Transport("server closed".to_string()))
    }
}

impl Connection for MemoryConnection {
    async fn recv(&mut self) -> Result<Option<String>> {
        Ok(self.from_controller.recv().await)
    }

    async fn send(&mut self, message: &str) -> Result<()> {
        self.to_controller
            .as_ref()
            .ok_or_else(|| Error::Transport("connection closed".to_string()))?
            .send(message.to_string())
            .map_err(|_| Error::Transport("controller gone".to_string()))
    }

    async fn close(&mut self) -> Result<()> {
        self.to_controller = None;
        Ok(())
    }
}
