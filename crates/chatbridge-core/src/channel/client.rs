use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::channel::{ChannelState, Connection, MessageHandler, Transport};

/// How a connected session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    Lost,
    Shutdown,
}

/// Client end of the controller channel.
///
/// Runs as a single task: connect, announce, serve requests in order, and on
/// any disconnect go straight back to connecting. Reconnection never gives up;
/// only `ChannelHandle::shutdown` ends the loop.
pub struct ChannelClient<T: Transport, H: MessageHandler> {
    transport: T,
    handler: Arc<H>,
    retry_delay: Duration,
    state: watch::Sender<ChannelState>,
    shutdown: watch::Receiver<bool>,
}

impl<T: Transport, H: MessageHandler> ChannelClient<T, H> {
    /// Start the client on `runtime`. Returns immediately; connecting happens in the background.
    pub fn spawn(runtime: &Handle, transport: T, handler: Arc<H>, retry_delay: Duration) -> ChannelHandle {
        let (state_tx, state_rx) = watch::channel(ChannelState::Disconnected);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let client = Self {
            transport,
            handler,
            retry_delay,
            state: state_tx,
            shutdown: shutdown_rx,
        };
        let task = runtime.spawn(client.run());

        ChannelHandle {
            state: state_rx,
            shutdown: shutdown_tx,
            task,
        }
    }

    fn set_state(&self, state: ChannelState) {
        self.state.send_replace(state);
    }

    fn is_shutdown(&self) -> bool {
        *self.shutdown.borrow()
    }

    async fn run(mut self) {
        while !self.is_shutdown() {
            self.set_state(ChannelState::Connecting);

            let result = tokio::select! {
                _ = self.shutdown.changed() => break,
                result = self.transport.connect() => result,
            };

            match result {
                Ok(connection) => {
                    self.set_state(ChannelState::Connected);
                    info!("Connected");
                    let end = self.serve(connection).await;
                    self.set_state(ChannelState::Disconnected);
                    if end == SessionEnd::Shutdown {
                        break;
                    }
                    info!("Disconnected");
                }
                Err(e) => {
                    debug!("Connect failed: {}", e);
                    self.set_state(ChannelState::Disconnected);
                    tokio::select! {
                        _ = self.shutdown.changed() => break,
                        _ = tokio::time::sleep(self.retry_delay) => {}
                    }
                }
            }
        }

        self.set_state(ChannelState::Disconnected);
        debug!("Channel task finished");
    }

    async fn serve(&mut self, mut connection: T::Connection) -> SessionEnd {
        if let Some(status) = self.handler.on_connected()
            && let Err(e) = connection.send(&status).await
        {
            warn!("Failed to send connect status: {}", e);
            return SessionEnd::Lost;
        }

        loop {
            let received = tokio::select! {
                biased;
                _ = self.shutdown.changed() => {
                    if let Err(e) = connection.close().await {
                        debug!("Graceful disconnect failed: {}", e);
                    }
                    return SessionEnd::Shutdown;
                }
                received = connection.recv() => received,
            };

            let message = match received {
                Ok(Some(message)) => message,
                Ok(None) => return SessionEnd::Lost,
                Err(e) => {
                    debug!("Receive failed: {}", e);
                    return SessionEnd::Lost;
                }
            };

            if message.is_empty() {
                continue;
            }

            if let Some(response) = self.handler.on_message(&message)
                && let Err(e) = connection.send(&response).await
            {
                warn!("Failed to send response: {}", e);
                return SessionEnd::Lost;
            }
        }
    }
}

/// Owner's handle on a running `ChannelClient`.
pub struct ChannelHandle {
    state: watch::Receiver<ChannelState>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ChannelHandle {
    pub fn state(&self) -> ChannelState {
        *self.state.borrow()
    }

    /// Wait until the client reaches `state`.
    pub async fn wait_for(&mut self, state: ChannelState) {
        let _ = self.state.wait_for(|current| *current == state).await;
    }

    /// Disconnect gracefully within `timeout`, then stop the task regardless.
    ///
    /// Returns `true` if the task finished on its own before the timeout.
    pub async fn shutdown(mut self, timeout: Duration) -> bool {
        self.shutdown.send_replace(true);

        let graceful = tokio::time::timeout(timeout, &mut self.task).await.is_ok();
        if !graceful {
            warn!("Channel did not stop within {:?}, aborting", timeout);
            self.task.abort();
        }
        graceful
    }
}
