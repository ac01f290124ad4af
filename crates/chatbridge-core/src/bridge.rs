//! Top-level wiring: one-time scan, injector, and the controller channel.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio::runtime::{Builder, Runtime};
use tracing::{error, info, warn};

use crate::channel::{ChannelClient, ChannelHandle, ChannelState, MessageHandler, StatusMessage, Transport};
use crate::chat::{ChatInjector, EntryPoints, NativeChat};
use crate::config::BridgeConfig;
use crate::error::Result;
use crate::host::HostContext;
use crate::process::ReadMemory;
use crate::signature::{SignatureSet, builtin_signatures, load_signatures};

/// Cached result of the one-time signature scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOutcome {
    entry_points: Option<EntryPoints>,
}

impl ScanOutcome {
    pub fn succeeded(&self) -> bool {
        self.entry_points.is_some()
    }

    pub fn entry_points(&self) -> Option<EntryPoints> {
        self.entry_points
    }
}

/// Answers the controller on behalf of the injector.
struct BridgeHandler<N: NativeChat> {
    injector: ChatInjector<N>,
    pid: u32,
    scanned: bool,
}

impl<N: NativeChat + 'static> MessageHandler for BridgeHandler<N> {
    fn on_connected(&self) -> Option<String> {
        Some(StatusMessage::scanned(self.pid, self.scanned).to_string())
    }

    fn on_message(&self, message: &str) -> Option<String> {
        let ok = self.injector.send_chat(message);
        Some(StatusMessage::chatted(self.pid, ok).to_string())
    }
}

/// Owns everything the plugin keeps alive between load and unload.
///
/// `start*` and `stop` block the calling thread and must not be called from
/// inside an async runtime.
pub struct Bridge {
    config: BridgeConfig,
    host: Arc<dyn HostContext>,
    scan: OnceLock<ScanOutcome>,
    runtime: Option<Runtime>,
    channel: Option<ChannelHandle>,
}

impl Bridge {
    pub fn new(host: Arc<dyn HostContext>, config: BridgeConfig) -> Self {
        Self {
            config,
            host,
            scan: OnceLock::new(),
            runtime: None,
            channel: None,
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Signature set from the configured file, or the built-in one.
    pub fn signatures(&self) -> SignatureSet {
        let Some(path) = &self.config.signatures_file else {
            return builtin_signatures();
        };
        match load_signatures(path) {
            Ok(set) => {
                info!("Loaded signatures version {} from {:?}", set.version, path);
                set
            }
            Err(e) => {
                warn!("Failed to load signatures from {:?}: {}, using built-in", path, e);
                builtin_signatures()
            }
        }
    }

    /// Resolve entry points once. Later calls return the cached outcome without scanning.
    pub fn scan<R: ReadMemory + ?Sized>(&self, reader: &R) -> ScanOutcome {
        *self.scan.get_or_init(|| {
            let entry_points = match EntryPoints::resolve(reader, &self.signatures()) {
                Ok(entry_points) => {
                    info!(
                        "Chat signatures resolved: accessor=0x{:X}, send=0x{:X}, static=0x{:X}",
                        entry_points.ui_accessor,
                        entry_points.send_chat,
                        entry_points.ui_module_static
                    );
                    Some(entry_points)
                }
                Err(e) => {
                    error!("ScanChatSignatures error: {}", e);
                    None
                }
            };
            ScanOutcome { entry_points }
        })
    }

    pub fn scan_outcome(&self) -> Option<ScanOutcome> {
        self.scan.get().copied()
    }

    /// Scan, then open the channel over `transport`. A second call while running does nothing.
    pub fn start_with<R, T, N>(&mut self, reader: &R, transport: T, native: N) -> Result<()>
    where
        R: ReadMemory + ?Sized,
        T: Transport,
        N: NativeChat + 'static,
    {
        if self.channel.is_some() {
            return Ok(());
        }

        let outcome = self.scan(reader);

        let runtime = match self.runtime.take() {
            Some(runtime) => runtime,
            None => Builder::new_multi_thread()
                .worker_threads(1)
                .thread_name("chatbridge-channel")
                .enable_all()
                .build()?,
        };

        let handler = Arc::new(BridgeHandler {
            injector: ChatInjector::new(outcome.entry_points(), native, Arc::clone(&self.host)),
            pid: self.host.process_id(),
            scanned: outcome.succeeded(),
        });
        let channel = ChannelClient::spawn(
            runtime.handle(),
            transport,
            handler,
            self.config.connect_retry_delay(),
        );

        self.runtime = Some(runtime);
        self.channel = Some(channel);
        info!("Loaded");
        Ok(())
    }

    /// Start against the live process and the configured named pipe.
    #[cfg(target_os = "windows")]
    pub fn start(&mut self) -> Result<()> {
        use crate::channel::PipeTransport;
        use crate::chat::InProcessChat;
        use crate::process::{LocalMemoryReader, ModuleInfo};

        let module = ModuleInfo::current()?;
        let reader = LocalMemoryReader::new(module);
        let transport = PipeTransport::new(&self.config.pipe_name);
        self.start_with(&reader, transport, InProcessChat::new(reader))
    }

    #[cfg(not(target_os = "windows"))]
    pub fn start(&mut self) -> Result<()> {
        Err(crate::error::Error::Transport(
            "Windows only: named pipes not supported on this platform".to_string(),
        ))
    }

    pub fn is_running(&self) -> bool {
        self.channel.is_some()
    }

    pub fn channel_state(&self) -> ChannelState {
        self.channel
            .as_ref()
            .map_or(ChannelState::Disconnected, ChannelHandle::state)
    }

    /// Block until the channel reaches `state` or `timeout` elapses.
    pub fn wait_for_state(&mut self, state: ChannelState, timeout: Duration) -> bool {
        let (Some(runtime), Some(channel)) = (&self.runtime, &mut self.channel) else {
            return false;
        };
        runtime
            .block_on(async { tokio::time::timeout(timeout, channel.wait_for(state)).await })
            .is_ok()
    }

    /// Disconnect (bounded by the configured timeout) and release the channel. Idempotent.
    pub fn stop(&mut self) {
        let Some(runtime) = self.runtime.take() else {
            return;
        };

        if let Some(channel) = self.channel.take() {
            let timeout = self.config.shutdown_timeout();
            if !runtime.block_on(channel.shutdown(timeout)) {
                warn!("Channel shutdown timed out after {:?}", timeout);
            }
        }

        runtime.shutdown_timeout(Duration::from_millis(100));
        info!("Unloaded");
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::StaticHost;
    use crate::process::MockMemoryBuilder;

    fn bridge() -> Bridge {
        Bridge::new(
            Arc::new(StaticHost {
                logged_in: true,
                pid: 99,
            }),
            BridgeConfig::default(),
        )
    }

    #[test]
    fn test_scan_failure_is_cached() {
        let bridge = bridge();
        let empty = MockMemoryBuilder::new().with_size(0x100).build();

        assert!(bridge.scan_outcome().is_none());
        let first = bridge.scan(&empty);
        assert!(!first.succeeded());
        assert_eq!(bridge.scan_outcome(), Some(first));
    }

    #[test]
    fn test_bad_signatures_file_falls_back_to_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let config = BridgeConfig {
            signatures_file: Some(dir.path().join("missing.json")),
            ..Default::default()
        };
        let bridge = Bridge::new(Arc::new(StaticHost { logged_in: true, pid: 1 }), config);

        assert_eq!(bridge.signatures(), builtin_signatures());
    }

    #[test]
    fn test_stop_without_start() {
        let mut bridge = bridge();
        assert!(!bridge.is_running());
        bridge.stop();
        bridge.stop();
        assert_eq!(bridge.channel_state(), ChannelState::Disconnected);
    }

    #[test]
    fn test_handler_status_lines() {
        use crate::chat::testing::RecordingChat;

        let host = Arc::new(StaticHost {
            logged_in: false,
            pid: 5,
        });
        let handler = BridgeHandler {
            injector: ChatInjector::new(None, RecordingChat::new(1, 1), host),
            pid: 5,
            scanned: false,
        };

        assert_eq!(handler.on_connected().as_deref(), Some("5:scanned:false"));
        assert_eq!(handler.on_message("aGVsbG8=").as_deref(), Some("5:chatted:false"));
    }
}
