//! Integration tests for chatbridge-core
//!
//! These drive a full `Bridge` over the in-memory transport, with a mock
//! module image for the scan and a recording fake for the native calls.

use std::cell::Cell;
use std::sync::Arc;
use std::time::Duration;

use chatbridge_core::channel::protocol::encode_request;
use chatbridge_core::channel::testing::{ControllerEnd, MemoryServer, memory_transport};
use chatbridge_core::chat::testing::RecordingChat;
use chatbridge_core::process::{MockMemoryBuilder, MockMemoryReader};
use chatbridge_core::{Bridge, BridgeConfig, ChannelState, ReadMemory, StaticHost};

const PID: u32 = 4242;
const UI_MODULE: u64 = 0xDEAD_0000;
const FRAMEWORK: u64 = 0xBEEF_0000;
const TIMEOUT: Duration = Duration::from_secs(5);

/// Image whose `.text` section holds all three built-in signatures.
fn chat_module() -> MockMemoryReader {
    MockMemoryBuilder::new()
        .base(0x1_4000_0000)
        .with_size(0x400)
        .write_pe_headers(&[(".text", 0x200, 0x180)])
        .write_bytes(0x200, &[0xE8])
        .write_i32(0x201, 0x19B)
        .write_bytes(0x205, &[0x48, 0x83, 0x7F, 0x08, 0x00, 0x48, 0x8B, 0xF0])
        .write_bytes(
            0x280,
            &[
                0x48, 0x89, 0x5C, 0x24, 0x08, 0x57, 0x48, 0x83, 0xEC, 0x20, 0x48, 0x8B, 0xFA, 0x48,
                0x8B, 0xD9, 0x45, 0x84, 0xC9,
            ],
        )
        .write_bytes(0x300, &[0x48, 0x8B, 0x0D])
        .write_i32(0x303, 0x40)
        .write_bytes(
            0x307,
            &[0x48, 0x8D, 0x54, 0x24, 0x40, 0x48, 0x83, 0xC1, 0x10, 0xE8],
        )
        .build()
}

/// Counts reads so tests can tell whether a scan touched memory.
struct CountingReader<R> {
    inner: R,
    reads: Cell<usize>,
}

impl<R: ReadMemory> CountingReader<R> {
    fn new(inner: R) -> Self {
        Self {
            inner,
            reads: Cell::new(0),
        }
    }
}

impl<R: ReadMemory> ReadMemory for CountingReader<R> {
    fn read_bytes(&self, address: u64, size: usize) -> chatbridge_core::Result<Vec<u8>> {
        self.reads.set(self.reads.get() + 1);
        self.inner.read_bytes(address, size)
    }

    fn base_address(&self) -> u64 {
        self.inner.base_address()
    }

    fn image_size(&self) -> u64 {
        self.inner.image_size()
    }
}

struct Harness {
    bridge: Bridge,
    server: MemoryServer,
    chat: RecordingChat,
    controller: tokio::runtime::Runtime,
}

impl Harness {
    fn start(logged_in: bool, reader: &impl ReadMemory) -> Self {
        let host = Arc::new(StaticHost {
            logged_in,
            pid: PID,
        });
        let config = BridgeConfig {
            connect_retry_delay_ms: 10,
            ..Default::default()
        };
        let (transport, server) = memory_transport();
        let chat = RecordingChat::new(FRAMEWORK, UI_MODULE);

        let mut bridge = Bridge::new(host, config);
        bridge.start_with(reader, transport, chat.clone()).unwrap();

        let controller = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        Self {
            bridge,
            server,
            chat,
            controller,
        }
    }

    fn recv(&self, end: &mut ControllerEnd) -> Option<String> {
        self.controller
            .block_on(async { tokio::time::timeout(TIMEOUT, end.recv()).await })
            .ok()
            .flatten()
    }
}

mod end_to_end_tests {
    use super::*;

    #[test]
    fn test_hello_is_chatted() {
        let reader = chat_module();
        let h = Harness::start(true, &reader);
        let mut end = h.server.accept();

        assert_eq!(h.recv(&mut end).as_deref(), Some("4242:scanned:true"));

        end.send(&encode_request("hello"));
        assert_eq!(h.recv(&mut end).as_deref(), Some("4242:chatted:true"));

        let calls = h.chat.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].text, "hello");
        assert_eq!(calls[0].length, 6);
        assert_eq!(calls[0].reserved1, 64);
        assert_eq!(calls[0].reserved2, 0);
        assert_eq!(calls[0].ui_module, UI_MODULE);
        assert_eq!(calls[0].entry, 0x1_4000_0280);
        assert_eq!(h.chat.accessor_calls(), vec![(0x1_4000_03A0, FRAMEWORK)]);
    }

    #[test]
    fn test_long_message_is_truncated_on_grapheme_boundary() {
        let reader = chat_module();
        let h = Harness::start(true, &reader);
        let mut end = h.server.accept();
        assert!(h.recv(&mut end).is_some());

        // 18-byte family clusters, 612 bytes total
        let family = "\u{1F468}\u{200D}\u{1F469}\u{200D}\u{1F467}";
        let message = family.repeat(34);
        assert!(message.len() > 600);

        end.send(&encode_request(&message));
        assert_eq!(h.recv(&mut end).as_deref(), Some("4242:chatted:true"));

        let calls = h.chat.calls();
        assert_eq!(calls.len(), 1);
        let sent = &calls[0].text;
        assert!(sent.len() <= 500);
        assert_eq!(sent.len() % family.len(), 0);
        assert_eq!(sent.as_str(), family.repeat(27));
        assert_eq!(calls[0].length as usize, sent.len() + 1);
    }

    #[test]
    fn test_not_logged_in_skips_native_call() {
        let reader = chat_module();
        let h = Harness::start(false, &reader);
        let mut end = h.server.accept();
        assert_eq!(h.recv(&mut end).as_deref(), Some("4242:scanned:true"));

        end.send(&encode_request("hello"));
        assert_eq!(h.recv(&mut end).as_deref(), Some("4242:chatted:false"));

        assert!(h.chat.calls().is_empty());
        assert!(h.chat.accessor_calls().is_empty());
    }

    #[test]
    fn test_failed_scan_reports_false_and_refuses_chat() {
        let reader = MockMemoryBuilder::new().with_size(0x400).build();
        let h = Harness::start(true, &reader);
        let mut end = h.server.accept();

        assert_eq!(h.recv(&mut end).as_deref(), Some("4242:scanned:false"));

        end.send(&encode_request("hello"));
        assert_eq!(h.recv(&mut end).as_deref(), Some("4242:chatted:false"));
        assert!(h.chat.calls().is_empty());
    }

    #[test]
    fn test_invalid_request_keeps_channel_open() {
        let reader = chat_module();
        let h = Harness::start(true, &reader);
        let mut end = h.server.accept();
        assert!(h.recv(&mut end).is_some());

        end.send("not base64 !!");
        assert_eq!(h.recv(&mut end).as_deref(), Some("4242:chatted:false"));

        end.send(&encode_request("after"));
        assert_eq!(h.recv(&mut end).as_deref(), Some("4242:chatted:true"));
        assert_eq!(h.chat.calls().len(), 1);
    }

    #[test]
    fn test_requests_answered_in_order() {
        let reader = chat_module();
        let h = Harness::start(true, &reader);
        let mut end = h.server.accept();
        assert!(h.recv(&mut end).is_some());

        for text in ["one", "two", "three"] {
            end.send(&encode_request(text));
        }
        for _ in 0..3 {
            assert_eq!(h.recv(&mut end).as_deref(), Some("4242:chatted:true"));
        }

        let texts: Vec<_> = h.chat.calls().into_iter().map(|c| c.text).collect();
        assert_eq!(texts, ["one", "two", "three"]);
    }
}

mod lifecycle_tests {
    use super::*;

    #[test]
    fn test_reconnects_announce_cached_scan() {
        let reader = CountingReader::new(chat_module());
        let mut h = Harness::start(true, &reader);
        let reads_after_scan = reader.reads.get();
        assert!(reads_after_scan > 0);

        let disconnects = 3;
        let mut announcements = Vec::new();
        for _ in 0..disconnects {
            let mut end = h.server.accept();
            announcements.push(h.recv(&mut end));
            drop(end);
        }

        let mut end = h.server.accept();
        assert!(h.bridge.wait_for_state(ChannelState::Connected, TIMEOUT));
        announcements.push(h.recv(&mut end));

        assert_eq!(announcements.len(), disconnects + 1);
        assert!(
            announcements
                .iter()
                .all(|a| a.as_deref() == Some("4242:scanned:true"))
        );
        assert_eq!(h.server.connect_attempts().get(), disconnects + 1);
        assert_eq!(reader.reads.get(), reads_after_scan);
    }

    #[test]
    fn test_scan_runs_once() {
        let reader = CountingReader::new(chat_module());
        let bridge = Bridge::new(
            Arc::new(StaticHost {
                logged_in: true,
                pid: PID,
            }),
            BridgeConfig::default(),
        );

        let first = bridge.scan(&reader);
        let reads = reader.reads.get();
        let second = bridge.scan(&reader);

        assert!(first.succeeded());
        assert_eq!(first, second);
        assert_eq!(reader.reads.get(), reads);
    }

    #[test]
    fn test_stop_disconnects_controller() {
        let reader = chat_module();
        let mut h = Harness::start(true, &reader);
        let mut end = h.server.accept();
        assert!(h.recv(&mut end).is_some());
        assert_eq!(h.bridge.channel_state(), ChannelState::Connected);

        h.bridge.stop();
        assert!(!h.bridge.is_running());
        assert_eq!(h.bridge.channel_state(), ChannelState::Disconnected);
        assert_eq!(h.recv(&mut end), None);

        h.bridge.stop();
    }

    #[test]
    fn test_stop_while_waiting_for_controller() {
        let reader = chat_module();
        let mut h = Harness::start(true, &reader);
        assert!(h.bridge.wait_for_state(ChannelState::Connecting, TIMEOUT));

        h.bridge.stop();
        assert!(h.server.connect_attempts().get() <= 1);
        assert_eq!(h.bridge.channel_state(), ChannelState::Disconnected);
    }

    #[test]
    fn test_second_start_is_ignored() {
        let reader = chat_module();
        let mut h = Harness::start(true, &reader);
        let (transport, _server) = memory_transport();

        h.bridge
            .start_with(&reader, transport, RecordingChat::new(0, 0))
            .unwrap();

        let mut end = h.server.accept();
        assert_eq!(h.recv(&mut end).as_deref(), Some("4242:scanned:true"));
    }
}

mod signature_file_tests {
    use super::*;
    use chatbridge_core::signature::SEND_CHAT;
    use chatbridge_core::{Signature, SignatureKind, builtin_signatures, save_signatures};

    fn bridge_with(signatures_file: std::path::PathBuf) -> Bridge {
        let config = BridgeConfig {
            signatures_file: Some(signatures_file),
            ..Default::default()
        };
        Bridge::new(
            Arc::new(StaticHost {
                logged_in: true,
                pid: PID,
            }),
            config,
        )
    }

    #[test]
    fn test_configured_signatures_replace_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("signatures.json");

        let mut set = builtin_signatures();
        set.version = "test".to_string();
        for signature in &mut set.signatures {
            if signature.name == SEND_CHAT {
                *signature = Signature::new(SEND_CHAT, "CC CC CC CC CC CC", SignatureKind::CodePointer);
            }
        }
        save_signatures(&path, &set).unwrap();

        let bridge = bridge_with(path);
        assert_eq!(bridge.signatures(), set);
        assert!(!bridge.scan(&chat_module()).succeeded());
    }

    #[test]
    fn test_builtin_file_resolves() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("signatures.json");
        save_signatures(&path, &builtin_signatures()).unwrap();

        let bridge = bridge_with(path);
        let outcome = bridge.scan(&chat_module());
        assert!(outcome.succeeded());
        assert_eq!(
            outcome.entry_points().map(|e| e.send_chat),
            Some(0x1_4000_0280)
        );
    }
}
