//! Recording `NativeChat` fake.
//!
//! Captures every call the injector makes instead of calling into a host.

use std::sync::{Arc, Mutex};

use crate::chat::NativeChat;
use crate::chat::line::{LENGTH_OFFSET, RECORD_SIZE, RESERVED1_OFFSET, RESERVED2_OFFSET, TEXT_OFFSET};
use crate::error::{Error, Result};

/// One captured send-chat call, with the record decoded from the scratch buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentChat {
    pub entry: u64,
    pub ui_module: u64,
    pub text: String,
    pub length: u64,
    pub reserved1: u64,
    pub reserved2: u64,
    pub scratch_len: usize,
}

/// Clones share their call logs, so a test can keep one while the injector owns another.
#[derive(Debug, Clone, Default)]
pub struct RecordingChat {
    framework: u64,
    ui_module: u64,
    panic_on_send: bool,
    accessor_calls: Arc<Mutex<Vec<(u64, u64)>>>,
    calls: Arc<Mutex<Vec<SentChat>>>,
}

impl RecordingChat {
    /// `framework` is what the static slot holds; `ui_module` what the accessor returns.
    pub fn new(framework: u64, ui_module: u64) -> Self {
        Self {
            framework,
            ui_module,
            ..Default::default()
        }
    }

    /// Make the send call panic, as a faulting host function would.
    pub fn panicking(mut self) -> Self {
        self.panic_on_send = true;
        self
    }

    pub fn calls(&self) -> Vec<SentChat> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn accessor_calls(&self) -> Vec<(u64, u64)> {
        self.accessor_calls
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default()
    }
}

fn field(message: &[u8], offset: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&message[offset..offset + 8]);
    u64::from_le_bytes(bytes)
}

impl NativeChat for RecordingChat {
    fn read_pointer(&self, _address: u64) -> Result<u64> {
        Ok(self.framework)
    }

    unsafe fn ui_module(&self, accessor: u64, framework: u64) -> Result<u64> {
        if let Ok(mut calls) = self.accessor_calls.lock() {
            calls.push((accessor, framework));
        }
        Ok(self.ui_module)
    }

    unsafe fn send_chat(&self, entry: u64, ui_module: u64, message: &mut [u8]) -> Result<()> {
        if self.panic_on_send {
            panic!("access violation in send chat");
        }
        if message.len() < RECORD_SIZE {
            return Err(Error::native_call_fault("record does not fit scratch buffer"));
        }

        let text_ptr = field(message, TEXT_OFFSET) as *const u8;
        let length = field(message, LENGTH_OFFSET);
        // SAFETY: the caller guarantees the record's text pointer is live for
        // this call and `length` counts the payload plus its terminator.
        let payload = unsafe { std::slice::from_raw_parts(text_ptr, length as usize - 1) };

        let sent = SentChat {
            entry,
            ui_module,
            text: String::from_utf8_lossy(payload).into_owned(),
            length,
            reserved1: field(message, RESERVED1_OFFSET),
            reserved2: field(message, RESERVED2_OFFSET),
            scratch_len: message.len(),
        };
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(sent);
        }
        Ok(())
    }
}
