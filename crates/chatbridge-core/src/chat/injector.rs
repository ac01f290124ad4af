use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, error};

use crate::channel::protocol::decode_request;
use crate::chat::{ChatLine, NativeChat};
use crate::config::chat::SCRATCH_BUFFER_SIZE;
use crate::error::{Error, Result};
use crate::host::HostContext;
use crate::process::ReadMemory;
use crate::signature::{SEND_CHAT, SignatureScanner, SignatureSet, UI_ACCESSOR, UI_MODULE_STATIC};

/// Resolved addresses of the host's chat machinery.
///
/// Only produced by a successful scan, so holding one means all three are known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryPoints {
    pub ui_accessor: u64,
    pub send_chat: u64,
    pub ui_module_static: u64,
}

impl EntryPoints {
    pub fn resolve<R: ReadMemory + ?Sized>(reader: &R, signatures: &SignatureSet) -> Result<Self> {
        let scanner = SignatureScanner::new(reader);
        let entry_points = Self {
            ui_accessor: scanner.find(signatures.require(UI_ACCESSOR)?)?,
            send_chat: scanner.find(signatures.require(SEND_CHAT)?)?,
            ui_module_static: scanner.find(signatures.require(UI_MODULE_STATIC)?)?,
        };

        for (name, address) in [
            (UI_ACCESSOR, entry_points.ui_accessor),
            (SEND_CHAT, entry_points.send_chat),
            (UI_MODULE_STATIC, entry_points.ui_module_static),
        ] {
            if !reader.contains(address) {
                return Err(Error::InvalidSignature(format!(
                    "{} resolved outside the module (0x{:X})",
                    name, address
                )));
            }
        }

        Ok(entry_points)
    }
}

/// Submits chat lines through the host's own send routine.
pub struct ChatInjector<N: NativeChat> {
    entry_points: Option<EntryPoints>,
    native: N,
    host: Arc<dyn HostContext>,
}

impl<N: NativeChat> ChatInjector<N> {
    pub fn new(entry_points: Option<EntryPoints>, native: N, host: Arc<dyn HostContext>) -> Self {
        Self {
            entry_points,
            native,
            host,
        }
    }

    pub fn entry_points(&self) -> Option<&EntryPoints> {
        self.entry_points.as_ref()
    }

    pub fn native(&self) -> &N {
        &self.native
    }

    /// Send a base64-encoded chat request.
    ///
    /// `true` means the native call was issued with valid inputs; the host's
    /// routine returns nothing, so delivery itself cannot be confirmed.
    pub fn send_chat(&self, request: &str) -> bool {
        match self.try_send_chat(request) {
            Ok(()) => true,
            Err(Error::NotLoggedIn) => {
                debug!("SendChat skipped: not logged in");
                false
            }
            Err(e @ (Error::NotResolved | Error::UiModuleUnavailable)) => {
                error!("SendChat signature error: {}", e);
                false
            }
            Err(e) => {
                error!("SendChat error: {}", e);
                false
            }
        }
    }

    pub fn try_send_chat(&self, request: &str) -> Result<()> {
        if request.is_empty() {
            return Err(Error::Decode("empty request".to_string()));
        }
        if !self.host.is_logged_in() {
            return Err(Error::NotLoggedIn);
        }
        let entry_points = self.entry_points.ok_or(Error::NotResolved)?;

        let text = decode_request(request)?;

        let framework = self.native.read_pointer(entry_points.ui_module_static)?;
        // SAFETY: entry points come from a successful scan of this process's image.
        let ui_module = guard_native("UI module accessor", || unsafe {
            self.native.ui_module(entry_points.ui_accessor, framework)
        })?;
        if ui_module == 0 {
            return Err(Error::UiModuleUnavailable);
        }

        let line = ChatLine::new(&text);
        let mut scratch = vec![0u8; SCRATCH_BUFFER_SIZE];
        line.write_record(&mut scratch);

        // SAFETY: `line` owns the text buffer and outlives the call; the scratch
        // buffer is dropped (released) on every path after it returns.
        guard_native("send chat", || unsafe {
            self.native
                .send_chat(entry_points.send_chat, ui_module, &mut scratch)
        })?;

        debug!("Chat line issued ({} bytes)", line.payload().len());
        Ok(())
    }
}

fn guard_native<T>(what: &str, call: impl FnOnce() -> Result<T>) -> Result<T> {
    panic::catch_unwind(AssertUnwindSafe(call)).unwrap_or_else(|payload| {
        Err(Error::native_call_fault(format!(
            "{} panicked: {}",
            what,
            panic_message(payload.as_ref())
        )))
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}
