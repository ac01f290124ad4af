#![cfg_attr(
    not(all(target_os = "windows", target_arch = "x86_64")),
    allow(unused_variables)
)]

use crate::error::{Error, Result};
use crate::process::{LocalMemoryReader, ReadMemory};

#[cfg(all(target_os = "windows", target_arch = "x86_64"))]
use std::ffi::c_void;

#[cfg(all(target_os = "windows", target_arch = "x86_64"))]
type UiAccessorFn = unsafe extern "system" fn(framework: *mut c_void) -> *mut c_void;

#[cfg(all(target_os = "windows", target_arch = "x86_64"))]
type SendChatFn = unsafe extern "system" fn(
    ui_module: *mut c_void,
    message: *mut c_void,
    unused: *mut c_void,
    flags: u8,
);

/// Calls into the host's internal functions.
///
/// Split out so the injector's control flow can be tested without a host.
pub trait NativeChat: Send + Sync {
    /// Read a pointer from host memory.
    fn read_pointer(&self, address: u64) -> Result<u64>;

    /// Call the UI module accessor.
    ///
    /// # Safety
    ///
    /// `accessor` must be the resolved entry point of the accessor function and
    /// `framework` the instance read from its static slot.
    unsafe fn ui_module(&self, accessor: u64, framework: u64) -> Result<u64>;

    /// Call the send-chat routine with a record serialised into `message`.
    ///
    /// # Safety
    ///
    /// `entry` must be the resolved send-chat entry point, `ui_module` a live
    /// instance returned by the accessor, and `message` must hold a record whose
    /// text pointer stays valid for the duration of the call.
    unsafe fn send_chat(&self, entry: u64, ui_module: u64, message: &mut [u8]) -> Result<()>;
}

/// Direct calls into the process this library is loaded into.
#[derive(Debug, Clone, Copy)]
pub struct InProcessChat {
    reader: LocalMemoryReader,
}

impl InProcessChat {
    pub fn new(reader: LocalMemoryReader) -> Self {
        Self { reader }
    }
}

impl NativeChat for InProcessChat {
    fn read_pointer(&self, address: u64) -> Result<u64> {
        self.reader.read_pointer(address)
    }

    #[cfg(all(target_os = "windows", target_arch = "x86_64"))]
    unsafe fn ui_module(&self, accessor: u64, framework: u64) -> Result<u64> {
        // SAFETY: the caller guarantees `accessor` is the accessor's entry point,
        // whose ABI matches UiAccessorFn.
        let accessor: UiAccessorFn = unsafe { std::mem::transmute(accessor as usize) };
        let ui = unsafe { accessor(framework as *mut c_void) };
        Ok(ui as u64)
    }

    #[cfg(not(all(target_os = "windows", target_arch = "x86_64")))]
    unsafe fn ui_module(&self, accessor: u64, framework: u64) -> Result<u64> {
        Err(Error::native_call_fault(
            "Windows x64 only: native calls not supported on this platform",
        ))
    }

    #[cfg(all(target_os = "windows", target_arch = "x86_64"))]
    unsafe fn send_chat(&self, entry: u64, ui_module: u64, message: &mut [u8]) -> Result<()> {
        // SAFETY: the caller guarantees `entry` is the send routine's entry point,
        // whose ABI matches SendChatFn, and that the record in `message` is valid.
        let send: SendChatFn = unsafe { std::mem::transmute(entry as usize) };
        unsafe {
            send(
                ui_module as *mut c_void,
                message.as_mut_ptr() as *mut c_void,
                std::ptr::null_mut(),
                0,
            );
        }
        Ok(())
    }

    #[cfg(not(all(target_os = "windows", target_arch = "x86_64")))]
    unsafe fn send_chat(&self, entry: u64, ui_module: u64, message: &mut [u8]) -> Result<()> {
        Err(Error::native_call_fault(
            "Windows x64 only: native calls not supported on this platform",
        ))
    }
}
