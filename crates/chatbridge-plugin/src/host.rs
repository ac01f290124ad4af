use std::ffi::{CStr, c_char, c_void};
use std::path::PathBuf;

use chatbridge_core::HostContext;

/// Login-state query supplied by the plugin host.
pub type IsLoggedInFn = unsafe extern "C" fn(user_data: *mut c_void) -> bool;

/// What the plugin host passes to `chatbridge_start`.
///
/// Strings are NUL-terminated UTF-8 and only need to live for the duration of
/// the call; null means "not provided".
#[repr(C)]
pub struct HostCallbacks {
    pub is_logged_in: Option<IsLoggedInFn>,
    pub user_data: *mut c_void,
    pub log_dir: *const c_char,
    pub config_path: *const c_char,
}

impl HostCallbacks {
    /// # Safety
    /// The string fields must be null or point at NUL-terminated strings.
    pub unsafe fn log_dir(&self) -> Option<PathBuf> {
        // SAFETY: forwarded from the caller.
        unsafe { c_path(self.log_dir) }
    }

    /// # Safety
    /// See [`HostCallbacks::log_dir`].
    pub unsafe fn config_path(&self) -> Option<PathBuf> {
        // SAFETY: forwarded from the caller.
        unsafe { c_path(self.config_path) }
    }
}

unsafe fn c_path(ptr: *const c_char) -> Option<PathBuf> {
    if ptr.is_null() {
        return None;
    }
    // SAFETY: non-null and NUL-terminated per the caller's contract.
    let text = unsafe { CStr::from_ptr(ptr) }.to_str().ok()?;
    (!text.is_empty()).then(|| PathBuf::from(text))
}

/// `HostContext` backed by the host's callback.
///
/// The host guarantees the callback and its `user_data` stay valid and
/// thread-safe until `chatbridge_stop` returns.
pub struct CallbackHost {
    is_logged_in: IsLoggedInFn,
    user_data: usize,
}

impl CallbackHost {
    pub fn new(is_logged_in: IsLoggedInFn, user_data: *mut c_void) -> Self {
        Self {
            is_logged_in,
            user_data: user_data as usize,
        }
    }
}

impl HostContext for CallbackHost {
    fn is_logged_in(&self) -> bool {
        // SAFETY: valid until stop, per the host contract above.
        unsafe { (self.is_logged_in)(self.user_data as *mut c_void) }
    }
}
