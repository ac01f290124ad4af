//! C ABI surface loaded by the plugin host.
//!
//! The host calls `chatbridge_start` once after loading the library and
//! `chatbridge_stop` before unloading it. Both are safe to call repeatedly.

mod host;
mod logging;

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Context, Result, bail};
use chatbridge_core::{Bridge, BridgeConfig, HostContext};
use tracing::{error, info};

pub use host::{CallbackHost, HostCallbacks, IsLoggedInFn};

static BRIDGE: Mutex<Option<Bridge>> = Mutex::new(None);

fn bridge_slot() -> MutexGuard<'static, Option<Bridge>> {
    BRIDGE.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Create and start the bridge unless one is already running.
pub fn start(host: Arc<dyn HostContext>, config: BridgeConfig) -> Result<()> {
    let mut slot = bridge_slot();
    if slot.is_some() {
        info!("Already loaded");
        return Ok(());
    }

    let mut bridge = Bridge::new(host, config);
    bridge.start().context("failed to start chat bridge")?;
    *slot = Some(bridge);
    Ok(())
}

/// Stop and drop the running bridge, if any.
pub fn stop() {
    let bridge = bridge_slot().take();
    if let Some(mut bridge) = bridge {
        bridge.stop();
    }
}

pub fn is_running() -> bool {
    bridge_slot().is_some()
}

unsafe fn start_from_host(callbacks: *const HostCallbacks) -> Result<()> {
    // SAFETY: the host passes null or a valid `HostCallbacks`.
    let Some(callbacks) = (unsafe { callbacks.as_ref() }) else {
        bail!("no host callbacks");
    };
    // SAFETY: string fields follow the `HostCallbacks` contract.
    let (log_dir, config_path) = unsafe { (callbacks.log_dir(), callbacks.config_path()) };

    logging::init(log_dir.as_deref());

    let Some(is_logged_in) = callbacks.is_logged_in else {
        bail!("host did not provide a login-state callback");
    };
    let host = Arc::new(CallbackHost::new(is_logged_in, callbacks.user_data));
    let config = config_path
        .map(BridgeConfig::load_or_default)
        .unwrap_or_default();

    start(host, config)
}

/// Start the bridge. Returns `false` if it could not be started.
///
/// # Safety
/// `callbacks` must be null or point at a valid `HostCallbacks` for the
/// duration of the call. The login callback must remain callable from any
/// thread until `chatbridge_stop` returns.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn chatbridge_start(callbacks: *const HostCallbacks) -> bool {
    // SAFETY: forwarded from the caller.
    let result = panic::catch_unwind(AssertUnwindSafe(|| unsafe { start_from_host(callbacks) }));
    match result {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            error!("Load failed: {:#}", e);
            false
        }
        Err(_) => {
            error!("Load failed: panic during start");
            false
        }
    }
}

/// Stop the bridge and wait (bounded) for the channel to close.
#[unsafe(no_mangle)]
pub extern "C" fn chatbridge_stop() {
    if panic::catch_unwind(stop).is_err() {
        error!("Unload failed: panic during stop");
    }
}
