#![cfg_attr(not(target_os = "windows"), allow(dead_code))]

use crate::error::{Error, Result};

#[cfg(target_os = "windows")]
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
#[cfg(target_os = "windows")]
use windows::Win32::System::ProcessStatus::{GetModuleInformation, MODULEINFO};
#[cfg(target_os = "windows")]
use windows::Win32::System::Threading::GetCurrentProcess;
#[cfg(target_os = "windows")]
use windows::core::PCWSTR;

/// The primary executable module of the process this library is loaded into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleInfo {
    pub pid: u32,
    pub base_address: u64,
    pub size: u64,
}

impl ModuleInfo {
    pub fn end_address(&self) -> u64 {
        self.base_address + self.size
    }
}

#[cfg(target_os = "windows")]
impl ModuleInfo {
    /// Describe the main executable image of the current process.
    pub fn current() -> Result<Self> {
        // SAFETY: A null module name asks for the handle of the executable that
        // created the process. The handle is not reference counted and must not be freed.
        let module = unsafe {
            GetModuleHandleW(PCWSTR::null()).map_err(|e| {
                tracing::debug!("GetModuleHandleW failed: {}", e);
                Error::ModuleNotFound(e.to_string())
            })?
        };

        let mut info = MODULEINFO::default();
        // SAFETY: GetModuleInformation is called with the current-process pseudo handle,
        // a module handle owned by this process, and a properly sized MODULEINFO.
        unsafe {
            GetModuleInformation(
                GetCurrentProcess(),
                module,
                &mut info,
                std::mem::size_of::<MODULEINFO>() as u32,
            )
            .map_err(|e| Error::ModuleNotFound(format!("Failed to get module info: {}", e)))?;
        }

        Ok(Self {
            pid: std::process::id(),
            base_address: info.lpBaseOfDll as u64,
            size: info.SizeOfImage as u64,
        })
    }
}

#[cfg(not(target_os = "windows"))]
impl ModuleInfo {
    pub fn current() -> Result<Self> {
        Err(Error::ModuleNotFound(
            "Windows only: module access not supported on this platform".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_end_address() {
        let module = ModuleInfo {
            pid: 42,
            base_address: 0x1_4000_0000,
            size: 0x2000,
        };
        assert_eq!(module.end_address(), 0x1_4000_2000);
    }

    #[cfg(not(target_os = "windows"))]
    #[test]
    fn test_current_unsupported() {
        assert!(matches!(
            ModuleInfo::current(),
            Err(Error::ModuleNotFound(_))
        ));
    }
}
