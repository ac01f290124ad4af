#![cfg_attr(not(target_os = "windows"), allow(dead_code, unused_variables))]

use crate::error::{Error, Result};
use crate::process::ModuleInfo;

#[cfg(target_os = "windows")]
use windows::Win32::System::Diagnostics::Debug::ReadProcessMemory;
#[cfg(target_os = "windows")]
use windows::Win32::System::Threading::GetCurrentProcess;

/// Trait for reading memory from the host process or a buffer
///
/// This trait enables mocking for tests and abstracts over different memory sources.
pub trait ReadMemory {
    /// Read raw bytes from memory at the given address
    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>>;

    /// Get the base address of the main module image
    fn base_address(&self) -> u64;

    /// Get the size of the main module image
    fn image_size(&self) -> u64;

    /// Check whether an address falls inside the main module image
    fn contains(&self, address: u64) -> bool {
        let base = self.base_address();
        address >= base && address - base < self.image_size()
    }

    fn read_u16(&self, address: u64) -> Result<u16> {
        let bytes = self.read_bytes(address, 2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    fn read_i32(&self, address: u64) -> Result<i32> {
        let bytes = self.read_bytes(address, 4)?;
        Ok(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_u32(&self, address: u64) -> Result<u32> {
        let bytes = self.read_bytes(address, 4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_u64(&self, address: u64) -> Result<u64> {
        let bytes = self.read_bytes(address, 8)?;
        Ok(u64::from_le_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]))
    }

    /// Read a pointer-sized value (the host is always 64-bit)
    fn read_pointer(&self, address: u64) -> Result<u64> {
        self.read_u64(address)
    }
}

/// Reads the memory of the process this library is loaded into.
///
/// Reads go through `ReadProcessMemory` on the current process rather than
/// raw dereferences, so an unmapped or protected page yields an error
/// instead of an access violation.
#[derive(Debug, Clone, Copy)]
pub struct LocalMemoryReader {
    module: ModuleInfo,
}

impl LocalMemoryReader {
    pub fn new(module: ModuleInfo) -> Self {
        Self { module }
    }

    pub fn module(&self) -> &ModuleInfo {
        &self.module
    }

    #[cfg(target_os = "windows")]
    fn read_bytes_impl(&self, address: u64, size: usize) -> Result<Vec<u8>> {
        let mut buffer = vec![0u8; size];
        let mut bytes_read = 0;

        // SAFETY: ReadProcessMemory is called with:
        // - The pseudo handle of the current process, which never needs closing
        // - An arbitrary address; invalid ranges make the call fail rather than fault
        // - A properly allocated buffer of the requested size
        unsafe {
            ReadProcessMemory(
                GetCurrentProcess(),
                address as *const _,
                buffer.as_mut_ptr() as *mut _,
                size,
                Some(&mut bytes_read),
            )
            .map_err(|e| Error::memory_read_failed(address, e.to_string()))?;
        }

        if bytes_read != size {
            return Err(Error::memory_read_failed(
                address,
                format!("Expected {} bytes, read {}", size, bytes_read),
            ));
        }

        Ok(buffer)
    }

    #[cfg(not(target_os = "windows"))]
    fn read_bytes_impl(&self, address: u64, _size: usize) -> Result<Vec<u8>> {
        Err(Error::memory_read_failed(
            address,
            "Windows only: memory reading not supported on this platform",
        ))
    }
}

impl ReadMemory for LocalMemoryReader {
    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>> {
        self.read_bytes_impl(address, size)
    }

    fn base_address(&self) -> u64 {
        self.module.base_address
    }

    fn image_size(&self) -> u64 {
        self.module.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::mock::MockMemoryReader;

    #[test]
    fn test_read_i32_negative() {
        let reader = MockMemoryReader::new(vec![0xFE, 0xFF, 0xFF, 0xFF]);
        assert_eq!(reader.read_i32(0x1000).unwrap(), -2);
    }

    #[test]
    fn test_read_u16_and_u32() {
        let reader = MockMemoryReader::new(vec![0x4D, 0x5A, 0x00, 0x00, 0x78, 0x56, 0x34, 0x12]);
        assert_eq!(reader.read_u16(0x1000).unwrap(), 0x5A4D);
        assert_eq!(reader.read_u32(0x1004).unwrap(), 0x12345678);
    }

    #[test]
    fn test_read_pointer() {
        let reader =
            MockMemoryReader::new(vec![0xEF, 0xCD, 0xAB, 0x90, 0x78, 0x56, 0x34, 0x12]);
        assert_eq!(reader.read_pointer(0x1000).unwrap(), 0x1234567890ABCDEF);
    }

    #[test]
    fn test_read_out_of_bounds() {
        let reader = MockMemoryReader::new(vec![0x01, 0x02]);
        assert!(reader.read_u32(0x1000).is_err());
    }

    #[test]
    fn test_contains() {
        let reader = MockMemoryReader::new(vec![0; 0x10]);
        assert!(reader.contains(0x1000));
        assert!(reader.contains(0x100F));
        assert!(!reader.contains(0x1010));
        assert!(!reader.contains(0xFFF));
    }

    #[cfg(not(target_os = "windows"))]
    #[test]
    fn test_local_reader_unsupported() {
        let reader = LocalMemoryReader::new(ModuleInfo {
            pid: 1,
            base_address: 0x1000,
            size: 0x100,
        });
        assert!(reader.read_bytes(0x1000, 4).is_err());
        assert_eq!(reader.image_size(), 0x100);
    }
}
