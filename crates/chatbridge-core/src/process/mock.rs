//! Mock memory reader for testing
//!
//! Provides a configurable mock implementation of the ReadMemory trait
//! that reads from an in-memory buffer instead of the live module image.

use crate::error::{Error, Result};
use crate::process::ReadMemory;
use crate::process::pe::{
    DOS_MAGIC, LFANEW_OFFSET, NT_SIGNATURE, OPTIONAL_HEADER_SIZE_OFFSET, SECTION_COUNT_OFFSET,
    SECTION_HEADER_SIZE, SECTION_TABLE_OFFSET,
};

/// Offset of the NT headers written by `MockMemoryBuilder::write_pe_headers`
const MOCK_NT_OFFSET: usize = 0x80;
/// Optional header size written by `MockMemoryBuilder::write_pe_headers`
const MOCK_OPTIONAL_HEADER_SIZE: usize = 0xF0;

/// Mock memory reader for testing
///
/// The buffer doubles as the module image: `image_size()` is its length.
#[derive(Debug, Clone)]
pub struct MockMemoryReader {
    data: Vec<u8>,
    base: u64,
}

impl MockMemoryReader {
    /// Create a new mock reader with the given data at base address 0x1000
    pub fn new(data: Vec<u8>) -> Self {
        Self { data, base: 0x1000 }
    }

    /// Create a new mock reader with custom base address
    pub fn with_base(data: Vec<u8>, base: u64) -> Self {
        Self { data, base }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl ReadMemory for MockMemoryReader {
    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>> {
        if address < self.base {
            return Err(Error::memory_read_failed(
                address,
                format!("Address below base (base=0x{:X})", self.base),
            ));
        }
        let offset = (address - self.base) as usize;
        if offset + size > self.data.len() {
            return Err(Error::memory_read_failed(
                address,
                format!(
                    "Out of bounds: offset={}, size={}, len={}",
                    offset,
                    size,
                    self.data.len()
                ),
            ));
        }
        Ok(self.data[offset..offset + size].to_vec())
    }

    fn base_address(&self) -> u64 {
        self.base
    }

    fn image_size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Builder for creating test module images
#[derive(Debug, Clone, Default)]
pub struct MockMemoryBuilder {
    data: Vec<u8>,
    base: u64,
}

impl MockMemoryBuilder {
    /// Create a new builder with default base address (0x1000)
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            base: 0x1000,
        }
    }

    pub fn base(mut self, base: u64) -> Self {
        self.base = base;
        self
    }

    /// Pre-allocate buffer with zeros up to the specified size
    pub fn with_size(mut self, size: usize) -> Self {
        self.data.resize(size, 0);
        self
    }

    pub fn write_u16(mut self, offset: usize, value: u16) -> Self {
        self.ensure_size(offset + 2);
        self.data[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
        self
    }

    pub fn write_i32(mut self, offset: usize, value: i32) -> Self {
        self.ensure_size(offset + 4);
        self.data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
        self
    }

    pub fn write_u32(mut self, offset: usize, value: u32) -> Self {
        self.ensure_size(offset + 4);
        self.data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
        self
    }

    pub fn write_u64(mut self, offset: usize, value: u64) -> Self {
        self.ensure_size(offset + 8);
        self.data[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
        self
    }

    pub fn write_bytes(mut self, offset: usize, bytes: &[u8]) -> Self {
        self.ensure_size(offset + bytes.len());
        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
        self
    }

    /// Write DOS/NT headers and a section table.
    ///
    /// Each section is `(name, rva, virtual_size)`; names longer than
    /// eight bytes are cut.
    pub fn write_pe_headers(mut self, sections: &[(&str, u32, u32)]) -> Self {
        self = self
            .write_u16(0, DOS_MAGIC)
            .write_u32(LFANEW_OFFSET as usize, MOCK_NT_OFFSET as u32)
            .write_u32(MOCK_NT_OFFSET, NT_SIGNATURE)
            .write_u16(MOCK_NT_OFFSET + SECTION_COUNT_OFFSET as usize, sections.len() as u16)
            .write_u16(
                MOCK_NT_OFFSET + OPTIONAL_HEADER_SIZE_OFFSET as usize,
                MOCK_OPTIONAL_HEADER_SIZE as u16,
            );

        let table = MOCK_NT_OFFSET + SECTION_TABLE_OFFSET as usize + MOCK_OPTIONAL_HEADER_SIZE;
        for (index, (name, rva, size)) in sections.iter().enumerate() {
            let header = table + index * SECTION_HEADER_SIZE as usize;
            let mut raw_name = [0u8; 8];
            let len = name.len().min(8);
            raw_name[..len].copy_from_slice(&name.as_bytes()[..len]);
            self = self
                .write_bytes(header, &raw_name)
                .write_u32(header + 8, *size)
                .write_u32(header + 12, *rva);
        }
        self
    }

    pub fn build(self) -> MockMemoryReader {
        MockMemoryReader {
            data: self.data,
            base: self.base,
        }
    }

    fn ensure_size(&mut self, required: usize) {
        if self.data.len() < required {
            self.data.resize(required, 0);
        }
    }
}
