//! Minimal PE header walking for a mapped module image.
//!
//! Only what the signature scanner needs: locating a named section
//! (normally `.text`) relative to the image base.
//!
//! # Header Layout
//!
//! ```text
//! Offset                  Field                    Size
//! ────────────────────────────────────────────────────────
//! 0x00                    DOS magic "MZ"           2
//! 0x3C                    e_lfanew                 4
//! e_lfanew                "PE\0\0"                 4
//! e_lfanew + 0x06         NumberOfSections         2
//! e_lfanew + 0x14         SizeOfOptionalHeader     2
//! e_lfanew + 0x18 + opt   Section table            40 each
//! ```

use crate::error::{Error, Result};
use crate::process::ReadMemory;

pub const DOS_MAGIC: u16 = 0x5A4D;
pub const NT_SIGNATURE: u32 = 0x0000_4550;
pub const LFANEW_OFFSET: u64 = 0x3C;
pub const SECTION_COUNT_OFFSET: u64 = 0x06;
pub const OPTIONAL_HEADER_SIZE_OFFSET: u64 = 0x14;
pub const SECTION_TABLE_OFFSET: u64 = 0x18;
pub const SECTION_HEADER_SIZE: u64 = 40;

const SECTION_NAME_LEN: usize = 8;
const SECTION_VIRTUAL_SIZE: u64 = 8;
const SECTION_VIRTUAL_ADDRESS: u64 = 12;

/// Absolute address range of a section in the mapped image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionRange {
    pub start: u64,
    pub size: u64,
}

impl SectionRange {
    pub fn end(&self) -> u64 {
        self.start + self.size
    }

    pub fn contains(&self, address: u64) -> bool {
        address >= self.start && address < self.end()
    }
}

/// Locate a section by name in the image mapped at `reader.base_address()`.
///
/// Returns `Ok(None)` when the headers are valid but no section has that name.
pub fn find_section<R: ReadMemory + ?Sized>(reader: &R, name: &str) -> Result<Option<SectionRange>> {
    let base = reader.base_address();

    if reader.read_u16(base)? != DOS_MAGIC {
        return Err(Error::memory_read_failed(base, "Missing DOS header"));
    }

    let nt = base + reader.read_u32(base + LFANEW_OFFSET)? as u64;
    if reader.read_u32(nt)? != NT_SIGNATURE {
        return Err(Error::memory_read_failed(nt, "Missing NT header"));
    }

    let count = reader.read_u16(nt + SECTION_COUNT_OFFSET)? as u64;
    let optional_size = reader.read_u16(nt + OPTIONAL_HEADER_SIZE_OFFSET)? as u64;
    let table = nt + SECTION_TABLE_OFFSET + optional_size;

    for index in 0..count {
        let header = table + index * SECTION_HEADER_SIZE;
        let raw_name = reader.read_bytes(header, SECTION_NAME_LEN)?;
        let len = raw_name.iter().position(|&b| b == 0).unwrap_or(SECTION_NAME_LEN);
        if &raw_name[..len] != name.as_bytes() {
            continue;
        }

        let size = reader.read_u32(header + SECTION_VIRTUAL_SIZE)? as u64;
        let rva = reader.read_u32(header + SECTION_VIRTUAL_ADDRESS)? as u64;
        return Ok(Some(SectionRange {
            start: base + rva,
            size,
        }));
    }

    Ok(None)
}
