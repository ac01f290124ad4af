use tracing::debug;

use crate::config::scan::{BRANCH_LEN, CHUNK_SIZE, DISPLACEMENT_LEN};
use crate::error::{Error, Result};
use crate::process::pattern::find_first;
use crate::process::pe::find_section;
use crate::process::{ReadMemory, SectionRange};
use crate::signature::{Signature, SignatureKind};

const CALL_REL32: u8 = 0xE8;
const JMP_REL32: u8 = 0xE9;

/// Finds signatures inside the code section of the main module.
///
/// Read-only: the scanner never writes to the memory it inspects.
pub struct SignatureScanner<'a, R: ReadMemory + ?Sized> {
    reader: &'a R,
    region: SectionRange,
}

impl<'a, R: ReadMemory + ?Sized> SignatureScanner<'a, R> {
    /// Scan `.text` when the PE headers can be read, otherwise the whole image.
    pub fn new(reader: &'a R) -> Self {
        let region = match find_section(reader, ".text") {
            Ok(Some(text)) => text,
            Ok(None) => {
                debug!("No .text section, scanning the whole image");
                Self::image_region(reader)
            }
            Err(e) => {
                debug!("PE headers unreadable ({}), scanning the whole image", e);
                Self::image_region(reader)
            }
        };
        Self { reader, region }
    }

    /// Scan an explicit address range.
    pub fn with_region(reader: &'a R, region: SectionRange) -> Self {
        Self { reader, region }
    }

    pub fn region(&self) -> SectionRange {
        self.region
    }

    fn image_region(reader: &R) -> SectionRange {
        SectionRange {
            start: reader.base_address(),
            size: reader.image_size(),
        }
    }

    /// Resolve a signature to an absolute address.
    pub fn find(&self, signature: &Signature) -> Result<u64> {
        let pattern = signature.pattern_bytes()?;
        let matched = self
            .scan(&pattern)?
            .ok_or_else(|| Error::signature_not_found(&signature.name))?;
        let anchor = matched.wrapping_add_signed(signature.offset);

        let address = match signature.kind {
            SignatureKind::CodePointer => self.follow_branch(anchor)?,
            SignatureKind::StaticDataPointer => {
                let disp_index = displacement_index(&pattern, signature.offset)
                    .ok_or_else(|| {
                        Error::InvalidSignature(format!(
                            "Signature '{}' has no displacement operand",
                            signature.name
                        ))
                    })?;
                let disp_addr = matched + disp_index as u64;
                let disp = self.reader.read_i32(disp_addr)?;
                (disp_addr + DISPLACEMENT_LEN as u64).wrapping_add_signed(disp as i64)
            }
        };

        debug!(
            "Signature {} ({}) resolved to 0x{:X} (match at 0x{:X})",
            signature.name, signature.kind, address, matched
        );
        Ok(address)
    }

    /// Return the address of the first match of `pattern` in the region.
    pub fn scan(&self, pattern: &[Option<u8>]) -> Result<Option<u64>> {
        let end = self.region.end();
        let mut addr = self.region.start;
        let mut tail: Vec<u8> = Vec::new();

        while addr < end {
            let read_size = ((end - addr) as usize).min(CHUNK_SIZE);
            let chunk = match self.reader.read_bytes(addr, read_size) {
                Ok(bytes) => bytes,
                Err(e) => {
                    if addr == self.region.start {
                        return Err(e);
                    }
                    debug!(
                        "Scan stopped at 0x{:X} ({:#x} bytes scanned): {}",
                        addr,
                        addr - self.region.start,
                        e
                    );
                    break;
                }
            };

            let mut data = Vec::with_capacity(tail.len() + chunk.len());
            data.extend_from_slice(&tail);
            data.extend_from_slice(&chunk);
            let data_base = addr - tail.len() as u64;

            if let Some(index) = find_first(&data, pattern) {
                return Ok(Some(data_base + index as u64));
            }

            let keep = pattern.len().saturating_sub(1).min(data.len());
            tail = data[data.len() - keep..].to_vec();
            addr += read_size as u64;
        }

        Ok(None)
    }

    fn follow_branch(&self, address: u64) -> Result<u64> {
        let opcode = self.reader.read_bytes(address, 1)?[0];
        if opcode != CALL_REL32 && opcode != JMP_REL32 {
            return Ok(address);
        }

        let rel = self.reader.read_i32(address + 1)?;
        let target = (address + BRANCH_LEN).wrapping_add_signed(rel as i64);
        if !self.reader.contains(target) {
            return Err(Error::InvalidSignature(format!(
                "Branch at 0x{:X} leaves the module (target 0x{:X})",
                address, target
            )));
        }
        Ok(target)
    }
}

/// Index of the first run of four wildcards at or after `offset`.
fn displacement_index(pattern: &[Option<u8>], offset: i64) -> Option<usize> {
    let start = usize::try_from(offset).unwrap_or(0);
    (start..pattern.len().saturating_sub(DISPLACEMENT_LEN - 1))
        .find(|&i| pattern[i..i + DISPLACEMENT_LEN].iter().all(Option::is_none))
}
