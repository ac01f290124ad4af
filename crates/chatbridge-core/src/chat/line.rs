//! Native chat line record.
//!
//! All layout knowledge of the host's chat message structure lives here.
//!
//! # Record Layout
//!
//! ```text
//! Offset   Field        Size    Description
//! ──────────────────────────────────────────────────────
//! 0x00     text         8       Pointer to null-terminated UTF-8 bytes
//! 0x08     reserved1    8       Always 64
//! 0x10     length       8       Payload bytes + 1 (terminator)
//! 0x18     reserved2    8       Always 0
//! ```

use std::mem::{offset_of, size_of};

use unicode_segmentation::UnicodeSegmentation;

use crate::config::chat::{BUFFER_PADDING, MAX_MESSAGE_BYTES, RESERVED_FIELD_1, RESERVED_FIELD_2};

/// The fixed-layout record the host's send routine reads.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ChatMessageRecord {
    pub text: *const u8,
    pub reserved1: u64,
    pub length: u64,
    pub reserved2: u64,
}

pub const RECORD_SIZE: usize = 32;
pub const TEXT_OFFSET: usize = 0;
pub const RESERVED1_OFFSET: usize = 8;
pub const LENGTH_OFFSET: usize = 16;
pub const RESERVED2_OFFSET: usize = 24;

const _: () = {
    assert!(size_of::<ChatMessageRecord>() == RECORD_SIZE);
    assert!(offset_of!(ChatMessageRecord, text) == TEXT_OFFSET);
    assert!(offset_of!(ChatMessageRecord, reserved1) == RESERVED1_OFFSET);
    assert!(offset_of!(ChatMessageRecord, length) == LENGTH_OFFSET);
    assert!(offset_of!(ChatMessageRecord, reserved2) == RESERVED2_OFFSET);
};

/// A chat message ready to hand to native code.
///
/// Owns the text buffer the record points at; dropping the line frees it,
/// so the record is only valid while the line is alive.
#[derive(Debug)]
pub struct ChatLine {
    buffer: Box<[u8]>,
    payload_len: usize,
    record: ChatMessageRecord,
}

impl ChatLine {
    /// Encode `message`, truncating to 500 bytes on a grapheme boundary.
    pub fn new(message: &str) -> Self {
        let text = truncate_graphemes(message, MAX_MESSAGE_BYTES);
        let payload = text.as_bytes();

        // Zeroed, so the terminator at payload.len() is already in place.
        let mut buffer = vec![0u8; payload.len() + BUFFER_PADDING].into_boxed_slice();
        buffer[..payload.len()].copy_from_slice(payload);

        let record = ChatMessageRecord {
            text: buffer.as_ptr(),
            reserved1: RESERVED_FIELD_1,
            length: (payload.len() + 1) as u64,
            reserved2: RESERVED_FIELD_2,
        };

        Self {
            buffer,
            payload_len: payload.len(),
            record,
        }
    }

    pub fn record(&self) -> &ChatMessageRecord {
        &self.record
    }

    /// Payload bytes, without the terminator.
    pub fn payload(&self) -> &[u8] {
        &self.buffer[..self.payload_len]
    }

    /// Payload as text. Always valid UTF-8 since truncation keeps whole graphemes.
    pub fn text(&self) -> &str {
        std::str::from_utf8(self.payload()).unwrap_or_default()
    }

    /// Full allocation, padding included.
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    /// Serialise the record into the head of `out` (little-endian, x64 layout).
    ///
    /// Returns `false` when `out` is smaller than the record.
    pub fn write_record(&self, out: &mut [u8]) -> bool {
        if out.len() < RECORD_SIZE {
            return false;
        }
        let fields = [
            (TEXT_OFFSET, self.record.text as u64),
            (RESERVED1_OFFSET, self.record.reserved1),
            (LENGTH_OFFSET, self.record.length),
            (RESERVED2_OFFSET, self.record.reserved2),
        ];
        for (offset, value) in fields {
            out[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
        }
        true
    }
}

/// Keep whole grapheme clusters while the running UTF-8 length stays within `max_bytes`.
pub fn truncate_graphemes(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }

    let mut end = 0;
    for grapheme in text.graphemes(true) {
        if end + grapheme.len() > max_bytes {
            break;
        }
        end += grapheme.len();
    }
    &text[..end]
}
