//! Configuration.
//!
//! This module contains:
//! - `BridgeConfig` - runtime settings loaded from an optional JSON file
//! - Chat record layout constants
//! - Signature scan constants
//! - Channel naming and timing constants

mod bridge;

pub use bridge::*;

/// Chat record layout constants.
///
/// These values describe an external binary contract that has never been
/// documented. They were established empirically and must be kept literally.
pub mod chat {
    /// Maximum UTF-8 byte length of a message after truncation.
    pub const MAX_MESSAGE_BYTES: usize = 500;

    /// Extra bytes allocated past the payload (the terminator lives here too).
    pub const BUFFER_PADDING: usize = 30;

    /// Value of the first reserved record field (offset 8).
    pub const RESERVED_FIELD_1: u64 = 64;

    /// Value of the second reserved record field (offset 24).
    pub const RESERVED_FIELD_2: u64 = 0;

    /// Size of the scratch buffer the record is copied into before the call.
    pub const SCRATCH_BUFFER_SIZE: usize = 400;
}

/// Signature scan configuration.
pub mod scan {
    /// Bytes read per chunk while scanning a module section.
    pub const CHUNK_SIZE: usize = 0x10_0000;

    /// Length of a RIP-relative displacement operand.
    pub const DISPLACEMENT_LEN: usize = 4;

    /// Length of a `call rel32` / `jmp rel32` instruction.
    pub const BRANCH_LEN: u64 = 5;
}

/// Channel naming and timing.
pub mod channel {
    use std::time::Duration;

    /// Pipe name shared by the controller and the injected client.
    pub const PIPE_NAME: &str = "BardMusicPlayer-Grunt-Dalamud";

    /// Delay between connect attempts while no server is listening.
    ///
    /// A reconnect after a lost connection is attempted immediately; this only
    /// paces attempts that fail outright.
    pub const CONNECT_RETRY_DELAY: Duration = Duration::from_millis(500);

    /// Upper bound on the graceful disconnect during shutdown.
    pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);
}
