//! Chat injection: record encoding, native calls, and the send sequence.

mod injector;
pub mod line;
mod native;

// Recording NativeChat fake (always available for unit and integration tests)
#[doc(hidden)]
pub mod testing;

pub use injector::{ChatInjector, EntryPoints};
pub use line::{ChatLine, ChatMessageRecord, truncate_graphemes};
pub use native::{InProcessChat, NativeChat};
