mod module;
pub mod pattern;
pub mod pe;
mod reader;

// Mock memory reader for testing (always available for unit and integration tests)
#[doc(hidden)]
pub mod mock;

pub use module::ModuleInfo;
pub use pe::SectionRange;
pub use reader::{LocalMemoryReader, ReadMemory};

#[doc(hidden)]
pub use mock::{MockMemoryBuilder, MockMemoryReader};
