pub mod bridge;
pub mod channel;
pub mod chat;
pub mod config;
pub mod error;
pub mod host;
pub mod process;
pub mod signature;

pub use bridge::{Bridge, ScanOutcome};
pub use channel::{
    ChannelClient, ChannelHandle, ChannelState, Connection, MessageHandler, StatusKind,
    StatusMessage, Transport,
};
pub use chat::{ChatInjector, ChatLine, EntryPoints, InProcessChat, NativeChat};
pub use config::BridgeConfig;
pub use error::{Error, Result};
pub use host::{HostContext, StaticHost};
pub use process::{LocalMemoryReader, ModuleInfo, ReadMemory};
pub use signature::{
    Signature, SignatureKind, SignatureScanner, SignatureSet, builtin_signatures, load_signatures,
    save_signatures,
};
