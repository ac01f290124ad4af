use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Main module not found: {0}")]
    ModuleNotFound(String),

    #[error("Failed to read process memory at address {address:#x}: {message}")]
    MemoryReadFailed { address: u64, message: String },

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Signature not found: {0}")]
    SignatureNotFound(String),

    #[error("Entry points are not resolved")]
    NotResolved,

    #[error("UI module accessor returned null")]
    UiModuleUnavailable,

    #[error("User is not logged in")]
    NotLoggedIn,

    #[error("Failed to decode request: {0}")]
    Decode(String),

    #[error("Native call faulted: {0}")]
    NativeCallFault(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn memory_read_failed(address: u64, message: impl Into<String>) -> Self {
        Error::MemoryReadFailed {
            address,
            message: message.into(),
        }
    }

    pub fn signature_not_found(name: impl Into<String>) -> Self {
        Error::SignatureNotFound(name.into())
    }

    pub fn native_call_fault(message: impl Into<String>) -> Self {
        Error::NativeCallFault(message.into())
    }
}

impl From<base64::DecodeError> for Error {
    fn from(e: base64::DecodeError) -> Self {
        Error::Decode(format!("invalid base64: {}", e))
    }
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(e: std::string::FromUtf8Error) -> Self {
        Error::Decode(format!("invalid UTF-8: {}", e))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
