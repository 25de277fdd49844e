//! Error types for bridge operations

use thiserror::Error;

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while validating, dispatching or running a protocol
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed, missing or out-of-range input, detected before any engine work
    #[error("Bad argument: {0}")]
    BadArgument(String),

    /// Operation not available for the given configuration
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Lookup failure, e.g. an unknown curve identifier
    #[error("Not found: {0}")]
    NotFound(String),

    /// The transport reported a failure or returned malformed data
    #[error("Transport failure: {0}")]
    Transport(String),

    /// Engine-internal rejection, including proof and signature verification failures
    #[error("Cryptographic error: {0}")]
    Crypto(String),

    /// An abort-detecting signing run produced an inconsistent signature.
    /// The key share must be treated as compromised and retired.
    #[error("Possible key leak detected")]
    PossibleKeyLeak,

    /// An output buffer could not be allocated
    #[error("Allocation failed")]
    AllocationFailed,

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization error
    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

impl Error {
    /// Boundary status code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::BadArgument(_)
            | Error::AllocationFailed
            | Error::Serialization(_)
            | Error::Deserialization(_) => ErrorCode::BadArgument,
            Error::Unsupported(_) => ErrorCode::Unsupported,
            Error::NotFound(_) => ErrorCode::NotFound,
            Error::Transport(_) => ErrorCode::Transport,
            Error::Crypto(_) => ErrorCode::Crypto,
            Error::PossibleKeyLeak => ErrorCode::PossibleKeyLeak,
        }
    }

    /// Whether the failure came from the transport rather than the caller or the engine
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_))
    }
}

/// Stable status codes reported at the foreign-function boundary.
///
/// Values are the engine's 32-bit codes reinterpreted as signed integers,
/// so every failure is negative and success is zero.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Success = 0,
    BadArgument = 0xff01_0002_u32 as i32,
    Unsupported = 0xff01_0005_u32 as i32,
    NotFound = 0xff01_0006_u32 as i32,
    Transport = 0xff03_0001_u32 as i32,
    Crypto = 0xff04_0001_u32 as i32,
    PossibleKeyLeak = 0xff04_0002_u32 as i32,
}

impl ErrorCode {
    /// Raw integer value
    pub const fn as_i32(self) -> i32 {
        self as i32
    }

    /// Map a raw status back to a known code
    pub fn from_i32(value: i32) -> Option<Self> {
        [
            ErrorCode::Success,
            ErrorCode::BadArgument,
            ErrorCode::Unsupported,
            ErrorCode::NotFound,
            ErrorCode::Transport,
            ErrorCode::Crypto,
            ErrorCode::PossibleKeyLeak,
        ]
        .into_iter()
        .find(|code| code.as_i32() == value)
    }
}

impl From<ErrorCode> for i32 {
    fn from(code: ErrorCode) -> Self {
        code.as_i32()
    }
}

impl<T> From<&Result<T>> for ErrorCode {
    fn from(result: &Result<T>) -> Self {
        match result {
            Ok(_) => ErrorCode::Success,
            Err(e) => e.code(),
        }
    }
}
