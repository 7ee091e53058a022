use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowPatchError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("NFQueue error: return code {0}")]
    Nfqueue(i32),

    #[error("NFTables command failed: {0}")]
    NftablesCmd(String),

    #[error("Not running as root; UID is {0}")]
    NotRoot(u32),

    #[error("Bind or initialization failed: {0}")]
    InitFailed(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Pattern must be exactly {expected} bytes, got {actual}: {pattern:?}")]
    InvalidPattern {
        pattern: String,
        expected: usize,
        actual: usize,
    },
}

/// Why a packet left the engine untouched.
///
/// None of these are fatal: every variant ends in an unmodified accept.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketError {
    #[error("no IPv4/TCP header context for packet")]
    MissingContext,

    #[error("payload of {0} bytes is shorter than the response window")]
    InsufficientPayload(usize),

    #[error("response window matches no recognized signature")]
    PatternMiss,

    #[error("no pending handler for flow")]
    RegistryMiss,

    #[error("unknown handler kind {0}")]
    UnknownHandlerKind(u32),

    #[error("handler failed: {0}")]
    HandlerFailed(#[from] HandlerError),
}

/// Failures reported by a response handler implementation.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerError {
    #[error("malformed request payload")]
    BadRequest,

    #[error("requested chunk {0} is past the end of the watched data")]
    ChunkOutOfRange(u32),
}
