//! Error type shared by the dispatcher and the context manager.

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Negative result codes of the native rendering layer.
pub mod code {
    /// Success.
    pub const SUCCESS: i32 = 0;
    /// The requested configuration is not supported.
    pub const NOT_SUPPORTED: i32 = -1;
    /// The operation could not be performed right now.
    pub const FAILED_NOT_DEFERRED: i32 = -2;
    /// A handle was passed that names no live object.
    pub const INVALID_TARGET: i32 = -3;
    /// A named target (canvas) does not exist.
    pub const UNKNOWN_TARGET: i32 = -4;
    /// An argument was malformed.
    pub const INVALID_PARAM: i32 = -5;
    /// Generic failure.
    pub const FAILED: i32 = -6;
}

/// Errors reported by dispatch and context operations.
///
/// Failures are returned to the immediate caller; nothing here is retried.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The handle was never created by this manager, or is null.
    #[error("invalid context handle {0}")]
    InvalidHandle(i32),

    /// The requested context configuration cannot be satisfied.
    #[error("unsupported context configuration: {0}")]
    UnsupportedConfiguration(String),

    /// A thread tried to use a context it cannot hold: the context refuses
    /// proxying, or another thread has since made it current.
    #[error("context {0} is not available to this thread")]
    AffinityUnavailable(i32),

    /// An argument was out of range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// No canvas is registered under this name.
    #[error("canvas not found: {0}")]
    UnknownCanvas(String),

    /// The owner loop has shut down; the request was discarded unexecuted.
    #[error("owner thread is unreachable")]
    OwnerUnreachable,

    /// The callable panicked while running on the owner thread.
    #[error("callable panicked on the owner thread")]
    Panicked,

    /// No process-wide owner has been installed.
    #[error("no owner thread has been established")]
    OwnerNotEstablished,

    /// A process-wide owner is already installed.
    #[error("an owner thread is already established")]
    OwnerAlreadyEstablished,

    /// The owner thread could not be spawned.
    #[error("failed to spawn owner thread: {0}")]
    Spawn(#[from] std::io::Error),
}

impl Error {
    /// The native result code for this error; always negative.
    pub fn code(&self) -> i32 {
        match self {
            Error::InvalidHandle(_) => code::INVALID_TARGET,
            Error::UnsupportedConfiguration(_) => code::NOT_SUPPORTED,
            Error::AffinityUnavailable(_) => code::FAILED_NOT_DEFERRED,
            Error::UnknownCanvas(_) => code::UNKNOWN_TARGET,
            Error::InvalidParameter(_) => code::INVALID_PARAM,
            Error::OwnerUnreachable
            | Error::Panicked
            | Error::OwnerNotEstablished
            | Error::OwnerAlreadyEstablished
            | Error::Spawn(_) => code::FAILED,
        }
    }
}

/// Collapse a unit result into a native result code.
#[inline]
pub fn to_code(result: Result<()>) -> i32 {
    match result {
        Ok(()) => code::SUCCESS,
        Err(e) => e.code(),
    }
}
