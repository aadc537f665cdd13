use thiserror::Error;

pub type Result<T> = std::result::Result<T, BridgeError>;

/// Raised by the `proc_exit` import to unwind the guest.
///
/// This is the only error a host function ever returns into the guest runtime; every other
/// shim failure is reported as an [`crate::Errno`] status code.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("guest requested process exit with code {code}")]
pub struct GuestExit {
    pub code: i32,
}

/// Unified error type for the host-guest bridge.
///
/// Wasmtime errors are kept by value (not as `#[source]`) and rendered with `{:#}` so the full
/// context chain ends up in the message.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("failed to create wasm engine: {0:#}")]
    Engine(wasmtime::Error),

    #[error("failed to compile guest module: {0:#}")]
    Compile(wasmtime::Error),

    #[error("failed to allocate guest memory: {0:#}")]
    Memory(wasmtime::Error),

    #[error("failed to bind host imports: {0:#}")]
    Link(wasmtime::Error),

    #[error("failed to instantiate guest module: {0:#}")]
    Instantiate(wasmtime::Error),

    #[error("guest does not export `{0}`")]
    MissingExport(&'static str),

    #[error("guest export `{name}` has an unexpected signature: {reason}")]
    ExportSignature { name: &'static str, reason: String },

    #[error("guest trapped: {0:#}")]
    Trap(wasmtime::Error),

    #[error("guest exited with code {code}")]
    Exit { code: i32 },

    #[error("ROM too large to fit into program memory ({len} > {max} bytes)")]
    RomTooLarge { len: usize, max: usize },

    #[error("guest memory access out of bounds: ptr=0x{ptr:x} len={len} memory={memory}")]
    OutOfBounds { ptr: u64, len: usize, memory: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    #[error("scheduler task failed: {0}")]
    Scheduler(String),
}

impl BridgeError {
    /// Classify an error returned from a call into the guest.
    ///
    /// A [`GuestExit`] raised by `proc_exit` becomes [`BridgeError::Exit`]; anything else is a
    /// trap.
    pub fn from_guest_call(err: wasmtime::Error) -> Self {
        match err.downcast_ref::<GuestExit>() {
            Some(exit) => Self::Exit { code: exit.code },
            None => Self::Trap(err),
        }
    }

    /// Returns the exit code if the guest terminated itself.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Exit { code } => Some(*code),
            _ => None,
        }
    }
}

impl From<crate::memory::OutOfBounds> for BridgeError {
    fn from(err: crate::memory::OutOfBounds) -> Self {
        Self::OutOfBounds {
            ptr: err.ptr,
            len: err.len,
            memory: err.memory,
        }
    }
}
