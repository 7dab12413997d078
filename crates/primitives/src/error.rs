use alloy_primitives::Address;

/// Error taxonomy for the executor, grouped the way the spec's failure classes are surfaced to a
/// host: validation, fork I/O and internal invariant violations all become a host-visible error.
/// Execution reverts and out-of-gas halts are *not* represented here — they become
/// `Response::success = false` instead, see `tinyevm_executor::response`.
#[derive(Debug, thiserror::Error)]
pub enum TinyEvmError {
    #[error("invalid hex in {field}: {message}")]
    InvalidHex { field: &'static str, message: String },

    #[error("invalid address length for {field}: expected 20 bytes, got {len}")]
    InvalidAddressLength { field: &'static str, len: usize },

    #[error("invalid salt length: expected 32 bytes, got {0}")]
    InvalidSaltLength(usize),

    #[error("unknown environment field `{0}`")]
    UnknownEnvField(String),

    #[error("fork request to {endpoint} failed: {message}")]
    ForkIo { endpoint: String, message: String },

    #[error("unknown global snapshot id {0}")]
    UnknownSnapshot(u64),

    #[error("address {0} has no saved per-account snapshot")]
    MissingAccountSnapshot(Address),

    #[error("executor is already running a transaction on this instance")]
    Reentrant,

    #[error("internal invariant violated: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, TinyEvmError>;
