pub use tinyevm_hooks::InstrumentConfig as Config;

/// Generous default so fuzzing workloads running many cheap calls rarely hit the ceiling by
/// accident; hosts chasing `OutOfGas` bugs dial it down explicitly.
pub const DEFAULT_TX_GAS_LIMIT: u64 = 30_000_000;
