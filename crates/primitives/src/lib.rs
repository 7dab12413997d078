//! Shared types, hex conventions, address derivation and error taxonomy used across the
//! tinyevm workspace. Kept dependency-light (alloy-primitives + alloy-rlp only) so both the
//! state store and the fork backend can depend on it without depending on each other.

pub mod account;
pub mod address;
pub mod backend;
pub mod error;
pub mod hex_codec;

pub use account::Account;
pub use backend::{RemoteAccount, StateBackend};
pub use error::{Result, TinyEvmError};

pub use alloy_primitives::{Address, Bytes, U256};
