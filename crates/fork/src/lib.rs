//! JSON-RPC backed `StateBackend` for fork mode: lazily fetches balance, nonce, code and storage
//! from a pinned remote block height, deduplicating concurrent fetches of the same key.

mod backend;
mod client;
mod single_flight;

pub use backend::JsonRpcBackend;
pub use client::EthRpcClient;
