use crate::error::Result;
use alloy_primitives::{Address, Bytes, U256};

/// Minimal account view returned by a remote fetch: balance and nonce only. Code is fetched
/// separately and lazily (mirrors `eth_getBalance`/`eth_getTransactionCount` vs `eth_getCode`
/// being distinct JSON-RPC calls), storage slots are fetched per-slot on demand.
#[derive(Debug, Clone, Copy, Default)]
pub struct RemoteAccount {
    pub balance: U256,
    pub nonce: u64,
}

/// Implemented by anything that can lazily resolve state the local store doesn't have yet.
/// `tinyevm-fork` implements this against a pinned JSON-RPC archive node; the layered store
/// in `tinyevm-state` is generic over it so it has no dependency on the fork transport.
pub trait StateBackend: Send + Sync {
    fn fetch_account(&self, address: Address) -> Result<RemoteAccount>;
    fn fetch_storage(&self, address: Address, slot: U256) -> Result<U256>;
    fn fetch_code(&self, address: Address) -> Result<Bytes>;
}
