use std::collections::HashMap;
use tinyevm_primitives::{Address, Bytes, U256};

/// The mutable scalar fields of an account (balance, nonce, code) without its storage, which is
/// tracked independently at per-slot granularity so a cold storage read doesn't force a full
/// account materialization.
#[derive(Debug, Clone, Default)]
pub(crate) struct AccountScalars {
    pub balance: U256,
    pub nonce: u64,
    pub code: Bytes,
}

/// One entry in the world state's version stack. Layer 0 is the base and is never popped; every
/// `take_global_snapshot` call pushes a fresh, empty layer on top. Reads walk layers top-down,
/// writes always land in the topmost layer.
#[derive(Debug, Default)]
pub(crate) struct Layer {
    pub id: u64,
    pub accounts: HashMap<Address, AccountScalars>,
    /// Keyed by address first so per-account operations (snapshot/restore, touched-slot lookup)
    /// only ever walk that account's own slots instead of every slot in the layer.
    pub storage: HashMap<Address, HashMap<U256, U256>>,
}

impl Layer {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            accounts: HashMap::new(),
            storage: HashMap::new(),
        }
    }
}
