use alloy_primitives::{Bytes, U256};

/// An account as described by the spec's data model: balance, nonce, code and storage.
/// Reading an unknown account yields `Account::default()`; writing any field materializes it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Account {
    pub balance: U256,
    pub nonce: u64,
    pub code: Bytes,
    pub storage: std::collections::BTreeMap<U256, U256>,
}

impl Account {
    pub fn is_empty(&self) -> bool {
        self.balance.is_zero() && self.nonce == 0 && self.code.is_empty()
    }
}
