use std::collections::{BTreeSet, HashMap};

use tinyevm_hooks::{Finding, Heuristics};
use tinyevm_primitives::{Address, Bytes};

/// Result of one `deterministic_deploy` or `contract_call`. `heuristics` is deliberately opaque
/// to the host beyond its documented counters — it exists so the driver can extend it later
/// without breaking the public shape.
#[derive(Debug, Clone)]
pub struct Response {
    pub success: bool,
    pub data: Bytes,
    pub bug_data: Vec<Finding>,
    pub seen_pcs: HashMap<Address, BTreeSet<u64>>,
    pub heuristics: Heuristics,
}

impl Response {
    pub fn pcs_by_address(&self, address: Address) -> BTreeSet<u64> {
        self.seen_pcs.get(&address).cloned().unwrap_or_default()
    }
}
