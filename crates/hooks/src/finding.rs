use serde::{Deserialize, Serialize};
use tinyevm_primitives::Address;

/// A bug signal raised by the instrumentation hook while stepping through a call. Distinct from
/// `Response::success`: a finding can be emitted even on a successful, non-reverting execution
/// (e.g. a reachable but unexecuted `SELFDESTRUCT`), and several findings can fire in one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BugType {
    IntegerOverflow,
    SuspiciousExternalCall,
    SelfDestructReachable,
    ReentrantCall,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub bug_type: BugType,
    pub address: Address,
    pub pc: u64,
    pub message: String,
}

impl Finding {
    pub fn new(bug_type: BugType, address: Address, pc: u64, message: impl Into<String>) -> Self {
        Self {
            bug_type,
            address,
            pc,
            message: message.into(),
        }
    }
}
