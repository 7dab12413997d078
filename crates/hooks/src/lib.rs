//! Per-instruction coverage recording and heuristic bug-signal classification, implemented as a
//! `revm::Inspector` so it plugs directly into the executor's EVM instance.

mod config;
mod finding;
mod hook;

pub use config::InstrumentConfig;
pub use finding::{BugType, Finding};
pub use hook::{Heuristics, InstrumentationHook};
