mod config;
mod env;
mod error;
mod executor;
mod response;

pub use config::Config;
pub use env::BlockEnv;
pub use error::{Result, TinyEvmError};
pub use executor::Executor;
pub use response::Response;

pub use tinyevm_hooks::{BugType, Finding, Heuristics};
pub use tinyevm_primitives::{Address, Bytes, U256};
