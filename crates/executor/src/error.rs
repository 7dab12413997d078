pub use tinyevm_primitives::{Result, TinyEvmError};
