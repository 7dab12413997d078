use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use revm::inspector_handle_register;
use revm::primitives::{ExecutionResult, Output, TransactTo};
use revm::EvmBuilder;
use tracing::{debug, warn};

use tinyevm_fork::JsonRpcBackend;
use tinyevm_hooks::InstrumentationHook;
use tinyevm_primitives::{address, hex_codec, Address, Bytes, Result, TinyEvmError, U256};
use tinyevm_state::LayeredStore;

use crate::config::{Config, DEFAULT_TX_GAS_LIMIT};
use crate::env::BlockEnv;
use crate::response::Response;

static TRACING_INIT: OnceCell<()> = OnceCell::new();

/// Embeddable EVM executor: owns its world state, block environment and instrumentation
/// configuration. Methods take `&mut self`, so Rust's aliasing rules already forbid concurrent
/// calls against one instance from the same thread; sharing one instance across threads requires
/// the host to wrap it in its own mutex, which this crate deliberately does not impose.
pub struct Executor {
    store: LayeredStore,
    block_env: BlockEnv,
    tx_gas_limit: u64,
    instrument_config: Config,
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}

impl Executor {
    pub fn new() -> Self {
        Self {
            store: LayeredStore::new(),
            block_env: BlockEnv::default(),
            tx_gas_limit: DEFAULT_TX_GAS_LIMIT,
            instrument_config: Config::default(),
        }
    }

    pub fn new_with_fork(fork_url: impl Into<String>, block_number: u64) -> Self {
        let backend = Arc::new(JsonRpcBackend::new(fork_url, block_number));
        let mut block_env = BlockEnv::default();
        block_env.block_number = U256::from(block_number);
        Self {
            store: LayeredStore::with_backend(backend),
            block_env,
            tx_gas_limit: DEFAULT_TX_GAS_LIMIT,
            instrument_config: Config::default(),
        }
    }

    /// Turns on verbose diagnostic logging for the whole process. Idempotent: later calls are a
    /// no-op, matching a process-wide flag initialized once.
    pub fn enable_tracing() {
        TRACING_INIT.get_or_init(|| {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                .try_init();
        });
    }

    pub fn get_balance(&mut self, addr: Address) -> Result<U256> {
        self.store.get_balance(addr)
    }

    pub fn set_balance(&mut self, addr: Address, balance: U256) -> Result<()> {
        self.store.set_balance(addr, balance)
    }

    pub fn get_nonce(&mut self, addr: Address) -> Result<u64> {
        self.store.get_nonce(addr)
    }

    pub fn get_code(&mut self, addr: Address) -> Result<Bytes> {
        self.store.get_code(addr)
    }

    pub fn set_code(&mut self, addr: Address, code_hex: &str) -> Result<()> {
        let code = hex_codec::decode_bytes("code", code_hex)?;
        self.store.set_code(addr, Bytes::from(code))
    }

    pub fn get_storage(&mut self, addr: Address, slot: U256) -> Result<U256> {
        self.store.get_storage(addr, slot)
    }

    pub fn set_storage(&mut self, addr: Address, slot: U256, value: U256) -> Result<()> {
        self.store.set_storage(addr, slot, value)
    }

    pub fn get_env_value_by_field(&self, name: &str) -> Result<String> {
        self.block_env.get_field(name)
    }

    pub fn set_env_field_value(&mut self, name: &str, value_hex: &str) -> Result<()> {
        self.block_env.set_field(name, value_hex)
    }

    pub fn get_instrument_config(&self) -> Config {
        self.instrument_config
    }

    pub fn configure(&mut self, cfg: Config) {
        self.instrument_config = cfg;
    }

    pub fn tx_gas_limit(&self) -> u64 {
        self.tx_gas_limit
    }

    pub fn set_tx_gas_limit(&mut self, limit: u64) {
        self.tx_gas_limit = limit;
    }

    pub fn take_snapshot(&mut self, addr: Address) -> Result<()> {
        self.store.take_snapshot(addr)
    }

    pub fn restore_snapshot(&mut self, addr: Address) -> Result<()> {
        self.store.restore_snapshot(addr)
    }

    pub fn copy_snapshot(&mut self, src: Address, dst: Address) -> Result<()> {
        self.store.copy_snapshot(src, dst)
    }

    pub fn take_global_snapshot(&mut self) -> u64 {
        self.store.take_global_snapshot()
    }

    pub fn restore_global_snapshot(&mut self, id: u64, keep: bool) -> Result<()> {
        self.store.restore_global_snapshot(id, keep)
    }

    /// Derives the contract address deterministically, optionally credits `init_value`, then
    /// runs `init_code` as a CREATE/CREATE2. On success the returned bytecode is written into the
    /// new account and the address is returned in `Response.data`; on failure no account is
    /// created and any balance debit is reverted along with everything else in the transaction.
    ///
    /// revm's `TransactTo` only has a nonce-based `Create` variant — there is no tx-level CREATE2,
    /// since CREATE2 is an opcode a contract issues from its own running bytecode, never a
    /// top-level transaction kind. So the nonce-derived path below runs as an ordinary
    /// `TransactTo::Create`, but the salted path pins execution to `target_address` itself:
    /// the deployer's nonce is bumped and `value`/`init_value` are moved to `target_address`
    /// up front, `data` is installed there directly as running code, and that code executes via
    /// `TransactTo::Call` with no calldata, reading its own constructor args the way deployed
    /// bytecode reads appended constructor args (via `CODECOPY` against its own `codesize`). On
    /// success the init code is replaced with the bytes it returned, matching what CREATE/CREATE2
    /// do after the constructor runs.
    pub fn deterministic_deploy(
        &mut self,
        init_code_hex: &str,
        salt_hex: Option<&str>,
        deployer: Address,
        ctor_args_hex: &str,
        value: U256,
        init_value: Option<U256>,
    ) -> Result<Response> {
        let init_code = hex_codec::decode_bytes("init_code", init_code_hex)?;
        let ctor_args = hex_codec::decode_bytes("ctor_args", ctor_args_hex)?;
        let mut data = init_code;
        data.extend_from_slice(&ctor_args);

        match salt_hex {
            Some(salt_hex) => {
                let salt = hex_codec::decode_salt(salt_hex)?;
                let target_address = address::derive_create2_address(deployer, salt, &data);
                self.deploy_at(target_address, deployer, data, value, init_value)
            }
            None => {
                let nonce = self.store.get_nonce(deployer)?;
                let target_address = address::derive_create_address(deployer, nonce);

                self.store.begin_tx()?;
                if let Some(init_value) = init_value {
                    if let Err(err) = self.store.set_balance(target_address, init_value) {
                        self.store.discard_tx();
                        return Err(err);
                    }
                }
                let outcome = self.run(
                    deployer,
                    TransactTo::Create,
                    Bytes::from(data),
                    value,
                    Some(target_address),
                );
                self.finish_tx(outcome)
            }
        }
    }

    /// Bumps the deployer's nonce (a creation transaction always consumes one, CREATE2-pinned or
    /// not), moves `value` from `deployer` onto `target_address`, credits `init_value` on top,
    /// then installs `data` as `target_address`'s running code. Bundled into one helper so
    /// `deploy_at` only has one fallible step to unwind on error.
    fn prepare_deploy_at(
        &mut self,
        deployer: Address,
        target_address: Address,
        data: &[u8],
        value: U256,
        init_value: Option<U256>,
    ) -> Result<()> {
        self.store.increment_nonce(deployer)?;
        if !value.is_zero() {
            let sender_balance = self.store.get_balance(deployer)?;
            self.store.set_balance(deployer, sender_balance.saturating_sub(value))?;
            let target_balance = self.store.get_balance(target_address)?;
            self.store.set_balance(target_address, target_balance + value)?;
        }
        if let Some(init_value) = init_value {
            let target_balance = self.store.get_balance(target_address)?;
            self.store.set_balance(target_address, target_balance + init_value)?;
        }
        self.store.set_code(target_address, Bytes::from(data.to_vec()))?;
        Ok(())
    }

    /// Deploys `data` (init code ++ constructor args) at a caller-chosen `target_address` rather
    /// than letting revm derive one, so the CREATE2 address the spec mandates is the address the
    /// code actually runs at. Installs `data` as `target_address`'s code, moves `value` from
    /// `deployer` and `init_value` onto `target_address` before the constructor runs, then
    /// executes via a plain call into `target_address` with empty input. On success the
    /// constructor's returned bytes replace the installed init code and `Response.data` is
    /// overridden to `target_address` (matching the address `Output::Create` would have reported
    /// for an ordinary creation); on failure `finish_tx` discards every write this made.
    fn deploy_at(
        &mut self,
        target_address: Address,
        deployer: Address,
        data: Vec<u8>,
        value: U256,
        init_value: Option<U256>,
    ) -> Result<Response> {
        self.store.begin_tx()?;

        if let Err(err) = self.prepare_deploy_at(deployer, target_address, &data, value, init_value) {
            self.store.discard_tx();
            return Err(err);
        }

        let outcome = self.run(
            deployer,
            TransactTo::Call(target_address),
            Bytes::new(),
            U256::ZERO,
            Some(target_address),
        );

        let outcome = outcome.and_then(|response| {
            if response.success {
                self.store
                    .set_code(target_address, response.data.clone())?;
                Ok(Response {
                    data: Bytes::from(target_address.to_vec()),
                    ..response
                })
            } else {
                Ok(response)
            }
        });
        self.finish_tx(outcome)
    }

    /// Executes a message call. A `caller` of `None` resolves to the zero address.
    pub fn contract_call(
        &mut self,
        addr: Address,
        caller: Option<Address>,
        input_hex: &str,
        value: U256,
    ) -> Result<Response> {
        let input = hex_codec::decode_bytes("input", input_hex)?;
        let caller = caller.unwrap_or(Address::ZERO);

        self.store.begin_tx()?;
        let outcome = self.run(caller, TransactTo::Call(addr), Bytes::from(input), value, None);
        self.finish_tx(outcome)
    }

    fn finish_tx(&mut self, outcome: Result<Response>) -> Result<Response> {
        match &outcome {
            Ok(response) if response.success => self.store.commit_tx(),
            _ => self.store.discard_tx(),
        }
        outcome
    }

    fn run(
        &mut self,
        caller: Address,
        tx_kind: TransactTo,
        data: Bytes,
        value: U256,
        top_level_address: Option<Address>,
    ) -> Result<Response> {
        let top_level_address = top_level_address.unwrap_or(match tx_kind {
            TransactTo::Call(to) => to,
            TransactTo::Create => Address::ZERO,
        });

        let mut hook = InstrumentationHook::new(self.instrument_config);
        hook.enter_top_level(top_level_address);

        let block = &self.block_env;
        let gas_limit = self.tx_gas_limit;
        let chain_id: u64 = block.chain_id.try_into().unwrap_or(1);

        let mut evm = EvmBuilder::default()
            .with_db(&mut self.store)
            .with_external_context(&mut hook)
            .append_handler_register(inspector_handle_register)
            .modify_block_env(|b| {
                b.number = block.block_number;
                b.timestamp = block.timestamp;
                b.coinbase = block.coinbase;
                b.basefee = block.basefee;
            })
            .modify_tx_env(|tx| {
                tx.caller = caller;
                tx.transact_to = tx_kind;
                tx.data = data;
                tx.value = value;
                tx.gas_limit = gas_limit;
                tx.gas_price = block.gas_price;
            })
            .modify_cfg_env(|cfg| {
                cfg.chain_id = chain_id;
            })
            .build();

        let result = evm.transact_commit().map_err(|err| {
            TinyEvmError::Internal(format!("revm database error: {err:?}"))
        })?;
        drop(evm);

        let (seen_pcs, bug_data, heuristics) = hook.into_parts();

        build_response(result, seen_pcs, bug_data, heuristics)
    }
}

fn build_response(
    result: ExecutionResult,
    seen_pcs: HashMap<Address, BTreeSet<u64>>,
    bug_data: Vec<tinyevm_hooks::Finding>,
    heuristics: tinyevm_hooks::Heuristics,
) -> Result<Response> {
    match result {
        ExecutionResult::Success { output, .. } => {
            let data = match output {
                Output::Call(bytes) => bytes,
                Output::Create(bytes, Some(addr)) => {
                    debug!(%addr, "contract deployed");
                    Bytes::from(addr.to_vec())
                }
                Output::Create(bytes, None) => bytes,
            };
            Ok(Response {
                success: true,
                data,
                bug_data,
                seen_pcs,
                heuristics,
            })
        }
        ExecutionResult::Revert { output, gas_used } => {
            warn!(gas_used, "execution reverted");
            Ok(Response {
                success: false,
                data: output,
                bug_data,
                seen_pcs,
                heuristics,
            })
        }
        ExecutionResult::Halt { reason, gas_used } => {
            let reason_text = format!("{reason:?}");
            let message = if reason_text.contains("OutOfGas") || reason_text.contains("OutOfFund") {
                format!("OutOfGas: halted ({reason_text}) after {gas_used} gas")
            } else {
                format!("halted: {reason_text} after {gas_used} gas")
            };
            warn!(%message, "execution halted");
            Ok(Response {
                success: false,
                data: Bytes::from(message.into_bytes()),
                bug_data,
                seen_pcs,
                heuristics,
            })
        }
    }
}
