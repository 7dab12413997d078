use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tinyevm_primitives::{Account, Address, Bytes, Result, StateBackend, TinyEvmError, U256};

use crate::layer::{AccountScalars, Layer};

/// A per-account snapshot taken by `take_snapshot`: the account's full resolved state
/// (balance, nonce, code, storage) at the moment the snapshot was taken. `restore_snapshot`
/// writes every field back, including zeroing any storage slot that was touched after the
/// snapshot but isn't present in it.
#[derive(Debug, Clone)]
struct AccountSnapshot {
    account: Account,
}

/// Layered account/storage store. Reads walk the layer stack top-down and fall through to a
/// remote `StateBackend` (fork mode) on a total miss; writes always land in the topmost layer.
/// `take_global_snapshot`/`restore_global_snapshot` push/pop whole layers, giving O(size of the
/// discarded layer) snapshot restore rather than O(total state size). Per-account snapshots are
/// an independent, orthogonal mechanism keyed by address.
pub struct LayeredStore {
    layers: Vec<Layer>,
    next_snapshot_id: u64,
    account_snapshots: HashMap<Address, AccountSnapshot>,
    backend: Option<Arc<dyn StateBackend>>,
    /// Pending transactional write set, used by `checkpoint`/`commit_tx`/`discard_tx` so a failed
    /// call never needs to be unwound field-by-field: nothing is written to the real layers until
    /// the executor decides the transaction actually happened.
    in_tx: bool,
}

impl std::fmt::Debug for LayeredStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayeredStore")
            .field("layers", &self.layers.len())
            .field("in_tx", &self.in_tx)
            .finish()
    }
}

impl Default for LayeredStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LayeredStore {
    pub fn new() -> Self {
        Self {
            layers: vec![Layer::new(0)],
            next_snapshot_id: 1,
            account_snapshots: HashMap::new(),
            backend: None,
            in_tx: false,
        }
    }

    pub fn with_backend(backend: Arc<dyn StateBackend>) -> Self {
        let mut store = Self::new();
        store.backend = Some(backend);
        store
    }

    pub fn has_backend(&self) -> bool {
        self.backend.is_some()
    }

    fn top(&mut self) -> &mut Layer {
        self.layers.last_mut().expect("base layer is never popped")
    }

    /// Resolve an account's scalar fields by walking the layer stack top-down; on a total local
    /// miss, fetch from the fork backend (if any) and memoize into the base layer so subsequent
    /// reads are local. A fork fetch failure surfaces as `TinyEvmError::ForkIo`, it is never
    /// silently treated as an empty account.
    fn resolve_scalars(&mut self, address: Address) -> Result<AccountScalars> {
        for layer in self.layers.iter().rev() {
            if let Some(scalars) = layer.accounts.get(&address) {
                return Ok(scalars.clone());
            }
        }
        if let Some(backend) = self.backend.clone() {
            let remote = backend.fetch_account(address)?;
            let code = backend.fetch_code(address)?;
            let scalars = AccountScalars {
                balance: remote.balance,
                nonce: remote.nonce,
                code,
            };
            self.layers[0].accounts.insert(address, scalars.clone());
            return Ok(scalars);
        }
        Ok(AccountScalars::default())
    }

    fn resolve_storage(&mut self, address: Address, slot: U256) -> Result<U256> {
        for layer in self.layers.iter().rev() {
            if let Some(value) = layer.storage.get(&address).and_then(|slots| slots.get(&slot)) {
                return Ok(*value);
            }
        }
        if let Some(backend) = self.backend.clone() {
            let value = backend.fetch_storage(address, slot)?;
            self.layers[0]
                .storage
                .entry(address)
                .or_default()
                .insert(slot, value);
            return Ok(value);
        }
        Ok(U256::ZERO)
    }

    pub fn get_balance(&mut self, address: Address) -> Result<U256> {
        Ok(self.resolve_scalars(address)?.balance)
    }

    pub fn set_balance(&mut self, address: Address, balance: U256) -> Result<()> {
        let mut scalars = self.resolve_scalars(address)?;
        scalars.balance = balance;
        self.top().accounts.insert(address, scalars);
        Ok(())
    }

    pub fn get_nonce(&mut self, address: Address) -> Result<u64> {
        Ok(self.resolve_scalars(address)?.nonce)
    }

    pub fn set_nonce(&mut self, address: Address, nonce: u64) -> Result<()> {
        let mut scalars = self.resolve_scalars(address)?;
        scalars.nonce = nonce;
        self.top().accounts.insert(address, scalars);
        Ok(())
    }

    pub fn increment_nonce(&mut self, address: Address) -> Result<u64> {
        let mut scalars = self.resolve_scalars(address)?;
        scalars.nonce += 1;
        let nonce = scalars.nonce;
        self.top().accounts.insert(address, scalars);
        Ok(nonce)
    }

    pub fn get_code(&mut self, address: Address) -> Result<Bytes> {
        Ok(self.resolve_scalars(address)?.code)
    }

    pub fn set_code(&mut self, address: Address, code: Bytes) -> Result<()> {
        let mut scalars = self.resolve_scalars(address)?;
        scalars.code = code;
        self.top().accounts.insert(address, scalars);
        Ok(())
    }

    pub fn get_storage(&mut self, address: Address, slot: U256) -> Result<U256> {
        self.resolve_storage(address, slot)
    }

    pub fn set_storage(&mut self, address: Address, slot: U256, value: U256) -> Result<()> {
        self.resolve_storage(address, slot)?;
        self.top().storage.entry(address).or_default().insert(slot, value);
        Ok(())
    }

    /// All storage slot keys ever written for `address` across every layer. Since `Layer.storage`
    /// is keyed by address first, this only walks `address`'s own slots per layer — O(size of the
    /// saved account), not O(total world storage) — which is what makes
    /// `snapshot_account`/`write_account` cheap enough for per-call snapshotting.
    fn touched_slots(&self, address: Address) -> BTreeSet<U256> {
        let mut slots = BTreeSet::new();
        for layer in &self.layers {
            if let Some(account_slots) = layer.storage.get(&address) {
                slots.extend(account_slots.keys().copied());
            }
        }
        slots
    }

    fn snapshot_account(&mut self, address: Address) -> Result<Account> {
        let scalars = self.resolve_scalars(address)?;
        let mut storage = std::collections::BTreeMap::new();
        for slot in self.touched_slots(address) {
            storage.insert(slot, self.resolve_storage(address, slot)?);
        }
        Ok(Account {
            balance: scalars.balance,
            nonce: scalars.nonce,
            code: scalars.code,
            storage,
        })
    }

    pub fn take_snapshot(&mut self, address: Address) -> Result<()> {
        let account = self.snapshot_account(address)?;
        self.account_snapshots
            .insert(address, AccountSnapshot { account });
        Ok(())
    }

    /// Copy a previously-taken snapshot of `src` onto `dst` without disturbing `src`'s own
    /// current state or snapshot. Used by callers that want to clone one account's state into
    /// another address (e.g. seeding a test double from a saved snapshot of a real contract).
    pub fn copy_snapshot(&mut self, src: Address, dst: Address) -> Result<()> {
        let snapshot = self
            .account_snapshots
            .get(&src)
            .cloned()
            .ok_or(TinyEvmError::MissingAccountSnapshot(src))?;
        self.write_account(dst, &snapshot.account)?;
        Ok(())
    }

    pub fn restore_snapshot(&mut self, address: Address) -> Result<()> {
        let snapshot = self
            .account_snapshots
            .get(&address)
            .cloned()
            .ok_or(TinyEvmError::MissingAccountSnapshot(address))?;
        self.write_account(address, &snapshot.account)
    }

    fn write_account(&mut self, address: Address, account: &Account) -> Result<()> {
        let touched = self.touched_slots(address);
        let scalars = AccountScalars {
            balance: account.balance,
            nonce: account.nonce,
            code: account.code.clone(),
        };
        self.top().accounts.insert(address, scalars);
        let top_slots = self.top().storage.entry(address).or_default();
        for slot in touched {
            let value = account.storage.get(&slot).copied().unwrap_or(U256::ZERO);
            top_slots.insert(slot, value);
        }
        for (&slot, &value) in &account.storage {
            top_slots.insert(slot, value);
        }
        Ok(())
    }

    /// Push a fresh layer, returning its id. Everything written after this call is discarded by
    /// a matching `restore_global_snapshot`.
    pub fn take_global_snapshot(&mut self) -> u64 {
        let id = self.next_snapshot_id;
        self.next_snapshot_id += 1;
        self.layers.push(Layer::new(id));
        id
    }

    /// Discard every layer pushed since `id` was taken (inclusive), restoring world state to
    /// exactly what it was when the snapshot was taken. With `keep`, re-pushes an empty layer
    /// with the same id so the snapshot remains restorable again later with stable semantics
    /// (restoring the same id 1000 times in a row must be idempotent).
    pub fn restore_global_snapshot(&mut self, id: u64, keep: bool) -> Result<()> {
        let position = self
            .layers
            .iter()
            .position(|layer| layer.id == id)
            .ok_or(TinyEvmError::UnknownSnapshot(id))?;
        self.layers.truncate(position);
        if keep {
            self.layers.push(Layer::new(id));
        }
        Ok(())
    }

    pub fn begin_tx(&mut self) -> Result<()> {
        if self.in_tx {
            return Err(TinyEvmError::Reentrant);
        }
        self.in_tx = true;
        self.layers.push(Layer::new(self.next_snapshot_id));
        self.next_snapshot_id += 1;
        Ok(())
    }

    /// Fold the transaction's scratch layer into the layer beneath it and clear the in-flight
    /// flag. Called once execution has succeeded and the caller wants the writes to stick.
    pub fn commit_tx(&mut self) {
        debug_assert!(self.in_tx, "commit_tx called without a matching begin_tx");
        self.in_tx = false;
        if let Some(tx_layer) = self.layers.pop() {
            let base = self.top();
            for (address, scalars) in tx_layer.accounts {
                base.accounts.insert(address, scalars);
            }
            for (address, slots) in tx_layer.storage {
                base.storage.entry(address).or_default().extend(slots);
            }
        }
    }

    /// Drop the transaction's scratch layer entirely, leaving state exactly as it was before
    /// `begin_tx`. Called when execution reverted or halted.
    pub fn discard_tx(&mut self) {
        debug_assert!(self.in_tx, "discard_tx called without a matching begin_tx");
        self.in_tx = false;
        self.layers.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    #[test]
    fn unknown_account_reads_as_default() {
        let mut store = LayeredStore::new();
        assert_eq!(store.get_balance(addr(1)).unwrap(), U256::ZERO);
        assert_eq!(store.get_nonce(addr(1)).unwrap(), 0);
        assert!(store.get_code(addr(1)).unwrap().is_empty());
    }

    #[test]
    fn balance_and_nonce_round_trip() {
        let mut store = LayeredStore::new();
        let a = addr(2);
        store.set_balance(a, U256::from(1_000u64)).unwrap();
        store.set_nonce(a, 7).unwrap();
        assert_eq!(store.get_balance(a).unwrap(), U256::from(1_000u64));
        assert_eq!(store.get_nonce(a).unwrap(), 7);
        assert_eq!(store.increment_nonce(a).unwrap(), 8);
    }

    #[test]
    fn global_snapshot_restores_writes_across_many_accounts() {
        let mut store = LayeredStore::new();
        let a = addr(3);
        store.set_balance(a, U256::from(1u64)).unwrap();
        let id = store.take_global_snapshot();
        store.set_balance(a, U256::from(2u64)).unwrap();
        store.set_storage(a, U256::from(5u64), U256::from(9u64)).unwrap();
        store.restore_global_snapshot(id, true).unwrap();
        assert_eq!(store.get_balance(a).unwrap(), U256::from(1u64));
        assert_eq!(store.get_storage(a, U256::from(5u64)).unwrap(), U256::ZERO);
    }

    #[test]
    fn restoring_the_same_snapshot_1000_times_is_idempotent() {
        let mut store = LayeredStore::new();
        let a = addr(10);
        store.set_balance(a, U256::from(7u64)).unwrap();
        let id = store.take_global_snapshot();
        for _ in 0..1000 {
            store.set_balance(a, U256::from(999u64)).unwrap();
            store.restore_global_snapshot(id, true).unwrap();
            assert_eq!(store.get_balance(a).unwrap(), U256::from(7u64));
        }
    }

    #[test]
    fn restore_without_keep_drops_the_snapshot_slot() {
        let mut store = LayeredStore::new();
        let id = store.take_global_snapshot();
        store.restore_global_snapshot(id, false).unwrap();
        assert!(matches!(
            store.restore_global_snapshot(id, true),
            Err(TinyEvmError::UnknownSnapshot(_))
        ));
    }

    #[test]
    fn account_snapshot_zeroes_slots_dirtied_after_snapshot() {
        let mut store = LayeredStore::new();
        let a = addr(4);
        store.set_storage(a, U256::from(1u64), U256::from(100u64)).unwrap();
        store.take_snapshot(a).unwrap();
        store.set_storage(a, U256::from(2u64), U256::from(200u64)).unwrap();
        store.restore_snapshot(a).unwrap();
        assert_eq!(store.get_storage(a, U256::from(1u64)).unwrap(), U256::from(100u64));
        assert_eq!(store.get_storage(a, U256::from(2u64)).unwrap(), U256::ZERO);
    }

    #[test]
    fn copy_snapshot_clones_into_another_address_without_disturbing_source() {
        let mut store = LayeredStore::new();
        let src = addr(5);
        let dst = addr(6);
        store.set_balance(src, U256::from(42u64)).unwrap();
        store.take_snapshot(src).unwrap();
        store.set_balance(src, U256::from(99u64)).unwrap();
        store.copy_snapshot(src, dst).unwrap();
        assert_eq!(store.get_balance(dst).unwrap(), U256::from(42u64));
        assert_eq!(store.get_balance(src).unwrap(), U256::from(99u64));
    }

    #[test]
    fn restore_without_snapshot_errors() {
        let mut store = LayeredStore::new();
        let err = store.restore_snapshot(addr(7)).unwrap_err();
        assert!(matches!(err, TinyEvmError::MissingAccountSnapshot(_)));
    }

    #[test]
    fn tx_discard_leaves_no_trace() {
        let mut store = LayeredStore::new();
        let a = addr(8);
        store.set_balance(a, U256::from(1u64)).unwrap();
        store.begin_tx().unwrap();
        store.set_balance(a, U256::from(2u64)).unwrap();
        store.discard_tx();
        assert_eq!(store.get_balance(a).unwrap(), U256::from(1u64));
    }

    #[test]
    fn tx_commit_persists_writes() {
        let mut store = LayeredStore::new();
        let a = addr(9);
        store.begin_tx().unwrap();
        store.set_balance(a, U256::from(5u64)).unwrap();
        store.commit_tx();
        assert_eq!(store.get_balance(a).unwrap(), U256::from(5u64));
    }

    #[test]
    fn reentrant_begin_tx_errors() {
        let mut store = LayeredStore::new();
        store.begin_tx().unwrap();
        assert!(matches!(store.begin_tx(), Err(TinyEvmError::Reentrant)));
    }
}
