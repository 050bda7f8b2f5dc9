//! In-memory store for tracked addresses, transactions, and balances
//!
//! Transactions are keyed by `(address_id, tx_hash)`, which is what makes the
//! merge idempotent: re-inserting an already-stored transaction is a skip,
//! never an update. Balances are keyed one-per-address and always overwritten.

use crate::types::{Address, Balance, Transaction};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Dedup key for stored transactions
type TxKey = (Uuid, String);

#[derive(Default)]
struct StoreInner {
    addresses: HashMap<Uuid, Address>,
    /// Insertion order of tracked addresses, for stable iteration
    order: Vec<Uuid>,
    /// Reverse lookup: provider-facing address string to internal id
    by_address: HashMap<String, Uuid>,
    transactions: HashMap<TxKey, Transaction>,
    balances: HashMap<Uuid, Balance>,
}

/// In-memory wallet state
pub struct WalletStore {
    inner: RwLock<StoreInner>,
}

impl WalletStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StoreInner::default()),
        }
    }

    /// Adds or replaces a tracked address
    pub async fn add_address(&self, address: Address) -> Address {
        let mut inner = self.inner.write().await;
        if !inner.addresses.contains_key(&address.id) {
            inner.order.push(address.id);
        }
        inner.by_address.insert(address.address.clone(), address.id);
        inner.addresses.insert(address.id, address.clone());
        address
    }

    /// Looks up a tracked address by its internal id
    pub async fn get_address(&self, id: Uuid) -> Option<Address> {
        self.inner.read().await.addresses.get(&id).cloned()
    }

    /// Looks up a tracked address by its provider-facing string
    pub async fn find_by_address(&self, address: &str) -> Option<Address> {
        let inner = self.inner.read().await;
        let id = inner.by_address.get(address)?;
        inner.addresses.get(id).cloned()
    }

    /// True if the provider-facing string is already tracked
    pub async fn address_exists(&self, address: &str) -> bool {
        self.inner.read().await.by_address.contains_key(address)
    }

    /// All tracked addresses, in insertion order
    pub async fn all_addresses(&self) -> Vec<Address> {
        let inner = self.inner.read().await;
        inner
            .order
            .iter()
            .filter_map(|id| inner.addresses.get(id).cloned())
            .collect()
    }

    /// Updates the caller-editable label of a tracked address
    pub async fn set_label(&self, id: Uuid, label: Option<String>) -> bool {
        let mut inner = self.inner.write().await;
        match inner.addresses.get_mut(&id) {
            Some(address) => {
                address.label = label;
                true
            }
            None => false,
        }
    }

    /// Stamps the address's last successful sync time
    pub async fn mark_synced(&self, id: Uuid, when: DateTime<Utc>) -> bool {
        let mut inner = self.inner.write().await;
        match inner.addresses.get_mut(&id) {
            Some(address) => {
                address.last_synced_at = Some(when);
                true
            }
            None => false,
        }
    }

    /// Removes a tracked address, cascading to its transactions and balance
    pub async fn remove_address(&self, id: Uuid) -> bool {
        let mut inner = self.inner.write().await;
        let Some(removed) = inner.addresses.remove(&id) else {
            return false;
        };
        inner.order.retain(|entry| *entry != id);
        inner.by_address.remove(&removed.address);
        inner.transactions.retain(|(owner, _), _| *owner != id);
        inner.balances.remove(&id);
        true
    }

    /// Merges fetched transactions into the store
    ///
    /// Each record already stored under its `(address_id, tx_hash)` key is
    /// skipped untouched; the rest are inserted. Returns the number of
    /// genuinely new records, so a re-sync of unchanged history adds zero.
    pub async fn insert_transactions(&self, transactions: Vec<Transaction>) -> usize {
        let mut inner = self.inner.write().await;
        let mut added = 0;

        for tx in transactions {
            let key = (tx.address_id, tx.tx_hash.clone());
            inner.transactions.entry(key).or_insert_with(|| {
                added += 1;
                tx
            });
        }

        added
    }

    /// All stored transactions for an address, newest first
    pub async fn transactions_for(&self, id: Uuid) -> Vec<Transaction> {
        let inner = self.inner.read().await;
        let mut transactions: Vec<Transaction> = inner
            .transactions
            .values()
            .filter(|tx| tx.address_id == id)
            .cloned()
            .collect();
        transactions.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        transactions
    }

    /// Overwrites the balance for an address; no history is kept
    pub async fn upsert_balance(&self, balance: Balance) {
        let mut inner = self.inner.write().await;
        inner.balances.insert(balance.address_id, balance);
    }

    /// The balance as of the address's last successful sync
    pub async fn get_balance(&self, id: Uuid) -> Option<Balance> {
        self.inner.read().await.balances.get(&id).cloned()
    }

    /// Drops all state
    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        *inner = StoreInner::default();
    }
}

impl Default for WalletStore {
    fn default() -> Self {
        Self::new()
    }
}
