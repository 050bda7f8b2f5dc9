//! Types for the sync engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A tracked Bitcoin address
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Address {
    /// Engine-internal identifier, handed back by the caller for syncs
    pub id: Uuid,

    /// Provider-facing address string
    pub address: String,

    /// Optional free-text label, editable by the caller
    pub label: Option<String>,

    /// When tracking started
    pub created_at: DateTime<Utc>,

    /// When the last successful sync finished, if any
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl Address {
    /// Creates a new tracked address with a fresh id
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            address: address.into(),
            label: None,
            created_at: Utc::now(),
            last_synced_at: None,
        }
    }

    /// Creates a new tracked address with a label
    pub fn with_label(address: impl Into<String>, label: impl Into<String>) -> Self {
        let mut addr = Self::new(address);
        addr.label = Some(label.into());
        addr
    }
}

/// Whether the tracked address spent or received funds in a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Sent,
    Received,
}

/// A confirmed or pending transaction touching a tracked address
///
/// Immutable once stored: a re-sync either finds it by `(address_id, tx_hash)`
/// and skips it, or sees a new hash and inserts a new record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Globally unique id, derived as `{address_id}-{tx_hash}`
    pub id: String,

    /// Owning tracked address
    pub address_id: Uuid,

    /// Provider-native transaction hash
    pub tx_hash: String,

    /// Block the transaction was mined in, if any
    pub block_height: Option<u64>,

    /// When the transaction happened
    pub timestamp: DateTime<Utc>,

    /// Absolute amount moved, in satoshis
    pub amount: u64,

    /// Sent or received, from the tracked address's point of view
    pub direction: Direction,

    /// Coarse confirmation count: 6 once mined, 0 while pending
    pub confirmations: u32,

    /// Fee paid, in satoshis, where the provider reports it
    pub fee: Option<u64>,
}

impl Transaction {
    /// Builds a canonical transaction from a provider record, stamping the
    /// engine-internal owner id.
    ///
    /// This is the only place a fetched record acquires an owner key, so
    /// everything that reaches the store is keyed by the internal id rather
    /// than the provider-facing address string.
    pub fn from_fetched(address_id: Uuid, fetched: FetchedTransaction) -> Self {
        Self {
            id: format!("{}-{}", address_id, fetched.tx_hash),
            address_id,
            tx_hash: fetched.tx_hash,
            block_height: fetched.block_height,
            timestamp: fetched.timestamp,
            amount: fetched.amount,
            direction: fetched.direction,
            confirmations: fetched.confirmations,
            fee: fetched.fee,
        }
    }
}

/// Current balance of a tracked address, as of its last successful sync
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Balance {
    /// Owning tracked address; at most one balance per id
    pub address_id: Uuid,

    /// Confirmed balance in satoshis
    pub confirmed: u64,

    /// Unconfirmed balance in satoshis
    pub unconfirmed: u64,

    /// Confirmed balance in USD, when an exchange rate was available
    pub confirmed_fiat: Option<f64>,

    /// Unconfirmed balance in USD, when an exchange rate was available
    pub unconfirmed_fiat: Option<f64>,

    /// When this balance was fetched
    pub last_updated: DateTime<Utc>,
}

/// A balance as returned by a provider, before the engine assigns ownership
#[derive(Debug, Clone)]
pub struct FetchedBalance {
    pub confirmed: u64,
    pub unconfirmed: u64,
    pub confirmed_fiat: Option<f64>,
    pub unconfirmed_fiat: Option<f64>,
}

impl FetchedBalance {
    /// Creates a fetched balance with no fiat annotation
    pub fn new(confirmed: u64, unconfirmed: u64) -> Self {
        Self {
            confirmed,
            unconfirmed,
            confirmed_fiat: None,
            unconfirmed_fiat: None,
        }
    }

    /// Stamps the engine-internal owner id onto this balance
    pub fn into_balance(self, address_id: Uuid) -> Balance {
        Balance {
            address_id,
            confirmed: self.confirmed,
            unconfirmed: self.unconfirmed,
            confirmed_fiat: self.confirmed_fiat,
            unconfirmed_fiat: self.unconfirmed_fiat,
            last_updated: Utc::now(),
        }
    }
}

/// A transaction as returned by a provider, before the engine assigns ownership
#[derive(Debug, Clone)]
pub struct FetchedTransaction {
    pub tx_hash: String,
    pub block_height: Option<u64>,
    pub timestamp: DateTime<Utc>,
    pub amount: u64,
    pub direction: Direction,
    pub confirmations: u32,
    pub fee: Option<u64>,
}

/// A provider's full answer for one address
#[derive(Debug, Clone)]
pub struct AddressData {
    pub balance: FetchedBalance,
    pub transactions: Vec<FetchedTransaction>,
}
