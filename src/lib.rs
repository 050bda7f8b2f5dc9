//! # BitSync Engine
//!
//! Synchronization engine for a set of tracked Bitcoin addresses: it decides
//! which blockchain-data provider to query, throttles and retries requests
//! against provider rate limits, falls back to a secondary provider on
//! sustained rate limiting, normalizes provider responses into canonical
//! records, and merges them into address state idempotently.
//!
//! ## Usage
//!
//! ```no_run
//! use bitsync::{Address, SyncEngine, WalletStore};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(WalletStore::new());
//! let engine = SyncEngine::new(Arc::clone(&store))?;
//!
//! // Track an address; the initial sync runs detached and is only logged
//! let address = store
//!     .add_address(Address::new("bc1q0sg9rdst255gtldsmcf8rk0764avqy2h2ksqs5"))
//!     .await;
//! engine.spawn_initial_sync(address.id);
//!
//! // Manual sync, returning the structured outcome
//! let result = engine.sync_address(address.id).await;
//! println!("added {} transactions", result.transactions_added);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! SyncEngine::sync_address(id)
//!     ↓
//! RateLimiter (5s gate + exponential backoff)
//!     ↓
//! BlockchairProvider (primary)
//!     ↓ on exhausted rate-limit retries
//! BlockchainInfoProvider (fallback) ── PriceCache (60s TTL)
//!     ↓
//! WalletStore (dedup merge, balance overwrite)
//!     ↓
//! SyncResult
//! ```
//!
//! All primary-provider traffic - including batch syncs, which run strictly
//! sequentially - flows through the one shared rate-limiter gate.

pub mod constants;
pub mod error;
pub mod price;
pub mod provider;
pub mod providers;
pub mod rate_limit;
pub mod store;
pub mod sync;
pub mod types;

// Re-export commonly used types
pub use error::ProviderError;
pub use price::{CoinGeckoRateSource, ExchangeRateSource, PriceCache};
pub use provider::BlockchainProvider;
pub use providers::{BlockchainInfoProvider, BlockchairProvider};
pub use rate_limit::RateLimiter;
pub use store::WalletStore;
pub use sync::{SyncEngine, SyncResult};
pub use types::{Address, AddressData, Balance, Direction, FetchedBalance, FetchedTransaction, Transaction};
