//! Sync orchestrator
//!
//! Per-address workflow: primary provider through the shared rate-limiter
//! gate, fallback provider once the primary's retries are exhausted on rate
//! limiting, internal-id stamping of everything a provider returned, then the
//! idempotent store merge. Errors become a failed `SyncResult`, never a
//! panic or an error past the engine's boundary.

use crate::{
    error::ProviderError,
    price::{CoinGeckoRateSource, PriceCache},
    provider::BlockchainProvider,
    providers::{BlockchainInfoProvider, BlockchairProvider},
    rate_limit::RateLimiter,
    store::WalletStore,
    types::{AddressData, Transaction},
};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// Outcome of one address sync, returned to the caller and never persisted
#[derive(Debug, Clone, Serialize)]
pub struct SyncResult {
    pub success: bool,
    pub address_id: Uuid,
    pub transactions_added: usize,
    pub balance_updated: bool,
    pub error: Option<String>,
}

impl SyncResult {
    fn failed(address_id: Uuid, error: impl Into<String>) -> Self {
        Self {
            success: false,
            address_id,
            transactions_added: 0,
            balance_updated: false,
            error: Some(error.into()),
        }
    }
}

/// Synchronization engine for tracked addresses
///
/// The rate limiter and the fallback's price cache are the only state shared
/// across concurrently-initiated syncs; both are owned here and passed by
/// handle, never ambient. Cloning the engine clones the handles, so a clone
/// syncs against the same store through the same gate.
#[derive(Clone)]
pub struct SyncEngine {
    store: Arc<WalletStore>,
    primary: Arc<dyn BlockchainProvider>,
    fallback: Arc<dyn BlockchainProvider>,
    limiter: Arc<RateLimiter>,
}

impl SyncEngine {
    /// Creates an engine with the production providers
    pub fn new(store: Arc<WalletStore>) -> Result<Self, ProviderError> {
        let price_cache = Arc::new(PriceCache::new(Arc::new(CoinGeckoRateSource::new()?)));

        Ok(Self::with_providers(
            store,
            Arc::new(BlockchairProvider::new()?),
            Arc::new(BlockchainInfoProvider::new(price_cache)?),
            Arc::new(RateLimiter::new()),
        ))
    }

    /// Creates an engine with injected providers and limiter
    ///
    /// This is primarily for testing with mock providers.
    pub fn with_providers(
        store: Arc<WalletStore>,
        primary: Arc<dyn BlockchainProvider>,
        fallback: Arc<dyn BlockchainProvider>,
        limiter: Arc<RateLimiter>,
    ) -> Self {
        Self {
            store,
            primary,
            fallback,
            limiter,
        }
    }

    /// Shared handle to the underlying store
    pub fn store(&self) -> Arc<WalletStore> {
        Arc::clone(&self.store)
    }

    /// Syncs one tracked address and merges the result into the store
    pub async fn sync_address(&self, address_id: Uuid) -> SyncResult {
        let Some(address) = self.store.get_address(address_id).await else {
            tracing::warn!(%address_id, "sync requested for unknown address");
            return SyncResult::failed(address_id, "address not found");
        };

        let data = match self.fetch_address_data(&address.address).await {
            Ok(data) => data,
            Err(e) => {
                tracing::error!(
                    %address_id,
                    address = %address.address,
                    error = %e,
                    "sync failed"
                );
                return SyncResult::failed(address_id, e.to_string());
            }
        };

        // Single rewrite point: provider records get the internal owner id here
        let transactions: Vec<Transaction> = data
            .transactions
            .into_iter()
            .map(|fetched| Transaction::from_fetched(address_id, fetched))
            .collect();

        let transactions_added = self.store.insert_transactions(transactions).await;
        self.store
            .upsert_balance(data.balance.into_balance(address_id))
            .await;
        self.store.mark_synced(address_id, Utc::now()).await;

        tracing::info!(
            %address_id,
            address = %address.address,
            transactions_added,
            "address synced"
        );

        SyncResult {
            success: true,
            address_id,
            transactions_added,
            balance_updated: true,
            error: None,
        }
    }

    /// Syncs every tracked address sequentially, isolating failures
    ///
    /// Sequential on purpose: it keeps all primary-provider traffic funneled
    /// through the one shared gate, which is what keeps a whole batch within
    /// provider limits.
    pub async fn sync_all(&self) -> Vec<SyncResult> {
        let addresses = self.store.all_addresses().await;
        let mut results = Vec::with_capacity(addresses.len());

        for address in addresses {
            results.push(self.sync_address(address.id).await);
        }

        results
    }

    /// Fire-and-forget sync whose outcome is only logged
    ///
    /// Used for the creation-triggered initial sync; the spawning caller
    /// never blocks on or observes the result.
    pub fn spawn_initial_sync(&self, address_id: Uuid) {
        let engine = self.clone();
        tokio::spawn(async move {
            let result = engine.sync_address(address_id).await;
            if result.success {
                tracing::info!(
                    %address_id,
                    transactions_added = result.transactions_added,
                    "background sync finished"
                );
            } else {
                tracing::warn!(
                    %address_id,
                    error = result.error.as_deref().unwrap_or("unknown"),
                    "background sync failed"
                );
            }
        });
    }

    /// Primary path with fallback on exhausted rate-limit retries
    ///
    /// A sync never mixes results: it is served entirely by the primary or
    /// entirely by the fallback.
    async fn fetch_address_data(&self, address: &str) -> Result<AddressData, ProviderError> {
        match self.fetch_via_primary(address).await {
            Ok(data) => Ok(data),
            Err(ProviderError::RateLimited) => {
                tracing::warn!(
                    %address,
                    fallback = self.fallback.provider_name(),
                    "primary provider still rate limited, switching to fallback"
                );
                self.fallback.fetch_address_data(address).await
            }
            Err(e) => Err(e),
        }
    }

    async fn fetch_via_primary(&self, address: &str) -> Result<AddressData, ProviderError> {
        let balance = self
            .limiter
            .execute(|| self.primary.fetch_balance(address))
            .await?;

        // Extra spacing between the two dashboard calls, on top of the gate
        self.limiter.pause().await;

        let transactions = self
            .limiter
            .execute(|| self.primary.fetch_transactions(address))
            .await?;

        Ok(AddressData {
            balance,
            transactions,
        })
    }
}
