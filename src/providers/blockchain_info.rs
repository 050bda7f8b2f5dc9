//! blockchain.info provider implementation (fallback)
//!
//! Single rawaddr call returning full inputs and outputs per transaction.
//! Direction and amount come from the tracked address's own input value
//! versus its own output value. Balances are additionally annotated with a
//! fiat equivalent from the shared price cache when a rate is available.

use crate::{
    constants::{BLOCKCHAIN_INFO_API_URL, CONFIRMED_DEPTH, REQUEST_TIMEOUT_SECS, SATS_PER_BTC, TX_PAGE_LIMIT, USER_AGENT},
    error::ProviderError,
    price::PriceCache,
    provider::BlockchainProvider,
    types::{AddressData, Direction, FetchedBalance, FetchedTransaction},
};
use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// blockchain.info rawaddr response
#[derive(Debug, Deserialize)]
struct RawAddressResponse {
    #[serde(default)]
    final_balance: u64,
    #[serde(default)]
    txs: Vec<RawTransaction>,
}

#[derive(Debug, Deserialize)]
struct RawTransaction {
    hash: String,
    time: i64,
    block_height: Option<u64>,
    #[serde(default)]
    inputs: Vec<RawInput>,
    #[serde(default)]
    out: Vec<RawOutput>,
}

#[derive(Debug, Deserialize)]
struct RawInput {
    prev_out: Option<RawOutput>,
}

#[derive(Debug, Deserialize)]
struct RawOutput {
    #[serde(default)]
    value: u64,
    addr: Option<String>,
}

/// blockchain.info provider (fallback)
pub struct BlockchainInfoProvider {
    client: Client,
    base_url: String,
    price_cache: Arc<PriceCache>,
}

impl BlockchainInfoProvider {
    /// Creates a new blockchain.info provider sharing the given price cache
    pub fn new(price_cache: Arc<PriceCache>) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(ProviderError::Unavailable)?;

        Ok(Self {
            client,
            base_url: BLOCKCHAIN_INFO_API_URL.to_string(),
            price_cache,
        })
    }

    async fn fetch_raw(
        &self,
        address: &str,
        limit: usize,
    ) -> Result<RawAddressResponse, ProviderError> {
        let url = format!("{}/rawaddr/{address}?limit={limit}", self.base_url);
        tracing::debug!(%address, "fetching blockchain.info rawaddr");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(ProviderError::Unavailable)?;

        match response.status().as_u16() {
            429 => return Err(ProviderError::RateLimited),
            404 => return Err(ProviderError::AddressNotFound(address.to_string())),
            _ => {}
        }
        let response = response.error_for_status()?;

        let body = response.text().await.map_err(ProviderError::Unavailable)?;
        serde_json::from_str(&body).map_err(|e| {
            ProviderError::unknown(format!("failed to parse blockchain.info response: {e}"))
        })
    }

    /// Converts satoshi amounts to USD when a rate is available
    async fn annotated_balance(&self, confirmed: u64, unconfirmed: u64) -> FetchedBalance {
        let mut balance = FetchedBalance::new(confirmed, unconfirmed);

        // A zero rate means the conversion is unavailable; fiat stays None
        let rate = self.price_cache.get_rate().await;
        if rate > 0.0 {
            balance.confirmed_fiat = Some(confirmed as f64 / SATS_PER_BTC * rate);
            balance.unconfirmed_fiat = Some(unconfirmed as f64 / SATS_PER_BTC * rate);
        }

        balance
    }

    fn map_transaction(
        address: &str,
        tx: RawTransaction,
    ) -> Result<FetchedTransaction, ProviderError> {
        let timestamp = DateTime::from_timestamp(tx.time, 0)
            .ok_or_else(|| ProviderError::unknown(format!("bad transaction time {}", tx.time)))?;

        let own_input: u64 = tx
            .inputs
            .iter()
            .filter_map(|input| input.prev_out.as_ref())
            .filter(|out| out.addr.as_deref() == Some(address))
            .map(|out| out.value)
            .sum();
        let own_output: u64 = tx
            .out
            .iter()
            .filter(|out| out.addr.as_deref() == Some(address))
            .map(|out| out.value)
            .sum();

        let direction = if own_output > own_input {
            Direction::Received
        } else {
            Direction::Sent
        };
        let mined = tx.block_height.is_some();

        Ok(FetchedTransaction {
            tx_hash: tx.hash,
            block_height: tx.block_height,
            timestamp,
            amount: own_output.abs_diff(own_input),
            direction,
            confirmations: if mined { CONFIRMED_DEPTH } else { 0 },
            fee: None,
        })
    }
}

#[async_trait]
impl BlockchainProvider for BlockchainInfoProvider {
    async fn fetch_balance(&self, address: &str) -> Result<FetchedBalance, ProviderError> {
        let raw = self.fetch_raw(address, 0).await?;
        Ok(self.annotated_balance(raw.final_balance, 0).await)
    }

    async fn fetch_transactions(
        &self,
        address: &str,
    ) -> Result<Vec<FetchedTransaction>, ProviderError> {
        let raw = self.fetch_raw(address, TX_PAGE_LIMIT).await?;
        raw.txs
            .into_iter()
            .map(|tx| Self::map_transaction(address, tx))
            .collect()
    }

    /// One rawaddr call answers both, so the combined fetch costs a single request
    async fn fetch_address_data(&self, address: &str) -> Result<AddressData, ProviderError> {
        let raw = self.fetch_raw(address, TX_PAGE_LIMIT).await?;

        let balance = self.annotated_balance(raw.final_balance, 0).await;
        let transactions = raw
            .txs
            .into_iter()
            .map(|tx| Self::map_transaction(address, tx))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(AddressData {
            balance,
            transactions,
        })
    }

    fn provider_name(&self) -> &'static str {
        "blockchain.info"
    }
}
