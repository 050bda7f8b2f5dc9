//! Blockchair provider implementation (primary)
//!
//! Dashboard-style API: one call returns the address summary plus a page of
//! transaction hashes, a second call resolves those hashes into full records
//! in one batch request.

use crate::{
    constants::{
        BLOCKCHAIR_API_URL, BLOCKCHAIR_API_URL_ENV, CONFIRMED_DEPTH, REQUEST_TIMEOUT_SECS,
        TX_PAGE_LIMIT, USER_AGENT,
    },
    error::ProviderError,
    provider::BlockchainProvider,
    types::{Direction, FetchedBalance, FetchedTransaction},
};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// Blockchair address dashboard response
#[derive(Debug, Deserialize)]
struct AddressDashboardResponse {
    data: HashMap<String, AddressDashboardEntry>,
}

#[derive(Debug, Deserialize)]
struct AddressDashboardEntry {
    address: AddressSummary,
    #[serde(default)]
    transactions: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct AddressSummary {
    #[serde(default)]
    balance: u64,
}

/// Blockchair batch transaction dashboard response
#[derive(Debug, Deserialize)]
struct TransactionDashboardResponse {
    data: HashMap<String, BlockchairTransaction>,
}

#[derive(Debug, Deserialize)]
struct BlockchairTransaction {
    hash: String,
    time: String,
    block_id: i64,
    balance_change: i64,
    #[serde(default)]
    fee: u64,
}

/// Blockchair provider (primary)
pub struct BlockchairProvider {
    client: Client,
    base_url: String,
}

impl BlockchairProvider {
    /// Creates a new Blockchair provider
    ///
    /// The base URL comes from `BLOCKCHAIR_API_URL` when set.
    pub fn new() -> Result<Self, ProviderError> {
        let base_url = std::env::var(BLOCKCHAIR_API_URL_ENV)
            .unwrap_or_else(|_| BLOCKCHAIR_API_URL.to_string());
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(ProviderError::Unavailable)?;

        Ok(Self { client, base_url })
    }

    /// Issues a GET and maps the provider's status codes onto the error taxonomy
    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        address: &str,
    ) -> Result<T, ProviderError> {
        let response = self
            .client
            .get(url)
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
            ProviderError::unknown(format!("failed to parse Blockchair response: {e}"))
        })
    }

    /// Fetches the address dashboard entry, with the requested tx-page size
    async fn fetch_dashboard(
        &self,
        address: &str,
        limit: usize,
    ) -> Result<AddressDashboardEntry, ProviderError> {
        let url = format!("{}/dashboards/address/{address}?limit={limit}", self.base_url);
        tracing::debug!(%address, "fetching Blockchair address dashboard");

        let mut response: AddressDashboardResponse = self.get_json(&url, address).await?;
        response
            .data
            .remove(address)
            .ok_or_else(|| ProviderError::AddressNotFound(address.to_string()))
    }

    fn map_transaction(tx: BlockchairTransaction) -> Result<FetchedTransaction, ProviderError> {
        let timestamp = NaiveDateTime::parse_from_str(&tx.time, "%Y-%m-%d %H:%M:%S")
            .map_err(|e| {
                ProviderError::unknown(format!("bad transaction time {:?}: {e}", tx.time))
            })?
            .and_utc();

        let direction = if tx.balance_change > 0 {
            Direction::Received
        } else {
            Direction::Sent
        };
        let mined = tx.block_id > 0;

        Ok(FetchedTransaction {
            tx_hash: tx.hash,
            block_height: mined.then_some(tx.block_id as u64),
            timestamp,
            amount: tx.balance_change.unsigned_abs(),
            direction,
            confirmations: if mined { CONFIRMED_DEPTH } else { 0 },
            fee: Some(tx.fee),
        })
    }
}

#[async_trait]
impl BlockchainProvider for BlockchairProvider {
    async fn fetch_balance(&self, address: &str) -> Result<FetchedBalance, ProviderError> {
        let entry = self.fetch_dashboard(address, 0).await?;

        // Blockchair reports confirmed funds only; unconfirmed stays zero
        Ok(FetchedBalance::new(entry.address.balance, 0))
    }

    async fn fetch_transactions(
        &self,
        address: &str,
    ) -> Result<Vec<FetchedTransaction>, ProviderError> {
        let entry = self.fetch_dashboard(address, TX_PAGE_LIMIT).await?;

        let mut hashes = entry.transactions;
        hashes.truncate(TX_PAGE_LIMIT);
        if hashes.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!(
            "{}/dashboards/transactions/{}",
            self.base_url,
            hashes.join(",")
        );
        tracing::debug!(%address, count = hashes.len(), "resolving transaction batch");

        let response: TransactionDashboardResponse = self.get_json(&url, address).await?;
        response
            .data
            .into_values()
            .map(Self::map_transaction)
            .collect()
    }

    fn provider_name(&self) -> &'static str {
        "blockchair"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_positive_balance_change_to_received() {
        let tx = BlockchairTransaction {
            hash: "aa".to_string(),
            time: "2024-03-01 10:15:00".to_string(),
            block_id: 833_000,
            balance_change: 25_000,
            fee: 300,
        };

        let mapped = BlockchairProvider::map_transaction(tx).unwrap();

        assert_eq!(mapped.direction, Direction::Received);
        assert_eq!(mapped.amount, 25_000);
        assert_eq!(mapped.confirmations, CONFIRMED_DEPTH);
        assert_eq!(mapped.block_height, Some(833_000));
        assert_eq!(mapped.fee, Some(300));
    }

    #[test]
    fn maps_negative_balance_change_to_sent_absolute() {
        let tx = BlockchairTransaction {
            hash: "bb".to_string(),
            time: "2024-03-02 09:00:00".to_string(),
            block_id: -1,
            balance_change: -40_000,
            fee: 500,
        };

        let mapped = BlockchairProvider::map_transaction(tx).unwrap();

        assert_eq!(mapped.direction, Direction::Sent);
        assert_eq!(mapped.amount, 40_000);
        assert_eq!(mapped.confirmations, 0);
        assert_eq!(mapped.block_height, None);
    }

    #[test]
    fn rejects_unparseable_time() {
        let tx = BlockchairTransaction {
            hash: "cc".to_string(),
            time: "not a time".to_string(),
            block_id: 1,
            balance_change: 1,
            fee: 0,
        };

        assert!(BlockchairProvider::map_transaction(tx).is_err());
    }
}
