//! Provider abstraction for fetching address data from blockchain APIs

use crate::{
    error::ProviderError,
    types::{AddressData, FetchedBalance, FetchedTransaction},
};
use async_trait::async_trait;

/// Trait for blockchain data providers
///
/// Implementations talk to one external data source and normalize its
/// responses into the engine's canonical shapes. Providers are scoped to the
/// raw address string; the returned records carry no owner key, which the
/// orchestrator stamps before merging.
#[async_trait]
pub trait BlockchainProvider: Send + Sync {
    /// Fetches the current balance for an address
    async fn fetch_balance(&self, address: &str) -> Result<FetchedBalance, ProviderError>;

    /// Fetches up to one page of transactions for an address
    async fn fetch_transactions(
        &self,
        address: &str,
    ) -> Result<Vec<FetchedTransaction>, ProviderError>;

    /// Fetches balance and transactions together
    ///
    /// The default issues the two granular calls back to back. Providers
    /// whose API answers both in a single request override this.
    async fn fetch_address_data(&self, address: &str) -> Result<AddressData, ProviderError> {
        let balance = self.fetch_balance(address).await?;
        let transactions = self.fetch_transactions(address).await?;
        Ok(AddressData {
            balance,
            transactions,
        })
    }

    /// Returns the name of this provider
    fn provider_name(&self) -> &'static str;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Mock provider for testing, with scripted per-method response queues
    pub struct MockProvider {
        name: &'static str,
        balances: Mutex<VecDeque<Result<FetchedBalance, ProviderError>>>,
        transactions: Mutex<VecDeque<Result<Vec<FetchedTransaction>, ProviderError>>>,
        balance_calls: Mutex<usize>,
        transaction_calls: Mutex<usize>,
    }

    impl MockProvider {
        pub fn new(name: &'static str) -> Self {
            Self {
                name,
                balances: Mutex::new(VecDeque::new()),
                transactions: Mutex::new(VecDeque::new()),
                balance_calls: Mutex::new(0),
                transaction_calls: Mutex::new(0),
            }
        }

        /// Queues a response for the next `fetch_balance` call
        pub fn push_balance(&self, response: Result<FetchedBalance, ProviderError>) {
            self.balances.lock().unwrap().push_back(response);
        }

        /// Queues a response for the next `fetch_transactions` call
        pub fn push_transactions(
            &self,
            response: Result<Vec<FetchedTransaction>, ProviderError>,
        ) {
            self.transactions.lock().unwrap().push_back(response);
        }

        pub fn balance_calls(&self) -> usize {
            *self.balance_calls.lock().unwrap()
        }

        pub fn transaction_calls(&self) -> usize {
            *self.transaction_calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl BlockchainProvider for MockProvider {
        async fn fetch_balance(&self, address: &str) -> Result<FetchedBalance, ProviderError> {
            *self.balance_calls.lock().unwrap() += 1;
            self.balances
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| {
                    Err(ProviderError::unknown(format!(
                        "no scripted balance for {address}"
                    )))
                })
        }

        async fn fetch_transactions(
            &self,
            address: &str,
        ) -> Result<Vec<FetchedTransaction>, ProviderError> {
            *self.transaction_calls.lock().unwrap() += 1;
            self.transactions
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| {
                    Err(ProviderError::unknown(format!(
                        "no scripted transactions for {address}"
                    )))
                })
        }

        fn provider_name(&self) -> &'static str {
            self.name
        }
    }
}
