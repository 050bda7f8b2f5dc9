//! Constants for the sync engine
//!
//! All tuning for the engine is centralized here. No runtime configuration
//! file is used - the system operates with these compile-time constants,
//! with the primary provider base URL overridable via `BLOCKCHAIR_API_URL`.

/// Minimum spacing between two calls through the primary-provider gate (in seconds)
pub const MIN_REQUEST_INTERVAL_SECS: u64 = 5;

/// Maximum number of attempts against the primary provider, including the first
pub const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Base delay for exponential backoff after a rate-limit response (in seconds)
pub const RETRY_BASE_DELAY_SECS: u64 = 10;

/// How long a fetched exchange rate stays fresh (in seconds)
pub const PRICE_CACHE_TTL_SECS: u64 = 60;

/// HTTP request timeout for provider calls (in seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum transactions fetched per sync (one provider page)
pub const TX_PAGE_LIMIT: usize = 100;

/// Confirmation count assigned to any transaction with a known block
pub const CONFIRMED_DEPTH: u32 = 6;

/// Satoshis per bitcoin, for fiat conversion
pub const SATS_PER_BTC: f64 = 100_000_000.0;

/// Blockchair API base URL (primary provider)
pub const BLOCKCHAIR_API_URL: &str = "https://api.blockchair.com/bitcoin";

/// Environment variable overriding the Blockchair base URL
pub const BLOCKCHAIR_API_URL_ENV: &str = "BLOCKCHAIR_API_URL";

/// blockchain.info API base URL (fallback provider)
pub const BLOCKCHAIN_INFO_API_URL: &str = "https://blockchain.info";

/// CoinGecko API base URL (exchange rate source)
pub const COINGECKO_API_URL: &str = "https://api.coingecko.com/api/v3";

/// CoinGecko API endpoint for simple price queries
pub const COINGECKO_SIMPLE_PRICE_ENDPOINT: &str = "/simple/price";

/// User agent for HTTP requests
pub const USER_AGENT: &str = "bitsync/0.1.0";
