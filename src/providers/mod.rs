//! Blockchain data provider implementations

pub mod blockchair;
pub mod blockchain_info;

pub use blockchair::BlockchairProvider;
pub use blockchain_info::BlockchainInfoProvider;
