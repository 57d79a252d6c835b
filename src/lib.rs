//! Wallet Portfolio: deterministic multi-chain wallets with balance reconciliation
//!
//! Derives one wallet per supported chain from a single BIP-39 mnemonic per
//! user, stores them idempotently, and folds on-chain balances into a
//! valued asset list.
//!
//! # Architecture
//!
//! - **Seed**: per-user mnemonic, created once
//! - **Chains**: BIP-32 (secp256k1) and SLIP-0010 (ed25519) derivers
//! - **Registry**: idempotent provisioning and duplicate repair
//! - **Balance**: RPC clients, timeout and TTL cache
//! - **Portfolio**: aggregation, prices and the refresh state machine
//!
//! # Example
//!
//! ```ignore
//! use wallet_portfolio::{PortfolioConfig, WalletManager};
//!
//! let config = PortfolioConfig::from_env();
//! let manager = WalletManager::new(&config)?;
//!
//! manager.ensure_wallets("alice").await?;
//! let assets = manager.refresh_portfolio("alice", false).await?;
//! ```

pub mod balance;
pub mod chains;
pub mod config;
pub mod error;
pub mod manager;
pub mod portfolio;
pub mod registry;
pub mod seed;
pub mod storage;

pub use balance::{BalanceCache, BalanceFetcher, BalanceKey, BalanceReading, ChainRpc};
pub use chains::{Blockchain, ChainDeriver, DerivationPath, MasterSeed, WalletData};
pub use config::PortfolioConfig;
pub use error::{
    CryptoError, DerivationError, PortfolioError, RpcError, SeedError, StorageError,
};
pub use manager::WalletManager;
pub use portfolio::{
    AggregationWarning, Asset, PortfolioSnapshot, PriceFeed, PriceQuote, RefreshState,
    WalletAggregator,
};
pub use registry::{Deduplicator, ReconcileReport, WalletRegistry};
pub use seed::SeedManager;
pub use storage::{FileStore, InMemoryStore, KeyCipher, Persistence, WalletRecord, WalletType};

// Common result type
pub type Result<T> = std::result::Result<T, PortfolioError>;
