//! On-chain balance reads
//!
//! - `rpc.rs` - `ChainRpc` trait and JSON-RPC clients (EVM, Solana, Sui)
//! - `tron.rs` - TronGrid client
//! - `esplora.rs` - Bitcoin via Esplora
//! - `cache.rs` - TTL cache of successful reads
//! - `fetcher.rs` - Timeout, caching and unit conversion across chains
//! - `units.rs` - Base-unit conversion

mod cache;
mod esplora;
mod fetcher;
mod rpc;
mod tron;
mod units;

pub use cache::{BalanceCache, CacheStats, DEFAULT_TTL};
pub use esplora::EsploraRpc;
pub use fetcher::{BalanceFetcher, DEFAULT_TIMEOUT};
pub use rpc::{balance_of_calldata, parse_hex_quantity, ChainRpc, EvmRpc, JsonRpcClient, SolanaRpc, SuiRpc};
pub use tron::TronRpc;
pub use units::to_display_units;

use serde::Serialize;
use std::fmt;

use crate::chains::Blockchain;
use crate::storage::{WalletRecord, WalletType};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AssetRef {
    Native,
    Token { contract: String, decimals: u32 },
}

/// Cache and fetch key
///
/// Token wallets share their chain's native address, so the asset is part
/// of the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BalanceKey {
    pub blockchain: Blockchain,
    pub address: String,
    pub asset: AssetRef,
}

impl BalanceKey {
    pub fn native(blockchain: Blockchain, address: impl Into<String>) -> Self {
        Self {
            blockchain,
            address: address.into(),
            asset: AssetRef::Native,
        }
    }

    pub fn for_record(record: &WalletRecord) -> Self {
        let asset = match &record.wallet_type {
            WalletType::Native => AssetRef::Native,
            WalletType::Token { contract, decimals } => AssetRef::Token {
                contract: contract.clone(),
                decimals: *decimals,
            },
        };
        Self {
            blockchain: record.blockchain,
            address: record.address.clone(),
            asset,
        }
    }

    pub fn decimals(&self) -> u32 {
        match &self.asset {
            AssetRef::Native => self.blockchain.native_decimals(),
            AssetRef::Token { decimals, .. } => *decimals,
        }
    }
}

impl fmt::Display for BalanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.asset {
            AssetRef::Native => write!(f, "{}:{}", self.blockchain, self.address),
            AssetRef::Token { contract, .. } => {
                write!(f, "{}:{} (token {})", self.blockchain, self.address, contract)
            }
        }
    }
}

/// Result of one balance read
///
/// `Unknown` means the read failed or timed out. It is shown as `0.0` where a
/// plain number is required but never persisted over a known balance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", content = "amount", rename_all = "snake_case")]
pub enum BalanceReading {
    Known(f64),
    Unknown,
}

impl BalanceReading {
    pub fn as_f64(&self) -> f64 {
        match self {
            BalanceReading::Known(amount) => *amount,
            BalanceReading::Unknown => 0.0,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, BalanceReading::Known(_))
    }
}
