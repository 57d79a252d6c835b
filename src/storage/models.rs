//! Data models for wallet storage

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::chains::Blockchain;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WalletType {
    Native,
    Token { contract: String, decimals: u32 },
}

/// Canonical form of a currency symbol: trimmed, upper case
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

/// Uniqueness key of a live wallet within one user
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WalletKey {
    pub blockchain: Blockchain,
    pub currency_symbol: String,
}

impl WalletKey {
    pub fn new(blockchain: Blockchain, currency_symbol: &str) -> Self {
        Self {
            blockchain,
            currency_symbol: normalize_symbol(currency_symbol),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletRecord {
    pub id: Uuid,
    pub user_id: String,
    pub blockchain: Blockchain,
    pub currency_symbol: String,
    pub address: String,
    pub encrypted_private_key: String,
    pub wallet_type: WalletType,
    pub balance: f64,
    pub updated_at: DateTime<Utc>,
}

impl WalletRecord {
    pub fn from_new(wallet: NewWallet) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: wallet.user_id,
            blockchain: wallet.blockchain,
            currency_symbol: normalize_symbol(&wallet.currency_symbol),
            address: wallet.address,
            encrypted_private_key: wallet.encrypted_private_key,
            wallet_type: wallet.wallet_type,
            balance: 0.0,
            updated_at: Utc::now(),
        }
    }

    pub fn key(&self) -> WalletKey {
        WalletKey::new(self.blockchain, &self.currency_symbol)
    }
}

/// Insert payload for [`super::Persistence::insert_wallet_if_absent`]
#[derive(Debug, Clone)]
pub struct NewWallet {
    pub user_id: String,
    pub blockchain: Blockchain,
    pub currency_symbol: String,
    pub address: String,
    pub encrypted_private_key: String,
    pub wallet_type: WalletType,
}

impl NewWallet {
    pub fn key(&self) -> WalletKey {
        WalletKey::new(self.blockchain, &self.currency_symbol)
    }
}
