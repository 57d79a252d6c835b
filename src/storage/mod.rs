//! Storage and persistence layer
//!
//! - `Persistence` contract consumed by the core
//! - In-memory and file system stores
//! - Private key encryption
//! - Data models
//!
//! Uniqueness of `(user_id, blockchain, currency_symbol)` and of one mnemonic
//! per user is enforced here, not by callers.

mod file_system;
mod keys;
mod memory;
mod models;

pub use file_system::FileStore;
pub use keys::KeyCipher;
pub use memory::InMemoryStore;
pub use models::{normalize_symbol, NewWallet, WalletKey, WalletRecord, WalletType};

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StorageError;

#[async_trait]
pub trait Persistence: Send + Sync {
    async fn get_mnemonic(&self, user_id: &str) -> Result<Option<String>, StorageError>;

    /// Store the phrase unless one exists. Returns whether this call won.
    async fn put_mnemonic_if_absent(&self, user_id: &str, phrase: &str)
        -> Result<bool, StorageError>;

    async fn list_wallets(&self, user_id: &str) -> Result<Vec<WalletRecord>, StorageError>;

    /// Insert unless a record with the same key exists. Returns whether a row was inserted.
    async fn insert_wallet_if_absent(&self, wallet: NewWallet) -> Result<bool, StorageError>;

    /// Set the balance of every record of this user matching address and symbol.
    /// Returns the number of records updated.
    async fn update_balance(
        &self,
        user_id: &str,
        address: &str,
        currency_symbol: &str,
        balance: f64,
    ) -> Result<usize, StorageError>;

    /// Returns the number of records actually removed.
    async fn delete_wallets(&self, user_id: &str, ids: &[Uuid]) -> Result<usize, StorageError>;
}
