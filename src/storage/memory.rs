use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::models::{normalize_symbol, NewWallet, WalletRecord};
use super::Persistence;
use crate::error::StorageError;

#[derive(Default)]
struct UserEntry {
    mnemonic: Option<String>,
    wallets: Vec<WalletRecord>,
}

/// Process-local store
///
/// With the unique constraint disabled it behaves like several service
/// instances racing against a store without a constraint, which is how
/// duplicate wallet rows appear in practice.
pub struct InMemoryStore {
    users: RwLock<HashMap<String, UserEntry>>,
    enforce_unique: bool,
    available: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            enforce_unique: true,
            available: AtomicBool::new(true),
        }
    }

    pub fn without_unique_constraint() -> Self {
        Self {
            enforce_unique: false,
            ..Self::new()
        }
    }

    /// Simulate the store going away (every call fails with `Unavailable`)
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Insert a record as-is, bypassing the unique constraint
    pub async fn insert_raw(&self, record: WalletRecord) {
        let mut users = self.users.write().await;
        users
            .entry(record.user_id.clone())
            .or_default()
            .wallets
            .push(record);
    }

    fn check_available(&self) -> Result<(), StorageError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StorageError::Unavailable("in-memory store offline".into()))
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Persistence for InMemoryStore {
    async fn get_mnemonic(&self, user_id: &str) -> Result<Option<String>, StorageError> {
        self.check_available()?;
        let users = self.users.read().await;
        Ok(users.get(user_id).and_then(|u| u.mnemonic.clone()))
    }

    async fn put_mnemonic_if_absent(
        &self,
        user_id: &str,
        phrase: &str,
    ) -> Result<bool, StorageError> {
        self.check_available()?;
        let mut users = self.users.write().await;
        let entry = users.entry(user_id.to_string()).or_default();
        if entry.mnemonic.is_some() {
            return Ok(false);
        }
        entry.mnemonic = Some(phrase.to_string());
        Ok(true)
    }

    async fn list_wallets(&self, user_id: &str) -> Result<Vec<WalletRecord>, StorageError> {
        self.check_available()?;
        let users = self.users.read().await;
        Ok(users
            .get(user_id)
            .map(|u| u.wallets.clone())
            .unwrap_or_default())
    }

    async fn insert_wallet_if_absent(&self, wallet: NewWallet) -> Result<bool, StorageError> {
        self.check_available()?;
        let mut users = self.users.write().await;
        let entry = users.entry(wallet.user_id.clone()).or_default();

        if self.enforce_unique {
            let key = wallet.key();
            if entry.wallets.iter().any(|w| w.key() == key) {
                return Ok(false);
            }
        }

        entry.wallets.push(WalletRecord::from_new(wallet));
        Ok(true)
    }

    async fn update_balance(
        &self,
        user_id: &str,
        address: &str,
        currency_symbol: &str,
        balance: f64,
    ) -> Result<usize, StorageError> {
        self.check_available()?;
        let mut users = self.users.write().await;
        let Some(entry) = users.get_mut(user_id) else {
            return Ok(0);
        };

        let symbol = normalize_symbol(currency_symbol);
        let now = Utc::now();
        let mut updated = 0;
        for wallet in entry
            .wallets
            .iter_mut()
            .filter(|w| w.address == address && normalize_symbol(&w.currency_symbol) == symbol)
        {
            wallet.balance = balance;
            wallet.updated_at = now;
            updated += 1;
        }
        Ok(updated)
    }

    async fn delete_wallets(&self, user_id: &str, ids: &[Uuid]) -> Result<usize, StorageError> {
        self.check_available()?;
        let mut users = self.users.write().await;
        let Some(entry) = users.get_mut(user_id) else {
            return Ok(0);
        };

        let before = entry.wallets.len();
        entry.wallets.retain(|w| !ids.contains(&w.id));
        Ok(before - entry.wallets.len())
    }
}
