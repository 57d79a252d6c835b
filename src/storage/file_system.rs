use async_trait::async_trait;
use chrono::Utc;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::models::{normalize_symbol, NewWallet, WalletRecord};
use super::Persistence;
use crate::error::StorageError;

const MNEMONIC_FILE: &str = "mnemonic.txt";
const WALLETS_DIR: &str = "wallets";

/// Directory-per-user store
///
/// ```text
/// <base>/<user>/mnemonic.txt
/// <base>/<user>/wallets/<Blockchain>_<SYMBOL>.json
/// ```
///
/// Create-if-absent is a hard link from a fully written temp file onto the
/// final name, so a concurrent writer either wins outright or sees the file.
pub struct FileStore {
    base_path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Create a new store under the default base directory ("./wallets")
    pub fn new() -> Self {
        Self::new_with_base_dir(PathBuf::from("./wallets"))
    }

    /// Create a store with a custom base directory (for testing)
    pub fn new_with_base_dir(base_path: PathBuf) -> Self {
        Self {
            base_path,
            write_lock: Mutex::new(()),
        }
    }

    pub fn base_dir(&self) -> &PathBuf {
        &self.base_path
    }

    fn user_dir(&self, user_id: &str) -> PathBuf {
        self.base_path.join(sanitize_user_id(user_id))
    }

    fn wallets_dir(&self, user_id: &str) -> PathBuf {
        self.user_dir(user_id).join(WALLETS_DIR)
    }

    async fn read_records(&self, user_id: &str) -> Result<Vec<(PathBuf, WalletRecord)>, StorageError> {
        let dir = self.wallets_dir(user_id);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            // Removed by a concurrent delete since the directory was listed
            let contents = match fs::read_to_string(&path).await {
                Ok(contents) => contents,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            let record: WalletRecord = serde_json::from_str(&contents).map_err(|e| {
                StorageError::Corrupt(format!("{}: {}", path.display(), e))
            })?;
            records.push((path, record));
        }
        Ok(records)
    }
}

impl Default for FileStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Keep user ids as directory names only when they are plainly safe
fn sanitize_user_id(user_id: &str) -> String {
    let safe = !user_id.is_empty()
        && user_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if safe {
        user_id.to_string()
    } else {
        format!("x{}", hex::encode(user_id.as_bytes()))
    }
}

/// Write `contents` to `target` only if `target` does not exist yet
async fn create_exclusive(target: &Path, contents: &[u8]) -> Result<bool, StorageError> {
    let tmp = target.with_extension(format!("{}.tmp", Uuid::new_v4().simple()));
    fs::write(&tmp, contents).await?;

    let linked = fs::hard_link(&tmp, target).await;
    let _ = fs::remove_file(&tmp).await;

    match linked {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(e.into()),
    }
}

async fn replace_atomic(target: &Path, contents: &[u8]) -> Result<(), StorageError> {
    let tmp = target.with_extension(format!("{}.tmp", Uuid::new_v4().simple()));
    fs::write(&tmp, contents).await?;
    fs::rename(&tmp, target).await?;
    Ok(())
}

#[async_trait]
impl Persistence for FileStore {
    async fn get_mnemonic(&self, user_id: &str) -> Result<Option<String>, StorageError> {
        let path = self.user_dir(user_id).join(MNEMONIC_FILE);
        match fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(contents.trim().to_string())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put_mnemonic_if_absent(
        &self,
        user_id: &str,
        phrase: &str,
    ) -> Result<bool, StorageError> {
        let dir = self.user_dir(user_id);
        fs::create_dir_all(&dir).await?;
        create_exclusive(&dir.join(MNEMONIC_FILE), phrase.as_bytes()).await
    }

    async fn list_wallets(&self, user_id: &str) -> Result<Vec<WalletRecord>, StorageError> {
        Ok(self
            .read_records(user_id)
            .await?
            .into_iter()
            .map(|(_, record)| record)
            .collect())
    }

    async fn insert_wallet_if_absent(&self, wallet: NewWallet) -> Result<bool, StorageError> {
        let dir = self.wallets_dir(&wallet.user_id);
        fs::create_dir_all(&dir).await?;

        let record = WalletRecord::from_new(wallet);
        let file_name = format!(
            "{}_{}.json",
            record.blockchain.as_str(),
            record.currency_symbol
        );
        let json = serde_json::to_string_pretty(&record)?;

        let inserted = create_exclusive(&dir.join(&file_name), json.as_bytes()).await?;
        if inserted {
            log::debug!("Stored wallet {} for user {}", file_name, record.user_id);
        }
        Ok(inserted)
    }

    async fn update_balance(
        &self,
        user_id: &str,
        address: &str,
        currency_symbol: &str,
        balance: f64,
    ) -> Result<usize, StorageError> {
        let _guard = self.write_lock.lock().await;

        let symbol = normalize_symbol(currency_symbol);
        let mut updated = 0;
        for (path, mut record) in self.read_records(user_id).await? {
            if record.address != address || normalize_symbol(&record.currency_symbol) != symbol {
                continue;
            }
            record.balance = balance;
            record.updated_at = Utc::now();
            let json = serde_json::to_string_pretty(&record)?;
            replace_atomic(&path, json.as_bytes()).await?;
            updated += 1;
        }
        Ok(updated)
    }

    async fn delete_wallets(&self, user_id: &str, ids: &[Uuid]) -> Result<usize, StorageError> {
        let _guard = self.write_lock.lock().await;

        let mut deleted = 0;
        for (path, record) in self.read_records(user_id).await? {
            if !ids.contains(&record.id) {
                continue;
            }
            match fs::remove_file(&path).await {
                Ok(()) => {
                    log::warn!("Deleted wallet record {} ({})", record.id, path.display());
                    deleted += 1;
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(deleted)
    }
}
