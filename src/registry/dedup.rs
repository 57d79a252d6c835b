use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::StorageError;
use crate::storage::{Persistence, WalletKey, WalletRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ReconcileReport {
    pub deleted_count: usize,
    pub kept_count: usize,
}

/// Removes duplicate wallet rows left behind by provisioning races
///
/// Safe to run at any time: a second pass over reconciled data deletes nothing.
pub struct Deduplicator {
    store: Arc<dyn Persistence>,
}

impl Deduplicator {
    pub fn new(store: Arc<dyn Persistence>) -> Self {
        Self { store }
    }

    pub async fn reconcile(&self, user_id: &str) -> Result<ReconcileReport, StorageError> {
        let records = self.store.list_wallets(user_id).await?;
        let (keep, delete) = select_duplicates(&records);

        if delete.is_empty() {
            log::debug!("No duplicate wallets for user {}", user_id);
            return Ok(ReconcileReport {
                deleted_count: 0,
                kept_count: keep.len(),
            });
        }

        let deleted_count = self.store.delete_wallets(user_id, &delete).await?;
        log::info!(
            "🧹 Reconciled wallets for user {}: kept {}, deleted {}",
            user_id,
            keep.len(),
            deleted_count
        );

        Ok(ReconcileReport {
            deleted_count,
            kept_count: keep.len(),
        })
    }
}

/// Split record ids into survivors and duplicates
///
/// Per `(blockchain, currency_symbol)` the record with the latest `updated_at`
/// survives; equal timestamps fall back to the greater id.
pub fn select_duplicates(records: &[WalletRecord]) -> (Vec<Uuid>, Vec<Uuid>) {
    let mut groups: BTreeMap<WalletKey, Vec<&WalletRecord>> = BTreeMap::new();
    for record in records {
        groups.entry(record.key()).or_default().push(record);
    }

    let mut keep = Vec::with_capacity(groups.len());
    let mut delete = Vec::new();

    for (_, group) in groups {
        let Some(winner) = group.iter().max_by_key(|r| (r.updated_at, r.id)) else {
            continue;
        };
        keep.push(winner.id);
        delete.extend(group.iter().filter(|r| r.id != winner.id).map(|r| r.id));
    }

    (keep, delete)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chains::Blockchain;
    use crate::storage::WalletType;
    use chrono::{Duration, Utc};

    fn record(chain: Blockchain, symbol: &str, age_secs: i64) -> WalletRecord {
        WalletRecord {
            id: Uuid::new_v4(),
            user_id: "u1".into(),
            blockchain: chain,
            currency_symbol: symbol.into(),
            address: "addr".into(),
            encrypted_private_key: "00".into(),
            wallet_type: WalletType::Native,
            balance: 0.0,
            updated_at: Utc::now() - Duration::seconds(age_secs),
        }
    }

    #[test]
    fn test_latest_survives() {
        let old = record(Blockchain::Ethereum, "ETH", 30);
        let mid = record(Blockchain::Ethereum, "ETH", 20);
        let new = record(Blockchain::Ethereum, "ETH", 10);
        let other = record(Blockchain::Tron, "TRX", 100);

        let (keep, delete) = select_duplicates(&[mid.clone(), new.clone(), old.clone(), other.clone()]);
        assert_eq!(keep.len(), 2);
        assert!(keep.contains(&new.id));
        assert!(keep.contains(&other.id));
        assert_eq!(delete.len(), 2);
        assert!(delete.contains(&old.id) && delete.contains(&mid.id));
    }

    #[test]
    fn test_equal_timestamps_are_deterministic() {
        let a = record(Blockchain::Sui, "SUI", 0);
        let mut b = a.clone();
        b.id = Uuid::new_v4();

        let (keep_ab, _) = select_duplicates(&[a.clone(), b.clone()]);
        let (keep_ba, _) = select_duplicates(&[b.clone(), a.clone()]);
        assert_eq!(keep_ab, keep_ba);
        assert_eq!(keep_ab[0], a.id.max(b.id));
    }

    #[test]
    fn test_same_symbol_different_chain_is_not_duplicate() {
        let eth = record(Blockchain::Ethereum, "USDT", 0);
        let tron = record(Blockchain::Tron, "USDT", 0);
        let (keep, delete) = select_duplicates(&[eth, tron]);
        assert_eq!(keep.len(), 2);
        assert!(delete.is_empty());
    }
}
