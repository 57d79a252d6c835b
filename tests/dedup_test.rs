mod common;

use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

use common::TestEnvironment;
use wallet_portfolio::registry::select_duplicates;
use wallet_portfolio::{
    Blockchain, Deduplicator, InMemoryStore, Persistence, StorageError, WalletRecord, WalletType,
};

fn eth_record(user_id: &str, minutes_ago: i64, balance: f64) -> WalletRecord {
    WalletRecord {
        id: Uuid::new_v4(),
        user_id: user_id.to_string(),
        blockchain: Blockchain::Ethereum,
        currency_symbol: "ETH".into(),
        address: "0x9858effd232b4033e47d90003d41ec34ecaeda94".into(),
        encrypted_private_key: String::new(),
        wallet_type: WalletType::Native,
        balance,
        updated_at: Utc::now() - Duration::minutes(minutes_ago),
    }
}

#[tokio::test]
async fn test_reconcile_keeps_most_recent() {
    let store = Arc::new(InMemoryStore::without_unique_constraint());
    let t1 = eth_record("u1", 30, 1.0);
    let t2 = eth_record("u1", 20, 2.0);
    let t3 = eth_record("u1", 10, 3.0);
    let newest = t3.id;
    for record in [t2, t3, t1] {
        store.insert_raw(record).await;
    }

    let dedup = Deduplicator::new(store.clone());
    let report = dedup.reconcile("u1").await.unwrap();
    assert_eq!(report.deleted_count, 2);
    assert_eq!(report.kept_count, 1);

    let remaining = store.list_wallets("u1").await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, newest);
    assert_eq!(remaining[0].balance, 3.0);

    let again = dedup.reconcile("u1").await.unwrap();
    assert_eq!(again.deleted_count, 0);
    assert_eq!(again.kept_count, 1);
}

#[tokio::test]
async fn test_reconcile_leaves_other_users_and_keys_alone() {
    let store = Arc::new(InMemoryStore::without_unique_constraint());
    store.insert_raw(eth_record("u1", 5, 1.0)).await;
    store.insert_raw(eth_record("u1", 1, 1.0)).await;
    store.insert_raw(eth_record("u2", 5, 1.0)).await;
    store.insert_raw(eth_record("u2", 1, 1.0)).await;

    let mut usdt = eth_record("u1", 1, 9.0);
    usdt.currency_symbol = "USDT".into();
    usdt.wallet_type = WalletType::Token {
        contract: wallet_portfolio::registry::USDT_ERC20_CONTRACT.into(),
        decimals: 6,
    };
    store.insert_raw(usdt).await;

    let report = Deduplicator::new(store.clone()).reconcile("u1").await.unwrap();
    assert_eq!(report.deleted_count, 1);
    assert_eq!(report.kept_count, 2);

    assert_eq!(store.list_wallets("u1").await.unwrap().len(), 2);
    assert_eq!(store.list_wallets("u2").await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_reconcile_empty_user() {
    let store = Arc::new(InMemoryStore::new());
    let report = Deduplicator::new(store).reconcile("nobody").await.unwrap();
    assert_eq!(report.deleted_count, 0);
    assert_eq!(report.kept_count, 0);
}

#[tokio::test]
async fn test_reconcile_surfaces_storage_outage() {
    let store = Arc::new(InMemoryStore::new());
    store.set_available(false);

    let err = Deduplicator::new(store).reconcile("u1").await.unwrap_err();
    assert!(matches!(err, StorageError::Unavailable(_)));
}

#[test]
fn test_equal_timestamps_break_ties_by_id() {
    let a = eth_record("u1", 0, 1.0);
    let mut b = a.clone();
    b.id = Uuid::new_v4();

    let (keep, delete) = select_duplicates(&[a.clone(), b.clone()]);
    let winner = a.id.max(b.id);
    assert_eq!(keep, vec![winner]);
    assert_eq!(delete.len(), 1);
    assert_ne!(delete[0], winner);

    // Order of the input does not matter
    let (keep_reversed, _) = select_duplicates(&[b, a]);
    assert_eq!(keep_reversed, keep);
}

#[tokio::test]
async fn test_reconcile_after_provisioning_is_noop() {
    let env = TestEnvironment::in_memory();
    let wallets = env.manager.ensure_wallets("u3").await.unwrap();

    let report = env.manager.reconcile_duplicates("u3").await.unwrap();
    assert_eq!(report.deleted_count, 0);
    assert_eq!(report.kept_count, wallets.len());
}
