mod common;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use common::{TestEnvironment, ABANDON_PHRASE};
use wallet_portfolio::registry::default_targets;
use wallet_portfolio::storage::WalletKey;
use wallet_portfolio::{Blockchain, InMemoryStore, Persistence, SeedError, WalletRecord};

fn keys(records: &[WalletRecord]) -> Vec<WalletKey> {
    let mut keys: Vec<_> = records.iter().map(|r| r.key()).collect();
    keys.sort();
    keys
}

#[tokio::test]
async fn test_ensure_wallets_is_idempotent() {
    let env = TestEnvironment::in_memory();

    let first = env.manager.ensure_wallets("alice").await.unwrap();
    let second = env.manager.ensure_wallets("alice").await.unwrap();

    assert_eq!(first.len(), default_targets().len());
    assert_eq!(keys(&first), keys(&second));

    let first_ids: HashSet<_> = first.iter().map(|r| r.id).collect();
    let second_ids: HashSet<_> = second.iter().map(|r| r.id).collect();
    assert_eq!(first_ids, second_ids);
}

#[tokio::test]
async fn test_concurrent_calls_in_one_process() {
    let env = Arc::new(TestEnvironment::in_memory());

    let calls: Vec<_> = (0..4)
        .map(|_| {
            let env = env.clone();
            tokio::spawn(async move { env.manager.ensure_wallets("bob").await.unwrap() })
        })
        .collect();
    for call in futures::future::join_all(calls).await {
        call.unwrap();
    }

    let stored = env.store.list_wallets("bob").await.unwrap();
    assert_eq!(stored.len(), default_targets().len());
    assert_eq!(env.manager.registry().guard().active_users(), 0);
}

#[tokio::test]
async fn test_two_instances_without_constraint_converge_after_reconcile() {
    common::init_logging();
    let store = Arc::new(InMemoryStore::without_unique_constraint());
    let instance_a = Arc::new(TestEnvironment::with_memory_store(store.clone()));
    let instance_b = Arc::new(TestEnvironment::with_memory_store(store.clone()));

    let a = {
        let env = instance_a.clone();
        tokio::spawn(async move { env.manager.ensure_wallets("carol").await.unwrap() })
    };
    let b = {
        let env = instance_b.clone();
        tokio::spawn(async move { env.manager.ensure_wallets("carol").await.unwrap() })
    };
    a.await.unwrap();
    b.await.unwrap();

    let before = store.list_wallets("carol").await.unwrap();
    assert!(before.len() >= default_targets().len());

    // Both instances derived from the one stored mnemonic
    let mut addresses: HashMap<WalletKey, HashSet<String>> = HashMap::new();
    for record in &before {
        addresses.entry(record.key()).or_default().insert(record.address.clone());
    }
    assert!(addresses.values().all(|set| set.len() == 1));

    let report = instance_a.manager.reconcile_duplicates("carol").await.unwrap();
    assert_eq!(report.kept_count, default_targets().len());
    assert_eq!(report.deleted_count, before.len() - default_targets().len());

    let after = store.list_wallets("carol").await.unwrap();
    let unique: HashSet<_> = after.iter().map(|r| r.key()).collect();
    assert_eq!(unique.len(), after.len());
    assert_eq!(after.len(), default_targets().len());
}

#[tokio::test]
async fn test_imported_seed_drives_addresses() {
    let env = TestEnvironment::in_memory();
    env.manager.import_seed("dave", ABANDON_PHRASE).await.unwrap();

    let wallets = env.manager.ensure_wallets("dave").await.unwrap();
    let eth = wallets
        .iter()
        .find(|w| w.blockchain == Blockchain::Ethereum && w.currency_symbol == "ETH")
        .unwrap();
    assert_eq!(eth.address, "0x9858effd232b4033e47d90003d41ec34ecaeda94");

    let other = wallet_portfolio::SeedManager::generate().unwrap().to_string();
    let err = env.manager.import_seed("dave", &other).await.unwrap_err();
    assert!(matches!(
        err,
        wallet_portfolio::PortfolioError::Seed(SeedError::AlreadyExists(_))
    ));
}

#[tokio::test]
async fn test_file_store_provisioning_survives_restart() {
    let env = TestEnvironment::file_backed().unwrap();
    let first = env.manager.ensure_wallets("erin").await.unwrap();
    assert_eq!(first.len(), default_targets().len());

    // A second store over the same directory sees the same records
    let base = env.temp_dir.as_ref().unwrap().path().to_path_buf();
    let reopened = wallet_portfolio::FileStore::new_with_base_dir(base);
    let stored = reopened.list_wallets("erin").await.unwrap();
    assert_eq!(keys(&stored), keys(&first));
    assert!(reopened.get_mnemonic("erin").await.unwrap().is_some());

    let report = env.manager.ensure_wallets_report("erin").await.unwrap();
    assert_eq!(report.created, 0);
}

#[tokio::test]
async fn test_file_store_rejects_duplicate_insert() {
    let env = TestEnvironment::file_backed().unwrap();
    env.manager.ensure_wallets("frank").await.unwrap();

    let existing = env.store.list_wallets("frank").await.unwrap();
    let sol = existing.iter().find(|w| w.currency_symbol == "SOL").unwrap();
    let inserted = env
        .store
        .insert_wallet_if_absent(wallet_portfolio::storage::NewWallet {
            user_id: "frank".into(),
            blockchain: Blockchain::Solana,
            currency_symbol: "SOL".into(),
            address: sol.address.clone(),
            encrypted_private_key: sol.encrypted_private_key.clone(),
            wallet_type: wallet_portfolio::WalletType::Native,
        })
        .await
        .unwrap();
    assert!(!inserted);
}

#[tokio::test]
async fn test_stored_keys_decrypt_to_exported_form() {
    let env = TestEnvironment::in_memory();
    env.manager.import_seed("gina", ABANDON_PHRASE).await.unwrap();
    let wallets = env.manager.ensure_wallets("gina").await.unwrap();

    let mnemonic = wallet_portfolio::SeedManager::parse(ABANDON_PHRASE).unwrap();
    let seed = wallet_portfolio::MasterSeed::from_mnemonic(&mnemonic);
    let cipher = common::test_cipher();

    for deriver in wallet_portfolio::chains::default_derivers(bitcoin::Network::Bitcoin).unwrap() {
        let expected = deriver.derive(&seed).unwrap();
        for record in wallets.iter().filter(|w| w.blockchain == deriver.blockchain()) {
            assert_eq!(record.address, expected.address);
            assert_ne!(record.encrypted_private_key, expected.export_private_key());
            let plaintext = cipher.decrypt(&record.encrypted_private_key).unwrap();
            assert_eq!(plaintext.as_slice(), expected.export_private_key().as_bytes());
        }
    }
}
