mod common;

use k256::elliptic_curve::sec1::ToEncodedPoint;
use sha3::{Digest, Keccak256};
use std::sync::Arc;

use common::ABANDON_PHRASE;
use wallet_portfolio::chains::{default_derivers, derive_all, DerivationPlan};
use wallet_portfolio::{Blockchain, MasterSeed, SeedManager, WalletData};

fn derive_everything(phrase: &str) -> Vec<WalletData> {
    let mnemonic = SeedManager::parse(phrase).unwrap();
    let seed = MasterSeed::from_mnemonic(&mnemonic);
    default_derivers(bitcoin::Network::Bitcoin)
        .unwrap()
        .iter()
        .map(|d| d.derive(&seed).unwrap())
        .collect()
}

fn wallet(wallets: &[WalletData], chain: Blockchain) -> &WalletData {
    wallets.iter().find(|w| w.blockchain == chain).unwrap()
}

fn is_evm_address(address: &str) -> bool {
    address.len() == 42
        && address.starts_with("0x")
        && address[2..].chars().all(|c| c.is_ascii_hexdigit())
}

#[test]
fn test_known_vectors() {
    common::init_logging();
    let wallets = derive_everything(ABANDON_PHRASE);

    assert_eq!(
        wallet(&wallets, Blockchain::Ethereum).address,
        "0x9858effd232b4033e47d90003d41ec34ecaeda94"
    );
    assert_eq!(
        wallet(&wallets, Blockchain::Bitcoin).address,
        "bc1qcr8te4kr609gcawutmrza0j4xv80jy8z306fyu"
    );
}

#[test]
fn test_derivation_is_deterministic() {
    for _ in 0..3 {
        let phrase = SeedManager::generate().unwrap().to_string();
        let first = derive_everything(&phrase);
        let second = derive_everything(&phrase);

        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.blockchain, b.blockchain);
            assert_eq!(a.address, b.address);
            assert_eq!(a.private_key(), b.private_key());
            assert_eq!(a.export_private_key(), b.export_private_key());
        }
    }
}

#[test]
fn test_address_formats() {
    let phrase = SeedManager::generate().unwrap().to_string();
    let wallets = derive_everything(&phrase);

    assert!(is_evm_address(&wallet(&wallets, Blockchain::Ethereum).address));
    assert!(is_evm_address(&wallet(&wallets, Blockchain::Polygon).address));

    let btc = &wallet(&wallets, Blockchain::Bitcoin).address;
    assert!(btc.starts_with("bc1q"));
    assert_eq!(btc.len(), 42);

    let sol = &wallet(&wallets, Blockchain::Solana).address;
    assert!((32..=44).contains(&sol.len()));
    assert_eq!(bitcoin::base58::decode(sol).unwrap().len(), 32);

    let tron = &wallet(&wallets, Blockchain::Tron).address;
    assert!(tron.starts_with('T'));
    assert_eq!(tron.len(), 34);

    let sui = &wallet(&wallets, Blockchain::Sui).address;
    assert!(sui.starts_with("0x"));
    assert_eq!(sui.len(), 66);
}

#[test]
fn test_ethereum_round_trip_with_independent_curve() {
    let phrase = SeedManager::generate().unwrap().to_string();
    let wallets = derive_everything(&phrase);
    let eth = wallet(&wallets, Blockchain::Ethereum);

    let secret = k256::SecretKey::from_slice(eth.private_key()).unwrap();
    let point = secret.public_key().to_encoded_point(false);
    let hash = Keccak256::digest(&point.as_bytes()[1..]);
    let recovered = format!("0x{}", hex::encode(&hash[12..]));

    assert_eq!(recovered, eth.address);
    assert_eq!(eth.export_private_key(), format!("0x{}", hex::encode(eth.private_key())));
}

#[test]
fn test_tron_shares_key_hash_layout_with_ethereum_scheme() {
    let wallets = derive_everything(ABANDON_PHRASE);
    let tron = wallet(&wallets, Blockchain::Tron);

    let payload = bitcoin::base58::decode_check(&tron.address).unwrap();
    assert_eq!(payload.len(), 21);
    assert_eq!(payload[0], 0x41);

    let secret = k256::SecretKey::from_slice(tron.private_key()).unwrap();
    let point = secret.public_key().to_encoded_point(false);
    let hash = Keccak256::digest(&point.as_bytes()[1..]);
    assert_eq!(&payload[1..], &hash[12..]);

    // Different coin type, so not the Ethereum key
    assert_ne!(tron.private_key(), wallet(&wallets, Blockchain::Ethereum).private_key());
}

#[tokio::test]
async fn test_parallel_matches_sequential() {
    let mnemonic = SeedManager::parse(ABANDON_PHRASE).unwrap();
    let seed = Arc::new(MasterSeed::from_mnemonic(&mnemonic));
    let derivers = default_derivers(bitcoin::Network::Bitcoin).unwrap();

    let parallel = derive_all(seed.clone(), &derivers).await;
    let report = DerivationPlan::standard().run(seed, &derivers).await;

    assert_eq!(report.strategy, Some("parallel"));
    assert_eq!(parallel.len(), Blockchain::ALL.len());
    for (a, b) in parallel.iter().zip(report.outcomes.iter()) {
        let (a, b) = (a.result.as_ref().unwrap(), b.result.as_ref().unwrap());
        assert_eq!(a.address, b.address);
    }
}

#[test]
fn test_testnet_bitcoin_uses_testnet_path() {
    let mnemonic = SeedManager::parse(ABANDON_PHRASE).unwrap();
    let seed = MasterSeed::from_mnemonic(&mnemonic);
    let derivers = default_derivers(bitcoin::Network::Testnet).unwrap();
    let btc = derivers
        .iter()
        .find(|d| d.blockchain() == Blockchain::Bitcoin)
        .unwrap();

    assert_eq!(btc.path().to_string(), "m/84'/1'/0'/0/0");
    assert!(btc.derive(&seed).unwrap().address.starts_with("tb1q"));
}
