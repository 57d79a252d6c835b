//! Common test utilities for portfolio integration tests
//!
//! This module provides shared test infrastructure including:
//! - Mock chain RPC clients with call counting, delays and failures
//! - Test environment setup over in-memory or temp-dir file stores
//! - Logging setup
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

use wallet_portfolio::balance::{BalanceFetcher, ChainRpc};
use wallet_portfolio::portfolio::StaticPriceFeed;
use wallet_portfolio::{
    Blockchain, FileStore, InMemoryStore, KeyCipher, Persistence, PortfolioConfig, RpcError,
    WalletManager,
};

pub const ABANDON_PHRASE: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

pub fn init_logging() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init();
}

pub fn test_cipher() -> KeyCipher {
    KeyCipher::new(&[7u8; 32])
}

/// Chain RPC double returning fixed base-unit balances
pub struct MockRpc {
    native: Mutex<u128>,
    tokens: Mutex<HashMap<String, u128>>,
    delay: Duration,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl MockRpc {
    pub fn new(native: u128) -> Arc<Self> {
        Self::build(native, Duration::ZERO)
    }

    pub fn slow(native: u128, delay: Duration) -> Arc<Self> {
        Self::build(native, delay)
    }

    fn build(native: u128, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            native: Mutex::new(native),
            tokens: Mutex::new(HashMap::new()),
            delay,
            failing: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn set_native(&self, units: u128) {
        *self.native.lock().unwrap() = units;
    }

    pub fn set_token(&self, contract: &str, units: u128) {
        self.tokens.lock().unwrap().insert(contract.to_string(), units);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainRpc for MockRpc {
    async fn get_native_balance(&self, _address: &str) -> Result<u128, RpcError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(RpcError::Http("mock outage".into()));
        }
        Ok(*self.native.lock().unwrap())
    }

    async fn get_token_balance(&self, _address: &str, contract: &str) -> Result<u128, RpcError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(RpcError::Http("mock outage".into()));
        }
        Ok(self.tokens.lock().unwrap().get(contract).copied().unwrap_or(0))
    }
}

/// Manager wired to mocks, with one `MockRpc` per chain
pub struct TestEnvironment {
    pub temp_dir: Option<TempDir>,
    pub store: Arc<dyn Persistence>,
    pub manager: WalletManager,
    pub rpcs: HashMap<Blockchain, Arc<MockRpc>>,
}

impl TestEnvironment {
    pub fn in_memory() -> Self {
        Self::with_store(Arc::new(InMemoryStore::new()), None)
    }

    pub fn with_memory_store(store: Arc<InMemoryStore>) -> Self {
        Self::with_store(store, None)
    }

    pub fn file_backed() -> anyhow::Result<Self> {
        let temp_dir = TempDir::new()?;
        log::info!("📁 Test directory: {:?}", temp_dir.path());
        let store = Arc::new(FileStore::new_with_base_dir(temp_dir.path().to_path_buf()));
        Ok(Self::with_store(store, Some(temp_dir)))
    }

    fn with_store(store: Arc<dyn Persistence>, temp_dir: Option<TempDir>) -> Self {
        init_logging();

        let rpcs: HashMap<Blockchain, Arc<MockRpc>> = Blockchain::ALL
            .iter()
            .map(|chain| (*chain, MockRpc::new(0)))
            .collect();

        let mut fetcher = BalanceFetcher::new(Duration::from_secs(15), Duration::from_secs(300));
        for (chain, rpc) in &rpcs {
            fetcher = fetcher.with_client(*chain, rpc.clone());
        }

        let prices = StaticPriceFeed::new()
            .with_price("ETH", 3000.0, 1.5)
            .with_price("BTC", 60000.0, -0.5)
            .with_price("SOL", 150.0, 2.0)
            .with_price("TRX", 0.1, 0.0)
            .with_price("USDT", 1.0, 0.0);

        let manager = WalletManager::with_components(
            store.clone(),
            Arc::new(fetcher),
            Arc::new(prices),
            test_cipher(),
            &PortfolioConfig::default(),
        )
        .unwrap();

        Self {
            temp_dir,
            store,
            manager,
            rpcs,
        }
    }

    pub fn rpc(&self, chain: Blockchain) -> &Arc<MockRpc> {
        &self.rpcs[&chain]
    }
}
