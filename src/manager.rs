use std::sync::Arc;

use crate::balance::BalanceFetcher;
use crate::chains::default_derivers;
use crate::config::PortfolioConfig;
use crate::error::{PortfolioError, StorageError};
use crate::portfolio::{Asset, CoinGeckoPriceFeed, PortfolioRefresh, PortfolioSnapshot, PriceFeed};
use crate::registry::{Deduplicator, ProvisionReport, ReconcileReport, WalletRegistry};
use crate::storage::{FileStore, KeyCipher, Persistence, WalletRecord};

/// Entry point for the layers around the core
///
/// All state is partitioned by user id; work for one user never waits on
/// another.
pub struct WalletManager {
    store: Arc<dyn Persistence>,
    registry: Arc<WalletRegistry>,
    deduplicator: Deduplicator,
    fetcher: Arc<BalanceFetcher>,
    refresh: PortfolioRefresh,
}

impl WalletManager {
    /// File store, real RPC clients and CoinGecko prices from `config`
    ///
    /// Fails with [`PortfolioError::Config`] when no encryption key is configured.
    pub fn new(config: &PortfolioConfig) -> Result<Self, PortfolioError> {
        let cipher = config.persistent_cipher()?;
        let store: Arc<dyn Persistence> =
            Arc::new(FileStore::new_with_base_dir(config.data_dir.clone()));
        let fetcher = Arc::new(BalanceFetcher::from_config(config));
        let prices: Arc<dyn PriceFeed> = Arc::new(CoinGeckoPriceFeed::new(&config.price_api_url));

        Self::with_components(store, fetcher, prices, cipher, config)
    }

    pub fn with_components(
        store: Arc<dyn Persistence>,
        fetcher: Arc<BalanceFetcher>,
        prices: Arc<dyn PriceFeed>,
        cipher: KeyCipher,
        config: &PortfolioConfig,
    ) -> Result<Self, PortfolioError> {
        let derivers = default_derivers(config.bitcoin_network)
            .map_err(|e| PortfolioError::Config(format!("invalid derivation setup: {}", e)))?;

        let registry = Arc::new(WalletRegistry::new(store.clone(), derivers, cipher));
        let refresh = PortfolioRefresh::new(store.clone(), registry.clone(), fetcher.clone(), prices)
            .with_max_retries(config.max_refresh_retries);

        Ok(Self {
            deduplicator: Deduplicator::new(store.clone()),
            store,
            registry,
            fetcher,
            refresh,
        })
    }

    pub fn store(&self) -> &Arc<dyn Persistence> {
        &self.store
    }

    pub fn registry(&self) -> &WalletRegistry {
        &self.registry
    }

    pub fn fetcher(&self) -> &BalanceFetcher {
        &self.fetcher
    }

    pub async fn ensure_wallets(&self, user_id: &str) -> Result<Vec<WalletRecord>, PortfolioError> {
        self.registry.ensure_wallets(user_id).await
    }

    pub async fn ensure_wallets_report(&self, user_id: &str) -> Result<ProvisionReport, PortfolioError> {
        self.registry.ensure_wallets_report(user_id).await
    }

    /// Assets sorted by value. Balances that could not be read show as zero.
    pub async fn refresh_portfolio(&self, user_id: &str, force: bool) -> Result<Vec<Asset>, PortfolioError> {
        Ok(self.refresh.run(user_id, force).await?.assets)
    }

    pub async fn refresh_portfolio_snapshot(
        &self,
        user_id: &str,
        force: bool,
    ) -> Result<PortfolioSnapshot, PortfolioError> {
        self.refresh.run(user_id, force).await
    }

    pub async fn reconcile_duplicates(&self, user_id: &str) -> Result<ReconcileReport, StorageError> {
        self.deduplicator.reconcile(user_id).await
    }

    /// Adopt an existing mnemonic for a user who has none yet
    pub async fn import_seed(&self, user_id: &str, phrase: &str) -> Result<(), PortfolioError> {
        self.registry.seeds().import(user_id, phrase).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_refuses_ephemeral_key() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config = PortfolioConfig {
            data_dir: temp_dir.path().join("wallets"),
            ..Default::default()
        };

        let err = WalletManager::new(&config).err().unwrap();
        assert!(matches!(err, PortfolioError::Config(_)));
        assert!(!config.data_dir.exists());
    }

    #[tokio::test]
    async fn test_new_with_key_uses_file_store() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config = PortfolioConfig {
            data_dir: temp_dir.path().to_path_buf(),
            encryption_key: Some("33".repeat(32)),
            ..Default::default()
        };

        let manager = WalletManager::new(&config).unwrap();
        let phrase = crate::seed::SeedManager::generate().unwrap().to_string();
        manager.import_seed("alice", &phrase).await.unwrap();

        let reopened = FileStore::new_with_base_dir(config.data_dir.clone());
        assert_eq!(reopened.get_mnemonic("alice").await.unwrap(), Some(phrase.clone()));
        assert_eq!(manager.store().get_mnemonic("alice").await.unwrap(), Some(phrase));
    }
}
