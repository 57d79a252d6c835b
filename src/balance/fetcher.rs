use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::cache::BalanceCache;
use super::esplora::EsploraRpc;
use super::rpc::{ChainRpc, EvmRpc, SolanaRpc, SuiRpc};
use super::tron::TronRpc;
use super::units::to_display_units;
use super::{AssetRef, BalanceKey, BalanceReading};
use crate::chains::Blockchain;
use crate::config::PortfolioConfig;
use crate::error::RpcError;

/// Default per-call RPC deadline
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Cached, time-boxed balance reads across all chains
///
/// A failed or timed-out read is logged and reported as
/// [`BalanceReading::Unknown`]; it never fails the caller and is never cached.
pub struct BalanceFetcher {
    clients: HashMap<Blockchain, Arc<dyn ChainRpc>>,
    cache: BalanceCache,
    timeout: Duration,
}

impl BalanceFetcher {
    pub fn new(timeout: Duration, cache_ttl: Duration) -> Self {
        Self {
            clients: HashMap::new(),
            cache: BalanceCache::new(cache_ttl),
            timeout,
        }
    }

    /// Real RPC clients for every chain, sharing one HTTP connection pool
    pub fn from_config(config: &PortfolioConfig) -> Self {
        let http = reqwest::Client::new();
        let evm = |url: &str| -> Arc<dyn ChainRpc> { Arc::new(EvmRpc::with_client(http.clone(), url)) };

        Self::new(config.balance_timeout, config.balance_cache_ttl)
            .with_client(Blockchain::Ethereum, evm(&config.ethereum_rpc_url))
            .with_client(Blockchain::Polygon, evm(&config.polygon_rpc_url))
            .with_client(
                Blockchain::Tron,
                Arc::new(
                    TronRpc::with_client(http.clone(), &config.tron_api_url)
                        .with_api_key(config.tron_api_key.clone()),
                ),
            )
            .with_client(
                Blockchain::Bitcoin,
                Arc::new(EsploraRpc::with_client(http.clone(), &config.esplora_url)),
            )
            .with_client(
                Blockchain::Solana,
                Arc::new(SolanaRpc::with_client(http.clone(), &config.solana_rpc_url)),
            )
            .with_client(
                Blockchain::Sui,
                Arc::new(SuiRpc::with_client(http.clone(), &config.sui_rpc_url)),
            )
    }

    pub fn with_client(mut self, blockchain: Blockchain, client: Arc<dyn ChainRpc>) -> Self {
        self.clients.insert(blockchain, client);
        self
    }

    pub fn cache(&self) -> &BalanceCache {
        &self.cache
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Native balance in display units, served from cache when fresh. `0.0` on failure.
    pub async fn get_balance(&self, address: &str, blockchain: Blockchain) -> f64 {
        self.fetch(&BalanceKey::native(blockchain, address), false)
            .await
            .as_f64()
    }

    /// Native balance bypassing the cache
    pub async fn refresh_balance(&self, address: &str, blockchain: Blockchain) -> f64 {
        self.fetch(&BalanceKey::native(blockchain, address), true)
            .await
            .as_f64()
    }

    pub async fn fetch(&self, key: &BalanceKey, force: bool) -> BalanceReading {
        if !force {
            if let Some(balance) = self.cache.get(key) {
                return BalanceReading::Known(balance);
            }
        }

        match self.query(key).await {
            Ok(balance) => {
                self.cache.insert(key.clone(), balance);
                BalanceReading::Known(balance)
            }
            Err(e) => {
                log::warn!("⚠️  Balance fetch failed for {}: {}", key, e);
                BalanceReading::Unknown
            }
        }
    }

    /// Fetch every key concurrently; results keep the input order
    pub async fn fetch_many(&self, keys: &[BalanceKey], force: bool) -> Vec<BalanceReading> {
        join_all(keys.iter().map(|key| self.fetch(key, force))).await
    }

    async fn query(&self, key: &BalanceKey) -> Result<f64, RpcError> {
        let client = self
            .clients
            .get(&key.blockchain)
            .ok_or(RpcError::NotConfigured(key.blockchain))?;

        let call = async {
            match &key.asset {
                AssetRef::Native => client.get_native_balance(&key.address).await,
                AssetRef::Token { contract, .. } => {
                    client.get_token_balance(&key.address, contract).await
                }
            }
        };

        // Dropping the future on timeout cancels the in-flight request
        let raw = tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| RpcError::Timeout(self.timeout))??;

        Ok(to_display_units(raw, key.decimals()))
    }
}

impl Default for BalanceFetcher {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT, super::cache::DEFAULT_TTL)
    }
}
